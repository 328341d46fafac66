use serde::{Deserialize, Serialize};

/// Per-request generation options as supplied in the request body. Missing
/// values fall back to [`GenerationDefaults`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOptions {
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationDefaults {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            model: "claude-3-5-sonnet-20241022".to_string(),
            max_tokens: 4096,
            temperature: 1.0,
        }
    }
}

/// A fully resolved request handed to the upstream provider.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub system_prompt: Option<String>,
}

impl GenerationRequest {
    pub fn resolve(prompt: &str, options: &GenerationOptions, defaults: &GenerationDefaults) -> Self {
        Self {
            prompt: prompt.to_string(),
            model: options
                .model
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| defaults.model.clone()),
            max_tokens: options.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: options.temperature.unwrap_or(defaults.temperature),
            system_prompt: options
                .system_prompt
                .clone()
                .filter(|s| !s.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    pub model: String,
    pub stop_reason: Option<String>,
    pub usage: Usage,
}
