mod anthropic_client;

pub use anthropic_client::{AnthropicClient, DEFAULT_ANTHROPIC_BASE_URL, DEFAULT_ANTHROPIC_VERSION};
