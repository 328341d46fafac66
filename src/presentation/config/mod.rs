mod environment;
mod settings;

pub use environment::Environment;
pub use settings::{
    API_SECRET_KEY_VAR, AuthSettings, CallbackSettings, LLM_API_KEY_VAR, LlmSettings,
    LoggingSettings, ProcessingSettings, RateLimitSettings, RetrySettings, ServerSettings,
    Settings, SettingsError, TrackerSettings,
};
