pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use config::{Environment, Settings, SettingsError};
pub use errors::ApiError;
pub use middleware::{ClientRateLimiter, spawn_rate_limit_pruner};
pub use router::create_router;
pub use state::AppState;
