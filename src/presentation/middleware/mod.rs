mod api_key;
mod panic;
mod rate_limit;

pub use api_key::{API_KEY_HEADER, api_key_middleware};
pub use panic::panic_response;
pub use rate_limit::{
    ClientRateLimiter, general_rate_limit_middleware, rate_limit_middleware,
    spawn_rate_limit_pruner,
};
