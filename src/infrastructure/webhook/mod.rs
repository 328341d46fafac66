mod http_callback_dispatcher;

pub use http_callback_dispatcher::{
    DEFAULT_CALLBACK_TIMEOUT, DEFAULT_CALLBACK_USER_AGENT, HttpCallbackDispatcher,
};
