//! HTTP request handlers.

pub mod health;
pub mod me;
pub mod metrics;
pub mod status_handler;
pub mod token_handler;

pub use health::health_check;
pub use me::get_me;
pub use metrics::metrics_handler;
pub use status_handler::handle_jwt_status;
pub use token_handler::handle_renew_token;
