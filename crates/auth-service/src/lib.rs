//! Task API session-token service library
//!
//! Signs and verifies session tokens under a rotating pair of HMAC secrets
//! and serves the renewal endpoint clients use to move off a retired secret.
//!
//! # Modules
//!
//! - `config` - Service configuration
//! - `crypto` - Token signing/verification and secret generation
//! - `errors` - Error types
//! - `handlers` - HTTP request handlers
//! - `middleware` - Bearer authentication and HTTP metrics
//! - `observability` - Metrics and log correlation helpers
//! - `routes` - Router and application state
//! - `secrets` - Secret pair, lock-free store and env-style secrets file
//! - `services` - Token Authority and secret rotation
//! - `tasks` - Background rotation scheduler

pub mod config;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod routes;
pub mod secrets;
pub mod services;
pub mod tasks;
