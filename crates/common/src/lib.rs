//! Common utilities and types shared between the Task API server and its clients.

#![warn(clippy::pedantic)]

/// Module for common data types
pub mod types;

/// Module for common configuration
pub mod config;

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for compact session-token helpers (size limits, shape checks, unverified decode)
pub mod jwt;

/// Module for client-side session token renewal
pub mod session_renewal;
