//! Shared building blocks for the listing services.
//!
//! - `config`: environment-driven service configuration
//! - `errors`: error taxonomy and HTTP mapping
//! - `middleware`: request id and principal resolution
//! - `models`: wire and domain models
//! - `response`: response bodies
//! - `utils`: id generation and SQL inspection helpers

pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod response;
pub mod utils;
