//! # Observability
//!
//! Structured logging for the ackplane core. Secrets never reach a log line:
//! key ids are rendered as their last four characters and secret values are
//! wrapped in [`crate::credentials::SecretString`].

pub mod logging;

pub use logging::{init_logging, log_config_info};
