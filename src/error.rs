//! Error handling for the GSM channel service.
//!
//! One error type covers the whole service; variants carry a formatted
//! message rather than nested source errors so they stay `Clone` and cheap
//! to log at the loop boundary.

use thiserror::Error;

/// GSM channel error type
///
/// Transport failures never surface here: they downgrade the modem state and
/// are retried by the worker loop, carried as
/// [`TransportError`](crate::transport::TransportError) underneath.
#[derive(Error, Debug, Clone)]
pub enum GsmError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// SMS command errors (format, validation, authorization)
    #[error("Command error: {0}")]
    CommandError(String),
}

/// Result type alias for the GSM channel service
pub type Result<T> = std::result::Result<T, GsmError>;

impl GsmError {
    pub fn config(msg: impl Into<String>) -> Self {
        GsmError::ConfigError(msg.into())
    }

    pub fn command(msg: impl Into<String>) -> Self {
        GsmError::CommandError(msg.into())
    }
}

impl From<figment::Error> for GsmError {
    fn from(err: figment::Error) -> Self {
        GsmError::ConfigError(err.to_string())
    }
}
