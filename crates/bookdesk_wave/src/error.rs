// --- File: crates/bookdesk_wave/src/error.rs ---
use bookdesk_common::{config_error, invalid_input, upstream_failure, BookdeskError, HttpStatusCode};
use thiserror::Error;

/// Wave-specific error types.
#[derive(Error, Debug)]
pub enum WaveError {
    #[error("Wave API request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// A non-JSON body, usually an HTML error page.
    #[error("Wave HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Top-level GraphQL `errors`, or a non-2xx status with a JSON body.
    #[error("{0}")]
    GraphQl(String),

    /// A mutation answered `didSucceed: false`.
    #[error("{operation}: {message}")]
    MutationFailed {
        operation: &'static str,
        message: String,
    },

    #[error("Failed to parse Wave response: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("{0}")]
    ConfigError(String),

    #[error("{0}")]
    InvalidInput(String),
}

impl From<WaveError> for BookdeskError {
    fn from(err: WaveError) -> Self {
        match err {
            WaveError::ConfigError(msg) => config_error(msg),
            WaveError::InvalidInput(msg) => invalid_input(msg),
            other => upstream_failure("Wave", other),
        }
    }
}

impl HttpStatusCode for WaveError {
    fn status_code(&self) -> u16 {
        match self {
            WaveError::InvalidInput(_) => 400,
            _ => 500,
        }
    }
}
