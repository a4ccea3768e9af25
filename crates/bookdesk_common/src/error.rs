// --- File: crates/bookdesk_common/src/error.rs ---
use std::fmt;
use thiserror::Error;

/// The base error type shared by all Bookdesk crates.
///
/// Feature crates define their own error enums and implement
/// `From<FeatureError> for BookdeskError`, so handlers can use `?` and still
/// produce the JSON error body and status code below.
#[derive(Error, Debug)]
pub enum BookdeskError {
    /// Missing or malformed request input.
    #[error("{0}")]
    InvalidInput(String),

    /// Signature or credential check failed.
    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    NotFound(String),

    /// An external API call failed or returned an error payload.
    #[error("{service} error: {message}")]
    UpstreamFailure { service: String, message: String },

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Transport-level failure talking to an upstream
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// An upstream response could not be decoded
    #[error("Failed to parse data: {0}")]
    ParseError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// A trait for converting errors to HTTP status codes.
pub trait HttpStatusCode {
    /// Returns the HTTP status code for this error.
    fn status_code(&self) -> u16;
}

impl HttpStatusCode for BookdeskError {
    fn status_code(&self) -> u16 {
        match self {
            BookdeskError::InvalidInput(_) => 400,
            BookdeskError::AuthError(_) => 400,
            BookdeskError::MethodNotAllowed => 405,
            BookdeskError::NotFound(_) => 404,
            BookdeskError::UpstreamFailure { .. } => 500,
            BookdeskError::ConfigError(_) => 500,
            BookdeskError::HttpError(_) => 500,
            BookdeskError::ParseError(_) => 500,
            BookdeskError::Internal(_) => 500,
        }
    }
}

/// A trait for adding context to errors.
pub trait Context<T, E> {
    /// Adds context to an error.
    fn context<C>(self, context: C) -> Result<T, BookdeskError>
    where
        C: fmt::Display + Send + Sync + 'static;
}

impl<T, E: std::error::Error + Send + Sync + 'static> Context<T, E> for Result<T, E> {
    fn context<C>(self, context: C) -> Result<T, BookdeskError>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|error| BookdeskError::Internal(format!("{}: {}", context, error)))
    }
}

// Common error conversions
impl From<reqwest::Error> for BookdeskError {
    fn from(err: reqwest::Error) -> Self {
        BookdeskError::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for BookdeskError {
    fn from(err: serde_json::Error) -> Self {
        BookdeskError::ParseError(err.to_string())
    }
}

// Utility functions for error handling
pub fn invalid_input<T: fmt::Display>(message: T) -> BookdeskError {
    BookdeskError::InvalidInput(message.to_string())
}

pub fn config_error<T: fmt::Display>(message: T) -> BookdeskError {
    BookdeskError::ConfigError(message.to_string())
}

pub fn upstream_failure<T: fmt::Display>(service: &str, message: T) -> BookdeskError {
    BookdeskError::UpstreamFailure {
        service: service.to_string(),
        message: message.to_string(),
    }
}

pub fn internal_error<T: fmt::Display>(message: T) -> BookdeskError {
    BookdeskError::Internal(message.to_string())
}
