// Error types for the Refract engine

use thiserror::Error;

/// Errors the transform pipeline can surface.
///
/// Ineligible requests, missing source files, and empty transform output are
/// not errors at all: those conditions pass the request to the next handler
/// in the chain. Only conditions that indicate a broken asset pipeline (a
/// readable-per-stat file that fails to read, or a failing transform) become
/// `Err` values, and they propagate instead of degrading to a pass-through.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Transform failed: {0}")]
    Transform(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Forbidden(_) => 403,
            Error::NotFound(_) => 404,
            Error::Deserialization(_) => 400,
            Error::Config(_)
            | Error::Transform(_)
            | Error::Serialization(_)
            | Error::Internal(_)
            | Error::Io(_) => 500,
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status_code())
    }
}
