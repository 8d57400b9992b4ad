//! Error types shared across the workspace

use thiserror::Error;

/// Result type alias for foodfacts operations
pub type Result<T> = std::result::Result<T, FoodfactsError>;

/// Main error type for foodfacts
#[derive(Error, Debug)]
pub enum FoodfactsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl FoodfactsError {
    /// Shorthand for a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        FoodfactsError::Config(message.into())
    }
}
