//! Common error types for mspec

use thiserror::Error;

/// Common result type for mspec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across mspec crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed TOML bootstrap file
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
