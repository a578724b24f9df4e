//! Error types for the fixture harness.

use clause_engine::ConfigError;
use thiserror::Error;

/// Errors that can occur while loading or running fixtures.
#[derive(Debug, Error)]
pub enum SpecError {
    /// A fixture file is not valid fixture TOML.
    #[error("failed to parse fixture {path}: {message}")]
    Parse { path: String, message: String },

    /// A fixture file or directory could not be read.
    #[error("failed to load fixture: {path}: {message}")]
    Load { path: String, message: String },

    /// The clause configuration a fixture points at is invalid.
    #[error("fixture configuration is invalid: {0}")]
    Config(#[from] ConfigError),

    /// One or more expectations did not hold.
    #[error("assertion failed: {message}")]
    Assertion { message: String },
}

/// Result type for spec operations.
pub type SpecResult<T> = Result<T, SpecError>;
