//! Error types for clause configuration.
//!
//! Every error here is raised while loading or compiling a clause
//! configuration. Document analysis itself has no error path: a document
//! that matches nothing simply yields an empty [`crate::AnalysisResult`].

use thiserror::Error;

/// Errors raised while loading and validating a clause configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration source could not be read.
    #[error("failed to read clause configuration: {path}: {message}")]
    Read { path: String, message: String },

    /// The configuration document is not valid JSON/TOML for the schema.
    #[error("failed to parse clause configuration: {message}")]
    Parse { message: String },

    /// A clause type does not declare `minimum_confidence_threshold`.
    #[error("clause type `{clause_type}` has no minimum_confidence_threshold")]
    MissingThreshold { clause_type: String },

    /// A threshold, coefficient or weight lies outside `[0, 1]`.
    #[error("{scope}: {field} = {value} is outside [0, 1]")]
    OutOfRange {
        scope: String,
        field: String,
        value: f64,
    },

    /// A keyword could not be compiled into a matcher.
    #[error("clause type `{clause_type}`: keyword `{keyword}` is invalid: {message}")]
    InvalidKeyword {
        clause_type: String,
        keyword: String,
        message: String,
    },

    /// A pattern regex or phrase failed to compile.
    #[error("clause type `{clause_type}`: pattern {index} is invalid: {message}")]
    InvalidPattern {
        clause_type: String,
        index: usize,
        message: String,
    },

    /// A pattern declares neither or both of `regex` and `phrase`.
    #[error("clause type `{clause_type}`: pattern {index} must declare exactly one of `regex` or `phrase`")]
    PatternSource { clause_type: String, index: usize },

    /// A required output field has no way of being extracted.
    #[error("clause type `{clause_type}`: required field `{field}` declares neither extraction_pattern nor extraction_keywords")]
    RequiredFieldWithoutRule { clause_type: String, field: String },

    /// An output field declares both extraction mechanisms.
    #[error("clause type `{clause_type}`: field `{field}` declares both extraction_pattern and extraction_keywords")]
    AmbiguousFieldRule { clause_type: String, field: String },

    /// Minimum clause length exceeds the maximum.
    #[error("invalid clause length bounds for {scope}: minimum {min} exceeds maximum {max}")]
    LengthBounds { scope: String, min: usize, max: usize },

    /// A field extraction regex is malformed.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

/// A field extraction rule whose regex does not compile.
///
/// Surfaced once, while the registry is built, never per document.
#[derive(Debug, Error)]
#[error("clause type `{clause_type}`: field `{field}` has invalid extraction pattern: {message}")]
pub struct ExtractionError {
    pub clause_type: String,
    pub field: String,
    pub message: String,
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
