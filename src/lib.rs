//! Rule-based clause classification and field extraction for contract text.
//!
//! Given the plain text of a contract, the engine decides which clause types
//! (termination, payment terms, confidentiality, ...) are present, locates
//! each clause, scores it, and pulls structured fields out of the clause text.
//!
//! ## Stages
//!
//! - [`ClauseRegistry`] - Validates and compiles a declarative clause configuration
//! - [`PatternMatcher`] - Finds keyword, context clue and pattern occurrences
//! - [`ConfidenceScorer`] - Combines signals into one confidence in `[0, 1]`
//! - [`SpanResolver`] - Scores sentence windows around anchor matches into clause spans
//! - [`FieldExtractor`] - Extracts declared output fields from a span
//! - [`ClausePipeline`] - Runs every clause type over a document, in configured order
//!
//! Every stage is a pure function of its inputs. The only shared state is the
//! immutable registry, which [`RegistryHandle`] can swap out as a whole.
//!
//! ## Example
//!
//! ```
//! use clause_engine::{analyze, ClauseRegistry};
//!
//! let result = analyze(
//!     "Either party may terminate this Agreement upon 30 days written notice.",
//!     ClauseRegistry::reference(),
//! );
//! assert_eq!(result.findings.len(), 1);
//! assert!(result.findings[0].confidence >= 0.6);
//! ```

mod config;
mod display;
mod enricher;
mod error;
mod field_extractor;
mod lexicon;
mod matcher;
mod pipeline;
mod registry;
mod scored;
mod scorer;
mod sentence_boundary;
mod span_resolver;

pub use config::{
    ClauseTypeDefinition, ConfidenceWeights, ConfigDocument, FieldDefinition, GlobalSettings,
    KeywordSets, OrderedMap, PatternDefinition,
};
pub use display::FindingDisplay;
pub use enricher::{Advisory, Enricher, NoopEnricher};
pub use error::{ConfigError, ConfigResult, ExtractionError};
pub use field_extractor::FieldExtractor;
pub use lexicon::{keyword_regex, phrase_regex, KeywordRule};
pub use matcher::{MatchSet, PatternMatcher, RawMatch, SignalKind};
pub use pipeline::{
    analyze, AnalysisResult, ClauseFinding, ClausePipeline, ClauseSpan, Document,
    ProcessingMetadata,
};
pub use registry::{
    ClauseRegistry, ClauseTypeConfig, FieldExtraction, FieldRule, PatternRule, RegistryHandle,
};
pub use scored::{ScoreSource, Scored};
pub use scorer::{ConfidenceScorer, Score};
pub use sentence_boundary::{SentenceSegmenter, TextLayout};
pub use span_resolver::{overlap_ratio, ResolvedSpan, SpanResolver, MAX_WINDOW};

/// Load and validate a configuration file. `.toml` files are read as TOML,
/// anything else as JSON.
pub fn load_config(path: impl AsRef<std::path::Path>) -> ConfigResult<ClauseRegistry> {
    ClauseRegistry::from_path(path.as_ref())
}
