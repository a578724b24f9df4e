//! Fixture file format.
//!
//! ```toml
//! title = "Termination with notice period"
//! config = "configs/custom.json"   # optional, relative to the fixture file
//! absent = ["confidentiality"]
//! text = """
//! Either party may terminate this Agreement upon 30 days written notice.
//! """
//!
//! [[expect]]
//! clause = "termination"
//! count = 1
//! min_confidence = 0.6
//! absent_fields = ["survival"]
//!
//! [expect.fields]
//! notice_period = "30 days"
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::{SpecError, SpecResult};

/// A scenario: one document and what the engine should find in it.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClauseFixture {
    #[serde(default)]
    pub title: Option<String>,
    /// Clause configuration to analyze with; the reference lexicon if unset.
    #[serde(default)]
    pub config: Option<PathBuf>,
    pub text: String,
    /// Byte offsets at which a new page starts.
    #[serde(default)]
    pub page_breaks: Vec<usize>,
    #[serde(default)]
    pub expect: Vec<Expectation>,
    /// Clause types that must produce no finding.
    #[serde(default)]
    pub absent: Vec<String>,
    /// Directory the fixture was loaded from; `config` resolves against it.
    #[serde(skip)]
    pub source_dir: Option<PathBuf>,
}

/// Expected findings for one clause type.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Expectation {
    pub clause: String,
    /// Exact number of findings; at least one when unset.
    #[serde(default)]
    pub count: Option<usize>,
    /// Every finding of the clause type must reach this confidence.
    #[serde(default)]
    pub min_confidence: Option<f64>,
    /// Each field must be extracted with this value by some finding.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    /// Fields no finding may carry.
    #[serde(default)]
    pub absent_fields: Vec<String>,
    /// Page of the first finding.
    #[serde(default)]
    pub page: Option<usize>,
}

impl ClauseFixture {
    /// The document text with the trailing newline of a TOML block string
    /// removed.
    pub fn document_text(&self) -> &str {
        self.text.strip_suffix('\n').unwrap_or(&self.text)
    }

    /// The resolved path of `config`, if any.
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config.as_ref().map(|path| match &self.source_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.clone(),
        })
    }
}

/// Parse fixture TOML. `origin` only labels errors.
pub fn parse_fixture(content: &str, origin: &str) -> SpecResult<ClauseFixture> {
    toml::from_str(content).map_err(|e| SpecError::Parse {
        path: origin.to_string(),
        message: e.to_string(),
    })
}
