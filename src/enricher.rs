//! Optional post-processing of accepted findings.
//!
//! An [`Enricher`] sees each accepted finding after the rule engine is done
//! with it and may attach an [`Advisory`]. Advisories are commentary: they
//! never change a finding's confidence, span or fields. A proposed
//! `refined_text` is re-scored by the pipeline with the same scan, threshold
//! and length rules, and the outcome is recorded on the advisory as a
//! rule-based [`Scored`] breakdown.

use serde::{Deserialize, Serialize};

use crate::pipeline::ClauseFinding;
use crate::scored::Scored;
use crate::scorer::Score;

/// A note attached to a finding by an [`Enricher`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    pub note: String,
    /// A tighter or corrected clause text proposed for the finding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refined_text: Option<String>,
    /// Rule-engine score of `refined_text`, set by the pipeline.
    ///
    /// `Some` when the refined text passes threshold and length bounds on its
    /// own, `None` when it does not or when no text was proposed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revalidation: Option<Scored<Score>>,
}

impl Advisory {
    pub fn note(note: impl Into<String>) -> Self {
        Self {
            note: note.into(),
            refined_text: None,
            revalidation: None,
        }
    }

    pub fn with_refined_text(mut self, text: impl Into<String>) -> Self {
        self.refined_text = Some(text.into());
        self
    }

    pub fn revalidated_confidence(&self) -> Option<f64> {
        self.revalidation.as_ref().map(|r| r.confidence)
    }

    /// Whether the proposed refinement survived re-validation.
    pub fn is_corroborated(&self) -> bool {
        self.revalidation.is_some()
    }
}

/// Advisory post-processor for accepted findings.
///
/// Implementations must be safe to share between threads; the pipeline may
/// run clause types in parallel.
pub trait Enricher: Send + Sync {
    fn enrich(&self, finding: &ClauseFinding) -> Option<Scored<Advisory>>;
}

/// The default enricher: attaches nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEnricher;

impl Enricher for NoopEnricher {
    fn enrich(&self, _finding: &ClauseFinding) -> Option<Scored<Advisory>> {
        None
    }
}

impl<F> Enricher for F
where
    F: Fn(&ClauseFinding) -> Option<Scored<Advisory>> + Send + Sync,
{
    fn enrich(&self, finding: &ClauseFinding) -> Option<Scored<Advisory>> {
        self(finding)
    }
}
