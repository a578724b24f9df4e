//! `Scored<T>`: a value paired with a confidence and the source of that
//! confidence.
//!
//! The rule engine produces its own confidences directly on
//! [`crate::ClauseFinding`]. `Scored` tags the numbers attached to a finding
//! afterwards: an enricher's advisory comes from a model pass, and the
//! re-validation of its refined text comes from the clause type's rules.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A value with an associated confidence score.
///
/// # Example
/// ```
/// use clause_engine::{Scored, ScoreSource};
///
/// let note = Scored::model_pass("liability cap looks mutual", 0.7, "reviewer-v2", "pass-1");
/// assert!(matches!(note.source, ScoreSource::ModelPass { .. }));
/// assert_eq!(format!("{:?}", note), r#"Scored("liability cap looks mutual", conf: 0.70)"#);
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct Scored<T> {
    /// The actual value
    pub value: T,
    /// Confidence score from 0.0 to 1.0
    pub confidence: f64,
    /// Where this score came from
    pub source: ScoreSource,
}

/// The source of a confidence score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreSource {
    /// Score produced by a rule-based formula
    RuleBased {
        /// Name of the rule that produced this score
        rule_name: String,
    },
    /// Score produced by an external model pass
    ModelPass {
        /// Model identifier
        model: String,
        /// Unique identifier for this pass
        pass_id: String,
    },
}

impl<T> Scored<T> {
    /// Create a new scored value with explicit confidence and source.
    pub fn new(value: T, confidence: f64, source: ScoreSource) -> Self {
        Self {
            value,
            confidence: confidence.clamp(0.0, 1.0),
            source,
        }
    }

    /// Create a scored value from a rule-based formula.
    pub fn rule_based(value: T, confidence: f64, rule_name: &str) -> Self {
        Self::new(
            value,
            confidence,
            ScoreSource::RuleBased {
                rule_name: rule_name.to_string(),
            },
        )
    }

    /// Create a scored value from an external model pass.
    pub fn model_pass(value: T, confidence: f64, model: &str, pass_id: &str) -> Self {
        Self::new(
            value,
            confidence,
            ScoreSource::ModelPass {
                model: model.to_string(),
                pass_id: pass_id.to_string(),
            },
        )
    }
}

impl<T: fmt::Debug> fmt::Debug for Scored<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Compact format for snapshot tests: Scored(value, conf: 0.85)
        write!(f, "Scored({:?}, conf: {:.2})", self.value, self.confidence)
    }
}

impl<T: PartialEq> PartialEq for Scored<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
            && (self.confidence - other.confidence).abs() < f64::EPSILON
            && self.source == other.source
    }
}
