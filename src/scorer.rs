//! Confidence scoring.
//!
//! ```text
//! presence(keyword kind) = distinct keywords matched / keywords configured   (≤ 1)
//! presence(pattern)      = max weight + bonus × (distinct patterns − 1)      (≤ 1)
//! positive   = min(1, Σ coefficient[kind] × presence(kind))
//! confidence = clamp(0, 1, positive − coefficient[negative] × presence(negative))
//! ```
//!
//! A match set with neither a primary keyword nor a pattern scores zero.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::matcher::{MatchSet, RawMatch, SignalKind};
use crate::registry::ClauseTypeConfig;

/// The result of scoring one match set, with its per-kind breakdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub confidence: f64,
    /// Normalized presence per signal kind, before coefficients.
    pub primary_presence: f64,
    pub secondary_presence: f64,
    pub pattern_presence: f64,
    pub context_presence: f64,
    pub negative_presence: f64,
    /// Weighted positive evidence, capped at 1.
    pub positive: f64,
    /// Weighted negative evidence.
    pub penalty: f64,
    /// False when no primary keyword or pattern matched.
    pub anchored: bool,
}

impl Score {
    pub fn accepted_by(&self, clause_type: &ClauseTypeConfig) -> bool {
        self.anchored && clause_type.accepts(self.confidence)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceScorer;

impl ConfidenceScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, matches: &MatchSet, clause_type: &ClauseTypeConfig) -> Score {
        let weights = &clause_type.weights;

        let primary_presence = keyword_presence(
            &matches.positives,
            SignalKind::PrimaryKeyword,
            clause_type.primary_keywords.len(),
        );
        let secondary_presence = keyword_presence(
            &matches.positives,
            SignalKind::SecondaryKeyword,
            clause_type.secondary_keywords.len(),
        );
        let context_presence = keyword_presence(
            &matches.positives,
            SignalKind::ContextClue,
            clause_type.context_clues.len(),
        );
        let pattern_presence =
            pattern_presence(&matches.positives, clause_type.pattern_diversity_bonus);
        let negative_presence = keyword_presence(
            &matches.penalties,
            SignalKind::NegativeKeyword,
            clause_type.negative_keywords.len(),
        );

        let anchored = matches.has_anchor();
        let positive = (weights.primary_keyword * primary_presence
            + weights.secondary_keyword * secondary_presence
            + weights.pattern * pattern_presence
            + weights.context_clue * context_presence)
            .min(1.0);
        let penalty = weights.negative_keyword * negative_presence;

        let confidence = if anchored {
            (positive - penalty).clamp(0.0, 1.0)
        } else {
            0.0
        };

        Score {
            confidence,
            primary_presence,
            secondary_presence,
            pattern_presence,
            context_presence,
            negative_presence,
            positive,
            penalty,
            anchored,
        }
    }
}

fn keyword_presence(matches: &[RawMatch], kind: SignalKind, configured: usize) -> f64 {
    if configured == 0 {
        return 0.0;
    }
    let distinct: BTreeSet<usize> = matches
        .iter()
        .filter(|m| m.kind == kind)
        .map(|m| m.rule_index)
        .collect();
    (distinct.len() as f64 / configured as f64).min(1.0)
}

fn pattern_presence(matches: &[RawMatch], diversity_bonus: f64) -> f64 {
    let mut distinct = BTreeSet::new();
    let mut max_weight: f64 = 0.0;
    for m in matches.iter().filter(|m| m.kind == SignalKind::Pattern) {
        distinct.insert(m.rule_index);
        max_weight = max_weight.max(m.weight);
    }
    if distinct.is_empty() {
        return 0.0;
    }
    (max_weight + diversity_bonus * (distinct.len() - 1) as f64).min(1.0)
}
