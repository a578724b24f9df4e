//! Signal scanning: keyword and pattern occurrences for one clause type.
//!
//! The matcher only records evidence. It never decides whether a clause is
//! present and never deduplicates overlapping patterns; both happen later in
//! scoring and span resolution.

use std::collections::HashSet;
use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::lexicon::KeywordRule;
use crate::registry::ClauseTypeConfig;

/// The evidence source of a [`RawMatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    PrimaryKeyword,
    SecondaryKeyword,
    Pattern,
    ContextClue,
    /// Counts against the clause type.
    NegativeKeyword,
}

impl SignalKind {
    pub fn is_penalty(self) -> bool {
        self == SignalKind::NegativeKeyword
    }

    /// Whether this kind alone can anchor a clause detection.
    pub fn is_anchor(self) -> bool {
        matches!(self, SignalKind::PrimaryKeyword | SignalKind::Pattern)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::PrimaryKeyword => "primary_keyword",
            SignalKind::SecondaryKeyword => "secondary_keyword",
            SignalKind::Pattern => "pattern",
            SignalKind::ContextClue => "context_clue",
            SignalKind::NegativeKeyword => "negative_keyword",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One occurrence of one signal in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMatch {
    pub clause_type: String,
    pub kind: SignalKind,
    /// Index of the keyword or pattern within its configured list.
    pub rule_index: usize,
    /// The configured keyword, or the pattern's description.
    pub rule: String,
    /// The matched document text.
    pub text: String,
    /// Byte offsets into the document.
    pub start: usize,
    pub end: usize,
    /// Declared contribution: the pattern weight, or a keyword's share of its
    /// kind's coefficient.
    pub weight: f64,
}

impl RawMatch {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    fn sort_key(&self) -> (usize, usize, SignalKind, usize) {
        (self.start, self.end, self.kind, self.rule_index)
    }
}

/// The raw matches of one clause type, positive evidence kept apart from
/// penalties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchSet {
    /// Primary/secondary keywords, context clues and patterns, in document order.
    pub positives: Vec<RawMatch>,
    /// Negative keyword matches, in document order.
    pub penalties: Vec<RawMatch>,
}

impl MatchSet {
    /// True when there is no positive evidence.
    pub fn is_empty(&self) -> bool {
        self.positives.is_empty()
    }

    pub fn len(&self) -> usize {
        self.positives.len() + self.penalties.len()
    }

    /// All matches, positives first.
    pub fn iter(&self) -> impl Iterator<Item = &RawMatch> {
        self.positives.iter().chain(self.penalties.iter())
    }

    /// Matches of one kind.
    pub fn of_kind(&self, kind: SignalKind) -> impl Iterator<Item = &RawMatch> {
        self.iter().filter(move |m| m.kind == kind)
    }

    /// Whether any positive match can anchor a detection.
    pub fn has_anchor(&self) -> bool {
        self.positives.iter().any(|m| m.kind.is_anchor())
    }

    /// The matches lying entirely inside `range`.
    pub fn within(&self, range: &Range<usize>) -> MatchSet {
        let inside = |m: &&RawMatch| range.start <= m.start && m.end <= range.end;
        MatchSet {
            positives: self.positives.iter().filter(inside).cloned().collect(),
            penalties: self.penalties.iter().filter(inside).cloned().collect(),
        }
    }

    /// Union with another set, keeping document order and dropping repeats.
    pub fn merge(&mut self, other: MatchSet) {
        self.positives.extend(other.positives);
        self.penalties.extend(other.penalties);
        normalize(&mut self.positives);
        normalize(&mut self.penalties);
    }
}

fn normalize(matches: &mut Vec<RawMatch>) {
    matches.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    matches.dedup_by(|a, b| a.sort_key() == b.sort_key());
}

/// Scans a document for every signal of one clause type.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternMatcher;

impl PatternMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Find every keyword, context clue, pattern and negative keyword
    /// occurrence of `clause_type` in `text`.
    pub fn scan(&self, text: &str, clause_type: &ClauseTypeConfig) -> MatchSet {
        let mut positives = Vec::new();
        let mut penalties = Vec::new();
        let weights = &clause_type.weights;

        scan_keywords(
            text,
            clause_type,
            SignalKind::PrimaryKeyword,
            &clause_type.primary_keywords,
            weights.primary_keyword,
            &mut positives,
        );
        scan_keywords(
            text,
            clause_type,
            SignalKind::SecondaryKeyword,
            &clause_type.secondary_keywords,
            weights.secondary_keyword,
            &mut positives,
        );
        scan_keywords(
            text,
            clause_type,
            SignalKind::ContextClue,
            &clause_type.context_clues,
            weights.context_clue,
            &mut positives,
        );

        // Every pattern contributes independently, even over a span an
        // earlier pattern already matched.
        for (index, pattern) in clause_type.patterns.iter().enumerate() {
            for found in pattern.regex.find_iter(text) {
                if found.start() == found.end() {
                    continue;
                }
                positives.push(RawMatch {
                    clause_type: clause_type.id.clone(),
                    kind: SignalKind::Pattern,
                    rule_index: index,
                    rule: if pattern.description.is_empty() {
                        pattern.source.clone()
                    } else {
                        pattern.description.clone()
                    },
                    text: found.as_str().to_string(),
                    start: found.start(),
                    end: found.end(),
                    weight: pattern.weight,
                });
            }
        }

        scan_keywords(
            text,
            clause_type,
            SignalKind::NegativeKeyword,
            &clause_type.negative_keywords,
            weights.negative_keyword,
            &mut penalties,
        );

        normalize(&mut positives);
        normalize(&mut penalties);
        MatchSet {
            positives,
            penalties,
        }
    }
}

fn scan_keywords(
    text: &str,
    clause_type: &ClauseTypeConfig,
    kind: SignalKind,
    keywords: &[KeywordRule],
    coefficient: f64,
    out: &mut Vec<RawMatch>,
) {
    if keywords.is_empty() {
        return;
    }
    let share = coefficient / keywords.len() as f64;
    // Two keywords of one kind matching the same text count once.
    let mut seen: HashSet<(usize, usize)> = HashSet::new();
    for (index, keyword) in keywords.iter().enumerate() {
        for found in keyword.regex.find_iter(text) {
            if !seen.insert((found.start(), found.end())) {
                continue;
            }
            out.push(RawMatch {
                clause_type: clause_type.id.clone(),
                kind,
                rule_index: index,
                rule: keyword.text.clone(),
                text: found.as_str().to_string(),
                start: found.start(),
                end: found.end(),
                weight: share,
            });
        }
    }
}
