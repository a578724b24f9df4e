//! Span resolution: from raw matches to accepted clause spans.
//!
//! Every sentence holding an anchor match (a primary keyword or a pattern)
//! seeds a candidate. The seed is scored inside each window of up to
//! [`MAX_WINDOW`] consecutive sentences that contains it and stays within its
//! paragraph; the best accepted window becomes the candidate, the tightest
//! one on ties. Candidates that overlap by more than the configured ratio are
//! merged. Remaining overlaps are resolved in favour of the stronger span,
//! whose sentences are cut out of the weaker one before it is scored again.
//! Length bounds are applied to every final span.

use std::collections::BTreeSet;
use std::ops::Range;

use tracing::debug;

use crate::matcher::MatchSet;
use crate::registry::ClauseTypeConfig;
use crate::scorer::ConfidenceScorer;
use crate::sentence_boundary::TextLayout;

/// Largest number of sentences a candidate window may span.
pub const MAX_WINDOW: usize = 3;

/// An accepted clause span with the evidence inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSpan {
    pub start: usize,
    pub end: usize,
    /// Indices of the sentences the span covers.
    pub sentences: Range<usize>,
    /// Highest confidence among the regions merged into this span.
    pub confidence: f64,
    pub matches: MatchSet,
}

impl ResolvedSpan {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    fn shares_sentences(&self, other: &ResolvedSpan) -> bool {
        self.sentences.start < other.sentences.end && other.sentences.start < self.sentences.end
    }

    fn absorb(&mut self, other: ResolvedSpan) {
        self.start = self.start.min(other.start);
        self.end = self.end.max(other.end);
        self.sentences =
            self.sentences.start.min(other.sentences.start)..self.sentences.end.max(other.sentences.end);
        self.confidence = self.confidence.max(other.confidence);
        self.matches.merge(other.matches);
    }
}

/// Intersection length over the shorter range's length.
pub fn overlap_ratio(a: &Range<usize>, b: &Range<usize>) -> f64 {
    let shorter = (a.end - a.start).min(b.end - b.start);
    if shorter == 0 {
        return 0.0;
    }
    let intersection = a.end.min(b.end).saturating_sub(a.start.max(b.start));
    intersection as f64 / shorter as f64
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpanResolver {
    scorer: ConfidenceScorer,
}

impl SpanResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the matches of one clause type into zero or more accepted,
    /// non-overlapping spans in document order.
    pub fn resolve(
        &self,
        matches: &MatchSet,
        layout: &TextLayout,
        text: &str,
        clause_type: &ClauseTypeConfig,
    ) -> Vec<ResolvedSpan> {
        let seeds: BTreeSet<usize> = matches
            .positives
            .iter()
            .filter(|m| m.kind.is_anchor())
            .filter_map(|m| layout.sentence_index(m.start))
            .collect();

        let mut candidates: Vec<ResolvedSpan> = Vec::new();
        for &seed in &seeds {
            let Some(best) = self.best_window(seed, matches, layout, clause_type) else {
                debug!(clause_type = %clause_type.id, sentence = seed, "no accepted window");
                continue;
            };
            if !candidates.iter().any(|c| c.sentences == best.sentences) {
                candidates.push(best);
            }
        }

        merge_overlapping(&mut candidates, clause_type.overlap_threshold);
        let mut spans = self.separate(candidates, matches, layout, clause_type);

        spans.retain(|span| {
            let chars = text[span.range()].chars().count();
            let keep = clause_type.length_in_bounds(chars);
            if !keep {
                debug!(
                    clause_type = %clause_type.id,
                    chars,
                    min = clause_type.min_length,
                    max = clause_type.max_length,
                    "span outside length bounds"
                );
            }
            keep
        });
        spans
    }

    /// The highest-scoring accepted window around `seed`.
    fn best_window(
        &self,
        seed: usize,
        matches: &MatchSet,
        layout: &TextLayout,
        clause_type: &ClauseTypeConfig,
    ) -> Option<ResolvedSpan> {
        let paragraph = layout.paragraph_index(layout.sentences.get(seed)?.start);
        let same_paragraph = |index: usize| {
            layout
                .sentences
                .get(index)
                .map_or(false, |s| layout.paragraph_index(s.start) == paragraph)
        };

        let mut best: Option<ResolvedSpan> = None;
        for size in 1..=MAX_WINDOW {
            for first in (seed + 1).saturating_sub(size)..=seed {
                let window = first..first + size;
                if !same_paragraph(window.start) || !same_paragraph(window.end - 1) {
                    continue;
                }
                let Some(span) = self.score_window(window, matches, layout, clause_type) else {
                    continue;
                };
                if best.as_ref().map_or(true, |b| span.confidence > b.confidence) {
                    best = Some(span);
                }
            }
        }
        best
    }

    /// Score the sentences `window` as one region; `Some` if accepted.
    fn score_window(
        &self,
        window: Range<usize>,
        matches: &MatchSet,
        layout: &TextLayout,
        clause_type: &ClauseTypeConfig,
    ) -> Option<ResolvedSpan> {
        let region = layout.sentence_span(window.clone())?;
        let region_matches = matches.within(&region);
        let score = self.scorer.score(&region_matches, clause_type);
        if !score.accepted_by(clause_type) {
            debug!(
                clause_type = %clause_type.id,
                start = region.start,
                end = region.end,
                confidence = score.confidence,
                "candidate region below threshold"
            );
            return None;
        }
        Some(ResolvedSpan {
            start: region.start,
            end: region.end,
            sentences: window,
            confidence: score.confidence,
            matches: region_matches,
        })
    }

    /// Resolve overlaps left after merging: stronger spans keep their
    /// sentences and each weaker span is cut back to the sentences nobody
    /// holds, then scored again.
    fn separate(
        &self,
        mut spans: Vec<ResolvedSpan>,
        matches: &MatchSet,
        layout: &TextLayout,
        clause_type: &ClauseTypeConfig,
    ) -> Vec<ResolvedSpan> {
        spans.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then(a.start.cmp(&b.start))
        });

        let mut kept: Vec<ResolvedSpan> = Vec::new();
        for span in spans {
            if !kept.iter().any(|k| k.shares_sentences(&span)) {
                kept.push(span);
                continue;
            }
            let held = |index: usize| kept.iter().any(|k| k.sentences.contains(&index));
            let mut free_runs = Vec::new();
            let mut run_start = None;
            for index in span.sentences.clone() {
                match (held(index), run_start) {
                    (false, None) => run_start = Some(index),
                    (true, Some(start)) => {
                        free_runs.push(start..index);
                        run_start = None;
                    }
                    _ => {}
                }
            }
            if let Some(start) = run_start {
                free_runs.push(start..span.sentences.end);
            }
            for run in free_runs {
                if let Some(rest) = self.score_window(run, matches, layout, clause_type) {
                    kept.push(rest);
                }
            }
        }

        kept.sort_by_key(|s| (s.start, s.end));
        kept
    }
}

/// Merge spans pairwise until no two overlap above `threshold`.
fn merge_overlapping(spans: &mut Vec<ResolvedSpan>, threshold: f64) {
    spans.sort_by_key(|s| (s.start, s.end));
    loop {
        let pair = (0..spans.len()).find_map(|i| {
            ((i + 1)..spans.len())
                .find(|&j| overlap_ratio(&spans[i].range(), &spans[j].range()) > threshold)
                .map(|j| (i, j))
        });
        let Some((i, j)) = pair else {
            break;
        };
        let other = spans.remove(j);
        spans[i].absorb(other);
    }
    spans.sort_by_key(|s| (s.start, s.end));
}
