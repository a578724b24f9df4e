//! The classification pipeline: scan → score → resolve → extract, for every
//! clause type in configuration order.
//!
//! The pipeline holds no per-document state. Analyzing a document reads the
//! shared registry and nothing else, so one [`ClausePipeline`] may serve any
//! number of threads.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::enricher::{Advisory, Enricher, NoopEnricher};
use crate::field_extractor::FieldExtractor;
use crate::matcher::{PatternMatcher, RawMatch};
use crate::registry::{ClauseRegistry, ClauseTypeConfig};
use crate::scored::Scored;
use crate::scorer::{ConfidenceScorer, Score};
use crate::sentence_boundary::{SentenceSegmenter, TextLayout};
use crate::span_resolver::SpanResolver;

// ============================================================================
// Input
// ============================================================================

/// Plain document text with optional identity and page layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub text: String,
    /// Byte offsets at which a new page starts, ascending.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub page_breaks: Vec<usize>,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            page_breaks: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_page_breaks(mut self, mut page_breaks: Vec<usize>) -> Self {
        page_breaks.sort_unstable();
        page_breaks.dedup();
        self.page_breaks = page_breaks;
        self
    }

    /// 1-based page containing `offset`, when page breaks are known.
    pub fn page_of(&self, offset: usize) -> Option<usize> {
        if self.page_breaks.is_empty() {
            return None;
        }
        let preceding = self.page_breaks.partition_point(|&b| b <= offset);
        Some(preceding + 1)
    }
}

// ============================================================================
// Output
// ============================================================================

/// The accepted text of one clause instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClauseSpan {
    /// Byte offsets into the document.
    pub start: usize,
    pub end: usize,
    pub text: String,
    /// Page of `start`, when the document carries page breaks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
}

/// One accepted clause instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClauseFinding {
    pub clause_type: String,
    pub display_name: String,
    pub confidence: f64,
    pub span: ClauseSpan,
    /// Positive evidence inside the span, in document order.
    pub matches: Vec<RawMatch>,
    /// Negative keyword matches inside the span.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub penalties: Vec<RawMatch>,
    /// Extracted fields. Absent fields are unknown, not empty.
    pub fields: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub advisories: Vec<Scored<Advisory>>,
}

impl ClauseFinding {
    /// The highest-weight match, first in document order on ties.
    pub fn representative(&self) -> Option<&RawMatch> {
        self.matches.iter().fold(None, |best: Option<&RawMatch>, m| match best {
            Some(b) if b.weight >= m.weight => Some(b),
            _ => Some(m),
        })
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    /// Document length in characters.
    pub document_length: usize,
    pub clause_types_evaluated: usize,
    pub sentence_count: usize,
    pub paragraph_count: usize,
}

/// Everything one analysis produced.
///
/// Findings are grouped by clause type in configuration order, and by span
/// start within a clause type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    pub findings: Vec<ClauseFinding>,
    pub metadata: ProcessingMetadata,
}

impl AnalysisResult {
    pub fn findings_for<'a>(
        &'a self,
        clause_type: &'a str,
    ) -> impl Iterator<Item = &'a ClauseFinding> + 'a {
        self.findings
            .iter()
            .filter(move |f| f.clause_type == clause_type)
    }

    pub fn contains(&self, clause_type: &str) -> bool {
        self.findings.iter().any(|f| f.clause_type == clause_type)
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Runs every configured clause type over a document.
///
/// # Example
/// ```
/// use clause_engine::ClausePipeline;
///
/// let result = ClausePipeline::reference()
///     .analyze_text("Either party may terminate this Agreement upon 30 days written notice.");
/// let finding = &result.findings[0];
/// assert_eq!(finding.clause_type, "termination");
/// assert_eq!(finding.field("notice_period"), Some("30 days"));
/// ```
#[derive(Clone)]
pub struct ClausePipeline {
    registry: Arc<ClauseRegistry>,
    matcher: PatternMatcher,
    scorer: ConfidenceScorer,
    segmenter: SentenceSegmenter,
    resolver: SpanResolver,
    extractor: FieldExtractor,
    enricher: Arc<dyn Enricher>,
}

impl std::fmt::Debug for ClausePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClausePipeline")
            .field("clause_types", &self.registry.ids().collect::<Vec<_>>())
            .finish()
    }
}

impl ClausePipeline {
    pub fn new(registry: Arc<ClauseRegistry>) -> Self {
        Self {
            registry,
            matcher: PatternMatcher::new(),
            scorer: ConfidenceScorer::new(),
            segmenter: SentenceSegmenter::new(),
            resolver: SpanResolver::new(),
            extractor: FieldExtractor::new(),
            enricher: Arc::new(NoopEnricher),
        }
    }

    /// A pipeline over the built-in reference lexicon.
    pub fn reference() -> Self {
        Self::new(ClauseRegistry::reference())
    }

    pub fn with_enricher(mut self, enricher: impl Enricher + 'static) -> Self {
        self.enricher = Arc::new(enricher);
        self
    }

    pub fn with_segmenter(mut self, segmenter: SentenceSegmenter) -> Self {
        self.segmenter = segmenter;
        self
    }

    pub fn registry(&self) -> &Arc<ClauseRegistry> {
        &self.registry
    }

    pub fn analyze_text(&self, text: &str) -> AnalysisResult {
        self.analyze(&Document::new(text))
    }

    pub fn analyze(&self, document: &Document) -> AnalysisResult {
        let layout = self.segmenter.layout(&document.text);
        let clause_types = self.registry.clause_types();

        #[cfg(feature = "parallel")]
        let per_type: Vec<Vec<ClauseFinding>> = clause_types
            .par_iter()
            .map(|clause_type| self.evaluate(clause_type, document, &layout))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let per_type: Vec<Vec<ClauseFinding>> = clause_types
            .iter()
            .map(|clause_type| self.evaluate(clause_type, document, &layout))
            .collect();

        AnalysisResult {
            document_id: document.id.clone(),
            findings: per_type.into_iter().flatten().collect(),
            metadata: ProcessingMetadata {
                document_length: document.text.chars().count(),
                clause_types_evaluated: clause_types.len(),
                sentence_count: layout.sentences.len(),
                paragraph_count: layout.paragraphs.len(),
            },
        }
    }

    /// Rule-engine score of `text` taken as a whole clause of `clause_type`,
    /// or `None` if it would not be accepted.
    pub fn revalidate(
        &self,
        clause_type: &ClauseTypeConfig,
        text: &str,
    ) -> Option<Scored<Score>> {
        let text = text.trim();
        let matches = self.matcher.scan(text, clause_type);
        let score = self.scorer.score(&matches, clause_type);
        (score.accepted_by(clause_type) && clause_type.length_in_bounds(text.chars().count()))
            .then(|| Scored::rule_based(score, score.confidence, &clause_type.id))
    }

    fn evaluate(
        &self,
        clause_type: &ClauseTypeConfig,
        document: &Document,
        layout: &TextLayout,
    ) -> Vec<ClauseFinding> {
        let text = &document.text;
        let matches = self.matcher.scan(text, clause_type);
        if matches.is_empty() {
            debug!(clause_type = %clause_type.id, "no positive signals");
            return Vec::new();
        }

        let spans = self.resolver.resolve(&matches, layout, text, clause_type);
        debug!(
            clause_type = %clause_type.id,
            signals = matches.len(),
            spans = spans.len(),
            confidence = ?spans.iter().map(|s| s.confidence).collect::<Vec<_>>(),
            "evaluated clause type"
        );

        spans
            .into_iter()
            .map(|span| {
                let span_text = &text[span.range()];
                let mut finding = ClauseFinding {
                    clause_type: clause_type.id.clone(),
                    display_name: clause_type.display_name.clone(),
                    confidence: span.confidence,
                    fields: self.extractor.extract(span_text, clause_type),
                    span: ClauseSpan {
                        start: span.start,
                        end: span.end,
                        text: span_text.to_string(),
                        page: document.page_of(span.start),
                    },
                    matches: span.matches.positives,
                    penalties: span.matches.penalties,
                    advisories: Vec::new(),
                };
                if let Some(mut advisory) = self.enricher.enrich(&finding) {
                    if let Some(refined) = &advisory.value.refined_text {
                        advisory.value.revalidation = self.revalidate(clause_type, refined);
                    }
                    finding.advisories.push(advisory);
                }
                finding
            })
            .collect()
    }
}

/// Analyze `text` against `registry` with a default pipeline.
pub fn analyze(text: &str, registry: Arc<ClauseRegistry>) -> AnalysisResult {
    ClausePipeline::new(registry).analyze_text(text)
}
