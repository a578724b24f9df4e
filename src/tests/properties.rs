use proptest::prelude::*;

use crate::{ClausePipeline, ClauseRegistry, ConfidenceScorer, FieldExtractor, PatternMatcher};

const SENTENCES: &[&str] = &[
    "Either party may terminate this Agreement upon 30 days written notice.",
    "This Agreement shall terminate automatically upon the expiration of the Term.",
    "The Client shall pay each invoice within thirty (30) days of receipt.",
    "Late payments shall accrue interest at 1.5% per month.",
    "The Receiving Party shall keep all Confidential Information strictly confidential.",
    "The Receiving Party shall not disclose any Confidential Information to third parties.",
    "This Agreement shall be governed by the laws of the State of Delaware.",
    "In no event shall either party be liable for any consequential damages.",
    "The Supplier shall indemnify and hold harmless the Customer against all claims.",
    "Neither party shall be liable for delays caused by a Force Majeure Event.",
    "The parties met on a sunny Tuesday.",
    "Notices must be sent to the addresses above.",
    "Payment",
    "terminate",
];

const POSITIVE_TERMINATION: &[&str] = &[
    "Either party may terminate this Agreement upon 30 days written notice.",
    "The Company may terminate this Agreement for convenience.",
    "This Agreement shall terminate upon a material breach.",
    "Termination for cause requires written notice.",
];

const NEGATIVE_TERMINATION: &[&str] = &["terminal", "predetermined", "determination", "terminology"];

fn document() -> impl Strategy<Value = String> {
    prop::collection::vec(
        (prop::sample::select(SENTENCES), prop::bool::ANY),
        0..10,
    )
    .prop_map(|parts| {
        let mut text = String::new();
        for (sentence, new_paragraph) in parts {
            if !text.is_empty() {
                text.push_str(if new_paragraph { "\n\n" } else { " " });
            }
            text.push_str(sentence);
        }
        text
    })
}

proptest! {
    #[test]
    fn analysis_is_deterministic(text in document()) {
        let pipeline = ClausePipeline::reference();
        prop_assert_eq!(pipeline.analyze_text(&text), pipeline.analyze_text(&text));
    }

    #[test]
    fn findings_clear_their_threshold(text in document()) {
        let pipeline = ClausePipeline::reference();
        let registry = pipeline.registry();
        for finding in pipeline.analyze_text(&text).findings {
            let clause_type = registry.get(&finding.clause_type).unwrap();
            prop_assert!(finding.confidence >= clause_type.minimum_confidence);
            prop_assert!(finding.confidence <= 1.0);
        }
    }

    #[test]
    fn findings_respect_length_bounds(text in document()) {
        let pipeline = ClausePipeline::reference();
        let registry = pipeline.registry();
        for finding in pipeline.analyze_text(&text).findings {
            let clause_type = registry.get(&finding.clause_type).unwrap();
            let chars = finding.span.text.chars().count();
            prop_assert!(clause_type.min_length <= chars && chars <= clause_type.max_length);
            prop_assert_eq!(&text[finding.span.start..finding.span.end], finding.span.text.as_str());
        }
    }

    #[test]
    fn same_type_findings_do_not_overlap(text in document()) {
        let result = ClausePipeline::reference().analyze_text(&text);
        for pair in result.findings.windows(2) {
            if pair[0].clause_type == pair[1].clause_type {
                prop_assert!(pair[0].span.end <= pair[1].span.start);
            }
        }
    }

    #[test]
    fn arbitrary_text_never_panics(text in "\\PC{0,300}") {
        let result = ClausePipeline::reference().analyze_text(&text);
        prop_assert_eq!(result.metadata.document_length, text.chars().count());
    }

    #[test]
    fn field_extraction_is_idempotent(text in document()) {
        let registry = ClauseRegistry::reference();
        let extractor = FieldExtractor::new();
        for clause_type in registry.clause_types() {
            prop_assert_eq!(
                extractor.extract(&text, clause_type),
                extractor.extract(&text, clause_type)
            );
        }
    }

    #[test]
    fn negative_keywords_strictly_lower_confidence(
        positives in prop::collection::vec(prop::sample::select(POSITIVE_TERMINATION), 1..4),
        negative in prop::sample::select(NEGATIVE_TERMINATION),
    ) {
        let registry = ClauseRegistry::reference();
        let termination = registry.get("termination").unwrap();
        let matcher = PatternMatcher::new();
        let scorer = ConfidenceScorer::new();

        let clean = positives.join(" ");
        let penalized = format!("{} See the {} schedule.", clean, negative);

        let clean_score = scorer.score(&matcher.scan(&clean, termination), termination);
        let penalized_score = scorer.score(&matcher.scan(&penalized, termination), termination);

        prop_assert!(clean_score.confidence > 0.0);
        prop_assert!(penalized_score.confidence < clean_score.confidence);
    }
}
