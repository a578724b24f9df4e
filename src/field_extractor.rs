//! Structured field extraction from an accepted clause span.

use std::collections::BTreeMap;

use crate::registry::{ClauseTypeConfig, FieldExtraction, FieldRule};

/// Extracts the declared output fields of a clause type from span text.
///
/// Only the span is searched, never the surrounding document. A field whose
/// rule finds nothing is left out of the mapping; informational fields are
/// never populated.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldExtractor;

impl FieldExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(
        &self,
        span_text: &str,
        clause_type: &ClauseTypeConfig,
    ) -> BTreeMap<String, String> {
        clause_type
            .fields
            .iter()
            .filter_map(|rule| {
                extract_field(span_text, rule).map(|value| (rule.name.clone(), value))
            })
            .collect()
    }
}

fn extract_field(span_text: &str, rule: &FieldRule) -> Option<String> {
    let value = match &rule.extraction {
        FieldExtraction::Pattern(regex) => {
            let captures = regex.captures(span_text)?;
            // First participating group, else the whole match.
            let found = captures
                .iter()
                .skip(1)
                .flatten()
                .next()
                .or_else(|| captures.get(0))?;
            found.as_str().trim().to_string()
        }
        FieldExtraction::Keywords(keywords) => keywords
            .iter()
            .find(|k| k.regex.is_match(span_text))
            .map(|k| k.text.clone())?,
        FieldExtraction::Informational => return None,
    };
    (!value.is_empty()).then(|| value)
}
