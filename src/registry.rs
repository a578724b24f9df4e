//! Clause type registry: validated, compiled clause configuration.
//!
//! A [`ClauseRegistry`] is built once from a [`ConfigDocument`] and is
//! immutable afterwards. Every regex (patterns, keywords, field extractors) is
//! compiled during [`ClauseRegistry::load`], so a malformed configuration
//! fails there, once, instead of while a document is being analyzed.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use crate::config::{
    ClauseTypeDefinition, ConfidenceWeights, ConfigDocument, FieldDefinition, GlobalSettings,
    PatternDefinition,
};
use crate::error::{ConfigError, ConfigResult, ExtractionError};
use crate::lexicon::{pattern_regex, phrase_regex, KeywordRule};

const REFERENCE_LEXICON: &str = include_str!("../config/reference_lexicon.json");

static REFERENCE: Lazy<Arc<ClauseRegistry>> = Lazy::new(|| {
    Arc::new(
        ClauseRegistry::from_json_str(REFERENCE_LEXICON)
            .expect("built-in reference lexicon is valid"),
    )
});

/// A compiled, weighted pattern.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub regex: Regex,
    /// The configured regex or phrase.
    pub source: String,
    pub weight: f64,
    pub description: String,
}

/// How an output field is extracted.
#[derive(Debug, Clone)]
pub enum FieldExtraction {
    /// First match of the regex; its first participating group if any.
    Pattern(Regex),
    /// First configured keyword found in the span.
    Keywords(Vec<KeywordRule>),
    /// Documented but never populated automatically.
    Informational,
}

/// A compiled output field rule.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub name: String,
    pub description: String,
    pub extraction: FieldExtraction,
    pub required: bool,
}

impl FieldRule {
    /// Compile a field definition for `clause_type`.
    pub fn compile(
        clause_type: &str,
        name: &str,
        definition: &FieldDefinition,
        case_sensitive: bool,
    ) -> ConfigResult<Self> {
        let extraction = match (
            &definition.extraction_pattern,
            &definition.extraction_keywords,
        ) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::AmbiguousFieldRule {
                    clause_type: clause_type.to_string(),
                    field: name.to_string(),
                })
            }
            (Some(pattern), None) => {
                let regex = pattern_regex(pattern, case_sensitive).map_err(|e| ExtractionError {
                    clause_type: clause_type.to_string(),
                    field: name.to_string(),
                    message: e.to_string(),
                })?;
                FieldExtraction::Pattern(regex)
            }
            (None, Some(keywords)) if !keywords.is_empty() => FieldExtraction::Keywords(
                compile_keywords(clause_type, keywords, case_sensitive)?,
            ),
            _ if definition.required => {
                return Err(ConfigError::RequiredFieldWithoutRule {
                    clause_type: clause_type.to_string(),
                    field: name.to_string(),
                })
            }
            _ => FieldExtraction::Informational,
        };

        Ok(Self {
            name: name.to_string(),
            description: definition.description.clone(),
            extraction,
            required: definition.required,
        })
    }
}

/// A validated clause type, shared read-only by every analysis.
#[derive(Debug, Clone)]
pub struct ClauseTypeConfig {
    pub id: String,
    pub display_name: String,
    pub primary_keywords: Vec<KeywordRule>,
    pub secondary_keywords: Vec<KeywordRule>,
    pub negative_keywords: Vec<KeywordRule>,
    pub context_clues: Vec<KeywordRule>,
    /// Patterns in configured order.
    pub patterns: Vec<PatternRule>,
    pub fields: Vec<FieldRule>,
    pub weights: ConfidenceWeights,
    pub minimum_confidence: f64,
    pub case_sensitive: bool,
    /// Clause text length bounds, in characters.
    pub min_length: usize,
    pub max_length: usize,
    pub overlap_threshold: f64,
    pub pattern_diversity_bonus: f64,
}

impl ClauseTypeConfig {
    /// Validate and compile one clause type definition.
    pub fn compile(
        id: &str,
        definition: &ClauseTypeDefinition,
        global: &GlobalSettings,
    ) -> ConfigResult<Self> {
        let scope = format!("clause type `{}`", id);

        let minimum_confidence =
            definition
                .minimum_confidence_threshold
                .ok_or_else(|| ConfigError::MissingThreshold {
                    clause_type: id.to_string(),
                })?;
        check_unit(&scope, "minimum_confidence_threshold", minimum_confidence)?;

        for (name, value) in definition.confidence_weights.named() {
            check_unit(&scope, &format!("confidence_weights.{}", name), value)?;
        }

        let case_sensitive = definition.case_sensitive.unwrap_or(global.case_sensitive);
        let min_length = definition
            .minimum_clause_length
            .unwrap_or(global.minimum_clause_length);
        let max_length = definition
            .maximum_clause_length
            .unwrap_or(global.maximum_clause_length);
        if min_length > max_length {
            return Err(ConfigError::LengthBounds {
                scope,
                min: min_length,
                max: max_length,
            });
        }

        let patterns = definition
            .patterns
            .iter()
            .enumerate()
            .map(|(index, pattern)| compile_pattern(id, index, pattern, case_sensitive))
            .collect::<ConfigResult<Vec<_>>>()?;

        let fields = definition
            .output_fields
            .iter()
            .map(|(name, field)| FieldRule::compile(id, name, field, case_sensitive))
            .collect::<ConfigResult<Vec<_>>>()?;

        let config = Self {
            id: id.to_string(),
            display_name: definition.display_name.clone(),
            primary_keywords: compile_keywords(id, &definition.keywords.primary, case_sensitive)?,
            secondary_keywords: compile_keywords(
                id,
                &definition.keywords.secondary,
                case_sensitive,
            )?,
            negative_keywords: compile_keywords(id, &definition.keywords.negative, case_sensitive)?,
            context_clues: compile_keywords(id, &definition.context_clues, case_sensitive)?,
            patterns,
            fields,
            weights: definition.confidence_weights,
            minimum_confidence,
            case_sensitive,
            min_length,
            max_length,
            overlap_threshold: global.overlap_threshold,
            pattern_diversity_bonus: global.pattern_diversity_bonus,
        };

        if config.primary_keywords.is_empty() && config.patterns.is_empty() {
            warn!(
                clause_type = id,
                "clause type has no primary keywords or patterns and can never be detected"
            );
        }

        Ok(config)
    }

    /// Whether a confidence clears this clause type's threshold.
    pub fn accepts(&self, confidence: f64) -> bool {
        confidence >= self.minimum_confidence
    }

    /// Whether a clause text of `chars` characters is within length bounds.
    pub fn length_in_bounds(&self, chars: usize) -> bool {
        self.min_length <= chars && chars <= self.max_length
    }
}

fn check_unit(scope: &str, field: &str, value: f64) -> ConfigResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            scope: scope.to_string(),
            field: field.to_string(),
            value,
        })
    }
}

fn compile_pattern(
    clause_type: &str,
    index: usize,
    pattern: &PatternDefinition,
    case_sensitive: bool,
) -> ConfigResult<PatternRule> {
    check_unit(
        &format!("clause type `{}`", clause_type),
        &format!("patterns[{}].weight", index),
        pattern.weight,
    )?;

    let (source, compiled) = match (&pattern.regex, &pattern.phrase) {
        (Some(regex), None) => (regex, pattern_regex(regex, case_sensitive)),
        (None, Some(phrase)) => (phrase, phrase_regex(phrase, case_sensitive)),
        _ => {
            return Err(ConfigError::PatternSource {
                clause_type: clause_type.to_string(),
                index,
            })
        }
    };
    let regex = compiled.map_err(|e| ConfigError::InvalidPattern {
        clause_type: clause_type.to_string(),
        index,
        message: e.to_string(),
    })?;

    Ok(PatternRule {
        regex,
        source: source.clone(),
        weight: pattern.weight,
        description: pattern.description.clone(),
    })
}

/// Compile a keyword list, skipping blanks and repeated entries.
fn compile_keywords(
    clause_type: &str,
    keywords: &[String],
    case_sensitive: bool,
) -> ConfigResult<Vec<KeywordRule>> {
    let mut seen = HashSet::new();
    let mut rules = Vec::with_capacity(keywords.len());
    for keyword in keywords {
        let trimmed = keyword.trim();
        if trimmed.is_empty() {
            continue;
        }
        let key = if case_sensitive {
            trimmed.to_string()
        } else {
            trimmed.to_lowercase()
        };
        if !seen.insert(key) {
            continue;
        }
        let rule =
            KeywordRule::compile(trimmed, case_sensitive).map_err(|e| ConfigError::InvalidKeyword {
                clause_type: clause_type.to_string(),
                keyword: trimmed.to_string(),
                message: e.to_string(),
            })?;
        rules.push(rule);
    }
    Ok(rules)
}

// ============================================================================
// Registry
// ============================================================================

/// The loaded set of clause types, in evaluation order.
#[derive(Debug, Clone)]
pub struct ClauseRegistry {
    document: ConfigDocument,
    clause_types: Vec<ClauseTypeConfig>,
}

impl ClauseRegistry {
    /// Validate and compile a configuration document.
    pub fn load(document: ConfigDocument) -> ConfigResult<Self> {
        let global = &document.global_config;
        check_unit("global_config", "overlap_threshold", global.overlap_threshold)?;
        check_unit(
            "global_config",
            "pattern_diversity_bonus",
            global.pattern_diversity_bonus,
        )?;
        if global.minimum_clause_length > global.maximum_clause_length {
            return Err(ConfigError::LengthBounds {
                scope: "global_config".to_string(),
                min: global.minimum_clause_length,
                max: global.maximum_clause_length,
            });
        }

        let clause_types = document
            .clause_types
            .iter()
            .map(|(id, definition)| ClauseTypeConfig::compile(id, definition, global))
            .collect::<ConfigResult<Vec<_>>>()?;

        info!(
            clause_types = clause_types.len(),
            ids = ?clause_types.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
            "loaded clause registry"
        );

        Ok(Self {
            document,
            clause_types,
        })
    }

    /// Parse and load a JSON configuration.
    pub fn from_json_str(source: &str) -> ConfigResult<Self> {
        let document = serde_json::from_str(source).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        Self::load(document)
    }

    /// Parse and load a TOML configuration.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let document = toml::from_str(source).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        Self::load(document)
    }

    /// Load a configuration file; `.toml` files are TOML, anything else JSON.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            _ => Self::from_json_str(&content),
        }
    }

    /// The built-in reference lexicon, compiled once per process.
    pub fn reference() -> Arc<ClauseRegistry> {
        Arc::clone(&*REFERENCE)
    }

    /// Clause types in evaluation order.
    pub fn clause_types(&self) -> &[ClauseTypeConfig] {
        &self.clause_types
    }

    pub fn get(&self, id: &str) -> Option<&ClauseTypeConfig> {
        self.clause_types.iter().find(|c| c.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.clause_types.iter().map(|c| c.id.as_str())
    }

    pub fn settings(&self) -> &GlobalSettings {
        &self.document.global_config
    }

    /// The document this registry was loaded from.
    pub fn to_document(&self) -> &ConfigDocument {
        &self.document
    }

    /// Serialize the source document back to JSON.
    pub fn to_json_string(&self) -> ConfigResult<String> {
        serde_json::to_string_pretty(&self.document).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.clause_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clause_types.is_empty()
    }
}

/// Process-wide registry slot.
///
/// Readers take an `Arc` snapshot that stays valid for the whole analysis;
/// [`RegistryHandle::reload`] is the only mutation and never disturbs
/// analyses already holding a snapshot.
#[derive(Debug)]
pub struct RegistryHandle {
    current: RwLock<Arc<ClauseRegistry>>,
}

impl RegistryHandle {
    pub fn new(registry: Arc<ClauseRegistry>) -> Self {
        Self {
            current: RwLock::new(registry),
        }
    }

    /// Snapshot of the current registry.
    pub fn current(&self) -> Arc<ClauseRegistry> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&*guard)
    }

    /// Replace the registry, returning the previous one.
    pub fn reload(&self, registry: Arc<ClauseRegistry>) -> Arc<ClauseRegistry> {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        info!(clause_types = registry.len(), "reloading clause registry");
        std::mem::replace(&mut *guard, registry)
    }

    /// Load a configuration file and swap it in. On error the current
    /// registry stays in place.
    pub fn reload_from_path(&self, path: &Path) -> ConfigResult<Arc<ClauseRegistry>> {
        let registry = Arc::new(ClauseRegistry::from_path(path)?);
        self.reload(Arc::clone(&registry));
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn minimal(extra: &str) -> String {
        format!(
            r#"{{ "clause_types": {{ "termination": {{
                "display_name": "Termination",
                "keywords": {{ "primary": ["terminate"] }}
                {}
            }} }} }}"#,
            extra
        )
    }

    #[test]
    fn reference_lexicon_loads() {
        let registry = ClauseRegistry::reference();
        let ids: Vec<_> = registry.ids().collect();
        assert_eq!(
            ids,
            vec![
                "termination",
                "payment_terms",
                "confidentiality",
                "governing_law",
                "limitation_of_liability",
                "indemnification",
                "force_majeure",
            ]
        );
    }

    #[test]
    fn missing_threshold_is_rejected() {
        let err = ClauseRegistry::from_json_str(&minimal("")).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingThreshold { ref clause_type } if clause_type == "termination"
        ));
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        let err = ClauseRegistry::from_json_str(&minimal(
            r#", "minimum_confidence_threshold": 1.5"#,
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { ref field, .. } if field == "minimum_confidence_threshold"));
    }

    #[test]
    fn weight_coefficient_out_of_range_is_rejected() {
        let err = ClauseRegistry::from_json_str(&minimal(
            r#", "minimum_confidence_threshold": 0.5,
                 "confidence_weights": { "pattern": -0.1 }"#,
        ))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "clause type `termination`: confidence_weights.pattern = -0.1 is outside [0, 1]"
        );
    }

    #[test]
    fn pattern_weight_out_of_range_is_rejected() {
        let err = ClauseRegistry::from_json_str(&minimal(
            r#", "minimum_confidence_threshold": 0.5,
                 "patterns": [{ "regex": "terminate", "weight": 2.0 }]"#,
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { ref field, .. } if field == "patterns[0].weight"));
    }

    #[test]
    fn invalid_pattern_regex_is_rejected() {
        let err = ClauseRegistry::from_json_str(&minimal(
            r#", "minimum_confidence_threshold": 0.5,
                 "patterns": [{ "regex": "(unclosed", "weight": 0.5 }]"#,
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { index: 0, .. }));
    }

    #[test]
    fn pattern_needs_exactly_one_source() {
        let err = ClauseRegistry::from_json_str(&minimal(
            r#", "minimum_confidence_threshold": 0.5,
                 "patterns": [{ "regex": "a", "phrase": "a", "weight": 0.5 }]"#,
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::PatternSource { index: 0, .. }));

        let err = ClauseRegistry::from_json_str(&minimal(
            r#", "minimum_confidence_threshold": 0.5,
                 "patterns": [{ "weight": 0.5 }]"#,
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::PatternSource { index: 0, .. }));
    }

    #[test]
    fn required_field_without_rule_is_rejected() {
        let err = ClauseRegistry::from_json_str(&minimal(
            r#", "minimum_confidence_threshold": 0.5,
                 "output_fields": { "notice_period": { "required": true } }"#,
        ))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::RequiredFieldWithoutRule { ref field, .. } if field == "notice_period"
        ));
    }

    #[test]
    fn optional_field_without_rule_is_informational() {
        let registry = ClauseRegistry::from_json_str(&minimal(
            r#", "minimum_confidence_threshold": 0.5,
                 "output_fields": { "survival": { "description": "What survives" } }"#,
        ))
        .unwrap();
        let field = &registry.get("termination").unwrap().fields[0];
        assert!(matches!(field.extraction, FieldExtraction::Informational));
    }

    #[test]
    fn field_with_both_rules_is_rejected() {
        let err = ClauseRegistry::from_json_str(&minimal(
            r#", "minimum_confidence_threshold": 0.5,
                 "output_fields": { "kind": {
                     "extraction_pattern": "for (cause)",
                     "extraction_keywords": ["for cause"]
                 } }"#,
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::AmbiguousFieldRule { .. }));
    }

    #[test]
    fn malformed_field_regex_is_an_extraction_error() {
        let err = ClauseRegistry::from_json_str(&minimal(
            r#", "minimum_confidence_threshold": 0.5,
                 "output_fields": { "notice_period": { "extraction_pattern": "(\\d+" } }"#,
        ))
        .unwrap_err();
        match err {
            ConfigError::Extraction(e) => {
                assert_eq!(e.clause_type, "termination");
                assert_eq!(e.field, "notice_period");
            }
            other => panic!("expected extraction error, got {:?}", other),
        }
    }

    #[test]
    fn inverted_length_bounds_are_rejected() {
        let err = ClauseRegistry::from_json_str(&minimal(
            r#", "minimum_confidence_threshold": 0.5,
                 "minimum_clause_length": 100, "maximum_clause_length": 10"#,
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::LengthBounds { min: 100, max: 10, .. }));
    }

    #[test]
    fn overrides_take_precedence_over_global_settings() {
        let registry = ClauseRegistry::from_json_str(&minimal(
            r#", "minimum_confidence_threshold": 0.5,
                 "case_sensitive": true, "minimum_clause_length": 10"#,
        ))
        .unwrap();
        let clause = registry.get("termination").unwrap();
        assert!(clause.case_sensitive);
        assert_eq!(clause.min_length, 10);
        assert_eq!(clause.max_length, GlobalSettings::default().maximum_clause_length);
    }

    #[test]
    fn repeated_keywords_are_compiled_once() {
        let registry = ClauseRegistry::from_json_str(
            r#"{ "clause_types": { "termination": {
                "display_name": "Termination",
                "keywords": { "primary": ["terminate", "Terminate", " ", "termination"] },
                "minimum_confidence_threshold": 0.5
            } } }"#,
        )
        .unwrap();
        let texts: Vec<_> = registry.get("termination").unwrap().primary_keywords
            .iter()
            .map(|k| k.text.as_str())
            .collect();
        assert_eq!(texts, vec!["terminate", "termination"]);
    }

    #[test]
    fn json_round_trip_is_lossless() {
        let registry = ClauseRegistry::reference();
        let json = registry.to_json_string().unwrap();
        let reloaded = ClauseRegistry::from_json_str(&json).unwrap();
        assert_eq!(reloaded.to_document(), registry.to_document());
    }

    #[test]
    fn loads_toml_from_path() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
            [global_config]
            minimum_clause_length = 20

            [clause_types.governing_law]
            display_name = "Governing Law"
            minimum_confidence_threshold = 0.4

            [clause_types.governing_law.keywords]
            primary = ["governing law", "governed by"]

            [[clause_types.governing_law.patterns]]
            regex = 'governed\s+by\s+the\s+laws\s+of'
            weight = 0.9
            description = "governing law designation"
            "#
        )
        .unwrap();

        let registry = ClauseRegistry::from_path(file.path()).unwrap();
        let clause = registry.get("governing_law").unwrap();
        assert_eq!(clause.min_length, 20);
        assert_eq!(clause.patterns.len(), 1);
        assert_eq!(clause.primary_keywords.len(), 2);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = ClauseRegistry::from_path(Path::new("/nonexistent/clauses.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn reload_swaps_registry_and_keeps_old_snapshots() {
        let handle = RegistryHandle::new(ClauseRegistry::reference());
        let before = handle.current();

        let replacement = Arc::new(
            ClauseRegistry::from_json_str(&minimal(r#", "minimum_confidence_threshold": 0.5"#))
                .unwrap(),
        );
        let previous = handle.reload(replacement);

        assert_eq!(previous.len(), before.len());
        assert_eq!(before.len(), 7);
        assert_eq!(handle.current().len(), 1);
    }

    #[test]
    fn failed_reload_keeps_current_registry() {
        let handle = RegistryHandle::new(ClauseRegistry::reference());
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{}", minimal("")).unwrap();

        assert!(handle.reload_from_path(file.path()).is_err());
        assert_eq!(handle.current().len(), 7);
    }
}
