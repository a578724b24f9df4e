//! Declarative clause configuration schema.
//!
//! This is the persisted, versioned shape of a clause configuration. It is
//! deliberately dumb: every field is plain data and nothing is compiled here.
//! [`crate::ClauseRegistry::load`] validates a [`ConfigDocument`] and compiles
//! it into [`crate::ClauseTypeConfig`] values.
//!
//! Clause types and output fields are kept in declaration order, which is the
//! order the pipeline evaluates them in.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// A full clause configuration document.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigDocument {
    /// Settings shared by every clause type.
    #[serde(default)]
    pub global_config: GlobalSettings,
    /// Clause type id -> definition, in evaluation order.
    pub clause_types: OrderedMap<ClauseTypeDefinition>,
}

/// Settings shared by every clause type unless overridden.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalSettings {
    /// Match keywords and patterns case-sensitively.
    pub case_sensitive: bool,
    /// Shortest accepted clause text, in characters.
    pub minimum_clause_length: usize,
    /// Longest accepted clause text, in characters.
    pub maximum_clause_length: usize,
    /// Accepted regions whose overlap ratio exceeds this are merged.
    pub overlap_threshold: f64,
    /// Presence bonus for each additional distinct pattern matched.
    pub pattern_diversity_bonus: f64,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            minimum_clause_length: 50,
            maximum_clause_length: 5000,
            overlap_threshold: 0.5,
            pattern_diversity_bonus: 0.1,
        }
    }
}

/// Definition of one clause type.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClauseTypeDefinition {
    /// Human-readable name ("Termination", "Payment Terms").
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub keywords: KeywordSets,
    /// Corroborating phrases that commonly surround this clause type.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context_clues: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<PatternDefinition>,
    #[serde(default)]
    pub output_fields: OrderedMap<FieldDefinition>,
    #[serde(default)]
    pub confidence_weights: ConfidenceWeights,
    /// Required; kept optional here so a missing value is reported as a
    /// configuration error rather than a parse error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_confidence_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_sensitive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_clause_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_clause_length: Option<usize>,
}

/// Keyword lexicons for one clause type.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeywordSets {
    pub primary: Vec<String>,
    pub secondary: Vec<String>,
    /// Keywords that count against the clause type.
    pub negative: Vec<String>,
}

/// A weighted pattern. Exactly one of `regex` and `phrase` must be set.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    /// Plain text compiled to a whitespace/punctuation tolerant regex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phrase: Option<String>,
    /// Declared contribution in `[0, 1]`.
    pub weight: f64,
    #[serde(default)]
    pub description: String,
}

/// An output field extracted from an accepted clause span.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDefinition {
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_keywords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Coefficient applied to each signal kind's normalized presence.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfidenceWeights {
    pub primary_keyword: f64,
    pub secondary_keyword: f64,
    pub pattern: f64,
    pub context_clue: f64,
    /// Penalty coefficient.
    pub negative_keyword: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            primary_keyword: 0.4,
            secondary_keyword: 0.2,
            pattern: 0.3,
            context_clue: 0.1,
            negative_keyword: 0.5,
        }
    }
}

impl ConfidenceWeights {
    /// Named coefficients, for validation and reporting.
    pub fn named(&self) -> [(&'static str, f64); 5] {
        [
            ("primary_keyword", self.primary_keyword),
            ("secondary_keyword", self.secondary_keyword),
            ("pattern", self.pattern),
            ("context_clue", self.context_clue),
            ("negative_keyword", self.negative_keyword),
        ]
    }
}

// ============================================================================
// Ordered map
// ============================================================================

/// A string-keyed map that preserves declaration order.
///
/// Deserializes from any self-describing map (JSON object, TOML table) and
/// rejects duplicate keys.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<T> {
    entries: Vec<(String, T)>,
}

impl<T> Default for OrderedMap<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> OrderedMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing (in place) any existing value for `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: T) -> Option<T> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> FromIterator<(String, T)> for OrderedMap<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<T: Serialize> Serialize for OrderedMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct OrderedMapVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<T> {
    type Value = OrderedMap<T>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map with unique string keys")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries: Vec<(String, T)> = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, T>()? {
            if entries.iter().any(|(k, _)| *k == key) {
                return Err(de::Error::custom(format!("duplicate key `{}`", key)));
            }
            entries.push((key, value));
        }
        Ok(OrderedMap { entries })
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for OrderedMap<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}
