//! Compilation of keywords and plain-text phrases into regexes.

use regex::{Regex, RegexBuilder};

/// Punctuation made optional in phrase patterns.
const OPTIONAL_PUNCTUATION: &[char] = &['.', ',', ';', ':', '-', '!'];

/// A configured keyword and its compiled matcher.
#[derive(Debug, Clone)]
pub struct KeywordRule {
    /// The keyword as configured.
    pub text: String,
    pub regex: Regex,
}

impl KeywordRule {
    pub fn compile(text: &str, case_sensitive: bool) -> Result<Self, regex::Error> {
        Ok(Self {
            text: text.to_string(),
            regex: keyword_regex(text, case_sensitive)?,
        })
    }
}

/// Compile a keyword into a regex matching it as whole words.
///
/// Internal whitespace matches any whitespace run, so a keyword still matches
/// across the line wraps of extracted document text. Straight and curly
/// quotes match each other, as do hyphens and en or em dashes.
pub fn keyword_regex(keyword: &str, case_sensitive: bool) -> Result<Regex, regex::Error> {
    let body = keyword
        .split_whitespace()
        .map(|word| word_pattern(word, &[]))
        .collect::<Vec<_>>()
        .join(r"\s+");
    build(&with_word_boundaries(keyword, body), case_sensitive)
}

/// Compile a phrase into a tolerant regex.
///
/// Whitespace is flexible and `. , ; : - !` are optional, so
/// "non-disclosure agreement" also matches "nondisclosure  agreement".
/// Quotes and dashes fold as in [`keyword_regex`].
pub fn phrase_regex(phrase: &str, case_sensitive: bool) -> Result<Regex, regex::Error> {
    let body = phrase
        .split_whitespace()
        .map(|word| word_pattern(word, OPTIONAL_PUNCTUATION))
        .collect::<Vec<_>>()
        .join(r"\s+");
    build(&with_word_boundaries(phrase, body), case_sensitive)
}

/// Escape `word` character by character, folding typographic variants.
fn word_pattern(word: &str, optional: &[char]) -> String {
    let mut out = String::new();
    for c in word.chars() {
        match typographic_class(c) {
            Some(class) => out.push_str(class),
            None => {
                let mut buf = [0u8; 4];
                out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
            }
        }
        if optional.contains(&c) {
            out.push('?');
        }
    }
    out
}

fn typographic_class(c: char) -> Option<&'static str> {
    match c {
        '\'' | '‘' | '’' => Some("['‘’]"),
        '"' | '“' | '”' => Some(r#"["“”]"#),
        '-' | '–' | '—' => Some(r"[\-–—]"),
        _ => None,
    }
}

/// Compile a user-supplied regex with the clause type's case setting.
pub fn pattern_regex(pattern: &str, case_sensitive: bool) -> Result<Regex, regex::Error> {
    build(pattern, case_sensitive)
}

fn with_word_boundaries(source: &str, body: String) -> String {
    let trimmed = source.trim();
    let starts_word = trimmed.chars().next().map_or(false, char::is_alphanumeric);
    let ends_word = trimmed.chars().last().map_or(false, char::is_alphanumeric);
    format!(
        "{}{}{}",
        if starts_word { r"\b" } else { "" },
        body,
        if ends_word { r"\b" } else { "" }
    )
}

fn build(pattern: &str, case_sensitive: bool) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .build()
}
