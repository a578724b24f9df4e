//! Sentence and paragraph segmentation over raw document text.
//!
//! A sentence ends at `.`, `?` or `!` (optionally followed by closing quotes or
//! brackets) when whitespace and then an uppercase letter follow, possibly
//! behind an opening quote or bracket, or when a line break and then a digit
//! follow. Abbreviations such as "Inc." or "U.S."
//! are not boundaries. A blank line always ends both a sentence and a
//! paragraph.
//!
//! All ranges are byte offsets into the segmented text.

use std::collections::HashSet;
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\r?\n(?:[ \t]*\r?\n)+").expect("valid paragraph regex"));

static TERMINATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[.!?]+["'”’)\]]*\s+"#).expect("valid sentence terminator regex")
});

const OPENERS: &[char] = &['"', '\'', '“', '‘', '(', '['];

/// Sentence and paragraph ranges of one text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextLayout {
    /// Sentences in document order, trimmed of surrounding whitespace.
    pub sentences: Vec<Range<usize>>,
    /// Paragraphs in document order, trimmed of surrounding whitespace.
    pub paragraphs: Vec<Range<usize>>,
}

impl TextLayout {
    /// Index of the paragraph containing (or last starting before) `offset`.
    pub fn paragraph_index(&self, offset: usize) -> usize {
        self.paragraphs
            .iter()
            .rposition(|p| p.start <= offset)
            .unwrap_or(0)
    }

    /// Index of the sentence containing (or last starting before) `offset`.
    pub fn sentence_index(&self, offset: usize) -> Option<usize> {
        if self.sentences.is_empty() {
            return None;
        }
        let preceding = self.sentences.partition_point(|s| s.start <= offset);
        Some(preceding.saturating_sub(1))
    }

    /// Byte range covering the sentences `indices`, or `None` when the run
    /// is empty or out of bounds.
    pub fn sentence_span(&self, indices: Range<usize>) -> Option<Range<usize>> {
        let first = self.sentences.get(indices.start)?;
        let last = self.sentences.get(indices.end.checked_sub(1)?)?;
        (indices.start < indices.end).then(|| first.start..last.end)
    }

    /// The text of every sentence, for debugging and tests.
    pub fn sentence_texts<'t>(&self, text: &'t str) -> Vec<&'t str> {
        self.sentences.iter().map(|s| &text[s.clone()]).collect()
    }
}

/// Splits document text into sentences and paragraphs.
#[derive(Debug, Clone)]
pub struct SentenceSegmenter {
    abbreviations: HashSet<String>,
}

impl SentenceSegmenter {
    pub fn new() -> Self {
        // Abbreviations that should NOT be treated as sentence boundaries
        let common_abbrevs = [
            "dr", "mr", "mrs", "ms", "prof", "sr", "jr",
            "inc", "ltd", "corp", "co", "llc",
            "e.g", "i.e", "vs", "etc", "approx",
            "u.s", "u.k", "p.m", "a.m",
            "st", "ave", "blvd", "dept", "fig",
            "no", "art", "sec", "para", "cl",
        ];

        SentenceSegmenter {
            abbreviations: common_abbrevs.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn with_custom_abbreviations(mut self, abbreviations: &[&str]) -> Self {
        for abbrev in abbreviations {
            self.abbreviations
                .insert(abbrev.trim_end_matches('.').to_lowercase());
        }
        self
    }

    fn is_abbreviation(&self, word: &str) -> bool {
        let normalized = word
            .trim_start_matches(|c: char| !c.is_alphanumeric())
            .trim_end_matches('.')
            .to_lowercase();
        self.abbreviations.contains(&normalized)
    }

    /// Segment `text` into paragraphs and sentences.
    pub fn layout(&self, text: &str) -> TextLayout {
        let mut layout = TextLayout::default();
        let mut cursor = 0;
        for separator in PARAGRAPH_BREAK.find_iter(text) {
            self.push_paragraph(text, cursor..separator.start(), &mut layout);
            cursor = separator.end();
        }
        self.push_paragraph(text, cursor..text.len(), &mut layout);
        layout
    }

    fn push_paragraph(&self, text: &str, range: Range<usize>, layout: &mut TextLayout) {
        let Some(paragraph) = trim_range(text, range) else {
            return;
        };
        layout.paragraphs.push(paragraph.clone());

        let body = &text[paragraph.clone()];
        let mut sentence_start = 0;
        for terminator in TERMINATOR.find_iter(body) {
            let rest = &body[terminator.end()..];
            let next = rest.trim_start_matches(OPENERS).chars().next();
            let line_break = terminator.as_str().contains('\n');
            // A numbered section starting on a new line opens a sentence too.
            if !next.map_or(false, |c| c.is_uppercase() || (line_break && c.is_ascii_digit())) {
                continue;
            }
            let preceding = body[sentence_start..terminator.start()]
                .split_whitespace()
                .last()
                .unwrap_or("");
            if body[terminator.start()..].starts_with('.') && self.is_abbreviation(preceding) {
                continue;
            }

            let end = terminator.start() + terminator.as_str().trim_end().len();
            if let Some(sentence) =
                trim_range(text, paragraph.start + sentence_start..paragraph.start + end)
            {
                layout.sentences.push(sentence);
            }
            sentence_start = terminator.end();
        }
        if let Some(sentence) = trim_range(text, paragraph.start + sentence_start..paragraph.end) {
            layout.sentences.push(sentence);
        }
    }
}

impl Default for SentenceSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

fn trim_range(text: &str, range: Range<usize>) -> Option<Range<usize>> {
    let slice = &text[range.clone()];
    let trimmed = slice.trim_start();
    let start = range.start + (slice.len() - trimmed.len());
    let end = start + trimmed.trim_end().len();
    (start < end).then(|| start..end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentences(text: &str) -> Vec<&str> {
        SentenceSegmenter::new().layout(text).sentence_texts(text)
    }

    #[test]
    fn test_simple_period() {
        insta::assert_debug_snapshot!(sentences("Hello world. Goodbye."), @r###"
        [
            "Hello world.",
            "Goodbye.",
        ]
        "###);
    }

    #[test]
    fn test_question_and_exclamation() {
        assert_eq!(
            sentences("How are you? Stop! Wait for me."),
            vec!["How are you?", "Stop!", "Wait for me."]
        );
    }

    #[test]
    fn test_abbreviation_filtering() {
        assert_eq!(
            sentences("Acme Inc. shall pay. Dr. Smith agrees."),
            vec!["Acme Inc. shall pay.", "Dr. Smith agrees."]
        );
        assert_eq!(
            sentences("The U.S. Courts shall decide. Then we part."),
            vec!["The U.S. Courts shall decide.", "Then we part."]
        );
    }

    #[test]
    fn test_custom_abbreviation() {
        let text = "See Sched. A for details. It is attached.";
        assert_eq!(sentences(text).len(), 3);
        let custom = SentenceSegmenter::new()
            .with_custom_abbreviations(&["Sched."])
            .layout(text)
            .sentence_texts(text);
        assert_eq!(custom, vec!["See Sched. A for details.", "It is attached."]);
    }

    #[test]
    fn test_lowercase_following_is_not_a_boundary() {
        assert_eq!(
            sentences("the fee is 5.5 percent. after that, nothing."),
            vec!["the fee is 5.5 percent. after that, nothing."]
        );
    }

    #[test]
    fn test_numbered_line_starts_sentence() {
        assert_eq!(
            sentences("Notice is due.\n2. General terms apply. See clause 3. below."),
            vec!["Notice is due.", "2.", "General terms apply.", "See clause 3. below."]
        );
    }

    #[test]
    fn test_quoted_sentence_start() {
        assert_eq!(
            sentences(r#"It ends here. "Affiliate" means any entity."#),
            vec!["It ends here.", r#""Affiliate" means any entity."#]
        );
    }

    #[test]
    fn test_paragraph_break_ends_sentence() {
        let text = "First clause without a period\n\n  Second clause.\n";
        let layout = SentenceSegmenter::new().layout(text);
        assert_eq!(layout.paragraphs.len(), 2);
        assert_eq!(
            layout.sentence_texts(text),
            vec!["First clause without a period", "Second clause."]
        );
        assert_eq!(layout.paragraph_index(text.find("Second").unwrap()), 1);
        assert_eq!(layout.paragraph_index(0), 0);
    }

    #[test]
    fn test_sentence_index() {
        let text = "Intro here. Either party may terminate now. Closing words.";
        let layout = SentenceSegmenter::new().layout(text);
        assert_eq!(layout.sentence_index(0), Some(0));
        assert_eq!(layout.sentence_index(text.find("terminate").unwrap()), Some(1));
        // Whitespace between sentences belongs to the earlier one.
        assert_eq!(layout.sentence_index(11), Some(0));
        assert_eq!(layout.sentence_index(text.len()), Some(2));
    }

    #[test]
    fn test_sentence_span() {
        let text = "Intro here. Either party may terminate. Notice is due. Closing words.";
        let layout = SentenceSegmenter::new().layout(text);
        assert_eq!(
            &text[layout.sentence_span(1..3).unwrap()],
            "Either party may terminate. Notice is due."
        );
        assert_eq!(layout.sentence_span(2..2), None);
        assert_eq!(layout.sentence_span(3..5), None);
    }

    #[test]
    fn test_empty_text() {
        let layout = SentenceSegmenter::new().layout("  \n\n ");
        assert!(layout.sentences.is_empty());
        assert!(layout.paragraphs.is_empty());
        assert_eq!(layout.sentence_index(1), None);
    }
}
