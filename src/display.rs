use std::fmt::{self, Write};

use crate::pipeline::{AnalysisResult, ClauseFinding};

/// Plain-text rendering of an [`AnalysisResult`] for debugging and snapshots.
///
/// ```text
/// termination (Termination) conf: 0.74 @ 0..70
///   Either party may terminate this Agreement upon 30 days written notice.
///   ╰pattern "may terminate this Agreement" (party right to terminate the agreement)
///   ╰notice_period = "30 days"
/// ```
pub struct FindingDisplay<'a> {
    result: &'a AnalysisResult,
    show_matches: bool,
    show_metadata: bool,
}

impl<'a> FindingDisplay<'a> {
    pub fn new(result: &'a AnalysisResult) -> Self {
        Self {
            result,
            show_matches: false,
            show_metadata: false,
        }
    }

    /// List every contributing match, not just the representative one.
    pub fn with_matches(mut self) -> Self {
        self.show_matches = true;
        self
    }

    pub fn with_metadata(mut self) -> Self {
        self.show_metadata = true;
        self
    }

    fn write_finding(&self, f: &mut fmt::Formatter<'_>, finding: &ClauseFinding) -> fmt::Result {
        write!(
            f,
            "{} ({}) conf: {:.2} @ {}..{}",
            finding.clause_type,
            finding.display_name,
            finding.confidence,
            finding.span.start,
            finding.span.end
        )?;
        if let Some(page) = finding.span.page {
            write!(f, " p{}", page)?;
        }
        write!(f, "\n  {}", single_line(&finding.span.text))?;

        if self.show_matches {
            for m in finding.matches.iter().chain(finding.penalties.iter()) {
                write!(f, "\n  ╰{} {:?} @ {}..{}", m.kind, m.text, m.start, m.end)?;
            }
        } else if let Some(m) = finding.representative() {
            write!(f, "\n  ╰{} {:?} ({})", m.kind, m.text, m.rule)?;
        }

        for (name, value) in &finding.fields {
            write!(f, "\n  ╰{} = {:?}", name, value)?;
        }
        for advisory in &finding.advisories {
            write!(f, "\n  ╰advisory: {} (conf: {:.2}", advisory.value.note, advisory.confidence)?;
            match advisory.value.revalidated_confidence() {
                Some(c) => write!(f, ", revalidated: {:.2})", c)?,
                None if advisory.value.refined_text.is_some() => f.write_str(", rejected)")?,
                None => f.write_char(')')?,
            }
        }
        Ok(())
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl<'a> fmt::Display for FindingDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        if self.show_metadata {
            let meta = &self.result.metadata;
            write!(
                f,
                "{}: {} chars, {} sentences, {} paragraphs, {} clause types",
                self.result.document_id.as_deref().unwrap_or("<anonymous>"),
                meta.document_length,
                meta.sentence_count,
                meta.paragraph_count,
                meta.clause_types_evaluated
            )?;
            first = false;
        }
        if self.result.findings.is_empty() {
            if !first {
                f.write_char('\n')?;
            }
            return f.write_str("(no findings)");
        }
        for finding in &self.result.findings {
            if !first {
                f.write_char('\n')?;
            }
            first = false;
            self.write_finding(f, finding)?;
        }
        Ok(())
    }
}
