//! Runs fixtures through the clause pipeline and checks their expectations.

use std::fmt::{self, Write};
use std::sync::Arc;

use clause_engine::{AnalysisResult, ClausePipeline, ClauseRegistry, Document};
use tracing::{debug, info};

use crate::fixture::{ClauseFixture, Expectation};
use crate::{SpecError, SpecResult};

/// The outcome of one expectation.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpectationOutcome {
    Passed,
    /// No finding for a clause type that was expected.
    Missing { clause: String },
    CountMismatch {
        clause: String,
        expected: usize,
        actual: usize,
    },
    LowConfidence {
        clause: String,
        minimum: f64,
        actual: f64,
    },
    FieldMismatch {
        clause: String,
        field: String,
        expected: String,
        /// Values extracted by the clause type's findings.
        actual: Vec<String>,
    },
    UnexpectedField {
        clause: String,
        field: String,
        value: String,
    },
    PageMismatch {
        clause: String,
        expected: usize,
        actual: Option<usize>,
    },
    /// A clause type listed as absent produced findings.
    Unexpected { clause: String, count: usize },
}

impl ExpectationOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, ExpectationOutcome::Passed)
    }
}

impl fmt::Display for ExpectationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectationOutcome::Passed => f.write_str("passed"),
            ExpectationOutcome::Missing { clause } => write!(f, "{}: no finding", clause),
            ExpectationOutcome::CountMismatch {
                clause,
                expected,
                actual,
            } => write!(f, "{}: expected {} findings, found {}", clause, expected, actual),
            ExpectationOutcome::LowConfidence {
                clause,
                minimum,
                actual,
            } => write!(
                f,
                "{}: confidence {:.3} below expected minimum {:.3}",
                clause, actual, minimum
            ),
            ExpectationOutcome::FieldMismatch {
                clause,
                field,
                expected,
                actual,
            } => write!(
                f,
                "{}.{}: expected `{}`, found {:?}",
                clause, field, expected, actual
            ),
            ExpectationOutcome::UnexpectedField {
                clause,
                field,
                value,
            } => write!(f, "{}.{}: expected absent, found `{}`", clause, field, value),
            ExpectationOutcome::PageMismatch {
                clause,
                expected,
                actual,
            } => write!(f, "{}: expected page {}, found {:?}", clause, expected, actual),
            ExpectationOutcome::Unexpected { clause, count } => {
                write!(f, "{}: expected absent, found {} findings", clause, count)
            }
        }
    }
}

/// Result of running one fixture.
#[derive(Debug, Clone)]
pub struct FixtureReport {
    pub title: Option<String>,
    pub result: AnalysisResult,
    pub outcomes: Vec<ExpectationOutcome>,
}

impl FixtureReport {
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(ExpectationOutcome::is_passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ExpectationOutcome> {
        self.outcomes.iter().filter(|o| !o.is_passed())
    }

    /// The report itself if every expectation held, otherwise an
    /// [`SpecError::Assertion`] carrying the formatted report.
    pub fn into_result(self, name: &str) -> SpecResult<Self> {
        if self.passed() {
            Ok(self)
        } else {
            Err(SpecError::Assertion {
                message: format_report(name, &self),
            })
        }
    }
}

/// Analyze the fixture's document and check every expectation.
pub fn run_fixture(fixture: &ClauseFixture) -> SpecResult<FixtureReport> {
    let registry = match fixture.config_path() {
        Some(path) => Arc::new(ClauseRegistry::from_path(&path)?),
        None => ClauseRegistry::reference(),
    };
    let document =
        Document::new(fixture.document_text()).with_page_breaks(fixture.page_breaks.clone());
    let result = ClausePipeline::new(registry).analyze(&document);
    debug!(
        title = ?fixture.title,
        findings = result.findings.len(),
        "analyzed fixture"
    );

    let outcomes = check_fixture(fixture, &result);
    let report = FixtureReport {
        title: fixture.title.clone(),
        result,
        outcomes,
    };
    info!(
        title = ?report.title,
        passed = report.passed(),
        "fixture checked"
    );
    Ok(report)
}

/// Check a fixture's expectations against an analysis result.
pub fn check_fixture(fixture: &ClauseFixture, result: &AnalysisResult) -> Vec<ExpectationOutcome> {
    let mut outcomes = Vec::new();
    for expectation in &fixture.expect {
        check_expectation(expectation, result, &mut outcomes);
    }
    for clause in &fixture.absent {
        let count = result.findings_for(clause).count();
        outcomes.push(if count == 0 {
            ExpectationOutcome::Passed
        } else {
            ExpectationOutcome::Unexpected {
                clause: clause.clone(),
                count,
            }
        });
    }
    outcomes
}

fn check_expectation(
    expectation: &Expectation,
    result: &AnalysisResult,
    outcomes: &mut Vec<ExpectationOutcome>,
) {
    let clause = &expectation.clause;
    let findings: Vec<_> = result.findings_for(clause).collect();

    match expectation.count {
        Some(expected) if expected != findings.len() => {
            outcomes.push(ExpectationOutcome::CountMismatch {
                clause: clause.clone(),
                expected,
                actual: findings.len(),
            });
            return;
        }
        None if findings.is_empty() => {
            outcomes.push(ExpectationOutcome::Missing {
                clause: clause.clone(),
            });
            return;
        }
        _ => outcomes.push(ExpectationOutcome::Passed),
    }

    if let Some(minimum) = expectation.min_confidence {
        for finding in &findings {
            if finding.confidence < minimum {
                outcomes.push(ExpectationOutcome::LowConfidence {
                    clause: clause.clone(),
                    minimum,
                    actual: finding.confidence,
                });
            }
        }
    }

    for (field, expected) in &expectation.fields {
        let actual: Vec<String> = findings
            .iter()
            .filter_map(|f| f.field(field).map(str::to_string))
            .collect();
        outcomes.push(if actual.iter().any(|value| value == expected) {
            ExpectationOutcome::Passed
        } else {
            ExpectationOutcome::FieldMismatch {
                clause: clause.clone(),
                field: field.clone(),
                expected: expected.clone(),
                actual,
            }
        });
    }

    for field in &expectation.absent_fields {
        match findings.iter().find_map(|f| f.field(field)) {
            Some(value) => outcomes.push(ExpectationOutcome::UnexpectedField {
                clause: clause.clone(),
                field: field.clone(),
                value: value.to_string(),
            }),
            None => outcomes.push(ExpectationOutcome::Passed),
        }
    }

    if let Some(expected) = expectation.page {
        let actual = findings.first().and_then(|f| f.span.page);
        if actual != Some(expected) {
            outcomes.push(ExpectationOutcome::PageMismatch {
                clause: clause.clone(),
                expected,
                actual,
            });
        }
    }
}

/// Format a failed fixture report with the findings that were produced.
pub fn format_report(fixture_name: &str, report: &FixtureReport) -> String {
    let mut output = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(output, "\nFAIL: {}", fixture_name);
    if let Some(title) = &report.title {
        let _ = writeln!(output, "  {}", title);
    }
    let _ = writeln!(output);
    for failure in report.failures() {
        let _ = writeln!(output, "    \u{2717} {}", failure);
    }
    let _ = writeln!(output);
    if report.result.findings.is_empty() {
        let _ = writeln!(output, "  findings: (none)");
    } else {
        let _ = writeln!(output, "  findings:");
        for finding in &report.result.findings {
            let _ = writeln!(
                output,
                "    {} conf: {:.3} @ {}..{} {:?}",
                finding.clause_type,
                finding.confidence,
                finding.span.start,
                finding.span.end,
                finding.fields
            );
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::parse_fixture;

    fn run(source: &str) -> FixtureReport {
        run_fixture(&parse_fixture(source, "inline").unwrap()).unwrap()
    }

    #[test]
    fn passing_fixture() {
        let report = run(r#"
            text = "Either party may terminate this Agreement upon 30 days written notice."
            absent = ["confidentiality"]

            [[expect]]
            clause = "termination"
            count = 1
            min_confidence = 0.6
            fields = { notice_period = "30 days" }
            absent_fields = ["survival"]
            "#);
        assert!(report.passed(), "{}", format_report("inline", &report));
        assert_eq!(report.outcomes.len(), 4);
    }

    #[test]
    fn failing_expectations_are_reported() {
        let report = run(r#"
            title = "wrong on purpose"
            text = "Either party may terminate this Agreement upon 30 days written notice."
            absent = ["termination"]

            [[expect]]
            clause = "termination"
            min_confidence = 0.9
            fields = { notice_period = "60 days" }

            [[expect]]
            clause = "governing_law"
            "#);
        assert!(!report.passed());

        let failures: Vec<_> = report.failures().cloned().collect();
        assert!(matches!(failures[0], ExpectationOutcome::LowConfidence { .. }));
        assert_eq!(
            failures[1],
            ExpectationOutcome::FieldMismatch {
                clause: "termination".to_string(),
                field: "notice_period".to_string(),
                expected: "60 days".to_string(),
                actual: vec!["30 days".to_string()],
            }
        );
        assert_eq!(
            failures[2],
            ExpectationOutcome::Missing {
                clause: "governing_law".to_string()
            }
        );
        assert_eq!(
            failures[3],
            ExpectationOutcome::Unexpected {
                clause: "termination".to_string(),
                count: 1
            }
        );

        let formatted = format_report("inline.toml", &report);
        assert!(formatted.contains("FAIL: inline.toml"));
        assert!(formatted.contains("governing_law: no finding"));
        assert!(formatted.contains("termination conf: 0.739 @ 0..70"));

        match report.into_result("inline.toml") {
            Err(SpecError::Assertion { message }) => assert_eq!(message, formatted),
            other => panic!("expected an assertion error, got {:?}", other.map(|r| r.outcomes)),
        }
    }

    #[test]
    fn count_mismatch_stops_further_checks() {
        let report = run(r#"
            text = "Either party may terminate this Agreement upon 30 days written notice."

            [[expect]]
            clause = "termination"
            count = 2
            fields = { notice_period = "30 days" }
            "#);
        assert_eq!(
            report.outcomes,
            vec![ExpectationOutcome::CountMismatch {
                clause: "termination".to_string(),
                expected: 2,
                actual: 1
            }]
        );
    }

    #[test]
    fn missing_config_is_an_error() {
        let fixture = parse_fixture(
            "text = \"x\"\nconfig = \"/nonexistent/clauses.json\"",
            "inline",
        )
        .unwrap();
        assert!(matches!(
            run_fixture(&fixture),
            Err(crate::SpecError::Config(_))
        ));
    }
}
