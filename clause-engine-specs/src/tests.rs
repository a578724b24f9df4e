use std::path::Path;

use tracing_subscriber::EnvFilter;

use crate::{load_all_fixtures, load_fixture, run_fixture, ClauseFixture};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fixtures_dir() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

fn fixture(name: &str) -> ClauseFixture {
    load_fixture(&fixtures_dir().join(name)).unwrap()
}

#[test]
fn all_fixtures_pass() {
    init_tracing();
    let fixtures = load_all_fixtures(&fixtures_dir()).unwrap();
    assert!(!fixtures.is_empty());

    let mut failures = String::new();
    for (name, fixture) in &fixtures {
        if let Err(error) = run_fixture(fixture).unwrap().into_result(name) {
            failures.push_str(&error.to_string());
        }
    }
    assert!(failures.is_empty(), "{}", failures);
}

// ============================================================================
// Scenario fixtures
// ============================================================================

#[test]
fn termination_notice_scenario() {
    init_tracing();
    let report = run_fixture(&fixture("termination-notice.toml")).unwrap();
    assert!(report.passed());

    let finding = &report.result.findings[0];
    assert_eq!(finding.clause_type, "termination");
    assert!(finding.confidence >= 0.6);
}

#[test]
fn negative_keywords_only_scenario() {
    init_tracing();
    let report = run_fixture(&fixture("negative-keywords-only.toml")).unwrap();
    assert!(report.passed());
    assert!(report.result.findings.is_empty());
}

#[test]
fn two_confidentiality_paragraphs_scenario() {
    init_tracing();
    let report = run_fixture(&fixture("two-confidentiality-paragraphs.toml")).unwrap();
    assert!(report.passed());
    assert_eq!(report.result.findings_for("confidentiality").count(), 2);
}

#[test]
fn short_span_scenario_uses_fixture_config() {
    init_tracing();
    let fixture = fixture("short-span.toml");
    assert!(fixture.config_path().unwrap().ends_with("configs/short-span.json"));

    let report = run_fixture(&fixture).unwrap();
    assert!(report.passed());
    assert_eq!(report.result.metadata.clause_types_evaluated, 1);
}
