//! Fixture-driven scenario tests for clause-engine.
//!
//! Each fixture is a TOML file holding a document text and the findings the
//! engine is expected to produce for it. The harness loads every fixture under
//! `fixtures/`, runs it through [`clause_engine::ClausePipeline`] and reports
//! every expectation that did not hold.
//!
//! ## Modules
//!
//! - [`fixture`] - The fixture file format
//! - [`loader`] - Fixture file loading
//! - [`runner`] - Runs fixtures and checks expectations
//! - [`errors`] - Error types for the harness

pub mod errors;
pub mod fixture;
pub mod loader;
pub mod runner;

pub use errors::{SpecError, SpecResult};
pub use fixture::{parse_fixture, ClauseFixture, Expectation};
pub use loader::{load_all_fixtures, load_fixture};
pub use runner::{check_fixture, format_report, run_fixture, ExpectationOutcome, FixtureReport};

#[cfg(test)]
mod tests;
