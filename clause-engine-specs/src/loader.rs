//! Fixture file loading.

use std::fs;
use std::path::Path;

use crate::fixture::{parse_fixture, ClauseFixture};
use crate::SpecError;

/// Load a single fixture file.
pub fn load_fixture(path: &Path) -> Result<ClauseFixture, SpecError> {
    let content = fs::read_to_string(path).map_err(|e| SpecError::Load {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let mut fixture = parse_fixture(&content, &path.display().to_string())?;
    fixture.source_dir = path.parent().map(Path::to_path_buf);
    Ok(fixture)
}

/// Load all fixtures from a directory (glob: **/*.toml), sorted by relative
/// path.
pub fn load_all_fixtures(dir: &Path) -> Result<Vec<(String, ClauseFixture)>, SpecError> {
    let mut fixtures = Vec::new();
    load_fixtures_recursive(dir, dir, &mut fixtures)?;
    fixtures.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(fixtures)
}

fn load_fixtures_recursive(
    base: &Path,
    dir: &Path,
    fixtures: &mut Vec<(String, ClauseFixture)>,
) -> Result<(), SpecError> {
    if !dir.is_dir() {
        return Ok(());
    }

    for entry in fs::read_dir(dir).map_err(|e| SpecError::Load {
        path: dir.display().to_string(),
        message: e.to_string(),
    })? {
        let entry = entry.map_err(|e| SpecError::Load {
            path: dir.display().to_string(),
            message: e.to_string(),
        })?;
        let path = entry.path();

        if path.is_dir() {
            load_fixtures_recursive(base, &path, fixtures)?;
        } else if path.extension().map_or(false, |e| e == "toml") {
            let relative = path.strip_prefix(base).unwrap_or(&path);
            let fixture = load_fixture(&path)?;
            fixtures.push((relative.display().to_string(), fixture));
        }
    }

    Ok(())
}
