//! Scenario file loader

use crate::error::{read_file, FixtureError};
use rowrefly_core::Scenario;
use std::collections::HashSet;
use std::path::Path;

/// Load the scenario file: a JSON array of scenarios
pub fn load_scenarios(path: &Path) -> Result<Vec<Scenario>, FixtureError> {
    let scenarios = parse_scenarios(&read_file(path)?).map_err(|reason| FixtureError::ParseError {
        path: path.display().to_string(),
        reason,
    })?;
    tracing::info!(count = scenarios.len(), path = %path.display(), "scenarios loaded");
    Ok(scenarios)
}

/// Parse scenario JSON
///
/// Every scenario needs a `testCaseId`, unique within the file.
pub fn parse_scenarios(json: &str) -> Result<Vec<Scenario>, String> {
    let scenarios: Vec<Scenario> = serde_json::from_str(json).map_err(|e| e.to_string())?;

    let mut seen = HashSet::new();
    for (index, scenario) in scenarios.iter().enumerate() {
        if scenario.test_case_id.is_empty() {
            return Err(format!("scenario #{} has no testCaseId", index + 1));
        }
        if !seen.insert(scenario.test_case_id.as_str()) {
            return Err(format!("duplicate testCaseId '{}'", scenario.test_case_id));
        }
    }

    Ok(scenarios)
}
