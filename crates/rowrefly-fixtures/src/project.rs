//! Everything a validation run reads from disk

use crate::{load_expected, load_registry, load_scenarios, FixtureError};
use rowrefly_core::{Config, ExpectedSet, Scenario, SchemaRegistry};

/// Loaded inputs of a validation run
#[derive(Debug, Clone)]
pub struct Project {
    pub registry: SchemaRegistry,
    pub expected: ExpectedSet,
    pub scenarios: Vec<Scenario>,
}

impl Project {
    /// Load schemas, expected fixtures and scenarios from the configured paths
    pub fn load(config: &Config) -> Result<Self, FixtureError> {
        Ok(Self {
            registry: load_registry(&config.schema_dir())?,
            expected: load_expected(&config.expected_dir())?,
            scenarios: load_scenarios(&config.scenarios_path())?,
        })
    }

    /// Scenarios filtered to one test case id, or all of them
    pub fn select(&self, test_case_id: Option<&str>) -> Vec<Scenario> {
        self.scenarios
            .iter()
            .filter(|s| test_case_id.map_or(true, |id| s.test_case_id == id))
            .cloned()
            .collect()
    }
}
