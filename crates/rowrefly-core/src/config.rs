//! Configuration schema (rowrefly.toml)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File locations, relative to the config file's directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Table schema files and `{table}_{column}.schema.json` column schemas
    pub schema_dir: PathBuf,

    /// `{table}_expected_data.json` or `tables/{table}.json` fixtures
    pub expected_dir: PathBuf,

    /// `{table}.json` row exports read by the snapshot source
    pub actual_dir: PathBuf,

    /// Scenario file
    pub scenarios: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            schema_dir: PathBuf::from("schemas"),
            expected_dir: PathBuf::from("expected"),
            actual_dir: PathBuf::from("actual"),
            scenarios: PathBuf::from("scenarios.json"),
        }
    }
}

/// Matching and comparison defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Replaces the built-in time-format pattern for every time column
    /// without its own `timePattern`
    pub time_pattern: Option<String>,

    /// Retry grouping column when a table declares none
    pub operation_column: String,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            time_pattern: None,
            operation_column: "operation".to_string(),
        }
    }
}

/// Polling policy for fetching actual rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Give up waiting for rows after this long
    pub timeout_ms: u64,

    /// Delay between attempts
    pub interval_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            interval_ms: 500,
        }
    }
}

/// Tables excluded from validation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SkipRules {
    /// Glob patterns (`*` wildcard)
    #[serde(default)]
    pub tables: Vec<String>,
}

impl SkipRules {
    /// Check if a table should be skipped
    pub fn is_table_skipped(&self, table: &str) -> bool {
        self.tables.iter().any(|pattern| glob_match(pattern, table))
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub matching: MatchingConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub skip: SkipRules,

    /// Maximum tables validated in parallel per scenario
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Project root path (for resolving relative paths)
    #[serde(skip)]
    pub project_root: PathBuf,
}

fn default_concurrency() -> usize {
    4
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            matching: MatchingConfig::default(),
            fetch: FetchConfig::default(),
            skip: SkipRules::default(),
            concurrency: default_concurrency(),
            project_root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        let mut config = Self::from_toml(&contents)?;

        // Set project root to parent of config file
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.project_root = std::env::current_dir().unwrap_or_default();

        if config.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".to_string()));
        }
        if config.fetch.interval_ms == 0 {
            return Err(ConfigError::Invalid("fetch.interval_ms must be at least 1".to_string()));
        }
        if let Some(pattern) = &config.matching.time_pattern {
            regex::Regex::new(pattern)
                .map_err(|e| ConfigError::Invalid(format!("matching.time_pattern: {}", e)))?;
        }

        Ok(config)
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Resolve a configured path against the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    pub fn schema_dir(&self) -> PathBuf {
        self.resolve(&self.paths.schema_dir)
    }

    pub fn expected_dir(&self) -> PathBuf {
        self.resolve(&self.paths.expected_dir)
    }

    pub fn actual_dir(&self) -> PathBuf {
        self.resolve(&self.paths.actual_dir)
    }

    pub fn scenarios_path(&self) -> PathBuf {
        self.resolve(&self.paths.scenarios)
    }
}

/// Simple glob matching (supports a single `*`)
fn glob_match(pattern: &str, text: &str) -> bool {
    if pattern == "*" || pattern == "**" {
        return true;
    }

    if let Some(star_pos) = pattern.find('*') {
        let prefix = &pattern[..star_pos];
        let suffix = &pattern[star_pos + 1..];

        text.len() >= prefix.len() + suffix.len() && text.starts_with(prefix) && text.ends_with(suffix)
    } else {
        pattern == text
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.matching.operation_column, "operation");
        assert_eq!(config.fetch.interval_ms, 500);
        assert_eq!(config.concurrency, 4);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            concurrency = 2

            [paths]
            schema_dir = "fixtures/schemas"

            [skip]
            tables = ["tmp_*"]
            "#,
        )
        .unwrap();

        assert_eq!(config.concurrency, 2);
        assert_eq!(config.paths.schema_dir, PathBuf::from("fixtures/schemas"));
        assert_eq!(config.paths.expected_dir, PathBuf::from("expected"));
        assert!(config.skip.is_table_skipped("tmp_orders"));
        assert!(!config.skip.is_table_skipped("orders"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(Config::from_toml("concurrency = 0"), Err(ConfigError::Invalid(_))));
        assert!(matches!(
            Config::from_toml("[matching]\ntime_pattern = \"([\""),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(Config::from_toml("concurrency = \"x\""), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rowrefly.toml");

        let mut config = Config::default();
        config.concurrency = 3;
        config.skip.tables.push("tmp_*".to_string());
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.concurrency, 3);
        assert_eq!(loaded.fetch, config.fetch);
        assert_eq!(loaded.paths, config.paths);
        assert!(loaded.skip.is_table_skipped("tmp_orders"));
        assert_eq!(loaded.project_root, dir.path());
    }

    #[test]
    fn glob_matching() {
        assert!(glob_match("*", "anything"));
        assert!(glob_match("staging_*", "staging_users"));
        assert!(glob_match("*_audit", "order_audit"));
        assert!(!glob_match("staging_*", "prod_users"));
        assert!(!glob_match("ab*ba", "aba"));
    }
}
