//! Centralized demo configuration.
//!
//! Loaded via the `config` crate from environment variables prefixed with
//! `DEFERRAL`, using `__` to separate nesting levels, for example
//! `DEFERRAL__ENGINE__MAX_DEPTH=4`.

use deferral_engine::EngineConfig;
use serde::Deserialize;

/// Demo configuration composed from library configs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DemoConfig {
    /// Engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Expense workflow configuration.
    #[serde(default)]
    pub expenses: ExpenseConfig,
}

/// Expense workflow configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpenseConfig {
    /// Amounts above this also need director approval.
    #[serde(default = "default_director_threshold")]
    pub director_threshold: u64,
}

fn default_director_threshold() -> u64 {
    100
}

impl Default for ExpenseConfig {
    fn default() -> Self {
        Self {
            director_threshold: default_director_threshold(),
        }
    }
}

impl DemoConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(config::Environment::with_prefix("DEFERRAL"))
    }

    fn from_environment(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                environment
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deferral_engine::ResumePolicy;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> DemoConfig {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        DemoConfig::from_environment(
            config::Environment::with_prefix("DEFERRAL").source(Some(source)),
        )
        .expect("load config")
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = load(&[]);
        assert_eq!(config.engine, EngineConfig::default());
        assert_eq!(config.expenses.director_threshold, 100);
    }

    #[test]
    fn nested_variables_override_defaults() {
        let config = load(&[
            ("DEFERRAL__ENGINE__MAX_DEPTH", "4"),
            ("DEFERRAL__ENGINE__RESUME_POLICY", "heuristic"),
            ("DEFERRAL__EXPENSES__DIRECTOR_THRESHOLD", "500"),
        ]);

        assert_eq!(config.engine.max_depth, 4);
        assert_eq!(config.engine.resume_policy, ResumePolicy::Heuristic);
        assert_eq!(config.expenses.director_threshold, 500);
    }
}
