//! Engine configuration.

use crate::router::ResumePolicy;
use serde::Deserialize;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Model calls allowed within one turn.
    pub max_depth: u32,
    /// How free-text input is matched against an outstanding ask-user
    /// suspension.
    pub resume_policy: ResumePolicy,
    /// System instructions sent with every model call.
    pub instructions: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            resume_policy: ResumePolicy::default(),
            instructions: None,
        }
    }
}

impl EngineConfig {
    /// Sets the maximum number of model calls per turn.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets the resume policy.
    #[must_use]
    pub fn with_resume_policy(mut self, policy: ResumePolicy) -> Self {
        self.resume_policy = policy;
        self
    }

    /// Sets the system instructions.
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_depth, 10);
        assert_eq!(config.resume_policy, ResumePolicy::SuspensionFirst);
        assert!(config.instructions.is_none());
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config: EngineConfig = serde_json::from_value(serde_json::json!({
            "resume_policy": "try_resume_then_fallback"
        }))
        .expect("deserialize");

        assert_eq!(config.max_depth, 10);
        assert_eq!(config.resume_policy, ResumePolicy::TryResumeThenFallback);
    }
}
