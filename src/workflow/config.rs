// src/workflow/config.rs
// ============================================================================
// Module: Engine Config
// Description: Per-workflow-instance governance-gate target names and versions.
// Purpose: Resolve which (model, prompt) the gate checks, without global state.
// Dependencies: crate::domain
// ============================================================================

//! ## Overview
//! The governed model/prompt *names* are fixed per workflow kind
//! (`risk-model`/`risk-prompt`, `compliance-model`/`compliance-prompt`);
//! [`EngineConfig`] keeps those as fixed defaults while making the *version*
//! pinned per instance a constructor argument rather than process-wide
//! state, so a test can run several configurations of the same workflow
//! kind side by side without shared mutable config.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::domain::ModelName;
use crate::domain::ModelVersion;
use crate::domain::PromptName;
use crate::domain::PromptVersion;

// ============================================================================
// SECTION: Engine Config
// ============================================================================

/// The governed `(model, prompt)` the gate resolves for one workflow instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Model name the gate checks.
    pub model_name: ModelName,
    /// Declared model version the gate checks, absent a per-state override.
    pub model_version: ModelVersion,
    /// Prompt name the gate checks.
    pub prompt_name: PromptName,
    /// Declared prompt version the gate checks, absent a per-state override.
    pub prompt_version: PromptVersion,
}

impl EngineConfig {
    /// Default configuration for [`crate::workflow::risk::RiskWorkflow`]:
    /// `risk-model`/`risk-prompt` at version `"1.0"`/`1`.
    #[must_use]
    pub fn default_for_risk() -> Self {
        Self {
            model_name: ModelName::new("risk-model"),
            model_version: ModelVersion::new("1.0"),
            prompt_name: PromptName::new("risk-prompt"),
            prompt_version: PromptVersion::new(1),
        }
    }

    /// Default configuration for [`crate::workflow::compliance::ComplianceWorkflow`]:
    /// `compliance-model`/`compliance-prompt` at version `"1.0"`/`1`.
    #[must_use]
    pub fn default_for_compliance() -> Self {
        Self {
            model_name: ModelName::new("compliance-model"),
            model_version: ModelVersion::new("1.0"),
            prompt_name: PromptName::new("compliance-prompt"),
            prompt_version: PromptVersion::new(1),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "assertions in test code may fail fast via unwrap/expect"
)]
mod tests {
    use super::*;

    #[test]
    fn risk_defaults_name_the_risk_model_and_prompt() {
        let config = EngineConfig::default_for_risk();
        assert_eq!(config.model_name, ModelName::new("risk-model"));
        assert_eq!(config.model_version, ModelVersion::new("1.0"));
        assert_eq!(config.prompt_name, PromptName::new("risk-prompt"));
        assert_eq!(config.prompt_version, PromptVersion::new(1));
    }

    #[test]
    fn compliance_defaults_name_the_compliance_model_and_prompt() {
        let config = EngineConfig::default_for_compliance();
        assert_eq!(config.model_name, ModelName::new("compliance-model"));
        assert_eq!(config.prompt_name, PromptName::new("compliance-prompt"));
    }
}
