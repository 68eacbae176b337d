//! Engine configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

/// How the planner treats error-severity problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanningMode {
    /// Undefined variables and static type errors abort planning.
    Strict,
    /// Undefined variables lower to MISSING and type errors become warnings.
    Permissive,
}

/// Failure-propagation discipline of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypingMode {
    /// A runtime type violation aborts the evaluation with a classified error.
    Strict,
    /// A runtime type violation yields MISSING and evaluation continues.
    Permissive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Planner behavior for undefined variables and static type errors.
    pub planning_mode: PlanningMode,

    /// Default typing mode for sessions created by the engine.
    pub typing_mode: TypingMode,

    /// Upper bound on collected problems; the rest are summarized.
    pub max_problems: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            planning_mode: PlanningMode::Strict,
            typing_mode: TypingMode::Permissive,
            max_problems: 256,
        }
    }
}

impl EngineConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `PARTIQL_PLANNING_MODE`: `strict` or `permissive`
    /// - `PARTIQL_TYPING_MODE`: `strict` or `permissive`
    /// - `PARTIQL_MAX_PROBLEMS`: diagnostic cap
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("PARTIQL_PLANNING_MODE") {
            match s.trim().to_ascii_lowercase().as_str() {
                "strict" => cfg.planning_mode = PlanningMode::Strict,
                "permissive" => cfg.planning_mode = PlanningMode::Permissive,
                _ => {}
            }
        }

        if let Ok(s) = std::env::var("PARTIQL_TYPING_MODE") {
            match s.trim().to_ascii_lowercase().as_str() {
                "strict" => cfg.typing_mode = TypingMode::Strict,
                "permissive" => cfg.typing_mode = TypingMode::Permissive,
                _ => {}
            }
        }

        if let Ok(s) = std::env::var("PARTIQL_MAX_PROBLEMS") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.max_problems = v.max(1);
            }
        }

        cfg
    }

    pub fn with_planning_mode(mut self, mode: PlanningMode) -> Self {
        self.planning_mode = mode;
        self
    }

    pub fn with_typing_mode(mut self, mode: TypingMode) -> Self {
        self.typing_mode = mode;
        self
    }
}
