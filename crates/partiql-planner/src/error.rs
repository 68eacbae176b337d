//! Irrecoverable planner failures.
//!
//! Problems in the user's query are never reported through this type; they
//! are collected as `Problem`s. `PlannerError` means the input tree itself is
//! malformed or the planner broke one of its own invariants.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("Malformed syntax tree: {0}")]
    Malformed(String),

    #[error("Plan invariant failed: {0}")]
    Invariant(#[from] partiql_core::error::Error),
}

pub type Result<T> = std::result::Result<T, PlannerError>;
