//! Lowering failures.
//!
//! Runtime failures are `EvalError`s; `CompileError` is raised only while a
//! plan is turned into an executable tree.

use thiserror::Error;

use partiql_core::location::SourceLocation;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("no function named '{name}' at {loc}")]
    UnknownFunction { name: String, loc: SourceLocation },

    #[error("no aggregate '{name}' accepts ({arguments}) at {loc}")]
    UnknownAggregate {
        name: String,
        arguments: String,
        loc: SourceLocation,
    },

    #[error("invalid plan: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, CompileError>;
