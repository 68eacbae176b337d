#![forbid(unsafe_code)]
//! partiql-eval: physical plan → executable tree, and evaluation.
//!
//! - `compiler`: binds every call site to registered functions and lowers
//!   `Rex`/`Rel` nodes into `ScalarExpr`/`RelOperator` trait objects.
//! - `expr`: the scalar expression nodes.
//! - `runtime`: `CompiledExpression::eval` and the `ExprValue` it returns.
//!
//! A compiled tree holds no per-evaluation state; the session passed to
//! `eval` supplies globals, parameters and the typing mode.

pub mod compiler;
pub mod error;
pub mod expr;
pub mod runtime;

pub use compiler::{compile, Compiler};
pub use error::CompileError;
pub use runtime::{CompiledExpression, ExprValue};
