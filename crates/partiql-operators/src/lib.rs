#![forbid(unsafe_code)]
//! partiql-operators: runtime semantics shared by the planner and evaluator.
//!
//! - `ops`: value-level operator semantics (arithmetic, comparison, paths,
//!   casts, LIKE, three-valued logic).
//! - `registry`/`signature`: the function catalog and overload resolution.
//! - `scalar`/`aggregate`: builtin function implementations.
//! - relational operators (scan, filter, project, join, group, sort,
//!   distinct, limit, set operations), all pull-based over `RowIter`.

pub mod env;
pub mod ops;
pub mod registry;
pub mod signature;
pub mod traits;

pub mod aggregate;
pub mod scalar;

pub mod distinct;
pub mod filter;
pub mod group;
pub mod join;
pub mod limit;
pub mod project;
pub mod scan;
pub mod set_op;
pub mod sort;

#[cfg(test)]
mod testing;

pub use env::{Environment, EvaluationSession};
pub use registry::{FnResolution, FunctionRegistry};
pub use signature::{AggSignature, FnSignature, Parameter};
pub use traits::{
    Accumulator, AggregateFunction, BoxedExpr, BoxedRel, RelOperator, Row, RowIter, ScalarExpr,
    ScalarFunction,
};
