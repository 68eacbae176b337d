#![forbid(unsafe_code)]
//! partiql: plan, optimize and evaluate PartiQL queries over in-memory data.
//!
//! The crates of the workspace, re-exported:
//! - [`partiql_core`]: values, static types, the plan IR, configuration and
//!   errors.
//! - [`partiql_operators`]: operator semantics, the function registry and the
//!   relational operators.
//! - [`partiql_planner`]: syntax tree → typed, optimized plan.
//! - [`partiql_eval`]: plan → executable tree, and evaluation.
//!
//! [`Engine`] ties them together for the common case:
//!
//! ```
//! use partiql::ast::builder::*;
//! use partiql::{Datum, Engine};
//!
//! let mut engine = Engine::default();
//! engine
//!     .catalog_mut()
//!     .insert("nums", Datum::bag([1, 2, 3].map(Datum::Int)));
//!
//! // SELECT VALUE n * 2 FROM nums AS n WHERE n > 1
//! let q = SelectBuilder::value(mul(id("n"), int(2)))
//!     .from(scan(id("nums"), "n"))
//!     .filter(gt(id("n"), int(1)))
//!     .build();
//! let out = engine.execute(&query(q)).unwrap();
//! assert_eq!(out, Datum::bag([Datum::Int(4), Datum::Int(6)]));
//! ```

pub mod engine;

pub use partiql_core;
pub use partiql_eval;
pub use partiql_operators;
pub use partiql_planner;

pub use partiql_core::prelude::*;
pub use partiql_eval::{CompileError, CompiledExpression, ExprValue};
pub use partiql_operators::{EvaluationSession, FunctionRegistry};
pub use partiql_planner::{ast, MemoryCatalog, PhysicalPlan, Planner, PlanningResult, Problem};

pub use engine::{Engine, EngineError};
