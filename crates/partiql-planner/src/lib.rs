#![forbid(unsafe_code)]
//! partiql-planner: syntax tree → typed, optimized physical plan.
//!
//! - `ast`: the input syntax tree and a builder for constructing it in code.
//! - `catalog`: global bindings visible to a query.
//! - `logical`: scoping, binding resolution and typing into `Rex`/`Rel`.
//! - `rules`: plan rewrite passes.
//! - `planner`: the `Planner` entry point and `PlanningResult`.
//!
//! Problems in the query (undefined names, type mismatches) are collected
//! and returned in `PlanningResult`; `PlannerError` is reserved for
//! malformed input trees and internal invariant violations.

pub mod ast;
pub mod catalog;
pub mod env;
pub mod error;
pub mod logical;
pub mod physical;
pub mod planner;
pub mod problem;
pub mod rules;
pub mod typer;

pub use catalog::{Catalog, MemoryCatalog, Resolution};
pub use error::PlannerError;
pub use physical::PhysicalPlan;
pub use planner::{Planner, PlanningResult};
pub use problem::{Problem, ProblemDetails, Severity};
pub use rules::{Pass, Pipeline, RemoveUselessAnds, RemoveUselessFilters};
