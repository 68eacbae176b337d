#![forbid(unsafe_code)]
//! partiql-core: the shared vocabulary of the PartiQL engine.
//!
//! Contents:
//! - `types`: the `StaticType` lattice and the cast/coercion relation.
//! - `datum`: runtime values with PartiQL equality and ordering.
//! - `plan`: the immutable `Rex`/`Rel` plan algebra and its rewriting traversal.
//! - `id`, `config`, `error`, `hash`, `location`: plumbing shared by every crate.
//!
//! No planning or evaluation logic lives here; the planner and evaluator crates
//! build on these types.

pub mod config;
pub mod datum;
pub mod error;
pub mod hash;
pub mod id;
pub mod location;
pub mod plan;
pub mod prelude;
pub mod types;

/// Engine version string, reported in logs.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
