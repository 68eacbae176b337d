//! Operator and function traits.
//!
//! The evaluator compiles a plan into a tree of `ScalarExpr` and
//! `RelOperator` trait objects. Relational operators are lazy: `open` returns
//! an iterator that pulls rows from its inputs on demand, so a caller that
//! stops iterating abandons the rest of the pipeline.
//!
//! Invariants:
//! - Compiled trees are immutable and shareable across threads; all
//!   per-evaluation state lives in the `Environment` and in iterators.
//! - An `Accumulator` belongs to exactly one group of one evaluation.

use std::fmt;

use partiql_core::datum::Datum;
use partiql_core::error::EvalResult;

use crate::env::Environment;
use crate::signature::{AggSignature, FnSignature};

/// One row of a relation.
pub type Row = Vec<Datum>;

/// Lazy stream of rows. After yielding an error the stream is abandoned.
pub type RowIter<'a> = Box<dyn Iterator<Item = EvalResult<Row>> + 'a>;

/// A compiled scalar expression.
pub trait ScalarExpr: fmt::Debug + Send + Sync {
    fn eval(&self, env: &Environment) -> EvalResult<Datum>;
}

/// A compiled relational operator.
pub trait RelOperator: fmt::Debug + Send + Sync {
    /// Human-readable operator name (stable).
    fn name(&self) -> &'static str;

    /// Start producing rows in `env`.
    fn open<'a>(&'a self, env: &Environment) -> RowIter<'a>;
}

pub type BoxedExpr = Box<dyn ScalarExpr>;
pub type BoxedRel = Box<dyn RelOperator>;

/// A registered scalar function implementation.
///
/// `invoke` is never called with a NULL (MISSING) argument when the signature
/// declares `is_null_call` (`is_missing_call`); the caller short-circuits.
pub trait ScalarFunction: fmt::Debug + Send + Sync {
    fn signature(&self) -> &FnSignature;
    fn invoke(&self, args: &[Datum]) -> EvalResult<Datum>;
}

/// A registered aggregate function implementation.
pub trait AggregateFunction: fmt::Debug + Send + Sync {
    fn signature(&self) -> &AggSignature;

    /// Fresh running state for one group.
    fn accumulator(&self) -> Box<dyn Accumulator>;
}

/// Running state of one aggregate over one group.
pub trait Accumulator {
    /// Fold in the arguments of one row.
    fn next(&mut self, args: &[Datum]) -> EvalResult<()>;

    /// Finalize.
    fn value(&self) -> EvalResult<Datum>;
}

/// A stream that runs `build` on the first pull and then yields its rows.
/// Used by operators that must see their whole input before emitting.
pub fn deferred<'a, F>(build: F) -> RowIter<'a>
where
    F: FnOnce() -> EvalResult<Vec<Row>> + 'a,
{
    Box::new(
        std::iter::once_with(build).flat_map(|built| -> RowIter<'a> {
            match built {
                Ok(rows) => Box::new(rows.into_iter().map(Ok)),
                Err(e) => Box::new(std::iter::once(Err(e))),
            }
        }),
    )
}
