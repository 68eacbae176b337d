//! LIMIT and OFFSET.
//!
//! The count expression is evaluated once per `open`, outside any row scope,
//! and must be a non-negative INT in either typing mode.

use partiql_core::datum::Datum;
use partiql_core::error::{EvalError, EvalResult};

use crate::env::Environment;
use crate::ops::type_name;
use crate::traits::{BoxedExpr, BoxedRel, RelOperator, RowIter};

fn count(clause: &'static str, expr: &BoxedExpr, env: &Environment) -> EvalResult<usize> {
    match expr.eval(env)? {
        Datum::Int(n) if n >= 0 => Ok(n as usize),
        Datum::Int(n) => Err(EvalError::invalid_argument(
            clause,
            format!("must not be negative, got {n}"),
        )),
        other => Err(EvalError::type_mismatch(clause, "INT", type_name(&other))),
    }
}

#[derive(Debug)]
pub struct Limit {
    pub input: BoxedRel,
    pub limit: BoxedExpr,
}

impl RelOperator for Limit {
    fn name(&self) -> &'static str {
        "limit"
    }

    fn open<'a>(&'a self, env: &Environment) -> RowIter<'a> {
        match count("LIMIT", &self.limit, env) {
            Ok(n) => Box::new(self.input.open(env).take(n)),
            Err(e) => Box::new(std::iter::once(Err(e))),
        }
    }
}

#[derive(Debug)]
pub struct Offset {
    pub input: BoxedRel,
    pub offset: BoxedExpr,
}

impl RelOperator for Offset {
    fn name(&self) -> &'static str {
        "offset"
    }

    fn open<'a>(&'a self, env: &Environment) -> RowIter<'a> {
        match count("OFFSET", &self.offset, env) {
            // Errors are not skipped: a failing row stops the stream.
            Ok(n) => {
                let mut skipped = 0;
                Box::new(self.input.open(env).filter(move |row| {
                    if row.is_err() || skipped >= n {
                        return true;
                    }
                    skipped += 1;
                    false
                }))
            }
            Err(e) => Box::new(std::iter::once(Err(e))),
        }
    }
}
