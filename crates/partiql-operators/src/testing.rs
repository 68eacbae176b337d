//! Small expression and relation doubles for operator unit tests.

use std::rc::Rc;

use partiql_core::config::TypingMode;
use partiql_core::datum::Datum;
use partiql_core::error::EvalResult;

use crate::env::{Environment, EvaluationSession};
use crate::traits::{BoxedExpr, BoxedRel, RelOperator, Row, RowIter, ScalarExpr};

#[derive(Debug)]
pub struct Const(pub Datum);

impl Const {
    pub fn boxed(d: Datum) -> BoxedExpr {
        Box::new(Const(d))
    }
}

impl ScalarExpr for Const {
    fn eval(&self, _env: &Environment) -> EvalResult<Datum> {
        Ok(self.0.clone())
    }
}

/// Column `offset` of the innermost row.
#[derive(Debug)]
pub struct Col(pub usize);

impl Col {
    pub fn boxed(offset: usize) -> BoxedExpr {
        Box::new(Col(offset))
    }
}

impl ScalarExpr for Col {
    fn eval(&self, env: &Environment) -> EvalResult<Datum> {
        env.lookup(0, self.0).cloned()
    }
}

/// Expression computed by a plain function.
pub struct FnExpr(pub fn(&Environment) -> EvalResult<Datum>);

impl std::fmt::Debug for FnExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FnExpr")
    }
}

impl FnExpr {
    pub fn boxed(f: fn(&Environment) -> EvalResult<Datum>) -> BoxedExpr {
        Box::new(FnExpr(f))
    }
}

impl ScalarExpr for FnExpr {
    fn eval(&self, env: &Environment) -> EvalResult<Datum> {
        (self.0)(env)
    }
}

/// A fixed list of rows.
#[derive(Debug)]
pub struct Rows(pub Vec<Row>);

impl Rows {
    pub fn boxed(rows: Vec<Row>) -> BoxedRel {
        Box::new(Rows(rows))
    }

    /// One single-column row per value.
    pub fn of(values: Vec<Datum>) -> BoxedRel {
        Self::boxed(values.into_iter().map(|v| vec![v]).collect())
    }
}

impl RelOperator for Rows {
    fn name(&self) -> &'static str {
        "rows"
    }

    fn open<'a>(&'a self, _env: &Environment) -> RowIter<'a> {
        Box::new(self.0.iter().cloned().map(Ok))
    }
}

pub fn env(mode: TypingMode) -> Environment {
    Environment::new(Rc::new(EvaluationSession::new().typing_mode(mode)))
}

pub fn collect(op: &dyn RelOperator, env: &Environment) -> EvalResult<Vec<Row>> {
    op.open(env).collect()
}

pub fn ints(values: &[i64]) -> Vec<Datum> {
    values.iter().map(|i| Datum::Int(*i)).collect()
}
