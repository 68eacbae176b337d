//! `LIKE` with the pattern compiled once when it is a literal.

use partiql_core::datum::Datum;
use partiql_core::error::{EvalError, EvalResult};
use partiql_operators::ops::like::{like, LikeMatcher};
use partiql_operators::ops::type_name;
use partiql_operators::{BoxedExpr, Environment, ScalarExpr};

#[derive(Debug)]
pub enum Pattern {
    Fixed(LikeMatcher),
    Dynamic {
        pattern: BoxedExpr,
        escape: Option<BoxedExpr>,
    },
}

#[derive(Debug)]
pub struct LikeExpr {
    pub value: BoxedExpr,
    pub pattern: Pattern,
}

impl ScalarExpr for LikeExpr {
    fn eval(&self, env: &Environment) -> EvalResult<Datum> {
        let value = self.value.eval(env)?;
        match &self.pattern {
            Pattern::Fixed(matcher) => match &value {
                Datum::Missing | Datum::Null => Ok(value),
                other => other
                    .as_text()
                    .map(|s| Datum::Bool(matcher.matches(s)))
                    .ok_or_else(|| EvalError::type_mismatch("LIKE", "STRING", type_name(other))),
            },
            Pattern::Dynamic { pattern, escape } => {
                let pattern = pattern.eval(env)?;
                let escape = escape.as_ref().map(|e| e.eval(env)).transpose()?;
                like(&value, &pattern, escape.as_ref())
            }
        }
    }
}
