//! Executable scalar expression nodes.
//!
//! Each node implements `ScalarExpr` over the row environment. Nodes that can
//! fail on data are wrapped in `Guarded`, which tags errors with the source
//! location and applies the session's typing mode.

pub mod call;
pub mod construct;
pub mod like;
pub mod query;

use partiql_core::datum::Datum;
use partiql_core::error::{EvalError, EvalResult};
use partiql_core::id::GlobalId;
use partiql_core::location::SourceLocation;
use partiql_core::plan::{BinaryOp, UnaryOp};
use partiql_core::types::SingleType;
use partiql_operators::ops::{arith, cast, compare, logic, path, predicate, type_name};
use partiql_operators::{BoxedExpr, Environment, ScalarExpr};

/// Applies permissive recovery to one node's result.
#[derive(Debug)]
pub struct Guarded {
    pub inner: BoxedExpr,
    pub loc: SourceLocation,
}

impl ScalarExpr for Guarded {
    fn eval(&self, env: &Environment) -> EvalResult<Datum> {
        env.recover(self.inner.eval(env).map_err(|e| e.at(self.loc)))
    }
}

#[derive(Debug)]
pub struct Literal(pub Datum);

impl ScalarExpr for Literal {
    fn eval(&self, _env: &Environment) -> EvalResult<Datum> {
        Ok(self.0.clone())
    }
}

#[derive(Debug)]
pub struct LocalVar {
    pub depth: usize,
    pub offset: usize,
}

impl ScalarExpr for LocalVar {
    fn eval(&self, env: &Environment) -> EvalResult<Datum> {
        env.lookup(self.depth, self.offset).cloned()
    }
}

#[derive(Debug)]
pub struct GlobalVar(pub GlobalId);

impl ScalarExpr for GlobalVar {
    fn eval(&self, env: &Environment) -> EvalResult<Datum> {
        env.session()
            .global(self.0)
            .cloned()
            .ok_or_else(|| EvalError::UndefinedVariable {
                name: self.0.to_string(),
                location: SourceLocation::UNKNOWN,
            })
    }
}

#[derive(Debug)]
pub struct Parameter(pub usize);

impl ScalarExpr for Parameter {
    fn eval(&self, env: &Environment) -> EvalResult<Datum> {
        env.session().parameter(self.0).cloned()
    }
}

/// A name the planner could not bind: MISSING under permissive typing, an
/// error under strict typing.
#[derive(Debug)]
pub struct Unbound {
    pub name: String,
}

impl ScalarExpr for Unbound {
    fn eval(&self, _env: &Environment) -> EvalResult<Datum> {
        Err(EvalError::UndefinedVariable {
            name: self.name.clone(),
            location: SourceLocation::UNKNOWN,
        })
    }
}

#[derive(Debug)]
pub enum Step {
    Symbol { name: String, case_sensitive: bool },
    Index(BoxedExpr),
    Key(BoxedExpr),
}

#[derive(Debug)]
pub struct PathExpr {
    pub root: BoxedExpr,
    pub step: Step,
}

impl ScalarExpr for PathExpr {
    fn eval(&self, env: &Environment) -> EvalResult<Datum> {
        let root = self.root.eval(env)?;
        match &self.step {
            Step::Symbol {
                name,
                case_sensitive,
            } => path::symbol(&root, name, *case_sensitive),
            Step::Index(i) => path::index(&root, &i.eval(env)?),
            Step::Key(k) => path::key(&root, &k.eval(env)?),
        }
    }
}

#[derive(Debug)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: BoxedExpr,
}

impl ScalarExpr for UnaryExpr {
    fn eval(&self, env: &Environment) -> EvalResult<Datum> {
        let operand = self.operand.eval(env)?;
        match self.op {
            UnaryOp::Not => logic::not(&operand),
            op => arith::unary_numeric(op, &operand),
        }
    }
}

#[derive(Debug)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub lhs: BoxedExpr,
    pub rhs: BoxedExpr,
}

impl ScalarExpr for BinaryExpr {
    fn eval(&self, env: &Environment) -> EvalResult<Datum> {
        let lhs = self.lhs.eval(env)?;
        let rhs = self.rhs.eval(env)?;
        match self.op {
            op if op.is_comparison() => compare::compare(op, &lhs, &rhs),
            BinaryOp::Concat => arith::concat(&lhs, &rhs),
            op => arith::arithmetic(op, &lhs, &rhs),
        }
    }
}

/// N-ary AND / OR, evaluating operands left to right until one decides.
#[derive(Debug)]
pub struct Connective {
    pub conjunction: bool,
    pub operands: Vec<BoxedExpr>,
}

impl ScalarExpr for Connective {
    fn eval(&self, env: &Environment) -> EvalResult<Datum> {
        let operands = self.operands.iter().map(|o| o.eval(env));
        if self.conjunction {
            logic::and(operands, env.mode())
        } else {
            logic::or(operands, env.mode())
        }
    }
}

#[derive(Debug)]
pub struct BetweenExpr {
    pub value: BoxedExpr,
    pub from: BoxedExpr,
    pub to: BoxedExpr,
}

impl ScalarExpr for BetweenExpr {
    fn eval(&self, env: &Environment) -> EvalResult<Datum> {
        let value = self.value.eval(env)?;
        let from = self.from.eval(env)?;
        let to = self.to.eval(env)?;
        predicate::between(&value, &from, &to, env.mode())
    }
}

#[derive(Debug)]
pub struct InExpr {
    pub value: BoxedExpr,
    pub collection: BoxedExpr,
}

impl ScalarExpr for InExpr {
    fn eval(&self, env: &Environment) -> EvalResult<Datum> {
        let value = self.value.eval(env)?;
        predicate::in_collection(&value, &self.collection.eval(env)?)
    }
}

#[derive(Debug)]
pub struct IsTypeExpr {
    pub operand: BoxedExpr,
    pub target: SingleType,
}

impl ScalarExpr for IsTypeExpr {
    fn eval(&self, env: &Environment) -> EvalResult<Datum> {
        Ok(predicate::is_type(&self.operand.eval(env)?, &self.target))
    }
}

#[derive(Debug)]
pub struct CastExpr {
    pub operand: BoxedExpr,
    pub target: SingleType,
}

impl ScalarExpr for CastExpr {
    fn eval(&self, env: &Environment) -> EvalResult<Datum> {
        cast::cast(&self.operand.eval(env)?, &self.target)
    }
}

#[derive(Debug)]
pub struct CanCastExpr {
    pub operand: BoxedExpr,
    pub target: SingleType,
}

impl ScalarExpr for CanCastExpr {
    fn eval(&self, env: &Environment) -> EvalResult<Datum> {
        let value = self.operand.eval(env)?;
        if value.is_missing() {
            return Ok(Datum::Missing);
        }
        Ok(Datum::Bool(cast::can_cast(&value, &self.target)))
    }
}

/// Searched CASE. Branch conditions other than `true` fall through; a
/// non-boolean condition is a type violation.
#[derive(Debug)]
pub struct CaseExpr {
    pub branches: Vec<(BoxedExpr, BoxedExpr)>,
    pub default: Option<BoxedExpr>,
}

impl ScalarExpr for CaseExpr {
    fn eval(&self, env: &Environment) -> EvalResult<Datum> {
        for (condition, value) in &self.branches {
            match condition.eval(env)? {
                Datum::Bool(true) => return value.eval(env),
                Datum::Bool(false) | Datum::Null | Datum::Missing => {}
                other => {
                    return Err(EvalError::type_mismatch(
                        "CASE WHEN",
                        "BOOL",
                        type_name(&other),
                    ))
                }
            }
        }
        match &self.default {
            Some(d) => d.eval(env),
            None => Ok(Datum::Null),
        }
    }
}

/// First operand that is neither NULL nor MISSING; NULL when there is none.
#[derive(Debug)]
pub struct CoalesceExpr(pub Vec<BoxedExpr>);

impl ScalarExpr for CoalesceExpr {
    fn eval(&self, env: &Environment) -> EvalResult<Datum> {
        for operand in &self.0 {
            let value = operand.eval(env)?;
            if !value.is_unknown() {
                return Ok(value);
            }
        }
        Ok(Datum::Null)
    }
}

#[derive(Debug)]
pub struct NullIfExpr {
    pub value: BoxedExpr,
    pub other: BoxedExpr,
}

impl ScalarExpr for NullIfExpr {
    fn eval(&self, env: &Environment) -> EvalResult<Datum> {
        let value = self.value.eval(env)?;
        let other = self.other.eval(env)?;
        match compare::eq(&value, &other) {
            Datum::Bool(true) => Ok(Datum::Null),
            _ => Ok(value),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::rc::Rc;

    use partiql_core::config::TypingMode;
    use partiql_operators::EvaluationSession;

    use super::*;

    pub fn env(mode: TypingMode) -> Environment {
        Environment::new(Rc::new(EvaluationSession::new().typing_mode(mode)))
    }

    pub fn lit(d: impl Into<Datum>) -> BoxedExpr {
        Box::new(Literal(d.into()))
    }

    pub fn guarded(inner: BoxedExpr) -> BoxedExpr {
        Box::new(Guarded {
            inner,
            loc: SourceLocation::new(1, 1),
        })
    }
}

#[cfg(test)]
mod tests {
    use partiql_core::config::TypingMode;

    use super::testing::{env, guarded, lit};
    use super::*;

    fn add(lhs: BoxedExpr, rhs: BoxedExpr) -> BoxedExpr {
        Box::new(BinaryExpr {
            op: BinaryOp::Add,
            lhs,
            rhs,
        })
    }

    #[test]
    fn guarded_errors_follow_typing_mode() {
        let bad = guarded(add(lit(1), lit("a")));
        assert_eq!(bad.eval(&env(TypingMode::Permissive)).unwrap(), Datum::Missing);
        let err = bad.eval(&env(TypingMode::Strict)).unwrap_err();
        assert_eq!(err.properties().get("line").map(String::as_str), Some("1"));
    }

    #[test]
    fn missing_equals_missing_is_null() {
        let eq = BinaryExpr {
            op: BinaryOp::Eq,
            lhs: lit(Datum::Missing),
            rhs: lit(Datum::Missing),
        };
        assert_eq!(eq.eval(&env(TypingMode::Strict)).unwrap(), Datum::Null);
    }

    #[test]
    fn int_equals_decimal() {
        let one = Datum::Decimal("1.0".parse().unwrap());
        let eq = BinaryExpr {
            op: BinaryOp::Eq,
            lhs: lit(1),
            rhs: lit(one),
        };
        for mode in [TypingMode::Strict, TypingMode::Permissive] {
            assert_eq!(eq.eval(&env(mode)).unwrap(), Datum::Bool(true));
        }
    }

    #[test]
    fn and_short_circuits_on_false() {
        let and = Connective {
            conjunction: true,
            operands: vec![lit(false), Box::new(Unbound { name: "x".into() })],
        };
        assert_eq!(and.eval(&env(TypingMode::Strict)).unwrap(), Datum::Bool(false));
    }

    #[test]
    fn coalesce_of_unknowns_is_null() {
        let c = CoalesceExpr(vec![lit(Datum::Missing), lit(Datum::Null)]);
        assert_eq!(c.eval(&env(TypingMode::Strict)).unwrap(), Datum::Null);
        let c = CoalesceExpr(vec![lit(Datum::Null), lit(3)]);
        assert_eq!(c.eval(&env(TypingMode::Strict)).unwrap(), Datum::Int(3));
    }

    #[test]
    fn case_without_default_is_null() {
        let case = CaseExpr {
            branches: vec![(lit(Datum::Null), lit(1)), (lit(false), lit(2))],
            default: None,
        };
        assert_eq!(case.eval(&env(TypingMode::Strict)).unwrap(), Datum::Null);
    }

    #[test]
    fn unbound_depends_on_mode() {
        let x = guarded(Box::new(Unbound { name: "x".into() }));
        assert_eq!(x.eval(&env(TypingMode::Permissive)).unwrap(), Datum::Missing);
        assert_eq!(
            x.eval(&env(TypingMode::Strict)).unwrap_err().properties()["binding_name"],
            "x"
        );
    }

    #[test]
    fn nullif_equal_values() {
        let n = NullIfExpr {
            value: lit(2),
            other: lit(2),
        };
        assert_eq!(n.eval(&env(TypingMode::Strict)).unwrap(), Datum::Null);
    }

    fn truth() -> impl proptest::strategy::Strategy<Value = Datum> {
        use proptest::prelude::*;
        prop_oneof![
            any::<bool>().prop_map(Datum::Bool),
            Just(Datum::Null),
            Just(Datum::Missing),
        ]
    }

    proptest::proptest! {
        #[test]
        fn connectives_never_return_missing(values in proptest::collection::vec(truth(), 1..6)) {
            for conjunction in [true, false] {
                let expr = Connective {
                    conjunction,
                    operands: values.iter().cloned().map(lit).collect(),
                };
                let out = expr.eval(&env(TypingMode::Strict)).unwrap();
                let decisive = Datum::Bool(!conjunction);
                if values.contains(&decisive) {
                    proptest::prop_assert_eq!(out, decisive);
                } else if values.iter().any(|v| v.is_null() || v.is_missing()) {
                    proptest::prop_assert_eq!(out, Datum::Null);
                } else {
                    proptest::prop_assert_eq!(out, Datum::Bool(conjunction));
                }
            }
        }
    }
}
