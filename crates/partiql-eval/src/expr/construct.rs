//! Collection and struct constructors.

use partiql_core::datum::{CollectionKind, Datum, StructValue};
use partiql_core::error::{EvalError, EvalResult};
use partiql_operators::ops::type_name;
use partiql_operators::{BoxedExpr, Environment, ScalarExpr};

#[derive(Debug)]
pub struct CollectionExpr {
    pub kind: CollectionKind,
    pub values: Vec<BoxedExpr>,
}

impl ScalarExpr for CollectionExpr {
    fn eval(&self, env: &Environment) -> EvalResult<Datum> {
        let values = self
            .values
            .iter()
            .map(|v| v.eval(env))
            .collect::<EvalResult<Vec<_>>>()?;
        Ok(self.kind.wrap(values))
    }
}

/// `{k: v, ...}`. Fields whose value is MISSING are left out.
#[derive(Debug)]
pub struct StructExpr {
    pub fields: Vec<(BoxedExpr, BoxedExpr)>,
}

impl ScalarExpr for StructExpr {
    fn eval(&self, env: &Environment) -> EvalResult<Datum> {
        let mut out = StructValue::new();
        for (key, value) in &self.fields {
            let key = key.eval(env)?;
            let name = key
                .as_text()
                .ok_or_else(|| EvalError::type_mismatch("struct key", "STRING", type_name(&key)))?;
            let value = value.eval(env)?;
            if !value.is_missing() {
                out.push(name, value);
            }
        }
        Ok(Datum::Struct(out))
    }
}

/// Field-wise concatenation of structs, as built by `SELECT *` and `x.*`.
///
/// A MISSING operand contributes nothing; any other non-struct operand
/// becomes a field named after its 1-based position, `_N`.
#[derive(Debug)]
pub struct TupleUnionExpr(pub Vec<BoxedExpr>);

impl ScalarExpr for TupleUnionExpr {
    fn eval(&self, env: &Environment) -> EvalResult<Datum> {
        let mut out = StructValue::new();
        for (i, operand) in self.0.iter().enumerate() {
            match operand.eval(env)? {
                Datum::Struct(s) => {
                    for (name, value) in s.into_fields() {
                        out.push(name, value);
                    }
                }
                Datum::Missing => {}
                other => out.push(format!("_{}", i + 1), other),
            }
        }
        Ok(Datum::Struct(out))
    }
}

#[cfg(test)]
mod tests {
    use partiql_core::config::TypingMode;

    use super::super::testing::{env, lit};
    use super::*;

    #[test]
    fn struct_drops_missing_fields() {
        let s = StructExpr {
            fields: vec![(lit("a"), lit(1)), (lit("b"), lit(Datum::Missing))],
        };
        assert_eq!(
            s.eval(&env(TypingMode::Strict)).unwrap(),
            Datum::tuple([("a", Datum::Int(1))])
        );
    }

    #[test]
    fn non_text_key_is_a_type_error() {
        let s = StructExpr {
            fields: vec![(lit(1), lit(1))],
        };
        assert!(s.eval(&env(TypingMode::Strict)).is_err());
    }

    #[test]
    fn tuple_union_merges_and_names_scalars() {
        let u = TupleUnionExpr(vec![
            lit(Datum::tuple([("a", Datum::Int(1))])),
            lit(Datum::Missing),
            lit(7),
        ]);
        assert_eq!(
            u.eval(&env(TypingMode::Strict)).unwrap(),
            Datum::tuple([("a", Datum::Int(1)), ("_3", Datum::Int(7))])
        );
    }

    #[test]
    fn bag_keeps_duplicates() {
        let b = CollectionExpr {
            kind: CollectionKind::Bag,
            values: vec![lit(1), lit(1)],
        };
        assert_eq!(
            b.eval(&env(TypingMode::Strict)).unwrap(),
            Datum::bag([Datum::Int(1), Datum::Int(1)])
        );
    }
}
