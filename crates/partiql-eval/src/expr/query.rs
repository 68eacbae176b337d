//! SELECT as a value, and coerced subqueries.

use partiql_core::datum::{CollectionKind, Datum};
use partiql_core::error::{EvalError, EvalResult};
use partiql_core::plan::SubqueryCoercion;
use partiql_operators::ops::type_name;
use partiql_operators::{BoxedExpr, BoxedRel, Environment, ScalarExpr};

/// Evaluates `constructor` once per row of `rel`.
#[derive(Debug)]
pub struct SelectExpr {
    pub rel: BoxedRel,
    pub constructor: BoxedExpr,
    /// LIST when the relation is ordered, BAG otherwise.
    pub kind: CollectionKind,
}

impl SelectExpr {
    /// The lazily produced values. Dropping the iterator abandons the rest
    /// of the pipeline.
    pub fn values<'a>(
        &'a self,
        env: &Environment,
    ) -> impl Iterator<Item = EvalResult<Datum>> + 'a {
        let scope = env.clone();
        self.rel
            .open(env)
            .map(move |row| self.constructor.eval(&scope.push(row?)))
    }
}

impl ScalarExpr for SelectExpr {
    fn eval(&self, env: &Environment) -> EvalResult<Datum> {
        let values = self.values(env).collect::<EvalResult<Vec<_>>>()?;
        Ok(self.kind.wrap(values))
    }
}

/// A SQL-style SELECT used as a value. In scalar position it yields its
/// single row's single column (NULL when it produces no row); on the right
/// of IN it yields the single column of every row.
#[derive(Debug)]
pub struct SubqueryExpr {
    pub select: SelectExpr,
    pub coercion: SubqueryCoercion,
}

fn column_value(row: Datum) -> EvalResult<Datum> {
    match row {
        Datum::Struct(s) if s.len() == 1 => Ok(s.into_fields().remove(0).1),
        Datum::Struct(s) => Err(EvalError::CardinalityViolation {
            expected: 1,
            actual: s.len(),
        }),
        other => Err(EvalError::type_mismatch(
            "subquery",
            "STRUCT row",
            type_name(&other),
        )),
    }
}

fn column_values(kind: CollectionKind, rows: Vec<Datum>) -> EvalResult<Datum> {
    let values = rows
        .into_iter()
        .map(column_value)
        .collect::<EvalResult<Vec<_>>>()?;
    Ok(kind.wrap(values))
}

fn single_value(rows: Vec<Datum>) -> EvalResult<Datum> {
    let actual = rows.len();
    let mut rows = rows.into_iter();
    let (Some(row), None) = (rows.next(), rows.next()) else {
        return if actual == 0 {
            Ok(Datum::Null)
        } else {
            Err(EvalError::CardinalityViolation {
                expected: 1,
                actual,
            })
        };
    };
    column_value(row)
}

impl ScalarExpr for SubqueryExpr {
    fn eval(&self, env: &Environment) -> EvalResult<Datum> {
        // Relational failures abort in both modes; only the coercion recovers.
        let rows = self.select.values(env).collect::<EvalResult<Vec<_>>>()?;
        let coerced = match self.coercion {
            SubqueryCoercion::Scalar => single_value(rows),
            SubqueryCoercion::Collection => column_values(self.select.kind, rows),
        };
        env.recover(coerced)
    }
}
