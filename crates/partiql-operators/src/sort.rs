//! ORDER BY. Buffers its input, then emits rows in key order.
//!
//! The sort is stable: rows with equal keys keep their input order.

use std::cmp::Ordering;

use partiql_core::datum::Datum;
use partiql_core::error::EvalResult;
use partiql_core::plan::{NullOrder, SortOrder};

use crate::env::Environment;
use crate::ops::compare::sort_order;
use crate::traits::{deferred, BoxedExpr, BoxedRel, RelOperator, Row, RowIter};

#[derive(Debug)]
pub struct SortKey {
    pub expr: BoxedExpr,
    pub order: SortOrder,
    pub nulls: NullOrder,
}

#[derive(Debug)]
pub struct Sort {
    pub input: BoxedRel,
    pub keys: Vec<SortKey>,
}

impl Sort {
    fn build(&self, env: &Environment) -> EvalResult<Vec<Row>> {
        let mut keyed: Vec<(Vec<Datum>, Row)> = Vec::new();
        for row in self.input.open(env) {
            let row = row?;
            let scoped = env.push(row.clone());
            let key = self
                .keys
                .iter()
                .map(|k| k.expr.eval(&scoped))
                .collect::<EvalResult<Vec<_>>>()?;
            keyed.push((key, row));
        }
        keyed.sort_by(|(a, _), (b, _)| self.compare(a, b));
        Ok(keyed.into_iter().map(|(_, row)| row).collect())
    }

    fn compare(&self, a: &[Datum], b: &[Datum]) -> Ordering {
        for ((x, y), key) in a.iter().zip(b).zip(&self.keys) {
            match sort_order(x, y, key.order, key.nulls) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        Ordering::Equal
    }
}

impl RelOperator for Sort {
    fn name(&self) -> &'static str {
        "sort"
    }

    fn open<'a>(&'a self, env: &Environment) -> RowIter<'a> {
        let env = env.clone();
        deferred(move || self.build(&env))
    }
}

#[cfg(test)]
mod tests {
    use partiql_core::config::TypingMode;

    use super::*;
    use crate::testing::{collect, env, ints, Col, Rows};

    fn sorted(values: Vec<Datum>, order: SortOrder, nulls: NullOrder) -> Vec<Datum> {
        let sort = Sort {
            input: Rows::of(values),
            keys: vec![SortKey {
                expr: Col::boxed(0),
                order,
                nulls,
            }],
        };
        collect(&sort, &env(TypingMode::Strict))
            .unwrap()
            .into_iter()
            .map(|mut r| r.remove(0))
            .collect()
    }

    #[test]
    fn ascending_nulls_last() {
        let mut values = ints(&[3, 1]);
        values.insert(1, Datum::Null);
        assert_eq!(
            sorted(values, SortOrder::Asc, NullOrder::Last),
            vec![Datum::Int(1), Datum::Int(3), Datum::Null]
        );
    }

    #[test]
    fn descending_nulls_first() {
        let mut values = ints(&[1, 3]);
        values.push(Datum::Null);
        assert_eq!(
            sorted(values, SortOrder::Desc, NullOrder::First),
            vec![Datum::Null, Datum::Int(3), Datum::Int(1)]
        );
    }

    #[test]
    fn stable_on_ties() {
        let sort = Sort {
            input: Rows::boxed(vec![
                vec![Datum::Int(1), Datum::string("first")],
                vec![Datum::Int(1), Datum::string("second")],
            ]),
            keys: vec![SortKey {
                expr: Col::boxed(0),
                order: SortOrder::Asc,
                nulls: NullOrder::Last,
            }],
        };
        let rows = collect(&sort, &env(TypingMode::Strict)).unwrap();
        assert_eq!(rows[0][1], Datum::string("first"));
    }
}
