//! UNION, INTERSECT and EXCEPT over bags.
//!
//! With ALL, multiplicities follow bag semantics: union adds them, intersect
//! takes the minimum, except subtracts. With DISTINCT each row appears at
//! most once. Output keeps the order in which rows are first produced.

use std::collections::HashMap;

use partiql_core::error::EvalResult;
use partiql_core::plan::{SetOp, SetQuantifier};

use crate::env::Environment;
use crate::traits::{deferred, BoxedRel, RelOperator, Row, RowIter};

#[derive(Debug)]
pub struct SetOperator {
    pub op: SetOp,
    pub quantifier: SetQuantifier,
    pub lhs: BoxedRel,
    pub rhs: BoxedRel,
}

/// Row multiplicities in first-seen order.
#[derive(Default)]
struct Counts {
    order: Vec<Row>,
    n: HashMap<Row, usize>,
}

impl Counts {
    fn gather(rows: RowIter<'_>) -> EvalResult<Self> {
        let mut counts = Counts::default();
        for row in rows {
            counts.add(row?, 1);
        }
        Ok(counts)
    }

    fn add(&mut self, row: Row, k: usize) {
        match self.n.get_mut(&row) {
            Some(n) => *n += k,
            None => {
                self.n.insert(row.clone(), k);
                self.order.push(row);
            }
        }
    }

    fn get(&self, row: &Row) -> usize {
        self.n.get(row).copied().unwrap_or(0)
    }
}

impl SetOperator {
    fn build(&self, env: &Environment) -> EvalResult<Vec<Row>> {
        let lhs = Counts::gather(self.lhs.open(env))?;
        let rhs = Counts::gather(self.rhs.open(env))?;

        let mut combined = Counts::default();
        match self.op {
            SetOp::Union => {
                for row in &lhs.order {
                    combined.add(row.clone(), lhs.get(row));
                }
                for row in &rhs.order {
                    combined.add(row.clone(), rhs.get(row));
                }
            }
            SetOp::Intersect => {
                for row in &lhs.order {
                    let k = lhs.get(row).min(rhs.get(row));
                    if k > 0 {
                        combined.add(row.clone(), k);
                    }
                }
            }
            SetOp::Except => {
                for row in &lhs.order {
                    let k = lhs.get(row).saturating_sub(rhs.get(row));
                    if k > 0 {
                        combined.add(row.clone(), k);
                    }
                }
            }
        }

        let distinct = self.quantifier == SetQuantifier::Distinct;
        let mut out = Vec::new();
        for row in combined.order.iter() {
            let k = if distinct { 1 } else { combined.get(row) };
            out.extend(std::iter::repeat(row.clone()).take(k));
        }
        Ok(out)
    }
}

impl RelOperator for SetOperator {
    fn name(&self) -> &'static str {
        match self.op {
            SetOp::Union => "union",
            SetOp::Intersect => "intersect",
            SetOp::Except => "except",
        }
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
    use crate::testing::{collect, env, ints, Rows};

    fn run(op: SetOp, quantifier: SetQuantifier, lhs: &[i64], rhs: &[i64]) -> Vec<i64> {
        let set = SetOperator {
            op,
            quantifier,
            lhs: Rows::of(ints(lhs)),
            rhs: Rows::of(ints(rhs)),
        };
        collect(&set, &env(TypingMode::Strict))
            .unwrap()
            .into_iter()
            .filter_map(|r| r[0].as_i64())
            .collect()
    }

    #[test]
    fn union_all_and_distinct() {
        assert_eq!(
            run(SetOp::Union, SetQuantifier::All, &[1, 2], &[2, 3]),
            vec![1, 2, 2, 3]
        );
        assert_eq!(
            run(SetOp::Union, SetQuantifier::Distinct, &[1, 2], &[2, 3]),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn intersect_takes_minimum() {
        assert_eq!(
            run(SetOp::Intersect, SetQuantifier::All, &[1, 1, 2], &[1, 1, 1]),
            vec![1, 1]
        );
    }

    #[test]
    fn except_subtracts() {
        assert_eq!(
            run(SetOp::Except, SetQuantifier::All, &[1, 1, 2], &[1]),
            vec![1, 2]
        );
        assert_eq!(
            run(SetOp::Except, SetQuantifier::Distinct, &[1, 1, 2], &[2]),
            vec![1]
        );
    }
}
