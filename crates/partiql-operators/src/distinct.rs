//! SELECT DISTINCT: drops rows equal to an earlier row.
//!
//! Row equality is value equality per column, so `1` and `1.0` collapse.

use std::collections::HashSet;

use partiql_core::error::EvalResult;

use crate::env::Environment;
use crate::traits::{deferred, BoxedRel, RelOperator, Row, RowIter};

#[derive(Debug)]
pub struct Distinct {
    pub input: BoxedRel,
}

impl Distinct {
    fn build(&self, env: &Environment) -> EvalResult<Vec<Row>> {
        let mut seen: HashSet<Row> = HashSet::new();
        let mut out = Vec::new();
        for row in self.input.open(env) {
            let row = row?;
            if seen.insert(row.clone()) {
                out.push(row);
            }
        }
        Ok(out)
    }
}

impl RelOperator for Distinct {
    fn name(&self) -> &'static str {
        "distinct"
    }

    fn open<'a>(&'a self, env: &Environment) -> RowIter<'a> {
        let env = env.clone();
        deferred(move || self.build(&env))
    }
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;
    use partiql_core::config::TypingMode;
    use partiql_core::datum::Datum;

    use super::*;
    use crate::testing::{collect, env, Rows};

    #[test]
    fn keeps_first_occurrence() {
        let distinct = Distinct {
            input: Rows::of(vec![
                Datum::Int(1),
                Datum::Decimal(BigDecimal::from(1)),
                Datum::Int(2),
                Datum::Int(1),
            ]),
        };
        let rows = collect(&distinct, &env(TypingMode::Strict)).unwrap();
        assert_eq!(rows, vec![vec![Datum::Int(1)], vec![Datum::Int(2)]]);
    }
}
