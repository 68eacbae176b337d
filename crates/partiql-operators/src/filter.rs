//! Filter operator: keeps rows whose predicate is exactly `true`.
//!
//! Streaming; NULL, MISSING and `false` all drop the row.

use partiql_core::datum::Datum;

use crate::env::Environment;
use crate::traits::{BoxedExpr, BoxedRel, RelOperator, RowIter};

#[derive(Debug)]
pub struct Filter {
    pub input: BoxedRel,
    pub predicate: BoxedExpr,
}

impl RelOperator for Filter {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn open<'a>(&'a self, env: &Environment) -> RowIter<'a> {
        let env = env.clone();
        let rows = self.input.open(&env);
        Box::new(rows.filter_map(move |row| {
            let row = match row {
                Ok(row) => row,
                Err(e) => return Some(Err(e)),
            };
            match self.predicate.eval(&env.push(row.clone())) {
                Ok(Datum::Bool(true)) => Some(Ok(row)),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            }
        }))
    }
}
