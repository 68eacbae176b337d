//! Projection: one output row per input row, one column per expression.

use crate::env::Environment;
use crate::traits::{BoxedExpr, BoxedRel, RelOperator, RowIter};

#[derive(Debug)]
pub struct Project {
    pub input: BoxedRel,
    pub projections: Vec<BoxedExpr>,
}

impl RelOperator for Project {
    fn name(&self) -> &'static str {
        "project"
    }

    fn open<'a>(&'a self, env: &Environment) -> RowIter<'a> {
        let env = env.clone();
        let rows = self.input.open(&env);
        Box::new(rows.map(move |row| {
            let scoped = env.push(row?);
            self.projections.iter().map(|p| p.eval(&scoped)).collect()
        }))
    }
}
