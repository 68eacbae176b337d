//! Nested-loop lateral join.
//!
//! The right input is re-opened for every left row with that row in scope,
//! so correlated sources like `FROM t, t.items i` work. Output rows are the
//! left columns followed by the right columns; a LEFT join pads unmatched
//! left rows with NULLs. Both sides stream.

use partiql_core::datum::Datum;
use partiql_core::plan::JoinKind;

use crate::env::Environment;
use crate::traits::{BoxedExpr, BoxedRel, RelOperator, Row, RowIter};

#[derive(Debug)]
pub struct Join {
    pub lhs: BoxedRel,
    pub rhs: BoxedRel,
    pub condition: BoxedExpr,
    pub kind: JoinKind,
    pub rhs_width: usize,
}

impl RelOperator for Join {
    fn name(&self) -> &'static str {
        "join"
    }

    fn open<'a>(&'a self, env: &Environment) -> RowIter<'a> {
        Box::new(JoinIter {
            op: self,
            env: env.clone(),
            lhs: self.lhs.open(env),
            current: None,
            done: false,
        })
    }
}

struct Probe<'a> {
    left: Row,
    right: RowIter<'a>,
    matched: bool,
}

struct JoinIter<'a> {
    op: &'a Join,
    env: Environment,
    lhs: RowIter<'a>,
    current: Option<Probe<'a>>,
    done: bool,
}

impl<'a> Iterator for JoinIter<'a> {
    type Item = partiql_core::error::EvalResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let Some(mut probe) = self.current.take() else {
                match self.lhs.next() {
                    None => self.done = true,
                    Some(Err(e)) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                    Some(Ok(left)) => {
                        let right = self.op.rhs.open(&self.env.push(left.clone()));
                        self.current = Some(Probe {
                            left,
                            right,
                            matched: false,
                        });
                    }
                }
                continue;
            };

            match probe.right.next() {
                Some(Ok(right)) => {
                    let mut row = probe.left.clone();
                    row.extend(right);
                    let verdict = self.op.condition.eval(&self.env.push(row.clone()));
                    match verdict {
                        Ok(Datum::Bool(true)) => {
                            probe.matched = true;
                            self.current = Some(probe);
                            return Some(Ok(row));
                        }
                        Ok(_) => self.current = Some(probe),
                        Err(e) => {
                            self.done = true;
                            return Some(Err(e));
                        }
                    }
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    if !probe.matched && self.op.kind == JoinKind::Left {
                        let mut row = probe.left;
                        row.extend(std::iter::repeat(Datum::Null).take(self.op.rhs_width));
                        return Some(Ok(row));
                    }
                }
            }
        }
        None
    }
}
