//! Grouping and aggregation.
//!
//! Output rows are the group key values, then the GROUP AS bag when
//! requested, then one value per aggregate call. Groups are emitted in first-seen
//! order. Without group keys there is exactly one group, so an empty input
//! still yields one row (`SELECT COUNT(*) FROM <<>>` is 0).
//!
//! MISSING group keys are grouped together with NULL keys.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use partiql_core::config::TypingMode;
use partiql_core::datum::{Datum, StructValue};
use partiql_core::error::EvalResult;

use crate::env::Environment;
use crate::traits::{
    deferred, Accumulator, AggregateFunction, BoxedExpr, BoxedRel, RelOperator, Row, RowIter,
};

/// One aggregate call site, e.g. `SUM(DISTINCT x.price)`.
#[derive(Debug)]
pub struct AggregateCall {
    pub function: Arc<dyn AggregateFunction>,
    pub args: Vec<BoxedExpr>,
    pub distinct: bool,
}

#[derive(Debug)]
pub struct Aggregate {
    pub input: BoxedRel,
    pub groups: Vec<BoxedExpr>,
    pub calls: Vec<AggregateCall>,
    /// Input column names for the GROUP AS structs.
    pub group_as: Option<Vec<String>>,
}

/// Running state of one call in one group.
struct CallState {
    acc: Box<dyn Accumulator>,
    seen: Option<HashSet<Vec<Datum>>>,
    poisoned: bool,
}

struct GroupState {
    key: Vec<Datum>,
    calls: Vec<CallState>,
    members: Vec<Datum>,
}

impl Aggregate {
    fn fresh_group(&self, key: Vec<Datum>) -> GroupState {
        GroupState {
            key,
            calls: self
                .calls
                .iter()
                .map(|c| CallState {
                    acc: c.function.accumulator(),
                    seen: c.distinct.then(HashSet::new),
                    poisoned: false,
                })
                .collect(),
            members: Vec::new(),
        }
    }

    fn fold(&self, state: &mut GroupState, env: &Environment, row: &Row) -> EvalResult<()> {
        for (call, cs) in self.calls.iter().zip(state.calls.iter_mut()) {
            if cs.poisoned {
                continue;
            }
            let args = call
                .args
                .iter()
                .map(|a| a.eval(env))
                .collect::<EvalResult<Vec<_>>>()?;
            if let Some(seen) = cs.seen.as_mut() {
                if !seen.insert(args.clone()) {
                    continue;
                }
            }
            match cs.acc.next(&args) {
                Ok(()) => {}
                Err(e) if env.mode() == TypingMode::Permissive && e.is_data_error() => {
                    tracing::trace!(error = %e, "aggregate poisoned");
                    cs.poisoned = true;
                }
                Err(e) => return Err(e),
            }
        }
        if let Some(names) = &self.group_as {
            let member: StructValue = names
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect();
            state.members.push(Datum::Struct(member));
        }
        Ok(())
    }

    fn finish(&self, state: GroupState) -> EvalResult<Row> {
        let mut out = state.key;
        if self.group_as.is_some() {
            out.push(Datum::Bag(state.members));
        }
        for cs in &state.calls {
            out.push(if cs.poisoned {
                Datum::Missing
            } else {
                cs.acc.value()?
            });
        }
        Ok(out)
    }

    fn build(&self, env: &Environment) -> EvalResult<Vec<Row>> {
        let mut index: HashMap<Vec<Datum>, usize> = HashMap::new();
        let mut groups: Vec<GroupState> = Vec::new();
        if self.groups.is_empty() {
            groups.push(self.fresh_group(Vec::new()));
            index.insert(Vec::new(), 0);
        }

        for row in self.input.open(env) {
            let row = row?;
            let scoped = env.push(row.clone());
            let key = self
                .groups
                .iter()
                .map(|g| {
                    g.eval(&scoped).map(|d| match d {
                        Datum::Missing => Datum::Null,
                        other => other,
                    })
                })
                .collect::<EvalResult<Vec<_>>>()?;
            let slot = match index.get(&key) {
                Some(slot) => *slot,
                None => {
                    groups.push(self.fresh_group(key.clone()));
                    index.insert(key, groups.len() - 1);
                    groups.len() - 1
                }
            };
            self.fold(&mut groups[slot], &scoped, &row)?;
        }

        tracing::debug!(groups = groups.len(), "aggregate finished");
        groups.into_iter().map(|g| self.finish(g)).collect()
    }
}

impl RelOperator for Aggregate {
    fn name(&self) -> &'static str {
        "aggregate"
    }

    fn open<'a>(&'a self, env: &Environment) -> RowIter<'a> {
        let env = env.clone();
        deferred(move || self.build(&env))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{AggBuiltin, Count, CountStar, Sum};
    use crate::signature::{AggSignature, Parameter};
    use crate::testing::{collect, env, ints, Col, Const, Rows};
    use partiql_core::types::StaticType;

    fn sum() -> Arc<dyn AggregateFunction> {
        AggBuiltin::new(
            AggSignature::new(
                "sum",
                vec![Parameter::new("value", StaticType::Any)],
                StaticType::Any,
            ),
            || Box::new(Sum::default()),
        )
    }

    fn count_star() -> Arc<dyn AggregateFunction> {
        AggBuiltin::new(
            AggSignature::new("count_star", vec![], StaticType::INT8).non_null(),
            || Box::new(CountStar::default()),
        )
    }

    fn count() -> Arc<dyn AggregateFunction> {
        AggBuiltin::new(
            AggSignature::new(
                "count",
                vec![Parameter::new("value", StaticType::Any)],
                StaticType::INT8,
            )
            .non_null(),
            || Box::new(Count::default()),
        )
    }

    fn pairs(rows: &[(&str, i64)]) -> BoxedRel {
        Rows::boxed(
            rows.iter()
                .map(|(k, v)| vec![Datum::string(*k), Datum::Int(*v)])
                .collect(),
        )
    }

    #[test]
    fn empty_input_without_keys_yields_one_row() {
        let agg = Aggregate {
            input: Rows::of(vec![]),
            groups: vec![],
            calls: vec![
                AggregateCall {
                    function: count_star(),
                    args: vec![],
                    distinct: false,
                },
                AggregateCall {
                    function: sum(),
                    args: vec![Col::boxed(0)],
                    distinct: false,
                },
            ],
            group_as: None,
        };
        let rows = collect(&agg, &env(TypingMode::Strict)).unwrap();
        assert_eq!(rows, vec![vec![Datum::Int(0), Datum::Null]]);
    }

    #[test]
    fn groups_in_first_seen_order() {
        let agg = Aggregate {
            input: pairs(&[("b", 1), ("a", 2), ("b", 3)]),
            groups: vec![Col::boxed(0)],
            calls: vec![AggregateCall {
                function: sum(),
                args: vec![Col::boxed(1)],
                distinct: false,
            }],
            group_as: Some(vec!["k".into(), "v".into()]),
        };
        let rows = collect(&agg, &env(TypingMode::Strict)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], Datum::string("b"));
        assert_eq!(rows[0][2], Datum::Int(4));
        assert_eq!(rows[1][2], Datum::Int(2));
        match &rows[0][1] {
            Datum::Bag(members) => assert_eq!(members.len(), 2),
            other => panic!("expected bag, got {other}"),
        }
    }

    #[test]
    fn distinct_arguments_fold_once() {
        let agg = Aggregate {
            input: Rows::of(ints(&[1, 1, 2])),
            groups: vec![],
            calls: vec![AggregateCall {
                function: count(),
                args: vec![Col::boxed(0)],
                distinct: true,
            }],
            group_as: None,
        };
        let rows = collect(&agg, &env(TypingMode::Strict)).unwrap();
        assert_eq!(rows, vec![vec![Datum::Int(2)]]);
    }

    #[test]
    fn bad_argument_poisons_in_permissive_mode() {
        let make = || Aggregate {
            input: Rows::of(vec![Datum::Int(1), Datum::string("x")]),
            groups: vec![],
            calls: vec![AggregateCall {
                function: sum(),
                args: vec![Col::boxed(0)],
                distinct: false,
            }],
            group_as: None,
        };
        assert!(collect(&make(), &env(TypingMode::Strict)).is_err());
        let rows = collect(&make(), &env(TypingMode::Permissive)).unwrap();
        assert_eq!(rows, vec![vec![Datum::Missing]]);
    }

    #[test]
    fn missing_keys_group_with_null() {
        let agg = Aggregate {
            input: Rows::of(vec![Datum::Null, Datum::Missing]),
            groups: vec![Col::boxed(0)],
            calls: vec![AggregateCall {
                function: count_star(),
                args: vec![],
                distinct: false,
            }],
            group_as: None,
        };
        let rows = collect(&agg, &env(TypingMode::Strict)).unwrap();
        assert_eq!(rows, vec![vec![Datum::Null, Datum::Int(2)]]);
    }

    #[test]
    fn nothing_runs_until_pulled() {
        let agg = Aggregate {
            input: Rows::of(vec![]),
            groups: vec![Const::boxed(Datum::Int(1))],
            calls: vec![],
            group_as: None,
        };
        let env = env(TypingMode::Strict);
        let mut rows = agg.open(&env);
        assert!(rows.next().is_none());
    }
}
