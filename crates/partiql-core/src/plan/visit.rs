//! Generic traversal over the plan algebra.
//!
//! `PlanRewriter` is a by-value, bottom-up-capable rewriter: every method
//! defaults to rebuilding the node with its children rewritten, so a pass only
//! overrides the variants it cares about. `walk_rex`/`walk_rel` are the
//! identity combinators an override calls to recurse.

use super::rel::{Rel, RelOp, SortSpec};
use super::rex::{AggCall, Call, PathStep, Rex, RexOp};

/// Borrowed child of a plan node.
#[derive(Debug, Clone, Copy)]
pub enum Child<'a> {
    Rex(&'a Rex),
    Rel(&'a Rel),
}

pub trait PlanRewriter {
    fn rewrite_rex(&mut self, rex: Rex) -> Rex {
        walk_rex(self, rex)
    }

    fn rewrite_rel(&mut self, rel: Rel) -> Rel {
        walk_rel(self, rel)
    }
}

fn boxed<R: PlanRewriter + ?Sized>(r: &mut R, rex: Box<Rex>) -> Box<Rex> {
    Box::new(r.rewrite_rex(*rex))
}

fn boxed_rel<R: PlanRewriter + ?Sized>(r: &mut R, rel: Box<Rel>) -> Box<Rel> {
    Box::new(r.rewrite_rel(*rel))
}

fn all<R: PlanRewriter + ?Sized>(r: &mut R, rexes: Vec<Rex>) -> Vec<Rex> {
    rexes.into_iter().map(|x| r.rewrite_rex(x)).collect()
}

fn pairs<R: PlanRewriter + ?Sized>(r: &mut R, ps: Vec<(Rex, Rex)>) -> Vec<(Rex, Rex)> {
    ps.into_iter()
        .map(|(a, b)| (r.rewrite_rex(a), r.rewrite_rex(b)))
        .collect()
}

/// Rebuild `rex` with every child rewritten by `r`; the node itself is kept.
pub fn walk_rex<R: PlanRewriter + ?Sized>(r: &mut R, rex: Rex) -> Rex {
    let Rex { ty, op, loc } = rex;
    let op = match op {
        op @ (RexOp::Lit(_) | RexOp::Var(_) | RexOp::Param(_) | RexOp::Missing { .. }) => op,
        RexOp::Path { root, step } => RexOp::Path {
            root: boxed(r, root),
            step: match step {
                PathStep::Index(i) => PathStep::Index(boxed(r, i)),
                PathStep::Key(k) => PathStep::Key(boxed(r, k)),
                s @ PathStep::Symbol { .. } => s,
            },
        },
        RexOp::Unary { op, operand } => RexOp::Unary {
            op,
            operand: boxed(r, operand),
        },
        RexOp::Binary { op, lhs, rhs } => RexOp::Binary {
            op,
            lhs: boxed(r, lhs),
            rhs: boxed(r, rhs),
        },
        RexOp::And(ops) => RexOp::And(all(r, ops)),
        RexOp::Or(ops) => RexOp::Or(all(r, ops)),
        RexOp::Between { value, from, to } => RexOp::Between {
            value: boxed(r, value),
            from: boxed(r, from),
            to: boxed(r, to),
        },
        RexOp::Like {
            value,
            pattern,
            escape,
        } => RexOp::Like {
            value: boxed(r, value),
            pattern: boxed(r, pattern),
            escape: escape.map(|e| boxed(r, e)),
        },
        RexOp::In { value, collection } => RexOp::In {
            value: boxed(r, value),
            collection: boxed(r, collection),
        },
        RexOp::IsType { operand, target } => RexOp::IsType {
            operand: boxed(r, operand),
            target,
        },
        RexOp::Call(Call { name, args, target }) => RexOp::Call(Call {
            name,
            args: all(r, args),
            target,
        }),
        RexOp::Agg(AggCall {
            name,
            args,
            quantifier,
            target,
        }) => RexOp::Agg(AggCall {
            name,
            args: all(r, args),
            quantifier,
            target,
        }),
        RexOp::Case { branches, default } => RexOp::Case {
            branches: pairs(r, branches),
            default: default.map(|d| boxed(r, d)),
        },
        RexOp::Coalesce(ops) => RexOp::Coalesce(all(r, ops)),
        RexOp::NullIf { value, other } => RexOp::NullIf {
            value: boxed(r, value),
            other: boxed(r, other),
        },
        RexOp::Cast { operand, target } => RexOp::Cast {
            operand: boxed(r, operand),
            target,
        },
        RexOp::CanCast { operand, target } => RexOp::CanCast {
            operand: boxed(r, operand),
            target,
        },
        RexOp::Collection { kind, values } => RexOp::Collection {
            kind,
            values: all(r, values),
        },
        RexOp::Struct(fields) => RexOp::Struct(pairs(r, fields)),
        RexOp::TupleUnion(ops) => RexOp::TupleUnion(all(r, ops)),
        RexOp::Select { constructor, rel } => {
            let rel = boxed_rel(r, rel);
            RexOp::Select {
                constructor: boxed(r, constructor),
                rel,
            }
        }
        RexOp::Subquery { select, coercion } => RexOp::Subquery {
            select: boxed(r, select),
            coercion,
        },
    };
    Rex { ty, op, loc }
}

/// Rebuild `rel` with every child rewritten by `r`; the node itself is kept.
pub fn walk_rel<R: PlanRewriter + ?Sized>(r: &mut R, rel: Rel) -> Rel {
    let Rel { ty, op } = rel;
    let op = match op {
        RelOp::Scan { rex } => RelOp::Scan {
            rex: r.rewrite_rex(rex),
        },
        RelOp::ScanIndexed { rex } => RelOp::ScanIndexed {
            rex: r.rewrite_rex(rex),
        },
        RelOp::Unpivot { rex } => RelOp::Unpivot {
            rex: r.rewrite_rex(rex),
        },
        RelOp::Filter { input, predicate } => {
            let input = boxed_rel(r, input);
            RelOp::Filter {
                input,
                predicate: r.rewrite_rex(predicate),
            }
        }
        RelOp::Project { input, projections } => {
            let input = boxed_rel(r, input);
            RelOp::Project {
                input,
                projections: all(r, projections),
            }
        }
        RelOp::Join {
            lhs,
            rhs,
            condition,
            kind,
        } => {
            let lhs = boxed_rel(r, lhs);
            let rhs = boxed_rel(r, rhs);
            RelOp::Join {
                lhs,
                rhs,
                condition: r.rewrite_rex(condition),
                kind,
            }
        }
        RelOp::Aggregate {
            input,
            groups,
            calls,
            group_as,
        } => {
            let input = boxed_rel(r, input);
            RelOp::Aggregate {
                input,
                groups: all(r, groups),
                calls: all(r, calls),
                group_as,
            }
        }
        RelOp::Sort { input, specs } => {
            let input = boxed_rel(r, input);
            RelOp::Sort {
                input,
                specs: specs
                    .into_iter()
                    .map(|s| SortSpec {
                        rex: r.rewrite_rex(s.rex),
                        order: s.order,
                        nulls: s.nulls,
                    })
                    .collect(),
            }
        }
        RelOp::Distinct { input } => RelOp::Distinct {
            input: boxed_rel(r, input),
        },
        RelOp::Limit { input, limit } => {
            let input = boxed_rel(r, input);
            RelOp::Limit {
                input,
                limit: r.rewrite_rex(limit),
            }
        }
        RelOp::Offset { input, offset } => {
            let input = boxed_rel(r, input);
            RelOp::Offset {
                input,
                offset: r.rewrite_rex(offset),
            }
        }
        RelOp::Set {
            op,
            quantifier,
            lhs,
            rhs,
        } => {
            let lhs = boxed_rel(r, lhs);
            RelOp::Set {
                op,
                quantifier,
                lhs,
                rhs: boxed_rel(r, rhs),
            }
        }
    };
    Rel { ty, op }
}

impl Rex {
    /// Direct children in evaluation order.
    pub fn children(&self) -> Vec<Child<'_>> {
        let mut out = Vec::new();
        match &self.op {
            RexOp::Lit(_) | RexOp::Var(_) | RexOp::Param(_) | RexOp::Missing { .. } => {}
            RexOp::Path { root, step } => {
                out.push(Child::Rex(root));
                match step {
                    PathStep::Index(x) | PathStep::Key(x) => out.push(Child::Rex(x)),
                    PathStep::Symbol { .. } => {}
                }
            }
            RexOp::Unary { operand, .. }
            | RexOp::IsType { operand, .. }
            | RexOp::Cast { operand, .. }
            | RexOp::CanCast { operand, .. } => out.push(Child::Rex(operand)),
            RexOp::Binary { lhs, rhs, .. } => {
                out.push(Child::Rex(lhs));
                out.push(Child::Rex(rhs));
            }
            RexOp::And(ops)
            | RexOp::Or(ops)
            | RexOp::Coalesce(ops)
            | RexOp::TupleUnion(ops)
            | RexOp::Collection { values: ops, .. }
            | RexOp::Call(Call { args: ops, .. })
            | RexOp::Agg(AggCall { args: ops, .. }) => out.extend(ops.iter().map(Child::Rex)),
            RexOp::Between { value, from, to } => {
                out.extend([Child::Rex(value), Child::Rex(from), Child::Rex(to)]);
            }
            RexOp::Like {
                value,
                pattern,
                escape,
            } => {
                out.extend([Child::Rex(value), Child::Rex(pattern)]);
                if let Some(e) = escape {
                    out.push(Child::Rex(e));
                }
            }
            RexOp::In { value, collection } => {
                out.extend([Child::Rex(value), Child::Rex(collection)]);
            }
            RexOp::NullIf { value, other } => {
                out.extend([Child::Rex(value), Child::Rex(other)]);
            }
            RexOp::Case { branches, default } => {
                for (cond, then) in branches {
                    out.extend([Child::Rex(cond), Child::Rex(then)]);
                }
                if let Some(d) = default {
                    out.push(Child::Rex(d));
                }
            }
            RexOp::Struct(fields) => {
                for (k, v) in fields {
                    out.extend([Child::Rex(k), Child::Rex(v)]);
                }
            }
            RexOp::Select { constructor, rel } => {
                out.extend([Child::Rel(rel), Child::Rex(constructor)]);
            }
            RexOp::Subquery { select, .. } => out.push(Child::Rex(select)),
        }
        out
    }

    /// Number of nodes in this subtree, counting relational nodes.
    pub fn node_count(&self) -> usize {
        1 + self
            .children()
            .into_iter()
            .map(|c| match c {
                Child::Rex(x) => x.node_count(),
                Child::Rel(x) => x.node_count(),
            })
            .sum::<usize>()
    }
}

impl Rel {
    /// Direct children in evaluation order.
    pub fn children(&self) -> Vec<Child<'_>> {
        let mut out = Vec::new();
        match &self.op {
            RelOp::Scan { rex } | RelOp::ScanIndexed { rex } | RelOp::Unpivot { rex } => {
                out.push(Child::Rex(rex))
            }
            RelOp::Filter { input, predicate } => {
                out.extend([Child::Rel(input), Child::Rex(predicate)]);
            }
            RelOp::Project { input, projections } => {
                out.push(Child::Rel(input));
                out.extend(projections.iter().map(Child::Rex));
            }
            RelOp::Join {
                lhs,
                rhs,
                condition,
                ..
            } => {
                out.extend([Child::Rel(lhs), Child::Rel(rhs), Child::Rex(condition)]);
            }
            RelOp::Aggregate {
                input,
                groups,
                calls,
                ..
            } => {
                out.push(Child::Rel(input));
                out.extend(groups.iter().map(Child::Rex));
                out.extend(calls.iter().map(Child::Rex));
            }
            RelOp::Sort { input, specs } => {
                out.push(Child::Rel(input));
                out.extend(specs.iter().map(|s| Child::Rex(&s.rex)));
            }
            RelOp::Distinct { input } => out.push(Child::Rel(input)),
            RelOp::Limit { input, limit } => {
                out.extend([Child::Rel(input), Child::Rex(limit)]);
            }
            RelOp::Offset { input, offset } => {
                out.extend([Child::Rel(input), Child::Rex(offset)]);
            }
            RelOp::Set { lhs, rhs, .. } => {
                out.extend([Child::Rel(lhs), Child::Rel(rhs)]);
            }
        }
        out
    }

    pub fn node_count(&self) -> usize {
        1 + self
            .children()
            .into_iter()
            .map(|c| match c {
                Child::Rex(x) => x.node_count(),
                Child::Rel(x) => x.node_count(),
            })
            .sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datum::Datum;
    use crate::types::StaticType;

    struct Identity;
    impl PlanRewriter for Identity {}

    /// Replaces every integer literal with its successor.
    struct Bump;
    impl PlanRewriter for Bump {
        fn rewrite_rex(&mut self, rex: Rex) -> Rex {
            let rex = walk_rex(self, rex);
            match rex.op {
                RexOp::Lit(Datum::Int(i)) => Rex::lit(Datum::Int(i + 1)),
                _ => rex,
            }
        }
    }

    fn sample() -> Rex {
        let rel = Rel::filter(
            Rel::scan(Rex::lit(Datum::bag([Datum::Int(1)])), "x"),
            Rex::binary(
                super::super::rex::BinaryOp::Eq,
                Rex::local(0, 0, StaticType::INT4),
                Rex::lit(Datum::Int(1)),
                StaticType::BOOL,
            ),
        );
        Rex::new(
            RexOp::Select {
                constructor: Box::new(Rex::local(0, 0, StaticType::INT4)),
                rel: Box::new(rel),
            },
            StaticType::bag(StaticType::INT4),
        )
    }

    #[test]
    fn identity_rewrite_preserves_tree() {
        let plan = sample();
        assert_eq!(Identity.rewrite_rex(plan.clone()), plan);
    }

    #[test]
    fn rewrite_reaches_nested_relations() {
        let plan = Bump.rewrite_rex(sample());
        let RexOp::Select { rel, .. } = &plan.op else {
            panic!("expected select");
        };
        let RelOp::Filter { predicate, .. } = &rel.op else {
            panic!("expected filter");
        };
        let RexOp::Binary { rhs, .. } = &predicate.op else {
            panic!("expected binary");
        };
        assert_eq!(rhs.as_lit(), Some(&Datum::Int(2)));
    }

    #[test]
    fn children_cover_subtree() {
        // select, filter, scan, bag literal, eq, var, lit, constructor var
        assert_eq!(sample().node_count(), 8);
    }
}
