//! The plan algebra: `Rex` scalar expressions and `Rel` relational expressions.
//!
//! Trees own their children by value and are never mutated in place; every
//! rewrite produces a new tree (see `visit`).

mod rel;
mod rex;
pub mod visit;

use std::fmt;

use serde::Serialize;

pub use rel::{Column, GroupAs, JoinKind, NullOrder, Rel, RelOp, RelType, SetOp, SortOrder, SortSpec};
pub use rex::{
    unknowns_of, AggCall, BinaryOp, Call, CallTarget, PathStep, Rex, RexOp, SetQuantifier,
    SubqueryCoercion, UnaryOp, VarRef,
};

use crate::error::Result;
use crate::hash::{fingerprint, Fingerprint};

/// A complete query plan: one root expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub root: Rex,
}

impl Plan {
    pub fn new(root: Rex) -> Self {
        Self { root }
    }

    pub fn fingerprint(&self) -> Result<Fingerprint> {
        fingerprint(self)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Rex]) -> fmt::Result {
    for item in items {
        write!(f, " {item}")?;
    }
    Ok(())
}

/// S-expression rendering, e.g. `(and (lit true) (var 0 1))`.
impl fmt::Display for Rex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.op {
            RexOp::Lit(d) => write!(f, "(lit {d})"),
            RexOp::Var(VarRef::Local { depth, offset }) => write!(f, "(var {depth} {offset})"),
            RexOp::Var(VarRef::Global(id)) => write!(f, "(global {})", id.get()),
            RexOp::Param(i) => write!(f, "(param {i})"),
            RexOp::Path { root, step } => match step {
                PathStep::Index(i) => write!(f, "(path {root} [{i}])"),
                PathStep::Key(k) => write!(f, "(path {root} [{k}])"),
                PathStep::Symbol { name, .. } => write!(f, "(path {root} {name})"),
            },
            RexOp::Unary { op, operand } => {
                let sym = match op {
                    UnaryOp::Not => "not",
                    UnaryOp::Neg => "neg",
                    UnaryOp::Pos => "pos",
                };
                write!(f, "({sym} {operand})")
            }
            RexOp::Binary { op, lhs, rhs } => write!(f, "({} {lhs} {rhs})", op.symbol()),
            RexOp::And(ops) => {
                write!(f, "(and")?;
                write_list(f, ops)?;
                write!(f, ")")
            }
            RexOp::Or(ops) => {
                write!(f, "(or")?;
                write_list(f, ops)?;
                write!(f, ")")
            }
            RexOp::Between { value, from, to } => write!(f, "(between {value} {from} {to})"),
            RexOp::Like {
                value,
                pattern,
                escape,
            } => match escape {
                Some(e) => write!(f, "(like {value} {pattern} {e})"),
                None => write!(f, "(like {value} {pattern})"),
            },
            RexOp::In { value, collection } => write!(f, "(in {value} {collection})"),
            RexOp::IsType { operand, target } => write!(f, "(is {} {operand})", target.name()),
            RexOp::Call(c) => {
                write!(f, "(call {}", c.name)?;
                write_list(f, &c.args)?;
                write!(f, ")")
            }
            RexOp::Agg(a) => {
                write!(f, "(agg {}", a.name)?;
                if a.quantifier == SetQuantifier::Distinct {
                    write!(f, " distinct")?;
                }
                write_list(f, &a.args)?;
                write!(f, ")")
            }
            RexOp::Case { branches, default } => {
                write!(f, "(case")?;
                for (c, t) in branches {
                    write!(f, " (when {c} {t})")?;
                }
                if let Some(d) = default {
                    write!(f, " (else {d})")?;
                }
                write!(f, ")")
            }
            RexOp::Coalesce(ops) => {
                write!(f, "(coalesce")?;
                write_list(f, ops)?;
                write!(f, ")")
            }
            RexOp::NullIf { value, other } => write!(f, "(nullif {value} {other})"),
            RexOp::Cast { operand, target } => write!(f, "(cast {operand} {})", target.name()),
            RexOp::CanCast { operand, target } => {
                write!(f, "(can_cast {operand} {})", target.name())
            }
            RexOp::Collection { kind, values } => {
                let name = match kind {
                    crate::datum::CollectionKind::List => "list",
                    crate::datum::CollectionKind::Bag => "bag",
                    crate::datum::CollectionKind::Sexp => "sexp",
                };
                write!(f, "({name}")?;
                write_list(f, values)?;
                write!(f, ")")
            }
            RexOp::Struct(fields) => {
                write!(f, "(struct")?;
                for (k, v) in fields {
                    write!(f, " ({k} {v})")?;
                }
                write!(f, ")")
            }
            RexOp::TupleUnion(ops) => {
                write!(f, "(tuple_union")?;
                write_list(f, ops)?;
                write!(f, ")")
            }
            RexOp::Select { constructor, rel } => write!(f, "(select {constructor} {rel})"),
            RexOp::Subquery {
                select,
                coercion: SubqueryCoercion::Scalar,
            } => write!(f, "(subquery {select})"),
            RexOp::Subquery {
                select,
                coercion: SubqueryCoercion::Collection,
            } => write!(f, "(subquery_coll {select})"),
            RexOp::Missing { .. } => write!(f, "(missing)"),
        }
    }
}

impl fmt::Display for Rel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.op {
            RelOp::Scan { rex } => write!(f, "(scan {rex})"),
            RelOp::ScanIndexed { rex } => write!(f, "(scan_indexed {rex})"),
            RelOp::Unpivot { rex } => write!(f, "(unpivot {rex})"),
            RelOp::Filter { input, predicate } => write!(f, "(filter {predicate} {input})"),
            RelOp::Project { input, projections } => {
                write!(f, "(project")?;
                write_list(f, projections)?;
                write!(f, " {input})")
            }
            RelOp::Join {
                lhs,
                rhs,
                condition,
                kind,
            } => {
                let k = match kind {
                    JoinKind::Inner => "inner",
                    JoinKind::Left => "left",
                };
                write!(f, "(join {k} {condition} {lhs} {rhs})")
            }
            RelOp::Aggregate {
                input,
                groups,
                calls,
                ..
            } => {
                write!(f, "(aggregate (groups")?;
                write_list(f, groups)?;
                write!(f, ") (calls")?;
                write_list(f, calls)?;
                write!(f, ") {input})")
            }
            RelOp::Sort { input, specs } => {
                write!(f, "(sort")?;
                for s in specs {
                    let o = match s.order {
                        SortOrder::Asc => "asc",
                        SortOrder::Desc => "desc",
                    };
                    write!(f, " ({o} {})", s.rex)?;
                }
                write!(f, " {input})")
            }
            RelOp::Distinct { input } => write!(f, "(distinct {input})"),
            RelOp::Limit { input, limit } => write!(f, "(limit {limit} {input})"),
            RelOp::Offset { input, offset } => write!(f, "(offset {offset} {input})"),
            RelOp::Set {
                op,
                quantifier,
                lhs,
                rhs,
            } => {
                let o = match op {
                    SetOp::Union => "union",
                    SetOp::Intersect => "intersect",
                    SetOp::Except => "except",
                };
                let q = match quantifier {
                    SetQuantifier::All => " all",
                    SetQuantifier::Distinct => "",
                };
                write!(f, "({o}{q} {lhs} {rhs})")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StaticType;

    #[test]
    fn renders_sexpr() {
        let and = Rex::and(
            vec![Rex::lit_bool(true), Rex::local(0, 1, StaticType::BOOL)],
            StaticType::BOOL,
        )
        .unwrap();
        assert_eq!(and.to_string(), "(and (lit true) (var 0 1))");
    }

    #[test]
    fn fingerprint_tracks_structure() {
        let a = Plan::new(Rex::lit_bool(true));
        let b = Plan::new(Rex::lit_bool(true));
        let c = Plan::new(Rex::lit_bool(false));
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        assert_ne!(a.fingerprint().unwrap(), c.fingerprint().unwrap());
    }
}
