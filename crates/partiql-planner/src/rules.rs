//! Plan → plan rewrites.
//!
//! Every pass is a bottom-up `PlanRewriter`: children are rewritten first,
//! then the node itself. Passes are idempotent and only fire when their
//! precondition holds statically.

use partiql_core::plan::visit::{walk_rel, walk_rex, PlanRewriter};
use partiql_core::plan::{Plan, Rel, RelOp, Rex, RexOp};
use partiql_core::types::StaticType;

use crate::typer;

pub trait Pass: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, plan: Plan) -> Plan;
}

/// Drops literal `true` operands of AND. No operands left → `true`; one
/// left → that operand. The order of the survivors is preserved.
#[derive(Debug, Default, Clone, Copy)]
pub struct RemoveUselessAnds;

#[derive(Default)]
struct AndRewriter {
    rewrites: usize,
}

impl PlanRewriter for AndRewriter {
    fn rewrite_rex(&mut self, rex: Rex) -> Rex {
        let Rex { ty, op, loc } = walk_rex(self, rex);
        let RexOp::And(operands) = op else {
            return Rex { ty, op, loc };
        };
        let before = operands.len();
        let mut kept: Vec<Rex> = operands.into_iter().filter(|o| !o.is_lit_true()).collect();
        if kept.len() == before {
            return Rex {
                ty,
                op: RexOp::And(kept),
                loc,
            };
        }
        self.rewrites += 1;
        match kept.len() {
            0 => Rex::lit_bool(true).at(loc),
            1 => kept.pop().unwrap_or_else(|| Rex::lit_bool(true)),
            _ => {
                let types: Vec<&StaticType> = kept.iter().map(|r| &r.ty).collect();
                let ty = typer::connective(&types).ty;
                Rex {
                    ty,
                    op: RexOp::And(kept),
                    loc,
                }
            }
        }
    }
}

impl Pass for RemoveUselessAnds {
    fn name(&self) -> &'static str {
        "remove_useless_ands"
    }

    fn apply(&self, plan: Plan) -> Plan {
        let mut rw = AndRewriter::default();
        let root = rw.rewrite_rex(plan.root);
        if rw.rewrites > 0 {
            tracing::trace!(pass = self.name(), rewrites = rw.rewrites, "pass applied");
        }
        Plan::new(root)
    }
}

/// Replaces `Filter(input, true)` with `input`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RemoveUselessFilters;

#[derive(Default)]
struct FilterRewriter {
    rewrites: usize,
}

impl PlanRewriter for FilterRewriter {
    fn rewrite_rel(&mut self, rel: Rel) -> Rel {
        let Rel { ty, op } = walk_rel(self, rel);
        match op {
            RelOp::Filter { input, predicate } if predicate.is_lit_true() => {
                self.rewrites += 1;
                *input
            }
            op => Rel { ty, op },
        }
    }
}

impl Pass for RemoveUselessFilters {
    fn name(&self) -> &'static str {
        "remove_useless_filters"
    }

    fn apply(&self, plan: Plan) -> Plan {
        let mut rw = FilterRewriter::default();
        let root = rw.rewrite_rex(plan.root);
        if rw.rewrites > 0 {
            tracing::trace!(pass = self.name(), rewrites = rw.rewrites, "pass applied");
        }
        Plan::new(root)
    }
}

/// Passes run in a fixed order.
pub struct Pipeline {
    passes: Vec<Box<dyn Pass>>,
}

impl Pipeline {
    pub fn new(passes: Vec<Box<dyn Pass>>) -> Self {
        Self { passes }
    }

    /// A pipeline that changes nothing.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    pub fn run(&self, plan: Plan) -> Plan {
        self.passes.iter().fold(plan, |plan, pass| pass.apply(plan))
    }
}

impl Default for Pipeline {
    /// ANDs first, so that a conjunction of `true`s leaves a filter the
    /// second pass can drop.
    fn default() -> Self {
        Self::new(vec![
            Box::new(RemoveUselessAnds),
            Box::new(RemoveUselessFilters),
        ])
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.pass_names()).finish()
    }
}
