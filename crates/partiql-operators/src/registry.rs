//! Function registry and overload resolution.
//!
//! The registry is built once (usually `FunctionRegistry::builtins()`) and is
//! read-only afterwards; planner and compiler share it by reference.
//!
//! Resolution against static argument types:
//! 1. A signature is a *static* candidate when it accepts every possible
//!    member of every argument type. The candidate needing the fewest implicit
//!    coercions wins; ties go to the earlier registration.
//! 2. Otherwise every signature accepting at least one member of each argument
//!    becomes a *dynamic* candidate, to be chosen per row from runtime types.
//! 3. Otherwise there is no match.

use std::collections::HashMap;
use std::sync::Arc;

use partiql_core::id::{AggId, FnId};
use partiql_core::types::{SingleType, StaticType};

use crate::signature::{accepts, ArgMatch, AggSignature, FnSignature};
use crate::traits::{AggregateFunction, ScalarFunction};

/// Outcome of resolving a scalar call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FnResolution {
    /// One signature accepts every possible argument. `coercions[i]` names the
    /// implicit cast to apply to argument `i`, if any.
    Static {
        id: FnId,
        coercions: Vec<Option<SingleType>>,
    },
    /// Candidates to try in order against runtime argument types.
    Dynamic(Vec<FnId>),
    NoMatch,
}

#[derive(Debug, Default, Clone)]
pub struct FunctionRegistry {
    scalars: Vec<Arc<dyn ScalarFunction>>,
    aggregates: Vec<Arc<dyn AggregateFunction>>,
    scalar_names: HashMap<String, Vec<FnId>>,
    aggregate_names: HashMap<String, Vec<AggId>>,
}

/// Per-argument static check: `Some(coercion)` when every known member is
/// accepted; the count of coerced arguments is the candidate's cost.
fn static_match(params: &[StaticType], args: &[StaticType]) -> Option<Vec<Option<SingleType>>> {
    if params.len() != args.len() {
        return None;
    }
    let mut coercions = Vec::with_capacity(args.len());
    for (param, arg) in params.iter().zip(args) {
        let Some(members) = arg.singles() else {
            if param.is_any() {
                coercions.push(None);
                continue;
            }
            return None;
        };
        let mut target = None;
        for m in members.into_iter().filter(|m| !m.is_unknown()) {
            match accepts(param, m)? {
                ArgMatch::Exact => {}
                ArgMatch::Coerce(t) => target = Some(t),
            }
        }
        coercions.push(target);
    }
    Some(coercions)
}

/// Per-argument dynamic check: some member of every argument is accepted.
fn dynamic_match(params: &[StaticType], args: &[StaticType]) -> bool {
    params.len() == args.len()
        && params.iter().zip(args).all(|(param, arg)| match arg.singles() {
            None => true,
            Some(members) => {
                members.iter().all(|m| m.is_unknown())
                    || members.iter().any(|m| accepts(param, m).is_some())
            }
        })
}

fn param_types<'a>(params: impl Iterator<Item = &'a crate::signature::Parameter>) -> Vec<StaticType> {
    params.map(|p| p.ty.clone()).collect()
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every builtin scalar and aggregate function.
    pub fn builtins() -> Self {
        let mut reg = Self::new();
        crate::scalar::register_builtins(&mut reg);
        crate::aggregate::register_builtins(&mut reg);
        tracing::debug!(
            scalars = reg.scalars.len(),
            aggregates = reg.aggregates.len(),
            "builtin function registry ready"
        );
        reg
    }

    pub fn register_scalar(&mut self, f: Arc<dyn ScalarFunction>) -> FnId {
        let id = FnId::new(self.scalars.len() as u64);
        self.scalar_names
            .entry(f.signature().name.clone())
            .or_default()
            .push(id);
        self.scalars.push(f);
        id
    }

    pub fn register_aggregate(&mut self, f: Arc<dyn AggregateFunction>) -> AggId {
        let id = AggId::new(self.aggregates.len() as u64);
        self.aggregate_names
            .entry(f.signature().name.clone())
            .or_default()
            .push(id);
        self.aggregates.push(f);
        id
    }

    pub fn scalar(&self, id: FnId) -> Option<&Arc<dyn ScalarFunction>> {
        self.scalars.get(id.get() as usize)
    }

    pub fn aggregate(&self, id: AggId) -> Option<&Arc<dyn AggregateFunction>> {
        self.aggregates.get(id.get() as usize)
    }

    pub fn has_scalar(&self, name: &str) -> bool {
        self.scalar_names.contains_key(&name.to_ascii_lowercase())
    }

    pub fn has_aggregate(&self, name: &str) -> bool {
        self.aggregate_names.contains_key(&name.to_ascii_lowercase())
    }

    /// Ids registered under `name`, in registration order.
    pub fn scalar_ids(&self, name: &str) -> &[FnId] {
        self.scalar_names
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Signatures registered under `name`, in registration order.
    pub fn scalar_signatures(&self, name: &str) -> Vec<&FnSignature> {
        self.scalar_names
            .get(&name.to_ascii_lowercase())
            .into_iter()
            .flatten()
            .filter_map(|id| self.scalar(*id))
            .map(|f| f.signature())
            .collect()
    }

    pub fn resolve_scalar(&self, name: &str, args: &[StaticType]) -> FnResolution {
        let Some(ids) = self.scalar_names.get(&name.to_ascii_lowercase()) else {
            return FnResolution::NoMatch;
        };

        let mut best: Option<(usize, FnId, Vec<Option<SingleType>>)> = None;
        for id in ids {
            let Some(f) = self.scalar(*id) else { continue };
            let params = param_types(f.signature().params.iter());
            if let Some(coercions) = static_match(&params, args) {
                let cost = coercions.iter().filter(|c| c.is_some()).count();
                if best.as_ref().map_or(true, |(c, _, _)| cost < *c) {
                    best = Some((cost, *id, coercions));
                }
            }
        }
        if let Some((_, id, coercions)) = best {
            return FnResolution::Static { id, coercions };
        }

        let candidates: Vec<FnId> = ids
            .iter()
            .copied()
            .filter(|id| {
                self.scalar(*id).is_some_and(|f| {
                    dynamic_match(&param_types(f.signature().params.iter()), args)
                })
            })
            .collect();
        if candidates.is_empty() {
            FnResolution::NoMatch
        } else {
            FnResolution::Dynamic(candidates)
        }
    }

    /// Static result type of a resolved call with arguments of type `args`.
    pub fn call_type(&self, resolution: &FnResolution, args: &[StaticType]) -> StaticType {
        let any_null = args.iter().any(StaticType::may_be_null);
        let any_missing = args.iter().any(StaticType::may_be_missing);
        let result_of = |sig: &FnSignature| {
            let mut parts = vec![sig.returns.clone()];
            if sig.is_nullable || (any_null && sig.is_null_call) {
                parts.push(StaticType::NULL);
            }
            if sig.is_missable || (any_missing && sig.is_missing_call) {
                parts.push(StaticType::MISSING);
            }
            StaticType::any_of(parts)
        };
        match resolution {
            FnResolution::Static { id, .. } => match self.scalar(*id) {
                Some(f) => result_of(f.signature()),
                None => StaticType::Any,
            },
            FnResolution::Dynamic(ids) => StaticType::any_of(
                ids.iter()
                    .filter_map(|id| self.scalar(*id))
                    .map(|f| result_of(f.signature()))
                    .chain([StaticType::MISSING]),
            ),
            FnResolution::NoMatch => StaticType::MISSING,
        }
    }

    /// First (fewest coercions) aggregate accepting every member of `args`.
    pub fn resolve_aggregate(&self, name: &str, args: &[StaticType]) -> Option<AggId> {
        let ids = self.aggregate_names.get(&name.to_ascii_lowercase())?;
        let mut best: Option<(usize, AggId)> = None;
        for id in ids {
            let Some(f) = self.aggregate(*id) else { continue };
            let params = param_types(f.signature().params.iter());
            if let Some(coercions) = static_match(&params, args) {
                let cost = coercions.iter().filter(|c| c.is_some()).count();
                if best.map_or(true, |(c, _)| cost < c) {
                    best = Some((cost, *id));
                }
            }
        }
        best.map(|(_, id)| id)
    }

    pub fn aggregate_type(&self, id: AggId) -> StaticType {
        match self.aggregate(id).map(|f| f.signature()) {
            Some(AggSignature {
                returns,
                is_nullable,
                ..
            }) => {
                if *is_nullable {
                    returns.with_null()
                } else {
                    returns.clone()
                }
            }
            None => StaticType::Any,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_beats_coercion() {
        let reg = FunctionRegistry::builtins();
        let FnResolution::Static { id, coercions } =
            reg.resolve_scalar("abs", &[StaticType::INT8])
        else {
            panic!("expected a static match");
        };
        assert_eq!(coercions, vec![None]);
        assert_eq!(
            reg.scalar(id).unwrap().signature().params[0].ty,
            StaticType::INT8
        );
    }

    #[test]
    fn coercion_is_recorded() {
        let reg = FunctionRegistry::builtins();
        match reg.resolve_scalar("abs", &[StaticType::INT4]) {
            FnResolution::Static { coercions, .. } => {
                assert_eq!(coercions, vec![Some(SingleType::Int8)]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn union_arguments_resolve_dynamically() {
        let reg = FunctionRegistry::builtins();
        let arg = StaticType::any_of([StaticType::INT8, StaticType::STRING]);
        match reg.resolve_scalar("upper", &[arg.clone()]) {
            FnResolution::Dynamic(ids) => assert_eq!(ids.len(), 1),
            other => panic!("unexpected {other:?}"),
        }
        let res = reg.resolve_scalar("upper", &[arg.clone()]);
        assert!(reg.call_type(&res, &[arg]).may_be_missing());
    }

    #[test]
    fn no_match() {
        let reg = FunctionRegistry::builtins();
        assert_eq!(
            reg.resolve_scalar("upper", &[StaticType::INT8]),
            FnResolution::NoMatch
        );
        assert_eq!(
            reg.resolve_scalar("no_such_fn", &[]),
            FnResolution::NoMatch
        );
    }

    #[test]
    fn null_call_adds_null_to_result() {
        let reg = FunctionRegistry::builtins();
        let arg = StaticType::STRING.with_null();
        let res = reg.resolve_scalar("upper", &[arg.clone()]);
        assert_eq!(reg.call_type(&res, &[arg]), StaticType::STRING.with_null());
    }

    #[test]
    fn aggregates_fall_back_to_any() {
        let reg = FunctionRegistry::builtins();
        let int_max = reg.resolve_aggregate("max", &[StaticType::INT8]).unwrap();
        let mixed = reg
            .resolve_aggregate(
                "max",
                &[StaticType::any_of([StaticType::INT8, StaticType::STRING])],
            )
            .unwrap();
        assert_ne!(int_max, mixed);
        assert!(reg.resolve_aggregate("count_star", &[]).is_some());
    }
}
