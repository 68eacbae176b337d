//! Physical plan → executable tree.
//!
//! Every call site is bound here: statically resolved calls to their one
//! implementation, the rest to a runtime dispatch over the candidates. A call
//! no overload can ever accept fails when evaluated, and a call whose
//! function name does not exist at all is a `CompileError`.

use std::sync::Arc;

use partiql_core::datum::{CollectionKind, Datum};
use partiql_core::location::SourceLocation;
use partiql_core::plan::{
    Call, CallTarget, PathStep, Rel, RelOp, Rex, RexOp, SetQuantifier, VarRef,
};
use partiql_core::types::StaticType;
use partiql_operators::distinct::Distinct;
use partiql_operators::filter::Filter;
use partiql_operators::group::{Aggregate, AggregateCall};
use partiql_operators::join::Join;
use partiql_operators::limit::{Limit, Offset};
use partiql_operators::ops::like::{escape_char, LikeMatcher};
use partiql_operators::project::Project;
use partiql_operators::scan::{Scan, ScanMode};
use partiql_operators::set_op::SetOperator;
use partiql_operators::sort::{Sort, SortKey};
use partiql_operators::{BoxedExpr, BoxedRel, FnResolution, FunctionRegistry, ScalarFunction};
use partiql_planner::PhysicalPlan;

use crate::error::{CompileError, Result};
use crate::expr::call::{DynamicCall, NoMatchingCall, StaticCall};
use crate::expr::construct::{CollectionExpr, StructExpr, TupleUnionExpr};
use crate::expr::like::{LikeExpr, Pattern};
use crate::expr::query::{SelectExpr, SubqueryExpr};
use crate::expr::{
    BetweenExpr, BinaryExpr, CanCastExpr, CaseExpr, CastExpr, CoalesceExpr, Connective, GlobalVar,
    Guarded, InExpr, IsTypeExpr, Literal, LocalVar, NullIfExpr, Parameter, PathExpr, Step,
    UnaryExpr, Unbound,
};
use crate::runtime::{CompiledExpression, Root};

fn guard(inner: BoxedExpr, loc: SourceLocation) -> BoxedExpr {
    Box::new(Guarded { inner, loc })
}

/// Lowers plans against one function registry.
pub struct Compiler<'r> {
    registry: &'r FunctionRegistry,
    bound: usize,
}

impl<'r> Compiler<'r> {
    pub fn new(registry: &'r FunctionRegistry) -> Self {
        Self { registry, bound: 0 }
    }

    pub fn compile(&mut self, plan: &PhysicalPlan) -> Result<CompiledExpression> {
        self.bound = 0;
        let root = match &plan.plan.root.op {
            RexOp::Select { constructor, rel } => Root::Query(self.select(constructor, rel)?),
            _ => Root::Scalar(self.rex(&plan.plan.root)?),
        };
        tracing::debug!(
            functions = self.bound,
            fingerprint = %plan.fingerprint.short(),
            "compiled"
        );
        Ok(CompiledExpression::new(root, plan.fingerprint))
    }

    fn rexes(&mut self, rexes: &[Rex]) -> Result<Vec<BoxedExpr>> {
        rexes.iter().map(|r| self.rex(r)).collect()
    }

    fn rex(&mut self, rex: &Rex) -> Result<BoxedExpr> {
        let node: BoxedExpr = match &rex.op {
            RexOp::Lit(d) => return Ok(Box::new(Literal(d.clone()))),
            RexOp::Var(VarRef::Local { depth, offset }) => {
                return Ok(Box::new(LocalVar {
                    depth: *depth,
                    offset: *offset,
                }))
            }
            RexOp::Var(VarRef::Global(id)) => Box::new(GlobalVar(*id)),
            RexOp::Param(i) => Box::new(Parameter(*i)),
            RexOp::Path { root, step } => {
                let step = match step {
                    PathStep::Symbol {
                        name,
                        case_sensitive,
                    } => Step::Symbol {
                        name: name.clone(),
                        case_sensitive: *case_sensitive,
                    },
                    PathStep::Index(i) => Step::Index(self.rex(i)?),
                    PathStep::Key(k) => Step::Key(self.rex(k)?),
                };
                Box::new(PathExpr {
                    root: self.rex(root)?,
                    step,
                })
            }
            RexOp::Unary { op, operand } => Box::new(UnaryExpr {
                op: *op,
                operand: self.rex(operand)?,
            }),
            RexOp::Binary { op, lhs, rhs } => Box::new(BinaryExpr {
                op: *op,
                lhs: self.rex(lhs)?,
                rhs: self.rex(rhs)?,
            }),
            RexOp::And(ops) => Box::new(Connective {
                conjunction: true,
                operands: self.rexes(ops)?,
            }),
            RexOp::Or(ops) => Box::new(Connective {
                conjunction: false,
                operands: self.rexes(ops)?,
            }),
            RexOp::Between { value, from, to } => Box::new(BetweenExpr {
                value: self.rex(value)?,
                from: self.rex(from)?,
                to: self.rex(to)?,
            }),
            RexOp::Like {
                value,
                pattern,
                escape,
            } => Box::new(LikeExpr {
                value: self.rex(value)?,
                pattern: self.like_pattern(pattern, escape.as_deref())?,
            }),
            RexOp::In { value, collection } => Box::new(InExpr {
                value: self.rex(value)?,
                collection: self.rex(collection)?,
            }),
            RexOp::IsType { operand, target } => Box::new(IsTypeExpr {
                operand: self.rex(operand)?,
                target: target.clone(),
            }),
            RexOp::Call(call) => self.call(call, rex.loc)?,
            RexOp::Agg(a) => {
                return Err(CompileError::Invalid(format!(
                    "aggregate '{}' outside an aggregation",
                    a.name
                )))
            }
            RexOp::Case { branches, default } => {
                let branches = branches
                    .iter()
                    .map(|(c, v)| Ok((self.rex(c)?, self.rex(v)?)))
                    .collect::<Result<Vec<_>>>()?;
                let default = default.as_deref().map(|d| self.rex(d)).transpose()?;
                Box::new(CaseExpr { branches, default })
            }
            RexOp::Coalesce(ops) => Box::new(CoalesceExpr(self.rexes(ops)?)),
            RexOp::NullIf { value, other } => Box::new(NullIfExpr {
                value: self.rex(value)?,
                other: self.rex(other)?,
            }),
            RexOp::Cast { operand, target } => Box::new(CastExpr {
                operand: self.rex(operand)?,
                target: target.clone(),
            }),
            RexOp::CanCast { operand, target } => Box::new(CanCastExpr {
                operand: self.rex(operand)?,
                target: target.clone(),
            }),
            RexOp::Collection { kind, values } => Box::new(CollectionExpr {
                kind: *kind,
                values: self.rexes(values)?,
            }),
            RexOp::Struct(fields) => {
                let fields = fields
                    .iter()
                    .map(|(k, v)| Ok((self.rex(k)?, self.rex(v)?)))
                    .collect::<Result<Vec<_>>>()?;
                Box::new(StructExpr { fields })
            }
            RexOp::TupleUnion(ops) => Box::new(TupleUnionExpr(self.rexes(ops)?)),
            RexOp::Select { constructor, rel } => {
                return Ok(Box::new(self.select(constructor, rel)?))
            }
            RexOp::Subquery { select, coercion } => {
                let RexOp::Select { constructor, rel } = &select.op else {
                    return Err(CompileError::Invalid("subquery over a non-SELECT".into()));
                };
                return Ok(Box::new(SubqueryExpr {
                    select: self.select(constructor, rel)?,
                    coercion: *coercion,
                }));
            }
            RexOp::Missing { reason } => Box::new(Unbound {
                name: reason.clone(),
            }),
        };
        Ok(guard(node, rex.loc))
    }

    fn like_pattern(&mut self, pattern: &Rex, escape: Option<&Rex>) -> Result<Pattern> {
        let fixed_escape = match escape.map(|e| &e.op) {
            None => Some(None),
            Some(RexOp::Lit(e)) => escape_char(e).ok().map(Some),
            Some(_) => None,
        };
        if let (RexOp::Lit(p), Some(esc)) = (&pattern.op, fixed_escape) {
            if let Some(matcher) = p.as_text().and_then(|t| LikeMatcher::new(t, esc).ok()) {
                return Ok(Pattern::Fixed(matcher));
            }
        }
        Ok(Pattern::Dynamic {
            pattern: self.rex(pattern)?,
            escape: escape.map(|e| self.rex(e)).transpose()?,
        })
    }

    fn scalar(&self, id: partiql_core::id::FnId) -> Result<Arc<dyn ScalarFunction>> {
        self.registry
            .scalar(id)
            .cloned()
            .ok_or_else(|| CompileError::Invalid(format!("unregistered function {id}")))
    }

    fn call(&mut self, call: &Call, loc: SourceLocation) -> Result<BoxedExpr> {
        let args = self.rexes(&call.args)?;
        let target = match &call.target {
            CallTarget::Unresolved => {
                let types: Vec<StaticType> = call.args.iter().map(|a| a.ty.clone()).collect();
                match self.registry.resolve_scalar(&call.name, &types) {
                    FnResolution::Static { id, .. } => CallTarget::Static(id),
                    FnResolution::Dynamic(ids) => CallTarget::Dynamic(ids),
                    // A NULL or MISSING argument may still select an overload at runtime.
                    FnResolution::NoMatch if self.registry.has_scalar(&call.name) => {
                        if !types.iter().any(|t| t.may_be_null() || t.may_be_missing()) {
                            self.bound += 1;
                            return Ok(Box::new(NoMatchingCall {
                                name: call.name.clone(),
                                args,
                            }));
                        }
                        CallTarget::Dynamic(self.registry.scalar_ids(&call.name).to_vec())
                    }
                    FnResolution::NoMatch => {
                        return Err(CompileError::UnknownFunction {
                            name: call.name.clone(),
                            loc,
                        })
                    }
                }
            }
            resolved => resolved.clone(),
        };
        self.bound += 1;
        Ok(match target {
            CallTarget::Static(id) => Box::new(StaticCall {
                function: self.scalar(id)?,
                args,
            }),
            CallTarget::Dynamic(ids) => Box::new(DynamicCall {
                name: call.name.clone(),
                candidates: ids
                    .into_iter()
                    .map(|id| self.scalar(id))
                    .collect::<Result<Vec<_>>>()?,
                args,
            }),
            CallTarget::Unresolved => {
                return Err(CompileError::Invalid(format!(
                    "call '{}' left unresolved",
                    call.name
                )))
            }
        })
    }

    fn select(&mut self, constructor: &Rex, rel: &Rel) -> Result<SelectExpr> {
        let kind = if rel.ty.ordered {
            CollectionKind::List
        } else {
            CollectionKind::Bag
        };
        Ok(SelectExpr {
            rel: self.rel(rel)?,
            constructor: self.rex(constructor)?,
            kind,
        })
    }

    fn aggregate_call(&mut self, rex: &Rex) -> Result<AggregateCall> {
        let RexOp::Agg(agg) = &rex.op else {
            return Err(CompileError::Invalid(format!(
                "aggregate call expected, found {rex}"
            )));
        };
        let id = match agg.target {
            Some(id) => Some(id),
            None => {
                let types: Vec<StaticType> = agg.args.iter().map(|a| a.ty.clone()).collect();
                self.registry.resolve_aggregate(&agg.name, &types)
            }
        };
        let function = id.and_then(|id| self.registry.aggregate(id)).cloned().ok_or_else(|| {
            CompileError::UnknownAggregate {
                name: agg.name.clone(),
                arguments: agg
                    .args
                    .iter()
                    .map(|a| a.ty.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
                loc: rex.loc,
            }
        })?;
        self.bound += 1;
        Ok(AggregateCall {
            function,
            args: self.rexes(&agg.args)?,
            distinct: agg.quantifier == SetQuantifier::Distinct,
        })
    }

    fn rel(&mut self, rel: &Rel) -> Result<BoxedRel> {
        Ok(match &rel.op {
            RelOp::Scan { rex } => Box::new(Scan {
                expr: self.rex(rex)?,
                mode: ScanMode::Plain,
            }),
            RelOp::ScanIndexed { rex } => Box::new(Scan {
                expr: self.rex(rex)?,
                mode: ScanMode::Indexed,
            }),
            RelOp::Unpivot { rex } => Box::new(Scan {
                expr: self.rex(rex)?,
                mode: ScanMode::Unpivot,
            }),
            RelOp::Filter { input, predicate } => Box::new(Filter {
                input: self.rel(input)?,
                predicate: self.rex(predicate)?,
            }),
            RelOp::Project { input, projections } => Box::new(Project {
                input: self.rel(input)?,
                projections: self.rexes(projections)?,
            }),
            RelOp::Join {
                lhs,
                rhs,
                condition,
                kind,
            } => Box::new(Join {
                lhs: self.rel(lhs)?,
                rhs: self.rel(rhs)?,
                condition: self.rex(condition)?,
                kind: *kind,
                rhs_width: rhs.ty.width(),
            }),
            RelOp::Aggregate {
                input,
                groups,
                calls,
                group_as,
            } => Box::new(Aggregate {
                input: self.rel(input)?,
                groups: self.rexes(groups)?,
                calls: calls
                    .iter()
                    .map(|c| self.aggregate_call(c))
                    .collect::<Result<Vec<_>>>()?,
                group_as: group_as.as_ref().map(|g| g.fields.clone()),
            }),
            RelOp::Sort { input, specs } => Box::new(Sort {
                input: self.rel(input)?,
                keys: specs
                    .iter()
                    .map(|s| {
                        Ok(SortKey {
                            expr: self.rex(&s.rex)?,
                            order: s.order,
                            nulls: s.nulls,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?,
            }),
            RelOp::Distinct { input } => Box::new(Distinct {
                input: self.rel(input)?,
            }),
            RelOp::Limit { input, limit } => Box::new(Limit {
                input: self.rel(input)?,
                limit: self.rex(limit)?,
            }),
            RelOp::Offset { input, offset } => Box::new(Offset {
                input: self.rel(input)?,
                offset: self.rex(offset)?,
            }),
            RelOp::Set {
                op,
                quantifier,
                lhs,
                rhs,
            } => Box::new(SetOperator {
                op: *op,
                quantifier: *quantifier,
                lhs: self.rel(lhs)?,
                rhs: self.rel(rhs)?,
            }),
        })
    }
}

/// Compile `plan` against `registry`.
pub fn compile(plan: &PhysicalPlan, registry: &FunctionRegistry) -> Result<CompiledExpression> {
    Compiler::new(registry).compile(plan)
}

#[cfg(test)]
mod tests {
    use partiql_core::config::TypingMode;
    use partiql_core::plan::{BinaryOp, Plan};
    use partiql_core::types::StaticType;
    use partiql_operators::EvaluationSession;

    use super::*;

    fn physical(root: Rex) -> PhysicalPlan {
        PhysicalPlan::new(Plan::new(root)).unwrap()
    }

    fn call(name: &str, args: Vec<Rex>, target: CallTarget) -> Rex {
        Rex::new(
            RexOp::Call(Call {
                name: name.into(),
                args,
                target,
            }),
            StaticType::Any,
        )
    }

    fn eval(root: Rex, mode: TypingMode) -> partiql_core::error::EvalResult<Datum> {
        let registry = FunctionRegistry::builtins();
        let compiled = compile(&physical(root), &registry).unwrap();
        let value = compiled.eval(EvaluationSession::new().typing_mode(mode))?;
        value.materialize()
    }

    #[test]
    fn unresolved_call_is_bound_at_compile_time() {
        let upper = call(
            "upper",
            vec![Rex::lit(Datum::string("ab"))],
            CallTarget::Unresolved,
        );
        assert_eq!(eval(upper, TypingMode::Strict).unwrap(), Datum::string("AB"));
    }

    #[test]
    fn unknown_function_fails_to_compile() {
        let registry = FunctionRegistry::builtins();
        let plan = physical(call("nope", vec![], CallTarget::Unresolved));
        assert!(matches!(
            compile(&plan, &registry),
            Err(CompileError::UnknownFunction { name, .. }) if name == "nope"
        ));
    }

    #[test]
    fn known_function_with_wrong_types_fails_at_runtime() {
        let bad = call("upper", vec![Rex::lit(Datum::Int(1))], CallTarget::Unresolved);
        assert_eq!(eval(bad.clone(), TypingMode::Permissive).unwrap(), Datum::Missing);
        assert!(eval(bad, TypingMode::Strict).is_err());
    }

    #[test]
    fn statically_impossible_call_is_not_dispatched() {
        let registry = FunctionRegistry::builtins();
        let mut compiler = Compiler::new(&registry);
        let bad = call("upper", vec![Rex::lit(Datum::Int(1))], CallTarget::Unresolved);
        let node = format!("{:?}", compiler.rex(&bad).unwrap());
        assert!(node.contains("NoMatchingCall"), "{node}");

        let nullable = Rex::global(
            partiql_core::id::GlobalId::new(0),
            StaticType::INT8.with_null(),
        );
        let maybe = call("upper", vec![nullable], CallTarget::Unresolved);
        let node = format!("{:?}", compiler.rex(&maybe).unwrap());
        assert!(node.contains("DynamicCall"), "{node}");
    }

    #[test]
    fn literal_like_pattern_is_compiled_once() {
        let registry = FunctionRegistry::builtins();
        let mut compiler = Compiler::new(&registry);
        let pattern = Rex::lit(Datum::string("a\\%%"));
        let escape = Rex::lit(Datum::string("\\"));
        match compiler.like_pattern(&pattern, Some(&escape)).unwrap() {
            Pattern::Fixed(m) => {
                assert!(m.matches("a%bc"));
                assert!(!m.matches("abc"));
            }
            Pattern::Dynamic { .. } => panic!("literal pattern should be fixed"),
        }
    }

    #[test]
    fn strict_and_permissive_type_failures() {
        let bad = Rex::binary(
            BinaryOp::Add,
            Rex::lit(Datum::Int(1)),
            Rex::lit(Datum::string("a")),
            StaticType::Any,
        );
        assert_eq!(eval(bad.clone(), TypingMode::Permissive).unwrap(), Datum::Missing);
        let err = eval(bad, TypingMode::Strict).unwrap_err();
        assert_eq!(err.code(), partiql_core::error::ErrorCode::TypeMismatch);
    }

    #[test]
    fn missing_node_depends_on_typing_mode() {
        let missing = Rex::missing("ghost");
        assert_eq!(eval(missing.clone(), TypingMode::Permissive).unwrap(), Datum::Missing);
        assert_eq!(
            eval(missing, TypingMode::Strict).unwrap_err().properties()["binding_name"],
            "ghost"
        );
    }
}
