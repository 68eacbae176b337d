//! Scalar expression translation.

use partiql_core::datum::Datum;
use partiql_core::location::SourceLocation;
use partiql_core::plan::{
    AggCall, BinaryOp, Call, CallTarget, PathStep as RexStep, Rex, RexOp, SetQuantifier, UnaryOp,
};
use partiql_core::types::StaticType;
use partiql_operators::FnResolution;

use super::Translator;
use crate::ast::{BinOp, Expr, ExprKind, PathStep};
use crate::error::{PlannerError, Result};
use crate::problem::ProblemDetails;
use crate::typer;

fn binary_op(op: BinOp) -> Option<BinaryOp> {
    Some(match op {
        BinOp::Add => BinaryOp::Add,
        BinOp::Sub => BinaryOp::Sub,
        BinOp::Mul => BinaryOp::Mul,
        BinOp::Div => BinaryOp::Div,
        BinOp::Mod => BinaryOp::Mod,
        BinOp::Concat => BinaryOp::Concat,
        BinOp::Eq => BinaryOp::Eq,
        BinOp::Ne => BinaryOp::Ne,
        BinOp::Lt => BinaryOp::Lt,
        BinOp::Le => BinaryOp::Le,
        BinOp::Gt => BinaryOp::Gt,
        BinOp::Ge => BinaryOp::Ge,
        BinOp::And | BinOp::Or => return None,
    })
}

fn unary_symbol(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Not => "NOT",
        UnaryOp::Neg => "-",
        UnaryOp::Pos => "+",
    }
}

/// Collect the operands of a chain of the same connective.
fn flatten<'e>(op: BinOp, e: &'e Expr, out: &mut Vec<&'e Expr>) {
    match &e.kind {
        ExprKind::Binary { op: inner, lhs, rhs } if *inner == op => {
            flatten(op, lhs, out);
            flatten(op, rhs, out);
        }
        _ => out.push(e),
    }
}

fn integer_only(ty: &StaticType) -> bool {
    match ty.strip_unknowns().singles() {
        Some(members) => !members.is_empty() && members.iter().all(|m| m.is_integer()),
        None => false,
    }
}

fn may_be_text(ty: &StaticType) -> bool {
    match ty.singles() {
        None => true,
        Some(members) => members.iter().any(|m| m.is_text() || m.is_unknown()),
    }
}

/// Closed when every key is a literal string and no value can be MISSING
/// (a MISSING value omits its field).
pub(super) fn struct_type(fields: &[(Rex, Rex)]) -> StaticType {
    let mut out = Vec::with_capacity(fields.len());
    for (k, v) in fields {
        match k.as_lit() {
            Some(Datum::String(name)) | Some(Datum::Symbol(name)) if !v.ty.may_be_missing() => {
                out.push((name.clone(), v.ty.clone()))
            }
            _ => return StaticType::open_struct(),
        }
    }
    StaticType::closed_struct(out)
}

impl Translator<'_> {
    pub(super) fn expr_kind(&mut self, e: &Expr) -> Result<Rex> {
        let loc = e.loc;
        let rex = match &e.kind {
            ExprKind::Lit(d) => Rex::lit(d.clone()),
            ExprKind::Id { ident, qualifier } => self.resolve_id(ident, *qualifier, loc),
            ExprKind::Param(0) => {
                return Err(PlannerError::Malformed(
                    "parameter positions start at 1".into(),
                ))
            }
            ExprKind::Param(i) => Rex::new(RexOp::Param(*i), StaticType::Any),
            ExprKind::Unary { op, operand } => {
                let operand = self.operand(operand)?;
                self.unary(*op, operand, loc)
            }
            ExprKind::Binary { op, lhs, rhs } => match binary_op(*op) {
                Some(op) => {
                    let lhs = self.operand(lhs)?;
                    let rhs = self.operand(rhs)?;
                    let typed = typer::binary(op, &lhs.ty, &rhs.ty);
                    if typed.incompatible {
                        self.incompatible(loc, op.symbol(), &[&lhs.ty, &rhs.ty]);
                    }
                    Rex::binary(op, lhs, rhs, typed.ty)
                }
                None => self.connective(*op, e)?,
            },
            ExprKind::Path { root, steps } => {
                let mut rex = self.expr(root)?;
                for step in steps {
                    rex = self.path_step(rex, step, loc)?;
                }
                rex
            }
            ExprKind::Collection { kind, values } => {
                let values = self.exprs(values)?;
                let element = typer::union(values.iter().map(|v| &v.ty));
                Rex::new(
                    RexOp::Collection {
                        kind: *kind,
                        values,
                    },
                    kind.static_type(element),
                )
            }
            ExprKind::Struct(fields) => {
                let mut pairs = Vec::with_capacity(fields.len());
                for (k, v) in fields {
                    pairs.push((self.expr(k)?, self.expr(v)?));
                }
                let ty = struct_type(&pairs);
                Rex::new(RexOp::Struct(pairs), ty)
            }
            ExprKind::Call { name, args } => {
                let args = self.operands(args)?;
                self.call(name, args, loc)
            }
            ExprKind::Agg {
                name,
                quantifier,
                args,
            } => self.aggregate(name, *quantifier, args, loc)?,
            ExprKind::CountStar => self.aggregate("count_star", SetQuantifier::All, &[], loc)?,
            ExprKind::SearchedCase { branches, default } => {
                let mut out = Vec::with_capacity(branches.len());
                for (cond, value) in branches {
                    out.push((self.operand(cond)?, self.expr(value)?));
                }
                self.case(out, default.as_deref())?
            }
            ExprKind::SimpleCase {
                operand,
                branches,
                default,
            } => {
                let subject = self.operand(operand)?;
                let mut out = Vec::with_capacity(branches.len());
                for (candidate, value) in branches {
                    let candidate = self.operand(candidate)?;
                    let typed = typer::binary(BinaryOp::Eq, &subject.ty, &candidate.ty);
                    let cond = Rex::binary(BinaryOp::Eq, subject.clone(), candidate, typed.ty);
                    out.push((cond, self.expr(value)?));
                }
                self.case(out, default.as_deref())?
            }
            ExprKind::Coalesce(values) => {
                if values.is_empty() {
                    return Err(PlannerError::Malformed("COALESCE without operands".into()));
                }
                let values = self.operands(values)?;
                let types: Vec<&StaticType> = values.iter().map(|v| &v.ty).collect();
                let ty = typer::coalesce(&types);
                Rex::coalesce(values, ty)?
            }
            ExprKind::NullIf { value, other } => {
                let value = self.operand(value)?;
                let other = self.operand(other)?;
                let ty = value.ty.with_null();
                Rex::new(
                    RexOp::NullIf {
                        value: Box::new(value),
                        other: Box::new(other),
                    },
                    ty,
                )
            }
            ExprKind::Cast { value, target } => Rex::cast(self.operand(value)?, target.clone()),
            ExprKind::CanCast { value, target } => Rex::new(
                RexOp::CanCast {
                    operand: Box::new(self.operand(value)?),
                    target: target.clone(),
                },
                StaticType::BOOL,
            ),
            ExprKind::IsType {
                value,
                target,
                negated,
            } => {
                let operand = self.operand(value)?;
                let ty = typer::is_type(&operand.ty, target);
                let is = Rex::new(
                    RexOp::IsType {
                        operand: Box::new(operand),
                        target: target.clone(),
                    },
                    ty,
                );
                self.negate(is, *negated)
            }
            ExprKind::Between {
                value,
                from,
                to,
                negated,
            } => {
                let value = self.operand(value)?;
                let from = self.operand(from)?;
                let to = self.operand(to)?;
                if typer::binary(BinaryOp::Ge, &value.ty, &from.ty).incompatible
                    || typer::binary(BinaryOp::Le, &value.ty, &to.ty).incompatible
                {
                    self.incompatible(loc, "BETWEEN", &[&value.ty, &from.ty, &to.ty]);
                }
                let ty = typer::predicate(&[&value.ty, &from.ty, &to.ty]);
                let between = Rex::between(value, from, to, ty);
                self.negate(between, *negated)
            }
            ExprKind::Like {
                value,
                pattern,
                escape,
                negated,
            } => {
                let value = self.operand(value)?;
                let pattern = self.operand(pattern)?;
                let escape = escape.as_deref().map(|e| self.operand(e)).transpose()?;
                if !may_be_text(&value.ty) || !may_be_text(&pattern.ty) {
                    self.incompatible(loc, "LIKE", &[&value.ty, &pattern.ty]);
                }
                let mut types = vec![&value.ty, &pattern.ty];
                types.extend(escape.as_ref().map(|e| &e.ty));
                let ty = typer::predicate(&types);
                let like = Rex::new(
                    RexOp::Like {
                        value: Box::new(value),
                        pattern: Box::new(pattern),
                        escape: escape.map(Box::new),
                    },
                    ty,
                );
                self.negate(like, *negated)
            }
            ExprKind::In {
                value,
                collection,
                negated,
            } => {
                let value = self.operand(value)?;
                let collection = self.collection_operand(collection)?;
                let ty = typer::predicate(&[&value.ty, &collection.ty]);
                let in_rex = Rex::new(
                    RexOp::In {
                        value: Box::new(value),
                        collection: Box::new(collection),
                    },
                    ty,
                );
                self.negate(in_rex, *negated)
            }
            ExprKind::Select(select) => self.select(select)?,
            ExprKind::SetOp {
                op,
                quantifier,
                lhs,
                rhs,
            } => self.set_op(*op, *quantifier, lhs, rhs)?,
        };
        Ok(if rex.loc.is_known() { rex } else { rex.at(loc) })
    }

    fn unary(&mut self, op: UnaryOp, operand: Rex, loc: SourceLocation) -> Rex {
        let typed = typer::unary(op, &operand.ty);
        if typed.incompatible {
            self.incompatible(loc, unary_symbol(op), &[&operand.ty]);
        }
        Rex::unary(op, operand, typed.ty)
    }

    fn negate(&mut self, rex: Rex, negated: bool) -> Rex {
        if !negated {
            return rex;
        }
        let ty = typer::unary(UnaryOp::Not, &rex.ty).ty;
        Rex::unary(UnaryOp::Not, rex, ty)
    }

    /// `a AND b AND c` becomes one n-ary node.
    fn connective(&mut self, op: BinOp, e: &Expr) -> Result<Rex> {
        let mut leaves = Vec::new();
        flatten(op, e, &mut leaves);
        let operands = leaves
            .into_iter()
            .map(|x| self.operand(x))
            .collect::<Result<Vec<_>>>()?;
        let types: Vec<&StaticType> = operands.iter().map(|r| &r.ty).collect();
        let typed = typer::connective(&types);
        let name = if op == BinOp::And { "AND" } else { "OR" };
        if typed.incompatible {
            self.incompatible(e.loc, name, &types);
        }
        Ok(if op == BinOp::And {
            Rex::and(operands, typed.ty)?
        } else {
            Rex::or(operands, typed.ty)?
        })
    }

    fn path_step(&mut self, root: Rex, step: &PathStep, loc: SourceLocation) -> Result<Rex> {
        match step {
            PathStep::Key(ident) => {
                Ok(self.symbol(root, ident.name.clone(), ident.is_case_sensitive(), loc))
            }
            PathStep::Index(index) => {
                if let ExprKind::Lit(Datum::String(key)) = &index.kind {
                    return Ok(self.symbol(root, key.clone(), true, loc));
                }
                let index = self.operand(index)?;
                let (step, ty) = if integer_only(&index.ty) {
                    let ty = typer::path_index(&root.ty);
                    (RexStep::Index(Box::new(index)), ty)
                } else {
                    (RexStep::Key(Box::new(index)), StaticType::Any)
                };
                Ok(Rex::new(
                    RexOp::Path {
                        root: Box::new(root),
                        step,
                    },
                    ty,
                )
                .at(loc))
            }
        }
    }

    fn symbol(&mut self, root: Rex, name: String, case_sensitive: bool, loc: SourceLocation) -> Rex {
        let typed = typer::path_key(&root.ty, &name, case_sensitive);
        if typed.never {
            self.warning(loc, ProblemDetails::PathKeyNeverSucceeds { key: name.clone() });
        }
        Rex::new(
            RexOp::Path {
                root: Box::new(root),
                step: RexStep::Symbol {
                    name,
                    case_sensitive,
                },
            },
            typed.ty,
        )
        .at(loc)
    }

    fn case(&mut self, branches: Vec<(Rex, Rex)>, default: Option<&Expr>) -> Result<Rex> {
        if branches.is_empty() {
            return Err(PlannerError::Malformed("CASE without WHEN branches".into()));
        }
        let default = default.map(|d| self.expr(d)).transpose()?;
        let null = StaticType::NULL;
        let mut types: Vec<&StaticType> = branches.iter().map(|(_, v)| &v.ty).collect();
        types.push(default.as_ref().map_or(&null, |d| &d.ty));
        let ty = typer::union(types);
        Ok(Rex::case(branches, default, ty)?)
    }

    /// Bind a scalar call. Statically resolved calls get explicit casts on
    /// the arguments that need an implicit coercion.
    fn call(&mut self, name: &str, args: Vec<Rex>, loc: SourceLocation) -> Rex {
        let name = name.to_ascii_lowercase();
        let types: Vec<StaticType> = args.iter().map(|a| a.ty.clone()).collect();
        let resolution = self.registry.resolve_scalar(&name, &types);
        let ty = self.registry.call_type(&resolution, &types);
        let (args, target) = match resolution {
            FnResolution::Static { id, coercions } => {
                let args = args
                    .into_iter()
                    .zip(coercions)
                    .map(|(arg, coercion)| match coercion {
                        Some(target) => Rex::cast(arg, target),
                        None => arg,
                    })
                    .collect();
                (args, CallTarget::Static(id))
            }
            FnResolution::Dynamic(ids) => (args, CallTarget::Dynamic(ids)),
            FnResolution::NoMatch => {
                let details = ProblemDetails::NoMatchingFunction {
                    function: name.clone(),
                    arguments: types.iter().map(ToString::to_string).collect(),
                };
                if self.registry.has_scalar(&name) {
                    self.mode_problem(loc, details);
                } else {
                    self.error(loc, details);
                }
                (args, CallTarget::Unresolved)
            }
        };
        Rex::new(RexOp::Call(Call { name, args, target }), ty)
    }

    /// Collect an aggregate call into the enclosing aggregation and return
    /// a reference to its output column.
    fn aggregate(
        &mut self,
        name: &str,
        quantifier: SetQuantifier,
        args: &[Expr],
        loc: SourceLocation,
    ) -> Result<Rex> {
        let name = name.to_ascii_lowercase();
        let Some(pre) = self
            .grouping
            .as_ref()
            .filter(|g| !g.in_agg_args)
            .map(|g| g.pre.clone())
        else {
            self.error(
                loc,
                ProblemDetails::MisplacedAggregate {
                    function: name.clone(),
                },
            );
            return Ok(Rex::missing(format!("misplaced aggregate '{name}'")).at(loc));
        };

        let post = self.scopes.replace_top(pre);
        self.set_in_agg_args(true);
        let args = self.operands(args);
        self.set_in_agg_args(false);
        if let Some(post) = post {
            self.scopes.replace_top(post);
        }
        let args = args?;

        let types: Vec<StaticType> = args.iter().map(|a| a.ty.clone()).collect();
        let Some(id) = self.registry.resolve_aggregate(&name, &types) else {
            self.error(
                loc,
                ProblemDetails::NoMatchingFunction {
                    function: name.clone(),
                    arguments: types.iter().map(ToString::to_string).collect(),
                },
            );
            return Ok(Rex::missing(format!("no aggregate '{name}'")).at(loc));
        };
        let ty = self.registry.aggregate_type(id);
        let call = Rex::new(
            RexOp::Agg(AggCall {
                name,
                args,
                quantifier,
                target: Some(id),
            }),
            ty.clone(),
        )
        .at(loc);

        let Some(grouping) = self.grouping.as_mut() else {
            return Err(PlannerError::Malformed("aggregation context lost".into()));
        };
        let slot = match grouping.calls.iter().position(|c| c.op == call.op) {
            Some(slot) => slot,
            None => {
                grouping.calls.push(call);
                grouping.calls.len() - 1
            }
        };
        Ok(Rex::local(0, grouping.base + slot, ty).at(loc))
    }

    fn set_in_agg_args(&mut self, on: bool) {
        if let Some(g) = self.grouping.as_mut() {
            g.in_agg_args = on;
        }
    }
}
