//! SELECT, FROM and set operation lowering.
//!
//! A SELECT lowers to a relational pipeline
//! `FROM → LET → WHERE → [Aggregate → HAVING] → ORDER BY → Project → DISTINCT
//! → OFFSET → LIMIT` whose single output column is the projected value,
//! wrapped in a `Select` node that yields one value per row.

use partiql_core::datum::Datum;
use partiql_core::plan::{
    Column, GroupAs, JoinKind, NullOrder, Rel, RelOp, RelType, Rex, RexOp, SetOp, SetQuantifier,
    SortOrder, SortSpec,
};
use partiql_core::types::{SingleType, StaticType};

use super::expr::struct_type;
use super::{shape, Grouping, Translator};
use crate::ast::{Expr, ExprKind, FromSource, GroupBy, PathStep, ProjectItem, Projection, Select};
use crate::env::is_hidden;
use crate::error::{PlannerError, Result};

/// Aggregate node parts known before the calls are collected.
struct PendingAggregate {
    groups: Vec<Rex>,
    group_as: Option<GroupAs>,
    post: Vec<Column>,
}

/// Name an item gets when it has no alias: `x.a` → `a`, `x` → `x`,
/// `x['a']` → `a`.
fn derive_name(e: &Expr) -> Option<String> {
    match &e.kind {
        ExprKind::Id { ident, .. } => Some(ident.name.clone()),
        ExprKind::Path { steps, .. } => match steps.last()? {
            PathStep::Key(ident) => Some(ident.name.clone()),
            PathStep::Index(Expr {
                kind: ExprKind::Lit(Datum::String(s)),
                ..
            }) => Some(s.clone()),
            PathStep::Index(_) => None,
        },
        _ => None,
    }
}

/// Group keys are never MISSING at runtime; MISSING keys group as NULL.
fn key_type(ty: &StaticType) -> StaticType {
    if ty.may_be_missing() && !ty.is_any() {
        StaticType::any_of([ty.strip_unknowns(), StaticType::NULL])
    } else {
        ty.clone()
    }
}

fn default_nulls(order: SortOrder) -> NullOrder {
    match order {
        SortOrder::Asc => NullOrder::Last,
        SortOrder::Desc => NullOrder::First,
    }
}

fn struct_of(fields: Vec<(Rex, Rex)>) -> Rex {
    let ty = struct_type(&fields);
    Rex::new(RexOp::Struct(fields), ty)
}

/// Closed when every operand is a closed struct, open otherwise.
fn tuple_union(operands: Vec<Rex>) -> Result<Rex> {
    let mut fields = Vec::new();
    let mut closed = true;
    for op in &operands {
        match &op.ty {
            StaticType::Single(SingleType::Struct(s)) if s.closed => {
                fields.extend(s.fields.iter().cloned())
            }
            _ => closed = false,
        }
    }
    let ty = if closed {
        StaticType::closed_struct(fields)
    } else {
        StaticType::open_struct()
    };
    Ok(Rex::tuple_union(operands, ty)?)
}

impl Translator<'_> {
    pub(super) fn select(&mut self, s: &Select) -> Result<Rex> {
        let grouping = self.grouping.take();
        let globals_first = std::mem::take(&mut self.globals_first);
        let depth = self.scopes.depth();
        let out = self.select_body(s);
        while self.scopes.depth() > depth {
            self.scopes.pop();
        }
        self.grouping = grouping;
        self.globals_first = globals_first;
        out
    }

    fn select_body(&mut self, s: &Select) -> Result<Rex> {
        // Evaluated once per query, outside any row.
        let limit = s.limit.as_ref().map(|e| self.operand(e)).transpose()?;
        let offset = s.offset.as_ref().map(|e| self.operand(e)).transpose()?;

        let mut rel = self.from_source(&s.from)?;
        self.scopes.push(rel.ty.schema.clone());

        for binding in &s.lets {
            let value = self.expr(&binding.expr)?;
            let mut projections: Vec<Rex> = rel
                .ty
                .schema
                .iter()
                .enumerate()
                .map(|(i, c)| Rex::local(0, i, c.ty.clone()))
                .collect();
            let mut names: Vec<String> = rel.ty.schema.iter().map(|c| c.name.clone()).collect();
            projections.push(value);
            names.push(binding.alias.clone());
            rel = Rel::project(rel, projections, names)?;
            self.scopes.replace_top(rel.ty.schema.clone());
        }

        if let Some(predicate) = &s.where_clause {
            let predicate = self.operand(predicate)?;
            rel = Rel::filter(rel, predicate);
        }

        let pending = if is_aggregated(s) {
            Some(self.begin_grouping(&rel, s.group_by.as_ref())?)
        } else {
            None
        };

        let having = s.having.as_ref().map(|h| self.operand(h)).transpose()?;
        let specs = s
            .order_by
            .iter()
            .map(|item| {
                let order = item.order.unwrap_or(SortOrder::Asc);
                Ok(SortSpec {
                    rex: self.operand(&item.expr)?,
                    order,
                    nulls: item.nulls.unwrap_or_else(|| default_nulls(order)),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let constructor = self.constructor(&s.projection)?;

        if let Some(pending) = pending {
            rel = self.finish_aggregate(rel, pending)?;
        }
        if let Some(predicate) = having {
            rel = Rel::filter(rel, predicate);
        }
        if !specs.is_empty() {
            rel = Rel::sort(rel, specs)?;
        }

        let value_ty = constructor.ty.clone();
        rel = Rel::project(rel, vec![constructor], vec!["$value".into()])?;
        if s.distinct {
            let ty = rel.ty.clone();
            rel = Rel::new(
                RelOp::Distinct {
                    input: Box::new(rel),
                },
                ty,
            );
        }
        if let Some(offset) = offset {
            let ty = rel.ty.clone();
            rel = Rel::new(
                RelOp::Offset {
                    input: Box::new(rel),
                    offset,
                },
                ty,
            );
        }
        if let Some(limit) = limit {
            let ty = rel.ty.clone();
            rel = Rel::new(
                RelOp::Limit {
                    input: Box::new(rel),
                    limit,
                },
                ty,
            );
        }
        self.scopes.pop();

        let ty = if rel.ty.ordered {
            StaticType::list(value_ty.clone())
        } else {
            StaticType::bag(value_ty.clone())
        };
        Ok(Rex::new(
            RexOp::Select {
                constructor: Box::new(Rex::local(0, 0, value_ty)),
                rel: Box::new(rel),
            },
            ty,
        ))
    }

    fn from_source(&mut self, source: &FromSource) -> Result<Rel> {
        match source {
            FromSource::Scan {
                expr,
                as_alias,
                at_alias,
            } => {
                let rex = self.from_expr(expr)?;
                let name = match as_alias.clone().or_else(|| derive_name(expr)) {
                    Some(name) => name,
                    None => self.fresh_name(),
                };
                Ok(match at_alias {
                    None => Rel::scan(rex, name),
                    Some(at) => {
                        let schema = vec![
                            Column::new(name, rex.ty.element_type()),
                            Column::new(at.clone(), StaticType::INT8.with_missing()),
                        ];
                        Rel::new(RelOp::ScanIndexed { rex }, RelType::unordered(schema))
                    }
                })
            }
            FromSource::Unpivot {
                expr,
                as_alias,
                at_alias,
            } => {
                let rex = self.from_expr(expr)?;
                let value = match as_alias.clone().or_else(|| derive_name(expr)) {
                    Some(name) => name,
                    None => self.fresh_name(),
                };
                let key = match at_alias.clone() {
                    Some(name) => name,
                    None => self.fresh_name(),
                };
                let value_ty = match &rex.ty {
                    StaticType::Single(SingleType::Struct(st)) if st.closed => {
                        StaticType::any_of(st.fields.iter().map(|(_, t)| t.clone()))
                    }
                    _ => StaticType::Any,
                };
                let schema = vec![Column::new(value, value_ty), Column::new(key, StaticType::STRING)];
                Ok(Rel::new(RelOp::Unpivot { rex }, RelType::unordered(schema)))
            }
            FromSource::Join { kind, lhs, rhs, on } => {
                let lhs = self.from_source(lhs)?;
                // The right side is lateral: it sees the left row.
                self.scopes.push(lhs.ty.schema.clone());
                let rhs = self.from_source(rhs);
                self.scopes.pop();
                let rhs = rhs?;

                let mut schema = lhs.ty.schema.clone();
                schema.extend(rhs.ty.schema.iter().map(|c| match kind {
                    JoinKind::Inner => c.clone(),
                    JoinKind::Left => Column::new(c.name.clone(), c.ty.with_null()),
                }));
                self.scopes.push(schema.clone());
                let condition = on.as_ref().map(|e| self.operand(e)).transpose();
                self.scopes.pop();
                let condition = condition?.unwrap_or_else(|| Rex::lit_bool(true));

                Ok(Rel::new(
                    RelOp::Join {
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                        condition,
                        kind: *kind,
                    },
                    RelType::unordered(schema),
                ))
            }
        }
    }

    fn from_expr(&mut self, e: &Expr) -> Result<Rex> {
        self.globals_first = true;
        let rex = self.expr(e);
        self.globals_first = false;
        rex
    }

    /// Translate the GROUP BY keys against the input row and switch the
    /// innermost scope to the aggregate's output.
    fn begin_grouping(&mut self, input: &Rel, group_by: Option<&GroupBy>) -> Result<PendingAggregate> {
        let pre = input.ty.schema.clone();
        let mut groups = Vec::new();
        let mut keys = Vec::new();
        let mut post = Vec::new();

        for (i, key) in group_by.map_or(&[][..], |g| &g.keys[..]).iter().enumerate() {
            let rex = self.operand(&key.expr)?;
            let ty = key_type(&rex.ty);
            let name = key
                .alias
                .clone()
                .or_else(|| derive_name(&key.expr))
                .unwrap_or_else(|| format!("_{}", i + 1));
            keys.push((shape(&key.expr), ty.clone()));
            post.push(Column::new(name, ty));
            groups.push(rex);
        }

        let group_as = group_by.and_then(|g| g.group_as.clone()).map(|name| {
            post.push(Column::new(
                name.clone(),
                StaticType::bag(StaticType::open_struct()),
            ));
            GroupAs {
                name,
                fields: pre.iter().map(|c| c.name.clone()).collect(),
            }
        });

        tracing::trace!(keys = groups.len(), group_as = group_as.is_some(), "grouping");
        self.grouping = Some(Grouping {
            keys,
            pre,
            calls: Vec::new(),
            base: post.len(),
            in_agg_args: false,
        });
        self.scopes.replace_top(post.clone());
        Ok(PendingAggregate {
            groups,
            group_as,
            post,
        })
    }

    fn finish_aggregate(&mut self, input: Rel, pending: PendingAggregate) -> Result<Rel> {
        let grouping = self
            .grouping
            .take()
            .ok_or_else(|| PlannerError::Malformed("aggregation context lost".into()))?;
        let mut schema = pending.post;
        schema.extend(
            grouping
                .calls
                .iter()
                .enumerate()
                .map(|(i, c)| Column::new(format!("$agg{i}"), c.ty.clone())),
        );
        Ok(Rel::new(
            RelOp::Aggregate {
                input: Box::new(input),
                groups: pending.groups,
                calls: grouping.calls,
                group_as: pending.group_as,
            },
            RelType::unordered(schema),
        ))
    }

    /// The per-row value of a SELECT.
    fn constructor(&mut self, projection: &Projection) -> Result<Rex> {
        match projection {
            Projection::Value(e) => self.expr(e),
            Projection::Star => {
                let columns: Vec<Rex> = self
                    .scopes
                    .top()
                    .unwrap_or(&[])
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| !is_hidden(&c.name))
                    .map(|(i, c)| Rex::local(0, i, c.ty.clone()))
                    .collect();
                if columns.is_empty() {
                    Ok(struct_of(Vec::new()))
                } else {
                    tuple_union(columns)
                }
            }
            Projection::Items(items) => {
                let mut operands = Vec::new();
                let mut run: Vec<(Rex, Rex)> = Vec::new();
                let mut spread = false;
                for (i, item) in items.iter().enumerate() {
                    match item {
                        ProjectItem::Expr { expr, alias } => {
                            let value = self.operand(expr)?;
                            let name = alias
                                .clone()
                                .or_else(|| derive_name(expr))
                                .unwrap_or_else(|| format!("_{}", i + 1));
                            run.push((Rex::lit(Datum::string(name)), value));
                        }
                        ProjectItem::All(expr) => {
                            spread = true;
                            if !run.is_empty() {
                                operands.push(struct_of(std::mem::take(&mut run)));
                            }
                            operands.push(self.expr(expr)?);
                        }
                    }
                }
                if !spread {
                    return Ok(struct_of(run));
                }
                if !run.is_empty() {
                    operands.push(struct_of(run));
                }
                tuple_union(operands)
            }
        }
    }

    pub(super) fn set_op(
        &mut self,
        op: SetOp,
        quantifier: SetQuantifier,
        lhs: &Expr,
        rhs: &Expr,
    ) -> Result<Rex> {
        let lhs = self.expr(lhs)?;
        let rhs = self.expr(rhs)?;
        let element = StaticType::any_of([lhs.ty.element_type(), rhs.ty.element_type()]);
        let rel = Rel::new(
            RelOp::Set {
                op,
                quantifier,
                lhs: Box::new(Rel::scan(lhs, "$lhs")),
                rhs: Box::new(Rel::scan(rhs, "$rhs")),
            },
            RelType::unordered(vec![Column::new("$value", element.clone())]),
        );
        Ok(Rex::new(
            RexOp::Select {
                constructor: Box::new(Rex::local(0, 0, element.clone())),
                rel: Box::new(rel),
            },
            StaticType::bag(element),
        ))
    }
}

/// A SELECT aggregates when it groups, filters groups, or calls an
/// aggregate in its projection or ordering.
fn is_aggregated(s: &Select) -> bool {
    if s.group_by.is_some() || s.having.is_some() {
        return true;
    }
    let in_projection = match &s.projection {
        Projection::Star => false,
        Projection::Value(e) => e.contains_aggregate(),
        Projection::Items(items) => items.iter().any(|item| match item {
            ProjectItem::All(e) | ProjectItem::Expr { expr: e, .. } => e.contains_aggregate(),
        }),
    };
    in_projection || s.order_by.iter().any(|o| o.expr.contains_aggregate())
}
