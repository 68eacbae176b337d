//! Syntax tree → logical plan.
//!
//! `Translator` walks the tree once, resolving identifiers against the
//! lexical scopes and the catalog and typing every node bottom-up as it is
//! built. User errors never stop translation: they are reported to the
//! problem collector and the offending node lowers to a `Missing` node, so a
//! single pass reports as many problems as possible.

mod expr;
mod select;

use partiql_core::config::PlanningMode;
use partiql_core::location::SourceLocation;
use partiql_core::plan::{Column, Rex, RexOp, SubqueryCoercion};
use partiql_core::types::{SingleType, StaticType};
use partiql_operators::FunctionRegistry;

use crate::ast::{Expr, ExprKind, Ident, Projection, Qualifier, Statement};
use crate::catalog::{Catalog, Resolution};
use crate::env::{LocalLookup, Scopes};
use crate::error::Result;
use crate::problem::{Problem, ProblemCollector, ProblemDetails};

/// Aggregation context of the SELECT being translated.
#[derive(Debug)]
struct Grouping {
    /// Structural shape and type of each GROUP BY expression.
    keys: Vec<(Option<serde_json::Value>, StaticType)>,
    /// Row schema seen by the GROUP BY expressions and aggregate arguments.
    pre: Vec<Column>,
    /// Aggregate calls collected so far, in output order.
    calls: Vec<Rex>,
    /// Output column of the first aggregate call.
    base: usize,
    in_agg_args: bool,
}

pub struct Translator<'a> {
    catalog: &'a dyn Catalog,
    registry: &'a FunctionRegistry,
    mode: PlanningMode,
    scopes: Scopes,
    problems: ProblemCollector,
    /// The next identifier is the root of a FROM source.
    globals_first: bool,
    grouping: Option<Grouping>,
    anon: usize,
}

impl<'a> Translator<'a> {
    pub fn new(
        catalog: &'a dyn Catalog,
        registry: &'a FunctionRegistry,
        mode: PlanningMode,
        max_problems: usize,
    ) -> Self {
        Self {
            catalog,
            registry,
            mode,
            scopes: Scopes::new(),
            problems: ProblemCollector::new(max_problems),
            globals_first: false,
            grouping: None,
            anon: 0,
        }
    }

    pub fn translate(&mut self, stmt: &Statement) -> Result<Rex> {
        match stmt {
            Statement::Query(e) => self.expr(e),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.problems.has_errors()
    }

    pub fn finish(self) -> Vec<Problem> {
        self.problems.finish()
    }

    fn error(&mut self, loc: SourceLocation, details: ProblemDetails) {
        self.problems.report(Problem::error(loc, details));
    }

    fn warning(&mut self, loc: SourceLocation, details: ProblemDetails) {
        self.problems.report(Problem::warning(loc, details));
    }

    /// An error under strict planning, a warning under permissive planning.
    fn mode_problem(&mut self, loc: SourceLocation, details: ProblemDetails) {
        match self.mode {
            PlanningMode::Strict => self.error(loc, details),
            PlanningMode::Permissive => self.warning(loc, details),
        }
    }

    fn incompatible(&mut self, loc: SourceLocation, operator: &str, types: &[&StaticType]) {
        self.mode_problem(
            loc,
            ProblemDetails::IncompatibleTypes {
                operator: operator.to_string(),
                types: types.iter().map(|t| t.to_string()).collect(),
            },
        );
    }

    fn fresh_name(&mut self) -> String {
        self.anon += 1;
        format!("_{}", self.anon)
    }

    /// Translate `e`. Under aggregation an expression equal to a GROUP BY
    /// key becomes a reference to the key column.
    fn expr(&mut self, e: &Expr) -> Result<Rex> {
        if let Some(rex) = self.group_key_ref(e) {
            return Ok(rex);
        }
        self.expr_kind(e)
    }

    fn exprs(&mut self, es: &[Expr]) -> Result<Vec<Rex>> {
        es.iter().map(|e| self.expr(e)).collect()
    }

    /// Translate an operand of a scalar operator or call. A SQL-style
    /// SELECT in that position is coerced to its single value.
    fn operand(&mut self, e: &Expr) -> Result<Rex> {
        let rex = self.expr(e)?;
        match &e.kind {
            ExprKind::Select(s) if !matches!(s.projection, Projection::Value(_)) => {
                Ok(scalar_subquery(rex))
            }
            _ => Ok(rex),
        }
    }

    /// Translate the right-hand side of IN. A SQL-style SELECT there
    /// becomes the collection of its rows' single values.
    fn collection_operand(&mut self, e: &Expr) -> Result<Rex> {
        let rex = self.expr(e)?;
        match &e.kind {
            ExprKind::Select(s) if !matches!(s.projection, Projection::Value(_)) => {
                Ok(collection_subquery(rex))
            }
            _ => Ok(rex),
        }
    }

    fn operands(&mut self, es: &[Expr]) -> Result<Vec<Rex>> {
        es.iter().map(|e| self.operand(e)).collect()
    }

    fn group_key_ref(&self, e: &Expr) -> Option<Rex> {
        let grouping = self.grouping.as_ref().filter(|g| !g.in_agg_args)?;
        if grouping.keys.is_empty() {
            return None;
        }
        let key = shape(e)?;
        grouping
            .keys
            .iter()
            .position(|(k, _)| k.as_ref() == Some(&key))
            .map(|i| Rex::local(0, i, grouping.keys[i].1.clone()).at(e.loc))
    }

    /// Bind an identifier: locals innermost-first, then the catalog. The
    /// root of a FROM source consults the catalog first unless written `@x`.
    fn resolve_id(&mut self, ident: &Ident, qualifier: Qualifier, loc: SourceLocation) -> Rex {
        let globals_first =
            std::mem::take(&mut self.globals_first) && qualifier == Qualifier::Unqualified;
        if globals_first {
            if let Some(rex) = self.resolve_global(ident, loc) {
                return rex;
            }
        }

        match self.scopes.lookup(ident) {
            LocalLookup::Found { depth, offset, ty } => return Rex::local(depth, offset, ty).at(loc),
            LocalLookup::Ambiguous(candidates) => return self.ambiguous(ident, candidates, loc),
            LocalLookup::NotFound => {}
        }

        if self.hidden_by_grouping(ident) {
            self.error(loc, ProblemDetails::NotGrouped);
            return Rex::missing(format!("'{}' is not grouped", ident.name)).at(loc);
        }

        if !globals_first {
            if let Some(rex) = self.resolve_global(ident, loc) {
                return rex;
            }
        }

        self.mode_problem(
            loc,
            ProblemDetails::UndefinedVariable {
                name: ident.name.clone(),
                case_sensitive: ident.is_case_sensitive(),
            },
        );
        Rex::missing(ident.name.clone()).at(loc)
    }

    fn resolve_global(&mut self, ident: &Ident, loc: SourceLocation) -> Option<Rex> {
        match self
            .catalog
            .resolve(&ident.name, ident.is_case_sensitive())
        {
            Resolution::Global(id) => Some(Rex::global(id, self.catalog.get_type(id)).at(loc)),
            Resolution::Ambiguous(candidates) => Some(self.ambiguous(ident, candidates, loc)),
            Resolution::Undefined => None,
        }
    }

    fn ambiguous(&mut self, ident: &Ident, candidates: Vec<String>, loc: SourceLocation) -> Rex {
        self.error(
            loc,
            ProblemDetails::AmbiguousBinding {
                name: ident.name.clone(),
                candidates,
            },
        );
        Rex::missing(format!("'{}' is ambiguous", ident.name)).at(loc)
    }

    /// True when `ident` names an input column that aggregation removed.
    fn hidden_by_grouping(&mut self, ident: &Ident) -> bool {
        let Some(pre) = self
            .grouping
            .as_ref()
            .filter(|g| !g.in_agg_args)
            .map(|g| g.pre.clone())
        else {
            return false;
        };
        let post = self.scopes.replace_top(pre);
        let hit = matches!(self.scopes.lookup(ident), LocalLookup::Found { depth: 0, .. });
        if let Some(post) = post {
            self.scopes.replace_top(post);
        }
        hit
    }
}

/// Structural identity of an expression, ignoring source locations.
fn shape(e: &Expr) -> Option<serde_json::Value> {
    let mut v = serde_json::to_value(e).ok()?;
    strip_locations(&mut v);
    Some(v)
}

fn strip_locations(v: &mut serde_json::Value) {
    match v {
        serde_json::Value::Object(map) => {
            map.remove("loc");
            map.values_mut().for_each(strip_locations);
        }
        serde_json::Value::Array(items) => items.iter_mut().for_each(strip_locations),
        _ => {}
    }
}

/// The type of the single field of the rows `select` produces, when known.
fn single_field_type(select: &Rex) -> Option<StaticType> {
    match select.ty.element_type() {
        StaticType::Single(SingleType::Struct(s)) if s.closed && s.fields.len() == 1 => {
            Some(s.fields[0].1.clone())
        }
        _ => None,
    }
}

fn subquery(select: Rex, coercion: SubqueryCoercion, ty: StaticType) -> Rex {
    let loc = select.loc;
    Rex::new(
        RexOp::Subquery {
            select: Box::new(select),
            coercion,
        },
        ty,
    )
    .at(loc)
}

/// Wrap a SELECT so that it yields the value of its single row's single
/// field (NULL when empty).
fn scalar_subquery(select: Rex) -> Rex {
    let ty = single_field_type(&select).map_or(StaticType::Any, |t| t.with_null());
    subquery(select, SubqueryCoercion::Scalar, ty)
}

/// Wrap a SELECT so that it yields the single field value of every row.
fn collection_subquery(select: Rex) -> Rex {
    let element = single_field_type(&select).unwrap_or(StaticType::Any);
    let ty = match &select.ty {
        StaticType::Single(SingleType::List(_)) => StaticType::list(element),
        _ => StaticType::bag(element),
    };
    subquery(select, SubqueryCoercion::Collection, ty)
}
