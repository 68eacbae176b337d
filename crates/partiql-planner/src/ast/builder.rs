//! Helpers for building syntax trees in code.
//!
//! ```
//! use partiql_planner::ast::builder::*;
//!
//! // SELECT VALUE c.name FROM Customer AS c WHERE c.id = 7
//! let q = SelectBuilder::value(path(id("c"), "name"))
//!     .from(scan(id("Customer"), "c"))
//!     .filter(eq(path(id("c"), "id"), int(7)))
//!     .build();
//! # let _ = q;
//! ```

use partiql_core::datum::{CollectionKind, Datum};
use partiql_core::plan::{JoinKind, NullOrder, SetOp, SetQuantifier, SortOrder, UnaryOp};
use partiql_core::types::SingleType;

use super::*;

pub fn query(expr: Expr) -> Statement {
    Statement::Query(expr)
}

pub fn lit(value: impl Into<Datum>) -> Expr {
    Expr::new(ExprKind::Lit(value.into()))
}

pub fn int(i: i64) -> Expr {
    lit(i)
}

pub fn string(s: &str) -> Expr {
    lit(s)
}

pub fn boolean(b: bool) -> Expr {
    lit(b)
}

pub fn null() -> Expr {
    lit(Datum::Null)
}

pub fn missing() -> Expr {
    lit(Datum::Missing)
}

/// Case-insensitive identifier.
pub fn id(name: &str) -> Expr {
    ident(name, Case::Insensitive, Qualifier::Unqualified)
}

/// Case-sensitive (quoted) identifier.
pub fn id_cs(name: &str) -> Expr {
    ident(name, Case::Sensitive, Qualifier::Unqualified)
}

/// `@name`
pub fn local(name: &str) -> Expr {
    ident(name, Case::Insensitive, Qualifier::LocalsFirst)
}

pub fn ident(name: &str, case: Case, qualifier: Qualifier) -> Expr {
    Expr::new(ExprKind::Id {
        ident: Ident {
            name: name.to_string(),
            case,
        },
        qualifier,
    })
}

pub fn param(index: usize) -> Expr {
    Expr::new(ExprKind::Param(index))
}

pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
    Expr::new(ExprKind::Unary {
        op,
        operand: Box::new(operand),
    })
}

pub fn not(operand: Expr) -> Expr {
    unary(UnaryOp::Not, operand)
}

pub fn neg(operand: Expr) -> Expr {
    unary(UnaryOp::Neg, operand)
}

pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::new(ExprKind::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

macro_rules! binary_helpers {
    ($($name:ident => $op:ident),* $(,)?) => {
        $(
            pub fn $name(lhs: Expr, rhs: Expr) -> Expr {
                binary(BinOp::$op, lhs, rhs)
            }
        )*
    };
}

binary_helpers! {
    add => Add,
    sub => Sub,
    mul => Mul,
    div => Div,
    modulo => Mod,
    concat => Concat,
    eq => Eq,
    ne => Ne,
    lt => Lt,
    le => Le,
    gt => Gt,
    ge => Ge,
    and => And,
    or => Or,
}

/// `root.key`; extends `root` when it is already a path.
pub fn path(root: Expr, key: &str) -> Expr {
    step(
        root,
        PathStep::Key(Ident {
            name: key.to_string(),
            case: Case::Insensitive,
        }),
    )
}

/// `root[index]`
pub fn index(root: Expr, index: Expr) -> Expr {
    step(root, PathStep::Index(index))
}

fn step(root: Expr, step: PathStep) -> Expr {
    let loc = root.loc;
    match root.kind {
        ExprKind::Path { root, mut steps } => {
            steps.push(step);
            Expr {
                kind: ExprKind::Path { root, steps },
                loc,
            }
        }
        kind => Expr {
            kind: ExprKind::Path {
                root: Box::new(Expr { kind, loc }),
                steps: vec![step],
            },
            loc,
        },
    }
}

pub fn bag(values: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::Collection {
        kind: CollectionKind::Bag,
        values,
    })
}

pub fn list(values: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::Collection {
        kind: CollectionKind::List,
        values,
    })
}

pub fn tuple(fields: Vec<(&str, Expr)>) -> Expr {
    Expr::new(ExprKind::Struct(
        fields.into_iter().map(|(k, v)| (string(k), v)).collect(),
    ))
}

pub fn call(name: &str, args: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::Call {
        name: name.to_string(),
        args,
    })
}

pub fn agg(name: &str, args: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::Agg {
        name: name.to_string(),
        quantifier: SetQuantifier::All,
        args,
    })
}

pub fn agg_distinct(name: &str, args: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::Agg {
        name: name.to_string(),
        quantifier: SetQuantifier::Distinct,
        args,
    })
}

pub fn count_star() -> Expr {
    Expr::new(ExprKind::CountStar)
}

pub fn cast(value: Expr, target: SingleType) -> Expr {
    Expr::new(ExprKind::Cast {
        value: Box::new(value),
        target,
    })
}

pub fn is_type(value: Expr, target: SingleType) -> Expr {
    Expr::new(ExprKind::IsType {
        value: Box::new(value),
        target,
        negated: false,
    })
}

pub fn is_null(value: Expr) -> Expr {
    is_type(value, SingleType::Null)
}

pub fn is_missing(value: Expr) -> Expr {
    is_type(value, SingleType::Missing)
}

pub fn between(value: Expr, from: Expr, to: Expr) -> Expr {
    Expr::new(ExprKind::Between {
        value: Box::new(value),
        from: Box::new(from),
        to: Box::new(to),
        negated: false,
    })
}

pub fn like(value: Expr, pattern: Expr) -> Expr {
    Expr::new(ExprKind::Like {
        value: Box::new(value),
        pattern: Box::new(pattern),
        escape: None,
        negated: false,
    })
}

pub fn in_collection(value: Expr, collection: Expr) -> Expr {
    Expr::new(ExprKind::In {
        value: Box::new(value),
        collection: Box::new(collection),
        negated: false,
    })
}

pub fn case_when(branches: Vec<(Expr, Expr)>, default: Option<Expr>) -> Expr {
    Expr::new(ExprKind::SearchedCase {
        branches,
        default: default.map(Box::new),
    })
}

pub fn coalesce(values: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::Coalesce(values))
}

pub fn set_op(op: SetOp, quantifier: SetQuantifier, lhs: Expr, rhs: Expr) -> Expr {
    Expr::new(ExprKind::SetOp {
        op,
        quantifier,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

pub fn scan(expr: Expr, alias: &str) -> FromSource {
    FromSource::Scan {
        expr,
        as_alias: Some(alias.to_string()),
        at_alias: None,
    }
}

pub fn scan_at(expr: Expr, alias: &str, at: &str) -> FromSource {
    FromSource::Scan {
        expr,
        as_alias: Some(alias.to_string()),
        at_alias: Some(at.to_string()),
    }
}

pub fn unpivot(expr: Expr, alias: &str, at: &str) -> FromSource {
    FromSource::Unpivot {
        expr,
        as_alias: Some(alias.to_string()),
        at_alias: Some(at.to_string()),
    }
}

/// `lhs, rhs`
pub fn cross(lhs: FromSource, rhs: FromSource) -> FromSource {
    FromSource::Join {
        kind: JoinKind::Inner,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        on: None,
    }
}

pub fn join(kind: JoinKind, lhs: FromSource, rhs: FromSource, on: Expr) -> FromSource {
    FromSource::Join {
        kind,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        on: Some(on),
    }
}

pub fn item(expr: Expr, alias: &str) -> ProjectItem {
    ProjectItem::Expr {
        expr,
        alias: Some(alias.to_string()),
    }
}

pub fn item_expr(expr: Expr) -> ProjectItem {
    ProjectItem::Expr { expr, alias: None }
}

/// `expr.*`
pub fn all_of(expr: Expr) -> ProjectItem {
    ProjectItem::All(expr)
}

/// Fluent construction of a `SELECT`.
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    projection: Projection,
    distinct: bool,
    from: Option<FromSource>,
    lets: Vec<LetBinding>,
    where_clause: Option<Expr>,
    group_by: Option<GroupBy>,
    having: Option<Expr>,
    order_by: Vec<OrderItem>,
    limit: Option<Expr>,
    offset: Option<Expr>,
}

impl SelectBuilder {
    fn with(projection: Projection) -> Self {
        Self {
            projection,
            distinct: false,
            from: None,
            lets: vec![],
            where_clause: None,
            group_by: None,
            having: None,
            order_by: vec![],
            limit: None,
            offset: None,
        }
    }

    pub fn star() -> Self {
        Self::with(Projection::Star)
    }

    pub fn items(items: Vec<ProjectItem>) -> Self {
        Self::with(Projection::Items(items))
    }

    pub fn value(expr: Expr) -> Self {
        Self::with(Projection::Value(expr))
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn from(mut self, source: FromSource) -> Self {
        self.from = Some(source);
        self
    }

    pub fn let_binding(mut self, expr: Expr, alias: &str) -> Self {
        self.lets.push(LetBinding {
            expr,
            alias: alias.to_string(),
        });
        self
    }

    pub fn filter(mut self, predicate: Expr) -> Self {
        self.where_clause = Some(predicate);
        self
    }

    pub fn group_by(mut self, keys: Vec<(Expr, Option<&str>)>) -> Self {
        let keys = keys
            .into_iter()
            .map(|(expr, alias)| GroupKey {
                expr,
                alias: alias.map(str::to_string),
            })
            .collect();
        let group_as = self.group_by.take().and_then(|g| g.group_as);
        self.group_by = Some(GroupBy { keys, group_as });
        self
    }

    pub fn group_as(mut self, name: &str) -> Self {
        let mut group = self.group_by.take().unwrap_or(GroupBy {
            keys: vec![],
            group_as: None,
        });
        group.group_as = Some(name.to_string());
        self.group_by = Some(group);
        self
    }

    pub fn having(mut self, predicate: Expr) -> Self {
        self.having = Some(predicate);
        self
    }

    pub fn order_by(mut self, expr: Expr, order: SortOrder) -> Self {
        self.order_by.push(OrderItem {
            expr,
            order: Some(order),
            nulls: None,
        });
        self
    }

    pub fn order_by_nulls(mut self, expr: Expr, order: SortOrder, nulls: NullOrder) -> Self {
        self.order_by.push(OrderItem {
            expr,
            order: Some(order),
            nulls: Some(nulls),
        });
        self
    }

    pub fn limit(mut self, limit: Expr) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: Expr) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Finish as a SELECT expression. A missing FROM scans `<<{}>>`.
    pub fn build(self) -> Expr {
        let from = self.from.unwrap_or_else(|| FromSource::Scan {
            expr: Expr::new(ExprKind::Lit(Datum::bag([Datum::tuple(
                Vec::<(String, Datum)>::new(),
            )]))),
            as_alias: None,
            at_alias: None,
        });
        Expr::new(ExprKind::Select(Box::new(Select {
            projection: self.projection,
            distinct: self.distinct,
            from,
            lets: self.lets,
            where_clause: self.where_clause,
            group_by: self.group_by,
            having: self.having,
            order_by: self.order_by,
            limit: self.limit,
            offset: self.offset,
        })))
    }
}
