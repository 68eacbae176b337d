//! Input syntax tree consumed by the planner.
//!
//! The tree is produced by an external parser (or by `builder` in tests and
//! embeddings). It is untyped and unresolved: identifiers are plain names
//! with case-sensitivity and scoping metadata.

pub mod builder;

use serde::Serialize;

use partiql_core::datum::{CollectionKind, Datum};
use partiql_core::location::SourceLocation;
use partiql_core::plan::{JoinKind, NullOrder, SetOp, SetQuantifier, SortOrder, UnaryOp};
use partiql_core::types::SingleType;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Statement {
    Query(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Case {
    /// `"Name"`: matches exactly.
    Sensitive,
    /// `Name`: matches ignoring ASCII case.
    Insensitive,
}

/// Scoping hint carried by an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Qualifier {
    Unqualified,
    /// `@name`: only local variables are considered first.
    LocalsFirst,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Ident {
    pub name: String,
    pub case: Case,
}

impl Ident {
    pub fn is_case_sensitive(&self) -> bool {
        self.case == Case::Sensitive
    }

    /// True when `candidate` is an exact match or, for a case-insensitive
    /// identifier, a match ignoring case.
    pub fn matches(&self, candidate: &str) -> bool {
        match self.case {
            Case::Sensitive => self.name == candidate,
            Case::Insensitive => self.name.eq_ignore_ascii_case(candidate),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PathStep {
    /// `.name`
    Key(Ident),
    /// `[expr]`
    Index(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExprKind {
    Lit(Datum),
    Id {
        ident: Ident,
        qualifier: Qualifier,
    },
    /// `?`, 1-based.
    Param(usize),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Path {
        root: Box<Expr>,
        steps: Vec<PathStep>,
    },
    Collection {
        kind: CollectionKind,
        values: Vec<Expr>,
    },
    Struct(Vec<(Expr, Expr)>),
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Agg {
        name: String,
        quantifier: SetQuantifier,
        args: Vec<Expr>,
    },
    /// `COUNT(*)`
    CountStar,
    /// `CASE WHEN c THEN v ... [ELSE d] END`
    SearchedCase {
        branches: Vec<(Expr, Expr)>,
        default: Option<Box<Expr>>,
    },
    /// `CASE x WHEN a THEN v ... [ELSE d] END`
    SimpleCase {
        operand: Box<Expr>,
        branches: Vec<(Expr, Expr)>,
        default: Option<Box<Expr>>,
    },
    Coalesce(Vec<Expr>),
    NullIf {
        value: Box<Expr>,
        other: Box<Expr>,
    },
    Cast {
        value: Box<Expr>,
        target: SingleType,
    },
    CanCast {
        value: Box<Expr>,
        target: SingleType,
    },
    /// `IS [NOT] NULL | MISSING | <type>`
    IsType {
        value: Box<Expr>,
        target: SingleType,
        negated: bool,
    },
    Between {
        value: Box<Expr>,
        from: Box<Expr>,
        to: Box<Expr>,
        negated: bool,
    },
    Like {
        value: Box<Expr>,
        pattern: Box<Expr>,
        escape: Option<Box<Expr>>,
        negated: bool,
    },
    In {
        value: Box<Expr>,
        collection: Box<Expr>,
        negated: bool,
    },
    Select(Box<Select>),
    SetOp {
        op: SetOp,
        quantifier: SetQuantifier,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Select {
    pub projection: Projection,
    /// `SELECT DISTINCT`
    pub distinct: bool,
    pub from: FromSource,
    pub lets: Vec<LetBinding>,
    pub where_clause: Option<Expr>,
    pub group_by: Option<GroupBy>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<Expr>,
    pub offset: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Projection {
    /// `SELECT *`
    Star,
    Items(Vec<ProjectItem>),
    /// `SELECT VALUE expr`
    Value(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ProjectItem {
    /// `expr.*`
    All(Expr),
    Expr { expr: Expr, alias: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FromSource {
    /// `expr [AS a] [AT i]`
    Scan {
        expr: Expr,
        as_alias: Option<String>,
        at_alias: Option<String>,
    },
    /// `UNPIVOT expr [AS v] [AT k]`
    Unpivot {
        expr: Expr,
        as_alias: Option<String>,
        at_alias: Option<String>,
    },
    /// Comma and CROSS joins are inner joins without a condition.
    Join {
        kind: JoinKind,
        lhs: Box<FromSource>,
        rhs: Box<FromSource>,
        on: Option<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LetBinding {
    pub expr: Expr,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupKey {
    pub expr: Expr,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupBy {
    pub keys: Vec<GroupKey>,
    pub group_as: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderItem {
    pub expr: Expr,
    pub order: Option<SortOrder>,
    pub nulls: Option<NullOrder>,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self {
            kind,
            loc: SourceLocation::UNKNOWN,
        }
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.loc = SourceLocation::new(line, column);
        self
    }
}

impl Expr {
    /// Direct sub-expressions. Nested SELECTs are opaque.
    pub fn children(&self) -> Vec<&Expr> {
        let mut out: Vec<&Expr> = Vec::new();
        match &self.kind {
            ExprKind::Lit(_)
            | ExprKind::Id { .. }
            | ExprKind::Param(_)
            | ExprKind::CountStar
            | ExprKind::Select(_) => {}
            ExprKind::Unary { operand, .. } => out.push(operand),
            ExprKind::Binary { lhs, rhs, .. } | ExprKind::SetOp { lhs, rhs, .. } => {
                out.extend([&**lhs, &**rhs])
            }
            ExprKind::Path { root, steps } => {
                out.push(root);
                for step in steps {
                    if let PathStep::Index(e) = step {
                        out.push(e);
                    }
                }
            }
            ExprKind::Collection { values, .. }
            | ExprKind::Coalesce(values)
            | ExprKind::Call { args: values, .. }
            | ExprKind::Agg { args: values, .. } => out.extend(values.iter()),
            ExprKind::Struct(fields) => {
                for (k, v) in fields {
                    out.extend([k, v]);
                }
            }
            ExprKind::SearchedCase { branches, default } => {
                for (c, v) in branches {
                    out.extend([c, v]);
                }
                out.extend(default.as_deref());
            }
            ExprKind::SimpleCase {
                operand,
                branches,
                default,
            } => {
                out.push(operand);
                for (c, v) in branches {
                    out.extend([c, v]);
                }
                out.extend(default.as_deref());
            }
            ExprKind::NullIf { value, other } => out.extend([&**value, &**other]),
            ExprKind::Cast { value, .. }
            | ExprKind::CanCast { value, .. }
            | ExprKind::IsType { value, .. } => out.push(value),
            ExprKind::Between {
                value, from, to, ..
            } => out.extend([&**value, &**from, &**to]),
            ExprKind::Like {
                value,
                pattern,
                escape,
                ..
            } => {
                out.extend([&**value, &**pattern]);
                out.extend(escape.as_deref());
            }
            ExprKind::In {
                value, collection, ..
            } => out.extend([&**value, &**collection]),
        }
        out
    }

    /// True when an aggregate call appears outside nested SELECTs.
    pub fn contains_aggregate(&self) -> bool {
        matches!(self.kind, ExprKind::Agg { .. } | ExprKind::CountStar)
            || self.children().into_iter().any(Expr::contains_aggregate)
    }
}
