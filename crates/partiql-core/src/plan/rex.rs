//! Scalar expressions.

use serde::Serialize;

use crate::datum::{CollectionKind, Datum};
use crate::error::{Error, Result};
use crate::id::{AggId, FnId, GlobalId};
use crate::location::SourceLocation;
use crate::types::{SingleType, StaticType};

use super::rel::Rel;

/// A typed scalar expression node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rex {
    pub ty: StaticType,
    pub op: RexOp,
    #[serde(skip_serializing_if = "is_unknown_loc")]
    pub loc: SourceLocation,
}

fn is_unknown_loc(loc: &SourceLocation) -> bool {
    !loc.is_known()
}

/// Resolved variable reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VarRef {
    /// `depth` counts enclosing row scopes outward from the innermost one;
    /// `offset` is the column within that row.
    Local { depth: usize, offset: usize },
    Global(GlobalId),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PathStep {
    /// `x[expr]` where `expr` is expected to be an integer.
    Index(Box<Rex>),
    /// `x[expr]` where `expr` is expected to be a string; always case-sensitive.
    Key(Box<Rex>),
    /// `x.name`
    Symbol { name: String, case_sensitive: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnaryOp {
    Not,
    Neg,
    Pos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOp {
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
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod
        )
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Concat => "||",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }
}

/// How a scalar call site is bound to registered functions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CallTarget {
    /// Not yet resolved; the compiler resolves it from argument types.
    Unresolved,
    /// One signature accepts every possible argument type.
    Static(FnId),
    /// Candidates tried in order against runtime argument types.
    Dynamic(Vec<FnId>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Call {
    pub name: String,
    pub args: Vec<Rex>,
    pub target: CallTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SetQuantifier {
    All,
    Distinct,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggCall {
    pub name: String,
    pub args: Vec<Rex>,
    pub quantifier: SetQuantifier,
    pub target: Option<AggId>,
}

/// How a subquery result is turned into a single value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubqueryCoercion {
    /// At most one row; its single column value, or NULL when empty.
    Scalar,
    /// Every row reduced to its single column value.
    Collection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RexOp {
    Lit(Datum),
    Var(VarRef),
    /// 1-based positional parameter.
    Param(usize),
    Path {
        root: Box<Rex>,
        step: PathStep,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Rex>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Rex>,
        rhs: Box<Rex>,
    },
    And(Vec<Rex>),
    Or(Vec<Rex>),
    Between {
        value: Box<Rex>,
        from: Box<Rex>,
        to: Box<Rex>,
    },
    Like {
        value: Box<Rex>,
        pattern: Box<Rex>,
        escape: Option<Box<Rex>>,
    },
    In {
        value: Box<Rex>,
        collection: Box<Rex>,
    },
    IsType {
        operand: Box<Rex>,
        target: SingleType,
    },
    Call(Call),
    Agg(AggCall),
    Case {
        branches: Vec<(Rex, Rex)>,
        default: Option<Box<Rex>>,
    },
    Coalesce(Vec<Rex>),
    NullIf {
        value: Box<Rex>,
        other: Box<Rex>,
    },
    Cast {
        operand: Box<Rex>,
        target: SingleType,
    },
    CanCast {
        operand: Box<Rex>,
        target: SingleType,
    },
    Collection {
        kind: CollectionKind,
        values: Vec<Rex>,
    },
    Struct(Vec<(Rex, Rex)>),
    /// Merge the fields of every operand struct into one struct.
    TupleUnion(Vec<Rex>),
    /// Evaluate `constructor` once per row of `rel`.
    Select {
        constructor: Box<Rex>,
        rel: Box<Rel>,
    },
    Subquery {
        select: Box<Rex>,
        coercion: SubqueryCoercion,
    },
    /// A reference that could not be resolved under permissive planning.
    Missing {
        reason: String,
    },
}

impl Rex {
    pub fn new(op: RexOp, ty: StaticType) -> Self {
        Self {
            ty,
            op,
            loc: SourceLocation::UNKNOWN,
        }
    }

    pub fn at(mut self, loc: SourceLocation) -> Self {
        self.loc = loc;
        self
    }

    pub fn lit(value: Datum) -> Self {
        let ty = value.static_type();
        Self::new(RexOp::Lit(value), ty)
    }

    pub fn lit_bool(b: bool) -> Self {
        Self::lit(Datum::Bool(b))
    }

    pub fn local(depth: usize, offset: usize, ty: StaticType) -> Self {
        Self::new(RexOp::Var(VarRef::Local { depth, offset }), ty)
    }

    pub fn global(id: GlobalId, ty: StaticType) -> Self {
        Self::new(RexOp::Var(VarRef::Global(id)), ty)
    }

    pub fn missing(reason: impl Into<String>) -> Self {
        Self::new(
            RexOp::Missing {
                reason: reason.into(),
            },
            StaticType::MISSING,
        )
    }

    pub fn unary(op: UnaryOp, operand: Rex, ty: StaticType) -> Self {
        Self::new(
            RexOp::Unary {
                op,
                operand: Box::new(operand),
            },
            ty,
        )
    }

    pub fn binary(op: BinaryOp, lhs: Rex, rhs: Rex, ty: StaticType) -> Self {
        Self::new(
            RexOp::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty,
        )
    }

    /// N-ary conjunction. Requires at least two operands.
    pub fn and(operands: Vec<Rex>, ty: StaticType) -> Result<Self> {
        if operands.len() < 2 {
            return Err(Error::Invariant(format!(
                "AND requires at least 2 operands, got {}",
                operands.len()
            )));
        }
        Ok(Self::new(RexOp::And(operands), ty))
    }

    /// N-ary disjunction. Requires at least two operands.
    pub fn or(operands: Vec<Rex>, ty: StaticType) -> Result<Self> {
        if operands.len() < 2 {
            return Err(Error::Invariant(format!(
                "OR requires at least 2 operands, got {}",
                operands.len()
            )));
        }
        Ok(Self::new(RexOp::Or(operands), ty))
    }

    pub fn between(value: Rex, from: Rex, to: Rex, ty: StaticType) -> Self {
        Self::new(
            RexOp::Between {
                value: Box::new(value),
                from: Box::new(from),
                to: Box::new(to),
            },
            ty,
        )
    }

    /// Requires at least one operand.
    pub fn coalesce(operands: Vec<Rex>, ty: StaticType) -> Result<Self> {
        if operands.is_empty() {
            return Err(Error::Invariant("COALESCE requires at least 1 operand".into()));
        }
        Ok(Self::new(RexOp::Coalesce(operands), ty))
    }

    /// Requires at least one WHEN branch.
    pub fn case(branches: Vec<(Rex, Rex)>, default: Option<Rex>, ty: StaticType) -> Result<Self> {
        if branches.is_empty() {
            return Err(Error::Invariant("CASE requires at least 1 branch".into()));
        }
        Ok(Self::new(
            RexOp::Case {
                branches,
                default: default.map(Box::new),
            },
            ty,
        ))
    }

    /// Requires at least one operand.
    pub fn tuple_union(operands: Vec<Rex>, ty: StaticType) -> Result<Self> {
        if operands.is_empty() {
            return Err(Error::Invariant("TUPLEUNION requires at least 1 operand".into()));
        }
        Ok(Self::new(RexOp::TupleUnion(operands), ty))
    }

    pub fn cast(operand: Rex, target: SingleType) -> Self {
        let ty = if operand.ty.is_unknown_only() {
            operand.ty.clone()
        } else {
            StaticType::any_of([
                StaticType::Single(target.clone()),
                unknowns_of(&operand.ty),
            ])
        };
        Self::new(
            RexOp::Cast {
                operand: Box::new(operand),
                target,
            },
            ty,
        )
    }

    /// The literal value, if this node is a literal.
    pub fn as_lit(&self) -> Option<&Datum> {
        match &self.op {
            RexOp::Lit(d) => Some(d),
            _ => None,
        }
    }

    /// True when this node is the literal `true`.
    pub fn is_lit_true(&self) -> bool {
        matches!(&self.op, RexOp::Lit(Datum::Bool(true)))
    }
}

/// The NULL/MISSING members of `ty`, as a type.
pub fn unknowns_of(ty: &StaticType) -> StaticType {
    let mut parts = Vec::new();
    if ty.may_be_null() {
        parts.push(StaticType::NULL);
    }
    if ty.may_be_missing() {
        parts.push(StaticType::MISSING);
    }
    StaticType::any_of(parts)
}
