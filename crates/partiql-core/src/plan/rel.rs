//! Relational expressions: lazy sequences of rows.
//!
//! A row is a fixed-width vector of values described by `RelType::schema`.
//! Expressions evaluated "per row" see that row as local depth 0.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::types::StaticType;

use super::rex::{Rex, SetQuantifier};

/// One column of a relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub ty: StaticType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: StaticType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelType {
    pub schema: Vec<Column>,
    /// True when row order is significant (after ORDER BY).
    pub ordered: bool,
}

impl RelType {
    pub fn unordered(schema: Vec<Column>) -> Self {
        Self {
            schema,
            ordered: false,
        }
    }

    pub fn width(&self) -> usize {
        self.schema.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rel {
    pub ty: RelType,
    pub op: RelOp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum JoinKind {
    Inner,
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NullOrder {
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SortSpec {
    pub rex: Rex,
    pub order: SortOrder,
    pub nulls: NullOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SetOp {
    Union,
    Intersect,
    Except,
}

/// `GROUP AS name`: collects each group's input rows as structs keyed by
/// the input column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupAs {
    pub name: String,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RelOp {
    /// One row per element of the collection `rex`.
    Scan { rex: Rex },
    /// Like `Scan`, with the element's position as a second column.
    ScanIndexed { rex: Rex },
    /// One `(value, name)` row per field of the struct `rex`.
    Unpivot { rex: Rex },
    Filter {
        input: Box<Rel>,
        predicate: Rex,
    },
    /// Replace each row with the values of `projections`.
    Project {
        input: Box<Rel>,
        projections: Vec<Rex>,
    },
    /// Nested-loop join. The right side is evaluated once per left row with
    /// the left row in scope; `condition` sees the concatenated row.
    Join {
        lhs: Box<Rel>,
        rhs: Box<Rel>,
        condition: Rex,
        kind: JoinKind,
    },
    /// Output columns: `groups`, then the optional group column, then `calls`.
    Aggregate {
        input: Box<Rel>,
        groups: Vec<Rex>,
        calls: Vec<Rex>,
        group_as: Option<GroupAs>,
    },
    Sort {
        input: Box<Rel>,
        specs: Vec<SortSpec>,
    },
    Distinct {
        input: Box<Rel>,
    },
    Limit {
        input: Box<Rel>,
        limit: Rex,
    },
    Offset {
        input: Box<Rel>,
        offset: Rex,
    },
    Set {
        op: SetOp,
        quantifier: SetQuantifier,
        lhs: Box<Rel>,
        rhs: Box<Rel>,
    },
}

impl Rel {
    pub fn new(op: RelOp, ty: RelType) -> Self {
        Self { ty, op }
    }

    pub fn scan(rex: Rex, name: impl Into<String>) -> Self {
        let ty = RelType::unordered(vec![Column::new(name, rex.ty.element_type())]);
        Self::new(RelOp::Scan { rex }, ty)
    }

    pub fn filter(input: Rel, predicate: Rex) -> Self {
        let ty = input.ty.clone();
        Self::new(
            RelOp::Filter {
                input: Box::new(input),
                predicate,
            },
            ty,
        )
    }

    /// Projection; `names` must match `projections` one-to-one.
    pub fn project(input: Rel, projections: Vec<Rex>, names: Vec<String>) -> Result<Self> {
        if projections.len() != names.len() {
            return Err(Error::Invariant(format!(
                "PROJECT has {} expressions but {} names",
                projections.len(),
                names.len()
            )));
        }
        let schema = names
            .into_iter()
            .zip(projections.iter())
            .map(|(name, rex)| Column::new(name, rex.ty.clone()))
            .collect();
        let ordered = input.ty.ordered;
        Ok(Self::new(
            RelOp::Project {
                input: Box::new(input),
                projections,
            },
            RelType { schema, ordered },
        ))
    }

    /// Requires at least one sort key.
    pub fn sort(input: Rel, specs: Vec<SortSpec>) -> Result<Self> {
        if specs.is_empty() {
            return Err(Error::Invariant("SORT requires at least 1 key".into()));
        }
        let ty = RelType {
            schema: input.ty.schema.clone(),
            ordered: true,
        };
        Ok(Self::new(
            RelOp::Sort {
                input: Box::new(input),
                specs,
            },
            ty,
        ))
    }

    /// Input relation, for operators with exactly one.
    pub fn input(&self) -> Option<&Rel> {
        match &self.op {
            RelOp::Filter { input, .. }
            | RelOp::Project { input, .. }
            | RelOp::Aggregate { input, .. }
            | RelOp::Sort { input, .. }
            | RelOp::Distinct { input }
            | RelOp::Limit { input, .. }
            | RelOp::Offset { input, .. } => Some(input),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match &self.op {
            RelOp::Scan { .. } => "scan",
            RelOp::ScanIndexed { .. } => "scan_indexed",
            RelOp::Unpivot { .. } => "unpivot",
            RelOp::Filter { .. } => "filter",
            RelOp::Project { .. } => "project",
            RelOp::Join { .. } => "join",
            RelOp::Aggregate { .. } => "aggregate",
            RelOp::Sort { .. } => "sort",
            RelOp::Distinct { .. } => "distinct",
            RelOp::Limit { .. } => "limit",
            RelOp::Offset { .. } => "offset",
            RelOp::Set { .. } => "set",
        }
    }
}
