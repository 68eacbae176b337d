//! Function and aggregate signatures.

use serde::Serialize;

use partiql_core::types::{CastKind, SingleType, StaticType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub ty: StaticType,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: StaticType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// How an argument type satisfies a parameter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ArgMatch {
    Exact,
    /// Accepted after an implicit cast to the given type.
    Coerce(SingleType),
}

/// Does `param` accept an argument of single type `arg`?
///
/// NULL and MISSING are accepted by every parameter; whether they reach the
/// function body depends on the signature's null/missing-call flags.
pub fn accepts(param: &StaticType, arg: &SingleType) -> Option<ArgMatch> {
    if param.is_any() || arg.is_unknown() {
        return Some(ArgMatch::Exact);
    }
    let members = param.singles()?;
    if members.iter().any(|p| p.same_kind(arg)) {
        return Some(ArgMatch::Exact);
    }
    members
        .into_iter()
        .filter(|p| arg.cast_kind(p) == CastKind::Coercion)
        .min_by_key(|p| p.numeric_rank())
        .map(|p| ArgMatch::Coerce(p.clone()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FnSignature {
    pub name: String,
    pub params: Vec<Parameter>,
    pub returns: StaticType,
    /// The body itself may produce NULL.
    pub is_nullable: bool,
    /// The body itself may produce MISSING.
    pub is_missable: bool,
    /// Any NULL argument yields NULL without invoking the body.
    pub is_null_call: bool,
    /// Any MISSING argument yields MISSING without invoking the body.
    pub is_missing_call: bool,
}

impl FnSignature {
    /// A signature with the common defaults: null-call and missing-call,
    /// never producing unknowns on its own.
    pub fn new(name: impl Into<String>, params: Vec<Parameter>, returns: StaticType) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            params,
            returns,
            is_nullable: false,
            is_missable: false,
            is_null_call: true,
            is_missing_call: true,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }

    /// The body sees NULL and MISSING arguments itself.
    pub fn unknown_aware(mut self) -> Self {
        self.is_null_call = false;
        self.is_missing_call = false;
        self
    }

    /// Match every argument against its parameter. `None` if arity differs
    /// or any argument is rejected.
    pub fn matches(&self, args: &[SingleType]) -> Option<Vec<ArgMatch>> {
        if args.len() != self.params.len() {
            return None;
        }
        self.params
            .iter()
            .zip(args)
            .map(|(p, a)| accepts(&p.ty, a))
            .collect()
    }
}

impl std::fmt::Display for FnSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", p.name, p.ty)?;
        }
        write!(f, ") -> {}", self.returns)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggSignature {
    pub name: String,
    pub params: Vec<Parameter>,
    pub returns: StaticType,
    pub is_nullable: bool,
    /// May be split into partial and merge phases.
    pub is_decomposable: bool,
}

impl AggSignature {
    pub fn new(name: impl Into<String>, params: Vec<Parameter>, returns: StaticType) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            params,
            returns,
            is_nullable: true,
            is_decomposable: true,
        }
    }

    pub fn non_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }

    pub fn matches(&self, args: &[SingleType]) -> Option<Vec<ArgMatch>> {
        if args.len() != self.params.len() {
            return None;
        }
        self.params
            .iter()
            .zip(args)
            .map(|(p, a)| accepts(&p.ty, a))
            .collect()
    }
}
