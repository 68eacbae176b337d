//! Static types: a union-capable lattice over PartiQL's single types.
//!
//! `StaticType` is either `Any`, the uninhabited `Nothing`, a single type, or
//! an `AnyOf` union. Unions are always flattened, never contain `Any`, and
//! always hold at least two members; `StaticType::any_of` is the only way to
//! build one, so the invariant holds for every value in the program.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

/// One concrete type in the lattice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SingleType {
    Null,
    Missing,
    Bool,
    Int2,
    Int4,
    Int8,
    /// Arbitrary-precision integer family head.
    Int,
    Decimal,
    Float32,
    Float64,
    String,
    Symbol,
    Clob,
    Blob,
    Date,
    Time,
    Timestamp,
    List(Box<StaticType>),
    Bag(Box<StaticType>),
    Sexp(Box<StaticType>),
    Struct(StructType),
}

/// Shape of a struct type.
///
/// A closed struct has exactly the listed fields; an open struct may carry
/// other fields of unknown type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StructType {
    pub fields: Vec<(String, StaticType)>,
    pub closed: bool,
}

/// Outcome of looking a key up in a `StructType`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldLookup {
    /// The key names a declared field (union of all matching fields).
    Found(StaticType),
    /// The struct is open and the key is not declared.
    Unknown,
    /// The struct is closed and has no such field.
    Absent,
}

impl StructType {
    pub fn open() -> Self {
        Self {
            fields: vec![],
            closed: false,
        }
    }

    pub fn closed(fields: Vec<(String, StaticType)>) -> Self {
        Self {
            fields,
            closed: true,
        }
    }

    pub fn field(&self, key: &str, case_sensitive: bool) -> FieldLookup {
        let matches: Vec<StaticType> = self
            .fields
            .iter()
            .filter(|(name, _)| {
                if case_sensitive {
                    name == key
                } else {
                    name.eq_ignore_ascii_case(key)
                }
            })
            .map(|(_, ty)| ty.clone())
            .collect();

        if !matches.is_empty() {
            FieldLookup::Found(StaticType::any_of(matches))
        } else if self.closed {
            FieldLookup::Absent
        } else {
            FieldLookup::Unknown
        }
    }
}

/// Members of an `AnyOf` union. The field is private so that only
/// `StaticType::any_of` can build one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Union(BTreeSet<SingleType>);

impl Union {
    pub fn members(&self) -> impl Iterator<Item = &SingleType> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum StaticType {
    /// Top of the lattice; absorbs every union it takes part in.
    Any,
    /// Uninhabited bottom, the union of zero types.
    Nothing,
    Single(SingleType),
    AnyOf(Union),
}

/// Classification of the conversion between two single types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum CastKind {
    /// Lossless, applied implicitly by operators and calls.
    Coercion,
    /// Allowed by CAST; always succeeds.
    Explicit,
    /// Allowed by CAST; may fail at runtime depending on the value.
    Unsafe,
    /// Never allowed.
    Undefined,
}

impl StaticType {
    pub const NULL: StaticType = StaticType::Single(SingleType::Null);
    pub const MISSING: StaticType = StaticType::Single(SingleType::Missing);
    pub const BOOL: StaticType = StaticType::Single(SingleType::Bool);
    pub const INT2: StaticType = StaticType::Single(SingleType::Int2);
    pub const INT4: StaticType = StaticType::Single(SingleType::Int4);
    pub const INT8: StaticType = StaticType::Single(SingleType::Int8);
    pub const INT: StaticType = StaticType::Single(SingleType::Int);
    pub const DECIMAL: StaticType = StaticType::Single(SingleType::Decimal);
    pub const FLOAT32: StaticType = StaticType::Single(SingleType::Float32);
    pub const FLOAT64: StaticType = StaticType::Single(SingleType::Float64);
    pub const STRING: StaticType = StaticType::Single(SingleType::String);
    pub const SYMBOL: StaticType = StaticType::Single(SingleType::Symbol);
    pub const CLOB: StaticType = StaticType::Single(SingleType::Clob);
    pub const BLOB: StaticType = StaticType::Single(SingleType::Blob);
    pub const DATE: StaticType = StaticType::Single(SingleType::Date);
    pub const TIME: StaticType = StaticType::Single(SingleType::Time);
    pub const TIMESTAMP: StaticType = StaticType::Single(SingleType::Timestamp);

    pub fn list(element: StaticType) -> Self {
        StaticType::Single(SingleType::List(Box::new(element)))
    }

    pub fn bag(element: StaticType) -> Self {
        StaticType::Single(SingleType::Bag(Box::new(element)))
    }

    pub fn sexp(element: StaticType) -> Self {
        StaticType::Single(SingleType::Sexp(Box::new(element)))
    }

    pub fn open_struct() -> Self {
        StaticType::Single(SingleType::Struct(StructType::open()))
    }

    pub fn closed_struct(fields: Vec<(String, StaticType)>) -> Self {
        StaticType::Single(SingleType::Struct(StructType::closed(fields)))
    }

    /// Build the normalized union of `types`.
    ///
    /// Nested unions are flattened, `Any` absorbs everything, `Nothing`
    /// contributes nothing, and unions of zero or one members collapse.
    pub fn any_of(types: impl IntoIterator<Item = StaticType>) -> StaticType {
        let mut members = BTreeSet::new();
        for ty in types {
            match ty {
                StaticType::Any => return StaticType::Any,
                StaticType::Nothing => {}
                StaticType::Single(s) => {
                    members.insert(s);
                }
                StaticType::AnyOf(u) => members.extend(u.0),
            }
        }
        match members.len() {
            0 => StaticType::Nothing,
            1 => match members.into_iter().next() {
                Some(only) => StaticType::Single(only),
                None => StaticType::Nothing,
            },
            _ => StaticType::AnyOf(Union(members)),
        }
    }

    /// Single-type members, or `None` for `Any`.
    pub fn singles(&self) -> Option<Vec<&SingleType>> {
        match self {
            StaticType::Any => None,
            StaticType::Nothing => Some(vec![]),
            StaticType::Single(s) => Some(vec![s]),
            StaticType::AnyOf(u) => Some(u.members().collect()),
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, StaticType::Any)
    }

    pub fn contains(&self, single: &SingleType) -> bool {
        match self {
            StaticType::Any => true,
            StaticType::Nothing => false,
            StaticType::Single(s) => s == single,
            StaticType::AnyOf(u) => u.0.contains(single),
        }
    }

    pub fn may_be_null(&self) -> bool {
        self.contains(&SingleType::Null)
    }

    pub fn may_be_missing(&self) -> bool {
        self.contains(&SingleType::Missing)
    }

    /// True when every inhabitant is NULL or MISSING.
    pub fn is_unknown_only(&self) -> bool {
        match self.singles() {
            None => false,
            Some(members) => !members.is_empty() && members.iter().all(|s| s.is_unknown()),
        }
    }

    pub fn is_missing_only(&self) -> bool {
        matches!(self, StaticType::Single(SingleType::Missing))
    }

    pub fn is_null_only(&self) -> bool {
        matches!(self, StaticType::Single(SingleType::Null))
    }

    /// Remove NULL and MISSING members. `Any` is returned unchanged.
    pub fn strip_unknowns(&self) -> StaticType {
        match self.singles() {
            None => StaticType::Any,
            Some(members) => StaticType::any_of(
                members
                    .into_iter()
                    .filter(|s| !s.is_unknown())
                    .map(|s| StaticType::Single(s.clone())),
            ),
        }
    }

    pub fn with_null(&self) -> StaticType {
        StaticType::any_of([self.clone(), StaticType::NULL])
    }

    pub fn with_missing(&self) -> StaticType {
        StaticType::any_of([self.clone(), StaticType::MISSING])
    }

    /// True when every inhabitant of `self` is an inhabitant of `other`.
    pub fn is_subtype_of(&self, other: &StaticType) -> bool {
        if other.is_any() {
            return true;
        }
        match self.singles() {
            None => false,
            Some(members) => members.iter().all(|s| other.contains(s)),
        }
    }

    /// Element type when every member is a collection, `Any` otherwise.
    pub fn element_type(&self) -> StaticType {
        match self.singles() {
            None => StaticType::Any,
            Some(members) => {
                let mut elems = Vec::with_capacity(members.len());
                for m in members {
                    match m {
                        SingleType::List(e) | SingleType::Bag(e) | SingleType::Sexp(e) => {
                            elems.push((**e).clone())
                        }
                        SingleType::Null | SingleType::Missing => {}
                        _ => return StaticType::Any,
                    }
                }
                StaticType::any_of(elems)
            }
        }
    }
}

impl From<SingleType> for StaticType {
    fn from(value: SingleType) -> Self {
        StaticType::Single(value)
    }
}

impl SingleType {
    pub fn is_unknown(&self) -> bool {
        matches!(self, SingleType::Null | SingleType::Missing)
    }

    pub fn is_numeric(&self) -> bool {
        self.numeric_rank().is_some()
    }

    pub fn is_text(&self) -> bool {
        matches!(self, SingleType::String | SingleType::Symbol)
    }

    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            SingleType::List(_) | SingleType::Bag(_) | SingleType::Sexp(_)
        )
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, SingleType::Date | SingleType::Time | SingleType::Timestamp)
    }

    /// Position in the numeric widening order, smallest first.
    pub fn numeric_rank(&self) -> Option<u8> {
        match self {
            SingleType::Int2 => Some(1),
            SingleType::Int4 => Some(2),
            SingleType::Int8 => Some(3),
            SingleType::Int => Some(4),
            SingleType::Decimal => Some(5),
            SingleType::Float32 => Some(6),
            SingleType::Float64 => Some(7),
            _ => None,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.numeric_rank(), Some(1..=4))
    }

    /// Two types of the same kind, ignoring collection element and struct shapes.
    pub fn same_kind(&self, other: &SingleType) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Classify the conversion from `self` to `to`.
    pub fn cast_kind(&self, to: &SingleType) -> CastKind {
        use SingleType::*;

        if self.same_kind(to) || self.is_unknown() {
            return CastKind::Coercion;
        }

        if let (Some(from_rank), Some(to_rank)) = (self.numeric_rank(), to.numeric_rank()) {
            return if from_rank < to_rank {
                CastKind::Coercion
            } else {
                CastKind::Unsafe
            };
        }

        match (self, to) {
            (Bool, t) if t.is_numeric() => CastKind::Explicit,
            (f, Bool) if f.is_numeric() => CastKind::Explicit,
            (Bool, String | Symbol) => CastKind::Explicit,
            (String | Symbol, Bool) => CastKind::Unsafe,
            (f, String | Symbol) if f.is_numeric() => CastKind::Explicit,
            (String | Symbol, t) if t.is_numeric() => CastKind::Unsafe,
            (Symbol, String) => CastKind::Coercion,
            (String, Symbol) => CastKind::Explicit,
            (String | Symbol, Clob) => CastKind::Explicit,
            (Clob, String | Symbol) => CastKind::Unsafe,
            (Clob, Blob) | (Blob, Clob) => CastKind::Explicit,
            (Timestamp, Date | Time) => CastKind::Explicit,
            (Date, Timestamp) => CastKind::Explicit,
            (f, String | Symbol) if f.is_temporal() => CastKind::Explicit,
            (String | Symbol, t) if t.is_temporal() => CastKind::Unsafe,
            (List(_) | Sexp(_), Bag(_)) => CastKind::Coercion,
            (Bag(_), List(_) | Sexp(_)) => CastKind::Explicit,
            (List(_), Sexp(_)) | (Sexp(_), List(_)) => CastKind::Explicit,
            _ => CastKind::Undefined,
        }
    }

    /// Smallest single type both operands coerce into, if any.
    pub fn common_supertype(&self, other: &SingleType) -> Option<SingleType> {
        use SingleType::*;

        if self == other {
            return Some(self.clone());
        }
        match (self, other) {
            (List(a), List(b)) => {
                return Some(List(Box::new(StaticType::any_of([
                    (**a).clone(),
                    (**b).clone(),
                ]))))
            }
            (Bag(a), Bag(b)) => {
                return Some(Bag(Box::new(StaticType::any_of([
                    (**a).clone(),
                    (**b).clone(),
                ]))))
            }
            (Sexp(a), Sexp(b)) => {
                return Some(Sexp(Box::new(StaticType::any_of([
                    (**a).clone(),
                    (**b).clone(),
                ]))))
            }
            (Struct(_), Struct(_)) => return Some(Struct(StructType::open())),
            _ => {}
        }
        if other.cast_kind(self) == CastKind::Coercion {
            Some(self.clone())
        } else if self.cast_kind(other) == CastKind::Coercion {
            Some(other.clone())
        } else {
            None
        }
    }

    /// Canonical name used in diagnostics and by `CAST` targets.
    pub fn name(&self) -> &'static str {
        use SingleType::*;
        match self {
            Null => "NULL",
            Missing => "MISSING",
            Bool => "BOOL",
            Int2 => "INT2",
            Int4 => "INT4",
            Int8 => "INT8",
            Int => "INT",
            Decimal => "DECIMAL",
            Float32 => "FLOAT32",
            Float64 => "FLOAT64",
            String => "STRING",
            Symbol => "SYMBOL",
            Clob => "CLOB",
            Blob => "BLOB",
            Date => "DATE",
            Time => "TIME",
            Timestamp => "TIMESTAMP",
            List(_) => "LIST",
            Bag(_) => "BAG",
            Sexp(_) => "SEXP",
            Struct(_) => "STRUCT",
        }
    }
}

impl fmt::Display for SingleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SingleType::List(e) | SingleType::Bag(e) | SingleType::Sexp(e) => {
                write!(f, "{}<{}>", self.name(), e)
            }
            SingleType::Struct(s) => {
                write!(f, "STRUCT{{")?;
                for (i, (name, ty)) in s.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {ty}")?;
                }
                if !s.closed {
                    if !s.fields.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "..")?;
                }
                write!(f, "}}")
            }
            other => write!(f, "{}", other.name()),
        }
    }
}

impl fmt::Display for StaticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaticType::Any => write!(f, "ANY"),
            StaticType::Nothing => write!(f, "NOTHING"),
            StaticType::Single(s) => write!(f, "{s}"),
            StaticType::AnyOf(u) => {
                write!(f, "UNION(")?;
                for (i, m) in u.members().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{m}")?;
                }
                write!(f, ")")
            }
        }
    }
}
