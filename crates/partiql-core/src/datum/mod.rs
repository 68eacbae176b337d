//! Runtime values.
//!
//! A `Datum` carries its runtime type tag and either a scalar payload or its
//! children. Containers are materialized; laziness lives one level up, in the
//! evaluator's query results.
//!
//! Equality, hashing and ordering (see `ord.rs`) follow PartiQL semantics:
//! bags compare as multisets, lists and s-expressions compare in order, struct
//! comparison ignores field order but not the field set, and numbers compare by
//! value across INT/DECIMAL/FLOAT.

mod ord;

use std::fmt;

use bigdecimal::{BigDecimal, FromPrimitive};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::types::{SingleType, StaticType};

#[derive(Debug, Clone, Serialize)]
pub enum Datum {
    Missing,
    Null,
    Bool(bool),
    Int(i64),
    Decimal(BigDecimal),
    Float(f64),
    String(String),
    Symbol(String),
    Clob(Vec<u8>),
    Blob(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    List(Vec<Datum>),
    Bag(Vec<Datum>),
    Sexp(Vec<Datum>),
    Struct(StructValue),
}

/// Kind of an ordered or unordered collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CollectionKind {
    List,
    Bag,
    Sexp,
}

impl CollectionKind {
    pub fn wrap(self, values: Vec<Datum>) -> Datum {
        match self {
            CollectionKind::List => Datum::List(values),
            CollectionKind::Bag => Datum::Bag(values),
            CollectionKind::Sexp => Datum::Sexp(values),
        }
    }

    pub fn static_type(self, element: StaticType) -> StaticType {
        match self {
            CollectionKind::List => StaticType::list(element),
            CollectionKind::Bag => StaticType::bag(element),
            CollectionKind::Sexp => StaticType::sexp(element),
        }
    }
}

/// Struct payload: ordered name/value pairs. Duplicate names are allowed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StructValue {
    fields: Vec<(String, Datum)>,
}

impl StructValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: Vec<(String, Datum)>) -> Self {
        Self { fields }
    }

    pub fn push(&mut self, name: impl Into<String>, value: Datum) {
        self.fields.push((name.into(), value));
    }

    /// First field named `key`.
    pub fn get(&self, key: &str, case_sensitive: bool) -> Option<&Datum> {
        self.fields
            .iter()
            .find(|(name, _)| {
                if case_sensitive {
                    name == key
                } else {
                    name.eq_ignore_ascii_case(key)
                }
            })
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Datum)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_fields(self) -> Vec<(String, Datum)> {
        self.fields
    }

    pub fn fields(&self) -> &[(String, Datum)] {
        &self.fields
    }
}

impl FromIterator<(String, Datum)> for StructValue {
    fn from_iter<T: IntoIterator<Item = (String, Datum)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl Datum {
    pub fn bag(values: impl IntoIterator<Item = Datum>) -> Self {
        Datum::Bag(values.into_iter().collect())
    }

    pub fn list(values: impl IntoIterator<Item = Datum>) -> Self {
        Datum::List(values.into_iter().collect())
    }

    pub fn tuple<K: Into<String>>(fields: impl IntoIterator<Item = (K, Datum)>) -> Self {
        Datum::Struct(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        )
    }

    pub fn string(s: impl Into<String>) -> Self {
        Datum::String(s.into())
    }

    pub fn decimal_from_f64(f: f64) -> Option<Self> {
        BigDecimal::from_f64(f).map(Datum::Decimal)
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Datum::Missing)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// NULL or MISSING.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Datum::Null | Datum::Missing)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Datum::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Datum::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Datum::String(s) | Datum::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Datum::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// Elements of a list, bag or s-expression.
    pub fn elements(&self) -> Option<&[Datum]> {
        match self {
            Datum::List(v) | Datum::Bag(v) | Datum::Sexp(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_elements(self) -> Result<(CollectionKind, Vec<Datum>), Datum> {
        match self {
            Datum::List(v) => Ok((CollectionKind::List, v)),
            Datum::Bag(v) => Ok((CollectionKind::Bag, v)),
            Datum::Sexp(v) => Ok((CollectionKind::Sexp, v)),
            other => Err(other),
        }
    }

    pub fn collection_kind(&self) -> Option<CollectionKind> {
        match self {
            Datum::List(_) => Some(CollectionKind::List),
            Datum::Bag(_) => Some(CollectionKind::Bag),
            Datum::Sexp(_) => Some(CollectionKind::Sexp),
            _ => None,
        }
    }

    /// Runtime type tag. Container element types are reported as `ANY`.
    pub fn runtime_type(&self) -> SingleType {
        match self {
            Datum::Missing => SingleType::Missing,
            Datum::Null => SingleType::Null,
            Datum::Bool(_) => SingleType::Bool,
            Datum::Int(_) => SingleType::Int8,
            Datum::Decimal(_) => SingleType::Decimal,
            Datum::Float(_) => SingleType::Float64,
            Datum::String(_) => SingleType::String,
            Datum::Symbol(_) => SingleType::Symbol,
            Datum::Clob(_) => SingleType::Clob,
            Datum::Blob(_) => SingleType::Blob,
            Datum::Date(_) => SingleType::Date,
            Datum::Time(_) => SingleType::Time,
            Datum::Timestamp(_) => SingleType::Timestamp,
            Datum::List(_) => SingleType::List(Box::new(StaticType::Any)),
            Datum::Bag(_) => SingleType::Bag(Box::new(StaticType::Any)),
            Datum::Sexp(_) => SingleType::Sexp(Box::new(StaticType::Any)),
            Datum::Struct(_) => SingleType::Struct(crate::types::StructType::open()),
        }
    }

    /// Most precise static type of this literal value.
    pub fn static_type(&self) -> StaticType {
        match self {
            Datum::Int(i) => {
                if i32::try_from(*i).is_ok() {
                    StaticType::INT4
                } else {
                    StaticType::INT8
                }
            }
            Datum::List(v) => StaticType::list(Self::element_union(v)),
            Datum::Bag(v) => StaticType::bag(Self::element_union(v)),
            Datum::Sexp(v) => StaticType::sexp(Self::element_union(v)),
            Datum::Struct(s) => StaticType::closed_struct(
                s.iter()
                    .map(|(k, v)| (k.to_string(), v.static_type()))
                    .collect(),
            ),
            other => StaticType::Single(other.runtime_type()),
        }
    }

    fn element_union(values: &[Datum]) -> StaticType {
        if values.is_empty() {
            return StaticType::Any;
        }
        StaticType::any_of(values.iter().map(Datum::static_type))
    }

    /// Convert a JSON document: objects become structs, arrays become lists.
    pub fn from_json(value: &serde_json::Value) -> Datum {
        use serde_json::Value;
        match value {
            Value::Null => Datum::Null,
            Value::Bool(b) => Datum::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Datum::Int(i)
                } else {
                    Datum::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => Datum::String(s.clone()),
            Value::Array(items) => Datum::List(items.iter().map(Datum::from_json).collect()),
            Value::Object(map) => Datum::Struct(
                map.iter()
                    .map(|(k, v)| (k.clone(), Datum::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Datum {
    fn from(value: bool) -> Self {
        Datum::Bool(value)
    }
}

impl From<i64> for Datum {
    fn from(value: i64) -> Self {
        Datum::Int(value)
    }
}

impl From<i32> for Datum {
    fn from(value: i32) -> Self {
        Datum::Int(value as i64)
    }
}

impl From<f64> for Datum {
    fn from(value: f64) -> Self {
        Datum::Float(value)
    }
}

impl From<&str> for Datum {
    fn from(value: &str) -> Self {
        Datum::String(value.to_string())
    }
}

impl From<String> for Datum {
    fn from(value: String) -> Self {
        Datum::String(value)
    }
}

impl From<BigDecimal> for Datum {
    fn from(value: BigDecimal) -> Self {
        Datum::Decimal(value)
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, open: &str, close: &str, items: &[Datum]) -> fmt::Result {
    write!(f, "{open}")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, "{close}")
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Missing => write!(f, "MISSING"),
            Datum::Null => write!(f, "NULL"),
            Datum::Bool(b) => write!(f, "{b}"),
            Datum::Int(i) => write!(f, "{i}"),
            Datum::Decimal(d) => write!(f, "{d}"),
            Datum::Float(x) => write!(f, "{x:?}"),
            Datum::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Datum::Symbol(s) => write!(f, "`{s}`"),
            Datum::Clob(b) => write!(f, "{{{{\"{}\"}}}}", String::from_utf8_lossy(b)),
            Datum::Blob(b) => write!(f, "{{{{ {} bytes }}}}", b.len()),
            Datum::Date(d) => write!(f, "DATE '{d}'"),
            Datum::Time(t) => write!(f, "TIME '{t}'"),
            Datum::Timestamp(ts) => write!(f, "TIMESTAMP '{ts}'"),
            Datum::List(v) => write_seq(f, "[", "]", v),
            Datum::Bag(v) => write_seq(f, "<<", ">>", v),
            Datum::Sexp(v) => write_seq(f, "(", ")", v),
            Datum::Struct(s) => {
                write!(f, "{{")?;
                for (i, (k, v)) in s.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "'{k}': {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}
