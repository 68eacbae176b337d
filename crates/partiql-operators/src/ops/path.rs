//! Path navigation: `x.name`, `x[i]`, `x['key']`.
//!
//! Navigating from NULL or MISSING, or to an absent field or an
//! out-of-bounds index, yields MISSING. Navigating into a value of the wrong
//! kind is a type violation.

use partiql_core::datum::Datum;
use partiql_core::error::{EvalError, EvalResult};

use super::type_name;

/// `root.name`
pub fn symbol(root: &Datum, name: &str, case_sensitive: bool) -> EvalResult<Datum> {
    match root {
        Datum::Struct(s) => Ok(s.get(name, case_sensitive).cloned().unwrap_or(Datum::Missing)),
        Datum::Null | Datum::Missing => Ok(Datum::Missing),
        other => Err(EvalError::type_mismatch(
            format!(".{name}"),
            "STRUCT",
            type_name(other),
        )),
    }
}

/// `root[index]` over a LIST or SEXP.
pub fn index(root: &Datum, index: &Datum) -> EvalResult<Datum> {
    if root.is_unknown() || index.is_unknown() {
        return Ok(Datum::Missing);
    }
    let i = match index {
        Datum::Int(i) => *i,
        other => return Err(EvalError::type_mismatch("[]", "INT index", type_name(other))),
    };
    match root {
        Datum::List(v) | Datum::Sexp(v) => Ok(usize::try_from(i)
            .ok()
            .and_then(|i| v.get(i))
            .cloned()
            .unwrap_or(Datum::Missing)),
        other => Err(EvalError::type_mismatch("[]", "LIST or SEXP", type_name(other))),
    }
}

/// `root[key]`: a text key is a case-sensitive field lookup, an integer key
/// is an index.
pub fn key(root: &Datum, key: &Datum) -> EvalResult<Datum> {
    match key {
        Datum::String(k) | Datum::Symbol(k) => match root {
            Datum::Struct(s) => Ok(s.get(k, true).cloned().unwrap_or(Datum::Missing)),
            Datum::Null | Datum::Missing => Ok(Datum::Missing),
            other => Err(EvalError::type_mismatch("[]", "STRUCT", type_name(other))),
        },
        Datum::Int(_) => index(root, key),
        Datum::Null | Datum::Missing => Ok(Datum::Missing),
        other => Err(EvalError::type_mismatch("[]", "text or INT key", type_name(other))),
    }
}
