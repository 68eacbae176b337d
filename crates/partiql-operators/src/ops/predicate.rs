//! `IS <type>`, `BETWEEN` and `IN`.

use partiql_core::config::TypingMode;
use partiql_core::datum::Datum;
use partiql_core::error::{EvalError, EvalResult};
use partiql_core::plan::BinaryOp;
use partiql_core::types::SingleType;

use super::compare::{compare, eq};
use super::{logic, type_name};

/// True when the runtime value inhabits `target`.
pub fn has_type(d: &Datum, target: &SingleType) -> bool {
    match (d, target) {
        (Datum::Int(i), SingleType::Int2) => i16::try_from(*i).is_ok(),
        (Datum::Int(i), SingleType::Int4) => i32::try_from(*i).is_ok(),
        (Datum::Int(_), SingleType::Int8 | SingleType::Int) => true,
        (Datum::Float(_), SingleType::Float32 | SingleType::Float64) => true,
        (d, t) => d.runtime_type().same_kind(t),
    }
}

/// `d IS <target>`.
///
/// `IS NULL` is true for both unknowns and `IS MISSING` only for MISSING;
/// other assertions on a MISSING operand yield MISSING.
pub fn is_type(d: &Datum, target: &SingleType) -> Datum {
    match target {
        SingleType::Null => Datum::Bool(d.is_unknown()),
        SingleType::Missing => Datum::Bool(d.is_missing()),
        _ if d.is_missing() => Datum::Missing,
        t => Datum::Bool(has_type(d, t)),
    }
}

/// `value BETWEEN from AND to`.
pub fn between(value: &Datum, from: &Datum, to: &Datum, mode: TypingMode) -> EvalResult<Datum> {
    let lower = compare(BinaryOp::Ge, value, from);
    let upper = compare(BinaryOp::Le, value, to);
    logic::and([lower, upper], mode)
}

/// `value IN collection`: true on any equal element, NULL when no element is
/// equal but some comparison was unknown, false otherwise.
pub fn in_collection(value: &Datum, collection: &Datum) -> EvalResult<Datum> {
    if collection.is_unknown() {
        return Ok(Datum::Null);
    }
    let elements = collection.elements().ok_or_else(|| {
        EvalError::type_mismatch("IN", "a collection", type_name(collection))
    })?;
    if elements.is_empty() {
        return Ok(Datum::Bool(false));
    }
    let mut unknown = false;
    for element in elements {
        match eq(value, element) {
            Datum::Bool(true) => return Ok(Datum::Bool(true)),
            Datum::Bool(false) => {}
            _ => unknown = true,
        }
    }
    Ok(if unknown { Datum::Null } else { Datum::Bool(false) })
}
