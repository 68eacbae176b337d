//! Equality and ordering comparisons.

use std::cmp::Ordering;

use partiql_core::datum::Datum;
use partiql_core::error::{EvalError, EvalResult};
use partiql_core::plan::{BinaryOp, NullOrder, SortOrder};

use super::type_name;

/// Comparison family of a scalar, or `None` for containers.
fn comparable_kind(d: &Datum) -> Option<u8> {
    match d {
        Datum::Bool(_) => Some(0),
        Datum::Int(_) | Datum::Decimal(_) | Datum::Float(_) => Some(1),
        Datum::String(_) | Datum::Symbol(_) => Some(2),
        Datum::Clob(_) | Datum::Blob(_) => Some(3),
        Datum::Date(_) => Some(4),
        Datum::Time(_) => Some(5),
        Datum::Timestamp(_) => Some(6),
        _ => None,
    }
}

/// `a = b`. Defined across all types: values of unrelated types are unequal.
/// NULL when either operand is NULL or MISSING.
pub fn eq(a: &Datum, b: &Datum) -> Datum {
    if a.is_unknown() || b.is_unknown() {
        Datum::Null
    } else {
        Datum::Bool(a == b)
    }
}

/// `a <op> b` for every comparison operator.
pub fn compare(op: BinaryOp, a: &Datum, b: &Datum) -> EvalResult<Datum> {
    match op {
        BinaryOp::Eq => return Ok(eq(a, b)),
        BinaryOp::Ne => {
            return Ok(match eq(a, b) {
                Datum::Bool(x) => Datum::Bool(!x),
                other => other,
            })
        }
        _ => {}
    }
    if a.is_unknown() || b.is_unknown() {
        return Ok(Datum::Null);
    }
    match (comparable_kind(a), comparable_kind(b)) {
        (Some(x), Some(y)) if x == y => {}
        _ => {
            return Err(EvalError::type_mismatch(
                op.symbol(),
                format!("a value comparable with {}", type_name(a)),
                type_name(b),
            ))
        }
    }
    let ord = a.cmp(b);
    let out = match op {
        BinaryOp::Lt => ord == Ordering::Less,
        BinaryOp::Le => ord != Ordering::Greater,
        BinaryOp::Gt => ord == Ordering::Greater,
        BinaryOp::Ge => ord != Ordering::Less,
        other => return Err(EvalError::Internal(format!("not a comparison: {other:?}"))),
    };
    Ok(Datum::Bool(out))
}

/// Ordering used by ORDER BY. Unknowns sort together at the position chosen
/// by `nulls`; everything else follows the total order over values.
pub fn sort_order(a: &Datum, b: &Datum, order: SortOrder, nulls: NullOrder) -> Ordering {
    match (a.is_unknown(), b.is_unknown()) {
        (true, true) => Ordering::Equal,
        (true, false) => match nulls {
            NullOrder::First => Ordering::Less,
            NullOrder::Last => Ordering::Greater,
        },
        (false, true) => match nulls {
            NullOrder::First => Ordering::Greater,
            NullOrder::Last => Ordering::Less,
        },
        (false, false) => match order {
            SortOrder::Asc => a.cmp(b),
            SortOrder::Desc => b.cmp(a),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;

    use super::*;

    #[test]
    fn missing_equals_missing_is_null() {
        assert_eq!(eq(&Datum::Missing, &Datum::Missing), Datum::Null);
        assert_eq!(eq(&Datum::Null, &Datum::Int(1)), Datum::Null);
        assert_eq!(
            compare(BinaryOp::Ne, &Datum::Missing, &Datum::Int(1)).unwrap(),
            Datum::Null
        );
    }

    #[test]
    fn int_equals_decimal() {
        let one = Datum::Decimal(BigDecimal::from_str("1.0").unwrap());
        assert_eq!(eq(&Datum::Int(1), &one), Datum::Bool(true));
        assert_eq!(eq(&Datum::Int(1), &Datum::string("1")), Datum::Bool(false));
    }

    #[test]
    fn ordering_requires_comparable_types() {
        assert_eq!(
            compare(BinaryOp::Lt, &Datum::Int(1), &Datum::Float(1.5)).unwrap(),
            Datum::Bool(true)
        );
        assert_eq!(
            compare(BinaryOp::Ge, &Datum::string("b"), &Datum::string("a")).unwrap(),
            Datum::Bool(true)
        );
        assert!(matches!(
            compare(BinaryOp::Lt, &Datum::Int(1), &Datum::string("a")),
            Err(EvalError::TypeMismatch { .. })
        ));
        assert_eq!(
            compare(BinaryOp::Lt, &Datum::Null, &Datum::string("a")).unwrap(),
            Datum::Null
        );
    }

    #[test]
    fn nulls_placement() {
        let asc_last = sort_order(&Datum::Null, &Datum::Int(1), SortOrder::Asc, NullOrder::Last);
        assert_eq!(asc_last, Ordering::Greater);
        let desc = sort_order(&Datum::Int(1), &Datum::Int(2), SortOrder::Desc, NullOrder::First);
        assert_eq!(desc, Ordering::Greater);
    }
}
