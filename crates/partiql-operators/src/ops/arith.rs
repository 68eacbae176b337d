//! Arithmetic and string concatenation.

use bigdecimal::{BigDecimal, FromPrimitive, ToPrimitive, Zero};
use partiql_core::datum::Datum;
use partiql_core::error::{EvalError, EvalResult};
use partiql_core::plan::{BinaryOp, UnaryOp};

use super::{propagate_unknowns, type_name};

/// Operands widened to a common numeric representation.
enum Numeric {
    Int(i64, i64),
    Decimal(BigDecimal, BigDecimal),
    Float(f64, f64),
}

fn to_f64(d: &Datum) -> Option<f64> {
    match d {
        Datum::Int(i) => Some(*i as f64),
        Datum::Decimal(x) => x.to_f64(),
        Datum::Float(f) => Some(*f),
        _ => None,
    }
}

fn to_decimal(d: &Datum) -> Option<BigDecimal> {
    match d {
        Datum::Int(i) => Some(BigDecimal::from(*i)),
        Datum::Decimal(x) => Some(x.clone()),
        Datum::Float(f) => BigDecimal::from_f64(*f),
        _ => None,
    }
}

fn widen(op: BinaryOp, a: &Datum, b: &Datum) -> EvalResult<Numeric> {
    let mismatch = || {
        let bad = if to_f64(a).is_none() { a } else { b };
        EvalError::type_mismatch(op.symbol(), "numeric operands", type_name(bad))
    };
    match (a, b) {
        (Datum::Int(x), Datum::Int(y)) => Ok(Numeric::Int(*x, *y)),
        (Datum::Float(_), _) | (_, Datum::Float(_)) => match (to_f64(a), to_f64(b)) {
            (Some(x), Some(y)) => Ok(Numeric::Float(x, y)),
            _ => Err(mismatch()),
        },
        (Datum::Decimal(_), Datum::Int(_) | Datum::Decimal(_))
        | (Datum::Int(_), Datum::Decimal(_)) => match (to_decimal(a), to_decimal(b)) {
            (Some(x), Some(y)) => Ok(Numeric::Decimal(x, y)),
            _ => Err(mismatch()),
        },
        _ => Err(mismatch()),
    }
}

fn overflow(op: BinaryOp) -> EvalError {
    EvalError::NumericOverflow {
        operator: op.symbol().to_string(),
    }
}

/// `a <op> b` for `+ - * / %`.
pub fn arithmetic(op: BinaryOp, a: &Datum, b: &Datum) -> EvalResult<Datum> {
    if let Some(u) = propagate_unknowns(&[a.clone(), b.clone()]) {
        return Ok(u);
    }
    match widen(op, a, b)? {
        Numeric::Int(x, y) => {
            let out = match op {
                BinaryOp::Add => x.checked_add(y),
                BinaryOp::Sub => x.checked_sub(y),
                BinaryOp::Mul => x.checked_mul(y),
                BinaryOp::Div | BinaryOp::Mod if y == 0 => return Err(EvalError::DivisionByZero),
                BinaryOp::Div => x.checked_div(y),
                BinaryOp::Mod => x.checked_rem(y),
                other => return Err(EvalError::Internal(format!("not arithmetic: {other:?}"))),
            };
            out.map(Datum::Int).ok_or_else(|| overflow(op))
        }
        Numeric::Decimal(x, y) => {
            let out = match op {
                BinaryOp::Add => x + y,
                BinaryOp::Sub => x - y,
                BinaryOp::Mul => x * y,
                BinaryOp::Div | BinaryOp::Mod if y.is_zero() => {
                    return Err(EvalError::DivisionByZero)
                }
                BinaryOp::Div => x / y,
                BinaryOp::Mod => x % y,
                other => return Err(EvalError::Internal(format!("not arithmetic: {other:?}"))),
            };
            Ok(Datum::Decimal(out))
        }
        Numeric::Float(x, y) => {
            let out = match op {
                BinaryOp::Add => x + y,
                BinaryOp::Sub => x - y,
                BinaryOp::Mul => x * y,
                BinaryOp::Div | BinaryOp::Mod if y == 0.0 => return Err(EvalError::DivisionByZero),
                BinaryOp::Div => x / y,
                BinaryOp::Mod => x % y,
                other => return Err(EvalError::Internal(format!("not arithmetic: {other:?}"))),
            };
            Ok(Datum::Float(out))
        }
    }
}

/// Unary `-` and `+`.
pub fn unary_numeric(op: UnaryOp, a: &Datum) -> EvalResult<Datum> {
    if a.is_unknown() {
        return Ok(a.clone());
    }
    let symbol = if op == UnaryOp::Neg { "-" } else { "+" };
    match (op, a) {
        (UnaryOp::Neg, Datum::Int(i)) => i.checked_neg().map(Datum::Int).ok_or_else(|| {
            EvalError::NumericOverflow {
                operator: symbol.into(),
            }
        }),
        (UnaryOp::Neg, Datum::Decimal(x)) => Ok(Datum::Decimal(-x.clone())),
        (UnaryOp::Neg, Datum::Float(f)) => Ok(Datum::Float(-f)),
        (UnaryOp::Pos, Datum::Int(_) | Datum::Decimal(_) | Datum::Float(_)) => Ok(a.clone()),
        _ => Err(EvalError::type_mismatch(symbol, "numeric operand", type_name(a))),
    }
}

/// `a || b` over STRING/SYMBOL; the result is always a STRING.
pub fn concat(a: &Datum, b: &Datum) -> EvalResult<Datum> {
    if let Some(u) = propagate_unknowns(&[a.clone(), b.clone()]) {
        return Ok(u);
    }
    match (a.as_text(), b.as_text()) {
        (Some(x), Some(y)) => Ok(Datum::String(format!("{x}{y}"))),
        (None, _) => Err(EvalError::type_mismatch("||", "text operands", type_name(a))),
        (_, None) => Err(EvalError::type_mismatch("||", "text operands", type_name(b))),
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Datum {
        Datum::Decimal(BigDecimal::from_str(s).unwrap())
    }

    #[test]
    fn integer_arithmetic() {
        assert_eq!(
            arithmetic(BinaryOp::Add, &Datum::Int(2), &Datum::Int(3)).unwrap(),
            Datum::Int(5)
        );
        assert_eq!(
            arithmetic(BinaryOp::Div, &Datum::Int(7), &Datum::Int(2)).unwrap(),
            Datum::Int(3)
        );
        assert_eq!(
            arithmetic(BinaryOp::Mod, &Datum::Int(7), &Datum::Int(2)).unwrap(),
            Datum::Int(1)
        );
        assert_eq!(
            arithmetic(BinaryOp::Div, &Datum::Int(1), &Datum::Int(0)).unwrap_err(),
            EvalError::DivisionByZero
        );
        assert!(matches!(
            arithmetic(BinaryOp::Add, &Datum::Int(i64::MAX), &Datum::Int(1)),
            Err(EvalError::NumericOverflow { .. })
        ));
    }

    #[test]
    fn mixed_numeric_widening() {
        assert_eq!(
            arithmetic(BinaryOp::Add, &Datum::Int(1), &dec("1.5")).unwrap(),
            dec("2.5")
        );
        assert_eq!(
            arithmetic(BinaryOp::Mul, &dec("2"), &Datum::Float(1.5)).unwrap(),
            Datum::Float(3.0)
        );
    }

    #[test]
    fn unknowns_propagate_with_missing_first() {
        assert_eq!(
            arithmetic(BinaryOp::Add, &Datum::Null, &Datum::Missing).unwrap(),
            Datum::Missing
        );
        assert_eq!(
            arithmetic(BinaryOp::Add, &Datum::Null, &Datum::Int(1)).unwrap(),
            Datum::Null
        );
        assert_eq!(unary_numeric(UnaryOp::Neg, &Datum::Null).unwrap(), Datum::Null);
    }

    #[test]
    fn type_errors() {
        let err = arithmetic(BinaryOp::Add, &Datum::Int(1), &Datum::string("a")).unwrap_err();
        assert_eq!(err.properties().get("actual").map(String::as_str), Some("STRING"));
        assert!(concat(&Datum::Int(1), &Datum::string("a")).is_err());
        assert_eq!(
            concat(&Datum::string("a"), &Datum::Symbol("b".into())).unwrap(),
            Datum::string("ab")
        );
    }
}
