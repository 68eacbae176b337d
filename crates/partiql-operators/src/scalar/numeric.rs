//! Numeric functions: abs, mod, ceil, floor.

use bigdecimal::{BigDecimal, RoundingMode};
use partiql_core::datum::Datum;
use partiql_core::error::{EvalError, EvalResult};
use partiql_core::plan::BinaryOp;
use partiql_core::types::StaticType;

use super::{arg, Builtin};
use crate::ops::{arith, type_name};
use crate::registry::FunctionRegistry;
use crate::signature::{FnSignature, Parameter};

fn abs(args: &[Datum]) -> EvalResult<Datum> {
    match arg(args, 0, "abs")? {
        Datum::Int(i) => i.checked_abs().map(Datum::Int).ok_or(EvalError::NumericOverflow {
            operator: "abs".into(),
        }),
        Datum::Decimal(d) => Ok(Datum::Decimal(d.abs())),
        Datum::Float(f) => Ok(Datum::Float(f.abs())),
        other => Err(EvalError::type_mismatch("abs", "numeric", type_name(other))),
    }
}

fn modulo(args: &[Datum]) -> EvalResult<Datum> {
    arith::arithmetic(BinaryOp::Mod, arg(args, 0, "mod")?, arg(args, 1, "mod")?)
}

fn round(args: &[Datum], function: &str, mode: RoundingMode) -> EvalResult<Datum> {
    match arg(args, 0, function)? {
        Datum::Int(i) => Ok(Datum::Int(*i)),
        Datum::Decimal(d) => Ok(Datum::Decimal(round_decimal(d, mode))),
        Datum::Float(f) => Ok(Datum::Float(match mode {
            RoundingMode::Ceiling => f.ceil(),
            _ => f.floor(),
        })),
        other => Err(EvalError::type_mismatch(function, "numeric", type_name(other))),
    }
}

fn round_decimal(d: &BigDecimal, mode: RoundingMode) -> BigDecimal {
    d.with_scale_round(0, mode)
}

fn ceil(args: &[Datum]) -> EvalResult<Datum> {
    round(args, "ceil", RoundingMode::Ceiling)
}

fn floor(args: &[Datum]) -> EvalResult<Datum> {
    round(args, "floor", RoundingMode::Floor)
}

pub(super) fn register(reg: &mut FunctionRegistry) {
    let numeric = [StaticType::INT8, StaticType::DECIMAL, StaticType::FLOAT64];

    for ty in &numeric {
        reg.register_scalar(Builtin::new(
            FnSignature::new("abs", vec![Parameter::new("value", ty.clone())], ty.clone()),
            abs,
        ));
    }
    for ty in &numeric[..2] {
        reg.register_scalar(Builtin::new(
            FnSignature::new(
                "mod",
                vec![
                    Parameter::new("dividend", ty.clone()),
                    Parameter::new("divisor", ty.clone()),
                ],
                ty.clone(),
            ),
            modulo,
        ));
    }
    for (name, body) in [("ceil", ceil as super::ScalarBody), ("floor", floor)] {
        for ty in &numeric {
            reg.register_scalar(Builtin::new(
                FnSignature::new(name, vec![Parameter::new("value", ty.clone())], ty.clone()),
                body,
            ));
        }
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
    fn abs_values() {
        assert_eq!(abs(&[Datum::Int(-3)]).unwrap(), Datum::Int(3));
        assert_eq!(abs(&[dec("-1.5")]).unwrap(), dec("1.5"));
        assert!(abs(&[Datum::Int(i64::MIN)]).is_err());
    }

    #[test]
    fn rounding() {
        assert_eq!(ceil(&[dec("1.2")]).unwrap(), Datum::Int(2));
        assert_eq!(floor(&[dec("-1.2")]).unwrap(), Datum::Int(-2));
        assert_eq!(floor(&[Datum::Float(2.7)]).unwrap(), Datum::Float(2.0));
    }

    #[test]
    fn modulo_by_zero() {
        assert_eq!(
            modulo(&[Datum::Int(5), Datum::Int(0)]).unwrap_err(),
            EvalError::DivisionByZero
        );
    }
}
