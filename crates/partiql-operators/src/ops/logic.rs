//! Three-valued boolean connectives.
//!
//! MISSING behaves like NULL. A `false` operand decides AND, a `true`
//! operand decides OR, regardless of unknowns elsewhere.

use partiql_core::config::TypingMode;
use partiql_core::datum::Datum;
use partiql_core::error::{EvalError, EvalResult};

use super::type_name;

pub fn not(a: &Datum) -> EvalResult<Datum> {
    match a {
        Datum::Bool(b) => Ok(Datum::Bool(!b)),
        Datum::Null | Datum::Missing => Ok(Datum::Null),
        other => Err(EvalError::type_mismatch("NOT", "BOOL", type_name(other))),
    }
}

fn connective<I>(name: &str, decisive: bool, operands: I, mode: TypingMode) -> EvalResult<Datum>
where
    I: IntoIterator<Item = EvalResult<Datum>>,
{
    let mut unknown = false;
    let mut type_error: Option<EvalError> = None;
    for operand in operands {
        match operand? {
            Datum::Bool(b) if b == decisive => return Ok(Datum::Bool(decisive)),
            Datum::Bool(_) => {}
            Datum::Null | Datum::Missing => unknown = true,
            other => {
                let err = EvalError::type_mismatch(name, "BOOL", type_name(&other));
                if mode == TypingMode::Strict {
                    return Err(err);
                }
                // A later decisive operand still wins.
                type_error.get_or_insert(err);
            }
        }
    }
    match type_error {
        Some(err) => Err(err),
        None if unknown => Ok(Datum::Null),
        None => Ok(Datum::Bool(!decisive)),
    }
}

/// N-ary AND over lazily produced operands, short-circuiting on `false`.
pub fn and<I>(operands: I, mode: TypingMode) -> EvalResult<Datum>
where
    I: IntoIterator<Item = EvalResult<Datum>>,
{
    connective("AND", false, operands, mode)
}

/// N-ary OR over lazily produced operands, short-circuiting on `true`.
pub fn or<I>(operands: I, mode: TypingMode) -> EvalResult<Datum>
where
    I: IntoIterator<Item = EvalResult<Datum>>,
{
    connective("OR", true, operands, mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(values: &[Datum]) -> Vec<EvalResult<Datum>> {
        values.iter().cloned().map(Ok).collect()
    }

    #[test]
    fn and_truth_table() {
        let m = TypingMode::Strict;
        assert_eq!(and(ok(&[true.into(), true.into()]), m).unwrap(), Datum::Bool(true));
        assert_eq!(and(ok(&[true.into(), Datum::Null]), m).unwrap(), Datum::Null);
        assert_eq!(and(ok(&[Datum::Missing, false.into()]), m).unwrap(), Datum::Bool(false));
        assert_eq!(and(ok(&[Datum::Missing, true.into()]), m).unwrap(), Datum::Null);
    }

    #[test]
    fn or_truth_table() {
        let m = TypingMode::Strict;
        assert_eq!(or(ok(&[false.into(), false.into()]), m).unwrap(), Datum::Bool(false));
        assert_eq!(or(ok(&[Datum::Null, true.into()]), m).unwrap(), Datum::Bool(true));
        assert_eq!(or(ok(&[Datum::Missing, false.into()]), m).unwrap(), Datum::Null);
    }

    #[test]
    fn short_circuit_skips_later_operands() {
        let operands = vec![
            Ok(Datum::Bool(false)),
            Err(EvalError::Internal("must not be evaluated".into())),
        ];
        assert_eq!(and(operands, TypingMode::Strict).unwrap(), Datum::Bool(false));
    }

    #[test]
    fn non_bool_operand() {
        let strict = and(ok(&[Datum::Int(1), false.into()]), TypingMode::Strict);
        assert!(strict.is_err());
        let permissive = and(ok(&[Datum::Int(1), false.into()]), TypingMode::Permissive);
        assert_eq!(permissive.unwrap(), Datum::Bool(false));
        let permissive = and(ok(&[Datum::Int(1), true.into()]), TypingMode::Permissive);
        assert!(permissive.is_err());
        assert_eq!(not(&Datum::Missing).unwrap(), Datum::Null);
    }
}
