//! Text functions: upper, lower, char_length, substring, trim, concat.

use partiql_core::datum::Datum;
use partiql_core::error::{EvalError, EvalResult};
use partiql_core::types::StaticType;

use super::{arg, Builtin};
use crate::ops::type_name;
use crate::registry::FunctionRegistry;
use crate::signature::{FnSignature, Parameter};

fn text<'a>(args: &'a [Datum], i: usize, function: &str) -> EvalResult<&'a str> {
    let d = arg(args, i, function)?;
    d.as_text()
        .ok_or_else(|| EvalError::type_mismatch(function, "STRING", type_name(d)))
}

fn int(args: &[Datum], i: usize, function: &str) -> EvalResult<i64> {
    let d = arg(args, i, function)?;
    d.as_i64()
        .ok_or_else(|| EvalError::type_mismatch(function, "INT", type_name(d)))
}

fn upper(args: &[Datum]) -> EvalResult<Datum> {
    Ok(Datum::String(text(args, 0, "upper")?.to_uppercase()))
}

fn lower(args: &[Datum]) -> EvalResult<Datum> {
    Ok(Datum::String(text(args, 0, "lower")?.to_lowercase()))
}

fn char_length(args: &[Datum]) -> EvalResult<Datum> {
    Ok(Datum::Int(text(args, 0, "char_length")?.chars().count() as i64))
}

/// SQL substring: 1-based `start`, which may lie before the first character.
fn substring_impl(s: &str, start: i64, len: Option<i64>) -> EvalResult<Datum> {
    let n = s.chars().count() as i64;
    let end = match len {
        Some(l) if l < 0 => {
            return Err(EvalError::invalid_argument(
                "substring",
                format!("negative length {l}"),
            ))
        }
        Some(l) => start.saturating_add(l).min(n + 1),
        None => n + 1,
    };
    let from = start.max(1);
    if end <= from {
        return Ok(Datum::String(String::new()));
    }
    let out: String = s
        .chars()
        .skip((from - 1) as usize)
        .take((end - from) as usize)
        .collect();
    Ok(Datum::String(out))
}

fn substring2(args: &[Datum]) -> EvalResult<Datum> {
    substring_impl(text(args, 0, "substring")?, int(args, 1, "substring")?, None)
}

fn substring3(args: &[Datum]) -> EvalResult<Datum> {
    substring_impl(
        text(args, 0, "substring")?,
        int(args, 1, "substring")?,
        Some(int(args, 2, "substring")?),
    )
}

fn trim(args: &[Datum]) -> EvalResult<Datum> {
    Ok(Datum::String(text(args, 0, "trim")?.trim_matches(' ').to_string()))
}

fn concat(args: &[Datum]) -> EvalResult<Datum> {
    let mut out = String::new();
    for i in 0..args.len() {
        out.push_str(text(args, i, "concat")?);
    }
    Ok(Datum::String(out))
}

pub(super) fn register(reg: &mut FunctionRegistry) {
    let s = || Parameter::new("value", StaticType::STRING);
    let i = |name: &str| Parameter::new(name, StaticType::INT8);

    reg.register_scalar(Builtin::new(
        FnSignature::new("upper", vec![s()], StaticType::STRING),
        upper,
    ));
    reg.register_scalar(Builtin::new(
        FnSignature::new("lower", vec![s()], StaticType::STRING),
        lower,
    ));
    for name in ["char_length", "character_length"] {
        reg.register_scalar(Builtin::new(
            FnSignature::new(name, vec![s()], StaticType::INT8),
            char_length,
        ));
    }
    reg.register_scalar(Builtin::new(
        FnSignature::new("substring", vec![s(), i("start")], StaticType::STRING),
        substring2,
    ));
    reg.register_scalar(Builtin::new(
        FnSignature::new(
            "substring",
            vec![s(), i("start"), i("length")],
            StaticType::STRING,
        ),
        substring3,
    ));
    reg.register_scalar(Builtin::new(
        FnSignature::new("trim", vec![s()], StaticType::STRING),
        trim,
    ));
    reg.register_scalar(Builtin::new(
        FnSignature::new(
            "concat",
            vec![
                Parameter::new("lhs", StaticType::STRING),
                Parameter::new("rhs", StaticType::STRING),
            ],
            StaticType::STRING,
        ),
        concat,
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Datum {
        Datum::string(v)
    }

    #[test]
    fn case_mapping() {
        assert_eq!(upper(&[s("abC")]).unwrap(), s("ABC"));
        assert_eq!(lower(&[s("AbC")]).unwrap(), s("abc"));
        assert_eq!(char_length(&[s("héllo")]).unwrap(), Datum::Int(5));
    }

    #[test]
    fn substring_bounds() {
        assert_eq!(substring2(&[s("abcdef"), Datum::Int(3)]).unwrap(), s("cdef"));
        assert_eq!(
            substring3(&[s("abcdef"), Datum::Int(0), Datum::Int(3)]).unwrap(),
            s("ab")
        );
        assert_eq!(
            substring3(&[s("abc"), Datum::Int(5), Datum::Int(2)]).unwrap(),
            s("")
        );
        assert!(substring3(&[s("abc"), Datum::Int(1), Datum::Int(-1)]).is_err());
    }

    #[test]
    fn trim_and_concat() {
        assert_eq!(trim(&[s("  x y  ")]).unwrap(), s("x y"));
        assert_eq!(concat(&[s("a"), s("b")]).unwrap(), s("ab"));
        assert!(upper(&[Datum::Int(1)]).is_err());
    }
}
