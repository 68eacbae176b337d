//! Collection functions: size/cardinality, exists.

use partiql_core::datum::Datum;
use partiql_core::error::{EvalError, EvalResult};
use partiql_core::types::StaticType;

use super::{arg, Builtin};
use crate::ops::type_name;
use crate::registry::FunctionRegistry;
use crate::signature::{FnSignature, Parameter};

fn size(args: &[Datum]) -> EvalResult<Datum> {
    let d = arg(args, 0, "size")?;
    let n = match d {
        Datum::Struct(s) => s.len(),
        other => other
            .elements()
            .ok_or_else(|| EvalError::type_mismatch("size", "a collection", type_name(other)))?
            .len(),
    };
    Ok(Datum::Int(n as i64))
}

fn exists(args: &[Datum]) -> EvalResult<Datum> {
    let d = arg(args, 0, "exists")?;
    let empty = match d {
        Datum::Struct(s) => s.is_empty(),
        other => other
            .elements()
            .ok_or_else(|| EvalError::type_mismatch("exists", "a collection", type_name(other)))?
            .is_empty(),
    };
    Ok(Datum::Bool(!empty))
}

pub(super) fn register(reg: &mut FunctionRegistry) {
    let containers = [
        StaticType::list(StaticType::Any),
        StaticType::bag(StaticType::Any),
        StaticType::sexp(StaticType::Any),
        StaticType::open_struct(),
    ];
    for name in ["size", "cardinality"] {
        for ty in &containers {
            reg.register_scalar(Builtin::new(
                FnSignature::new(name, vec![Parameter::new("container", ty.clone())], StaticType::INT8),
                size,
            ));
        }
    }
    for ty in &containers {
        reg.register_scalar(Builtin::new(
            FnSignature::new("exists", vec![Parameter::new("container", ty.clone())], StaticType::BOOL),
            exists,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(
            size(&[Datum::bag([Datum::Int(1), Datum::Int(2)])]).unwrap(),
            Datum::Int(2)
        );
        assert_eq!(
            size(&[Datum::tuple([("a", Datum::Null)])]).unwrap(),
            Datum::Int(1)
        );
        assert!(size(&[Datum::Int(1)]).is_err());
    }

    #[test]
    fn exists_checks_emptiness() {
        assert_eq!(exists(&[Datum::list([])]).unwrap(), Datum::Bool(false));
        assert_eq!(exists(&[Datum::list([Datum::Null])]).unwrap(), Datum::Bool(true));
    }
}
