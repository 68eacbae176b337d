//! Builtin scalar functions.

mod collection;
mod numeric;
mod string;

use std::fmt;
use std::sync::Arc;

use partiql_core::datum::Datum;
use partiql_core::error::EvalResult;

use crate::registry::FunctionRegistry;
use crate::signature::FnSignature;
use crate::traits::ScalarFunction;

pub type ScalarBody = fn(&[Datum]) -> EvalResult<Datum>;

/// A scalar function backed by a plain function pointer.
pub struct Builtin {
    sig: FnSignature,
    body: ScalarBody,
}

impl Builtin {
    pub fn new(sig: FnSignature, body: ScalarBody) -> Arc<Self> {
        Arc::new(Self { sig, body })
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Builtin({})", self.sig)
    }
}

impl ScalarFunction for Builtin {
    fn signature(&self) -> &FnSignature {
        &self.sig
    }

    fn invoke(&self, args: &[Datum]) -> EvalResult<Datum> {
        (self.body)(args)
    }
}

pub fn register_builtins(reg: &mut FunctionRegistry) {
    string::register(reg);
    numeric::register(reg);
    collection::register(reg);
}

/// Positional argument access for function bodies whose arity the registry
/// already checked.
pub(crate) fn arg<'a>(args: &'a [Datum], i: usize, function: &str) -> EvalResult<&'a Datum> {
    args.get(i).ok_or_else(|| {
        partiql_core::error::EvalError::Internal(format!("{function}: missing argument {i}"))
    })
}
