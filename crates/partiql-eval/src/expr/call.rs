//! Scalar function call sites.
//!
//! The null-call and missing-call flags of a signature are applied here,
//! before the function body runs: a body declared null-call never sees a NULL
//! argument, and likewise for MISSING.

use std::sync::Arc;

use partiql_core::datum::Datum;
use partiql_core::error::{EvalError, EvalResult};
use partiql_core::location::SourceLocation;
use partiql_operators::ops::{cast, type_name};
use partiql_operators::signature::{ArgMatch, FnSignature};
use partiql_operators::{BoxedExpr, Environment, ScalarExpr, ScalarFunction};

/// Result decided by the unknown-call flags alone, if any.
fn short_circuit(sig: &FnSignature, args: &[Datum]) -> Option<Datum> {
    if sig.is_missing_call && args.iter().any(Datum::is_missing) {
        return Some(Datum::Missing);
    }
    if sig.is_null_call && args.iter().any(Datum::is_unknown) {
        // A MISSING argument reaches here only without missing-call.
        return Some(Datum::Null);
    }
    None
}

fn eval_args(args: &[BoxedExpr], env: &Environment) -> EvalResult<Vec<Datum>> {
    args.iter().map(|a| a.eval(env)).collect()
}

/// A call bound to one implementation at compile time.
#[derive(Debug)]
pub struct StaticCall {
    pub function: Arc<dyn ScalarFunction>,
    pub args: Vec<BoxedExpr>,
}

impl ScalarExpr for StaticCall {
    fn eval(&self, env: &Environment) -> EvalResult<Datum> {
        let args = eval_args(&self.args, env)?;
        match short_circuit(self.function.signature(), &args) {
            Some(unknown) => Ok(unknown),
            None => self.function.invoke(&args),
        }
    }
}

/// A call choosing among candidates by the runtime types of its arguments.
/// The first candidate accepting every argument wins; implicit coercions
/// are applied before the call.
#[derive(Debug)]
pub struct DynamicCall {
    pub name: String,
    pub candidates: Vec<Arc<dyn ScalarFunction>>,
    pub args: Vec<BoxedExpr>,
}

impl DynamicCall {
    fn select(&self, args: &[Datum]) -> Option<(&Arc<dyn ScalarFunction>, Vec<ArgMatch>)> {
        let types: Vec<_> = args.iter().map(Datum::runtime_type).collect();
        self.candidates
            .iter()
            .find_map(|f| f.signature().matches(&types).map(|m| (f, m)))
    }
}

impl ScalarExpr for DynamicCall {
    fn eval(&self, env: &Environment) -> EvalResult<Datum> {
        let args = eval_args(&self.args, env)?;
        let Some((function, matches)) = self.select(&args) else {
            return Err(EvalError::NoMatchingFunction {
                function: self.name.clone(),
                arguments: args.iter().map(type_name).collect::<Vec<_>>().join(", "),
                location: SourceLocation::UNKNOWN,
            });
        };
        if let Some(unknown) = short_circuit(function.signature(), &args) {
            return Ok(unknown);
        }
        let args = args
            .iter()
            .zip(matches)
            .map(|(arg, m)| match m {
                ArgMatch::Exact => Ok(arg.clone()),
                ArgMatch::Coerce(target) => cast::cast(arg, &target),
            })
            .collect::<EvalResult<Vec<_>>>()?;
        function.invoke(&args)
    }
}

/// A call no overload can accept for any value its arguments may take.
/// Arguments are still evaluated so that their own failures come first.
#[derive(Debug)]
pub struct NoMatchingCall {
    pub name: String,
    pub args: Vec<BoxedExpr>,
}

impl ScalarExpr for NoMatchingCall {
    fn eval(&self, env: &Environment) -> EvalResult<Datum> {
        let args = eval_args(&self.args, env)?;
        Err(EvalError::NoMatchingFunction {
            function: self.name.clone(),
            arguments: args.iter().map(type_name).collect::<Vec<_>>().join(", "),
            location: SourceLocation::UNKNOWN,
        })
    }
}

#[cfg(test)]
mod tests {
    use partiql_core::config::TypingMode;
    use partiql_core::types::StaticType;
    use partiql_operators::signature::Parameter;

    use super::super::testing::{env, guarded, lit};
    use super::*;

    /// Counts how often its body runs by failing when it does.
    #[derive(Debug)]
    struct Strict(FnSignature);

    impl ScalarFunction for Strict {
        fn signature(&self) -> &FnSignature {
            &self.0
        }
        fn invoke(&self, args: &[Datum]) -> EvalResult<Datum> {
            if args.iter().any(Datum::is_unknown) {
                return Err(EvalError::Internal("body saw an unknown".into()));
            }
            Ok(Datum::Int(args.len() as i64))
        }
    }

    fn int_fn(name: &str) -> Arc<dyn ScalarFunction> {
        Arc::new(Strict(FnSignature::new(
            name,
            vec![Parameter::new("x", StaticType::INT8)],
            StaticType::INT8,
        )))
    }

    #[test]
    fn unknown_arguments_never_reach_the_body() {
        for (arg, expected) in [(Datum::Missing, Datum::Missing), (Datum::Null, Datum::Null)] {
            let call = StaticCall {
                function: int_fn("f"),
                args: vec![lit(arg)],
            };
            assert_eq!(call.eval(&env(TypingMode::Strict)).unwrap(), expected);
        }
    }

    #[test]
    fn unknown_aware_bodies_see_unknowns() {
        let sig = FnSignature::new("f", vec![Parameter::new("x", StaticType::Any)], StaticType::INT8)
            .unknown_aware();
        let call = StaticCall {
            function: Arc::new(Strict(sig)),
            args: vec![lit(Datum::Null)],
        };
        assert!(call.eval(&env(TypingMode::Strict)).is_err());
    }

    #[test]
    fn dynamic_call_picks_by_runtime_type() {
        let text = Arc::new(Strict(FnSignature::new(
            "f",
            vec![Parameter::new("x", StaticType::STRING)],
            StaticType::INT8,
        )));
        let call = DynamicCall {
            name: "f".into(),
            candidates: vec![text, int_fn("f")],
            args: vec![lit(5)],
        };
        assert_eq!(call.eval(&env(TypingMode::Strict)).unwrap(), Datum::Int(1));
    }

    #[test]
    fn dynamic_call_without_candidate_depends_on_mode() {
        let call = guarded(Box::new(DynamicCall {
            name: "f".into(),
            candidates: vec![int_fn("f")],
            args: vec![lit(true)],
        }));
        assert_eq!(call.eval(&env(TypingMode::Permissive)).unwrap(), Datum::Missing);
        let err = call.eval(&env(TypingMode::Strict)).unwrap_err();
        assert_eq!(err.properties()["function"], "f");
    }

    #[test]
    fn no_matching_call_reports_argument_failures_first() {
        let call = guarded(Box::new(NoMatchingCall {
            name: "f".into(),
            args: vec![guarded(Box::new(crate::expr::Unbound { name: "x".into() }))],
        }));
        let err = call.eval(&env(TypingMode::Strict)).unwrap_err();
        assert_eq!(err.properties()["binding_name"], "x");
    }
}
