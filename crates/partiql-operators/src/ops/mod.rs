//! Datum-level semantics of the language's built-in operators.
//!
//! Every function here is total over `Datum` and reports type violations as
//! `EvalError`s; the caller decides (by typing mode) whether an error aborts
//! the evaluation or becomes MISSING.
//!
//! Unknown propagation: MISSING dominates NULL for arithmetic, string and
//! path operators. Comparisons map any unknown operand to NULL, and the
//! boolean connectives treat MISSING like NULL.

pub mod arith;
pub mod cast;
pub mod compare;
pub mod like;
pub mod logic;
pub mod path;
pub mod predicate;

use partiql_core::datum::Datum;

/// MISSING if any argument is MISSING, else NULL if any is NULL.
pub fn propagate_unknowns(args: &[Datum]) -> Option<Datum> {
    if args.iter().any(Datum::is_missing) {
        Some(Datum::Missing)
    } else if args.iter().any(Datum::is_null) {
        Some(Datum::Null)
    } else {
        None
    }
}

/// Short human-readable type name of a runtime value, for diagnostics.
pub fn type_name(d: &Datum) -> &'static str {
    d.runtime_type().name()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_dominates_null() {
        assert_eq!(
            propagate_unknowns(&[Datum::Null, Datum::Missing]),
            Some(Datum::Missing)
        );
        assert_eq!(
            propagate_unknowns(&[Datum::Int(1), Datum::Null]),
            Some(Datum::Null)
        );
        assert_eq!(propagate_unknowns(&[Datum::Int(1)]), None);
    }
}
