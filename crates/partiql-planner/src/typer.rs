//! Static typing rules for operators.
//!
//! Operand unions are split into their known members and their unknowns.
//! Known members are combined pairwise; unknowns are re-attached afterwards
//! (MISSING dominates NULL for arithmetic and string operators, while
//! comparisons yield NULL for either unknown). A pairing the runtime would
//! reject makes the result possibly MISSING (the permissive outcome); when
//! no pairing is valid the operator is statically incompatible.

use partiql_core::plan::{unknowns_of, BinaryOp, UnaryOp};
use partiql_core::types::{FieldLookup, SingleType, StaticType};

/// Result type plus whether the operand types can never work together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Typed {
    pub ty: StaticType,
    pub incompatible: bool,
}

impl Typed {
    fn ok(ty: StaticType) -> Self {
        Self {
            ty,
            incompatible: false,
        }
    }
}

/// Known (non-NULL, non-MISSING) members, or `None` for `Any`.
fn known(ty: &StaticType) -> Option<Vec<SingleType>> {
    ty.singles()
        .map(|ms| ms.into_iter().filter(|s| !s.is_unknown()).cloned().collect())
}

fn comparable(a: &SingleType, b: &SingleType) -> bool {
    (a.is_numeric() && b.is_numeric())
        || (a.is_text() && b.is_text())
        || (matches!(a, SingleType::Clob | SingleType::Blob)
            && matches!(b, SingleType::Clob | SingleType::Blob))
        || (!a.is_collection()
            && !matches!(a, SingleType::Struct(_))
            && a.same_kind(b))
}

fn pair_result(op: BinaryOp, a: &SingleType, b: &SingleType) -> Option<SingleType> {
    if op.is_arithmetic() {
        if !(a.is_numeric() && b.is_numeric()) {
            return None;
        }
        if a == b {
            return Some(a.clone());
        }
        return a.common_supertype(b);
    }
    match op {
        BinaryOp::Concat => (a.is_text() && b.is_text()).then_some(SingleType::String),
        BinaryOp::Eq | BinaryOp::Ne => Some(SingleType::Bool),
        _ => comparable(a, b).then_some(SingleType::Bool),
    }
}

/// Type of `lhs <op> rhs`.
pub fn binary(op: BinaryOp, lhs: &StaticType, rhs: &StaticType) -> Typed {
    let unknown_result = if op.is_comparison() {
        if lhs.may_be_null() || lhs.may_be_missing() || rhs.may_be_null() || rhs.may_be_missing() {
            StaticType::NULL
        } else {
            StaticType::Nothing
        }
    } else if lhs.may_be_missing() || rhs.may_be_missing() {
        // NULL can still arise from the other operand being NULL.
        StaticType::any_of([
            StaticType::MISSING,
            if lhs.may_be_null() || rhs.may_be_null() {
                StaticType::NULL
            } else {
                StaticType::Nothing
            },
        ])
    } else if lhs.may_be_null() || rhs.may_be_null() {
        StaticType::NULL
    } else {
        StaticType::Nothing
    };

    let (Some(ls), Some(rs)) = (known(lhs), known(rhs)) else {
        let known_ty = if op.is_comparison() {
            StaticType::BOOL
        } else if op == BinaryOp::Concat {
            StaticType::STRING
        } else {
            StaticType::Any
        };
        return Typed::ok(StaticType::any_of([
            known_ty,
            StaticType::NULL,
            StaticType::MISSING,
        ]));
    };

    if ls.is_empty() || rs.is_empty() {
        // At least one operand is always unknown.
        let ty = if op.is_comparison() {
            StaticType::NULL
        } else {
            unknowns_of(&StaticType::any_of([lhs.clone(), rhs.clone()]))
        };
        return Typed::ok(ty);
    }

    let mut results = Vec::new();
    let mut failures = 0usize;
    for a in &ls {
        for b in &rs {
            match pair_result(op, a, b) {
                Some(t) => results.push(StaticType::Single(t)),
                None => failures += 1,
            }
        }
    }
    let incompatible = results.is_empty();
    if failures > 0 {
        results.push(StaticType::MISSING);
    }
    results.push(unknown_result);
    Typed {
        ty: StaticType::any_of(results),
        incompatible,
    }
}

/// Type of `<op> operand`.
pub fn unary(op: UnaryOp, operand: &StaticType) -> Typed {
    let Some(members) = known(operand) else {
        let ty = match op {
            UnaryOp::Not => StaticType::BOOL,
            _ => StaticType::Any,
        };
        return Typed::ok(StaticType::any_of([ty, StaticType::NULL, StaticType::MISSING]));
    };
    let accepts = |s: &SingleType| match op {
        UnaryOp::Not => matches!(s, SingleType::Bool),
        UnaryOp::Neg | UnaryOp::Pos => s.is_numeric(),
    };
    let mut results: Vec<StaticType> = Vec::new();
    let mut failures = false;
    for m in &members {
        if accepts(m) {
            results.push(StaticType::Single(m.clone()));
        } else {
            failures = true;
        }
    }
    let incompatible = results.is_empty() && !members.is_empty();
    if failures {
        results.push(StaticType::MISSING);
    }
    if op == UnaryOp::Not {
        // NOT folds MISSING into NULL.
        if operand.may_be_null() || operand.may_be_missing() {
            results.push(StaticType::NULL);
        }
    } else {
        results.push(unknowns_of(operand));
    }
    Typed {
        ty: StaticType::any_of(results),
        incompatible,
    }
}

/// Type of an AND/OR over `operands`: BOOL when every operand is BOOL, NULL
/// when every operand is unknown-only, `{BOOL, NULL}` otherwise. An operand
/// with no BOOL or unknown member makes the connective incompatible.
pub fn connective(operands: &[&StaticType]) -> Typed {
    let incompatible = operands.iter().any(|t| {
        !t.is_any()
            && !t.contains(&SingleType::Bool)
            && !t.may_be_null()
            && !t.may_be_missing()
    });
    let ty = if operands.iter().all(|t| **t == StaticType::BOOL) {
        StaticType::BOOL
    } else if operands.iter().all(|t| t.is_unknown_only()) {
        StaticType::NULL
    } else {
        StaticType::any_of([StaticType::BOOL, StaticType::NULL])
    };
    let ty = if incompatible || operands.iter().any(|t| has_non_bool(t)) {
        ty.with_missing()
    } else {
        ty
    };
    Typed { ty, incompatible }
}

fn has_non_bool(t: &StaticType) -> bool {
    match known(t) {
        None => true,
        Some(ms) => ms.iter().any(|m| !matches!(m, SingleType::Bool)),
    }
}

/// Type of `IS <target>`: BOOL, or MISSING when the operand is always
/// MISSING and the assertion is not about unknowns.
pub fn is_type(operand: &StaticType, target: &SingleType) -> StaticType {
    if operand.is_missing_only() && !target.is_unknown() {
        return StaticType::MISSING;
    }
    if operand.may_be_missing() && !target.is_unknown() {
        return StaticType::BOOL.with_missing();
    }
    StaticType::BOOL
}

/// Result of a symbol/key step over `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTyped {
    pub ty: StaticType,
    /// The key can never match any field of the root.
    pub never: bool,
}

/// Type of `root.key`.
pub fn path_key(root: &StaticType, key: &str, case_sensitive: bool) -> PathTyped {
    let Some(members) = root.singles() else {
        return PathTyped {
            ty: StaticType::Any,
            never: false,
        };
    };
    let mut results = Vec::new();
    let mut any_struct = false;
    let mut any_match = false;
    for m in members {
        match m {
            SingleType::Struct(s) => {
                any_struct = true;
                match s.field(key, case_sensitive) {
                    FieldLookup::Found(t) => {
                        any_match = true;
                        results.push(t);
                    }
                    FieldLookup::Unknown => {
                        any_match = true;
                        results.push(StaticType::Any);
                    }
                    FieldLookup::Absent => results.push(StaticType::MISSING),
                }
            }
            _ => results.push(StaticType::MISSING),
        }
    }
    PathTyped {
        ty: StaticType::any_of(results),
        never: any_struct && !any_match,
    }
}

/// Type of `root[i]` with an integer index.
pub fn path_index(root: &StaticType) -> StaticType {
    let Some(members) = root.singles() else {
        return StaticType::Any;
    };
    let mut results = vec![];
    for m in members {
        match m {
            SingleType::List(e) | SingleType::Sexp(e) => results.push((**e).clone()),
            _ => {}
        }
    }
    // Out-of-bounds or wrong-kind navigation is MISSING.
    results.push(StaticType::MISSING);
    StaticType::any_of(results)
}

/// Union of several branch types (CASE, COALESCE).
pub fn union<'a>(types: impl IntoIterator<Item = &'a StaticType>) -> StaticType {
    StaticType::any_of(types.into_iter().cloned())
}

/// Type of `COALESCE(operands)`: the known members of every operand, plus
/// NULL when every operand may be unknown.
pub fn coalesce(operands: &[&StaticType]) -> StaticType {
    let all_unknown = operands
        .iter()
        .all(|t| t.is_any() || t.may_be_null() || t.may_be_missing());
    let mut parts: Vec<StaticType> = operands.iter().map(|t| t.strip_unknowns()).collect();
    if all_unknown {
        parts.push(StaticType::NULL);
    }
    StaticType::any_of(parts)
}

/// Type of a predicate whose result follows comparison rules (BETWEEN, IN, LIKE).
pub fn predicate(operands: &[&StaticType]) -> StaticType {
    let mut parts = vec![StaticType::BOOL];
    if operands.iter().any(|t| t.is_any() || t.may_be_null() || t.may_be_missing()) {
        parts.push(StaticType::NULL);
    }
    if operands.iter().any(|t| t.is_any()) {
        parts.push(StaticType::MISSING);
    }
    StaticType::any_of(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_equals_decimal_is_bool() {
        let t = binary(BinaryOp::Eq, &StaticType::INT4, &StaticType::DECIMAL);
        assert_eq!(t, Typed::ok(StaticType::BOOL));
    }

    #[test]
    fn same_types_keep_their_type() {
        let t = binary(BinaryOp::Add, &StaticType::INT4, &StaticType::INT4);
        assert_eq!(t.ty, StaticType::INT4);
        let widened = binary(BinaryOp::Add, &StaticType::INT4, &StaticType::DECIMAL);
        assert_eq!(widened.ty, StaticType::DECIMAL);
    }

    #[test]
    fn unknowns_are_reattached() {
        let maybe_null = StaticType::INT4.with_null();
        let maybe_missing = StaticType::INT4.with_missing();
        assert_eq!(
            binary(BinaryOp::Add, &maybe_null, &StaticType::INT4).ty,
            StaticType::INT4.with_null()
        );
        assert_eq!(
            binary(BinaryOp::Add, &maybe_missing, &StaticType::INT4).ty,
            StaticType::INT4.with_missing()
        );
        assert_eq!(
            binary(BinaryOp::Lt, &maybe_missing, &StaticType::INT4).ty,
            StaticType::BOOL.with_null()
        );
    }

    #[test]
    fn incompatible_operands_are_flagged() {
        let t = binary(BinaryOp::Add, &StaticType::STRING, &StaticType::INT4);
        assert!(t.incompatible);
        assert_eq!(t.ty, StaticType::MISSING);

        let partial = binary(
            BinaryOp::Add,
            &StaticType::any_of([StaticType::STRING, StaticType::INT4]),
            &StaticType::INT4,
        );
        assert!(!partial.incompatible);
        assert_eq!(partial.ty, StaticType::INT4.with_missing());
    }

    #[test]
    fn connective_tie_break() {
        let b = StaticType::BOOL;
        let n = StaticType::NULL;
        let bn = StaticType::BOOL.with_null();
        assert_eq!(connective(&[&b, &b]).ty, StaticType::BOOL);
        assert_eq!(connective(&[&n, &n]).ty, StaticType::NULL);
        assert_eq!(connective(&[&b, &n]).ty, bn);
        assert_eq!(connective(&[&b, &bn]).ty, bn);
        assert!(connective(&[&b, &StaticType::INT4]).incompatible);
    }

    #[test]
    fn is_null_is_always_bool() {
        assert_eq!(is_type(&StaticType::MISSING, &SingleType::Null), StaticType::BOOL);
        assert_eq!(is_type(&StaticType::MISSING, &SingleType::Int4), StaticType::MISSING);
        assert_eq!(is_type(&StaticType::Any, &SingleType::Null), StaticType::BOOL);
    }

    #[test]
    fn closed_struct_key_never_matches() {
        let root = StaticType::closed_struct(vec![("a".into(), StaticType::INT4)]);
        assert_eq!(
            path_key(&root, "a", true),
            PathTyped {
                ty: StaticType::INT4,
                never: false
            }
        );
        let miss = path_key(&root, "b", true);
        assert!(miss.never);
        assert_eq!(miss.ty, StaticType::MISSING);
        assert!(!path_key(&StaticType::open_struct(), "b", true).never);
    }
}
