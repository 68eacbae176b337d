//! Equivalence, hashing and total order over `Datum`.
//!
//! Type classes order as: MISSING < NULL < BOOL < numbers < DATE < TIME <
//! TIMESTAMP < text < LOBs < LIST < SEXP < STRUCT < BAG. Within a class,
//! numbers compare by value, text by code points, lists and s-expressions
//! lexicographically, and bags and structs after sorting their members.
//! `Hash` is consistent with `Eq`: `1`, `1.0` and `1.00` hash identically.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use bigdecimal::{BigDecimal, ToPrimitive};
use num_bigint::BigInt;

use super::{Datum, StructValue};

fn class(d: &Datum) -> u8 {
    match d {
        Datum::Missing => 0,
        Datum::Null => 1,
        Datum::Bool(_) => 2,
        Datum::Int(_) | Datum::Decimal(_) | Datum::Float(_) => 3,
        Datum::Date(_) => 4,
        Datum::Time(_) => 5,
        Datum::Timestamp(_) => 6,
        Datum::String(_) | Datum::Symbol(_) => 7,
        Datum::Clob(_) | Datum::Blob(_) => 8,
        Datum::List(_) => 9,
        Datum::Sexp(_) => 10,
        Datum::Struct(_) => 11,
        Datum::Bag(_) => 12,
    }
}

/// Total float order with NaN below every other number.
fn cmp_f64(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// The exact value of a finite float.
fn exact_decimal(f: f64) -> BigDecimal {
    let bits = f.to_bits();
    let negative = bits >> 63 == 1;
    let biased = ((bits >> 52) & 0x7ff) as i64;
    let fraction = bits & ((1u64 << 52) - 1);
    let (mantissa, exponent) = if biased == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1u64 << 52), biased - 1075)
    };
    let mut digits = BigInt::from(mantissa);
    if negative {
        digits = -digits;
    }
    if exponent >= 0 {
        BigDecimal::from(digits << exponent as usize)
    } else {
        // m * 2^-k == m * 5^k / 10^k
        let k = exponent.unsigned_abs() as u32;
        BigDecimal::new(digits * BigInt::from(5u8).pow(k), i64::from(k))
    }
}

fn cmp_decimal_f64(d: &BigDecimal, f: f64) -> Ordering {
    if f.is_nan() {
        return Ordering::Greater;
    }
    if f.is_infinite() {
        return if f > 0.0 {
            Ordering::Less
        } else {
            Ordering::Greater
        };
    }
    d.cmp(&exact_decimal(f))
}

/// Compare two numeric datums by value.
pub(crate) fn cmp_numeric(a: &Datum, b: &Datum) -> Option<Ordering> {
    let ord = match (a, b) {
        (Datum::Int(x), Datum::Int(y)) => x.cmp(y),
        (Datum::Int(x), Datum::Decimal(y)) => BigDecimal::from(*x).cmp(y),
        (Datum::Decimal(x), Datum::Int(y)) => x.cmp(&BigDecimal::from(*y)),
        (Datum::Decimal(x), Datum::Decimal(y)) => x.cmp(y),
        (Datum::Int(x), Datum::Float(y)) => cmp_decimal_f64(&BigDecimal::from(*x), *y),
        (Datum::Float(x), Datum::Int(y)) => cmp_decimal_f64(&BigDecimal::from(*y), *x).reverse(),
        (Datum::Float(x), Datum::Float(y)) => cmp_f64(*x, *y),
        (Datum::Decimal(x), Datum::Float(y)) => cmp_decimal_f64(x, *y),
        (Datum::Float(x), Datum::Decimal(y)) => cmp_decimal_f64(y, *x).reverse(),
        _ => return None,
    };
    Some(ord)
}

fn cmp_seq(a: &[Datum], b: &[Datum]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        match x.cmp(y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

fn sorted(values: &[Datum]) -> Vec<&Datum> {
    let mut out: Vec<&Datum> = values.iter().collect();
    out.sort();
    out
}

fn sorted_fields(s: &StructValue) -> Vec<(&str, &Datum)> {
    let mut out: Vec<(&str, &Datum)> = s.iter().collect();
    out.sort();
    out
}

fn cmp_bags(a: &[Datum], b: &[Datum]) -> Ordering {
    let (sa, sb) = (sorted(a), sorted(b));
    for (x, y) in sa.iter().zip(sb.iter()) {
        match x.cmp(y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    sa.len().cmp(&sb.len())
}

fn cmp_structs(a: &StructValue, b: &StructValue) -> Ordering {
    let (fa, fb) = (sorted_fields(a), sorted_fields(b));
    for (x, y) in fa.iter().zip(fb.iter()) {
        match x.cmp(y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    fa.len().cmp(&fb.len())
}

impl Ord for Datum {
    fn cmp(&self, other: &Self) -> Ordering {
        let (ca, cb) = (class(self), class(other));
        if ca != cb {
            return ca.cmp(&cb);
        }
        match (self, other) {
            (Datum::Bool(a), Datum::Bool(b)) => a.cmp(b),
            (Datum::Date(a), Datum::Date(b)) => a.cmp(b),
            (Datum::Time(a), Datum::Time(b)) => a.cmp(b),
            (Datum::Timestamp(a), Datum::Timestamp(b)) => a.cmp(b),
            (
                Datum::String(a) | Datum::Symbol(a),
                Datum::String(b) | Datum::Symbol(b),
            ) => a.cmp(b),
            (Datum::Clob(a) | Datum::Blob(a), Datum::Clob(b) | Datum::Blob(b)) => a.cmp(b),
            (Datum::List(a), Datum::List(b)) | (Datum::Sexp(a), Datum::Sexp(b)) => cmp_seq(a, b),
            (Datum::Bag(a), Datum::Bag(b)) => cmp_bags(a, b),
            (Datum::Struct(a), Datum::Struct(b)) => cmp_structs(a, b),
            (a, b) => cmp_numeric(a, b).unwrap_or(Ordering::Equal),
        }
    }
}

impl PartialOrd for Datum {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Datum {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Datum {}

impl PartialEq for StructValue {
    fn eq(&self, other: &Self) -> bool {
        cmp_structs(self, other) == Ordering::Equal
    }
}

impl Eq for StructValue {}

/// Hash a number so that equal values across representations collide.
fn hash_number<H: Hasher>(d: &Datum, state: &mut H) {
    fn as_integral_f64(f: f64) -> Option<i64> {
        if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
            Some(f as i64)
        } else {
            None
        }
    }

    let integral = match d {
        Datum::Int(i) => Some(*i),
        Datum::Decimal(x) if x.is_integer() => x.to_i64(),
        Datum::Float(f) => as_integral_f64(*f),
        _ => None,
    };
    if let Some(i) = integral {
        0u8.hash(state);
        i.hash(state);
        return;
    }

    let f = match d {
        Datum::Decimal(x) => x.to_f64().unwrap_or(f64::NAN),
        Datum::Float(f) => *f,
        _ => f64::NAN,
    };
    1u8.hash(state);
    if f.is_nan() {
        u64::MAX.hash(state);
    } else {
        f.to_bits().hash(state);
    }
}

impl Hash for Datum {
    fn hash<H: Hasher>(&self, state: &mut H) {
        class(self).hash(state);
        match self {
            Datum::Missing | Datum::Null => {}
            Datum::Bool(b) => b.hash(state),
            Datum::Int(_) | Datum::Decimal(_) | Datum::Float(_) => hash_number(self, state),
            Datum::Date(d) => d.hash(state),
            Datum::Time(t) => t.hash(state),
            Datum::Timestamp(ts) => ts.hash(state),
            Datum::String(s) | Datum::Symbol(s) => s.hash(state),
            Datum::Clob(b) | Datum::Blob(b) => b.hash(state),
            Datum::List(v) | Datum::Sexp(v) => {
                v.len().hash(state);
                for item in v {
                    item.hash(state);
                }
            }
            Datum::Bag(v) => {
                let items = sorted(v);
                items.len().hash(state);
                for item in items {
                    item.hash(state);
                }
            }
            Datum::Struct(s) => s.hash(state),
        }
    }
}

impl Hash for StructValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let fields = sorted_fields(self);
        fields.len().hash(state);
        for (k, v) in fields {
            k.hash(state);
            v.hash(state);
        }
    }
}
