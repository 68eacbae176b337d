//! `CAST` and `CAN_CAST`.

use std::str::FromStr;

use bigdecimal::{BigDecimal, FromPrimitive, ToPrimitive};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use partiql_core::datum::{CollectionKind, Datum};
use partiql_core::error::{EvalError, EvalResult};
use partiql_core::types::SingleType;

fn invalid(value: &Datum, target: &SingleType) -> EvalError {
    EvalError::InvalidCast {
        value: value.to_string(),
        target: target.name().to_string(),
    }
}

fn int_in_range(i: i64, target: &SingleType) -> bool {
    match target {
        SingleType::Int2 => i16::try_from(i).is_ok(),
        SingleType::Int4 => i32::try_from(i).is_ok(),
        _ => true,
    }
}

fn to_int(value: &Datum, target: &SingleType) -> EvalResult<Datum> {
    let err = || invalid(value, target);
    let i = match value {
        Datum::Int(i) => *i,
        Datum::Bool(b) => *b as i64,
        Datum::Decimal(d) => d.with_scale(0).to_i64().ok_or_else(err)?,
        Datum::Float(f) => {
            let t = f.trunc();
            if !t.is_finite() || t < i64::MIN as f64 || t >= i64::MAX as f64 {
                return Err(err());
            }
            t as i64
        }
        Datum::String(s) | Datum::Symbol(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(i) => i,
                Err(_) => BigDecimal::from_str(s)
                    .ok()
                    .and_then(|d| d.with_scale(0).to_i64())
                    .ok_or_else(err)?,
            }
        }
        _ => return Err(err()),
    };
    if int_in_range(i, target) {
        Ok(Datum::Int(i))
    } else {
        Err(err())
    }
}

fn to_decimal(value: &Datum, target: &SingleType) -> EvalResult<Datum> {
    let d = match value {
        Datum::Int(i) => BigDecimal::from(*i),
        Datum::Bool(b) => BigDecimal::from(*b as i64),
        Datum::Decimal(d) => d.clone(),
        Datum::Float(f) => BigDecimal::from_f64(*f).ok_or_else(|| invalid(value, target))?,
        Datum::String(s) | Datum::Symbol(s) => {
            BigDecimal::from_str(s.trim()).map_err(|_| invalid(value, target))?
        }
        _ => return Err(invalid(value, target)),
    };
    Ok(Datum::Decimal(d))
}

fn to_float(value: &Datum, target: &SingleType) -> EvalResult<Datum> {
    let f = match value {
        Datum::Int(i) => *i as f64,
        Datum::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Datum::Decimal(d) => d.to_f64().ok_or_else(|| invalid(value, target))?,
        Datum::Float(f) => *f,
        Datum::String(s) | Datum::Symbol(s) => {
            s.trim().parse::<f64>().map_err(|_| invalid(value, target))?
        }
        _ => return Err(invalid(value, target)),
    };
    Ok(Datum::Float(f))
}

fn to_text(value: &Datum, target: &SingleType) -> EvalResult<String> {
    let s = match value {
        Datum::String(s) | Datum::Symbol(s) => s.clone(),
        Datum::Bool(b) => b.to_string(),
        Datum::Int(i) => i.to_string(),
        Datum::Decimal(d) => d.to_string(),
        Datum::Float(f) => f.to_string(),
        Datum::Date(d) => d.format("%Y-%m-%d").to_string(),
        Datum::Time(t) => t.format("%H:%M:%S%.f").to_string(),
        Datum::Timestamp(ts) => ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
        Datum::Clob(b) => String::from_utf8(b.clone()).map_err(|_| invalid(value, target))?,
        _ => return Err(invalid(value, target)),
    };
    Ok(s)
}

fn to_bool(value: &Datum, target: &SingleType) -> EvalResult<Datum> {
    let b = match value {
        Datum::Bool(b) => *b,
        Datum::Int(i) => *i != 0,
        Datum::Decimal(d) => d != &BigDecimal::from(0),
        Datum::Float(f) => *f != 0.0,
        Datum::String(s) | Datum::Symbol(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => true,
            "false" => false,
            _ => return Err(invalid(value, target)),
        },
        _ => return Err(invalid(value, target)),
    };
    Ok(Datum::Bool(b))
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn to_temporal(value: &Datum, target: &SingleType) -> EvalResult<Datum> {
    let err = || invalid(value, target);
    match (target, value) {
        (SingleType::Date, Datum::Date(_))
        | (SingleType::Time, Datum::Time(_))
        | (SingleType::Timestamp, Datum::Timestamp(_)) => Ok(value.clone()),
        (SingleType::Date, Datum::Timestamp(ts)) => Ok(Datum::Date(ts.date())),
        (SingleType::Time, Datum::Timestamp(ts)) => Ok(Datum::Time(ts.time())),
        (SingleType::Timestamp, Datum::Date(d)) => {
            d.and_hms_opt(0, 0, 0).map(Datum::Timestamp).ok_or_else(err)
        }
        (SingleType::Date, Datum::String(s) | Datum::Symbol(s)) => {
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map(Datum::Date)
                .map_err(|_| err())
        }
        (SingleType::Time, Datum::String(s) | Datum::Symbol(s)) => {
            NaiveTime::parse_from_str(s.trim(), "%H:%M:%S%.f")
                .map(Datum::Time)
                .map_err(|_| err())
        }
        (SingleType::Timestamp, Datum::String(s) | Datum::Symbol(s)) => {
            parse_timestamp(s).map(Datum::Timestamp).ok_or_else(err)
        }
        _ => Err(err()),
    }
}

fn to_collection(value: &Datum, target: &SingleType, kind: CollectionKind) -> EvalResult<Datum> {
    match value.elements() {
        Some(items) => Ok(kind.wrap(items.to_vec())),
        None => Err(invalid(value, target)),
    }
}

/// `CAST(value AS target)`. NULL and MISSING cast to themselves.
pub fn cast(value: &Datum, target: &SingleType) -> EvalResult<Datum> {
    if value.is_unknown() {
        return Ok(value.clone());
    }
    match target {
        SingleType::Null => Ok(Datum::Null),
        SingleType::Missing => Ok(Datum::Missing),
        SingleType::Bool => to_bool(value, target),
        SingleType::Int2 | SingleType::Int4 | SingleType::Int8 | SingleType::Int => {
            to_int(value, target)
        }
        SingleType::Decimal => to_decimal(value, target),
        SingleType::Float32 | SingleType::Float64 => to_float(value, target),
        SingleType::String => to_text(value, target).map(Datum::String),
        SingleType::Symbol => to_text(value, target).map(Datum::Symbol),
        SingleType::Clob | SingleType::Blob => {
            let bytes = match value {
                Datum::Clob(b) | Datum::Blob(b) => b.clone(),
                Datum::String(s) | Datum::Symbol(s) if *target == SingleType::Clob => {
                    s.as_bytes().to_vec()
                }
                _ => return Err(invalid(value, target)),
            };
            Ok(if *target == SingleType::Clob {
                Datum::Clob(bytes)
            } else {
                Datum::Blob(bytes)
            })
        }
        SingleType::Date | SingleType::Time | SingleType::Timestamp => to_temporal(value, target),
        SingleType::List(_) => to_collection(value, target, CollectionKind::List),
        SingleType::Bag(_) => to_collection(value, target, CollectionKind::Bag),
        SingleType::Sexp(_) => to_collection(value, target, CollectionKind::Sexp),
        SingleType::Struct(_) => match value {
            Datum::Struct(_) => Ok(value.clone()),
            _ => Err(invalid(value, target)),
        },
    }
}

/// `CAN_CAST(value AS target)`.
pub fn can_cast(value: &Datum, target: &SingleType) -> bool {
    cast(value, target).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_casts() {
        assert_eq!(
            cast(&Datum::Float(3.9), &SingleType::Int4).unwrap(),
            Datum::Int(3)
        );
        assert!(cast(&Datum::Int(70_000), &SingleType::Int2).is_err());
        assert_eq!(
            cast(&Datum::string(" 42 "), &SingleType::Int8).unwrap(),
            Datum::Int(42)
        );
        assert_eq!(
            cast(&Datum::Int(1), &SingleType::Decimal).unwrap(),
            Datum::Int(1)
        );
    }

    #[test]
    fn text_and_bool_casts() {
        assert_eq!(
            cast(&Datum::Int(5), &SingleType::String).unwrap(),
            Datum::string("5")
        );
        assert_eq!(
            cast(&Datum::string("TRUE"), &SingleType::Bool).unwrap(),
            Datum::Bool(true)
        );
        assert!(matches!(
            cast(&Datum::string("yes"), &SingleType::Bool),
            Err(EvalError::InvalidCast { .. })
        ));
    }

    #[test]
    fn temporal_casts() {
        let d = cast(&Datum::string("2024-02-29"), &SingleType::Date).unwrap();
        assert_eq!(d, Datum::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()));
        let ts = cast(&d, &SingleType::Timestamp).unwrap();
        assert_eq!(cast(&ts, &SingleType::Date).unwrap(), d);
        assert!(!can_cast(&Datum::string("2024-13-01"), &SingleType::Date));
    }

    #[test]
    fn unknowns_cast_to_themselves() {
        assert_eq!(cast(&Datum::Missing, &SingleType::Int4).unwrap(), Datum::Missing);
        assert_eq!(cast(&Datum::Null, &SingleType::String).unwrap(), Datum::Null);
        assert!(can_cast(&Datum::Null, &SingleType::Bool));
    }

    #[test]
    fn collection_casts() {
        let list = Datum::list([Datum::Int(1)]);
        let bag = cast(&list, &SingleType::Bag(Box::new(partiql_core::types::StaticType::Any)))
            .unwrap();
        assert_eq!(bag, Datum::bag([Datum::Int(1)]));
    }
}
