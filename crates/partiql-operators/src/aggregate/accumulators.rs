use std::cmp::Ordering;

use bigdecimal::BigDecimal;
use partiql_core::datum::Datum;
use partiql_core::error::{EvalError, EvalResult};
use partiql_core::plan::BinaryOp;

use crate::ops::{arith, type_name};
use crate::traits::Accumulator;

fn first(args: &[Datum]) -> &Datum {
    args.first().unwrap_or(&Datum::Missing)
}

#[derive(Debug, Default)]
pub struct Count {
    n: i64,
}

impl Accumulator for Count {
    fn next(&mut self, args: &[Datum]) -> EvalResult<()> {
        if !first(args).is_unknown() {
            self.n += 1;
        }
        Ok(())
    }

    fn value(&self) -> EvalResult<Datum> {
        Ok(Datum::Int(self.n))
    }
}

#[derive(Debug, Default)]
pub struct CountStar {
    n: i64,
}

impl Accumulator for CountStar {
    fn next(&mut self, _args: &[Datum]) -> EvalResult<()> {
        self.n += 1;
        Ok(())
    }

    fn value(&self) -> EvalResult<Datum> {
        Ok(Datum::Int(self.n))
    }
}

fn check_numeric(function: &str, d: &Datum) -> EvalResult<()> {
    match d {
        Datum::Int(_) | Datum::Decimal(_) | Datum::Float(_) => Ok(()),
        other => Err(EvalError::type_mismatch(function, "numeric", type_name(other))),
    }
}

#[derive(Debug, Default)]
pub struct Sum {
    total: Option<Datum>,
}

impl Accumulator for Sum {
    fn next(&mut self, args: &[Datum]) -> EvalResult<()> {
        let v = first(args);
        if v.is_unknown() {
            return Ok(());
        }
        check_numeric("sum", v)?;
        self.total = Some(match self.total.take() {
            None => v.clone(),
            Some(t) => arith::arithmetic(BinaryOp::Add, &t, v)?,
        });
        Ok(())
    }

    fn value(&self) -> EvalResult<Datum> {
        Ok(self.total.clone().unwrap_or(Datum::Null))
    }
}

#[derive(Debug, Default)]
pub struct Avg {
    sum: Sum,
    n: i64,
}

impl Accumulator for Avg {
    fn next(&mut self, args: &[Datum]) -> EvalResult<()> {
        let v = first(args);
        if v.is_unknown() {
            return Ok(());
        }
        check_numeric("avg", v)?;
        self.sum.next(args)?;
        self.n += 1;
        Ok(())
    }

    fn value(&self) -> EvalResult<Datum> {
        if self.n == 0 {
            return Ok(Datum::Null);
        }
        let total = self.sum.value()?;
        let total = match total {
            Datum::Int(i) => Datum::Decimal(BigDecimal::from(i)),
            other => other,
        };
        arith::arithmetic(BinaryOp::Div, &total, &Datum::Int(self.n))
    }
}

/// MIN or MAX under the total order over values.
#[derive(Debug)]
pub struct Extreme {
    keep: Ordering,
    best: Option<Datum>,
}

impl Extreme {
    pub fn min() -> Self {
        Self {
            keep: Ordering::Less,
            best: None,
        }
    }

    pub fn max() -> Self {
        Self {
            keep: Ordering::Greater,
            best: None,
        }
    }
}

impl Accumulator for Extreme {
    fn next(&mut self, args: &[Datum]) -> EvalResult<()> {
        let v = first(args);
        if v.is_unknown() {
            return Ok(());
        }
        match &self.best {
            Some(b) if v.cmp(b) != self.keep => {}
            _ => self.best = Some(v.clone()),
        }
        Ok(())
    }

    fn value(&self) -> EvalResult<Datum> {
        Ok(self.best.clone().unwrap_or(Datum::Null))
    }
}

/// EVERY (all true) or ANY/SOME (any true).
#[derive(Debug)]
pub struct BoolFold {
    name: &'static str,
    every: bool,
    acc: Option<bool>,
}

impl BoolFold {
    pub fn every() -> Self {
        Self {
            name: "every",
            every: true,
            acc: None,
        }
    }

    pub fn any() -> Self {
        Self {
            name: "any",
            every: false,
            acc: None,
        }
    }
}

impl Accumulator for BoolFold {
    fn next(&mut self, args: &[Datum]) -> EvalResult<()> {
        match first(args) {
            Datum::Null | Datum::Missing => Ok(()),
            Datum::Bool(b) => {
                let prev = self.acc.unwrap_or(self.every);
                self.acc = Some(if self.every { prev && *b } else { prev || *b });
                Ok(())
            }
            other => Err(EvalError::type_mismatch(self.name, "BOOL", type_name(other))),
        }
    }

    fn value(&self) -> EvalResult<Datum> {
        Ok(self.acc.map(Datum::Bool).unwrap_or(Datum::Null))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn feed(acc: &mut dyn Accumulator, values: &[Datum]) {
        for v in values {
            acc.next(std::slice::from_ref(v)).unwrap();
        }
    }

    #[test]
    fn counts() {
        let values = [Datum::Int(1), Datum::Null, Datum::Missing];
        let mut c = Count::default();
        feed(&mut c, &values);
        assert_eq!(c.value().unwrap(), Datum::Int(1));
        let mut cs = CountStar::default();
        feed(&mut cs, &values);
        assert_eq!(cs.value().unwrap(), Datum::Int(3));
    }

    #[test]
    fn sum_and_avg() {
        let mut s = Sum::default();
        assert_eq!(s.value().unwrap(), Datum::Null);
        feed(&mut s, &[Datum::Int(1), Datum::Null, Datum::Int(2)]);
        assert_eq!(s.value().unwrap(), Datum::Int(3));

        let mut a = Avg::default();
        feed(&mut a, &[Datum::Int(1), Datum::Int(2)]);
        assert_eq!(
            a.value().unwrap(),
            Datum::Decimal(BigDecimal::from_str("1.5").unwrap())
        );
        assert!(Sum::default().next(&[Datum::string("x")]).is_err());
    }

    #[test]
    fn extremes() {
        let values = [Datum::Int(3), Datum::Null, Datum::Float(1.5), Datum::Int(7)];
        let mut lo = Extreme::min();
        feed(&mut lo, &values);
        assert_eq!(lo.value().unwrap(), Datum::Float(1.5));
        let mut hi = Extreme::max();
        feed(&mut hi, &values);
        assert_eq!(hi.value().unwrap(), Datum::Int(7));
    }

    #[test]
    fn boolean_folds() {
        let mut e = BoolFold::every();
        feed(&mut e, &[Datum::Bool(true), Datum::Null, Datum::Bool(false)]);
        assert_eq!(e.value().unwrap(), Datum::Bool(false));
        let mut a = BoolFold::any();
        assert_eq!(a.value().unwrap(), Datum::Null);
        feed(&mut a, &[Datum::Bool(false), Datum::Bool(true)]);
        assert_eq!(a.value().unwrap(), Datum::Bool(true));
    }
}
