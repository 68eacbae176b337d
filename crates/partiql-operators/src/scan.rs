//! FROM sources: scan, scan with AT position, unpivot.

use partiql_core::config::TypingMode;
use partiql_core::datum::Datum;
use partiql_core::error::EvalError;

use crate::env::Environment;
use crate::ops::type_name;
use crate::traits::{BoxedExpr, RelOperator, Row, RowIter};

/// What each produced row holds besides the element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// `(element)`
    Plain,
    /// `(element, position)`; the position is MISSING for bags.
    Indexed,
    /// `(value, name)` for each field of a struct.
    Unpivot,
}

#[derive(Debug)]
pub struct Scan {
    pub expr: BoxedExpr,
    pub mode: ScanMode,
}

fn once<'a>(item: Result<Row, EvalError>) -> RowIter<'a> {
    Box::new(std::iter::once(item))
}

impl Scan {
    fn elements(&self, value: Datum, mode: TypingMode) -> Result<RowIter<'static>, EvalError> {
        match value.into_elements() {
            Ok((kind, items)) => {
                let indexed = self.mode == ScanMode::Indexed;
                let ordered = kind != partiql_core::datum::CollectionKind::Bag;
                Ok(Box::new(items.into_iter().enumerate().map(move |(i, d)| {
                    if !indexed {
                        Ok(vec![d])
                    } else if ordered {
                        Ok(vec![d, Datum::Int(i as i64)])
                    } else {
                        Ok(vec![d, Datum::Missing])
                    }
                })))
            }
            Err(other) => {
                if mode == TypingMode::Strict {
                    return Err(EvalError::type_mismatch(
                        "FROM",
                        "a collection",
                        type_name(&other),
                    ));
                }
                // A non-collection is scanned as a singleton bag.
                let row = match self.mode {
                    ScanMode::Indexed => vec![other, Datum::Missing],
                    _ => vec![other],
                };
                Ok(once(Ok(row)))
            }
        }
    }

    fn fields(&self, value: Datum, mode: TypingMode) -> Result<RowIter<'static>, EvalError> {
        match value {
            Datum::Struct(s) => Ok(Box::new(
                s.into_fields()
                    .into_iter()
                    .map(|(name, v)| Ok(vec![v, Datum::String(name)])),
            )),
            Datum::Missing => Ok(Box::new(std::iter::empty())),
            other if mode == TypingMode::Strict => Err(EvalError::type_mismatch(
                "UNPIVOT",
                "STRUCT",
                type_name(&other),
            )),
            other => Ok(once(Ok(vec![other, Datum::string("_1")]))),
        }
    }
}

impl RelOperator for Scan {
    fn name(&self) -> &'static str {
        match self.mode {
            ScanMode::Plain => "scan",
            ScanMode::Indexed => "scan_indexed",
            ScanMode::Unpivot => "unpivot",
        }
    }

    fn open<'a>(&'a self, env: &Environment) -> RowIter<'a> {
        let value = match self.expr.eval(env) {
            Ok(v) => v,
            Err(e) => return once(Err(e)),
        };
        let rows = match self.mode {
            ScanMode::Unpivot => self.fields(value, env.mode()),
            _ => self.elements(value, env.mode()),
        };
        match rows {
            Ok(iter) => iter,
            Err(e) => once(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{collect, env, Const};

    #[test]
    fn scans_elements_with_positions() {
        let scan = Scan {
            expr: Const::boxed(Datum::list([Datum::Int(10), Datum::Int(20)])),
            mode: ScanMode::Indexed,
        };
        let rows = collect(&scan, &env(TypingMode::Strict)).unwrap();
        assert_eq!(
            rows,
            vec![
                vec![Datum::Int(10), Datum::Int(0)],
                vec![Datum::Int(20), Datum::Int(1)]
            ]
        );
    }

    #[test]
    fn non_collection_depends_on_mode() {
        let scan = Scan {
            expr: Const::boxed(Datum::Int(1)),
            mode: ScanMode::Plain,
        };
        assert!(collect(&scan, &env(TypingMode::Strict)).is_err());
        assert_eq!(
            collect(&scan, &env(TypingMode::Permissive)).unwrap(),
            vec![vec![Datum::Int(1)]]
        );
    }

    #[test]
    fn unpivot_fields() {
        let scan = Scan {
            expr: Const::boxed(Datum::tuple([("a", Datum::Int(1)), ("b", Datum::Int(2))])),
            mode: ScanMode::Unpivot,
        };
        let rows = collect(&scan, &env(TypingMode::Strict)).unwrap();
        assert_eq!(rows[1], vec![Datum::Int(2), Datum::string("b")]);
    }
}
