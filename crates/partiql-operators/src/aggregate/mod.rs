//! Builtin aggregate functions.
//!
//! Every accumulator skips NULL and MISSING arguments except `count_star`,
//! which counts rows. Aggregates over zero non-unknown inputs yield NULL,
//! except the counts, which yield 0.

mod accumulators;

use std::fmt;
use std::sync::Arc;

use partiql_core::types::StaticType;

use crate::registry::FunctionRegistry;
use crate::signature::{AggSignature, Parameter};
use crate::traits::{Accumulator, AggregateFunction};

pub use accumulators::{Avg, BoolFold, Count, CountStar, Extreme, Sum};

pub type AccumulatorFactory = fn() -> Box<dyn Accumulator>;

/// An aggregate backed by an accumulator factory.
pub struct AggBuiltin {
    sig: AggSignature,
    factory: AccumulatorFactory,
}

impl AggBuiltin {
    pub fn new(sig: AggSignature, factory: AccumulatorFactory) -> Arc<Self> {
        Arc::new(Self { sig, factory })
    }
}

impl fmt::Debug for AggBuiltin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AggBuiltin({})", self.sig.name)
    }
}

impl AggregateFunction for AggBuiltin {
    fn signature(&self) -> &AggSignature {
        &self.sig
    }

    fn accumulator(&self) -> Box<dyn Accumulator> {
        (self.factory)()
    }
}

fn unary(name: &str, param: StaticType, returns: StaticType) -> AggSignature {
    AggSignature::new(name, vec![Parameter::new("value", param)], returns)
}

pub fn register_builtins(reg: &mut FunctionRegistry) {
    reg.register_aggregate(AggBuiltin::new(
        unary("count", StaticType::Any, StaticType::INT8).non_null(),
        || Box::new(Count::default()),
    ));
    reg.register_aggregate(AggBuiltin::new(
        AggSignature::new("count_star", vec![], StaticType::INT8).non_null(),
        || Box::new(CountStar::default()),
    ));

    for ty in [StaticType::INT8, StaticType::DECIMAL, StaticType::FLOAT64, StaticType::Any] {
        reg.register_aggregate(AggBuiltin::new(unary("sum", ty.clone(), ty), || {
            Box::new(Sum::default())
        }));
    }
    for (param, returns) in [
        (StaticType::INT8, StaticType::DECIMAL),
        (StaticType::DECIMAL, StaticType::DECIMAL),
        (StaticType::FLOAT64, StaticType::FLOAT64),
        (StaticType::Any, StaticType::any_of([StaticType::DECIMAL, StaticType::FLOAT64])),
    ] {
        reg.register_aggregate(AggBuiltin::new(unary("avg", param, returns), || {
            Box::new(Avg::default())
        }));
    }

    let ordered = [
        StaticType::BOOL,
        StaticType::INT8,
        StaticType::DECIMAL,
        StaticType::FLOAT64,
        StaticType::STRING,
        StaticType::DATE,
        StaticType::TIME,
        StaticType::TIMESTAMP,
        StaticType::Any,
    ];
    for ty in &ordered {
        reg.register_aggregate(AggBuiltin::new(unary("min", ty.clone(), ty.clone()), || {
            Box::new(Extreme::min())
        }));
    }
    for ty in &ordered {
        reg.register_aggregate(AggBuiltin::new(unary("max", ty.clone(), ty.clone()), || {
            Box::new(Extreme::max())
        }));
    }

    // The `Any` overloads reject non-BOOL values per row.
    for param in [StaticType::BOOL, StaticType::Any] {
        reg.register_aggregate(AggBuiltin::new(
            unary("every", param.clone(), StaticType::BOOL),
            || Box::new(BoolFold::every()),
        ));
        for name in ["any", "some"] {
            reg.register_aggregate(AggBuiltin::new(
                unary(name, param.clone(), StaticType::BOOL),
                || Box::new(BoolFold::any()),
            ));
        }
    }
}
