//! The optimized plan handed to the compiler.

use serde::Serialize;

use partiql_core::hash::Fingerprint;
use partiql_core::plan::Plan;

/// An optimized, fully typed plan together with its structural fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhysicalPlan {
    pub plan: Plan,
    pub fingerprint: Fingerprint,
}

impl PhysicalPlan {
    pub fn new(plan: Plan) -> partiql_core::error::Result<Self> {
        let fingerprint = plan.fingerprint()?;
        Ok(Self { plan, fingerprint })
    }
}
