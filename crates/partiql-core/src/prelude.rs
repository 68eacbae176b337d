//! Convenient re-exports for downstream crates.

pub use crate::config::{EngineConfig, PlanningMode, TypingMode};
pub use crate::datum::{CollectionKind, Datum, StructValue};
pub use crate::error::{Error, ErrorCode, EvalError, EvalResult, Result};
pub use crate::hash::Fingerprint;
pub use crate::id::{AggId, FnId, GlobalId};
pub use crate::location::SourceLocation;
pub use crate::plan::{Plan, Rel, RelOp, RelType, Rex, RexOp, VarRef};
pub use crate::types::{CastKind, SingleType, StaticType, StructType};
