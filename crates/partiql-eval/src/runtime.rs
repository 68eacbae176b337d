//! Compiled expressions and their results.

use std::fmt;
use std::rc::Rc;

use partiql_core::datum::{CollectionKind, Datum};
use partiql_core::error::EvalResult;
use partiql_core::hash::Fingerprint;
use partiql_operators::{BoxedExpr, Environment, EvaluationSession, ScalarExpr};

use crate::expr::query::SelectExpr;

#[derive(Debug)]
pub(crate) enum Root {
    /// A top-level SELECT, streamed to the caller.
    Query(SelectExpr),
    Scalar(BoxedExpr),
}

/// An executable tree. Immutable; one instance serves any number of
/// evaluations, each with its own session.
#[derive(Debug)]
pub struct CompiledExpression {
    root: Root,
    fingerprint: Fingerprint,
}

impl CompiledExpression {
    pub(crate) fn new(root: Root, fingerprint: Fingerprint) -> Self {
        Self { root, fingerprint }
    }

    /// Fingerprint of the plan this was compiled from.
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Evaluate against `session`.
    ///
    /// A top-level SELECT yields [`ExprValue::Lazy`]; its rows are produced
    /// as the caller pulls them, and errors surface on the row that raised
    /// them. Anything else is evaluated eagerly.
    pub fn eval(&self, session: EvaluationSession) -> EvalResult<ExprValue<'_>> {
        let mode = session.mode();
        let span = tracing::debug_span!("eval", typing = ?mode, plan = %self.fingerprint.short());
        let _enter = span.enter();
        let env = Environment::new(Rc::new(session));
        match &self.root {
            Root::Query(select) => Ok(ExprValue::Lazy {
                kind: select.kind,
                values: Box::new(select.values(&env)),
            }),
            Root::Scalar(expr) => expr.eval(&env).map(ExprValue::Value),
        }
    }
}

/// The result of one evaluation.
pub enum ExprValue<'a> {
    Value(Datum),
    /// Elements of a BAG or LIST, not yet computed.
    Lazy {
        kind: CollectionKind,
        values: Box<dyn Iterator<Item = EvalResult<Datum>> + 'a>,
    },
}

impl<'a> ExprValue<'a> {
    /// Drain into a single value, failing on the first error.
    pub fn materialize(self) -> EvalResult<Datum> {
        match self {
            ExprValue::Value(d) => Ok(d),
            ExprValue::Lazy { kind, values } => {
                Ok(kind.wrap(values.collect::<EvalResult<Vec<_>>>()?))
            }
        }
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self, ExprValue::Lazy { .. })
    }
}

impl fmt::Debug for ExprValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprValue::Value(d) => f.debug_tuple("Value").field(d).finish(),
            ExprValue::Lazy { kind, .. } => f
                .debug_struct("Lazy")
                .field("kind", kind)
                .finish_non_exhaustive(),
        }
    }
}
