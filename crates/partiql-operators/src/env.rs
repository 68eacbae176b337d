//! Evaluation session and the lexical row environment.
//!
//! An `EvaluationSession` lives for one evaluation call: global bindings,
//! positional parameters and the typing mode. An `Environment` is the chain of
//! rows currently in scope, innermost first; `Var(Local{depth, offset})`
//! indexes into it. Pushing a row is O(1) and shares the tail.

use std::collections::HashMap;
use std::rc::Rc;

use partiql_core::config::TypingMode;
use partiql_core::datum::Datum;
use partiql_core::error::{EvalError, EvalResult};
use partiql_core::id::GlobalId;

use crate::traits::Row;

#[derive(Debug, Clone)]
pub struct EvaluationSession {
    globals: HashMap<GlobalId, Datum>,
    parameters: Vec<Datum>,
    typing_mode: TypingMode,
}

impl Default for EvaluationSession {
    fn default() -> Self {
        Self {
            globals: HashMap::new(),
            parameters: Vec::new(),
            typing_mode: TypingMode::Permissive,
        }
    }
}

impl EvaluationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_global(mut self, id: GlobalId, value: Datum) -> Self {
        self.globals.insert(id, value);
        self
    }

    pub fn with_globals(mut self, globals: impl IntoIterator<Item = (GlobalId, Datum)>) -> Self {
        self.globals.extend(globals);
        self
    }

    pub fn with_parameters(mut self, parameters: Vec<Datum>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn typing_mode(mut self, mode: TypingMode) -> Self {
        self.typing_mode = mode;
        self
    }

    pub fn mode(&self) -> TypingMode {
        self.typing_mode
    }

    pub fn global(&self, id: GlobalId) -> Option<&Datum> {
        self.globals.get(&id)
    }

    /// 1-based parameter lookup.
    pub fn parameter(&self, index: usize) -> EvalResult<&Datum> {
        index
            .checked_sub(1)
            .and_then(|i| self.parameters.get(i))
            .ok_or(EvalError::ParameterOutOfRange {
                index,
                bound: self.parameters.len(),
            })
    }
}

#[derive(Debug)]
struct Frame {
    row: Row,
    parent: Option<Rc<Frame>>,
}

/// Rows in scope plus the session they belong to.
#[derive(Debug, Clone)]
pub struct Environment {
    frames: Option<Rc<Frame>>,
    session: Rc<EvaluationSession>,
}

impl Environment {
    pub fn new(session: Rc<EvaluationSession>) -> Self {
        Self {
            frames: None,
            session,
        }
    }

    /// A new environment with `row` as the innermost scope.
    pub fn push(&self, row: Row) -> Self {
        Self {
            frames: Some(Rc::new(Frame {
                row,
                parent: self.frames.clone(),
            })),
            session: self.session.clone(),
        }
    }

    pub fn lookup(&self, depth: usize, offset: usize) -> EvalResult<&Datum> {
        let mut frame = self.frames.as_deref();
        for _ in 0..depth {
            frame = frame.and_then(|f| f.parent.as_deref());
        }
        frame
            .and_then(|f| f.row.get(offset))
            .ok_or_else(|| {
                EvalError::Internal(format!("no local variable at depth {depth}, offset {offset}"))
            })
    }

    pub fn session(&self) -> &EvaluationSession {
        &self.session
    }

    pub fn mode(&self) -> TypingMode {
        self.session.mode()
    }

    /// Apply the typing mode to a result: permissive typing turns data
    /// errors into MISSING, strict typing propagates them.
    pub fn recover(&self, result: EvalResult<Datum>) -> EvalResult<Datum> {
        match result {
            Err(e) if self.mode() == TypingMode::Permissive && e.is_data_error() => {
                tracing::trace!(error = %e, "permissive typing: yielding MISSING");
                Ok(Datum::Missing)
            }
            other => other,
        }
    }
}
