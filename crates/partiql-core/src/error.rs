use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::location::SourceLocation;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Plan construction error: {0}")]
    Plan(String),

    #[error("Hashing error: {0}")]
    Hash(String),

    #[error("Internal invariant failed: {0}")]
    Invariant(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Hash(e.to_string())
    }
}

/// Stable classification of evaluation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCode {
    TypeMismatch,
    UndefinedVariable,
    NoMatchingFunction,
    InvalidCast,
    DivisionByZero,
    NumericOverflow,
    InvalidArgument,
    CardinalityViolation,
    ParameterOutOfRange,
    Internal,
}

/// Result alias for evaluation.
pub type EvalResult<T> = std::result::Result<T, EvalError>;

/// Classified evaluation error.
///
/// Data errors (type mismatches, failed casts, division by zero, ...) become
/// MISSING under permissive typing and abort under strict typing. The other
/// variants abort in both modes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("{operator}: expected {expected}, found {actual}")]
    TypeMismatch {
        operator: String,
        expected: String,
        actual: String,
        location: SourceLocation,
    },

    #[error("undefined variable '{name}'")]
    UndefinedVariable {
        name: String,
        location: SourceLocation,
    },

    #[error("no overload of '{function}' accepts ({arguments})")]
    NoMatchingFunction {
        function: String,
        arguments: String,
        location: SourceLocation,
    },

    #[error("cannot cast {value} to {target}")]
    InvalidCast { value: String, target: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("numeric overflow in {operator}")]
    NumericOverflow { operator: String },

    #[error("invalid argument to {function}: {reason}")]
    InvalidArgument { function: String, reason: String },

    #[error("expected {expected} row(s), found {actual}")]
    CardinalityViolation { expected: usize, actual: usize },

    #[error("parameter ${index} is not bound ({bound} bound)")]
    ParameterOutOfRange { index: usize, bound: usize },

    #[error("internal evaluation error: {0}")]
    Internal(String),
}

impl EvalError {
    pub fn type_mismatch(
        operator: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        EvalError::TypeMismatch {
            operator: operator.into(),
            expected: expected.into(),
            actual: actual.into(),
            location: SourceLocation::UNKNOWN,
        }
    }

    pub fn invalid_argument(function: impl Into<String>, reason: impl Into<String>) -> Self {
        EvalError::InvalidArgument {
            function: function.into(),
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            EvalError::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            EvalError::UndefinedVariable { .. } => ErrorCode::UndefinedVariable,
            EvalError::NoMatchingFunction { .. } => ErrorCode::NoMatchingFunction,
            EvalError::InvalidCast { .. } => ErrorCode::InvalidCast,
            EvalError::DivisionByZero => ErrorCode::DivisionByZero,
            EvalError::NumericOverflow { .. } => ErrorCode::NumericOverflow,
            EvalError::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            EvalError::CardinalityViolation { .. } => ErrorCode::CardinalityViolation,
            EvalError::ParameterOutOfRange { .. } => ErrorCode::ParameterOutOfRange,
            EvalError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Errors that permissive typing turns into MISSING.
    pub fn is_data_error(&self) -> bool {
        !matches!(
            self,
            EvalError::ParameterOutOfRange { .. } | EvalError::Internal(_)
        )
    }

    /// Attach a source location to variants that carry one and lack it.
    pub fn at(mut self, loc: SourceLocation) -> Self {
        match &mut self {
            EvalError::TypeMismatch { location, .. }
            | EvalError::UndefinedVariable { location, .. }
            | EvalError::NoMatchingFunction { location, .. } => {
                if !location.is_known() {
                    *location = loc;
                }
            }
            _ => {}
        }
        self
    }

    /// Structured context for precise assertions and error reporting.
    pub fn properties(&self) -> BTreeMap<&'static str, String> {
        let mut props = BTreeMap::new();
        let put_loc = |props: &mut BTreeMap<&'static str, String>, loc: &SourceLocation| {
            if loc.is_known() {
                props.insert("line", loc.line.to_string());
                props.insert("column", loc.column.to_string());
            }
        };
        match self {
            EvalError::TypeMismatch {
                operator,
                expected,
                actual,
                location,
            } => {
                props.insert("operator", operator.clone());
                props.insert("expected", expected.clone());
                props.insert("actual", actual.clone());
                put_loc(&mut props, location);
            }
            EvalError::UndefinedVariable { name, location } => {
                props.insert("binding_name", name.clone());
                put_loc(&mut props, location);
            }
            EvalError::NoMatchingFunction {
                function,
                arguments,
                location,
            } => {
                props.insert("function", function.clone());
                props.insert("arguments", arguments.clone());
                put_loc(&mut props, location);
            }
            EvalError::InvalidCast { value, target } => {
                props.insert("value", value.clone());
                props.insert("target", target.clone());
            }
            EvalError::DivisionByZero => {}
            EvalError::NumericOverflow { operator } => {
                props.insert("operator", operator.clone());
            }
            EvalError::InvalidArgument { function, reason } => {
                props.insert("function", function.clone());
                props.insert("reason", reason.clone());
            }
            EvalError::CardinalityViolation { expected, actual } => {
                props.insert("expected", expected.to_string());
                props.insert("actual", actual.to_string());
            }
            EvalError::ParameterOutOfRange { index, bound } => {
                props.insert("index", index.to_string());
                props.insert("bound", bound.to_string());
            }
            EvalError::Internal(msg) => {
                props.insert("message", msg.clone());
            }
        }
        props
    }
}
