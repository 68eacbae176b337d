//! Planning diagnostics.
//!
//! Problems are collected, never thrown: the planner keeps going after a
//! problem so that one call reports as many as possible.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use partiql_core::location::SourceLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
pub enum ProblemDetails {
    #[error("undefined variable '{name}'")]
    UndefinedVariable { name: String, case_sensitive: bool },

    #[error("'{name}' is ambiguous; candidates: {}", candidates.join(", "))]
    AmbiguousBinding {
        name: String,
        candidates: Vec<String>,
    },

    #[error("incompatible operand types for {operator}: {}", types.join(", "))]
    IncompatibleTypes {
        operator: String,
        types: Vec<String>,
    },

    #[error("no function '{function}' accepts ({})", arguments.join(", "))]
    NoMatchingFunction {
        function: String,
        arguments: Vec<String>,
    },

    #[error("key '{key}' never matches a field of the operand")]
    PathKeyNeverSucceeds { key: String },

    #[error("aggregate '{function}' is not allowed here")]
    MisplacedAggregate { function: String },

    #[error("expression must be a group key or an aggregate")]
    NotGrouped,

    #[error("more than {limit} problems; the rest were dropped")]
    TooManyProblems { limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    pub loc: SourceLocation,
    pub severity: Severity,
    pub details: ProblemDetails,
}

impl Problem {
    pub fn error(loc: SourceLocation, details: ProblemDetails) -> Self {
        Self {
            loc,
            severity: Severity::Error,
            details,
        }
    }

    pub fn warning(loc: SourceLocation, details: ProblemDetails) -> Self {
        Self {
            loc,
            severity: Severity::Warning,
            details,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{level} at {}: {}", self.loc, self.details)
    }
}

/// Accumulates problems up to a cap.
#[derive(Debug)]
pub struct ProblemCollector {
    problems: Vec<Problem>,
    limit: usize,
    overflowed: bool,
}

impl ProblemCollector {
    pub fn new(limit: usize) -> Self {
        Self {
            problems: Vec::new(),
            limit: limit.max(1),
            overflowed: false,
        }
    }

    pub fn report(&mut self, problem: Problem) {
        tracing::trace!(%problem, "planning problem");
        if self.problems.len() < self.limit {
            self.problems.push(problem);
        } else {
            // Keep an error visible even when the list is full.
            if problem.is_error() && !self.has_errors() {
                self.problems.pop();
                self.problems.push(problem);
            }
            self.overflowed = true;
        }
    }

    pub fn has_errors(&self) -> bool {
        self.problems.iter().any(Problem::is_error)
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    /// The collected problems, followed by `TooManyProblems` when some were dropped.
    pub fn finish(mut self) -> Vec<Problem> {
        if self.overflowed {
            let severity = if self.has_errors() {
                Severity::Error
            } else {
                Severity::Warning
            };
            self.problems.push(Problem {
                loc: SourceLocation::UNKNOWN,
                severity,
                details: ProblemDetails::TooManyProblems { limit: self.limit },
            });
        }
        self.problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn undefined(name: &str) -> ProblemDetails {
        ProblemDetails::UndefinedVariable {
            name: name.into(),
            case_sensitive: false,
        }
    }

    #[test]
    fn display_carries_location() {
        let p = Problem::error(SourceLocation::new(1, 8), undefined("x"));
        assert_eq!(p.to_string(), "error at 1:8: undefined variable 'x'");
    }

    #[test]
    fn cap_truncates_and_keeps_an_error() {
        let mut c = ProblemCollector::new(2);
        c.report(Problem::warning(SourceLocation::UNKNOWN, undefined("a")));
        c.report(Problem::warning(SourceLocation::UNKNOWN, undefined("b")));
        c.report(Problem::error(SourceLocation::UNKNOWN, undefined("c")));
        assert!(c.has_errors());
        let problems = c.finish();
        assert_eq!(problems.len(), 3);
        assert_eq!(
            problems[2].details,
            ProblemDetails::TooManyProblems { limit: 2 }
        );
    }
}
