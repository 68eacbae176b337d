//! `LIKE` pattern matching, compiled to an anchored regex.

use partiql_core::datum::Datum;
use partiql_core::error::{EvalError, EvalResult};
use regex::{escape, Regex};

use super::{propagate_unknowns, type_name};

/// A compiled LIKE pattern. Built once per call when the pattern is dynamic,
/// or once per compilation when it is a literal.
#[derive(Debug, Clone)]
pub struct LikeMatcher {
    regex: Regex,
}

impl LikeMatcher {
    pub fn new(pattern: &str, escape_char: Option<char>) -> EvalResult<Self> {
        let mut buf = String::with_capacity(pattern.len() + 8);
        buf.push_str("(?s)^");

        let mut chars = pattern.chars();
        while let Some(c) = chars.next() {
            if Some(c) == escape_char {
                match chars.next() {
                    Some(next) => buf.push_str(&escape(&next.to_string())),
                    None => {
                        return Err(EvalError::invalid_argument(
                            "LIKE",
                            "pattern ends with the escape character",
                        ))
                    }
                }
            } else {
                match c {
                    '%' => buf.push_str(".*"),
                    '_' => buf.push('.'),
                    _ => buf.push_str(&escape(&c.to_string())),
                }
            }
        }
        buf.push('$');

        let regex = Regex::new(&buf)
            .map_err(|e| EvalError::invalid_argument("LIKE", e.to_string()))?;
        Ok(Self { regex })
    }

    pub fn matches(&self, s: &str) -> bool {
        self.regex.is_match(s)
    }
}

/// Extract the single escape character of an `ESCAPE` clause.
pub fn escape_char(escape: &Datum) -> EvalResult<char> {
    let text = escape
        .as_text()
        .ok_or_else(|| EvalError::type_mismatch("LIKE ESCAPE", "STRING", type_name(escape)))?;
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(EvalError::invalid_argument(
            "LIKE",
            format!("escape must be a single character, got '{text}'"),
        )),
    }
}

/// `value LIKE pattern [ESCAPE escape]`.
pub fn like(value: &Datum, pattern: &Datum, escape: Option<&Datum>) -> EvalResult<Datum> {
    let mut args = vec![value.clone(), pattern.clone()];
    if let Some(e) = escape {
        args.push(e.clone());
    }
    if let Some(u) = propagate_unknowns(&args) {
        return Ok(u);
    }
    let text = value
        .as_text()
        .ok_or_else(|| EvalError::type_mismatch("LIKE", "STRING", type_name(value)))?;
    let pat = pattern
        .as_text()
        .ok_or_else(|| EvalError::type_mismatch("LIKE", "STRING pattern", type_name(pattern)))?;
    let esc = escape.map(escape_char).transpose()?;
    let matcher = LikeMatcher::new(pat, esc)?;
    Ok(Datum::Bool(matcher.matches(text)))
}
