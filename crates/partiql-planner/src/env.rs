//! Lexical scopes used during translation.
//!
//! Each scope is the schema of the row an expression will see at runtime;
//! the innermost scope is depth 0. Column names starting with `$` are
//! planner-internal and never match an identifier.

use partiql_core::plan::Column;
use partiql_core::types::StaticType;

use crate::ast::Ident;

/// Result of looking an identifier up in the local scopes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalLookup {
    Found {
        depth: usize,
        offset: usize,
        ty: StaticType,
    },
    NotFound,
    Ambiguous(Vec<String>),
}

#[derive(Debug, Clone, Default)]
pub struct Scopes {
    /// Outermost first.
    stack: Vec<Vec<Column>>,
}

pub fn is_hidden(name: &str) -> bool {
    name.starts_with('$')
}

impl Scopes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, schema: Vec<Column>) {
        self.stack.push(schema);
    }

    pub fn pop(&mut self) -> Option<Vec<Column>> {
        self.stack.pop()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Replace the innermost scope, returning the previous one.
    pub fn replace_top(&mut self, schema: Vec<Column>) -> Option<Vec<Column>> {
        let top = self.stack.pop();
        self.stack.push(schema);
        top
    }

    pub fn top(&self) -> Option<&[Column]> {
        self.stack.last().map(Vec::as_slice)
    }

    /// Resolve `ident` walking outward from the innermost scope. Within a
    /// scope an exact match wins; otherwise a case-insensitive identifier
    /// matches ignoring case, and several such matches are ambiguous.
    pub fn lookup(&self, ident: &Ident) -> LocalLookup {
        for (depth, scope) in self.stack.iter().rev().enumerate() {
            let visible = || {
                scope
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| !is_hidden(&c.name))
            };
            let exact: Vec<usize> = visible()
                .filter(|(_, c)| c.name == ident.name)
                .map(|(i, _)| i)
                .collect();
            let hits = if exact.is_empty() && !ident.is_case_sensitive() {
                visible()
                    .filter(|(_, c)| ident.matches(&c.name))
                    .map(|(i, _)| i)
                    .collect()
            } else {
                exact
            };
            match hits.as_slice() {
                [] => continue,
                [offset] => {
                    return LocalLookup::Found {
                        depth,
                        offset: *offset,
                        ty: scope[*offset].ty.clone(),
                    }
                }
                many => {
                    return LocalLookup::Ambiguous(
                        many.iter().map(|i| scope[*i].name.clone()).collect(),
                    )
                }
            }
        }
        LocalLookup::NotFound
    }
}
