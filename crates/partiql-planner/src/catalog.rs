//! Catalog contract: how the planner binds free variables.
//!
//! The planner asks the catalog only after lexical resolution fails (or
//! first, for unqualified FROM sources). Catalogs are read-only during
//! planning and may be shared between planners.

use partiql_core::datum::Datum;
use partiql_core::id::GlobalId;
use partiql_core::types::StaticType;

/// Outcome of resolving one name against a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Global(GlobalId),
    Undefined,
    /// A case-insensitive name matched several entries.
    Ambiguous(Vec<String>),
}

pub trait Catalog: Send + Sync {
    /// Resolve `name`. An exact match always wins; a case-insensitive
    /// identifier then falls back to matching ignoring case.
    fn resolve(&self, name: &str, case_sensitive: bool) -> Resolution;

    /// Declared type of a global, `Any` when unknown.
    fn get_type(&self, id: GlobalId) -> StaticType;
}

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    ty: StaticType,
    value: Option<Datum>,
}

/// In-memory catalog: named globals with declared types and optional values.
///
/// Ids are dense and assigned in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    entries: Vec<Entry>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a global with a type but no value.
    pub fn declare(&mut self, name: impl Into<String>, ty: StaticType) -> GlobalId {
        self.push(name.into(), ty, None)
    }

    /// Add a global whose type is inferred from its value.
    pub fn insert(&mut self, name: impl Into<String>, value: Datum) -> GlobalId {
        let ty = value.static_type();
        self.push(name.into(), ty, Some(value))
    }

    /// Add a global from JSON (objects become structs, arrays lists).
    pub fn insert_json(&mut self, name: impl Into<String>, json: &serde_json::Value) -> GlobalId {
        self.insert(name, Datum::from_json(json))
    }

    fn push(&mut self, name: String, ty: StaticType, value: Option<Datum>) -> GlobalId {
        let id = GlobalId::new(self.entries.len() as u64);
        tracing::debug!(name = %name, id = id.get(), "catalog entry added");
        self.entries.push(Entry { name, ty, value });
        id
    }

    pub fn name(&self, id: GlobalId) -> Option<&str> {
        self.entry(id).map(|e| e.name.as_str())
    }

    pub fn value(&self, id: GlobalId) -> Option<&Datum> {
        self.entry(id).and_then(|e| e.value.as_ref())
    }

    /// Every global that has a value, for seeding an evaluation session.
    pub fn bindings(&self) -> impl Iterator<Item = (GlobalId, Datum)> + '_ {
        self.entries.iter().enumerate().filter_map(|(i, e)| {
            e.value
                .as_ref()
                .map(|v| (GlobalId::new(i as u64), v.clone()))
        })
    }

    fn entry(&self, id: GlobalId) -> Option<&Entry> {
        usize::try_from(id.get())
            .ok()
            .and_then(|i| self.entries.get(i))
    }
}

impl Catalog for MemoryCatalog {
    fn resolve(&self, name: &str, case_sensitive: bool) -> Resolution {
        if let Some(i) = self.entries.iter().position(|e| e.name == name) {
            return Resolution::Global(GlobalId::new(i as u64));
        }
        if case_sensitive {
            return Resolution::Undefined;
        }
        let matches: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.name.eq_ignore_ascii_case(name))
            .map(|(i, _)| i)
            .collect();
        match matches.as_slice() {
            [] => Resolution::Undefined,
            [only] => Resolution::Global(GlobalId::new(*only as u64)),
            many => Resolution::Ambiguous(
                many.iter()
                    .map(|i| self.entries[*i].name.clone())
                    .collect(),
            ),
        }
    }

    fn get_type(&self, id: GlobalId) -> StaticType {
        self.entry(id)
            .map(|e| e.ty.clone())
            .unwrap_or(StaticType::Any)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> MemoryCatalog {
        let mut c = MemoryCatalog::new();
        c.declare("Customer", StaticType::bag(StaticType::open_struct()));
        c.declare("orders", StaticType::Any);
        c.declare("ORDERS", StaticType::Any);
        c
    }

    #[test]
    fn exact_match_first() {
        let c = catalog();
        assert_eq!(c.resolve("orders", false), Resolution::Global(GlobalId::new(1)));
        assert_eq!(c.resolve("ORDERS", true), Resolution::Global(GlobalId::new(2)));
    }

    #[test]
    fn insensitive_fallback_and_ambiguity() {
        let c = catalog();
        assert_eq!(c.resolve("customer", false), Resolution::Global(GlobalId::new(0)));
        assert_eq!(c.resolve("customer", true), Resolution::Undefined);
        assert!(matches!(c.resolve("Orders", false), Resolution::Ambiguous(v) if v.len() == 2));
    }

    #[test]
    fn values_seed_bindings() {
        let mut c = MemoryCatalog::new();
        c.declare("t", StaticType::Any);
        let id = c.insert("nums", Datum::bag([Datum::Int(1)]));
        let bindings: Vec<_> = c.bindings().collect();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].0, id);
        assert_eq!(c.get_type(id), StaticType::bag(StaticType::INT4));
    }
}
