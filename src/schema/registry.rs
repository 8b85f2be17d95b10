//! Type registry
//!
//! Maps interned type keys to bundles of named check functions. Every
//! bundle carries a mandatory `type` coercion check.
//!
//! # Invariants
//!
//! - Entries are never removed; keys, once minted, stay valid for the
//!   lifetime of the registry.
//! - Extension merges into the existing bundle (same-named checks are
//!   overwritten, others are kept).
//! - Lookups hand out `Arc` snapshots, so running validations never hold
//!   the lock while a check executes.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use serde_json::Value;

use super::checks;
use super::errors::CheckError;
use crate::observability::{log_event_with_fields, Event};

/// Name of the mandatory coercion check
pub const TYPE_CHECK: &str = "type";

/// A single check: `(data, option, origin) -> coerced data`.
///
/// `origin` is the root input handed to the validator.
pub type CheckFn = Arc<dyn Fn(Value, &Value, &Value) -> Result<Value, CheckError> + Send + Sync>;

/// Interned identity of a registered type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(u32);

impl TypeKey {
    pub fn id(&self) -> u32 {
        self.0
    }
}

/// Keys of the built-in types
pub mod builtin {
    use super::TypeKey;

    pub const STRING: TypeKey = TypeKey(0);
    pub const NUMBER: TypeKey = TypeKey(1);
    pub const INTEGER: TypeKey = TypeKey(2);
    pub const BOOLEAN: TypeKey = TypeKey(3);
    pub const DATE: TypeKey = TypeKey(4);
    pub const OBJECT: TypeKey = TypeKey(5);
    pub const ARRAY: TypeKey = TypeKey(6);
    pub const ANY: TypeKey = TypeKey(7);

    /// Every built-in key with its registered name
    pub const ALL: [(&str, TypeKey); 8] = [
        ("String", STRING),
        ("Number", NUMBER),
        ("Integer", INTEGER),
        ("Boolean", BOOLEAN),
        ("Date", DATE),
        ("Object", OBJECT),
        ("Array", ARRAY),
        ("Any", ANY),
    ];

    /// Looks up a built-in key by name
    pub fn by_name(name: &str) -> Option<TypeKey> {
        ALL.iter().find(|(n, _)| *n == name).map(|(_, k)| *k)
    }
}

/// How an expression or an extension call names a type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeIdent {
    /// Resolved identity
    Key(TypeKey),
    /// Secondary name lookup
    Name(String),
}

impl TypeIdent {
    pub fn is_empty(&self) -> bool {
        matches!(self, TypeIdent::Name(name) if name.is_empty())
    }
}

impl From<TypeKey> for TypeIdent {
    fn from(key: TypeKey) -> Self {
        TypeIdent::Key(key)
    }
}

impl From<&str> for TypeIdent {
    fn from(name: &str) -> Self {
        TypeIdent::Name(name.to_string())
    }
}

impl From<String> for TypeIdent {
    fn from(name: String) -> Self {
        TypeIdent::Name(name)
    }
}

impl fmt::Display for TypeIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeIdent::Key(key) => write!(f, "#{}", key.0),
            TypeIdent::Name(name) => write!(f, "{}", name),
        }
    }
}

/// A bundle of named checks
#[derive(Clone, Default)]
pub struct Checks {
    entries: BTreeMap<String, CheckFn>,
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a check
    pub fn with<F>(mut self, name: impl Into<String>, check: F) -> Self
    where
        F: Fn(Value, &Value, &Value) -> Result<Value, CheckError> + Send + Sync + 'static,
    {
        self.entries.insert(name.into(), Arc::new(check));
        self
    }

    /// Copies every check of `other` into `self`, overwriting same names
    pub fn merge(&mut self, other: &Checks) {
        for (name, check) in &other.entries {
            self.entries.insert(name.clone(), Arc::clone(check));
        }
    }

    pub fn get(&self, name: &str) -> Option<&CheckFn> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Checks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}

/// A type held by the registry
#[derive(Debug, Clone)]
pub struct RegisteredType {
    key: TypeKey,
    name: String,
    checks: Checks,
}

impl RegisteredType {
    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check(&self, name: &str) -> Option<&CheckFn> {
        self.checks.get(name)
    }

    pub fn checks(&self) -> &Checks {
        &self.checks
    }

    /// Runs the mandatory coercion check. A bundle without one passes the
    /// value through.
    pub fn coerce(&self, data: Value, origin: &Value) -> Result<Value, CheckError> {
        match self.checks.get(TYPE_CHECK) {
            Some(check) => check(data, &Value::Null, origin),
            None => Ok(data),
        }
    }
}

#[derive(Default)]
struct RegistryInner {
    types: HashMap<TypeKey, Arc<RegisteredType>>,
    names: HashMap<String, TypeKey>,
    next_id: u32,
}

/// Process-scoped (or test-scoped) registry of validation types.
///
/// Reads vastly outnumber writes: extension is expected at startup,
/// validation traffic afterwards.
pub struct TypeRegistry {
    inner: RwLock<RegistryInner>,
}

impl TypeRegistry {
    /// Creates a registry with no types. Built-in keys stay reserved.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner {
                next_id: builtin::ALL.len() as u32,
                ..Default::default()
            }),
        }
    }

    /// Creates a registry with the built-in check library installed
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        checks::install_builtins(&registry);
        registry
    }

    /// Shared registry backing the crate-level convenience functions
    pub fn global() -> &'static Arc<TypeRegistry> {
        static GLOBAL: OnceLock<Arc<TypeRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(TypeRegistry::with_builtins()))
    }

    /// Installs a type under a fixed key. Used for the built-ins.
    pub(crate) fn define(&self, key: TypeKey, name: &str, checks: Checks) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.names.insert(name.to_string(), key);
        inner.types.insert(
            key,
            Arc::new(RegisteredType {
                key,
                name: name.to_string(),
                checks,
            }),
        );
    }

    /// Resolves an identifier to a snapshot of the registered type
    pub fn resolve(&self, ident: &TypeIdent) -> Option<Arc<RegisteredType>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let key = match ident {
            TypeIdent::Key(key) => *key,
            TypeIdent::Name(name) => *inner.names.get(name)?,
        };
        inner.types.get(&key).cloned()
    }

    /// Looks up the key minted for a name
    pub fn key_of(&self, name: &str) -> Option<TypeKey> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.names.get(name).copied()
    }

    /// Returns the registered type names, sorted
    pub fn names(&self) -> Vec<String> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = inner.names.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registers a new type or augments an existing one.
    ///
    /// - Empty names are ignored.
    /// - A known key or name has `additional` merged into its bundle.
    /// - An unknown name mints a fresh key whose bundle is the common
    ///   checks overlaid with `additional`.
    /// - An unknown key is ignored; keys are only minted here.
    ///
    /// Returns the key the checks ended up under.
    pub fn register(&self, ident: impl Into<TypeIdent>, additional: Checks) -> Option<TypeKey> {
        let ident = ident.into();
        if ident.is_empty() {
            return None;
        }

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        let existing = match &ident {
            TypeIdent::Key(key) => Some(*key),
            TypeIdent::Name(name) => inner.names.get(name).copied(),
        };

        if let Some(key) = existing {
            let entry = inner.types.get_mut(&key)?;
            Arc::make_mut(entry).checks.merge(&additional);
            let name = entry.name.clone();
            drop(inner);

            log_event_with_fields(
                Event::TypeExtended,
                &[("type", name.as_str()), ("checks", join_names(&additional).as_str())],
            );
            return Some(key);
        }

        let TypeIdent::Name(name) = ident else {
            return None;
        };

        let key = TypeKey(inner.next_id);
        inner.next_id += 1;

        let mut bundle = checks::common();
        bundle.merge(&additional);

        inner.names.insert(name.clone(), key);
        inner.types.insert(
            key,
            Arc::new(RegisteredType {
                key,
                name: name.clone(),
                checks: bundle,
            }),
        );
        drop(inner);

        log_event_with_fields(
            Event::TypeRegistered,
            &[("type", name.as_str()), ("checks", join_names(&additional).as_str())],
        );
        Some(key)
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.names())
            .finish()
    }
}

fn join_names(checks: &Checks) -> String {
    checks.names().collect::<Vec<_>>().join(",")
}
