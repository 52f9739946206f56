// vesper-core - Namespace registry
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Namespaces partition the global symbol table.
//!
//! Vars themselves live in the runtime's global table keyed by qualified
//! symbol; a [`Namespace`] only records what is attached to the name
//! itself: imported type names, aliases for other namespaces and whether
//! it has been sealed. The registry is shared by every thread of an
//! interpreter, while the *current* namespace is per thread.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::error::{Error, Result};

/// Namespace holding the built-in functions and macros.
pub const CORE_NS: &str = "core";

/// Namespace every thread starts in.
pub const USER_NS: &str = "user";

#[derive(Debug)]
pub struct Namespace {
    name: Arc<str>,
    imports: RwLock<BTreeSet<String>>,
    aliases: RwLock<HashMap<String, String>>,
    sealed: AtomicBool,
}

impl Namespace {
    fn new(name: &str) -> Self {
        Namespace {
            name: Arc::from(name),
            imports: RwLock::new(BTreeSet::new()),
            aliases: RwLock::new(HashMap::new()),
            sealed: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_import(&self, type_name: impl Into<String>) {
        self.imports
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(type_name.into());
    }

    /// Imported type names in sorted order.
    #[must_use]
    pub fn imports(&self) -> Vec<String> {
        self.imports
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn add_alias(&self, alias: impl Into<String>, target: impl Into<String>) {
        self.aliases
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(alias.into(), target.into());
    }

    /// Namespace name `alias` stands for.
    #[must_use]
    pub fn resolve_alias(&self, alias: &str) -> Option<String> {
        self.aliases
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(alias)
            .cloned()
    }

    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    pub fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }
}

/// Registry of namespaces by name.
#[derive(Debug)]
pub struct NamespaceRegistry {
    namespaces: RwLock<HashMap<String, Arc<Namespace>>>,
}

impl Default for NamespaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceRegistry {
    /// A registry holding `core` and `user`.
    pub fn new() -> Self {
        let mut namespaces = HashMap::new();
        for name in [CORE_NS, USER_NS] {
            namespaces.insert(name.to_string(), Arc::new(Namespace::new(name)));
        }
        NamespaceRegistry {
            namespaces: RwLock::new(namespaces),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Namespace>> {
        self.namespaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// The namespace called `name`, created if missing.
    pub fn create(&self, name: &str) -> Arc<Namespace> {
        if let Some(ns) = self.get(name) {
            return ns;
        }
        let mut namespaces = self
            .namespaces
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(namespaces.entry(name.to_string()).or_insert_with(|| {
            debug!(namespace = name, "created namespace");
            Arc::new(Namespace::new(name))
        }))
    }

    /// Remove `name`. Sealed namespaces and the caller's current namespace
    /// cannot be removed. Returns whether the namespace existed.
    pub fn remove(&self, name: &str, current: &str) -> Result<bool> {
        if name == current {
            return Err(Error::eval(format!(
                "cannot remove the current namespace '{}'",
                name
            )));
        }
        let mut namespaces = self
            .namespaces
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match namespaces.get(name) {
            Some(ns) if ns.is_sealed() => Err(Error::Security(format!(
                "namespace '{}' is sealed and cannot be removed",
                name
            ))),
            Some(_) => {
                namespaces.remove(name);
                debug!(namespace = name, "removed namespace");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Seal `name` against removal, unmapping and redefinition.
    pub fn seal(&self, name: &str) {
        self.create(name).seal();
    }

    #[must_use]
    pub fn is_sealed(&self, name: &str) -> bool {
        self.get(name).is_some_and(|ns| ns.is_sealed())
    }

    /// Registered namespace names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .namespaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_defaults() {
        let registry = NamespaceRegistry::new();
        assert!(registry.contains(CORE_NS));
        assert!(registry.contains(USER_NS));
        assert_eq!(registry.names(), vec!["core", "user"]);
    }

    #[test]
    fn test_create_is_idempotent() {
        let registry = NamespaceRegistry::new();
        let a = registry.create("alpha");
        a.add_import("java.lang.String");
        let again = registry.create("alpha");
        assert_eq!(again.imports(), vec!["java.lang.String"]);
    }

    #[test]
    fn test_remove_rules() {
        let registry = NamespaceRegistry::new();
        registry.create("alpha");
        registry.seal(CORE_NS);
        assert!(registry.remove("alpha", "alpha").is_err());
        assert!(matches!(
            registry.remove(CORE_NS, USER_NS),
            Err(Error::Security(_))
        ));
        assert!(registry.remove("alpha", USER_NS).unwrap());
        assert!(!registry.remove("alpha", USER_NS).unwrap());
    }

    #[test]
    fn test_aliases() {
        let registry = NamespaceRegistry::new();
        let user = registry.create(USER_NS);
        user.add_alias("s", "str-utils");
        assert_eq!(user.resolve_alias("s").as_deref(), Some("str-utils"));
        assert_eq!(user.resolve_alias("t"), None);
    }
}
