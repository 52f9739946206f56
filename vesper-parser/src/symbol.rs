// vesper-parser - Symbol type with interning
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Symbols are identifiers, optionally qualified with a namespace
//! (`ns/name`).
//!
//! Symbols are interned: equality and hashing are pointer operations.
//! Ordering still compares the textual (namespace, name) pair so that
//! maps keyed by symbols print in a stable order.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, OnceLock};

use crate::intern::{Interner, Name, intern, split_qualified};

static SYMBOLS: OnceLock<Mutex<Interner>> = OnceLock::new();
static GENSYM_COUNTER: AtomicU64 = AtomicU64::new(1);

fn table() -> &'static Mutex<Interner> {
    SYMBOLS.get_or_init(|| Mutex::new(Interner::default()))
}

/// An interned, optionally namespaced identifier.
#[derive(Clone)]
pub struct Symbol {
    inner: Arc<Name>,
}

impl Symbol {
    /// Create an unqualified symbol.
    pub fn new(name: &str) -> Self {
        Symbol {
            inner: intern(table(), None, name),
        }
    }

    /// Create a namespace-qualified symbol.
    pub fn with_namespace(namespace: &str, name: &str) -> Self {
        Symbol {
            inner: intern(table(), Some(namespace), name),
        }
    }

    /// Parse `"foo"` or `"ns/foo"`.
    pub fn parse(s: &str) -> Self {
        match split_qualified(s) {
            (Some(ns), name) => Symbol::with_namespace(ns, name),
            (None, name) => Symbol::new(name),
        }
    }

    /// A fresh symbol guaranteed not to clash with any symbol read from
    /// source: `prefix__N__auto__`.
    pub fn gensym(prefix: &str) -> Self {
        let n = GENSYM_COUNTER.fetch_add(1, AtomicOrdering::Relaxed);
        Symbol::new(&format!("{}__{}__auto__", prefix, n))
    }

    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.inner.namespace.as_deref()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn is_qualified(&self) -> bool {
        self.inner.namespace.is_some()
    }

    /// This symbol with `ns` as its namespace (the name is kept).
    #[must_use]
    pub fn qualify(&self, ns: &str) -> Symbol {
        Symbol::with_namespace(ns, self.name())
    }

    /// The unqualified symbol with the same name.
    #[must_use]
    pub fn unqualified(&self) -> Symbol {
        if self.is_qualified() {
            Symbol::new(self.name())
        } else {
            self.clone()
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner.namespace {
            Some(ns) => write!(f, "{}/{}", ns, self.inner.name),
            None => f.write_str(&self.inner.name),
        }
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self)
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Symbol {}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner
            .namespace
            .cmp(&other.inner.namespace)
            .then_with(|| self.inner.name.cmp(&other.inner.name))
    }
}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.inner).hash(state);
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol::parse(s)
    }
}
