// vesper-parser - Keyword type with interning
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Keywords are self-evaluating interned identifiers printed with a
//! leading colon.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, OnceLock};

use crate::intern::{Interner, Name, intern, split_qualified};

static KEYWORDS: OnceLock<Mutex<Interner>> = OnceLock::new();

fn table() -> &'static Mutex<Interner> {
    KEYWORDS.get_or_init(|| Mutex::new(Interner::default()))
}

/// An interned keyword such as `:as` or `:user/id`.
#[derive(Clone)]
pub struct Keyword {
    inner: Arc<Name>,
}

impl Keyword {
    pub fn new(name: &str) -> Self {
        Keyword {
            inner: intern(table(), None, name),
        }
    }

    pub fn with_namespace(namespace: &str, name: &str) -> Self {
        Keyword {
            inner: intern(table(), Some(namespace), name),
        }
    }

    /// Parse `":foo"`, `"foo"` or `":ns/foo"`.
    pub fn parse(s: &str) -> Self {
        let s = s.strip_prefix(':').unwrap_or(s);
        match split_qualified(s) {
            (Some(ns), name) => Keyword::with_namespace(ns, name),
            (None, name) => Keyword::new(name),
        }
    }

    #[inline]
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.inner.namespace.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Compare against an unqualified name without interning.
    #[inline]
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.inner.namespace.is_none() && &*self.inner.name == name
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner.namespace {
            Some(ns) => write!(f, ":{}/{}", ns, self.inner.name),
            None => write!(f, ":{}", self.inner.name),
        }
    }
}

impl fmt::Debug for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keyword({})", self)
    }
}

impl PartialEq for Keyword {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Keyword {}

impl PartialOrd for Keyword {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Keyword {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner
            .namespace
            .cmp(&other.inner.namespace)
            .then_with(|| self.inner.name.cmp(&other.inner.name))
    }
}

impl Hash for Keyword {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.inner).hash(state);
    }
}
