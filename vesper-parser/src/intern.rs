// vesper-parser - Shared interner for symbols and keywords
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Interning table shared by [`Symbol`](crate::Symbol) and
//! [`Keyword`](crate::Keyword).
//!
//! Interned names are never deallocated. Identity comparison of the
//! returned `Arc` is equivalent to comparing (namespace, name) pairs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug)]
pub(crate) struct Name {
    pub(crate) namespace: Option<Arc<str>>,
    pub(crate) name: Arc<str>,
}

type Key = (Option<Arc<str>>, Arc<str>);

#[derive(Default)]
pub(crate) struct Interner {
    names: HashMap<Key, Arc<Name>>,
    strings: HashMap<Box<str>, Arc<str>>,
}

impl Interner {
    fn string(&mut self, s: &str) -> Arc<str> {
        if let Some(existing) = self.strings.get(s) {
            return Arc::clone(existing);
        }
        let interned: Arc<str> = Arc::from(s);
        self.strings.insert(Box::from(s), Arc::clone(&interned));
        interned
    }

    fn intern(&mut self, namespace: Option<&str>, name: &str) -> Arc<Name> {
        let ns = namespace.map(|s| self.string(s));
        let name = self.string(name);
        let key = (ns.clone(), name.clone());
        Arc::clone(
            self.names
                .entry(key)
                .or_insert_with(|| Arc::new(Name { namespace: ns, name })),
        )
    }
}

/// Intern `(namespace, name)` in `table`.
///
/// A poisoned table is still structurally valid (inserts are atomic from
/// the map's point of view), so poisoning is ignored.
pub(crate) fn intern(table: &Mutex<Interner>, namespace: Option<&str>, name: &str) -> Arc<Name> {
    table
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .intern(namespace, name)
}

/// Split `ns/name` text. A lone `/` and names starting with `/` are
/// unqualified.
pub(crate) fn split_qualified(s: &str) -> (Option<&str>, &str) {
    match s.find('/') {
        Some(pos) if pos > 0 && pos + 1 < s.len() => (Some(&s[..pos]), &s[pos + 1..]),
        _ => (None, s),
    }
}
