// vesper-core - Re-entrant locks keyed by value
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Locks backing the `locking` special form.
//!
//! Any value can serve as a lock; equal values share one lock. A thread
//! holding a lock may acquire it again. Entries are dropped from the table
//! once nobody holds or waits for them.

#![allow(clippy::mutable_key_type)]

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, ThreadId};

use vesper_parser::Value;

#[derive(Default)]
struct ReentrantLock {
    /// Owning thread and hold count
    state: Mutex<(Option<ThreadId>, usize)>,
    released: Condvar,
}

impl ReentrantLock {
    fn acquire(&self) {
        let me = thread::current().id();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            match state.0 {
                None => {
                    *state = (Some(me), 1);
                    return;
                }
                Some(owner) if owner == me => {
                    state.1 += 1;
                    return;
                }
                Some(_) => {
                    state = self
                        .released
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }

    fn release(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.1 = state.1.saturating_sub(1);
        if state.1 == 0 {
            state.0 = None;
            self.released.notify_one();
        }
    }
}

type Table = Arc<Mutex<HashMap<Value, Arc<ReentrantLock>>>>;

#[derive(Default)]
pub struct LockTable {
    locks: Table,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until this thread holds the lock for `key`.
    pub fn acquire(&self, key: &Value) -> LockGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(key.clone()).or_default())
        };
        lock.acquire();
        LockGuard {
            table: Arc::clone(&self.locks),
            key: key.clone(),
            lock,
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Releases one hold of a lock when dropped.
pub struct LockGuard {
    table: Table,
    key: Value,
    lock: Arc<ReentrantLock>,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let mut locks = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        self.lock.release();
        // Only the table and this guard reference the lock: nobody else
        // holds or waits for it.
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_reentrant() {
        let table = LockTable::new();
        let key = Value::keyword("k");
        let outer = table.acquire(&key);
        let inner = table.acquire(&key);
        drop(inner);
        drop(outer);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_mutual_exclusion() {
        let table = Arc::new(LockTable::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let table = Arc::clone(&table);
                let counter = Arc::clone(&counter);
                let max_inside = Arc::clone(&max_inside);
                thread::spawn(move || {
                    for _ in 0..50 {
                        let _guard = table.acquire(&Value::string("shared"));
                        let inside = counter.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(inside, Ordering::SeqCst);
                        counter.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert_eq!(table.len(), 0);
    }
}
