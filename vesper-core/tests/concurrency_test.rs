// vesper-core - Concurrency integration tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Tests for: atoms shared between threads, the interrupt flag, locking,
//! per-thread namespaces

mod common;

use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use common::{Error, Symbol, Value, eval_all, eval_str, int, new_interp};
use vesper_parser::Var;

// =============================================================================
// Atoms
// =============================================================================

#[test]
fn test_atom_basics() {
    assert_eval!("(def a (atom 1)) (swap! a + 10) @a", int(11));
    assert_eval!("(def a (atom 1)) (reset! a 5)", int(5));
    assert_eval!(
        "(def a (atom 1)) [(compare-and-set! a 1 2) (compare-and-set! a 1 3) @a]",
        Value::vector(vec![Value::Bool(true), Value::Bool(false), int(2)])
    );
}

#[test]
fn test_swap_from_many_threads() {
    let interp = new_interp();
    eval_all("(def counter (atom 0))", &interp).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let worker = interp.clone();
            thread::spawn(move || {
                eval_all("(loop [i 0] (when (< i 1000) (swap! counter inc) (recur (inc i))))", &worker)
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    assert_eq!(eval_all("@counter", &interp).unwrap(), int(8000));
}

#[test]
fn test_swap_on_collection_atoms() {
    assert_eval!("(def a (atom [])) (swap! a conj 1)", Value::vector(vec![int(1)]));
    assert_eval!("(def a (atom {})) (swap! a assoc :k 1) (swap! a dissoc :k)", eval_str("{}").unwrap());
    assert_eval!("(def a (atom nil)) (swap! a conj 1) (count @a)", int(1));
}

#[test]
fn test_swap_collection_from_many_threads() {
    let interp = new_interp();
    eval_all("(def items (atom []))", &interp).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let worker = interp.clone();
            thread::spawn(move || {
                eval_all("(loop [i 0] (when (< i 250) (swap! items conj i) (recur (inc i))))", &worker)
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    assert_eq!(eval_all("(count @items)", &interp).unwrap(), int(1000));
}

// =============================================================================
// Interrupts
// =============================================================================

#[test]
fn test_interrupt_stops_loop() {
    let interp = new_interp();
    let flag = interp.interrupt_handle();
    let worker = interp.clone();
    let handle = thread::spawn(move || worker.eval_str("(loop [i 0] (recur (inc i)))"));

    thread::sleep(Duration::from_millis(50));
    flag.store(true, Ordering::SeqCst);

    let result = handle.join().unwrap();
    let err = result.unwrap_err();
    assert!(matches!(err.root(), Error::Interrupted(_)), "{err}");
}

#[test]
fn test_interrupt_is_not_catchable() {
    let interp = new_interp();
    let worker = interp.clone();
    let handle = thread::spawn(move || {
        worker.eval_str("(try (loop [i 0] (recur (inc i))) (catch :Exception e :caught))")
    });

    thread::sleep(Duration::from_millis(50));
    interp.interrupt();

    let err = handle.join().unwrap().unwrap_err();
    assert!(err.is_a("InterruptedException"));
}

#[test]
fn test_clear_interrupt_allows_evaluation_again() {
    let interp = new_interp();
    interp.interrupt();
    assert!(interp.eval_str("(inc 1)").is_err());
    interp.clear_interrupt();
    assert_eq!(interp.eval_str("(inc 1)").unwrap(), int(2));
}

// =============================================================================
// locking
// =============================================================================

#[test]
fn test_locking_is_reentrant() {
    assert_eval!("(locking :l (locking :l (+ 1 2)))", int(3));
}

#[test]
fn test_locking_releases_on_error() {
    assert_eval!(
        "(try (locking :l (throw :x)) (catch :Exception e nil)) (locking :l :free)",
        Value::keyword("free")
    );
}

#[test]
fn test_locking_serializes_threads() {
    let interp = new_interp();
    eval_all("(def shared (atom []))", &interp).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|n| {
            let worker = interp.clone();
            thread::spawn(move || {
                let src = format!(
                    "(locking :section (let [v @shared] (reset! shared (conj v {n}))))"
                );
                eval_all(&src, &worker)
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    assert_eq!(eval_all("(count @shared)", &interp).unwrap(), int(4));
}

// =============================================================================
// Per-thread namespaces
// =============================================================================

#[test]
fn test_threads_have_their_own_namespace() {
    let interp = new_interp();
    let worker = interp.clone();
    thread::spawn(move || {
        eval_all("(ns elsewhere) (def local-thing 1)", &worker).unwrap();
    })
    .join()
    .unwrap();

    assert_eq!(eval_all("*ns*", &interp).unwrap(), Value::symbol("user"));
    assert_eq!(eval_all("elsewhere/local-thing", &interp).unwrap(), int(1));
}

// =============================================================================
// Definitions
// =============================================================================

#[test]
fn test_racing_definitions_of_fixed_var() {
    let interp = new_interp();
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let worker = interp.clone();
            thread::spawn(move || {
                let var = Var::new(Symbol::parse("user/fixed"), int(i), false, None);
                worker.runtime().define(var).is_ok()
            })
        })
        .collect();
    let defined = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(defined, 1);
    let err = eval_all("(def fixed 0)", &interp).unwrap_err();
    assert!(err.contains("must not be overwritten"), "{}", err);
}

