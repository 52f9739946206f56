// vesper-core - Namespace integration tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Integration tests for namespaces.
//!
//! Tests for: sealed core, aliases, imports, ns-remove, module loading,
//! the sandbox and metrics collaborators

mod common;

use std::sync::Arc;

use common::{Config, Value, eval_all, eval_str, int, new_interp, new_interp_with};
use vesper_core::interceptor::{MapModuleLoader, MemoryMetrics, Sandbox};

// =============================================================================
// Sealed core
// =============================================================================

#[test]
fn test_core_cannot_be_redefined() {
    assert_eval_err!("(def core/+ 1)", "SecurityException");
    assert_eval_err!("(ns core) (def new-thing 1)", "SecurityException");
}

#[test]
fn test_core_cannot_be_unmapped() {
    assert_eval_err!("(ns-unmap 'core 'inc)", "SecurityException");
}

#[test]
fn test_user_can_shadow_core_names() {
    assert_eval!("(def inc 5) inc", int(5));
    assert_eval!("(def inc 5) (core/inc 1)", int(2));
}

#[test]
fn test_private_var_metadata() {
    assert_eval!(
        "(defn- helper [] 1) (:private (meta (resolve 'helper)))",
        Value::Bool(true)
    );
}

// =============================================================================
// Aliases and imports
// =============================================================================

#[test]
fn test_alias() {
    assert_eval!(
        "(ns geometry.shapes) (defn square [x] (* x x)) (ns user) (alias 'g 'geometry.shapes) (g/square 4)",
        int(16)
    );
}

#[test]
fn test_imports() {
    assert_eval!(
        "(import :java.util.Date :java.io.File) (count (imports))",
        int(2)
    );
}

#[test]
fn test_namespace_of() {
    assert_eval!("(namespace :a/b)", Value::string("a"));
    assert_eval!("(namespace 'x)", Value::Nil);
    assert_eval!("(defn f [] 1) (namespace f)", Value::string("user"));
}

#[test]
fn test_ns_remove() {
    let interp = new_interp();
    eval_all("(ns scratch) (def tmp 1) (ns user)", &interp).unwrap();
    eval_all("(ns-remove 'scratch)", &interp).unwrap();
    assert!(eval_all("scratch/tmp", &interp).is_err());
}

// =============================================================================
// Modules
// =============================================================================

#[test]
fn test_load_module_from_source() {
    let interp = new_interp();
    interp.set_module_loader(Arc::new(
        MapModuleLoader::new().with_module("strings", "(ns strings) (defn shout [s] (str s \"!\"))"),
    ));
    assert_eq!(
        eval_all("(load-module 'strings) (strings/shout \"hey\")", &interp).unwrap(),
        Value::string("hey!")
    );
    assert_eq!(eval_all("*ns*", &interp).unwrap(), Value::symbol("user"));
}

#[test]
fn test_load_module_missing() {
    assert_eval_err!("(load-module :nowhere)", "not found");
}

// =============================================================================
// Sandbox and metrics
// =============================================================================

#[test]
fn test_sandbox_denies_function() {
    let interp = new_interp();
    interp.set_interceptor(Arc::new(Sandbox::new().deny_function("println")));
    let err = interp.eval_str("(println 1)").unwrap_err();
    assert!(err.is_a("SecurityException"));
    assert_eq!(interp.eval_str("(+ 1 2)").unwrap(), int(3));
}

#[test]
fn test_sandbox_denies_module() {
    let interp = new_interp();
    interp.set_module_loader(Arc::new(MapModuleLoader::new().with_module("io", "(ns io)")));
    interp.set_interceptor(Arc::new(Sandbox::new().deny_module("io")));
    let err = interp.eval_str("(load-module 'io)").unwrap_err();
    assert!(err.is_a("SecurityException"));
}

#[test]
fn test_sandbox_denies_function_passed_as_value() {
    let interp = new_interp();
    interp.set_interceptor(Arc::new(Sandbox::new().deny_function("inc")));
    for src in [
        "(apply inc [1])",
        "(map inc [1 2])",
        "(filter inc [1])",
        "(reduce inc [1 2])",
        "(swap! (atom 1) inc)",
        "(let [f inc] (f 1))",
        "((fn [g] (g 1)) inc)",
    ] {
        let err = interp.eval_str(src).unwrap_err();
        assert!(err.is_a("SecurityException"), "{} gave {}", src, err);
    }
    assert_eq!(interp.eval_str("(map dec [1 2])").unwrap(), eval_str("[0 1]").unwrap());
}

#[test]
fn test_sandbox_checks_host_calls() {
    let interp = new_interp();
    interp.set_interceptor(Arc::new(Sandbox::new().deny_function("inc")));
    let err = interp.call("inc", &[int(1)]).unwrap_err();
    assert!(err.is_a("SecurityException"));
    assert_eq!(interp.call("dec", &[int(1)]).unwrap(), int(0));
}

#[test]
fn test_metrics_collected_when_enabled() {
    let interp = new_interp_with(Config::default().with_collect_metrics(true));
    let metrics = Arc::new(MemoryMetrics::new());
    interp.set_metrics(Some(metrics.clone()));
    interp.eval_str("(let [x 1] (+ x 1)) (let [y 2] y)").unwrap();
    assert_eq!(metrics.count("let"), 2);
    assert!(metrics.count("core/+") >= 1 || metrics.count("+") >= 1);
}

#[test]
fn test_metrics_ignored_when_disabled() {
    let interp = new_interp();
    let metrics = Arc::new(MemoryMetrics::new());
    interp.set_metrics(Some(metrics.clone()));
    interp.eval_str("(let [x 1] x)").unwrap();
    assert!(metrics.snapshot().is_empty());
}
