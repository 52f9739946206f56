// vesper-core - Function integration tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Integration tests for functions.
//!
//! Tests for: fn, closures, arity checking, variadic parameters,
//! multi-arity, pre/post conditions, native functions, apply

mod common;

use common::{Error, Value, eval_err, eval_str, int, new_interp};

// =============================================================================
// Basics
// =============================================================================

#[test]
fn test_anonymous_fn() {
    assert_eval!("((fn [x] (* x x)) 9)", int(81));
}

#[test]
fn test_closure_captures() {
    assert_eval!("(defn adder [n] (fn [x] (+ x n))) ((adder 10) 5)", int(15));
}

#[test]
fn test_closure_sees_later_redefinition_of_globals() {
    assert_eval!("(defn f [] (g)) (defn g [] 1) (defn g [] 2) (f)", int(2));
}

#[test]
fn test_higher_order() {
    assert_eval!(
        "(map (fn [x] (* 2 x)) [1 2 3])",
        Value::list(vec![int(2), int(4), int(6)])
    );
    assert_eval!("(reduce (fn [a b] (+ a b)) 0 [1 2 3 4])", int(10));
}

#[test]
fn test_keyword_and_map_as_function() {
    assert_eval!("(:a {:a 1})", int(1));
    assert_eval!("(:b {:a 1} :none)", Value::keyword("none"));
    assert_eval!("({:a 1} :a)", int(1));
}

// =============================================================================
// Arity
// =============================================================================

#[test]
fn test_fixed_arity_mismatch() {
    assert_eval_err!("((fn [a b] a) 1)", "ArityException");
    assert_eval_err!("((fn [a b] a) 1 2 3)", "ArityException");
}

#[test]
fn test_variadic_requires_fixed_params() {
    assert_eval_err!("((fn [a & more] a))", "ArityException");
}

#[test]
fn test_variadic_binds_rest() {
    assert_eval!("((fn [a & more] (count more)) 1 2 3 4 5)", int(4));
    assert_eval!(
        "((fn [a & more] more) 1 2 3)",
        Value::list(vec![int(2), int(3)])
    );
}

#[test]
fn test_arity_error_names_function() {
    let err = eval_err("(defn pair [a b] [a b]) (pair 1)");
    let message = err.to_string();
    assert!(message.contains("user/pair"), "{}", message);
    assert!(message.contains("[a b]"), "{}", message);
}

#[test]
fn test_native_arity() {
    assert_eval_err!("(inc)", "ArityException");
    assert_eval_err!("(inc 1 2)", "ArityException");
}

// =============================================================================
// Multi-arity
// =============================================================================

#[test]
fn test_multi_arity_dispatch() {
    let src = "(defn greet ([] \"hi\") ([name] (str \"hi \" name)) ([a b] (str a b)))";
    assert_eval!(&format!("{} (greet)", src), Value::string("hi"));
    assert_eval!(&format!("{} (greet \"bo\")", src), Value::string("hi bo"));
    assert_eval!(&format!("{} (greet 1 2)", src), Value::string("12"));
}

#[test]
fn test_multi_arity_with_variadic() {
    let src = "(defn f ([a] :one) ([a & more] :many))";
    assert_eval!(&format!("{} (f 1)", src), Value::keyword("one"));
    assert_eval!(&format!("{} (f 1 2 3)", src), Value::keyword("many"));
}

#[test]
fn test_multi_arity_no_match() {
    assert_eval_err!("(defn f ([a] 1) ([a b] 2)) (f)", "ArityException");
}

#[test]
fn test_multi_arity_recur_targets_own_arity() {
    assert_eval!(
        "(defn total ([xs] (total xs 0)) ([xs acc] (if (empty? xs) acc (recur (rest xs) (+ acc (first xs))))))
         (total [1 2 3 4])",
        int(10)
    );
}

// =============================================================================
// Destructuring parameters
// =============================================================================

#[test]
fn test_vector_param_destructuring() {
    assert_eval!("((fn [[a b]] (+ a b)) [3 4])", int(7));
}

#[test]
fn test_map_param_destructuring() {
    assert_eval!(
        "(defn area [{:keys [w h]}] (* w h)) (area {:w 3 :h 5})",
        int(15)
    );
}

// =============================================================================
// Conditions
// =============================================================================

#[test]
fn test_precondition() {
    let src = "(defn safe-div [a b] {:pre [(not= b 0)]} (/ a b))";
    assert_eval!(&format!("{} (safe-div 10 2)", src), int(5));
    assert_eval_err!(&format!("{} (safe-div 1 0)", src), "AssertionException");
}

#[test]
fn test_postcondition() {
    let src = "(defn pos-inc [n] {:post [(pos? %)]} (inc n))";
    assert_eval!(&format!("{} (pos-inc 1)", src), int(2));
    assert_eval_err!(&format!("{} (pos-inc -5)", src), "postcondition");
}

// =============================================================================
// apply and host functions
// =============================================================================

#[test]
fn test_apply_spreads_last_arg() {
    assert_eval!("(apply + 1 2 [3 4])", int(10));
    assert_eval!("(apply str [])", Value::string(""));
}

#[test]
fn test_registered_fn_errors_propagate() {
    let interp = new_interp();
    interp
        .register_fn("fail", |_| Err(Error::eval("host failure")))
        .unwrap();
    let err = interp.eval_str("(fail)").unwrap_err();
    assert!(err.to_string().contains("host failure"));
}

#[test]
fn test_fn_printing_and_type() {
    assert_eval!("(fn? (fn [] 1))", Value::Bool(true));
    assert_eval!("(fn? :a)", Value::Bool(false));
    assert_eval!("(fn? when)", Value::Bool(false));
}
