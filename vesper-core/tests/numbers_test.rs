// vesper-core - Number tower integration tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Tests for: long/double/decimal arithmetic and promotion, comparison
//! chains, equality, division by zero, overflow

mod common;

use common::{Value, eval_str, int};

#[test]
fn test_long_arithmetic() {
    assert_eval!("(+ 1 2 3)", int(6));
    assert_eval!("(- 10 3 2)", int(5));
    assert_eval!("(- 5)", int(-5));
    assert_eval!("(* 2 3 4)", int(24));
    assert_eval!("(+)", int(0));
    assert_eval!("(*)", int(1));
}

#[test]
fn test_long_division_truncates() {
    assert_eval!("(/ 7 2)", int(3));
    assert_eval!("(/ -7 2)", int(-3));
}

#[test]
fn test_double_promotion() {
    assert_eval!("(+ 1 2.5)", Value::Float(3.5));
    assert_eval!("(/ 1.0 4)", Value::Float(0.25));
}

#[test]
fn test_decimal_promotion() {
    assert_eval!("(= (+ 1 2.50M) 3.50M)", Value::Bool(true));
    assert_eval!("(decimal? (* 2 1.5M))", Value::Bool(true));
    assert_eval!("(decimal? (+ 1.0 1M))", Value::Bool(true));
}

#[test]
fn test_division_by_zero() {
    assert_eval_err!("(/ 1 0)", "division by zero");
    assert_eval_err!("(/ 1M 0)", "division by zero");
}

#[test]
fn test_overflow_is_error() {
    assert_eval_err!("(+ 9223372036854775807 1)", "overflow");
}

#[test]
fn test_mod_sign_follows_divisor() {
    assert_eval!("(mod 7 3)", int(1));
    assert_eval!("(mod -7 3)", int(2));
    assert_eval!("(mod 7 -3)", int(-2));
}

#[test]
fn test_comparison_chains() {
    assert_eval!("(< 1 2 3)", Value::Bool(true));
    assert_eval!("(< 1 3 2)", Value::Bool(false));
    assert_eval!("(>= 3 3 1)", Value::Bool(true));
    assert_eval!("(< 1 1.5 2M)", Value::Bool(true));
}

#[test]
fn test_strict_and_numeric_equality() {
    assert_eval!("(= 1 1.0)", Value::Bool(false));
    assert_eval!("(== 1 1.0)", Value::Bool(true));
    assert_eval!("(= [1 2] '(1 2))", Value::Bool(false));
    assert_eval!("(= {:a [1]} {:a [1]})", Value::Bool(true));
}

#[test]
fn test_non_number_operands() {
    assert_eval_err!("(+ 1 :a)", "TypeError");
    assert_eval_err!("(< 1 \"2\")", "cannot compare");
}

#[test]
fn test_sign_predicates() {
    assert_eval!("[(zero? 0) (pos? 1.5) (neg? -1M)]", Value::vector(vec![
        Value::Bool(true),
        Value::Bool(true),
        Value::Bool(true),
    ]));
}
