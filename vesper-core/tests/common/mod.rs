// vesper-core - Common test utilities
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Shared helpers for the vesper-core integration tests.
//!
//! ```ignore
//! mod common;
//! use common::*;
//! ```
//!
//! - [`eval_str`] evaluates source in a fresh interpreter
//! - [`eval_all`] evaluates source in an existing interpreter
//! - [`new_interp`] creates an interpreter
//! - [`assert_eval!`] / [`assert_eval_err!`] wrap the two

#![allow(dead_code)]

pub use vesper_core::{Config, Error, Interpreter};
#[allow(unused_imports)]
pub use vesper_parser::{Keyword, Symbol, Value, read};

/// Evaluate `s` in a fresh interpreter, returning the last value or the
/// error message.
#[must_use]
pub fn eval_str(s: &str) -> Result<Value, String> {
    let interp = new_interp();
    eval_all(s, &interp)
}

/// Evaluate every form of `s` in `interp`.
#[must_use]
pub fn eval_all(s: &str, interp: &Interpreter) -> Result<Value, String> {
    interp.eval_str(s).map_err(|e| e.to_string())
}

/// Evaluate `s` in a fresh interpreter keeping the error value.
pub fn eval_err(s: &str) -> Error {
    match new_interp().eval_str(s) {
        Ok(value) => panic!("expected an error from '{}', got {}", s, value),
        Err(err) => err,
    }
}

#[must_use]
pub fn new_interp() -> Interpreter {
    Interpreter::new().expect("interpreter should start")
}

#[must_use]
pub fn new_interp_with(config: Config) -> Interpreter {
    Interpreter::with_config(config).expect("interpreter should start")
}

pub fn int(n: i64) -> Value {
    Value::int(n)
}

pub fn kw(name: &str) -> Value {
    Value::keyword(name)
}

/// Assert that evaluating `input` produces the expected value.
///
/// ```ignore
/// assert_eval!("(+ 1 2)", Value::int(3));
/// ```
#[macro_export]
macro_rules! assert_eval {
    ($input:expr, $expected:expr) => {
        let result = $crate::common::eval_str($input);
        assert!(
            result.is_ok(),
            "Failed to evaluate '{}': {:?}",
            $input,
            result.err()
        );
        assert_eq!(
            result.unwrap(),
            $expected,
            "Evaluation of '{}' did not match expected",
            $input
        );
    };
}

/// Assert that evaluating `input` produces an error, optionally one whose
/// message contains `$needle`.
///
/// ```ignore
/// assert_eval_err!("(+ 1 :not-a-number)");
/// assert_eval_err!("(undefined-fn)", "SymbolNotFound");
/// ```
#[macro_export]
macro_rules! assert_eval_err {
    ($input:expr) => {
        let result = $crate::common::eval_str($input);
        assert!(
            result.is_err(),
            "Expected error for '{}' but got {:?}",
            $input,
            result.ok()
        );
    };
    ($input:expr, $needle:expr) => {
        let result = $crate::common::eval_str($input);
        match result {
            Ok(value) => panic!("Expected error for '{}' but got {:?}", $input, value),
            Err(message) => assert!(
                message.contains($needle),
                "Error for '{}' was '{}', expected it to mention '{}'",
                $input,
                message,
                $needle
            ),
        }
    };
}
