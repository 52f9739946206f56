// vesper-core - Error types for the Vesper evaluator
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Error types for Vesper evaluation.
//!
//! Every variant has a stable exception type name (see [`Error::type_name`])
//! that `catch` clauses select on. Type names form a small hierarchy: all
//! language errors are `VncException`s, `EofError` is a `ParseError`, and
//! the catch-all names `Exception`, `RuntimeException` and `Throwable`
//! match everything that is catchable at all.

use std::fmt;

use thiserror::Error;
use vesper_parser::{ParseError, Symbol, Value, print};

use crate::context::CallFrame;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Reader error (`ParseError` or `EofError`)
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("SymbolNotFound: symbol '{0}' not found")]
    SymbolNotFound(Symbol),

    #[error(
        "ArityException: wrong number of args ({supplied}) passed to {name}, expected {required}{}",
        format_signatures(.signatures)
    )]
    Arity {
        name: String,
        supplied: usize,
        required: AritySpec,
        signatures: Vec<String>,
    },

    /// Failed `{:pre}`/`{:post}` condition or `assert`
    #[error("AssertionException: {0}")]
    Assertion(String),

    /// `recur` (or another tail-only form) used outside a tail position
    #[error("NotInTailPositionException: {0}")]
    NotInTailPosition(String),

    /// A value raised with `throw`
    #[error("ValueException: {}", print(.value))]
    Value {
        value: Value,
        /// Error map of the error this one was raised while handling
        cause: Option<Value>,
    },

    /// Rejected by the sandbox or by namespace sealing
    #[error("SecurityException: {0}")]
    Security(String),

    /// Evaluation aborted through the interrupt flag
    #[error("InterruptedException: {0}")]
    Interrupted(String),

    #[error("TypeError: {}expected {expected}, got {got}", format_context(.context))]
    Type {
        expected: &'static str,
        got: &'static str,
        context: Option<String>,
    },

    /// Malformed special form
    #[error("SyntaxError: invalid '{form}' form: {message}")]
    Syntax { form: &'static str, message: String },

    #[error("ArithmeticException: division by zero")]
    DivisionByZero,

    /// Generic runtime error
    #[error("InterpreterError: {0}")]
    Eval(String),

    /// An error that escaped to the host, with the call stack at the point
    /// it was raised (most recent call first).
    #[error("{source}{}", format_stack(.stack))]
    Uncaught {
        source: Box<Error>,
        stack: Vec<CallFrame>,
    },
}

/// Expected argument count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AritySpec {
    Exact(usize),
    AtLeast(usize),
    Range(usize, usize),
    /// Several fixed arities (multi-arity functions)
    OneOf(Vec<usize>),
}

impl fmt::Display for AritySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AritySpec::Exact(n) => write!(f, "{}", n),
            AritySpec::AtLeast(n) => write!(f, "at least {}", n),
            AritySpec::Range(min, max) => write!(f, "{} to {}", min, max),
            AritySpec::OneOf(counts) => {
                let counts: Vec<String> = counts.iter().map(ToString::to_string).collect();
                write!(f, "one of {}", counts.join(", "))
            }
        }
    }
}

fn format_signatures(signatures: &[String]) -> String {
    if signatures.is_empty() {
        String::new()
    } else {
        format!(" (signatures: {})", signatures.join(" "))
    }
}

fn format_context(context: &Option<String>) -> String {
    context
        .as_ref()
        .map(|c| format!("{}: ", c))
        .unwrap_or_default()
}

fn format_stack(stack: &[CallFrame]) -> String {
    let mut out = String::new();
    for frame in stack {
        out.push_str("\n    at ");
        out.push_str(&frame.to_string());
    }
    out
}

/// Catch-all names matching any catchable error.
const CATCH_ALL: &[&str] = &["Exception", "RuntimeException", "Throwable"];

/// Parent of a type name in the exception hierarchy.
fn parent_type(name: &str) -> Option<&'static str> {
    match name {
        "EofError" => Some("ParseError"),
        "TypeError" | "SyntaxError" | "ArithmeticException" => Some("InterpreterError"),
        "ParseError" | "SymbolNotFound" | "ArityException" | "AssertionException"
        | "NotInTailPositionException" | "ValueException" | "InterpreterError" => {
            Some("VncException")
        }
        _ => None,
    }
}

/// Whether exception type `name` is `selector` or one of its subtypes.
pub fn type_is_a(name: &str, selector: &str) -> bool {
    if CATCH_ALL.contains(&selector) {
        return true;
    }
    let mut current = Some(name);
    while let Some(n) = current {
        if n == selector {
            return true;
        }
        current = parent_type(n);
    }
    false
}

impl Error {
    pub fn arity_named(name: impl Into<String>, expected: usize, got: usize) -> Self {
        Error::Arity {
            name: name.into(),
            supplied: got,
            required: AritySpec::Exact(expected),
            signatures: Vec::new(),
        }
    }

    pub fn arity_at_least(name: impl Into<String>, expected: usize, got: usize) -> Self {
        Error::Arity {
            name: name.into(),
            supplied: got,
            required: AritySpec::AtLeast(expected),
            signatures: Vec::new(),
        }
    }

    pub fn arity_range(name: impl Into<String>, min: usize, max: usize, got: usize) -> Self {
        Error::Arity {
            name: name.into(),
            supplied: got,
            required: AritySpec::Range(min, max),
            signatures: Vec::new(),
        }
    }

    pub fn type_error(expected: &'static str, got: &'static str) -> Self {
        Error::Type {
            expected,
            got,
            context: None,
        }
    }

    pub fn type_error_in(
        context: impl Into<String>,
        expected: &'static str,
        got: &'static str,
    ) -> Self {
        Error::Type {
            expected,
            got,
            context: Some(context.into()),
        }
    }

    pub fn syntax(form: &'static str, message: impl Into<String>) -> Self {
        Error::Syntax {
            form,
            message: message.into(),
        }
    }

    pub fn eval(message: impl Into<String>) -> Self {
        Error::Eval(message.into())
    }

    /// A thrown value without a cause.
    pub fn thrown(value: Value) -> Self {
        Error::Value { value, cause: None }
    }

    /// The error with any [`Error::Uncaught`] wrapper removed.
    #[must_use]
    pub fn root(&self) -> &Error {
        match self {
            Error::Uncaught { source, .. } => source.root(),
            other => other,
        }
    }

    /// Call stack attached when the error escaped to the host.
    #[must_use]
    pub fn call_stack(&self) -> &[CallFrame] {
        match self {
            Error::Uncaught { stack, .. } => stack,
            _ => &[],
        }
    }

    /// Exception type name used by `catch` selectors.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Error::Parse(ParseError::Syntax { .. }) => "ParseError",
            Error::Parse(ParseError::Eof { .. }) => "EofError",
            Error::SymbolNotFound(_) => "SymbolNotFound",
            Error::Arity { .. } => "ArityException",
            Error::Assertion(_) => "AssertionException",
            Error::NotInTailPosition(_) => "NotInTailPositionException",
            Error::Value { .. } => "ValueException",
            Error::Security(_) => "SecurityException",
            Error::Interrupted(_) => "InterruptedException",
            Error::Type { .. } => "TypeError",
            Error::Syntax { .. } => "SyntaxError",
            Error::DivisionByZero => "ArithmeticException",
            Error::Eval(_) => "InterpreterError",
            Error::Uncaught { source, .. } => source.type_name(),
        }
    }

    #[must_use]
    pub fn is_a(&self, selector: &str) -> bool {
        type_is_a(self.type_name(), selector)
    }

    /// Message without the type-name prefix.
    #[must_use]
    pub fn message(&self) -> String {
        let full = self.root().to_string();
        let prefix = format!("{}: ", self.type_name());
        full.strip_prefix(&prefix).map(str::to_string).unwrap_or(full)
    }

    /// Whether `try`/`catch` may handle this error. Interrupts never are;
    /// security errors only when the embedding allows it.
    #[must_use]
    pub fn is_catchable(&self, catchable_security: bool) -> bool {
        match self.root() {
            Error::Interrupted(_) => false,
            Error::Security(_) => catchable_security,
            _ => true,
        }
    }

    /// The value bound by `catch`: the thrown value for `ValueException`,
    /// otherwise an error map `{:type "..." :message "..."}`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self.root() {
            Error::Value { value, .. } => value.clone(),
            other => other.to_error_map(),
        }
    }

    /// `{:type "ArityException" :message "..." :cause ...}`.
    #[must_use]
    pub fn to_error_map(&self) -> Value {
        let mut pairs = vec![
            (Value::keyword("type"), Value::string(self.type_name())),
            (Value::keyword("message"), Value::string(self.message())),
        ];
        if let Error::Value {
            value,
            cause: Some(cause),
        } = self.root()
        {
            pairs.push((Value::keyword("value"), value.clone()));
            pairs.push((Value::keyword("cause"), cause.clone()));
        }
        Value::map(pairs)
    }

    /// Type name of the wrapped cause, if any.
    #[must_use]
    pub fn cause_type_name(&self) -> Option<String> {
        let cause = match self.root() {
            Error::Value {
                cause: Some(cause), ..
            } => cause.clone(),
            Error::Value {
                value: Value::Map(map, _),
                ..
            } => map.get(&Value::keyword("cause"))?.clone(),
            _ => return None,
        };
        match cause {
            Value::Map(map, _) => match map.get(&Value::keyword("type")) {
                Some(Value::String(s)) => Some(s.to_string()),
                _ => None,
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hierarchy() {
        assert!(type_is_a("EofError", "ParseError"));
        assert!(type_is_a("EofError", "VncException"));
        assert!(type_is_a("TypeError", "InterpreterError"));
        assert!(type_is_a("SecurityException", "Exception"));
        assert!(!type_is_a("ArityException", "AssertionException"));
        assert!(!type_is_a("SecurityException", "VncException"));
    }

    #[test]
    fn test_arity_message() {
        let err = Error::Arity {
            name: "user/f".into(),
            supplied: 1,
            required: AritySpec::Exact(2),
            signatures: vec!["[a b]".into()],
        };
        assert_eq!(
            err.to_string(),
            "ArityException: wrong number of args (1) passed to user/f, expected 2 (signatures: [a b])"
        );
        assert_eq!(err.type_name(), "ArityException");
    }

    #[test]
    fn test_catchability() {
        assert!(!Error::Interrupted("stop".into()).is_catchable(true));
        assert!(!Error::Security("no".into()).is_catchable(false));
        assert!(Error::Security("no".into()).is_catchable(true));
        assert!(Error::DivisionByZero.is_catchable(false));
    }

    #[test]
    fn test_error_map() {
        let err = Error::SymbolNotFound(Symbol::new("nope"));
        let map = err.to_value();
        let Value::Map(m, _) = map else {
            panic!("expected map");
        };
        assert_eq!(
            m.get(&Value::keyword("type")),
            Some(&Value::string("SymbolNotFound"))
        );
        assert_eq!(
            m.get(&Value::keyword("message")),
            Some(&Value::string("symbol 'nope' not found"))
        );
    }

    #[test]
    fn test_uncaught_unwraps_to_root() {
        let err = Error::Uncaught {
            source: Box::new(Error::DivisionByZero),
            stack: Vec::new(),
        };
        assert!(matches!(err.root(), Error::DivisionByZero));
        assert_eq!(err.type_name(), "ArithmeticException");
    }
}
