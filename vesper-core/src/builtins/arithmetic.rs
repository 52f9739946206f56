// vesper-core - Arithmetic and comparison built-in functions
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Arithmetic operations: +, -, *, /, inc, dec, mod and numeric comparison.
//!
//! ## Numeric contagion
//!
//! Mixed arguments are widened to the widest category present, ordered
//! long < double < decimal. Long arithmetic is checked and fails on
//! overflow instead of wrapping. Long division truncates; dividing a long
//! or a decimal by zero is an error, dividing a double follows IEEE 754.

use std::cmp::Ordering;

use vesper_parser::{Decimal, Value};

use super::{check_arity, check_arity_at_least};
use crate::error::{Error, Result};

/// Numeric category, ordered by precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Category {
    Int,
    Float,
    Decimal,
}

fn category(fn_name: &str, value: &Value) -> Result<Category> {
    match value {
        Value::Int(_) => Ok(Category::Int),
        Value::Float(_) => Ok(Category::Float),
        Value::Decimal(_) => Ok(Category::Decimal),
        other => Err(Error::type_error_in(
            fn_name.to_string(),
            "number",
            other.type_name(),
        )),
    }
}

fn widest<'a>(fn_name: &str, args: impl IntoIterator<Item = &'a Value>) -> Result<Category> {
    let mut widest = Category::Int;
    for arg in args {
        widest = widest.max(category(fn_name, arg)?);
    }
    Ok(widest)
}

fn to_float(value: &Value) -> f64 {
    match value {
        Value::Int(n) => *n as f64,
        Value::Float(f) => *f,
        Value::Decimal(d) => d.to_f64(),
        _ => f64::NAN,
    }
}

fn to_decimal(value: &Value) -> Result<Decimal> {
    match value {
        Value::Int(n) => Ok(Decimal::from_i64(*n)),
        Value::Float(f) => Decimal::from_f64(*f)
            .ok_or_else(|| Error::eval(format!("cannot convert {} to decimal", f))),
        Value::Decimal(d) => Ok(d.clone()),
        other => Err(Error::type_error("number", other.type_name())),
    }
}

fn overflow(op: &str) -> Error {
    Error::eval(format!("long overflow in '{}'", op))
}

/// Fold `args` with one operation per category.
fn fold(
    name: &str,
    init: &Value,
    args: &[Value],
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
    decimal_op: fn(&Decimal, &Decimal) -> Result<Decimal>,
) -> Result<Value> {
    match widest(name, std::iter::once(init).chain(args))? {
        Category::Int => {
            let mut acc = as_int(init);
            for arg in args {
                acc = int_op(acc, as_int(arg)).ok_or_else(|| overflow(name))?;
            }
            Ok(Value::Int(acc))
        }
        Category::Float => {
            let mut acc = to_float(init);
            for arg in args {
                acc = float_op(acc, to_float(arg));
            }
            Ok(Value::Float(acc))
        }
        Category::Decimal => {
            let mut acc = to_decimal(init)?;
            for arg in args {
                acc = decimal_op(&acc, &to_decimal(arg)?)?;
            }
            Ok(Value::Decimal(acc))
        }
    }
}

fn as_int(value: &Value) -> i64 {
    match value {
        Value::Int(n) => *n,
        _ => 0,
    }
}

pub(crate) fn builtin_add(args: &[Value]) -> Result<Value> {
    match args {
        [] => Ok(Value::Int(0)),
        [first, rest @ ..] => fold(
            "+",
            first,
            rest,
            i64::checked_add,
            |a, b| a + b,
            |a, b| Ok(a.add(b)),
        ),
    }
}

pub(crate) fn builtin_sub(args: &[Value]) -> Result<Value> {
    match args {
        [] => Err(Error::arity_at_least("-", 1, 0)),
        [only] => fold(
            "-",
            &Value::Int(0),
            std::slice::from_ref(only),
            i64::checked_sub,
            |a, b| a - b,
            |a, b| Ok(a.sub(b)),
        ),
        [first, rest @ ..] => fold(
            "-",
            first,
            rest,
            i64::checked_sub,
            |a, b| a - b,
            |a, b| Ok(a.sub(b)),
        ),
    }
}

pub(crate) fn builtin_mul(args: &[Value]) -> Result<Value> {
    match args {
        [] => Ok(Value::Int(1)),
        [first, rest @ ..] => fold(
            "*",
            first,
            rest,
            i64::checked_mul,
            |a, b| a * b,
            |a, b| Ok(a.mul(b)),
        ),
    }
}

fn int_div(a: i64, b: i64) -> Option<i64> {
    a.checked_div(b)
}

pub(crate) fn builtin_div(args: &[Value]) -> Result<Value> {
    let (first, rest) = match args {
        [] => return Err(Error::arity_at_least("/", 1, 0)),
        [only] => (&Value::Int(1), std::slice::from_ref(only)),
        [first, rest @ ..] => (first, rest),
    };
    // Zero divisors fail before folding so the error is not reported as
    // an overflow.
    let category = widest("/", std::iter::once(first).chain(rest))?;
    if category != Category::Float
        && rest.iter().any(|v| match v {
            Value::Int(0) => true,
            Value::Decimal(d) => d.is_zero(),
            Value::Float(f) => *f == 0.0,
            _ => false,
        })
    {
        return Err(Error::DivisionByZero);
    }
    fold(
        "/",
        first,
        rest,
        int_div,
        |a, b| a / b,
        |a, b| a.div(b).ok_or(Error::DivisionByZero),
    )
}

pub(crate) fn builtin_inc(args: &[Value]) -> Result<Value> {
    check_arity("inc", 1, args)?;
    builtin_add(&[args[0].clone(), Value::Int(1)])
}

pub(crate) fn builtin_dec(args: &[Value]) -> Result<Value> {
    check_arity("dec", 1, args)?;
    builtin_sub(&[args[0].clone(), Value::Int(1)])
}

/// Modulus of two longs; the result has the sign of the divisor.
pub(crate) fn builtin_mod(args: &[Value]) -> Result<Value> {
    match args {
        [Value::Int(_), Value::Int(0)] => Err(Error::DivisionByZero),
        [Value::Int(n), Value::Int(d)] => {
            let m = n.checked_rem(*d).unwrap_or(0);
            Ok(Value::Int(if m != 0 && (m < 0) != (*d < 0) { m + d } else { m }))
        }
        [a, b] => {
            let bad = if matches!(a, Value::Int(_)) { b } else { a };
            Err(Error::type_error_in("mod", "long", bad.type_name()))
        }
        _ => Err(Error::arity_named("mod", 2, args.len())),
    }
}

fn sign_test(name: &str, args: &[Value], test: fn(Ordering) -> bool) -> Result<Value> {
    check_arity(name, 1, args)?;
    let ordering = match &args[0] {
        Value::Int(n) => n.cmp(&0),
        Value::Float(f) => match f.partial_cmp(&0.0) {
            Some(ordering) => ordering,
            None => return Ok(Value::Bool(false)),
        },
        Value::Decimal(d) if d.is_zero() => Ordering::Equal,
        Value::Decimal(d) if d.is_negative() => Ordering::Less,
        Value::Decimal(_) => Ordering::Greater,
        other => return Err(Error::type_error_in(name.to_string(), "number", other.type_name())),
    };
    Ok(Value::Bool(test(ordering)))
}

pub(crate) fn builtin_zero_p(args: &[Value]) -> Result<Value> {
    sign_test("zero?", args, Ordering::is_eq)
}

pub(crate) fn builtin_pos_p(args: &[Value]) -> Result<Value> {
    sign_test("pos?", args, Ordering::is_gt)
}

pub(crate) fn builtin_neg_p(args: &[Value]) -> Result<Value> {
    sign_test("neg?", args, Ordering::is_lt)
}

// ============================================================================
// Comparison
// ============================================================================

/// Compare two numbers after widening. `None` for NaN.
pub(crate) fn compare_numbers(a: &Value, b: &Value) -> Result<Option<Ordering>> {
    Ok(match widest("compare", [a, b])? {
        Category::Int => Some(as_int(a).cmp(&as_int(b))),
        Category::Float => to_float(a).partial_cmp(&to_float(b)),
        Category::Decimal => Some(to_decimal(a)?.cmp(&to_decimal(b)?)),
    })
}

/// Order two values: numerically when both are numbers, otherwise by the
/// value ordering of a single type.
fn compare(name: &str, a: &Value, b: &Value) -> Result<Option<Ordering>> {
    if a.is_number() && b.is_number() {
        return compare_numbers(a, b);
    }
    if std::mem::discriminant(a) != std::mem::discriminant(b) {
        return Err(Error::eval(format!(
            "'{}' cannot compare {} with {}",
            name,
            a.type_name(),
            b.type_name()
        )));
    }
    Ok(Some(a.cmp(b)))
}

fn chain(name: &str, args: &[Value], test: fn(Ordering) -> bool) -> Result<Value> {
    check_arity_at_least(name, 1, args)?;
    for pair in args.windows(2) {
        match compare(name, &pair[0], &pair[1])? {
            Some(ordering) if test(ordering) => {}
            _ => return Ok(Value::Bool(false)),
        }
    }
    Ok(Value::Bool(true))
}

pub(crate) fn builtin_lt(args: &[Value]) -> Result<Value> {
    chain("<", args, Ordering::is_lt)
}

pub(crate) fn builtin_gt(args: &[Value]) -> Result<Value> {
    chain(">", args, Ordering::is_gt)
}

pub(crate) fn builtin_le(args: &[Value]) -> Result<Value> {
    chain("<=", args, Ordering::is_le)
}

pub(crate) fn builtin_ge(args: &[Value]) -> Result<Value> {
    chain(">=", args, Ordering::is_ge)
}

/// Strict equality: values of different types are never equal.
pub(crate) fn builtin_eq(args: &[Value]) -> Result<Value> {
    check_arity_at_least("=", 1, args)?;
    Ok(Value::Bool(args.windows(2).all(|pair| pair[0] == pair[1])))
}

pub(crate) fn builtin_not_eq(args: &[Value]) -> Result<Value> {
    check_arity_at_least("not=", 1, args)?;
    Ok(Value::Bool(!args.windows(2).all(|pair| pair[0] == pair[1])))
}

/// Numeric equality across types: `(== 1 1.0)` is true.
pub(crate) fn builtin_num_eq(args: &[Value]) -> Result<Value> {
    chain("==", args, Ordering::is_eq)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(n: i64) -> Value {
        Value::Int(n)
    }

    fn dec(s: &str) -> Value {
        Value::Decimal(s.parse().unwrap())
    }

    #[test]
    fn test_add_identity_and_contagion() {
        assert_eq!(builtin_add(&[]).unwrap(), int(0));
        assert_eq!(builtin_add(&[int(1), int(2), int(3)]).unwrap(), int(6));
        assert_eq!(
            builtin_add(&[int(1), Value::Float(0.5)]).unwrap(),
            Value::Float(1.5)
        );
        assert_eq!(builtin_add(&[int(1), dec("0.25")]).unwrap(), dec("1.25"));
    }

    #[test]
    fn test_overflow_is_an_error() {
        assert!(builtin_add(&[int(i64::MAX), int(1)]).is_err());
        assert!(builtin_mul(&[int(i64::MAX), int(2)]).is_err());
        assert!(builtin_sub(&[int(i64::MIN)]).is_err());
    }

    #[test]
    fn test_sub_and_negation() {
        assert_eq!(builtin_sub(&[int(5)]).unwrap(), int(-5));
        assert_eq!(builtin_sub(&[int(10), int(3), int(2)]).unwrap(), int(5));
        assert!(builtin_sub(&[]).is_err());
    }

    #[test]
    fn test_division() {
        assert_eq!(builtin_div(&[int(7), int(2)]).unwrap(), int(3));
        assert_eq!(
            builtin_div(&[Value::Float(1.0), int(4)]).unwrap(),
            Value::Float(0.25)
        );
        assert!(matches!(
            builtin_div(&[int(1), int(0)]),
            Err(Error::DivisionByZero)
        ));
        assert!(matches!(
            builtin_div(&[dec("1.0"), dec("0")]),
            Err(Error::DivisionByZero)
        ));
        let Value::Float(inf) = builtin_div(&[Value::Float(1.0), Value::Float(0.0)]).unwrap()
        else {
            panic!("expected double");
        };
        assert!(inf.is_infinite());
    }

    #[test]
    fn test_mod_follows_divisor_sign() {
        assert_eq!(builtin_mod(&[int(7), int(3)]).unwrap(), int(1));
        assert_eq!(builtin_mod(&[int(-7), int(3)]).unwrap(), int(2));
        assert_eq!(builtin_mod(&[int(7), int(-3)]).unwrap(), int(-2));
        assert!(builtin_mod(&[int(1), int(0)]).is_err());
    }

    #[test]
    fn test_type_errors() {
        let err = builtin_add(&[int(1), Value::string("a")]).unwrap_err();
        assert!(matches!(err, Error::Type { .. }));
    }

    #[test]
    fn test_equality_is_strict() {
        assert_eq!(builtin_eq(&[int(1), int(1)]).unwrap(), Value::Bool(true));
        assert_eq!(
            builtin_eq(&[int(1), Value::Float(1.0)]).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            builtin_num_eq(&[int(1), Value::Float(1.0)]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            builtin_not_eq(&[int(1), int(2)]).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_ordering_chains() {
        assert_eq!(builtin_lt(&[int(1), int(2), int(3)]).unwrap(), Value::Bool(true));
        assert_eq!(builtin_lt(&[int(1), int(3), int(2)]).unwrap(), Value::Bool(false));
        assert_eq!(
            builtin_ge(&[dec("2.5"), Value::Float(2.5), int(1)]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            builtin_lt(&[Value::string("a"), Value::string("b")]).unwrap(),
            Value::Bool(true)
        );
        assert!(builtin_lt(&[int(1), Value::string("b")]).is_err());
    }
}
