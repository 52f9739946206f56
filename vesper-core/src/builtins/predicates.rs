// vesper-core - Type predicate built-in functions
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use vesper_parser::Value;

use super::check_arity;
use crate::error::Result;

fn predicate(name: &str, args: &[Value], test: impl Fn(&Value) -> bool) -> Result<Value> {
    check_arity(name, 1, args)?;
    Ok(Value::Bool(test(&args[0])))
}

pub(crate) fn builtin_nil_p(args: &[Value]) -> Result<Value> {
    predicate("nil?", args, Value::is_nil)
}

pub(crate) fn builtin_some_p(args: &[Value]) -> Result<Value> {
    predicate("some?", args, |v| !v.is_nil())
}

pub(crate) fn builtin_true_p(args: &[Value]) -> Result<Value> {
    predicate("true?", args, |v| matches!(v, Value::Bool(true)))
}

pub(crate) fn builtin_false_p(args: &[Value]) -> Result<Value> {
    predicate("false?", args, |v| matches!(v, Value::Bool(false)))
}

pub(crate) fn builtin_number_p(args: &[Value]) -> Result<Value> {
    predicate("number?", args, Value::is_number)
}

pub(crate) fn builtin_int_p(args: &[Value]) -> Result<Value> {
    predicate("int?", args, |v| matches!(v, Value::Int(_)))
}

pub(crate) fn builtin_float_p(args: &[Value]) -> Result<Value> {
    predicate("float?", args, |v| matches!(v, Value::Float(_)))
}

pub(crate) fn builtin_decimal_p(args: &[Value]) -> Result<Value> {
    predicate("decimal?", args, |v| matches!(v, Value::Decimal(_)))
}

pub(crate) fn builtin_string_p(args: &[Value]) -> Result<Value> {
    predicate("string?", args, |v| matches!(v, Value::String(_)))
}

pub(crate) fn builtin_keyword_p(args: &[Value]) -> Result<Value> {
    predicate("keyword?", args, |v| matches!(v, Value::Keyword(_)))
}

pub(crate) fn builtin_symbol_p(args: &[Value]) -> Result<Value> {
    predicate("symbol?", args, |v| matches!(v, Value::Symbol(..)))
}

pub(crate) fn builtin_list_p(args: &[Value]) -> Result<Value> {
    predicate("list?", args, |v| matches!(v, Value::List(..)))
}

pub(crate) fn builtin_vector_p(args: &[Value]) -> Result<Value> {
    predicate("vector?", args, |v| matches!(v, Value::Vector(..)))
}

pub(crate) fn builtin_map_p(args: &[Value]) -> Result<Value> {
    predicate("map?", args, |v| matches!(v, Value::Map(..)))
}

pub(crate) fn builtin_set_p(args: &[Value]) -> Result<Value> {
    predicate("set?", args, |v| matches!(v, Value::Set(..)))
}

/// Functions, native functions and multimethods; macros are not functions.
pub(crate) fn builtin_fn_p(args: &[Value]) -> Result<Value> {
    predicate("fn?", args, |v| match v {
        Value::Fn(f) => !f.is_macro(),
        Value::NativeFn(_) | Value::MultiFn(_) => true,
        _ => false,
    })
}

pub(crate) fn builtin_atom_p(args: &[Value]) -> Result<Value> {
    predicate("atom?", args, |v| matches!(v, Value::Atom(_)))
}

pub(crate) fn builtin_coll_p(args: &[Value]) -> Result<Value> {
    predicate("coll?", args, |v| {
        matches!(
            v,
            Value::List(..) | Value::Vector(..) | Value::Map(..) | Value::Set(..)
        )
    })
}

pub(crate) fn builtin_seq_p(args: &[Value]) -> Result<Value> {
    predicate("seq?", args, |v| matches!(v, Value::List(..)))
}

/// True for nil and empty collections or strings.
pub(crate) fn builtin_empty_p(args: &[Value]) -> Result<Value> {
    check_arity("empty?", 1, args)?;
    let empty = match &args[0] {
        Value::Nil => true,
        Value::List(items, _) | Value::Vector(items, _) => items.is_empty(),
        Value::Map(map, _) => map.is_empty(),
        Value::Set(set, _) => set.is_empty(),
        Value::String(s) => s.is_empty(),
        other => {
            return Err(crate::error::Error::type_error_in(
                "empty?",
                "collection",
                other.type_name(),
            ));
        }
    };
    Ok(Value::Bool(empty))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness_predicates() {
        assert_eq!(builtin_nil_p(&[Value::Nil]).unwrap(), Value::Bool(true));
        assert_eq!(builtin_some_p(&[Value::Bool(false)]).unwrap(), Value::Bool(true));
        assert_eq!(builtin_true_p(&[Value::Int(1)]).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_empty() {
        assert_eq!(builtin_empty_p(&[Value::string("")]).unwrap(), Value::Bool(true));
        assert_eq!(
            builtin_empty_p(&[Value::vector([Value::Nil])]).unwrap(),
            Value::Bool(false)
        );
        assert!(builtin_empty_p(&[Value::Int(1)]).is_err());
    }

    #[test]
    fn test_arity() {
        assert!(builtin_nil_p(&[]).is_err());
        assert!(builtin_int_p(&[Value::Int(1), Value::Int(2)]).is_err());
    }
}
