// vesper-core - String and name built-in functions
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use vesper_parser::{Keyword, Symbol, Value, print_str};

use super::{check_arity, check_arity_range};
use crate::error::{Error, Result};

/// Concatenate the unreadable forms of the arguments; nil contributes
/// nothing.
pub(crate) fn builtin_str(args: &[Value]) -> Result<Value> {
    let mut out = String::new();
    for arg in args {
        out.push_str(&print_str(arg));
    }
    Ok(Value::string(out))
}

/// Name part of a keyword, symbol or string.
pub(crate) fn builtin_name(args: &[Value]) -> Result<Value> {
    check_arity("name", 1, args)?;
    match &args[0] {
        Value::Keyword(kw) => Ok(Value::string(kw.name())),
        Value::Symbol(sym, _) => Ok(Value::string(sym.name())),
        Value::String(_) => Ok(args[0].clone()),
        other => Err(Error::type_error_in("name", "named", other.type_name())),
    }
}

/// `(keyword name)` or `(keyword ns name)`.
pub(crate) fn builtin_keyword(args: &[Value]) -> Result<Value> {
    check_arity_range("keyword", 1, 2, args)?;
    match args {
        [Value::Keyword(_)] => Ok(args[0].clone()),
        [Value::String(s)] => Ok(Value::Keyword(Keyword::parse(s))),
        [Value::Symbol(sym, _)] => Ok(Value::Keyword(Keyword::parse(&sym.to_string()))),
        [Value::Nil, Value::String(name)] => Ok(Value::Keyword(Keyword::new(name))),
        [Value::String(ns), Value::String(name)] => {
            Ok(Value::Keyword(Keyword::with_namespace(ns, name)))
        }
        [.., other] => Err(Error::type_error_in("keyword", "string", other.type_name())),
        [] => Err(Error::arity_range("keyword", 1, 2, 0)),
    }
}

/// `(symbol name)` or `(symbol ns name)`.
pub(crate) fn builtin_symbol(args: &[Value]) -> Result<Value> {
    check_arity_range("symbol", 1, 2, args)?;
    match args {
        [Value::Symbol(..)] => Ok(args[0].clone()),
        [Value::String(s)] => Ok(Value::Symbol(Symbol::parse(s), None)),
        [Value::Keyword(kw)] => Ok(Value::Symbol(Symbol::parse(&kw.to_string()[1..]), None)),
        [Value::Nil, Value::String(name)] => Ok(Value::Symbol(Symbol::new(name), None)),
        [Value::String(ns), Value::String(name)] => {
            Ok(Value::Symbol(Symbol::with_namespace(ns, name), None))
        }
        [.., other] => Err(Error::type_error_in("symbol", "string", other.type_name())),
        [] => Err(Error::arity_range("symbol", 1, 2, 0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_str_skips_nil() {
        assert_eq!(
            builtin_str(&[Value::string("a"), Value::Nil, Value::Int(1), Value::keyword("k")])
                .unwrap(),
            Value::string("a1:k")
        );
        assert_eq!(builtin_str(&[]).unwrap(), Value::string(""));
    }

    #[test]
    fn test_name_drops_namespace() {
        assert_eq!(
            builtin_name(&[Value::keyword("ns/k")]).unwrap(),
            Value::string("k")
        );
        assert_eq!(builtin_name(&[Value::symbol("s")]).unwrap(), Value::string("s"));
    }

    #[test]
    fn test_keyword_and_symbol() {
        assert_eq!(
            builtin_keyword(&[Value::string("a"), Value::string("b")]).unwrap(),
            Value::keyword("a/b")
        );
        assert_eq!(
            builtin_symbol(&[Value::keyword("x")]).unwrap(),
            Value::symbol("x")
        );
        assert!(builtin_symbol(&[Value::Int(1)]).is_err());
    }
}
