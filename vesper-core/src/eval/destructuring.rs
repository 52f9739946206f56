// vesper-core - Destructuring support
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Destructuring patterns for `let`, `loop`, `try-with` bindings and
//! function parameters.
//!
//! Associative patterns are processed in a fixed order: `:keys`, `:syms`
//! and `:strs` directives first, then symbol/pattern pairs, then `:as`,
//! and `:or` defaults last. When several entries bind the same name the
//! later one wins, and `:or` only fills bindings that ended up nil.

#![allow(clippy::mutable_key_type)]

use vesper_parser::{Keyword, OrdMap, Symbol, Value};

use crate::error::{Error, Result};

/// Result of destructuring: `(symbol, value)` pairs in binding order.
pub type Bindings = Vec<(Symbol, Value)>;

/// Destructure `pattern` against `value`. `:or` defaults are used as
/// written, without evaluation.
///
/// ```
/// use vesper_core::destructure;
/// use vesper_parser::{read, Value};
///
/// let pattern = read("[x y & z :as all]", "doc").unwrap();
/// let value = read("[1 2 3 4]", "doc").unwrap();
/// let bindings = destructure(&pattern, &value).unwrap();
/// assert_eq!(bindings[2].1, read("(3 4)", "doc").unwrap());
/// ```
pub fn destructure(pattern: &Value, value: &Value) -> Result<Bindings> {
    destructure_with(pattern, value, &mut |default| Ok(default.clone()))
}

/// Destructure with `resolve_default` turning `:or` default forms into
/// values. It is only called for defaults that are actually used.
pub fn destructure_with(
    pattern: &Value,
    value: &Value,
    resolve_default: &mut dyn FnMut(&Value) -> Result<Value>,
) -> Result<Bindings> {
    let mut bindings = Vec::new();
    bind_pattern(pattern, value, &mut bindings, resolve_default)?;
    Ok(bindings)
}

fn bind_pattern(
    pattern: &Value,
    value: &Value,
    out: &mut Bindings,
    resolve_default: &mut dyn FnMut(&Value) -> Result<Value>,
) -> Result<()> {
    match pattern {
        Value::Symbol(sym, _) => {
            out.push((sym.clone(), value.clone()));
            Ok(())
        }
        Value::Vector(items, _) | Value::List(items, _) => {
            let patterns: Vec<Value> = items.iter().cloned().collect();
            bind_sequential(&patterns, value, out, resolve_default)
        }
        Value::Map(map, _) => bind_associative(map, value, out, resolve_default),
        other => Err(Error::eval(format!(
            "invalid destructuring: binding target must be a symbol, sequence or map, got {}",
            other.type_name()
        ))),
    }
}

/// Elements of a sequential destructuring source.
fn source_items(value: &Value) -> Result<Vec<Value>> {
    match value {
        Value::List(items, _) | Value::Vector(items, _) => Ok(items.iter().cloned().collect()),
        Value::Set(items, _) => Ok(items.iter().cloned().collect()),
        Value::String(s) => Ok(s
            .chars()
            .map(|c| Value::string(c.to_string()))
            .collect()),
        Value::Nil => Ok(Vec::new()),
        other => Err(Error::eval(format!(
            "invalid destructuring: cannot destructure {} as a sequence",
            other.type_name()
        ))),
    }
}

fn bind_sequential(
    patterns: &[Value],
    value: &Value,
    out: &mut Bindings,
    resolve_default: &mut dyn FnMut(&Value) -> Result<Value>,
) -> Result<()> {
    let items = source_items(value)?;
    let mut pattern_idx = 0;
    let mut value_idx = 0;

    while pattern_idx < patterns.len() {
        let pat = &patterns[pattern_idx];

        if matches!(pat, Value::Keyword(kw) if kw.is("as")) {
            let as_sym = patterns
                .get(pattern_idx + 1)
                .and_then(Value::as_symbol)
                .ok_or_else(|| Error::syntax("destructure", ":as must be followed by a symbol"))?;
            out.push((as_sym.clone(), value.clone()));
            pattern_idx += 2;
            continue;
        }

        if pat.is_symbol_named("&") {
            let rest_pattern = patterns
                .get(pattern_idx + 1)
                .ok_or_else(|| Error::syntax("destructure", "& must be followed by a binding"))?;
            let rest = Value::list(items.iter().skip(value_idx).cloned());
            bind_pattern(rest_pattern, &rest, out, resolve_default)?;
            value_idx = items.len();
            pattern_idx += 2;
            continue;
        }

        if !pat.is_symbol_named("_") {
            let item = items.get(value_idx).cloned().unwrap_or(Value::Nil);
            bind_pattern(pat, &item, out, resolve_default)?;
        }
        pattern_idx += 1;
        value_idx += 1;
    }
    Ok(())
}

/// Entries of an associative destructuring source.
fn source_map(value: &Value) -> Result<OrdMap<Value, Value>> {
    match value {
        Value::Map(map, _) => Ok(map.clone()),
        Value::Nil => Ok(OrdMap::new()),
        Value::Custom(custom) => Ok(custom
            .entries()
            .into_iter()
            .map(|(k, v)| (Value::Keyword(k), v))
            .collect()),
        // Keyword arguments collected by `& {:keys [...]}`
        Value::List(items, _) if items.len() % 2 == 0 => {
            let items: Vec<Value> = items.iter().cloned().collect();
            Ok(items
                .chunks(2)
                .map(|pair| (pair[0].clone(), pair[1].clone()))
                .collect())
        }
        other => Err(Error::eval(format!(
            "invalid destructuring: cannot destructure {} as a map",
            other.type_name()
        ))),
    }
}

fn bind_associative(
    pattern: &OrdMap<Value, Value>,
    value: &Value,
    out: &mut Bindings,
    resolve_default: &mut dyn FnMut(&Value) -> Result<Value>,
) -> Result<()> {
    let source = source_map(value)?;
    // `:or` defaults cover names bound at this level, not in nested patterns
    let mut own = Vec::new();

    for directive in ["keys", "syms", "strs"] {
        let Some(names) = pattern.get(&Value::keyword(directive)) else {
            continue;
        };
        for sym in directive_symbols(names, directive)? {
            let key = match directive {
                "keys" => Value::Keyword(match sym.namespace() {
                    Some(ns) => Keyword::with_namespace(ns, sym.name()),
                    None => Keyword::new(sym.name()),
                }),
                "syms" => Value::Symbol(sym.clone(), None),
                _ => Value::string(sym.name()),
            };
            let found = source.get(&key).cloned().unwrap_or(Value::Nil);
            own.push(out.len());
            out.push((sym.unqualified(), found));
        }
    }

    for (target, key) in pattern.iter() {
        if matches!(target, Value::Keyword(_)) {
            continue;
        }
        let found = source.get(key).cloned().unwrap_or(Value::Nil);
        let before = out.len();
        bind_pattern(target, &found, out, resolve_default)?;
        if matches!(target, Value::Symbol(..)) {
            own.extend(before..out.len());
        }
    }

    if let Some(as_target) = pattern.get(&Value::keyword("as")) {
        let sym = as_target
            .as_symbol()
            .ok_or_else(|| Error::syntax("destructure", ":as must be followed by a symbol"))?;
        out.push((sym.clone(), value.clone()));
    }

    if let Some(defaults) = pattern.get(&Value::keyword("or")) {
        let Value::Map(defaults, _) = defaults else {
            return Err(Error::syntax(
                "destructure",
                format!(":or must be a map, got {}", defaults.type_name()),
            ));
        };
        for index in own {
            let (sym, bound) = &mut out[index];
            if bound.is_nil()
                && let Some(default) = defaults.get(&Value::Symbol(sym.clone(), None))
            {
                *bound = resolve_default(default)?;
            }
        }
    }

    for (key, _) in pattern.iter() {
        if let Value::Keyword(kw) = key
            && !matches!(kw.name(), "keys" | "syms" | "strs" | "as" | "or")
        {
            return Err(Error::syntax(
                "destructure",
                format!("unknown map destructuring directive {}", kw),
            ));
        }
    }
    Ok(())
}

fn directive_symbols(names: &Value, directive: &str) -> Result<Vec<Symbol>> {
    let items = names.as_sequential().ok_or_else(|| {
        Error::syntax(
            "destructure",
            format!(":{} requires a vector, got {}", directive, names.type_name()),
        )
    })?;
    items
        .iter()
        .map(|item| {
            item.as_symbol().cloned().ok_or_else(|| {
                Error::syntax(
                    "destructure",
                    format!(
                        ":{} vector must contain symbols, got {}",
                        directive,
                        item.type_name()
                    ),
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use vesper_parser::read;

    use super::*;

    fn bind(pattern: &str, value: &str) -> Vec<(String, Value)> {
        let pattern = read(pattern, "test").unwrap();
        let value = read(value, "test").unwrap();
        destructure(&pattern, &value)
            .unwrap()
            .into_iter()
            .map(|(s, v)| (s.to_string(), v))
            .collect()
    }

    fn lookup(bindings: &[(String, Value)], name: &str) -> Value {
        bindings
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
            .unwrap()
    }

    #[test]
    fn test_sequential_with_rest_and_as() {
        let b = bind("[x y & z :as all]", "[1 2 3 4]");
        assert_eq!(lookup(&b, "x"), Value::Int(1));
        assert_eq!(lookup(&b, "y"), Value::Int(2));
        assert_eq!(lookup(&b, "z"), Value::list([Value::Int(3), Value::Int(4)]));
        assert_eq!(lookup(&b, "all"), read("[1 2 3 4]", "t").unwrap());
    }

    #[test]
    fn test_rest_is_empty_list_when_exhausted() {
        let b = bind("[a & more]", "[1]");
        assert_eq!(lookup(&b, "more"), Value::empty_list());
    }

    #[test]
    fn test_missing_positions_are_nil() {
        let b = bind("[a b c]", "[1]");
        assert_eq!(lookup(&b, "b"), Value::Nil);
        assert_eq!(lookup(&b, "c"), Value::Nil);
    }

    #[test]
    fn test_underscore_skips() {
        let b = bind("[_ b]", "[1 2]");
        assert_eq!(b.len(), 1);
        assert_eq!(lookup(&b, "b"), Value::Int(2));
    }

    #[test]
    fn test_string_source() {
        let b = bind("[a b]", "\"hi\"");
        assert_eq!(lookup(&b, "a"), Value::string("h"));
        assert_eq!(lookup(&b, "b"), Value::string("i"));
    }

    #[test]
    fn test_keys_with_or() {
        let b = bind("{:keys [a b] :or {b 2}}", "{:a 1}");
        assert_eq!(lookup(&b, "a"), Value::Int(1));
        assert_eq!(lookup(&b, "b"), Value::Int(2));
    }

    #[test]
    fn test_or_defaults_stay_at_their_own_level() {
        let b = bind("{{:keys [b]} :inner :or {b 9}}", "{:inner {}}");
        assert_eq!(lookup(&b, "b"), Value::Nil);

        let b = bind("{{:keys [b] :or {b 9}} :inner}", "{:inner {}}");
        assert_eq!(lookup(&b, "b"), Value::Int(9));

        let b = bind("{b :b :or {b 3}}", "{}");
        assert_eq!(lookup(&b, "b"), Value::Int(3));
    }

    #[test]
    fn test_syms_and_strs() {
        let b = bind("{:syms [a] :strs [b]}", "{a 1 \"b\" 2}");
        assert_eq!(lookup(&b, "a"), Value::Int(1));
        assert_eq!(lookup(&b, "b"), Value::Int(2));
    }

    #[test]
    fn test_symbol_pairs_override_directives() {
        let b = bind("{:keys [a] a :b}", "{:a 1 :b 2}");
        assert_eq!(lookup(&b, "a"), Value::Int(2));
    }

    #[test]
    fn test_nested_patterns() {
        let b = bind("{[x y] :point {:keys [n]} :meta}", "{:point [1 2] :meta {:n 3}}");
        assert_eq!(lookup(&b, "x"), Value::Int(1));
        assert_eq!(lookup(&b, "y"), Value::Int(2));
        assert_eq!(lookup(&b, "n"), Value::Int(3));
    }

    #[test]
    fn test_nil_source_for_map() {
        let b = bind("{:keys [a] :or {a 5} :as m}", "nil");
        assert_eq!(lookup(&b, "a"), Value::Int(5));
        assert_eq!(lookup(&b, "m"), Value::Nil);
    }

    #[test]
    fn test_invalid_target() {
        let err = destructure(&Value::Int(1), &Value::Int(2)).unwrap_err();
        assert!(err.to_string().contains("invalid destructuring"));
        let err = destructure(&read("[a]", "t").unwrap(), &Value::Int(2)).unwrap_err();
        assert!(err.to_string().contains("invalid destructuring"));
    }

    #[test]
    fn test_defaults_are_resolved_lazily() {
        let pattern = read("{:keys [a b] :or {a x b y}}", "t").unwrap();
        let value = read("{:a 1}", "t").unwrap();
        let mut seen = Vec::new();
        let bindings = destructure_with(&pattern, &value, &mut |form| {
            seen.push(form.clone());
            Ok(Value::Int(99))
        })
        .unwrap();
        assert_eq!(seen, vec![Value::symbol("y")]);
        assert_eq!(bindings[1].1, Value::Int(99));
    }
}
