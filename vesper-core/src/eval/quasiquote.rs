// vesper-core - Quasiquote expansion
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Rewrites a quasiquote template into calls on core functions.
//!
//! Sequences fold from the right: each element becomes
//! `(core/cons elem acc)` and each `~@x` becomes `(core/concat x acc)`,
//! starting from `'()`. Vectors, maps and sets are rebuilt from that list.
//! `name#` symbols are replaced by one fresh symbol per template.

use std::collections::HashMap;

use vesper_parser::{Symbol, Value};

use crate::error::{Error, Result};

fn core(name: &str) -> Value {
    Value::Symbol(Symbol::with_namespace("core", name), None)
}

fn quote(form: Value) -> Value {
    Value::list([Value::symbol("quote"), form])
}

/// Expand `template`, the argument of a `quasiquote` form.
pub(crate) fn expand(template: &Value) -> Result<Value> {
    let mut gensyms = HashMap::new();
    expand_form(template, &mut gensyms)
}

fn expand_form(form: &Value, gensyms: &mut HashMap<String, Symbol>) -> Result<Value> {
    match form {
        Value::Symbol(sym, _) => {
            let name = sym.name();
            if !sym.is_qualified() && name.len() > 1 && name.ends_with('#') {
                let sym = gensyms
                    .entry(name.to_string())
                    .or_insert_with(|| Symbol::gensym(&name[..name.len() - 1]))
                    .clone();
                return Ok(quote(Value::Symbol(sym, None)));
            }
            Ok(quote(form.clone()))
        }
        Value::List(items, _) if items.is_empty() => Ok(quote(Value::empty_list())),
        Value::List(items, _) => {
            if items[0].is_symbol_named("unquote") {
                return match items.len() {
                    2 => Ok(items[1].clone()),
                    _ => Err(Error::syntax("unquote", "requires exactly 1 argument")),
                };
            }
            if items[0].is_symbol_named("splice-unquote") {
                return Err(Error::syntax(
                    "splice-unquote",
                    "must appear inside a list, vector, map or set",
                ));
            }
            expand_seq(items.iter(), gensyms)
        }
        Value::Vector(items, _) => Ok(Value::list([
            core("vec"),
            expand_seq(items.iter(), gensyms)?,
        ])),
        Value::Map(map, _) => {
            let flat: Vec<Value> = map
                .iter()
                .flat_map(|(k, v)| [k.clone(), v.clone()])
                .collect();
            Ok(Value::list([
                core("apply"),
                core("hash-map"),
                expand_seq(flat.iter(), gensyms)?,
            ]))
        }
        Value::Set(items, _) => Ok(Value::list([
            core("apply"),
            core("hash-set"),
            expand_seq(items.iter(), gensyms)?,
        ])),
        other => Ok(other.clone()),
    }
}

fn expand_seq<'a>(
    items: impl DoubleEndedIterator<Item = &'a Value>,
    gensyms: &mut HashMap<String, Symbol>,
) -> Result<Value> {
    let elements: Vec<&Value> = items.collect();
    let mut acc = quote(Value::empty_list());
    for item in elements.into_iter().rev() {
        acc = match item {
            Value::List(inner, _) if inner.len() == 2 && inner[0].is_symbol_named("splice-unquote") => {
                Value::list([core("concat"), inner[1].clone(), acc])
            }
            _ => Value::list([core("cons"), expand_form(item, gensyms)?, acc]),
        };
    }
    Ok(acc)
}
