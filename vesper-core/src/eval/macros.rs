// vesper-core - Macro expansion
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Macro expansion: `macroexpand` expands the head of a form until it no
//! longer names a macro, `macroexpand-all` walks the whole tree.

use vesper_parser::{Value, Vector, VesperFn};

use super::functions::invoke_fn;
use super::special_forms::SpecialForm;
use crate::context::NsGuard;
use crate::env::Env;
use crate::error::Result;

/// The macro a form's head names, if any. Special forms and locals
/// shadow macros.
fn head_macro(form: &Value, env: &Env) -> Option<VesperFn> {
    let Value::List(items, _) = form else {
        return None;
    };
    let Some(Value::Symbol(sym, _)) = items.front() else {
        return None;
    };
    if SpecialForm::from_symbol(sym).is_some() {
        return None;
    }
    if !sym.is_qualified() && env.lookup_local(sym).is_some() {
        return None;
    }
    match env.try_get(sym) {
        Some(Value::Fn(f)) if f.is_macro() => Some(f),
        _ => None,
    }
}

/// Expand `form` while its head is a macro. Non-macro forms are returned
/// unchanged.
pub fn macroexpand(form: &Value, env: &Env) -> Result<Value> {
    let mut form = form.clone();
    while let Some(mac) = head_macro(&form, env) {
        let args: Vec<Value> = match &form {
            Value::List(items, _) => items.iter().skip(1).cloned().collect(),
            _ => Vec::new(),
        };
        form = invoke_fn(&mac, args, Some(&form))?;
    }
    Ok(form)
}

/// Expand every macro call in `form`. Quoted forms are left alone and an
/// embedded `(ns name)` switches namespace for the forms after it; the
/// caller's namespace is restored afterwards.
pub fn macroexpand_all(form: &Value, env: &Env) -> Result<Value> {
    let runtime = env.runtime();
    let _ns = NsGuard::switch(runtime.id(), runtime.current_ns());
    walk(form, env)
}

fn walk_all(items: &Vector<Value>, env: &Env) -> Result<Vector<Value>> {
    items.iter().map(|item| walk(item, env)).collect()
}

fn walk(form: &Value, env: &Env) -> Result<Value> {
    let form = macroexpand(form, env)?;
    match &form {
        Value::List(items, meta) if !items.is_empty() => {
            let head = &items[0];
            if head.is_symbol_named("quote") || head.is_symbol_named("quasiquote") {
                return Ok(form);
            }
            if head.is_symbol_named("ns")
                && let Some(Value::Symbol(name, _)) = items.get(1)
            {
                env.runtime().set_current_ns(&name.to_string());
                return Ok(form);
            }
            Ok(Value::List(walk_all(items, env)?, meta.clone()))
        }
        Value::Vector(items, meta) => Ok(Value::Vector(walk_all(items, env)?, meta.clone())),
        Value::Map(map, meta) => {
            let mut pairs = Vec::with_capacity(map.len());
            for (k, v) in map {
                pairs.push((walk(k, env)?, walk(v, env)?));
            }
            Ok(Value::map(pairs).with_meta(meta.clone()))
        }
        Value::Set(items, meta) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(walk(item, env)?);
            }
            Ok(Value::set(out).with_meta(meta.clone()))
        }
        _ => Ok(form),
    }
}
