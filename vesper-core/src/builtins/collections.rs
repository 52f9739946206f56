// vesper-core - Collection built-in functions
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Collection construction, access and the eager sequence functions.
//!
//! Sequence results are lists. `seq` views a map as `[key value]`
//! vectors and a string as one-character strings; the seq of an empty
//! collection is nil.

use vesper_parser::{OrdMap, OrdSet, Value, Vector};

use super::{check_arity, check_arity_at_least, check_arity_range};
use crate::error::{Error, Result};
use crate::eval::apply;

/// Look `key` up in an associative value. `None` when absent.
pub(crate) fn lookup(coll: &Value, key: &Value) -> Option<Value> {
    match coll {
        Value::Map(map, _) => map.get(key).cloned(),
        Value::Set(set, _) => set.contains(key).then(|| key.clone()),
        Value::Vector(items, _) => index(key).and_then(|i| items.get(i).cloned()),
        Value::String(s) => index(key).and_then(|i| s.chars().nth(i).map(char_value)),
        Value::Custom(custom) => match key {
            Value::Keyword(kw) => custom.get(kw).cloned(),
            _ => None,
        },
        _ => None,
    }
}

fn index(key: &Value) -> Option<usize> {
    match key {
        Value::Int(i) => usize::try_from(*i).ok(),
        _ => None,
    }
}

fn char_value(c: char) -> Value {
    Value::string(c.to_string())
}

/// Elements of a seqable value, or `None` for non-seqable values.
pub(crate) fn to_seq(value: &Value) -> Option<Vector<Value>> {
    match value {
        Value::Nil => Some(Vector::new()),
        Value::List(items, _) | Value::Vector(items, _) => Some(items.clone()),
        Value::Set(items, _) => Some(items.iter().cloned().collect()),
        Value::Map(map, _) => Some(
            map.iter()
                .map(|(k, v)| Value::vector([k.clone(), v.clone()]))
                .collect(),
        ),
        Value::String(s) => Some(s.chars().map(char_value).collect()),
        Value::Custom(custom) => Some(
            custom
                .entries()
                .into_iter()
                .map(|(k, v)| Value::vector([Value::Keyword(k), v]))
                .collect(),
        ),
        _ => None,
    }
}

fn seq_arg(fn_name: &str, value: &Value) -> Result<Vector<Value>> {
    to_seq(value).ok_or_else(|| Error::type_error_in(fn_name.to_string(), "seqable", value.type_name()))
}

fn list(items: Vector<Value>) -> Value {
    Value::List(items, None)
}

// ============================================================================
// Constructors
// ============================================================================

pub(crate) fn builtin_list(args: &[Value]) -> Result<Value> {
    Ok(Value::list(args.iter().cloned()))
}

pub(crate) fn builtin_vector(args: &[Value]) -> Result<Value> {
    Ok(Value::vector(args.iter().cloned()))
}

pub(crate) fn builtin_hash_map(args: &[Value]) -> Result<Value> {
    if args.len() % 2 != 0 {
        return Err(Error::eval("hash-map requires an even number of arguments"));
    }
    Ok(Value::map(
        args.chunks(2).map(|pair| (pair[0].clone(), pair[1].clone())),
    ))
}

pub(crate) fn builtin_hash_set(args: &[Value]) -> Result<Value> {
    Ok(Value::set(args.iter().cloned()))
}

pub(crate) fn builtin_vec(args: &[Value]) -> Result<Value> {
    check_arity("vec", 1, args)?;
    Ok(Value::Vector(seq_arg("vec", &args[0])?, None))
}

// ============================================================================
// Sequence access
// ============================================================================

pub(crate) fn builtin_cons(args: &[Value]) -> Result<Value> {
    check_arity("cons", 2, args)?;
    let mut items = seq_arg("cons", &args[1])?;
    items.push_front(args[0].clone());
    Ok(list(items))
}

pub(crate) fn builtin_concat(args: &[Value]) -> Result<Value> {
    let mut items = Vector::new();
    for arg in args {
        items.append(seq_arg("concat", arg)?);
    }
    Ok(list(items))
}

pub(crate) fn builtin_first(args: &[Value]) -> Result<Value> {
    check_arity("first", 1, args)?;
    Ok(seq_arg("first", &args[0])?.front().cloned().unwrap_or(Value::Nil))
}

pub(crate) fn builtin_second(args: &[Value]) -> Result<Value> {
    check_arity("second", 1, args)?;
    Ok(seq_arg("second", &args[0])?.get(1).cloned().unwrap_or(Value::Nil))
}

/// Everything after the first element; `()` when there is nothing left.
pub(crate) fn builtin_rest(args: &[Value]) -> Result<Value> {
    check_arity("rest", 1, args)?;
    let items = seq_arg("rest", &args[0])?;
    Ok(list(items.skip(1.min(items.len()))))
}

/// Like `rest` but nil when there is nothing left.
pub(crate) fn builtin_next(args: &[Value]) -> Result<Value> {
    check_arity("next", 1, args)?;
    let items = seq_arg("next", &args[0])?;
    if items.len() <= 1 {
        Ok(Value::Nil)
    } else {
        Ok(list(items.skip(1)))
    }
}

pub(crate) fn builtin_nth(args: &[Value]) -> Result<Value> {
    check_arity_range("nth", 2, 3, args)?;
    let items = seq_arg("nth", &args[0])?;
    let Value::Int(i) = &args[1] else {
        return Err(Error::type_error_in("nth", "long", args[1].type_name()));
    };
    match usize::try_from(*i).ok().and_then(|i| items.get(i)) {
        Some(item) => Ok(item.clone()),
        None => match args.get(2) {
            Some(default) => Ok(default.clone()),
            None => Err(Error::eval(format!(
                "nth: index {} out of bounds for length {}",
                i,
                items.len()
            ))),
        },
    }
}

pub(crate) fn builtin_count(args: &[Value]) -> Result<Value> {
    check_arity("count", 1, args)?;
    let n = match &args[0] {
        Value::Nil => 0,
        Value::List(items, _) | Value::Vector(items, _) => items.len(),
        Value::Map(map, _) => map.len(),
        Value::Set(set, _) => set.len(),
        Value::String(s) => s.chars().count(),
        Value::Custom(custom) => custom.fields().len(),
        other => return Err(Error::type_error_in("count", "collection", other.type_name())),
    };
    Ok(Value::Int(n as i64))
}

pub(crate) fn builtin_get(args: &[Value]) -> Result<Value> {
    check_arity_range("get", 2, 3, args)?;
    let default = args.get(2).cloned().unwrap_or(Value::Nil);
    Ok(lookup(&args[0], &args[1]).unwrap_or(default))
}

pub(crate) fn builtin_contains_p(args: &[Value]) -> Result<Value> {
    check_arity("contains?", 2, args)?;
    let found = match &args[0] {
        Value::Map(map, _) => map.contains_key(&args[1]),
        Value::Set(set, _) => set.contains(&args[1]),
        Value::Vector(items, _) => index(&args[1]).is_some_and(|i| i < items.len()),
        Value::Custom(custom) => match &args[1] {
            Value::Keyword(kw) => custom.get(kw).is_some(),
            _ => false,
        },
        Value::Nil => false,
        other => return Err(Error::type_error_in("contains?", "associative", other.type_name())),
    };
    Ok(Value::Bool(found))
}

// ============================================================================
// Associative updates
// ============================================================================

pub(crate) fn builtin_assoc(args: &[Value]) -> Result<Value> {
    check_arity_at_least("assoc", 3, args)?;
    if args.len() % 2 == 0 {
        return Err(Error::eval("assoc expects key/value pairs after the collection"));
    }
    let pairs = args[1..].chunks(2);
    match &args[0] {
        Value::Nil => Ok(Value::map(pairs.map(|p| (p[0].clone(), p[1].clone())))),
        Value::Map(map, meta) => {
            let mut map = map.clone();
            for pair in pairs {
                map.insert(pair[0].clone(), pair[1].clone());
            }
            Ok(Value::Map(map, meta.clone()))
        }
        Value::Vector(items, meta) => {
            let mut items = items.clone();
            for pair in pairs {
                match index(&pair[0]) {
                    Some(i) if i < items.len() => {
                        items.set(i, pair[1].clone());
                    }
                    Some(i) if i == items.len() => items.push_back(pair[1].clone()),
                    _ => {
                        return Err(Error::eval(format!(
                            "assoc: index {} out of bounds for vector",
                            pair[0]
                        )));
                    }
                }
            }
            Ok(Value::Vector(items, meta.clone()))
        }
        other => Err(Error::type_error_in("assoc", "map or vector", other.type_name())),
    }
}

pub(crate) fn builtin_dissoc(args: &[Value]) -> Result<Value> {
    check_arity_at_least("dissoc", 1, args)?;
    match &args[0] {
        Value::Nil => Ok(Value::Nil),
        Value::Map(map, meta) => {
            let mut map: OrdMap<Value, Value> = map.clone();
            for key in &args[1..] {
                map.remove(key);
            }
            Ok(Value::Map(map, meta.clone()))
        }
        other => Err(Error::type_error_in("dissoc", "map", other.type_name())),
    }
}

/// Add items the way the collection grows: lists at the front, vectors
/// at the back, maps from `[k v]` pairs.
pub(crate) fn builtin_conj(args: &[Value]) -> Result<Value> {
    check_arity_at_least("conj", 1, args)?;
    let items = &args[1..];
    match &args[0] {
        Value::Nil => Ok(Value::list(items.iter().rev().cloned())),
        Value::List(list, meta) => {
            let mut list = list.clone();
            for item in items {
                list.push_front(item.clone());
            }
            Ok(Value::List(list, meta.clone()))
        }
        Value::Vector(vec, meta) => {
            let mut vec = vec.clone();
            vec.extend(items.iter().cloned());
            Ok(Value::Vector(vec, meta.clone()))
        }
        Value::Set(set, meta) => {
            let mut set: OrdSet<Value> = set.clone();
            for item in items {
                set.insert(item.clone());
            }
            Ok(Value::Set(set, meta.clone()))
        }
        Value::Map(map, meta) => {
            let mut map = map.clone();
            for item in items {
                match item {
                    Value::Vector(pair, _) if pair.len() == 2 => {
                        map.insert(pair[0].clone(), pair[1].clone());
                    }
                    Value::Map(other, _) => map.extend(other.clone()),
                    other => {
                        return Err(Error::type_error_in("conj", "map entry", other.type_name()));
                    }
                }
            }
            Ok(Value::Map(map, meta.clone()))
        }
        other => Err(Error::type_error_in("conj", "collection", other.type_name())),
    }
}

fn map_arg<'a>(fn_name: &str, value: &'a Value) -> Result<Option<&'a OrdMap<Value, Value>>> {
    match value {
        Value::Nil => Ok(None),
        Value::Map(map, _) => Ok(Some(map)),
        other => Err(Error::type_error_in(fn_name.to_string(), "map", other.type_name())),
    }
}

pub(crate) fn builtin_keys(args: &[Value]) -> Result<Value> {
    check_arity("keys", 1, args)?;
    Ok(match map_arg("keys", &args[0])? {
        Some(map) if !map.is_empty() => Value::list(map.keys().cloned()),
        _ => Value::Nil,
    })
}

pub(crate) fn builtin_vals(args: &[Value]) -> Result<Value> {
    check_arity("vals", 1, args)?;
    Ok(match map_arg("vals", &args[0])? {
        Some(map) if !map.is_empty() => Value::list(map.values().cloned()),
        _ => Value::Nil,
    })
}

pub(crate) fn builtin_seq(args: &[Value]) -> Result<Value> {
    check_arity("seq", 1, args)?;
    let items = seq_arg("seq", &args[0])?;
    Ok(if items.is_empty() { Value::Nil } else { list(items) })
}

/// `(range end)`, `(range start end)` or `(range start end step)` over longs.
pub(crate) fn builtin_range(args: &[Value]) -> Result<Value> {
    check_arity_range("range", 1, 3, args)?;
    let mut bounds = Vec::with_capacity(3);
    for arg in args {
        match arg {
            Value::Int(n) => bounds.push(*n),
            other => return Err(Error::type_error_in("range", "long", other.type_name())),
        }
    }
    let (start, end, step) = match bounds.as_slice() {
        [end] => (0, *end, 1),
        [start, end] => (*start, *end, 1),
        [start, end, step, ..] => (*start, *end, *step),
        [] => return Err(Error::arity_range("range", 1, 3, 0)),
    };
    if step == 0 {
        return Err(Error::eval("range: step must not be zero"));
    }
    let mut items = Vector::new();
    let mut n = start;
    while (step > 0 && n < end) || (step < 0 && n > end) {
        items.push_back(Value::Int(n));
        match n.checked_add(step) {
            Some(next) => n = next,
            None => break,
        }
    }
    Ok(list(items))
}

// ============================================================================
// Higher order
// ============================================================================

/// `(apply f x y [z ...])`: the last argument supplies the trailing args.
pub(crate) fn builtin_apply(args: &[Value]) -> Result<Value> {
    check_arity_at_least("apply", 2, args)?;
    let (func, rest) = (&args[0], &args[1..]);
    let (spread, fixed) = rest.split_last().unwrap_or((&Value::Nil, &[]));
    let mut call_args = fixed.to_vec();
    call_args.extend(seq_arg("apply", spread)?);
    apply(func, &call_args)
}

/// `(map f coll ...)`: stops at the shortest collection.
pub(crate) fn builtin_map(args: &[Value]) -> Result<Value> {
    check_arity_at_least("map", 2, args)?;
    let func = &args[0];
    let colls = args[1..]
        .iter()
        .map(|coll| seq_arg("map", coll))
        .collect::<Result<Vec<_>>>()?;
    let len = colls.iter().map(Vector::len).min().unwrap_or(0);
    let mut out = Vector::new();
    for i in 0..len {
        let call_args: Vec<Value> = colls.iter().map(|c| c[i].clone()).collect();
        out.push_back(apply(func, &call_args)?);
    }
    Ok(list(out))
}

pub(crate) fn builtin_filter(args: &[Value]) -> Result<Value> {
    check_arity("filter", 2, args)?;
    let mut out = Vector::new();
    for item in seq_arg("filter", &args[1])? {
        if apply(&args[0], std::slice::from_ref(&item))?.is_truthy() {
            out.push_back(item);
        }
    }
    Ok(list(out))
}

/// `(reduce f coll)` or `(reduce f init coll)`.
pub(crate) fn builtin_reduce(args: &[Value]) -> Result<Value> {
    check_arity_range("reduce", 2, 3, args)?;
    let func = &args[0];
    let (mut acc, items) = if args.len() == 3 {
        (args[1].clone(), seq_arg("reduce", &args[2])?)
    } else {
        let mut items = seq_arg("reduce", &args[1])?;
        match items.pop_front() {
            Some(first) => (first, items),
            None => return apply(func, &[]),
        }
    };
    for item in items {
        acc = apply(func, &[acc, item])?;
    }
    Ok(acc)
}
