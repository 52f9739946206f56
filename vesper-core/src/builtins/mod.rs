// vesper-core - Built-in functions
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Built-in functions of the `core` namespace.

// Values hash by identity for their interior-mutable variants.
#![allow(clippy::mutable_key_type)]

mod arithmetic;
mod atoms;
pub(crate) mod collections;
mod misc;
mod predicates;
mod strings;

use std::sync::{Arc, Weak};

use vesper_parser::{Symbol, Value, Var};

use crate::error::{Error, Result};
use crate::eval::make_native_fn;
use crate::namespace::CORE_NS;
use crate::runtime::Runtime;

use arithmetic::{
    builtin_add, builtin_dec, builtin_div, builtin_eq, builtin_ge, builtin_gt, builtin_inc,
    builtin_le, builtin_lt, builtin_mod, builtin_mul, builtin_neg_p, builtin_not_eq,
    builtin_num_eq, builtin_pos_p, builtin_sub, builtin_zero_p,
};
use atoms::{builtin_atom, builtin_compare_and_set, builtin_deref, builtin_reset, builtin_swap};
use collections::{
    builtin_apply, builtin_assoc, builtin_concat, builtin_conj, builtin_cons,
    builtin_contains_p, builtin_count, builtin_dissoc, builtin_filter, builtin_first,
    builtin_get, builtin_hash_map, builtin_hash_set, builtin_keys, builtin_list, builtin_map,
    builtin_next, builtin_nth, builtin_range, builtin_reduce, builtin_rest, builtin_second,
    builtin_seq, builtin_vals, builtin_vec, builtin_vector,
};
use misc::{
    builtin_ex_info, builtin_gensym, builtin_identity, builtin_meta, builtin_not,
    builtin_pr_str, builtin_print_str, builtin_println, builtin_type, builtin_vary_meta,
    builtin_with_meta,
};
use predicates::{
    builtin_atom_p, builtin_coll_p, builtin_decimal_p, builtin_empty_p, builtin_false_p,
    builtin_float_p, builtin_fn_p, builtin_int_p, builtin_keyword_p, builtin_list_p,
    builtin_map_p, builtin_nil_p, builtin_number_p, builtin_seq_p, builtin_set_p,
    builtin_some_p, builtin_string_p, builtin_symbol_p, builtin_true_p, builtin_vector_p,
};
use strings::{builtin_keyword, builtin_name, builtin_str, builtin_symbol};

pub(crate) use misc::load_module;

fn define_native(
    runtime: &Runtime,
    name: &str,
    func: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
) -> Result<()> {
    let qualified = Symbol::with_namespace(CORE_NS, name);
    let native = make_native_fn(name, func);
    runtime.define(Var::new(qualified, Value::NativeFn(native), false, None))?;
    Ok(())
}

/// Register all built-in functions in the `core` namespace.
pub fn register_builtins(runtime: &Arc<Runtime>) -> Result<()> {
    // Arithmetic
    define_native(runtime, "+", builtin_add)?;
    define_native(runtime, "-", builtin_sub)?;
    define_native(runtime, "*", builtin_mul)?;
    define_native(runtime, "/", builtin_div)?;
    define_native(runtime, "inc", builtin_inc)?;
    define_native(runtime, "dec", builtin_dec)?;
    define_native(runtime, "mod", builtin_mod)?;
    define_native(runtime, "zero?", builtin_zero_p)?;
    define_native(runtime, "pos?", builtin_pos_p)?;
    define_native(runtime, "neg?", builtin_neg_p)?;

    // Comparison
    define_native(runtime, "=", builtin_eq)?;
    define_native(runtime, "not=", builtin_not_eq)?;
    define_native(runtime, "==", builtin_num_eq)?;
    define_native(runtime, "<", builtin_lt)?;
    define_native(runtime, ">", builtin_gt)?;
    define_native(runtime, "<=", builtin_le)?;
    define_native(runtime, ">=", builtin_ge)?;

    // Predicates
    define_native(runtime, "nil?", builtin_nil_p)?;
    define_native(runtime, "some?", builtin_some_p)?;
    define_native(runtime, "true?", builtin_true_p)?;
    define_native(runtime, "false?", builtin_false_p)?;
    define_native(runtime, "number?", builtin_number_p)?;
    define_native(runtime, "int?", builtin_int_p)?;
    define_native(runtime, "float?", builtin_float_p)?;
    define_native(runtime, "decimal?", builtin_decimal_p)?;
    define_native(runtime, "string?", builtin_string_p)?;
    define_native(runtime, "keyword?", builtin_keyword_p)?;
    define_native(runtime, "symbol?", builtin_symbol_p)?;
    define_native(runtime, "list?", builtin_list_p)?;
    define_native(runtime, "vector?", builtin_vector_p)?;
    define_native(runtime, "map?", builtin_map_p)?;
    define_native(runtime, "set?", builtin_set_p)?;
    define_native(runtime, "fn?", builtin_fn_p)?;
    define_native(runtime, "atom?", builtin_atom_p)?;
    define_native(runtime, "coll?", builtin_coll_p)?;
    define_native(runtime, "seq?", builtin_seq_p)?;
    define_native(runtime, "empty?", builtin_empty_p)?;

    // Collections
    define_native(runtime, "list", builtin_list)?;
    define_native(runtime, "vector", builtin_vector)?;
    define_native(runtime, "hash-map", builtin_hash_map)?;
    define_native(runtime, "hash-set", builtin_hash_set)?;
    define_native(runtime, "vec", builtin_vec)?;
    define_native(runtime, "cons", builtin_cons)?;
    define_native(runtime, "concat", builtin_concat)?;
    define_native(runtime, "first", builtin_first)?;
    define_native(runtime, "second", builtin_second)?;
    define_native(runtime, "rest", builtin_rest)?;
    define_native(runtime, "next", builtin_next)?;
    define_native(runtime, "nth", builtin_nth)?;
    define_native(runtime, "count", builtin_count)?;
    define_native(runtime, "get", builtin_get)?;
    define_native(runtime, "assoc", builtin_assoc)?;
    define_native(runtime, "dissoc", builtin_dissoc)?;
    define_native(runtime, "conj", builtin_conj)?;
    define_native(runtime, "contains?", builtin_contains_p)?;
    define_native(runtime, "keys", builtin_keys)?;
    define_native(runtime, "vals", builtin_vals)?;
    define_native(runtime, "seq", builtin_seq)?;
    define_native(runtime, "range", builtin_range)?;

    // Higher order
    define_native(runtime, "apply", builtin_apply)?;
    define_native(runtime, "map", builtin_map)?;
    define_native(runtime, "filter", builtin_filter)?;
    define_native(runtime, "reduce", builtin_reduce)?;

    // Strings and names
    define_native(runtime, "str", builtin_str)?;
    define_native(runtime, "name", builtin_name)?;
    define_native(runtime, "keyword", builtin_keyword)?;
    define_native(runtime, "symbol", builtin_symbol)?;

    // Metadata
    define_native(runtime, "meta", builtin_meta)?;
    define_native(runtime, "with-meta", builtin_with_meta)?;
    define_native(runtime, "vary-meta", builtin_vary_meta)?;

    // Atoms
    define_native(runtime, "atom", builtin_atom)?;
    define_native(runtime, "deref", builtin_deref)?;
    define_native(runtime, "reset!", builtin_reset)?;
    define_native(runtime, "swap!", builtin_swap)?;
    define_native(runtime, "compare-and-set!", builtin_compare_and_set)?;

    // Misc
    define_native(runtime, "type", builtin_type)?;
    define_native(runtime, "identity", builtin_identity)?;
    define_native(runtime, "not", builtin_not)?;
    define_native(runtime, "gensym", builtin_gensym)?;
    define_native(runtime, "ex-info", builtin_ex_info)?;
    define_native(runtime, "println", builtin_println)?;
    define_native(runtime, "print-str", builtin_print_str)?;
    define_native(runtime, "pr-str", builtin_pr_str)?;

    // Runtime-bound functions hold a weak reference so the runtime's own
    // globals do not keep it alive.
    let weak = Arc::downgrade(runtime);
    define_native(runtime, "load-module", move |args| {
        let runtime = upgrade(&weak)?;
        match args {
            [name] => load_module(&runtime, &name_of("load-module", name)?),
            _ => Err(Error::arity_named("load-module", 1, args.len())),
        }
    })?;
    let weak = Arc::downgrade(runtime);
    define_native(runtime, "alias", move |args| {
        let runtime = upgrade(&weak)?;
        match args {
            [alias, target] => {
                runtime
                    .current_namespace()
                    .add_alias(name_of("alias", alias)?, name_of("alias", target)?);
                Ok(Value::Nil)
            }
            _ => Err(Error::arity_named("alias", 2, args.len())),
        }
    })?;

    Ok(())
}

fn upgrade(weak: &Weak<Runtime>) -> Result<Arc<Runtime>> {
    weak.upgrade()
        .ok_or_else(|| Error::eval("interpreter has been dropped"))
}

/// Name from a symbol, keyword or string argument.
fn name_of(fn_name: &str, value: &Value) -> Result<String> {
    match value {
        Value::Symbol(sym, _) => Ok(sym.to_string()),
        Value::Keyword(kw) => Ok(kw.name().to_string()),
        Value::String(s) => Ok(s.to_string()),
        other => Err(Error::type_error_in(fn_name, "symbol", other.type_name())),
    }
}

// ============================================================================
// Argument helpers shared by the builtin modules
// ============================================================================

pub(crate) fn check_arity(name: &str, expected: usize, args: &[Value]) -> Result<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(Error::arity_named(name, expected, args.len()))
    }
}

pub(crate) fn check_arity_range(name: &str, min: usize, max: usize, args: &[Value]) -> Result<()> {
    if (min..=max).contains(&args.len()) {
        Ok(())
    } else {
        Err(Error::arity_range(name, min, max, args.len()))
    }
}

pub(crate) fn check_arity_at_least(name: &str, min: usize, args: &[Value]) -> Result<()> {
    if args.len() >= min {
        Ok(())
    } else {
        Err(Error::arity_at_least(name, min, args.len()))
    }
}
