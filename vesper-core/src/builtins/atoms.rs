// vesper-core - Atom built-in functions
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Atom operations: atom, deref, reset!, swap!, compare-and-set!

use vesper_parser::{Atom, Value};

use super::{check_arity, check_arity_at_least};
use crate::error::{Error, Result};
use crate::eval::apply;

fn atom_arg<'a>(fn_name: &'static str, value: &'a Value) -> Result<&'a Atom> {
    match value {
        Value::Atom(atom) => Ok(atom),
        other => Err(Error::type_error_in(fn_name, "atom", other.type_name())),
    }
}

/// (atom x) - Create an atom with initial value x
pub(crate) fn builtin_atom(args: &[Value]) -> Result<Value> {
    check_arity("atom", 1, args)?;
    Ok(Value::Atom(Atom::new(args[0].clone())))
}

/// (deref ref) - Current value of an atom, or a var's root
pub(crate) fn builtin_deref(args: &[Value]) -> Result<Value> {
    check_arity("deref", 1, args)?;
    match &args[0] {
        Value::Atom(atom) => Ok(atom.deref()),
        Value::Var(var) => Ok(var.root()),
        other => Err(Error::type_error_in("deref", "atom", other.type_name())),
    }
}

/// (reset! atom newval) - Set atom value, returns newval
pub(crate) fn builtin_reset(args: &[Value]) -> Result<Value> {
    check_arity("reset!", 2, args)?;
    Ok(atom_arg("reset!", &args[0])?.reset(args[1].clone()))
}

/// (swap! atom f & args) - Atomically replace the value with
/// `(apply f current args)`, retrying when another thread got there first.
pub(crate) fn builtin_swap(args: &[Value]) -> Result<Value> {
    check_arity_at_least("swap!", 2, args)?;
    let atom = atom_arg("swap!", &args[0])?;
    let func = &args[1];
    loop {
        let (old, version) = atom.load();
        let mut call_args = Vec::with_capacity(args.len() - 1);
        call_args.push(old);
        call_args.extend_from_slice(&args[2..]);
        let new = apply(func, &call_args)?;
        if atom.set_if_version(version, new.clone()) {
            return Ok(new);
        }
        tracing::trace!("swap! retry after concurrent update");
    }
}

/// (compare-and-set! atom oldval newval) - set to newval when the current
/// value equals oldval; returns whether it did
pub(crate) fn builtin_compare_and_set(args: &[Value]) -> Result<Value> {
    check_arity("compare-and-set!", 3, args)?;
    let atom = atom_arg("compare-and-set!", &args[0])?;
    Ok(Value::Bool(atom.compare_and_set(&args[1], args[2].clone())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::arithmetic::builtin_add;
    use crate::builtins::collections::builtin_conj;
    use crate::eval::make_native_fn;

    #[test]
    fn test_reset_and_deref() {
        let atom = builtin_atom(&[Value::Int(1)]).unwrap();
        assert_eq!(builtin_reset(&[atom.clone(), Value::Int(2)]).unwrap(), Value::Int(2));
        assert_eq!(builtin_deref(&[atom]).unwrap(), Value::Int(2));
    }

    #[test]
    fn test_swap_applies_extra_args() {
        let atom = builtin_atom(&[Value::Int(1)]).unwrap();
        let plus = Value::NativeFn(make_native_fn("+", builtin_add));
        assert_eq!(
            builtin_swap(&[atom.clone(), plus, Value::Int(2), Value::Int(3)]).unwrap(),
            Value::Int(6)
        );
        assert_eq!(builtin_deref(&[atom]).unwrap(), Value::Int(6));
    }

    #[test]
    fn test_swap_on_empty_vector() {
        let atom = builtin_atom(&[Value::vector([])]).unwrap();
        let conj = Value::NativeFn(make_native_fn("conj", builtin_conj));
        assert_eq!(
            builtin_swap(&[atom.clone(), conj, Value::Int(1)]).unwrap(),
            Value::vector([Value::Int(1)])
        );
        assert_eq!(builtin_deref(&[atom]).unwrap(), Value::vector([Value::Int(1)]));
    }

    #[test]
    fn test_compare_and_set() {
        let atom = builtin_atom(&[Value::Int(0)]).unwrap();
        assert_eq!(
            builtin_compare_and_set(&[atom.clone(), Value::Int(1), Value::Int(5)]).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            builtin_compare_and_set(&[atom.clone(), Value::Int(0), Value::Int(5)]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(builtin_deref(&[atom]).unwrap(), Value::Int(5));
    }

    #[test]
    fn test_non_atom_rejected() {
        assert!(builtin_reset(&[Value::Int(1), Value::Int(2)]).is_err());
    }
}
