// vesper-core - Dynamic binding
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Dynamic var support: def-dynamic, binding and set!.
//!
//! A dynamic var has a root value shared by all threads. `binding`
//! pushes a thread-local value on top of it for the dynamic extent of its
//! body; the pushed values are popped again however the body exits.

use tracing::trace;
use vesper_parser::{Symbol, Value, Var};

use super::special_forms::symbol_and_meta;
use super::{eval, eval_body};
use crate::env::Env;
use crate::error::{Error, Result};
use crate::namespace::CORE_NS;
use crate::runtime::NS_PSEUDO_VAR;

/// (def-dynamic name value?)
pub(crate) fn eval_def_dynamic(args: &[Value], env: &Env) -> Result<Value> {
    let (name_form, value_form) = match args {
        [name] => (name, None),
        [name, value] => (name, Some(value)),
        _ => return Err(Error::syntax("def-dynamic", "expected (def-dynamic name value?)")),
    };
    let (sym, meta) = symbol_and_meta("def-dynamic", name_form, env)?;
    let value = match value_form {
        Some(form) => eval(form, env)?,
        None => Value::Nil,
    };
    let qualified = env.runtime().qualify(&sym);
    env.set_global(Var::dynamic(qualified, value, meta))
        .map(Value::Var)
}

/// Pops the pushed dynamic values when dropped.
struct BindingGuard<'a> {
    env: &'a Env,
    pushed: Vec<Symbol>,
}

impl Drop for BindingGuard<'_> {
    fn drop(&mut self) {
        for name in self.pushed.iter().rev() {
            // The var was resolved when pushed, so popping cannot miss it.
            let _ = self.env.pop_dynamic(name);
        }
    }
}

/// (binding [sym value ...] body*)
pub(crate) fn eval_binding(args: &[Value], env: &Env) -> Result<Value> {
    let (bindings, body) = match args.split_first() {
        Some((Value::Vector(bindings, _), body)) if bindings.len() % 2 == 0 => (bindings, body),
        _ => {
            return Err(Error::syntax(
                "binding",
                "requires a binding vector with an even number of forms",
            ));
        }
    };
    let mut guard = BindingGuard {
        env,
        pushed: Vec::with_capacity(bindings.len() / 2),
    };
    let pairs: Vec<Value> = bindings.iter().cloned().collect();
    for pair in pairs.chunks(2) {
        let Value::Symbol(sym, _) = &pair[0] else {
            return Err(Error::syntax("binding", "binding targets must be symbols"));
        };
        let value = eval(&pair[1], env)?;
        let name = env.push_dynamic(sym, value)?;
        trace!(var = %name, "pushed dynamic binding");
        guard.pushed.push(name);
    }
    eval_body(body, env)
}

/// (set! sym value) - assign a dynamic var's current binding or an
/// overwritable global's root. Locals cannot be assigned.
pub(crate) fn eval_set(args: &[Value], env: &Env) -> Result<Value> {
    let (sym, value_form) = match args {
        [Value::Symbol(sym, _), value] => (sym, value),
        _ => return Err(Error::syntax("set!", "expected (set! symbol value)")),
    };
    if sym.name() == NS_PSEUDO_VAR {
        return Err(Error::eval("*ns* cannot be assigned with set!"));
    }
    if !sym.is_qualified() && env.lookup_local(sym).is_some() {
        return Err(Error::eval(format!("cannot set! local binding '{}'", sym)));
    }
    let runtime = env.runtime();
    let var = runtime
        .resolve_var(sym)
        .ok_or_else(|| Error::SymbolNotFound(sym.clone()))?;
    let value = eval(value_form, env)?;
    if var.is_dynamic() {
        env.set_dynamic(var.name(), value.clone())?;
        return Ok(value);
    }
    let ns = var.name().namespace().unwrap_or(CORE_NS);
    if runtime.namespaces().is_sealed(ns) {
        return Err(Error::Security(format!(
            "namespace '{}' is sealed: '{}' must not be overwritten",
            ns,
            var.name()
        )));
    }
    if !var.is_overwritable() {
        return Err(Error::eval(format!(
            "global '{}' must not be overwritten",
            var.name()
        )));
    }
    var.set_root(value.clone());
    Ok(value)
}

#[cfg(test)]
mod tests {
    use crate::Interpreter;
    use vesper_parser::Value;

    #[test]
    fn test_binding_restores_on_exit() {
        let interp = Interpreter::new().unwrap();
        interp.eval_str("(def-dynamic *x* 1)").unwrap();
        assert_eq!(interp.eval_str("(binding [*x* 2] *x*)").unwrap(), Value::Int(2));
        assert_eq!(interp.eval_str("*x*").unwrap(), Value::Int(1));
    }

    #[test]
    fn test_binding_restores_on_error() {
        let interp = Interpreter::new().unwrap();
        interp.eval_str("(def-dynamic *x* 1)").unwrap();
        assert!(interp.eval_str("(binding [*x* 2] (throw :boom))").is_err());
        assert_eq!(interp.eval_str("*x*").unwrap(), Value::Int(1));
    }

    #[test]
    fn test_binding_visible_in_called_fns() {
        let interp = Interpreter::new().unwrap();
        interp
            .eval_str("(def-dynamic *depth* 0) (defn depth [] *depth*)")
            .unwrap();
        assert_eq!(
            interp.eval_str("(binding [*depth* 5] (depth))").unwrap(),
            Value::Int(5)
        );
    }

    #[test]
    fn test_binding_creates_dynamic_var() {
        let interp = Interpreter::new().unwrap();
        assert_eq!(interp.eval_str("(binding [*fresh* 3] *fresh*)").unwrap(), Value::Int(3));
        assert_eq!(interp.eval_str("*fresh*").unwrap(), Value::Nil);
    }

    #[test]
    fn test_binding_plain_global_rejected() {
        let interp = Interpreter::new().unwrap();
        interp.eval_str("(def plain 1)").unwrap();
        assert!(interp.eval_str("(binding [plain 2] plain)").is_err());
    }

    #[test]
    fn test_set_dynamic_and_global() {
        let interp = Interpreter::new().unwrap();
        interp.eval_str("(def-dynamic *x* 1) (def g 1)").unwrap();
        assert_eq!(
            interp.eval_str("(binding [*x* 2] (set! *x* 3) *x*)").unwrap(),
            Value::Int(3)
        );
        assert_eq!(interp.eval_str("*x*").unwrap(), Value::Int(1));
        interp.eval_str("(set! *x* 9)").unwrap();
        assert_eq!(interp.eval_str("*x*").unwrap(), Value::Int(9));
        interp.eval_str("(set! g 2)").unwrap();
        assert_eq!(interp.eval_str("g").unwrap(), Value::Int(2));
    }

    #[test]
    fn test_set_local_rejected() {
        let interp = Interpreter::new().unwrap();
        assert!(interp.eval_str("(let [a 1] (set! a 2))").is_err());
        assert!(interp.eval_str("(set! *ns* 'other)").is_err());
        assert!(interp.eval_str("(set! + 1)").is_err());
    }
}
