// vesper-core - Namespace special forms
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Namespace special forms: ns, ns-remove, ns-unmap, import, imports and
//! namespace.

use tracing::debug;
use vesper_parser::{Symbol, Value};

use super::eval;
use crate::env::Env;
use crate::error::{Error, Result};

/// Namespace name from a symbol, string or keyword.
fn ns_name(form: &'static str, value: &Value) -> Result<String> {
    match value {
        Value::Symbol(sym, _) => Ok(sym.to_string()),
        Value::String(s) => Ok(s.to_string()),
        Value::Keyword(kw) => Ok(kw.name().to_string()),
        other => Err(Error::type_error_in(form, "symbol", other.type_name())),
    }
}

/// (ns name) - switch this thread to namespace `name`, creating it.
pub(crate) fn eval_ns(args: &[Value], env: &Env) -> Result<Value> {
    let [Value::Symbol(sym, _)] = args else {
        return Err(Error::syntax("ns", "expected (ns symbol)"));
    };
    let name = sym.to_string();
    env.runtime().set_current_ns(&name);
    debug!(namespace = %name, "switched namespace");
    Ok(Value::Symbol(Symbol::new(&name), None))
}

/// (ns-remove 'name) - drop a namespace and its vars.
pub(crate) fn eval_ns_remove(args: &[Value], env: &Env) -> Result<Value> {
    let [target] = args else {
        return Err(Error::syntax("ns-remove", "requires exactly 1 argument"));
    };
    let name = ns_name("ns-remove", &eval(target, env)?)?;
    env.runtime().remove_namespace(&name)?;
    Ok(Value::Nil)
}

/// (ns-unmap 'ns 'sym) - remove one var.
pub(crate) fn eval_ns_unmap(args: &[Value], env: &Env) -> Result<Value> {
    let [ns, sym] = args else {
        return Err(Error::syntax("ns-unmap", "requires exactly 2 arguments"));
    };
    let ns = ns_name("ns-unmap", &eval(ns, env)?)?;
    let sym = match eval(sym, env)? {
        Value::Symbol(sym, _) => sym,
        other => return Err(Error::type_error_in("ns-unmap", "symbol", other.type_name())),
    };
    env.runtime()
        .remove_global(&Symbol::with_namespace(&ns, sym.name()))?;
    Ok(Value::Nil)
}

/// (import :a.b.C ...) - record type names in the current namespace.
pub(crate) fn eval_import(args: &[Value], env: &Env) -> Result<Value> {
    let ns = env.runtime().current_namespace();
    for arg in args {
        let name = match arg {
            Value::Symbol(sym, _) => sym.to_string(),
            Value::Keyword(kw) => kw.name().to_string(),
            Value::String(s) => s.to_string(),
            other => return Err(Error::type_error_in("import", "symbol", other.type_name())),
        };
        ns.add_import(name);
    }
    Ok(Value::Nil)
}

/// (imports) / (imports 'ns) - the imported type names as symbols.
pub(crate) fn eval_imports(args: &[Value], env: &Env) -> Result<Value> {
    let runtime = env.runtime();
    let ns = match args {
        [] => runtime.current_namespace(),
        [ns] => {
            let name = ns_name("imports", &eval(ns, env)?)?;
            runtime
                .namespaces()
                .get(&name)
                .ok_or_else(|| Error::eval(format!("namespace '{}' not found", name)))?
        }
        _ => return Err(Error::syntax("imports", "requires 0 or 1 arguments")),
    };
    Ok(Value::vector(
        ns.imports()
            .iter()
            .map(|name| Value::Symbol(Symbol::new(name), None)),
    ))
}

/// (namespace x) - namespace of a symbol, keyword, var or function.
pub(crate) fn eval_namespace(args: &[Value], env: &Env) -> Result<Value> {
    let [target] = args else {
        return Err(Error::syntax("namespace", "requires exactly 1 argument"));
    };
    let ns = match eval(target, env)? {
        Value::Symbol(sym, _) => sym.namespace().map(str::to_string),
        Value::Keyword(kw) => kw.namespace().map(str::to_string),
        Value::Var(var) => var.name().namespace().map(str::to_string),
        Value::Fn(f) => Some(f.namespace().to_string()),
        Value::MultiFn(m) => m.name().namespace().map(str::to_string),
        Value::NativeFn(_) => None,
        other => return Err(Error::type_error_in("namespace", "symbol", other.type_name())),
    };
    Ok(ns.map_or(Value::Nil, Value::string))
}

#[cfg(test)]
mod tests {
    use crate::Interpreter;
    use vesper_parser::Value;

    #[test]
    fn test_ns_switch_and_isolation() {
        let interp = Interpreter::new().unwrap();
        assert_eq!(interp.eval_str("(ns alpha)").unwrap(), Value::symbol("alpha"));
        interp.eval_str("(def x 100) (defn f [] x)").unwrap();
        interp.eval_str("(ns beta)").unwrap();
        interp.eval_str("(def x 200)").unwrap();
        assert_eq!(interp.eval_str("(alpha/f)").unwrap(), Value::Int(100));
        assert_eq!(interp.eval_str("x").unwrap(), Value::Int(200));
        assert_eq!(interp.eval_str("*ns*").unwrap(), Value::symbol("beta"));
    }

    #[test]
    fn test_ns_remove() {
        let interp = Interpreter::new().unwrap();
        interp.eval_str("(ns gone) (def v 1) (ns user)").unwrap();
        assert_eq!(interp.eval_str("gone/v").unwrap(), Value::Int(1));
        interp.eval_str("(ns-remove 'gone)").unwrap();
        assert!(interp.eval_str("gone/v").is_err());
        assert!(interp.eval_str("(ns-remove 'user)").is_err());
    }

    #[test]
    fn test_ns_unmap() {
        let interp = Interpreter::new().unwrap();
        interp.eval_str("(def v 1)").unwrap();
        interp.eval_str("(ns-unmap 'user 'v)").unwrap();
        assert!(interp.eval_str("v").is_err());
        assert!(interp.eval_str("(ns-unmap 'core '+)").is_err());
    }

    #[test]
    fn test_imports() {
        let interp = Interpreter::new().unwrap();
        interp.eval_str("(import :java.io.File java.util.List)").unwrap();
        assert_eq!(
            interp.eval_str("(imports)").unwrap(),
            Value::vector([Value::symbol("java.io.File"), Value::symbol("java.util.List")])
        );
    }

    #[test]
    fn test_namespace_of() {
        let interp = Interpreter::new().unwrap();
        assert_eq!(interp.eval_str("(namespace 'a/b)").unwrap(), Value::string("a"));
        assert_eq!(interp.eval_str("(namespace :k)").unwrap(), Value::Nil);
        assert_eq!(interp.eval_str("(namespace +)").unwrap(), Value::Nil);
        interp.eval_str("(defn g [] 1)").unwrap();
        assert_eq!(interp.eval_str("(namespace g)").unwrap(), Value::string("user"));
    }
}
