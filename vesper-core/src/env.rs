// vesper-core - Environment for lexical scoping
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Lexical environments over the runtime's shared global table.
//!
//! An [`Env`] is a frame of local bindings with an optional outer frame.
//! Every environment of one interpreter points at the same [`Runtime`],
//! which holds the namespace-partitioned globals; lookups walk the local
//! chain first and fall back to globals.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use vesper_parser::{Symbol, Value, Var};

use crate::context::with_context;
use crate::error::{Error, Result};
use crate::runtime::{NS_PSEUDO_VAR, Runtime};

/// A lexical environment.
///
/// # Examples
///
/// ```
/// use vesper_core::{Config, Env, Runtime};
/// use vesper_parser::{Symbol, Value};
///
/// let env = Env::new(Runtime::new(Config::default()));
/// env.set_local(Symbol::new("x"), Value::int(42)).unwrap();
///
/// let child = env.child();
/// assert_eq!(child.get(&Symbol::new("x")).unwrap(), Value::int(42));
/// assert_eq!(child.level(), env.level() + 1);
/// ```
#[derive(Clone)]
pub struct Env {
    inner: Arc<EnvNode>,
}

struct EnvNode {
    locals: RwLock<HashMap<Symbol, Value>>,
    outer: Option<Env>,
    level: usize,
    runtime: Arc<Runtime>,
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let locals: Vec<String> = self
            .inner
            .locals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .map(ToString::to_string)
            .collect();
        f.debug_struct("Env")
            .field("level", &self.inner.level)
            .field("locals", &locals)
            .finish_non_exhaustive()
    }
}

impl Env {
    /// A root environment for `runtime`.
    pub fn new(runtime: Arc<Runtime>) -> Self {
        Env {
            inner: Arc::new(EnvNode {
                locals: RwLock::new(HashMap::new()),
                outer: None,
                level: 0,
                runtime,
            }),
        }
    }

    /// A child environment whose outer frame is `outer`.
    pub fn new_child(outer: &Env) -> Self {
        Env {
            inner: Arc::new(EnvNode {
                locals: RwLock::new(HashMap::new()),
                outer: Some(outer.clone()),
                level: outer.inner.level + 1,
                runtime: Arc::clone(&outer.inner.runtime),
            }),
        }
    }

    #[must_use]
    pub fn child(&self) -> Self {
        Env::new_child(self)
    }

    #[inline]
    #[must_use]
    pub fn level(&self) -> usize {
        self.inner.level
    }

    #[inline]
    #[must_use]
    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.inner.runtime
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Env) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Look `sym` up in the local chain only.
    #[must_use]
    pub fn lookup_local(&self, sym: &Symbol) -> Option<Value> {
        let mut current = Some(self);
        while let Some(env) = current {
            if let Some(value) = env
                .inner
                .locals
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(sym)
            {
                return Some(value.clone());
            }
            current = env.inner.outer.as_ref();
        }
        None
    }

    /// Whether `sym` is bound in this frame itself.
    pub(crate) fn has_own(&self, sym: &Symbol) -> bool {
        self.inner
            .locals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(sym)
    }

    /// Resolve `sym`: locals, then the current namespace, then `core`.
    /// Qualified symbols only consult globals.
    #[must_use]
    pub fn try_get(&self, sym: &Symbol) -> Option<Value> {
        if !sym.is_qualified() {
            if sym.name() == NS_PSEUDO_VAR {
                return Some(Value::Symbol(self.runtime().current_ns(), None));
            }
            if let Some(value) = self.lookup_local(sym) {
                return Some(value);
            }
        }
        let runtime = self.runtime();
        runtime
            .resolve_var(sym)
            .map(|var| runtime.var_value(&var))
    }

    pub fn get(&self, sym: &Symbol) -> Result<Value> {
        self.try_get(sym)
            .ok_or_else(|| Error::SymbolNotFound(sym.clone()))
    }

    #[must_use]
    pub fn get_or_nil(&self, sym: &Symbol) -> Value {
        self.try_get(sym).unwrap_or(Value::Nil)
    }

    // ------------------------------------------------------------------
    // Binding
    // ------------------------------------------------------------------

    /// Bind `sym` in this frame.
    ///
    /// With shadow checking enabled, binding the name of a
    /// non-overwritable global function is rejected.
    pub fn set_local(&self, sym: Symbol, value: Value) -> Result<()> {
        if sym.name() == NS_PSEUDO_VAR && !sym.is_qualified() {
            return Err(Error::eval("*ns* cannot be bound locally"));
        }
        if self.runtime().config().check_shadowing
            && let Some(var) = self.runtime().resolve_var(&sym)
            && !var.is_overwritable()
            && var.root().is_fn()
        {
            return Err(Error::eval(format!(
                "local '{}' shadows the global function {}",
                sym,
                var.name()
            )));
        }
        self.insert_local(sym, value);
        Ok(())
    }

    /// Bind without checks. Used for evaluator-generated bindings.
    pub(crate) fn insert_local(&self, sym: Symbol, value: Value) {
        self.inner
            .locals
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(sym, value);
    }

    /// Install a global var. See [`Runtime::define`].
    pub fn set_global(&self, var: Var) -> Result<Var> {
        self.runtime().define(var)
    }

    pub fn remove_global(&self, sym: &Symbol) -> Result<bool> {
        let qualified = self.runtime().qualify(sym);
        self.runtime().remove_global(&qualified)
    }

    // ------------------------------------------------------------------
    // Dynamic vars
    // ------------------------------------------------------------------

    /// The dynamic var `sym` names. Plain globals are an error.
    fn dynamic_var(&self, sym: &Symbol) -> Result<Option<Var>> {
        if sym.name() == NS_PSEUDO_VAR {
            return Err(Error::eval("*ns* cannot be rebound"));
        }
        match self.runtime().resolve_var(sym) {
            Some(var) if var.is_dynamic() => Ok(Some(var)),
            Some(var) => Err(Error::eval(format!(
                "'{}' is not a dynamic var",
                var.name()
            ))),
            None => Ok(None),
        }
    }

    fn existing_dynamic_var(&self, sym: &Symbol) -> Result<Var> {
        self.dynamic_var(sym)?
            .ok_or_else(|| Error::SymbolNotFound(sym.clone()))
    }

    /// Push a thread-local value for `sym`, creating the dynamic var in
    /// the current namespace on first use. Returns the var's qualified name.
    pub fn push_dynamic(&self, sym: &Symbol, value: Value) -> Result<Symbol> {
        let runtime = self.runtime();
        let var = match self.dynamic_var(sym)? {
            Some(var) => var,
            None => runtime.define(Var::dynamic(runtime.qualify(sym), Value::Nil, None))?,
        };
        let name = var.name().clone();
        with_context(runtime.id(), |ctx| {
            ctx.dynamics.entry(name.clone()).or_default().push(value);
        });
        Ok(name)
    }

    /// Pop this thread's most recent value for `sym`.
    pub fn pop_dynamic(&self, sym: &Symbol) -> Result<Option<Value>> {
        let var = self.existing_dynamic_var(sym)?;
        Ok(with_context(self.runtime().id(), |ctx| {
            let stack = ctx.dynamics.get_mut(var.name())?;
            let value = stack.pop();
            if stack.is_empty() {
                ctx.dynamics.remove(var.name());
            }
            value
        }))
    }

    /// Current value of dynamic var `sym` on this thread.
    pub fn peek_dynamic(&self, sym: &Symbol) -> Result<Value> {
        let var = self.existing_dynamic_var(sym)?;
        Ok(self.runtime().var_value(&var))
    }

    /// Replace the current value without growing the stack. With no
    /// binding on this thread the root value is replaced.
    pub fn set_dynamic(&self, sym: &Symbol, value: Value) -> Result<()> {
        let var = self.existing_dynamic_var(sym)?;
        let leftover = with_context(self.runtime().id(), |ctx| {
            match ctx.dynamics.get_mut(var.name()).and_then(|s| s.last_mut()) {
                Some(top) => {
                    *top = value;
                    None
                }
                None => Some(value),
            }
        });
        if let Some(value) = leftover {
            var.set_root(value);
        }
        Ok(())
    }

    /// Reset this thread's stack for `sym` to the single value `value`.
    pub fn replace_dynamic(&self, sym: &Symbol, value: Value) -> Result<()> {
        let var = self.existing_dynamic_var(sym)?;
        let name = var.name().clone();
        with_context(self.runtime().id(), |ctx| {
            ctx.dynamics.insert(name, vec![value]);
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn sym(name: &str) -> Symbol {
        Symbol::new(name)
    }

    fn env() -> Env {
        Env::new(Runtime::new(Config::default()))
    }

    #[test]
    fn test_local_shadowing() {
        let root = env();
        root.set_local(sym("x"), Value::Int(1)).unwrap();
        let child = root.child();
        child.set_local(sym("x"), Value::Int(2)).unwrap();
        assert_eq!(child.get(&sym("x")).unwrap(), Value::Int(2));
        assert_eq!(root.get(&sym("x")).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_levels_increase() {
        let root = env();
        let a = root.child();
        let b = Env::new_child(&a);
        assert_eq!(root.level(), 0);
        assert_eq!(a.level(), 1);
        assert_eq!(b.level(), 2);
    }

    #[test]
    fn test_missing_symbol() {
        let root = env();
        assert!(matches!(
            root.get(&sym("nope")),
            Err(Error::SymbolNotFound(_))
        ));
        assert_eq!(root.get_or_nil(&sym("nope")), Value::Nil);
    }

    #[test]
    fn test_ns_pseudo_var() {
        let root = env();
        assert_eq!(root.get(&sym("*ns*")).unwrap(), Value::symbol("user"));
        assert!(root.set_local(sym("*ns*"), Value::Nil).is_err());
    }

    #[test]
    fn test_dynamic_stack() {
        let root = env();
        let x = sym("x");
        root.push_dynamic(&x, Value::Int(1)).unwrap();
        root.push_dynamic(&x, Value::Int(2)).unwrap();
        assert_eq!(root.peek_dynamic(&x).unwrap(), Value::Int(2));
        root.set_dynamic(&x, Value::Int(3)).unwrap();
        assert_eq!(root.pop_dynamic(&x).unwrap(), Some(Value::Int(3)));
        assert_eq!(root.peek_dynamic(&x).unwrap(), Value::Int(1));
        root.replace_dynamic(&x, Value::Int(9)).unwrap();
        assert_eq!(root.pop_dynamic(&x).unwrap(), Some(Value::Int(9)));
        assert_eq!(root.peek_dynamic(&x).unwrap(), Value::Nil);
    }

    #[test]
    fn test_dynamic_on_plain_global_fails() {
        let root = env();
        let var = Var::new(sym("g").qualify("user"), Value::Int(1), true, None);
        root.set_global(var).unwrap();
        assert!(root.push_dynamic(&sym("g"), Value::Int(2)).is_err());
    }

    #[test]
    fn test_dynamic_values_are_thread_local() {
        let root = env();
        let x = sym("x");
        root.push_dynamic(&x, Value::Int(1)).unwrap();
        let other = root.clone();
        std::thread::spawn(move || {
            assert_eq!(other.peek_dynamic(&Symbol::new("x")).unwrap(), Value::Nil);
        })
        .join()
        .unwrap();
        assert_eq!(root.peek_dynamic(&x).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_shadow_check() {
        let rt = Runtime::new(Config::default().with_check_shadowing(true));
        let root = Env::new(rt);
        let f = Value::NativeFn(vesper_parser::NativeFn::new(
            "f",
            Arc::new(0u8) as Arc<dyn std::any::Any + Send + Sync>,
        ));
        root.set_global(Var::new(sym("f").qualify("user"), f, false, None))
            .unwrap();
        assert!(root.set_local(sym("f"), Value::Int(1)).is_err());
        assert!(root.set_local(sym("g"), Value::Int(1)).is_ok());
    }
}
