// vesper-core - Interpreter entry point
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The [`Interpreter`]: a runtime with the core functions registered, the
//! core macros loaded and the `core` namespace sealed.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tracing::debug;
use vesper_parser::{Symbol, Value, Var};

use crate::builtins::{load_module, register_builtins};
use crate::config::Config;
use crate::env::Env;
use crate::error::{Error, Result};
use crate::eval::functions::apply_in;
use crate::eval::{eval_source, eval_toplevel, make_native_fn, read_eval_print};
use crate::interceptor::{DebugAgent, MetricsSink, ModuleLoader, SecurityInterceptor};
use crate::namespace::{CORE_NS, USER_NS};
use crate::runtime::Runtime;

/// Source of the core macros.
const CORE_SOURCE: &str = include_str!("../../vesper-std/core.vsp");

/// Releases the runtime's globals when the last handle goes away.
struct Owner {
    runtime: Arc<Runtime>,
}

impl Drop for Owner {
    fn drop(&mut self) {
        self.runtime.release();
    }
}

/// A Vesper interpreter.
///
/// Cloning is cheap and every clone shares the same globals, so clones
/// can be moved to other threads. Each thread keeps its own current
/// namespace, call stack and dynamic bindings.
///
/// ```
/// use vesper_core::Interpreter;
/// use vesper_parser::Value;
///
/// let interp = Interpreter::new().unwrap();
/// interp.eval_str("(defn square [x] (* x x))").unwrap();
/// assert_eq!(interp.eval_str("(square 7)").unwrap(), Value::int(49));
/// ```
#[derive(Clone)]
pub struct Interpreter {
    env: Env,
    _owner: Arc<Owner>,
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("runtime", self.env.runtime())
            .finish()
    }
}

impl Interpreter {
    pub fn new() -> Result<Self> {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Result<Self> {
        let runtime = Runtime::new(config);
        let owner = Arc::new(Owner {
            runtime: Arc::clone(&runtime),
        });
        register_builtins(&runtime)?;

        let env = Env::new(Arc::clone(&runtime));
        runtime.set_current_ns(CORE_NS);
        let loaded = eval_source(CORE_SOURCE, "core.vsp", &env);
        runtime.set_current_ns(USER_NS);
        loaded?;
        runtime.namespaces().seal(CORE_NS);
        debug!(
            runtime = runtime.id(),
            core_vars = runtime.ns_vars(CORE_NS).len(),
            "interpreter ready"
        );

        Ok(Interpreter { env, _owner: owner })
    }

    /// The root environment.
    #[must_use]
    pub fn env(&self) -> &Env {
        &self.env
    }

    #[must_use]
    pub fn runtime(&self) -> &Arc<Runtime> {
        self.env.runtime()
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        self.runtime().config()
    }

    // ------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------

    /// Evaluate a form at top level.
    pub fn eval(&self, form: &Value) -> Result<Value> {
        eval_toplevel(form, &self.env)
    }

    /// Read and evaluate every form in `source`, returning the last value.
    pub fn eval_str(&self, source: &str) -> Result<Value> {
        eval_source(source, "<eval>", &self.env)
    }

    /// Evaluate `source` reporting `source_name` in positions.
    pub fn eval_named(&self, source: &str, source_name: &str) -> Result<Value> {
        eval_source(source, source_name, &self.env)
    }

    /// Evaluate `source` and print the last value readably.
    pub fn read_eval_print(&self, source: &str) -> Result<String> {
        read_eval_print(source, "<repl>", &self.env)
    }

    /// Load a module through the installed [`ModuleLoader`].
    pub fn load_module(&self, name: &str) -> Result<Value> {
        load_module(self.runtime(), name)
    }

    // ------------------------------------------------------------------
    // Host bindings
    // ------------------------------------------------------------------

    /// Name qualified into the current namespace unless it names one.
    fn qualified(&self, name: &str) -> Symbol {
        self.runtime().qualify(&Symbol::parse(name))
    }

    /// Register a Rust function under `name` in the current namespace.
    pub fn register_fn(
        &self,
        name: &str,
        func: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> Result<()> {
        let sym = self.qualified(name);
        let native = make_native_fn(sym.name(), func);
        self.runtime()
            .define(Var::new(sym, Value::NativeFn(native), true, None))?;
        Ok(())
    }

    /// Define (or redefine) the global `name`.
    pub fn define(&self, name: &str, value: Value) -> Result<()> {
        self.runtime()
            .define(Var::new(self.qualified(name), value, true, None))?;
        Ok(())
    }

    /// Value of the global `name`, if bound.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        let runtime = self.runtime();
        runtime
            .resolve_var(&Symbol::parse(name))
            .map(|var| runtime.var_value(&var))
    }

    /// Call the function bound to `name`.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        let func = self
            .get(name)
            .ok_or_else(|| Error::SymbolNotFound(Symbol::parse(name)))?;
        apply_in(self.runtime(), &func, args)
    }

    // ------------------------------------------------------------------
    // Interruption and collaborators
    // ------------------------------------------------------------------

    /// Shared flag that stops evaluation on every thread when set.
    #[must_use]
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.runtime().interrupt_flag()
    }

    pub fn interrupt(&self) {
        self.runtime().interrupt();
    }

    pub fn clear_interrupt(&self) {
        self.runtime().clear_interrupt();
    }

    pub fn set_module_loader(&self, loader: Arc<dyn ModuleLoader>) {
        self.runtime().set_module_loader(loader);
    }

    pub fn set_interceptor(&self, interceptor: Arc<dyn SecurityInterceptor>) {
        self.runtime().set_interceptor(interceptor);
    }

    pub fn set_metrics(&self, sink: Option<Arc<dyn MetricsSink>>) {
        self.runtime().set_metrics(sink);
    }

    pub fn set_debugger(&self, agent: Option<Arc<dyn DebugAgent>>) {
        self.runtime().set_debugger(agent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::MapModuleLoader;

    #[test]
    fn test_starts_in_user_with_core_sealed() {
        let interp = Interpreter::new().unwrap();
        assert_eq!(interp.runtime().current_ns().name(), USER_NS);
        assert!(interp.runtime().namespaces().is_sealed(CORE_NS));
        assert!(interp.get("core/defn").is_some());
    }

    #[test]
    fn test_core_library_loads_and_its_macros_expand() {
        let interp = Interpreter::new().expect("core library loads");
        let src = "(defn pick \"doc\" [x] (cond (neg? x) :neg (zero? x) :zero :else (when (pos? x) :pos))) \
                   [(pick -1) (pick 0) (pick 2)]";
        assert_eq!(
            interp.eval_str(src).unwrap(),
            Value::vector(vec![
                Value::keyword("neg"),
                Value::keyword("zero"),
                Value::keyword("pos"),
            ])
        );
    }

    #[test]
    fn test_register_and_call() {
        let interp = Interpreter::new().unwrap();
        interp
            .register_fn("double", |args| match args {
                [Value::Int(n)] => Ok(Value::Int(n * 2)),
                _ => Err(Error::eval("double expects a long")),
            })
            .unwrap();
        assert_eq!(interp.eval_str("(double 21)").unwrap(), Value::Int(42));
        assert_eq!(interp.call("double", &[Value::Int(4)]).unwrap(), Value::Int(8));
        assert!(interp.call("missing", &[]).is_err());
    }

    #[test]
    fn test_define_and_get() {
        let interp = Interpreter::new().unwrap();
        interp.define("limit", Value::Int(10)).unwrap();
        assert_eq!(interp.eval_str("(inc limit)").unwrap(), Value::Int(11));
        assert_eq!(interp.get("user/limit"), Some(Value::Int(10)));
    }

    #[test]
    fn test_load_module_restores_namespace() {
        let interp = Interpreter::new().unwrap();
        interp.set_module_loader(Arc::new(
            MapModuleLoader::new().with_module("geometry", "(ns geometry) (defn area [w h] (* w h))"),
        ));
        interp.load_module("geometry").unwrap();
        assert_eq!(interp.runtime().current_ns().name(), USER_NS);
        assert_eq!(interp.eval_str("(geometry/area 3 4)").unwrap(), Value::Int(12));
        assert!(interp.eval_str("(load-module \"missing\")").is_err());
    }

    #[test]
    fn test_clones_share_globals() {
        let interp = Interpreter::new().unwrap();
        let other = interp.clone();
        interp.eval_str("(def shared 5)").unwrap();
        assert_eq!(other.eval_str("shared").unwrap(), Value::Int(5));
    }
}
