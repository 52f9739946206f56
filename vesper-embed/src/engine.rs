// vesper-embed - Engine implementation
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The [`Engine`]: the embedding entry point.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tracing::debug;
use vesper_core::interceptor::{MetricsSink, ModuleLoader, SecurityInterceptor};
use vesper_core::{Config, Error, Interpreter, Result};
use vesper_parser::Value;

use crate::convert::{FromValue, IntoValue};

/// A Vesper scripting engine.
///
/// `Engine` is `Send + Sync` and cheap to clone; clones share globals.
/// Each thread evaluates in its own current namespace with its own
/// dynamic bindings.
///
/// ```rust
/// use vesper_embed::Engine;
///
/// let engine = Engine::new().unwrap();
/// let result = engine.eval("(+ 1 2 3)").unwrap();
/// assert_eq!(result.to_string(), "6");
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    interp: Interpreter,
}

impl Engine {
    pub fn new() -> Result<Self> {
        Self::with_config(Config::default())
    }

    /// Create an engine with explicit interpreter settings.
    ///
    /// ```rust
    /// use vesper_embed::{Config, Engine};
    ///
    /// let engine = Engine::with_config(Config::default().with_max_depth(100)).unwrap();
    /// assert!(engine.eval("(defn f [n] (+ 1 (f n))) (f 1)").is_err());
    /// ```
    pub fn with_config(config: Config) -> Result<Self> {
        let interp = Interpreter::with_config(config)?;
        debug!("engine created");
        Ok(Engine { interp })
    }

    /// Evaluate source text, returning the value of the last form.
    ///
    /// # Errors
    ///
    /// Reader errors, uncaught exceptions and any other evaluation error.
    /// Errors that escape carry the call stack (see
    /// [`Error::call_stack`]).
    pub fn eval(&self, code: &str) -> Result<Value> {
        self.interp.eval_str(code)
    }

    /// Evaluate and convert the result.
    ///
    /// ```rust
    /// use vesper_embed::Engine;
    ///
    /// let engine = Engine::new().unwrap();
    /// let total: i64 = engine.eval_as("(reduce + [1 2 3])").unwrap();
    /// assert_eq!(total, 6);
    /// ```
    pub fn eval_as<T: FromValue>(&self, code: &str) -> Result<T> {
        T::from_value(&self.eval(code)?)
    }

    /// Evaluate a source file; positions in errors name the file.
    pub fn eval_file(&self, path: impl AsRef<Path>) -> Result<Value> {
        let path = path.as_ref();
        let code = std::fs::read_to_string(path)
            .map_err(|e| Error::eval(format!("cannot read '{}': {}", path.display(), e)))?;
        self.interp.eval_named(&code, &path.display().to_string())
    }

    /// Value of a global, looked up like a symbol in the current namespace.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        self.interp.get(name)
    }

    /// Typed value of a global. `None` when it is unbound or does not
    /// convert.
    #[must_use]
    pub fn get_as<T: FromValue>(&self, name: &str) -> Option<T> {
        self.get(name).and_then(|v| T::from_value(&v).ok())
    }

    /// Typed value of a global, keeping conversion errors: `Ok(None)`
    /// when unbound, `Err` when the value does not convert.
    ///
    /// ```rust
    /// use vesper_embed::Engine;
    ///
    /// let engine = Engine::new().unwrap();
    /// engine.eval("(def x \"hello\")").unwrap();
    /// assert!(engine.try_get_as::<i64>("y").unwrap().is_none());
    /// assert!(engine.try_get_as::<i64>("x").is_err());
    /// ```
    pub fn try_get_as<T: FromValue>(&self, name: &str) -> Result<Option<T>> {
        self.get(name).map(|v| T::from_value(&v)).transpose()
    }

    /// Define `name` in the current namespace.
    pub fn set(&self, name: &str, value: impl IntoValue) -> Result<()> {
        self.interp.define(name, value.into_value())
    }

    /// Call the function bound to `name`.
    ///
    /// ```rust
    /// use vesper_embed::{Engine, Value};
    ///
    /// let engine = Engine::new().unwrap();
    /// let result = engine.call("+", &[Value::int(1), Value::int(2)]).unwrap();
    /// assert_eq!(result, Value::int(3));
    /// ```
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        self.interp.call(name, args)
    }

    /// Call with arguments converted from Rust and the result converted
    /// back.
    pub fn call_as<T: FromValue>(
        &self,
        name: &str,
        args: impl IntoIterator<Item = Value>,
    ) -> Result<T> {
        let args: Vec<Value> = args.into_iter().collect();
        T::from_value(&self.call(name, &args)?)
    }

    /// Register a Rust function in the current namespace.
    ///
    /// ```rust
    /// use vesper_embed::{Engine, Error, Value};
    ///
    /// let engine = Engine::new().unwrap();
    /// engine
    ///     .register_fn("double", |args| match args {
    ///         [Value::Int(n)] => Ok(Value::int(n * 2)),
    ///         _ => Err(Error::eval("double expects one long")),
    ///     })
    ///     .unwrap();
    /// assert_eq!(engine.eval("(double 21)").unwrap(), Value::int(42));
    /// ```
    pub fn register_fn(
        &self,
        name: &str,
        func: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> Result<()> {
        self.interp.register_fn(name, func)
    }

    /// Name of this thread's current namespace.
    #[must_use]
    pub fn current_namespace(&self) -> String {
        self.interp.runtime().current_ns().to_string()
    }

    /// Switch this thread to namespace `name`, creating it if needed.
    pub fn set_namespace(&self, name: &str) {
        self.interp.runtime().set_current_ns(name);
    }

    // ------------------------------------------------------------------
    // Interruption and collaborators
    // ------------------------------------------------------------------

    /// Flag that stops running evaluations when set to true.
    #[must_use]
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interp.interrupt_handle()
    }

    pub fn interrupt(&self) {
        self.interp.interrupt();
    }

    pub fn clear_interrupt(&self) {
        self.interp.clear_interrupt();
    }

    pub fn set_module_loader(&self, loader: Arc<dyn ModuleLoader>) {
        self.interp.set_module_loader(loader);
    }

    pub fn set_interceptor(&self, interceptor: Arc<dyn SecurityInterceptor>) {
        self.interp.set_interceptor(interceptor);
    }

    pub fn set_metrics(&self, sink: Option<Arc<dyn MetricsSink>>) {
        self.interp.set_metrics(sink);
    }

    /// The underlying interpreter.
    #[must_use]
    pub fn interpreter(&self) -> &Interpreter {
        &self.interp
    }
}
