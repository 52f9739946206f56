// vesper-core - Shared interpreter state
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! State shared by every thread and environment of one interpreter: the
//! global var table, namespaces, configuration, the interrupt flag and the
//! installed collaborators.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, trace};
use vesper_parser::{CustomType, Symbol, Value, Var};

use crate::config::Config;
use crate::context::{self, discard_context, with_context};
use crate::error::{Error, Result};
use crate::interceptor::{
    AcceptAll, DebugAgent, MetricsSink, ModuleLoader, NoModuleLoader, SecurityInterceptor,
};
use crate::locking::LockTable;
use crate::namespace::{CORE_NS, Namespace, NamespaceRegistry};

static NEXT_RUNTIME_ID: AtomicU64 = AtomicU64::new(1);

/// Name of the pseudo var holding the current namespace.
pub const NS_PSEUDO_VAR: &str = "*ns*";

pub struct Runtime {
    id: u64,
    config: Config,
    globals: DashMap<Symbol, Var>,
    namespaces: NamespaceRegistry,
    types: DashMap<Symbol, Arc<CustomType>>,
    interrupted: Arc<AtomicBool>,
    locks: LockTable,
    loader: RwLock<Arc<dyn ModuleLoader>>,
    interceptor: RwLock<Arc<dyn SecurityInterceptor>>,
    metrics: RwLock<Option<Arc<dyn MetricsSink>>>,
    debugger: RwLock<Option<Arc<dyn DebugAgent>>>,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("id", &self.id)
            .field("globals", &self.globals.len())
            .field("namespaces", &self.namespaces.names())
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(config: Config) -> Arc<Self> {
        Arc::new(Runtime {
            id: NEXT_RUNTIME_ID.fetch_add(1, Ordering::Relaxed),
            config,
            globals: DashMap::new(),
            namespaces: NamespaceRegistry::new(),
            types: DashMap::new(),
            interrupted: Arc::new(AtomicBool::new(false)),
            locks: LockTable::new(),
            loader: RwLock::new(Arc::new(NoModuleLoader)),
            interceptor: RwLock::new(Arc::new(AcceptAll)),
            metrics: RwLock::new(None),
            debugger: RwLock::new(None),
        })
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn namespaces(&self) -> &NamespaceRegistry {
        &self.namespaces
    }

    pub(crate) fn locks(&self) -> &LockTable {
        &self.locks
    }

    // ------------------------------------------------------------------
    // Current namespace
    // ------------------------------------------------------------------

    /// This thread's current namespace.
    #[must_use]
    pub fn current_ns(&self) -> Symbol {
        with_context(self.id, |ctx| ctx.current_ns.clone())
    }

    /// Switch this thread to namespace `name`, creating it if needed.
    pub fn set_current_ns(&self, name: &str) -> Arc<Namespace> {
        let ns = self.namespaces.create(name);
        let sym = Symbol::new(name);
        with_context(self.id, |ctx| ctx.current_ns = sym);
        ns
    }

    #[must_use]
    pub fn current_namespace(&self) -> Arc<Namespace> {
        self.namespaces.create(self.current_ns().name())
    }

    // ------------------------------------------------------------------
    // Globals
    // ------------------------------------------------------------------

    /// Qualify `sym` into the current namespace unless it already names one.
    #[must_use]
    pub fn qualify(&self, sym: &Symbol) -> Symbol {
        if sym.is_qualified() {
            sym.clone()
        } else {
            sym.qualify(self.current_ns().name())
        }
    }

    #[must_use]
    pub fn lookup_global(&self, qualified: &Symbol) -> Option<Var> {
        self.globals.get(qualified).map(|entry| entry.value().clone())
    }

    /// Resolve `sym` to a global var.
    ///
    /// Qualified symbols go through the current namespace's aliases and
    /// then the global table. Unqualified symbols try the current
    /// namespace, then `core`.
    #[must_use]
    pub fn resolve_var(&self, sym: &Symbol) -> Option<Var> {
        let current = self.current_ns();
        if let Some(ns) = sym.namespace() {
            let target = self
                .namespaces
                .get(current.name())
                .and_then(|cur| cur.resolve_alias(ns));
            let qualified = match target {
                Some(target) => Symbol::with_namespace(&target, sym.name()),
                None => sym.clone(),
            };
            return self.lookup_global(&qualified);
        }
        self.lookup_global(&sym.qualify(current.name()))
            .or_else(|| self.lookup_global(&sym.qualify(CORE_NS)))
    }

    /// Current value of `var`, honouring this thread's dynamic bindings.
    #[must_use]
    pub fn var_value(&self, var: &Var) -> Value {
        if var.is_dynamic()
            && let Some(value) = with_context(self.id, |ctx| {
                ctx.dynamics
                    .get(var.name())
                    .and_then(|stack| stack.last().cloned())
            })
        {
            return value;
        }
        var.root()
    }

    /// Install `var` under its qualified name.
    ///
    /// Fails if an existing var is not overwritable, or if the target
    /// namespace is sealed and already defines the name.
    pub fn define(&self, var: Var) -> Result<Var> {
        let name = var.name().clone();
        if name.name() == NS_PSEUDO_VAR {
            return Err(Error::eval("*ns* is reserved and cannot be defined"));
        }
        let ns_name = name.namespace().unwrap_or(CORE_NS).to_string();
        let sealed = self.namespaces.is_sealed(&ns_name);
        // The shard stays locked from the overwrite check to the insert.
        match self.globals.entry(name) {
            Entry::Occupied(mut entry) => {
                if sealed {
                    return Err(Error::Security(format!(
                        "namespace '{}' is sealed: '{}' must not be overwritten",
                        ns_name,
                        entry.key()
                    )));
                }
                if !entry.get().is_overwritable() {
                    return Err(Error::eval(format!(
                        "global '{}' must not be overwritten",
                        entry.key()
                    )));
                }
                trace!(var = %entry.key(), "redefining global");
                entry.insert(var.clone());
            }
            Entry::Vacant(entry) => {
                if sealed {
                    return Err(Error::Security(format!(
                        "namespace '{}' is sealed: cannot define '{}'",
                        ns_name,
                        entry.key()
                    )));
                }
                self.namespaces.create(&ns_name);
                entry.insert(var.clone());
            }
        }
        Ok(var)
    }

    /// Remove a global. Sealed namespaces refuse.
    pub fn remove_global(&self, qualified: &Symbol) -> Result<bool> {
        let ns_name = qualified.namespace().unwrap_or(CORE_NS);
        if self.namespaces.is_sealed(ns_name) {
            return Err(Error::Security(format!(
                "namespace '{}' is sealed: cannot unmap '{}'",
                ns_name,
                qualified.name()
            )));
        }
        Ok(self.globals.remove(qualified).is_some())
    }

    /// Remove namespace `name` together with its vars.
    pub fn remove_namespace(&self, name: &str) -> Result<bool> {
        let current = self.current_ns();
        let removed = self.namespaces.remove(name, current.name())?;
        if removed {
            self.globals.retain(|sym, _| sym.namespace() != Some(name));
        }
        Ok(removed)
    }

    /// Qualified names of the vars in namespace `ns`, sorted.
    #[must_use]
    pub fn ns_vars(&self, ns: &str) -> Vec<Symbol> {
        let mut names: Vec<Symbol> = self
            .globals
            .iter()
            .filter(|entry| entry.key().namespace() == Some(ns))
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    // ------------------------------------------------------------------
    // Custom types
    // ------------------------------------------------------------------

    pub fn register_type(&self, ty: Arc<CustomType>) -> Result<()> {
        if let Some(existing) = self.types.get(&ty.name)
            && self
                .namespaces
                .is_sealed(ty.name.namespace().unwrap_or(CORE_NS))
        {
            return Err(Error::Security(format!(
                "type '{}' is already defined in a sealed namespace",
                existing.name
            )));
        }
        self.types.insert(ty.name.clone(), ty);
        Ok(())
    }

    #[must_use]
    pub fn lookup_type(&self, qualified: &Symbol) -> Option<Arc<CustomType>> {
        self.types.get(qualified).map(|entry| Arc::clone(entry.value()))
    }

    // ------------------------------------------------------------------
    // Interruption
    // ------------------------------------------------------------------

    #[must_use]
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupted)
    }

    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    pub fn clear_interrupt(&self) {
        self.interrupted.store(false, Ordering::SeqCst);
    }

    /// Fail if the host asked to stop or the sandbox's time budget is spent.
    pub fn check_interrupt(&self) -> Result<()> {
        if self.interrupted.load(Ordering::Relaxed) {
            debug!("interrupt observed");
            return Err(Error::Interrupted("evaluation interrupted".into()));
        }
        self.interceptor().validate_max_execution_time()
    }

    // ------------------------------------------------------------------
    // Collaborators
    // ------------------------------------------------------------------

    #[must_use]
    pub fn module_loader(&self) -> Arc<dyn ModuleLoader> {
        Arc::clone(&self.loader.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn set_module_loader(&self, loader: Arc<dyn ModuleLoader>) {
        *self.loader.write().unwrap_or_else(PoisonError::into_inner) = loader;
    }

    #[must_use]
    pub fn interceptor(&self) -> Arc<dyn SecurityInterceptor> {
        Arc::clone(
            &self
                .interceptor
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    pub fn set_interceptor(&self, interceptor: Arc<dyn SecurityInterceptor>) {
        *self
            .interceptor
            .write()
            .unwrap_or_else(PoisonError::into_inner) = interceptor;
    }

    #[must_use]
    pub fn metrics(&self) -> Option<Arc<dyn MetricsSink>> {
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_metrics(&self, sink: Option<Arc<dyn MetricsSink>>) {
        *self.metrics.write().unwrap_or_else(PoisonError::into_inner) = sink;
    }

    #[must_use]
    pub fn debugger(&self) -> Option<Arc<dyn DebugAgent>> {
        self.debugger
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_debugger(&self, agent: Option<Arc<dyn DebugAgent>>) {
        *self.debugger.write().unwrap_or_else(PoisonError::into_inner) = agent;
    }

    /// Report `label`'s elapsed time when metrics collection is on.
    pub(crate) fn record_since(&self, label: &str, start: Option<Instant>) {
        if let Some(start) = start
            && let Some(sink) = self.metrics()
        {
            let elapsed = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);
            sink.record(label, elapsed);
        }
    }

    /// Start time for a metrics sample, if collection is enabled.
    pub(crate) fn metrics_start(&self) -> Option<Instant> {
        (self.config.collect_metrics && self.metrics().is_some()).then(Instant::now)
    }

    // ------------------------------------------------------------------
    // Thread context helpers
    // ------------------------------------------------------------------

    /// This thread's call stack, most recent first.
    #[must_use]
    pub fn call_stack(&self) -> Vec<context::CallFrame> {
        with_context(self.id, |ctx| ctx.call_stack.to_list())
    }

    /// Drop every global and type. Closures stored in globals hold
    /// environments that point back at the runtime; clearing the table
    /// breaks those cycles so the runtime itself can be freed.
    pub(crate) fn release(&self) {
        debug!(runtime = self.id, globals = self.globals.len(), "releasing runtime");
        self.globals.clear();
        self.types.clear();
        discard_context(self.id);
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        discard_context(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_resolve() {
        let rt = Runtime::new(Config::default());
        let var = Var::new(Symbol::new("x").qualify("user"), Value::Int(1), true, None);
        rt.define(var).unwrap();
        let found = rt.resolve_var(&Symbol::new("x")).unwrap();
        assert_eq!(rt.var_value(&found), Value::Int(1));
        assert!(rt.resolve_var(&Symbol::parse("user/x")).is_some());
        assert!(rt.resolve_var(&Symbol::new("y")).is_none());
    }

    #[test]
    fn test_non_overwritable() {
        let rt = Runtime::new(Config::default());
        let name = Symbol::new("pi").qualify("user");
        rt.define(Var::new(name.clone(), Value::Float(2.5), false, None))
            .unwrap();
        let err = rt
            .define(Var::new(name, Value::Int(3), true, None))
            .unwrap_err();
        assert!(err.to_string().contains("must not be overwritten"));
    }

    #[test]
    fn test_sealed_namespace() {
        let rt = Runtime::new(Config::default());
        rt.define(Var::new(Symbol::new("inc").qualify("core"), Value::Nil, true, None))
            .unwrap();
        rt.namespaces().seal(CORE_NS);
        let err = rt
            .define(Var::new(Symbol::new("inc").qualify("core"), Value::Int(0), true, None))
            .unwrap_err();
        assert!(matches!(err, Error::Security(_)));
        assert!(rt.remove_global(&Symbol::parse("core/inc")).is_err());
    }

    #[test]
    fn test_alias_resolution() {
        let rt = Runtime::new(Config::default());
        rt.define(Var::new(Symbol::parse("strings/upper"), Value::Int(1), true, None))
            .unwrap();
        rt.current_namespace().add_alias("s", "strings");
        assert!(rt.resolve_var(&Symbol::parse("s/upper")).is_some());
    }

    #[test]
    fn test_interrupt() {
        let rt = Runtime::new(Config::default());
        assert!(rt.check_interrupt().is_ok());
        rt.interrupt();
        assert!(matches!(rt.check_interrupt(), Err(Error::Interrupted(_))));
        rt.clear_interrupt();
        assert!(rt.check_interrupt().is_ok());
    }
}
