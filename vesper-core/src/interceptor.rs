// vesper-core - Collaborator interfaces for embedding hosts
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Collaborators the interpreter consults but does not implement itself:
//! module loading, sandboxing, metrics and debugging hooks.
//!
//! Each collaborator is a trait object installed on the
//! [`Interpreter`](crate::Interpreter). Sensible defaults are provided
//! ([`NoModuleLoader`], [`AcceptAll`]) alongside small reference
//! implementations useful for tests and simple hosts.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tracing::warn;
use vesper_parser::Value;

use crate::error::{Error, Result};

// ============================================================================
// Module loading
// ============================================================================

/// Source of module text for `load-module`.
pub trait ModuleLoader: Send + Sync {
    /// Return the source text of module `name`.
    fn load(&self, name: &str) -> Result<String>;
}

/// Loader that knows no modules.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoModuleLoader;

impl ModuleLoader for NoModuleLoader {
    fn load(&self, name: &str) -> Result<String> {
        Err(Error::eval(format!("module '{}' not found", name)))
    }
}

/// In-memory module table.
#[derive(Debug, Default)]
pub struct MapModuleLoader {
    modules: RwLock<HashMap<String, String>>,
}

impl MapModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_module(self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(name, source);
        self
    }

    pub fn insert(&self, name: impl Into<String>, source: impl Into<String>) {
        self.modules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), source.into());
    }
}

impl ModuleLoader for MapModuleLoader {
    fn load(&self, name: &str) -> Result<String> {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| Error::eval(format!("module '{}' not found", name)))
    }
}

// ============================================================================
// Security
// ============================================================================

/// Gatekeeper consulted before native calls, module loads and on every
/// loop iteration.
pub trait SecurityInterceptor: Send + Sync {
    fn validate_function_call(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    fn validate_load_module(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    fn validate_max_execution_time(&self) -> Result<()> {
        Ok(())
    }
}

/// Interceptor that permits everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl SecurityInterceptor for AcceptAll {}

/// Deny-list sandbox with an optional wall clock limit.
///
/// ```
/// use std::time::Duration;
/// use vesper_core::interceptor::{Sandbox, SecurityInterceptor};
///
/// let sandbox = Sandbox::new()
///     .deny_function("println")
///     .with_max_execution_time(Duration::from_secs(5));
/// assert!(sandbox.validate_function_call("println").is_err());
/// assert!(sandbox.validate_function_call("+").is_ok());
/// ```
#[derive(Debug, Default, Clone)]
pub struct Sandbox {
    denied_functions: HashSet<String>,
    denied_modules: HashSet<String>,
    deadline: Option<Instant>,
}

impl Sandbox {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn deny_function(mut self, name: impl Into<String>) -> Self {
        self.denied_functions.insert(name.into());
        self
    }

    #[must_use]
    pub fn deny_module(mut self, name: impl Into<String>) -> Self {
        self.denied_modules.insert(name.into());
        self
    }

    /// Fail execution once `limit` has elapsed from now.
    #[must_use]
    pub fn with_max_execution_time(mut self, limit: Duration) -> Self {
        self.deadline = Some(Instant::now() + limit);
        self
    }
}

impl SecurityInterceptor for Sandbox {
    fn validate_function_call(&self, name: &str) -> Result<()> {
        let bare = name.rsplit('/').next().unwrap_or(name);
        if self.denied_functions.contains(name) || self.denied_functions.contains(bare) {
            warn!(function = name, "sandbox rejected function call");
            return Err(Error::Security(format!(
                "access denied to function '{}'",
                name
            )));
        }
        Ok(())
    }

    fn validate_load_module(&self, name: &str) -> Result<()> {
        if self.denied_modules.contains(name) {
            warn!(module = name, "sandbox rejected module load");
            return Err(Error::Security(format!("access denied to module '{}'", name)));
        }
        Ok(())
    }

    fn validate_max_execution_time(&self) -> Result<()> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                warn!("sandbox execution time limit exceeded");
                Err(Error::Security("maximum execution time exceeded".into()))
            }
            _ => Ok(()),
        }
    }
}

// ============================================================================
// Metrics
// ============================================================================

/// Receiver for timing samples.
pub trait MetricsSink: Send + Sync {
    fn record(&self, label: &str, elapsed_ns: u64);
}

/// Accumulates `(count, total_ns)` per label.
#[derive(Debug, Default)]
pub struct MemoryMetrics {
    samples: Mutex<HashMap<String, (u64, u64)>>,
}

impl MemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn count(&self, label: &str) -> u64 {
        self.snapshot().get(label).map_or(0, |(count, _)| *count)
    }

    #[must_use]
    pub fn total_ns(&self, label: &str) -> u64 {
        self.snapshot().get(label).map_or(0, |(_, total)| *total)
    }

    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, (u64, u64)> {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl MetricsSink for MemoryMetrics {
    fn record(&self, label: &str, elapsed_ns: u64) {
        let mut samples = self.samples.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = samples.entry(label.to_string()).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += elapsed_ns;
    }
}

// ============================================================================
// Debugging
// ============================================================================

/// Breakpoint hooks around function calls and special forms. Hooks only
/// fire for names where [`DebugAgent::has_breakpoint`] returns true.
pub trait DebugAgent: Send + Sync {
    fn has_breakpoint(&self, name: &str) -> bool;

    fn on_enter(&self, _name: &str, _args: &[Value]) {}

    fn on_exit(&self, _name: &str, _result: &Value) {}

    fn on_exception(&self, _name: &str, _error: &Error) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_loader() {
        let loader = MapModuleLoader::new().with_module("math", "(def pi 3.14)");
        assert_eq!(loader.load("math").unwrap(), "(def pi 3.14)");
        assert!(loader.load("missing").is_err());
        assert!(NoModuleLoader.load("math").is_err());
    }

    #[test]
    fn test_sandbox_matches_qualified_names() {
        let sandbox = Sandbox::new().deny_function("slurp").deny_module("io");
        assert!(matches!(
            sandbox.validate_function_call("core/slurp"),
            Err(Error::Security(_))
        ));
        assert!(sandbox.validate_load_module("io").is_err());
        assert!(sandbox.validate_load_module("math").is_ok());
    }

    #[test]
    fn test_sandbox_deadline() {
        let sandbox = Sandbox::new().with_max_execution_time(Duration::ZERO);
        assert!(sandbox.validate_max_execution_time().is_err());
        assert!(AcceptAll.validate_max_execution_time().is_ok());
    }

    #[test]
    fn test_memory_metrics() {
        let metrics = MemoryMetrics::new();
        metrics.record("let", 10);
        metrics.record("let", 5);
        assert_eq!(metrics.count("let"), 2);
        assert_eq!(metrics.total_ns("let"), 15);
        assert_eq!(metrics.count("if"), 0);
    }
}
