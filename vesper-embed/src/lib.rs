// vesper-embed - Embedding API for Vesper
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # vesper-embed
//!
//! A small embedding API for the Vesper language: evaluate code, move
//! values between Rust and Vesper, register host functions and plug in
//! module loading and sandboxing.
//!
//! ## Quick Start
//!
//! ```rust
//! use vesper_embed::Engine;
//!
//! let engine = Engine::new().unwrap();
//! engine.set("rate", 0.25).unwrap();
//! let tax: f64 = engine.eval_as("(* rate 200)").unwrap();
//! assert_eq!(tax, 50.0);
//! ```
//!
//! ## Sandboxing
//!
//! ```rust
//! use std::sync::Arc;
//! use vesper_embed::{Engine, Sandbox};
//!
//! let engine = Engine::new().unwrap();
//! engine.set_interceptor(Arc::new(Sandbox::new().deny_function("println")));
//! let err = engine.eval("(println \"hi\")").unwrap_err();
//! assert!(err.is_a("SecurityException"));
//! ```

mod convert;
mod engine;

pub use convert::{FromValue, IntoValue, from_value, to_value};
pub use engine::Engine;

// Re-export core types for convenience
pub use vesper_core::interceptor::{
    MapModuleLoader, MemoryMetrics, MetricsSink, ModuleLoader, Sandbox, SecurityInterceptor,
};
pub use vesper_core::{Config, Error, Result};
pub use vesper_parser::{Decimal, Keyword, Symbol, Value};
