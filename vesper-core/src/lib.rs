// vesper-core - Runtime and evaluator for the Vesper language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # vesper-core
//!
//! Runtime and evaluator for the Vesper language: environments and
//! namespaces, dynamic vars, destructuring, the function call protocol,
//! the tail-call trampoline, special forms and a small set of core
//! functions.
//!
//! Most hosts only need [`Interpreter`]:
//!
//! ```
//! use vesper_core::Interpreter;
//!
//! let interp = Interpreter::new().unwrap();
//! let printed = interp
//!     .read_eval_print("(let [{:keys [a b]} {:a 1 :b 2}] [b a])")
//!     .unwrap();
//! assert_eq!(printed, "[2 1]");
//! ```

pub mod builtins;
pub mod config;
pub mod context;
pub mod env;
pub mod error;
pub mod eval;
pub mod interceptor;
mod interpreter;
mod locking;
pub mod namespace;
pub mod runtime;

pub use builtins::register_builtins;
pub use config::Config;
pub use context::{CallFrame, CallStack};
pub use env::Env;
pub use error::{AritySpec, Error, Result};
pub use eval::{
    NativeFnImpl, SpecialForm, apply, destructure, eval, eval_source, eval_toplevel,
    macroexpand, macroexpand_all, make_native_fn, read_eval_print,
};
pub use interpreter::Interpreter;
pub use namespace::{Namespace, NamespaceRegistry};
pub use runtime::Runtime;

// Re-export parser types for convenience
pub use vesper_parser::{Keyword, Symbol, Value};
