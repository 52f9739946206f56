// vesper-core - Per-thread execution context
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Per-thread execution state: call stack, dynamic var overlays, current
//! namespace and evaluation depth.
//!
//! Each interpreter runtime has its own context on every thread that
//! evaluates with it, so several interpreters can share a thread without
//! seeing each other's state. Access goes through [`with_context`]; the
//! closure must not evaluate code (the context is borrowed while it runs).

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use vesper_parser::{Symbol, Value, print};

use crate::runtime::Runtime;

/// Diagnostic record of one active function invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct CallFrame {
    pub fn_name: String,
    pub args: Vec<Value>,
    pub file: Option<String>,
    pub line: Option<i64>,
    pub column: Option<i64>,
}

impl CallFrame {
    pub fn new(fn_name: impl Into<String>, args: &[Value], form_meta: Option<&Value>) -> Self {
        let (file, line, column) = match form_meta {
            Some(form) => (
                match form.meta_get("file") {
                    Some(Value::String(s)) => Some(s.to_string()),
                    _ => None,
                },
                form.line(),
                form.column(),
            ),
            None => (None, None, None),
        };
        CallFrame {
            fn_name: fn_name.into(),
            args: args.to_vec(),
            file,
            line,
            column,
        }
    }
}

impl fmt::Display for CallFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fn_name)?;
        match (&self.file, self.line, self.column) {
            (Some(file), Some(line), Some(col)) => write!(f, " ({}:{}:{})", file, line, col),
            (None, Some(line), Some(col)) => write!(f, " (line {}, column {})", line, col),
            _ => Ok(()),
        }
    }
}

/// Insertion-ordered stack of frames; the most recent call is last.
#[derive(Debug, Clone, Default)]
pub struct CallStack {
    frames: Vec<CallFrame>,
}

impl CallStack {
    pub fn push(&mut self, frame: CallFrame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<CallFrame> {
        self.frames.pop()
    }

    #[must_use]
    pub fn peek(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Frames most recent first, as rendered in backtraces.
    #[must_use]
    pub fn to_list(&self) -> Vec<CallFrame> {
        self.frames.iter().rev().cloned().collect()
    }

    /// Backtrace lines, most recent first.
    #[must_use]
    pub fn render(&self) -> Vec<String> {
        self.frames
            .iter()
            .rev()
            .map(|frame| {
                let args: Vec<String> = frame.args.iter().map(print).collect();
                format!("{} [{}]", frame, args.join(" "))
            })
            .collect()
    }
}

/// State owned by one thread for one interpreter runtime.
#[derive(Debug)]
pub struct ThreadContext {
    pub call_stack: CallStack,
    /// Pushed values of dynamic vars, keyed by qualified name
    pub dynamics: HashMap<Symbol, Vec<Value>>,
    pub current_ns: Symbol,
    pub depth: usize,
    /// Snapshot of the call stack taken where the in-flight error was raised
    pub pending_stack: Option<Vec<CallFrame>>,
}

impl ThreadContext {
    fn new() -> Self {
        ThreadContext {
            call_stack: CallStack::default(),
            dynamics: HashMap::new(),
            current_ns: Symbol::new(crate::namespace::USER_NS),
            depth: 0,
            pending_stack: None,
        }
    }
}

thread_local! {
    static CONTEXTS: RefCell<HashMap<u64, ThreadContext>> = RefCell::new(HashMap::new());
}

/// Run `f` with this thread's context for runtime `id`, creating it on
/// first use.
pub fn with_context<R>(id: u64, f: impl FnOnce(&mut ThreadContext) -> R) -> R {
    CONTEXTS.with(|contexts| {
        let mut contexts = contexts.borrow_mut();
        f(contexts.entry(id).or_insert_with(ThreadContext::new))
    })
}

thread_local! {
    static ACTIVE_RUNTIMES: RefCell<Vec<Arc<Runtime>>> = const { RefCell::new(Vec::new()) };
}

/// Marks `runtime` as the one running native code on this thread until
/// dropped. Natives that call back into functions (`map`, `swap!`, ...)
/// find it through [`active_runtime`].
pub(crate) struct ActiveRuntime;

impl ActiveRuntime {
    pub(crate) fn enter(runtime: &Arc<Runtime>) -> Self {
        ACTIVE_RUNTIMES.with(|stack| stack.borrow_mut().push(Arc::clone(runtime)));
        ActiveRuntime
    }
}

impl Drop for ActiveRuntime {
    fn drop(&mut self) {
        let _ = ACTIVE_RUNTIMES.try_with(|stack| stack.borrow_mut().pop());
    }
}

/// Runtime of the innermost native call on this thread.
pub(crate) fn active_runtime() -> Option<Arc<Runtime>> {
    ACTIVE_RUNTIMES.with(|stack| stack.borrow().last().cloned())
}

/// Drop this thread's context for runtime `id`.
pub fn discard_context(id: u64) {
    // May run during thread teardown, after the thread local is gone.
    let _ = CONTEXTS.try_with(|contexts| {
        if let Ok(mut contexts) = contexts.try_borrow_mut() {
            contexts.remove(&id);
        }
    });
}

/// Pops the most recent call frame when dropped.
pub(crate) struct FrameGuard {
    id: u64,
}

impl FrameGuard {
    pub(crate) fn push(id: u64, frame: CallFrame) -> Self {
        with_context(id, |ctx| ctx.call_stack.push(frame));
        FrameGuard { id }
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        with_context(self.id, |ctx| {
            ctx.call_stack.pop();
        });
    }
}

/// Restores the current namespace when dropped.
pub(crate) struct NsGuard {
    id: u64,
    previous: Symbol,
}

impl NsGuard {
    /// Switch to `ns` for the guard's lifetime.
    pub(crate) fn switch(id: u64, ns: Symbol) -> Self {
        let previous = with_context(id, |ctx| std::mem::replace(&mut ctx.current_ns, ns));
        NsGuard { id, previous }
    }
}

impl Drop for NsGuard {
    fn drop(&mut self) {
        let previous = self.previous.clone();
        with_context(self.id, |ctx| ctx.current_ns = previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_stack_order() {
        let mut stack = CallStack::default();
        stack.push(CallFrame::new("user/outer", &[], None));
        stack.push(CallFrame::new("user/inner", &[Value::Int(1)], None));
        let list = stack.to_list();
        assert_eq!(list[0].fn_name, "user/inner");
        assert_eq!(list[1].fn_name, "user/outer");
        assert_eq!(stack.render()[0], "user/inner [1]");
    }

    #[test]
    fn test_contexts_are_per_runtime() {
        with_context(9001, |ctx| ctx.current_ns = Symbol::new("alpha"));
        with_context(9002, |ctx| assert_eq!(ctx.current_ns.name(), "user"));
        with_context(9001, |ctx| assert_eq!(ctx.current_ns.name(), "alpha"));
        discard_context(9001);
        with_context(9001, |ctx| assert_eq!(ctx.current_ns.name(), "user"));
        discard_context(9001);
        discard_context(9002);
    }

    #[test]
    fn test_guards_restore_state() {
        let id = 9003;
        {
            let _ns = NsGuard::switch(id, Symbol::new("beta"));
            let _frame = FrameGuard::push(id, CallFrame::new("user/f", &[], None));
            with_context(id, |ctx| {
                assert_eq!(ctx.current_ns.name(), "beta");
                assert_eq!(ctx.call_stack.len(), 1);
            });
        }
        with_context(id, |ctx| {
            assert_eq!(ctx.current_ns.name(), "user");
            assert!(ctx.call_stack.is_empty());
        });
        discard_context(id);
    }
}
