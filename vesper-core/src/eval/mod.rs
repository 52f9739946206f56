// vesper-core - AST-walking evaluator
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! AST-walking evaluator for Vesper expressions.
//!
//! Evaluation is a trampoline: [`run`] keeps a current form and
//! environment and loops instead of recursing whenever a form is in tail
//! position. Special forms report either a finished value or the next
//! form to evaluate ([`Step`]); `recur` and self tail calls rebind into a
//! fresh environment and continue the same loop, so neither grows the
//! native stack.
//!
//! Forms that are not in tail position go through [`eval`], which guards
//! the recursion depth.

// Values hash by identity for their interior-mutable variants.
#![allow(clippy::mutable_key_type)]

pub mod destructuring;
mod dynamic;
mod exceptions;
pub mod functions;
pub mod macros;
mod multimethods;
mod namespaces;
mod quasiquote;
pub mod special_forms;
mod types;

pub use destructuring::{Bindings, destructure, destructure_with};
pub use functions::{NativeFnImpl, apply, make_native_fn};
pub use macros::{macroexpand, macroexpand_all};
pub use special_forms::SpecialForm;

use std::sync::Arc;

use tracing::{debug, trace};
use vesper_parser::{Symbol, Value, Vector, VesperFn, read_all, print};

use crate::context::with_context;
use crate::env::Env;
use crate::error::{Error, Result};
use crate::runtime::Runtime;

// ============================================================================
// Stack overflow protection
// ============================================================================

/// RAII guard counting nested evaluation depth on this thread.
/// Remaining native stack below which evaluation moves to a fresh segment.
const STACK_RED_ZONE: usize = 128 * 1024;
/// Size of each additional stack segment.
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

/// Run `f` with enough native stack for another level of evaluation, so
/// deep recursion ends at `max_depth` rather than overflowing the thread.
pub(crate) fn with_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, f)
}

pub(crate) struct DepthGuard {
    id: u64,
}

impl DepthGuard {
    pub(crate) fn enter(runtime: &Runtime) -> Result<Self> {
        let id = runtime.id();
        let max = runtime.config().max_depth;
        let depth = with_context(id, |ctx| {
            ctx.depth += 1;
            ctx.depth
        });
        if depth > max {
            with_context(id, |ctx| ctx.depth = ctx.depth.saturating_sub(1));
            return Err(Error::eval(format!(
                "stack overflow: maximum recursion depth ({}) exceeded",
                max
            )));
        }
        Ok(DepthGuard { id })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        with_context(self.id, |ctx| ctx.depth = ctx.depth.saturating_sub(1));
    }
}

// ============================================================================
// Trampoline state
// ============================================================================

/// Target of `recur`: the binding patterns of a `loop` or function arity,
/// its body and the environment new iterations are bound in.
pub(crate) struct RecursionPoint {
    pub patterns: Vec<Value>,
    pub body: Vector<Value>,
    pub env: Env,
    /// Function self-reference re-established on every iteration
    pub self_binding: Option<(Symbol, Value)>,
    /// `loop` or the function's name, for error messages
    pub owner: String,
}

/// Tail context of the form currently being evaluated by [`run`].
#[derive(Default)]
pub(crate) struct Frame {
    pub recur: Option<Arc<RecursionPoint>>,
    /// Function whose body is being evaluated; a tail call to it is
    /// turned into a jump.
    pub tail_fn: Option<VesperFn>,
}

/// Outcome of one special form.
pub(crate) enum Step {
    Done(Value),
    /// Evaluate this form next, in tail position
    Continue(Value, Env),
}

/// Evaluate all but the last body form and continue with the last one.
pub(crate) fn tail_body(body: &Vector<Value>, env: Env) -> Result<Step> {
    let Some(last) = body.last() else {
        return Ok(Step::Done(Value::Nil));
    };
    for form in body.iter().take(body.len() - 1) {
        eval(form, &env)?;
    }
    Ok(Step::Continue(last.clone(), env))
}

/// Evaluate a body outside tail position.
pub(crate) fn eval_body(body: &[Value], env: &Env) -> Result<Value> {
    let mut result = Value::Nil;
    for form in body {
        result = eval(form, env)?;
    }
    Ok(result)
}

// ============================================================================
// Entry points
// ============================================================================

/// Evaluate a form in `env`.
///
/// ```
/// use vesper_core::{Interpreter, eval};
/// use vesper_parser::{Value, read};
///
/// let interp = Interpreter::new().unwrap();
/// let form = read("(let [x 10 y 20] (+ x y))", "doc").unwrap();
/// assert_eq!(eval(&form, interp.env()).unwrap(), Value::int(30));
/// ```
///
/// # Errors
///
/// Any language error raised by the form. Errors are returned as raised;
/// see [`eval_toplevel`] for the variant that attaches a call stack.
pub fn eval(form: &Value, env: &Env) -> Result<Value> {
    let _depth = DepthGuard::enter(env.runtime())?;
    with_stack(|| run(form.clone(), env.clone(), Frame::default()))
}

/// Evaluate a form for the host: errors that escape carry the call stack
/// captured where they were raised.
pub fn eval_toplevel(form: &Value, env: &Env) -> Result<Value> {
    let runtime = Arc::clone(env.runtime());
    let id = runtime.id();
    with_context(id, |ctx| ctx.pending_stack = None);
    let form = if runtime.config().macroexpand_on_load {
        macroexpand_all(form, env)?
    } else {
        form.clone()
    };
    eval(&form, env).map_err(|err| {
        let stack = with_context(id, |ctx| ctx.pending_stack.take()).unwrap_or_default();
        debug!(error = %err, frames = stack.len(), "uncaught error");
        match err {
            Error::Uncaught { .. } => err,
            other => Error::Uncaught {
                source: Box::new(other),
                stack,
            },
        }
    })
}

/// Read and evaluate every form in `text`, returning the last value.
pub fn eval_source(text: &str, source_name: &str, env: &Env) -> Result<Value> {
    let mut parser = vesper_parser::Parser::new(text, source_name)?;
    let mut result = Value::Nil;
    while let Some(form) = parser.parse()? {
        result = eval_toplevel(&form, env)?;
    }
    Ok(result)
}

/// Read, evaluate and print: the printed value of the last form.
pub fn read_eval_print(text: &str, source_name: &str, env: &Env) -> Result<String> {
    let forms = read_all(text, source_name)?;
    let mut result = Value::Nil;
    for form in &forms {
        result = eval_toplevel(form, env)?;
    }
    Ok(print(&result))
}

/// Record the call stack for the error now unwinding, unless an inner
/// frame already did.
pub(crate) fn capture_pending_stack(id: u64) {
    with_context(id, |ctx| {
        if ctx.pending_stack.is_none() {
            ctx.pending_stack = Some(ctx.call_stack.to_list());
        }
    });
}

// ============================================================================
// The trampoline
// ============================================================================

pub(crate) fn run(mut form: Value, mut env: Env, mut frame: Frame) -> Result<Value> {
    loop {
        let items = match &form {
            Value::List(items, _) if !items.is_empty() => items.clone(),
            _ => return eval_simple(&form, &env),
        };
        let head = &items[0];

        if let Value::Symbol(sym, _) = head
            && let Some(special) = SpecialForm::from_symbol(sym)
        {
            match special_forms::dispatch(special, &items, &env, &mut frame)? {
                Step::Done(value) => return Ok(value),
                Step::Continue(next, next_env) => {
                    form = next;
                    env = next_env;
                    continue;
                }
            }
        }

        let callee = eval(head, &env)?;

        if let Value::Fn(f) = &callee
            && f.is_macro()
        {
            let args: Vec<Value> = items.iter().skip(1).cloned().collect();
            let expansion = functions::invoke_fn(f, args, Some(&form))?;
            trace!(macro_name = %f.display_name(), "expanded macro");
            match expansion {
                Value::List(..) => {
                    form = expansion;
                    continue;
                }
                other => return eval_simple(&other, &env),
            }
        }

        let mut args = Vec::with_capacity(items.len() - 1);
        for arg in items.iter().skip(1) {
            args.push(eval(arg, &env)?);
        }

        match &callee {
            Value::Fn(f) => {
                if let Some(tail) = &frame.tail_fn
                    && tail.ptr_eq(f)
                {
                    env.runtime().check_interrupt()?;
                    trace!(function = %f.display_name(), "tail call reuses frame");
                    let (fn_env, point) = functions::bind_call(f, args)?;
                    let body = point.body.clone();
                    frame.recur = Some(point);
                    match tail_body(&body, fn_env)? {
                        Step::Done(value) => return Ok(value),
                        Step::Continue(next, next_env) => {
                            form = next;
                            env = next_env;
                            continue;
                        }
                    }
                }
                return functions::invoke_fn(f, args, Some(&form));
            }
            Value::NativeFn(native) => {
                return functions::call_native_checked(env.runtime(), native, &args);
            }
            other => return functions::apply_in(env.runtime(), other, &args),
        }
    }
}

/// Evaluate a form that is not a non-empty list.
fn eval_simple(form: &Value, env: &Env) -> Result<Value> {
    match form {
        Value::Symbol(sym, _) => env.get(sym),
        Value::Vector(items, _) => {
            let mut out = Vector::new();
            for item in items {
                out.push_back(eval(item, env)?);
            }
            Ok(Value::Vector(out, None))
        }
        Value::Map(map, _) => {
            let mut pairs = Vec::with_capacity(map.len());
            for (k, v) in map {
                pairs.push((eval(k, env)?, eval(v, env)?));
            }
            Ok(Value::map(pairs))
        }
        Value::Set(items, _) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(eval(item, env)?);
            }
            Ok(Value::set(out))
        }
        Value::List(items, _) if items.is_empty() => Ok(Value::empty_list()),
        other => Ok(other.clone()),
    }
}
