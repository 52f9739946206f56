// vesper-core - Function construction and application
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Building closures from `fn` forms and calling them.
//!
//! A call selects the arity by argument count, switches to the defining
//! namespace (macros excepted), pushes a diagnostic call frame when the
//! function is named or the call site has a position, binds the
//! parameters, checks `:pre` conditions and evaluates the body in tail
//! context so self calls become jumps.

use std::any::Any;
use std::sync::Arc;

use vesper_parser::{FnArity, FnDef, Meta, NativeFn, Symbol, Value, Vector, VesperFn, print};

use super::destructuring::destructure_with;
use super::{
    DepthGuard, Frame, RecursionPoint, Step, capture_pending_stack, eval, run, tail_body, with_stack,
};
use crate::builtins::collections::lookup;
use crate::context::{ActiveRuntime, CallFrame, FrameGuard, NsGuard, active_runtime};
use crate::env::Env;
use crate::error::{AritySpec, Error, Result};
use crate::runtime::Runtime;

/// Native function signature.
pub type NativeFnImpl = dyn Fn(&[Value]) -> Result<Value> + Send + Sync;

/// Create a native function value.
pub fn make_native_fn(
    name: &str,
    func: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
) -> NativeFn {
    let func: Arc<NativeFnImpl> = Arc::new(func);
    let func_any: Arc<dyn Any + Send + Sync> = Arc::new(func);
    NativeFn::new(name, func_any)
}

pub(crate) fn call_native(native: &NativeFn, args: &[Value]) -> Result<Value> {
    let f = native
        .func()
        .downcast_ref::<Arc<NativeFnImpl>>()
        .ok_or_else(|| {
            Error::eval(format!(
                "native function '{}' has an invalid implementation",
                native.name()
            ))
        })?;
    f(args)
}

/// Native call from the evaluator: interrupt and sandbox checks first.
/// The runtime stays active for the duration so natives that call back
/// into functions are checked the same way.
pub(crate) fn call_native_checked(
    runtime: &Arc<Runtime>,
    native: &NativeFn,
    args: &[Value],
) -> Result<Value> {
    runtime.check_interrupt()?;
    runtime.interceptor().validate_function_call(native.name())?;
    let _active = ActiveRuntime::enter(runtime);
    let start = runtime.metrics_start();
    let result = call_native(native, args);
    runtime.record_since(native.name(), start);
    result
}

/// Apply a function (or other callable value) to evaluated arguments.
///
/// Native functions go through the sandbox of the runtime running the
/// current native call, or of the closure being applied. With neither
/// (host code calling a bare native) the call is unchecked.
pub fn apply(func: &Value, args: &[Value]) -> Result<Value> {
    let runtime = active_runtime().or_else(|| match func {
        Value::Fn(f) => closure_env(f).ok().map(|env| Arc::clone(env.runtime())),
        _ => None,
    });
    match runtime {
        Some(runtime) => apply_in(&runtime, func, args),
        None => apply_with(None, func, args),
    }
}

/// Apply `func` with native calls checked against `runtime`.
pub(crate) fn apply_in(runtime: &Arc<Runtime>, func: &Value, args: &[Value]) -> Result<Value> {
    apply_with(Some(runtime), func, args)
}

fn apply_with(runtime: Option<&Arc<Runtime>>, func: &Value, args: &[Value]) -> Result<Value> {
    match func {
        Value::Fn(f) => invoke_fn(f, args.to_vec(), None),
        Value::NativeFn(native) => match runtime {
            Some(runtime) => call_native_checked(runtime, native, args),
            None => call_native(native, args),
        },
        Value::MultiFn(multi) => {
            let dispatch_val = apply_with(runtime, multi.dispatch(), args)?;
            let method = multi.get_method(&dispatch_val).ok_or_else(|| {
                Error::eval(format!(
                    "no method in multifunction '{}' for dispatch value {}",
                    multi.name(),
                    print(&dispatch_val)
                ))
            })?;
            apply_with(runtime, &method, args)
        }
        Value::Keyword(_) => match args {
            [coll] => Ok(lookup(coll, func).unwrap_or(Value::Nil)),
            [coll, default] => Ok(lookup(coll, func).unwrap_or_else(|| default.clone())),
            _ => Err(Error::arity_range(func.to_string(), 1, 2, args.len())),
        },
        Value::Map(..) | Value::Set(..) => match args {
            [key] => Ok(lookup(func, key).unwrap_or(Value::Nil)),
            [key, default] => Ok(lookup(func, key).unwrap_or_else(|| default.clone())),
            _ => Err(Error::arity_range(func.type_name(), 1, 2, args.len())),
        },
        Value::Vector(items, _) => match args {
            [Value::Int(i)] => usize::try_from(*i)
                .ok()
                .and_then(|i| items.get(i).cloned())
                .ok_or_else(|| Error::eval(format!("index {} out of bounds", i))),
            [other] => Err(Error::type_error_in("vector", "long", other.type_name())),
            _ => Err(Error::arity_named("vector", 1, args.len())),
        },
        Value::Var(var) => apply_with(runtime, &var.root(), args),
        other => Err(Error::eval(format!(
            "{} of type {} is not a function",
            print(other),
            other.type_name()
        ))),
    }
}

// ============================================================================
// Construction
// ============================================================================

/// Symbol naming a definition, looking through `(with-meta sym meta)`.
pub(crate) fn name_symbol(form: &Value) -> Option<&Symbol> {
    match form {
        Value::Symbol(sym, _) => Some(sym),
        Value::List(items, _) if items.len() == 3 && items[0].is_symbol_named("with-meta") => {
            items[1].as_symbol()
        }
        _ => None,
    }
}

/// Split a parameter vector into positional patterns and the rest pattern.
fn parse_params(params: &Value) -> Result<(Vec<Value>, Option<Value>)> {
    let Value::Vector(items, _) = params else {
        return Err(Error::syntax(
            "fn",
            format!("parameter list must be a vector, got {}", params.type_name()),
        ));
    };
    let mut positional = Vec::new();
    let mut iter = items.iter();
    while let Some(item) = iter.next() {
        if item.is_symbol_named("&") {
            let rest = iter
                .next()
                .ok_or_else(|| Error::syntax("fn", "& must be followed by a parameter"))?;
            if iter.next().is_some() {
                return Err(Error::syntax("fn", "only one parameter may follow &"));
            }
            return Ok((positional, Some(rest.clone())));
        }
        positional.push(item.clone());
    }
    Ok((positional, None))
}

/// One arity from its parameter vector and body. A leading condition map
/// `{:pre [...] :post [...]}` is only recognised when a body follows it.
pub fn parse_arity(params: &Value, body: &[Value]) -> Result<FnArity> {
    let (positional, rest) = parse_params(params)?;
    let (conditions, body) = match body {
        [Value::Map(map, _), rest @ ..]
            if !rest.is_empty()
                && (map.contains_key(&Value::keyword("pre"))
                    || map.contains_key(&Value::keyword("post"))) =>
        {
            (Some(map.clone()), rest)
        }
        _ => (None, body),
    };
    let mut arity = FnArity::new(positional, rest, body.iter().cloned().collect());
    if let Some(conditions) = conditions {
        arity.preconditions = condition_forms(conditions.get(&Value::keyword("pre")))?;
        arity.postconditions = condition_forms(conditions.get(&Value::keyword("post")))?;
    }
    Ok(arity)
}

fn condition_forms(value: Option<&Value>) -> Result<Vec<Value>> {
    match value {
        None => Ok(Vec::new()),
        Some(Value::Vector(items, _)) => Ok(items.iter().cloned().collect()),
        Some(other) => Err(Error::syntax(
            "fn",
            format!("conditions must be a vector, got {}", other.type_name()),
        )),
    }
}

/// Build a single-arity function.
pub fn build_function(
    name: Option<Symbol>,
    params: &Value,
    body: Vector<Value>,
    preconditions: Vec<Value>,
    is_macro: bool,
    meta: Option<Arc<Meta>>,
    env: &Env,
) -> Result<VesperFn> {
    let (positional, rest) = parse_params(params)?;
    let mut arity = FnArity::new(positional, rest, body);
    arity.preconditions = preconditions;
    build_multi_arity(name, vec![arity], is_macro, meta, env)
}

/// Build a function from several arities, validating that they can be
/// told apart by argument count.
pub fn build_multi_arity(
    name: Option<Symbol>,
    arities: Vec<FnArity>,
    is_macro: bool,
    meta: Option<Arc<Meta>>,
    env: &Env,
) -> Result<VesperFn> {
    if arities.is_empty() {
        return Err(Error::syntax("fn", "at least one arity is required"));
    }
    let variadic: Vec<&FnArity> = arities.iter().filter(|a| a.is_variadic()).collect();
    if variadic.len() > 1 {
        return Err(Error::syntax("fn", "only one variadic arity is allowed"));
    }
    let mut fixed: Vec<usize> = arities
        .iter()
        .filter(|a| !a.is_variadic())
        .map(FnArity::required)
        .collect();
    fixed.sort_unstable();
    if fixed.windows(2).any(|w| w[0] == w[1]) {
        return Err(Error::syntax(
            "fn",
            "two arities with the same number of parameters",
        ));
    }
    if let (Some(v), Some(&longest)) = (variadic.first(), fixed.last())
        && v.required() < longest
    {
        return Err(Error::syntax(
            "fn",
            "the variadic arity must not have fewer parameters than a fixed arity",
        ));
    }
    Ok(VesperFn::new(FnDef {
        name,
        arities,
        is_macro,
        namespace: Arc::from(env.runtime().current_ns().name()),
        meta,
        env: Arc::new(env.clone()),
    }))
}

/// Build from the arguments of a `fn` form:
/// `(fn name? [params] body*)` or `(fn name? ([params] body*)+)`.
pub(crate) fn parse_fn(
    args: &[Value],
    is_macro: bool,
    meta: Option<Arc<Meta>>,
    env: &Env,
) -> Result<VesperFn> {
    let (name, rest) = match args.first() {
        Some(first)
            if !matches!(first, Value::Vector(..) | Value::List(..))
                || name_symbol(first).is_some() =>
        {
            let sym = name_symbol(first).ok_or_else(|| {
                Error::syntax("fn", format!("invalid function name {}", print(first)))
            })?;
            (Some(sym.clone()), &args[1..])
        }
        _ => (None, args),
    };
    let arities = match rest.first() {
        Some(params @ Value::Vector(..)) => vec![parse_arity(params, &rest[1..])?],
        Some(Value::List(..)) => rest
            .iter()
            .map(|clause| match clause {
                Value::List(items, _) if !items.is_empty() => {
                    let items: Vec<Value> = items.iter().cloned().collect();
                    parse_arity(&items[0], &items[1..])
                }
                other => Err(Error::syntax(
                    "fn",
                    format!("invalid arity clause {}", print(other)),
                )),
            })
            .collect::<Result<Vec<_>>>()?,
        _ => return Err(Error::syntax("fn", "missing parameter vector")),
    };
    build_multi_arity(name, arities, is_macro, meta, env)
}

// ============================================================================
// Invocation
// ============================================================================

pub(crate) fn closure_env(f: &VesperFn) -> Result<&Env> {
    f.env().downcast_ref::<Env>().ok_or_else(|| {
        Error::eval(format!(
            "function {} has an invalid environment",
            f.display_name()
        ))
    })
}

fn arity_error(f: &VesperFn, supplied: usize) -> Error {
    let arities = f.arities();
    let min = arities.iter().map(FnArity::required).min().unwrap_or(0);
    let required = if arities.iter().any(FnArity::is_variadic) {
        AritySpec::AtLeast(min)
    } else if arities.len() == 1 {
        AritySpec::Exact(min)
    } else {
        let mut counts: Vec<usize> = arities.iter().map(FnArity::required).collect();
        counts.sort_unstable();
        AritySpec::OneOf(counts)
    };
    Error::Arity {
        name: f.display_name(),
        supplied,
        required,
        signatures: f.signatures(),
    }
}

/// Bind arguments for a call in a fresh child of the closure environment
/// and check preconditions. Returns the body environment and the arity's
/// recursion point.
pub(crate) fn bind_call(f: &VesperFn, args: Vec<Value>) -> Result<(Env, Arc<RecursionPoint>)> {
    let closure = closure_env(f)?;
    let arity = f
        .find_arity(args.len())
        .ok_or_else(|| arity_error(f, args.len()))?;

    let fn_env = closure.child();
    let self_binding = f
        .name()
        .filter(|name| !name.is_qualified())
        .map(|name| (name.clone(), Value::Fn(f.clone())));
    if let Some((name, value)) = &self_binding {
        fn_env.insert_local(name.clone(), value.clone());
    }

    let fixed = arity.params.len();
    let rest_value = arity
        .rest
        .as_ref()
        .map(|_| Value::list(args.iter().skip(fixed).cloned()));
    let mut patterns = arity.params.clone();
    let mut values: Vec<Value> = args.into_iter().take(fixed).collect();
    if let (Some(rest), Some(rest_value)) = (&arity.rest, rest_value) {
        patterns.push(rest.clone());
        values.push(rest_value);
    }
    bind_patterns(&patterns, values, &fn_env, arity.simple)?;
    check_conditions(&arity.preconditions, &fn_env, &f.display_name(), "pre")?;

    let point = Arc::new(RecursionPoint {
        patterns,
        body: arity.body.clone(),
        env: closure.clone(),
        self_binding,
        owner: f.display_name(),
    });
    Ok((fn_env, point))
}

/// Bind `values` to `patterns` in `env`, destructuring where needed.
pub(crate) fn bind_patterns(
    patterns: &[Value],
    values: Vec<Value>,
    env: &Env,
    simple: bool,
) -> Result<()> {
    for (pattern, value) in patterns.iter().zip(values) {
        match pattern {
            Value::Symbol(sym, _) if simple || !sym.is_qualified() => {
                env.set_local(sym.clone(), value)?;
            }
            _ => {
                let bindings = destructure_with(pattern, &value, &mut |form| eval(form, env))?;
                for (sym, bound) in bindings {
                    env.set_local(sym, bound)?;
                }
            }
        }
    }
    Ok(())
}

/// Evaluate `:pre`/`:post` conditions. A condition fails when it is
/// falsey or is a sequence whose first element is falsey.
pub(crate) fn check_conditions(
    conditions: &[Value],
    env: &Env,
    fn_name: &str,
    kind: &str,
) -> Result<()> {
    for condition in conditions {
        let result = eval(condition, env)?;
        let ok = match &result {
            Value::List(items, _) | Value::Vector(items, _) => {
                items.front().is_none_or(Value::is_truthy)
            }
            other => other.is_truthy(),
        };
        if !ok {
            return Err(Error::Assertion(format!(
                "{}condition failed in {}: {}",
                kind,
                fn_name,
                print(condition)
            )));
        }
    }
    Ok(())
}

/// Call a source function or macro with already prepared arguments.
/// `call_form` is the calling list, used for the call frame position.
pub(crate) fn invoke_fn(f: &VesperFn, args: Vec<Value>, call_form: Option<&Value>) -> Result<Value> {
    let runtime = Arc::clone(closure_env(f)?.runtime());
    let id = runtime.id();
    if f.find_arity(args.len()).is_none() {
        return Err(arity_error(f, args.len()));
    }
    let name = f.display_name();

    let _ns = (!f.is_macro()).then(|| NsGuard::switch(id, Symbol::new(f.namespace())));
    let needs_frame = f.name().is_some() || call_form.is_some_and(|form| form.line().is_some());
    let _frame = needs_frame.then(|| FrameGuard::push(id, CallFrame::new(&name, &args, call_form)));
    let _depth = DepthGuard::enter(&runtime)?;

    let debugger = runtime.debugger().filter(|agent| agent.has_breakpoint(&name));
    if let Some(agent) = &debugger {
        agent.on_enter(&name, &args);
    }
    let start = runtime.metrics_start();
    let result = with_stack(|| invoke_body(f, args));
    runtime.record_since(&name, start);

    match &result {
        Ok(value) => {
            if let Some(agent) = &debugger {
                agent.on_exit(&name, value);
            }
        }
        Err(err) => {
            capture_pending_stack(id);
            if let Some(agent) = &debugger {
                agent.on_exception(&name, err);
            }
        }
    }
    result
}

fn invoke_body(f: &VesperFn, args: Vec<Value>) -> Result<Value> {
    let postconditions = f
        .find_arity(args.len())
        .map(|arity| arity.postconditions.clone())
        .unwrap_or_default();
    let (fn_env, point) = bind_call(f, args)?;
    let body = point.body.clone();
    let frame = Frame {
        recur: Some(point),
        tail_fn: postconditions.is_empty().then(|| f.clone()),
    };
    let result = match tail_body(&body, fn_env.clone())? {
        Step::Done(value) => value,
        Step::Continue(form, env) => run(form, env, frame)?,
    };
    if !postconditions.is_empty() {
        let post_env = fn_env.child();
        post_env.insert_local(Symbol::new("%"), result.clone());
        check_conditions(&postconditions, &post_env, &f.display_name(), "post")?;
    }
    Ok(result)
}
