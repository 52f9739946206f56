// vesper-core - Miscellaneous built-in functions
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use std::io::Write;
use std::sync::Arc;

use tracing::debug;
use vesper_parser::{Meta, Symbol, Value, print, print_str};

use super::{check_arity, check_arity_at_least, check_arity_range};
use crate::context::NsGuard;
use crate::env::Env;
use crate::error::{Error, Result};
use crate::eval::{apply, eval_source};
use crate::runtime::Runtime;

pub(crate) fn builtin_type(args: &[Value]) -> Result<Value> {
    check_arity("type", 1, args)?;
    Ok(Value::Keyword(args[0].type_keyword()))
}

pub(crate) fn builtin_identity(args: &[Value]) -> Result<Value> {
    check_arity("identity", 1, args)?;
    Ok(args[0].clone())
}

pub(crate) fn builtin_not(args: &[Value]) -> Result<Value> {
    check_arity("not", 1, args)?;
    Ok(Value::Bool(!args[0].is_truthy()))
}

/// (gensym) or (gensym prefix)
pub(crate) fn builtin_gensym(args: &[Value]) -> Result<Value> {
    check_arity_range("gensym", 0, 1, args)?;
    let prefix = match args.first() {
        None => "G".to_string(),
        Some(Value::String(s)) => s.to_string(),
        Some(Value::Symbol(sym, _)) => sym.name().to_string(),
        Some(other) => return Err(Error::type_error_in("gensym", "string", other.type_name())),
    };
    Ok(Value::Symbol(Symbol::gensym(&prefix), None))
}

/// (ex-info msg data) or (ex-info msg data cause) - the data map with
/// `:message` (and `:cause`) added, ready to be thrown.
pub(crate) fn builtin_ex_info(args: &[Value]) -> Result<Value> {
    check_arity_range("ex-info", 2, 3, args)?;
    let mut data = match &args[1] {
        Value::Map(map, _) => map.clone(),
        Value::Nil => Meta::new(),
        other => return Err(Error::type_error_in("ex-info", "map", other.type_name())),
    };
    data.insert(Value::keyword("message"), args[0].clone());
    if let Some(cause) = args.get(2) {
        data.insert(Value::keyword("cause"), cause.clone());
    }
    Ok(Value::Map(data, None))
}

/// Human rendering where nil still prints as `nil`.
fn display(value: &Value) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        other => print_str(other),
    }
}

fn join(args: &[Value], render: fn(&Value) -> String) -> String {
    args.iter().map(render).collect::<Vec<_>>().join(" ")
}

pub(crate) fn builtin_println(args: &[Value]) -> Result<Value> {
    let line = join(args, display);
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", line).map_err(|e| Error::eval(format!("println: {}", e)))?;
    Ok(Value::Nil)
}

pub(crate) fn builtin_print_str(args: &[Value]) -> Result<Value> {
    Ok(Value::string(join(args, display)))
}

pub(crate) fn builtin_pr_str(args: &[Value]) -> Result<Value> {
    Ok(Value::string(join(args, print)))
}

// ============================================================================
// Metadata
// ============================================================================

pub(crate) fn builtin_meta(args: &[Value]) -> Result<Value> {
    check_arity("meta", 1, args)?;
    Ok(args[0]
        .meta()
        .map(|m| Value::Map((**m).clone(), None))
        .unwrap_or(Value::Nil))
}

fn meta_map(value: &Value) -> Result<Option<Arc<Meta>>> {
    match value {
        Value::Nil => Ok(None),
        Value::Map(map, _) => Ok(Some(Arc::new(map.clone()))),
        other => Err(Error::type_error_in("with-meta", "map", other.type_name())),
    }
}

fn require_meta_support(fn_name: &'static str, value: &Value) -> Result<()> {
    if value.supports_meta() {
        Ok(())
    } else {
        Err(Error::type_error_in(
            fn_name,
            "value supporting metadata",
            value.type_name(),
        ))
    }
}

pub(crate) fn builtin_with_meta(args: &[Value]) -> Result<Value> {
    check_arity("with-meta", 2, args)?;
    require_meta_support("with-meta", &args[0])?;
    Ok(args[0].with_meta(meta_map(&args[1])?))
}

/// (vary-meta obj f & args) - metadata replaced by `(apply f meta args)`
pub(crate) fn builtin_vary_meta(args: &[Value]) -> Result<Value> {
    check_arity_at_least("vary-meta", 2, args)?;
    require_meta_support("vary-meta", &args[0])?;
    let mut call_args = vec![builtin_meta(&args[..1])?];
    call_args.extend_from_slice(&args[2..]);
    let new_meta = apply(&args[1], &call_args)?;
    Ok(args[0].with_meta(meta_map(&new_meta)?))
}

// ============================================================================
// Modules
// ============================================================================

/// Fetch module `name` through the installed loader and evaluate it at
/// top level. The caller's namespace is restored afterwards.
pub(crate) fn load_module(runtime: &Arc<Runtime>, name: &str) -> Result<Value> {
    runtime.interceptor().validate_load_module(name)?;
    let source = runtime.module_loader().load(name)?;
    debug!(module = name, bytes = source.len(), "loading module");
    let _ns = NsGuard::switch(runtime.id(), runtime.current_ns());
    let env = Env::new(Arc::clone(runtime));
    eval_source(&source, name, &env)?;
    Ok(Value::Nil)
}
