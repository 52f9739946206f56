// vesper-core - Special forms
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The closed set of special forms and the core ones among them: control
//! flow, binding, definition and quoting. The remaining families live in
//! sibling modules (`exceptions`, `dynamic`, `namespaces`, `multimethods`,
//! `types`).

use std::sync::Arc;

use vesper_parser::{Keyword, Meta, Symbol, Value, Vector, Var, print};

use super::functions::{bind_patterns, parse_fn};
use super::{
    Frame, RecursionPoint, Step, destructure_with, dynamic, eval, eval_body, exceptions, macros,
    multimethods, namespaces, quasiquote, tail_body, types,
};
use crate::env::Env;
use crate::error::{Error, Result};

/// Every special form, resolved once from the head symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialForm {
    Do,
    If,
    Let,
    Loop,
    Recur,
    Fn,
    Def,
    Defonce,
    DefDynamic,
    Defmacro,
    Defmulti,
    Defmethod,
    Deftype,
    DeftypeQ,
    DeftypeOf,
    DeftypeOr,
    Ns,
    NsRemove,
    NsUnmap,
    Import,
    Imports,
    Namespace,
    Resolve,
    VarGet,
    Set,
    Binding,
    BoundQ,
    Try,
    TryWith,
    Locking,
    Throw,
    Macroexpand,
    MacroexpandAll,
    Eval,
    Quote,
    Quasiquote,
}

impl SpecialForm {
    pub const ALL: [SpecialForm; 36] = [
        SpecialForm::Do,
        SpecialForm::If,
        SpecialForm::Let,
        SpecialForm::Loop,
        SpecialForm::Recur,
        SpecialForm::Fn,
        SpecialForm::Def,
        SpecialForm::Defonce,
        SpecialForm::DefDynamic,
        SpecialForm::Defmacro,
        SpecialForm::Defmulti,
        SpecialForm::Defmethod,
        SpecialForm::Deftype,
        SpecialForm::DeftypeQ,
        SpecialForm::DeftypeOf,
        SpecialForm::DeftypeOr,
        SpecialForm::Ns,
        SpecialForm::NsRemove,
        SpecialForm::NsUnmap,
        SpecialForm::Import,
        SpecialForm::Imports,
        SpecialForm::Namespace,
        SpecialForm::Resolve,
        SpecialForm::VarGet,
        SpecialForm::Set,
        SpecialForm::Binding,
        SpecialForm::BoundQ,
        SpecialForm::Try,
        SpecialForm::TryWith,
        SpecialForm::Locking,
        SpecialForm::Throw,
        SpecialForm::Macroexpand,
        SpecialForm::MacroexpandAll,
        SpecialForm::Eval,
        SpecialForm::Quote,
        SpecialForm::Quasiquote,
    ];

    /// The special form an unqualified head symbol names.
    #[must_use]
    pub fn from_symbol(sym: &Symbol) -> Option<Self> {
        if sym.is_qualified() {
            return None;
        }
        Self::from_name(sym.name())
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "do" => SpecialForm::Do,
            "if" => SpecialForm::If,
            "let" => SpecialForm::Let,
            "loop" => SpecialForm::Loop,
            "recur" => SpecialForm::Recur,
            "fn" => SpecialForm::Fn,
            "def" => SpecialForm::Def,
            "defonce" => SpecialForm::Defonce,
            "def-dynamic" => SpecialForm::DefDynamic,
            "defmacro" => SpecialForm::Defmacro,
            "defmulti" => SpecialForm::Defmulti,
            "defmethod" => SpecialForm::Defmethod,
            "deftype" => SpecialForm::Deftype,
            "deftype?" => SpecialForm::DeftypeQ,
            "deftype-of" => SpecialForm::DeftypeOf,
            "deftype-or" => SpecialForm::DeftypeOr,
            "ns" => SpecialForm::Ns,
            "ns-remove" => SpecialForm::NsRemove,
            "ns-unmap" => SpecialForm::NsUnmap,
            "import" => SpecialForm::Import,
            "imports" => SpecialForm::Imports,
            "namespace" => SpecialForm::Namespace,
            "resolve" => SpecialForm::Resolve,
            "var-get" => SpecialForm::VarGet,
            "set!" => SpecialForm::Set,
            "binding" => SpecialForm::Binding,
            "bound?" => SpecialForm::BoundQ,
            "try" => SpecialForm::Try,
            "try-with" => SpecialForm::TryWith,
            "locking" => SpecialForm::Locking,
            "throw" => SpecialForm::Throw,
            "macroexpand" => SpecialForm::Macroexpand,
            "macroexpand-all" => SpecialForm::MacroexpandAll,
            "eval" => SpecialForm::Eval,
            "quote" => SpecialForm::Quote,
            "quasiquote" => SpecialForm::Quasiquote,
            _ => return None,
        })
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            SpecialForm::Do => "do",
            SpecialForm::If => "if",
            SpecialForm::Let => "let",
            SpecialForm::Loop => "loop",
            SpecialForm::Recur => "recur",
            SpecialForm::Fn => "fn",
            SpecialForm::Def => "def",
            SpecialForm::Defonce => "defonce",
            SpecialForm::DefDynamic => "def-dynamic",
            SpecialForm::Defmacro => "defmacro",
            SpecialForm::Defmulti => "defmulti",
            SpecialForm::Defmethod => "defmethod",
            SpecialForm::Deftype => "deftype",
            SpecialForm::DeftypeQ => "deftype?",
            SpecialForm::DeftypeOf => "deftype-of",
            SpecialForm::DeftypeOr => "deftype-or",
            SpecialForm::Ns => "ns",
            SpecialForm::NsRemove => "ns-remove",
            SpecialForm::NsUnmap => "ns-unmap",
            SpecialForm::Import => "import",
            SpecialForm::Imports => "imports",
            SpecialForm::Namespace => "namespace",
            SpecialForm::Resolve => "resolve",
            SpecialForm::VarGet => "var-get",
            SpecialForm::Set => "set!",
            SpecialForm::Binding => "binding",
            SpecialForm::BoundQ => "bound?",
            SpecialForm::Try => "try",
            SpecialForm::TryWith => "try-with",
            SpecialForm::Locking => "locking",
            SpecialForm::Throw => "throw",
            SpecialForm::Macroexpand => "macroexpand",
            SpecialForm::MacroexpandAll => "macroexpand-all",
            SpecialForm::Eval => "eval",
            SpecialForm::Quote => "quote",
            SpecialForm::Quasiquote => "quasiquote",
        }
    }
}

/// Evaluate one special form. Forms with a tail position report it as
/// [`Step::Continue`].
pub(crate) fn dispatch(
    special: SpecialForm,
    items: &Vector<Value>,
    env: &Env,
    frame: &mut Frame,
) -> Result<Step> {
    let args: Vec<Value> = items.iter().skip(1).cloned().collect();
    let runtime = env.runtime();
    let name = special.name();
    let debugger = runtime.debugger().filter(|agent| agent.has_breakpoint(name));
    if let Some(agent) = &debugger {
        agent.on_enter(name, &args);
    }
    let start = runtime.metrics_start();
    let result = dispatch_form(special, &args, env, frame);
    runtime.record_since(name, start);
    if let Some(agent) = &debugger {
        match &result {
            Ok(Step::Done(value)) => agent.on_exit(name, value),
            Ok(Step::Continue(..)) => {}
            Err(err) => agent.on_exception(name, err),
        }
    }
    result
}

fn dispatch_form(
    special: SpecialForm,
    args: &[Value],
    env: &Env,
    frame: &mut Frame,
) -> Result<Step> {
    let done = |value: Result<Value>| value.map(Step::Done);
    match special {
        SpecialForm::Do => tail_body(&args.iter().cloned().collect::<Vector<Value>>(), env.clone()),
        SpecialForm::If => eval_if(args, env),
        SpecialForm::Let => eval_let(args, env),
        SpecialForm::Loop => eval_loop(args, env, frame),
        SpecialForm::Recur => eval_recur(args, env, frame),
        SpecialForm::Fn => done(parse_fn(args, false, None, env).map(Value::Fn)),
        SpecialForm::Def => done(eval_def(args, env)),
        SpecialForm::Defonce => done(eval_defonce(args, env)),
        SpecialForm::DefDynamic => done(dynamic::eval_def_dynamic(args, env)),
        SpecialForm::Defmacro => done(eval_defmacro(args, env)),
        SpecialForm::Defmulti => done(multimethods::eval_defmulti(args, env)),
        SpecialForm::Defmethod => done(multimethods::eval_defmethod(args, env)),
        SpecialForm::Deftype => done(types::eval_deftype(args, env)),
        SpecialForm::DeftypeQ => done(types::eval_deftype_q(args, env)),
        SpecialForm::DeftypeOf => done(types::eval_deftype_of(args, env)),
        SpecialForm::DeftypeOr => done(types::eval_deftype_or(args, env)),
        SpecialForm::Ns => done(namespaces::eval_ns(args, env)),
        SpecialForm::NsRemove => done(namespaces::eval_ns_remove(args, env)),
        SpecialForm::NsUnmap => done(namespaces::eval_ns_unmap(args, env)),
        SpecialForm::Import => done(namespaces::eval_import(args, env)),
        SpecialForm::Imports => done(namespaces::eval_imports(args, env)),
        SpecialForm::Namespace => done(namespaces::eval_namespace(args, env)),
        SpecialForm::Resolve => done(eval_resolve(args, env)),
        SpecialForm::VarGet => done(eval_var_get(args, env)),
        SpecialForm::Set => done(dynamic::eval_set(args, env)),
        SpecialForm::Binding => done(dynamic::eval_binding(args, env)),
        SpecialForm::BoundQ => done(eval_bound(args, env)),
        SpecialForm::Try => done(exceptions::eval_try(args, env)),
        SpecialForm::TryWith => done(exceptions::eval_try_with(args, env)),
        SpecialForm::Locking => done(eval_locking(args, env)),
        SpecialForm::Throw => done(exceptions::eval_throw(args, env)),
        SpecialForm::Macroexpand => done(eval_macroexpand(args, env, false)),
        SpecialForm::MacroexpandAll => done(eval_macroexpand(args, env, true)),
        SpecialForm::Eval => done(eval_eval(args, env)),
        SpecialForm::Quote => match args {
            [quoted] => Ok(Step::Done(quoted.clone())),
            _ => Err(Error::syntax("quote", "requires exactly 1 argument")),
        },
        SpecialForm::Quasiquote => match args {
            [template] => Ok(Step::Continue(quasiquote::expand(template)?, env.clone())),
            _ => Err(Error::syntax("quasiquote", "requires exactly 1 argument")),
        },
    }
}

// ============================================================================
// Control flow
// ============================================================================

/// (if test then else?)
fn eval_if(args: &[Value], env: &Env) -> Result<Step> {
    let (test, then, otherwise) = match args {
        [test, then] => (test, then, None),
        [test, then, otherwise] => (test, then, Some(otherwise)),
        _ => return Err(Error::syntax("if", "requires 2 or 3 arguments")),
    };
    if eval(test, env)?.is_truthy() {
        Ok(Step::Continue(then.clone(), env.clone()))
    } else {
        match otherwise {
            Some(form) => Ok(Step::Continue(form.clone(), env.clone())),
            None => Ok(Step::Done(Value::Nil)),
        }
    }
}

/// Split `[bindings] body*`, checking the binding vector has pairs.
fn binding_vector<'a>(form: &'static str, args: &'a [Value]) -> Result<(Vec<Value>, &'a [Value])> {
    match args.split_first() {
        Some((Value::Vector(bindings, _), body)) if bindings.len() % 2 == 0 => {
            Ok((bindings.iter().cloned().collect(), body))
        }
        Some((Value::Vector(..), _)) => Err(Error::syntax(
            form,
            "binding vector requires an even number of forms",
        )),
        _ => Err(Error::syntax(form, "requires a binding vector")),
    }
}

/// Evaluate `init` and bind it to `pattern`. Returns the environment later
/// bindings go into: a rebinding of a name already bound in `env` gets a
/// fresh frame so closures over the earlier binding keep seeing it.
fn bind_one(pattern: &Value, init: &Value, env: Env) -> Result<Env> {
    let value = eval(init, &env)?;
    let bindings = match pattern {
        Value::Symbol(sym, _) if !sym.is_qualified() => vec![(sym.clone(), value)],
        _ => destructure_with(pattern, &value, &mut |form| eval(form, &env))?,
    };
    let env = if bindings.iter().any(|(sym, _)| env.has_own(sym)) {
        env.child()
    } else {
        env
    };
    for (sym, value) in bindings {
        env.set_local(sym, value)?;
    }
    Ok(env)
}

/// (let [pattern init ...] body*)
fn eval_let(args: &[Value], env: &Env) -> Result<Step> {
    let (bindings, body) = binding_vector("let", args)?;
    let mut let_env = env.child();
    for pair in bindings.chunks(2) {
        let_env = bind_one(&pair[0], &pair[1], let_env)?;
    }
    tail_body(&body.iter().cloned().collect::<Vector<Value>>(), let_env)
}

/// (loop [pattern init ...] body*)
fn eval_loop(args: &[Value], env: &Env, frame: &mut Frame) -> Result<Step> {
    let (bindings, body) = binding_vector("loop", args)?;
    let mut loop_env = env.child();
    let mut patterns = Vec::with_capacity(bindings.len() / 2);
    for pair in bindings.chunks(2) {
        loop_env = bind_one(&pair[0], &pair[1], loop_env)?;
        patterns.push(pair[0].clone());
    }
    let body: Vector<Value> = body.iter().cloned().collect();
    frame.recur = Some(Arc::new(RecursionPoint {
        patterns,
        body: body.clone(),
        env: env.clone(),
        self_binding: None,
        owner: "loop".to_string(),
    }));
    tail_body(&body, loop_env)
}

/// (recur args*) - rebind the innermost loop or function arity and jump
/// back to its body.
fn eval_recur(args: &[Value], env: &Env, frame: &mut Frame) -> Result<Step> {
    let point = frame.recur.clone().ok_or_else(|| {
        Error::NotInTailPosition("recur can only be used in tail position of loop or fn".into())
    })?;
    if args.len() != point.patterns.len() {
        return Err(Error::arity_named(
            format!("recur in {}", point.owner),
            point.patterns.len(),
            args.len(),
        ));
    }
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        values.push(eval(arg, env)?);
    }
    env.runtime().check_interrupt()?;

    let next_env = point.env.child();
    if let Some((name, value)) = &point.self_binding {
        next_env.insert_local(name.clone(), value.clone());
    }
    bind_patterns(&point.patterns, values, &next_env, false)?;
    tail_body(&point.body, next_env)
}

/// (locking x body*) - evaluate body holding the re-entrant lock for `x`.
fn eval_locking(args: &[Value], env: &Env) -> Result<Value> {
    let Some((target, body)) = args.split_first() else {
        return Err(Error::syntax("locking", "requires a lock value"));
    };
    let key = eval(target, env)?;
    let runtime = Arc::clone(env.runtime());
    let _guard = runtime.locks().acquire(&key);
    eval_body(body, env)
}

// ============================================================================
// Definitions
// ============================================================================

fn merge_meta(base: Option<&Arc<Meta>>, extra: Meta) -> Option<Arc<Meta>> {
    let mut merged = base.map(|m| (**m).clone()).unwrap_or_default();
    for (k, v) in extra {
        merged.insert(k, v);
    }
    (!merged.is_empty()).then(|| Arc::new(merged))
}

/// Symbol and metadata of a definition target: `name` or
/// `(with-meta name meta)`, possibly nested.
pub(crate) fn symbol_and_meta(
    form_name: &'static str,
    form: &Value,
    env: &Env,
) -> Result<(Symbol, Option<Arc<Meta>>)> {
    match form {
        Value::Symbol(sym, meta) => Ok((sym.clone(), meta.clone())),
        Value::List(items, _) if items.len() == 3 && items[0].is_symbol_named("with-meta") => {
            let (sym, inner) = symbol_and_meta(form_name, &items[1], env)?;
            match eval(&items[2], env)? {
                Value::Map(outer, _) => Ok((sym, merge_meta(inner.as_ref(), outer))),
                other => Err(Error::syntax(
                    form_name,
                    format!("metadata must be a map, got {}", other.type_name()),
                )),
            }
        }
        other => Err(Error::syntax(
            form_name,
            format!("name must be a symbol, got {}", other.type_name()),
        )),
    }
}

/// Give an anonymous function the name it is being defined under.
fn named(value: Value, sym: &Symbol) -> Value {
    match value {
        Value::Fn(f) if f.name().is_none() => Value::Fn(f.with_name(sym.unqualified())),
        other => other,
    }
}

fn is_overwritable(meta: Option<&Arc<Meta>>) -> bool {
    meta.and_then(|m| m.get(&Value::keyword("overwritable")))
        != Some(&Value::Bool(false))
}

/// Define `sym` as a plain var in the current namespace.
pub(crate) fn define(
    env: &Env,
    sym: &Symbol,
    value: Value,
    meta: Option<Arc<Meta>>,
) -> Result<Var> {
    let qualified = env.runtime().qualify(sym);
    let overwritable = is_overwritable(meta.as_ref());
    env.set_global(Var::new(qualified, named(value, sym), overwritable, meta))
}

/// (def name doc? value?)
fn eval_def(args: &[Value], env: &Env) -> Result<Value> {
    let (name_form, doc, value_form) = match args {
        [name] => (name, None, None),
        [name, value] => (name, None, Some(value)),
        [name, Value::String(doc), value] => (name, Some(doc.clone()), Some(value)),
        _ => return Err(Error::syntax("def", "expected (def name doc? value?)")),
    };
    let (sym, mut meta) = symbol_and_meta("def", name_form, env)?;
    if let Some(doc) = doc {
        let mut doc_meta = Meta::new();
        doc_meta.insert(Value::keyword("doc"), Value::String(doc));
        meta = merge_meta(meta.as_ref(), doc_meta);
    }
    let value = match value_form {
        Some(form) => eval(form, env)?,
        None => Value::Nil,
    };
    define(env, &sym, value, meta).map(Value::Var)
}

/// (defonce name value) - define only when not yet bound.
fn eval_defonce(args: &[Value], env: &Env) -> Result<Value> {
    let Some(name_form) = args.first() else {
        return Err(Error::syntax("defonce", "requires a name"));
    };
    let (sym, _) = symbol_and_meta("defonce", name_form, env)?;
    let runtime = env.runtime();
    if let Some(var) = runtime.lookup_global(&runtime.qualify(&sym)) {
        return Ok(Value::Var(var));
    }
    eval_def(args, env)
}

/// (defmacro name doc? [params] body*) or multi-arity.
fn eval_defmacro(args: &[Value], env: &Env) -> Result<Value> {
    let Some((name_form, rest)) = args.split_first() else {
        return Err(Error::syntax("defmacro", "requires a name"));
    };
    let (sym, meta) = symbol_and_meta("defmacro", name_form, env)?;
    let rest = match rest {
        [Value::String(_), more @ ..] if !more.is_empty() => more,
        _ => rest,
    };
    let mut fn_args = Vec::with_capacity(rest.len() + 1);
    fn_args.push(Value::Symbol(sym.unqualified(), None));
    fn_args.extend(rest.iter().cloned());
    let macro_fn = parse_fn(&fn_args, true, meta.clone(), env)?;
    define(env, &sym, Value::Fn(macro_fn), meta).map(Value::Var)
}

// ============================================================================
// Var access
// ============================================================================

fn single_arg<'a>(form: &'static str, args: &'a [Value]) -> Result<&'a Value> {
    match args {
        [arg] => Ok(arg),
        _ => Err(Error::syntax(form, "requires exactly 1 argument")),
    }
}

fn symbol_arg(form: &'static str, args: &[Value], env: &Env) -> Result<Symbol> {
    match eval(single_arg(form, args)?, env)? {
        Value::Symbol(sym, _) => Ok(sym),
        other => Err(Error::type_error_in(form, "symbol", other.type_name())),
    }
}

/// (resolve 'sym) - the var `sym` names, or nil.
fn eval_resolve(args: &[Value], env: &Env) -> Result<Value> {
    let sym = symbol_arg("resolve", args, env)?;
    Ok(env
        .runtime()
        .resolve_var(&sym)
        .map_or(Value::Nil, Value::Var))
}

/// (var-get v) - value of a var, or of the global a symbol names.
fn eval_var_get(args: &[Value], env: &Env) -> Result<Value> {
    let runtime = env.runtime();
    match eval(single_arg("var-get", args)?, env)? {
        Value::Var(var) => Ok(runtime.var_value(&var)),
        Value::Symbol(sym, _) => runtime
            .resolve_var(&sym)
            .map(|var| runtime.var_value(&var))
            .ok_or(Error::SymbolNotFound(sym)),
        other => Err(Error::type_error_in("var-get", "var", other.type_name())),
    }
}

/// (bound? 'sym)
fn eval_bound(args: &[Value], env: &Env) -> Result<Value> {
    let sym = symbol_arg("bound?", args, env)?;
    Ok(Value::Bool(env.try_get(&sym).is_some()))
}

// ============================================================================
// Evaluation and expansion
// ============================================================================

/// (eval form) - evaluate the value of `form` in the global environment.
fn eval_eval(args: &[Value], env: &Env) -> Result<Value> {
    let form = eval(single_arg("eval", args)?, env)?;
    let global = Env::new(Arc::clone(env.runtime()));
    eval(&form, &global)
}

fn eval_macroexpand(args: &[Value], env: &Env, all: bool) -> Result<Value> {
    let name = if all { "macroexpand-all" } else { "macroexpand" };
    let form = eval(single_arg(name, args)?, env)?;
    if all {
        macros::macroexpand_all(&form, env)
    } else {
        macros::macroexpand(&form, env)
    }
}

/// Keyword `:name` from a form that should name something.
pub(crate) fn keyword_name(form: &'static str, value: &Value) -> Result<Keyword> {
    match value {
        Value::Keyword(kw) => Ok(kw.clone()),
        Value::Symbol(sym, _) => Ok(match sym.namespace() {
            Some(ns) => Keyword::with_namespace(ns, sym.name()),
            None => Keyword::new(sym.name()),
        }),
        other => Err(Error::syntax(
            form,
            format!("expected a name, got {}", print(other)),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Interpreter;

    fn eval_str(src: &str) -> Result<Value> {
        Interpreter::new()?.eval_str(src)
    }

    #[test]
    fn test_names_round_trip() {
        for special in SpecialForm::ALL {
            assert_eq!(SpecialForm::from_name(special.name()), Some(special));
        }
        assert_eq!(SpecialForm::from_symbol(&Symbol::parse("core/if")), None);
        assert_eq!(SpecialForm::from_name("defn"), None);
    }

    #[test]
    fn test_if() {
        assert_eq!(eval_str("(if true 1 2)").unwrap(), Value::Int(1));
        assert_eq!(eval_str("(if nil 1 2)").unwrap(), Value::Int(2));
        assert_eq!(eval_str("(if false 1)").unwrap(), Value::Nil);
        assert!(eval_str("(if true)").is_err());
        assert!(eval_str("(if 1 2 3 4)").is_err());
    }

    #[test]
    fn test_do_and_let() {
        assert_eq!(eval_str("(do)").unwrap(), Value::Nil);
        assert_eq!(eval_str("(let [x 1 y (+ x 1)] (* y 10))").unwrap(), Value::Int(20));
        assert!(eval_str("(let [x] x)").is_err());
    }

    #[test]
    fn test_let_rebinding_keeps_closures() {
        assert_eq!(
            eval_str("(let [x 1 f (fn [] x) x 2] [(f) x])").unwrap(),
            Value::vector([Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn test_loop_recur() {
        assert_eq!(
            eval_str("(loop [i 0 acc 0] (if (< i 100000) (recur (inc i) (+ acc 1)) acc))").unwrap(),
            Value::Int(100_000)
        );
    }

    #[test]
    fn test_recur_outside_tail() {
        let err = eval_str("(loop [i 0] (+ 1 (recur i)))").unwrap_err();
        assert!(matches!(err.root(), Error::NotInTailPosition(_)));
        let err = eval_str("(recur 1)").unwrap_err();
        assert!(matches!(err.root(), Error::NotInTailPosition(_)));
    }

    #[test]
    fn test_recur_arg_count() {
        assert!(eval_str("(loop [a 1 b 2] (recur 1))").is_err());
    }

    #[test]
    fn test_def_variants() {
        let interp = Interpreter::new().unwrap();
        interp.eval_str("(def x)").unwrap();
        assert_eq!(interp.eval_str("x").unwrap(), Value::Nil);
        interp.eval_str("(def y \"the y\" 5)").unwrap();
        assert_eq!(interp.eval_str("y").unwrap(), Value::Int(5));
        assert_eq!(
            interp.eval_str("(:doc (meta (resolve 'y)))").unwrap(),
            Value::string("the y")
        );
    }

    #[test]
    fn test_def_not_overwritable() {
        let interp = Interpreter::new().unwrap();
        interp.eval_str("(def ^{:overwritable false} k 1)").unwrap();
        assert!(interp.eval_str("(def k 2)").is_err());
        assert_eq!(interp.eval_str("k").unwrap(), Value::Int(1));
    }

    #[test]
    fn test_defonce() {
        let interp = Interpreter::new().unwrap();
        interp.eval_str("(defonce a 1)").unwrap();
        interp.eval_str("(defonce a 2)").unwrap();
        assert_eq!(interp.eval_str("a").unwrap(), Value::Int(1));
    }

    #[test]
    fn test_defmacro() {
        let interp = Interpreter::new().unwrap();
        interp
            .eval_str("(defmacro unless [c body] (list 'if c nil body))")
            .unwrap();
        assert_eq!(interp.eval_str("(unless false 3)").unwrap(), Value::Int(3));
        assert_eq!(
            interp.eval_str("(macroexpand '(unless false 3))").unwrap(),
            interp.eval_str("'(if false nil 3)").unwrap()
        );
    }

    #[test]
    fn test_resolve_and_bound() {
        let interp = Interpreter::new().unwrap();
        interp.eval_str("(def z 3)").unwrap();
        assert!(matches!(interp.eval_str("(resolve 'z)").unwrap(), Value::Var(_)));
        assert_eq!(interp.eval_str("(resolve 'nope)").unwrap(), Value::Nil);
        assert_eq!(interp.eval_str("(bound? 'z)").unwrap(), Value::Bool(true));
        assert_eq!(interp.eval_str("(bound? 'nope)").unwrap(), Value::Bool(false));
        assert_eq!(interp.eval_str("(var-get 'z)").unwrap(), Value::Int(3));
        assert_eq!(interp.eval_str("(var-get (resolve 'z))").unwrap(), Value::Int(3));
    }

    #[test]
    fn test_eval_uses_global_env() {
        assert_eq!(eval_str("(eval '(+ 1 2))").unwrap(), Value::Int(3));
        assert!(eval_str("(let [q 1] (eval 'q))").is_err());
    }

    #[test]
    fn test_locking_reentrant() {
        assert_eq!(
            eval_str("(def l (atom 0)) (locking l (locking l 42))").unwrap(),
            Value::Int(42)
        );
    }
}
