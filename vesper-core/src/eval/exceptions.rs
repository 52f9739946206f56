// vesper-core - Exception handling
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Exception handling special forms: throw, try/catch/finally and
//! try-with.

use tracing::debug;
use vesper_parser::{Keyword, Symbol, Value};

use super::functions::apply_in;
use super::{eval, eval_body};
use crate::context::with_context;
use crate::env::Env;
use crate::error::{Error, Result, type_is_a};

/// (throw) / (throw value) / (throw value cause)
pub(crate) fn eval_throw(args: &[Value], env: &Env) -> Result<Value> {
    match args {
        [] => Err(Error::thrown(Value::Nil)),
        [value] => Err(Error::thrown(eval(value, env)?)),
        [value, cause] => {
            let value = eval(value, env)?;
            let cause = eval(cause, env)?;
            Err(Error::Value {
                value,
                cause: Some(cause),
            })
        }
        _ => Err(Error::syntax("throw", "requires at most 2 arguments")),
    }
}

struct CatchClause {
    selector: Value,
    binding: Symbol,
    body: Vec<Value>,
}

#[derive(Default)]
struct TryClauses {
    body: Vec<Value>,
    catches: Vec<CatchClause>,
    finally: Option<Vec<Value>>,
}

fn parse_try(form: &'static str, args: &[Value]) -> Result<TryClauses> {
    let mut clauses = TryClauses::default();
    for arg in args {
        if let Value::List(items, _) = arg
            && let Some(Value::Symbol(sym, _)) = items.front()
            && !sym.is_qualified()
        {
            match sym.name() {
                "catch" => {
                    if items.len() < 3 {
                        return Err(Error::syntax(
                            form,
                            "catch requires a selector and a binding",
                        ));
                    }
                    let binding = match &items[2] {
                        Value::Symbol(s, _) => s.clone(),
                        other => {
                            return Err(Error::syntax(
                                form,
                                format!("catch binding must be a symbol, got {}", other.type_name()),
                            ));
                        }
                    };
                    clauses.catches.push(CatchClause {
                        selector: items[1].clone(),
                        binding,
                        body: items.iter().skip(3).cloned().collect(),
                    });
                    continue;
                }
                "finally" => {
                    if clauses.finally.is_some() {
                        return Err(Error::syntax(form, "only one finally clause allowed"));
                    }
                    clauses.finally = Some(items.iter().skip(1).cloned().collect());
                    continue;
                }
                _ => {}
            }
        }
        if !clauses.catches.is_empty() || clauses.finally.is_some() {
            return Err(Error::syntax(
                form,
                "body forms must precede catch and finally",
            ));
        }
        clauses.body.push(arg.clone());
    }
    Ok(clauses)
}

/// Type names a catch selector may name without being evaluated.
const KNOWN_TYPES: &[&str] = &[
    "Exception",
    "RuntimeException",
    "Throwable",
    "VncException",
    "ValueException",
    "ArityException",
    "AssertionException",
    "SymbolNotFound",
    "NotInTailPositionException",
    "ParseError",
    "EofError",
    "InterpreterError",
    "TypeError",
    "SyntaxError",
    "ArithmeticException",
    "SecurityException",
    "InterruptedException",
];

/// `name` selects the error's kind (or a supertype), or the type of a
/// thrown value.
fn type_matches(name: &str, err: &Error) -> bool {
    if err.is_a(name) {
        return true;
    }
    match err.root() {
        Error::Value { value, .. } => {
            let ty = value.type_keyword();
            ty.name() == name || ty.to_string().trim_start_matches(':') == name
        }
        _ => false,
    }
}

fn keyword_matches(kw: &Keyword, err: &Error) -> bool {
    if kw.namespace().is_none() {
        return type_matches(kw.name(), err);
    }
    matches!(err.root(), Error::Value { value, .. } if &value.type_keyword() == kw)
}

/// `[k v ...]`, optionally led by `:cause-type "T"`, against the thrown
/// map (or the error map of a non-value error).
fn map_matches(items: &[Value], err: &Error) -> bool {
    let pairs = match items {
        [Value::Keyword(kw), Value::String(cause), rest @ ..] if kw.is("cause-type") => {
            match err.cause_type_name() {
                Some(actual) if type_is_a(&actual, cause) => rest,
                _ => return false,
            }
        }
        _ => items,
    };
    let Value::Map(map, _) = err.to_value() else {
        return false;
    };
    pairs.len() % 2 == 0
        && pairs
            .chunks(2)
            .all(|pair| map.get(&pair[0]) == Some(&pair[1]))
}

fn catch_matches(selector: &Value, err: &Error, env: &Env) -> Result<bool> {
    match selector {
        Value::String(name) => Ok(type_matches(name, err)),
        Value::Keyword(kw) => Ok(keyword_matches(kw, err)),
        Value::Symbol(sym, _) if !sym.is_qualified() && KNOWN_TYPES.contains(&sym.name()) => {
            Ok(type_matches(sym.name(), err))
        }
        Value::Vector(items, _) => {
            let items: Vec<Value> = items.iter().cloned().collect();
            Ok(map_matches(&items, err))
        }
        Value::Symbol(..) | Value::List(..) => {
            let predicate = eval(selector, env)?;
            let thrown = match err.root() {
                Error::Value { value, .. } => value.clone(),
                _ => Value::Nil,
            };
            Ok(apply_in(env.runtime(), &predicate, &[thrown])?.is_truthy())
        }
        other => Err(Error::syntax(
            "try",
            format!("invalid catch selector {}", other.type_name()),
        )),
    }
}

/// Run the first catch clause that selects `result`'s error.
fn handle(result: Result<Value>, catches: &[CatchClause], env: &Env) -> Result<Value> {
    let err = match result {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };
    let runtime = env.runtime();
    if !err.is_catchable(runtime.config().catchable_security_errors) {
        return Err(err);
    }
    for clause in catches {
        if catch_matches(&clause.selector, &err, env)? {
            with_context(runtime.id(), |ctx| ctx.pending_stack = None);
            debug!(error_type = err.type_name(), "caught error");
            let catch_env = env.child();
            catch_env.set_local(clause.binding.clone(), err.to_value())?;
            return eval_body(&clause.body, &catch_env);
        }
    }
    Err(err)
}

/// Run `finally`, discarding its value. A finally error replaces a
/// successful result but never an error already in flight.
fn run_finally(result: Result<Value>, finally: Option<&[Value]>, env: &Env) -> Result<Value> {
    let Some(finally) = finally else {
        return result;
    };
    let finally_result = eval_body(finally, env);
    match (result, finally_result) {
        (Ok(_), Err(err)) => Err(err),
        (result, _) => result,
    }
}

/// (try body* (catch selector e handler*)* (finally cleanup*)?)
pub(crate) fn eval_try(args: &[Value], env: &Env) -> Result<Value> {
    let clauses = parse_try("try", args)?;
    let result = eval_body(&clauses.body, env);
    let result = handle(result, &clauses.catches, env);
    run_finally(result, clauses.finally.as_deref(), env)
}

/// Close a resource: the `:close` function of a map (or custom value),
/// called without arguments when it has a zero arity and with the
/// resource otherwise.
fn close_resource(resource: &Value, env: &Env) -> Result<()> {
    let close_key = Keyword::new("close");
    let close = match resource {
        Value::Map(map, _) => map.get(&Value::Keyword(close_key)).cloned(),
        Value::Custom(custom) => custom.get(&close_key).cloned(),
        _ => None,
    };
    let Some(close) = close else {
        return Ok(());
    };
    let nullary = matches!(&close, Value::Fn(f) if f.find_arity(0).is_some());
    if nullary {
        apply_in(env.runtime(), &close, &[])?;
    } else {
        apply_in(env.runtime(), &close, std::slice::from_ref(resource))?;
    }
    Ok(())
}

/// (try-with [r init ...] body* (catch ...)* (finally ...)?)
///
/// Resources are closed in reverse order once the body finishes, before
/// any catch or finally clause runs.
pub(crate) fn eval_try_with(args: &[Value], env: &Env) -> Result<Value> {
    let (bindings, rest) = match args.split_first() {
        Some((Value::Vector(bindings, _), rest)) if bindings.len() % 2 == 0 => (bindings, rest),
        _ => {
            return Err(Error::syntax(
                "try-with",
                "requires a binding vector with an even number of forms",
            ));
        }
    };
    let clauses = parse_try("try-with", rest)?;
    let resource_env = env.child();
    let mut resources = Vec::with_capacity(bindings.len() / 2);
    let mut result = Ok(Value::Nil);

    let pairs: Vec<Value> = bindings.iter().cloned().collect();
    for pair in pairs.chunks(2) {
        let Value::Symbol(sym, _) = &pair[0] else {
            result = Err(Error::syntax("try-with", "resource binding must be a symbol"));
            break;
        };
        match eval(&pair[1], &resource_env) {
            Ok(resource) => {
                if let Err(err) = resource_env.set_local(sym.clone(), resource.clone()) {
                    result = Err(err);
                    break;
                }
                resources.push(resource);
            }
            Err(err) => {
                result = Err(err);
                break;
            }
        }
    }
    if result.is_ok() {
        result = eval_body(&clauses.body, &resource_env);
    }
    for resource in resources.iter().rev() {
        if let Err(err) = close_resource(resource, env) {
            if result.is_ok() {
                result = Err(err);
            } else {
                debug!(error = %err, "suppressed close error");
            }
        }
    }

    let result = handle(result, &clauses.catches, &resource_env);
    run_finally(result, clauses.finally.as_deref(), &resource_env)
}

#[cfg(test)]
mod tests {
    use crate::error::{Error, Result};
    use crate::{Config, Interpreter};
    use vesper_parser::Value;

    fn eval_str(src: &str) -> Result<Value> {
        Interpreter::new()?.eval_str(src)
    }

    #[test]
    fn test_throw_value() {
        let err = eval_str("(throw {:a 1})").unwrap_err();
        assert!(err.is_a("ValueException"));
        assert_eq!(err.to_value(), Value::map([(Value::keyword("a"), Value::Int(1))]));
        assert!(matches!(eval_str("(throw)").unwrap_err().root(), Error::Value { value: Value::Nil, .. }));
    }

    #[test]
    fn test_catch_by_type_name() {
        assert_eq!(
            eval_str("(try (throw 1) (catch :ValueException e e))").unwrap(),
            Value::Int(1)
        );
        assert_eq!(
            eval_str("(try (undefined-fn) (catch SymbolNotFound e :missing))").unwrap(),
            Value::keyword("missing")
        );
        assert_eq!(
            eval_str("(try (/ 1 0) (catch \"InterpreterError\" e (:type e)))").unwrap(),
            Value::string("ArithmeticException")
        );
    }

    #[test]
    fn test_catch_by_value_type() {
        assert_eq!(
            eval_str("(try (throw \"x\") (catch :long e 1) (catch :string e 2))").unwrap(),
            Value::Int(2)
        );
    }

    #[test]
    fn test_catch_predicate() {
        assert_eq!(
            eval_str("(try (throw 5) (catch (fn [v] (= v 5)) e (+ e 1)))").unwrap(),
            Value::Int(6)
        );
    }

    #[test]
    fn test_catch_map_selector() {
        assert_eq!(
            eval_str("(try (throw {:code 404}) (catch [:code 500] e 1) (catch [:code 404] e 2))").unwrap(),
            Value::Int(2)
        );
    }

    #[test]
    fn test_catch_cause_type() {
        let src = r#"
            (try
              (try (/ 1 0)
                (catch :ArithmeticException e (throw {:wrapped true} e)))
              (catch [:cause-type "ArithmeticException" :wrapped true] e :ok))
        "#;
        assert_eq!(eval_str(src).unwrap(), Value::keyword("ok"));
    }

    #[test]
    fn test_unmatched_error_propagates() {
        let err = eval_str("(try (throw 1) (catch :string e 2))").unwrap_err();
        assert!(err.is_a("ValueException"));
    }

    #[test]
    fn test_finally_always_runs() {
        let interp = Interpreter::new().unwrap();
        interp.eval_str("(def log (atom []))").unwrap();
        assert!(interp
            .eval_str("(try (throw 1) (finally (swap! log conj :a)))")
            .is_err());
        assert_eq!(
            interp.eval_str("(try 7 (finally (swap! log conj :b) 99))").unwrap(),
            Value::Int(7)
        );
        assert_eq!(
            interp.eval_str("@log").unwrap(),
            Value::vector([Value::keyword("a"), Value::keyword("b")])
        );
    }

    #[test]
    fn test_security_not_catchable_by_default() {
        let interp = Interpreter::new().unwrap();
        let err = interp
            .eval_str("(try (ns-remove 'core) (catch :Exception e :caught))")
            .unwrap_err();
        assert!(err.is_a("SecurityException"));

        let lenient =
            Interpreter::with_config(Config::default().with_catchable_security_errors(true)).unwrap();
        assert_eq!(
            lenient
                .eval_str("(try (ns-remove 'core) (catch :SecurityException e :caught))")
                .unwrap(),
            Value::keyword("caught")
        );
    }

    #[test]
    fn test_try_with_closes_in_reverse() {
        let src = r#"
            (def log (atom []))
            (defn res [n] {:name n :close (fn [] (swap! log conj n))})
            (try-with [a (res 1) b (res 2)]
              (swap! log conj :body))
            @log
        "#;
        assert_eq!(
            eval_str(src).unwrap(),
            Value::vector([Value::keyword("body"), Value::Int(2), Value::Int(1)])
        );
    }

    #[test]
    fn test_try_with_closes_before_catch() {
        let src = r#"
            (def log (atom []))
            (try-with [r {:close (fn [] (swap! log conj :closed))}]
              (throw 1)
              (catch :ValueException e (swap! log conj :caught))
              (finally (swap! log conj :finally)))
            @log
        "#;
        assert_eq!(
            eval_str(src).unwrap(),
            Value::vector([
                Value::keyword("closed"),
                Value::keyword("caught"),
                Value::keyword("finally")
            ])
        );
    }

    #[test]
    fn test_close_error_raised_without_body_error() {
        let err = eval_str("(try-with [r {:close (fn [] (throw :close-failed))}] 1)").unwrap_err();
        assert_eq!(err.to_value(), Value::keyword("close-failed"));
        let err = eval_str("(try-with [r {:close (fn [] (throw :close-failed))}] (throw :body))").unwrap_err();
        assert_eq!(err.to_value(), Value::keyword("body"));
    }
}
