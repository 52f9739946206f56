// vesper-core - Multimethod special forms
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Multimethod special forms: defmulti and defmethod.

use vesper_parser::{MultiFn, Value, print};

use super::eval;
use super::functions::parse_fn;
use super::special_forms::{define, symbol_and_meta};
use crate::env::Env;
use crate::error::{Error, Result};

/// (defmulti name dispatch-fn)
pub(crate) fn eval_defmulti(args: &[Value], env: &Env) -> Result<Value> {
    let [name_form, dispatch_form] = args else {
        return Err(Error::syntax(
            "defmulti",
            "expected (defmulti name dispatch-fn)",
        ));
    };
    let (sym, meta) = symbol_and_meta("defmulti", name_form, env)?;
    let dispatch = eval(dispatch_form, env)?;
    let qualified = env.runtime().qualify(&sym);
    let multi = MultiFn::new(qualified, dispatch);
    define(env, &sym, Value::MultiFn(multi), meta).map(Value::Var)
}

/// (defmethod name dispatch-val [params] body*)
///
/// The dispatch value is evaluated; `:default` names the fallback method.
pub(crate) fn eval_defmethod(args: &[Value], env: &Env) -> Result<Value> {
    let [Value::Symbol(name, _), dispatch_form, fn_tail @ ..] = args else {
        return Err(Error::syntax(
            "defmethod",
            "expected (defmethod name dispatch-val [params] body*)",
        ));
    };
    let runtime = env.runtime();
    let multi = match runtime.resolve_var(name).map(|var| runtime.var_value(&var)) {
        Some(Value::MultiFn(multi)) => multi,
        Some(other) => {
            return Err(Error::eval(format!(
                "'{}' is not a multifunction but a {}",
                name,
                other.type_name()
            )));
        }
        None => return Err(Error::SymbolNotFound(name.clone())),
    };
    let dispatch_val = eval(dispatch_form, env)?;
    let method = parse_fn(fn_tail, false, None, env)?;
    tracing::trace!(multifn = %multi.name(), dispatch = %print(&dispatch_val), "added method");
    multi.add_method(dispatch_val, Value::Fn(method));
    Ok(Value::MultiFn(multi))
}

#[cfg(test)]
mod tests {
    use crate::Interpreter;
    use crate::error::Error;
    use vesper_parser::Value;

    fn interp_with_shapes() -> Interpreter {
        let interp = Interpreter::new().unwrap();
        interp
            .eval_str(
                r#"
                (defmulti area :shape)
                (defmethod area :square [s] (* (:side s) (:side s)))
                (defmethod area :rect [r] (* (:w r) (:h r)))
                "#,
            )
            .unwrap();
        interp
    }

    #[test]
    fn test_dispatch() {
        let interp = interp_with_shapes();
        assert_eq!(
            interp.eval_str("(area {:shape :square :side 3})").unwrap(),
            Value::Int(9)
        );
        assert_eq!(
            interp.eval_str("(area {:shape :rect :w 2 :h 5})").unwrap(),
            Value::Int(10)
        );
    }

    #[test]
    fn test_missing_method() {
        let interp = interp_with_shapes();
        let err = interp.eval_str("(area {:shape :circle})").unwrap_err();
        assert!(matches!(err.root(), Error::Eval(msg) if msg.contains("no method")));
    }

    #[test]
    fn test_default_method() {
        let interp = interp_with_shapes();
        interp.eval_str("(defmethod area :default [_] 0)").unwrap();
        assert_eq!(
            interp.eval_str("(area {:shape :circle})").unwrap(),
            Value::Int(0)
        );
    }

    #[test]
    fn test_dispatch_fn() {
        let interp = Interpreter::new().unwrap();
        interp
            .eval_str(
                r#"
                (defmulti sign (fn [n] (cond (neg? n) :neg (zero? n) :zero :else :pos)))
                (defmethod sign :neg [_] -1)
                (defmethod sign :zero [_] 0)
                (defmethod sign :pos [_] 1)
                "#,
            )
            .unwrap();
        assert_eq!(interp.eval_str("(map sign [-5 0 5])").unwrap(),
            Value::list([Value::Int(-1), Value::Int(0), Value::Int(1)]));
    }

    #[test]
    fn test_defmethod_requires_multifn() {
        let interp = Interpreter::new().unwrap();
        interp.eval_str("(def plain 1)").unwrap();
        assert!(interp.eval_str("(defmethod plain :x [_] 1)").is_err());
        assert!(interp.eval_str("(defmethod nothing :x [_] 1)").is_err());
    }
}
