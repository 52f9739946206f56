// vesper-core - Custom type special forms
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Custom type special forms: deftype, deftype?, deftype-of and
//! deftype-or.
//!
//! Each definition registers a [`CustomType`] with the runtime and interns
//! a constructor `name.` and a predicate `name?` in the current namespace.

use std::sync::Arc;

use vesper_parser::{
    CustomKind, CustomType, CustomValue, Keyword, OrdSet, Symbol, Value, print,
};

use super::special_forms::{define, keyword_name};
use super::{apply, eval, make_native_fn};
use crate::env::Env;
use crate::error::{Error, Result};

// ============================================================================
// Shared helpers
// ============================================================================

/// Qualified type symbol for `:name`, in the current namespace unless the
/// keyword names one.
fn type_symbol(form: &'static str, name: &Value, env: &Env) -> Result<Symbol> {
    let kw = keyword_name(form, name)?;
    Ok(match kw.namespace() {
        Some(ns) => Symbol::with_namespace(ns, kw.name()),
        None => Symbol::with_namespace(env.runtime().current_ns().name(), kw.name()),
    })
}

/// Whether `value` has the type `expected` names. Unqualified names match
/// on the type's name alone, so `:long` matches `:core/long`.
fn has_type(value: &Value, expected: &Keyword) -> bool {
    let actual = value.type_keyword();
    match expected.namespace() {
        Some(_) => &actual == expected,
        None => expected.is("any") || actual.name() == expected.name(),
    }
}

/// Run the optional validator over a freshly built instance.
fn validate(ty: &CustomType, validator: Option<&Value>, instance: &Value) -> Result<()> {
    if let Some(validator) = validator
        && !apply(validator, std::slice::from_ref(instance))?.is_truthy()
    {
        return Err(Error::Assertion(format!(
            "invalid value for type {}: {}",
            ty.type_keyword(),
            print(instance)
        )));
    }
    Ok(())
}

/// `ns/name` in the namespace of type symbol `ty`.
fn qualified_name(ty: &Symbol, name: &str) -> String {
    match ty.namespace() {
        Some(ns) => format!("{}/{}", ns, name),
        None => name.to_string(),
    }
}

/// Intern the constructor `name.` and predicate `name?` for `ty`.
fn intern_type_fns(
    env: &Env,
    ty: &Arc<CustomType>,
    construct: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
) -> Result<()> {
    let base = ty.name.name().to_string();
    let ctor_name = format!("{}.", base);
    let pred_name = format!("{}?", base);

    let ctor = make_native_fn(&qualified_name(&ty.name, &ctor_name), construct);
    define(env, &Symbol::new(&ctor_name), Value::NativeFn(ctor), None)?;

    let pred_ty = ty.name.clone();
    let pred = make_native_fn(&qualified_name(&ty.name, &pred_name), move |args| match args {
        [Value::Custom(c)] => Ok(Value::Bool(c.ty().name == pred_ty)),
        [_] => Ok(Value::Bool(false)),
        _ => Err(Error::arity_named(pred_ty.to_string(), 1, args.len())),
    });
    define(env, &Symbol::new(&pred_name), Value::NativeFn(pred), None)?;
    Ok(())
}

/// Split `[name validator?]`-style trailing arguments.
fn optional_validator(form: &'static str, rest: &[Value], env: &Env) -> Result<Option<Value>> {
    match rest {
        [] => Ok(None),
        [validator] => {
            let validator = eval(validator, env)?;
            if validator.is_fn() || matches!(validator, Value::MultiFn(_)) {
                Ok(Some(validator))
            } else {
                Err(Error::type_error_in(form, "function", validator.type_name()))
            }
        }
        _ => Err(Error::syntax(form, "too many arguments")),
    }
}

// ============================================================================
// deftype
// ============================================================================

/// Field names and optional field types from `[x y]` or `[x :long y]`.
fn parse_fields(spec: &Value) -> Result<(Vec<Keyword>, Vec<Option<Keyword>>)> {
    let Value::Vector(items, _) = spec else {
        return Err(Error::syntax("deftype", "fields must be a vector"));
    };
    let mut names = Vec::new();
    let mut types: Vec<Option<Keyword>> = Vec::new();
    for item in items {
        match item {
            Value::Symbol(sym, _) if !sym.is_qualified() => {
                names.push(Keyword::new(sym.name()));
                types.push(None);
            }
            Value::Keyword(kw) => match types.last_mut() {
                Some(slot @ None) => *slot = Some(kw.clone()),
                _ => {
                    return Err(Error::syntax(
                        "deftype",
                        format!("unexpected field type {}", kw),
                    ));
                }
            },
            other => {
                return Err(Error::syntax(
                    "deftype",
                    format!("invalid field {}", print(other)),
                ));
            }
        }
    }
    Ok((names, types))
}

/// (deftype :name [field*] validator?)
pub(crate) fn eval_deftype(args: &[Value], env: &Env) -> Result<Value> {
    let [name, fields, rest @ ..] = args else {
        return Err(Error::syntax("deftype", "expected (deftype :name [fields] validator?)"));
    };
    let name = type_symbol("deftype", name, env)?;
    let (field_names, field_types) = parse_fields(fields)?;
    let validator = optional_validator("deftype", rest, env)?;

    let ty = Arc::new(CustomType {
        name,
        kind: CustomKind::Record {
            fields: field_names.clone(),
        },
        validator: validator.clone(),
    });
    env.runtime().register_type(Arc::clone(&ty))?;

    let ctor_ty = Arc::clone(&ty);
    intern_type_fns(env, &ty, move |args| {
        if args.len() != field_names.len() {
            return Err(Error::arity_named(
                format!("{}.", ctor_ty.name),
                field_names.len(),
                args.len(),
            ));
        }
        for ((field, expected), value) in field_names.iter().zip(&field_types).zip(args) {
            if let Some(expected) = expected
                && !has_type(value, expected)
            {
                return Err(Error::Type {
                    expected: "field type",
                    got: value.type_name(),
                    context: Some(format!("{} field {} must be {}", ctor_ty.name, field, expected)),
                });
            }
        }
        let instance = Value::Custom(CustomValue::new(Arc::clone(&ctor_ty), args.to_vec()));
        validate(&ctor_ty, validator.as_ref(), &instance)?;
        Ok(instance)
    })?;
    Ok(Value::Keyword(ty.type_keyword()))
}

/// (deftype? :name value) - whether `value` is an instance of the type.
pub(crate) fn eval_deftype_q(args: &[Value], env: &Env) -> Result<Value> {
    let [name, value] = args else {
        return Err(Error::syntax("deftype?", "expected (deftype? :name value)"));
    };
    let expected = keyword_name("deftype?", &eval(name, env)?)?;
    let value = eval(value, env)?;
    Ok(Value::Bool(
        matches!(&value, Value::Custom(_)) && has_type(&value, &expected),
    ))
}

// ============================================================================
// deftype-of and deftype-or
// ============================================================================

/// (deftype-of :name :base-type validator?) - a wrapper over a base value.
pub(crate) fn eval_deftype_of(args: &[Value], env: &Env) -> Result<Value> {
    let [name, base, rest @ ..] = args else {
        return Err(Error::syntax(
            "deftype-of",
            "expected (deftype-of :name :base-type validator?)",
        ));
    };
    let name = type_symbol("deftype-of", name, env)?;
    let base = keyword_name("deftype-of", base)?;
    let validator = optional_validator("deftype-of", rest, env)?;

    let ty = Arc::new(CustomType {
        name,
        kind: CustomKind::Wrapper { base: base.clone() },
        validator: validator.clone(),
    });
    env.runtime().register_type(Arc::clone(&ty))?;

    let ctor_ty = Arc::clone(&ty);
    intern_type_fns(env, &ty, move |args| {
        let [value] = args else {
            return Err(Error::arity_named(format!("{}.", ctor_ty.name), 1, args.len()));
        };
        if !has_type(value, &base) {
            return Err(Error::Type {
                expected: "base type",
                got: value.type_name(),
                context: Some(format!("{} wraps {}", ctor_ty.name, base)),
            });
        }
        // Validators of wrapper types see the wrapped value.
        if let Some(validator) = &validator
            && !apply(validator, std::slice::from_ref(value))?.is_truthy()
        {
            return Err(Error::Assertion(format!(
                "invalid value for type {}: {}",
                ctor_ty.type_keyword(),
                print(value)
            )));
        }
        Ok(Value::Custom(CustomValue::new(
            Arc::clone(&ctor_ty),
            vec![value.clone()],
        )))
    })?;
    Ok(Value::Keyword(ty.type_keyword()))
}

/// (deftype-or :name v1 v2 ...) - a choice among the listed values.
pub(crate) fn eval_deftype_or(args: &[Value], env: &Env) -> Result<Value> {
    let [name, choices @ ..] = args else {
        return Err(Error::syntax("deftype-or", "expected (deftype-or :name values*)"));
    };
    if choices.is_empty() {
        return Err(Error::syntax("deftype-or", "requires at least one value"));
    }
    let name = type_symbol("deftype-or", name, env)?;
    let mut values = OrdSet::new();
    for choice in choices {
        values.insert(eval(choice, env)?);
    }

    let ty = Arc::new(CustomType {
        name,
        kind: CustomKind::Choice {
            values: values.clone(),
        },
        validator: None,
    });
    env.runtime().register_type(Arc::clone(&ty))?;

    let ctor_ty = Arc::clone(&ty);
    intern_type_fns(env, &ty, move |args| {
        let [value] = args else {
            return Err(Error::arity_named(format!("{}.", ctor_ty.name), 1, args.len()));
        };
        if !values.contains(value) {
            return Err(Error::Assertion(format!(
                "{} is not a value of type {}",
                print(value),
                ctor_ty.type_keyword()
            )));
        }
        Ok(Value::Custom(CustomValue::new(
            Arc::clone(&ctor_ty),
            vec![value.clone()],
        )))
    })?;
    Ok(Value::Keyword(ty.type_keyword()))
}
