// vesper-parser - Textual rendering of values
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Two renderings are provided:
//!
//! - [`print`] produces readable text. For every literal scalar `v`,
//!   `read(print(v)) == v`.
//! - [`print_str`] renders strings raw (no quotes or escapes), as used by
//!   `str` and `println`.

use std::fmt::Write;

use crate::value::{CustomKind, Value};

/// Readable rendering.
pub fn print(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value, true);
    out
}

/// Human rendering: strings are written without quotes.
pub fn print_str(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_string(),
        Value::Nil => String::new(),
        other => {
            let mut out = String::new();
            write_value(&mut out, other, false);
            out
        }
    }
}

/// Escape a string for readable output.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Float text that always re-reads as a float.
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        let text = if f > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else {
        // Debug output is the shortest round-tripping form and always
        // contains a `.` or an exponent.
        format!("{:?}", f)
    }
}

fn write_seq<'a>(
    out: &mut String,
    open: &str,
    items: impl IntoIterator<Item = &'a Value>,
    close: &str,
    readable: bool,
) {
    out.push_str(open);
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        write_value(out, item, readable);
    }
    out.push_str(close);
}

fn write_value(out: &mut String, value: &Value, readable: bool) {
    match value {
        Value::Nil => out.push_str("nil"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Int(n) => {
            let _ = write!(out, "{}", n);
        }
        Value::Float(f) => out.push_str(&format_float(*f)),
        Value::Decimal(d) => {
            let _ = write!(out, "{}M", d);
        }
        Value::String(s) => {
            if readable {
                out.push_str(&escape_string(s));
            } else {
                out.push_str(s);
            }
        }
        Value::Keyword(k) => {
            let _ = write!(out, "{}", k);
        }
        Value::Symbol(s, _) => {
            let _ = write!(out, "{}", s);
        }
        Value::List(items, _) => write_seq(out, "(", items, ")", readable),
        Value::Vector(items, _) => write_seq(out, "[", items, "]", readable),
        Value::Set(items, _) => write_seq(out, "#{", items, "}", readable),
        Value::Map(map, _) => {
            out.push('{');
            for (i, (k, v)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, k, readable);
                out.push(' ');
                write_value(out, v, readable);
            }
            out.push('}');
        }
        Value::Fn(f) => {
            let kind = if f.is_macro() { "macro" } else { "fn" };
            let _ = write!(out, "#<{} {}>", kind, f.display_name());
        }
        Value::NativeFn(f) => {
            let _ = write!(out, "#<fn {}>", f.name());
        }
        Value::MultiFn(m) => {
            let _ = write!(out, "#<multi-fn {}>", m.name());
        }
        Value::Atom(a) => {
            out.push_str("#<atom ");
            write_value(out, &a.deref(), readable);
            out.push('>');
        }
        Value::Var(v) => {
            let _ = write!(out, "#'{}", v.name());
        }
        Value::Custom(c) => {
            let ty = c.ty();
            let _ = write!(out, "#{}", ty.name);
            match &ty.kind {
                CustomKind::Record { .. } => {
                    out.push('{');
                    for (i, (k, v)) in c.entries().iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        let _ = write!(out, "{} ", k);
                        write_value(out, v, readable);
                    }
                    out.push('}');
                }
                CustomKind::Wrapper { .. } | CustomKind::Choice { .. } => {
                    out.push('<');
                    if let Some(v) = c.fields().first() {
                        write_value(out, v, readable);
                    }
                    out.push('>');
                }
            }
        }
    }
}
