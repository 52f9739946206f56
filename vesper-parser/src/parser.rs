// vesper-parser - Reader for Vesper
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Recursive descent reader turning tokens into [`Value`] trees.
//!
//! Reader macros expand to ordinary lists:
//!
//! | Source     | Form                    |
//! |------------|-------------------------|
//! | `'x`       | `(quote x)`             |
//! | `` `x ``   | `(quasiquote x)`        |
//! | `~x`       | `(unquote x)`           |
//! | `~@x`      | `(splice-unquote x)`    |
//! | `@x`       | `(deref x)`             |
//! | `^m x`     | `(with-meta x m)`       |
//! | `#(...)`   | `(fn [%1 .. & %&] (...))` |
//!
//! Every list, vector, map, set and symbol produced by the reader carries
//! `{:line L :column C :file F}` metadata.

use std::sync::Arc;

use im::{OrdSet, Vector};

use crate::error::{ParseError, Result};
use crate::keyword::Keyword;
use crate::lexer::{Lexer, Spanned, Token};
use crate::symbol::Symbol;
use crate::value::{Meta, Value};

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Spanned,
    /// Inside `#(...)`; nested anonymous function literals are rejected.
    in_anon_fn: bool,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, file: &str) -> Result<Self> {
        let mut lexer = Lexer::new(source, file);
        let current = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current,
            in_anon_fn: false,
        })
    }

    /// Read the next form, or `None` at end of input.
    pub fn parse(&mut self) -> Result<Option<Value>> {
        if self.current.token == Token::Eof {
            return Ok(None);
        }
        self.parse_form().map(Some)
    }

    pub fn parse_all(&mut self) -> Result<Vec<Value>> {
        let mut forms = Vec::new();
        while let Some(form) = self.parse()? {
            forms.push(form);
        }
        Ok(forms)
    }

    // ========================================================================
    // Internal parsing methods
    // ========================================================================

    fn advance(&mut self) -> Result<Spanned> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn syntax(&self, message: impl Into<String>) -> ParseError {
        ParseError::syntax(
            message,
            self.current.line,
            self.current.column,
            self.lexer.file(),
        )
    }

    fn eof(&self, message: impl Into<String>) -> ParseError {
        ParseError::eof(
            message,
            self.current.line,
            self.current.column,
            self.lexer.file(),
        )
    }

    fn position_meta(&self, line: usize, column: usize) -> Option<Arc<Meta>> {
        let mut meta = Meta::new();
        meta.insert(Value::keyword("line"), Value::Int(line as i64));
        meta.insert(Value::keyword("column"), Value::Int(column as i64));
        meta.insert(
            Value::keyword("file"),
            Value::String(Arc::clone(self.lexer.file())),
        );
        Some(Arc::new(meta))
    }

    fn parse_form(&mut self) -> Result<Value> {
        let Spanned {
            token,
            line,
            column,
        } = self.advance()?;
        match token {
            Token::Nil => Ok(Value::Nil),
            Token::True => Ok(Value::Bool(true)),
            Token::False => Ok(Value::Bool(false)),
            Token::Int(n) => Ok(Value::Int(n)),
            Token::Float(n) => Ok(Value::Float(n)),
            Token::Decimal(d) => Ok(Value::Decimal(d)),
            Token::String(s) => Ok(Value::string(s)),
            Token::Keyword(k) => Ok(Value::Keyword(Keyword::parse(&k))),
            Token::Symbol(s) => Ok(Value::Symbol(
                Symbol::parse(&s),
                self.position_meta(line, column),
            )),

            Token::LParen => {
                let items = self.parse_until(&Token::RParen)?;
                Ok(Value::List(items, self.position_meta(line, column)))
            }
            Token::LBracket => {
                let items = self.parse_until(&Token::RBracket)?;
                Ok(Value::Vector(items, self.position_meta(line, column)))
            }
            Token::LBrace => self.parse_map(line, column),
            Token::Set => self.parse_set(line, column),
            Token::AnonFn => self.parse_anon_fn(line, column),

            Token::Quote => self.parse_wrapped("quote", line, column),
            Token::SyntaxQuote => self.parse_wrapped("quasiquote", line, column),
            Token::Unquote => self.parse_wrapped("unquote", line, column),
            Token::UnquoteSplice => self.parse_wrapped("splice-unquote", line, column),
            Token::Deref => self.parse_wrapped("deref", line, column),
            Token::Meta => self.parse_meta(line, column),

            Token::RParen | Token::RBracket | Token::RBrace => {
                Err(ParseError::syntax(
                    format!("unexpected '{}'", token),
                    line,
                    column,
                    self.lexer.file(),
                ))
            }
            Token::Eof => Err(self.eof("unexpected end of input")),
        }
    }

    /// Forms up to the closing delimiter `close`, which is consumed.
    fn parse_until(&mut self, close: &Token) -> Result<Vector<Value>> {
        let mut items = Vector::new();
        loop {
            match &self.current.token {
                t if t == close => {
                    self.advance()?;
                    return Ok(items);
                }
                Token::Eof => return Err(self.eof(format!("expected '{}', got EOF", close))),
                Token::RParen | Token::RBracket | Token::RBrace => {
                    return Err(self.syntax(format!(
                        "expected '{}', got '{}'",
                        close, self.current.token
                    )));
                }
                _ => items.push_back(self.parse_form()?),
            }
        }
    }

    fn parse_map(&mut self, line: usize, column: usize) -> Result<Value> {
        let items = self.parse_until(&Token::RBrace)?;
        if items.len() % 2 != 0 {
            return Err(ParseError::syntax(
                "map literal must contain an even number of forms",
                line,
                column,
                self.lexer.file(),
            ));
        }
        let mut map = im::OrdMap::new();
        let mut iter = items.into_iter();
        while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
            map.insert(k, v);
        }
        Ok(Value::Map(map, self.position_meta(line, column)))
    }

    fn parse_set(&mut self, line: usize, column: usize) -> Result<Value> {
        let items = self.parse_until(&Token::RBrace)?;
        let mut set = OrdSet::new();
        for item in items {
            if set.insert(item.clone()).is_some() {
                return Err(ParseError::syntax(
                    format!("duplicate set element {}", item),
                    line,
                    column,
                    self.lexer.file(),
                ));
            }
        }
        Ok(Value::Set(set, self.position_meta(line, column)))
    }

    fn parse_wrapped(&mut self, name: &str, line: usize, column: usize) -> Result<Value> {
        if self.current.token == Token::Eof {
            return Err(self.eof(format!("expected a form after {}", name)));
        }
        let form = self.parse_form()?;
        let head = Value::Symbol(Symbol::new(name), self.position_meta(line, column));
        Ok(Value::List(
            Vector::from(vec![head, form]),
            self.position_meta(line, column),
        ))
    }

    /// `^meta form` becomes `(with-meta form meta)`. Shorthands:
    /// `^:kw` is `{:kw true}` and `^Type` / `^"Type"` is `{:tag Type}`.
    fn parse_meta(&mut self, line: usize, column: usize) -> Result<Value> {
        if self.current.token == Token::Eof {
            return Err(self.eof("expected metadata after ^"));
        }
        let meta = match self.parse_form()? {
            Value::Keyword(k) => Value::map([(Value::Keyword(k), Value::Bool(true))]),
            tag @ (Value::Symbol(..) | Value::String(_)) => {
                Value::map([(Value::keyword("tag"), tag)])
            }
            map @ Value::Map(..) => map,
            other => {
                return Err(ParseError::syntax(
                    format!("metadata must be a keyword, symbol, string or map, got {}", other),
                    line,
                    column,
                    self.lexer.file(),
                ));
            }
        };
        if self.current.token == Token::Eof {
            return Err(self.eof("expected a form after metadata"));
        }
        let target = self.parse_form()?;
        Ok(Value::List(
            Vector::from(vec![Value::symbol("with-meta"), target, meta]),
            self.position_meta(line, column),
        ))
    }

    fn parse_anon_fn(&mut self, line: usize, column: usize) -> Result<Value> {
        if self.in_anon_fn {
            return Err(ParseError::syntax(
                "nested #()s are not allowed",
                line,
                column,
                self.lexer.file(),
            ));
        }
        self.in_anon_fn = true;
        let body = self.parse_until(&Token::RParen);
        self.in_anon_fn = false;

        let body = Value::List(body?, self.position_meta(line, column));
        let mut max_arg = 0;
        let mut has_rest = false;
        scan_anon_args(&body, &mut max_arg, &mut has_rest);
        let body = rename_bare_percent(body);

        let mut params: Vector<Value> = (1..=max_arg)
            .map(|i| Value::symbol(&format!("%{}", i)))
            .collect();
        if has_rest {
            params.push_back(Value::symbol("&"));
            params.push_back(Value::symbol("%&"));
        }
        Ok(Value::List(
            Vector::from(vec![
                Value::Symbol(Symbol::new("fn"), self.position_meta(line, column)),
                Value::Vector(params, None),
                body,
            ]),
            self.position_meta(line, column),
        ))
    }
}

/// Highest `%N` used (bare `%` counts as `%1`) and whether `%&` appears.
fn scan_anon_args(form: &Value, max_arg: &mut usize, has_rest: &mut bool) {
    match form {
        Value::Symbol(sym, _) if !sym.is_qualified() => match sym.name() {
            "%" => *max_arg = (*max_arg).max(1),
            "%&" => *has_rest = true,
            name => {
                if let Some(n) = name.strip_prefix('%').and_then(|d| d.parse::<usize>().ok()) {
                    *max_arg = (*max_arg).max(n);
                }
            }
        },
        Value::List(items, _) | Value::Vector(items, _) => {
            for item in items {
                scan_anon_args(item, max_arg, has_rest);
            }
        }
        Value::Set(items, _) => {
            for item in items {
                scan_anon_args(item, max_arg, has_rest);
            }
        }
        Value::Map(map, _) => {
            for (k, v) in map {
                scan_anon_args(k, max_arg, has_rest);
                scan_anon_args(v, max_arg, has_rest);
            }
        }
        _ => {}
    }
}

fn rename_bare_percent(form: Value) -> Value {
    match form {
        Value::Symbol(sym, meta) if !sym.is_qualified() && sym.name() == "%" => {
            Value::Symbol(Symbol::new("%1"), meta)
        }
        Value::List(items, meta) => {
            Value::List(items.into_iter().map(rename_bare_percent).collect(), meta)
        }
        Value::Vector(items, meta) => {
            Value::Vector(items.into_iter().map(rename_bare_percent).collect(), meta)
        }
        Value::Set(items, meta) => {
            Value::Set(items.into_iter().map(rename_bare_percent).collect(), meta)
        }
        Value::Map(map, meta) => Value::Map(
            map.into_iter()
                .map(|(k, v)| (rename_bare_percent(k), rename_bare_percent(v)))
                .collect(),
            meta,
        ),
        other => other,
    }
}

/// Read exactly one form. Empty input is an `Eof` error.
pub fn read(source: &str, file: &str) -> Result<Value> {
    let mut parser = Parser::new(source, file)?;
    match parser.parse()? {
        Some(form) => Ok(form),
        None => Err(ParseError::eof(
            "no form to read",
            parser.current.line,
            parser.current.column,
            parser.lexer.file(),
        )),
    }
}

/// Read every form in `source`.
pub fn read_all(source: &str, file: &str) -> Result<Vec<Value>> {
    Parser::new(source, file)?.parse_all()
}
