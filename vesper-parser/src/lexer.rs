// vesper-parser - Lexer for Vesper
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Lexer (tokeniser) for Vesper source code.
//!
//! Commas count as whitespace and `;` starts a comment running to the end
//! of the line. Every token records the line and column it started at.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;
use std::sync::Arc;

use crate::decimal::Decimal;
use crate::error::{ParseError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,

    Quote,         // '
    SyntaxQuote,   // `
    Unquote,       // ~
    UnquoteSplice, // ~@
    Deref,         // @
    Meta,          // ^
    AnonFn,        // #(
    Set,           // #{

    Nil,
    True,
    False,
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    String(String),
    Symbol(String),
    Keyword(String),

    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::LBracket => f.write_str("["),
            Token::RBracket => f.write_str("]"),
            Token::LBrace => f.write_str("{"),
            Token::RBrace => f.write_str("}"),
            Token::Quote => f.write_str("'"),
            Token::SyntaxQuote => f.write_str("`"),
            Token::Unquote => f.write_str("~"),
            Token::UnquoteSplice => f.write_str("~@"),
            Token::Deref => f.write_str("@"),
            Token::Meta => f.write_str("^"),
            Token::AnonFn => f.write_str("#("),
            Token::Set => f.write_str("#{"),
            Token::Nil => f.write_str("nil"),
            Token::True => f.write_str("true"),
            Token::False => f.write_str("false"),
            Token::Int(n) => write!(f, "{}", n),
            Token::Float(n) => write!(f, "{}", n),
            Token::Decimal(d) => write!(f, "{}M", d),
            Token::String(s) => write!(f, "{:?}", s),
            Token::Symbol(s) => f.write_str(s),
            Token::Keyword(s) => write!(f, ":{}", s),
            Token::Eof => f.write_str("EOF"),
        }
    }
}

/// A token with the position of its first character.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
    pub column: usize,
}

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
    file: Arc<str>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, file: &str) -> Self {
        Lexer {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
            file: Arc::from(file),
        }
    }

    #[must_use]
    pub fn file(&self) -> &Arc<str> {
        &self.file
    }

    pub fn next_token(&mut self) -> Result<Spanned> {
        self.skip_whitespace_and_comments();
        let (line, column) = (self.line, self.column);
        let token = self.read_token()?;
        Ok(Spanned {
            token,
            line,
            column,
        })
    }

    /// Collect every token up to (not including) end of input.
    pub fn tokenize(&mut self) -> Result<Vec<Spanned>> {
        let mut tokens = Vec::new();
        loop {
            let spanned = self.next_token()?;
            if spanned.token == Token::Eof {
                return Ok(tokens);
            }
            tokens.push(spanned);
        }
    }

    fn read_token(&mut self) -> Result<Token> {
        let Some(c) = self.peek() else {
            return Ok(Token::Eof);
        };
        let single = match c {
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            '{' => Some(Token::LBrace),
            '}' => Some(Token::RBrace),
            '\'' => Some(Token::Quote),
            '`' => Some(Token::SyntaxQuote),
            '@' => Some(Token::Deref),
            '^' => Some(Token::Meta),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return Ok(token);
        }
        match c {
            '~' => {
                self.advance();
                if self.peek() == Some('@') {
                    self.advance();
                    Ok(Token::UnquoteSplice)
                } else {
                    Ok(Token::Unquote)
                }
            }
            '#' => self.read_dispatch(),
            '"' => self.read_string(),
            ':' => self.read_keyword(),
            '-' | '+' => self.read_number_or_symbol(),
            '0'..='9' => self.read_number(String::new()),
            c if is_symbol_start(c) => self.read_symbol(),
            c => Err(self.syntax(format!("unexpected character '{}'", c))),
        }
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn syntax(&self, message: impl Into<String>) -> ParseError {
        ParseError::syntax(message, self.line, self.column, &self.file)
    }

    fn eof(&self, message: impl Into<String>) -> ParseError {
        ParseError::eof(message, self.line, self.column, &self.file)
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == ',' {
                self.advance();
            } else if c == ';' {
                self.skip_line();
            } else {
                break;
            }
        }
    }

    fn read_dispatch(&mut self) -> Result<Token> {
        self.advance(); // #
        match self.peek() {
            Some('(') => {
                self.advance();
                Ok(Token::AnonFn)
            }
            Some('{') => {
                self.advance();
                Ok(Token::Set)
            }
            Some('!') => {
                // shebang / comment line
                self.skip_line();
                self.skip_whitespace_and_comments();
                self.read_token()
            }
            Some(c) => Err(self.syntax(format!("unknown dispatch macro #{}", c))),
            None => Err(self.eof("expected a dispatch character after #")),
        }
    }

    fn read_string(&mut self) -> Result<Token> {
        self.advance(); // opening "
        if self.peek() != Some('"') {
            return self.read_single_quoted().map(Token::String);
        }
        self.advance();
        if self.peek() == Some('"') {
            self.advance();
            self.read_triple_quoted().map(Token::String)
        } else {
            Ok(Token::String(String::new()))
        }
    }

    fn read_single_quoted(&mut self) -> Result<String> {
        let mut s = String::new();
        loop {
            match self.advance() {
                Some('"') => return Ok(s),
                Some('\\') => s.push(self.read_escape(false)?),
                Some('\n') => return Err(self.syntax("expected closing quote, got EOL")),
                Some(c) => s.push(c),
                None => return Err(self.syntax("expected closing quote, got EOF")),
            }
        }
    }

    /// Content of `"""..."""`: raw newlines and lone quotes are kept.
    fn read_triple_quoted(&mut self) -> Result<String> {
        let mut s = String::new();
        let mut quotes = 0;
        loop {
            match self.advance() {
                Some('"') => {
                    quotes += 1;
                    if quotes == 3 {
                        // quotes beyond the closing three belong to the content
                        while self.peek() == Some('"') {
                            self.advance();
                            s.push('"');
                        }
                        return Ok(s);
                    }
                }
                Some(c) => {
                    s.extend(std::iter::repeat_n('"', quotes));
                    quotes = 0;
                    if c == '\\' {
                        s.push(self.read_escape(true)?);
                    } else {
                        s.push(c);
                    }
                }
                None => return Err(self.eof("expected closing \"\"\" of a triple quoted string")),
            }
        }
    }

    /// Escape after a backslash. Input ending inside a triple quoted
    /// string is incomplete rather than malformed.
    fn read_escape(&mut self, multiline: bool) -> Result<char> {
        match self.advance() {
            Some('n') => Ok('\n'),
            Some('t') => Ok('\t'),
            Some('r') => Ok('\r'),
            Some('0') => Ok('\0'),
            Some('\\') => Ok('\\'),
            Some('"') => Ok('"'),
            Some('\'') => Ok('\''),
            Some('u') => self.read_unicode_escape(multiline),
            Some(c) => Err(self.syntax(format!("unknown escape sequence \\{}", c))),
            None if multiline => Err(self.eof("expected closing \"\"\" of a triple quoted string")),
            None => Err(self.syntax("expected closing quote, got EOF")),
        }
    }

    fn read_unicode_escape(&mut self, multiline: bool) -> Result<char> {
        let mut hex = String::with_capacity(4);
        for _ in 0..4 {
            match self.advance() {
                Some(c) if c.is_ascii_hexdigit() => hex.push(c),
                Some(c) => return Err(self.syntax(format!("invalid unicode escape digit '{}'", c))),
                None if multiline => return Err(self.eof("unterminated unicode escape")),
                None => return Err(self.syntax("unterminated unicode escape")),
            }
        }
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.syntax(format!("invalid unicode code point \\u{}", hex)))
    }

    fn take_symbol_chars(&mut self, s: &mut String) {
        while let Some(c) = self.peek() {
            if is_symbol_char(c) {
                s.push(c);
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_keyword(&mut self) -> Result<Token> {
        self.advance(); // :
        let mut name = String::new();
        self.take_symbol_chars(&mut name);
        if name.is_empty() {
            return Err(self.syntax("expected a keyword name after ':'"));
        }
        Ok(Token::Keyword(name))
    }

    fn read_symbol(&mut self) -> Result<Token> {
        let mut name = String::new();
        self.take_symbol_chars(&mut name);
        Ok(match name.as_str() {
            "nil" => Token::Nil,
            "true" => Token::True,
            "false" => Token::False,
            _ => Token::Symbol(name),
        })
    }

    fn read_number_or_symbol(&mut self) -> Result<Token> {
        let mut text = String::new();
        if let Some(sign) = self.advance() {
            text.push(sign);
        }
        match self.peek() {
            Some(c) if c.is_ascii_digit() => self.read_number(text),
            _ => {
                self.take_symbol_chars(&mut text);
                Ok(Token::Symbol(text))
            }
        }
    }

    fn read_number(&mut self, mut text: String) -> Result<Token> {
        while let Some(c) = self.peek() {
            let exponent_sign = (c == '-' || c == '+') && text.ends_with(['e', 'E']);
            if c.is_ascii_alphanumeric() || c == '.' || exponent_sign {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        self.parse_number(&text)
    }

    fn parse_number(&self, text: &str) -> Result<Token> {
        if let Some(digits) = text.strip_suffix('M') {
            return digits
                .parse::<Decimal>()
                .map(Token::Decimal)
                .map_err(|_| self.syntax(format!("invalid decimal literal '{}'", text)));
        }
        let body = text.trim_start_matches(['-', '+']);
        if !body.bytes().all(|b| b.is_ascii_digit() || b"eE.+-".contains(&b)) {
            return Err(self.syntax(format!("invalid number '{}'", text)));
        }
        if body.contains(['.', 'e', 'E']) {
            text.parse::<f64>()
                .map(Token::Float)
                .map_err(|_| self.syntax(format!("invalid float literal '{}'", text)))
        } else {
            text.parse::<i64>()
                .map(Token::Int)
                .map_err(|_| self.syntax(format!("integer literal out of range '{}'", text)))
        }
    }
}

/// Tokenize `source` in one pass.
pub fn tokenize(source: &str, file: &str) -> Result<Vec<Spanned>> {
    Lexer::new(source, file).tokenize()
}

fn is_symbol_start(c: char) -> bool {
    c.is_alphabetic() || "*+!-_?<>=/.&%$|".contains(c)
}

fn is_symbol_char(c: char) -> bool {
    c.is_alphanumeric() || "*+!-_?<>=/.&%$|#':".contains(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token> {
        tokenize(src, "test")
            .expect("tokenize")
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_delimiters_and_reader_macros() {
        assert_eq!(
            tokens("(['~@x]) #{ #("),
            vec![
                Token::LParen,
                Token::LBracket,
                Token::Quote,
                Token::UnquoteSplice,
                Token::Symbol("x".into()),
                Token::RBracket,
                Token::RParen,
                Token::Set,
                Token::AnonFn,
            ]
        );
    }

    #[test]
    fn test_commas_and_comments_are_whitespace() {
        assert_eq!(
            tokens("1, 2 ; three\n4"),
            vec![Token::Int(1), Token::Int(2), Token::Int(4)]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens("-12 3.5 1e3 2.50M -7M"),
            vec![
                Token::Int(-12),
                Token::Float(3.5),
                Token::Float(1000.0),
                Token::Decimal("2.50".parse().expect("decimal")),
                Token::Decimal("-7".parse().expect("decimal")),
            ]
        );
    }

    #[test]
    fn test_sign_symbols() {
        assert_eq!(
            tokens("- + -> +x"),
            vec![
                Token::Symbol("-".into()),
                Token::Symbol("+".into()),
                Token::Symbol("->".into()),
                Token::Symbol("+x".into()),
            ]
        );
    }

    #[test]
    fn test_int_overflow_is_syntax_error() {
        let err = tokenize("99999999999999999999", "t").unwrap_err();
        assert!(!err.is_eof());
    }

    #[test]
    fn test_triple_quoted_string() {
        assert_eq!(
            tokens("\"\"\"a \"quoted\"\nline\"\"\""),
            vec![Token::String("a \"quoted\"\nline".into())]
        );
        assert_eq!(tokens("\"\""), vec![Token::String(String::new())]);
    }

    #[test]
    fn test_unterminated_strings() {
        let single = tokenize("\"abc", "t").unwrap_err();
        assert!(!single.is_eof());
        assert!(single.message().contains("expected closing quote"));

        let triple = tokenize("\"\"\"abc", "t").unwrap_err();
        assert!(triple.is_eof());
    }

    #[test]
    fn test_triple_quoted_string_ending_in_escape_is_incomplete() {
        let err = tokenize("\"\"\"abc\\", "t").unwrap_err();
        assert!(err.is_eof());
        let err = tokenize("\"\"\"abc\\u00", "t").unwrap_err();
        assert!(err.is_eof());

        let single = tokenize("\"abc\\", "t").unwrap_err();
        assert!(!single.is_eof());
    }

    #[test]
    fn test_positions() {
        let spans = tokenize("a\n  b", "t").expect("tokenize");
        assert_eq!((spans[0].line, spans[0].column), (1, 1));
        assert_eq!((spans[1].line, spans[1].column), (2, 3));
    }

    #[test]
    fn test_keywords_and_literals() {
        assert_eq!(
            tokens(":a :ns/b nil true false"),
            vec![
                Token::Keyword("a".into()),
                Token::Keyword("ns/b".into()),
                Token::Nil,
                Token::True,
                Token::False,
            ]
        );
    }
}
