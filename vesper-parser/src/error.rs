// vesper-parser - Reader errors
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use std::sync::Arc;

use thiserror::Error;

/// Error raised while tokenizing or reading source text.
///
/// `Eof` means the input ended before a form was complete: a REPL can
/// treat it as "read another line". Every other problem is `Syntax`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("ParseError: {message} ({file}:{line}:{column})")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
        file: Arc<str>,
    },
    #[error("EofError: {message} ({file}:{line}:{column})")]
    Eof {
        message: String,
        line: usize,
        column: usize,
        file: Arc<str>,
    },
}

impl ParseError {
    pub fn syntax(message: impl Into<String>, line: usize, column: usize, file: &Arc<str>) -> Self {
        ParseError::Syntax {
            message: message.into(),
            line,
            column,
            file: Arc::clone(file),
        }
    }

    pub fn eof(message: impl Into<String>, line: usize, column: usize, file: &Arc<str>) -> Self {
        ParseError::Eof {
            message: message.into(),
            line,
            column,
            file: Arc::clone(file),
        }
    }

    #[must_use]
    pub fn is_eof(&self) -> bool {
        matches!(self, ParseError::Eof { .. })
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            ParseError::Syntax { message, .. } | ParseError::Eof { message, .. } => message,
        }
    }

    /// `(line, column)` of the offending input.
    #[must_use]
    pub fn position(&self) -> (usize, usize) {
        match self {
            ParseError::Syntax { line, column, .. } | ParseError::Eof { line, column, .. } => {
                (*line, *column)
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;
