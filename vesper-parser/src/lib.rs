// vesper-parser - Reader, printer and value model for the Vesper language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # vesper-parser
//!
//! Value model, lexer, reader and printer for the Vesper programming
//! language. Produces `Value` trees from source text and renders them back.

pub mod decimal;
pub mod error;
mod intern;
pub mod keyword;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod symbol;
pub mod value;

pub use decimal::Decimal;
pub use error::ParseError;
pub use im::{OrdMap, OrdSet, Vector};
pub use keyword::Keyword;
pub use lexer::{Lexer, Spanned, Token, tokenize};
pub use num_bigint::BigInt;
pub use parser::{Parser, read, read_all};
pub use printer::{print, print_str};
pub use symbol::Symbol;
pub use value::{
    Atom, CustomKind, CustomType, CustomValue, FnArity, FnDef, Meta, MultiFn, NativeFn, Value,
    Var, VesperFn,
};
