// vesper-parser - Property-based tests for the reader
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Property-based tests for the reader and printer.
//!
//! Tests the following properties:
//! - Reading arbitrary text returns a value or an error, never panics
//! - Printed strings read back unchanged, whatever they contain
//! - Integer literals read as the integer they spell
//! - Vectors of keywords keep their order and length

use proptest::prelude::*;
use vesper_parser::{Keyword, Value, print, read, read_all};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn reader_never_panics(source in ".{0,64}") {
        let _ = read_all(&source, "fuzz");
    }

    #[test]
    fn reader_never_panics_on_delimiters(source in "[()\\[\\]{}#'`~@^ ;\"\\\\a1:]{0,32}") {
        let _ = read_all(&source, "fuzz");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn printed_strings_read_back(text in "\\PC{0,24}") {
        let printed = print(&Value::string(&text));
        let read_back = read(&printed, "roundtrip").unwrap();
        prop_assert_eq!(read_back, Value::string(&text));
    }

    #[test]
    fn integer_literals(n in -1_000_000_000i64..1_000_000_000i64) {
        prop_assert_eq!(read(&n.to_string(), "int").unwrap(), Value::int(n));
    }

    #[test]
    fn keyword_vectors(names in prop::collection::vec("[a-z][a-z0-9-]{0,8}", 0..6)) {
        let source = format!(
            "[{}]",
            names.iter().map(|n| format!(":{}", n)).collect::<Vec<_>>().join(" ")
        );
        let expected = Value::vector(names.iter().map(|n| Value::Keyword(Keyword::new(n))));
        prop_assert_eq!(read(&source, "kw").unwrap(), expected);
    }
}
