//! Property-based tests for the lexer.
//!
//! 1. Whitespace, comments and separators lex to NEWLINE tokens and one EOF.
//! 2. Integer literals keep their exact value and never merge across spaces.
//! 3. A leading unrecognised character fails with a one-character span.
//! 4. Lexing is deterministic and never panics.

use proptest::prelude::*;

use super::token::TokenKind;
use super::tokenize;
use crate::error::Diagnostic;

fn blank_fragment() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(" ".to_string()),
        Just("\t".to_string()),
        Just("\n".to_string()),
        Just(";".to_string()),
        "[a-z +*]{0,12}".prop_map(|body| format!("#{}\n", body)),
    ]
}

fn blank_source() -> impl Strategy<Value = String> {
    prop::collection::vec(blank_fragment(), 0..20).prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn blank_sources_lex_to_newlines_then_eof(input in blank_source()) {
        let tokens = tokenize("<prop>", &input).unwrap();
        let (last, rest) = tokens.split_last().unwrap();
        prop_assert_eq!(&last.kind, &TokenKind::Eof);
        for token in rest {
            prop_assert_eq!(&token.kind, &TokenKind::Newline);
        }
    }

    #[test]
    fn integer_literals_keep_their_value(values in prop::collection::vec(0..i64::MAX, 1..8)) {
        let input = values
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        let kinds: Vec<TokenKind> = tokenize("<prop>", &input)
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect();

        let mut expected: Vec<TokenKind> = values.into_iter().map(TokenKind::Int).collect();
        expected.push(TokenKind::Eof);
        prop_assert_eq!(kinds, expected);
    }

    #[test]
    fn leading_illegal_character_spans_one_char(
        bad in prop::sample::select(vec!['@', '$', '%', '&', '|', '~', '?', '{', '}', ':', '.', '\'']),
        rest in "[a-z0-9 +]{0,10}",
    ) {
        let input = format!("{}{}", bad, rest);
        let err = tokenize("<prop>", &input).unwrap_err();
        let is_illegal = matches!(err, Diagnostic::IllegalCharacter { .. });
        prop_assert!(is_illegal);
        prop_assert_eq!(err.span().start.index, 0);
        prop_assert_eq!(err.span().end.index, 1);
    }

    #[test]
    fn lexing_is_deterministic(input in "\\PC{0,200}") {
        prop_assert_eq!(tokenize("<prop>", &input), tokenize("<prop>", &input));
    }
}
