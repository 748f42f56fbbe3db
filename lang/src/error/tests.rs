use std::sync::Arc;

use super::*;
use crate::lexer::token::Source;
use crate::lexer::tokenize;
use expect_test::expect;

/// The position of the `index`th character of `source`.
fn at(source: &Arc<Source>, index: usize) -> Position {
    source
        .text
        .chars()
        .take(index)
        .fold(Position::start_of(source.clone()), |mut pos, ch| {
            pos.advance(ch);
            pos
        })
}

fn span(source: &Arc<Source>, start: usize, end: usize) -> Span {
    Span::new(at(source, start), at(source, end))
}

#[test]
fn illegal_character_display() {
    let source = Source::new("<test>", "1 + @");
    let err = Diagnostic::illegal_character("'@'", span(&source, 4, 5));
    expect![[r#"
        Illegal Character: '@'
        File <test>, line 1

        1 + @
            ^"#]]
    .assert_eq(&err.to_string());
}

#[test]
fn lexer_diagnostic_points_at_its_line() {
    let err = tokenize("demo.ss", "1\nx ? 2").unwrap_err();
    expect![[r#"
        Illegal Character: '?'
        File demo.ss, line 2

        x ? 2
          ^"#]]
    .assert_eq(&err.to_string());
}

#[test]
fn arrows_cover_every_spanned_line() {
    let source = Source::new("<test>", "VAR x = (1 +\n  2");
    let err = Diagnostic::invalid_syntax("Expected ')'", span(&source, 8, 16));
    expect![[r#"
        Invalid Syntax: Expected ')'
        File <test>, line 1

        VAR x = (1 +
                ^^^^
          2
        ^^^"#]]
    .assert_eq(&err.to_string());
}

#[test]
fn zero_width_span_still_draws_an_arrow() {
    let source = Source::new("<test>", "1 +");
    let eof = at(&source, 3);
    assert_eq!(string_with_arrows(&eof, &eof), "1 +\n   ^");
}

#[test]
fn arrow_padding_keeps_tabs() {
    let source = Source::new("<test>", "\tfoo $");
    let rendered = string_with_arrows(&at(&source, 5), &at(&source, 6));
    assert_eq!(rendered, "\tfoo $\n\t    ^");
}

#[test]
fn range_ending_at_a_line_start_stops_at_the_line_break() {
    let source = Source::new("<test>", "x !\ny");
    assert_eq!(string_with_arrows(&at(&source, 2), &at(&source, 4)), "x !\n  ^");
}

#[test]
fn error_at_a_line_break_marks_only_its_own_line() {
    let err = crate::run("t.ss", "VAR x =\n5").unwrap_err();
    expect![[r#"
        Invalid Syntax: Expected 'VAR', 'IF', 'FOR', 'WHILE', 'FUN', int, float, string, identifier, '+', '-', '(', '[' or 'NOT'
        File t.ss, line 1

        VAR x =
               ^"#]]
    .assert_eq(&err.to_string());

    let err = crate::run("t.ss", "(1 +\n2)").unwrap_err();
    assert!(err.to_string().ends_with("\n\n(1 +\n    ^"), "{}", err);
}

#[test]
fn lone_bang_before_a_line_break_marks_only_its_own_line() {
    let err = crate::run("t.ss", "x !\ny").unwrap_err();
    expect![[r#"
        Expected Character: '=' (after '!')
        File t.ss, line 1

        x !
          ^"#]]
    .assert_eq(&err.to_string());
}

#[test]
fn runtime_error_display_with_traceback() {
    let source = Source::new("<test>", "FUN f()\n  1/0\nEND\nf()");
    let program = Context::new("<program>");
    let function = Context::with_parent("f", program, at(&source, 18));
    let err = Diagnostic::runtime("Division by zero", span(&source, 10, 13), function);

    expect![[r#"
        Traceback (most recent call last):
          File <test>, line 4, in <program>
          File <test>, line 2, in f
        Runtime Error: Division by zero

          1/0
          ^^^"#]]
    .assert_eq(&err.to_string());
}

#[test]
fn traceback_is_empty_outside_runtime_errors() {
    let source = Source::new("<test>", "x");
    let err = Diagnostic::invalid_syntax("Expected '='", span(&source, 0, 1));
    assert_eq!(err.traceback(), "");
}

#[test]
fn diagnostic_kinds() {
    let source = Source::new("<test>", "x");
    let s = span(&source, 0, 1);
    let kinds: Vec<&str> = [
        Diagnostic::illegal_character("x", s.clone()),
        Diagnostic::expected_character("x", s.clone()),
        Diagnostic::invalid_number("x", s.clone()),
        Diagnostic::invalid_syntax("x", s.clone()),
        Diagnostic::runtime("x", s, Context::new("<program>")),
    ]
    .iter()
    .map(Diagnostic::kind)
    .collect();

    expect![[r#"
        [
            "Illegal Character",
            "Expected Character",
            "Invalid Number",
            "Invalid Syntax",
            "Runtime Error",
        ]
    "#]]
    .assert_debug_eq(&kinds);
}

#[test]
fn diagnostic_accessors() {
    let source = Source::new("main.ss", "VAR x 1");
    let err = Diagnostic::invalid_syntax("Expected '='", span(&source, 6, 7));

    assert_eq!(err.details(), "Expected '='");
    assert_eq!(err.span().to_string(), "1:6-1:7");
    assert_eq!(err.position().column, 6);
    assert_eq!(err.position().filename(), "main.ss");

    let as_error: &dyn std::error::Error = &err;
    assert!(as_error.to_string().starts_with("Invalid Syntax: Expected '='"));
}
