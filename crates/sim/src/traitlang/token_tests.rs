// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn tokenizes_simple_assignment() {
    let tokens = tokenize("x = 1\n").expect("lex ok");
    assert_eq!(
        tokens,
        vec![Token::Name("x".to_string()), Token::Assign, Token::Int(1), Token::Newline, Token::Eof]
    );
}

#[test]
fn emits_indent_and_dedent() {
    let src = "if x:\n    y = 1\nz = 2\n";
    let tokens = tokenize(src).expect("lex ok");
    assert!(tokens.contains(&Token::Indent));
    assert!(tokens.contains(&Token::Dedent));
}

#[test]
fn skips_comments_and_blank_lines() {
    let src = "# a comment\n\nx = 1  # trailing\n";
    let tokens = tokenize(src).expect("lex ok");
    assert_eq!(
        tokens,
        vec![Token::Name("x".to_string()), Token::Assign, Token::Int(1), Token::Newline, Token::Eof]
    );
}

#[test]
fn rejects_tabs() {
    let err = tokenize("if x:\n\ty = 1\n").unwrap_err();
    assert!(err.0.contains("tab"));
}

#[test]
fn reads_float_and_string_literals() {
    let tokens = tokenize("x = 3.5\ny = 'hi'\n").expect("lex ok");
    assert!(tokens.contains(&Token::Float(3.5)));
    assert!(tokens.contains(&Token::Str("hi".to_string())));
}
