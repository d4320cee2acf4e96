// SPDX-License-Identifier: MIT

//! Tokenizer for the trait script language: a restricted, Python-flavored
//! surface (spec.md §9 redesign note (a)) with significant indentation.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Name(String),
    Int(i64),
    Float(f64),
    Str(String),

    Newline,
    Indent,
    Dedent,

    Colon,
    Comma,
    Dot,
    LParen,
    RParen,
    LBracket,
    RBracket,

    Assign,
    PlusEq,
    MinusEq,

    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    Percent,

    Eq,
    NotEq,
    Lt,
    Gt,
    Le,
    Ge,

    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LexError(pub String);

/// Tokenize `source` into a flat stream, synthesizing `Indent`/`Dedent`
/// tokens from leading-whitespace width the way Python's tokenizer does.
/// Blank lines and comment-only lines (`#...`) are skipped entirely.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();
    let mut indents: Vec<usize> = vec![0];
    // Tracks paren depth: inside `(...)` newlines are not statement breaks.
    let mut paren_depth: i32 = 0;

    for raw_line in source.split('\n') {
        let line = strip_comment(raw_line);
        let trimmed = line.trim_end();

        if paren_depth == 0 {
            if trimmed.trim().is_empty() {
                continue;
            }
            let indent_width = leading_spaces(trimmed)?;
            let body = &trimmed[indent_width..];

            let current = *indents.last().unwrap_or(&0);
            if indent_width > current {
                indents.push(indent_width);
                tokens.push(Token::Indent);
            } else {
                while indent_width < *indents.last().unwrap_or(&0) {
                    indents.pop();
                    tokens.push(Token::Dedent);
                }
                if indent_width != *indents.last().unwrap_or(&0) {
                    return Err(LexError("inconsistent indentation".to_string()));
                }
            }

            tokenize_line(body, &mut tokens, &mut paren_depth)?;
            if paren_depth == 0 {
                tokens.push(Token::Newline);
            }
        } else {
            tokenize_line(trimmed, &mut tokens, &mut paren_depth)?;
        }
    }

    while indents.len() > 1 {
        indents.pop();
        tokens.push(Token::Dedent);
    }
    tokens.push(Token::Eof);
    Ok(tokens)
}

fn strip_comment(line: &str) -> &str {
    let mut in_str: Option<char> = None;
    let bytes = line.as_bytes();
    for (i, ch) in line.char_indices() {
        match in_str {
            Some(q) if ch == q => in_str = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => in_str = Some(ch),
            None if ch == '#' => return &line[..i],
            None => {}
        }
        let _ = bytes;
    }
    line
}

fn leading_spaces(line: &str) -> Result<usize, LexError> {
    if line.contains('\t') {
        return Err(LexError("tabs are not permitted; use spaces".to_string()));
    }
    Ok(line.len() - line.trim_start_matches(' ').len())
}

fn tokenize_line(body: &str, tokens: &mut Vec<Token>, paren_depth: &mut i32) -> Result<(), LexError> {
    let chars: Vec<char> = body.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == ' ' {
            i += 1;
            continue;
        }
        if c.is_ascii_digit() {
            let start = i;
            let mut is_float = false;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                if chars[i] == '.' {
                    is_float = true;
                }
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            if is_float {
                let v: f64 = text
                    .parse()
                    .map_err(|_| LexError(format!("invalid float literal {text}")))?;
                tokens.push(Token::Float(v));
            } else {
                let v: i64 = text
                    .parse()
                    .map_err(|_| LexError(format!("invalid int literal {text}")))?;
                tokens.push(Token::Int(v));
            }
            continue;
        }
        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            tokens.push(Token::Name(text));
            continue;
        }
        if c == '"' || c == '\'' {
            let quote = c;
            i += 1;
            let start = i;
            while i < chars.len() && chars[i] != quote {
                i += 1;
            }
            if i >= chars.len() {
                return Err(LexError("unterminated string literal".to_string()));
            }
            let text: String = chars[start..i].iter().collect();
            tokens.push(Token::Str(text));
            i += 1;
            continue;
        }
        match c {
            '(' => {
                *paren_depth += 1;
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                *paren_depth -= 1;
                tokens.push(Token::RParen);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            ':' => {
                tokens.push(Token::Colon);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            '+' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::PlusEq);
                    i += 2;
                } else {
                    tokens.push(Token::Plus);
                    i += 1;
                }
            }
            '-' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::MinusEq);
                    i += 2;
                } else {
                    tokens.push(Token::Minus);
                    i += 1;
                }
            }
            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    tokens.push(Token::DoubleStar);
                    i += 2;
                } else {
                    tokens.push(Token::Star);
                    i += 1;
                }
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Eq);
                    i += 2;
                } else {
                    tokens.push(Token::Assign);
                    i += 1;
                }
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::NotEq);
                    i += 2;
                } else {
                    return Err(LexError("unexpected '!'".to_string()));
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Le);
                    i += 2;
                } else {
                    tokens.push(Token::Lt);
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ge);
                    i += 2;
                } else {
                    tokens.push(Token::Gt);
                    i += 1;
                }
            }
            other => return Err(LexError(format!("unexpected character '{other}'"))),
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
