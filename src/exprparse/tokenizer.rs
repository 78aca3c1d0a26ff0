// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// Lexer for infix expression text.

use super::ExprError;

/// Raw lexeme with no operator classification; the parser decides whether an
/// identifier is a variable, a word operator, or a callee.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Lexeme {
    Number(f64),
    Ident(String),
    Op(&'static str),
    OpenParen,
    CloseParen,
}

/// Tokenize expression text into `(column, lexeme)` pairs. Columns are
/// 1-based byte offsets, used only for error reporting.
pub(crate) fn tokenize(text: &str) -> Result<Vec<(usize, Lexeme)>, ExprError> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        let col = i + 1;
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if c.is_ascii_digit() {
            let (value, len) = scan_number(&text[i..], col)?;
            out.push((col, Lexeme::Number(value)));
            i += len;
            continue;
        }
        if c.is_ascii_alphabetic() || c == b'_' {
            let mut end = i + 1;
            while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
                end += 1;
            }
            out.push((col, Lexeme::Ident(text[i..end].to_string())));
            i = end;
            continue;
        }
        if let Some(op) = two_char_op(&bytes[i..]) {
            out.push((col, Lexeme::Op(op)));
            i += 2;
            continue;
        }
        let lexeme = match c {
            b'(' => Lexeme::OpenParen,
            b')' => Lexeme::CloseParen,
            b'+' => Lexeme::Op("+"),
            b'-' => Lexeme::Op("-"),
            b'*' => Lexeme::Op("*"),
            b'/' => Lexeme::Op("/"),
            b'%' => Lexeme::Op("%"),
            b'^' => Lexeme::Op("^"),
            b'>' => Lexeme::Op(">"),
            b'<' => Lexeme::Op("<"),
            b',' => Lexeme::Op(","),
            _ => {
                return Err(ExprError::at(
                    col,
                    format!("Unexpected character \"{}\"", c as char),
                ))
            }
        };
        out.push((col, lexeme));
        i += 1;
    }
    Ok(out)
}

fn two_char_op(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < 2 {
        return None;
    }
    match &bytes[..2] {
        b"**" => Some("**"),
        b"==" => Some("=="),
        b"!=" => Some("!="),
        b">=" => Some(">="),
        b"<=" => Some("<="),
        b"||" => Some("||"),
        _ => None,
    }
}

/// Scan a numeric literal at the head of `text`, returning its value and
/// byte length. Accepts decimal (with fraction/exponent) and `0x` hex.
fn scan_number(text: &str, col: usize) -> Result<(f64, usize), ExprError> {
    let bytes = text.as_bytes();
    if bytes.len() > 2 && (bytes[..2] == *b"0x" || bytes[..2] == *b"0X") {
        let mut end = 2;
        while end < bytes.len() && bytes[end].is_ascii_hexdigit() {
            end += 1;
        }
        if end == 2 {
            return Err(ExprError::at(col, "Invalid hex literal"));
        }
        let value = u64::from_str_radix(&text[2..end], 16)
            .map_err(|_| ExprError::at(col, "Invalid hex literal"))?;
        return Ok((value as f64, end));
    }
    let mut end = 0;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp = end + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        if exp < bytes.len() && bytes[exp].is_ascii_digit() {
            end = exp + 1;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
        }
    }
    text[..end]
        .parse::<f64>()
        .map(|value| (value, end))
        .map_err(|_| ExprError::at(col, format!("Invalid number \"{}\"", &text[..end])))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(text: &str) -> Vec<Lexeme> {
        tokenize(text)
            .unwrap()
            .into_iter()
            .map(|(_, l)| l)
            .collect()
    }

    #[test]
    fn numbers_and_idents() {
        assert_eq!(
            lex("x1 + 2.5"),
            vec![
                Lexeme::Ident("x1".to_string()),
                Lexeme::Op("+"),
                Lexeme::Number(2.5),
            ]
        );
    }

    #[test]
    fn hex_literal() {
        assert_eq!(lex("0xff"), vec![Lexeme::Number(255.0)]);
    }

    #[test]
    fn exponent_literal() {
        assert_eq!(lex("1e3"), vec![Lexeme::Number(1000.0)]);
        assert_eq!(lex("2.5e-1"), vec![Lexeme::Number(0.25)]);
    }

    #[test]
    fn two_char_operators() {
        assert_eq!(
            lex("a >= b || c"),
            vec![
                Lexeme::Ident("a".to_string()),
                Lexeme::Op(">="),
                Lexeme::Ident("b".to_string()),
                Lexeme::Op("||"),
                Lexeme::Ident("c".to_string()),
            ]
        );
    }

    #[test]
    fn power_both_spellings() {
        assert_eq!(
            lex("a ** b ^ c"),
            vec![
                Lexeme::Ident("a".to_string()),
                Lexeme::Op("**"),
                Lexeme::Ident("b".to_string()),
                Lexeme::Op("^"),
                Lexeme::Ident("c".to_string()),
            ]
        );
    }

    #[test]
    fn rejects_unknown_character() {
        let err = tokenize("a ? b").unwrap_err();
        assert!(err.message().contains('?'));
        assert_eq!(err.column(), Some(3));
    }
}
