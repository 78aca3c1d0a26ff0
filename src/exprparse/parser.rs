// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// Precedence-climbing parse from lexemes to postfix tokens.

use super::tokenizer::{tokenize, Lexeme};
use super::{ExprError, ExprParser, Token};

enum StackEntry {
    Unary(String),
    Binary { sym: String, prec: u8, right: bool },
    Paren { call: bool },
}

fn binary_prec(sym: &str) -> Option<(u8, bool)> {
    let entry = match sym {
        "," => (1, false),
        "||" => (2, false),
        "or" => (3, false),
        "and" => (4, false),
        "xor" => (5, false),
        "==" | "!=" | ">" | "<" | ">=" | "<=" => (6, false),
        "+" | "-" => (7, false),
        "*" | "/" | "%" => (8, false),
        "D" => (9, false),
        "^" | "**" => (10, true),
        _ => return None,
    };
    Some(entry)
}

fn const_value(name: &str) -> Option<f64> {
    match name {
        "PI" => Some(std::f64::consts::PI),
        "E" => Some(std::f64::consts::E),
        _ => None,
    }
}

fn shunt_binary(
    stack: &mut Vec<StackEntry>,
    output: &mut Vec<Token>,
    sym: &str,
    col: usize,
) -> Result<(), ExprError> {
    let (prec, right) = binary_prec(sym)
        .ok_or_else(|| ExprError::at(col, format!("Unexpected operator \"{sym}\"")))?;
    loop {
        let pop = match stack.last() {
            Some(StackEntry::Unary(_)) => true,
            Some(StackEntry::Binary { prec: p, right: r, .. }) => {
                *p > prec || (*p == prec && !*r)
            }
            _ => false,
        };
        if !pop {
            break;
        }
        match stack.pop() {
            Some(StackEntry::Unary(s)) => output.push(Token::Unary(s)),
            Some(StackEntry::Binary { sym: s, .. }) => output.push(Token::Binary(s)),
            _ => break,
        }
    }
    stack.push(StackEntry::Binary {
        sym: sym.to_string(),
        prec,
        right,
    });
    Ok(())
}

pub(crate) fn parse(parser: &ExprParser, text: &str) -> Result<Vec<Token>, ExprError> {
    let lexemes = tokenize(text)?;
    let mut output: Vec<Token> = Vec::new();
    let mut stack: Vec<StackEntry> = Vec::new();
    let mut expect_operand = true;
    let mut i = 0;
    while i < lexemes.len() {
        let (col, lexeme) = &lexemes[i];
        let col = *col;
        i += 1;
        match lexeme {
            Lexeme::Number(value) => {
                if !expect_operand {
                    return Err(ExprError::at(col, "Unexpected value"));
                }
                output.push(Token::Number(*value));
                expect_operand = false;
            }
            Lexeme::Ident(name) => {
                if !expect_operand {
                    if parser.is_binary_word(name) {
                        shunt_binary(&mut stack, &mut output, name, col)?;
                        expect_operand = true;
                    } else {
                        return Err(ExprError::at(
                            col,
                            format!("Unexpected identifier \"{name}\""),
                        ));
                    }
                } else if parser.is_unary_word(name) {
                    stack.push(StackEntry::Unary(name.clone()));
                } else if let Some(value) = const_value(name) {
                    output.push(Token::Number(value));
                    expect_operand = false;
                } else if matches!(lexemes.get(i), Some((_, Lexeme::OpenParen))) {
                    // Call syntax: the callee name precedes its arguments in
                    // the postfix stream, closed by a FuncCall marker.
                    output.push(Token::Var(name.clone()));
                    stack.push(StackEntry::Paren { call: true });
                    i += 1;
                } else {
                    output.push(Token::Var(name.clone()));
                    expect_operand = false;
                }
            }
            Lexeme::Op(sym) => {
                if expect_operand {
                    match *sym {
                        "-" => stack.push(StackEntry::Unary("-".to_string())),
                        "+" => {}
                        _ => {
                            return Err(ExprError::at(
                                col,
                                format!("Unexpected operator \"{sym}\""),
                            ))
                        }
                    }
                } else {
                    shunt_binary(&mut stack, &mut output, sym, col)?;
                    expect_operand = true;
                }
            }
            Lexeme::OpenParen => {
                if !expect_operand {
                    return Err(ExprError::at(col, "Unexpected \"(\""));
                }
                stack.push(StackEntry::Paren { call: false });
            }
            Lexeme::CloseParen => {
                if expect_operand {
                    return Err(ExprError::at(col, "Missing operand before \")\""));
                }
                loop {
                    match stack.pop() {
                        Some(StackEntry::Unary(s)) => output.push(Token::Unary(s)),
                        Some(StackEntry::Binary { sym, .. }) => output.push(Token::Binary(sym)),
                        Some(StackEntry::Paren { call }) => {
                            if call {
                                output.push(Token::FuncCall);
                            }
                            break;
                        }
                        None => return Err(ExprError::at(col, "Unbalanced \")\"")),
                    }
                }
                expect_operand = false;
            }
        }
    }
    if expect_operand {
        return Err(ExprError::new("Unexpected end of expression"));
    }
    while let Some(entry) = stack.pop() {
        match entry {
            StackEntry::Unary(s) => output.push(Token::Unary(s)),
            StackEntry::Binary { sym, .. } => output.push(Token::Binary(sym)),
            StackEntry::Paren { .. } => return Err(ExprError::new("Missing closing parenthesis")),
        }
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::super::{ExprParser, Token};

    fn parse(text: &str) -> Vec<Token> {
        ExprParser::new().parse(text).unwrap()
    }

    fn var(name: &str) -> Token {
        Token::Var(name.to_string())
    }

    fn bin(sym: &str) -> Token {
        Token::Binary(sym.to_string())
    }

    fn un(sym: &str) -> Token {
        Token::Unary(sym.to_string())
    }

    #[test]
    fn simple_addition() {
        assert_eq!(parse("y + z"), vec![var("y"), var("z"), bin("+")]);
    }

    #[test]
    fn parens_override_precedence() {
        assert_eq!(
            parse("(y + z) * 2"),
            vec![var("y"), var("z"), bin("+"), Token::Number(2.0), bin("*")]
        );
    }

    #[test]
    fn precedence_without_parens() {
        assert_eq!(
            parse("1 + 2 * 3"),
            vec![
                Token::Number(1.0),
                Token::Number(2.0),
                Token::Number(3.0),
                bin("*"),
                bin("+"),
            ]
        );
    }

    #[test]
    fn power_is_right_associative() {
        assert_eq!(
            parse("2 ^ 3 ^ 2"),
            vec![
                Token::Number(2.0),
                Token::Number(3.0),
                Token::Number(2.0),
                bin("^"),
                bin("^"),
            ]
        );
    }

    #[test]
    fn function_call_two_args() {
        assert_eq!(
            parse("min(1, 2)"),
            vec![
                var("min"),
                Token::Number(1.0),
                Token::Number(2.0),
                bin(","),
                Token::FuncCall,
            ]
        );
    }

    #[test]
    fn nested_calls() {
        assert_eq!(
            parse("min(max(a, b), c)"),
            vec![
                var("min"),
                var("max"),
                var("a"),
                var("b"),
                bin(","),
                Token::FuncCall,
                var("c"),
                bin(","),
                Token::FuncCall,
            ]
        );
    }

    #[test]
    fn unary_word_operator_uses_op1_shape() {
        assert_eq!(parse("sqrt(x)"), vec![var("x"), un("sqrt")]);
    }

    #[test]
    fn unary_minus() {
        assert_eq!(parse("-x"), vec![var("x"), un("-")]);
        assert_eq!(
            parse("1 - -x"),
            vec![Token::Number(1.0), var("x"), un("-"), bin("-")]
        );
    }

    #[test]
    fn word_binary_operators() {
        assert_eq!(parse("a and b"), vec![var("a"), var("b"), bin("and")]);
        assert_eq!(parse("3 D 6"), vec![Token::Number(3.0), Token::Number(6.0), bin("D")]);
    }

    #[test]
    fn extension_names_use_call_syntax() {
        assert_eq!(
            parse("shr(x, 2)"),
            vec![var("shr"), var("x"), Token::Number(2.0), bin(","), Token::FuncCall]
        );
    }

    #[test]
    fn constants_substitute_at_parse_time() {
        assert_eq!(parse("PI"), vec![Token::Number(std::f64::consts::PI)]);
    }

    #[test]
    fn union_operator_survives() {
        assert_eq!(
            parse("pow(a || b, 2)"),
            vec![
                var("pow"),
                var("a"),
                var("b"),
                bin("||"),
                Token::Number(2.0),
                bin(","),
                Token::FuncCall,
            ]
        );
    }

    #[test]
    fn errors_on_trailing_operator() {
        assert!(ExprParser::new().parse("1 +").is_err());
    }

    #[test]
    fn errors_on_unbalanced_parens() {
        assert!(ExprParser::new().parse("(1 + 2").is_err());
        assert!(ExprParser::new().parse("1 + 2)").is_err());
    }

    #[test]
    fn errors_on_empty_input() {
        assert!(ExprParser::new().parse("").is_err());
    }
}
