// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Lowering of postfix expression streams to target instructions.
//!
//! Evaluation runs over an operand stack holding literals, register
//! references, and argument lists. Intermediate results all funnel through
//! the shared scratch register; only the final operation writes the
//! assignment target. Fully literal operations fold at compile time unless
//! the callable is opaque (`random`, the dice operator), which always emits
//! an instruction so repeated compiles stay deterministic.

use super::error::{CompileError, CompileResult};
use super::ops::{symbol_to_operator, SCRATCH_EXPR};
use super::program::{Instruction, Operand};
use super::Compiler;
use crate::exprparse::{FoldResult, Token};

/// Operand-stack entry during lowering.
#[derive(Debug, Clone)]
enum Value {
    Num(f64),
    Reg(String),
    List(Vec<Value>),
}

fn operand_of(value: Value) -> CompileResult<Operand> {
    match value {
        Value::Num(n) => Ok(Operand::Lit(n)),
        Value::Reg(r) => Ok(Operand::Reg(r)),
        Value::List(_) => Err(CompileError::internal("Malformed expression")),
    }
}

fn malformed() -> CompileError {
    CompileError::internal("Malformed expression")
}

/// Lower `target = <tokens>` into straight-line instructions. Registers the
/// target as a variable on first sight.
pub fn lower_assignment(
    c: &mut Compiler,
    target: &str,
    tokens: &[Token],
) -> CompileResult<Vec<Instruction>> {
    c.vars.insert(target.to_string());
    let mut out: Vec<Instruction> = Vec::new();
    let mut acc: Vec<Value> = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        let last = i + 1 == tokens.len();
        let dest = if last { target } else { SCRATCH_EXPR };
        match token {
            Token::Number(value) => {
                if last {
                    out.push(Instruction::set(target, Operand::Lit(*value)));
                } else {
                    acc.push(Value::Num(*value));
                }
            }
            Token::Var(name) => {
                if last {
                    out.push(Instruction::set(target, Operand::Reg(name.clone())));
                } else {
                    acc.push(Value::Reg(name.clone()));
                }
            }
            Token::Unary(sym) if sym == "-" => {
                // Negation reads the assignment target in place. The operand
                // stack is left untouched apart from pushing the result.
                out.push(Instruction {
                    mnemonic: "negate",
                    dest: dest.to_string(),
                    args: vec![Operand::Reg(target.to_string())],
                });
                acc.push(Value::Reg(dest.to_string()));
            }
            Token::Unary(sym) => {
                let arg = acc.pop().ok_or_else(malformed)?;
                match arg {
                    Value::Num(n) => {
                        let host = c.parser.unary_fold(sym).ok_or_else(|| {
                            CompileError::internal(format!("Unknown operator \"{sym}\""))
                        })?;
                        match host.fold(&[n]) {
                            FoldResult::Value(v) => acc.push(Value::Num(v)),
                            FoldResult::Opaque => {
                                let op = symbol_to_operator(sym).ok_or_else(|| {
                                    CompileError::internal(format!("Unknown operator \"{sym}\""))
                                })?;
                                out.push(Instruction {
                                    mnemonic: op,
                                    dest: dest.to_string(),
                                    args: vec![Operand::Lit(n)],
                                });
                                acc.push(Value::Reg(dest.to_string()));
                            }
                            FoldResult::Arity => return Err(malformed()),
                        }
                    }
                    Value::Reg(r) => {
                        let op = symbol_to_operator(sym).ok_or_else(|| {
                            CompileError::internal(format!("Unknown operator \"{sym}\""))
                        })?;
                        out.push(Instruction {
                            mnemonic: op,
                            dest: dest.to_string(),
                            args: vec![Operand::Reg(r)],
                        });
                        acc.push(Value::Reg(dest.to_string()));
                    }
                    Value::List(_) => return Err(malformed()),
                }
            }
            Token::Binary(sym) if sym == "," => {
                let arg2 = acc.pop().ok_or_else(malformed)?;
                let arg1 = acc.pop().ok_or_else(malformed)?;
                match arg1 {
                    Value::List(mut items) => {
                        items.push(arg2);
                        acc.push(Value::List(items));
                    }
                    other => acc.push(Value::List(vec![other, arg2])),
                }
            }
            Token::Binary(sym) if sym == "||" => {
                let arg2 = acc.pop().ok_or_else(malformed)?;
                let arg1 = acc.pop().ok_or_else(malformed)?;
                let mut items = match arg1 {
                    Value::List(items) => items,
                    other => vec![other],
                };
                match arg2 {
                    Value::List(more) => items.extend(more),
                    other => items.push(other),
                }
                acc.push(Value::List(items));
            }
            Token::Binary(sym) => {
                let arg2 = acc.pop().ok_or_else(malformed)?;
                let arg1 = acc.pop().ok_or_else(malformed)?;
                match (&arg1, &arg2) {
                    (Value::Num(a), Value::Num(b)) => {
                        let host = c.parser.binary_fold(sym).ok_or_else(|| {
                            CompileError::internal(format!("Unknown operator \"{sym}\""))
                        })?;
                        match host.fold(&[*a, *b]) {
                            FoldResult::Value(v) => acc.push(Value::Num(v)),
                            FoldResult::Opaque => {
                                let op = symbol_to_operator(sym).ok_or_else(|| {
                                    CompileError::internal(format!("Unknown operator \"{sym}\""))
                                })?;
                                out.push(Instruction {
                                    mnemonic: op,
                                    dest: dest.to_string(),
                                    args: vec![Operand::Lit(*a), Operand::Lit(*b)],
                                });
                                acc.push(Value::Reg(dest.to_string()));
                            }
                            FoldResult::Arity => return Err(malformed()),
                        }
                    }
                    (Value::List(_), _) | (_, Value::List(_)) => return Err(malformed()),
                    _ => {
                        let op = symbol_to_operator(sym).ok_or_else(|| {
                            CompileError::internal(format!("Unknown operator \"{sym}\""))
                        })?;
                        out.push(Instruction {
                            mnemonic: op,
                            dest: dest.to_string(),
                            args: vec![operand_of(arg1)?, operand_of(arg2)?],
                        });
                        acc.push(Value::Reg(dest.to_string()));
                    }
                }
            }
            Token::FuncCall => {
                let arg = acc.pop().ok_or_else(malformed)?;
                let callee = acc.pop().ok_or_else(malformed)?;
                let name = match callee {
                    Value::Reg(name) => name,
                    _ => return Err(malformed()),
                };
                let host = c.parser.resolve_call(&name).ok_or_else(|| {
                    CompileError::internal(format!("Unknown function \"{name}\""))
                })?;
                let op = symbol_to_operator(&name).ok_or_else(|| {
                    CompileError::internal(format!("Unknown function \"{name}\""))
                })?;
                let args = match arg {
                    Value::List(items) => items,
                    single => vec![single],
                };
                let mut literals = Vec::with_capacity(args.len());
                for a in &args {
                    if let Value::Num(n) = a {
                        literals.push(*n);
                    }
                }
                if literals.len() == args.len() {
                    match host.fold(&literals) {
                        FoldResult::Value(v) => acc.push(Value::Num(v)),
                        FoldResult::Opaque => {
                            out.push(Instruction {
                                mnemonic: op,
                                dest: dest.to_string(),
                                args: literals.into_iter().map(Operand::Lit).collect(),
                            });
                            acc.push(Value::Reg(dest.to_string()));
                        }
                        FoldResult::Arity => {
                            return Err(CompileError::internal(format!(
                                "Wrong argument count for \"{name}\""
                            )))
                        }
                    }
                } else {
                    let operands = args
                        .into_iter()
                        .map(operand_of)
                        .collect::<CompileResult<Vec<_>>>()?;
                    out.push(Instruction {
                        mnemonic: op,
                        dest: dest.to_string(),
                        args: operands,
                    });
                    acc.push(Value::Reg(dest.to_string()));
                }
            }
        }
    }

    // A folded literal result, or a result parked in another register, still
    // needs a final set into the target.
    if !tokens.is_empty() {
        if let Some(top) = acc.pop() {
            match top {
                Value::Reg(r) if r == target => {}
                Value::Reg(r) => out.push(Instruction::set(target, Operand::Reg(r))),
                Value::Num(v) => out.push(Instruction::set(target, Operand::Lit(v))),
                Value::List(_) => return Err(malformed()),
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Compiler;
    use proptest::prelude::*;

    fn lower(target: &str, expr: &str) -> Vec<String> {
        let mut c = Compiler::new();
        let tokens = c.parser.parse(expr).unwrap();
        lower_assignment(&mut c, target, &tokens)
            .unwrap()
            .iter()
            .map(|i| i.to_string())
            .collect()
    }

    #[test]
    fn literal_assignment_is_a_single_set() {
        assert_eq!(lower("x", "1"), vec!["set fx, 1"]);
    }

    #[test]
    fn all_literal_arithmetic_folds() {
        assert_eq!(lower("x", "2 + 3 * 4"), vec!["set fx, 14"]);
    }

    #[test]
    fn variable_operands_emit_instructions() {
        assert_eq!(lower("x", "y + z"), vec!["add fx, fy, fz"]);
    }

    #[test]
    fn intermediates_use_the_scratch_register() {
        assert_eq!(
            lower("x", "(y + z) * 2"),
            vec!["add f#BuiltinTmpA, fy, fz", "mul fx, f#BuiltinTmpA, 2"]
        );
    }

    #[test]
    fn unary_minus_negates_the_target_in_place() {
        assert_eq!(lower("x", "-y"), vec!["negate fx, fx"]);
    }

    #[test]
    fn unary_word_operator_on_variable() {
        assert_eq!(lower("x", "sqrt(y)"), vec!["sqrt fx, fy"]);
    }

    #[test]
    fn function_call_with_mixed_args() {
        assert_eq!(lower("x", "min(y, 2)"), vec!["min fx, fy, 2"]);
    }

    #[test]
    fn opaque_calls_never_fold() {
        assert_eq!(lower("x", "random(4)"), vec!["random fx, 4"]);
        assert_eq!(lower("x", "3 D 6"), vec!["diceroll fx, 3, 6"]);
    }

    #[test]
    fn self_assignment_skips_redundant_set() {
        // `x = x + 1` ends with the result already in the target.
        assert_eq!(lower("x", "x + 1"), vec!["add fx, fx, 1"]);
    }

    #[test]
    fn ternary_if_with_variable_condition() {
        assert_eq!(lower("x", "if(c, a, b)"), vec!["cond fx, fc, fa, fb"]);
    }

    #[test]
    fn unknown_function_is_an_internal_error() {
        let mut c = Compiler::new();
        let tokens = c.parser.parse("frobnicate(1)").unwrap();
        let err = lower_assignment(&mut c, "x", &tokens).unwrap_err();
        assert!(err.message().contains("frobnicate"));
    }

    #[test]
    fn targets_register_in_first_assignment_order() {
        let mut c = Compiler::new();
        for (target, expr) in [("b", "1"), ("a", "2"), ("b", "3")] {
            let tokens = c.parser.parse(expr).unwrap();
            lower_assignment(&mut c, target, &tokens).unwrap();
        }
        let order: Vec<&str> = c.vars.iter().map(String::as_str).collect();
        assert_eq!(order, vec!["b", "a"]);
    }

    proptest! {
        #[test]
        fn literal_expressions_fold_to_one_set(a in -100i32..100, b in -100i32..100, c in 1i32..100) {
            let expr = format!("{a} + {b} * {c}");
            let out = lower("x", &expr);
            prop_assert_eq!(out.len(), 1);
            prop_assert!(out[0].starts_with("set fx, "));
        }
    }
}
