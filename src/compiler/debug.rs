// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Debug serialization of the lowered pseudo-op stream.

use serde_json::{json, Value};

use super::program::PseudoOp;
use crate::exprparse::Token;

/// Serialize pseudo-ops as a JSON array, one row per op. Assignment rows
/// start with the target register followed by the postfix tokens.
pub fn token_trace(ops: &[PseudoOp]) -> Value {
    let entries: Vec<Value> = ops
        .iter()
        .map(|op| match op {
            PseudoOp::Label(name) => json!(["@LABEL", name]),
            PseudoOp::Goto {
                target,
                condition,
                unless,
            } => {
                let tag = if *unless { "@GOTO_UNLESS" } else { "@GOTO" };
                match condition {
                    Some(cond) => json!([tag, target, format!("f{cond}")]),
                    None => json!([tag, target]),
                }
            }
            PseudoOp::Output { var, dest } => json!(["@OUTPUT", var, dest]),
            PseudoOp::Assign { target, tokens } => {
                let mut row = vec![Value::String(target.clone())];
                row.extend(tokens.iter().map(serialize_token));
                Value::Array(row)
            }
        })
        .collect();
    Value::Array(entries)
}

fn serialize_token(token: &Token) -> Value {
    match token {
        Token::Number(value) => json!(value),
        Token::Var(name) => json!(["VAR", name]),
        Token::Unary(sym) => json!(["OP1", sym]),
        Token::Binary(sym) => json!(["OP2", sym]),
        Token::FuncCall => json!("CALL"),
    }
}
