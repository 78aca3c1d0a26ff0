// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Statement lowering: source statements to pseudo-ops.
//!
//! Loops become label/goto shapes around their bodies, with the loop
//! condition lowered as an assignment to a per-depth condition register.
//! `if`/`else` bodies stay straight-line: every assignment inside is blended
//! into a `cond` select against the condition register, so both branches
//! execute and only the selected values land. That is also why loops cannot
//! appear inside `if` blocks.

use super::error::{CompileError, CompileResult};
use super::ops::{DEFAULT_OUTPUT_PATH, SCRATCH_EXPR};
use super::program::PseudoOp;
use super::Compiler;
use crate::exprparse::Token;

/// One source statement with its 1-based line number.
#[derive(Debug, Clone)]
pub struct Stmt {
    pub line: u32,
    pub text: String,
}

/// Lower a statement block into `out`, returning the number of statements
/// consumed including any closing `end`. `depth` selects the condition
/// register for nested constructs; `within_if` rejects loops inside `if`
/// bodies.
pub fn lower_block(
    c: &mut Compiler,
    stmts: &[Stmt],
    out: &mut Vec<PseudoOp>,
    depth: u32,
    within_if: bool,
) -> CompileResult<usize> {
    let mut i = 0;
    while i < stmts.len() {
        let stmt = &stmts[i];
        i += 1;
        let line = stmt.line;
        c.last_line = line;
        let text = stmt.text.as_str();

        if let Some(rest) = text.strip_prefix("label ") {
            let rest = rest.trim();
            let name = format!("L{rest}");
            if c.labels.contains(&name) {
                return Err(CompileError::syntax(
                    line,
                    format!("Duplicate label \"{rest}\""),
                ));
            }
            c.labels.push(name.clone());
            out.push(PseudoOp::Label(name));
        } else if let Some(rest) = text.strip_prefix("goto ") {
            let rest = rest.trim();
            let name = format!("L{rest}");
            if !c.labels.contains(&name) {
                return Err(CompileError::syntax(
                    line,
                    format!("Unknown label \"{rest}\""),
                ));
            }
            out.push(PseudoOp::Goto {
                target: name,
                condition: None,
                unless: false,
            });
        } else if text.starts_with("end") {
            if depth == 0 {
                return Err(CompileError::syntax(line, "Unexpected \"end\""));
            }
            return Ok(i);
        } else if let Some(rest) = text.strip_prefix("if ") {
            let var = format!("#I{depth}");
            out.push(PseudoOp::Assign {
                target: var.clone(),
                tokens: c.parse_expr(rest, line)?,
            });
            let mut inner = Vec::new();
            i += lower_block(c, &stmts[i..], &mut inner, depth + 1, true)?;
            let mut inner_else = Vec::new();
            if stmts.get(i).is_some_and(|s| s.text.starts_with("else")) {
                i += 1;
                i += lower_block(c, &stmts[i..], &mut inner_else, depth + 1, true)?;
            }
            blend_assignments(&mut inner, &var, true);
            blend_assignments(&mut inner_else, &var, false);
            out.extend(inner);
            out.extend(inner_else);
        } else if let Some(rest) = text.strip_prefix("while ") {
            if within_if {
                return Err(CompileError::syntax(
                    line,
                    "Loops within if statements are not currently supported",
                ));
            }
            c.anon_label_count += 1;
            let head = format!("W{}", c.anon_label_count);
            let body = format!("{head}Loop");
            let exit = format!("{head}End");
            let var = format!("#W{depth}");
            out.push(PseudoOp::Label(head.clone()));
            out.push(PseudoOp::Assign {
                target: var.clone(),
                tokens: c.parse_expr(rest, line)?,
            });
            out.push(PseudoOp::Goto {
                target: exit.clone(),
                condition: Some(var),
                unless: true,
            });
            out.push(PseudoOp::Goto {
                target: body.clone(),
                condition: None,
                unless: false,
            });
            out.push(PseudoOp::Label(body));
            i += lower_block(c, &stmts[i..], out, depth + 1, false)?;
            out.push(PseudoOp::Goto {
                target: head,
                condition: None,
                unless: false,
            });
            out.push(PseudoOp::Label(exit));
        } else if let Some(rest) = text.strip_prefix("repeat ") {
            if within_if {
                return Err(CompileError::syntax(
                    line,
                    "Loops within if statements are not currently supported",
                ));
            }
            c.anon_label_count += 1;
            let head = format!("R{}", c.anon_label_count);
            let var = format!("#R{depth}");
            out.push(PseudoOp::Label(head.clone()));
            i += lower_block(c, &stmts[i..], out, depth + 1, false)?;
            out.push(PseudoOp::Assign {
                target: var.clone(),
                tokens: c.parse_expr(rest, line)?,
            });
            out.push(PseudoOp::Goto {
                target: head,
                condition: Some(var),
                unless: false,
            });
        } else if let Some(rest) = text.strip_prefix("for ") {
            if within_if {
                return Err(CompileError::syntax(
                    line,
                    "Loops within if statements are not currently supported",
                ));
            }
            // Needs a condition statement, an increment statement, and a body.
            if stmts.len() < i + 2 {
                return Err(CompileError::syntax(line, "Invalid for loop"));
            }
            let (init_var, init_expr) = rest
                .split_once('=')
                .ok_or_else(|| CompileError::syntax(line, "Invalid for loop init"))?;
            let cond = stmts[i].clone();
            i += 1;
            let inc = &stmts[i];
            let (inc_var, inc_expr) = inc
                .text
                .split_once('=')
                .ok_or_else(|| CompileError::syntax(inc.line, "Invalid for loop increment"))?;
            let (inc_var, inc_expr) = (inc_var.trim().to_string(), inc_expr.trim().to_string());
            let inc_line = inc.line;
            i += 1;
            c.anon_label_count += 1;
            let head = format!("F{}", c.anon_label_count);
            let body = format!("{head}Loop");
            let exit = format!("{head}End");
            let var = format!("#F{depth}");
            out.push(PseudoOp::Assign {
                target: init_var.trim().to_string(),
                tokens: c.parse_expr(init_expr.trim(), line)?,
            });
            out.push(PseudoOp::Label(head.clone()));
            out.push(PseudoOp::Assign {
                target: var.clone(),
                tokens: c.parse_expr(&cond.text, cond.line)?,
            });
            out.push(PseudoOp::Goto {
                target: exit.clone(),
                condition: Some(var),
                unless: true,
            });
            out.push(PseudoOp::Goto {
                target: body.clone(),
                condition: None,
                unless: false,
            });
            out.push(PseudoOp::Label(body));
            i += lower_block(c, &stmts[i..], out, depth + 1, false)?;
            out.push(PseudoOp::Assign {
                target: inc_var,
                tokens: c.parse_expr(&inc_expr, inc_line)?,
            });
            out.push(PseudoOp::Goto {
                target: head,
                condition: None,
                unless: false,
            });
            out.push(PseudoOp::Label(exit));
        } else if let Some(rest) = text.strip_prefix("output ") {
            let (var, dest) = match rest.split_once("->") {
                Some((var, dest)) => (var.trim(), dest.trim()),
                None => (rest.trim(), DEFAULT_OUTPUT_PATH),
            };
            out.push(PseudoOp::Output {
                var: var.to_string(),
                dest: dest.to_string(),
            });
        } else if let Some((target, expr)) = text.split_once('=') {
            out.push(PseudoOp::Assign {
                target: target.trim().to_string(),
                tokens: c.parse_expr(expr.trim(), line)?,
            });
        } else {
            return Err(CompileError::syntax(
                line,
                format!("Unrecognized statement \"{text}\""),
            ));
        }
    }
    if depth > 0 {
        return Err(CompileError::syntax(c.last_line, "Missing \"end\""));
    }
    Ok(stmts.len())
}

/// Blend each assignment in a branch body into a `cond` select on the
/// condition register. Multi-token expressions keep their computation and
/// gain a trailing select between the computed scratch value and the
/// target's previous value; single-token expressions are rewritten into the
/// select directly. Label, goto, and output ops pass through untouched.
fn blend_assignments(ops: &mut [PseudoOp], cond_reg: &str, then_branch: bool) {
    for op in ops.iter_mut() {
        let PseudoOp::Assign { target, tokens } = op else {
            continue;
        };
        let kept = Token::Var(target.clone());
        if tokens.len() > 1 {
            let computed = Token::Var(SCRATCH_EXPR.to_string());
            let (first, second) = if then_branch {
                (computed, kept)
            } else {
                (kept, computed)
            };
            tokens.extend([
                Token::Var("if".to_string()),
                Token::Var(cond_reg.to_string()),
                first,
                Token::Binary(",".to_string()),
                second,
                Token::Binary(",".to_string()),
                Token::FuncCall,
            ]);
        } else if let Some(value) = tokens.first().cloned() {
            let (first, second) = if then_branch {
                (value, kept)
            } else {
                (kept, value)
            };
            *tokens = vec![
                Token::Var("if".to_string()),
                Token::Var(cond_reg.to_string()),
                first,
                Token::Binary(",".to_string()),
                second,
                Token::Binary(",".to_string()),
                Token::FuncCall,
            ];
        }
    }
}
