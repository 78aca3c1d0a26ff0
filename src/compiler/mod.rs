// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Script-to-assembly compiler.
//!
//! The pipeline is preprocess -> statement lowering -> state-machine
//! assembly -> text emission. Statements are split on newlines and
//! semicolons with real source line numbers kept for diagnostics. The whole
//! run is deterministic: compiling the same source twice yields identical
//! assembly.

pub mod debug;
pub mod emit;
pub mod error;
pub mod expr_lower;
pub mod ops;
pub mod program;
pub mod stmt_lower;

use indexmap::IndexSet;

pub use error::{CompileError, CompileErrorKind, CompileResult};
pub use program::Program;

use crate::exprparse::{ExprParser, Token};
use program::OutputDirective;
use stmt_lower::Stmt;

/// Compilation switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    /// Capture the lowered token stream for inspection.
    pub debug: bool,
}

/// Result of a successful compile.
#[derive(Debug)]
pub struct CompileOutput {
    pub assembly: String,
    pub debug_trace: Option<serde_json::Value>,
}

/// Shared compile-run state threaded through the lowering passes.
pub struct Compiler {
    pub(crate) parser: ExprParser,
    pub(crate) vars: IndexSet<String>,
    pub(crate) outputs: Vec<OutputDirective>,
    pub(crate) labels: Vec<String>,
    pub(crate) anon_label_count: u32,
    pub(crate) last_line: u32,
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            parser: ExprParser::with_extensions(&ops::parser_extensions()),
            vars: IndexSet::new(),
            outputs: Vec::new(),
            labels: Vec::new(),
            anon_label_count: 0,
            last_line: 0,
        }
    }

    /// Parse infix expression text, attributing any error to `line`.
    /// Square brackets are accepted as parentheses.
    pub(crate) fn parse_expr(&self, text: &str, line: u32) -> CompileResult<Vec<Token>> {
        let normalized = text.replace('[', "(").replace(']', ")");
        self.parser
            .parse(&normalized)
            .map_err(|err| CompileError::syntax(line, err.to_string()))
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Compile source text into target assembly.
pub fn compile(source: &str, options: &CompileOptions) -> CompileResult<CompileOutput> {
    let mut c = Compiler::new();
    let stmts = preprocess(source)?;
    let mut ops = Vec::new();
    stmt_lower::lower_block(&mut c, &stmts, &mut ops, 0, false)?;
    let debug_trace = options.debug.then(|| debug::token_trace(&ops));
    let program = program::assemble(&mut c, ops)?;
    Ok(CompileOutput {
        assembly: emit::build_assembly(&program),
        debug_trace,
    })
}

/// Strip comments and split source into statements. Statements end at
/// newlines and at semicolons; line numbers are 1-based and survive block
/// comments, which are replaced by the newlines they spanned.
fn preprocess(source: &str) -> CompileResult<Vec<Stmt>> {
    let source = strip_block_comments(source)?;
    let mut stmts = Vec::new();
    for (idx, raw) in source.lines().enumerate() {
        let line = (idx + 1) as u32;
        if raw.trim_start().starts_with("//") {
            continue;
        }
        for piece in raw.split(';') {
            let text = piece.trim();
            if text.is_empty() {
                continue;
            }
            stmts.push(Stmt {
                line,
                text: text.to_string(),
            });
        }
    }
    Ok(stmts)
}

fn strip_block_comments(source: &str) -> CompileResult<String> {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    let mut line = 1u32;
    while let Some(start) = rest.find("/*") {
        let head = &rest[..start];
        line += head.matches('\n').count() as u32;
        out.push_str(head);
        match rest[start + 2..].find("*/") {
            Some(end) => {
                let comment = &rest[start..start + 2 + end + 2];
                let newlines = comment.matches('\n').count();
                for _ in 0..newlines {
                    out.push('\n');
                }
                line += newlines as u32;
                rest = &rest[start + 2 + end + 2..];
            }
            None => {
                return Err(CompileError::syntax(line, "Missing end comment \"*/\""));
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}
