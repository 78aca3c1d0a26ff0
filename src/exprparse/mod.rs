// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Infix expression parsing into postfix token streams.
//!
//! The compiler proper never sees infix text. Every expression is parsed here
//! into a flat postfix [`Token`] sequence, and the lowering passes consume
//! that contract only. Each operator, function, and named-value entry carries
//! a host fold implementation so lowering can evaluate all-literal operations
//! at compile time.
//!
//! Custom callables (the compiler's bitwise/shift aliases) are supplied as an
//! explicit extension table at construction via [`ExprParser::with_extensions`]
//! rather than by mutating a shared parser instance.

mod parser;
mod tokenizer;

use indexmap::IndexMap;

/// One element of a postfix expression stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Numeric literal.
    Number(f64),
    /// Variable reference; also names the callee before a `FuncCall` marker.
    Var(String),
    /// Unary operator by source symbol (`-`, `sqrt`, ...).
    Unary(String),
    /// Binary operator by source symbol (`+`, `==`, `and`, `,`, `||`, ...).
    Binary(String),
    /// Function-call marker; pops the argument list and the callee name.
    FuncCall,
}

/// Error from expression tokenization or parsing.
#[derive(Debug, Clone)]
pub struct ExprError {
    message: String,
    column: Option<usize>,
}

impl ExprError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            column: None,
        }
    }

    pub fn at(column: usize, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            column: Some(column),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn column(&self) -> Option<usize> {
        self.column
    }
}

impl std::fmt::Display for ExprError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.column {
            Some(col) => write!(f, "{} (column {})", self.message, col),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ExprError {}

/// Host implementation of an operator or function, used for constant folding.
///
/// `Opaque` entries name callables that exist on the target machine but must
/// never be folded at compile time (nondeterministic ones such as `random`
/// and the dice operator); lowering always emits an instruction for them.
#[derive(Debug, Clone, Copy)]
pub enum HostFn {
    Unary(fn(f64) -> f64),
    Binary(fn(f64, f64) -> f64),
    Ternary(fn(f64, f64, f64) -> f64),
    Opaque,
}

/// Outcome of a fold attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FoldResult {
    Value(f64),
    Opaque,
    Arity,
}

impl HostFn {
    /// Apply the host implementation to fully literal arguments.
    pub fn fold(&self, args: &[f64]) -> FoldResult {
        match (self, args) {
            (HostFn::Opaque, _) => FoldResult::Opaque,
            (HostFn::Unary(f), [a]) => FoldResult::Value(f(*a)),
            (HostFn::Binary(f), [a, b]) => FoldResult::Value(f(*a, *b)),
            (HostFn::Ternary(f), [a, b, c]) => FoldResult::Value(f(*a, *b, *c)),
            _ => FoldResult::Arity,
        }
    }
}

fn f_neg(x: f64) -> f64 {
    -x
}
fn f_sqrt(x: f64) -> f64 {
    x.sqrt()
}
fn f_abs(x: f64) -> f64 {
    x.abs()
}
fn f_ceil(x: f64) -> f64 {
    x.ceil()
}
fn f_floor(x: f64) -> f64 {
    x.floor()
}
fn f_round(x: f64) -> f64 {
    // Half-to-even, matching the reference host arithmetic.
    x.round_ties_even()
}
fn f_not(x: f64) -> f64 {
    // Matches the emitted `not` macro: xor against 0xffffffff.
    (((x as i64) as u32) ^ 0xffff_ffff) as f64
}
fn f_exp(x: f64) -> f64 {
    x.exp()
}
fn f_log(x: f64) -> f64 {
    x.ln()
}

fn f_add(a: f64, b: f64) -> f64 {
    a + b
}
fn f_sub(a: f64, b: f64) -> f64 {
    a - b
}
fn f_mul(a: f64, b: f64) -> f64 {
    a * b
}
fn f_div(a: f64, b: f64) -> f64 {
    a / b
}
fn f_mod(a: f64, b: f64) -> f64 {
    // Floored modulo; result takes the sign of the divisor.
    a - b * (a / b).floor()
}
fn f_pow(a: f64, b: f64) -> f64 {
    a.powf(b)
}
fn f_eq(a: f64, b: f64) -> f64 {
    bool_num(a == b)
}
fn f_ne(a: f64, b: f64) -> f64 {
    bool_num(a != b)
}
fn f_gt(a: f64, b: f64) -> f64 {
    bool_num(a > b)
}
fn f_lt(a: f64, b: f64) -> f64 {
    bool_num(a < b)
}
fn f_ge(a: f64, b: f64) -> f64 {
    bool_num(a >= b)
}
fn f_le(a: f64, b: f64) -> f64 {
    bool_num(a <= b)
}
fn f_land(a: f64, b: f64) -> f64 {
    bool_num(a != 0.0 && b != 0.0)
}
fn f_lor(a: f64, b: f64) -> f64 {
    bool_num(a != 0.0 || b != 0.0)
}
fn f_lxor(a: f64, b: f64) -> f64 {
    bool_num((a != 0.0) != (b != 0.0))
}
fn f_min(a: f64, b: f64) -> f64 {
    a.min(b)
}
fn f_max(a: f64, b: f64) -> f64 {
    a.max(b)
}
fn f_if(c: f64, a: f64, b: f64) -> f64 {
    if c != 0.0 {
        a
    } else {
        b
    }
}

fn bool_num(v: bool) -> f64 {
    if v {
        1.0
    } else {
        0.0
    }
}

/// Unary operator table. `-` is positional; the rest are word operators.
const OPS1: &[(&str, HostFn)] = &[
    ("-", HostFn::Unary(f_neg)),
    ("sqrt", HostFn::Unary(f_sqrt)),
    ("abs", HostFn::Unary(f_abs)),
    ("ceil", HostFn::Unary(f_ceil)),
    ("floor", HostFn::Unary(f_floor)),
    ("round", HostFn::Unary(f_round)),
    ("not", HostFn::Unary(f_not)),
    ("exp", HostFn::Unary(f_exp)),
    ("log", HostFn::Unary(f_log)),
];

/// Binary operator table. `,` and `||` are structural argument merges and
/// deliberately absent: they never fold and never emit.
const OPS2: &[(&str, HostFn)] = &[
    ("+", HostFn::Binary(f_add)),
    ("-", HostFn::Binary(f_sub)),
    ("*", HostFn::Binary(f_mul)),
    ("/", HostFn::Binary(f_div)),
    ("%", HostFn::Binary(f_mod)),
    ("^", HostFn::Binary(f_pow)),
    ("**", HostFn::Binary(f_pow)),
    ("==", HostFn::Binary(f_eq)),
    ("!=", HostFn::Binary(f_ne)),
    (">", HostFn::Binary(f_gt)),
    ("<", HostFn::Binary(f_lt)),
    (">=", HostFn::Binary(f_ge)),
    ("<=", HostFn::Binary(f_le)),
    ("and", HostFn::Binary(f_land)),
    ("or", HostFn::Binary(f_lor)),
    ("xor", HostFn::Binary(f_lxor)),
    ("D", HostFn::Opaque),
];

/// Function table.
const FUNCTIONS: &[(&str, HostFn)] = &[
    ("random", HostFn::Opaque),
    ("min", HostFn::Binary(f_min)),
    ("max", HostFn::Binary(f_max)),
    ("pow", HostFn::Binary(f_pow)),
    ("if", HostFn::Ternary(f_if)),
];

fn table_lookup(table: &[(&str, HostFn)], name: &str) -> Option<HostFn> {
    table
        .iter()
        .find(|(sym, _)| *sym == name)
        .map(|(_, host)| *host)
}

/// Infix expression parser with fixed operator/function tables and an
/// optional named-value extension table.
#[derive(Debug, Default)]
pub struct ExprParser {
    values: IndexMap<String, HostFn>,
}

impl ExprParser {
    pub fn new() -> Self {
        Self {
            values: IndexMap::new(),
        }
    }

    /// Build a parser whose named-value table is extended with custom
    /// callables. Extensions use call syntax (`shr(a, b)`) and resolve after
    /// the builtin tables.
    pub fn with_extensions(extensions: &[(&str, HostFn)]) -> Self {
        let mut parser = Self::new();
        for (name, host) in extensions {
            parser.values.insert((*name).to_string(), *host);
        }
        parser
    }

    /// Parse infix text into a postfix token stream.
    pub fn parse(&self, text: &str) -> Result<Vec<Token>, ExprError> {
        parser::parse(self, text)
    }

    /// Host fold implementation for a unary operator symbol.
    pub fn unary_fold(&self, sym: &str) -> Option<HostFn> {
        table_lookup(OPS1, sym)
    }

    /// Host fold implementation for a binary operator symbol.
    pub fn binary_fold(&self, sym: &str) -> Option<HostFn> {
        table_lookup(OPS2, sym)
    }

    /// Resolve a callee name across all tables, in priority order:
    /// functions, unary operators, binary operators, named values.
    pub fn resolve_call(&self, name: &str) -> Option<HostFn> {
        table_lookup(FUNCTIONS, name)
            .or_else(|| table_lookup(OPS1, name))
            .or_else(|| table_lookup(OPS2, name))
            .or_else(|| self.values.get(name).copied())
    }

    pub(crate) fn is_unary_word(&self, name: &str) -> bool {
        name != "-" && table_lookup(OPS1, name).is_some()
    }

    pub(crate) fn is_binary_word(&self, name: &str) -> bool {
        matches!(name, "and" | "or" | "xor" | "D")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_call_prefers_functions_over_operators() {
        let parser = ExprParser::new();
        // `if` is a function (ternary), not reachable as an operator.
        match parser.resolve_call("if") {
            Some(HostFn::Ternary(_)) => {}
            other => panic!("unexpected resolution: {other:?}"),
        }
        // `not` only exists as a unary operator.
        match parser.resolve_call("not") {
            Some(HostFn::Unary(_)) => {}
            other => panic!("unexpected resolution: {other:?}"),
        }
    }

    #[test]
    fn resolve_call_falls_back_to_extensions() {
        fn plus_one(a: f64, _b: f64) -> f64 {
            a + 1.0
        }
        let parser = ExprParser::with_extensions(&[("bump", HostFn::Binary(plus_one))]);
        assert!(parser.resolve_call("bump").is_some());
        assert!(parser.resolve_call("missing").is_none());
    }

    #[test]
    fn fold_checks_arity() {
        let host = table_lookup(OPS2, "+").unwrap();
        assert_eq!(host.fold(&[1.0, 2.0]), FoldResult::Value(3.0));
        assert_eq!(host.fold(&[1.0]), FoldResult::Arity);
    }

    #[test]
    fn opaque_entries_never_fold() {
        let parser = ExprParser::new();
        let host = parser.resolve_call("random").unwrap();
        assert_eq!(host.fold(&[4.0]), FoldResult::Opaque);
        let dice = parser.binary_fold("D").unwrap();
        assert_eq!(dice.fold(&[3.0, 6.0]), FoldResult::Opaque);
    }

    #[test]
    fn floored_modulo_matches_host_semantics() {
        assert_eq!(f_mod(-7.0, 3.0), 2.0);
        assert_eq!(f_mod(7.0, 3.0), 1.0);
    }

    #[test]
    fn round_folds_half_to_even() {
        assert_eq!(f_round(2.5), 2.0);
        assert_eq!(f_round(3.5), 4.0);
    }
}
