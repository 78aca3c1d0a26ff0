// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Target operation tables.
//!
//! Maps source operator symbols to target mnemonics, declares the builtin
//! macro bodies the emitter prepends to every program, and supplies the
//! parser extension table for the bitwise/shift callables.

use crate::exprparse::HostFn;

/// Scratch register used by expression lowering for intermediate results.
pub const SCRATCH_EXPR: &str = "#BuiltinTmpA";
/// Scratch register reserved for builtin macro bodies.
pub const SCRATCH_MACRO: &str = "#BuiltinTmp";
/// Destination used by `output` directives that name no target.
pub const DEFAULT_OUTPUT_PATH: &str = "material._Value";

/// Map a source operator or function symbol to its target mnemonic.
///
/// Several source spellings share a mnemonic (`^`/`**`/`pow`, the bitwise
/// long and short names). `ipart` truncates toward zero, so `floor` lowers
/// to it directly while `ceil` and `round` go through macros.
pub fn symbol_to_operator(sym: &str) -> Option<&'static str> {
    let mnemonic = match sym {
        "sqrt" => "sqrt",
        "abs" => "abs",
        "ceil" => "ceil",
        "floor" => "ipart",
        "round" => "round",
        "not" => "not",
        "exp" => "pow",
        "log" => "log",
        "+" => "add",
        "-" => "sub",
        "*" => "mul",
        "/" => "div",
        "%" => "mod",
        "^" | "**" | "pow" => "pow",
        "==" => "eq",
        "!=" => "ne",
        ">" => "gt",
        "<" => "lt",
        ">=" => "ge",
        "<=" => "le",
        "and" => "land",
        "or" => "lor",
        "xor" => "xor",
        "D" => "diceroll",
        "random" => "random",
        "min" => "min",
        "max" => "max",
        "if" => "cond",
        "band" | "bitwise_and" => "and",
        "bor" | "bitwise_or" => "or",
        "bxor" | "bitwise_xor" => "xor",
        "shr" | "shift_right" => "shr",
        "shl" | "shift_left" => "shl",
        "ror" | "rotate_right" => "ror",
        "rol" | "rotate_left" => "rol",
        _ => return None,
    };
    Some(mnemonic)
}

/// A builtin macro emitted into every program prologue.
pub struct BuiltinMacro {
    pub name: &'static str,
    /// Comment line printed before the macro definition.
    pub note: Option<&'static str>,
    pub body: &'static [&'static str],
}

/// Macro bodies for mnemonics the target machine lacks natively. `$A` is the
/// destination, `$B` the source operand.
pub const BUILTIN_MACROS: &[BuiltinMacro] = &[
    BuiltinMacro {
        name: "sqrt",
        note: None,
        body: &["pow $A, $B, -1"],
    },
    BuiltinMacro {
        name: "ceil",
        note: None,
        body: &[
            "fpart f#BuiltinTmp, $B",
            "ipart $A, $B",
            "cond f#BuiltinTmp, f#BuiltinTmp, 0, 1",
            "add $A, $A, f#BuiltinTmp",
        ],
    },
    BuiltinMacro {
        name: "round",
        note: Some("note: AnimatorDriver conditional is true if the condition is >= 0.5."),
        body: &[
            "fpart f#BuiltinTmp, $B",
            "ipart $A, $B",
            "cond f#BuiltinTmp, f#BuiltinTmp, 0, -1",
            "add $A, $A, f#BuiltinTmp",
        ],
    },
    BuiltinMacro {
        name: "abs",
        note: None,
        body: &[
            "negate $A, $B",
            "ge f#BuiltinTmp, $A, 0",
            "cond $A, f#BuiltinTmp, $B, $A",
        ],
    },
    // Target parameters are normalized to [0,1], so negation is 1 - x.
    BuiltinMacro {
        name: "negate",
        note: None,
        body: &["sub $A, 1, $B"],
    },
    BuiltinMacro {
        name: "not",
        note: None,
        body: &["xor $A, $B, 0xffffffff"],
    },
];

fn ext_shr(a: f64, b: f64) -> f64 {
    (a.trunc() / 2f64.powf(b)).floor()
}

fn ext_shl(a: f64, b: f64) -> f64 {
    a.trunc() * 2f64.powf(b)
}

fn ext_ror(a: f64, b: f64) -> f64 {
    ext_shr(a, b) + ext_shl(a, 31.0 - b)
}

fn ext_rol(a: f64, b: f64) -> f64 {
    ext_shl(a, b) + ext_shr(a, 31.0 - b)
}

fn ext_band(a: f64, b: f64) -> f64 {
    ((a as i64) & (b as i64)) as f64
}

fn ext_bor(a: f64, b: f64) -> f64 {
    ((a as i64) | (b as i64)) as f64
}

fn ext_bxor(a: f64, b: f64) -> f64 {
    ((a as i64) ^ (b as i64)) as f64
}

/// Extension table installed into the expression parser. Both long and short
/// spellings resolve to the same host implementation.
pub fn parser_extensions() -> Vec<(&'static str, HostFn)> {
    vec![
        ("shift_right", HostFn::Binary(ext_shr)),
        ("shr", HostFn::Binary(ext_shr)),
        ("shift_left", HostFn::Binary(ext_shl)),
        ("shl", HostFn::Binary(ext_shl)),
        ("rotate_right", HostFn::Binary(ext_ror)),
        ("ror", HostFn::Binary(ext_ror)),
        ("rotate_left", HostFn::Binary(ext_rol)),
        ("rol", HostFn::Binary(ext_rol)),
        ("bitwise_and", HostFn::Binary(ext_band)),
        ("band", HostFn::Binary(ext_band)),
        ("bitwise_or", HostFn::Binary(ext_bor)),
        ("bor", HostFn::Binary(ext_bor)),
        ("bitwise_xor", HostFn::Binary(ext_bxor)),
        ("bxor", HostFn::Binary(ext_bxor)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spellings_share_mnemonics() {
        assert_eq!(symbol_to_operator("^"), Some("pow"));
        assert_eq!(symbol_to_operator("**"), Some("pow"));
        assert_eq!(symbol_to_operator("pow"), Some("pow"));
        assert_eq!(symbol_to_operator("band"), Some("and"));
        assert_eq!(symbol_to_operator("bitwise_and"), Some("and"));
    }

    #[test]
    fn floor_lowers_to_ipart() {
        assert_eq!(symbol_to_operator("floor"), Some("ipart"));
    }

    #[test]
    fn unknown_symbols_are_none() {
        assert_eq!(symbol_to_operator("frobnicate"), None);
        assert_eq!(symbol_to_operator(","), None);
        assert_eq!(symbol_to_operator("||"), None);
    }

    #[test]
    fn shift_extensions_truncate_before_shifting() {
        assert_eq!(ext_shr(13.7, 2.0), 3.0);
        assert_eq!(ext_shl(3.2, 2.0), 12.0);
    }

    #[test]
    fn bitwise_extensions_operate_on_integer_bits() {
        assert_eq!(ext_band(12.0, 10.0), 8.0);
        assert_eq!(ext_bor(12.0, 10.0), 14.0);
        assert_eq!(ext_bxor(12.0, 10.0), 6.0);
    }
}
