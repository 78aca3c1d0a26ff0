// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Text emission of an assembled program.

use super::ops::{BUILTIN_MACROS, SCRATCH_EXPR, SCRATCH_MACRO};
use super::program::Program;

/// Render a program as target assembly text. Sections come out in a fixed
/// order: scratch declarations, builtin macros, variables, outputs, layers.
pub fn build_assembly(program: &Program) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("var f{SCRATCH_MACRO}"));
    lines.push(format!("var f{SCRATCH_EXPR}"));
    for mac in BUILTIN_MACROS {
        if let Some(note) = mac.note {
            lines.push(format!("; {note}"));
        }
        lines.push(format!("macro {}, $A, $B", mac.name));
        for body_line in mac.body {
            lines.push(format!("  {body_line}"));
        }
        lines.push("end macro".to_string());
    }

    for name in &program.vars {
        lines.push(format!("var f{name}"));
    }

    for output in &program.outputs {
        lines.push(format!(
            "output f{}, {}",
            output.var,
            output.destinations.join(",")
        ));
    }

    for layer in &program.layers {
        lines.push(format!("layer {}", layer.name));
        for (name, state) in &layer.states {
            lines.push(format!("state {name}"));
            for instr in &state.instructions {
                lines.push(instr.to_string());
            }
            for transition in &state.transitions {
                match &transition.condition {
                    Some(cond) if transition.unless => {
                        lines.push(format!("goto_unless f{cond}, {}", transition.target));
                    }
                    Some(cond) => {
                        lines.push(format!("goto_if f{cond}, {}", transition.target));
                    }
                    None => lines.push(format!("goto {}", transition.target)),
                }
            }
            lines.push("end state".to_string());
        }
        lines.push("end layer".to_string());
    }

    lines.join("\n")
}
