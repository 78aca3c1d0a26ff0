// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Program intermediate representation and state-machine assembly.
//!
//! Statement lowering produces a flat [`PseudoOp`] stream; [`assemble`] walks
//! it once and folds the stream into a [`Program`]: layers of named states,
//! each holding straight-line instructions and outgoing transitions. Control
//! flow exists only as transitions between states; instructions within a
//! state are unconditional.

use indexmap::{IndexMap, IndexSet};

use super::error::{CompileError, CompileResult};
use super::expr_lower::lower_assignment;
use super::Compiler;
use crate::exprparse::Token;

pub const MAIN_LAYER: &str = "Main Layer";
pub const ENTRY_STATE: &str = "entry";
pub const END_STATE: &str = "end";

/// Instruction operand: a register reference or a numeric literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Reg(String),
    Lit(f64),
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Reg(name) => write!(f, "f{name}"),
            Operand::Lit(value) => write!(f, "{}", fmt_number(*value)),
        }
    }
}

/// Format a numeric literal the way the target assembler expects: integral
/// values print without a fractional part.
pub fn fmt_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// One straight-line target instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub mnemonic: &'static str,
    pub dest: String,
    pub args: Vec<Operand>,
}

impl Instruction {
    /// Shorthand for a `set` into a register.
    pub fn set(dest: impl Into<String>, arg: Operand) -> Self {
        Self {
            mnemonic: "set",
            dest: dest.into(),
            args: vec![arg],
        }
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} f{}", self.mnemonic, self.dest)?;
        for arg in &self.args {
            write!(f, ", {arg}")?;
        }
        Ok(())
    }
}

/// Flat lowering output, consumed by [`assemble`].
#[derive(Debug, Clone, PartialEq)]
pub enum PseudoOp {
    /// Open a new state with this name.
    Label(String),
    /// Transition out of the current state. `condition` names the register
    /// tested; `unless` inverts the test. `None` is unconditional.
    Goto {
        target: String,
        condition: Option<String>,
        unless: bool,
    },
    /// Declare an output binding from a register to a host destination.
    Output { var: String, dest: String },
    /// Assign a postfix expression to a register.
    Assign { target: String, tokens: Vec<Token> },
}

/// Outgoing edge of a state.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub target: String,
    pub condition: Option<String>,
    pub unless: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    pub instructions: Vec<Instruction>,
    pub transitions: Vec<Transition>,
}

impl State {
    fn has_unconditional_exit(&self) -> bool {
        self.transitions.iter().any(|t| t.condition.is_none())
    }
}

#[derive(Debug, Clone)]
pub struct Layer {
    pub name: String,
    pub states: IndexMap<String, State>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputDirective {
    pub var: String,
    pub destinations: Vec<String>,
}

/// Fully assembled program, ready for text emission. Variables keep
/// first-assignment order.
#[derive(Debug, Clone)]
pub struct Program {
    pub vars: IndexSet<String>,
    pub outputs: Vec<OutputDirective>,
    pub layers: Vec<Layer>,
}

/// Fold a pseudo-op stream into a single-layer state machine.
///
/// States are closed when the next label opens; a state that reaches its
/// label without an unconditional exit falls through to the following one.
/// A goto targeting the state it occurs in is forwarded through a
/// `<target>#loop` relay state so the machine re-enters and re-runs the
/// state's instructions.
pub fn assemble(c: &mut Compiler, ops: Vec<PseudoOp>) -> CompileResult<Program> {
    let mut states: IndexMap<String, State> = IndexMap::new();
    let mut name = ENTRY_STATE.to_string();
    let mut state = State::default();

    for op in ops {
        match op {
            PseudoOp::Label(next) => {
                if !state.has_unconditional_exit() {
                    state.transitions.push(Transition {
                        target: next.clone(),
                        condition: None,
                        unless: false,
                    });
                }
                close_state(&mut states, &mut name, &mut state, next)?;
            }
            PseudoOp::Goto {
                target,
                condition,
                unless,
            } => {
                if target == name {
                    // Self-loop: relay through an empty state so re-entry
                    // replays this state's instructions.
                    let relay = format!("{target}#loop");
                    state.transitions.push(Transition {
                        target: relay.clone(),
                        condition,
                        unless,
                    });
                    if !states.contains_key(&relay) {
                        states.insert(
                            relay,
                            State {
                                instructions: Vec::new(),
                                transitions: vec![Transition {
                                    target,
                                    condition: None,
                                    unless: false,
                                }],
                            },
                        );
                    }
                } else {
                    state.transitions.push(Transition {
                        target,
                        condition,
                        unless,
                    });
                }
            }
            PseudoOp::Output { var, dest } => {
                // One directive per statement; a destination list uses `:`
                // separators.
                c.outputs.push(OutputDirective {
                    var,
                    destinations: dest.split(':').map(str::to_string).collect(),
                });
            }
            PseudoOp::Assign { target, tokens } => {
                let lowered = lower_assignment(c, &target, &tokens)?;
                state.instructions.extend(lowered);
            }
        }
    }

    if !state.has_unconditional_exit() {
        state.transitions.push(Transition {
            target: END_STATE.to_string(),
            condition: None,
            unless: false,
        });
    }
    close_state(&mut states, &mut name, &mut state, END_STATE.to_string())?;
    // Terminal sink.
    states.insert(END_STATE.to_string(), State::default());

    Ok(Program {
        vars: c.vars.clone(),
        outputs: c.outputs.clone(),
        layers: vec![Layer {
            name: MAIN_LAYER.to_string(),
            states,
        }],
    })
}

fn close_state(
    states: &mut IndexMap<String, State>,
    name: &mut String,
    state: &mut State,
    next: String,
) -> CompileResult<()> {
    let finished = std::mem::take(state);
    let finished_name = std::mem::replace(name, next);
    if states.insert(finished_name.clone(), finished).is_some() {
        return Err(CompileError::internal(format!(
            "Duplicate state \"{finished_name}\""
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Compiler;
    use crate::exprparse::Token;

    fn assign(target: &str, value: f64) -> PseudoOp {
        PseudoOp::Assign {
            target: target.to_string(),
            tokens: vec![Token::Number(value)],
        }
    }

    fn label(name: &str) -> PseudoOp {
        PseudoOp::Label(name.to_string())
    }

    fn goto(target: &str) -> PseudoOp {
        PseudoOp::Goto {
            target: target.to_string(),
            condition: None,
            unless: false,
        }
    }

    #[test]
    fn fallthrough_injected_at_labels() {
        let mut c = Compiler::new();
        let program = assemble(&mut c, vec![assign("x", 1.0), label("Lnext")]).unwrap();
        let states = &program.layers[0].states;
        let entry = &states[ENTRY_STATE];
        assert_eq!(
            entry.transitions,
            vec![Transition {
                target: "Lnext".to_string(),
                condition: None,
                unless: false,
            }]
        );
        assert!(states.contains_key("Lnext"));
    }

    #[test]
    fn self_loop_forwards_through_relay() {
        let mut c = Compiler::new();
        let program = assemble(
            &mut c,
            vec![label("R1"), assign("x", 1.0), goto("R1")],
        )
        .unwrap();
        let states = &program.layers[0].states;
        let r1 = &states["R1"];
        assert_eq!(r1.transitions[0].target, "R1#loop");
        let relay = &states["R1#loop"];
        assert!(relay.instructions.is_empty());
        assert_eq!(relay.transitions[0].target, "R1");
        // Relay sits between the looping state and end in declaration order.
        let order: Vec<&str> = states.keys().map(String::as_str).collect();
        assert_eq!(order, vec![ENTRY_STATE, "R1#loop", "R1", END_STATE]);
    }

    #[test]
    fn final_state_keeps_instructions_and_exits_to_end() {
        let mut c = Compiler::new();
        let program = assemble(&mut c, vec![label("Ldone"), assign("x", 5.0)]).unwrap();
        let states = &program.layers[0].states;
        let done = &states["Ldone"];
        assert_eq!(done.instructions.len(), 1);
        assert_eq!(done.transitions[0].target, END_STATE);
        let end = &states[END_STATE];
        assert!(end.instructions.is_empty());
        assert!(end.transitions.is_empty());
    }

    #[test]
    fn outputs_append_one_directive_per_statement() {
        let mut c = Compiler::new();
        let program = assemble(
            &mut c,
            vec![
                PseudoOp::Output {
                    var: "x".to_string(),
                    dest: "a.b".to_string(),
                },
                PseudoOp::Output {
                    var: "x".to_string(),
                    dest: "c.d".to_string(),
                },
            ],
        )
        .unwrap();
        assert_eq!(
            program.outputs,
            vec![
                OutputDirective {
                    var: "x".to_string(),
                    destinations: vec!["a.b".to_string()],
                },
                OutputDirective {
                    var: "x".to_string(),
                    destinations: vec!["c.d".to_string()],
                },
            ]
        );
    }

    #[test]
    fn output_destination_list_splits_on_colons() {
        let mut c = Compiler::new();
        let program = assemble(
            &mut c,
            vec![PseudoOp::Output {
                var: "x".to_string(),
                dest: "a.b:c.d".to_string(),
            }],
        )
        .unwrap();
        assert_eq!(
            program.outputs,
            vec![OutputDirective {
                var: "x".to_string(),
                destinations: vec!["a.b".to_string(), "c.d".to_string()],
            }]
        );
    }
}
