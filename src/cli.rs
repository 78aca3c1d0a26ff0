// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Command-line interface parsing and argument validation.

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Debug token dump path, written next to the working directory.
pub const DEBUG_TOKENS_PATH: &str = "debug_tokens.json";

const LONG_ABOUT: &str =
    "Compiles a small imperative scripting language (assignments, if/else, while/repeat/for
loops, labels and gotos, output directives) into textual assembly for a state-machine
animation driver. Conditionals select values; loops become state transitions.

The output path defaults to the input path with .asm appended.";

#[derive(Parser, Debug)]
#[command(
    name = "stateforge",
    version = VERSION,
    about = "Script compiler targeting state-machine animator assembly",
    long_about = LONG_ABOUT
)]
pub struct Cli {
    #[arg(
        value_name = "SOURCE",
        long_help = "Source script to compile. Read as UTF-8 text."
    )]
    pub input: PathBuf,
    #[arg(
        short = 'd',
        long = "debug",
        action = ArgAction::SetTrue,
        long_help = "Dump the lowered token stream to debug_tokens.json in the working directory."
    )]
    pub debug: bool,
    #[arg(
        short = 'o',
        long = "output",
        value_name = "FILE",
        long_help = "Write assembly to FILE instead of <SOURCE>.asm."
    )]
    pub output: Option<PathBuf>,
}

/// Validated CLI configuration.
#[derive(Debug)]
pub struct CliConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub debug: bool,
}

/// Resolve defaults and return the final run configuration.
pub fn validate_cli(cli: &Cli) -> CliConfig {
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input));
    CliConfig {
        input: cli.input.clone(),
        output,
        debug: cli.debug,
    }
}

/// Default output path: the input path with `.asm` appended, keeping the
/// original extension.
pub fn default_output_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_os_string();
    name.push(".asm");
    PathBuf::from(name)
}
