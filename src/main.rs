// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for stateforge.

use std::fs;
use std::process;

use clap::Parser;

use stateforge::cli::{validate_cli, Cli, DEBUG_TOKENS_PATH};
use stateforge::compiler::{compile, CompileOptions};

fn main() {
    let cli = Cli::parse();
    let config = validate_cli(&cli);

    let source = match fs::read_to_string(&config.input) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Error reading {}: {err}", config.input.display());
            process::exit(1);
        }
    };

    let options = CompileOptions {
        debug: config.debug,
    };
    let output = match compile(&source, &options) {
        Ok(output) => output,
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    };

    if let Some(trace) = &output.debug_trace {
        if let Err(err) = fs::write(DEBUG_TOKENS_PATH, trace.to_string()) {
            eprintln!("Error writing {DEBUG_TOKENS_PATH}: {err}");
            process::exit(1);
        }
    }

    if let Err(err) = fs::write(&config.output, output.assembly) {
        eprintln!("Error writing {}: {err}", config.output.display());
        process::exit(1);
    }
}
