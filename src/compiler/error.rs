// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Compiler error types.
//!
//! Compilation is fail-fast: the first error aborts the run with no partial
//! output. `Syntax` errors point at user input and carry the 1-based source
//! line; `Internal` errors signal a compiler defect (for example a token
//! shape that lowering cannot handle).

use std::fmt;

/// Categories of compile errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileErrorKind {
    Syntax,
    Internal,
}

/// A fatal compile error.
#[derive(Debug, Clone)]
pub struct CompileError {
    kind: CompileErrorKind,
    message: String,
    line: Option<u32>,
}

impl CompileError {
    pub fn syntax(line: u32, message: impl Into<String>) -> Self {
        Self {
            kind: CompileErrorKind::Syntax,
            message: message.into(),
            line: Some(line),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: CompileErrorKind::Internal,
            message: message.into(),
            line: None,
        }
    }

    pub fn kind(&self) -> CompileErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn line(&self) -> Option<u32> {
        self.line
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.line) {
            (CompileErrorKind::Syntax, Some(line)) => {
                write!(f, "Error on line {}: {}", line, self.message)
            }
            (CompileErrorKind::Syntax, None) => write!(f, "Error: {}", self.message),
            (CompileErrorKind::Internal, _) => write!(f, "Internal Error: {}", self.message),
        }
    }
}

impl std::error::Error for CompileError {}

pub type CompileResult<T> = Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_names_the_line() {
        let err = CompileError::syntax(7, "Unexpected \"end\"");
        assert_eq!(err.kind(), CompileErrorKind::Syntax);
        assert_eq!(err.line(), Some(7));
        assert_eq!(err.to_string(), "Error on line 7: Unexpected \"end\"");
    }

    #[test]
    fn internal_error_has_no_line() {
        let err = CompileError::internal("Unknown operator \"?\"");
        assert_eq!(err.kind(), CompileErrorKind::Internal);
        assert_eq!(err.line(), None);
        assert_eq!(err.to_string(), "Internal Error: Unknown operator \"?\"");
    }
}
