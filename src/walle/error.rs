//! Errors raised while lexing or executing a Wall-E program.
//!
//! Every error is fatal to the run it occurs in: execution halts at the
//! offending line and the host surfaces the message. A taken `GoTo` is not
//! an error; it travels through `LineResult::Jump` instead.

/// Execution error, carrying the 0-based index of the offending source line.
///
/// Line indices match the line addressing used by the program counter and
/// the label table; `Display` shows them 1-based for humans.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Bad character or unterminated string.
    #[error("lex error at line {}: {message}", .line + 1)]
    Lex { line: usize, message: String },

    /// Malformed statement, wrong argument count, malformed GoTo.
    #[error("syntax error at line {}: {message}", .line + 1)]
    Syntax { line: usize, message: String },

    /// Unknown color, undefined variable, undefined or duplicate label.
    #[error("name error at line {}: {message}", .line + 1)]
    Name { line: usize, message: String },

    /// Division by zero, spawn out of bounds, spawn gate violations.
    #[error("runtime error at line {}: {message}", .line + 1)]
    Runtime { line: usize, message: String },
}

impl Error {
    pub fn lex(line: usize, message: impl Into<String>) -> Self {
        Error::Lex { line, message: message.into() }
    }

    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Error::Syntax { line, message: message.into() }
    }

    pub fn name(line: usize, message: impl Into<String>) -> Self {
        Error::Name { line, message: message.into() }
    }

    pub fn runtime(line: usize, message: impl Into<String>) -> Self {
        Error::Runtime { line, message: message.into() }
    }

    /// The 0-based source line the error points at.
    pub fn line(&self) -> usize {
        match self {
            Error::Lex { line, .. }
            | Error::Syntax { line, .. }
            | Error::Name { line, .. }
            | Error::Runtime { line, .. } => *line,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
