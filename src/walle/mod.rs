//! Wall-E language interpreter

pub mod canvas;
pub mod error;
pub mod expr;
pub mod interpreter;
pub mod labels;
pub mod lexer;

pub use canvas::{Canvas, PaletteColor};
pub use error::{Error, Result};
pub use interpreter::{ExecutionResult, Interpreter, LineResult, TurtleStatus};
pub use lexer::{Lexer, Token, TokenKind};
