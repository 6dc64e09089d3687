//! Label table pre-pass
//!
//! Labels are indexed before every run because edits to the source
//! invalidate previously recorded line indices.

use crate::walle::error::{Error, Result};
use crate::walle::lexer::{Lexer, TokenKind};
use std::collections::HashMap;

/// Mapping from label name (case-insensitive) to 0-based line index.
#[derive(Clone, Debug, Default)]
pub struct LabelTable {
    targets: HashMap<String, usize>,
}

impl LabelTable {
    /// Scan all source lines and register every line that consists solely
    /// of an identifier followed by `:`. A repeated name is a NameError.
    ///
    /// Lines that fail to lex are skipped here; the executor reports them
    /// when (and if) they are reached.
    pub fn build(lines: &[String]) -> Result<Self> {
        let mut table = LabelTable::default();

        for (index, line) in lines.iter().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with("//") {
                continue;
            }

            let tokens = match Lexer::for_line(trimmed, index).tokenize() {
                Ok(tokens) => tokens,
                Err(_) => continue,
            };

            if let [first, rest @ ..] = tokens.as_slice() {
                if let TokenKind::Label(name) = &first.kind {
                    if rest.len() == 1 && rest[0].kind == TokenKind::Eof {
                        let key = name.to_lowercase();
                        if table.targets.insert(key, index).is_some() {
                            return Err(Error::name(
                                index,
                                format!("duplicate label '{}'", name),
                            ));
                        }
                    }
                }
            }
        }

        Ok(table)
    }

    /// Look up a jump target by name, case-insensitively.
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.targets.get(&name.to_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
