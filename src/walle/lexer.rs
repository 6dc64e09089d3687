//! Wall-E lexer/tokenizer

use crate::walle::error::{Error, Result};
use std::iter::Peekable;
use std::str::Chars;

/// Token kinds
#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(i64),
    Str(String),

    // Identifiers, keywords, label declarations (`name:`)
    Identifier(String),
    Keyword(Keyword),
    Label(String),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Power,    // **
    Assign,   // <-
    Equal,    // ==
    NotEqual, // !=
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Bang, // !
    AndAnd,
    OrOr,

    // Punctuation
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Comma,

    // Special
    Newline,
    Eof,
}

/// Wall-E keywords, matched case-insensitively
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyword {
    // Commands
    Spawn,
    Color,
    Size,
    DrawLine,
    DrawCircle,
    DrawRectangle,
    Fill,
    GoTo,

    // Block statements
    If, Then, Else, EndIf,
    While, Do, EndWhile,

    // Boolean literals and word operators
    True, False,
    And, Or, Not,

    // Built-in queries
    GetActualX,
    GetActualY,
    GetCanvasSize,
    GetColorCount,
    IsBrushColor,
    IsBrushSize,
    IsCanvasColor,
}

impl Keyword {
    /// True for the built-in query functions usable inside expressions.
    pub fn is_builtin(self) -> bool {
        matches!(
            self,
            Keyword::GetActualX
                | Keyword::GetActualY
                | Keyword::GetCanvasSize
                | Keyword::GetColorCount
                | Keyword::IsBrushColor
                | Keyword::IsBrushSize
                | Keyword::IsCanvasColor
        )
    }
}

/// A token with position info
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// 0-based source line index, matching program-counter addressing.
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize, column: usize) -> Self {
        Self { kind, line, column }
    }
}

/// The lexer
pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
    current_char: Option<char>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self::for_line(input, 0)
    }

    /// Lex a single source line, attributing tokens to `line` so that
    /// per-line execution reports the right position.
    pub fn for_line(input: &'a str, line: usize) -> Self {
        let mut lexer = Self {
            input: input.chars().peekable(),
            line,
            column: 1,
            current_char: None,
        };
        lexer.advance();
        lexer
    }

    fn advance(&mut self) -> Option<char> {
        let prev = self.current_char;
        self.current_char = self.input.next();
        if prev == Some('\n') {
            self.line += 1;
            self.column = 1;
        } else if prev.is_some() {
            self.column += 1;
        }
        prev
    }

    fn peek(&self) -> Option<char> {
        self.current_char
    }

    fn peek_next(&mut self) -> Option<char> {
        self.input.peek().copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c == ' ' || c == '\t' || c == '\r' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self) -> Result<TokenKind> {
        let line = self.line;
        let mut num_str = String::new();

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                num_str.push(c);
                self.advance();
            } else {
                break;
            }
        }

        num_str
            .parse()
            .map(TokenKind::Number)
            .map_err(|_| Error::lex(line, format!("number literal '{}' is too large", num_str)))
    }

    fn read_string(&mut self) -> Result<TokenKind> {
        let line = self.line;
        self.advance(); // Skip opening quote
        let mut s = String::new();

        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(Error::lex(line, "unterminated string literal"));
                }
                Some('"') => {
                    self.advance();
                    return Ok(TokenKind::Str(s));
                }
                Some('\\') => {
                    // Backslash escapes the next character
                    self.advance();
                    match self.peek() {
                        None | Some('\n') => {
                            return Err(Error::lex(line, "unterminated string literal"));
                        }
                        Some(c) => {
                            s.push(c);
                            self.advance();
                        }
                    }
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
            }
        }
    }

    fn read_identifier(&mut self) -> TokenKind {
        let mut name = String::new();

        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }

        // `name:` with no intervening whitespace declares a label
        if self.peek() == Some(':') {
            self.advance();
            return TokenKind::Label(name);
        }

        if let Some(kw) = Self::get_keyword(&name.to_lowercase()) {
            TokenKind::Keyword(kw)
        } else {
            TokenKind::Identifier(name)
        }
    }

    fn get_keyword(name: &str) -> Option<Keyword> {
        match name {
            // Commands
            "spawn" => Some(Keyword::Spawn),
            "color" => Some(Keyword::Color),
            "size" => Some(Keyword::Size),
            "drawline" => Some(Keyword::DrawLine),
            "drawcircle" => Some(Keyword::DrawCircle),
            "drawrectangle" => Some(Keyword::DrawRectangle),
            "fill" => Some(Keyword::Fill),
            "goto" => Some(Keyword::GoTo),

            // Block statements
            "if" => Some(Keyword::If),
            "then" => Some(Keyword::Then),
            "else" => Some(Keyword::Else),
            "endif" => Some(Keyword::EndIf),
            "while" => Some(Keyword::While),
            "do" => Some(Keyword::Do),
            "endwhile" => Some(Keyword::EndWhile),

            // Literals and word operators
            "true" => Some(Keyword::True),
            "false" => Some(Keyword::False),
            "and" => Some(Keyword::And),
            "or" => Some(Keyword::Or),
            "not" => Some(Keyword::Not),

            // Built-in queries
            "getactualx" => Some(Keyword::GetActualX),
            "getactualy" => Some(Keyword::GetActualY),
            "getcanvassize" => Some(Keyword::GetCanvasSize),
            "getcolorcount" => Some(Keyword::GetColorCount),
            "isbrushcolor" => Some(Keyword::IsBrushColor),
            "isbrushsize" => Some(Keyword::IsBrushSize),
            "iscanvascolor" => Some(Keyword::IsCanvasColor),

            _ => None,
        }
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();

        let line = self.line;
        let column = self.column;

        let kind = match self.peek() {
            None => TokenKind::Eof,

            Some('\n') => {
                self.advance();
                TokenKind::Newline
            }

            Some('"') => self.read_string()?,

            Some(c) if c.is_ascii_digit() => self.read_number()?,

            Some(c) if c.is_ascii_alphabetic() || c == '_' => self.read_identifier(),

            Some('/') => {
                if self.peek_next() == Some('/') {
                    self.skip_comment();
                    return self.next_token();
                }
                self.advance();
                TokenKind::Slash
            }

            Some('+') => {
                self.advance();
                TokenKind::Plus
            }
            Some('-') => {
                self.advance();
                TokenKind::Minus
            }
            Some('*') => {
                self.advance();
                if self.peek() == Some('*') {
                    self.advance();
                    TokenKind::Power
                } else {
                    TokenKind::Star
                }
            }
            Some('%') => {
                self.advance();
                TokenKind::Percent
            }
            Some('=') => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::Equal
                } else {
                    return Err(Error::lex(line, "unexpected character '=' (assignment is '<-')"));
                }
            }
            Some('!') => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::NotEqual
                } else {
                    TokenKind::Bang
                }
            }
            Some('<') => {
                self.advance();
                match self.peek() {
                    Some('=') => {
                        self.advance();
                        TokenKind::LessEqual
                    }
                    Some('-') => {
                        self.advance();
                        TokenKind::Assign
                    }
                    _ => TokenKind::Less,
                }
            }
            Some('>') => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                }
            }
            Some('&') => {
                self.advance();
                if self.peek() == Some('&') {
                    self.advance();
                    TokenKind::AndAnd
                } else {
                    return Err(Error::lex(line, "unexpected character '&'"));
                }
            }
            Some('|') => {
                self.advance();
                if self.peek() == Some('|') {
                    self.advance();
                    TokenKind::OrOr
                } else {
                    return Err(Error::lex(line, "unexpected character '|'"));
                }
            }
            Some('(') => {
                self.advance();
                TokenKind::LeftParen
            }
            Some(')') => {
                self.advance();
                TokenKind::RightParen
            }
            Some('[') => {
                self.advance();
                TokenKind::LeftBracket
            }
            Some(']') => {
                self.advance();
                TokenKind::RightBracket
            }
            Some(',') => {
                self.advance();
                TokenKind::Comma
            }

            Some(c) => {
                return Err(Error::lex(line, format!("unexpected character '{}'", c)));
            }
        };

        Ok(Token::new(kind, line, column))
    }

    /// Tokenize entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_command_line() {
        assert_eq!(
            kinds("Spawn(10, 20)"),
            vec![
                TokenKind::Keyword(Keyword::Spawn),
                TokenKind::LeftParen,
                TokenKind::Number(10),
                TokenKind::Comma,
                TokenKind::Number(20),
                TokenKind::RightParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_case_insensitive() {
        assert_eq!(kinds("SPAWN")[0], TokenKind::Keyword(Keyword::Spawn));
        assert_eq!(kinds("drawline")[0], TokenKind::Keyword(Keyword::DrawLine));
        assert_eq!(kinds("GeTaCtUaLx")[0], TokenKind::Keyword(Keyword::GetActualX));
    }

    #[test]
    fn test_two_char_operators() {
        assert_eq!(
            kinds("** == != <= >= <- && ||"),
            vec![
                TokenKind::Power,
                TokenKind::Equal,
                TokenKind::NotEqual,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::Assign,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_label_declaration() {
        // Identifier immediately followed by ':' is a label declaration
        assert_eq!(kinds("loop:")[0], TokenKind::Label("loop".to_string()));
        // With whitespace before the colon it is not a label
        assert!(Lexer::new("loop :").tokenize().is_err());
    }

    #[test]
    fn test_string_with_escapes() {
        assert_eq!(kinds(r#""red""#)[0], TokenKind::Str("red".to_string()));
        assert_eq!(kinds(r#""a\"b""#)[0], TokenKind::Str("a\"b".to_string()));
    }

    #[test]
    fn test_unterminated_string() {
        let err = Lexer::new("\"red").tokenize().unwrap_err();
        assert!(matches!(err, Error::Lex { .. }));
    }

    #[test]
    fn test_comment_consumed_to_end_of_line() {
        assert_eq!(kinds("// nothing here"), vec![TokenKind::Eof]);
        assert_eq!(
            kinds("Fill() // trailing"),
            vec![
                TokenKind::Keyword(Keyword::Fill),
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_bad_character_reports_line() {
        let err = Lexer::new("x <- 1\ny <- $").tokenize().unwrap_err();
        assert_eq!(err.line(), 1);
    }

    #[test]
    fn test_for_line_attributes_line_index() {
        let tokens = Lexer::for_line("Fill()", 7).tokenize().unwrap();
        assert!(tokens.iter().all(|t| t.line == 7));
    }

    #[test]
    fn test_identifier_with_underscore_and_digits() {
        assert_eq!(
            kinds("my_var2")[0],
            TokenKind::Identifier("my_var2".to_string())
        );
    }
}
