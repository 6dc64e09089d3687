//! Expression evaluation
//!
//! Wall-E expressions are evaluated directly off the token stream by a
//! recursive-descent walk, one precedence level per function:
//!
//!   or > and > not > comparison > add/sub > mul/div/mod > unary minus > power
//!
//! Values are typed (`Int` or `Bool`). Arithmetic and comparisons demand
//! integers; boolean contexts accept integers as truthy (non-zero). Both
//! operands of `&&`/`||` are always evaluated, so a later operand can still
//! raise an error when an earlier one already decided the result.

use crate::walle::canvas::{Canvas, PaletteColor};
use crate::walle::error::{Error, Result};
use crate::walle::lexer::{Keyword, Token, TokenKind};
use std::collections::HashMap;

/// A runtime value. Variables hold whichever type was last assigned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Bool(bool),
}

/// Variable store, keyed by lowercased name.
pub type VarStore = HashMap<String, Value>;

/// Read cursor over a tokenized line. The token slice always ends with
/// `Eof`, so `peek` is total.
pub struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    /// Source line of the token under the cursor.
    pub fn line(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].line
    }

    pub fn advance(&mut self) -> &Token {
        let token = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    /// Consume the next token if it matches `kind`.
    pub fn matches(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, kind: TokenKind, what: &str) -> Result<()> {
        if self.matches(&kind) {
            Ok(())
        } else {
            Err(Error::syntax(self.line(), format!("expected {}", what)))
        }
    }

    pub fn at_end(&self) -> bool {
        *self.peek() == TokenKind::Eof
    }
}

/// Read-only state an expression can see: variables and the canvas the
/// built-in queries inspect.
pub struct EvalCtx<'a> {
    pub vars: &'a VarStore,
    pub canvas: &'a Canvas,
}

impl<'a> EvalCtx<'a> {
    pub fn new(vars: &'a VarStore, canvas: &'a Canvas) -> Self {
        Self { vars, canvas }
    }

    /// Evaluate a full expression to its typed value.
    pub fn eval_value(&self, cur: &mut Cursor) -> Result<Value> {
        self.or_level(cur)
    }

    /// Evaluate an expression in an integer context. A boolean result is a
    /// runtime error; booleans do not silently become 0/1.
    pub fn eval_int(&self, cur: &mut Cursor) -> Result<i64> {
        let line = cur.line();
        self.or_level(cur).and_then(|v| as_int(v, line))
    }

    /// Evaluate an expression in a boolean context. Integers are truthy
    /// when non-zero.
    pub fn eval_bool(&self, cur: &mut Cursor) -> Result<bool> {
        self.or_level(cur).map(as_bool)
    }

    fn or_level(&self, cur: &mut Cursor) -> Result<Value> {
        let mut value = self.and_level(cur)?;
        while cur.matches(&TokenKind::OrOr) || cur.matches(&TokenKind::Keyword(Keyword::Or)) {
            let rhs = self.and_level(cur)?;
            value = Value::Bool(as_bool(value) | as_bool(rhs));
        }
        Ok(value)
    }

    fn and_level(&self, cur: &mut Cursor) -> Result<Value> {
        let mut value = self.not_level(cur)?;
        while cur.matches(&TokenKind::AndAnd) || cur.matches(&TokenKind::Keyword(Keyword::And)) {
            let rhs = self.not_level(cur)?;
            value = Value::Bool(as_bool(value) & as_bool(rhs));
        }
        Ok(value)
    }

    fn not_level(&self, cur: &mut Cursor) -> Result<Value> {
        if cur.matches(&TokenKind::Bang) || cur.matches(&TokenKind::Keyword(Keyword::Not)) {
            let operand = self.not_level(cur)?;
            Ok(Value::Bool(!as_bool(operand)))
        } else {
            self.comparison(cur)
        }
    }

    fn comparison(&self, cur: &mut Cursor) -> Result<Value> {
        let lhs = self.additive(cur)?;

        let op = match cur.peek() {
            TokenKind::Equal
            | TokenKind::NotEqual
            | TokenKind::Less
            | TokenKind::LessEqual
            | TokenKind::Greater
            | TokenKind::GreaterEqual => cur.advance().kind.clone(),
            _ => return Ok(lhs),
        };

        let line = cur.line();
        let rhs = self.additive(cur)?;
        let a = as_int(lhs, line)?;
        let b = as_int(rhs, line)?;

        Ok(Value::Bool(match op {
            TokenKind::Equal => a == b,
            TokenKind::NotEqual => a != b,
            TokenKind::Less => a < b,
            TokenKind::LessEqual => a <= b,
            TokenKind::Greater => a > b,
            _ => a >= b,
        }))
    }

    fn additive(&self, cur: &mut Cursor) -> Result<Value> {
        let line = cur.line();
        let mut value = self.multiplicative(cur)?;

        loop {
            let plus = *cur.peek() == TokenKind::Plus;
            if !plus && *cur.peek() != TokenKind::Minus {
                return Ok(value);
            }
            cur.advance();
            let rhs = self.multiplicative(cur)?;
            let a = as_int(value, line)?;
            let b = as_int(rhs, line)?;
            value = Value::Int(if plus {
                a.saturating_add(b)
            } else {
                a.saturating_sub(b)
            });
        }
    }

    fn multiplicative(&self, cur: &mut Cursor) -> Result<Value> {
        let line = cur.line();
        let mut value = self.unary(cur)?;

        loop {
            let op = match cur.peek() {
                TokenKind::Star | TokenKind::Slash | TokenKind::Percent => {
                    cur.advance().kind.clone()
                }
                _ => return Ok(value),
            };
            let rhs = self.unary(cur)?;
            let a = as_int(value, line)?;
            let b = as_int(rhs, line)?;
            value = Value::Int(match op {
                TokenKind::Star => a.saturating_mul(b),
                TokenKind::Slash => {
                    if b == 0 {
                        return Err(Error::runtime(line, "division by zero"));
                    }
                    a / b
                }
                _ => {
                    if b == 0 {
                        return Err(Error::runtime(line, "modulo by zero"));
                    }
                    a % b
                }
            });
        }
    }

    fn unary(&self, cur: &mut Cursor) -> Result<Value> {
        if *cur.peek() == TokenKind::Minus {
            let line = cur.line();
            cur.advance();
            let operand = self.unary(cur)?;
            Ok(Value::Int(as_int(operand, line)?.saturating_neg()))
        } else {
            self.power(cur)
        }
    }

    fn power(&self, cur: &mut Cursor) -> Result<Value> {
        let line = cur.line();
        let base = self.primary(cur)?;

        if !cur.matches(&TokenKind::Power) {
            return Ok(base);
        }

        // Right-associative: 2 ** 3 ** 2 is 2 ** (3 ** 2)
        let exponent = as_int(self.unary(cur)?, line)?;
        let base = as_int(base, line)?;
        if exponent < 0 {
            return Err(Error::runtime(line, "negative exponent"));
        }
        let exponent = u32::try_from(exponent).unwrap_or(u32::MAX);
        Ok(Value::Int(base.saturating_pow(exponent)))
    }

    fn primary(&self, cur: &mut Cursor) -> Result<Value> {
        let line = cur.line();
        match cur.peek().clone() {
            TokenKind::Number(n) => {
                cur.advance();
                Ok(Value::Int(n))
            }
            TokenKind::Keyword(Keyword::True) => {
                cur.advance();
                Ok(Value::Bool(true))
            }
            TokenKind::Keyword(Keyword::False) => {
                cur.advance();
                Ok(Value::Bool(false))
            }
            TokenKind::Identifier(name) => {
                cur.advance();
                self.vars
                    .get(&name.to_lowercase())
                    .copied()
                    .ok_or_else(|| Error::name(line, format!("undefined variable '{}'", name)))
            }
            TokenKind::LeftParen => {
                cur.advance();
                let value = self.or_level(cur)?;
                cur.expect(TokenKind::RightParen, "')'")?;
                Ok(value)
            }
            TokenKind::Keyword(kw) if kw.is_builtin() => {
                cur.advance();
                self.builtin(cur, kw).map(Value::Int)
            }
            _ => Err(Error::syntax(line, "expected an expression")),
        }
    }

    /// Parse and evaluate a built-in query call. All queries return
    /// integers; the boolean-flavored ones use 1/0.
    fn builtin(&self, cur: &mut Cursor, kw: Keyword) -> Result<i64> {
        cur.expect(TokenKind::LeftParen, "'(' after built-in name")?;

        let result = match kw {
            Keyword::GetActualX => self.canvas.position().0,
            Keyword::GetActualY => self.canvas.position().1,
            Keyword::GetCanvasSize => self.canvas.size(),
            Keyword::IsBrushColor => {
                let color = self.color_arg(cur)?;
                (color == Some(self.canvas.brush_color())) as i64
            }
            Keyword::IsBrushSize => {
                let size = self.eval_int(cur)?;
                (size == self.canvas.brush_size()) as i64
            }
            Keyword::IsCanvasColor => {
                // (color, vertical offset, horizontal offset)
                let color = self.color_arg(cur)?;
                cur.expect(TokenKind::Comma, "','")?;
                let dy = self.eval_int(cur)?;
                cur.expect(TokenKind::Comma, "','")?;
                let dx = self.eval_int(cur)?;
                self.canvas.is_canvas_color(color, dx, dy)
            }
            Keyword::GetColorCount => {
                let color = self.color_arg(cur)?;
                let mut corners = [0i64; 4];
                for corner in corners.iter_mut() {
                    cur.expect(TokenKind::Comma, "','")?;
                    *corner = self.eval_int(cur)?;
                }
                self.canvas
                    .color_count(color, corners[0], corners[1], corners[2], corners[3])
            }
            _ => unreachable!("not a builtin keyword"),
        };

        cur.expect(TokenKind::RightParen, "')' after built-in arguments")?;
        Ok(result)
    }

    /// A color name argument is a string literal. An unknown name is not an
    /// error in a query; it simply matches nothing.
    fn color_arg(&self, cur: &mut Cursor) -> Result<Option<PaletteColor>> {
        let line = cur.line();
        match cur.peek().clone() {
            TokenKind::Str(name) => {
                cur.advance();
                Ok(PaletteColor::parse(&name))
            }
            _ => Err(Error::syntax(line, "expected a color string")),
        }
    }
}

fn as_int(value: Value, line: usize) -> Result<i64> {
    match value {
        Value::Int(n) => Ok(n),
        Value::Bool(_) => Err(Error::runtime(line, "expected an integer value")),
    }
}

fn as_bool(value: Value) -> bool {
    match value {
        Value::Bool(b) => b,
        Value::Int(n) => n != 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walle::lexer::Lexer;

    fn eval_with(src: &str, vars: &VarStore, canvas: &Canvas) -> Result<Value> {
        let tokens = Lexer::new(src).tokenize()?;
        let mut cur = Cursor::new(&tokens);
        let value = EvalCtx::new(vars, canvas).eval_value(&mut cur)?;
        assert!(cur.at_end(), "expression not fully consumed: {}", src);
        Ok(value)
    }

    fn eval(src: &str) -> Result<Value> {
        eval_with(src, &VarStore::new(), &Canvas::new(10))
    }

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(eval("2 + 3 * 4").unwrap(), Value::Int(14));
        assert_eq!(eval("(2 + 3) * 4").unwrap(), Value::Int(20));
        assert_eq!(eval("10 - 2 - 3").unwrap(), Value::Int(5));
        assert_eq!(eval("7 / 2").unwrap(), Value::Int(3));
        assert_eq!(eval("7 % 3").unwrap(), Value::Int(1));
    }

    #[test]
    fn test_power_binds_tightest_and_right_assoc() {
        assert_eq!(eval("2 ** 3 ** 2").unwrap(), Value::Int(512));
        assert_eq!(eval("2 * 3 ** 2").unwrap(), Value::Int(18));
        assert_eq!(eval("-2 ** 2").unwrap(), Value::Int(-4));
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(eval("-5 + 3").unwrap(), Value::Int(-2));
        assert_eq!(eval("--5").unwrap(), Value::Int(5));
    }

    #[test]
    fn test_division_and_modulo_by_zero() {
        assert!(matches!(eval("1 / 0"), Err(Error::Runtime { .. })));
        assert!(matches!(eval("1 % 0"), Err(Error::Runtime { .. })));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval("3 < 5").unwrap(), Value::Bool(true));
        assert_eq!(eval("3 >= 5").unwrap(), Value::Bool(false));
        assert_eq!(eval("2 + 2 == 4").unwrap(), Value::Bool(true));
        assert_eq!(eval("1 != 1").unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_boolean_operators_and_truthiness() {
        assert_eq!(eval("true && false").unwrap(), Value::Bool(false));
        assert_eq!(eval("true || false").unwrap(), Value::Bool(true));
        assert_eq!(eval("!(3 < 5)").unwrap(), Value::Bool(false));
        assert_eq!(eval("not false and true").unwrap(), Value::Bool(true));
        // Integers are truthy when non-zero
        assert_eq!(eval("5 && 1").unwrap(), Value::Bool(true));
        assert_eq!(eval("0 || 0").unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_no_short_circuit() {
        // Both operands always run, so the division still fails
        assert!(matches!(
            eval("false && (1 / 0 == 0)"),
            Err(Error::Runtime { .. })
        ));
        assert!(matches!(
            eval("true || (1 / 0 == 0)"),
            Err(Error::Runtime { .. })
        ));
    }

    #[test]
    fn test_bool_in_integer_context_is_an_error() {
        assert!(matches!(eval("true + 1"), Err(Error::Runtime { .. })));
        assert!(matches!(eval("(1 < 2) * 3"), Err(Error::Runtime { .. })));
    }

    #[test]
    fn test_variables() {
        let mut vars = VarStore::new();
        vars.insert("n".to_string(), Value::Int(7));
        vars.insert("flag".to_string(), Value::Bool(true));
        let canvas = Canvas::new(10);

        assert_eq!(eval_with("n * 2", &vars, &canvas).unwrap(), Value::Int(14));
        // Lookup is case-insensitive
        assert_eq!(eval_with("N + 1", &vars, &canvas).unwrap(), Value::Int(8));
        assert_eq!(
            eval_with("flag && true", &vars, &canvas).unwrap(),
            Value::Bool(true)
        );
        assert!(matches!(
            eval_with("missing + 1", &vars, &canvas),
            Err(Error::Name { .. })
        ));
    }

    #[test]
    fn test_position_and_size_queries() {
        let mut canvas = Canvas::new(32);
        canvas.set_position(4, 9);
        let vars = VarStore::new();

        assert_eq!(
            eval_with("GetActualX() + GetActualY()", &vars, &canvas).unwrap(),
            Value::Int(13)
        );
        assert_eq!(
            eval_with("GetCanvasSize()", &vars, &canvas).unwrap(),
            Value::Int(32)
        );
    }

    #[test]
    fn test_brush_queries() {
        let mut canvas = Canvas::new(10);
        canvas.set_color(PaletteColor::Red);
        canvas.set_brush_size(3);
        let vars = VarStore::new();

        assert_eq!(
            eval_with("IsBrushColor(\"red\")", &vars, &canvas).unwrap(),
            Value::Int(1)
        );
        assert_eq!(
            eval_with("IsBrushColor(\"blue\")", &vars, &canvas).unwrap(),
            Value::Int(0)
        );
        // Unknown color names match nothing rather than erroring
        assert_eq!(
            eval_with("IsBrushColor(\"mauve\")", &vars, &canvas).unwrap(),
            Value::Int(0)
        );
        assert_eq!(
            eval_with("IsBrushSize(1 + 2)", &vars, &canvas).unwrap(),
            Value::Int(1)
        );
    }

    #[test]
    fn test_canvas_color_query_uses_vertical_then_horizontal() {
        let mut canvas = Canvas::new(10);
        canvas.set_color(PaletteColor::Blue);
        canvas.set_position(5, 5);
        canvas.draw_line(0, 1, 1); // paints (5,5)-(5,6), turtle at (5,6)
        let vars = VarStore::new();

        assert_eq!(
            eval_with("IsCanvasColor(\"blue\", -1, 0)", &vars, &canvas).unwrap(),
            Value::Int(1)
        );
        assert_eq!(
            eval_with("IsCanvasColor(\"blue\", 0, 1)", &vars, &canvas).unwrap(),
            Value::Int(0)
        );
        // Off-canvas offsets are a 0 result, not an error
        assert_eq!(
            eval_with("IsCanvasColor(\"white\", 100, 100)", &vars, &canvas).unwrap(),
            Value::Int(0)
        );
    }

    #[test]
    fn test_color_count_query() {
        let mut canvas = Canvas::new(10);
        canvas.set_color(PaletteColor::Green);
        canvas.draw_line(1, 0, 4); // paints (0,0)..(4,0)
        let vars = VarStore::new();

        assert_eq!(
            eval_with("GetColorCount(\"green\", 0, 0, 9, 9)", &vars, &canvas).unwrap(),
            Value::Int(5)
        );
        assert_eq!(
            eval_with("GetColorCount(\"green\", 9, 9, 0, 0)", &vars, &canvas).unwrap(),
            Value::Int(5)
        );
    }

    #[test]
    fn test_builtin_argument_errors() {
        assert!(matches!(
            eval("IsBrushColor(red)"),
            Err(Error::Syntax { .. })
        ));
        assert!(matches!(eval("GetActualX"), Err(Error::Syntax { .. })));
        assert!(matches!(
            eval("IsCanvasColor(\"red\", 1)"),
            Err(Error::Syntax { .. })
        ));
    }
}
