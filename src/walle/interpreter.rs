//! Wall-E interpreter with generator-based execution
//!
//! The program is a list of source lines addressed by a program counter.
//! Each step lexes and executes the line under the counter, which either
//! advances to the next line or jumps (taken `GoTo`, block skips, loop
//! back-edges). Execution runs inside a generator that yields periodically
//! so a host can keep its UI responsive and request a stop between
//! statements.

use crate::walle::canvas::{Canvas, PaletteColor};
use crate::walle::error::{Error, Result};
use crate::walle::expr::{Cursor, EvalCtx, Value, VarStore};
use crate::walle::labels::LabelTable;
use crate::walle::lexer::{Keyword, Lexer, TokenKind};
use genawaiter::rc::{Co, Gen};
use genawaiter::GeneratorState;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

/// Where the program counter goes after a line executes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineResult {
    /// Fall through to the next line.
    Advance,
    /// Transfer control to the given 0-based line index.
    Jump(usize),
}

/// Outcome of driving the stored generator one slice further.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionResult {
    /// The program ran to completion.
    Completed,
    /// The program halted because a stop was requested.
    Stopped,
    /// The generator yielded; call `continue_execution` again.
    Running,
}

/// Turtle state snapshot for hosts and status lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TurtleStatus {
    pub x: i64,
    pub y: i64,
    pub color: PaletteColor,
    pub brush: i64,
}

/// Interpreter state shared between the interpreter handle and the
/// execution generator.
pub struct InterpreterState {
    vars: VarStore,
    labels: LabelTable,
    canvas: Canvas,
    spawned: bool,
    current_line: usize,
    running: bool,
    stop_requested: bool,
    last_yield_time: Instant,
    error: Option<Error>,
}

impl InterpreterState {
    fn new(canvas_size: usize) -> Self {
        Self {
            vars: VarStore::new(),
            labels: LabelTable::default(),
            canvas: Canvas::new(canvas_size),
            spawned: false,
            current_line: 0,
            running: false,
            stop_requested: false,
            last_yield_time: Instant::now(),
            error: None,
        }
    }

    /// Reset per-run state. The canvas is kept; successive runs draw over
    /// the previous picture unless the host clears it.
    fn reset(&mut self) {
        self.vars.clear();
        self.spawned = false;
        self.current_line = 0;
        self.running = false;
        self.stop_requested = false;
        self.error = None;
        self.last_yield_time = Instant::now();
    }

    fn should_yield_for_ui(&self) -> bool {
        self.last_yield_time.elapsed().as_millis() >= 16
    }
}

/// Trait for resumable generators
trait Resumable {
    fn resume_gen(&mut self) -> Option<usize>;
}

/// Wrapper to make Gen implement our Resumable trait
struct GenWrapper<F: std::future::Future<Output = ()>> {
    gen: Gen<usize, (), F>,
}

impl<F: std::future::Future<Output = ()>> Resumable for GenWrapper<F> {
    fn resume_gen(&mut self) -> Option<usize> {
        match self.gen.resume() {
            GeneratorState::Yielded(line) => Some(line),
            GeneratorState::Complete(()) => None,
        }
    }
}

type BoxedGenerator = Box<dyn Resumable>;

/// The Wall-E interpreter.
pub struct Interpreter {
    state: Rc<RefCell<InterpreterState>>,
    /// Stored generator for continuation after yield
    generator: Option<BoxedGenerator>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Interpreter {
    pub fn new(canvas_size: usize) -> Self {
        Self {
            state: Rc::new(RefCell::new(InterpreterState::new(canvas_size))),
            generator: None,
        }
    }

    /// Rebuild the label table for the given program. Runs as a pre-pass
    /// before execution so forward jumps resolve; also usable on its own
    /// after source edits invalidate recorded indices.
    pub fn reset_labels(&mut self, program: &[String]) -> Result<()> {
        let labels = LabelTable::build(program)?;
        self.state.borrow_mut().labels = labels;
        Ok(())
    }

    fn reset_for_run(&mut self, program: &[String]) -> Result<()> {
        self.state.borrow_mut().reset();
        self.reset_labels(program)?;
        self.state.borrow_mut().running = true;
        Ok(())
    }

    /// Execute a whole program synchronously, consuming all yields.
    pub fn execute(&mut self, program: &[String]) -> Result<()> {
        self.reset_for_run(program)?;

        let gen = create_execution_generator(self.state.clone(), program.to_vec());
        let mut wrapper = GenWrapper { gen };
        while wrapper.resume_gen().is_some() {}

        let error = self.state.borrow().error.clone();
        match error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Start a resumable execution: runs until the first periodic yield or
    /// completion. Drive it onward with `continue_execution`.
    pub fn begin_execution(&mut self, program: &[String]) -> Result<ExecutionResult> {
        self.reset_for_run(program)?;

        let gen = create_execution_generator(self.state.clone(), program.to_vec());
        self.generator = Some(Box::new(GenWrapper { gen }));
        self.continue_execution()
    }

    /// Continue a previously started execution until the next yield or
    /// completion.
    pub fn continue_execution(&mut self) -> Result<ExecutionResult> {
        match self.generator.as_mut().and_then(|g| g.resume_gen()) {
            Some(_line) => Ok(ExecutionResult::Running),
            None => {
                self.generator = None;
                let (error, stopped) = {
                    let mut s = self.state.borrow_mut();
                    s.running = false;
                    (s.error.clone(), s.stop_requested)
                };
                match error {
                    Some(err) => Err(err),
                    None if stopped => Ok(ExecutionResult::Stopped),
                    None => Ok(ExecutionResult::Completed),
                }
            }
        }
    }

    /// Ask a running program to halt at the next statement boundary.
    pub fn request_stop(&mut self) {
        self.state.borrow_mut().stop_requested = true;
    }

    /// Execute a single line against the current state. Used by hosts that
    /// step manually; `execute` drives this same path through the generator.
    pub fn execute_line(&mut self, program: &[String], pos: usize) -> Result<LineResult> {
        let mut state = self.state.borrow_mut();
        execute_line(&mut state, program, pos)
    }

    pub fn is_running(&self) -> bool {
        self.state.borrow().running
    }

    /// 0-based index of the line under (or last under) the program counter.
    pub fn current_line(&self) -> usize {
        self.state.borrow().current_line
    }

    pub fn status(&self) -> TurtleStatus {
        let s = self.state.borrow();
        let (x, y) = s.canvas.position();
        TurtleStatus {
            x,
            y,
            color: s.canvas.brush_color(),
            brush: s.canvas.brush_size(),
        }
    }

    pub fn var(&self, name: &str) -> Option<Value> {
        self.state.borrow().vars.get(&name.to_lowercase()).copied()
    }

    pub fn with_canvas<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Canvas) -> R,
    {
        f(&self.state.borrow().canvas)
    }

    pub fn resize_canvas(&mut self, size: usize) {
        self.state.borrow_mut().canvas.resize(size);
    }

    pub fn clear_canvas(&mut self) {
        self.state.borrow_mut().canvas.clear();
    }
}

/// Create a generator for program execution (standalone to avoid borrow
/// issues with the interpreter handle).
fn create_execution_generator(
    state: Rc<RefCell<InterpreterState>>,
    program: Vec<String>,
) -> Gen<usize, (), impl std::future::Future<Output = ()>> {
    Gen::new(|co: Co<usize>| async move {
        run_program(&co, &state, &program).await;
        state.borrow_mut().running = false;
    })
}

/// Main program execution loop
async fn run_program(co: &Co<usize>, state: &Rc<RefCell<InterpreterState>>, program: &[String]) {
    let mut pos = 0;

    while pos < program.len() {
        if state.borrow().stop_requested {
            return;
        }

        state.borrow_mut().current_line = pos;

        let result = {
            let mut s = state.borrow_mut();
            execute_line(&mut s, program, pos)
        };

        match result {
            Ok(LineResult::Advance) => pos += 1,
            Ok(LineResult::Jump(target)) => pos = target,
            Err(err) => {
                state.borrow_mut().error = Some(err);
                return;
            }
        }

        // Periodic UI yield
        if state.borrow().should_yield_for_ui() {
            state.borrow_mut().last_yield_time = Instant::now();
            co.yield_(pos).await;
        }
    }
}

/// Lex and execute one source line.
fn execute_line(state: &mut InterpreterState, program: &[String], pos: usize) -> Result<LineResult> {
    let trimmed = program[pos].trim();
    if trimmed.is_empty() || trimmed.starts_with("//") {
        return Ok(LineResult::Advance);
    }

    let tokens = Lexer::for_line(trimmed, pos).tokenize()?;
    let mut cur = Cursor::new(&tokens);

    // Only blank lines, comments, and label declarations may precede
    // Spawn; every actual statement consults the gate before running.
    let trivial = matches!(cur.peek(), TokenKind::Eof | TokenKind::Label(_));
    if !state.spawned && !trivial && *cur.peek() != TokenKind::Keyword(Keyword::Spawn) {
        return Err(Error::runtime(pos, "program must start with Spawn"));
    }

    let result = match cur.peek().clone() {
        TokenKind::Eof => LineResult::Advance,

        TokenKind::Label(_) => {
            cur.advance();
            if !cur.at_end() {
                return Err(Error::syntax(pos, "a label must stand alone on its line"));
            }
            LineResult::Advance
        }

        TokenKind::Identifier(name) => {
            cur.advance();
            cur.expect(TokenKind::Assign, "'<-' in assignment")?;
            if !name.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
                return Err(Error::syntax(
                    pos,
                    format!("variable name '{}' must start with a letter", name),
                ));
            }
            let value = EvalCtx::new(&state.vars, &state.canvas).eval_value(&mut cur)?;
            state.vars.insert(name.to_lowercase(), value);
            LineResult::Advance
        }

        TokenKind::Keyword(kw) if kw.is_builtin() => {
            // A bare query call is legal; its value is discarded.
            EvalCtx::new(&state.vars, &state.canvas).eval_value(&mut cur)?;
            LineResult::Advance
        }

        TokenKind::Keyword(kw) => {
            cur.advance();
            execute_command(state, program, pos, kw, &mut cur)?
        }

        _ => return Err(Error::syntax(pos, "unrecognized statement")),
    };

    if !cur.at_end() {
        return Err(Error::syntax(pos, "unexpected tokens after statement"));
    }

    Ok(result)
}

/// Execute a keyword statement whose keyword has already been consumed.
fn execute_command(
    state: &mut InterpreterState,
    program: &[String],
    pos: usize,
    kw: Keyword,
    cur: &mut Cursor,
) -> Result<LineResult> {
    match kw {
        Keyword::Spawn => {
            if state.spawned {
                return Err(Error::runtime(pos, "Spawn may only appear once"));
            }
            let [x, y] = int_args(state, cur)?;
            if !state.canvas.in_bounds(x, y) {
                return Err(Error::runtime(
                    pos,
                    format!("spawn position ({}, {}) is outside the canvas", x, y),
                ));
            }
            state.canvas.set_position(x, y);
            state.spawned = true;
            Ok(LineResult::Advance)
        }

        Keyword::Color => {
            cur.expect(TokenKind::LeftParen, "'('")?;
            let name = match cur.peek().clone() {
                TokenKind::Str(name) => {
                    cur.advance();
                    name
                }
                _ => return Err(Error::syntax(pos, "expected a color string")),
            };
            cur.expect(TokenKind::RightParen, "')'")?;
            let color = PaletteColor::parse(&name)
                .ok_or_else(|| Error::name(pos, format!("unknown color '{}'", name)))?;
            state.canvas.set_color(color);
            Ok(LineResult::Advance)
        }

        Keyword::Size => {
            let [size] = int_args(state, cur)?;
            state.canvas.set_brush_size(size);
            Ok(LineResult::Advance)
        }

        Keyword::DrawLine => {
            let [dx, dy, dist] = int_args(state, cur)?;
            state.canvas.draw_line(dx, dy, dist);
            Ok(LineResult::Advance)
        }

        Keyword::DrawCircle => {
            let [dx, dy, radius] = int_args(state, cur)?;
            state.canvas.draw_circle(dx, dy, radius);
            Ok(LineResult::Advance)
        }

        Keyword::DrawRectangle => {
            let [dx, dy, dist, w, h] = int_args(state, cur)?;
            state.canvas.draw_rectangle(dx, dy, dist, w, h);
            Ok(LineResult::Advance)
        }

        Keyword::Fill => {
            cur.expect(TokenKind::LeftParen, "'('")?;
            cur.expect(TokenKind::RightParen, "')'")?;
            state.canvas.fill();
            Ok(LineResult::Advance)
        }

        Keyword::GoTo => {
            cur.expect(TokenKind::LeftBracket, "'[' before label name")?;
            let name = match cur.peek().clone() {
                TokenKind::Identifier(name) => {
                    cur.advance();
                    name
                }
                _ => return Err(Error::syntax(pos, "expected a label name")),
            };
            cur.expect(TokenKind::RightBracket, "']' after label name")?;

            // The condition is optional; a bare GoTo is unconditional.
            let taken = if cur.matches(&TokenKind::LeftParen) {
                let cond = EvalCtx::new(&state.vars, &state.canvas).eval_bool(cur)?;
                cur.expect(TokenKind::RightParen, "')' after condition")?;
                cond
            } else {
                true
            };

            if !taken {
                return Ok(LineResult::Advance);
            }
            // The label is only resolved on a taken jump, so an undefined
            // label behind a false condition never fails.
            match state.labels.lookup(&name) {
                Some(target) => Ok(LineResult::Jump(target)),
                None => Err(Error::name(pos, format!("undefined label '{}'", name))),
            }
        }

        Keyword::If => {
            cur.expect(TokenKind::LeftParen, "'(' after If")?;
            let cond = EvalCtx::new(&state.vars, &state.canvas).eval_bool(cur)?;
            cur.expect(TokenKind::RightParen, "')' after condition")?;
            cur.matches(&TokenKind::Keyword(Keyword::Then));
            if cond {
                Ok(LineResult::Advance)
            } else {
                skip_if_branch(program, pos, true).map(LineResult::Jump)
            }
        }

        // An Else reached in normal flow ends the taken branch.
        Keyword::Else => skip_if_branch(program, pos, false).map(LineResult::Jump),

        Keyword::EndIf => Ok(LineResult::Advance),

        Keyword::While => {
            cur.expect(TokenKind::LeftParen, "'(' after While")?;
            let cond = EvalCtx::new(&state.vars, &state.canvas).eval_bool(cur)?;
            cur.expect(TokenKind::RightParen, "')' after condition")?;
            cur.matches(&TokenKind::Keyword(Keyword::Do));
            if cond {
                Ok(LineResult::Advance)
            } else {
                skip_while_body(program, pos).map(LineResult::Jump)
            }
        }

        // Jump back to the While header so the condition re-evaluates.
        Keyword::EndWhile => find_while_start(program, pos).map(LineResult::Jump),

        _ => Err(Error::syntax(pos, "unrecognized statement")),
    }
}

/// Parse `(a, b, ...)` with a fixed argument count, evaluating each to an
/// integer.
fn int_args<const N: usize>(state: &InterpreterState, cur: &mut Cursor) -> Result<[i64; N]> {
    let ctx = EvalCtx::new(&state.vars, &state.canvas);
    cur.expect(TokenKind::LeftParen, "'('")?;
    let mut args = [0i64; N];
    for (i, arg) in args.iter_mut().enumerate() {
        if i > 0 {
            cur.expect(TokenKind::Comma, "','")?;
        }
        *arg = ctx.eval_int(cur)?;
    }
    cur.expect(TokenKind::RightParen, "')'")?;
    Ok(args)
}

/// First keyword on a line, for block-structure scans. Lines that fail to
/// lex have no keyword; they error when executed, not when skipped over.
fn leading_keyword(line: &str) -> Option<Keyword> {
    let mut lexer = Lexer::new(line.trim());
    match lexer.next_token() {
        Ok(token) => match token.kind {
            TokenKind::Keyword(kw) => Some(kw),
            _ => None,
        },
        Err(_) => None,
    }
}

/// Find where a false `If` (or a reached `Else`) transfers control: the
/// line after the matching `Else` when `stop_at_else` is set, otherwise the
/// line after the matching `EndIf`. Nested blocks are depth-counted.
fn skip_if_branch(program: &[String], pos: usize, stop_at_else: bool) -> Result<usize> {
    let mut depth = 0usize;
    for i in (pos + 1)..program.len() {
        match leading_keyword(&program[i]) {
            Some(Keyword::If) => depth += 1,
            Some(Keyword::Else) if stop_at_else && depth == 0 => return Ok(i + 1),
            Some(Keyword::EndIf) => {
                if depth == 0 {
                    return Ok(i + 1);
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    let what = if stop_at_else { "If" } else { "Else" };
    Err(Error::syntax(pos, format!("{} without matching EndIf", what)))
}

/// Find the line after the `EndWhile` matching the `While` at `pos`.
fn skip_while_body(program: &[String], pos: usize) -> Result<usize> {
    let mut depth = 0usize;
    for i in (pos + 1)..program.len() {
        match leading_keyword(&program[i]) {
            Some(Keyword::While) => depth += 1,
            Some(Keyword::EndWhile) => {
                if depth == 0 {
                    return Ok(i + 1);
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    Err(Error::syntax(pos, "While without matching EndWhile"))
}

/// Find the `While` matching the `EndWhile` at `pos`.
fn find_while_start(program: &[String], pos: usize) -> Result<usize> {
    let mut depth = 0usize;
    for i in (0..pos).rev() {
        match leading_keyword(&program[i]) {
            Some(Keyword::EndWhile) => depth += 1,
            Some(Keyword::While) => {
                if depth == 0 {
                    return Ok(i);
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    Err(Error::syntax(pos, "EndWhile without matching While"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(src: &str) -> Vec<String> {
        src.lines().map(|l| l.to_string()).collect()
    }

    fn run(src: &str) -> (Interpreter, Result<()>) {
        let mut interp = Interpreter::new(16);
        let result = interp.execute(&lines(src));
        (interp, result)
    }

    #[test]
    fn test_empty_program_completes() {
        let (_, result) = run("");
        assert!(result.is_ok());
    }

    #[test]
    fn test_any_command_before_spawn_fails() {
        // The gate covers every statement, not just the drawing commands
        let (_, result) = run("DrawLine(1, 0, 3)");
        assert!(matches!(result, Err(Error::Runtime { line: 0, .. })));
        let (_, result) = run("x <- 1\nSpawn(0, 0)");
        assert!(matches!(result, Err(Error::Runtime { line: 0, .. })));
        let (_, result) = run("GoTo [end]\nend:");
        assert!(matches!(result, Err(Error::Runtime { line: 0, .. })));
        let (_, result) = run("GetCanvasSize()");
        assert!(matches!(result, Err(Error::Runtime { line: 0, .. })));
        let (_, result) = run("If (true) Then\nSpawn(0, 0)\nEndIf");
        assert!(matches!(result, Err(Error::Runtime { line: 0, .. })));
    }

    #[test]
    fn test_labels_and_comments_may_precede_spawn() {
        let (_, result) = run("// header\n\nstart:\nSpawn(1, 1)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_spawn_twice_fails() {
        let (_, result) = run("Spawn(0, 0)\nSpawn(1, 1)");
        assert!(matches!(result, Err(Error::Runtime { line: 1, .. })));
    }

    #[test]
    fn test_spawn_out_of_bounds_fails() {
        let (_, result) = run("Spawn(16, 0)");
        assert!(matches!(result, Err(Error::Runtime { line: 0, .. })));
        let (_, result) = run("Spawn(-1, 3)");
        assert!(result.is_err());
    }

    #[test]
    fn test_assignment_and_lookup() {
        let (interp, result) = run("Spawn(0, 0)\nx <- 2 + 3\ny <- x * x");
        assert!(result.is_ok());
        assert_eq!(interp.var("y"), Some(Value::Int(25)));
        // Variable names are case-insensitive
        assert_eq!(interp.var("Y"), Some(Value::Int(25)));
    }

    #[test]
    fn test_assignment_retypes_variable() {
        let (interp, result) = run("Spawn(0, 0)\nv <- 5\nv <- 3 > 1");
        assert!(result.is_ok());
        assert_eq!(interp.var("v"), Some(Value::Bool(true)));
    }

    #[test]
    fn test_variable_name_must_start_with_letter() {
        let (_, result) = run("Spawn(0, 0)\n_x <- 1");
        assert!(matches!(result, Err(Error::Syntax { line: 1, .. })));
    }

    #[test]
    fn test_goto_loop_counts_to_five() {
        let (interp, result) = run("Spawn(0, 0)\ni <- 0\nloop:\ni <- i + 1\nGoTo [loop] (i < 5)");
        assert!(result.is_ok());
        assert_eq!(interp.var("i"), Some(Value::Int(5)));
    }

    #[test]
    fn test_goto_without_condition_is_unconditional() {
        let (interp, result) = run("Spawn(0, 0)\nx <- 1\nGoTo [end]\nx <- 2\nend:");
        assert!(result.is_ok());
        assert_eq!(interp.var("x"), Some(Value::Int(1)));
    }

    #[test]
    fn test_undefined_label_only_fails_when_taken() {
        let (_, result) = run("Spawn(0, 0)\nGoTo [nowhere] (1 > 2)");
        assert!(result.is_ok());
        let (_, result) = run("Spawn(0, 0)\nGoTo [nowhere] (2 > 1)");
        assert!(matches!(result, Err(Error::Name { line: 1, .. })));
    }

    #[test]
    fn test_if_else_branches() {
        let (interp, result) =
            run("Spawn(0, 0)\nx <- 10\nIf (x > 5) Then\ny <- 1\nElse\ny <- 2\nEndIf");
        assert!(result.is_ok());
        assert_eq!(interp.var("y"), Some(Value::Int(1)));

        let (interp, result) =
            run("Spawn(0, 0)\nx <- 1\nIf (x > 5) Then\ny <- 1\nElse\ny <- 2\nEndIf");
        assert!(result.is_ok());
        assert_eq!(interp.var("y"), Some(Value::Int(2)));
    }

    #[test]
    fn test_nested_if_depth_counting() {
        let src = "Spawn(0, 0)\nIf (false) Then\nIf (true) Then\ny <- 1\nEndIf\nElse\ny <- 2\nEndIf";
        let (interp, result) = run(src);
        assert!(result.is_ok());
        assert_eq!(interp.var("y"), Some(Value::Int(2)));
    }

    #[test]
    fn test_if_without_endif_fails() {
        let (_, result) = run("Spawn(0, 0)\nIf (false) Then\nx <- 1");
        assert!(matches!(result, Err(Error::Syntax { line: 1, .. })));
    }

    #[test]
    fn test_while_loop() {
        let (interp, result) = run("Spawn(0, 0)\nn <- 0\nWhile (n < 4) Do\nn <- n + 1\nEndWhile");
        assert!(result.is_ok());
        assert_eq!(interp.var("n"), Some(Value::Int(4)));
    }

    #[test]
    fn test_while_false_skips_body() {
        let (interp, result) =
            run("Spawn(0, 0)\nn <- 9\nWhile (n < 4) Do\nn <- 0\nEndWhile\nm <- n");
        assert!(result.is_ok());
        assert_eq!(interp.var("m"), Some(Value::Int(9)));
    }

    #[test]
    fn test_nested_while_loops() {
        let src = "\
Spawn(0, 0)
total <- 0
i <- 0
While (i < 3) Do
j <- 0
While (j < 2) Do
total <- total + 1
j <- j + 1
EndWhile
i <- i + 1
EndWhile";
        let (interp, result) = run(src);
        assert!(result.is_ok());
        assert_eq!(interp.var("total"), Some(Value::Int(6)));
    }

    #[test]
    fn test_drawing_scenario() {
        let src = "\
Spawn(0, 0)
Color(\"red\")
Size(3)
DrawLine(1, 0, 5)";
        let (interp, result) = run(src);
        assert!(result.is_ok());

        let status = interp.status();
        assert_eq!((status.x, status.y), (5, 0));
        assert_eq!(status.color, PaletteColor::Red);
        assert_eq!(status.brush, 3);

        interp.with_canvas(|canvas| {
            assert_eq!(canvas.pixel(2, 0), Some(PaletteColor::Red));
            assert_eq!(canvas.pixel(2, 1), Some(PaletteColor::Red));
            assert_eq!(canvas.pixel(2, 2), Some(PaletteColor::White));
        });
    }

    #[test]
    fn test_unknown_color_is_a_name_error() {
        let (_, result) = run("Spawn(0, 0)\nColor(\"mauve\")");
        assert!(matches!(result, Err(Error::Name { line: 1, .. })));
    }

    #[test]
    fn test_steep_direction_draws_clamped_line() {
        // Direction components are not restricted to -1..=1; the endpoint
        // is computed and clamped like any other
        let (interp, result) = run("Spawn(0, 0)\nColor(\"red\")\nDrawLine(2, 0, 3)");
        assert!(result.is_ok());
        assert_eq!((interp.status().x, interp.status().y), (6, 0));
        interp.with_canvas(|canvas| {
            assert_eq!(canvas.pixel(6, 0), Some(PaletteColor::Red));
        });
    }

    #[test]
    fn test_bare_query_call_is_a_statement() {
        let (_, result) = run("Spawn(3, 3)\nGetActualX()");
        assert!(result.is_ok());
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        let (_, result) = run("Spawn(0, 0) 5");
        assert!(matches!(result, Err(Error::Syntax { line: 0, .. })));
    }

    #[test]
    fn test_comments_and_blank_lines_skipped() {
        let (interp, result) = run("// header\n\nSpawn(0, 0)\nx <- 1\n// tail");
        assert!(result.is_ok());
        assert_eq!(interp.var("x"), Some(Value::Int(1)));
    }

    #[test]
    fn test_error_reports_offending_line() {
        let (_, result) = run("Spawn(0, 0)\nx <- 1\ny <- x / 0");
        let err = result.unwrap_err();
        assert_eq!(err.line(), 2);
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_queries_observe_interpreter_state() {
        let src = "\
Spawn(2, 3)
Color(\"blue\")
inside <- IsCanvasColor(\"white\", 0, 0)
wide <- GetCanvasSize()";
        let (interp, result) = run(src);
        assert!(result.is_ok());
        assert_eq!(interp.var("inside"), Some(Value::Int(1)));
        assert_eq!(interp.var("wide"), Some(Value::Int(16)));
    }

    #[test]
    fn test_stop_request_halts_infinite_loop() {
        let mut interp = Interpreter::new(8);
        let program = lines("Spawn(0, 0)\nloop:\nGoTo [loop]");

        let mut result = interp.begin_execution(&program).unwrap();
        assert_eq!(result, ExecutionResult::Running);

        interp.request_stop();
        while result == ExecutionResult::Running {
            result = interp.continue_execution().unwrap();
        }
        assert_eq!(result, ExecutionResult::Stopped);
    }

    #[test]
    fn test_canvas_persists_across_runs() {
        let mut interp = Interpreter::new(8);
        interp
            .execute(&lines("Spawn(0, 0)\nColor(\"red\")\nDrawLine(1, 0, 2)"))
            .unwrap();
        interp.execute(&lines("Spawn(7, 7)")).unwrap();
        interp.with_canvas(|canvas| {
            assert_eq!(canvas.pixel(1, 0), Some(PaletteColor::Red));
        });
    }

    #[test]
    fn test_clear_canvas() {
        let mut interp = Interpreter::new(8);
        interp
            .execute(&lines("Spawn(0, 0)\nColor(\"red\")\nDrawLine(1, 0, 2)"))
            .unwrap();
        interp.clear_canvas();
        interp.with_canvas(|canvas| {
            assert_eq!(canvas.pixel(1, 0), Some(PaletteColor::White));
        });
    }
}
