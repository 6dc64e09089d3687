//! Pixel Wall-E
//!
//! Command-line host for the Wall-E turtle-graphics language: loads a
//! script, executes it, and renders the finished canvas to the terminal
//! as ANSI half-block art.

mod walle;

use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use walle::Interpreter;

#[derive(Parser)]
#[command(name = "pixel-walle", version, about = "Run a Pixel Wall-E script and render the canvas")]
struct Cli {
    /// Path to the Wall-E script to run
    script: PathBuf,

    /// Canvas dimension in pixels (the canvas is always square)
    #[arg(long, default_value_t = 64)]
    size: usize,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let source = match fs::read_to_string(&cli.script) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: cannot read {}: {}", cli.script.display(), err);
            return ExitCode::FAILURE;
        }
    };
    let program: Vec<String> = source.lines().map(|l| l.to_string()).collect();

    let mut interpreter = Interpreter::new(cli.size);
    match interpreter.execute(&program) {
        Ok(()) => {
            print!("{}", interpreter.with_canvas(|canvas| canvas.to_ansi()));
            let status = interpreter.status();
            println!(
                "turtle at ({}, {}), color {}, brush {}",
                status.x,
                status.y,
                status.color.name(),
                status.brush
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", err);
            if let Some(line) = program.get(err.line()) {
                eprintln!("  {}", line.trim());
            }
            ExitCode::FAILURE
        }
    }
}
