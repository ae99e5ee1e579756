use std::fs;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use basil_lang::{Host, Session, Value, ValueKind};
use clap::Parser;

/// Basil is a small keyword-driven scripting language. With no arguments it
/// starts an interactive shell; give it a script path to run a file.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Script file to execute. Omit to start the shell.
    script: Option<String>,

    /// Evaluate an inline snippet and exit.
    #[arg(short, long)]
    eval: Option<String>,
}

// ─── Host ─────────────────────────────────────────────────────────────────────

/// The stdio implementation of the interpreter's collaborator contracts.
struct StdHost;

impl Host for StdHost {
    fn print(&mut self, text: &str) {
        println!("{text}");
    }

    fn read_line(&mut self) -> String {
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line).is_err() {
            return String::new();
        }
        line.trim_end_matches(['\n', '\r']).to_string()
    }

    fn read_int(&mut self) -> i64 {
        loop {
            let text = self.read_line();
            match text.trim().parse() {
                Ok(n) => return n,
                Err(_) => println!("'{text}' must be an integer. Try again!"),
            }
        }
    }

    fn clear(&mut self) {
        print!("\x1b[2J\x1b[H");
        let _ = io::stdout().flush();
    }

    fn read_file(&mut self, path: &str) -> Result<String, String> {
        fs::read_to_string(path).map_err(|e| e.to_string())
    }
}

// ─── Entry ────────────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let args = Args::parse();
    let mut session = Session::new(Box::new(StdHost));

    if let Some(code) = args.eval {
        return run_source(&mut session, "<eval>", &code);
    }
    if let Some(path) = args.script {
        let source = match fs::read_to_string(&path) {
            Ok(source) => source,
            Err(e) => {
                eprintln!("Failed to read '{path}': {e}");
                return ExitCode::FAILURE;
            }
        };
        return run_source(&mut session, &path, &source);
    }

    repl(&mut session)
}

fn run_source(session: &mut Session, name: &str, source: &str) -> ExitCode {
    match session.run(name, source) {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}

fn repl(session: &mut Session) -> ExitCode {
    let stdin = io::stdin();
    loop {
        print!("basil > ");
        if io::stdout().flush().is_err() {
            return ExitCode::SUCCESS;
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => return ExitCode::SUCCESS, // EOF
            Ok(_) => {}
            Err(_) => return ExitCode::SUCCESS,
        }
        if line.trim().is_empty() {
            continue;
        }

        match session.run("<stdin>", &line) {
            Ok(result) => echo(&result),
            Err(error) => eprintln!("{error}"),
        }
    }
}

/// A line holding a single statement echoes that statement's value; a
/// multi-statement line echoes the whole result list.
fn echo(result: &Value) {
    if let ValueKind::List(items) = &result.kind {
        let items = items.borrow();
        if items.len() == 1 {
            println!("{}", items[0].repr());
            return;
        }
    }
    println!("{}", result.repr());
}
