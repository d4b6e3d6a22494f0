use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use rox as lox;

use lox::ast::NodeIds;
use lox::ast_printer::AstPrinter;
use lox::error::Diagnostic;
use lox::parser::Parser;
use lox::scanner::Scanner;
use lox::token::Token;
use lox::{Lox, RunReport};

const EXIT_STATIC_ERROR: u8 = 65;
const EXIT_RUNTIME_ERROR: u8 = 70;
const EXIT_INTERNAL_ERROR: u8 = 70;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Option<Commands>,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print the tokens as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file and prints the syntax tree of each statement
    Parse { filename: PathBuf },

    /// Runs input from a file as a Lox program
    Run { filename: PathBuf },

    /// Starts an interactive session (the default)
    Repl,
}

/// Reads the contents of a file as UTF-8 text.
fn read_file(filename: PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);

    let file = File::open(&filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    String::from_utf8(buf).context(format!("{:?} is not valid UTF-8", filename))
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip the crate prefix from the module path
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("rox::").unwrap_or(module);

            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .parse_default_env() // RUST_LOG overrides the default level
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn report(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        debug!("Reporting {} diagnostic", diagnostic.severity);
        eprintln!("{}", diagnostic);
    }
}

fn tokenize(filename: PathBuf, json: bool) -> Result<ExitCode> {
    info!("Running Tokenize subcommand");

    let source = read_file(filename)?;
    let mut tokens: Vec<Token> = Vec::new();
    let mut tokenized = true;

    for token in Scanner::new(&source) {
        match token {
            Ok(token) => {
                if !json {
                    println!("{}", token);
                }
                tokens.push(token);
            }

            Err(e) => {
                tokenized = false;
                eprintln!("{}", e);
            }
        }
    }

    if json {
        let out = serde_json::to_string_pretty(&tokens).context("Failed to serialize tokens")?;
        println!("{}", out);
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code {}", EXIT_STATIC_ERROR);
        return Ok(ExitCode::from(EXIT_STATIC_ERROR));
    }

    info!("Tokenization completed successfully");
    Ok(ExitCode::SUCCESS)
}

fn parse(filename: PathBuf) -> Result<ExitCode> {
    info!("Running Parse subcommand");

    let source = read_file(filename)?;
    let (tokens, scan_errors) = Scanner::new(&source).scan_tokens();

    let mut ids = NodeIds::new();
    let (statements, parse_errors) = Parser::new(&tokens, &mut ids).parse();

    for stmt in &statements {
        println!("{}", AstPrinter::print_stmt(stmt));
    }

    let mut failed = false;
    for e in scan_errors {
        failed = true;
        eprintln!("{}", e);
    }
    for e in parse_errors {
        failed = true;
        eprintln!("{}", e);
    }

    Ok(if failed {
        ExitCode::from(EXIT_STATIC_ERROR)
    } else {
        ExitCode::SUCCESS
    })
}

fn run(filename: PathBuf) -> Result<ExitCode> {
    info!("Running Run subcommand");

    let source = read_file(filename)?;
    let mut lox = Lox::new();

    let outcome: RunReport = match lox.run(&source, false) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(ExitCode::from(EXIT_INTERNAL_ERROR));
        }
    };

    report(&outcome.diagnostics);

    Ok(if outcome.had_error {
        ExitCode::from(EXIT_STATIC_ERROR)
    } else if outcome.had_runtime_error {
        ExitCode::from(EXIT_RUNTIME_ERROR)
    } else {
        ExitCode::SUCCESS
    })
}

fn repl() -> Result<ExitCode> {
    info!("Starting REPL");

    let mut lox = Lox::new();
    let mut editor = DefaultEditor::new().context("Failed to start line editor")?;

    loop {
        let line = match editor.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("Failed to read line"),
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "q" | "quit" | "exit") {
            break;
        }

        let _ = editor.add_history_entry(input);

        // A bare expression may omit its trailing semicolon.
        let source = if input.ends_with(';') || input.ends_with('}') {
            input.to_string()
        } else {
            format!("{};", input)
        };

        match lox.run(&source, true) {
            Ok(outcome) => report(&outcome.diagnostics),
            Err(e) => {
                eprintln!("{}", e);
                return Ok(ExitCode::from(EXIT_INTERNAL_ERROR));
            }
        }
    }

    info!("Leaving REPL");
    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    }

    info!("CLI arguments: {:?}", args);

    match args.commands.unwrap_or(Commands::Repl) {
        Commands::Tokenize { filename, json } => tokenize(filename, json),
        Commands::Parse { filename } => parse(filename),
        Commands::Run { filename } => run(filename),
        Commands::Repl => repl(),
    }
}
