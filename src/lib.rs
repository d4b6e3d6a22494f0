//! A tree-walking interpreter for the Lox scripting language.
//!
//! The pipeline is scanner → parser → resolver → interpreter. [`Lox`] wires
//! the stages together and is the single entry point used by the binary.

pub mod ast;
pub mod ast_printer;
pub mod class;
pub mod environment;
pub mod error;
pub mod function;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod value;

use std::io::Write;

use log::{debug, info};

use crate::ast::{NodeIds, Stmt, StmtKind};
use crate::error::{Diagnostic, InternalError, Interrupt};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;

/// Outcome of one [`Lox::run`].
#[derive(Debug, Default)]
pub struct RunReport {
    /// Every finding in the order it was produced: scan, parse, resolve and
    /// at most one runtime error.
    pub diagnostics: Vec<Diagnostic>,

    /// A syntax or static error was found; nothing was evaluated.
    pub had_error: bool,

    /// Evaluation stopped at a runtime error.
    pub had_runtime_error: bool,
}

/// A Lox session. Globals, resolved bindings and node ids survive between
/// calls to [`Lox::run`], which is what lets a REPL build on earlier lines.
pub struct Lox {
    interpreter: Interpreter,
    ids: NodeIds,
}

impl Default for Lox {
    fn default() -> Self {
        Self::new()
    }
}

impl Lox {
    /// A session printing program output to stdout.
    pub fn new() -> Self {
        Self::with_interpreter(Interpreter::new())
    }

    /// A session printing program output to `out`.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        Self::with_interpreter(Interpreter::with_output(out))
    }

    fn with_interpreter(interpreter: Interpreter) -> Self {
        info!("Lox session created");

        Self {
            interpreter,
            ids: NodeIds::new(),
        }
    }

    /// Scan, parse, resolve and evaluate `source`.
    ///
    /// With `repl_mode`, top-level expression statements print their value.
    /// An `Err` means the interpreter itself is inconsistent, never that the
    /// program was wrong.
    pub fn run(&mut self, source: &str, repl_mode: bool) -> Result<RunReport, InternalError> {
        let mut report = RunReport::default();

        let (tokens, scan_errors) = Scanner::new(source).scan_tokens();
        report
            .diagnostics
            .extend(scan_errors.into_iter().map(Diagnostic::new));

        let (mut statements, parse_errors) = Parser::new(&tokens, &mut self.ids).parse();
        report
            .diagnostics
            .extend(parse_errors.into_iter().map(Diagnostic::new));

        if report.diagnostics.iter().any(Diagnostic::is_error) {
            debug!("Syntax errors found, skipping evaluation");

            report.had_error = true;
            return Ok(report);
        }

        let resolve_errors = Resolver::new(&mut self.interpreter).resolve(&statements);
        report
            .diagnostics
            .extend(resolve_errors.into_iter().map(Diagnostic::new));

        if report.diagnostics.iter().any(Diagnostic::is_error) {
            debug!("Static errors found, skipping evaluation");

            report.had_error = true;
            return Ok(report);
        }

        if repl_mode {
            print_expression_statements(&mut statements);
        }

        match self.interpreter.interpret(&statements) {
            Ok(()) => {}
            Err(Interrupt::Runtime(e)) => {
                debug!("Runtime error: {}", e);

                report.had_runtime_error = true;
                report.diagnostics.push(Diagnostic::new(e));
            }
            Err(Interrupt::Internal(e)) => return Err(e),
            // A signal escaping the whole program slipped past the parser.
            Err(Interrupt::Break { line }) => return Err(InternalError::UncaughtBreak { line }),
            Err(Interrupt::Return(_)) => return Err(InternalError::UncaughtReturn),
        }

        Ok(report)
    }
}

/// REPL convenience: `1 + 2` behaves like `print 1 + 2;`.
fn print_expression_statements(statements: &mut [Stmt]) {
    for stmt in statements {
        if let StmtKind::Expression(expr) = &stmt.kind {
            stmt.kind = StmtKind::Print(expr.clone());
        }
    }
}
