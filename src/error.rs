//! Centralised error hierarchy for the **Lox interpreter**.
//!
//! Every stage has its own typed error enum: the scanner, parser and resolver
//! *collect* theirs and keep going, the interpreter stops at the first one.
//! [`LoxError`] unifies the user-facing kinds so a run can hand back a single
//! list of [`Diagnostic`]s. [`InternalError`] is deliberately kept apart: it
//! only fires when the interpreter itself is inconsistent.
//!
//! The module **does not** print diagnostics itself.

use std::fmt;
use std::io;

use log::debug;
use thiserror::Error;

use crate::value::Value;

/// Lexical errors. The scanner records these and keeps scanning.
#[derive(Debug, Error, PartialEq)]
pub enum ScanError {
    #[error("[line {line}] Error: Unterminated string.")]
    UnterminatedString { line: usize },

    #[error("[line {line}] Error: Unexpected character: {character}")]
    UnexpectedCharacter { line: usize, character: char },
}

/// Syntactic errors. The parser synchronizes to the next statement boundary
/// after most of these, so a single run may report several.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("[line {line}] Error at {found}: Expected expression.")]
    ExpectedExpression { line: usize, found: String },

    #[error("[line {line}] Error at {found}: {message}")]
    InvalidToken {
        line: usize,
        found: String,
        message: String,
    },

    #[error("[line {line}] Error at '{operator}': Binary operator is missing its left operand.")]
    MissingLeftOperand { line: usize, operator: String },

    #[error("[line {line}] Error: Invalid assignment target.")]
    InvalidAssignmentTarget { line: usize },

    #[error("[line {line}] Error: 'break' used outside of a loop.")]
    BreakStatementOutsideLoop { line: usize },

    #[error("[line {line}] Error: Can't have more than 255 parameters.")]
    TooManyParameters { line: usize },

    #[error("[line {line}] Error: Can't have more than 255 arguments.")]
    TooManyArguments { line: usize },
}

/// Static errors found by the resolver. All but [`ResolveError::UnusedLocal`]
/// prevent the program from being evaluated.
#[derive(Debug, Error, PartialEq)]
pub enum ResolveError {
    #[error("[line {line}] Error: Variable '{name}' accessed during its own initialization.")]
    VariableAccessDuringOwnInitialization { line: usize, name: String },

    #[error("[line {line}] Error: Variable '{name}' is already declared in this scope.")]
    VariableRedeclaration { line: usize, name: String },

    #[error("[line {line}] Error: 'return' used outside of a function.")]
    ReturnOutsideFunction { line: usize },

    #[error("[line {line}] Error: Can't return a value from an initializer.")]
    ReturnValueFromInitializer { line: usize },

    #[error("[line {line}] Error: 'this' used outside of a method.")]
    ThisOutsideClass { line: usize },

    #[error("[line {line}] Error: Class '{name}' can't inherit from itself.")]
    ClassInheritsFromItself { line: usize, name: String },

    #[error("[line {line}] Warning: Local variable '{name}' is never read.")]
    UnusedLocal { line: usize, name: String },
}

impl ResolveError {
    /// Warnings are reported but never stop evaluation.
    pub fn is_warning(&self) -> bool {
        matches!(self, ResolveError::UnusedLocal { .. })
    }
}

/// Runtime faults. The first one aborts the rest of the run.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("[line {line}] Error: Operand of '{operator}' must be a number.")]
    ExpectedNumericOperand { line: usize, operator: String },

    #[error("[line {line}] Error: Division by zero.")]
    DivisionByZero { line: usize },

    #[error("[line {line}] Error: Undeclared variable '{name}'.")]
    UndeclaredVariable { line: usize, name: String },

    #[error("[line {line}] Error: Undefined variable '{name}'.")]
    UndefinedVariable { line: usize, name: String },

    #[error("[line {line}] Error: Undefined property '{name}'.")]
    UndefinedProperty { line: usize, name: String },

    #[error("[line {line}] Error: Can only call functions and classes.")]
    UncallableCallee { line: usize },

    #[error("[line {line}] Error: Expected {expected} arguments but got {found}.")]
    MismatchingArity {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("[line {line}] Error: Only instances and classes have properties.")]
    PropertyGetterUsedOnNonInstance { line: usize },

    #[error("[line {line}] Error: Only instances have fields.")]
    PropertySetterUsedOnNonInstance { line: usize },

    #[error("[line {line}] Error: Superclass must be a class.")]
    SuperclassMustBeClass { line: usize },

    #[error("[line {line}] Error: Stack overflow.")]
    StackOverflow { line: usize },

    #[error("[line {line}] Error: Failed to write program output.")]
    Output {
        line: usize,
        #[source]
        source: io::Error,
    },
}

/// Faults that can only happen if the parser or resolver is wrong. They are
/// never reported as diagnostics; [`crate::Lox::run`] returns them as `Err`.
#[derive(Debug, Error, PartialEq)]
pub enum InternalError {
    #[error("internal error: 'break' escaped every loop (line {line})")]
    UncaughtBreak { line: usize },

    #[error("internal error: 'return' escaped every function")]
    UncaughtReturn,

    #[error("internal error: local '{name}' not found at depth {depth}")]
    LocalVariableNotFoundAtExpectedDepth { name: String, depth: usize },
}

/// Non-local control transfer inside the interpreter.
///
/// `Break` and `Return` are ordinary control flow caught by the nearest loop
/// or call; the other two unwind all the way to [`crate::Lox::run`].
#[derive(Debug)]
pub enum Interrupt {
    Break { line: usize },
    Return(Value),
    Runtime(RuntimeError),
    Internal(InternalError),
}

impl From<RuntimeError> for Interrupt {
    fn from(e: RuntimeError) -> Self {
        Interrupt::Runtime(e)
    }
}

impl From<InternalError> for Interrupt {
    fn from(e: InternalError) -> Self {
        Interrupt::Internal(e)
    }
}

/// Canonical user-facing error type.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// A single reported problem from one run.
#[derive(Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub error: LoxError,
}

impl Diagnostic {
    pub fn new(error: impl Into<LoxError>) -> Self {
        let error: LoxError = error.into();
        let severity = match &error {
            LoxError::Resolve(e) if e.is_warning() => Severity::Warning,
            _ => Severity::Error,
        };

        debug!("Recording {} diagnostic: {}", severity, error);

        Self { severity, error }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}
