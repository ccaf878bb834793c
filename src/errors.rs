// File: src/errors.rs
//
// Error types for the Moss interpreter. Compile diagnostics are printed
// by the compiler as it goes; these types carry the outcome across the
// public API and give runtime failures their exact message text.

use thiserror::Error;

/// Result of one `interpret` call. Process exit codes map Compile to 65
/// and Runtime to 70.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InterpretError {
    #[error("compile error")]
    Compile,
    #[error("runtime error")]
    Runtime,
}

/// A runtime failure inside the dispatch loop. The VM prints the message
/// followed by a stack trace, then resets its stacks.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("Operands must be numbers.")]
    OperandsMustBeNumbers,
    #[error("Operand must be a number.")]
    OperandMustBeNumber,
    #[error("Operands must be two numbers or two strings.")]
    BadAddOperands,
    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),
    #[error("Can only call functions.")]
    NotCallable,
    #[error("Expected {expected} arguments but got {got}.")]
    ArityMismatch { expected: u8, got: u8 },
    #[error("Stack overflow.")]
    StackOverflow,
    #[error("Unknown opcode {0}.")]
    UnknownOpcode(u8),
}
