//! Error types for system construction, compilation, and evaluation.
//!
//! This module defines the error types that can occur while building an
//! expression system, lowering it to a straight-line program, and running
//! that program. The main error types are:
//!
//! - `SystemError`: Errors while assembling a `System` (including Jacobian derivation)
//! - `CompileError`: Errors while lowering a graph to instructions
//! - `EvalError`: Errors surfaced by an evaluation call
//! - `ConfigError`: Errors from precision control
//!
//! Each error type implements the standard Error trait and provides detailed
//! error messages.

use thiserror::Error;

/// Errors that can occur while constructing a `System`.
///
/// The Jacobian and time-derivative graphs are derived when the system is
/// built, so differentiation failures surface here rather than at compile
/// time.
#[derive(Debug, Error)]
pub enum SystemError {
    /// A node kind with no derivative appeared in a function graph
    #[error("node kind {0} has no derivative")]
    NonDifferentiable(&'static str),
    /// An entry of the declared variable list is not a variable node
    #[error("declared variable at index {0} is not a variable node")]
    NotAVariable(usize),
    /// The declared path variable is not a variable node
    #[error("declared path variable is not a variable node")]
    PathVariableNotAVariable,
}

/// Errors that can occur while lowering an expression graph to a
/// straight-line program.
///
/// All compile errors are fatal: no program is returned.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The graph contains a node kind the instruction set cannot express
    #[error("unsupported node kind: {0}")]
    UnsupportedNode(&'static str),
    /// An expression references a variable missing from the system's variable list
    #[error("undeclared variable: {0}")]
    UndeclaredVariable(String),
}

/// Errors surfaced by an evaluation call.
///
/// Evaluation errors never leave partially computed outputs observable:
/// partial writes land in the program's private scratch memory and are
/// overwritten by the next call.
#[derive(Debug, Error)]
pub enum EvalError {
    /// The input vector length does not match the number of variables
    #[error("input length mismatch: expected {expected} variables, got {got}")]
    ShapeMismatch { expected: usize, got: usize },
    /// A time value was supplied (or time-derivative output requested) but
    /// the program was compiled without a path variable
    #[error("program has no path variable")]
    NoPathVariable,
    /// The program was compiled with a path variable, so evaluation requires
    /// a time value
    #[error("program has a path variable; a time value is required")]
    PathVariableRequired,
    /// A transcendental or division hit a domain violation. Raised by the
    /// arbitrary-precision scalar only; machine precision yields IEEE specials.
    #[error("numeric domain violation in {op}")]
    NumericDomain { op: &'static str },
}

/// Errors from precision control.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The requested number of decimal digits is outside the supported range
    #[error("precision of {0} digits is outside the supported range")]
    PrecisionInvalid(u32),
}
