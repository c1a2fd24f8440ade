//! Straight-line program compiler and evaluator for algebraic expression systems.
//!
//! This crate lowers a shared expression graph — a system of multivariate
//! functions together with their Jacobian and optional time derivative —
//! into a flat, register-based instruction stream over a fixed memory bank,
//! then evaluates that stream repeatedly at arbitrary numeric arguments.
//! The target workload is numerical homotopy continuation, where one
//! program is called millions of times per path: evaluation is
//! branch-free, allocation-free, and generic over the working scalar
//! (machine-precision complex or arbitrary-precision complex).
//!
//! # Features
//!
//! - Shared subexpressions are compiled once; dedup is by node identity
//! - Jacobian and time-derivative graphs are derived symbolically when the
//!   system is built
//! - Embedded constants keep exact values and re-project on precision change
//! - Output containers (`Vec`, `nalgebra`, `ndarray`) are resized and
//!   filled through backend traits
//!
//! # Example
//!
//! ```rust
//! use num_complex::Complex64;
//! use straightline::node;
//! use straightline::prelude::*;
//!
//! // f(x, y) = (x + y, x * y)
//! let x = node::variable("x");
//! let y = node::variable("y");
//! let f1 = node::add(&x, &y);
//! let f2 = node::mul(&x, &y);
//! let system = System::new(vec![x, y], vec![f1, f2]).unwrap();
//!
//! let mut program = StraightLineProgram::compile(&system).unwrap();
//! program
//!     .eval(&[Complex64::new(1.0, 0.0), Complex64::new(2.0, 0.0)])
//!     .unwrap();
//!
//! let values: Vec<Complex64> = program.function_values();
//! assert_eq!(values[1], Complex64::new(2.0, 0.0));
//! let jacobian: Vec<Vec<Complex64>> = program.jacobian();
//! assert_eq!(jacobian[1][0], Complex64::new(2.0, 0.0));
//! ```

pub use slp::StraightLineProgram;
pub use system::System;

pub mod prelude {
    pub use crate::backends::matrix::Matrix;
    pub use crate::backends::vector::Vector;
    pub use crate::scalar::Scalar;
    pub use crate::slp::StraightLineProgram;
    pub use crate::system::System;
}

/// Lowering of expression graphs to instruction streams
mod compiler;
/// Error types for construction, compilation, and evaluation
pub mod errors;
/// Memory layout of a compiled program
pub mod layout;
/// Expression-graph nodes and symbolic differentiation
pub mod node;
/// Exact constant values and their projections
pub mod numbers;
/// Instruction set and instruction records
pub mod opcode;
/// Working scalar types and the typed memory banks
pub mod scalar;
/// The compiled program and its evaluator
pub mod slp;
/// Systems of functions with derived Jacobians
pub mod system;

/// Backends for output containers
pub mod backends {
    pub mod matrix;
    pub mod vector;
}
