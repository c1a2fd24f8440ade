//! The compiled straight-line program and its evaluator.
//!
//! A [`StraightLineProgram`] is built from a [`System`](crate::system::System)
//! and evaluated repeatedly at arbitrary numeric arguments:
//!
//! ```
//! use num_complex::Complex64;
//! use straightline::node;
//! use straightline::system::System;
//! use straightline::slp::StraightLineProgram;
//!
//! let x = node::variable("x");
//! let f = node::add(&node::mul(&x, &x), &node::integer(1));
//! let system = System::new(vec![x], vec![f]).unwrap();
//!
//! let mut program = StraightLineProgram::compile(&system).unwrap();
//! program.eval(&[Complex64::new(2.0, 0.0)]).unwrap();
//! let values: Vec<Complex64> = program.function_values();
//! assert_eq!(values[0], Complex64::new(5.0, 0.0));
//! ```
//!
//! The program splits into an immutable description (instructions, layout,
//! constant table) and mutable scratch (one memory bank per scalar type).
//! Evaluation takes `&mut self`: one call holds exclusive write access to
//! the bank for its duration, and parallel callers clone the program to get
//! a bank of their own. Within a call, instructions execute in stream
//! order, so equal inputs produce bit-equal outputs at equal precision.
//!
//! Embedded constants keep their exact symbolic values; `set_precision`
//! re-projects every one of them into the arbitrary-precision bank at the
//! new digit count. The machine-precision bank is independent of the
//! working precision.

use std::fmt;

use colored::Colorize;

use crate::backends::matrix::Matrix;
use crate::backends::vector::Vector;
use crate::compiler;
use crate::errors::{CompileError, ConfigError, EvalError};
use crate::layout::Layout;
use crate::numbers::{digits_to_bits, SymbolicValue};
use crate::opcode::{Instruction, Opcode};
use crate::scalar::{Memory, Scalar};
use crate::system::System;

/// A compiled straight-line program over a fixed memory bank.
#[derive(Debug, Clone)]
pub struct StraightLineProgram {
    instructions: Vec<Instruction>,
    layout: Layout,
    /// Exact values of the embedded constants and the slots they occupy.
    constants: Vec<(SymbolicValue, usize)>,
    has_path_variable: bool,
    /// Working precision of the arbitrary-precision bank, in decimal digits.
    precision: u32,
    memory: Memory,
}

impl StraightLineProgram {
    /// Initial working precision in decimal digits, matching a double.
    pub const DEFAULT_PRECISION: u32 = 16;
    /// Smallest accepted working precision in decimal digits.
    pub const MIN_PRECISION: u32 = 2;
    /// Largest accepted working precision in decimal digits.
    pub const MAX_PRECISION: u32 = 100_000;

    /// Compiles a system into a program.
    ///
    /// # Errors
    /// Returns a `CompileError` if the graph references an undeclared
    /// variable or contains a node kind the instruction set cannot express.
    pub fn compile(system: &System) -> Result<Self, CompileError> {
        compiler::compile(system)
    }

    pub(crate) fn from_parts(
        instructions: Vec<Instruction>,
        layout: Layout,
        constants: Vec<(SymbolicValue, usize)>,
        has_path_variable: bool,
    ) -> Self {
        let precision = Self::DEFAULT_PRECISION;
        let bits = digits_to_bits(precision);
        let mut memory = Memory::new(layout.memory_len, bits);
        for (value, slot) in &constants {
            memory.dbl[*slot] = value.to_dbl();
            memory.mp[*slot] = value.to_mp(bits);
        }
        Self {
            instructions,
            layout,
            constants,
            has_path_variable,
            precision,
            memory,
        }
    }

    /// Evaluates the program at the given variable values.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if the input length differs from the number
    /// of variables, `PathVariableRequired` if the program was compiled
    /// with a path variable, and `NumericDomain` on an arbitrary-precision
    /// domain violation.
    pub fn eval<S: Scalar>(&mut self, variable_values: &[S]) -> Result<(), EvalError> {
        if self.has_path_variable {
            return Err(EvalError::PathVariableRequired);
        }
        self.copy_variable_values(variable_values)?;
        self.execute::<S>()
    }

    /// Evaluates the program at the given variable values and time.
    ///
    /// # Errors
    /// As [`Self::eval`], plus `NoPathVariable` if the program was compiled
    /// without a path variable.
    pub fn eval_with_time<S: Scalar>(
        &mut self,
        variable_values: &[S],
        time: &S,
    ) -> Result<(), EvalError> {
        self.copy_variable_values(variable_values)?;
        self.copy_path_variable(time)?;
        self.execute::<S>()
    }

    fn copy_variable_values<S: Scalar>(&mut self, values: &[S]) -> Result<(), EvalError> {
        if values.len() != self.layout.counts.variables {
            return Err(EvalError::ShapeMismatch {
                expected: self.layout.counts.variables,
                got: values.len(),
            });
        }
        let bank = S::bank_mut(&mut self.memory);
        for (offset, value) in values.iter().enumerate() {
            bank[self.layout.input.variables + offset] = value.clone();
        }
        Ok(())
    }

    fn copy_path_variable<S: Scalar>(&mut self, time: &S) -> Result<(), EvalError> {
        if !self.has_path_variable {
            return Err(EvalError::NoPathVariable);
        }
        S::bank_mut(&mut self.memory)[self.layout.input.time] = time.clone();
        Ok(())
    }

    /// Runs the instruction stream over the bank of the chosen scalar type.
    /// Slot validity is an invariant of the emitter, so operands are read
    /// without further checks.
    fn execute<S: Scalar>(&mut self) -> Result<(), EvalError> {
        let bank = S::bank_mut(&mut self.memory);
        for instruction in &self.instructions {
            match *instruction {
                Instruction::Unary { op, src, dst } => {
                    let value = match op {
                        Opcode::Assign => bank[src].clone(),
                        Opcode::Neg => S::neg(&bank[src]),
                        Opcode::Exp => S::exp(&bank[src]),
                        Opcode::Log => S::log(&bank[src])?,
                        Opcode::Sin => S::sin(&bank[src]),
                        Opcode::Cos => S::cos(&bank[src]),
                        Opcode::Tan => S::tan(&bank[src]),
                        Opcode::Asin => S::asin(&bank[src]),
                        Opcode::Acos => S::acos(&bank[src]),
                        Opcode::Atan => S::atan(&bank[src]),
                        _ => unreachable!("binary opcode in unary instruction"),
                    };
                    bank[dst] = value;
                }
                Instruction::Binary { op, lhs, rhs, dst } => {
                    let value = match op {
                        Opcode::Add => S::add(&bank[lhs], &bank[rhs]),
                        Opcode::Sub => S::sub(&bank[lhs], &bank[rhs]),
                        Opcode::Mul => S::mul(&bank[lhs], &bank[rhs]),
                        Opcode::Div => S::div(&bank[lhs], &bank[rhs])?,
                        Opcode::Pow => S::pow(&bank[lhs], &bank[rhs])?,
                        _ => unreachable!("unary opcode in binary instruction"),
                    };
                    bank[dst] = value;
                }
            }
        }
        Ok(())
    }

    /// Copies the function values of the last evaluation into `out`,
    /// resizing it to length F first.
    pub fn function_values_into<S: Scalar, V: Vector<S>>(&self, out: &mut V) {
        let count = self.layout.counts.functions;
        if out.len() != count {
            *out = V::zeros(count);
        }
        let bank = S::bank(&self.memory);
        let slice = out.as_mut_slice();
        for offset in 0..count {
            slice[offset] = bank[self.layout.output.functions + offset].clone();
        }
    }

    /// The function values of the last evaluation, in a fresh container.
    pub fn function_values<S: Scalar, V: Vector<S>>(&self) -> V {
        let mut out = V::zeros(self.layout.counts.functions);
        self.function_values_into(&mut out);
        out
    }

    /// Copies the Jacobian of the last evaluation into `out`, resizing it
    /// to F×V first. Entry `(i, j)` is ∂f_i/∂x_j.
    pub fn jacobian_into<S: Scalar, M: Matrix<S>>(&self, out: &mut M) {
        let rows = self.layout.counts.functions;
        let cols = self.layout.counts.variables;
        if out.dims() != (rows, cols) {
            *out = M::zeros(rows, cols);
        }
        let bank = S::bank(&self.memory);
        for j in 0..cols {
            for i in 0..rows {
                out.set(i, j, bank[self.layout.output.jacobian + i + j * rows].clone());
            }
        }
    }

    /// The Jacobian of the last evaluation, in a fresh container.
    pub fn jacobian<S: Scalar, M: Matrix<S>>(&self) -> M {
        let mut out = M::zeros(self.layout.counts.functions, self.layout.counts.variables);
        self.jacobian_into(&mut out);
        out
    }

    /// Copies the time derivatives of the last evaluation into `out`,
    /// resizing it to length F first.
    ///
    /// # Errors
    /// Returns `NoPathVariable` if the program was compiled without a path
    /// variable.
    pub fn time_derivative_into<S: Scalar, V: Vector<S>>(
        &self,
        out: &mut V,
    ) -> Result<(), EvalError> {
        if !self.has_path_variable {
            return Err(EvalError::NoPathVariable);
        }
        let count = self.layout.counts.functions;
        if out.len() != count {
            *out = V::zeros(count);
        }
        let bank = S::bank(&self.memory);
        let slice = out.as_mut_slice();
        for offset in 0..count {
            slice[offset] = bank[self.layout.output.time_deriv + offset].clone();
        }
        Ok(())
    }

    /// The time derivatives of the last evaluation, in a fresh container.
    pub fn time_derivative<S: Scalar, V: Vector<S>>(&self) -> Result<V, EvalError> {
        let mut out = V::zeros(self.layout.counts.functions);
        self.time_derivative_into(&mut out)?;
        Ok(out)
    }

    pub fn num_functions(&self) -> usize {
        self.layout.counts.functions
    }

    pub fn num_variables(&self) -> usize {
        self.layout.counts.variables
    }

    pub fn has_path_variable(&self) -> bool {
        self.has_path_variable
    }

    /// The current working precision of the arbitrary-precision bank, in
    /// decimal digits.
    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// The current working precision in mpfr bits, the precision at which
    /// arbitrary-precision inputs should be constructed.
    pub fn precision_bits(&self) -> u32 {
        digits_to_bits(self.precision)
    }

    /// Changes the working precision, re-projecting every embedded constant
    /// into the arbitrary-precision bank from its exact value. Costs one
    /// projection per constant and allocates no new slots.
    ///
    /// # Errors
    /// Returns `ConfigError::PrecisionInvalid` if `digits` is outside
    /// `MIN_PRECISION..=MAX_PRECISION`.
    pub fn set_precision(&mut self, digits: u32) -> Result<(), ConfigError> {
        if !(Self::MIN_PRECISION..=Self::MAX_PRECISION).contains(&digits) {
            return Err(ConfigError::PrecisionInvalid(digits));
        }
        let bits = digits_to_bits(digits);
        for cell in &mut self.memory.mp {
            cell.set_prec(bits);
        }
        for (value, slot) in &self.constants {
            self.memory.mp[*slot] = value.to_mp(bits);
        }
        self.precision = digits;
        Ok(())
    }

    /// The instruction stream.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// The constant table: exact values and the slots they occupy.
    pub(crate) fn constants(&self) -> &[(SymbolicValue, usize)] {
        &self.constants
    }

    /// The memory layout.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }
}

impl fmt::Display for StraightLineProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "straight-line program: {} instructions over {} memory slots",
            self.instructions.len(),
            self.layout.memory_len
        )?;
        writeln!(
            f,
            "    {}: {} @ m{}",
            "variables".cyan(),
            self.layout.counts.variables,
            self.layout.input.variables
        )?;
        if self.has_path_variable {
            writeln!(f, "    {}: m{}", "time".cyan(), self.layout.input.time)?;
        }
        writeln!(
            f,
            "    {}: {} @ m{}",
            "functions".cyan(),
            self.layout.counts.functions,
            self.layout.output.functions
        )?;
        writeln!(
            f,
            "    {}: {} @ m{}",
            "jacobian".cyan(),
            self.layout.counts.jacobian,
            self.layout.output.jacobian
        )?;
        if self.has_path_variable {
            writeln!(
                f,
                "    {}: {} @ m{}",
                "time derivative".cyan(),
                self.layout.counts.time_deriv,
                self.layout.output.time_deriv
            )?;
        }
        for (value, slot) in &self.constants {
            writeln!(f, "    {}: m{} = {}", "constant".cyan(), slot, value)?;
        }
        for (index, instruction) in self.instructions.iter().enumerate() {
            writeln!(f, "    [{:>4}] {}", index, instruction)?;
        }
        Ok(())
    }
}
