//! Lowering of expression graphs to straight-line programs.
//!
//! The compiler walks every root of a [`System`] in post order, assigns a
//! memory slot to each node's result, and emits the instruction that
//! defines it. A registry keyed on node identity makes the walk visit each
//! shared node exactly once: the second consumer of a subexpression reads
//! the slot the first visit produced. Structural equality without identity
//! sharing is deliberately not deduplicated.
//!
//! Slot assignment follows the memory layout contract: variables occupy the
//! front of the bank, the path variable (if any) the slot after them, and
//! constants and temporaries are scattered through the middle in visit
//! order. Once every root has been walked the output ranges are reserved as
//! contiguous blocks and a final sequence of `Assign` instructions copies
//! each root's slot into its reserved output slot.

use std::collections::HashMap;

use rug::Integer;

use crate::errors::CompileError;
use crate::layout::{InputLocations, Layout, NumberOf, OutputLocations};
use crate::node::{node_addr, FactorOp, Node, NodeRef, Sign, UnaryFn};
use crate::numbers::SymbolicValue;
use crate::opcode::{Instruction, Opcode};
use crate::slp::StraightLineProgram;
use crate::system::System;

/// Compiles a system into a straight-line program.
///
/// # Errors
/// Returns `CompileError::UndeclaredVariable` if an expression references a
/// variable missing from the system's variable list, and
/// `CompileError::UnsupportedNode` if the graph contains a node kind the
/// instruction set cannot express. No program is returned on error.
pub(crate) fn compile(system: &System) -> Result<StraightLineProgram, CompileError> {
    let mut compiler = SlpCompiler::new();

    let num_variables = system.num_variables();
    let num_functions = system.num_functions();

    // inputs first: variables at the front, then the path variable
    for var in system.variables() {
        let slot = compiler.alloc();
        compiler.registry.insert(node_addr(var), slot);
    }
    let time_slot = system.path_variable().map(|t| {
        let slot = compiler.alloc();
        compiler.registry.insert(node_addr(t), slot);
        slot
    });

    let function_slots = system
        .functions()
        .iter()
        .map(|f| compiler.visit(f))
        .collect::<Result<Vec<_>, _>>()?;

    let jacobian_slots = system
        .jacobian()
        .iter()
        .map(|row| {
            row.iter()
                .map(|entry| compiler.visit(entry))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    let time_deriv_slots = match system.time_derivative() {
        Some(entries) => Some(
            entries
                .iter()
                .map(|entry| compiler.visit(entry))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        None => None,
    };

    // reserve the contiguous output ranges after all temporaries
    let out_functions = compiler.next_slot;
    compiler.next_slot += num_functions;
    let out_jacobian = compiler.next_slot;
    compiler.next_slot += num_functions * num_variables;
    let out_time_deriv = match &time_deriv_slots {
        Some(_) => {
            let offset = compiler.next_slot;
            compiler.next_slot += num_functions;
            offset
        }
        None => 0,
    };

    for (i, slot) in function_slots.iter().enumerate() {
        compiler.emit(Instruction::unary(Opcode::Assign, *slot, out_functions + i));
    }
    // entry (i, j) lands at jacobian + i + j*F: columns are function-contiguous
    for (i, row) in jacobian_slots.iter().enumerate() {
        for (j, slot) in row.iter().enumerate() {
            compiler.emit(Instruction::unary(
                Opcode::Assign,
                *slot,
                out_jacobian + i + j * num_functions,
            ));
        }
    }
    if let Some(slots) = &time_deriv_slots {
        for (i, slot) in slots.iter().enumerate() {
            compiler.emit(Instruction::unary(Opcode::Assign, *slot, out_time_deriv + i));
        }
    }

    let layout = Layout {
        input: InputLocations {
            variables: 0,
            time: time_slot.unwrap_or(0),
        },
        output: OutputLocations {
            functions: out_functions,
            jacobian: out_jacobian,
            time_deriv: out_time_deriv,
        },
        counts: NumberOf {
            variables: num_variables,
            functions: num_functions,
            jacobian: num_functions * num_variables,
            time_deriv: if time_deriv_slots.is_some() {
                num_functions
            } else {
                0
            },
        },
        memory_len: compiler.next_slot,
    };

    Ok(StraightLineProgram::from_parts(
        compiler.instructions,
        layout,
        compiler.constants,
        system.has_path_variable(),
    ))
}

struct SlpCompiler {
    next_slot: usize,
    /// node identity -> slot holding that node's computed result
    registry: HashMap<usize, usize>,
    instructions: Vec<Instruction>,
    constants: Vec<(SymbolicValue, usize)>,
    zero_slot: Option<usize>,
    one_slot: Option<usize>,
}

impl SlpCompiler {
    fn new() -> Self {
        Self {
            next_slot: 0,
            registry: HashMap::new(),
            instructions: Vec::new(),
            constants: Vec::new(),
            zero_slot: None,
            one_slot: None,
        }
    }

    fn alloc(&mut self) -> usize {
        let slot = self.next_slot;
        self.next_slot += 1;
        slot
    }

    fn emit(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Slot of the interned constant zero, allocating it on first use.
    fn zero(&mut self) -> usize {
        match self.zero_slot {
            Some(slot) => slot,
            None => {
                let slot = self.alloc();
                self.constants
                    .push((SymbolicValue::Integer(Integer::from(0)), slot));
                self.zero_slot = Some(slot);
                slot
            }
        }
    }

    /// Slot of the interned constant one, allocating it on first use.
    fn one(&mut self) -> usize {
        match self.one_slot {
            Some(slot) => slot,
            None => {
                let slot = self.alloc();
                self.constants
                    .push((SymbolicValue::Integer(Integer::from(1)), slot));
                self.one_slot = Some(slot);
                slot
            }
        }
    }

    /// Post-order walk. Returns the slot holding the node's result,
    /// emitting its defining instructions on the first visit only.
    fn visit(&mut self, node: &NodeRef) -> Result<usize, CompileError> {
        if let Some(&slot) = self.registry.get(&node_addr(node)) {
            return Ok(slot);
        }
        let slot = match &**node {
            // declared variables were registered up front; anything else is unresolved
            Node::Variable { name } => {
                return Err(CompileError::UndeclaredVariable(name.clone()));
            }
            Node::Constant(value) => {
                let slot = self.alloc();
                self.constants.push((value.clone(), slot));
                slot
            }
            Node::Sum(terms) => {
                let operands = terms
                    .iter()
                    .map(|(term, sign)| self.visit(term).map(|slot| (slot, *sign)))
                    .collect::<Result<Vec<_>, _>>()?;
                self.fold_sum(&operands)
            }
            Node::Product(factors) => {
                let operands = factors
                    .iter()
                    .map(|(factor, op)| self.visit(factor).map(|slot| (slot, *op)))
                    .collect::<Result<Vec<_>, _>>()?;
                self.fold_product(&operands)
            }
            Node::IntegerPower { base, exponent } => {
                let base_slot = self.visit(base)?;
                self.integer_power(base_slot, *exponent)
            }
            Node::Power { base, exponent } => {
                let base_slot = self.visit(base)?;
                let exponent_slot = self.visit(exponent)?;
                let dst = self.alloc();
                self.emit(Instruction::binary(Opcode::Pow, base_slot, exponent_slot, dst));
                dst
            }
            Node::Unary { op, arg } => {
                let opcode = match op {
                    UnaryFn::Neg => Opcode::Neg,
                    UnaryFn::Exp => Opcode::Exp,
                    UnaryFn::Log => Opcode::Log,
                    UnaryFn::Sin => Opcode::Sin,
                    UnaryFn::Cos => Opcode::Cos,
                    UnaryFn::Tan => Opcode::Tan,
                    UnaryFn::Asin => Opcode::Asin,
                    UnaryFn::Acos => Opcode::Acos,
                    UnaryFn::Atan => Opcode::Atan,
                    UnaryFn::Abs => {
                        return Err(CompileError::UnsupportedNode(node.kind_name()));
                    }
                };
                let src = self.visit(arg)?;
                let dst = self.alloc();
                self.emit(Instruction::unary(opcode, src, dst));
                dst
            }
        };
        self.registry.insert(node_addr(node), slot);
        Ok(slot)
    }

    /// Folds signed summand slots into an accumulator of fresh temporaries.
    fn fold_sum(&mut self, operands: &[(usize, Sign)]) -> usize {
        let Some(((first, first_sign), rest)) = operands.split_first() else {
            let zero = self.zero();
            let dst = self.alloc();
            self.emit(Instruction::unary(Opcode::Assign, zero, dst));
            return dst;
        };
        let mut acc = *first;
        if *first_sign == Sign::Minus {
            let dst = self.alloc();
            self.emit(Instruction::unary(Opcode::Neg, acc, dst));
            acc = dst;
        } else if rest.is_empty() {
            let dst = self.alloc();
            self.emit(Instruction::unary(Opcode::Assign, acc, dst));
            acc = dst;
        }
        for (slot, sign) in rest {
            let opcode = match sign {
                Sign::Plus => Opcode::Add,
                Sign::Minus => Opcode::Sub,
            };
            let dst = self.alloc();
            self.emit(Instruction::binary(opcode, acc, *slot, dst));
            acc = dst;
        }
        acc
    }

    /// Folds ±1-exponent factor slots into an accumulator, analogous to
    /// [`Self::fold_sum`]. A leading reciprocal starts from the constant one.
    fn fold_product(&mut self, operands: &[(usize, FactorOp)]) -> usize {
        let Some(((first, first_op), rest)) = operands.split_first() else {
            let one = self.one();
            let dst = self.alloc();
            self.emit(Instruction::unary(Opcode::Assign, one, dst));
            return dst;
        };
        let mut acc = *first;
        if *first_op == FactorOp::Div {
            let one = self.one();
            let dst = self.alloc();
            self.emit(Instruction::binary(Opcode::Div, one, acc, dst));
            acc = dst;
        } else if rest.is_empty() {
            let dst = self.alloc();
            self.emit(Instruction::unary(Opcode::Assign, acc, dst));
            acc = dst;
        }
        for (slot, op) in rest {
            let opcode = match op {
                FactorOp::Mul => Opcode::Mul,
                FactorOp::Div => Opcode::Div,
            };
            let dst = self.alloc();
            self.emit(Instruction::binary(opcode, acc, *slot, dst));
            acc = dst;
        }
        acc
    }

    /// Emits `base^n` by repeated multiplication; negative exponents go
    /// through a final division from one.
    fn integer_power(&mut self, base_slot: usize, exponent: i64) -> usize {
        match exponent {
            0 => {
                let one = self.one();
                let dst = self.alloc();
                self.emit(Instruction::unary(Opcode::Assign, one, dst));
                dst
            }
            1 => {
                let dst = self.alloc();
                self.emit(Instruction::unary(Opcode::Assign, base_slot, dst));
                dst
            }
            n if n >= 2 => {
                let mut acc = base_slot;
                for _ in 1..n {
                    let dst = self.alloc();
                    self.emit(Instruction::binary(Opcode::Mul, acc, base_slot, dst));
                    acc = dst;
                }
                acc
            }
            n => {
                // n < 0: 1 / base^(-n)
                let positive = if n == -1 {
                    base_slot
                } else {
                    self.integer_power(base_slot, -n)
                };
                let one = self.one();
                let dst = self.alloc();
                self.emit(Instruction::binary(Opcode::Div, one, positive, dst));
                dst
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node;
    use crate::system::System;

    fn count_op(program: &StraightLineProgram, wanted: Opcode) -> usize {
        program
            .instructions()
            .iter()
            .filter(|instruction| match instruction {
                Instruction::Unary { op, .. } | Instruction::Binary { op, .. } => *op == wanted,
            })
            .count()
    }

    #[test]
    fn test_shared_node_is_emitted_once() {
        let x = node::variable("x");
        let y = node::variable("y");
        let s = node::mul(&x, &y);
        // both functions are the same node; its Mul must appear exactly once
        let system = System::new(vec![x, y], vec![s.clone(), s]).unwrap();
        let program = compile(&system).unwrap();

        assert_eq!(count_op(&program, Opcode::Mul), 1);
        // one Mul, two function Assigns, four Jacobian Assigns
        assert_eq!(program.instructions().len(), 7);
    }

    #[test]
    fn test_structural_twins_are_not_deduplicated() {
        let x = node::variable("x");
        let y = node::variable("y");
        let s1 = node::mul(&x, &y);
        let s2 = node::mul(&x, &y);
        let system = System::new(vec![x, y], vec![s1, s2]).unwrap();
        let program = compile(&system).unwrap();

        assert_eq!(count_op(&program, Opcode::Mul), 2);
    }

    #[test]
    fn test_undeclared_variable_is_fatal() {
        let x = node::variable("x");
        let y = node::variable("y");
        let f = node::add(&x, &y);
        let system = System::new(vec![x], vec![f]).unwrap();
        let err = compile(&system).unwrap_err();
        assert!(matches!(err, CompileError::UndeclaredVariable(name) if name == "y"));
    }

    #[test]
    fn test_unsupported_node_is_fatal() {
        let x = node::variable("x");
        let mut compiler = SlpCompiler::new();
        let slot = compiler.alloc();
        compiler.registry.insert(node_addr(&x), slot);
        let err = compiler.visit(&node::abs(&x)).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedNode("abs")));
    }

    #[test]
    fn test_constant_dedup_is_by_identity() {
        let five = node::integer(5);
        let mut compiler = SlpCompiler::new();
        let a = compiler.visit(&five).unwrap();
        let b = compiler.visit(&five).unwrap();
        assert_eq!(a, b);
        assert_eq!(compiler.constants.len(), 1);

        // an equal but separately allocated literal gets its own slot
        let other_five = node::integer(5);
        let d = compiler.visit(&other_five).unwrap();
        assert_ne!(a, d);
        assert_eq!(compiler.constants.len(), 2);
    }

    #[test]
    fn test_sources_are_initialized_before_use() {
        let x = node::variable("x");
        let y = node::variable("y");
        let t = node::variable("t");
        let f1 = node::mul(&node::exp(&node::mul(&x, &t)), &y);
        let f2 = node::add(&node::pow_int(&y, -3), &node::tan(&x));
        let system = System::with_path_variable(vec![x, y], t, vec![f1, f2]).unwrap();
        let program = compile(&system).unwrap();
        let layout = program.layout();

        // initialized = inputs + constants; every source must be covered
        // before its instruction runs, every dst extends the set
        let mut initialized = vec![false; layout.memory_len];
        for slot in 0..layout.counts.variables + 1 {
            initialized[slot] = true;
        }
        for (_, slot) in program.constants() {
            initialized[*slot] = true;
        }
        for instruction in program.instructions() {
            let (src, src2) = instruction.sources();
            assert!(initialized[src], "uninitialized source m{}", src);
            if let Some(slot) = src2 {
                assert!(initialized[slot], "uninitialized source m{}", slot);
            }
            initialized[instruction.dst()] = true;
        }
    }

    #[test]
    fn test_empty_sum_assigns_interned_zero() {
        let mut compiler = SlpCompiler::new();
        let slot = compiler.fold_sum(&[]);
        assert_eq!(compiler.constants.len(), 1);
        assert!(compiler.constants[0].0.is_zero());
        assert_eq!(
            compiler.instructions.last(),
            Some(&Instruction::unary(Opcode::Assign, compiler.constants[0].1, slot))
        );
        // the interned slot is reused, not reallocated
        let before = compiler.constants.len();
        compiler.fold_sum(&[]);
        assert_eq!(compiler.constants.len(), before);
    }

    #[test]
    fn test_integer_power_expansion() {
        let mut compiler = SlpCompiler::new();
        let base = compiler.alloc();
        compiler.integer_power(base, 4);
        // x^4 by repeated multiplication: three Mul instructions
        assert_eq!(compiler.instructions.len(), 3);

        let mut compiler = SlpCompiler::new();
        let base = compiler.alloc();
        let slot = compiler.integer_power(base, -2);
        // x^-2: one Mul then a Div from the interned one
        assert_eq!(compiler.instructions.len(), 2);
        assert_eq!(compiler.instructions.last().map(|i| i.dst()), Some(slot));
        assert!(compiler.one_slot.is_some());
    }

    #[test]
    fn test_layout_regions_are_disjoint_and_ordered() {
        let x = node::variable("x");
        let t = node::variable("t");
        let f = node::sub(&x, &t);
        let system = System::with_path_variable(vec![x], t, vec![f]).unwrap();
        let program = compile(&system).unwrap();
        let layout = program.layout();

        assert_eq!(layout.input.variables, 0);
        assert_eq!(layout.input.time, 1);
        assert!(layout.output.functions >= 2);
        assert_eq!(layout.output.jacobian, layout.output.functions + 1);
        assert_eq!(layout.output.time_deriv, layout.output.jacobian + 1);
        assert_eq!(layout.memory_len, layout.output.time_deriv + 1);
    }

    #[test]
    fn test_all_slots_in_bounds_and_inputs_never_written() {
        let x = node::variable("x");
        let y = node::variable("y");
        let f1 = node::add(&node::pow_int(&x, 3), &node::mul(&x, &y));
        let f2 = node::sin(&node::div(&x, &y));
        let system = System::new(vec![x, y], vec![f1, f2]).unwrap();
        let program = compile(&system).unwrap();
        let layout = program.layout();

        for instruction in program.instructions() {
            let (src, src2) = instruction.sources();
            assert!(src < layout.memory_len);
            assert!(src2.map_or(true, |slot| slot < layout.memory_len));
            assert!(instruction.dst() < layout.memory_len);
            // inputs sit in [0, V); no instruction may overwrite them
            assert!(instruction.dst() >= layout.counts.variables);
        }
    }
}
