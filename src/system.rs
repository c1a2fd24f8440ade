//! Systems of functions over a shared expression graph.
//!
//! A [`System`] bundles an ordered variable list, an optional path
//! variable, and an ordered list of function root nodes. Building a system
//! derives the full F×V Jacobian matrix of nodes and, when a path variable
//! is present, the F-vector of time derivatives, so a compiled program can
//! serve function values and all derivatives from a single evaluation pass.
//!
//! # Example
//!
//! ```
//! use straightline::node;
//! use straightline::system::System;
//!
//! let x = node::variable("x");
//! let f = node::add(&node::mul(&x, &x), &node::integer(1));
//! let system = System::new(vec![x], vec![f]).unwrap();
//! assert_eq!(system.num_variables(), 1);
//! assert_eq!(system.num_functions(), 1);
//! ```

use crate::errors::SystemError;
use crate::node::{differentiate, Node, NodeRef};

/// A system of functions with derived Jacobian and time-derivative graphs.
#[derive(Debug)]
pub struct System {
    variables: Vec<NodeRef>,
    path_variable: Option<NodeRef>,
    functions: Vec<NodeRef>,
    /// `jacobian[i][j]` is the root of ∂f_i/∂x_j.
    jacobian: Vec<Vec<NodeRef>>,
    /// `time_derivative[i]` is the root of ∂f_i/∂t; present iff the system
    /// has a path variable.
    time_derivative: Option<Vec<NodeRef>>,
}

impl System {
    /// Builds a system without a path variable.
    ///
    /// # Arguments
    /// * `variables` - The variable nodes, in input order
    /// * `functions` - The function root nodes, in output order
    ///
    /// # Errors
    /// Returns `SystemError::NotAVariable` if an entry of `variables` is not
    /// a variable node, or `SystemError::NonDifferentiable` if Jacobian
    /// derivation hits a node kind with no derivative.
    pub fn new(variables: Vec<NodeRef>, functions: Vec<NodeRef>) -> Result<Self, SystemError> {
        Self::build(variables, None, functions)
    }

    /// Builds a system with a path variable, enabling the time-derivative
    /// output of compiled programs.
    pub fn with_path_variable(
        variables: Vec<NodeRef>,
        path_variable: NodeRef,
        functions: Vec<NodeRef>,
    ) -> Result<Self, SystemError> {
        Self::build(variables, Some(path_variable), functions)
    }

    fn build(
        variables: Vec<NodeRef>,
        path_variable: Option<NodeRef>,
        functions: Vec<NodeRef>,
    ) -> Result<Self, SystemError> {
        for (index, var) in variables.iter().enumerate() {
            if !matches!(&**var, Node::Variable { .. }) {
                return Err(SystemError::NotAVariable(index));
            }
        }
        if let Some(t) = &path_variable {
            if !matches!(&**t, Node::Variable { .. }) {
                return Err(SystemError::PathVariableNotAVariable);
            }
        }

        let jacobian = functions
            .iter()
            .map(|f| {
                variables
                    .iter()
                    .map(|v| differentiate(f, v))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        let time_derivative = match &path_variable {
            Some(t) => Some(
                functions
                    .iter()
                    .map(|f| differentiate(f, t))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            None => None,
        };

        Ok(Self {
            variables,
            path_variable,
            functions,
            jacobian,
            time_derivative,
        })
    }

    /// The variable nodes, in input order.
    pub fn variables(&self) -> &[NodeRef] {
        &self.variables
    }

    /// The path variable, if the system has one.
    pub fn path_variable(&self) -> Option<&NodeRef> {
        self.path_variable.as_ref()
    }

    /// The function root nodes, in output order.
    pub fn functions(&self) -> &[NodeRef] {
        &self.functions
    }

    /// The derived Jacobian roots; `jacobian()[i][j]` is ∂f_i/∂x_j.
    pub fn jacobian(&self) -> &[Vec<NodeRef>] {
        &self.jacobian
    }

    /// The derived time-derivative roots, if a path variable is present.
    pub fn time_derivative(&self) -> Option<&[NodeRef]> {
        self.time_derivative.as_deref()
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_functions(&self) -> usize {
        self.functions.len()
    }

    pub fn has_path_variable(&self) -> bool {
        self.path_variable.is_some()
    }
}
