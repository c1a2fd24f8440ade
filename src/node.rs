//! Expression-graph nodes and symbolic differentiation.
//!
//! Expressions form a directed acyclic graph of [`Node`]s shared through
//! `Arc`. Sharing is by reference: two `Arc`s pointing at the same node are
//! the same subexpression, and the compiler emits its instructions exactly
//! once. Structurally equal but separately allocated nodes are distinct.
//!
//! The constructor helpers in this module perform light algebraic cleanup
//! (zero summands and unit factors are dropped, `x^0` becomes `1`, `x^1`
//! becomes `x`) so that derivative graphs stay small. The straight-line
//! program compiler itself never rewrites the graph it is given.
//!
//! # Differentiation
//!
//! [`differentiate`] produces the partial derivative of a graph with respect
//! to a variable node, applying the product, quotient, chain, and power
//! rules. Results are cached per node identity, so sharing in the input
//! graph is preserved in the derivative graph. `Abs` has no derivative and
//! is rejected; it exists for graph consumers beyond this compiler and is
//! likewise the one kind the instruction set cannot express.

use std::collections::HashMap;
use std::sync::Arc;

use rug::{Complex, Float, Integer, Rational};

use crate::errors::SystemError;
use crate::numbers::SymbolicValue;

/// A shared reference to a graph node. Node identity is `Arc` identity.
pub type NodeRef = Arc<Node>;

/// Sign of a summand inside a [`Node::Sum`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Plus,
    Minus,
}

/// Exponent of a factor inside a [`Node::Product`]: multiply (`+1`) or
/// divide (`-1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorOp {
    Mul,
    Div,
}

/// The unary functions a graph node can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryFn {
    Neg,
    Exp,
    Log,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    /// Not analytic; carried for graph consumers outside this compiler.
    Abs,
}

impl UnaryFn {
    pub const fn name(self) -> &'static str {
        match self {
            UnaryFn::Neg => "neg",
            UnaryFn::Exp => "exp",
            UnaryFn::Log => "log",
            UnaryFn::Sin => "sin",
            UnaryFn::Cos => "cos",
            UnaryFn::Tan => "tan",
            UnaryFn::Asin => "asin",
            UnaryFn::Acos => "acos",
            UnaryFn::Atan => "atan",
            UnaryFn::Abs => "abs",
        }
    }
}

/// One node of an expression graph.
#[derive(Debug)]
pub enum Node {
    /// A named variable. Resolution is by node identity, not by name.
    Variable { name: String },
    /// An exact numeric literal.
    Constant(SymbolicValue),
    /// A signed n-ary sum.
    Sum(Vec<(NodeRef, Sign)>),
    /// An n-ary product of factors with exponent ±1.
    Product(Vec<(NodeRef, FactorOp)>),
    /// A power with a known integer exponent.
    IntegerPower { base: NodeRef, exponent: i64 },
    /// A power with an arbitrary expression exponent.
    Power { base: NodeRef, exponent: NodeRef },
    /// A unary function application.
    Unary { op: UnaryFn, arg: NodeRef },
}

impl Node {
    /// A short name for the node kind, used in error messages.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Node::Variable { .. } => "variable",
            Node::Constant(_) => "constant",
            Node::Sum(_) => "sum",
            Node::Product(_) => "product",
            Node::IntegerPower { .. } => "integer power",
            Node::Power { .. } => "power",
            Node::Unary { op, .. } => op.name(),
        }
    }
}

/// Stable identity of a node for the duration of a compilation or
/// differentiation pass.
pub(crate) fn node_addr(node: &NodeRef) -> usize {
    Arc::as_ptr(node) as usize
}

fn is_zero_const(node: &NodeRef) -> bool {
    matches!(&**node, Node::Constant(v) if v.is_zero())
}

fn is_one_const(node: &NodeRef) -> bool {
    matches!(&**node, Node::Constant(v) if v.is_one())
}

/// Creates a fresh variable node. Each call yields a distinct identity,
/// even for equal names.
pub fn variable(name: &str) -> NodeRef {
    Arc::new(Node::Variable {
        name: name.to_string(),
    })
}

/// Wraps an exact value in a constant node.
pub fn constant(value: SymbolicValue) -> NodeRef {
    Arc::new(Node::Constant(value))
}

/// An exact integer constant.
pub fn integer(value: i64) -> NodeRef {
    constant(SymbolicValue::Integer(Integer::from(value)))
}

/// An exact rational constant `numer / denom`.
pub fn rational(numer: i64, denom: i64) -> NodeRef {
    constant(SymbolicValue::Rational(Rational::from((numer, denom))))
}

/// An arbitrary-precision real constant.
pub fn real(value: Float) -> NodeRef {
    constant(SymbolicValue::Real(value))
}

/// An arbitrary-precision complex constant.
pub fn complex(value: Complex) -> NodeRef {
    constant(SymbolicValue::Complex(value))
}

/// Builds a signed sum, dropping zero summands. An empty sum collapses to
/// the constant zero, a lone positive term to the term itself.
pub fn sum(terms: Vec<(NodeRef, Sign)>) -> NodeRef {
    let mut terms: Vec<_> = terms.into_iter().filter(|(t, _)| !is_zero_const(t)).collect();
    if terms.is_empty() {
        return integer(0);
    }
    if terms.len() == 1 {
        let (node, sign) = terms.swap_remove(0);
        return match sign {
            Sign::Plus => node,
            Sign::Minus => neg(&node),
        };
    }
    Arc::new(Node::Sum(terms))
}

/// Builds a product of ±1-exponent factors, dropping unit factors. A zero
/// numerator factor collapses the whole product to zero; an empty product
/// collapses to one.
pub fn product(factors: Vec<(NodeRef, FactorOp)>) -> NodeRef {
    if factors
        .iter()
        .any(|(f, op)| *op == FactorOp::Mul && is_zero_const(f))
    {
        return integer(0);
    }
    let mut factors: Vec<_> = factors.into_iter().filter(|(f, _)| !is_one_const(f)).collect();
    if factors.is_empty() {
        return integer(1);
    }
    if factors.len() == 1 && factors[0].1 == FactorOp::Mul {
        return factors.swap_remove(0).0;
    }
    Arc::new(Node::Product(factors))
}

pub fn add(a: &NodeRef, b: &NodeRef) -> NodeRef {
    sum(vec![(a.clone(), Sign::Plus), (b.clone(), Sign::Plus)])
}

pub fn sub(a: &NodeRef, b: &NodeRef) -> NodeRef {
    sum(vec![(a.clone(), Sign::Plus), (b.clone(), Sign::Minus)])
}

pub fn mul(a: &NodeRef, b: &NodeRef) -> NodeRef {
    product(vec![(a.clone(), FactorOp::Mul), (b.clone(), FactorOp::Mul)])
}

pub fn div(a: &NodeRef, b: &NodeRef) -> NodeRef {
    product(vec![(a.clone(), FactorOp::Mul), (b.clone(), FactorOp::Div)])
}

/// `base^exponent` with a known integer exponent. `x^0` folds to `1` and
/// `x^1` to `x`.
pub fn pow_int(base: &NodeRef, exponent: i64) -> NodeRef {
    match exponent {
        0 => integer(1),
        1 => base.clone(),
        _ => Arc::new(Node::IntegerPower {
            base: base.clone(),
            exponent,
        }),
    }
}

/// `base^exponent` with an arbitrary expression exponent.
pub fn pow(base: &NodeRef, exponent: &NodeRef) -> NodeRef {
    Arc::new(Node::Power {
        base: base.clone(),
        exponent: exponent.clone(),
    })
}

fn unary(op: UnaryFn, arg: &NodeRef) -> NodeRef {
    Arc::new(Node::Unary {
        op,
        arg: arg.clone(),
    })
}

pub fn neg(arg: &NodeRef) -> NodeRef {
    unary(UnaryFn::Neg, arg)
}

pub fn exp(arg: &NodeRef) -> NodeRef {
    unary(UnaryFn::Exp, arg)
}

pub fn log(arg: &NodeRef) -> NodeRef {
    unary(UnaryFn::Log, arg)
}

pub fn sin(arg: &NodeRef) -> NodeRef {
    unary(UnaryFn::Sin, arg)
}

pub fn cos(arg: &NodeRef) -> NodeRef {
    unary(UnaryFn::Cos, arg)
}

pub fn tan(arg: &NodeRef) -> NodeRef {
    unary(UnaryFn::Tan, arg)
}

pub fn asin(arg: &NodeRef) -> NodeRef {
    unary(UnaryFn::Asin, arg)
}

pub fn acos(arg: &NodeRef) -> NodeRef {
    unary(UnaryFn::Acos, arg)
}

pub fn atan(arg: &NodeRef) -> NodeRef {
    unary(UnaryFn::Atan, arg)
}

pub fn abs(arg: &NodeRef) -> NodeRef {
    unary(UnaryFn::Abs, arg)
}

/// Computes the partial derivative of `root` with respect to the variable
/// node `wrt`.
///
/// Derivatives of shared subexpressions are computed once and reused by
/// identity, so the derivative graph shares exactly where the input graph
/// shares.
///
/// # Errors
/// Returns `SystemError::NonDifferentiable` if the graph contains `Abs`.
pub fn differentiate(root: &NodeRef, wrt: &NodeRef) -> Result<NodeRef, SystemError> {
    Differentiator {
        wrt: wrt.clone(),
        cache: HashMap::new(),
    }
    .visit(root)
}

struct Differentiator {
    wrt: NodeRef,
    cache: HashMap<usize, NodeRef>,
}

impl Differentiator {
    fn visit(&mut self, node: &NodeRef) -> Result<NodeRef, SystemError> {
        if let Some(cached) = self.cache.get(&node_addr(node)) {
            return Ok(cached.clone());
        }
        let derivative = match &**node {
            Node::Variable { .. } => {
                if Arc::ptr_eq(node, &self.wrt) {
                    integer(1)
                } else {
                    integer(0)
                }
            }
            Node::Constant(_) => integer(0),
            Node::Sum(terms) => {
                let mut out = Vec::with_capacity(terms.len());
                for (term, sign) in terms {
                    out.push((self.visit(term)?, *sign));
                }
                sum(out)
            }
            Node::Product(factors) => self.product_rule(factors)?,
            Node::IntegerPower { base, exponent } => {
                // n * u^(n-1) * u'
                let du = self.visit(base)?;
                mul(&mul(&integer(*exponent), &pow_int(base, exponent - 1)), &du)
            }
            Node::Power { base, exponent } => {
                // u^v * (v' log u + v u'/u)
                let du = self.visit(base)?;
                let dv = self.visit(exponent)?;
                mul(
                    &pow(base, exponent),
                    &add(&mul(&dv, &log(base)), &mul(exponent, &div(&du, base))),
                )
            }
            Node::Unary { op, arg } => {
                let du = self.visit(arg)?;
                match op {
                    UnaryFn::Neg => neg(&du),
                    UnaryFn::Exp => mul(&exp(arg), &du),
                    UnaryFn::Log => div(&du, arg),
                    UnaryFn::Sin => mul(&cos(arg), &du),
                    UnaryFn::Cos => neg(&mul(&sin(arg), &du)),
                    UnaryFn::Tan => {
                        // (1 + tan^2 u) u'
                        let t = tan(arg);
                        mul(&add(&integer(1), &mul(&t, &t)), &du)
                    }
                    UnaryFn::Asin => {
                        // u' (1 - u^2)^(-1/2)
                        mul(&du, &pow(&sub(&integer(1), &mul(arg, arg)), &rational(-1, 2)))
                    }
                    UnaryFn::Acos => {
                        neg(&mul(&du, &pow(&sub(&integer(1), &mul(arg, arg)), &rational(-1, 2))))
                    }
                    UnaryFn::Atan => div(&du, &add(&integer(1), &mul(arg, arg))),
                    UnaryFn::Abs => return Err(SystemError::NonDifferentiable(op.name())),
                }
            }
        };
        self.cache.insert(node_addr(node), derivative.clone());
        Ok(derivative)
    }

    /// Product rule over the factor list, splitting off the head factor:
    /// `d(u v) = u' v + u v'` with `u = f^±1` and `v` the remaining product.
    fn product_rule(&mut self, factors: &[(NodeRef, FactorOp)]) -> Result<NodeRef, SystemError> {
        let (f, op) = &factors[0];
        let df = self.visit(f)?;
        // d(1/f) = -f' / f^2
        let du = match op {
            FactorOp::Mul => df,
            FactorOp::Div => neg(&div(&df, &mul(f, f))),
        };
        if factors.len() == 1 {
            return Ok(du);
        }
        let u = match op {
            FactorOp::Mul => f.clone(),
            FactorOp::Div => div(&integer(1), f),
        };
        let v = product(factors[1..].to_vec());
        let dv = self.product_rule(&factors[1..])?;
        Ok(add(&mul(&du, &v), &mul(&u, &dv)))
    }
}
