use stoat_core::dtype;
use stoat_core::{Elem, Error, Graph, Node, OpKind, Result, Symbol};

use crate::ops::{
    BinaryKind, ConcatGeom, Conv2dGeom, Pool2dGeom, ReduceKind, UnaryKind,
};

// Instruction plan — the compiled form of a graph
//
// The graph is static: every node's operator, attribute values, arity, and
// input/output shapes are known before the first sweep. Compilation turns
// each node into one Step whose kernel parameters are fully resolved —
// clip bounds converted to the element type, pooling and convolution
// geometry worked out, concat block sizes precomputed. The sweeps are then
// a plain indexed loop over the steps with no attribute lookups and no
// shape arithmetic.

/// A fully resolved kernel selection for one node.
#[derive(Debug, Clone, PartialEq)]
pub enum Kernel {
    Unary(UnaryKind),
    Binary(BinaryKind),
    Clip { lo: Elem, hi: Elem },
    Matmul,
    Reduce(ReduceKind),
    /// Squeeze/unsqueeze: pure buffer copy under the new shape.
    View,
    Conv2d(Conv2dGeom),
    MaxPool2d(Pool2dGeom),
    Concat(ConcatGeom),
}

/// One compiled node: the kernel plus its arena addressing.
#[derive(Debug, Clone)]
pub struct Step {
    pub op: OpKind,
    pub kernel: Kernel,
    pub inputs: Vec<Symbol>,
    pub output: Symbol,
}

/// Compile every node of a graph into its Step.
pub fn compile(graph: &Graph) -> Result<Vec<Step>> {
    graph.nodes().iter().map(compile_node).collect()
}

fn compile_node(node: &Node) -> Result<Step> {
    let kernel = match node.op {
        OpKind::Sigmoid => Kernel::Unary(UnaryKind::Sigmoid),
        OpKind::Relu => Kernel::Unary(UnaryKind::Relu),
        OpKind::Tanh => Kernel::Unary(UnaryKind::Tanh),

        OpKind::Clip => {
            // Absent bounds default to the dtype's finite extremes.
            let lo = match node.attrs.lookup("min") {
                Some(v) => v.as_scalar("min")?,
                None => dtype::min_finite(),
            };
            let hi = match node.attrs.lookup("max") {
                Some(v) => v.as_scalar("max")?,
                None => dtype::max_finite(),
            };
            if lo.is_nan() || hi.is_nan() || lo > hi {
                return Err(Error::msg(format!(
                    "clip: invalid bounds min={}, max={}",
                    lo, hi
                )));
            }
            Kernel::Clip { lo, hi }
        }

        OpKind::Add => Kernel::Binary(BinaryKind::Add),
        OpKind::Sub => Kernel::Binary(BinaryKind::Sub),
        OpKind::Mul => Kernel::Binary(BinaryKind::Mul),

        OpKind::Matmul => Kernel::Matmul,

        OpKind::Sum => Kernel::Reduce(ReduceKind::Sum),
        OpKind::Mean => Kernel::Reduce(ReduceKind::Mean),

        OpKind::Squeeze | OpKind::Unsqueeze => Kernel::View,

        OpKind::MaxPool2d => {
            Kernel::MaxPool2d(Pool2dGeom::resolve(node.inputs[0].shape(), &node.attrs)?)
        }

        OpKind::Conv2d => Kernel::Conv2d(Conv2dGeom::resolve(
            node.inputs[0].shape(),
            node.inputs[1].shape(),
            node.inputs.len() == 3,
            &node.attrs,
        )?),

        OpKind::Concat => {
            let shapes: Vec<_> = node.inputs.iter().map(|s| s.shape()).collect();
            Kernel::Concat(ConcatGeom::resolve(&shapes, &node.attrs)?)
        }
    };

    let output = match node.outputs.as_slice() {
        [out] => out.clone(),
        other => {
            return Err(Error::msg(format!(
                "{}: expected exactly one output symbol, got {}",
                node.op.name(),
                other.len()
            )))
        }
    };

    Ok(Step {
        op: node.op,
        kernel,
        inputs: node.inputs.clone(),
        output,
    })
}
