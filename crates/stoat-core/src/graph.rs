use std::collections::HashSet;

use crate::bail;
use crate::attr::Attrs;
use crate::dtype::Elem;
use crate::error::{Error, Result};
use crate::op::OpKind;
use crate::shape::Shape;
use crate::symbol::{Symbol, SymbolKind};

// Graph — the static computation graph
//
// A Graph is built once, before any execution: declare inputs and
// parameters, append operator nodes, and mark the outputs and (optionally)
// the loss. Nodes form a DAG by construction — `op` only accepts symbols the
// graph has already minted and always mints fresh output symbols, so a
// symbol can never be produced twice or consumed before it exists.
//
// The graph itself holds no tensor data. Buffers are allocated into the
// arenas when a Model is constructed from the graph.

/// Named weight-initialization strategies for parameters.
///
/// Fan-in/fan-out follow the usual conventions: 1-D is (d, d), 2-D is
/// (cols, rows), higher ranks treat trailing dims as the receptive field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Initializer {
    Ones,
    Uniform { low: f64, high: f64 },
    Normal { mean: f64, std: f64 },
    XavierUniform,
    XavierNormal,
    KaimingUniform,
    KaimingNormal,
}

/// How a parameter tensor gets its initial value. Priority at model
/// construction: a named initializer first, explicit data second, zeros
/// otherwise.
#[derive(Debug, Clone)]
pub enum Init {
    Zeros,
    Data(Vec<Elem>),
    Named(Initializer),
}

/// One parameter record: the symbol plus its init spec.
#[derive(Debug, Clone)]
pub struct ParamEntry {
    pub symbol: Symbol,
    pub init: Init,
}

/// One operator application: `(operator, attributes, inputs, outputs)`.
#[derive(Debug, Clone)]
pub struct Node {
    pub op: OpKind,
    pub attrs: Attrs,
    pub inputs: Vec<Symbol>,
    pub outputs: Vec<Symbol>,
}

/// The static computation graph: inputs, parameter table, node list,
/// declared outputs, and the optional loss marker.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    inputs: Vec<Symbol>,
    params: Vec<ParamEntry>,
    nodes: Vec<Node>,
    outputs: Vec<Symbol>,
    loss: Option<Symbol>,
    /// Ids of every symbol minted by this graph, for membership checks.
    known: HashSet<u32>,
}

impl Graph {
    pub fn new() -> Self {
        Graph::default()
    }

    /// Declare a graph input. Inputs are fed positionally to
    /// `forward`/`inference` in declaration order.
    pub fn input(&mut self, shape: impl Into<Shape>) -> Symbol {
        self.add_input(shape.into(), false)
    }

    /// Declare a graph input that accumulates a gradient during backward.
    pub fn input_trainable(&mut self, shape: impl Into<Shape>) -> Symbol {
        self.add_input(shape.into(), true)
    }

    fn add_input(&mut self, shape: Shape, trainable: bool) -> Symbol {
        let sym = Symbol::new(shape, trainable, SymbolKind::Input);
        self.known.insert(sym.id());
        self.inputs.push(sym.clone());
        sym
    }

    /// Declare a trainable parameter with an init spec.
    pub fn param(&mut self, shape: impl Into<Shape>, init: Init) -> Result<Symbol> {
        self.add_param(shape.into(), init, true)
    }

    /// Declare a non-trainable (frozen) parameter.
    pub fn frozen_param(&mut self, shape: impl Into<Shape>, init: Init) -> Result<Symbol> {
        self.add_param(shape.into(), init, false)
    }

    fn add_param(&mut self, shape: Shape, init: Init, trainable: bool) -> Result<Symbol> {
        if let Init::Data(data) = &init {
            if data.len() != shape.elem_count() {
                return Err(Error::ElementCountMismatch {
                    expected: shape.elem_count(),
                    got: data.len(),
                    shape,
                });
            }
        }
        let sym = Symbol::new(shape, trainable, SymbolKind::Param);
        self.known.insert(sym.id());
        self.params.push(ParamEntry {
            symbol: sym.clone(),
            init,
        });
        Ok(sym)
    }

    /// Append an operator node. Computes the output shape from the input
    /// shapes and attributes, mints the output symbol, and returns it.
    ///
    /// The output is trainable iff any input is, so gradients can flow
    /// through it during backward.
    pub fn op(&mut self, op: OpKind, inputs: &[&Symbol], attrs: Attrs) -> Result<Symbol> {
        for s in inputs {
            if !self.known.contains(&s.id()) {
                return Err(Error::UnknownSymbol { id: s.id() });
            }
        }
        let shapes: Vec<&Shape> = inputs.iter().map(|s| s.shape()).collect();
        let out_shape = op.result_shape(&shapes, &attrs)?;
        let trainable = inputs.iter().any(|s| s.trainable());
        let out = Symbol::new(out_shape, trainable, SymbolKind::Intermediate);
        self.known.insert(out.id());
        self.nodes.push(Node {
            op,
            attrs,
            inputs: inputs.iter().map(|s| (*s).clone()).collect(),
            outputs: vec![out.clone()],
        });
        Ok(out)
    }

    /// Mark a symbol as a graph output, read back by `inference`.
    pub fn output(&mut self, sym: &Symbol) -> Result<()> {
        if !self.known.contains(&sym.id()) {
            return Err(Error::UnknownSymbol { id: sym.id() });
        }
        if self.outputs.iter().any(|s| s == sym) {
            bail!("symbol id {} already marked as graph output", sym.id());
        }
        self.outputs.push(sym.clone());
        Ok(())
    }

    /// Mark the loss output, returned by `forward`. At most one.
    pub fn loss(&mut self, sym: &Symbol) -> Result<()> {
        if !self.known.contains(&sym.id()) {
            return Err(Error::UnknownSymbol { id: sym.id() });
        }
        if self.loss.is_some() {
            return Err(Error::DuplicateLoss);
        }
        self.loss = Some(sym.clone());
        Ok(())
    }

    // Accessors

    pub fn inputs(&self) -> &[Symbol] {
        &self.inputs
    }

    pub fn params(&self) -> &[ParamEntry] {
        &self.params
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn outputs(&self) -> &[Symbol] {
        &self.outputs
    }

    pub fn loss_symbol(&self) -> Option<&Symbol> {
        self.loss.as_ref()
    }

    /// The shortest node-list prefix whose execution produces every declared
    /// graph output: scan in reverse and return i+1 for the last node whose
    /// outputs intersect them. None when no output symbol is produced by any
    /// node (inference is then disabled).
    pub fn n_inference_nodes(&self) -> Option<usize> {
        for (i, node) in self.nodes.iter().enumerate().rev() {
            if node
                .outputs
                .iter()
                .any(|o| self.outputs.iter().any(|g| g == o))
            {
                return Some(i + 1);
            }
        }
        None
    }
}
