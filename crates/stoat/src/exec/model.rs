use stoat_core::{arena, bail, Error, Graph, Init, Result, Symbol, Tensor, TensorStore};

use crate::exec::plan::{compile, Kernel, Step};
use crate::init;
use crate::ops::{concat, conv, elementwise, matmul, pool, reduce, shape_ops};

// Model — arena allocation plus the forward/backward sweeps
//
// Constructing a Model compiles the graph once: both arenas are cleared
// (invalidating any earlier model's symbols — only one Model is usable at a
// time), every activation and gradient buffer is allocated, and each node is
// lowered to a Step with fully resolved kernel parameters. The sweeps are
// then plain indexed loops:
//
//   forward    — steps 0..N, returns the loss tensor
//   inference  — steps 0..n_inference_nodes, returns the declared outputs
//   backward   — seed the loss gradient, then steps N-1..0, accumulating
//                per-slot gradients into GRADS
//
// Static kernels receive borrowed tensors; their backward returns a fresh
// gradient which the executor adds into the target slot. The dynamic concat
// kernel indexes the arenas itself and accumulates in place.

pub struct Model {
    steps: Vec<Step>,
    inputs: Vec<Symbol>,
    outputs: Vec<Symbol>,
    loss: Option<Symbol>,
    n_inference: Option<usize>,
    inference_only: bool,
    ran_forward: bool,
    #[cfg(feature = "profile")]
    metrics: crate::metrics::Metrics,
}

impl Model {
    /// Build a training model: activations and gradients are allocated.
    pub fn new(graph: &Graph) -> Result<Self> {
        Self::build(graph, false)
    }

    /// Build an inference-only model: no gradient arena entries, and
    /// `backward` is disabled.
    pub fn new_inference(graph: &Graph) -> Result<Self> {
        Self::build(graph, true)
    }

    fn build(graph: &Graph, inference_only: bool) -> Result<Self> {
        // Symbol ids restart here; any symbols minted for an earlier graph
        // are invalid from this point on.
        arena::clear_all();

        {
            let mut store = arena::tensors();
            for sym in graph.inputs() {
                store.append(sym, Tensor::zeros(sym.shape().clone()))?;
            }
            for entry in graph.params() {
                let sym = &entry.symbol;
                let tensor = match &entry.init {
                    Init::Named(spec) => {
                        let mut t = Tensor::zeros(sym.shape().clone());
                        init::initialize(&mut t, spec)?;
                        t
                    }
                    Init::Data(data) => Tensor::from_vec(data.clone(), sym.shape().clone())?,
                    Init::Zeros => Tensor::zeros(sym.shape().clone()),
                };
                store.append(sym, tensor)?;
            }
            for node in graph.nodes() {
                for out in &node.outputs {
                    store.append(out, Tensor::zeros(out.shape().clone()))?;
                }
            }
        }

        if !inference_only {
            // One gradient buffer per trainable symbol; non-trainable
            // symbols never get an entry.
            let mut grads = arena::grads();
            for sym in graph.inputs() {
                if sym.trainable() {
                    grads.append(sym, Tensor::zeros(sym.shape().clone()))?;
                }
            }
            for entry in graph.params() {
                if entry.symbol.trainable() {
                    grads.append(&entry.symbol, Tensor::zeros(entry.symbol.shape().clone()))?;
                }
            }
            for node in graph.nodes() {
                for out in &node.outputs {
                    if out.trainable() {
                        grads.append(out, Tensor::zeros(out.shape().clone()))?;
                    }
                }
            }
        }

        let steps = compile(graph)?;
        let loss = graph.loss_symbol().cloned();
        let n_inference = graph.n_inference_nodes();

        if loss.is_none() && !inference_only {
            eprintln!("stoat: warning: graph has no loss output; forward() is disabled");
        }
        if n_inference.is_none() {
            eprintln!(
                "stoat: warning: no graph output is produced by a node; inference() is disabled"
            );
        }

        #[cfg(feature = "profile")]
        let metrics = {
            let names: Vec<&'static str> = steps.iter().map(|s| s.op.name()).collect();
            crate::metrics::Metrics::new(&names)
        };

        Ok(Model {
            steps,
            inputs: graph.inputs().to_vec(),
            outputs: graph.outputs().to_vec(),
            loss,
            n_inference,
            inference_only,
            ran_forward: false,
            #[cfg(feature = "profile")]
            metrics,
        })
    }

    /// Run all nodes and return the loss tensor. Requires a loss output.
    pub fn forward(&mut self, inputs: &[Tensor]) -> Result<Tensor> {
        let loss = self
            .loss
            .clone()
            .ok_or_else(|| Error::msg("forward: graph has no loss output"))?;
        let n = self.steps.len();
        self.run(inputs, n)?;
        self.ran_forward = true;
        let store = arena::tensors();
        Ok(store.get(&loss)?.clone())
    }

    /// Run the shortest node prefix that produces every declared output and
    /// return those outputs in declaration order.
    pub fn inference(&mut self, inputs: &[Tensor]) -> Result<Vec<Tensor>> {
        let k = self.n_inference.ok_or_else(|| {
            Error::msg("inference: no graph output is produced by a node")
        })?;
        self.run(inputs, k)?;
        let store = arena::tensors();
        self.outputs.iter().map(|s| Ok(store.get(s)?.clone())).collect()
    }

    fn run(&mut self, inputs: &[Tensor], k: usize) -> Result<()> {
        if inputs.len() != self.inputs.len() {
            bail!(
                "expected {} input tensor(s), got {}",
                self.inputs.len(),
                inputs.len()
            );
        }
        let mut store = arena::tensors();
        for (sym, tensor) in self.inputs.iter().zip(inputs) {
            // copy_from enforces the declared shape.
            store.get_mut(sym)?.copy_from(tensor)?;
        }
        for (_i, step) in self.steps[..k].iter().enumerate() {
            #[cfg(feature = "profile")]
            let start = std::time::Instant::now();
            exec_forward(step, &mut store)?;
            #[cfg(feature = "profile")]
            self.metrics.record_forward(_i, start.elapsed());
        }
        Ok(())
    }

    /// Reverse sweep. Seeds the loss gradient from `upper_grad` (or ones),
    /// then accumulates per-slot gradients for every trainable input.
    pub fn backward(&mut self, upper_grad: Option<&Tensor>) -> Result<()> {
        if self.inference_only {
            bail!("backward: model was built inference-only");
        }
        let loss = self
            .loss
            .clone()
            .ok_or_else(|| Error::msg("backward: graph has no loss output"))?;
        if !self.ran_forward {
            bail!("backward: requires a prior forward()");
        }
        if !loss.trainable() {
            bail!("backward: loss does not depend on any trainable symbol");
        }

        // Lock order: TENSORS before GRADS, as everywhere.
        let tensors = arena::tensors();
        let mut grads = arena::grads();

        {
            let seed = grads.get_mut(&loss)?;
            match upper_grad {
                Some(u) => seed.copy_from(u)?,
                None => seed.fill(1.0),
            }
        }

        for (_i, step) in self.steps.iter().enumerate().rev() {
            #[cfg(feature = "profile")]
            let start = std::time::Instant::now();
            exec_backward(step, &tensors, &mut grads)?;
            #[cfg(feature = "profile")]
            self.metrics.record_backward(_i, start.elapsed());
        }
        Ok(())
    }

    /// Refill every gradient buffer with zeros (between optimizer steps).
    pub fn zero_grads(&mut self) {
        arena::grads().fill_all(0.0);
    }

    /// Clone the accumulated gradient of a trainable symbol.
    pub fn grad(&self, sym: &Symbol) -> Result<Tensor> {
        Ok(arena::grads().get(sym)?.clone())
    }

    /// The node-prefix length executed by `inference`, when defined.
    pub fn n_inference_nodes(&self) -> Option<usize> {
        self.n_inference
    }

    /// Per-node timing report (profile builds only).
    #[cfg(feature = "profile")]
    pub fn profile_report(&self) -> crate::metrics::Report {
        self.metrics.report()
    }
}

// Forward dispatch: dynamic kernels index the store; static kernels get the
// output moved out of its slot so inputs can be borrowed alongside it.
fn exec_forward(step: &Step, store: &mut TensorStore) -> Result<()> {
    if let Kernel::Concat(geom) = &step.kernel {
        return concat::concat_forward(store, &step.inputs, &step.output, geom);
    }
    let mut out = store.take(&step.output)?;
    let result = static_forward(step, store, &mut out);
    store.restore(&step.output, out);
    result
}

fn static_forward(step: &Step, store: &TensorStore, out: &mut Tensor) -> Result<()> {
    match &step.kernel {
        Kernel::Unary(kind) => {
            let x = store.get(&step.inputs[0])?;
            elementwise::unary_forward(*kind, out, x);
        }
        Kernel::Clip { lo, hi } => {
            let x = store.get(&step.inputs[0])?;
            elementwise::clip_forward(out, x, *lo, *hi);
        }
        Kernel::Binary(kind) => {
            let a = store.get(&step.inputs[0])?;
            let b = store.get(&step.inputs[1])?;
            elementwise::binary_forward(*kind, out, a, b);
        }
        Kernel::Matmul => {
            let a = store.get(&step.inputs[0])?;
            let b = store.get(&step.inputs[1])?;
            matmul::matmul_forward(out, a, b);
        }
        Kernel::Reduce(kind) => {
            let x = store.get(&step.inputs[0])?;
            reduce::reduce_forward(*kind, out, x);
        }
        Kernel::View => {
            let x = store.get(&step.inputs[0])?;
            shape_ops::copy_forward(out, x);
        }
        Kernel::Conv2d(geom) => {
            let x = store.get(&step.inputs[0])?;
            let w = store.get(&step.inputs[1])?;
            let bias = match step.inputs.get(2) {
                Some(sym) => Some(store.get(sym)?),
                None => None,
            };
            conv::conv2d_forward(out, x, w, bias, geom);
        }
        Kernel::MaxPool2d(geom) => {
            let x = store.get(&step.inputs[0])?;
            pool::maxpool2d_forward(out, x, geom);
        }
        Kernel::Concat(_) => unreachable!("concat dispatches through the dynamic path"),
    }
    Ok(())
}

// Backward dispatch. A node whose output is non-trainable has no gradient
// flowing through it and is skipped entirely.
fn exec_backward(step: &Step, tensors: &TensorStore, grads: &mut TensorStore) -> Result<()> {
    if !step.output.trainable() {
        return Ok(());
    }
    if let Kernel::Concat(geom) = &step.kernel {
        for (slot, sym) in step.inputs.iter().enumerate() {
            if sym.trainable() {
                concat::concat_backward(grads, &step.inputs, &step.output, slot, geom)?;
            }
        }
        return Ok(());
    }

    let ug = grads.take(&step.output)?;
    let result = (|| -> Result<()> {
        for (slot, sym) in step.inputs.iter().enumerate() {
            if !sym.trainable() {
                continue;
            }
            let grad = static_backward(step, slot, &ug, tensors)?;
            grads.get_mut(sym)?.add_assign(&grad)?;
        }
        Ok(())
    })();
    grads.restore(&step.output, ug);
    result
}

fn static_backward(step: &Step, slot: usize, ug: &Tensor, tensors: &TensorStore) -> Result<Tensor> {
    match &step.kernel {
        Kernel::Unary(kind) => {
            let x = tensors.get(&step.inputs[0])?;
            Ok(elementwise::unary_backward(*kind, ug, x))
        }
        Kernel::Clip { lo, hi } => {
            let x = tensors.get(&step.inputs[0])?;
            Ok(elementwise::clip_backward(ug, x, *lo, *hi))
        }
        Kernel::Binary(kind) => {
            let a = tensors.get(&step.inputs[0])?;
            let b = tensors.get(&step.inputs[1])?;
            Ok(elementwise::binary_backward(*kind, slot, ug, a, b))
        }
        Kernel::Matmul => {
            let a = tensors.get(&step.inputs[0])?;
            let b = tensors.get(&step.inputs[1])?;
            Ok(matmul::matmul_backward(slot, ug, a, b))
        }
        Kernel::Reduce(kind) => {
            let x = tensors.get(&step.inputs[0])?;
            Ok(reduce::reduce_backward(*kind, ug, x))
        }
        Kernel::View => Ok(shape_ops::copy_backward(ug, step.inputs[0].shape())),
        Kernel::Conv2d(geom) => {
            let x = tensors.get(&step.inputs[0])?;
            let w = tensors.get(&step.inputs[1])?;
            Ok(conv::conv2d_backward(slot, ug, x, w, geom))
        }
        Kernel::MaxPool2d(geom) => {
            let x = tensors.get(&step.inputs[0])?;
            Ok(pool::maxpool2d_backward(ug, x, geom))
        }
        Kernel::Concat(_) => unreachable!("concat dispatches through the dynamic path"),
    }
}
