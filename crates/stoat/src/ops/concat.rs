use stoat_core::{Attrs, Result, Shape, Symbol, TensorStore};

// Concat — the dynamic (variable-arity) operator
//
// Unlike the static kernels, concat receives the arena and the node's
// symbol lists and indexes the slots itself. Slicing treats every tensor as
// [outer, extent_at_dim, inner] blocks; forward packs the per-input blocks
// into the output, backward slices the upstream gradient back out and
// accumulates it into the target gradient slot in place.

/// Pre-resolved concat geometry for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatGeom {
    pub dim: usize,
    /// Product of output extents before `dim`.
    pub outer: usize,
    /// Product of output extents after `dim`.
    pub inner: usize,
    /// Each input's extent at `dim`, in slot order.
    pub sizes: Vec<usize>,
    /// Output extent at `dim` (sum of `sizes`).
    pub total: usize,
}

impl ConcatGeom {
    pub fn resolve(inputs: &[&Shape], attrs: &Attrs) -> Result<Self> {
        let dim = attrs.require("concat", "dim")?.as_usize("dim")?;
        let first = inputs[0];
        let outer: usize = first.dims()[..dim].iter().product();
        let inner: usize = first.dims()[dim + 1..].iter().product();
        let sizes: Vec<usize> = inputs.iter().map(|s| s.dims()[dim]).collect();
        let total = sizes.iter().sum();
        Ok(ConcatGeom {
            dim,
            outer,
            inner,
            sizes,
            total,
        })
    }
}

pub fn concat_forward(
    store: &mut TensorStore,
    inputs: &[Symbol],
    output: &Symbol,
    g: &ConcatGeom,
) -> Result<()> {
    let mut out = store.take(output)?;
    let result = (|| -> Result<()> {
        let mut offset = 0usize;
        for (slot, sym) in inputs.iter().enumerate() {
            let src = store.get(sym)?;
            let sz = g.sizes[slot];
            for o in 0..g.outer {
                let s = &src.data()[o * sz * g.inner..(o * sz + sz) * g.inner];
                let dst_start = (o * g.total + offset) * g.inner;
                out.data_mut()[dst_start..dst_start + sz * g.inner].copy_from_slice(s);
            }
            offset += sz;
        }
        Ok(())
    })();
    store.restore(output, out);
    result
}

/// Accumulate the slice of the upstream gradient belonging to input `slot`
/// into that input's gradient tensor.
pub fn concat_backward(
    grads: &mut TensorStore,
    inputs: &[Symbol],
    output: &Symbol,
    slot: usize,
    g: &ConcatGeom,
) -> Result<()> {
    let ug = grads.take(output)?;
    let result = (|| -> Result<()> {
        let target = grads.get_mut(&inputs[slot])?;
        let offset: usize = g.sizes[..slot].iter().sum();
        let sz = g.sizes[slot];
        for o in 0..g.outer {
            let src_start = (o * g.total + offset) * g.inner;
            let src = &ug.data()[src_start..src_start + sz * g.inner];
            let dst = &mut target.data_mut()[o * sz * g.inner..(o * sz + sz) * g.inner];
            for (d, s) in dst.iter_mut().zip(src.iter()) {
                *d += *s;
            }
        }
        Ok(())
    })();
    grads.restore(output, ug);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use stoat_core::{Graph, OpKind, Tensor};

    #[test]
    fn test_concat_dim1_roundtrip() {
        let mut graph = Graph::new();
        let a = graph.input_trainable((2, 2));
        let b = graph.input_trainable((2, 3));
        let out = graph
            .op(OpKind::Concat, &[&a, &b], Attrs::new().with("dim", 1usize))
            .unwrap();

        let mut store = TensorStore::new();
        store
            .append(&a, Tensor::from_slice(&[1.0, 2.0, 3.0, 4.0], (2, 2)).unwrap())
            .unwrap();
        store
            .append(
                &b,
                Tensor::from_slice(&[5.0, 6.0, 7.0, 8.0, 9.0, 10.0], (2, 3)).unwrap(),
            )
            .unwrap();
        store.append(&out, Tensor::zeros((2, 5))).unwrap();

        let shapes = [a.shape(), b.shape()];
        let attrs = Attrs::new().with("dim", 1usize);
        let g = ConcatGeom::resolve(&shapes, &attrs).unwrap();
        let syms = vec![a.clone(), b.clone()];
        concat_forward(&mut store, &syms, &out, &g).unwrap();
        assert_eq!(
            store.get(&out).unwrap().to_vec(),
            vec![1.0, 2.0, 5.0, 6.0, 7.0, 3.0, 4.0, 8.0, 9.0, 10.0]
        );

        // Backward: slice the upstream back out per slot and accumulate.
        let mut grads = TensorStore::new();
        grads.append(&a, Tensor::zeros((2, 2))).unwrap();
        grads.append(&b, Tensor::zeros((2, 3))).unwrap();
        let ug: Vec<_> = (1..=10).map(|i| i as stoat_core::Elem).collect();
        grads
            .append(&out, Tensor::from_vec(ug, (2, 5)).unwrap())
            .unwrap();

        concat_backward(&mut grads, &syms, &out, 0, &g).unwrap();
        concat_backward(&mut grads, &syms, &out, 1, &g).unwrap();
        assert_eq!(grads.get(&a).unwrap().to_vec(), vec![1.0, 2.0, 6.0, 7.0]);
        assert_eq!(
            grads.get(&b).unwrap().to_vec(),
            vec![3.0, 4.0, 5.0, 8.0, 9.0, 10.0]
        );
    }
}
