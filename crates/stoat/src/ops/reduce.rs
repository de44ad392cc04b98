use stoat_core::{Elem, Tensor};

// Full reductions — Sum and Mean collapse the whole input to a rank-0
// scalar. Backward broadcasts the (scalar) upstream gradient back over the
// input, divided by the element count for Mean.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceKind {
    Sum,
    Mean,
}

pub fn reduce_forward(kind: ReduceKind, out: &mut Tensor, x: &Tensor) {
    let total: Elem = x.data().iter().copied().sum();
    let v = match kind {
        ReduceKind::Sum => total,
        ReduceKind::Mean => total / x.elem_count() as Elem,
    };
    out.set(0, v);
}

pub fn reduce_backward(kind: ReduceKind, ug: &Tensor, x: &Tensor) -> Tensor {
    let u = ug.get(0);
    let v = match kind {
        ReduceKind::Sum => u,
        ReduceKind::Mean => u / x.elem_count() as Elem,
    };
    Tensor::full(x.shape().clone(), v)
}
