use stoat_core::{Elem, Tensor};

// Elementwise kernels — activations, clip, and binary arithmetic
//
// Forward kernels write into the pre-allocated arena output; backward
// kernels return a freshly allocated gradient shaped like the chosen input,
// which the executor accumulates into the gradient arena.

/// Shape-preserving unary activations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryKind {
    Sigmoid,
    Relu,
    Tanh,
}

/// Elementwise binary arithmetic with exactly matching shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryKind {
    Add,
    Sub,
    Mul,
}

#[inline]
fn sigmoid(v: Elem) -> Elem {
    1.0 / (1.0 + (-v).exp())
}

pub fn unary_forward(kind: UnaryKind, out: &mut Tensor, x: &Tensor) {
    match kind {
        UnaryKind::Sigmoid => out.map_into(x, sigmoid),
        // The point x = 0 maps to 0 (fixed subgradient choice).
        UnaryKind::Relu => out.map_into(x, |v| if v > 0.0 { v } else { 0.0 }),
        UnaryKind::Tanh => out.map_into(x, |v| v.tanh()),
    }
}

/// `ug · f'(x)`, recomputed from the forward input.
pub fn unary_backward(kind: UnaryKind, ug: &Tensor, x: &Tensor) -> Tensor {
    let mut grad = Tensor::zeros(x.shape().clone());
    match kind {
        // d(σ(x))/dx = σ(x)·(1 − σ(x))
        UnaryKind::Sigmoid => grad.zip_map_into(ug, x, |u, v| {
            let s = sigmoid(v);
            u * s * (1.0 - s)
        }),
        // d(relu(x))/dx = 1 if x > 0, else 0
        UnaryKind::Relu => grad.zip_map_into(ug, x, |u, v| if v > 0.0 { u } else { 0.0 }),
        // d(tanh(x))/dx = 1 − tanh²(x)
        UnaryKind::Tanh => grad.zip_map_into(ug, x, |u, v| {
            let t = v.tanh();
            u * (1.0 - t * t)
        }),
    }
    grad
}

pub fn clip_forward(out: &mut Tensor, x: &Tensor, lo: Elem, hi: Elem) {
    out.map_into(x, |v| v.clamp(lo, hi));
}

/// Gradient passes on the closed interval `lo ≤ x ≤ hi`, 0 outside.
pub fn clip_backward(ug: &Tensor, x: &Tensor, lo: Elem, hi: Elem) -> Tensor {
    let mut grad = Tensor::zeros(x.shape().clone());
    grad.zip_map_into(ug, x, |u, v| if v >= lo && v <= hi { u } else { 0.0 });
    grad
}

pub fn binary_forward(kind: BinaryKind, out: &mut Tensor, a: &Tensor, b: &Tensor) {
    match kind {
        BinaryKind::Add => out.zip_map_into(a, b, |x, y| x + y),
        BinaryKind::Sub => out.zip_map_into(a, b, |x, y| x - y),
        BinaryKind::Mul => out.zip_map_into(a, b, |x, y| x * y),
    }
}

/// Gradient for input `slot` (0 = lhs, 1 = rhs).
pub fn binary_backward(kind: BinaryKind, slot: usize, ug: &Tensor, a: &Tensor, b: &Tensor) -> Tensor {
    match (kind, slot) {
        // d(a + b)/da = d(a + b)/db = 1
        (BinaryKind::Add, _) => ug.clone(),
        // d(a − b)/da = 1, d(a − b)/db = −1
        (BinaryKind::Sub, 0) => ug.clone(),
        (BinaryKind::Sub, _) => ug.map(|u| -u),
        // d(a · b)/da = b, d(a · b)/db = a
        (BinaryKind::Mul, 0) => {
            let mut grad = Tensor::zeros(a.shape().clone());
            grad.zip_map_into(ug, b, |u, v| u * v);
            grad
        }
        (BinaryKind::Mul, _) => {
            let mut grad = Tensor::zeros(b.shape().clone());
            grad.zip_map_into(ug, a, |u, v| u * v);
            grad
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec1(data: &[Elem]) -> Tensor {
        Tensor::from_slice(data, data.len()).unwrap()
    }

    #[test]
    fn test_relu_forward_backward() {
        let x = vec1(&[-1.0, 0.0, 2.0, 3.5]);
        let mut out = Tensor::zeros(4);
        unary_forward(UnaryKind::Relu, &mut out, &x);
        assert_eq!(out.to_vec(), vec![0.0, 0.0, 2.0, 3.5]);

        let ug = vec1(&[1.0, 1.0, 1.0, 1.0]);
        let grad = unary_backward(UnaryKind::Relu, &ug, &x);
        assert_eq!(grad.to_vec(), vec![0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_sigmoid_at_zero() {
        let x = vec1(&[0.0]);
        let mut out = Tensor::zeros(1);
        unary_forward(UnaryKind::Sigmoid, &mut out, &x);
        assert!((out.get(0) - 0.5).abs() < 1e-6);

        let grad = unary_backward(UnaryKind::Sigmoid, &vec1(&[1.0]), &x);
        assert!((grad.get(0) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_tanh_derivative() {
        let x = vec1(&[0.5]);
        let grad = unary_backward(UnaryKind::Tanh, &vec1(&[1.0]), &x);
        let t = (0.5 as Elem).tanh();
        assert!((grad.get(0) - (1.0 - t * t)).abs() < 1e-6);
    }

    #[test]
    fn test_clip_closed_interval() {
        let x = vec1(&[-0.5, 0.0, 0.5, 1.0, 1.5]);
        let mut out = Tensor::zeros(5);
        clip_forward(&mut out, &x, 0.0, 1.0);
        assert_eq!(out.to_vec(), vec![0.0, 0.0, 0.5, 1.0, 1.0]);

        let ug = vec1(&[1.0; 5]);
        let grad = clip_backward(&ug, &x, 0.0, 1.0);
        // Points exactly at min/max pass the gradient (closed interval).
        assert_eq!(grad.to_vec(), vec![0.0, 1.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_clip_infinite_bounds_is_identity() {
        let x = vec1(&[-3.0, 0.0, 7.5]);
        let mut out = Tensor::zeros(3);
        clip_forward(&mut out, &x, Elem::NEG_INFINITY, Elem::INFINITY);
        assert_eq!(out.to_vec(), x.to_vec());

        let ug = vec1(&[0.1, 0.2, 0.3]);
        let grad = clip_backward(&ug, &x, Elem::NEG_INFINITY, Elem::INFINITY);
        assert_eq!(grad.to_vec(), ug.to_vec());
    }

    #[test]
    fn test_binary_mul_grads() {
        let a = vec1(&[2.0, 3.0]);
        let b = vec1(&[5.0, 7.0]);
        let ug = vec1(&[1.0, 1.0]);
        assert_eq!(binary_backward(BinaryKind::Mul, 0, &ug, &a, &b).to_vec(), vec![5.0, 7.0]);
        assert_eq!(binary_backward(BinaryKind::Mul, 1, &ug, &a, &b).to_vec(), vec![2.0, 3.0]);
    }

    #[test]
    fn test_binary_sub_grads() {
        let a = vec1(&[2.0]);
        let b = vec1(&[5.0]);
        let ug = vec1(&[3.0]);
        assert_eq!(binary_backward(BinaryKind::Sub, 0, &ug, &a, &b).to_vec(), vec![3.0]);
        assert_eq!(binary_backward(BinaryKind::Sub, 1, &ug, &a, &b).to_vec(), vec![-3.0]);
    }
}
