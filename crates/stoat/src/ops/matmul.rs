use stoat_core::{Elem, Tensor};

// Matmul — rank-2 matrix product and its gradient products
//
// Three GEMM variants cover forward and both backward slots; all of them
// accumulate into `out`, so callers zero the destination when they want a
// plain product.
//
//   forward:        C[m,n]      += A[m,k]  · B[k,n]
//   grad wrt lhs:   dA[m,k]     += ug[m,n] · Bᵀ
//   grad wrt rhs:   dB[k,n]     += Aᵀ      · ug[m,n]

/// `out[m×n] += a[m×k] · b[k×n]`
///
/// Every product is accumulated, including zero operands: `0 · ∞` and
/// `0 · NaN` must surface as NaN in the sum per IEEE semantics.
pub(crate) fn gemm(a: &[Elem], b: &[Elem], out: &mut [Elem], m: usize, n: usize, k: usize) {
    for i in 0..m {
        for t in 0..k {
            let av = a[i * k + t];
            let brow = &b[t * n..(t + 1) * n];
            let orow = &mut out[i * n..(i + 1) * n];
            for j in 0..n {
                orow[j] += av * brow[j];
            }
        }
    }
}

/// `out[m×n] += a[m×k] · b[n×k]ᵀ`
pub(crate) fn gemm_a_bt(a: &[Elem], b: &[Elem], out: &mut [Elem], m: usize, n: usize, k: usize) {
    for i in 0..m {
        let arow = &a[i * k..(i + 1) * k];
        for j in 0..n {
            let brow = &b[j * k..(j + 1) * k];
            let mut acc = 0.0;
            for t in 0..k {
                acc += arow[t] * brow[t];
            }
            out[i * n + j] += acc;
        }
    }
}

/// `out[m×n] += a[k×m]ᵀ · b[k×n]`
pub(crate) fn gemm_at_b(a: &[Elem], b: &[Elem], out: &mut [Elem], m: usize, n: usize, k: usize) {
    for t in 0..k {
        let arow = &a[t * m..(t + 1) * m];
        let brow = &b[t * n..(t + 1) * n];
        for i in 0..m {
            let av = arow[i];
            let orow = &mut out[i * n..(i + 1) * n];
            for j in 0..n {
                orow[j] += av * brow[j];
            }
        }
    }
}

pub fn matmul_forward(out: &mut Tensor, a: &Tensor, b: &Tensor) {
    let (m, k) = (a.dims()[0], a.dims()[1]);
    let n = b.dims()[1];
    out.fill(0.0);
    gemm(a.data(), b.data(), out.data_mut(), m, n, k);
}

/// Gradient for input `slot` (0 = lhs, 1 = rhs).
pub fn matmul_backward(slot: usize, ug: &Tensor, a: &Tensor, b: &Tensor) -> Tensor {
    let (m, k) = (a.dims()[0], a.dims()[1]);
    let n = b.dims()[1];
    if slot == 0 {
        let mut grad = Tensor::zeros((m, k));
        gemm_a_bt(ug.data(), b.data(), grad.data_mut(), m, k, n);
        grad
    } else {
        let mut grad = Tensor::zeros((k, n));
        gemm_at_b(a.data(), ug.data(), grad.data_mut(), k, n, m);
        grad
    }
}
