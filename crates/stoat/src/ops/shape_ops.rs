use stoat_core::{Shape, Tensor};

// Squeeze / Unsqueeze kernels — pure view reinterpretation.
//
// The output shape was computed at graph build time; element count never
// changes, so forward and backward are plain buffer copies under the
// respective shapes.

pub fn copy_forward(out: &mut Tensor, x: &Tensor) {
    out.data_mut().copy_from_slice(x.data());
}

/// The gradient of a reshape: same bytes as the upstream gradient, under
/// the original input shape.
pub fn copy_backward(ug: &Tensor, input_shape: &Shape) -> Tensor {
    let mut grad = Tensor::zeros(input_shape.clone());
    grad.data_mut().copy_from_slice(ug.data());
    grad
}
