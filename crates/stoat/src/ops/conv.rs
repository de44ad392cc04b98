use stoat_core::op::{attr_pair_or, conv2d_out_dims};
use stoat_core::{Attrs, Result, Shape, Tensor};

// 2-D convolution — input [N, C_in, H, W], weight [C_out, C_in, kH, kW],
// optional bias [C_out], output [N, C_out, oH, oW].
//
//   output[n,co,ox,oy] = bias[co] + Σ_{ci,kx,ky}
//       input[n, ci, ox·sh + kx·dh − ph, oy·sw + ky·dw − pw] · weight[co,ci,kx,ky]
//
// with taps outside the input skipped (zero padding). The same tap walk
// drives all three gradients:
//
//   grad_input  += ug[n,co,ox,oy] · weight[co,ci,kx,ky]
//   grad_weight += ug[n,co,ox,oy] · input[...]
//   grad_bias   += ug[n,co,ox,oy]

/// Pre-resolved convolution geometry for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conv2dGeom {
    pub n: usize,
    pub c_in: usize,
    pub h: usize,
    pub w: usize,
    pub c_out: usize,
    pub kh: usize,
    pub kw: usize,
    pub oh: usize,
    pub ow: usize,
    pub stride: [usize; 2],
    pub padding: [usize; 2],
    pub dilation: [usize; 2],
    pub has_bias: bool,
}

impl Conv2dGeom {
    /// Resolve attributes against the input and weight shapes. `stride`
    /// defaults to (1,1), `padding` to (0,0), `dilation` to (1,1).
    pub fn resolve(input: &Shape, weight: &Shape, has_bias: bool, attrs: &Attrs) -> Result<Self> {
        let d = input.dims();
        let wd = weight.dims();
        let stride = attr_pair_or(attrs, "stride", [1, 1])?;
        let padding = attr_pair_or(attrs, "padding", [0, 0])?;
        let dilation = attr_pair_or(attrs, "dilation", [1, 1])?;
        let (oh, ow) = conv2d_out_dims(d[2], d[3], [wd[2], wd[3]], padding, stride, dilation)?;
        Ok(Conv2dGeom {
            n: d[0],
            c_in: d[1],
            h: d[2],
            w: d[3],
            c_out: wd[0],
            kh: wd[2],
            kw: wd[3],
            oh,
            ow,
            stride,
            padding,
            dilation,
            has_bias,
        })
    }
}

/// Walk every (output cell, tap) pair that lands inside the input, calling
/// `f(out_idx, in_idx, w_idx)` with the three flat offsets.
#[inline]
fn for_each_tap(g: &Conv2dGeom, mut f: impl FnMut(usize, usize, usize)) {
    let [sh, sw] = g.stride;
    let [ph, pw] = g.padding;
    let [dh, dw] = g.dilation;
    for ni in 0..g.n {
        for co in 0..g.c_out {
            for ox in 0..g.oh {
                for oy in 0..g.ow {
                    let out_idx = ((ni * g.c_out + co) * g.oh + ox) * g.ow + oy;
                    for ci in 0..g.c_in {
                        for kx in 0..g.kh {
                            for ky in 0..g.kw {
                                let ih = (ox * sh + kx * dh) as isize - ph as isize;
                                let iw = (oy * sw + ky * dw) as isize - pw as isize;
                                if ih < 0 || ih >= g.h as isize || iw < 0 || iw >= g.w as isize {
                                    continue;
                                }
                                let in_idx = ((ni * g.c_in + ci) * g.h + ih as usize) * g.w
                                    + iw as usize;
                                let w_idx = ((co * g.c_in + ci) * g.kh + kx) * g.kw + ky;
                                f(out_idx, in_idx, w_idx);
                            }
                        }
                    }
                }
            }
        }
    }
}

pub fn conv2d_forward(out: &mut Tensor, x: &Tensor, weight: &Tensor, bias: Option<&Tensor>, g: &Conv2dGeom) {
    match bias {
        Some(b) => {
            // Seed every output cell of channel co with bias[co].
            for ni in 0..g.n {
                for co in 0..g.c_out {
                    let base = (ni * g.c_out + co) * g.oh * g.ow;
                    let v = b.get(co);
                    for cell in &mut out.data_mut()[base..base + g.oh * g.ow] {
                        *cell = v;
                    }
                }
            }
        }
        None => out.fill(0.0),
    }
    for_each_tap(g, |out_idx, in_idx, w_idx| {
        let v = out.get(out_idx) + x.get(in_idx) * weight.get(w_idx);
        out.set(out_idx, v);
    });
}

/// Gradient for input `slot` (0 = input, 1 = weight, 2 = bias).
pub fn conv2d_backward(slot: usize, ug: &Tensor, x: &Tensor, weight: &Tensor, g: &Conv2dGeom) -> Tensor {
    match slot {
        0 => {
            let mut grad = Tensor::zeros(x.shape().clone());
            for_each_tap(g, |out_idx, in_idx, w_idx| {
                let v = grad.get(in_idx) + ug.get(out_idx) * weight.get(w_idx);
                grad.set(in_idx, v);
            });
            grad
        }
        1 => {
            let mut grad = Tensor::zeros(weight.shape().clone());
            for_each_tap(g, |out_idx, in_idx, w_idx| {
                let v = grad.get(w_idx) + ug.get(out_idx) * x.get(in_idx);
                grad.set(w_idx, v);
            });
            grad
        }
        _ => {
            let mut grad = Tensor::zeros(g.c_out);
            for ni in 0..g.n {
                for co in 0..g.c_out {
                    let base = (ni * g.c_out + co) * g.oh * g.ow;
                    let mut acc = 0.0;
                    for cell in &ug.data()[base..base + g.oh * g.ow] {
                        acc += *cell;
                    }
                    grad.set(co, grad.get(co) + acc);
                }
            }
            grad
        }
    }
}
