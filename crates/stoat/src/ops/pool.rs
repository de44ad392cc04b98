use stoat_core::op::{attr_pair_or, conv2d_out_dims};
use stoat_core::{Attrs, Elem, Result, Shape, Tensor};

// 2-D max pooling over [N, C, H, W]
//
// Each output cell scans a kernel_size window (spread by dilation) starting
// at (x·stride − padding). Cells outside the input contribute an implicit
// −∞: an entirely padded window therefore produces −∞ and deposits no
// gradient. Ties resolve to the first scanned index, row-major over the
// kernel taps.

/// Pre-resolved pooling geometry for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pool2dGeom {
    pub n: usize,
    pub c: usize,
    pub h: usize,
    pub w: usize,
    pub oh: usize,
    pub ow: usize,
    pub kernel: [usize; 2],
    pub stride: [usize; 2],
    pub padding: [usize; 2],
    pub dilation: [usize; 2],
}

impl Pool2dGeom {
    /// Resolve attributes against the input shape. `stride` defaults to
    /// `kernel_size`, `padding` to (0,0), `dilation` to (1,1).
    pub fn resolve(input: &Shape, attrs: &Attrs) -> Result<Self> {
        let d = input.dims();
        let kernel = attrs.require("maxpool2d", "kernel_size")?.as_pair("kernel_size")?;
        let stride = attr_pair_or(attrs, "stride", kernel)?;
        let padding = attr_pair_or(attrs, "padding", [0, 0])?;
        let dilation = attr_pair_or(attrs, "dilation", [1, 1])?;
        let (oh, ow) = conv2d_out_dims(d[2], d[3], kernel, padding, stride, dilation)?;
        Ok(Pool2dGeom {
            n: d[0],
            c: d[1],
            h: d[2],
            w: d[3],
            oh,
            ow,
            kernel,
            stride,
            padding,
            dilation,
        })
    }
}

/// Scan one window; returns (max value, flat argmax) with the argmax absent
/// when every tap fell into the padding.
#[inline]
fn scan_window(x: &Tensor, g: &Pool2dGeom, ni: usize, ci: usize, ox: usize, oy: usize) -> (Elem, Option<usize>) {
    let [kh, kw] = g.kernel;
    let [sh, sw] = g.stride;
    let [ph, pw] = g.padding;
    let [dh, dw] = g.dilation;

    let mut best = Elem::NEG_INFINITY;
    let mut best_idx = None;
    for kx in 0..kh {
        for ky in 0..kw {
            let ih = (ox * sh + kx * dh) as isize - ph as isize;
            let iw = (oy * sw + ky * dw) as isize - pw as isize;
            if ih >= 0 && ih < g.h as isize && iw >= 0 && iw < g.w as isize {
                let idx = ((ni * g.c + ci) * g.h + ih as usize) * g.w + iw as usize;
                let v = x.get(idx);
                // Strict > keeps the first scanned index on ties.
                if v > best || best_idx.is_none() {
                    best = v;
                    best_idx = Some(idx);
                }
            }
        }
    }
    (best, best_idx)
}

pub fn maxpool2d_forward(out: &mut Tensor, x: &Tensor, g: &Pool2dGeom) {
    for ni in 0..g.n {
        for ci in 0..g.c {
            for ox in 0..g.oh {
                for oy in 0..g.ow {
                    let (best, _) = scan_window(x, g, ni, ci, ox, oy);
                    let out_idx = ((ni * g.c + ci) * g.oh + ox) * g.ow + oy;
                    out.set(out_idx, best);
                }
            }
        }
    }
}

/// Rescan each window, locate the argmax, and deposit the upstream gradient
/// there. Overlapping windows sum into the same input cell.
pub fn maxpool2d_backward(ug: &Tensor, x: &Tensor, g: &Pool2dGeom) -> Tensor {
    let mut grad = Tensor::zeros(x.shape().clone());
    for ni in 0..g.n {
        for ci in 0..g.c {
            for ox in 0..g.oh {
                for oy in 0..g.ow {
                    let (_, best_idx) = scan_window(x, g, ni, ci, ox, oy);
                    if let Some(idx) = best_idx {
                        let out_idx = ((ni * g.c + ci) * g.oh + ox) * g.ow + oy;
                        let v = grad.get(idx) + ug.get(out_idx);
                        grad.set(idx, v);
                    }
                }
            }
        }
    }
    grad
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geom(input: &Shape, attrs: Attrs) -> Pool2dGeom {
        Pool2dGeom::resolve(input, &attrs).unwrap()
    }

    #[test]
    fn test_pool_2x2_window() {
        let x = Tensor::from_slice(&[1.0, 2.0, 3.0, 4.0], (1, 1, 2, 2)).unwrap();
        let attrs = Attrs::new()
            .with("kernel_size", (2usize, 2usize))
            .with("stride", (1usize, 1usize));
        let g = geom(x.shape(), attrs);
        assert_eq!((g.oh, g.ow), (1, 1));

        let mut out = Tensor::zeros((1, 1, 1, 1));
        maxpool2d_forward(&mut out, &x, &g);
        assert_eq!(out.to_vec(), vec![4.0]);

        let ug = Tensor::from_slice(&[1.0], (1, 1, 1, 1)).unwrap();
        let grad = maxpool2d_backward(&ug, &x, &g);
        assert_eq!(grad.to_vec(), vec![0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_tie_takes_first_scanned() {
        let x = Tensor::from_slice(&[5.0, 5.0, 5.0, 5.0], (1, 1, 2, 2)).unwrap();
        let attrs = Attrs::new().with("kernel_size", (2usize, 2usize));
        let g = geom(x.shape(), attrs);
        let ug = Tensor::from_slice(&[1.0], (1, 1, 1, 1)).unwrap();
        let grad = maxpool2d_backward(&ug, &x, &g);
        assert_eq!(grad.to_vec(), vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_overlapping_windows_sum() {
        // 1x3 input, kernel 1x2, stride 1: both windows pick the middle 9.
        let x = Tensor::from_slice(&[1.0, 9.0, 2.0], (1, 1, 1, 3)).unwrap();
        let attrs = Attrs::new()
            .with("kernel_size", (1usize, 2usize))
            .with("stride", (1usize, 1usize));
        let g = geom(x.shape(), attrs);
        assert_eq!((g.oh, g.ow), (1, 2));

        let ug = Tensor::from_slice(&[1.0, 1.0], (1, 1, 1, 2)).unwrap();
        let grad = maxpool2d_backward(&ug, &x, &g);
        assert_eq!(grad.to_vec(), vec![0.0, 2.0, 0.0]);
    }

    #[test]
    fn test_all_padded_window_is_neg_infinity() {
        // Stride jumps the second window entirely into padding.
        let x = Tensor::from_slice(&[7.0], (1, 1, 1, 1)).unwrap();
        let attrs = Attrs::new()
            .with("kernel_size", (1usize, 1usize))
            .with("stride", (2usize, 2usize))
            .with("padding", (0usize, 2usize));
        let g = geom(x.shape(), attrs);
        assert_eq!((g.oh, g.ow), (1, 3));

        let mut out = Tensor::zeros((1, 1, 1, 3));
        maxpool2d_forward(&mut out, &x, &g);
        let v = out.to_vec();
        assert_eq!(v[1], 7.0);
        assert!(v[0] == Elem::NEG_INFINITY && v[2] == Elem::NEG_INFINITY);

        // Padded windows deposit no gradient.
        let ug = Tensor::from_slice(&[1.0, 1.0, 1.0], (1, 1, 1, 3)).unwrap();
        let grad = maxpool2d_backward(&ug, &x, &g);
        assert_eq!(grad.to_vec(), vec![1.0]);
    }

    #[test]
    fn test_dilated_window() {
        // Kernel 2 with dilation 2 reads taps 0 and 2.
        let x = Tensor::from_slice(&[1.0, 9.0, 3.0], (1, 1, 1, 3)).unwrap();
        let attrs = Attrs::new()
            .with("kernel_size", (1usize, 2usize))
            .with("dilation", (1usize, 2usize))
            .with("stride", (1usize, 1usize));
        let g = geom(x.shape(), attrs);
        assert_eq!((g.oh, g.ow), (1, 1));

        let mut out = Tensor::zeros((1, 1, 1, 1));
        maxpool2d_forward(&mut out, &x, &g);
        assert_eq!(out.to_vec(), vec![3.0]);
    }
}
