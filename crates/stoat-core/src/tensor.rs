use crate::dtype::Elem;
use crate::error::{Error, Result};
use crate::shape::Shape;

// Tensor — a dense, contiguous, exclusively owned buffer
//
// A Tensor is a shape plus a flat row-major Vec of elements. Unlike a view
// type there is no stride/offset indirection: arena tensors are always
// contiguous and always exclusively owned, so kernels address the buffer
// with flat indices derived from Shape::stride_contiguous.
//
// Bulk elementwise work goes through `map_into` / `zip_map_into`, which walk
// the flat buffer in fixed-width chunks so the inner loops vectorize.

/// Width of the inner elementwise loop. Chunks of this size compile to
/// SIMD on every target we care about; the remainder is handled scalar.
const LANES: usize = 8;

/// A dense n-dimensional array of `Elem` values.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Shape,
    data: Vec<Elem>,
}

impl Tensor {
    /// Create a zero-filled tensor of the given shape.
    pub fn zeros(shape: impl Into<Shape>) -> Self {
        let shape = shape.into();
        let data = vec![0.0 as Elem; shape.elem_count()];
        Tensor { shape, data }
    }

    /// Create a tensor filled with a constant value.
    pub fn full(shape: impl Into<Shape>, value: Elem) -> Self {
        let shape = shape.into();
        let data = vec![value; shape.elem_count()];
        Tensor { shape, data }
    }

    /// Create a rank-0 tensor holding a single value.
    pub fn scalar(value: Elem) -> Self {
        Tensor {
            shape: Shape::scalar(),
            data: vec![value],
        }
    }

    /// Create a tensor from an owned buffer. The buffer length must match
    /// the shape's element count.
    pub fn from_vec(data: Vec<Elem>, shape: impl Into<Shape>) -> Result<Self> {
        let shape = shape.into();
        if data.len() != shape.elem_count() {
            return Err(Error::ElementCountMismatch {
                expected: shape.elem_count(),
                got: data.len(),
                shape,
            });
        }
        Ok(Tensor { shape, data })
    }

    /// Create a tensor by copying a slice.
    pub fn from_slice(data: &[Elem], shape: impl Into<Shape>) -> Result<Self> {
        Self::from_vec(data.to_vec(), shape)
    }

    // Accessors

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    pub fn elem_count(&self) -> usize {
        self.data.len()
    }

    /// The flat element buffer (row-major).
    pub fn data(&self) -> &[Elem] {
        &self.data
    }

    /// Mutable view of the flat element buffer.
    pub fn data_mut(&mut self) -> &mut [Elem] {
        &mut self.data
    }

    /// Load the element at a flat offset.
    #[inline]
    pub fn get(&self, i: usize) -> Elem {
        self.data[i]
    }

    /// Store an element at a flat offset.
    #[inline]
    pub fn set(&mut self, i: usize, v: Elem) {
        self.data[i] = v;
    }

    /// Copy the buffer out as a Vec (for inspection in tests and hosts).
    pub fn to_vec(&self) -> Vec<Elem> {
        self.data.clone()
    }

    // Bulk operations

    /// Overwrite every element with a constant.
    pub fn fill(&mut self, v: Elem) {
        for x in self.data.iter_mut() {
            *x = v;
        }
    }

    /// Copy another tensor's contents into this one. Shapes must be equal.
    pub fn copy_from(&mut self, src: &Tensor) -> Result<()> {
        if self.shape != src.shape {
            return Err(Error::ShapeMismatch {
                expected: self.shape.clone(),
                got: src.shape.clone(),
            });
        }
        self.data.copy_from_slice(&src.data);
        Ok(())
    }

    /// Elementwise transform of `src` into `self`. Both tensors must hold
    /// the same number of elements; shapes may differ (used by the view
    /// reinterpretation kernels).
    pub fn map_into(&mut self, src: &Tensor, f: impl Fn(Elem) -> Elem) {
        debug_assert_eq!(self.data.len(), src.data.len());
        let n = self.data.len();
        let chunks = n / LANES * LANES;
        let (out_head, out_tail) = self.data.split_at_mut(chunks);
        let (src_head, src_tail) = src.data.split_at(chunks);
        for (o, x) in out_head
            .chunks_exact_mut(LANES)
            .zip(src_head.chunks_exact(LANES))
        {
            for i in 0..LANES {
                o[i] = f(x[i]);
            }
        }
        for (o, x) in out_tail.iter_mut().zip(src_tail.iter()) {
            *o = f(*x);
        }
    }

    /// Elementwise combine of `a` and `b` into `self`.
    pub fn zip_map_into(&mut self, a: &Tensor, b: &Tensor, f: impl Fn(Elem, Elem) -> Elem) {
        debug_assert_eq!(self.data.len(), a.data.len());
        debug_assert_eq!(self.data.len(), b.data.len());
        let n = self.data.len();
        let chunks = n / LANES * LANES;
        let (out_head, out_tail) = self.data.split_at_mut(chunks);
        let (a_head, a_tail) = a.data.split_at(chunks);
        let (b_head, b_tail) = b.data.split_at(chunks);
        for ((o, x), y) in out_head
            .chunks_exact_mut(LANES)
            .zip(a_head.chunks_exact(LANES))
            .zip(b_head.chunks_exact(LANES))
        {
            for i in 0..LANES {
                o[i] = f(x[i], y[i]);
            }
        }
        for ((o, x), y) in out_tail.iter_mut().zip(a_tail.iter()).zip(b_tail.iter()) {
            *o = f(*x, *y);
        }
    }

    /// Allocate a new tensor by elementwise transform of `self`.
    pub fn map(&self, f: impl Fn(Elem) -> Elem) -> Tensor {
        let mut out = Tensor::zeros(self.shape.clone());
        out.map_into(self, f);
        out
    }

    /// Accumulate another tensor into this one elementwise (`self += rhs`).
    /// Shapes must be equal.
    pub fn add_assign(&mut self, rhs: &Tensor) -> Result<()> {
        if self.shape != rhs.shape {
            return Err(Error::ShapeMismatch {
                expected: self.shape.clone(),
                got: rhs.shape.clone(),
            });
        }
        for (o, x) in self.data.iter_mut().zip(rhs.data.iter()) {
            *o += *x;
        }
        Ok(())
    }
}
