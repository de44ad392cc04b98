//! Forward and backward kernels for the operator catalog.
//!
//! Static kernels take pre-fetched tensors: forward writes a pre-allocated
//! output, backward returns a freshly allocated per-slot gradient. The
//! dynamic concat kernel indexes the arenas itself.

pub mod concat;
pub mod conv;
pub mod elementwise;
pub mod matmul;
pub mod pool;
pub mod reduce;
pub mod shape_ops;

pub use concat::ConcatGeom;
pub use conv::Conv2dGeom;
pub use elementwise::{BinaryKind, UnaryKind};
pub use pool::Pool2dGeom;
pub use reduce::ReduceKind;
