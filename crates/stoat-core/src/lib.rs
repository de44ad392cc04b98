//! # stoat-core
//!
//! Core primitives for the stoat engine: the static graph data model and the
//! process-wide tensor arenas.
//!
//! This crate provides:
//! - [`Shape`] — immutable extents with row-major strides
//! - [`Tensor`] — dense, contiguous, exclusively owned buffer of [`Elem`]
//! - [`Attrs`] / [`AttrValue`] — typed per-node operator attributes
//! - [`Symbol`] — handle to a tensor slot in an arena
//! - [`OpKind`] — the operator catalog with pure `result_shape`
//! - [`Graph`] — inputs, parameter table, node list, outputs, loss marker
//! - [`arena`] — the TENSORS and GRADS stores
//!
//! The element type is fixed per build: `f32` by default, `f64` with the
//! `f64` feature. Forward/backward kernels and the Model executor live in
//! the `stoat` crate.

pub mod arena;
pub mod attr;
pub mod dtype;
pub mod error;
pub mod graph;
pub mod op;
pub mod shape;
pub mod symbol;
pub mod tensor;

pub use arena::TensorStore;
pub use attr::{AttrValue, Attrs};
pub use dtype::{elem, Elem};
pub use error::{Error, Result};
pub use graph::{Graph, Init, Initializer, Node, ParamEntry};
pub use op::{conv2d_out_dims, OpKind};
pub use shape::Shape;
pub use symbol::{Symbol, SymbolKind};
pub use tensor::Tensor;
