//! # stoat
//!
//! An ahead-of-time specialized deep-learning engine. Build a static
//! [`Graph`] once, construct a [`Model`] from it (which allocates every
//! activation and gradient buffer in the process-wide arenas and compiles a
//! per-node instruction plan), then run `forward` / `inference` / `backward`
//! sweeps with no per-step attribute lookups or shape arithmetic.
//!
//! ```
//! use stoat::{Attrs, Graph, Model, OpKind, Tensor};
//!
//! let mut g = Graph::new();
//! let x = g.input_trainable(3);
//! let y = g.op(OpKind::Relu, &[&x], Attrs::new())?;
//! let loss = g.op(OpKind::Mean, &[&y], Attrs::new())?;
//! g.output(&y)?;
//! g.loss(&loss)?;
//!
//! let mut model = Model::new(&g)?;
//! let l = model.forward(&[Tensor::from_slice(&[-2.0, 1.0, 3.0], 3)?])?;
//! model.backward(None)?;
//! let dx = model.grad(&x)?;
//! # assert!((l.get(0) - 4.0 / 3.0).abs() < 1e-6);
//! # assert_eq!(dx.to_vec()[0], 0.0);
//! # Ok::<(), stoat::Error>(())
//! ```
//!
//! Only one Model is usable at a time: constructing a Model clears both
//! arenas and restarts symbol numbering, invalidating symbols from earlier
//! graphs.

pub mod exec;
pub mod init;
#[cfg(feature = "profile")]
pub mod metrics;
pub mod ops;

pub use exec::Model;

// Re-export the core data model so hosts depend on one crate.
pub use stoat_core::{
    arena, elem, Attrs, AttrValue, Elem, Error, Graph, Init, Initializer, OpKind, Result, Shape,
    Symbol, SymbolKind, Tensor, TensorStore,
};
