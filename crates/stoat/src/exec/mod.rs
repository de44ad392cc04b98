//! Graph compilation and execution: the instruction plan and the Model.

pub mod model;
pub mod plan;

pub use model::Model;
