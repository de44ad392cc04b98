use crate::shape::Shape;

/// All errors that can occur within stoat.
///
/// This enum captures every failure mode: shape mismatches at graph build
/// time, attribute problems, arena misuse, and executor invariant
/// violations. Using a single error type across the workspace simplifies
/// error propagation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Shape mismatch between two tensors (e.g., trying to add [2,3] + [4,5]).
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: Shape, got: Shape },

    /// Operation requires a specific rank (number of dimensions).
    #[error("rank mismatch: expected rank {expected}, got {got}")]
    RankMismatch { expected: usize, got: usize },

    /// Dimension index out of range for the tensor's rank.
    #[error("dimension out of range: dim {dim} for tensor with {rank} dimensions")]
    DimOutOfRange { dim: usize, rank: usize },

    /// Element count mismatch when creating a tensor from a vec.
    #[error("element count mismatch: shape {shape} requires {expected} elements, got {got}")]
    ElementCountMismatch {
        shape: Shape,
        expected: usize,
        got: usize,
    },

    /// Matrix multiplication dimension mismatch.
    #[error("matmul shape mismatch: [{m}x{k1}] @ [{k2}x{n}] — inner dims must match")]
    MatmulShapeMismatch {
        m: usize,
        k1: usize,
        k2: usize,
        n: usize,
    },

    /// A node was given the wrong number of inputs for its operator.
    #[error("{op}: expected {expected} input(s), got {got}")]
    ArityMismatch {
        op: &'static str,
        expected: &'static str,
        got: usize,
    },

    /// An operator required an attribute that was not supplied.
    #[error("{op}: missing required attribute '{name}'")]
    MissingAttr { op: &'static str, name: &'static str },

    /// An attribute value had the wrong variant or an invalid payload.
    #[error("attribute '{name}': {reason}")]
    BadAttr { name: &'static str, reason: String },

    /// `Graph::loss` was called more than once.
    #[error("loss output registered twice")]
    DuplicateLoss,

    /// A symbol was used that does not belong to the graph under construction.
    #[error("unknown symbol id {id}")]
    UnknownSymbol { id: u32 },

    /// Two tensors were appended to an arena under the same symbol.
    #[error("symbol id {id} already present in arena")]
    DuplicateSymbol { id: u32 },

    /// A symbol was read from an arena before any tensor was appended for it.
    #[error("no tensor in arena for symbol id {id}")]
    MissingTensor { id: u32 },

    /// Generic message for cases not covered above.
    #[error("{0}")]
    Msg(String),
}

impl Error {
    /// Create an error from any string message.
    pub fn msg(s: impl Into<String>) -> Self {
        Error::Msg(s.into())
    }
}

/// Convenience Result type used throughout stoat.
pub type Result<T> = std::result::Result<T, Error>;

/// Macro for early return with a formatted error message.
/// Usage: `bail!("something went wrong: {}", detail)`
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::Error::Msg(format!($($arg)*)))
    };
}
