use crate::dtype::{elem, Elem};
use crate::error::{Error, Result};
use crate::shape::Shape;

// Attributes — per-node operator parameters
//
// A node carries a small ordered list of (name, value) pairs: kernel sizes,
// strides, clip bounds, axis lists, shape literals. Keys are string literals
// fixed at graph build time; the executor resolves every lookup exactly once
// per node when it compiles the instruction plan, so attribute access never
// happens inside a sweep.

/// One typed attribute payload.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Integer scalar (axis index, concat dim, ...).
    Int(i64),
    /// Small integer tuple (2-tuples for 2-D kernel/stride/padding/dilation,
    /// axis lists for squeeze/unsqueeze).
    Ints(Vec<i64>),
    /// A shape literal.
    Shape(Shape),
    /// A numeric scalar in the tensor element domain (clip bounds).
    Scalar(f64),
}

impl AttrValue {
    /// Extract an integer scalar.
    pub fn as_int(&self, name: &'static str) -> Result<i64> {
        match self {
            AttrValue::Int(v) => Ok(*v),
            other => Err(bad(name, "expected an integer", other)),
        }
    }

    /// Extract a non-negative integer scalar as usize.
    pub fn as_usize(&self, name: &'static str) -> Result<usize> {
        let v = self.as_int(name)?;
        usize::try_from(v).map_err(|_| Error::BadAttr {
            name,
            reason: format!("expected a non-negative integer, got {}", v),
        })
    }

    /// Extract a 2-tuple of non-negative integers.
    pub fn as_pair(&self, name: &'static str) -> Result<[usize; 2]> {
        match self {
            AttrValue::Ints(v) if v.len() == 2 => {
                let a = usize::try_from(v[0]);
                let b = usize::try_from(v[1]);
                match (a, b) {
                    (Ok(a), Ok(b)) => Ok([a, b]),
                    _ => Err(Error::BadAttr {
                        name,
                        reason: format!("expected non-negative entries, got {:?}", v),
                    }),
                }
            }
            other => Err(bad(name, "expected a 2-tuple of integers", other)),
        }
    }

    /// Extract an integer list as axis indices.
    pub fn as_dims(&self, name: &'static str) -> Result<Vec<usize>> {
        match self {
            AttrValue::Ints(v) => v
                .iter()
                .map(|&d| {
                    usize::try_from(d).map_err(|_| Error::BadAttr {
                        name,
                        reason: format!("expected non-negative axes, got {:?}", v),
                    })
                })
                .collect(),
            other => Err(bad(name, "expected a tuple of integers", other)),
        }
    }

    /// Extract a shape literal.
    pub fn as_shape(&self, name: &'static str) -> Result<&Shape> {
        match self {
            AttrValue::Shape(s) => Ok(s),
            other => Err(bad(name, "expected a shape literal", other)),
        }
    }

    /// Extract a numeric scalar, converted to the engine element type.
    pub fn as_scalar(&self, name: &'static str) -> Result<Elem> {
        match self {
            AttrValue::Scalar(v) => Ok(elem(*v)),
            AttrValue::Int(v) => Ok(elem(*v as f64)),
            other => Err(bad(name, "expected a numeric scalar", other)),
        }
    }
}

fn bad(name: &'static str, expected: &str, got: &AttrValue) -> Error {
    Error::BadAttr {
        name,
        reason: format!("{}, got {:?}", expected, got),
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<usize> for AttrValue {
    fn from(v: usize) -> Self {
        AttrValue::Int(v as i64)
    }
}

impl From<(usize, usize)> for AttrValue {
    fn from((a, b): (usize, usize)) -> Self {
        AttrValue::Ints(vec![a as i64, b as i64])
    }
}

impl From<Vec<i64>> for AttrValue {
    fn from(v: Vec<i64>) -> Self {
        AttrValue::Ints(v)
    }
}

impl From<&[usize]> for AttrValue {
    fn from(v: &[usize]) -> Self {
        AttrValue::Ints(v.iter().map(|&d| d as i64).collect())
    }
}

impl From<Shape> for AttrValue {
    fn from(s: Shape) -> Self {
        AttrValue::Shape(s)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Scalar(v)
    }
}

/// Ordered attribute list attached to a node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attrs(Vec<(&'static str, AttrValue)>);

impl Attrs {
    pub fn new() -> Self {
        Attrs(Vec::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &'static str, value: impl Into<AttrValue>) -> Self {
        self.0.push((name, value.into()));
        self
    }

    /// Look up an attribute by name. Unknown names return None.
    pub fn lookup(&self, name: &str) -> Option<&AttrValue> {
        self.0.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// Look up a required attribute, reporting the operator on failure.
    pub fn require(&self, op: &'static str, name: &'static str) -> Result<&AttrValue> {
        self.lookup(name).ok_or(Error::MissingAttr { op, name })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
