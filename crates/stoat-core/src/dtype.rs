// Elem — the single element type used by every tensor in a build
//
// The engine is specialized ahead of time: one numeric type is chosen when
// the crate is compiled and every tensor, kernel, and gradient uses it.
// The default is f32; enabling the `f64` cargo feature switches the whole
// engine to f64. There is no runtime dtype tag and no per-tensor dispatch.

use num_traits::Float;

/// The engine-wide tensor element type (f32 unless the `f64` feature is on).
#[cfg(not(feature = "f64"))]
pub type Elem = f32;

/// The engine-wide tensor element type (f64 build).
#[cfg(feature = "f64")]
pub type Elem = f64;

/// Convert an f64 literal or attribute value to the element type.
pub fn elem(v: f64) -> Elem {
    // The cast from f64 to a float type is total (overflow saturates to
    // ±∞ following IEEE semantics), so the None branch is unreachable.
    num_traits::cast(v).unwrap_or_else(Elem::nan)
}

/// Smallest finite value of the element type.
pub fn min_finite() -> Elem {
    Elem::min_value()
}

/// Largest finite value of the element type.
pub fn max_finite() -> Elem {
    Elem::max_value()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elem_cast() {
        assert_eq!(elem(1.5), 1.5 as Elem);
        assert!(elem(f64::INFINITY).is_infinite());
    }

    #[test]
    fn test_finite_bounds() {
        assert!(min_finite().is_finite());
        assert!(max_finite().is_finite());
        assert!(min_finite() < 0.0);
        assert!(max_finite() > 0.0);
    }
}
