//! Scalar type and convergence tolerances.

/// Floating point type used throughout the network core.
pub type Real = f64;

/// Absolute/relative tolerance pair for judging whether the solved node
/// potentials have stopped moving between minor steps.
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

impl Tolerances {
    /// True when `a` and `b` agree within the absolute tolerance, or within
    /// the relative tolerance scaled by the larger magnitude.
    pub fn nearly_equal(self, a: Real, b: Real) -> bool {
        let diff = (a - b).abs();
        diff <= self.abs || diff <= self.rel * a.abs().max(b.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn near_zero_uses_absolute_tolerance() {
        let tol = Tolerances::default();
        assert!(tol.nearly_equal(0.0, 1e-13));
        assert!(!tol.nearly_equal(0.0, 1e-6));
    }

    #[test]
    fn large_magnitudes_use_relative_tolerance() {
        let tol = Tolerances::default();
        // 28 V bus moving by a nanovolt-scale amount counts as settled.
        assert!(tol.nearly_equal(28.0, 28.0 + 1e-9));
        assert!(!tol.nearly_equal(28.0, 28.0 + 1e-6));
    }
}
