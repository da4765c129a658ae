//! Exponent: `out = max(0, in)^e` per channel, alpha included.

use crate::cache_id::CacheIdBuilder;
use crate::meta::Direction;
use crate::{OpsError, OpsResult};

/// Per-channel exponents.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentData {
    /// RGBA exponents.
    pub exponents: [f64; 4],
    /// Direction; the inverse uses `1 / e`.
    pub direction: Direction,
}

impl Default for ExponentData {
    fn default() -> Self {
        Self { exponents: [1.0; 4], direction: Direction::Forward }
    }
}

impl ExponentData {
    /// Forward exponent.
    pub fn new(exponents: [f64; 4]) -> Self {
        Self { exponents, direction: Direction::Forward }
    }

    /// Same exponent on RGB, alpha untouched.
    pub fn uniform(e: f64) -> Self {
        Self::new([e, e, e, 1.0])
    }

    /// Sets the direction.
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Requires non-zero exponents in the inverse direction.
    pub fn validate(&self, tag: &str) -> OpsResult<()> {
        if let Some(e) = self.exponents.iter().find(|e| !e.is_finite()) {
            return Err(OpsError::validation(tag, format!("exponent {e} is not finite")));
        }
        if self.direction == Direction::Inverse {
            if let Some(i) = self.exponents.iter().position(|&e| e == 0.0) {
                return Err(OpsError::validation(
                    tag,
                    format!("exponent {i} is 0.0, the inverse is undefined"),
                ));
            }
        }
        Ok(())
    }

    /// Exponents applied by the evaluator (inverted in the inverse direction).
    pub fn effective(&self) -> [f64; 4] {
        match self.direction {
            Direction::Forward => self.exponents,
            Direction::Inverse => self.exponents.map(|e| 1.0 / e),
        }
    }

    /// True when every exponent is 1.
    pub fn is_identity(&self) -> bool {
        self.exponents.iter().all(|&e| e == 1.0)
    }

    /// Same payload applied in the opposite direction.
    pub fn inverse(&self) -> Self {
        Self { direction: self.direction.inverse(), ..self.clone() }
    }

    /// Element-wise product of the effective exponents.
    pub fn combine(&self, next: &ExponentData) -> Self {
        let (a, b) = (self.effective(), next.effective());
        Self::new([a[0] * b[0], a[1] * b[1], a[2] * b[2], a[3] * b[3]])
    }

    /// True when `self` followed by `other` is the identity.
    pub fn is_inverse_of(&self, other: &ExponentData) -> bool {
        self.combine(other).effective().iter().all(|&e| (e - 1.0).abs() < 1e-9)
    }

    pub(crate) fn write_cache_id(&self, b: CacheIdBuilder) -> CacheIdBuilder {
        b.doubles(&self.exponents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverse_requires_non_zero() {
        let e = ExponentData::new([1.0, 0.0, 2.0, 1.0]);
        assert!(e.validate("ExponentOp").is_ok());
        assert!(e.inverse().validate("ExponentOp").is_err());
    }

    #[test]
    fn test_combine_is_element_wise_product() {
        let a = ExponentData::new([1.2, 1.3, 1.4, 1.5]);
        let b = ExponentData::new([2.0, 0.5, 1.0, 2.0]);
        let c = a.combine(&b);
        assert_eq!(c.exponents, [2.4, 0.65, 1.4, 3.0]);
    }

    #[test]
    fn test_inverse_detection() {
        let a = ExponentData::new([1.2, 1.3, 1.4, 1.5]);
        assert!(a.is_inverse_of(&a.inverse()));
        assert!(a.is_inverse_of(&ExponentData::new([1.0 / 1.2, 1.0 / 1.3, 1.0 / 1.4, 1.0 / 1.5])));
        assert!(!a.is_inverse_of(&a));
    }
}
