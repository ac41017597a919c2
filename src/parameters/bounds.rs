//! Numeric range constraints
//!
//! This module provides the inclusive [`Bounds`] used by field descriptors to
//! reject physically meaningless values (negative pixel counts, zero slice
//! numbers, ...) before they are written to a parameter file.

use thiserror::Error;

/// Errors that can occur when checking a value against bounds
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoundsError {
    #[error("Invalid bounds: min ({min}) must be less than max ({max})")]
    InvalidBounds { min: f64, max: f64 },

    #[error("value {value} is outside bounds: [{min}, {max}]")]
    ValueOutsideBounds { value: f64, min: f64, max: f64 },

    #[error("non-finite value is not allowed")]
    InfiniteValue,
}

/// Inclusive range of accepted values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Minimum allowed value
    pub min: f64,

    /// Maximum allowed value
    pub max: f64,
}

impl Bounds {
    /// Create new bounds with min and max values
    ///
    /// # Examples
    ///
    /// ```
    /// use drprobe_rs::parameters::bounds::Bounds;
    ///
    /// let bounds = Bounds::new(0.0, 10.0).unwrap();
    /// assert_eq!(bounds.min, 0.0);
    /// assert_eq!(bounds.max, 10.0);
    /// assert!(Bounds::new(10.0, 0.0).is_err());
    /// ```
    pub fn new(min: f64, max: f64) -> Result<Self, BoundsError> {
        if min > max {
            return Err(BoundsError::InvalidBounds { min, max });
        }

        Ok(Self { min, max })
    }

    /// Bounds accepting every finite value
    pub const fn unbounded() -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
        }
    }

    /// Bounds with only a minimum value
    pub const fn min_only(min: f64) -> Self {
        Self {
            min,
            max: f64::INFINITY,
        }
    }

    /// Closed interval `[min, max]` for use in constant tables.
    ///
    /// The caller guarantees `min <= max`; use [`Bounds::new`] for runtime input.
    pub const fn closed(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Check if a value is within the bounds
    pub fn is_within_bounds(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Check a value, rejecting non-finite numbers and anything outside the range
    ///
    /// # Examples
    ///
    /// ```
    /// use drprobe_rs::parameters::bounds::{Bounds, BoundsError};
    ///
    /// let positive = Bounds::min_only(1.0);
    /// assert!(positive.check(256.0).is_ok());
    /// assert!(matches!(positive.check(0.0), Err(BoundsError::ValueOutsideBounds { .. })));
    /// assert_eq!(positive.check(f64::NAN), Err(BoundsError::InfiniteValue));
    /// ```
    pub fn check(&self, value: f64) -> Result<(), BoundsError> {
        if !value.is_finite() {
            return Err(BoundsError::InfiniteValue);
        }

        if !self.is_within_bounds(value) {
            return Err(BoundsError::ValueOutsideBounds {
                value,
                min: self.min,
                max: self.max,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_creation() {
        // Valid bounds
        let bounds = Bounds::new(0.0, 10.0).unwrap();
        assert_eq!(bounds.min, 0.0);
        assert_eq!(bounds.max, 10.0);

        // Invalid bounds (min > max)
        let result = Bounds::new(10.0, 0.0);
        assert!(result.is_err());

        // Unbounded
        let bounds = Bounds::unbounded();
        assert_eq!(bounds.min, f64::NEG_INFINITY);
        assert_eq!(bounds.max, f64::INFINITY);

        // Lower bound only
        let bounds = Bounds::min_only(5.0);
        assert_eq!(bounds.min, 5.0);
        assert_eq!(bounds.max, f64::INFINITY);
    }

    #[test]
    fn test_is_within_bounds() {
        let bounds = Bounds::closed(0.0, 10.0);

        assert!(bounds.is_within_bounds(0.0));
        assert!(bounds.is_within_bounds(5.0));
        assert!(bounds.is_within_bounds(10.0));

        assert!(!bounds.is_within_bounds(-1.0));
        assert!(!bounds.is_within_bounds(11.0));
    }

    #[test]
    fn test_check_rejects_non_finite() {
        let bounds = Bounds::unbounded();
        assert!(bounds.check(-1.0e300).is_ok());
        assert_eq!(bounds.check(f64::INFINITY), Err(BoundsError::InfiniteValue));
        assert_eq!(bounds.check(f64::NEG_INFINITY), Err(BoundsError::InfiniteValue));
        assert_eq!(bounds.check(f64::NAN), Err(BoundsError::InfiniteValue));
    }

    #[test]
    fn test_check_reports_range() {
        let bounds = Bounds::closed(10.0, 1300.0);
        match bounds.check(5.0) {
            Err(BoundsError::ValueOutsideBounds { value, min, max }) => {
                assert_eq!(value, 5.0);
                assert_eq!(min, 10.0);
                assert_eq!(max, 1300.0);
            }
            other => panic!("Expected ValueOutsideBounds, got {:?}", other),
        }
    }
}
