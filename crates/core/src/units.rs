//! Semantic unit types for burned area
//!
//! ALFRESCO reports burned area in square kilometres; costs and the
//! dashboard axes are in acres. Wrapping both keeps the conversion in one
//! place and stops a km² value from being multiplied by a per-acre factor.
//!
//! # Usage
//! ```
//! use jfsp_core::units::{Acres, SquareKilometers};
//!
//! let area = SquareKilometers::new(10.0);
//! let acres: Acres = area.into();
//! assert_eq!(*acres, 2471.0);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// Acres in one square kilometre, as used by the agency cost tables.
pub const ACRES_PER_SQUARE_KILOMETER: f64 = 247.11;

/// Area in square kilometres
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct SquareKilometers(f64);

impl SquareKilometers {
    /// Create a new area.
    #[inline]
    #[must_use]
    pub const fn new(value: f64) -> Self {
        SquareKilometers(value)
    }

    /// Convert to whole acres, rounding half to even.
    #[inline]
    #[must_use]
    pub fn to_acres(self) -> Acres {
        Acres((self.0 * ACRES_PER_SQUARE_KILOMETER).round_ties_even())
    }
}

impl Deref for SquareKilometers {
    type Target = f64;
    #[inline]
    fn deref(&self) -> &f64 {
        &self.0
    }
}

impl fmt::Display for SquareKilometers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} km²", self.0)
    }
}

/// Area in acres
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Acres(f64);

impl Deref for Acres {
    type Target = f64;
    #[inline]
    fn deref(&self) -> &f64 {
        &self.0
    }
}

impl From<SquareKilometers> for Acres {
    #[inline]
    fn from(km2: SquareKilometers) -> Self {
        km2.to_acres()
    }
}

impl fmt::Display for Acres {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0} acres", self.0)
    }
}
