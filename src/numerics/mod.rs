//! numerics — interpolation used by derived-parameter calculations.

pub mod pchip;

pub use self::pchip::{Pchip, PchipError};
