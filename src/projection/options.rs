//! Projection options — session-wide configuration.
//!
//! Purpose
//! -------
//! Collect the knobs that change how a projection treats host buffers in one
//! place, so call sites pass an explicit, validated [`ProjectionOptions`]
//! rather than ad-hoc flags.
//!
//! Key behaviors
//! -------------
//! - [`ShareMode`] chooses whether shared inputs are borrowed zero-copy for
//!   the projection's lifetime or copied once into projection-owned storage.
//! - `check_finite` rejects NaN/±inf values during ingestion.
//!
//! Conventions
//! -----------
//! - Outputs are always bound zero-copy; `ShareMode` applies to shared inputs
//!   only.
//! - Defaults: `ShareMode::Borrow`, `check_finite = true`.
use std::str::FromStr;

use crate::projection::errors::ProjectionError;

/// How shared input buffers are held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShareMode {
    /// Keep a view of host memory; the host must keep it alive and unmoved.
    #[default]
    Borrow,
    /// Copy once at binding; the host may free the buffer afterwards.
    Copy,
}

impl FromStr for ShareMode {
    type Err = ProjectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "borrow" => Ok(ShareMode::Borrow),
            "copy" => Ok(ShareMode::Copy),
            _ => Err(ProjectionError::UnknownShareMode(s.to_string())),
        }
    }
}

/// ProjectionOptions — session-wide configuration.
///
/// Fields
/// ------
/// - `share_mode`: [`ShareMode`]
///   Borrow or copy shared inputs.
/// - `check_finite`: `bool`
///   Reject non-finite input values during ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionOptions {
    pub share_mode: ShareMode,
    pub check_finite: bool,
}

impl ProjectionOptions {
    pub fn new(share_mode: ShareMode, check_finite: bool) -> ProjectionOptions {
        ProjectionOptions { share_mode, check_finite }
    }
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        ProjectionOptions { share_mode: ShareMode::Borrow, check_finite: true }
    }
}
