//! engine — the seam between this boundary and a projection engine.
//!
//! Purpose
//! -------
//! Describe what the boundary needs from a demographic/epidemic engine and
//! nothing more: a parameter store to ingest into, a one-time initialization
//! from demographic inputs, and a way to compute one projection year against
//! the bound shared inputs and outputs.
//!
//! Key behaviors
//! -------------
//! - [`Engine`] is the trait a simulation implements. `Box<E>` (including
//!   `Box<dyn Engine>`) is itself an engine.
//! - [`ParameterStore`], [`ParamKey`], [`Coord`], and [`ParamValue`] form the
//!   ingestion vocabulary; [`ParamBatch`] stages the writes of one call.
//! - [`ParamTable`] is a ready-made ordered store.
//! - [`dims`] holds the fixed engine cardinalities used in every shape
//!   contract.
//! - [`registry`] lets a process register the engine constructor used by the
//!   Python bindings.
//!
//! Invariants & assumptions
//! ------------------------
//! - The boundary never inspects engine state and never checks that the
//!   parameters needed for a year were ingested; missing parameters are the
//!   engine's to report.
//! - `project_year` is called with strictly consecutive year indices, starting
//!   after the last year the engine computed successfully, or from a year the
//!   caller invalidated.
use std::path::Path;

use crate::projection::workspace::Workspace;

pub mod dims;
pub mod errors;
pub mod params;
pub mod registry;
pub mod table;

pub use self::errors::{EngineError, EngineResult};
pub use self::params::{Coord, ParamBatch, ParamKey, ParamValue, ParameterStore};
pub use self::registry::{EngineFactory, engine_factory, register_engine};
pub use self::table::ParamTable;

/// A demographic/epidemic projection engine.
pub trait Engine {
    /// Parameter store that ingestion writes into.
    fn parameters(&mut self) -> &mut dyn ParameterStore;

    /// Load demographic inputs from `demography`.
    fn initialize(&mut self, demography: &Path) -> EngineResult<()>;

    /// Compute year index `year` (0 = first projection year), reading shared
    /// inputs from and writing results into `io`.
    fn project_year(&mut self, year: usize, io: &mut Workspace<'_>) -> EngineResult<()>;
}

impl<E: Engine + ?Sized> Engine for Box<E> {
    fn parameters(&mut self) -> &mut dyn ParameterStore {
        (**self).parameters()
    }

    fn initialize(&mut self, demography: &Path) -> EngineResult<()> {
        (**self).initialize(demography)
    }

    fn project_year(&mut self, year: usize, io: &mut Workspace<'_>) -> EngineResult<()> {
        (**self).project_year(year, io)
    }
}

pub mod prelude {
    pub use super::dims::*;
    pub use super::errors::{EngineError, EngineResult};
    pub use super::params::{Coord, ParamBatch, ParamKey, ParamValue, ParameterStore};
    pub use super::table::ParamTable;
    pub use super::Engine;
}
