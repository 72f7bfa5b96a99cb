//! Incremental projection control.
//!
//! Purpose
//! -------
//! Track the last year a projection has computed and decide which years a
//! `project` call must compute, so repeated calls resume where the previous
//! one stopped and `invalidate` forces selected years to be recomputed.
//!
//! Key behaviors
//! -------------
//! - The marker starts one year before the first projection year (nothing
//!   computed).
//! - [`ProjectionController::advance`] runs a step closure for every year
//!   after the marker up to the target, advancing the marker per success.
//!   A failing step restores the marker to its value before the call.
//! - [`ProjectionController::invalidate`] lowers the marker so `year` and all
//!   later years are recomputed; negative years reset to nothing computed.
//!
//! Invariants & assumptions
//! ------------------------
//! - `first - 1 <= marker <= last` at all times.
//! - Only year arguments are checked here. Whether the engine has the
//!   parameters a year needs is the engine's concern.
use crate::{
    engine::EngineError,
    projection::{
        errors::{ProjectionError, ProjectionResult},
        years::YearRange,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionController {
    years: YearRange,
    last_computed: i32,
}

impl ProjectionController {
    pub fn new(years: YearRange) -> ProjectionController {
        ProjectionController { years, last_computed: years.first() - 1 }
    }

    /// Last year computed, or `first - 1` when nothing is.
    pub fn last_valid_year(&self) -> i32 {
        self.last_computed
    }

    /// `true` if `year` is computed and not invalidated.
    pub fn is_computed(&self, year: i32) -> bool {
        self.years.contains(year) && year <= self.last_computed
    }

    /// Compute every year after the marker up to and including `target`.
    ///
    /// `step` receives the 0-based year index. Returns the number of years
    /// computed (0 when `target` is already computed).
    ///
    /// Errors
    /// ------
    /// - `YearOutOfRange` when `target` is outside the projection.
    /// - `Engine` with the failing calendar year when `step` fails; the marker
    ///   is then back at its position before the call.
    pub fn advance<F>(&mut self, target: i32, mut step: F) -> ProjectionResult<usize>
    where
        F: FnMut(usize) -> Result<(), EngineError>,
    {
        self.years.check(target)?;
        let start = self.last_computed;
        if target <= start {
            return Ok(0);
        }

        for year in start + 1..=target {
            let idx = (year - self.years.first()) as usize;
            if let Err(source) = step(idx) {
                self.last_computed = start;
                return Err(ProjectionError::Engine { year, source });
            }
            self.last_computed = year;
        }
        Ok((target - start) as usize)
    }

    /// Mark `year` and every later year for recomputation.
    ///
    /// Errors
    /// ------
    /// - `YearOutOfRange` for a non-negative year outside the projection.
    pub fn invalidate(&mut self, year: i32) -> ProjectionResult<()> {
        if year < 0 {
            self.reset();
            return Ok(());
        }
        self.years.check(year)?;
        self.last_computed = self.last_computed.min(year - 1);
        Ok(())
    }

    /// Forget every computed year.
    pub fn reset(&mut self) {
        self.last_computed = self.years.first() - 1;
    }
}
