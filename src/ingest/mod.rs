//! ingest — per-parameter conversion from host buffers into engine parameters.
//!
//! Purpose
//! -------
//! Turn validated host buffers and scalars into staged parameter writes.
//! Each public routine covers one parameter group, validates every buffer it
//! receives before reading any element, applies the group's unit conversion,
//! and returns a [`ParamBatch`] that the projection commits only if the whole
//! routine succeeded.
//!
//! Key behaviors
//! -------------
//! - [`IngestContext`] carries the projection length and value-checking
//!   policy into every routine.
//! - [`Conversion`] names the unit conversions: identity, percentage to
//!   proportion, annual dropout percentage to a continuous hazard, and
//!   integer or bounded-level checks.
//! - [`table`] holds the declarative [`ArraySpec`] and the generic
//!   [`ingest_array`] routine most groups are expressed with; the remaining
//!   modules hold groups with bespoke arithmetic (migration, key
//!   populations, circumcision uptake).
//!
//! Invariants & assumptions
//! ------------------------
//! - No routine retains a reference to a host buffer after it returns.
//! - Only migration writes to its inputs: the age patterns are converted to
//!   absolute migrant counts in place.
//! - Percentages (ART coverage, ART dropout, viral suppression, circumcision
//!   uptake) are divided by 100 here; every other input is taken as given.
//!
//! Conventions
//! -----------
//! - Host sex columns that are male-first are swapped to the engine's
//!   female-first order by the routine that reads them.
//! - Coarse ages map onto single ages by integer division; only circumcision
//!   uptake is smoothed.
use tracing::trace;

use crate::{
    engine::params::{Coord, ParamBatch, ParamKey, ParamValue},
    projection::{
        errors::{ProjectionError, ProjectionResult},
        options::ProjectionOptions,
        years::YearRange,
    },
};

pub mod art;
pub mod behavior;
pub mod demography;
pub mod disease;
pub mod incidence;
pub mod keypop;
pub mod table;
pub mod uptake;

pub use self::table::{ArraySpec, Axis, ingest_array, ingest_spec};
pub use self::uptake::uptake_probabilities;

/// Unit conversion applied to each host value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Conversion {
    /// Real value as given.
    Identity,
    /// `p / 100`.
    PercentToProportion,
    /// `-ln(1 - p / 100)`; requires `0 <= p < 100`.
    DropoutPercentToRate,
    /// Whole number stored as an integer parameter.
    Integer,
    /// Whole number in `0..=max`.
    Level { max: i32 },
}

/// Per-call ingestion settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestContext {
    pub years: YearRange,
    pub check_finite: bool,
}

impl IngestContext {
    pub fn new(years: YearRange, options: &ProjectionOptions) -> IngestContext {
        IngestContext { years, check_finite: options.check_finite }
    }

    /// Number of projection years `T`.
    pub fn n_years(&self) -> usize {
        self.years.len()
    }

    /// Apply `convert` to the host value at `index` of argument `param`.
    pub fn convert(
        &self, param: &'static str, convert: Conversion, index: &[usize], value: f64,
    ) -> ProjectionResult<ParamValue> {
        let invalid = |reason| ProjectionError::InvalidValue {
            param,
            index: index.to_vec(),
            value,
            reason,
        };
        if self.check_finite && !value.is_finite() {
            return Err(invalid("value is not finite"));
        }

        match convert {
            Conversion::Identity => Ok(ParamValue::Real(value)),
            Conversion::PercentToProportion => Ok(ParamValue::Real(0.01 * value)),
            Conversion::DropoutPercentToRate => {
                if !(0.0..100.0).contains(&value) {
                    return Err(invalid("annual dropout percentage must be in [0, 100)"));
                }
                Ok(ParamValue::Real(-(-0.01 * value).ln_1p()))
            }
            Conversion::Integer => whole(value)
                .map(ParamValue::Int)
                .ok_or_else(|| invalid("value must be a whole number")),
            Conversion::Level { max } => match whole(value) {
                Some(level) if (0..=max).contains(&level) => Ok(ParamValue::Int(level)),
                _ => Err(invalid("value is not an allowed level")),
            },
        }
    }

    /// Stage a real scalar, checking finiteness when enabled.
    pub fn scalar(
        &self, batch: &mut ParamBatch, param: &'static str, key: ParamKey,
        at: impl Into<Coord>, value: f64,
    ) -> ProjectionResult<()> {
        let converted = self.convert(param, Conversion::Identity, &[], value)?;
        batch.push(key, at, converted);
        Ok(())
    }

    /// Stage a real scalar that must lie in `[0, 1]`.
    pub fn proportion(
        &self, batch: &mut ParamBatch, param: &'static str, key: ParamKey, value: f64,
    ) -> ProjectionResult<()> {
        if !(0.0..=1.0).contains(&value) {
            return Err(ProjectionError::InvalidValue {
                param,
                index: Vec::new(),
                value,
                reason: "proportion must be in [0, 1]",
            });
        }
        self.scalar(batch, param, key, Coord::SCALAR, value)
    }
}

fn whole(value: f64) -> Option<i32> {
    let in_range = value >= f64::from(i32::MIN) && value <= f64::from(i32::MAX);
    (in_range && value.fract() == 0.0).then_some(value as i32)
}

pub(crate) fn log_batch(operation: &'static str, batch: &ParamBatch) {
    trace!(operation, writes = batch.len(), "staged parameter writes");
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::engine::ParamTable;
    use approx::assert_relative_eq;

    pub(crate) fn context(n_years: usize) -> IngestContext {
        let years = YearRange::new(2000, 2000 + n_years as i32 - 1).unwrap();
        IngestContext::new(years, &ProjectionOptions::default())
    }

    pub(crate) fn commit(batch: ParamBatch) -> ParamTable {
        let mut table = ParamTable::new();
        batch.commit(&mut table);
        table
    }

    fn real(v: ProjectionResult<ParamValue>) -> f64 {
        v.unwrap().as_real().unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Dropout percentages convert to hazards, 0% exactly to 0, and 100% or
    // more is rejected rather than producing infinity.
    fn dropout_percent_to_hazard() {
        let ctx = context(1);
        let conv = Conversion::DropoutPercentToRate;

        let zero = real(ctx.convert("exit", conv, &[0, 0], 0.0));
        assert_eq!(zero, 0.0);
        assert!(zero.is_sign_positive());
        let ten = real(ctx.convert("exit", conv, &[0, 0], 10.0));
        assert_relative_eq!(ten, -(0.9_f64).ln(), epsilon = 1e-15);

        let err = ctx.convert("exit", conv, &[3, 1], 100.0).unwrap_err();
        assert_eq!(
            err,
            ProjectionError::InvalidValue {
                param: "exit",
                index: vec![3, 1],
                value: 100.0,
                reason: "annual dropout percentage must be in [0, 100)",
            }
        );
        assert!(ctx.convert("exit", conv, &[0], -1.0).is_err());
    }

    #[test]
    fn percent_and_levels() {
        let ctx = context(1);

        assert_relative_eq!(real(ctx.convert("p", Conversion::PercentToProportion, &[], 85.0)), 0.85);
        assert_eq!(ctx.convert("mix", Conversion::Level { max: 2 }, &[], 2.0), Ok(ParamValue::Int(2)));
        assert!(ctx.convert("mix", Conversion::Level { max: 2 }, &[], 3.0).is_err());
        assert!(ctx.convert("mix", Conversion::Level { max: 2 }, &[], 1.5).is_err());
        assert_eq!(ctx.convert("cd4", Conversion::Integer, &[], 350.0), Ok(ParamValue::Int(350)));
    }

    #[test]
    // Purpose
    // -------
    // Finite checking can be switched off; the value then passes through.
    fn finite_check_is_optional() {
        let mut ctx = context(1);
        assert!(ctx.convert("x", Conversion::Identity, &[], f64::NAN).is_err());

        ctx.check_finite = false;

        assert!(real(ctx.convert("x", Conversion::Identity, &[], f64::INFINITY)).is_infinite());
    }
}
