//! Male circumcision uptake: 5-year group percentages to single-age probabilities.
//!
//! Purpose
//! -------
//! The host supplies, per year, the percentage of uncircumcised males in each
//! 5-year age group who are circumcised over the five years they spend in the
//! group. The engine wants a yearly probability for every single age. This
//! module smooths cumulative exposure across group boundaries and
//! differentiates it back to single ages.
//!
//! Key behaviors
//! -------------
//! - Each group percentage `p` becomes a 5-year cumulative hazard
//!   `-5 ln(1 - p/100)`; the running sum gives cumulative exposure at ages
//!   0, 5, ..., 85.
//! - Exposure is interpolated with [`Pchip`]; boundary derivatives use the
//!   one-sided three-point estimate for knots spaced five years apart, mirrored
//!   at the right end and floored at 0.
//! - The probability for age `a` is `1 - exp(-(S(a + 1) - S(a)))`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Summed over the five ages of any group below 80, the single-age hazards
//!   reproduce the group's hazard.
//! - Cumulative exposure is monotone and single-age increments are floored at
//!   0, so probabilities are in `[0, 1)` for every age.
//! - A percentage of 100 or more (infinite hazard), a negative percentage, or
//!   a non-finite value is rejected regardless of finite checking.
use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewD, Ix2};

use crate::{
    buffer::BufferView,
    engine::{
        dims::{N_AGE, N_AGE_5YR},
        params::{ParamBatch, ParamKey},
    },
    ingest::IngestContext,
    numerics::Pchip,
    projection::errors::{ProjectionError, ProjectionResult},
};

const GROUP_WIDTH: f64 = 5.0;
const N_KNOTS: usize = N_AGE_5YR + 1;

/// Single-age uptake probabilities for every row of `uptake`.
///
/// Parameters
/// ----------
/// - `uptake`: `[T, 17]` percentages by 5-year age group, contiguous.
///
/// Returns
/// -------
/// - `[T, 81]` yearly probabilities by single age.
///
/// Errors
/// ------
/// - Buffer errors when `uptake` does not have 17 columns or is strided.
/// - `InvalidValue` for a percentage outside `[0, 100)`.
pub fn uptake_probabilities(uptake: ArrayView2<'_, f64>) -> ProjectionResult<Array2<f64>> {
    let expected = [uptake.nrows(), N_AGE_5YR];
    let bound = BufferView::bind("uptake", uptake, &expected)?.into_dim::<Ix2>()?;

    let mut probs = Array2::zeros((bound.nrows(), N_AGE));
    for (t, row) in bound.outer_iter().enumerate() {
        let curve = smooth_year(t, row)?;
        probs.row_mut(t).assign(&ArrayView1::from(&curve[..]));
    }
    Ok(probs)
}

/// Smooth `[T, 17]` uptake percentages and stage them as `CircumcisionUptake`.
pub fn male_circumcision_uptake(
    ctx: &IngestContext, uptake: ArrayViewD<'_, f64>,
) -> ProjectionResult<ParamBatch> {
    let n = ctx.n_years();
    let bound = BufferView::bind("uptake", uptake, &[n, N_AGE_5YR])?.into_dim::<Ix2>()?;

    let mut batch = ParamBatch::with_capacity(n * N_AGE);
    for (t, row) in bound.outer_iter().enumerate() {
        for (a, prob) in smooth_year(t, row)?.into_iter().enumerate() {
            batch.push_real(ParamKey::CircumcisionUptake, [t, a], prob);
        }
    }
    Ok(batch)
}

/// Proportional reduction in acquisition for circumcised men.
pub fn effect_vmmc(ctx: &IngestContext, effect: f64) -> ProjectionResult<ParamBatch> {
    let mut batch = ParamBatch::with_capacity(1);
    ctx.proportion(&mut batch, "effect_vmmc", ParamKey::EffectVmmc, effect)?;
    Ok(batch)
}

fn smooth_year(t: usize, row: ArrayView1<'_, f64>) -> ProjectionResult<[f64; N_AGE]> {
    let mut x = [0.0; N_KNOTS];
    let mut y = [0.0; N_KNOTS];
    for (k, &pct) in row.iter().enumerate() {
        if !(0.0..100.0).contains(&pct) {
            return Err(ProjectionError::InvalidValue {
                param: "uptake",
                index: vec![t, k],
                value: pct,
                reason: "uptake percentage must be in [0, 100)",
            });
        }
        let hazard = -GROUP_WIDTH * (-0.01 * pct).ln_1p();
        x[k + 1] = GROUP_WIDTH * (k + 1) as f64;
        y[k + 1] = y[k] + hazard;
    }

    let n = N_KNOTS - 1;
    let left = 0.2 * (1.5 * (y[1] - y[0]) - 0.5 * (y[2] - y[1]));
    let right = 0.2 * (1.5 * (y[n] - y[n - 1]) - 0.5 * (y[n - 1] - y[n - 2]));
    let spline = Pchip::new(&x, &y, left.max(0.0), right.max(0.0))?;

    let mut curve = [0.0; N_AGE];
    let mut lower = spline.eval(0.0);
    for (a, prob) in curve.iter_mut().enumerate() {
        let upper = spline.eval((a + 1) as f64);
        *prob = -(-(upper - lower).max(0.0)).exp_m1();
        lower = upper;
    }
    Ok(curve)
}
