//! Sexual behavior: partnership mixing structure, sex acts and condom use.
use ndarray::ArrayViewD;

use crate::{
    engine::{
        dims::{N_BOND, N_POP, N_SEX},
        params::{ParamBatch, ParamKey},
    },
    ingest::{
        Conversion, IngestContext,
        table::{ArraySpec, Axis, ingest_spec},
    },
    projection::errors::ProjectionResult,
};

/// Highest mixing level: 0 no partnerships, 1 and 2 increasing preference.
pub const MAX_MIX_LEVEL: i32 = 2;

const MIXING: ArraySpec = ArraySpec {
    name: "mix_levels",
    key: ParamKey::MixStructure,
    axes: &[Axis::Index(N_SEX), Axis::Index(N_POP), Axis::Index(N_SEX), Axis::Index(N_POP)],
    convert: Conversion::Level { max: MAX_MIX_LEVEL },
};

const SEX_ACTS: ArraySpec = ArraySpec {
    name: "acts",
    key: ParamKey::SexActs,
    axes: &[Axis::Index(N_BOND)],
    convert: Conversion::Identity,
};

const CONDOM_FREQ: ArraySpec = ArraySpec {
    name: "freq",
    key: ParamKey::CondomFreq,
    axes: &[Axis::Year, Axis::Index(N_BOND)],
    convert: Conversion::Identity,
};

/// Mixing levels between (sex, risk group) pairs, `[2, 8, 2, 8]`.
///
/// Levels are whole numbers in `0..=2` stored as floating point on the host;
/// anything else is rejected.
pub fn mixing_matrix(
    ctx: &IngestContext, levels: ArrayViewD<'_, f64>,
) -> ProjectionResult<ParamBatch> {
    ingest_spec(ctx, &MIXING, levels)
}

/// Sex acts per year by partnership type, `[4]`.
pub fn sex_acts(ctx: &IngestContext, acts: ArrayViewD<'_, f64>) -> ProjectionResult<ParamBatch> {
    ingest_spec(ctx, &SEX_ACTS, acts)
}

/// Condom use at last sex by year and partnership type, `[T, 4]`.
pub fn condom_freq(
    ctx: &IngestContext, freq: ArrayViewD<'_, f64>,
) -> ProjectionResult<ParamBatch> {
    ingest_spec(ctx, &CONDOM_FREQ, freq)
}

/// Proportional reduction in transmission per condom-protected act.
pub fn effect_condom(ctx: &IngestContext, effect: f64) -> ProjectionResult<ParamBatch> {
    let mut batch = ParamBatch::with_capacity(1);
    ctx.proportion(&mut batch, "effect_condom", ParamKey::EffectCondom, effect)?;
    Ok(batch)
}
