//! Demographic inputs: fertility pattern, migration, sexual debut and unions.
use ndarray::{ArrayViewD, ArrayViewMutD, Ix2};

use crate::{
    buffer::{BufferView, BufferViewMut},
    engine::{
        dims::{FEMALE, MALE, N_AGE_5YR, N_AGE_BIRTH_5YR, N_SEX},
        params::{Coord, ParamBatch, ParamKey},
    },
    ingest::{
        Conversion, IngestContext,
        table::{ArraySpec, Axis, ingest_spec},
    },
    projection::errors::ProjectionResult,
};

const PASFRS_5YR: ArraySpec = ArraySpec {
    name: "pasfrs5y",
    key: ParamKey::Pasfr5,
    axes: &[Axis::Year, Axis::Index(N_AGE_BIRTH_5YR)],
    convert: Conversion::Identity,
};

/// Age-specific fertility distribution by reproductive 5-year group, `[T, 7]`.
pub fn pasfrs_from_5yr(
    ctx: &IngestContext, pasfrs: ArrayViewD<'_, f64>,
) -> ProjectionResult<ParamBatch> {
    ingest_spec(ctx, &PASFRS_5YR, pasfrs)
}

/// Net migration from totals by sex and 5-year age patterns.
///
/// Parameters
/// ----------
/// - `netmigr`: `[T, 2]` total net migrants, host order **male, female**.
/// - `pattern_female`, `pattern_male`: `[T, 17]` proportion of each sex's
///   migrants in each 5-year group.
///
/// Side effects
/// ------------
/// - The patterns are **overwritten in place** with absolute migrant counts
///   (`total × proportion`). This happens only after every buffer and value
///   has been checked, so a rejected call leaves them untouched.
///
/// Errors
/// ------
/// - Buffer errors for any argument; `InvalidValue` for non-finite inputs
///   when finite checking is on.
pub fn migr_from_5yr(
    ctx: &IngestContext, netmigr: ArrayViewD<'_, f64>, pattern_female: ArrayViewMutD<'_, f64>,
    pattern_male: ArrayViewMutD<'_, f64>,
) -> ProjectionResult<ParamBatch> {
    let n = ctx.n_years();
    let totals = BufferView::bind("netmigr", netmigr, &[n, N_SEX])?.into_dim::<Ix2>()?;
    let female = BufferViewMut::bind("pattern_female", pattern_female, &[n, N_AGE_5YR])?;
    let male = BufferViewMut::bind("pattern_male", pattern_male, &[n, N_AGE_5YR])?;
    let (mut female, mut male) = (female.into_dim::<Ix2>()?, male.into_dim::<Ix2>()?);

    for ((t, s), &v) in totals.indexed_iter() {
        ctx.convert("netmigr", Conversion::Identity, &[t, s], v)?;
    }
    for ((t, a), &v) in female.indexed_iter() {
        ctx.convert("pattern_female", Conversion::Identity, &[t, a], v)?;
    }
    for ((t, a), &v) in male.indexed_iter() {
        ctx.convert("pattern_male", Conversion::Identity, &[t, a], v)?;
    }

    let mut batch = ParamBatch::with_capacity(2 * n * N_AGE_5YR);
    for t in 0..n {
        // Host totals are male-first.
        let (total_m, total_f) = (totals[[t, 0]], totals[[t, 1]]);
        for a in 0..N_AGE_5YR {
            male[[t, a]] *= total_m;
            female[[t, a]] *= total_f;
            batch.push_real(ParamKey::NetMigration5, [FEMALE, t, a], female[[t, a]]);
            batch.push_real(ParamKey::NetMigration5, [MALE, t, a], male[[t, a]]);
        }
    }
    Ok(batch)
}

/// Median age at sexual debut by sex.
pub fn median_age_debut(
    ctx: &IngestContext, age_female: f64, age_male: f64,
) -> ProjectionResult<ParamBatch> {
    by_sex(ctx, "median_age_debut", ParamKey::MedianAgeDebut, age_female, age_male)
}

/// Median age at first union by sex.
pub fn median_age_union(
    ctx: &IngestContext, age_female: f64, age_male: f64,
) -> ProjectionResult<ParamBatch> {
    by_sex(ctx, "median_age_union", ParamKey::MedianAgeUnion, age_female, age_male)
}

/// Mean duration of marriage or cohabitation, in years.
pub fn mean_duration_union(ctx: &IngestContext, years: f64) -> ProjectionResult<ParamBatch> {
    let mut batch = ParamBatch::with_capacity(1);
    let key = ParamKey::MeanUnionDuration;
    ctx.scalar(&mut batch, "mean_duration_union", key, Coord::SCALAR, years)?;
    Ok(batch)
}

fn by_sex(
    ctx: &IngestContext, name: &'static str, key: ParamKey, female: f64, male: f64,
) -> ProjectionResult<ParamBatch> {
    let mut batch = ParamBatch::with_capacity(N_SEX);
    ctx.scalar(&mut batch, name, key, [FEMALE], female)?;
    ctx.scalar(&mut batch, name, key, [MALE], male)?;
    Ok(batch)
}
