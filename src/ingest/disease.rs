//! HIV natural history: fertility effects, CD4 progression and mortality,
//! and children living with HIV reaching adulthood.
use ndarray::ArrayViewD;

use crate::{
    engine::{
        dims::{N_AGE_BIRTH, N_CLHIV_STRATA, N_HIV_ADULT},
        params::{ParamBatch, ParamKey},
    },
    ingest::{
        Conversion, IngestContext,
        table::{ArraySpec, Axis, ingest_array, ingest_spec},
    },
    projection::errors::ProjectionResult,
};

const BIRTH_AGES: Axis = Axis::Grouped { ages: N_AGE_BIRTH, width: 5 };

const FRR_AGE_OFF_ART: ArraySpec = ArraySpec {
    name: "frr_age_off_art",
    key: ParamKey::FrrAgeOffArt,
    axes: &[Axis::Year, BIRTH_AGES],
    convert: Conversion::Identity,
};

const FRR_CD4_OFF_ART: ArraySpec = ArraySpec {
    name: "frr_cd4_off_art",
    key: ParamKey::FrrCd4OffArt,
    axes: &[Axis::Index(N_HIV_ADULT)],
    convert: Conversion::Identity,
};

const FRR_AGE_ON_ART: ArraySpec = ArraySpec {
    name: "frr_age_on_art",
    key: ParamKey::FrrAgeOnArt,
    axes: &[BIRTH_AGES],
    convert: Conversion::Identity,
};

/// Progression tables have no entry for the last CD4 stage.
const CD4_DIST: ArraySpec = ArraySpec {
    name: "dist",
    key: ParamKey::Cd4Distribution,
    axes: &[Axis::Index(N_HIV_ADULT - 1), Axis::SexAge10],
    convert: Conversion::Identity,
};

const CD4_PROG: ArraySpec = ArraySpec {
    name: "prog",
    key: ParamKey::Cd4Progression,
    axes: &[Axis::Index(N_HIV_ADULT - 1), Axis::SexAge10],
    convert: Conversion::Identity,
};

const HIV_MORT: ArraySpec = ArraySpec {
    name: "mort",
    key: ParamKey::HivMortality,
    axes: &[Axis::Index(N_HIV_ADULT), Axis::SexAge10],
    convert: Conversion::Identity,
};

const CLHIV_AGEIN: ArraySpec = ArraySpec {
    name: "clhiv",
    key: ParamKey::ClhivAgeIn,
    axes: &[Axis::Year, Axis::Index(N_CLHIV_STRATA)],
    convert: Conversion::Identity,
};

/// Fertility rate ratios for women living with HIV.
///
/// Parameters
/// ----------
/// - `frr_age_off_art`: `[T, 7]` by reproductive 5-year group, off ART.
/// - `frr_cd4_off_art`: `[7]` by CD4 stage, off ART.
/// - `frr_age_on_art`: `[7]` by reproductive 5-year group, on ART.
///
/// Age ratios are expanded to single reproductive ages `a = 0..35` from
/// group `a / 5`.
pub fn hiv_fertility(
    ctx: &IngestContext, frr_age_off_art: ArrayViewD<'_, f64>,
    frr_cd4_off_art: ArrayViewD<'_, f64>, frr_age_on_art: ArrayViewD<'_, f64>,
) -> ProjectionResult<ParamBatch> {
    let age_off = FRR_AGE_OFF_ART.bind(ctx, frr_age_off_art)?;
    let cd4_off = FRR_CD4_OFF_ART.bind(ctx, frr_cd4_off_art)?;
    let age_on = FRR_AGE_ON_ART.bind(ctx, frr_age_on_art)?;

    let n_ages = (ctx.n_years() + 1) * N_AGE_BIRTH;
    let mut batch = ParamBatch::with_capacity(n_ages + N_HIV_ADULT);
    ingest_array(ctx, &FRR_AGE_OFF_ART, &age_off, &[], &mut batch)?;
    ingest_array(ctx, &FRR_CD4_OFF_ART, &cd4_off, &[], &mut batch)?;
    ingest_array(ctx, &FRR_AGE_ON_ART, &age_on, &[], &mut batch)?;
    Ok(batch)
}

/// Adult CD4 distribution at infection, progression and HIV mortality off
/// ART, from sex × ten-year-age columns.
///
/// Parameters
/// ----------
/// - `dist`, `prog`: `[6, 8]` by CD4 stage (last stage omitted).
/// - `mort`: `[7, 8]` by CD4 stage.
///
/// Columns are male 15-24, 25-34, 35-44, 45+, then the same for females.
pub fn adult_prog_from_10yr(
    ctx: &IngestContext, dist: ArrayViewD<'_, f64>, prog: ArrayViewD<'_, f64>,
    mort: ArrayViewD<'_, f64>,
) -> ProjectionResult<ParamBatch> {
    let dist = CD4_DIST.bind(ctx, dist)?;
    let prog = CD4_PROG.bind(ctx, prog)?;
    let mort = HIV_MORT.bind(ctx, mort)?;

    let mut batch = ParamBatch::new();
    ingest_array(ctx, &CD4_DIST, &dist, &[], &mut batch)?;
    ingest_array(ctx, &CD4_PROG, &prog, &[], &mut batch)?;
    ingest_array(ctx, &HIV_MORT, &mort, &[], &mut batch)?;
    Ok(batch)
}

/// Children living with HIV turning 15, `[T, 84]`.
pub fn clhiv_agein(
    ctx: &IngestContext, clhiv: ArrayViewD<'_, f64>,
) -> ProjectionResult<ParamBatch> {
    ingest_spec(ctx, &CLHIV_AGEIN, clhiv)
}
