//! Adult antiretroviral therapy: mortality on ART, eligibility, coverage,
//! allocation, interruption and viral suppression.
use ndarray::ArrayViewD;

use crate::{
    engine::{
        dims::{N_ART_MORT, N_ART_MRR, N_HIV_ADULT},
        params::{ParamBatch, ParamKey},
    },
    ingest::{
        Conversion, IngestContext,
        table::{ArraySpec, Axis, ingest_array, ingest_spec},
    },
    projection::errors::ProjectionResult,
};

const STAGE_SEX_AGE10: &[Axis] = &[Axis::Index(N_HIV_ADULT), Axis::SexAge10];

const fn art_mort(name: &'static str) -> ArraySpec {
    let key = ParamKey::ArtMortality;
    ArraySpec { name, key, axes: STAGE_SEX_AGE10, convert: Conversion::Identity }
}

const ART_MORT: [ArraySpec; N_ART_MORT] = [art_mort("art1"), art_mort("art2"), art_mort("art3")];

const ART_MRR: ArraySpec = ArraySpec {
    name: "art_mrr",
    key: ParamKey::ArtMortalityRatio,
    axes: &[Axis::Year, Axis::Index(N_ART_MRR)],
    convert: Conversion::Identity,
};

const ELIGIBILITY: ArraySpec = ArraySpec {
    name: "cd4",
    key: ParamKey::ArtEligibilityCd4,
    axes: &[Axis::Year],
    convert: Conversion::Integer,
};

const ART_NUMBER: ArraySpec = ArraySpec {
    name: "n_art",
    key: ParamKey::ArtNumber,
    axes: &[Axis::Year, Axis::HostSex],
    convert: Conversion::Identity,
};

const ART_PERCENT: ArraySpec = ArraySpec {
    name: "p_art",
    key: ParamKey::ArtProportion,
    axes: &[Axis::Year, Axis::HostSex],
    convert: Conversion::PercentToProportion,
};

const ART_EXIT: ArraySpec = ArraySpec {
    name: "art_exit_rate",
    key: ParamKey::ArtInterruption,
    axes: &[Axis::Year, Axis::HostSex],
    convert: Conversion::DropoutPercentToRate,
};

const ART_SUPPRESSED: ArraySpec = ArraySpec {
    name: "art_supp_pct",
    key: ParamKey::ArtSuppressed,
    axes: &[Axis::Year, Axis::SexAge10],
    convert: Conversion::PercentToProportion,
};

/// Mortality on ART by time on treatment, and its calendar-year ratio.
///
/// Parameters
/// ----------
/// - `art1`, `art2`, `art3`: `[7, 8]` mortality by CD4 stage and sex ×
///   ten-year age for [0, 6), [6, 12) and 12+ months on ART.
/// - `art_mrr`: `[T, 2]` mortality rate ratios for [0, 12) and 12+ months.
pub fn art_mort_from_10yr(
    ctx: &IngestContext, art: [ArrayViewD<'_, f64>; N_ART_MORT], art_mrr: ArrayViewD<'_, f64>,
) -> ProjectionResult<ParamBatch> {
    let [art1, art2, art3] = art;
    let bound = [
        ART_MORT[0].bind(ctx, art1)?,
        ART_MORT[1].bind(ctx, art2)?,
        ART_MORT[2].bind(ctx, art3)?,
    ];
    let mrr = ART_MRR.bind(ctx, art_mrr)?;

    let mut batch = ParamBatch::new();
    for (dur, (spec, view)) in ART_MORT.iter().zip(&bound).enumerate() {
        ingest_array(ctx, spec, view, &[dur], &mut batch)?;
    }
    ingest_array(ctx, &ART_MRR, &mrr, &[], &mut batch)?;
    Ok(batch)
}

/// CD4 eligibility threshold by year, `[T]` whole numbers.
pub fn art_eligibility(
    ctx: &IngestContext, cd4: ArrayViewD<'_, i32>,
) -> ProjectionResult<ParamBatch> {
    ingest_spec(ctx, &ELIGIBILITY, cd4)
}

/// ART coverage targets by year and sex, host columns male-first.
///
/// Parameters
/// ----------
/// - `n_art`: `[T, 2]` number of adults on ART.
/// - `p_art`: `[T, 2]` percentage of need met, stored as a proportion.
///
/// Both are always stored; the engine gives a positive proportion
/// precedence over the number.
pub fn art_curr(
    ctx: &IngestContext, n_art: ArrayViewD<'_, f64>, p_art: ArrayViewD<'_, f64>,
) -> ProjectionResult<ParamBatch> {
    let number = ART_NUMBER.bind(ctx, n_art)?;
    let percent = ART_PERCENT.bind(ctx, p_art)?;

    let mut batch = ParamBatch::with_capacity(2 * number.len());
    ingest_array(ctx, &ART_NUMBER, &number, &[], &mut batch)?;
    ingest_array(ctx, &ART_PERCENT, &percent, &[], &mut batch)?;
    Ok(batch)
}

/// Weight on expected mortality when allocating new ART initiations.
pub fn art_allocation(ctx: &IngestContext, weight: f64) -> ProjectionResult<ParamBatch> {
    let mut batch = ParamBatch::with_capacity(1);
    ctx.proportion(&mut batch, "weight", ParamKey::ArtMortalityWeight, weight)?;
    Ok(batch)
}

/// Annual ART dropout percentages by year and sex (male-first), stored as
/// continuous hazards `-ln(1 - p/100)`.
pub fn art_interruption(
    ctx: &IngestContext, exit: ArrayViewD<'_, f64>,
) -> ProjectionResult<ParamBatch> {
    ingest_spec(ctx, &ART_EXIT, exit)
}

/// Percentage virally suppressed on ART, `[T, 8]` sex × ten-year columns.
pub fn art_suppressed(
    ctx: &IngestContext, supp: ArrayViewD<'_, f64>,
) -> ProjectionResult<ParamBatch> {
    ingest_spec(ctx, &ART_SUPPRESSED, supp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::dims::{FEMALE, MALE},
        ingest::tests::{commit, context},
        projection::ProjectionError,
    };
    use approx::assert_relative_eq;
    use ndarray::{Array1, Array2, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Duration prefixes on ART mortality.
    // - Male-first host columns and percentage conversions.
    // - Dropout hazard conversion and the 100% rejection.
    // - Ten-year bucketing of viral suppression.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Each ART mortality table lands under its own duration index.
    //
    // Given
    // -----
    // - art1 = 1, art2 = 2, art3 = 3 everywhere; MRR rows [0.9, 0.5].
    //
    // Expect
    // ------
    // - ArtMortality[d, h, s, a] == d + 1; ArtMortalityRatio[t, 1] == 0.5.
    fn mortality_by_duration() {
        let ctx = context(2);
        let tables: Vec<Array2<f64>> =
            (1..=3).map(|d| Array2::from_elem((7, 8), f64::from(d))).collect();
        let mrr = array![[0.9, 0.5], [0.9, 0.5]];

        let batch = art_mort_from_10yr(
            &ctx,
            [tables[0].view().into_dyn(), tables[1].view().into_dyn(), tables[2].view().into_dyn()],
            mrr.view().into_dyn(),
        )
        .unwrap();
        let table = commit(batch);

        assert_eq!(table.count(ParamKey::ArtMortality), 3 * 7 * 2 * 66);
        assert_eq!(table.real(ParamKey::ArtMortality, [0, 4, FEMALE, 10]), Some(1.0));
        assert_eq!(table.real(ParamKey::ArtMortality, [2, 6, MALE, 65]), Some(3.0));
        assert_eq!(table.real(ParamKey::ArtMortalityRatio, [1, 1]), Some(0.5));
    }

    #[test]
    // Purpose
    // -------
    // Coverage columns are male-first on the host and percentages become
    // proportions; the number is stored as given.
    fn coverage_swaps_sex_and_scales_percent() {
        let ctx = context(1);
        let n_art = array![[1000.0, 2000.0]];
        let p_art = array![[40.0, 85.0]];

        let table =
            commit(art_curr(&ctx, n_art.view().into_dyn(), p_art.view().into_dyn()).unwrap());

        assert_eq!(table.real(ParamKey::ArtNumber, [0, MALE]), Some(1000.0));
        assert_eq!(table.real(ParamKey::ArtNumber, [0, FEMALE]), Some(2000.0));
        assert_relative_eq!(table.real(ParamKey::ArtProportion, [0, MALE]).unwrap(), 0.40);
        assert_relative_eq!(table.real(ParamKey::ArtProportion, [0, FEMALE]).unwrap(), 0.85);
    }

    #[test]
    // Purpose
    // -------
    // Dropout percentages become hazards; 100% aborts the call.
    fn interruption_hazards() {
        let ctx = context(2);
        let exit = array![[0.0, 10.0], [50.0, 100.0]];

        let err = art_interruption(&ctx, exit.view().into_dyn()).unwrap_err();
        match err {
            ProjectionError::InvalidValue { param, index, .. } => {
                assert_eq!(param, "art_exit_rate");
                assert_eq!(index, vec![1, 1]);
            }
            other => panic!("unexpected error {other:?}"),
        }

        let exit = array![[0.0, 10.0], [50.0, 20.0]];
        let table = commit(art_interruption(&ctx, exit.view().into_dyn()).unwrap());

        assert_eq!(table.real(ParamKey::ArtInterruption, [0, MALE]), Some(0.0));
        assert_relative_eq!(
            table.real(ParamKey::ArtInterruption, [0, FEMALE]).unwrap(),
            -(0.9_f64).ln(),
            epsilon = 1e-15
        );
        assert_relative_eq!(
            table.real(ParamKey::ArtInterruption, [1, MALE]).unwrap(),
            2.0_f64.ln(),
            epsilon = 1e-15
        );
    }

    #[test]
    // Purpose
    // -------
    // Suppression reads column min(a / 10, 3) for males and +4 for females.
    fn suppression_by_ten_year_band() {
        let ctx = context(1);
        let supp = array![[10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0]];

        let table = commit(art_suppressed(&ctx, supp.view().into_dyn()).unwrap());

        assert_relative_eq!(table.real(ParamKey::ArtSuppressed, [0, MALE, 9]).unwrap(), 0.1);
        assert_relative_eq!(table.real(ParamKey::ArtSuppressed, [0, MALE, 10]).unwrap(), 0.2);
        assert_relative_eq!(table.real(ParamKey::ArtSuppressed, [0, FEMALE, 0]).unwrap(), 0.5);
        assert_relative_eq!(table.real(ParamKey::ArtSuppressed, [0, FEMALE, 65]).unwrap(), 0.8);
    }

    #[test]
    fn eligibility_and_allocation() {
        let ctx = context(3);
        let cd4 = Array1::from_vec(vec![200, 350, 500]);

        let mut batch = art_eligibility(&ctx, cd4.view().into_dyn()).unwrap();
        batch.extend(art_allocation(&ctx, 0.5).unwrap());
        let table = commit(batch);

        assert_eq!(table.int(ParamKey::ArtEligibilityCd4, [2]), Some(500));
        assert!(art_allocation(&ctx, 1.5).is_err());
    }
}
