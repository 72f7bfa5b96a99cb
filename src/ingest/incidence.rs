//! Epidemic drivers: direct incidence, epidemic seed, transmission and STIs.
use ndarray::ArrayViewD;

use crate::{
    engine::{
        dims::{FEMALE, MALE, N_AGE_5YR, N_AGE_ADULT, N_POP, N_SEX, N_TRANSMISSION},
        params::{Coord, ParamBatch, ParamKey, ParamValue},
    },
    ingest::{
        Conversion, IngestContext,
        table::{ArraySpec, Axis, ingest_array, ingest_spec},
    },
    projection::errors::{ProjectionError, ProjectionResult},
};

const INCIDENCE: ArraySpec = ArraySpec {
    name: "inci",
    key: ParamKey::Incidence,
    axes: &[Axis::Year],
    convert: Conversion::Identity,
};

const IRR_SEX: ArraySpec = ArraySpec {
    name: "sex_irr",
    key: ParamKey::IrrSex,
    axes: &[Axis::Year],
    convert: Conversion::Identity,
};

const YEAR_AGE5: &[Axis] = &[Axis::Year, Axis::Index(N_AGE_5YR)];
const YEAR_POP: &[Axis] = &[Axis::Year, Axis::Index(N_POP)];

const fn irr_age(name: &'static str) -> ArraySpec {
    ArraySpec { name, key: ParamKey::IrrAge5, axes: YEAR_AGE5, convert: Conversion::Identity }
}

const fn irr_pop(name: &'static str) -> ArraySpec {
    ArraySpec { name, key: ParamKey::IrrPop, axes: YEAR_POP, convert: Conversion::Identity }
}

const STI_PREV: ArraySpec = ArraySpec {
    name: "sti_prev",
    key: ParamKey::StiPrevalence,
    axes: &[Axis::Year, Axis::Index(N_SEX), Axis::Index(N_AGE_ADULT), Axis::Index(N_POP)],
    convert: Conversion::Identity,
};

/// Host arrays of [`direct_incidence`], in argument order.
#[derive(Debug, Clone)]
pub struct DirectIncidence<'a> {
    /// `[T]` adult incidence.
    pub inci: ArrayViewD<'a, f64>,
    /// `[T]` female-to-male incidence rate ratio.
    pub sex_irr: ArrayViewD<'a, f64>,
    /// `[T, 17]` incidence rate ratios by 5-year group, females.
    pub age_irr_female: ArrayViewD<'a, f64>,
    /// `[T, 17]` incidence rate ratios by 5-year group, males.
    pub age_irr_male: ArrayViewD<'a, f64>,
    /// `[T, 8]` incidence rate ratios by risk group, females.
    pub pop_irr_female: ArrayViewD<'a, f64>,
    /// `[T, 8]` incidence rate ratios by risk group, males.
    pub pop_irr_male: ArrayViewD<'a, f64>,
}

/// Switch the engine between direct and mechanistic incidence.
pub fn use_direct_incidence(flag: bool) -> ParamBatch {
    let mut batch = ParamBatch::with_capacity(1);
    batch.push(ParamKey::DirectIncidence, Coord::SCALAR, ParamValue::Flag(flag));
    batch
}

/// Incidence and its sex, age and risk-group rate ratios.
pub fn direct_incidence(
    ctx: &IngestContext, arrays: DirectIncidence<'_>,
) -> ProjectionResult<ParamBatch> {
    const AGE_F: ArraySpec = irr_age("age_irr_f");
    const AGE_M: ArraySpec = irr_age("age_irr_m");
    const POP_F: ArraySpec = irr_pop("pop_irr_f");
    const POP_M: ArraySpec = irr_pop("pop_irr_m");

    let inci = INCIDENCE.bind(ctx, arrays.inci)?;
    let sex_irr = IRR_SEX.bind(ctx, arrays.sex_irr)?;
    let age_f = AGE_F.bind(ctx, arrays.age_irr_female)?;
    let age_m = AGE_M.bind(ctx, arrays.age_irr_male)?;
    let pop_f = POP_F.bind(ctx, arrays.pop_irr_female)?;
    let pop_m = POP_M.bind(ctx, arrays.pop_irr_male)?;

    let n = ctx.n_years();
    let mut batch = ParamBatch::with_capacity(2 * n + 2 * n * (N_AGE_5YR + N_POP));
    ingest_array(ctx, &INCIDENCE, &inci, &[], &mut batch)?;
    ingest_array(ctx, &IRR_SEX, &sex_irr, &[], &mut batch)?;
    ingest_array(ctx, &AGE_F, &age_f, &[FEMALE], &mut batch)?;
    ingest_array(ctx, &AGE_M, &age_m, &[MALE], &mut batch)?;
    ingest_array(ctx, &POP_F, &pop_f, &[FEMALE], &mut batch)?;
    ingest_array(ctx, &POP_M, &pop_m, &[MALE], &mut batch)?;
    Ok(batch)
}

/// Epidemic start, `seed_year` years after the first projection year, with
/// prevalence `seed_prev` in that year.
///
/// Errors
/// ------
/// - `InvalidValue` when the seed year falls outside the projection.
pub fn epidemic_seed(
    ctx: &IngestContext, seed_year: i32, seed_prev: f64,
) -> ProjectionResult<ParamBatch> {
    let in_range = usize::try_from(seed_year).is_ok_and(|t| t < ctx.n_years());
    if !in_range {
        return Err(ProjectionError::InvalidValue {
            param: "seed_year",
            index: Vec::new(),
            value: f64::from(seed_year),
            reason: "seed year must fall within the projection",
        });
    }
    let mut batch = ParamBatch::with_capacity(2);
    batch.push_int(ParamKey::SeedTime, Coord::SCALAR, seed_year);
    ctx.scalar(&mut batch, "seed_prev", ParamKey::SeedPrevalence, Coord::SCALAR, seed_prev)?;
    Ok(batch)
}

/// Per-act transmission probability and its odds ratios.
///
/// Fields are stored as `Transmission[component]` in declaration order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransmissionParams {
    /// Female-to-male transmission probability per act.
    pub transmit_f2m: f64,
    /// Odds ratio, male-to-female relative to female-to-male.
    pub or_m2f: f64,
    /// Odds ratio, male-to-male relative to female-to-male.
    pub or_m2m: f64,
    /// Relative infectiousness during primary infection.
    pub primary: f64,
    pub chronic: f64,
    pub symptom: f64,
    /// Odds ratio on ART with viral suppression.
    pub or_art_supp: f64,
    /// Odds ratio on ART without viral suppression.
    pub or_art_fail: f64,
    /// Odds ratio when the HIV-positive partner has an STI.
    pub or_sti_hiv_pos: f64,
    /// Odds ratio when the HIV-negative partner has an STI.
    pub or_sti_hiv_neg: f64,
}

impl TransmissionParams {
    pub fn components(&self) -> [f64; N_TRANSMISSION] {
        [
            self.transmit_f2m,
            self.or_m2f,
            self.or_m2m,
            self.primary,
            self.chronic,
            self.symptom,
            self.or_art_supp,
            self.or_art_fail,
            self.or_sti_hiv_pos,
            self.or_sti_hiv_neg,
        ]
    }
}

pub fn transmission(
    ctx: &IngestContext, params: &TransmissionParams,
) -> ProjectionResult<ParamBatch> {
    let mut batch = ParamBatch::with_capacity(N_TRANSMISSION);
    for (i, value) in params.components().into_iter().enumerate() {
        ctx.scalar(&mut batch, "transmission", ParamKey::Transmission, [i], value)?;
    }
    Ok(batch)
}

/// STI symptom prevalence, `[T, 2, 66, 8]`, sex female-first.
pub fn sti_prev(ctx: &IngestContext, prev: ArrayViewD<'_, f64>) -> ProjectionResult<ParamBatch> {
    ingest_spec(ctx, &STI_PREV, prev)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::tests::{commit, context};
    use ndarray::{Array1, Array2, Array4};

    #[test]
    // Purpose
    // -------
    // Direct incidence stages each array under its own key, with the sex of
    // the age and risk-group ratios taken from the argument it came in.
    //
    // Given
    // -----
    // - Three years; every array filled with a distinct constant.
    //
    // Expect
    // ------
    // - All six arrays land under the right key and sex.
    fn direct_incidence_keys_and_sexes() {
        let ctx = context(3);
        let inci = Array1::from_elem(3, 0.01);
        let sex_irr = Array1::from_elem(3, 1.2);
        let age_f = Array2::from_elem((3, 17), 2.0);
        let age_m = Array2::from_elem((3, 17), 3.0);
        let pop_f = Array2::from_elem((3, 8), 4.0);
        let pop_m = Array2::from_elem((3, 8), 5.0);

        let batch = direct_incidence(
            &ctx,
            DirectIncidence {
                inci: inci.view().into_dyn(),
                sex_irr: sex_irr.view().into_dyn(),
                age_irr_female: age_f.view().into_dyn(),
                age_irr_male: age_m.view().into_dyn(),
                pop_irr_female: pop_f.view().into_dyn(),
                pop_irr_male: pop_m.view().into_dyn(),
            },
        )
        .unwrap();
        let table = commit(batch);

        assert_eq!(table.real(ParamKey::Incidence, [2]), Some(0.01));
        assert_eq!(table.real(ParamKey::IrrSex, [0]), Some(1.2));
        assert_eq!(table.real(ParamKey::IrrAge5, [FEMALE, 1, 16]), Some(2.0));
        assert_eq!(table.real(ParamKey::IrrAge5, [MALE, 1, 16]), Some(3.0));
        assert_eq!(table.real(ParamKey::IrrPop, [FEMALE, 2, 7]), Some(4.0));
        assert_eq!(table.real(ParamKey::IrrPop, [MALE, 0, 0]), Some(5.0));
        assert_eq!(table.count(ParamKey::IrrPop), 2 * 3 * 8);
    }

    #[test]
    // Purpose
    // -------
    // One malformed array rejects the whole call before anything is staged.
    fn direct_incidence_checks_every_array() {
        let ctx = context(3);
        let series = Array1::<f64>::zeros(3);
        let age = Array2::<f64>::zeros((3, 17));
        let pop_bad = Array2::<f64>::zeros((3, 7));
        let pop = Array2::<f64>::zeros((3, 8));

        let err = direct_incidence(
            &ctx,
            DirectIncidence {
                inci: series.view().into_dyn(),
                sex_irr: series.view().into_dyn(),
                age_irr_female: age.view().into_dyn(),
                age_irr_male: age.view().into_dyn(),
                pop_irr_female: pop.view().into_dyn(),
                pop_irr_male: pop_bad.view().into_dyn(),
            },
        )
        .unwrap_err();

        assert!(err.is_buffer_error());
        assert!(err.to_string().starts_with("pop_irr_m"));
    }

    #[test]
    fn seed_year_must_be_inside_projection() {
        let ctx = context(10);

        let table = commit(epidemic_seed(&ctx, 4, 0.001).unwrap());
        assert_eq!(table.int(ParamKey::SeedTime, Coord::SCALAR), Some(4));
        assert_eq!(table.real(ParamKey::SeedPrevalence, Coord::SCALAR), Some(0.001));

        assert!(epidemic_seed(&ctx, 10, 0.001).is_err());
        assert!(epidemic_seed(&ctx, -1, 0.001).is_err());
    }

    #[test]
    fn transmission_components_in_order() {
        let ctx = context(1);
        let params = TransmissionParams {
            transmit_f2m: 0.0019,
            or_m2f: 1.03,
            or_m2m: 5.8,
            primary: 13.0,
            chronic: 1.0,
            symptom: 8.0,
            or_art_supp: 0.0,
            or_art_fail: 0.9,
            or_sti_hiv_pos: 2.7,
            or_sti_hiv_neg: 3.6,
        };

        let table = commit(transmission(&ctx, &params).unwrap());

        assert_eq!(table.count(ParamKey::Transmission), N_TRANSMISSION);
        assert_eq!(table.real(ParamKey::Transmission, [0]), Some(0.0019));
        assert_eq!(table.real(ParamKey::Transmission, [3]), Some(13.0));
        assert_eq!(table.real(ParamKey::Transmission, [9]), Some(3.6));
    }

    #[test]
    fn sti_prevalence_keeps_host_axes() {
        let ctx = context(2);
        let prev = Array4::from_shape_fn((2, 2, 66, 8), |(t, s, a, r)| {
            (1000 * t + 100 * s + a) as f64 + 0.1 * r as f64
        });

        let table = commit(sti_prev(&ctx, prev.view().into_dyn()).unwrap());

        assert_eq!(table.count(ParamKey::StiPrevalence), 2 * 2 * 66 * 8);
        assert_eq!(table.real(ParamKey::StiPrevalence, [1, MALE, 65, 7]), Some(prev[[1, 1, 65, 7]]));
    }

    #[test]
    fn direct_incidence_flag() {
        let table = commit(use_direct_incidence(true));

        assert_eq!(table.flag(ParamKey::DirectIncidence, Coord::SCALAR), Some(true));
    }
}
