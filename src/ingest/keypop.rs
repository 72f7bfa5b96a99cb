//! Key population size, turnover and union status.
//!
//! Host arrays list the six key populations in [`KEYPOPS`] order: female
//! PWID, male PWID, FSW, clients, MSM, TGW.
//!
//! Populations that members never leave ("stay") ignore their turnover
//! column entirely, which may hold anything including NaN. For the others,
//! the turnover rows are mean duration, median age and age shape; the median
//! is converted to the log-scale location `ln(median - 15)` of the member
//! age distribution, so it must exceed 15.
use ndarray::{ArrayViewD, Ix1, Ix2};

use crate::{
    buffer::BufferView,
    engine::{
        dims::{AGE_ADULT_MIN, KEYPOPS, N_KEYPOP},
        params::{ParamBatch, ParamKey},
    },
    ingest::{Conversion, IngestContext},
    projection::errors::{ProjectionError, ProjectionResult},
};

const TURNOVER_ROWS: usize = 3;

/// Size, stay flag and turnover of each key population.
///
/// Parameters
/// ----------
/// - `size`: `[6]` share of the 15-49 population.
/// - `stay`: `[6]` nonzero when members remain for life.
/// - `turnover`: `[3, 6]` rows (mean duration, median age, age shape).
///
/// Errors
/// ------
/// - Buffer errors for any argument.
/// - `InvalidValue` for a non-finite value that is read, or a median age of
///   15 or less in a population that turns over.
pub fn keypop_size_params(
    ctx: &IngestContext, size: ArrayViewD<'_, f64>, stay: ArrayViewD<'_, i32>,
    turnover: ArrayViewD<'_, f64>,
) -> ProjectionResult<ParamBatch> {
    let size = BufferView::bind("kp_size", size, &[N_KEYPOP])?.into_dim::<Ix1>()?;
    let stay = BufferView::bind("kp_stay", stay, &[N_KEYPOP])?.into_dim::<Ix1>()?;
    let turnover = BufferView::bind("kp_turnover", turnover, &[TURNOVER_ROWS, N_KEYPOP])?
        .into_dim::<Ix2>()?;

    let mut batch = ParamBatch::with_capacity(5 * N_KEYPOP);
    for (r, &(sex, pop)) in KEYPOPS.iter().enumerate() {
        let value = ctx.convert("kp_size", Conversion::Identity, &[r], size[r])?;
        batch.push(ParamKey::KeypopSize, [sex, pop], value);

        let stays = stay[r] != 0;
        batch.push_int(ParamKey::KeypopStay, [sex, pop], i32::from(stays));
        if stays {
            continue;
        }

        let column = turnover.column(r);
        for (row, &value) in column.iter().enumerate() {
            ctx.convert("kp_turnover", Conversion::Identity, &[row, r], value)?;
        }
        let (duration, median, shape) = (column[0], column[1], column[2]);
        let above_min = median - AGE_ADULT_MIN as f64;
        if !(above_min > 0.0) {
            return Err(ProjectionError::InvalidValue {
                param: "kp_turnover",
                index: vec![1, r],
                value: median,
                reason: "median age must exceed 15",
            });
        }

        batch.push_real(ParamKey::KeypopDuration, [sex, pop], duration);
        batch.push_real(ParamKey::KeypopAgeLocation, [sex, pop], above_min.ln());
        batch.push_real(ParamKey::KeypopAgeShape, [sex, pop], shape);
    }
    Ok(batch)
}

/// Proportion of each key population in a main opposite-sex partnership.
pub fn keypop_married(
    ctx: &IngestContext, married: ArrayViewD<'_, f64>,
) -> ProjectionResult<ParamBatch> {
    let married = BufferView::bind("prop_married", married, &[N_KEYPOP])?.into_dim::<Ix1>()?;

    let mut batch = ParamBatch::with_capacity(N_KEYPOP);
    for (r, &(sex, pop)) in KEYPOPS.iter().enumerate() {
        let value = ctx.convert("prop_married", Conversion::Identity, &[r], married[r])?;
        batch.push(ParamKey::KeypopMarried, [sex, pop], value);
    }
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::dims::{FEMALE, MALE, POP_FSW, POP_MSM, POP_PWID, POP_TGW},
        ingest::tests::{commit, context},
    };
    use approx::assert_relative_eq;
    use ndarray::{Array1, Array2, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Host column order to (sex, population) mapping.
    // - Turnover conversion and its suppression for populations that stay.
    // - Rejection of a median age at or below 15.
    // -------------------------------------------------------------------------

    fn turnover() -> Array2<f64> {
        array![
            [5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
            [25.0, 30.0, 22.0, 35.0, 28.0, 26.0],
            [0.5, 0.6, 0.7, 0.8, 0.9, 1.0],
        ]
    }

    #[test]
    // Purpose
    // -------
    // Populations that turn over get duration, log-location and shape; those
    // that stay get only size and the stay flag.
    //
    // Given
    // -----
    // - Stay flags [0, 0, 0, 0, 1, 0] (MSM stay).
    //
    // Expect
    // ------
    // - FSW location ln(22 - 15); no MSM duration; MSM stay flag 1.
    fn turnover_follows_stay_flags() {
        let ctx = context(1);
        let size = Array1::from_vec(vec![0.01, 0.02, 0.03, 0.04, 0.05, 0.06]);
        let stay = Array1::from_vec(vec![0, 0, 0, 0, 1, 0]);

        let batch = keypop_size_params(
            &ctx,
            size.view().into_dyn(),
            stay.view().into_dyn(),
            turnover().view().into_dyn(),
        )
        .unwrap();
        let table = commit(batch);

        assert_eq!(table.real(ParamKey::KeypopSize, [MALE, POP_PWID]), Some(0.02));
        assert_eq!(table.real(ParamKey::KeypopSize, [MALE, POP_TGW]), Some(0.06));
        assert_relative_eq!(
            table.real(ParamKey::KeypopAgeLocation, [FEMALE, POP_FSW]).unwrap(),
            7.0_f64.ln()
        );
        assert_eq!(table.real(ParamKey::KeypopDuration, [FEMALE, POP_PWID]), Some(5.0));
        assert_eq!(table.real(ParamKey::KeypopAgeShape, [MALE, POP_TGW]), Some(1.0));
        assert_eq!(table.int(ParamKey::KeypopStay, [MALE, POP_MSM]), Some(1));
        assert_eq!(table.int(ParamKey::KeypopStay, [FEMALE, POP_FSW]), Some(0));
        assert_eq!(table.real(ParamKey::KeypopDuration, [MALE, POP_MSM]), None);
        assert_eq!(table.count(ParamKey::KeypopDuration), 5);
    }

    #[test]
    // Purpose
    // -------
    // A staying population's turnover column is never read, so NaN there is
    // accepted even with finite checking on.
    fn stay_ignores_turnover_column() {
        let ctx = context(1);
        let size = Array1::from_elem(6, 0.01);
        let stay = Array1::from_vec(vec![1, 0, 0, 0, 0, 0]);
        let mut turn = turnover();
        turn.column_mut(0).fill(f64::NAN);

        let result = keypop_size_params(
            &ctx,
            size.view().into_dyn(),
            stay.view().into_dyn(),
            turn.view().into_dyn(),
        );

        assert!(result.is_ok());
    }

    #[test]
    fn median_at_fifteen_is_rejected() {
        let ctx = context(1);
        let size = Array1::from_elem(6, 0.01);
        let stay = Array1::<i32>::zeros(6);
        let mut turn = turnover();
        turn[[1, 3]] = 15.0;

        let err = keypop_size_params(
            &ctx,
            size.view().into_dyn(),
            stay.view().into_dyn(),
            turn.view().into_dyn(),
        )
        .unwrap_err();

        match err {
            ProjectionError::InvalidValue { param, index, .. } => {
                assert_eq!(param, "kp_turnover");
                assert_eq!(index, vec![1, 3]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn married_in_host_order() {
        let ctx = context(1);
        let married = Array1::from_vec(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);

        let table = commit(keypop_married(&ctx, married.view().into_dyn()).unwrap());

        assert_eq!(table.real(ParamKey::KeypopMarried, [FEMALE, POP_FSW]), Some(0.3));
        assert_eq!(table.real(ParamKey::KeypopMarried, [MALE, POP_MSM]), Some(0.5));
    }
}
