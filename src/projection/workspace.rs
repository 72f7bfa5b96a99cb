//! Bound shared inputs and host-owned outputs of a projection.
//!
//! Purpose
//! -------
//! Hold every buffer the engine reads or writes on each projection step, for
//! as long as the projection lives. This is what the engine receives in
//! [`Engine::project_year`](crate::engine::Engine::project_year).
//!
//! Key behaviors
//! -------------
//! - [`OutputBuffers`] holds mutable zero-copy views of host output arrays
//!   (population and deaths by stratum, births, births to mothers living
//!   with HIV, new infections). No output is ever copied or allocated here.
//! - [`SharedInputs`] holds partner rates, age mixing, risk-group
//!   assortativity and PWID risk. Depending on [`ShareMode`] each is a view
//!   of host memory or a one-time owned copy.
//! - `bind_*` functions validate every buffer of a group before binding any
//!   of them, and replace a previous binding of the same category.
//!
//! Invariants & assumptions
//! ------------------------
//! - `'buf` is the lifetime of the host buffers; a projection cannot outlive
//!   the buffers it shares.
//! - Unbound categories are `None` and are simply not written.
//!
//! Conventions
//! -----------
//! - Output shapes, with `T` projection years:
//!   adult-negative `[T, 3, 66, 8]`, adult-HIV `[T, 3, 66, 8, 7, 6]`,
//!   child-negative `[T, 3, 15]`, child-HIV `[T, 3, 15, 6, 6]`,
//!   births `[T, 2]`, births exposed `[T]`, new infections `[T, 3, 81, 8]`.
//! - Shared input shapes: partner rate `[T, 2, 66, 8]`, age mixing
//!   `[2, 66, 2, 66]`, assortativity `[2, 8]`, PWID force `[T, 2]` and
//!   needle sharing `[T]`.
use ndarray::{
    ArrayView1, ArrayView2, ArrayView4, ArrayViewMut, ArrayViewMut1, ArrayViewMut2, ArrayViewMut3,
    ArrayViewMut4, ArrayViewMut5, ArrayViewMut6, CowArray, Dimension, Ix1, Ix2, Ix4,
};
use tracing::debug;

use crate::{
    buffer::{BufferView, BufferViewMut},
    engine::dims::{
        N_AGE, N_AGE_ADULT, N_AGE_CHILD, N_DTX, N_HIV_ADULT, N_HIV_CHILD, N_POP, N_SEX, N_SEX_MC,
    },
    projection::{errors::ProjectionResult, options::ShareMode},
};

/// Adult/child, HIV-negative/positive arrays for one output category.
#[derive(Debug)]
pub struct StrataBuffers<'buf> {
    /// `[T, sex_mc, adult_age, pop]`
    pub adult_neg: ArrayViewMut4<'buf, f64>,
    /// `[T, sex_mc, adult_age, pop, hiv_stage, care_status]`
    pub adult_hiv: ArrayViewMut6<'buf, f64>,
    /// `[T, sex_mc, child_age]`
    pub child_neg: ArrayViewMut3<'buf, f64>,
    /// `[T, sex_mc, child_age, child_cd4, care_status]`
    pub child_hiv: ArrayViewMut5<'buf, f64>,
}

/// Host-owned arrays the engine writes results into.
#[derive(Debug, Default)]
pub struct OutputBuffers<'buf> {
    pub population: Option<StrataBuffers<'buf>>,
    pub deaths: Option<StrataBuffers<'buf>>,
    /// `[T, sex]`
    pub births: Option<ArrayViewMut2<'buf, f64>>,
    /// `[T]`
    pub births_exposed: Option<ArrayViewMut1<'buf, f64>>,
    /// `[T, sex_mc, age, pop]`
    pub new_infections: Option<ArrayViewMut4<'buf, f64>>,
}

/// PWID force of infection and needle sharing.
#[derive(Debug, Clone)]
pub struct PwidRisk<'buf> {
    /// `[T, sex]`
    pub force: CowArray<'buf, f64, Ix2>,
    /// `[T]`
    pub needle_sharing: CowArray<'buf, f64, Ix1>,
}

/// Inputs the engine reads on every projection step.
#[derive(Debug, Clone, Default)]
pub struct SharedInputs<'buf> {
    partner_rate: Option<CowArray<'buf, f64, Ix4>>,
    age_mixing: Option<CowArray<'buf, f64, Ix4>>,
    pop_assort: Option<CowArray<'buf, f64, Ix2>>,
    pwid_risk: Option<PwidRisk<'buf>>,
}

impl<'buf> SharedInputs<'buf> {
    /// `[T, sex, adult_age, pop]`
    pub fn partner_rate(&self) -> Option<ArrayView4<'_, f64>> {
        self.partner_rate.as_ref().map(|a| a.view())
    }

    /// `[sex, adult_age, sex, adult_age]`
    pub fn age_mixing(&self) -> Option<ArrayView4<'_, f64>> {
        self.age_mixing.as_ref().map(|a| a.view())
    }

    /// `[sex, pop]`
    pub fn pop_assort(&self) -> Option<ArrayView2<'_, f64>> {
        self.pop_assort.as_ref().map(|a| a.view())
    }

    /// `([T, sex], [T])`
    pub fn pwid_risk(&self) -> Option<(ArrayView2<'_, f64>, ArrayView1<'_, f64>)> {
        self.pwid_risk.as_ref().map(|r| (r.force.view(), r.needle_sharing.view()))
    }

    /// `true` when the named input holds its own copy.
    pub fn is_owned(&self, input: SharedInput) -> bool {
        match input {
            SharedInput::PartnerRate => self.partner_rate.as_ref().is_some_and(|a| a.is_owned()),
            SharedInput::AgeMixing => self.age_mixing.as_ref().is_some_and(|a| a.is_owned()),
            SharedInput::PopAssort => self.pop_assort.as_ref().is_some_and(|a| a.is_owned()),
            SharedInput::PwidRisk => self.pwid_risk.as_ref().is_some_and(|r| r.force.is_owned()),
        }
    }
}

/// Names of the shared inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharedInput {
    PartnerRate,
    AgeMixing,
    PopAssort,
    PwidRisk,
}

/// Everything bound to a projection.
#[derive(Debug, Default)]
pub struct Workspace<'buf> {
    pub inputs: SharedInputs<'buf>,
    pub outputs: OutputBuffers<'buf>,
}

/// Which stratified output category a set of strata buffers belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrataKind {
    Population,
    Deaths,
}

impl StrataKind {
    fn names(self) -> [&'static str; 4] {
        match self {
            StrataKind::Population => [
                "population.adult_neg",
                "population.adult_hiv",
                "population.child_neg",
                "population.child_hiv",
            ],
            StrataKind::Deaths => {
                ["deaths.adult_neg", "deaths.adult_hiv", "deaths.child_neg", "deaths.child_hiv"]
            }
        }
    }
}

pub fn adult_neg_shape(n_years: usize) -> [usize; 4] {
    [n_years, N_SEX_MC, N_AGE_ADULT, N_POP]
}

pub fn adult_hiv_shape(n_years: usize) -> [usize; 6] {
    [n_years, N_SEX_MC, N_AGE_ADULT, N_POP, N_HIV_ADULT, N_DTX]
}

pub fn child_neg_shape(n_years: usize) -> [usize; 3] {
    [n_years, N_SEX_MC, N_AGE_CHILD]
}

pub fn child_hiv_shape(n_years: usize) -> [usize; 5] {
    [n_years, N_SEX_MC, N_AGE_CHILD, N_HIV_CHILD, N_DTX]
}

/// Validate all four buffers of a stratified output, then bind them.
pub fn bind_strata<'buf, D1, D2, D3, D4>(
    kind: StrataKind, n_years: usize, adult_neg: ArrayViewMut<'buf, f64, D1>,
    adult_hiv: ArrayViewMut<'buf, f64, D2>, child_neg: ArrayViewMut<'buf, f64, D3>,
    child_hiv: ArrayViewMut<'buf, f64, D4>,
) -> ProjectionResult<StrataBuffers<'buf>>
where
    D1: Dimension,
    D2: Dimension,
    D3: Dimension,
    D4: Dimension,
{
    let [n_an, n_ah, n_cn, n_ch] = kind.names();
    let adult_neg = BufferViewMut::bind(n_an, adult_neg, &adult_neg_shape(n_years))?;
    let adult_hiv = BufferViewMut::bind(n_ah, adult_hiv, &adult_hiv_shape(n_years))?;
    let child_neg = BufferViewMut::bind(n_cn, child_neg, &child_neg_shape(n_years))?;
    let child_hiv = BufferViewMut::bind(n_ch, child_hiv, &child_hiv_shape(n_years))?;
    debug!(?kind, n_years, "bound stratified outputs");
    Ok(StrataBuffers {
        adult_neg: adult_neg.into_dim()?,
        adult_hiv: adult_hiv.into_dim()?,
        child_neg: child_neg.into_dim()?,
        child_hiv: child_hiv.into_dim()?,
    })
}

/// Validate and bind a single output buffer of fixed rank.
pub fn bind_output<'buf, D, E>(
    name: &'static str, view: ArrayViewMut<'buf, f64, E>, expected: &[usize],
) -> ProjectionResult<ArrayViewMut<'buf, f64, D>>
where
    D: Dimension,
    E: Dimension,
{
    let bound = BufferViewMut::bind(name, view, expected)?;
    debug!(buffer = name, order = ?bound.order(), "bound output");
    Ok(bound.into_dim()?)
}

/// Validate a shared input and hold it according to `mode`.
pub fn bind_shared<'buf, D, E>(
    name: &'static str, view: ndarray::ArrayView<'buf, f64, E>, expected: &[usize],
    mode: ShareMode,
) -> ProjectionResult<CowArray<'buf, f64, D>>
where
    D: Dimension,
    E: Dimension,
{
    let bound = BufferView::bind(name, view, expected)?;
    debug!(buffer = name, order = ?bound.order(), ?mode, "bound shared input");
    let fixed = bound.into_dim::<D>()?;
    Ok(match mode {
        ShareMode::Borrow => CowArray::from(fixed),
        ShareMode::Copy => CowArray::from(fixed.to_owned()),
    })
}

impl<'buf> SharedInputs<'buf> {
    pub(crate) fn set_partner_rate(&mut self, rate: CowArray<'buf, f64, Ix4>) {
        self.partner_rate = Some(rate);
    }

    pub(crate) fn set_age_mixing(&mut self, mix: CowArray<'buf, f64, Ix4>) {
        self.age_mixing = Some(mix);
    }

    pub(crate) fn set_pop_assort(&mut self, assort: CowArray<'buf, f64, Ix2>) {
        self.pop_assort = Some(assort);
    }

    pub(crate) fn set_pwid_risk(&mut self, risk: PwidRisk<'buf>) {
        self.pwid_risk = Some(risk);
    }
}

pub fn partner_rate_shape(n_years: usize) -> [usize; 4] {
    [n_years, N_SEX, N_AGE_ADULT, N_POP]
}

pub const AGE_MIXING_SHAPE: [usize; 4] = [N_SEX, N_AGE_ADULT, N_SEX, N_AGE_ADULT];
pub const POP_ASSORT_SHAPE: [usize; 2] = [N_SEX, N_POP];

pub fn births_shape(n_years: usize) -> [usize; 2] {
    [n_years, N_SEX]
}

pub fn new_infections_shape(n_years: usize) -> [usize; 4] {
    [n_years, N_SEX_MC, N_AGE, N_POP]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, Array2, Ix3, Ix5, Ix6};

    #[test]
    // Purpose
    // -------
    // Borrowed shared inputs alias host memory; copied ones do not.
    //
    // Given
    // -----
    // - A [2, 8] assortativity matrix bound once in each mode.
    //
    // Expect
    // ------
    // - Borrow mode yields a view at the host address.
    // - Copy mode yields an owned array at a different address.
    fn share_modes_alias_or_copy() {
        let host = Array2::<f64>::from_elem(POP_ASSORT_SHAPE, 0.5);

        let borrowed: CowArray<f64, Ix2> =
            bind_shared("assort", host.view(), &POP_ASSORT_SHAPE, ShareMode::Borrow).unwrap();
        let copied: CowArray<f64, Ix2> =
            bind_shared("assort", host.view(), &POP_ASSORT_SHAPE, ShareMode::Copy).unwrap();

        assert!(borrowed.is_view());
        assert_eq!(borrowed.as_ptr(), host.as_ptr());
        assert!(copied.is_owned());
        assert_ne!(copied.as_ptr(), host.as_ptr());
        assert_eq!(copied, host);
    }

    #[test]
    // Purpose
    // -------
    // A group with one wrong buffer is rejected as a whole, naming it.
    fn strata_group_rejects_on_any_bad_buffer() {
        let t = 2;
        let mut an = Array::<f64, Ix4>::zeros(adult_neg_shape(t));
        let mut ah = Array::<f64, Ix6>::zeros(adult_hiv_shape(t));
        let mut cn = Array::<f64, Ix3>::zeros(child_neg_shape(t));
        let mut ch = Array::<f64, Ix5>::zeros([t, N_SEX_MC, N_AGE_CHILD, N_HIV_CHILD, N_DTX + 1]);

        let err = bind_strata(
            StrataKind::Deaths,
            t,
            an.view_mut(),
            ah.view_mut(),
            cn.view_mut(),
            ch.view_mut(),
        )
        .unwrap_err();

        assert!(err.to_string().starts_with("deaths.child_hiv"));
    }
}
