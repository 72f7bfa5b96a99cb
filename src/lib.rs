//! goals_proj — the host boundary of a demographic/HIV projection engine.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that
//! exposes a projection session to Python via the `_goals_proj` extension
//! module. The crate validates host buffers, converts host parameter tables
//! into engine parameters, binds shared inputs and outputs for the lifetime of
//! a projection, and runs projection years incrementally against an
//! [`Engine`](engine::Engine) supplied by the embedding crate.
//!
//! Key behaviors
//! -------------
//! - [`buffer`]: shape and layout validation, and zero-copy typed views.
//! - [`engine`]: the engine seam, parameter vocabulary and fixed dimensions.
//! - [`ingest`]: per-parameter-group conversion into staged writes.
//! - [`numerics`]: the monotone cubic interpolant used by uptake smoothing.
//! - [`projection`]: the session type tying everything together.
//! - With `python-bindings`, a `Projection` class mirroring the Rust session
//!   and an `uptake_probabilities` function.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical and validation work lives in the inner modules; the PyO3
//!   items here perform only argument extraction, keep-alive bookkeeping and
//!   error mapping.
//! - The Python class can only be constructed after an engine constructor was
//!   registered with [`engine::register_engine`].
//!
//! Conventions
//! -----------
//! - Errors are rich Rust enums internally and become `ValueError` (buffer,
//!   usage and value errors) or `RuntimeError` (engine errors) at the PyO3
//!   boundary.
//! - Logging goes through `tracing`; the crate installs no subscriber.

pub mod buffer;
pub mod engine;
pub mod ingest;
pub mod numerics;
pub mod projection;

#[cfg(feature = "python-bindings")]
pub mod utils;

#[cfg(feature = "python-bindings")]
use std::collections::HashMap;

#[cfg(feature = "python-bindings")]
use ndarray::Ix2;

#[cfg(feature = "python-bindings")]
use numpy::{IntoPyArray, PyArray2};

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyRuntimeError, prelude::*};

#[cfg(feature = "python-bindings")]
use crate::{
    buffer::BufferError,
    engine::{Engine, engine_factory},
    ingest::incidence::{DirectIncidence, TransmissionParams},
    projection::{Projection, ProjectionError, ProjectionOptions, ShareMode},
    utils::{persistent, persistent_mut, readonly, readwrite},
};

/// Projection — Python-facing projection session.
///
/// Purpose
/// -------
/// Own a [`Projection`] over the registered engine and keep every shared
/// numpy array alive for as long as the session references it.
///
/// Parameters
/// ----------
/// Constructed from Python via
/// `Projection(year_start, year_final, share_mode="borrow", check_finite=True)`:
/// - `year_start`, `year_final`: first and last projection years.
/// - `share_mode`: `"borrow"` references shared inputs in place, `"copy"`
///   copies them once at binding.
/// - `check_finite`: reject NaN and infinite ingestion values.
///
/// Invariants
/// ----------
/// - `inner` is declared before `keep_alive` and is therefore dropped first,
///   so no view outlives the array it points into.
/// - Hosts must not resize shared arrays while the session exists.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "goals_proj", name = "Projection", unsendable)]
pub struct PyProjection {
    inner: Projection<'static, Box<dyn Engine>>,
    keep_alive: HashMap<&'static str, Vec<PyObject>>,
}

#[cfg(feature = "python-bindings")]
impl PyProjection {
    fn hold(&mut self, category: &'static str, arrays: &[&Bound<'_, PyAny>]) {
        let refs = arrays.iter().map(|a| Bound::clone(a).unbind()).collect();
        self.keep_alive.insert(category, refs);
    }

    fn hold_input(&mut self, category: &'static str, arrays: &[&Bound<'_, PyAny>]) {
        match self.inner.options().share_mode {
            ShareMode::Borrow => self.hold(category, arrays),
            ShareMode::Copy => {
                self.keep_alive.remove(category);
            }
        }
    }
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl PyProjection {
    #[new]
    #[pyo3(signature = (year_start, year_final, share_mode = "borrow", check_finite = true))]
    fn new(
        year_start: i32, year_final: i32, share_mode: &str, check_finite: bool,
    ) -> PyResult<PyProjection> {
        let factory = engine_factory().ok_or_else(|| {
            PyRuntimeError::new_err("no projection engine registered in this process")
        })?;
        let options = ProjectionOptions::new(share_mode.parse::<ShareMode>()?, check_finite);
        let engine = factory(year_start, year_final);
        let inner = Projection::with_options(year_start, year_final, engine, options)?;
        Ok(PyProjection { inner, keep_alive: HashMap::new() })
    }

    #[getter]
    fn year_start(&self) -> i32 {
        self.inner.years().first()
    }

    #[getter]
    fn year_final(&self) -> i32 {
        self.inner.years().last()
    }

    /// Last computed year, or `year_start - 1` when none is.
    #[getter]
    fn last_valid_year(&self) -> i32 {
        self.inner.last_valid_year()
    }

    fn initialize(&mut self, demography: &str) -> PyResult<()> {
        Ok(self.inner.initialize(demography)?)
    }

    fn project(&mut self, year: i32) -> PyResult<()> {
        Ok(self.inner.project(year)?)
    }

    fn invalidate(&mut self, year: i32) -> PyResult<()> {
        Ok(self.inner.invalidate(year)?)
    }

    // ---- Outputs ----

    fn share_output_population(
        &mut self, adult_neg: &Bound<'_, PyAny>, adult_hiv: &Bound<'_, PyAny>,
        child_neg: &Bound<'_, PyAny>, child_hiv: &Bound<'_, PyAny>,
    ) -> PyResult<()> {
        // SAFETY: on success the arrays are held in `keep_alive` until
        // `inner` is dropped or the binding is replaced.
        let views = unsafe {
            (
                persistent_mut::<f64>("population.adult_neg", adult_neg)?,
                persistent_mut::<f64>("population.adult_hiv", adult_hiv)?,
                persistent_mut::<f64>("population.child_neg", child_neg)?,
                persistent_mut::<f64>("population.child_hiv", child_hiv)?,
            )
        };
        self.inner.share_output_population(views.0, views.1, views.2, views.3)?;
        self.hold("population", &[adult_neg, adult_hiv, child_neg, child_hiv]);
        Ok(())
    }

    fn share_output_deaths(
        &mut self, adult_neg: &Bound<'_, PyAny>, adult_hiv: &Bound<'_, PyAny>,
        child_neg: &Bound<'_, PyAny>, child_hiv: &Bound<'_, PyAny>,
    ) -> PyResult<()> {
        // SAFETY: as for population outputs.
        let views = unsafe {
            (
                persistent_mut::<f64>("deaths.adult_neg", adult_neg)?,
                persistent_mut::<f64>("deaths.adult_hiv", adult_hiv)?,
                persistent_mut::<f64>("deaths.child_neg", child_neg)?,
                persistent_mut::<f64>("deaths.child_hiv", child_hiv)?,
            )
        };
        self.inner.share_output_deaths(views.0, views.1, views.2, views.3)?;
        self.hold("deaths", &[adult_neg, adult_hiv, child_neg, child_hiv]);
        Ok(())
    }

    fn share_output_births(&mut self, births: &Bound<'_, PyAny>) -> PyResult<()> {
        // SAFETY: held in `keep_alive` on success.
        let view = unsafe { persistent_mut::<f64>("births", births)? };
        self.inner.share_output_births(view)?;
        self.hold("births", &[births]);
        Ok(())
    }

    fn share_output_births_exposed(&mut self, births: &Bound<'_, PyAny>) -> PyResult<()> {
        // SAFETY: held in `keep_alive` on success.
        let view = unsafe { persistent_mut::<f64>("births_exposed", births)? };
        self.inner.share_output_births_exposed(view)?;
        self.hold("births_exposed", &[births]);
        Ok(())
    }

    fn share_output_new_infections(&mut self, newhiv: &Bound<'_, PyAny>) -> PyResult<()> {
        // SAFETY: held in `keep_alive` on success.
        let view = unsafe { persistent_mut::<f64>("new_infections", newhiv)? };
        self.inner.share_output_new_infections(view)?;
        self.hold("new_infections", &[newhiv]);
        Ok(())
    }

    // ---- Shared inputs ----

    fn share_input_partner_rate(&mut self, rate: &Bound<'_, PyAny>) -> PyResult<()> {
        // SAFETY: held in `keep_alive` in borrow mode; copied otherwise.
        let view = unsafe { persistent::<f64>("partner_rate", rate)? };
        self.inner.share_input_partner_rate(view)?;
        self.hold_input("partner_rate", &[rate]);
        Ok(())
    }

    fn share_input_age_mixing(&mut self, mix: &Bound<'_, PyAny>) -> PyResult<()> {
        // SAFETY: held in `keep_alive` in borrow mode; copied otherwise.
        let view = unsafe { persistent::<f64>("age_mixing", mix)? };
        self.inner.share_input_age_mixing(view)?;
        self.hold_input("age_mixing", &[mix]);
        Ok(())
    }

    fn share_input_pop_assort(&mut self, assort: &Bound<'_, PyAny>) -> PyResult<()> {
        // SAFETY: held in `keep_alive` in borrow mode; copied otherwise.
        let view = unsafe { persistent::<f64>("pop_assort", assort)? };
        self.inner.share_input_pop_assort(view)?;
        self.hold_input("pop_assort", &[assort]);
        Ok(())
    }

    fn share_input_pwid_risk(
        &mut self, force: &Bound<'_, PyAny>, needle_sharing: &Bound<'_, PyAny>,
    ) -> PyResult<()> {
        // SAFETY: held in `keep_alive` in borrow mode; copied otherwise.
        let (force_view, needle_view) = unsafe {
            (
                persistent::<f64>("pwid_force", force)?,
                persistent::<f64>("needle_sharing", needle_sharing)?,
            )
        };
        self.inner.share_input_pwid_risk(force_view, needle_view)?;
        self.hold_input("pwid_risk", &[force, needle_sharing]);
        Ok(())
    }

    // ---- Parameter ingestion ----

    fn init_pasfrs_from_5yr(&mut self, pasfrs: &Bound<'_, PyAny>) -> PyResult<()> {
        let pasfrs = readonly::<f64>("pasfrs", pasfrs)?;
        Ok(self.inner.init_pasfrs_from_5yr(pasfrs.as_array())?)
    }

    /// Overwrites `migr_dist_f` and `migr_dist_m` with absolute migrant counts.
    fn init_migr_from_5yr(
        &mut self, netmigr: &Bound<'_, PyAny>, migr_dist_f: &Bound<'_, PyAny>,
        migr_dist_m: &Bound<'_, PyAny>,
    ) -> PyResult<()> {
        let netmigr = readonly::<f64>("netmigr", netmigr)?;
        let mut female = readwrite::<f64>("pattern_female", migr_dist_f)?;
        let mut male = readwrite::<f64>("pattern_male", migr_dist_m)?;
        Ok(self.inner.init_migr_from_5yr(
            netmigr.as_array(),
            female.as_array_mut(),
            male.as_array_mut(),
        )?)
    }

    fn use_direct_incidence(&mut self, flag: bool) -> PyResult<()> {
        Ok(self.inner.use_direct_incidence(flag)?)
    }

    fn init_direct_incidence(
        &mut self, inci: &Bound<'_, PyAny>, sex_irr: &Bound<'_, PyAny>,
        age_irr_f: &Bound<'_, PyAny>, age_irr_m: &Bound<'_, PyAny>,
        pop_irr_f: &Bound<'_, PyAny>, pop_irr_m: &Bound<'_, PyAny>,
    ) -> PyResult<()> {
        let inci = readonly::<f64>("inci", inci)?;
        let sex_irr = readonly::<f64>("sex_irr", sex_irr)?;
        let age_irr_f = readonly::<f64>("age_irr_f", age_irr_f)?;
        let age_irr_m = readonly::<f64>("age_irr_m", age_irr_m)?;
        let pop_irr_f = readonly::<f64>("pop_irr_f", pop_irr_f)?;
        let pop_irr_m = readonly::<f64>("pop_irr_m", pop_irr_m)?;
        Ok(self.inner.init_direct_incidence(DirectIncidence {
            inci: inci.as_array(),
            sex_irr: sex_irr.as_array(),
            age_irr_female: age_irr_f.as_array(),
            age_irr_male: age_irr_m.as_array(),
            pop_irr_female: pop_irr_f.as_array(),
            pop_irr_male: pop_irr_m.as_array(),
        })?)
    }

    fn init_median_age_debut(&mut self, age_female: f64, age_male: f64) -> PyResult<()> {
        Ok(self.inner.init_median_age_debut(age_female, age_male)?)
    }

    fn init_median_age_union(&mut self, age_female: f64, age_male: f64) -> PyResult<()> {
        Ok(self.inner.init_median_age_union(age_female, age_male)?)
    }

    fn init_mean_duration_union(&mut self, years: f64) -> PyResult<()> {
        Ok(self.inner.init_mean_duration_union(years)?)
    }

    fn init_keypop_size_params(
        &mut self, kp_size: &Bound<'_, PyAny>, kp_stay: &Bound<'_, PyAny>,
        kp_turnover: &Bound<'_, PyAny>,
    ) -> PyResult<()> {
        let size = readonly::<f64>("kp_size", kp_size)?;
        let stay = readonly::<i32>("kp_stay", kp_stay)?;
        let turnover = readonly::<f64>("kp_turnover", kp_turnover)?;
        let (size, stay, turnover) = (size.as_array(), stay.as_array(), turnover.as_array());
        Ok(self.inner.init_keypop_size_params(size, stay, turnover)?)
    }

    fn init_keypop_married(&mut self, prop_married: &Bound<'_, PyAny>) -> PyResult<()> {
        let married = readonly::<f64>("prop_married", prop_married)?;
        Ok(self.inner.init_keypop_married(married.as_array())?)
    }

    fn init_mixing_matrix(&mut self, mix_levels: &Bound<'_, PyAny>) -> PyResult<()> {
        let levels = readonly::<f64>("mix_levels", mix_levels)?;
        Ok(self.inner.init_mixing_matrix(levels.as_array())?)
    }

    fn init_sex_acts(&mut self, acts: &Bound<'_, PyAny>) -> PyResult<()> {
        let acts = readonly::<f64>("acts", acts)?;
        Ok(self.inner.init_sex_acts(acts.as_array())?)
    }

    fn init_condom_freq(&mut self, freq: &Bound<'_, PyAny>) -> PyResult<()> {
        let freq = readonly::<f64>("freq", freq)?;
        Ok(self.inner.init_condom_freq(freq.as_array())?)
    }

    fn init_sti_prev(&mut self, prev: &Bound<'_, PyAny>) -> PyResult<()> {
        let prev = readonly::<f64>("sti_prev", prev)?;
        Ok(self.inner.init_sti_prev(prev.as_array())?)
    }

    fn init_epidemic_seed(&mut self, seed_year: i32, seed_prev: f64) -> PyResult<()> {
        Ok(self.inner.init_epidemic_seed(seed_year, seed_prev)?)
    }

    #[allow(clippy::too_many_arguments)]
    fn init_transmission(
        &mut self, transmit_f2m: f64, or_m2f: f64, or_m2m: f64, primary: f64, chronic: f64,
        symptom: f64, or_art_supp: f64, or_art_fail: f64, or_sti_hiv_pos: f64,
        or_sti_hiv_neg: f64,
    ) -> PyResult<()> {
        let params = TransmissionParams {
            transmit_f2m,
            or_m2f,
            or_m2m,
            primary,
            chronic,
            symptom,
            or_art_supp,
            or_art_fail,
            or_sti_hiv_pos,
            or_sti_hiv_neg,
        };
        Ok(self.inner.init_transmission(&params)?)
    }

    fn init_hiv_fertility(
        &mut self, frr_age_off_art: &Bound<'_, PyAny>, frr_cd4_off_art: &Bound<'_, PyAny>,
        frr_age_on_art: &Bound<'_, PyAny>,
    ) -> PyResult<()> {
        let age_off = readonly::<f64>("frr_age_off_art", frr_age_off_art)?;
        let cd4_off = readonly::<f64>("frr_cd4_off_art", frr_cd4_off_art)?;
        let age_on = readonly::<f64>("frr_age_on_art", frr_age_on_art)?;
        Ok(self.inner.init_hiv_fertility(
            age_off.as_array(),
            cd4_off.as_array(),
            age_on.as_array(),
        )?)
    }

    fn init_adult_prog_from_10yr(
        &mut self, dist: &Bound<'_, PyAny>, prog: &Bound<'_, PyAny>, mort: &Bound<'_, PyAny>,
    ) -> PyResult<()> {
        let dist = readonly::<f64>("dist", dist)?;
        let prog = readonly::<f64>("prog", prog)?;
        let mort = readonly::<f64>("mort", mort)?;
        let (dist, prog, mort) = (dist.as_array(), prog.as_array(), mort.as_array());
        Ok(self.inner.init_adult_prog_from_10yr(dist, prog, mort)?)
    }

    fn init_adult_art_mort_from_10yr(
        &mut self, art1: &Bound<'_, PyAny>, art2: &Bound<'_, PyAny>, art3: &Bound<'_, PyAny>,
        art_mrr: &Bound<'_, PyAny>,
    ) -> PyResult<()> {
        let art1 = readonly::<f64>("art1", art1)?;
        let art2 = readonly::<f64>("art2", art2)?;
        let art3 = readonly::<f64>("art3", art3)?;
        let mrr = readonly::<f64>("art_mrr", art_mrr)?;
        Ok(self.inner.init_adult_art_mort_from_10yr(
            art1.as_array(),
            art2.as_array(),
            art3.as_array(),
            mrr.as_array(),
        )?)
    }

    fn init_adult_art_eligibility(&mut self, cd4: &Bound<'_, PyAny>) -> PyResult<()> {
        let cd4 = readonly::<i32>("cd4", cd4)?;
        Ok(self.inner.init_adult_art_eligibility(cd4.as_array())?)
    }

    fn init_adult_art_curr(
        &mut self, n_art: &Bound<'_, PyAny>, p_art: &Bound<'_, PyAny>,
    ) -> PyResult<()> {
        let n_art = readonly::<f64>("n_art", n_art)?;
        let p_art = readonly::<f64>("p_art", p_art)?;
        Ok(self.inner.init_adult_art_curr(n_art.as_array(), p_art.as_array())?)
    }

    fn init_adult_art_allocation(&mut self, weight: f64) -> PyResult<()> {
        Ok(self.inner.init_adult_art_allocation(weight)?)
    }

    fn init_adult_art_interruption(&mut self, art_exit_rate: &Bound<'_, PyAny>) -> PyResult<()> {
        let exit = readonly::<f64>("art_exit_rate", art_exit_rate)?;
        Ok(self.inner.init_adult_art_interruption(exit.as_array())?)
    }

    fn init_adult_art_suppressed(&mut self, art_supp_pct: &Bound<'_, PyAny>) -> PyResult<()> {
        let supp = readonly::<f64>("art_supp_pct", art_supp_pct)?;
        Ok(self.inner.init_adult_art_suppressed(supp.as_array())?)
    }

    fn init_male_circumcision_uptake(&mut self, uptake: &Bound<'_, PyAny>) -> PyResult<()> {
        let uptake = readonly::<f64>("uptake", uptake)?;
        Ok(self.inner.init_male_circumcision_uptake(uptake.as_array())?)
    }

    fn init_clhiv_agein(&mut self, clhiv: &Bound<'_, PyAny>) -> PyResult<()> {
        let clhiv = readonly::<f64>("clhiv", clhiv)?;
        Ok(self.inner.init_clhiv_agein(clhiv.as_array())?)
    }

    fn init_effect_vmmc(&mut self, effect: f64) -> PyResult<()> {
        Ok(self.inner.init_effect_vmmc(effect)?)
    }

    fn init_effect_condom(&mut self, effect: f64) -> PyResult<()> {
        Ok(self.inner.init_effect_condom(effect)?)
    }
}

/// Smoothed single-age circumcision probabilities `[T, 81]` from 5-year
/// uptake percentages `[T, 17]`.
#[cfg(feature = "python-bindings")]
#[pyfunction]
fn uptake_probabilities<'py>(
    py: Python<'py>, uptake: &Bound<'py, PyAny>,
) -> PyResult<Bound<'py, PyArray2<f64>>> {
    let uptake = readonly::<f64>("uptake", uptake)?;
    let view = uptake.as_array();
    let actual = view.ndim();
    let view = view.into_dimensionality::<Ix2>().map_err(|_| {
        ProjectionError::from(BufferError::InvalidRank { buffer: "uptake", expected: 2, actual })
    })?;
    let probs = ingest::uptake_probabilities(view)?;
    Ok(probs.into_pyarray(py))
}

/// _goals_proj — PyO3 module initializer for the Python extension.
///
/// Registers the `Projection` class and `uptake_probabilities`. Invoked by
/// Python when importing the compiled extension.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _goals_proj(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyProjection>()?;
    m.add_function(wrap_pyfunction!(uptake_probabilities, m)?)?;
    Ok(())
}
