//! projection — a projection session over a fixed year range.
//!
//! Purpose
//! -------
//! Tie together the year range, session options, the engine, the
//! last-computed-year controller and every buffer bound for the lifetime of
//! the session. [`Projection`] is the single entry point a host drives:
//! ingest parameters, bind outputs and shared inputs, then project and
//! invalidate incrementally.
//!
//! Key behaviors
//! -------------
//! - `init_*` methods validate their buffers, convert values, and commit the
//!   resulting writes to the engine's parameter store only when the whole
//!   call succeeded.
//! - `share_output_*` bind host arrays the engine writes into, zero-copy.
//! - `share_input_*` bind host arrays the engine reads on every step,
//!   borrowed or copied according to [`ShareMode`].
//! - [`Projection::project`] computes every year after the last computed one
//!   up to the target; [`Projection::invalidate`] marks a year and its
//!   successors for recomputation.
//!
//! Invariants & assumptions
//! ------------------------
//! - Buffers bound by `share_*` must outlive the session; `'buf` enforces
//!   this for Rust callers.
//! - Ingesting parameters never changes the last computed year. Hosts that
//!   change inputs for years already computed call `invalidate` themselves.
//! - A failed call of any kind leaves the parameter store, bound buffers and
//!   the last computed year as they were.
use std::path::Path;

use ndarray::{ArrayView, ArrayViewMut, Dimension};
use tracing::{debug, info, trace, warn};

use crate::{
    engine::{Engine, dims::N_SEX, params::ParamBatch},
    ingest::{
        IngestContext, art, behavior, demography, disease,
        incidence::{self, DirectIncidence, TransmissionParams},
        keypop, log_batch, uptake,
    },
};

pub mod controller;
pub mod errors;
pub mod options;
pub mod workspace;
pub mod years;

pub use self::controller::ProjectionController;
pub use self::errors::{ProjectionError, ProjectionResult};
pub use self::options::{ProjectionOptions, ShareMode};
pub use self::workspace::{
    OutputBuffers, PwidRisk, SharedInput, SharedInputs, StrataBuffers, StrataKind, Workspace,
};
pub use self::years::YearRange;

use self::workspace::{
    AGE_MIXING_SHAPE, POP_ASSORT_SHAPE, bind_output, bind_shared, bind_strata, births_shape,
    new_infections_shape, partner_rate_shape,
};

/// A projection session.
///
/// `E` is the engine the session drives; `'buf` is the lifetime of every
/// host buffer bound with a `share_*` method.
pub struct Projection<'buf, E: Engine> {
    years: YearRange,
    options: ProjectionOptions,
    engine: E,
    controller: ProjectionController,
    workspace: Workspace<'buf>,
}

impl<'buf, E: Engine> Projection<'buf, E> {
    /// Start a session over `first..=last` with default options.
    ///
    /// Errors
    /// ------
    /// - `InvalidYearRange` when `first > last`; `UnrepresentableYearRange` when
    ///   the range overflows `i32` arithmetic.
    pub fn new(first: i32, last: i32, engine: E) -> ProjectionResult<Self> {
        Self::with_options(first, last, engine, ProjectionOptions::default())
    }

    pub fn with_options(
        first: i32, last: i32, engine: E, options: ProjectionOptions,
    ) -> ProjectionResult<Self> {
        let years = YearRange::new(first, last)?;
        debug!(first, last, ?options, "created projection");
        Ok(Projection {
            years,
            options,
            engine,
            controller: ProjectionController::new(years),
            workspace: Workspace::default(),
        })
    }

    pub fn years(&self) -> YearRange {
        self.years
    }

    pub fn options(&self) -> &ProjectionOptions {
        &self.options
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Direct engine access. Changing engine state this way does not
    /// invalidate computed years.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn workspace(&self) -> &Workspace<'buf> {
        &self.workspace
    }

    /// Last calendar year computed, or `first - 1` when none is.
    pub fn last_valid_year(&self) -> i32 {
        self.controller.last_valid_year()
    }

    /// Load demographic inputs into the engine.
    ///
    /// Errors
    /// ------
    /// - `EngineInit` carrying the engine's error.
    pub fn initialize(&mut self, demography: impl AsRef<Path>) -> ProjectionResult<()> {
        let path = demography.as_ref();
        self.engine.initialize(path).map_err(ProjectionError::EngineInit)?;
        info!(path = %path.display(), "initialized engine");
        Ok(())
    }

    // ---- Incremental computation ----

    /// Compute every year after the last computed one through `year`.
    ///
    /// A no-op when `year` is already computed.
    ///
    /// Errors
    /// ------
    /// - `YearOutOfRange` when `year` is outside the projection.
    /// - `Engine` when a year fails; the last computed year is then what it
    ///   was before the call.
    pub fn project(&mut self, year: i32) -> ProjectionResult<()> {
        let Projection { engine, controller, workspace, .. } = self;
        let start = controller.last_valid_year();
        match controller.advance(year, |t| engine.project_year(t, workspace)) {
            Ok(0) => {
                trace!(year, last_valid = start, "target already computed");
                Ok(())
            }
            Ok(computed) => {
                info!(from = start + 1, to = year, computed, "projected");
                Ok(())
            }
            Err(err) => {
                warn!(year, last_valid = start, error = %err, "projection failed");
                Err(err)
            }
        }
    }

    /// Mark `year` and every later year for recomputation; a negative year
    /// invalidates everything.
    ///
    /// Errors
    /// ------
    /// - `YearOutOfRange` for a non-negative year outside the projection.
    pub fn invalidate(&mut self, year: i32) -> ProjectionResult<()> {
        self.controller.invalidate(year)?;
        debug!(year, last_valid = self.controller.last_valid_year(), "invalidated");
        Ok(())
    }

    // ---- Outputs ----

    /// Bind population outputs by stratum.
    pub fn share_output_population<D1, D2, D3, D4>(
        &mut self, adult_neg: ArrayViewMut<'buf, f64, D1>, adult_hiv: ArrayViewMut<'buf, f64, D2>,
        child_neg: ArrayViewMut<'buf, f64, D3>, child_hiv: ArrayViewMut<'buf, f64, D4>,
    ) -> ProjectionResult<()>
    where
        D1: Dimension,
        D2: Dimension,
        D3: Dimension,
        D4: Dimension,
    {
        let n = self.years.len();
        let strata =
            bind_strata(StrataKind::Population, n, adult_neg, adult_hiv, child_neg, child_hiv)?;
        self.workspace.outputs.population = Some(strata);
        Ok(())
    }

    /// Bind deaths by stratum.
    pub fn share_output_deaths<D1, D2, D3, D4>(
        &mut self, adult_neg: ArrayViewMut<'buf, f64, D1>, adult_hiv: ArrayViewMut<'buf, f64, D2>,
        child_neg: ArrayViewMut<'buf, f64, D3>, child_hiv: ArrayViewMut<'buf, f64, D4>,
    ) -> ProjectionResult<()>
    where
        D1: Dimension,
        D2: Dimension,
        D3: Dimension,
        D4: Dimension,
    {
        let n = self.years.len();
        let strata =
            bind_strata(StrataKind::Deaths, n, adult_neg, adult_hiv, child_neg, child_hiv)?;
        self.workspace.outputs.deaths = Some(strata);
        Ok(())
    }

    /// Bind births by year and sex, `[T, 2]`.
    pub fn share_output_births<D: Dimension>(
        &mut self, births: ArrayViewMut<'buf, f64, D>,
    ) -> ProjectionResult<()> {
        let bound = bind_output("births", births, &births_shape(self.years.len()))?;
        self.workspace.outputs.births = Some(bound);
        Ok(())
    }

    /// Bind births to mothers living with HIV, `[T]`.
    pub fn share_output_births_exposed<D: Dimension>(
        &mut self, births: ArrayViewMut<'buf, f64, D>,
    ) -> ProjectionResult<()> {
        let bound = bind_output("births_exposed", births, &[self.years.len()])?;
        self.workspace.outputs.births_exposed = Some(bound);
        Ok(())
    }

    /// Bind new infections, `[T, 3, 81, 8]`.
    pub fn share_output_new_infections<D: Dimension>(
        &mut self, newhiv: ArrayViewMut<'buf, f64, D>,
    ) -> ProjectionResult<()> {
        let shape = new_infections_shape(self.years.len());
        let bound = bind_output("new_infections", newhiv, &shape)?;
        self.workspace.outputs.new_infections = Some(bound);
        Ok(())
    }

    // ---- Shared inputs ----

    /// Partner change rates, `[T, 2, 66, 8]`.
    pub fn share_input_partner_rate<D: Dimension>(
        &mut self, rate: ArrayView<'buf, f64, D>,
    ) -> ProjectionResult<()> {
        let shape = partner_rate_shape(self.years.len());
        let held = bind_shared("partner_rate", rate, &shape, self.options.share_mode)?;
        self.workspace.inputs.set_partner_rate(held);
        Ok(())
    }

    /// Age mixing between adult ages of each sex, `[2, 66, 2, 66]`.
    pub fn share_input_age_mixing<D: Dimension>(
        &mut self, mix: ArrayView<'buf, f64, D>,
    ) -> ProjectionResult<()> {
        let held = bind_shared("age_mixing", mix, &AGE_MIXING_SHAPE, self.options.share_mode)?;
        self.workspace.inputs.set_age_mixing(held);
        Ok(())
    }

    /// Risk-group assortativity by sex, `[2, 8]`.
    pub fn share_input_pop_assort<D: Dimension>(
        &mut self, assort: ArrayView<'buf, f64, D>,
    ) -> ProjectionResult<()> {
        let held = bind_shared("pop_assort", assort, &POP_ASSORT_SHAPE, self.options.share_mode)?;
        self.workspace.inputs.set_pop_assort(held);
        Ok(())
    }

    /// PWID force of infection `[T, 2]` and needle sharing `[T]`.
    pub fn share_input_pwid_risk<D1: Dimension, D2: Dimension>(
        &mut self, force: ArrayView<'buf, f64, D1>, needle_sharing: ArrayView<'buf, f64, D2>,
    ) -> ProjectionResult<()> {
        let n = self.years.len();
        let mode = self.options.share_mode;
        let force = bind_shared("pwid_force", force, &[n, N_SEX], mode)?;
        let needle_sharing = bind_shared("needle_sharing", needle_sharing, &[n], mode)?;
        self.workspace.inputs.set_pwid_risk(PwidRisk { force, needle_sharing });
        Ok(())
    }

    // ---- Parameter ingestion ----

    fn context(&self) -> IngestContext {
        IngestContext::new(self.years, &self.options)
    }

    fn commit(
        &mut self, operation: &'static str, staged: ProjectionResult<ParamBatch>,
    ) -> ProjectionResult<()> {
        let batch = staged.inspect_err(|err| {
            debug!(operation, error = %err, "rejected parameter input");
        })?;
        log_batch(operation, &batch);
        let written = batch.commit(self.engine.parameters());
        debug!(operation, written, "ingested parameters");
        Ok(())
    }

    /// Fertility distribution by reproductive 5-year group, `[T, 7]`.
    pub fn init_pasfrs_from_5yr<D: Dimension>(
        &mut self, pasfrs: ArrayView<'_, f64, D>,
    ) -> ProjectionResult<()> {
        let staged = demography::pasfrs_from_5yr(&self.context(), pasfrs.into_dyn());
        self.commit("init_pasfrs_from_5yr", staged)
    }

    /// Net migration from totals `[T, 2]` (male, female) and female/male
    /// patterns `[T, 17]`. The patterns are overwritten with absolute counts.
    pub fn init_migr_from_5yr<D1, D2, D3>(
        &mut self, netmigr: ArrayView<'_, f64, D1>, pattern_female: ArrayViewMut<'_, f64, D2>,
        pattern_male: ArrayViewMut<'_, f64, D3>,
    ) -> ProjectionResult<()>
    where
        D1: Dimension,
        D2: Dimension,
        D3: Dimension,
    {
        let staged = demography::migr_from_5yr(
            &self.context(),
            netmigr.into_dyn(),
            pattern_female.into_dyn(),
            pattern_male.into_dyn(),
        );
        self.commit("init_migr_from_5yr", staged)
    }

    pub fn use_direct_incidence(&mut self, flag: bool) -> ProjectionResult<()> {
        self.commit("use_direct_incidence", Ok(incidence::use_direct_incidence(flag)))
    }

    /// Incidence `[T]`, sex ratio `[T]`, age ratios `[T, 17]` and risk-group
    /// ratios `[T, 8]` for each sex.
    pub fn init_direct_incidence(&mut self, arrays: DirectIncidence<'_>) -> ProjectionResult<()> {
        let staged = incidence::direct_incidence(&self.context(), arrays);
        self.commit("init_direct_incidence", staged)
    }

    pub fn init_median_age_debut(
        &mut self, age_female: f64, age_male: f64,
    ) -> ProjectionResult<()> {
        let staged = demography::median_age_debut(&self.context(), age_female, age_male);
        self.commit("init_median_age_debut", staged)
    }

    pub fn init_median_age_union(
        &mut self, age_female: f64, age_male: f64,
    ) -> ProjectionResult<()> {
        let staged = demography::median_age_union(&self.context(), age_female, age_male);
        self.commit("init_median_age_union", staged)
    }

    pub fn init_mean_duration_union(&mut self, years: f64) -> ProjectionResult<()> {
        let staged = demography::mean_duration_union(&self.context(), years);
        self.commit("init_mean_duration_union", staged)
    }

    /// Key population size `[6]`, stay flags `[6]` and turnover `[3, 6]`.
    pub fn init_keypop_size_params<D1, D2, D3>(
        &mut self, size: ArrayView<'_, f64, D1>, stay: ArrayView<'_, i32, D2>,
        turnover: ArrayView<'_, f64, D3>,
    ) -> ProjectionResult<()>
    where
        D1: Dimension,
        D2: Dimension,
        D3: Dimension,
    {
        let staged = keypop::keypop_size_params(
            &self.context(),
            size.into_dyn(),
            stay.into_dyn(),
            turnover.into_dyn(),
        );
        self.commit("init_keypop_size_params", staged)
    }

    pub fn init_keypop_married<D: Dimension>(
        &mut self, married: ArrayView<'_, f64, D>,
    ) -> ProjectionResult<()> {
        let staged = keypop::keypop_married(&self.context(), married.into_dyn());
        self.commit("init_keypop_married", staged)
    }

    /// Mixing levels, `[2, 8, 2, 8]` with values in {0, 1, 2}.
    pub fn init_mixing_matrix<D: Dimension>(
        &mut self, levels: ArrayView<'_, f64, D>,
    ) -> ProjectionResult<()> {
        let staged = behavior::mixing_matrix(&self.context(), levels.into_dyn());
        self.commit("init_mixing_matrix", staged)
    }

    pub fn init_sex_acts<D: Dimension>(
        &mut self, acts: ArrayView<'_, f64, D>,
    ) -> ProjectionResult<()> {
        let staged = behavior::sex_acts(&self.context(), acts.into_dyn());
        self.commit("init_sex_acts", staged)
    }

    pub fn init_condom_freq<D: Dimension>(
        &mut self, freq: ArrayView<'_, f64, D>,
    ) -> ProjectionResult<()> {
        let staged = behavior::condom_freq(&self.context(), freq.into_dyn());
        self.commit("init_condom_freq", staged)
    }

    pub fn init_sti_prev<D: Dimension>(
        &mut self, prev: ArrayView<'_, f64, D>,
    ) -> ProjectionResult<()> {
        let staged = incidence::sti_prev(&self.context(), prev.into_dyn());
        self.commit("init_sti_prev", staged)
    }

    /// Start the epidemic `seed_year` years after the first projection year.
    pub fn init_epidemic_seed(&mut self, seed_year: i32, seed_prev: f64) -> ProjectionResult<()> {
        let staged = incidence::epidemic_seed(&self.context(), seed_year, seed_prev);
        self.commit("init_epidemic_seed", staged)
    }

    pub fn init_transmission(&mut self, params: &TransmissionParams) -> ProjectionResult<()> {
        let staged = incidence::transmission(&self.context(), params);
        self.commit("init_transmission", staged)
    }

    pub fn init_hiv_fertility<D1, D2, D3>(
        &mut self, frr_age_off_art: ArrayView<'_, f64, D1>,
        frr_cd4_off_art: ArrayView<'_, f64, D2>, frr_age_on_art: ArrayView<'_, f64, D3>,
    ) -> ProjectionResult<()>
    where
        D1: Dimension,
        D2: Dimension,
        D3: Dimension,
    {
        let staged = disease::hiv_fertility(
            &self.context(),
            frr_age_off_art.into_dyn(),
            frr_cd4_off_art.into_dyn(),
            frr_age_on_art.into_dyn(),
        );
        self.commit("init_hiv_fertility", staged)
    }

    pub fn init_adult_prog_from_10yr<D1, D2, D3>(
        &mut self, dist: ArrayView<'_, f64, D1>, prog: ArrayView<'_, f64, D2>,
        mort: ArrayView<'_, f64, D3>,
    ) -> ProjectionResult<()>
    where
        D1: Dimension,
        D2: Dimension,
        D3: Dimension,
    {
        let staged = disease::adult_prog_from_10yr(
            &self.context(),
            dist.into_dyn(),
            prog.into_dyn(),
            mort.into_dyn(),
        );
        self.commit("init_adult_prog_from_10yr", staged)
    }

    pub fn init_adult_art_mort_from_10yr<'a, D: Dimension, M: Dimension>(
        &mut self, art1: ArrayView<'a, f64, D>, art2: ArrayView<'a, f64, D>,
        art3: ArrayView<'a, f64, D>, art_mrr: ArrayView<'_, f64, M>,
    ) -> ProjectionResult<()> {
        let tables = [art1.into_dyn(), art2.into_dyn(), art3.into_dyn()];
        let staged = art::art_mort_from_10yr(&self.context(), tables, art_mrr.into_dyn());
        self.commit("init_adult_art_mort_from_10yr", staged)
    }

    pub fn init_adult_art_eligibility<D: Dimension>(
        &mut self, cd4: ArrayView<'_, i32, D>,
    ) -> ProjectionResult<()> {
        let staged = art::art_eligibility(&self.context(), cd4.into_dyn());
        self.commit("init_adult_art_eligibility", staged)
    }

    /// Adults on ART `[T, 2]` and percentage of need met `[T, 2]`, host
    /// columns male-first.
    pub fn init_adult_art_curr<D1: Dimension, D2: Dimension>(
        &mut self, n_art: ArrayView<'_, f64, D1>, p_art: ArrayView<'_, f64, D2>,
    ) -> ProjectionResult<()> {
        let staged = art::art_curr(&self.context(), n_art.into_dyn(), p_art.into_dyn());
        self.commit("init_adult_art_curr", staged)
    }

    pub fn init_adult_art_allocation(&mut self, weight: f64) -> ProjectionResult<()> {
        let staged = art::art_allocation(&self.context(), weight);
        self.commit("init_adult_art_allocation", staged)
    }

    /// Annual dropout percentages `[T, 2]`, host columns male-first.
    pub fn init_adult_art_interruption<D: Dimension>(
        &mut self, art_exit_rate: ArrayView<'_, f64, D>,
    ) -> ProjectionResult<()> {
        let staged = art::art_interruption(&self.context(), art_exit_rate.into_dyn());
        self.commit("init_adult_art_interruption", staged)
    }

    pub fn init_adult_art_suppressed<D: Dimension>(
        &mut self, art_supp_pct: ArrayView<'_, f64, D>,
    ) -> ProjectionResult<()> {
        let staged = art::art_suppressed(&self.context(), art_supp_pct.into_dyn());
        self.commit("init_adult_art_suppressed", staged)
    }

    /// Circumcision uptake percentages by 5-year group, `[T, 17]`.
    pub fn init_male_circumcision_uptake<D: Dimension>(
        &mut self, uptake: ArrayView<'_, f64, D>,
    ) -> ProjectionResult<()> {
        let staged = uptake::male_circumcision_uptake(&self.context(), uptake.into_dyn());
        self.commit("init_male_circumcision_uptake", staged)
    }

    pub fn init_effect_vmmc(&mut self, effect: f64) -> ProjectionResult<()> {
        let staged = uptake::effect_vmmc(&self.context(), effect);
        self.commit("init_effect_vmmc", staged)
    }

    pub fn init_effect_condom(&mut self, effect: f64) -> ProjectionResult<()> {
        let staged = behavior::effect_condom(&self.context(), effect);
        self.commit("init_effect_condom", staged)
    }

    pub fn init_clhiv_agein<D: Dimension>(
        &mut self, clhiv: ArrayView<'_, f64, D>,
    ) -> ProjectionResult<()> {
        let staged = disease::clhiv_agein(&self.context(), clhiv.into_dyn());
        self.commit("init_clhiv_agein", staged)
    }
}
