//! Parameter keys, coordinates, values, and staged write batches.
//!
//! Purpose
//! -------
//! Define the vocabulary shared between ingestion and an engine's parameter
//! store: which parameter ([`ParamKey`]), where in it ([`Coord`]), and what
//! value ([`ParamValue`]). [`ParamBatch`] stages every write of one ingestion
//! call so the store only sees complete, successfully converted calls.
//!
//! Conventions
//! -----------
//! - Coordinates are 0-based indices in the order documented on each key.
//!   Sex is female-first, years are indices from the first projection year,
//!   adult ages are offsets from age 15.
//! - Scalars use [`Coord::SCALAR`].
use std::fmt;

/// Maximum coordinate rank of any parameter.
pub const MAX_COORD_RANK: usize = 4;

/// Engine parameter identifiers. Coordinate order is given per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParamKey {
    /// `[t, band]` age-specific fertility distribution by reproductive 5-year group.
    Pasfr5,
    /// `[sex, t, band]` absolute net migrants by 5-year group.
    NetMigration5,
    /// Scalar flag: drive incidence directly rather than mechanistically.
    DirectIncidence,
    /// `[t]` adult incidence.
    Incidence,
    /// `[t]` female-to-male incidence rate ratio.
    IrrSex,
    /// `[sex, t, band]` incidence rate ratio by 5-year group.
    IrrAge5,
    /// `[sex, t, pop]` incidence rate ratio by risk group.
    IrrPop,
    /// `[sex]` median age at sexual debut.
    MedianAgeDebut,
    /// `[sex]` median age at first union.
    MedianAgeUnion,
    /// Scalar mean union duration in years.
    MeanUnionDuration,
    /// `[sex, pop]` key population share of the 15-49 population.
    KeypopSize,
    /// `[sex, pop]` integer flag: members remain after entry.
    KeypopStay,
    /// `[sex, pop]` mean years spent in the key population.
    KeypopDuration,
    /// `[sex, pop]` log-scale location of the member age distribution.
    KeypopAgeLocation,
    /// `[sex, pop]` shape of the member age distribution.
    KeypopAgeShape,
    /// `[sex, pop]` proportion with a main opposite-sex partner.
    KeypopMarried,
    /// `[sex_i, pop_i, sex_j, pop_j]` integer mixing level in {0, 1, 2}.
    MixStructure,
    /// `[bond]` sex acts per year.
    SexActs,
    /// `[t, bond]` probability of condom use at last sex.
    CondomFreq,
    /// `[t, sex, adult_age, pop]` STI symptom prevalence.
    StiPrevalence,
    /// Scalar integer: years after the first projection year the epidemic starts.
    SeedTime,
    /// Scalar HIV prevalence in the seed year.
    SeedPrevalence,
    /// `[component]` transmission probability and odds ratios.
    Transmission,
    /// `[t, birth_age]` fertility rate ratio off ART.
    FrrAgeOffArt,
    /// `[stage]` fertility rate ratio off ART by HIV stage.
    FrrCd4OffArt,
    /// `[birth_age]` fertility rate ratio on ART.
    FrrAgeOnArt,
    /// `[stage, sex, adult_age]` CD4 distribution at infection.
    Cd4Distribution,
    /// `[stage, sex, adult_age]` CD4 progression rate.
    Cd4Progression,
    /// `[stage, sex, adult_age]` HIV mortality off ART.
    HivMortality,
    /// `[duration, stage, sex, adult_age]` HIV mortality on ART.
    ArtMortality,
    /// `[t, duration]` ART mortality rate ratio.
    ArtMortalityRatio,
    /// `[t]` integer CD4 eligibility threshold.
    ArtEligibilityCd4,
    /// `[t, sex]` adults on ART.
    ArtNumber,
    /// `[t, sex]` proportion of ART need met.
    ArtProportion,
    /// Scalar weight on expected deaths in ART allocation.
    ArtMortalityWeight,
    /// `[t, sex]` ART interruption hazard.
    ArtInterruption,
    /// `[t, sex, adult_age]` proportion virally suppressed on ART.
    ArtSuppressed,
    /// `[t, age]` yearly male circumcision uptake probability.
    CircumcisionUptake,
    /// Scalar reduction in acquisition when circumcised.
    EffectVmmc,
    /// Scalar reduction in transmission per condom-protected act.
    EffectCondom,
    /// `[t, stratum]` children living with HIV reaching age 15.
    ClhivAgeIn,
}

/// Value written into the parameter store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Real(f64),
    Int(i32),
    Flag(bool),
}

impl ParamValue {
    pub fn as_real(self) -> Option<f64> {
        match self {
            ParamValue::Real(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int(self) -> Option<i32> {
        match self {
            ParamValue::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_flag(self) -> Option<bool> {
        match self {
            ParamValue::Flag(v) => Some(v),
            _ => None,
        }
    }
}

/// Fixed-capacity parameter coordinate.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Coord {
    rank: u8,
    idx: [usize; MAX_COORD_RANK],
}

impl Coord {
    /// Coordinate of a scalar parameter.
    pub const SCALAR: Coord = Coord { rank: 0, idx: [0; MAX_COORD_RANK] };

    /// Build from indices.
    ///
    /// Panics
    /// ------
    /// - If `indices.len() > MAX_COORD_RANK`; no parameter has that rank.
    pub fn new(indices: &[usize]) -> Coord {
        let rank = indices.len();
        assert!(rank <= MAX_COORD_RANK, "parameter coordinate rank {rank} too large");
        let mut idx = [0; MAX_COORD_RANK];
        idx[..rank].copy_from_slice(indices);
        Coord { rank: rank as u8, idx }
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.idx[..self.rank as usize]
    }

    pub fn rank(&self) -> usize {
        self.rank as usize
    }
}

impl<const N: usize> From<[usize; N]> for Coord {
    fn from(indices: [usize; N]) -> Coord {
        Coord::new(&indices)
    }
}

impl fmt::Debug for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_slice())
    }
}

/// The engine-side sink for ingested parameters.
///
/// Setters are infallible; values reaching a store have already been shape
/// checked and converted.
pub trait ParameterStore {
    fn set(&mut self, key: ParamKey, at: Coord, value: ParamValue);
}

/// Writes staged by one ingestion call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamBatch {
    writes: Vec<(ParamKey, Coord, ParamValue)>,
}

impl ParamBatch {
    pub fn new() -> ParamBatch {
        ParamBatch::default()
    }

    pub fn with_capacity(capacity: usize) -> ParamBatch {
        ParamBatch { writes: Vec::with_capacity(capacity) }
    }

    pub fn push(&mut self, key: ParamKey, at: impl Into<Coord>, value: ParamValue) {
        self.writes.push((key, at.into(), value));
    }

    pub fn push_real(&mut self, key: ParamKey, at: impl Into<Coord>, value: f64) {
        self.push(key, at, ParamValue::Real(value));
    }

    pub fn push_int(&mut self, key: ParamKey, at: impl Into<Coord>, value: i32) {
        self.push(key, at, ParamValue::Int(value));
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(ParamKey, Coord, ParamValue)> {
        self.writes.iter()
    }

    /// Append every write of `other`.
    pub fn extend(&mut self, other: ParamBatch) {
        self.writes.extend(other.writes);
    }

    /// Apply every staged write in order; returns the number written.
    pub fn commit(self, store: &mut dyn ParameterStore) -> usize {
        let n = self.writes.len();
        for (key, at, value) in self.writes {
            store.set(key, at, value);
        }
        n
    }
}
