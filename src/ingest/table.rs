//! Declarative array ingestion.
//!
//! Purpose
//! -------
//! Most parameters differ only in which axes their host array has, how those
//! axes map onto engine coordinates, and which unit conversion applies. An
//! [`ArraySpec`] states exactly that, and [`ingest_array`] is the one routine
//! that walks any spec.
//!
//! Key behaviors
//! -------------
//! - [`ArraySpec::bind`] validates a host array against the shape derived from
//!   its `ArraySpec` and the projection length.
//! - [`ingest_array`] iterates the *engine* coordinate space in row-major
//!   order, looks up the host element each coordinate reads, converts it, and
//!   stages the write.
//!
//! Conventions
//! -----------
//! - Engine coordinates are emitted in host axis order, after an optional
//!   caller prefix (e.g. sex or ART duration for parameters supplied as
//!   several arrays).
//! - [`Axis::HostSex`] columns are male-first on the host; the engine
//!   coordinate is female-first.
//! - [`Axis::Grouped`] maps engine single age `a` to host column
//!   `a / width`; [`Axis::SexAge10`] maps `(sex, adult age)` to the ten-year
//!   column `min(age / 10, 3)` (+4 for females).
use ndarray::ArrayViewD;

use crate::{
    buffer::{BufferView, HostElement},
    engine::{
        dims::{N_AGE_10YR, N_AGE_ADULT, N_SEX, host_sex, sex_age10_column},
        params::{Coord, MAX_COORD_RANK, ParamBatch, ParamKey},
    },
    ingest::{Conversion, IngestContext},
    projection::errors::ProjectionResult,
};

/// One host axis and the engine coordinates it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// One entry per projection year.
    Year,
    /// Fixed extent, host index equals engine index.
    Index(usize),
    /// Sex stored male-first on the host.
    HostSex,
    /// `ages` engine single ages read from `ceil(ages / width)` host groups.
    Grouped { ages: usize, width: usize },
    /// Eight sex × ten-year-age columns covering both sexes and all adult ages.
    SexAge10,
}

impl Axis {
    fn host_extent(self, n_years: usize) -> usize {
        match self {
            Axis::Year => n_years,
            Axis::Index(n) => n,
            Axis::HostSex => N_SEX,
            Axis::Grouped { ages, width } => ages.div_ceil(width),
            Axis::SexAge10 => N_SEX * N_AGE_10YR,
        }
    }

    fn engine_extent(self, n_years: usize) -> usize {
        match self {
            Axis::Grouped { ages, .. } => ages,
            Axis::SexAge10 => N_SEX * N_AGE_ADULT,
            other => other.host_extent(n_years),
        }
    }

    /// Push the engine coordinate(s) of engine position `k`; return the host index.
    fn resolve(self, k: usize, coord: &mut Vec<usize>) -> usize {
        match self {
            Axis::Year | Axis::Index(_) => {
                coord.push(k);
                k
            }
            Axis::HostSex => {
                coord.push(host_sex(k));
                k
            }
            Axis::Grouped { width, .. } => {
                coord.push(k);
                k / width
            }
            Axis::SexAge10 => {
                let (sex, age) = (k / N_AGE_ADULT, k % N_AGE_ADULT);
                coord.push(sex);
                coord.push(age);
                sex_age10_column(sex, age)
            }
        }
    }
}

/// Declarative description of an array-valued parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArraySpec {
    /// Host argument name, used in errors.
    pub name: &'static str,
    pub key: ParamKey,
    pub axes: &'static [Axis],
    pub convert: Conversion,
}

impl ArraySpec {
    /// Expected host shape for a projection of `n_years`.
    pub fn shape(&self, n_years: usize) -> Vec<usize> {
        self.axes.iter().map(|a| a.host_extent(n_years)).collect()
    }

    /// Validate `view` against this spec.
    pub fn bind<'a, T: HostElement>(
        &self, ctx: &IngestContext, view: ArrayViewD<'a, T>,
    ) -> ProjectionResult<BufferView<'a, T>> {
        Ok(BufferView::bind(self.name, view, &self.shape(ctx.n_years()))?)
    }
}

/// Convert every element `spec` covers and stage it in `batch`.
///
/// `bound` must have been produced by [`ArraySpec::bind`] for the same spec.
/// On error nothing is guaranteed about `batch`; callers discard it.
pub fn ingest_array<T: HostElement>(
    ctx: &IngestContext, spec: &ArraySpec, bound: &BufferView<'_, T>, prefix: &[usize],
    batch: &mut ParamBatch,
) -> ProjectionResult<()> {
    let n_years = ctx.n_years();
    debug_assert_eq!(bound.shape(), spec.shape(n_years).as_slice());

    let extents: Vec<usize> = spec.axes.iter().map(|a| a.engine_extent(n_years)).collect();
    let total: usize = extents.iter().product();
    let mut position = vec![0usize; extents.len()];
    let mut host = vec![0usize; extents.len()];
    let mut coord = Vec::with_capacity(MAX_COORD_RANK);

    for _ in 0..total {
        coord.clear();
        coord.extend_from_slice(prefix);
        for (i, axis) in spec.axes.iter().enumerate() {
            host[i] = axis.resolve(position[i], &mut coord);
        }

        let raw = bound[host.as_slice()].to_f64();
        let value = ctx.convert(spec.name, spec.convert, &host, raw)?;
        batch.push(spec.key, Coord::new(&coord), value);

        for i in (0..position.len()).rev() {
            position[i] += 1;
            if position[i] < extents[i] {
                break;
            }
            position[i] = 0;
        }
    }
    Ok(())
}

/// Bind `host` against `spec` and stage every element it covers.
pub fn ingest_spec<T: HostElement>(
    ctx: &IngestContext, spec: &ArraySpec, host: ArrayViewD<'_, T>,
) -> ProjectionResult<ParamBatch> {
    let bound = spec.bind(ctx, host)?;
    let mut batch = ParamBatch::with_capacity(bound.len());
    ingest_array(ctx, spec, &bound, &[], &mut batch)?;
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{
        dims::{FEMALE, MALE},
        params::ParamValue,
    };
    use crate::ingest::tests::context;
    use ndarray::{Array2, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Shape derivation from axes.
    // - Coordinate mapping for year, host-sex, grouped-age and ten-year axes.
    // - Prefix handling and error propagation from conversions.
    // -------------------------------------------------------------------------

    const YEAR_SEX: ArraySpec = ArraySpec {
        name: "n_art",
        key: ParamKey::ArtNumber,
        axes: &[Axis::Year, Axis::HostSex],
        convert: Conversion::Identity,
    };

    #[test]
    // Purpose
    // -------
    // Host-sex columns are male-first; engine coordinates are female-first.
    //
    // Given
    // -----
    // - A [2, 2] array with male values in column 0.
    //
    // Expect
    // ------
    // - Column 0 is staged at sex MALE, column 1 at FEMALE, for every year.
    fn host_sex_columns_swap() {
        let ctx = context(2);
        let host = array![[10.0, 20.0], [11.0, 21.0]];
        let bound = YEAR_SEX.bind(&ctx, host.view().into_dyn()).unwrap();
        let mut batch = ParamBatch::new();

        ingest_array(&ctx, &YEAR_SEX, &bound, &[], &mut batch).unwrap();

        let writes: Vec<_> = batch.iter().copied().collect();
        assert_eq!(writes.len(), 4);
        assert_eq!(writes[0], (ParamKey::ArtNumber, Coord::from([0, MALE]), ParamValue::Real(10.0)));
        assert_eq!(writes[1], (ParamKey::ArtNumber, Coord::from([0, FEMALE]), ParamValue::Real(20.0)));
        assert_eq!(writes[3], (ParamKey::ArtNumber, Coord::from([1, FEMALE]), ParamValue::Real(21.0)));
    }

    #[test]
    // Purpose
    // -------
    // Grouped ages expand by integer division, not interpolation.
    fn grouped_ages_bucket() {
        const SPEC: ArraySpec = ArraySpec {
            name: "frr_age_on_art",
            key: ParamKey::FrrAgeOnArt,
            axes: &[Axis::Grouped { ages: 35, width: 5 }],
            convert: Conversion::Identity,
        };
        let ctx = context(1);
        let host = ndarray::Array1::from_iter((0..7).map(f64::from));
        assert_eq!(SPEC.shape(1), vec![7]);
        let bound = SPEC.bind(&ctx, host.view().into_dyn()).unwrap();
        let mut batch = ParamBatch::new();

        ingest_array(&ctx, &SPEC, &bound, &[], &mut batch).unwrap();

        let values: Vec<f64> = batch.iter().map(|w| w.2.as_real().unwrap()).collect();
        assert_eq!(values.len(), 35);
        assert_eq!(values[4], 0.0);
        assert_eq!(values[5], 1.0);
        assert_eq!(values[34], 6.0);
    }

    #[test]
    // Purpose
    // -------
    // Ten-year sex × age columns expand to (sex, adult age) coordinates after
    // the caller prefix.
    //
    // Given
    // -----
    // - A [1, 8] row holding its own column index.
    // - Prefix [2].
    //
    // Expect
    // ------
    // - Female age 0 reads column 4, male age 65 reads column 3, and every
    //   coordinate starts with 2.
    fn ten_year_columns_expand() {
        const SPEC: ArraySpec = ArraySpec {
            name: "art3",
            key: ParamKey::ArtMortality,
            axes: &[Axis::Index(1), Axis::SexAge10],
            convert: Conversion::Identity,
        };
        let ctx = context(1);
        let host = Array2::from_shape_fn((1, 8), |(_, c)| c as f64);
        let bound = SPEC.bind(&ctx, host.view().into_dyn()).unwrap();
        let mut batch = ParamBatch::new();

        ingest_array(&ctx, &SPEC, &bound, &[2], &mut batch).unwrap();

        assert_eq!(batch.len(), 2 * 66);
        let lookup = |sex: usize, age: usize| {
            batch
                .iter()
                .find(|w| w.1 == Coord::from([2, 0, sex, age]))
                .and_then(|w| w.2.as_real())
        };
        assert_eq!(lookup(FEMALE, 0), Some(4.0));
        assert_eq!(lookup(FEMALE, 25), Some(6.0));
        assert_eq!(lookup(MALE, 65), Some(3.0));
        assert_eq!(lookup(MALE, 12), Some(1.0));
    }

    #[test]
    // Purpose
    // -------
    // A non-finite element aborts the call with its host index.
    fn non_finite_value_is_reported() {
        let ctx = context(2);
        let host = array![[1.0, 2.0], [f64::NAN, 4.0]];
        let bound = YEAR_SEX.bind(&ctx, host.view().into_dyn()).unwrap();
        let mut batch = ParamBatch::new();

        let err = ingest_array(&ctx, &YEAR_SEX, &bound, &[], &mut batch).unwrap_err();

        match err {
            crate::projection::ProjectionError::InvalidValue { param, index, .. } => {
                assert_eq!(param, "n_art");
                assert_eq!(index, vec![1, 0]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
