//! Fixed engine cardinalities and category indices.
//!
//! Every shape contract at the host boundary is built from these constants
//! plus the number of projection years. Category indices are 0-based and
//! female-first for sex.

/// Sexes (female, male).
pub const N_SEX: usize = 2;
pub const FEMALE: usize = 0;
pub const MALE: usize = 1;

/// Sex with male circumcision status (female, uncircumcised male, circumcised male).
pub const N_SEX_MC: usize = 3;

/// Single ages 0..=80.
pub const N_AGE: usize = 81;
/// Adult single ages 15..=80.
pub const N_AGE_ADULT: usize = 66;
/// Child single ages 0..=14.
pub const N_AGE_CHILD: usize = 15;
/// Reproductive single ages 15..=49.
pub const N_AGE_BIRTH: usize = 35;
/// First adult age.
pub const AGE_ADULT_MIN: usize = 15;

/// Five-year age groups 0-4, 5-9, ..., 80+.
pub const N_AGE_5YR: usize = 17;
/// Reproductive five-year age groups 15-19, ..., 45-49.
pub const N_AGE_BIRTH_5YR: usize = 7;
/// Adult ten-year age groups 15-24, 25-34, 35-44, 45+.
pub const N_AGE_10YR: usize = 4;

/// Behavioral risk groups.
pub const N_POP: usize = 8;
pub const POP_NOSEX: usize = 0;
pub const POP_NEVER: usize = 1;
pub const POP_UNION: usize = 2;
pub const POP_SPLIT: usize = 3;
pub const POP_PWID: usize = 4;
/// Female sex workers (female) and their male clients share one index.
pub const POP_FSW: usize = 5;
pub const POP_CSW: usize = 5;
pub const POP_MSM: usize = 6;
pub const POP_TGW: usize = 7;

/// Adult HIV stages (primary infection, then CD4 categories).
pub const N_HIV_ADULT: usize = 7;
/// Pediatric CD4 categories.
pub const N_HIV_CHILD: usize = 6;
/// Care status: off ART stages plus ART durations.
pub const N_DTX: usize = 6;

/// Partnership types (main, casual, commercial, MSM).
pub const N_BOND: usize = 4;

/// ART mortality-rate-ratio durations ([0,12), 12+ months).
pub const N_ART_MRR: usize = 2;
/// ART mortality schedules ([0,6), [6,12), 12+ months).
pub const N_ART_MORT: usize = 3;

/// Children-living-with-HIV age-in strata (sex × pediatric CD4 × timing).
pub const N_CLHIV_STRATA: usize = N_SEX * N_HIV_CHILD * 7;

/// Transmission parameters accepted by `init_transmission`.
pub const N_TRANSMISSION: usize = 10;

/// Key populations as (sex, risk group), in host column order.
pub const KEYPOPS: [(usize, usize); 6] = [
    (FEMALE, POP_PWID),
    (MALE, POP_PWID),
    (FEMALE, POP_FSW),
    (MALE, POP_CSW),
    (MALE, POP_MSM),
    (MALE, POP_TGW),
];
pub const N_KEYPOP: usize = KEYPOPS.len();

/// Column of a sex × ten-year-age table (male 15-24 .. male 45+, then female).
pub fn sex_age10_column(sex: usize, adult_age: usize) -> usize {
    let band = (adult_age / 10).min(N_AGE_10YR - 1);
    if sex == MALE { band } else { band + N_AGE_10YR }
}

/// Engine sex index of a host column stored male-first.
pub fn host_sex(column: usize) -> usize {
    N_SEX - 1 - column
}
