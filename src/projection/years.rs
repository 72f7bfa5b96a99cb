//! Projection year range.
use crate::projection::errors::{ProjectionError, ProjectionResult};

/// Inclusive calendar-year range `[first, last]` of a projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    first: i32,
    last: i32,
}

impl YearRange {
    /// Errors
    /// ------
    /// - `ProjectionError::InvalidYearRange` when `first > last`.
    /// - `ProjectionError::UnrepresentableYearRange` when `first - 1` or the
    ///   year count overflows `i32`.
    pub fn new(first: i32, last: i32) -> ProjectionResult<YearRange> {
        if first > last {
            return Err(ProjectionError::InvalidYearRange { first, last });
        }
        let span = last.checked_sub(first).and_then(|d| d.checked_add(1));
        if first.checked_sub(1).is_none() || span.is_none() {
            return Err(ProjectionError::UnrepresentableYearRange { first, last });
        }
        Ok(YearRange { first, last })
    }

    pub fn first(&self) -> i32 {
        self.first
    }

    pub fn last(&self) -> i32 {
        self.last
    }

    /// Number of projection years `T`.
    pub fn len(&self) -> usize {
        (self.last - self.first) as usize + 1
    }

    /// Always `false`; a range holds at least one year.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.first..=self.last).contains(&year)
    }

    /// 0-based index of `year`.
    pub fn index_of(&self, year: i32) -> Option<usize> {
        self.contains(year).then(|| (year - self.first) as usize)
    }

    /// Calendar year at index `idx`.
    pub fn year_at(&self, idx: usize) -> i32 {
        self.first + idx as i32
    }

    /// `Ok(year)` if in range, else `YearOutOfRange`.
    pub fn check(&self, year: i32) -> ProjectionResult<i32> {
        if self.contains(year) {
            Ok(year)
        } else {
            Err(ProjectionError::YearOutOfRange { year, first: self.first, last: self.last })
        }
    }
}
