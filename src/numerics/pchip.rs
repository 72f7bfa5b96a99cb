//! Piecewise cubic Hermite interpolating polynomial (PCHIP).
//!
//! Purpose
//! -------
//! Shape-preserving cubic interpolation through monotone data, with
//! caller-supplied endpoint derivatives.
//!
//! Key behaviors
//! -------------
//! - Interior knot slopes follow Fritsch–Carlson with the Fritsch–Butland
//!   weighting: zero where adjacent secant slopes change sign or either is
//!   zero, otherwise the weighted harmonic mean
//!   `(w1 + w2) / (w1 / d[k-1] + w2 / d[k])` with `w1 = 2h[k] + h[k-1]` and
//!   `w2 = h[k] + 2h[k-1]`.
//! - Endpoint slopes are taken as given. Callers that need a particular
//!   boundary estimate compute it themselves.
//! - Evaluation uses the cubic Hermite basis on the interval containing `x`;
//!   values outside `[x[0], x[n-1]]` extrapolate the end cubic.
//!
//! Invariants & assumptions
//! ------------------------
//! - At least three knots, strictly increasing, with matching `y` length.
//! - Interpolation is exact at knots.
//! - For monotone data with endpoint slopes of the data's sign, the
//!   interpolant is monotone.
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PchipError {
    #[error("pchip needs at least 3 knots, got {0}")]
    TooFewKnots(usize),
    #[error("pchip knot and value counts differ ({x} vs {y})")]
    LengthMismatch { x: usize, y: usize },
    #[error("pchip knots must be strictly increasing (violated at index {0})")]
    NonIncreasingKnots(usize),
}

/// PCHIP interpolant.
#[derive(Debug, Clone, PartialEq)]
pub struct Pchip {
    x: Vec<f64>,
    y: Vec<f64>,
    slopes: Vec<f64>,
}

impl Pchip {
    /// Fit through `(x, y)` with endpoint derivatives `left` and `right`.
    ///
    /// Errors
    /// ------
    /// - `PchipError` when fewer than 3 knots are given, lengths differ, or
    ///   `x` is not strictly increasing.
    pub fn new(x: &[f64], y: &[f64], left: f64, right: f64) -> Result<Pchip, PchipError> {
        let n = x.len();
        if n != y.len() {
            return Err(PchipError::LengthMismatch { x: n, y: y.len() });
        }
        if n < 3 {
            return Err(PchipError::TooFewKnots(n));
        }
        if let Some(k) = (1..n).find(|&k| !(x[k] > x[k - 1])) {
            return Err(PchipError::NonIncreasingKnots(k));
        }

        let mut slopes = vec![0.0; n];
        slopes[0] = left;
        slopes[n - 1] = right;
        for k in 1..n - 1 {
            let h_prev = x[k] - x[k - 1];
            let d_prev = (y[k] - y[k - 1]) / h_prev;
            let h_next = x[k + 1] - x[k];
            let d_next = (y[k + 1] - y[k]) / h_next;
            slopes[k] = interior_slope(h_prev, d_prev, h_next, d_next);
        }

        Ok(Pchip { x: x.to_vec(), y: y.to_vec(), slopes })
    }

    pub fn knots(&self) -> &[f64] {
        &self.x
    }

    pub fn slopes(&self) -> &[f64] {
        &self.slopes
    }

    /// Interpolated value at `t`.
    pub fn eval(&self, t: f64) -> f64 {
        let n = self.x.len();
        // Interval i satisfies x[i] <= t < x[i+1], clamped to the end intervals.
        let i = self.x.partition_point(|&xk| xk <= t).clamp(1, n - 1) - 1;

        let (x0, x1) = (self.x[i], self.x[i + 1]);
        let (y0, y1) = (self.y[i], self.y[i + 1]);
        let (s0, s1) = (self.slopes[i], self.slopes[i + 1]);
        let dx = x1 - x0;
        let u = (t - x0) / dx;
        let v = 1.0 - u;

        let left = y0 * (1.0 + 2.0 * u) + s0 * (t - x0);
        let right = y1 * (3.0 - 2.0 * u) - dx * s1 * v;
        v * v * left + u * u * right
    }
}

fn interior_slope(h_prev: f64, d_prev: f64, h_next: f64, d_next: f64) -> f64 {
    if d_prev == 0.0 || d_next == 0.0 || (d_prev > 0.0) != (d_next > 0.0) {
        return 0.0;
    }
    let w1 = 2.0 * h_next + h_prev;
    let w2 = h_next + 2.0 * h_prev;
    (w1 + w2) / (w1 / d_prev + w2 / d_next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Exact interpolation at knots and reproduction of straight lines.
    // - Zero interior slopes at local extrema and flat segments.
    // - Monotonicity on monotone data.
    // - Input validation.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // A straight line with matching endpoint slopes is reproduced exactly.
    fn reproduces_lines() {
        let x = [0.0, 1.0, 3.0, 4.0];
        let y = [1.0, 3.0, 7.0, 9.0];

        let p = Pchip::new(&x, &y, 2.0, 2.0).unwrap();

        for s in p.slopes() {
            assert_relative_eq!(*s, 2.0, epsilon = 1e-14);
        }
        for k in 0..=40 {
            let t = k as f64 * 0.1;
            assert_relative_eq!(p.eval(t), 1.0 + 2.0 * t, epsilon = 1e-12);
        }
    }

    #[test]
    // Purpose
    // -------
    // Knot values are returned exactly, including the last knot.
    fn exact_at_knots() {
        let x = [0.0, 5.0, 10.0, 15.0, 20.0];
        let y = [0.0, 0.3, 1.1, 1.2, 2.9];

        let p = Pchip::new(&x, &y, 0.0, 0.1).unwrap();

        for (xk, yk) in x.iter().zip(&y) {
            assert_relative_eq!(p.eval(*xk), *yk, epsilon = 1e-14);
        }
    }

    #[test]
    // Purpose
    // -------
    // Interior slopes vanish at a local maximum and next to a flat segment.
    fn zero_slope_at_extrema_and_plateaus() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y = [0.0, 1.0, 0.5, 0.5, 2.0];

        let p = Pchip::new(&x, &y, 1.0, 1.0).unwrap();

        assert_eq!(p.slopes()[1], 0.0);
        assert_eq!(p.slopes()[2], 0.0);
        assert_eq!(p.slopes()[3], 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Monotone data gives a monotone interpolant even across abrupt jumps.
    fn monotone_data_stays_monotone() {
        let x = [0.0, 5.0, 10.0, 15.0, 20.0, 25.0];
        let y = [0.0, 0.0, 0.1, 3.0, 3.05, 3.1];

        let p = Pchip::new(&x, &y, 0.0, 0.01).unwrap();

        let mut prev = p.eval(0.0);
        for k in 1..=250 {
            let cur = p.eval(k as f64 * 0.1);
            assert!(cur >= prev - 1e-12, "decrease at {}", k as f64 * 0.1);
            prev = cur;
        }
    }

    #[test]
    fn rejects_bad_knots() {
        assert_eq!(Pchip::new(&[0.0, 1.0], &[0.0, 1.0], 0.0, 0.0), Err(PchipError::TooFewKnots(2)));
        assert_eq!(
            Pchip::new(&[0.0, 1.0, 1.0], &[0.0, 1.0, 2.0], 0.0, 0.0),
            Err(PchipError::NonIncreasingKnots(2))
        );
        assert_eq!(
            Pchip::new(&[0.0, 1.0, 2.0], &[0.0, 1.0], 0.0, 0.0),
            Err(PchipError::LengthMismatch { x: 3, y: 2 })
        );
    }
}
