//! Time-sampled record of a simulation run.

use cl_core::{Matrix, Real, Vector, is_non_decreasing, nearest_index};

use crate::{ResultsError, ResultsResult};

/// Simulation data.
///
/// Every signal stores one row per time sample, so for `N = t.len()`:
/// `x` is N×n, `u` is N×m, `dx` is N×n, `y` is N×p and the optional
/// reference `r` is N×k. The optional running cost `J` and incremental
/// cost `dJ` hold one value per sample.
///
/// The record is immutable once built. Optional signals are attached with
/// [`with_reference`](Self::with_reference) and [`with_cost`](Self::with_cost),
/// which return a new record.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    x: Matrix,
    u: Matrix,
    t: Vec<Real>,
    dx: Matrix,
    y: Matrix,
    r: Option<Matrix>,
    j: Option<Vec<Real>>,
    dj: Option<Vec<Real>>,
}

impl Trajectory {
    /// Assemble a trajectory, checking that every signal has `t.len()` rows.
    pub fn new(x: Matrix, u: Matrix, t: Vec<Real>, dx: Matrix, y: Matrix) -> ResultsResult<Self> {
        if t.is_empty() {
            return Err(ResultsError::InvalidTime {
                what: "trajectory needs at least one sample",
            });
        }
        if t.iter().any(|ti| !ti.is_finite()) {
            return Err(ResultsError::InvalidTime {
                what: "time samples must be finite",
            });
        }
        if !is_non_decreasing(&t) {
            return Err(ResultsError::InvalidTime {
                what: "time samples must be non-decreasing",
            });
        }

        let len = t.len();
        check_rows("x", x.nrows(), len)?;
        check_rows("u", u.nrows(), len)?;
        check_rows("dx", dx.nrows(), len)?;
        check_rows("y", y.nrows(), len)?;
        if dx.ncols() != x.ncols() {
            return Err(ResultsError::Inconsistent {
                signal: "dx columns",
                expected: x.ncols(),
                got: dx.ncols(),
            });
        }

        Ok(Self {
            x,
            u,
            t,
            dx,
            y,
            r: None,
            j: None,
            dj: None,
        })
    }

    /// Attach the reference signal (N×k).
    pub fn with_reference(mut self, r: Matrix) -> ResultsResult<Self> {
        check_rows("r", r.nrows(), self.t.len())?;
        self.r = Some(r);
        Ok(self)
    }

    /// Attach running cost `J` and incremental cost `dJ` (length N each).
    pub fn with_cost(mut self, j: Vec<Real>, dj: Vec<Real>) -> ResultsResult<Self> {
        check_rows("J", j.len(), self.t.len())?;
        check_rows("dJ", dj.len(), self.t.len())?;
        self.j = Some(j);
        self.dj = Some(dj);
        Ok(self)
    }

    pub(crate) fn with_optional(
        self,
        r: Option<Matrix>,
        j: Option<Vec<Real>>,
        dj: Option<Vec<Real>>,
    ) -> ResultsResult<Self> {
        let mut traj = match r {
            Some(r) => self.with_reference(r)?,
            None => self,
        };
        if let Some(j) = j {
            check_rows("J", j.len(), traj.t.len())?;
            traj.j = Some(j);
        }
        if let Some(dj) = dj {
            check_rows("dJ", dj.len(), traj.t.len())?;
            traj.dj = Some(dj);
        }
        Ok(traj)
    }

    pub fn x(&self) -> &Matrix {
        &self.x
    }

    pub fn u(&self) -> &Matrix {
        &self.u
    }

    pub fn t(&self) -> &[Real] {
        &self.t
    }

    pub fn dx(&self) -> &Matrix {
        &self.dx
    }

    pub fn y(&self) -> &Matrix {
        &self.y
    }

    pub fn r(&self) -> Option<&Matrix> {
        self.r.as_ref()
    }

    /// Running cost, if a cost evaluation populated it.
    pub fn j(&self) -> Option<&[Real]> {
        self.j.as_deref()
    }

    /// Incremental cost, if a cost evaluation populated it.
    pub fn dj(&self) -> Option<&[Real]> {
        self.dj.as_deref()
    }

    /// Number of time samples N.
    pub fn time_steps(&self) -> usize {
        self.t.len()
    }

    /// Largest recorded time.
    pub fn time_final(&self) -> Real {
        // t is non-empty and sorted
        self.t[self.t.len() - 1]
    }

    pub fn n_states(&self) -> usize {
        self.x.ncols()
    }

    pub fn n_inputs(&self) -> usize {
        self.u.ncols()
    }

    pub fn n_outputs(&self) -> usize {
        self.y.ncols()
    }

    pub fn state_at(&self, i: usize) -> Vector {
        self.x.row(i).transpose()
    }

    pub fn input_at(&self, i: usize) -> Vector {
        self.u.row(i).transpose()
    }

    pub fn output_at(&self, i: usize) -> Vector {
        self.y.row(i).transpose()
    }

    pub fn derivative_at(&self, i: usize) -> Vector {
        self.dx.row(i).transpose()
    }

    pub fn reference_at(&self, i: usize) -> Option<Vector> {
        self.r.as_ref().map(|r| r.row(i).transpose())
    }

    /// Index of the sample nearest to `t`.
    ///
    /// Fails for non-finite `t` or `t` beyond the final time. Times before
    /// the first sample resolve to index 0.
    pub fn index_at(&self, t: Real) -> ResultsResult<usize> {
        if !t.is_finite() {
            return Err(ResultsError::InvalidTime {
                what: "lookup time must be finite",
            });
        }
        let time_final = self.time_final();
        if t > time_final {
            return Err(ResultsError::OutOfRange { t, time_final });
        }
        nearest_index(&self.t, t).ok_or(ResultsError::InvalidTime {
            what: "trajectory needs at least one sample",
        })
    }

    /// State at the sample nearest to `t`.
    pub fn t2x(&self, t: Real) -> ResultsResult<Vector> {
        Ok(self.state_at(self.index_at(t)?))
    }

    /// Input at the sample nearest to `t`.
    pub fn t2u(&self, t: Real) -> ResultsResult<Vector> {
        Ok(self.input_at(self.index_at(t)?))
    }
}

fn check_rows(signal: &'static str, got: usize, expected: usize) -> ResultsResult<()> {
    if got == expected {
        Ok(())
    } else {
        Err(ResultsError::Inconsistent {
            signal,
            expected,
            got,
        })
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn any_row_mismatch_is_rejected(n in 1_usize..40, extra in 1_usize..5, which in 0_usize..4) {
            let t: Vec<Real> = (0..n).map(|i| i as Real).collect();
            let mut rows = [n; 4];
            rows[which] = n + extra;
            let res = Trajectory::new(
                Matrix::zeros(rows[0], 2),
                Matrix::zeros(rows[1], 1),
                t,
                Matrix::zeros(rows[2], 2),
                Matrix::zeros(rows[3], 2),
            );
            prop_assert!(
                matches!(res, Err(ResultsError::Inconsistent { .. })),
                "expected an inconsistency error"
            );
        }

        #[test]
        fn lookup_matches_brute_force(n in 2_usize..50, frac in 0.0_f64..1.0) {
            let t: Vec<Real> = (0..n).map(|i| i as Real * 0.1).collect();
            let x = Matrix::from_fn(n, 1, |i, _| i as Real);
            let traj = Trajectory::new(
                x.clone(),
                Matrix::zeros(n, 0),
                t.clone(),
                x.clone(),
                x,
            ).unwrap();
            let query = frac * traj.time_final();
            let idx = traj.index_at(query).unwrap();
            let best = t.iter().map(|ti| (ti - query).abs()).fold(Real::INFINITY, Real::min);
            prop_assert!(((t[idx] - query).abs() - best).abs() < 1e-12);
        }
    }
}
