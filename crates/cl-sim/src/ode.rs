//! Adaptive Dormand-Prince 5(4) integration sampled on a fixed grid.
//!
//! The solver walks the grid one interval at a time. Inside an interval it
//! takes as many error-controlled steps as needed and clips the last one so
//! that every grid time is hit exactly. Only states are returned; derived
//! signals are rebuilt by the caller.
//!
//! Stiff problems make the explicit pair crawl. When it runs out of steps in
//! an interval the solver falls back to a linearly implicit Rosenbrock
//! method with a finite-difference Jacobian and an LU solve per step.

use cl_core::{Matrix, Real, Vector};
use tracing::debug;

use crate::error::{SimError, SimResult};

// Butcher tableau
const C2: Real = 1.0 / 5.0;
const C3: Real = 3.0 / 10.0;
const C4: Real = 4.0 / 5.0;
const C5: Real = 8.0 / 9.0;

const A21: Real = 1.0 / 5.0;
const A31: Real = 3.0 / 40.0;
const A32: Real = 9.0 / 40.0;
const A41: Real = 44.0 / 45.0;
const A42: Real = -56.0 / 15.0;
const A43: Real = 32.0 / 9.0;
const A51: Real = 19372.0 / 6561.0;
const A52: Real = -25360.0 / 2187.0;
const A53: Real = 64448.0 / 6561.0;
const A54: Real = -212.0 / 729.0;
const A61: Real = 9017.0 / 3168.0;
const A62: Real = -355.0 / 33.0;
const A63: Real = 46732.0 / 5247.0;
const A64: Real = 49.0 / 176.0;
const A65: Real = -5103.0 / 18656.0;

// 5th order weights (also the last stage row, FSAL)
const B1: Real = 35.0 / 384.0;
const B3: Real = 500.0 / 1113.0;
const B4: Real = 125.0 / 192.0;
const B5: Real = -2187.0 / 6784.0;
const B6: Real = 11.0 / 84.0;

// 5th minus 4th order weights
const E1: Real = 71.0 / 57600.0;
const E3: Real = -71.0 / 16695.0;
const E4: Real = 71.0 / 1920.0;
const E5: Real = -17253.0 / 339200.0;
const E6: Real = 22.0 / 525.0;
const E7: Real = -1.0 / 40.0;

// Rosenbrock 2(3) (ode23s) coefficients
const ROS_D: Real = 0.292_893_218_813_452_5; // 1 / (2 + sqrt(2))
const ROS_E32: Real = 7.414_213_562_373_095; // 6 + sqrt(2)

// step size exponents: 1 / (q + 1) for an error estimate of order q
const DP_EXPONENT: Real = 0.2;
const ROS_EXPONENT: Real = 1.0 / 3.0;

const SAFETY: Real = 0.9;
const FAC_MIN: Real = 0.2;
const FAC_MAX: Real = 5.0;

/// Tolerances and limits of the adaptive solver.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OdeOptions {
    /// Relative tolerance.
    pub rtol: Real,
    /// Absolute tolerance.
    pub atol: Real,
    /// First trial step. Estimated from the initial derivative when `None`.
    pub h_init: Option<Real>,
    /// Upper bound on any step. Unbounded when `None`.
    pub h_max: Option<Real>,
    /// Maximum explicit steps (accepted + rejected) between two grid
    /// samples before switching to the implicit fallback.
    pub max_steps_per_interval: usize,
    /// Maximum implicit steps between two grid samples. Exhausting it fails
    /// the solve.
    pub max_implicit_steps_per_interval: usize,
}

impl Default for OdeOptions {
    fn default() -> Self {
        Self {
            rtol: 1.49012e-8,
            atol: 1.49012e-8,
            h_init: None,
            h_max: None,
            max_steps_per_interval: 500,
            max_implicit_steps_per_interval: 5000,
        }
    }
}

impl OdeOptions {
    fn validate(&self) -> SimResult<()> {
        if !(self.rtol > 0.0 && self.rtol.is_finite()) {
            return Err(SimError::InvalidArg {
                what: "rtol must be positive",
            });
        }
        if !(self.atol > 0.0 && self.atol.is_finite()) {
            return Err(SimError::InvalidArg {
                what: "atol must be positive",
            });
        }
        if matches!(self.h_init, Some(h) if !(h > 0.0 && h.is_finite())) {
            return Err(SimError::InvalidArg {
                what: "h_init must be positive",
            });
        }
        if matches!(self.h_max, Some(h) if !(h > 0.0)) {
            return Err(SimError::InvalidArg {
                what: "h_max must be positive",
            });
        }
        if self.max_steps_per_interval == 0 || self.max_implicit_steps_per_interval == 0 {
            return Err(SimError::InvalidArg {
                what: "step budgets must be positive",
            });
        }
        Ok(())
    }
}

/// Counters collected during a solve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SolverStats {
    /// Right-hand side evaluations (Jacobian columns included).
    pub evals: usize,
    /// Accepted steps.
    pub accepted: usize,
    /// Rejected steps.
    pub rejected: usize,
    /// Accepted steps taken by the implicit fallback.
    pub implicit_steps: usize,
}

/// Integration point carried between steps.
#[derive(Clone, Debug)]
struct Cursor {
    t: Real,
    x: Vector,
    /// Derivative at `(t, x)`.
    dx: Vector,
    /// Next trial step.
    h: Real,
}

/// Embedded Runge-Kutta 5(4) pair of Dormand and Prince, with a
/// Rosenbrock 2(3) fallback for stiff problems.
///
/// The explicit pair is tried first. When it exhausts its step budget
/// inside a grid interval, the interval is restarted with the linearly
/// implicit Rosenbrock method (Shampine and Reichelt's `ode23s`), which
/// stays in use for the rest of the solve.
#[derive(Clone, Debug, Default)]
pub struct DormandPrince {
    opts: OdeOptions,
    stats: SolverStats,
}

impl DormandPrince {
    pub fn new(opts: OdeOptions) -> Self {
        Self {
            opts,
            stats: SolverStats::default(),
        }
    }

    pub fn stats(&self) -> SolverStats {
        self.stats
    }

    /// Integrate `dx/dt = rhs(t, x)` from `x0` at `grid[0]` and return the
    /// state at every grid time.
    ///
    /// `grid` must be non-decreasing. Fails when a step underflows, when
    /// the implicit step budget of an interval is exhausted, or when `rhs`
    /// fails.
    pub fn solve<F>(&mut self, mut rhs: F, grid: &[Real], x0: &Vector) -> SimResult<Vec<Vector>>
    where
        F: FnMut(Real, &Vector) -> SimResult<Vector>,
    {
        self.opts.validate()?;
        self.stats = SolverStats::default();

        let mut states = Vec::with_capacity(grid.len());
        let Some(&t_start) = grid.first() else {
            return Ok(states);
        };
        states.push(x0.clone());

        let dx = self.eval(&mut rhs, t_start, x0)?;
        let h = match self.opts.h_init {
            Some(h) => h,
            None => self.initial_step(x0, &dx),
        };
        let mut cur = Cursor {
            t: t_start,
            x: x0.clone(),
            dx,
            h,
        };

        let mut stiff = false;
        for &t_next in &grid[1..] {
            if !stiff {
                let start = cur.clone();
                if !self.explicit_interval(&mut rhs, &mut cur, t_next)? {
                    debug!(t = start.t, "explicit step budget exhausted, switching to implicit steps");
                    cur = start;
                    stiff = true;
                }
            }
            if stiff {
                self.implicit_interval(&mut rhs, &mut cur, t_next)?;
            }
            states.push(cur.x.clone());
        }

        Ok(states)
    }

    /// Advance to `t_next` with Dormand-Prince steps. Returns `false` when
    /// the step budget runs out first.
    fn explicit_interval<F>(&mut self, rhs: &mut F, cur: &mut Cursor, t_next: Real) -> SimResult<bool>
    where
        F: FnMut(Real, &Vector) -> SimResult<Vector>,
    {
        let mut steps = 0;
        while cur.t < t_next {
            if steps >= self.opts.max_steps_per_interval {
                return Ok(false);
            }
            steps += 1;

            let (h_try, last) = self.trial_step(cur, t_next)?;
            let (x_new, k7, err) = self.attempt(rhs, cur.t, &cur.x, &cur.dx, h_try)?;

            if err <= 1.0 {
                self.stats.accepted += 1;
                cur.t = if last { t_next } else { cur.t + h_try };
                cur.x = x_new;
                cur.dx = k7;
                cur.h = grown_step(cur.h, h_try, err, last, DP_EXPONENT);
            } else {
                self.stats.rejected += 1;
                cur.h = shrunk_step(h_try, err, DP_EXPONENT);
            }
        }
        Ok(true)
    }

    /// Advance to `t_next` with Rosenbrock steps.
    fn implicit_interval<F>(&mut self, rhs: &mut F, cur: &mut Cursor, t_next: Real) -> SimResult<()>
    where
        F: FnMut(Real, &Vector) -> SimResult<Vector>,
    {
        let mut steps = 0;
        // (df/dx, df/dt) at the current point; kept across rejections
        let mut linearization: Option<(Matrix, Vector)> = None;
        while cur.t < t_next {
            if steps >= self.opts.max_implicit_steps_per_interval {
                return Err(SimError::Integration {
                    what: "step budget exhausted before reaching the next sample",
                    t: cur.t,
                });
            }
            steps += 1;

            let (h_try, last) = self.trial_step(cur, t_next)?;
            let (jac, dfdt) = match linearization.take() {
                Some(lin) => lin,
                None => self.linearize(rhs, cur)?,
            };

            let outcome = self.rosenbrock_attempt(rhs, cur, &jac, &dfdt, h_try)?;
            linearization = Some((jac, dfdt));

            match outcome {
                Some((x_new, dx_new, err)) if err <= 1.0 => {
                    self.stats.accepted += 1;
                    self.stats.implicit_steps += 1;
                    cur.t = if last { t_next } else { cur.t + h_try };
                    cur.x = x_new;
                    cur.dx = dx_new;
                    cur.h = grown_step(cur.h, h_try, err, last, ROS_EXPONENT);
                    linearization = None;
                }
                Some((_, _, err)) => {
                    self.stats.rejected += 1;
                    cur.h = shrunk_step(h_try, err, ROS_EXPONENT);
                }
                // singular iteration matrix
                None => {
                    self.stats.rejected += 1;
                    cur.h = h_try * FAC_MIN;
                }
            }
        }
        Ok(())
    }

    /// Step to try next, clipped to the interval end, and whether it is the
    /// clipped final step.
    fn trial_step(&self, cur: &mut Cursor, t_next: Real) -> SimResult<(Real, bool)> {
        if let Some(h_max) = self.opts.h_max {
            cur.h = cur.h.min(h_max);
        }
        let remaining = t_next - cur.t;
        let last = cur.h >= remaining * (1.0 - 1e-12);
        let h_try = if last { remaining } else { cur.h };

        let min_step = 16.0 * Real::EPSILON * cur.t.abs().max(t_next.abs()).max(1.0);
        if h_try < min_step && !last {
            return Err(SimError::Integration {
                what: "step size underflow",
                t: cur.t,
            });
        }
        Ok((h_try, last))
    }

    fn eval<F>(&mut self, rhs: &mut F, t: Real, x: &Vector) -> SimResult<Vector>
    where
        F: FnMut(Real, &Vector) -> SimResult<Vector>,
    {
        self.stats.evals += 1;
        rhs(t, x)
    }

    /// One trial step. Returns the 5th order state, its derivative (next
    /// `k1`) and the scaled error norm.
    fn attempt<F>(
        &mut self,
        rhs: &mut F,
        t: Real,
        x: &Vector,
        k1: &Vector,
        h: Real,
    ) -> SimResult<(Vector, Vector, Real)>
    where
        F: FnMut(Real, &Vector) -> SimResult<Vector>,
    {
        let k2 = self.eval(rhs, t + C2 * h, &(x + k1 * (h * A21)))?;
        let k3 = self.eval(rhs, t + C3 * h, &(x + (k1 * A31 + &k2 * A32) * h))?;
        let k4 = self.eval(
            rhs,
            t + C4 * h,
            &(x + (k1 * A41 + &k2 * A42 + &k3 * A43) * h),
        )?;
        let k5 = self.eval(
            rhs,
            t + C5 * h,
            &(x + (k1 * A51 + &k2 * A52 + &k3 * A53 + &k4 * A54) * h),
        )?;
        let k6 = self.eval(
            rhs,
            t + h,
            &(x + (k1 * A61 + &k2 * A62 + &k3 * A63 + &k4 * A64 + &k5 * A65) * h),
        )?;
        let x_new = x + (k1 * B1 + &k3 * B3 + &k4 * B4 + &k5 * B5 + &k6 * B6) * h;
        let k7 = self.eval(rhs, t + h, &x_new)?;

        let err_vec = (k1 * E1 + &k3 * E3 + &k4 * E4 + &k5 * E5 + &k6 * E6 + &k7 * E7) * h;
        let err = self.error_norm(&err_vec, x, &x_new);
        Ok((x_new, k7, err))
    }

    /// Finite-difference `df/dx` and `df/dt` at the cursor.
    fn linearize<F>(&mut self, rhs: &mut F, cur: &Cursor) -> SimResult<(Matrix, Vector)>
    where
        F: FnMut(Real, &Vector) -> SimResult<Vector>,
    {
        let n = cur.x.len();
        let sqrt_eps = Real::EPSILON.sqrt();
        let mut jac = Matrix::zeros(n, n);
        for j in 0..n {
            let mut shifted = cur.x.clone();
            shifted[j] += sqrt_eps * cur.x[j].abs().max(1.0);
            let delta = shifted[j] - cur.x[j];
            let f = self.eval(rhs, cur.t, &shifted)?;
            jac.set_column(j, &((f - &cur.dx) / delta));
        }
        let dt = sqrt_eps * cur.t.abs().max(1.0);
        let f = self.eval(rhs, cur.t + dt, &cur.x)?;
        let dfdt = (f - &cur.dx) / dt;
        Ok((jac, dfdt))
    }

    /// One Rosenbrock trial step. Returns the new state, its derivative and
    /// the scaled error norm, or `None` when `I - h d J` is singular.
    fn rosenbrock_attempt<F>(
        &mut self,
        rhs: &mut F,
        cur: &Cursor,
        jac: &Matrix,
        dfdt: &Vector,
        h: Real,
    ) -> SimResult<Option<(Vector, Vector, Real)>>
    where
        F: FnMut(Real, &Vector) -> SimResult<Vector>,
    {
        let n = cur.x.len();
        let lu = (Matrix::identity(n, n) - jac * (h * ROS_D)).lu();
        let hdt = dfdt * (h * ROS_D);

        let Some(k1) = lu.solve(&(&cur.dx + &hdt)) else {
            return Ok(None);
        };
        let f1 = self.eval(rhs, cur.t + 0.5 * h, &(&cur.x + &k1 * (0.5 * h)))?;
        let Some(k2) = lu.solve(&(&f1 - &k1)) else {
            return Ok(None);
        };
        let k2 = k2 + &k1;
        let x_new = &cur.x + &k2 * h;
        let f2 = self.eval(rhs, cur.t + h, &x_new)?;

        let b3 = &f2 - (&k2 - &f1) * ROS_E32 - (&k1 - &cur.dx) * 2.0 + &hdt;
        let Some(k3) = lu.solve(&b3) else {
            return Ok(None);
        };

        let err_vec = (&k1 - &k2 * 2.0 + &k3) * (h / 6.0);
        let err = self.error_norm(&err_vec, &cur.x, &x_new);
        Ok(Some((x_new, f2, err)))
    }

    fn error_norm(&self, err: &Vector, x: &Vector, x_new: &Vector) -> Real {
        if err.is_empty() {
            return 0.0;
        }
        let sum: Real = err
            .iter()
            .zip(x.iter().zip(x_new.iter()))
            .map(|(e, (a, b))| {
                let scale = self.opts.atol + self.opts.rtol * a.abs().max(b.abs());
                (e / scale).powi(2)
            })
            .sum();
        let norm = (sum / err.len() as Real).sqrt();
        if norm.is_nan() { Real::INFINITY } else { norm }
    }

    fn initial_step(&self, x: &Vector, dx: &Vector) -> Real {
        let scaled = |v: &Vector| -> Real {
            if v.is_empty() {
                return 0.0;
            }
            let sum: Real = v
                .iter()
                .zip(x.iter())
                .map(|(vi, xi)| (vi / (self.opts.atol + self.opts.rtol * xi.abs())).powi(2))
                .sum();
            (sum / v.len() as Real).sqrt()
        };
        let d0 = scaled(x);
        let d1 = scaled(dx);
        let h = if d0 < 1e-5 || d1 < 1e-5 || !d1.is_finite() {
            1e-6
        } else {
            0.01 * d0 / d1
        };
        match self.opts.h_max {
            Some(h_max) => h.min(h_max),
            None => h,
        }
    }
}

/// Next step after an accepted step of size `h_try`.
fn grown_step(h: Real, h_try: Real, err: Real, last: bool, exponent: Real) -> Real {
    let factor = if err == 0.0 {
        FAC_MAX
    } else {
        (SAFETY * err.powf(-exponent)).clamp(FAC_MIN, FAC_MAX)
    };
    // a clipped final step says little about the next interval
    if last { h.max(h_try * factor) } else { h_try * factor }
}

/// Retry step after a rejection.
fn shrunk_step(h_try: Real, err: Real, exponent: Real) -> Real {
    let factor = if err.is_finite() {
        (SAFETY * err.powf(-exponent)).clamp(FAC_MIN, 1.0)
    } else {
        FAC_MIN
    };
    h_try * factor
}
