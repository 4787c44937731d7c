//! Linear static feedback with optional saturation.

use cl_core::{Matrix, Real, Vector, ensure_len};

use crate::controller::{ControllerInfo, StaticController};
use crate::error::{ControlError, ControlResult};

/// Gain-matrix controller `u = K_r r - K_y y + u0`.
///
/// When saturation limits are set, each component of `u` is clamped to
/// `[u_min, u_max]` after the linear law is evaluated.
///
/// # Example
///
/// ```
/// use cl_controls::{LinearFeedback, StaticController};
/// use cl_core::{Matrix, Vector};
///
/// // u = 2 (r - y), clamped to [-1, 1]
/// let ctl = LinearFeedback::tracking(Matrix::from_element(1, 1, 2.0))
///     .unwrap()
///     .with_saturation(Vector::from_element(1, -1.0), Vector::from_element(1, 1.0))
///     .unwrap();
///
/// let u = ctl
///     .c(&Vector::from_element(1, 0.25), &Vector::from_element(1, 0.5), 0.0)
///     .unwrap();
/// assert_eq!(u[0], 0.5);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LinearFeedback {
    info: ControllerInfo,
    /// Sensor gain (m×p).
    pub k_y: Matrix,
    /// Reference gain (m×k).
    pub k_r: Matrix,
    /// Feedforward offset (length m).
    pub u0: Vector,
    limits: Option<(Vector, Vector)>,
}

impl LinearFeedback {
    /// Create a controller from sensor and reference gains.
    ///
    /// # Arguments
    ///
    /// * `k_y` - Sensor gain, m×p
    /// * `k_r` - Reference gain, m×k
    pub fn new(k_y: Matrix, k_r: Matrix) -> ControlResult<Self> {
        let m = k_y.nrows();
        if k_r.nrows() != m {
            return Err(ControlError::DimensionMismatch {
                what: "reference gain rows",
                expected: m,
                got: k_r.nrows(),
            });
        }
        let info = ControllerInfo::new(k_r.ncols(), m, k_y.ncols())?.with_name("LinearFeedback");
        Ok(Self {
            info,
            u0: Vector::zeros(m),
            k_y,
            k_r,
            limits: None,
        })
    }

    /// Error feedback `u = K (r - y)` with a single m×p gain.
    pub fn tracking(k: Matrix) -> ControlResult<Self> {
        Self::new(k.clone(), k)
    }

    /// Set the feedforward offset.
    pub fn with_offset(mut self, u0: Vector) -> ControlResult<Self> {
        ensure_len(&u0, self.info.m(), "u0")?;
        self.u0 = u0;
        Ok(self)
    }

    /// Set the default reference.
    pub fn with_reference(mut self, rbar: Vector) -> ControlResult<Self> {
        self.info = self.info.with_rbar(rbar)?;
        Ok(self)
    }

    /// Clamp each output component to `[u_min, u_max]`.
    pub fn with_saturation(mut self, u_min: Vector, u_max: Vector) -> ControlResult<Self> {
        ensure_len(&u_min, self.info.m(), "u_min")?;
        ensure_len(&u_max, self.info.m(), "u_max")?;
        if u_min.iter().zip(u_max.iter()).any(|(lo, hi)| lo >= hi) {
            return Err(ControlError::InvalidArg {
                what: "u_min must be less than u_max",
            });
        }
        self.limits = Some((u_min, u_max));
        Ok(self)
    }

    pub fn limits(&self) -> Option<(&Vector, &Vector)> {
        self.limits.as_ref().map(|(lo, hi)| (lo, hi))
    }
}

impl StaticController for LinearFeedback {
    fn info(&self) -> &ControllerInfo {
        &self.info
    }

    fn c(&self, y: &Vector, r: &Vector, _t: Real) -> ControlResult<Vector> {
        ensure_len(y, self.info.p(), "sensor signal")?;
        ensure_len(r, self.info.k(), "reference")?;

        let u = &self.k_r * r - &self.k_y * y + &self.u0;
        Ok(match &self.limits {
            Some((lo, hi)) => u.zip_zip_map(lo, hi, |v, lo, hi| v.clamp(lo, hi)),
            None => u,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracking_law() {
        let ctl = LinearFeedback::tracking(Matrix::from_row_slice(1, 2, &[3.0, 1.0])).unwrap();
        let y = Vector::from_vec(vec![1.0, 2.0]);
        let r = Vector::from_vec(vec![2.0, 2.0]);
        assert_eq!(ctl.c(&y, &r, 0.0).unwrap()[0], 3.0);
        assert_eq!(ctl.cbar(&y, 0.0).unwrap()[0], -5.0);
    }

    #[test]
    fn offset_and_saturation() {
        let ctl = LinearFeedback::new(Matrix::from_element(1, 1, 1.0), Matrix::zeros(1, 1))
            .unwrap()
            .with_offset(Vector::from_element(1, 0.5))
            .unwrap()
            .with_saturation(Vector::from_element(1, -1.0), Vector::from_element(1, 1.0))
            .unwrap();
        let r = Vector::zeros(1);
        assert_eq!(ctl.c(&Vector::from_element(1, 0.25), &r, 0.0).unwrap()[0], 0.25);
        assert_eq!(ctl.c(&Vector::from_element(1, -4.0), &r, 0.0).unwrap()[0], 1.0);
        assert_eq!(ctl.c(&Vector::from_element(1, 4.0), &r, 0.0).unwrap()[0], -1.0);
    }

    #[test]
    fn invalid_configuration() {
        assert!(LinearFeedback::new(Matrix::zeros(2, 1), Matrix::zeros(1, 1)).is_err());
        let ctl = LinearFeedback::tracking(Matrix::zeros(1, 1)).unwrap();
        assert!(
            ctl.clone()
                .with_saturation(Vector::from_element(1, 1.0), Vector::from_element(1, 1.0))
                .is_err()
        );
        assert!(ctl.clone().with_offset(Vector::zeros(2)).is_err());
        assert!(ctl.c(&Vector::zeros(2), &Vector::zeros(1), 0.0).is_err());
    }
}
