//! Linear time-invariant state-space model.

use cl_core::{Matrix, Real, Vector};

use crate::error::{DynResult, DynamicsError};
use crate::info::SystemInfo;
use crate::system::DynamicalSystem;

/// `dx = A x + B u`, `y = C x + D u`.
#[derive(Debug, Clone)]
pub struct LinearSystem {
    info: SystemInfo,
    pub a: Matrix,
    pub b: Matrix,
    pub c: Matrix,
    pub d: Matrix,
}

impl LinearSystem {
    /// Build from the four state-space matrices.
    ///
    /// Shapes must be `A: n×n`, `B: n×m`, `C: p×n`, `D: p×m`.
    pub fn new(a: Matrix, b: Matrix, c: Matrix, d: Matrix) -> DynResult<Self> {
        let n = a.nrows();
        if a.ncols() != n {
            return Err(DynamicsError::DimensionMismatch {
                what: "A columns",
                expected: n,
                got: a.ncols(),
            });
        }
        check_rows(&b, n, "B rows")?;
        let m = b.ncols();
        let p = c.nrows();
        if c.ncols() != n {
            return Err(DynamicsError::DimensionMismatch {
                what: "C columns",
                expected: n,
                got: c.ncols(),
            });
        }
        check_rows(&d, p, "D rows")?;
        if d.ncols() != m {
            return Err(DynamicsError::DimensionMismatch {
                what: "D columns",
                expected: m,
                got: d.ncols(),
            });
        }

        let info = SystemInfo::new(n, m, p)?.with_name("LinearSystem");
        Ok(Self { info, a, b, c, d })
    }

    /// Full-state output: `C = I`, `D = 0`.
    pub fn from_ab(a: Matrix, b: Matrix) -> DynResult<Self> {
        let n = a.nrows();
        let m = b.ncols();
        Self::new(a, b, Matrix::identity(n, n), Matrix::zeros(n, m))
    }

    /// Replace the descriptive part (bounds, operating point, labels).
    ///
    /// Dimensions of the replacement must match the matrices.
    pub fn with_info(mut self, info: SystemInfo) -> DynResult<Self> {
        for (what, expected, got) in [
            ("n", self.info.n(), info.n()),
            ("m", self.info.m(), info.m()),
            ("p", self.info.p(), info.p()),
        ] {
            if expected != got {
                return Err(DynamicsError::DimensionMismatch {
                    what,
                    expected,
                    got,
                });
            }
        }
        self.info = info;
        Ok(self)
    }
}

fn check_rows(mat: &Matrix, expected: usize, what: &'static str) -> DynResult<()> {
    if mat.nrows() == expected {
        Ok(())
    } else {
        Err(DynamicsError::DimensionMismatch {
            what,
            expected,
            got: mat.nrows(),
        })
    }
}

impl DynamicalSystem for LinearSystem {
    fn info(&self) -> &SystemInfo {
        &self.info
    }

    fn f(&self, x: &Vector, u: &Vector, _t: Real) -> DynResult<Vector> {
        self.info.check_state(x)?;
        self.info.check_input(u)?;
        Ok(&self.a * x + &self.b * u)
    }

    fn h(&self, x: &Vector, u: &Vector, _t: Real) -> DynResult<Vector> {
        self.info.check_state(x)?;
        self.info.check_input(u)?;
        Ok(&self.c * x + &self.d * u)
    }
}
