//! Uniform time grids and nearest-sample lookup.

use crate::{CoreError, Real};

/// Build `n` evenly spaced samples over `[t0, tf]`.
///
/// The last sample is exactly `tf`. Requires `n >= 2` and `tf > t0`.
pub fn linspace(t0: Real, tf: Real, n: usize) -> Result<Vec<Real>, CoreError> {
    if n < 2 {
        return Err(CoreError::InvalidArg {
            what: "grid needs at least two samples",
        });
    }
    if !t0.is_finite() || !tf.is_finite() {
        return Err(CoreError::InvalidArg {
            what: "grid bounds must be finite",
        });
    }
    if tf <= t0 {
        return Err(CoreError::InvalidArg {
            what: "final time must exceed initial time",
        });
    }

    let dt = step_size(t0, tf, n);
    let mut grid: Vec<Real> = (0..n).map(|i| t0 + i as Real * dt).collect();
    grid[n - 1] = tf;
    Ok(grid)
}

/// Spacing of a uniform `n`-point grid over `[t0, tf]`.
pub fn step_size(t0: Real, tf: Real, n: usize) -> Real {
    (tf - t0) / (n as Real - 1.0)
}

/// Index of the sample minimizing `|grid[i] - t|`.
///
/// Ties resolve to the earliest index. Returns `None` for an empty grid.
pub fn nearest_index(grid: &[Real], t: Real) -> Option<usize> {
    let mut best: Option<(usize, Real)> = None;
    for (i, &ti) in grid.iter().enumerate() {
        let d = (ti - t).abs();
        match best {
            Some((_, bd)) if d >= bd => {}
            _ => best = Some((i, d)),
        }
    }
    best.map(|(i, _)| i)
}

/// True if the sequence never decreases.
pub fn is_non_decreasing(grid: &[Real]) -> bool {
    grid.windows(2).all(|w| w[0] <= w[1])
}
