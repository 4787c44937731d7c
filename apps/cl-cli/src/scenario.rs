//! YAML scenario files: a linear plant, an optional linear feedback
//! controller, an input signal and simulation settings.

use std::path::Path;

use cl_controls::LinearFeedback;
use cl_core::{Matrix, Real, Vector};
use cl_dynamics::{DynamicalSystem, LinearSystem};
use cl_sim::{InputSignal, OdeOptions, SimOptions, SimResult, SolverMethod};
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    pub system: PlantConfig,
    #[serde(default)]
    pub controller: Option<ControllerConfig>,
    /// Open-loop input, or the reference signal when a controller is set.
    #[serde(default)]
    pub input: Option<InputConfig>,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// State-space matrices, written row by row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlantConfig {
    pub a: Vec<Vec<Real>>,
    pub b: Vec<Vec<Real>>,
    /// Defaults to the identity (full state output).
    #[serde(default)]
    pub c: Option<Vec<Vec<Real>>>,
    /// Defaults to zero feedthrough.
    #[serde(default)]
    pub d: Option<Vec<Vec<Real>>>,
    #[serde(default)]
    pub x0: Option<Vec<Real>>,
    #[serde(default)]
    pub state_bounds: Option<Bounds>,
    #[serde(default)]
    pub input_bounds: Option<Bounds>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Bounds {
    pub lower: Vec<Real>,
    pub upper: Vec<Real>,
}

/// Linear feedback `u = k_r r - k_y y + offset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControllerConfig {
    pub k_y: Vec<Vec<Real>>,
    /// Defaults to `k_y` (error feedback).
    #[serde(default)]
    pub k_r: Option<Vec<Vec<Real>>>,
    /// Constant reference; zero when omitted.
    #[serde(default)]
    pub r: Option<Vec<Real>>,
    #[serde(default)]
    pub offset: Option<Vec<Real>>,
    #[serde(default)]
    pub saturation: Option<Bounds>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum InputConfig {
    Constant {
        value: Vec<Real>,
    },
    /// `before` until `at`, then `after`.
    Step {
        at: Real,
        before: Vec<Real>,
        after: Vec<Real>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    #[serde(default = "default_tf")]
    pub tf: Real,
    #[serde(default = "default_samples")]
    pub n: usize,
    #[serde(default)]
    pub method: SolverMethod,
    #[serde(default)]
    pub rtol: Option<Real>,
    #[serde(default)]
    pub atol: Option<Real>,
}

fn default_tf() -> Real {
    SimOptions::default().tf
}

fn default_samples() -> usize {
    SimOptions::default().n
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tf: default_tf(),
            n: default_samples(),
            method: SolverMethod::default(),
            rtol: None,
            atol: None,
        }
    }
}

pub fn load(path: &Path) -> CliResult<Scenario> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> CliResult<Scenario> {
    let scenario: Scenario = serde_yaml::from_str(content)?;
    scenario.validate()?;
    Ok(scenario)
}

impl Scenario {
    /// Check that every piece can be built and that dimensions agree.
    pub fn validate(&self) -> CliResult<()> {
        let plant = self.plant()?;
        let controller = self.controller()?;
        let expected = match &controller {
            Some(ctl) => {
                if ctl.k_y.nrows() != plant.m() {
                    return Err(CliError::scenario(format!(
                        "controller produces {} inputs, plant takes {}",
                        ctl.k_y.nrows(),
                        plant.m()
                    )));
                }
                if ctl.k_y.ncols() != plant.p() {
                    return Err(CliError::scenario(format!(
                        "controller reads {} outputs, plant has {}",
                        ctl.k_y.ncols(),
                        plant.p()
                    )));
                }
                ctl.k_r.ncols()
            }
            None => plant.m(),
        };
        if let Some(input) = &self.input {
            input.check_len(expected)?;
        }
        self.sim_options()?;
        Ok(())
    }

    pub fn plant(&self) -> CliResult<LinearSystem> {
        let cfg = &self.system;
        let a = matrix("a", &cfg.a)?;
        let b = matrix("b", &cfg.b)?;
        let n = a.nrows();
        let m = b.ncols();
        let c = match &cfg.c {
            Some(rows) => matrix("c", rows)?,
            None => Matrix::identity(n, n),
        };
        let d = match &cfg.d {
            Some(rows) => matrix("d", rows)?,
            None => Matrix::zeros(c.nrows(), m),
        };

        let plant = LinearSystem::new(a, b, c, d)?;
        let mut info = plant.info().clone();
        if let Some(name) = &self.name {
            info = info.with_name(name.clone());
        }
        if let Some(x0) = &cfg.x0 {
            info = info.with_x0(Vector::from_column_slice(x0))?;
        }
        if let Some(bounds) = &cfg.state_bounds {
            let (lo, hi) = bounds.vectors();
            info = info.with_state_bounds(lo, hi)?;
        }
        if let Some(bounds) = &cfg.input_bounds {
            let (lo, hi) = bounds.vectors();
            info = info.with_input_bounds(lo, hi)?;
        }
        Ok(plant.with_info(info)?)
    }

    pub fn controller(&self) -> CliResult<Option<LinearFeedback>> {
        let Some(cfg) = &self.controller else {
            return Ok(None);
        };
        let k_y = matrix("k_y", &cfg.k_y)?;
        let k_r = match &cfg.k_r {
            Some(rows) => matrix("k_r", rows)?,
            None => k_y.clone(),
        };
        let mut ctl = LinearFeedback::new(k_y, k_r)?;
        if let Some(r) = &cfg.r {
            ctl = ctl.with_reference(Vector::from_column_slice(r))?;
        }
        if let Some(offset) = &cfg.offset {
            ctl = ctl.with_offset(Vector::from_column_slice(offset))?;
        }
        if let Some(bounds) = &cfg.saturation {
            let (lo, hi) = bounds.vectors();
            ctl = ctl.with_saturation(lo, hi)?;
        }
        Ok(Some(ctl))
    }

    pub fn sim_options(&self) -> CliResult<SimOptions> {
        let sim = &self.simulation;
        let defaults = OdeOptions::default();
        let ode = OdeOptions {
            rtol: sim.rtol.unwrap_or(defaults.rtol),
            atol: sim.atol.unwrap_or(defaults.atol),
            ..defaults
        };
        if !(ode.rtol > 0.0 && ode.atol > 0.0) {
            return Err(CliError::scenario("rtol and atol must be positive"));
        }
        if sim.n < 2 {
            return Err(CliError::scenario("simulation.n must be at least 2"));
        }
        if !(sim.tf > 0.0 && sim.tf.is_finite()) {
            return Err(CliError::scenario("simulation.tf must be positive"));
        }
        Ok(SimOptions {
            ode,
            ..SimOptions::new(sim.tf, sim.n, sim.method)
        })
    }
}

impl Bounds {
    fn vectors(&self) -> (Vector, Vector) {
        (
            Vector::from_column_slice(&self.lower),
            Vector::from_column_slice(&self.upper),
        )
    }
}

impl InputConfig {
    fn check_len(&self, expected: usize) -> CliResult<()> {
        let lens = match self {
            InputConfig::Constant { value } => vec![value.len()],
            InputConfig::Step { before, after, .. } => vec![before.len(), after.len()],
        };
        if lens.iter().any(|&len| len != expected) {
            return Err(CliError::scenario(format!(
                "input has length {lens:?}, expected {expected}"
            )));
        }
        Ok(())
    }
}

impl InputSignal for InputConfig {
    fn u(&self, t: Real) -> SimResult<Vector> {
        let value = match self {
            InputConfig::Constant { value } => value,
            InputConfig::Step { at, before, .. } if t < *at => before,
            InputConfig::Step { after, .. } => after,
        };
        Ok(Vector::from_column_slice(value))
    }
}

/// Rows to a matrix; all rows must have the same length.
fn matrix(name: &str, rows: &[Vec<Real>]) -> CliResult<Matrix> {
    let nrows = rows.len();
    let ncols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|row| row.len() != ncols) {
        return Err(CliError::scenario(format!("matrix '{name}' has ragged rows")));
    }
    Ok(Matrix::from_row_iterator(
        nrows,
        ncols,
        rows.iter().flatten().copied(),
    ))
}
