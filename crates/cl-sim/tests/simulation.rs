//! End-to-end simulation runs against closed-form solutions.

use cl_core::{Real, Vector};
use cl_dynamics::{DynResult, DynamicalSystem, DynamicsError, SystemInfo};
use cl_sim::{
    ConstantInput, OdeOptions, SimError, SimOptions, Simulator, SolverMethod, simulate,
};
use proptest::prelude::*;

/// dx = -x, no input.
struct Decay {
    info: SystemInfo,
}

impl Decay {
    fn new(x0: Real) -> Self {
        let info = SystemInfo::new(1, 0, 1)
            .unwrap()
            .with_name("Decay")
            .with_x0(Vector::from_element(1, x0))
            .unwrap();
        Self { info }
    }
}

impl DynamicalSystem for Decay {
    fn info(&self) -> &SystemInfo {
        &self.info
    }

    fn f(&self, x: &Vector, _u: &Vector, _t: Real) -> DynResult<Vector> {
        Ok(-x)
    }
}

/// dx = a x, no input.
struct Exponential {
    info: SystemInfo,
    rate: Real,
}

impl Exponential {
    fn new(rate: Real) -> Self {
        let info = SystemInfo::new(1, 0, 1)
            .unwrap()
            .with_x0(Vector::from_element(1, 1.0))
            .unwrap();
        Self { info, rate }
    }
}

impl DynamicalSystem for Exponential {
    fn info(&self) -> &SystemInfo {
        &self.info
    }

    fn f(&self, x: &Vector, _u: &Vector, _t: Real) -> DynResult<Vector> {
        Ok(x * self.rate)
    }
}

/// dx = -x + u, y = 2x.
struct FirstOrder {
    info: SystemInfo,
}

impl FirstOrder {
    fn new() -> Self {
        Self {
            info: SystemInfo::new(1, 1, 1).unwrap(),
        }
    }
}

impl DynamicalSystem for FirstOrder {
    fn info(&self) -> &SystemInfo {
        &self.info
    }

    fn f(&self, x: &Vector, u: &Vector, _t: Real) -> DynResult<Vector> {
        Ok(-x + u)
    }

    fn h(&self, x: &Vector, _u: &Vector, _t: Real) -> DynResult<Vector> {
        Ok(x * 2.0)
    }
}

/// dx = c, no input.
struct Drift {
    info: SystemInfo,
    rate: Real,
}

impl Drift {
    fn new(rate: Real) -> Self {
        Self {
            info: SystemInfo::new(1, 0, 1).unwrap(),
            rate,
        }
    }
}

impl DynamicalSystem for Drift {
    fn info(&self) -> &SystemInfo {
        &self.info
    }

    fn f(&self, _x: &Vector, _u: &Vector, _t: Real) -> DynResult<Vector> {
        Ok(Vector::from_element(1, self.rate))
    }
}

/// Planar kinematics with no inputs: position driven by a constant velocity.
struct Kinematic {
    info: SystemInfo,
}

impl Kinematic {
    fn new() -> Self {
        let info = SystemInfo::new(2, 0, 2)
            .unwrap()
            .with_x0(Vector::from_vec(vec![0.0, 1.5]))
            .unwrap();
        Self { info }
    }
}

impl DynamicalSystem for Kinematic {
    fn info(&self) -> &SystemInfo {
        &self.info
    }

    fn f(&self, x: &Vector, _u: &Vector, _t: Real) -> DynResult<Vector> {
        Ok(Vector::from_vec(vec![x[1], 0.0]))
    }
}

/// Fails once t passes a threshold.
struct Faulty;

impl DynamicalSystem for Faulty {
    fn info(&self) -> &SystemInfo {
        static INFO: std::sync::OnceLock<SystemInfo> = std::sync::OnceLock::new();
        INFO.get_or_init(|| SystemInfo::new(1, 0, 1).unwrap())
    }

    fn f(&self, _x: &Vector, _u: &Vector, t: Real) -> DynResult<Vector> {
        if t > 0.5 {
            Err(DynamicsError::Evaluation {
                message: "sensor offline".to_string(),
            })
        } else {
            Ok(Vector::zeros(1))
        }
    }
}

/// Returns a derivative of the wrong length.
struct Broken {
    info: SystemInfo,
}

impl DynamicalSystem for Broken {
    fn info(&self) -> &SystemInfo {
        &self.info
    }

    fn f(&self, _x: &Vector, _u: &Vector, _t: Real) -> DynResult<Vector> {
        Ok(Vector::zeros(3))
    }
}

fn last_state(traj: &cl_results::Trajectory) -> Real {
    traj.state_at(traj.time_steps() - 1)[0]
}

#[test]
fn euler_decay_matches_discrete_solution() {
    let sys = Decay::new(1.0);
    let traj = simulate(&sys, SimOptions::new(1.0, 1001, SolverMethod::Euler)).unwrap();

    assert_eq!(traj.time_steps(), 1001);
    assert_eq!(traj.time_final(), 1.0);
    assert_eq!(traj.n_inputs(), 0);

    let exact = (-1.0_f64).exp();
    let discrete = 0.999_f64.powi(1000);
    let xf = last_state(&traj);
    assert!((xf - discrete).abs() < 1e-12, "xf = {xf}");
    // first-order global error
    assert!((xf - exact).abs() > 1e-4);
    assert!((xf - exact).abs() < 3e-4);
}

#[test]
fn euler_rows_follow_the_step_law() {
    let sys = FirstOrder::new();
    let opts = SimOptions::new(2.0, 41, SolverMethod::Euler).with_x0(Vector::from_element(1, 0.3));
    let sim = Simulator::new(&sys, ConstantInput(Vector::from_element(1, 1.0)), opts).unwrap();
    let dt = sim.dt();
    assert!((dt - 0.05).abs() < 1e-15);

    let traj = sim.compute().unwrap();
    for i in 0..traj.time_steps() - 1 {
        let predicted = traj.state_at(i) + traj.derivative_at(i) * dt;
        assert!((traj.state_at(i + 1) - predicted).norm() < 1e-14);
    }
    // derivative recorded at the last sample too
    let last = traj.time_steps() - 1;
    let expected = -traj.state_at(last)[0] + 1.0;
    assert!((traj.derivative_at(last)[0] - expected).abs() < 1e-14);
    // output law applied per sample
    assert!((traj.output_at(last)[0] - 2.0 * traj.state_at(last)[0]).abs() < 1e-14);
}

#[test]
fn ode_decay_is_accurate() {
    let sys = Decay::new(2.0);
    let traj = simulate(&sys, SimOptions::new(5.0, 51, SolverMethod::Ode)).unwrap();

    for (i, &t) in traj.t().iter().enumerate() {
        let exact = 2.0 * (-t).exp();
        assert!((traj.state_at(i)[0] - exact).abs() < 1e-6, "t = {t}");
        assert!((traj.derivative_at(i)[0] + traj.state_at(i)[0]).abs() < 1e-15);
    }
    assert_eq!(*traj.t().last().unwrap(), 5.0);
}

#[test]
fn forced_response_agrees_across_methods() {
    let sys = FirstOrder::new();
    let step = ConstantInput(Vector::from_element(1, 1.0));
    let exact = 1.0 - (-3.0_f64).exp();

    let mut previous_gap = Real::INFINITY;
    for n in [101, 1001, 10001] {
        let ode = Simulator::new(&sys, step.clone(), SimOptions::new(3.0, n, SolverMethod::Ode))
            .unwrap()
            .compute()
            .unwrap();
        let euler = Simulator::new(&sys, step.clone(), SimOptions::new(3.0, n, SolverMethod::Euler))
            .unwrap()
            .compute()
            .unwrap();

        assert!((last_state(&ode) - exact).abs() < 1e-6);
        assert_eq!(ode.input_at(n / 2)[0], 1.0);

        // Euler is first order: ten times the samples, a tenth of the gap
        let gap = (last_state(&ode) - last_state(&euler)).abs();
        assert!(gap > 0.0);
        assert!(gap < previous_gap / 5.0, "n = {n}: gap {gap} vs {previous_gap}");
        previous_gap = gap;
    }
    assert!(previous_gap < 1e-4);
}

#[test]
fn stiff_decay_is_solved() {
    for rate in [1e4, 1e5] {
        let sys = Exponential::new(-rate);
        let traj = simulate(&sys, SimOptions::new(10.0, 11, SolverMethod::Ode)).unwrap();
        assert_eq!(traj.time_steps(), 11);
        assert_eq!(traj.time_final(), 10.0);
        for i in 1..traj.time_steps() {
            let x = traj.state_at(i)[0];
            assert!(x.is_finite() && x.abs() < 1e-8, "rate = {rate}, i = {i}: x = {x}");
        }
    }
}

#[test]
fn diverged_run_can_be_archived() {
    let sys = Exponential::new(1000.0);
    let traj = simulate(&sys, SimOptions::new(10.0, 1001, SolverMethod::Euler)).unwrap();
    let xf = last_state(&traj);
    assert!(xf.is_infinite() && xf > 0.0);

    let dir = std::env::temp_dir().join("cl_sim_test");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("diverged.json");
    traj.save(&path).unwrap();
    let back = cl_results::Trajectory::load(&path).unwrap();

    let same = |a: Real, b: Real| a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan());
    assert_eq!(back.time_steps(), traj.time_steps());
    assert!(traj.x().iter().zip(back.x().iter()).all(|(a, b)| same(*a, *b)));
    assert!(traj.dx().iter().zip(back.dx().iter()).all(|(a, b)| same(*a, *b)));
    assert!(traj.y().iter().zip(back.y().iter()).all(|(a, b)| same(*a, *b)));
    assert!(traj.t().iter().zip(back.t()).all(|(a, b)| same(*a, *b)));
    std::fs::remove_file(&path).ok();
}

#[test]
fn input_free_system_runs_with_both_methods() {
    let sys = Kinematic::new();
    for method in [SolverMethod::Euler, SolverMethod::Ode] {
        let traj = simulate(&sys, SimOptions::new(4.0, 9, method)).unwrap();
        assert_eq!(traj.u().shape(), (9, 0));
        assert_eq!(traj.y().shape(), (9, 2));
        let xf = traj.state_at(8);
        assert!((xf[0] - 6.0).abs() < 1e-9, "{method}");
        assert_eq!(xf[1], 1.5);
    }
}

#[test]
fn too_few_samples_is_rejected() {
    let sys = Decay::new(1.0);
    let err = simulate(&sys, SimOptions::new(1.0, 1, SolverMethod::Euler)).unwrap_err();
    assert!(matches!(err, SimError::InvalidArg { .. }));

    let err = simulate(&sys, SimOptions::new(-1.0, 10, SolverMethod::Euler)).unwrap_err();
    assert!(matches!(err, SimError::InvalidArg { .. }));
}

#[test]
fn initial_state_length_is_checked() {
    let sys = Decay::new(1.0);
    let opts = SimOptions::default().with_x0(Vector::zeros(2));
    let err = simulate(&sys, opts).unwrap_err();
    assert!(matches!(
        err,
        SimError::DimensionMismatch {
            what: "initial state",
            expected: 1,
            got: 2
        }
    ));
}

#[test]
fn wrong_input_length_is_checked() {
    let sys = FirstOrder::new();
    let sim = Simulator::new(
        &sys,
        ConstantInput(Vector::zeros(2)),
        SimOptions::new(1.0, 11, SolverMethod::Euler),
    )
    .unwrap();
    let err = sim.compute().unwrap_err();
    assert!(matches!(err, SimError::DimensionMismatch { what: "input", .. }));
}

#[test]
fn wrong_derivative_length_is_checked() {
    let sys = Broken {
        info: SystemInfo::new(1, 0, 1).unwrap(),
    };
    for method in [SolverMethod::Euler, SolverMethod::Ode] {
        let err = simulate(&sys, SimOptions::new(1.0, 11, method)).unwrap_err();
        assert!(matches!(
            err,
            SimError::DimensionMismatch {
                what: "state derivative",
                expected: 1,
                got: 3
            }
        ));
    }
}

#[test]
fn evaluation_failure_aborts_the_run() {
    for method in [SolverMethod::Euler, SolverMethod::Ode] {
        let err = simulate(&Faulty, SimOptions::new(1.0, 11, method)).unwrap_err();
        assert!(matches!(err, SimError::Dynamics(DynamicsError::Evaluation { .. })));
    }
}

#[test]
fn exhausted_step_budget_is_reported() {
    let sys = Decay::new(1.0);
    let mut opts = SimOptions::new(10.0, 2, SolverMethod::Ode);
    opts.ode = OdeOptions {
        h_init: Some(1e-3),
        max_steps_per_interval: 1,
        max_implicit_steps_per_interval: 1,
        ..OdeOptions::default()
    };
    let err = simulate(&sys, opts).unwrap_err();
    assert!(matches!(err, SimError::Integration { .. }));
}

proptest! {
    #[test]
    fn euler_integrates_constant_drift_exactly(
        rate in -5.0..5.0_f64,
        tf in 0.1..20.0_f64,
        n in 2usize..300,
    ) {
        let sys = Drift::new(rate);
        let traj = simulate(&sys, SimOptions::new(tf, n, SolverMethod::Euler)).unwrap();
        prop_assert_eq!(traj.time_steps(), n);
        let xf = last_state(&traj);
        prop_assert!((xf - rate * tf).abs() <= 1e-9 * (1.0 + (rate * tf).abs()));
    }
}
