//! Closed-loop composition and simulation of a plant under feedback.

use cl_controls::{ClosedLoopSystem, ControlError, LinearFeedback, StaticController};
use cl_core::{Matrix, Real, Vector};
use cl_dynamics::{DynResult, DynamicalSystem, LinearSystem, SystemInfo};
use cl_sim::{SimOptions, SolverMethod, simulate};

/// dx = u, y = x
fn integrator() -> LinearSystem {
    LinearSystem::from_ab(Matrix::zeros(1, 1), Matrix::from_element(1, 1, 1.0)).unwrap()
}

/// dx = u, y = x + t (drifting sensor)
struct DriftingSensor {
    info: SystemInfo,
}

impl DynamicalSystem for DriftingSensor {
    fn info(&self) -> &SystemInfo {
        &self.info
    }

    fn f(&self, _x: &Vector, u: &Vector, _t: Real) -> DynResult<Vector> {
        Ok(u.clone())
    }

    fn h(&self, x: &Vector, _u: &Vector, t: Real) -> DynResult<Vector> {
        Ok(x.add_scalar(t))
    }
}

/// u = 2 (r - y) with r = 1
fn proportional() -> LinearFeedback {
    LinearFeedback::tracking(Matrix::from_element(1, 1, 2.0))
        .unwrap()
        .with_reference(Vector::from_element(1, 1.0))
        .unwrap()
}

#[test]
fn composed_dimensions() {
    let cl = ClosedLoopSystem::new(integrator(), proportional()).unwrap();
    assert_eq!((cl.n(), cl.m(), cl.p()), (1, 1, 1));
    assert!(cl.info().name.starts_with("Closed-Loop"));
    assert_eq!(cl.info().labels.input[0], "Ref 0");
    assert_eq!(cl.t2u(3.0).unwrap(), Vector::from_element(1, 1.0));
}

#[test]
fn mismatched_controller_is_rejected() {
    let wide = LinearFeedback::tracking(Matrix::zeros(2, 1)).unwrap();
    let err = ClosedLoopSystem::new(integrator(), wide).unwrap_err();
    assert!(matches!(
        err,
        ControlError::DimensionMismatch {
            expected: 1,
            got: 2,
            ..
        }
    ));
}

#[test]
fn feedback_drives_the_plant() {
    let cl = ClosedLoopSystem::new(integrator(), proportional()).unwrap();
    let x = Vector::from_element(1, 0.25);
    let r = Vector::from_element(1, 1.0);
    assert_eq!(cl.f(&x, &r, 0.0).unwrap()[0], 1.5);
    assert_eq!(cl.h(&x, &r, 0.0).unwrap()[0], 0.25);
    assert_eq!(cl.plant_input(&x, &r, 0.0).unwrap()[0], 1.5);
}

#[test]
fn input_validity_uses_the_applied_plant_input() {
    let cl = ClosedLoopSystem::new(integrator(), proportional()).unwrap();
    let x = Vector::zeros(1);
    // u = 2 * 0.25 = 0.5, inside the default [-1, 1] box
    assert!(cl.isavalidinput(&x, &Vector::from_element(1, 0.25)));
    // u = 2 * 1 = 2, outside
    assert!(!cl.isavalidinput(&x, &Vector::from_element(1, 1.0)));
}

#[test]
fn input_validity_follows_time_varying_sensing() {
    let plant = DriftingSensor {
        info: SystemInfo::new(1, 1, 1).unwrap(),
    };
    let cl = ClosedLoopSystem::new(plant, proportional()).unwrap();
    let x = Vector::zeros(1);
    let r = Vector::from_element(1, 0.25);
    // t = 0: u = 2 * (0.25 - 0) = 0.5
    assert!(cl.isavalidinput(&x, &r));
    assert!(cl.isavalidinput_at(&x, &r, 0.0));
    // t = 1: u = 2 * (0.25 - 1) = -1.5
    assert!(!cl.isavalidinput_at(&x, &r, 1.0));
}

#[test]
fn closed_loop_simulation_tracks_reference() {
    let cl = ClosedLoopSystem::new(integrator(), proportional()).unwrap();
    let traj = simulate(&cl, SimOptions::new(3.0, 301, SolverMethod::Ode)).unwrap();

    for (i, &t) in traj.t().iter().enumerate() {
        let exact = 1.0 - (-2.0 * t).exp();
        assert!((traj.state_at(i)[0] - exact).abs() < 1e-6, "t = {t}");
        assert_eq!(traj.input_at(i)[0], 1.0);
    }
}

#[test]
fn plant_trajectory_recovers_control_inputs() {
    let cl = ClosedLoopSystem::new(integrator(), proportional()).unwrap();
    let traj = simulate(&cl, SimOptions::new(1.0, 101, SolverMethod::Euler)).unwrap();
    let plant = cl.plant_trajectory(&traj).unwrap();

    assert_eq!(plant.time_steps(), traj.time_steps());
    assert_eq!(plant.x(), traj.x());
    let r = plant.r().unwrap();
    for i in 0..plant.time_steps() {
        assert_eq!(r[(i, 0)], 1.0);
        let expected = 2.0 * (1.0 - plant.state_at(i)[0]);
        assert!((plant.input_at(i)[0] - expected).abs() < 1e-14);
        // plant dynamics dx = u
        assert!((plant.derivative_at(i)[0] - plant.input_at(i)[0]).abs() < 1e-14);
    }
}

#[test]
fn saturated_feedback_limits_the_rate() {
    let ctl = proportional()
        .with_saturation(Vector::from_element(1, -0.5), Vector::from_element(1, 0.5))
        .unwrap();
    assert!(ctl.limits().is_some());
    let cl = ClosedLoopSystem::new(integrator(), ctl).unwrap();
    let traj = simulate(&cl, SimOptions::new(1.0, 11, SolverMethod::Euler)).unwrap();
    // u stays at the limit while 2 (1 - x) > 0.5, i.e. x < 0.75
    let xf = traj.state_at(traj.time_steps() - 1)[0];
    assert!((xf - 0.5).abs() < 1e-12);
    assert_eq!(cl.controller().k(), 1);
}

#[test]
fn compute_trajectory_returns_the_plant_view() {
    let cl = ClosedLoopSystem::new(integrator(), proportional()).unwrap();
    let plant = cl
        .compute_trajectory(SimOptions::new(2.0, 201, SolverMethod::Ode))
        .unwrap();
    assert_eq!(plant.n_inputs(), 1);
    let last = plant.time_steps() - 1;
    let exact = 1.0 - (-4.0_f64).exp();
    assert!((plant.state_at(last)[0] - exact).abs() < 1e-6);
    assert!((plant.input_at(last)[0] - 2.0 * (1.0 - exact)).abs() < 1e-5);

    // explicit reference: r steps from 0 to 1 at t = 1
    let step = |t: f64| Vector::from_element(1, if t < 1.0 { 0.0 } else { 1.0 });
    let plant = cl
        .compute_trajectory_with(step, SimOptions::new(2.0, 201, SolverMethod::Euler))
        .unwrap();
    let r = plant.r().unwrap();
    assert_eq!(r[(0, 0)], 0.0);
    assert_eq!(r[(200, 0)], 1.0);
    assert_eq!(plant.state_at(100)[0], 0.0);
}
