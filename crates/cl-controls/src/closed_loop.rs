//! Plant + static controller composed into one dynamical system.

use cl_core::{Matrix, Real, Vector};
use cl_dynamics::{DynResult, DynamicalSystem, SystemInfo};
use cl_results::Trajectory;
use cl_sim::{InputSignal, SimOptions, Simulator, SystemInput};

use crate::controller::StaticController;
use crate::error::{ControlError, ControlResult};

/// Closed-loop system `dx = f(x, c(h(x, u_nom, t), r, t), t)`.
///
/// The composed system keeps the plant state (n) and output (p); its input
/// is the controller reference `r` (k). The open-loop input law `t2u`
/// returns the controller's reference signal, so simulating the composed
/// system with its own input tracks `t2r`.
///
/// The sensor reading fed to the controller is `h(x, u_nom, t)` with
/// `u_nom = plant.t2u(t)`, which avoids an algebraic loop for plants whose
/// output depends on the input.
#[derive(Debug, Clone)]
pub struct ClosedLoopSystem<S, C> {
    plant: S,
    controller: C,
    info: SystemInfo,
}

impl<S: DynamicalSystem, C: StaticController> ClosedLoopSystem<S, C> {
    /// Compose a plant and a controller.
    ///
    /// Fails unless the controller output matches the plant input
    /// dimension and the controller sensor dimension matches the plant
    /// output dimension.
    pub fn new(plant: S, controller: C) -> ControlResult<Self> {
        if controller.m() != plant.m() {
            return Err(ControlError::DimensionMismatch {
                what: "controller output vs plant input",
                expected: plant.m(),
                got: controller.m(),
            });
        }
        if controller.p() != plant.p() {
            return Err(ControlError::DimensionMismatch {
                what: "controller sensor vs plant output",
                expected: plant.p(),
                got: controller.p(),
            });
        }

        let pi = plant.info();
        let k = controller.k();
        let info = SystemInfo::new(pi.n(), k, pi.p())?
            .with_name(format!("Closed-Loop {}", pi.name))
            .with_state_bounds(pi.domain.x_lb.clone(), pi.domain.x_ub.clone())?
            .with_operating_point(
                pi.operating_point.xbar.clone(),
                controller.info().rbar.clone(),
            )?
            .with_x0(pi.operating_point.x0.clone())?
            .with_state_labels(pi.labels.state.clone(), pi.labels.state_units.clone())?
            .with_input_labels(
                (0..k).map(|i| format!("Ref {i}")).collect(),
                vec![String::new(); k],
            )?
            .with_output_labels(pi.labels.output.clone(), pi.labels.output_units.clone())?;

        Ok(Self {
            plant,
            controller,
            info,
        })
    }

    pub fn plant(&self) -> &S {
        &self.plant
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    /// Controller input actually applied to the plant for state `x` and
    /// reference `r` at time `t`.
    pub fn plant_input(&self, x: &Vector, r: &Vector, t: Real) -> ControlResult<Vector> {
        let u_nom = self.plant.t2u(t)?;
        let y = self.plant.h(x, &u_nom, t)?;
        self.controller.c(&y, r, t)
    }

    /// Whether the plant input applied at time `t` for state `x` and
    /// reference `r` lies in the plant's input domain.
    ///
    /// Time-varying sensors, nominal inputs or control laws make this depend
    /// on `t`; [`DynamicalSystem::isavalidinput`] checks `t = 0` only.
    pub fn isavalidinput_at(&self, x: &Vector, r: &Vector, t: Real) -> bool {
        match self.plant_input(x, r, t) {
            Ok(u) => self.plant.isavalidinput(x, &u),
            Err(_) => false,
        }
    }

    /// Simulate the loop under the controller's own reference `t2r` and
    /// return the plant trajectory (see [`plant_trajectory`](Self::plant_trajectory)).
    pub fn compute_trajectory(&self, options: SimOptions) -> ControlResult<Trajectory> {
        self.compute_trajectory_with(SystemInput::new(self), options)
    }

    /// Like [`compute_trajectory`](Self::compute_trajectory) with an
    /// explicit reference signal `r(t)` (length k).
    pub fn compute_trajectory_with<U: InputSignal>(
        &self,
        reference: U,
        options: SimOptions,
    ) -> ControlResult<Trajectory> {
        let traj = Simulator::new(self, reference, options)?.compute()?;
        self.plant_trajectory(&traj)
    }

    /// Turn a trajectory of this composed system into a plant trajectory.
    ///
    /// The composed system records the reference in `u`. The result moves
    /// it to `r` and fills `u` with the plant inputs the controller
    /// produced. States, derivatives and outputs are kept; cost signals
    /// are carried over when present.
    pub fn plant_trajectory(&self, traj: &Trajectory) -> ControlResult<Trajectory> {
        let samples = traj.time_steps();
        let mut u = Matrix::zeros(samples, self.plant.m());
        for (i, &t) in traj.t().iter().enumerate() {
            let ui = self.plant_input(&traj.state_at(i), &traj.input_at(i), t)?;
            u.set_row(i, &ui.transpose());
        }

        let rebuilt = Trajectory::new(
            traj.x().clone(),
            u,
            traj.t().to_vec(),
            traj.dx().clone(),
            traj.y().clone(),
        )?
        .with_reference(traj.u().clone())?;

        Ok(match (traj.j(), traj.dj()) {
            (Some(j), Some(dj)) => rebuilt.with_cost(j.to_vec(), dj.to_vec())?,
            _ => rebuilt,
        })
    }
}

impl<S: DynamicalSystem, C: StaticController> DynamicalSystem for ClosedLoopSystem<S, C> {
    fn info(&self) -> &SystemInfo {
        &self.info
    }

    fn f(&self, x: &Vector, r: &Vector, t: Real) -> DynResult<Vector> {
        let u = self.plant_input(x, r, t)?;
        self.plant.f(x, &u, t)
    }

    fn h(&self, x: &Vector, r: &Vector, t: Real) -> DynResult<Vector> {
        let u = self.plant_input(x, r, t)?;
        self.plant.h(x, &u, t)
    }

    fn t2u(&self, t: Real) -> DynResult<Vector> {
        Ok(self.controller.t2r(t)?)
    }

    /// Valid iff the plant input the controller would apply at `t = 0` is
    /// in the plant's input domain. Use
    /// [`isavalidinput_at`](ClosedLoopSystem::isavalidinput_at) for other
    /// times.
    fn isavalidinput(&self, x: &Vector, r: &Vector) -> bool {
        self.isavalidinput_at(x, r, 0.0)
    }

    fn xut2q(&self, x: &Vector, r: &Vector, t: Real) -> DynResult<Vector> {
        let u = self.plant_input(x, r, t)?;
        self.plant.xut2q(x, &u, t)
    }
}
