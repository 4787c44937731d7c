use cl_core::Real;

use crate::trajectory::Trajectory;

/// Summary statistics of a trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectorySummary {
    pub samples: usize,
    pub time_final: Real,
    pub final_state: Vec<Real>,
    pub state_min: Vec<Real>,
    pub state_max: Vec<Real>,
    pub final_cost: Option<Real>,
}

impl TrajectorySummary {
    pub fn from_trajectory(traj: &Trajectory) -> Self {
        let x = traj.x();
        let last = traj.time_steps() - 1;
        Self {
            samples: traj.time_steps(),
            time_final: traj.time_final(),
            final_state: x.row(last).iter().copied().collect(),
            state_min: x.column_iter().map(|c| c.min()).collect(),
            state_max: x.column_iter().map(|c| c.max()).collect(),
            final_cost: traj.j().and_then(|j| j.last().copied()),
        }
    }
}
