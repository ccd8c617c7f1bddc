//! Trajectory metrics and statistics.
//!
//! Summaries of a simulated descent: drift, drop, speeds, spin and the
//! mechanical energy budget. Velocities come straight from the state, so no
//! numerical differentiation of positions is needed; only the energy rate is
//! differenced.

use std::collections::BTreeMap;

use ndarray::Array1;

use crate::constants::PhysicalConstants;
use crate::constants::model_params::BodyParameters;
use crate::error::{CalcError, Result};
use crate::trajectory::{Trajectory, TrajectoryDatabase};

/// Per-sample series and derived statistics for one trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryMetrics {
    /// Time stamps (s)
    pub t: Array1<f64>,
    /// Position columns (m)
    pub x: Array1<f64>,
    pub y: Array1<f64>,
    /// Orientation (rad)
    pub theta: Array1<f64>,
    /// Angular velocity (rad/s)
    pub omega: Array1<f64>,
    /// Speed magnitude (m/s)
    pub speed: Array1<f64>,
    /// Translational kinetic energy (J)
    pub kinetic_energy: Array1<f64>,
    /// Potential energy relative to y = 0 (J)
    pub potential_energy: Array1<f64>,
    /// Mechanical energy (J)
    pub total_energy: Array1<f64>,
    /// Rate of change of mechanical energy (W)
    pub energy_rate: Array1<f64>,
}

impl TrajectoryMetrics {
    /// Compute metrics for a trajectory sampled at fixed step `dt`.
    pub fn from_trajectory(
        trajectory: &Trajectory,
        dt: f64,
        params: &BodyParameters,
        constants: &PhysicalConstants,
    ) -> Result<Self> {
        if trajectory.len() < 2 {
            return Err(CalcError::Format(
                "need at least 2 states to compute metrics".to_string(),
            ));
        }
        if !(dt.is_finite() && dt > 0.0) {
            return Err(CalcError::InvalidTimeStep(dt));
        }

        let n = trajectory.len();
        let column = |f: fn(&crate::state::State) -> f64| -> Array1<f64> {
            trajectory.iter().map(f).collect()
        };

        let t: Array1<f64> = trajectory.times(dt).into();
        let x = column(|s| s.x);
        let y = column(|s| s.y);
        let theta = column(|s| s.theta);
        let omega = column(|s| s.omega);
        let speed = column(|s| s.speed());

        let kinetic_energy = speed.mapv(|v| 0.5 * params.mass * v * v);
        let potential_energy = y.mapv(|h| params.mass * constants.g * h);
        let total_energy = &kinetic_energy + &potential_energy;

        // dE/dt: one-sided at the ends, central inside
        let mut energy_rate = Array1::zeros(n);
        for i in 0..n {
            energy_rate[i] = if i == 0 {
                (total_energy[1] - total_energy[0]) / dt
            } else if i == n - 1 {
                (total_energy[i] - total_energy[i - 1]) / dt
            } else {
                (total_energy[i + 1] - total_energy[i - 1]) / (2.0 * dt)
            };
        }

        Ok(Self {
            t,
            x,
            y,
            theta,
            omega,
            speed,
            kinetic_energy,
            potential_energy,
            total_energy,
            energy_rate,
        })
    }

    /// Simulated time spanned by the samples.
    pub fn flight_time(&self) -> f64 {
        self.t[self.t.len() - 1] - self.t[0]
    }

    /// Net horizontal displacement.
    pub fn horizontal_drift(&self) -> f64 {
        self.x[self.x.len() - 1] - self.x[0]
    }

    /// Net descent, positive when the body ends lower than it started.
    pub fn vertical_drop(&self) -> f64 {
        self.y[0] - self.y[self.y.len() - 1]
    }

    pub fn mean_speed(&self) -> f64 {
        self.speed.mean().unwrap_or(0.0)
    }

    pub fn max_speed(&self) -> f64 {
        self.speed.fold(f64::NEG_INFINITY, |a, &b| a.max(b))
    }

    /// Net change in orientation.
    pub fn total_rotation(&self) -> f64 {
        self.theta[self.theta.len() - 1] - self.theta[0]
    }

    pub fn max_spin_rate(&self) -> f64 {
        self.omega.fold(0.0, |a: f64, &b| a.max(b.abs()))
    }

    /// Mean dE/dt (negative indicates dissipation).
    pub fn mean_energy_dissipation(&self) -> f64 {
        self.energy_rate.mean().unwrap_or(0.0)
    }

    /// Get summary statistics keyed by name.
    pub fn get_summary(&self) -> BTreeMap<String, f64> {
        let mut summary = BTreeMap::new();
        summary.insert("n_points".to_string(), self.t.len() as f64);
        summary.insert("flight_time".to_string(), self.flight_time());
        summary.insert("horizontal_drift".to_string(), self.horizontal_drift());
        summary.insert("vertical_drop".to_string(), self.vertical_drop());
        summary.insert("mean_speed".to_string(), self.mean_speed());
        summary.insert("max_speed".to_string(), self.max_speed());
        summary.insert("total_rotation".to_string(), self.total_rotation());
        summary.insert("max_spin_rate".to_string(), self.max_spin_rate());
        summary.insert(
            "mean_energy_dissipation".to_string(),
            self.mean_energy_dissipation(),
        );
        summary
    }
}

/// Metrics for every run of a database; runs too short to measure are skipped.
pub fn batch_compute_metrics(
    db: &TrajectoryDatabase,
    dt: f64,
    params: &BodyParameters,
    constants: &PhysicalConstants,
) -> Vec<(String, TrajectoryMetrics)> {
    db.iter()
        .filter_map(|(label, trajectory)| {
            TrajectoryMetrics::from_trajectory(trajectory, dt, params, constants)
                .ok()
                .map(|m| (label.to_string(), m))
        })
        .collect()
}

/// Root mean square distance between matching positions of two trajectories.
pub fn trajectory_rmse(a: &Trajectory, b: &Trajectory) -> Result<f64> {
    if a.len() != b.len() {
        return Err(CalcError::Format(format!(
            "trajectories must have same length for RMSE ({} vs {})",
            a.len(),
            b.len()
        )));
    }
    if a.is_empty() {
        return Ok(0.0);
    }

    let total: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(p, q)| {
            let dx = p.x - q.x;
            let dy = p.y - q.y;
            dx * dx + dy * dy
        })
        .sum();

    Ok((total / a.len() as f64).sqrt())
}
