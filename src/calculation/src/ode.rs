//! Fixed-step ODE integration for the falling-body model.
//!
//! The classic RK4 scheme is used throughout: four right-hand side
//! evaluations per step, local error O(h⁵), global error O(h⁴). There is no
//! adaptive stepping and no error estimation; a run is fully determined by
//! its inputs.

use std::ops::ControlFlow;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::aerodynamics::LeafModel;
use crate::constants::PhysicalConstants;
use crate::constants::model_params::BodyParameters;
use crate::error::{CalcError, Result};
use crate::state::State;
use crate::trajectory::Trajectory;

/// An autonomous ODE system: `dy/dt = f(y)`.
pub trait OdeSystem {
    /// Compute the right-hand side of the ODE system.
    fn rhs(&self, state: &State) -> State;
}

/// Single RK4 step of `system` from `state` with step `h`.
#[inline(always)]
pub fn rk4_step_system<S: OdeSystem + ?Sized>(system: &S, state: &State, h: f64) -> State {
    let h2 = 0.5 * h;

    // k1 = f(y)
    let k1 = system.rhs(state);

    // k2 = f(y + h/2 * k1)
    let k2 = system.rhs(&state.add_mul(&k1, h2));

    // k3 = f(y + h/2 * k2)
    let k3 = system.rhs(&state.add_mul(&k2, h2));

    // k4 = f(y + h * k3)
    let k4 = system.rhs(&state.add_mul(&k3, h));

    // y_new = y + h/6 * (k1 + 2*k2 + 2*k3 + k4)
    let sum = k1.add_mul(&k2, 2.0).add_mul(&k3, 2.0).add_mul(&k4, 1.0);
    state.add_mul(&sum, h / 6.0)
}

/// Single RK4 step of the falling-body model under standard constants.
#[inline(always)]
pub fn rk4_step(state: &State, params: &BodyParameters, dt: f64) -> State {
    rk4_step_system(&LeafModel::standard(*params), state, dt)
}

/// Integrate `system` and record the state *before* each step.
///
/// Invokes `observer(index, state)` after recording each state; returning
/// `ControlFlow::Break` ends the run early with what was recorded so far.
pub fn generate_trajectory_with<S, F>(
    system: &S,
    initial_state: State,
    dt: f64,
    steps: usize,
    mut observer: F,
) -> Trajectory
where
    S: OdeSystem + ?Sized,
    F: FnMut(usize, &State) -> ControlFlow<()>,
{
    let mut trajectory = Trajectory::with_capacity(steps);
    let mut state = initial_state;

    for i in 0..steps {
        trajectory.push(state);
        if observer(i, &state).is_break() {
            debug!(step = i, "trajectory generation stopped by observer");
            break;
        }
        state = rk4_step_system(system, &state, dt);
    }

    trajectory
}

/// Integrate `system` for `steps` steps. The final post-step state is not
/// recorded, so the result holds exactly `steps` states starting at
/// `initial_state`.
pub fn generate_trajectory_system<S: OdeSystem + ?Sized>(
    system: &S,
    initial_state: State,
    dt: f64,
    steps: usize,
) -> Trajectory {
    let mut trajectory = Trajectory::with_capacity(steps);
    let mut state = initial_state;

    for _ in 0..steps {
        trajectory.push(state);
        state = rk4_step_system(system, &state, dt);
    }

    trajectory
}

/// Trajectory of a body under standard constants.
///
/// Inputs are assumed validated; see [`Simulation`] for the checked entry
/// point.
pub fn generate_trajectory(
    params: &BodyParameters,
    initial_state: State,
    dt: f64,
    steps: usize,
) -> Trajectory {
    generate_trajectory_system(&LeafModel::standard(*params), initial_state, dt, steps)
}

/// Like [`generate_trajectory_system`] but stops at the first state that is
/// not finite and reports its index.
pub fn generate_trajectory_checked<S: OdeSystem + ?Sized>(
    system: &S,
    initial_state: State,
    dt: f64,
    steps: usize,
) -> Result<Trajectory> {
    let mut bad_step = None;
    let trajectory = generate_trajectory_with(system, initial_state, dt, steps, |i, s| {
        if s.is_finite() {
            ControlFlow::Continue(())
        } else {
            bad_step = Some(i);
            ControlFlow::Break(())
        }
    });

    match bad_step {
        Some(step) => {
            warn!(step, "non-finite state detected");
            Err(CalcError::NonFinite { step })
        }
        None => Ok(trajectory),
    }
}

/// Fixed-step integration settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Integrator {
    pub dt: f64,      // Time step (s)
    pub steps: usize, // Number of recorded steps
}

impl Integrator {
    /// Create validated settings.
    pub fn new(dt: f64, steps: usize) -> Result<Self> {
        let integrator = Self { dt, steps };
        integrator.validate()?;
        Ok(integrator)
    }

    /// `dt` must be finite and strictly positive.
    pub fn validate(&self) -> Result<()> {
        if self.dt.is_finite() && self.dt > 0.0 {
            Ok(())
        } else {
            Err(CalcError::InvalidTimeStep(self.dt))
        }
    }

    /// Simulated time covered by the recorded states.
    pub fn duration(&self) -> f64 {
        self.dt * self.steps as f64
    }
}

impl Default for Integrator {
    fn default() -> Self {
        Self {
            dt: 0.01,
            steps: 1000,
        }
    }
}

/// Validated simulation setup: one body, one set of constants, one step size.
///
/// Everything is checked once in [`Simulation::new`]; runs never fail
/// afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Simulation {
    model: LeafModel,
    integrator: Integrator,
}

impl Simulation {
    /// Validate inputs and build the simulation.
    pub fn new(
        params: BodyParameters,
        constants: PhysicalConstants,
        integrator: Integrator,
    ) -> Result<Self> {
        params.validate()?;
        integrator.validate()?;
        Ok(Self {
            model: LeafModel::new(params, constants),
            integrator,
        })
    }

    /// The bound ODE system.
    pub fn model(&self) -> &LeafModel {
        &self.model
    }

    /// The step settings.
    pub fn integrator(&self) -> &Integrator {
        &self.integrator
    }

    /// Run one trajectory.
    pub fn run(&self, initial_state: State) -> Trajectory {
        generate_trajectory_system(
            &self.model,
            initial_state,
            self.integrator.dt,
            self.integrator.steps,
        )
    }

    /// Run one trajectory, failing on the first non-finite state.
    pub fn run_checked(&self, initial_state: State) -> Result<Trajectory> {
        generate_trajectory_checked(
            &self.model,
            initial_state,
            self.integrator.dt,
            self.integrator.steps,
        )
    }

    /// Run independent trajectories in parallel. Output order matches input.
    pub fn run_batch(&self, initial_states: &[State]) -> Vec<Trajectory> {
        info!(
            runs = initial_states.len(),
            dt = self.integrator.dt,
            steps = self.integrator.steps,
            "running trajectory batch"
        );
        initial_states.par_iter().map(|s| self.run(*s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    // Simple harmonic oscillator on the (x, vx) pair for testing
    struct HarmonicOscillator {
        k: f64, // spring constant
        m: f64, // mass
    }

    impl OdeSystem for HarmonicOscillator {
        fn rhs(&self, state: &State) -> State {
            State {
                x: state.vx,
                vx: -self.k / self.m * state.x,
                ..State::zero()
            }
        }
    }

    fn leaf_start() -> State {
        State::new(0.0, 0.0, 0.0, 1.0, -1.0, 0.0)
    }

    #[test]
    fn test_rk4_step_oscillator() {
        let system = HarmonicOscillator { k: 1.0, m: 1.0 };
        let state0 = State::new(1.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        let h = 0.1;
        let state1 = rk4_step_system(&system, &state0, h);

        // Exact solution x = cos(t), v = -sin(t); RK4 local error ~h⁵
        assert_abs_diff_eq!(state1.x, h.cos(), epsilon = 1e-6);
        assert_abs_diff_eq!(state1.vx, -h.sin(), epsilon = 1e-6);
    }

    #[test]
    fn test_oscillator_global_order() {
        let system = HarmonicOscillator { k: 1.0, m: 1.0 };
        let state0 = State::new(1.0, 0.0, 0.0, 0.0, 0.0, 0.0);

        let error_at = |dt: f64| {
            let steps = (1.0 / dt).round() as usize;
            let mut s = state0;
            for _ in 0..steps {
                s = rk4_step_system(&system, &s, dt);
            }
            (s.x - 1.0_f64.cos()).abs()
        };

        // Halving dt should cut the error by roughly 2⁴
        let ratio = error_at(0.1) / error_at(0.05);
        assert!(ratio > 12.0 && ratio < 20.0, "ratio = {ratio}");
    }

    #[test]
    fn test_reference_step() {
        let s1 = rk4_step(&leaf_start(), &BodyParameters::leaf(), 0.01);
        let expected = [
            0.011493654819814106,
            -0.008419880500609668,
            0.0005584827993997081,
            1.2654857823434942,
            -0.6936106233904862,
            0.10868527328084654,
        ];
        for (got, want) in s1.to_array().iter().zip(expected.iter()) {
            assert_relative_eq!(*got, *want, max_relative = 1e-10);
        }
    }

    #[test]
    fn test_rk4_step_is_deterministic() {
        let params = BodyParameters::leaf();
        let a = rk4_step(&leaf_start(), &params, 0.01).to_array();
        let b = rk4_step(&leaf_start(), &params, 0.01).to_array();
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }

    #[test]
    fn test_zero_steps_is_empty() {
        let t = generate_trajectory(&BodyParameters::leaf(), leaf_start(), 0.01, 0);
        assert!(t.is_empty());
        assert_eq!(t.len(), 0);
    }

    #[test]
    fn test_first_state_is_initial() {
        let s0 = State::new(0.1, 0.2, 0.3, 0.4, -0.5, 0.6);
        let t = generate_trajectory(&BodyParameters::leaf(), s0, 0.01, 3);
        assert_eq!(t.len(), 3);
        assert_eq!(t[0], s0);
    }

    #[test]
    fn test_records_pre_step_states() {
        let params = BodyParameters::leaf();
        let t = generate_trajectory(&params, leaf_start(), 0.01, 3);
        let s1 = rk4_step(&leaf_start(), &params, 0.01);
        let s2 = rk4_step(&s1, &params, 0.01);
        assert_eq!(t[1], s1);
        assert_eq!(t[2], s2);
    }

    #[test]
    fn test_doubling_steps_doubles_length() {
        let params = BodyParameters::leaf();
        let short = generate_trajectory(&params, leaf_start(), 0.01, 50);
        let long = generate_trajectory(&params, leaf_start(), 0.01, 100);
        assert_eq!(long.len(), 2 * short.len());
        assert_eq!(&long.states()[..50], short.states());
    }

    #[test]
    fn test_ballistic_motion_without_drag() {
        let params = BodyParameters {
            mass: 0.01,
            width: 0.0,
            height: 0.0,
            drag_coeff_perp: 0.0,
            drag_coeff_para: 0.0,
        };
        let dt = 0.01;
        let t = generate_trajectory(&params, leaf_start(), dt, 101);
        let g = PhysicalConstants::STANDARD.g;

        for (i, s) in t.iter().enumerate() {
            let time = i as f64 * dt;
            assert_abs_diff_eq!(s.vx, 1.0, epsilon = 1e-12);
            assert_abs_diff_eq!(s.vy, -1.0 - g * time, epsilon = 1e-9);
            assert_abs_diff_eq!(s.x, time, epsilon = 1e-9);
            assert_abs_diff_eq!(s.y, -time - 0.5 * g * time * time, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_observer_can_stop_early() {
        let model = LeafModel::standard(BodyParameters::leaf());
        let mut seen = Vec::new();
        let t = generate_trajectory_with(&model, leaf_start(), 0.01, 100, |i, _| {
            seen.push(i);
            if i == 9 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(t.len(), 10);
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_observer_sees_full_run() {
        let model = LeafModel::standard(BodyParameters::leaf());
        let mut count = 0;
        let t = generate_trajectory_with(&model, leaf_start(), 0.01, 25, |_, _| {
            count += 1;
            ControlFlow::Continue(())
        });
        assert_eq!(count, 25);
        assert_eq!(t, generate_trajectory_system(&model, leaf_start(), 0.01, 25));
    }

    #[test]
    fn test_checked_detects_nan() {
        let model = LeafModel::standard(BodyParameters::leaf());
        let mut start = leaf_start();
        start.omega = f64::NAN;
        let err = generate_trajectory_checked(&model, start, 0.01, 10).unwrap_err();
        assert!(matches!(err, CalcError::NonFinite { step: 0 }));
    }

    #[test]
    fn test_checked_detects_blow_up() {
        // dt = 0.01 is too coarse for this start: the run overflows near step 30
        let model = LeafModel::standard(BodyParameters::leaf());
        let start = State::new(0.0, 0.0, std::f64::consts::PI / 6.0, 1.0, -1.0, 0.1);
        match generate_trajectory_checked(&model, start, 0.01, 1000) {
            Err(CalcError::NonFinite { step }) => assert!(step > 0 && step < 100),
            other => panic!("expected NonFinite, got {other:?}"),
        }
    }

    #[test]
    fn test_checked_passes_finite_run() {
        let model = LeafModel::standard(BodyParameters::leaf());
        let t = generate_trajectory_checked(&model, leaf_start(), 0.01, 200).unwrap();
        assert_eq!(t.len(), 200);
    }

    #[test]
    fn test_integrator_validation() {
        assert!(Integrator::new(0.01, 10).is_ok());
        assert!(Integrator::new(0.01, 0).is_ok());
        assert!(matches!(
            Integrator::new(0.0, 10),
            Err(CalcError::InvalidTimeStep(_))
        ));
        assert!(Integrator::new(-0.01, 10).is_err());
        assert!(Integrator::new(f64::NAN, 10).is_err());
        assert_relative_eq!(Integrator::new(0.01, 1000).unwrap().duration(), 10.0);
    }

    #[test]
    fn test_simulation_rejects_bad_params() {
        let bad = BodyParameters {
            mass: -1.0,
            ..BodyParameters::leaf()
        };
        let result = Simulation::new(bad, PhysicalConstants::STANDARD, Integrator::default());
        assert!(matches!(
            result,
            Err(CalcError::InvalidParameter { name: "mass", .. })
        ));
    }

    #[test]
    fn test_batch_preserves_order() {
        let sim = Simulation::new(
            BodyParameters::leaf(),
            PhysicalConstants::STANDARD,
            Integrator::new(0.01, 20).unwrap(),
        )
        .unwrap();
        let starts = [
            leaf_start(),
            State::new(1.0, 0.0, 0.0, 0.5, -1.0, 0.0),
            State::new(2.0, 0.0, 0.1, 0.0, -0.5, 0.0),
        ];
        let batch = sim.run_batch(&starts);
        assert_eq!(batch.len(), 3);
        for (trajectory, start) in batch.iter().zip(starts.iter()) {
            assert_eq!(trajectory.len(), 20);
            assert_eq!(trajectory[0], *start);
            assert_eq!(*trajectory, sim.run(*start));
        }
    }
}
