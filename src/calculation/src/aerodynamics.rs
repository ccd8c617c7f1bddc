//! Dynamics model of a plate-like body falling through a fluid.
//!
//! Forces acting on the body:
//!
//! - **Gravity** along `-y`.
//! - **Anisotropic linear drag**: a drag-rate tensor with `drag_coeff_perp`
//!   across the body and `drag_coeff_para` along it, rotated by `theta`.
//! - **Aerodynamic drag and lift** scaling with `V²` and the angle of attack
//!   `beta`, whose direction flips as the relative wind crosses the body's
//!   reference plane. The same coupling produces the restoring torque that
//!   gives falling-card / autorotation behaviour.
//!
//! All functions here are pure and allocation free; the integrator calls them
//! four times per step.

use std::f64::consts::PI;

use crate::constants::PhysicalConstants;
use crate::constants::model_params::BodyParameters;
use crate::ode::OdeSystem;
use crate::state::State;

/// Intermediate aerodynamic quantities for one state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AeroForces {
    /// Regularized speed `|v| + ε` (m/s)
    pub speed: f64,
    /// Velocity direction measured against the vertical axis (rad)
    pub alpha: f64,
    /// Angle of attack `alpha + theta` (rad)
    pub beta: f64,
    /// Direction selector `k`, either `+1.0` or `-1.0`
    pub direction: f64,
    /// Drag force (N)
    pub drag: f64,
    /// Lift force (N)
    pub lift: f64,
}

/// Sign with `sign(0) == 0`, unlike `f64::signum`.
#[inline(always)]
fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else if v == 0.0 {
        0.0
    } else {
        f64::NAN
    }
}

/// Compute the orientation-coupled drag and lift for `state`.
#[inline(always)]
pub fn aero_forces(
    state: &State,
    params: &BodyParameters,
    constants: &PhysicalConstants,
) -> AeroForces {
    let State { theta, vx, vy, .. } = *state;

    let speed = (vx * vx + vy * vy).sqrt() + constants.speed_epsilon;
    let alpha = vx.atan2(vy);
    let beta = alpha + theta;

    // Discontinuous; ties resolve to +1
    let direction = if sign(vy) * beta.sin() >= 0.0 { 1.0 } else { -1.0 };

    let q = direction * PI * constants.rho_f * speed * speed * beta.cos();
    let drag = q * params.height * alpha.cos();
    let lift = q * params.width * alpha.sin();

    AeroForces {
        speed,
        alpha,
        beta,
        direction,
        drag,
        lift,
    }
}

/// Time derivative of `state` with explicit physical constants.
#[inline(always)]
pub fn derivative_with(
    state: &State,
    params: &BodyParameters,
    constants: &PhysicalConstants,
) -> State {
    let State {
        theta,
        vx,
        vy,
        omega,
        ..
    } = *state;
    let BodyParameters {
        mass,
        drag_coeff_perp: c_perp,
        drag_coeff_para: c_para,
        ..
    } = *params;

    let forces = aero_forces(state, params, constants);

    // --- Anisotropic linear drag (rotated tensor) ---
    let (sin_t, cos_t) = theta.sin_cos();
    let sin2 = sin_t * sin_t;
    let cos2 = cos_t * cos_t;
    let cross = (c_perp - c_para) * sin_t * cos_t;

    let dvx = -(c_perp * sin2 + c_para * cos2) * vx + cross * vy - forces.drag / mass;
    let dvy = -constants.g - (c_perp * cos2 + c_para * sin2) * vy + cross * vx + forces.lift / mass;

    // --- Rotational damping and aerodynamic torque ---
    let v_sq = forces.speed * forces.speed;
    let domega =
        -c_perp * omega - 3.0 * PI * constants.rho_f * v_sq * forces.beta.cos() * forces.beta.sin();

    State {
        x: vx,
        y: vy,
        theta: omega,
        vx: dvx,
        vy: dvy,
        omega: domega,
    }
}

/// Time derivative of `state` under standard gravity and sea-level air.
#[inline(always)]
pub fn derivative(state: &State, params: &BodyParameters) -> State {
    derivative_with(state, params, &PhysicalConstants::STANDARD)
}

/// The falling-body ODE system: body parameters bound to physical constants.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LeafModel {
    pub params: BodyParameters,
    pub constants: PhysicalConstants,
}

impl LeafModel {
    /// Creates a model.
    pub const fn new(params: BodyParameters, constants: PhysicalConstants) -> Self {
        Self { params, constants }
    }

    /// Model with standard physical constants.
    pub const fn standard(params: BodyParameters) -> Self {
        Self::new(params, PhysicalConstants::STANDARD)
    }
}

impl OdeSystem for LeafModel {
    #[inline(always)]
    fn rhs(&self, state: &State) -> State {
        derivative_with(state, &self.params, &self.constants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_4;

    fn sample_states() -> Vec<State> {
        vec![
            State::new(0.0, 0.0, 0.0, 1.0, -1.0, 0.0),
            State::new(0.3, -2.0, 0.7, -0.4, 2.5, 1.2),
            State::new(-1.0, 5.0, -2.1, 0.0, 0.0, -3.0),
            State::new(0.0, 0.0, PI / 3.0, 1.5, -2.0, 0.0),
        ]
    }

    #[test]
    fn test_reference_derivative() {
        let d = derivative(&State::new(0.0, 0.0, 0.0, 1.0, -1.0, 0.0), &BodyParameters::leaf());
        assert_eq!(d.x, 1.0);
        assert_eq!(d.y, -1.0);
        assert_eq!(d.theta, 0.0);
        assert_relative_eq!(d.vx, 37.58456443181019, max_relative = 1e-12);
        assert_relative_eq!(d.vy, 32.7745644318102, max_relative = 1e-12);
        assert_relative_eq!(d.omega, 11.54536932954306, max_relative = 1e-12);
    }

    #[test]
    fn test_kinematic_identity() {
        let params = BodyParameters::leaf();
        for s in sample_states() {
            let d = derivative(&s, &params);
            assert_eq!(d.x, s.vx);
            assert_eq!(d.y, s.vy);
            assert_eq!(d.theta, s.omega);
        }
    }

    #[test]
    fn test_derivative_is_deterministic() {
        let params = BodyParameters::leaf();
        for s in sample_states() {
            let a = derivative(&s, &params).to_array();
            let b = derivative(&s, &params).to_array();
            for (x, y) in a.iter().zip(b.iter()) {
                assert_eq!(x.to_bits(), y.to_bits());
            }
        }
    }

    #[test]
    fn test_at_rest_is_finite() {
        let d = derivative(&State::zero(), &BodyParameters::leaf());
        assert!(d.is_finite());
        // Only gravity survives at rest
        assert_relative_eq!(d.vy, -9.81, epsilon = 1e-9);
    }

    #[test]
    fn test_direction_flips_across_boundary() {
        // alpha = 3π/4 for (vx, vy) = (1, -1); sin(beta) changes sign at theta = π/4
        let params = BodyParameters::leaf();
        let constants = PhysicalConstants::STANDARD;
        let delta = 1e-9;
        let before = State::new(0.0, 0.0, FRAC_PI_4 - delta, 1.0, -1.0, 0.0);
        let after = State::new(0.0, 0.0, FRAC_PI_4 + delta, 1.0, -1.0, 0.0);

        let fb = aero_forces(&before, &params, &constants);
        let fa = aero_forces(&after, &params, &constants);

        assert_eq!(fb.direction, -1.0);
        assert_eq!(fa.direction, 1.0);
        assert!(fb.drag.signum() != fa.drag.signum());
        assert!(fb.lift.signum() != fa.lift.signum());
        assert_relative_eq!(fb.drag, -fa.drag, max_relative = 1e-6);
        assert_relative_eq!(fb.lift, -fa.lift, max_relative = 1e-6);
    }

    #[test]
    fn test_zero_vertical_velocity_selects_positive_direction() {
        // vy == 0 makes the selector product exactly zero even though sin(beta) < 0
        let state = State::new(0.0, 0.0, PI, 1.0, 0.0, 0.0);
        let forces = aero_forces(&state, &BodyParameters::leaf(), &PhysicalConstants::STANDARD);
        assert!(forces.beta.sin() < 0.0);
        assert_eq!(forces.direction, 1.0);
    }

    #[test]
    fn test_magnitudes_match_closed_form() {
        let params = BodyParameters::leaf();
        let constants = PhysicalConstants::STANDARD;
        let state = State::new(0.0, 0.0, 0.2, 0.8, -1.3, 0.0);
        let f = aero_forces(&state, &params, &constants);
        let v = f.speed;
        let expected_drag = PI * constants.rho_f * params.height * v * v * f.beta.cos() * f.alpha.cos();
        let expected_lift = PI * constants.rho_f * params.width * v * v * f.beta.cos() * f.alpha.sin();
        assert_relative_eq!(f.drag.abs(), expected_drag.abs(), max_relative = 1e-12);
        assert_relative_eq!(f.lift.abs(), expected_lift.abs(), max_relative = 1e-12);
    }

    #[test]
    fn test_speed_epsilon_is_tunable() {
        let params = BodyParameters::leaf();
        let constants = PhysicalConstants::STANDARD.with_speed_epsilon(0.0);
        let f = aero_forces(&State::zero(), &params, &constants);
        assert_eq!(f.speed, 0.0);
        assert_eq!(f.drag, 0.0);

        let f = aero_forces(&State::zero(), &params, &PhysicalConstants::STANDARD);
        assert_eq!(f.speed, 1e-6);
    }

    #[test]
    fn test_no_aero_without_area() {
        let params = BodyParameters {
            mass: 0.01,
            width: 0.0,
            height: 0.0,
            drag_coeff_perp: 0.0,
            drag_coeff_para: 0.0,
        };
        let d = derivative(&State::new(0.0, 0.0, 0.4, 2.0, -3.0, 0.0), &params);
        assert_eq!(d.vx, 0.0);
        assert_relative_eq!(d.vy, -9.81);
    }

    #[test]
    fn test_model_matches_free_function() {
        let model = LeafModel::standard(BodyParameters::leaf());
        for s in sample_states() {
            assert_eq!(model.rhs(&s), derivative(&s, &model.params));
        }
    }
}
