//! Trajectory calculation library for small plate-like bodies falling
//! through air (leaves, cards, paper plates).
//!
//! This library provides:
//! - A planar dynamics model with anisotropic linear drag and
//!   orientation-coupled aerodynamic drag and lift
//! - A fixed-step RK4 integrator and trajectory generator
//! - Trajectory containers, summary metrics and persistence (JSON, CSV, text)
//!
//! # Example
//!
//! ```
//! use leaf_calc::{generate_trajectory, BodyParameters, State};
//!
//! let params = BodyParameters::leaf();
//! let trajectory = generate_trajectory(&params, State::new(0.0, 0.0, 0.0, 1.0, -1.0, 0.0), 0.01, 100);
//! assert_eq!(trajectory.len(), 100);
//! ```
//!
//! # Features
//!
//! - **python-bindings**: optional PyO3 module exposing the core to Python

pub mod aerodynamics;
pub mod constants;
pub mod error;
pub mod metrics;
pub mod ode;
pub mod persistence;
pub mod state;
pub mod trajectory;

// Optional Python bindings
#[cfg(feature = "python-bindings")]
pub mod python;

// Re-export key types and functions for easy use
pub use aerodynamics::{AeroForces, LeafModel, aero_forces, derivative, derivative_with};
pub use constants::PhysicalConstants;
pub use constants::model_params::BodyParameters;
pub use error::{CalcError, Result};
pub use metrics::{TrajectoryMetrics, trajectory_rmse};
pub use ode::{
    Integrator, OdeSystem, Simulation, generate_trajectory, generate_trajectory_checked,
    generate_trajectory_with, rk4_step,
};
pub use state::State;
pub use trajectory::{Trajectory, TrajectoryDatabase};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
