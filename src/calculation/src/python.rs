//! Python bindings for the leaf calculation library.
//!
//! NOTE: This module requires the `python-bindings` feature to be enabled.
//! Build the extension with maturin: `maturin develop --features python-bindings`
//!
//! Usage in Python:
//! ```python
//! import leaf_calc as lc
//! params = lc.BodyParameters.leaf()
//! traj = lc.generate_trajectory(params, [0.0, 0.0, 0.0, 1.0, -1.0, 0.0], 0.01, 1000)
//! ```

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::aerodynamics::{LeafModel, derivative_with};
use crate::constants::PhysicalConstants;
use crate::constants::model_params::BodyParameters;
use crate::error::CalcError;
use crate::metrics::TrajectoryMetrics;
use crate::ode::{Integrator, Simulation, generate_trajectory_system};
use crate::persistence;
use crate::state::State;
use crate::trajectory::{Trajectory, TrajectoryDatabase};

impl From<CalcError> for PyErr {
    fn from(err: CalcError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

type PyState = [f64; 6];

// ============================================================================
// Python Type Wrappers
// ============================================================================

/// Physical constants of gravity and the surrounding fluid.
#[pyclass(name = "PhysicalConstants")]
#[derive(Debug, Clone)]
pub struct PyPhysicalConstants {
    constants: PhysicalConstants,
}

#[pymethods]
impl PyPhysicalConstants {
    #[new]
    #[pyo3(signature = (g = 9.81, rho_f = 1.225, speed_epsilon = PhysicalConstants::SPEED_EPSILON))]
    pub fn new(g: f64, rho_f: f64, speed_epsilon: f64) -> Self {
        Self {
            constants: PhysicalConstants {
                g,
                rho_f,
                speed_epsilon,
            },
        }
    }

    #[staticmethod]
    pub fn standard() -> Self {
        Self {
            constants: PhysicalConstants::STANDARD,
        }
    }

    #[getter]
    pub fn g(&self) -> f64 { self.constants.g }

    #[getter]
    pub fn rho_f(&self) -> f64 { self.constants.rho_f }

    #[getter]
    pub fn speed_epsilon(&self) -> f64 { self.constants.speed_epsilon }

    pub fn summary(&self) -> PyResult<PyObject> {
        Python::with_gil(|py| {
            let dict = PyDict::new(py);
            for (key, value) in self.constants.summary().iter() {
                dict.set_item(key, value)?;
            }
            Ok(dict.into())
        })
    }

    pub fn __repr__(&self) -> String {
        format!(
            "PhysicalConstants(g={:.3}, ρ_f={:.4}, ε={:.1e})",
            self.constants.g, self.constants.rho_f, self.constants.speed_epsilon
        )
    }
}

/// Mass, plate dimensions and linear drag coefficients of the body.
#[pyclass(name = "BodyParameters")]
#[derive(Debug, Clone)]
pub struct PyBodyParameters {
    params: BodyParameters,
}

#[pymethods]
impl PyBodyParameters {
    #[new]
    pub fn new(
        mass: f64,
        width: f64,
        height: f64,
        drag_coeff_perp: f64,
        drag_coeff_para: f64,
    ) -> PyResult<Self> {
        let params = BodyParameters::new(mass, width, height, drag_coeff_perp, drag_coeff_para)?;
        Ok(Self { params })
    }

    /// The reference leaf: 10 g, 10 cm square.
    #[staticmethod]
    pub fn leaf() -> Self {
        Self {
            params: BodyParameters::leaf(),
        }
    }

    #[getter]
    pub fn mass(&self) -> f64 { self.params.mass }

    #[getter]
    pub fn width(&self) -> f64 { self.params.width }

    #[getter]
    pub fn height(&self) -> f64 { self.params.height }

    #[getter]
    pub fn drag_coeff_perp(&self) -> f64 { self.params.drag_coeff_perp }

    #[getter]
    pub fn drag_coeff_para(&self) -> f64 { self.params.drag_coeff_para }

    pub fn to_list(&self) -> [f64; BodyParameters::LEN] {
        self.params.to_slice()
    }

    pub fn __repr__(&self) -> String {
        let p = &self.params;
        format!(
            "BodyParameters(mass={}, width={}, height={}, C_perp={}, C_para={})",
            p.mass, p.width, p.height, p.drag_coeff_perp, p.drag_coeff_para
        )
    }
}

// ============================================================================
// Module Functions
// ============================================================================

/// Time derivative `[dx, dy, dtheta, dvx, dvy, domega]` of a state.
#[pyfunction]
#[pyo3(signature = (state, params, constants = None))]
fn derivative(
    state: PyState,
    params: &PyBodyParameters,
    constants: Option<&PyPhysicalConstants>,
) -> PyState {
    let constants = constants.map_or(PhysicalConstants::STANDARD, |c| c.constants);
    derivative_with(&State::from(state), &params.params, &constants).to_array()
}

/// Fixed-step RK4 trajectory as a list of `steps` states.
#[pyfunction]
#[pyo3(signature = (params, initial_state, dt, steps, constants = None))]
fn generate_trajectory(
    params: &PyBodyParameters,
    initial_state: PyState,
    dt: f64,
    steps: usize,
    constants: Option<&PyPhysicalConstants>,
) -> PyResult<Vec<PyState>> {
    Integrator::new(dt, steps)?;
    let constants = constants.map_or(PhysicalConstants::STANDARD, |c| c.constants);
    let model = LeafModel::new(params.params, constants);
    let trajectory = generate_trajectory_system(&model, State::from(initial_state), dt, steps);
    Ok(trajectory.iter().map(State::to_array).collect())
}

/// Run several labeled initial states and return `{label: trajectory}`.
#[pyfunction]
fn batch_simulate(
    py: Python<'_>,
    params: &PyBodyParameters,
    runs: Vec<(String, PyState)>,
    dt: f64,
    steps: usize,
) -> PyResult<PyObject> {
    let simulation = Simulation::new(
        params.params,
        PhysicalConstants::STANDARD,
        Integrator::new(dt, steps)?,
    )?;
    let initial: Vec<State> = runs.iter().map(|(_, s)| State::from(*s)).collect();
    let trajectories = py.allow_threads(|| simulation.run_batch(&initial));

    let dict = PyDict::new(py);
    for ((label, _), trajectory) in runs.iter().zip(trajectories) {
        let states: Vec<PyState> = trajectory.iter().map(State::to_array).collect();
        dict.set_item(label, states)?;
    }
    Ok(dict.into())
}

/// Summary metrics of a trajectory.
#[pyfunction]
fn trajectory_summary(
    params: &PyBodyParameters,
    states: Vec<PyState>,
    dt: f64,
) -> PyResult<PyObject> {
    let trajectory: Trajectory = states.into_iter().map(State::from).collect();
    let metrics = TrajectoryMetrics::from_trajectory(
        &trajectory,
        dt,
        &params.params,
        &PhysicalConstants::STANDARD,
    )?;
    Python::with_gil(|py| {
        let dict = PyDict::new(py);
        for (key, value) in metrics.get_summary() {
            dict.set_item(key, value)?;
        }
        Ok(dict.into())
    })
}

/// Save `{label: [[x, y, theta, vx, vy, omega], ...]}` as a JSON database.
#[pyfunction]
fn save_database(runs: Vec<(String, Vec<PyState>)>, path: &str) -> PyResult<()> {
    let db: TrajectoryDatabase = runs
        .into_iter()
        .map(|(label, states)| (label, states.into_iter().map(State::from).collect::<Trajectory>()))
        .collect();
    persistence::save_json(&db, path)?;
    Ok(())
}

/// Load a JSON database as a list of `(label, states)` pairs in file order.
#[pyfunction]
fn load_database(path: &str) -> PyResult<Vec<(String, Vec<PyState>)>> {
    let db = persistence::load_json(path)?;
    Ok(db
        .iter()
        .map(|(label, t)| (label.to_string(), t.iter().map(State::to_array).collect()))
        .collect())
}

// ============================================================================
// Module Definition
// ============================================================================

#[pymodule]
fn leaf_calc(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
    m.add_class::<PyPhysicalConstants>()?;
    m.add_class::<PyBodyParameters>()?;

    m.add_function(wrap_pyfunction!(derivative, m)?)?;
    m.add_function(wrap_pyfunction!(generate_trajectory, m)?)?;
    m.add_function(wrap_pyfunction!(batch_simulate, m)?)?;
    m.add_function(wrap_pyfunction!(trajectory_summary, m)?)?;
    m.add_function(wrap_pyfunction!(save_database, m)?)?;
    m.add_function(wrap_pyfunction!(load_database, m)?)?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add("__doc__", "Falling-leaf dynamics model and RK4 trajectory integrator")?;

    Ok(())
}
