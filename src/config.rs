//! Scenario configuration loaded from YAML.
//!
//! A scenario names one body, the physical constants, the integrator settings
//! and a list of labeled initial conditions. Every section is optional; a
//! missing section falls back to the reference leaf scenario.
//!
//! ```yaml
//! body:
//!   mass: 0.01
//!   width: 0.1
//!   height: 0.1
//!   drag_coeff_perp: 4.1
//!   drag_coeff_para: 0.9
//!
//! constants:
//!   g: 9.81
//!   rho_f: 1.225
//!
//! integrator:
//!   dt: 0.01
//!   steps: 1000
//!
//! runs:
//!   - label: "Trajectory 1"
//!     initial: [0.0, 0.0, 0.0, 1.0, -1.0, 0.0]   # x, y, theta, vx, vy, omega
//! ```

use std::collections::HashSet;
use std::f64::consts::PI;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use leaf_calc::{BodyParameters, Integrator, PhysicalConstants, Simulation, State};

/// Fixed-step settings as written in the scenario file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegratorConfig {
    pub dt: f64,      // Time step (s)
    pub steps: usize, // Recorded steps per run
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        let Integrator { dt, steps } = Integrator::default();
        Self { dt, steps }
    }
}

/// One labeled initial condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub label: String,
    pub initial: [f64; 6], // [x, y, theta, vx, vy, omega]
}

impl RunConfig {
    fn new(label: &str, initial: [f64; 6]) -> Self {
        Self {
            label: label.to_string(),
            initial,
        }
    }

    pub fn initial_state(&self) -> State {
        State::from(self.initial)
    }
}

/// Top-level scenario configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub body: BodyParameters,
    #[serde(default)]
    pub constants: PhysicalConstants,
    #[serde(default)]
    pub integrator: IntegratorConfig,
    #[serde(default = "default_runs")]
    pub runs: Vec<RunConfig>,
}

// 默认四组初始条件
fn default_runs() -> Vec<RunConfig> {
    vec![
        RunConfig::new("Trajectory 1", [0.0, 0.0, 0.0, 1.0, -1.0, 0.0]),
        RunConfig::new("Trajectory 2", [0.0, 0.0, PI / 6.0, 1.0, -1.0, 0.1]),
        RunConfig::new("Trajectory 3", [0.0, 0.0, PI / 4.0, 0.5, -1.0, -0.1]),
        RunConfig::new("Trajectory 4", [0.0, 0.0, PI / 3.0, 1.5, -2.0, 0.0]),
    ]
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            body: BodyParameters::leaf(),
            constants: PhysicalConstants::STANDARD,
            integrator: IntegratorConfig::default(),
            runs: default_runs(),
        }
    }
}

impl ScenarioConfig {
    /// Read a scenario from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario file {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("invalid scenario file {}", path.display()))
    }

    /// Parse a scenario from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text).context("failed to parse scenario YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// Check everything the simulation core assumes.
    pub fn validate(&self) -> Result<()> {
        self.body.validate().context("invalid body parameters")?;
        Integrator::new(self.integrator.dt, self.integrator.steps)
            .context("invalid integrator settings")?;

        let c = &self.constants;
        if !(c.g.is_finite() && c.rho_f.is_finite() && c.rho_f >= 0.0) {
            bail!("invalid physical constants: g = {}, rho_f = {}", c.g, c.rho_f);
        }
        if !(c.speed_epsilon.is_finite() && c.speed_epsilon > 0.0) {
            bail!("speed_epsilon must be finite and > 0, got {}", c.speed_epsilon);
        }

        if self.runs.is_empty() {
            bail!("scenario has no runs");
        }
        let mut seen = HashSet::new();
        for run in &self.runs {
            if !seen.insert(run.label.as_str()) {
                bail!("duplicate run label {:?}", run.label);
            }
            if !run.initial_state().is_finite() {
                bail!("run {:?} has a non-finite initial state", run.label);
            }
        }
        Ok(())
    }

    /// Build the validated simulation for this scenario.
    pub fn simulation(&self) -> Result<Simulation> {
        let integrator = Integrator::new(self.integrator.dt, self.integrator.steps)?;
        Ok(Simulation::new(self.body, self.constants, integrator)?)
    }

    /// Labels in run order.
    pub fn labels(&self) -> Vec<&str> {
        self.runs.iter().map(|r| r.label.as_str()).collect()
    }

    /// Initial states in run order.
    pub fn initial_states(&self) -> Vec<State> {
        self.runs.iter().map(RunConfig::initial_state).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scenario() {
        let config = ScenarioConfig::default();
        config.validate().unwrap();
        assert_eq!(
            config.labels(),
            vec!["Trajectory 1", "Trajectory 2", "Trajectory 3", "Trajectory 4"]
        );
        assert_eq!(config.integrator, IntegratorConfig { dt: 0.01, steps: 1000 });
        assert_eq!(config.body, BodyParameters::leaf());
        assert_eq!(config.initial_states()[2].theta, PI / 4.0);
    }

    #[test]
    fn test_default_angles_are_pi_fractions() {
        let thetas: Vec<f64> = ScenarioConfig::default()
            .initial_states()
            .iter()
            .map(|s| s.theta)
            .collect();
        assert_eq!(
            thetas,
            vec![0.0, 0.5235987755982988, 0.7853981633974483, 1.0471975511965976]
        );
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = ScenarioConfig::from_yaml("{}").unwrap();
        assert_eq!(config, ScenarioConfig::default());
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
integrator:
  steps: 50
runs:
  - label: "drop"
    initial: [0.0, 1.0, 0.2, 0.0, 0.0, 0.0]
"#;
        let config = ScenarioConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.integrator.dt, 0.01);
        assert_eq!(config.integrator.steps, 50);
        assert_eq!(config.labels(), vec!["drop"]);
        assert_eq!(config.constants, PhysicalConstants::STANDARD);

        let simulation = config.simulation().unwrap();
        let t = simulation.run(config.initial_states()[0]);
        assert_eq!(t.len(), 50);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let bad_body = "body: {mass: 0.0, width: 0.1, height: 0.1, drag_coeff_perp: 4.1, drag_coeff_para: 0.9}";
        assert!(ScenarioConfig::from_yaml(bad_body).is_err());

        assert!(ScenarioConfig::from_yaml("integrator: {dt: -0.01}").is_err());
        assert!(ScenarioConfig::from_yaml("runs: []").is_err());

        let duplicate = r#"
runs:
  - {label: a, initial: [0, 0, 0, 1, -1, 0]}
  - {label: a, initial: [0, 0, 0, 1, -1, 0]}
"#;
        assert!(ScenarioConfig::from_yaml(duplicate).is_err());
    }

    #[test]
    fn test_rejects_wrong_state_arity() {
        let yaml = "runs:\n  - {label: a, initial: [0.0, 0.0, 0.0]}\n";
        assert!(ScenarioConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_bundled_scenario_matches_default() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/scenarios/default.yaml");
        assert_eq!(ScenarioConfig::load(path).unwrap(), ScenarioConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.yaml");
        std::fs::write(&path, "integrator:\n  dt: 0.005\n  steps: 20\n").unwrap();
        let config = ScenarioConfig::load(&path).unwrap();
        assert_eq!(config.integrator.dt, 0.005);
        assert_eq!(config.runs.len(), 4);

        assert!(ScenarioConfig::load(dir.path().join("missing.yaml")).is_err());
    }
}
