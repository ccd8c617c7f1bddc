//! Physical constants and body parameters for the falling-body model.
//!
//! The constants are fixed for a run but are carried as an explicit value so
//! that tests can perturb them (most notably the speed regularization bias).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Process-wide physical constants of the fluid and gravity field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalConstants {
    /// Gravitational acceleration (m/s²)
    pub g: f64,

    /// Fluid density (kg/m³)
    /// Standard value: 1.225 kg/m³, air at sea level
    pub rho_f: f64,

    /// Bias added to the speed magnitude so the aerodynamic terms stay
    /// well defined when the body is momentarily at rest.
    #[serde(default = "default_speed_epsilon")]
    pub speed_epsilon: f64,
}

fn default_speed_epsilon() -> f64 {
    PhysicalConstants::SPEED_EPSILON
}

impl PhysicalConstants {
    /// Default speed regularization bias.
    pub const SPEED_EPSILON: f64 = 1e-6;

    /// Air at sea level under standard gravity.
    pub const STANDARD: Self = Self::new();

    /// Create a new instance with the standard values.
    pub const fn new() -> Self {
        Self {
            g: 9.81,
            rho_f: 1.225,
            speed_epsilon: Self::SPEED_EPSILON,
        }
    }

    /// Same constants with a different speed bias (sensitivity studies).
    pub const fn with_speed_epsilon(self, speed_epsilon: f64) -> Self {
        Self {
            speed_epsilon,
            ..self
        }
    }

    /// Printable label -> value summary, ordered by label.
    pub fn summary(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("g (m/s²)".to_string(), format!("{:.4}", self.g));
        map.insert("ρ_f (kg/m³)".to_string(), format!("{:.4}", self.rho_f));
        map.insert("ε_speed (m/s)".to_string(), format!("{:.1e}", self.speed_epsilon));
        map
    }
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self::new()
    }
}

/// Parameters describing the simulated object.
pub mod model_params {
    use serde::{Deserialize, Serialize};

    use crate::error::{CalcError, Result};

    /// Fixed physical description of the falling body.
    ///
    /// This is a plain value record: it is created once per run and copied
    /// into every derivative evaluation, never mutated.
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct BodyParameters {
        pub mass: f64,            // Mass (kg)
        pub width: f64,           // Width, drives lift (m)
        pub height: f64,          // Height, drives drag (m)
        pub drag_coeff_perp: f64, // Linear drag rate across the body (1/s)
        pub drag_coeff_para: f64, // Linear drag rate along the body (1/s)
    }

    impl Default for BodyParameters {
        fn default() -> Self {
            Self::leaf()
        }
    }

    impl BodyParameters {
        /// Number of scalar parameters.
        pub const LEN: usize = 5;

        /// Create and validate a parameter set.
        pub fn new(
            mass: f64,
            width: f64,
            height: f64,
            drag_coeff_perp: f64,
            drag_coeff_para: f64,
        ) -> Result<Self> {
            let params = Self {
                mass,
                width,
                height,
                drag_coeff_perp,
                drag_coeff_para,
            };
            params.validate()?;
            Ok(params)
        }

        /// Reference leaf: 10 g, 10 cm square, strongly anisotropic drag.
        pub const fn leaf() -> Self {
            Self {
                mass: 0.01,
                width: 0.1,
                height: 0.1,
                drag_coeff_perp: 4.1,
                drag_coeff_para: 0.9,
            }
        }

        /// Check the invariants required before integration starts.
        pub fn validate(&self) -> Result<()> {
            positive("mass", self.mass)?;
            positive("width", self.width)?;
            positive("height", self.height)?;
            non_negative("drag_coeff_perp", self.drag_coeff_perp)?;
            non_negative("drag_coeff_para", self.drag_coeff_para)?;
            Ok(())
        }

        /// Convert to a flat array `[mass, width, height, perp, para]`.
        pub fn to_slice(&self) -> [f64; Self::LEN] {
            [
                self.mass,
                self.width,
                self.height,
                self.drag_coeff_perp,
                self.drag_coeff_para,
            ]
        }

        /// Create from a slice in `to_slice` order. The values are validated.
        pub fn from_slice(slice: &[f64]) -> Result<Self> {
            match *slice {
                [mass, width, height, perp, para] => Self::new(mass, width, height, perp, para),
                _ => Err(CalcError::Format(format!(
                    "expected {} body parameters, got {}",
                    Self::LEN,
                    slice.len()
                ))),
            }
        }
    }

    fn positive(name: &'static str, value: f64) -> Result<()> {
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(CalcError::invalid_parameter(name, value, "must be finite and > 0"))
        }
    }

    fn non_negative(name: &'static str, value: f64) -> Result<()> {
        if value.is_finite() && value >= 0.0 {
            Ok(())
        } else {
            Err(CalcError::invalid_parameter(name, value, "must be finite and >= 0"))
        }
    }
}
