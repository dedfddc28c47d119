use serde::{Deserialize, Serialize};

use super::error::SphError;
use crate::units::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    // Weakly compressible SPH, pressure directly from the Tait equation of state.
    EquationOfState,
    // Predictive-corrective incompressible SPH (Solenthaler & Pajarola 2009)
    Pcisph,
}

/// Ambient flow the drag force is computed against.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WindField {
    Constant { velocity: [Real; 3] },
    // (sin(x)·sin(angles.z), sin(z)·sin(angles.y), sin(y)·sin(angles.x)), angles in radians.
    Sinusoidal { angles: [Real; 3] },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // Initial block of particles.
    pub particle_count: usize,
    pub simulation_bounds: [Real; 3],

    pub target_density: Real, // ρ0, kg/m³ of the resting fluid
    pub target_spacing: Real, // rest distance between particles in m
    pub kernel_radius_over_target_spacing: Real,
    pub particle_radius: Real, // used for collision handling only
    // Derived from target density and spacing if not given.
    pub particle_mass: Option<Real>,

    pub solver: SolverKind,

    pub viscous: bool,
    pub viscosity_coefficient: Real,
    // Velocity smoothing at the end of each step. 0 disables it.
    pub pseudo_viscosity_coefficient: Real,
    pub drag_coefficient: Real,
    pub restitution_coefficient: Real,

    // Tait equation of state. Only the equation of state solver uses exponent and speed of sound.
    pub eos_exponent: Real,
    pub speed_of_sound: Real,
    // 0 ignores negative pressure (particle deficiency at free surfaces), 1 keeps it as is.
    pub negative_pressure_scale: Real,
    // Multiplier on every computed pressure. Tuning knob for scenes with unphysical densities.
    pub pressure_scale: Real,

    pub gravity: [Real; 3],
    pub wind: WindField,

    pub pcisph_max_iterations: usize,
    pub pcisph_max_density_error_ratio: Real,

    pub hash_grid_resolution: [usize; 3],
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            particle_count: 5000,
            simulation_bounds: [60.0, 10.0, 30.0],

            target_density: 1.0,
            target_spacing: 1.0,
            kernel_radius_over_target_spacing: 1.8,
            particle_radius: 0.5,
            particle_mass: None,

            solver: SolverKind::Pcisph,

            viscous: true,
            viscosity_coefficient: 0.01,
            pseudo_viscosity_coefficient: 0.0,
            drag_coefficient: 1e-4,
            restitution_coefficient: 0.0,

            eos_exponent: 7.0,
            speed_of_sound: 100.0,
            negative_pressure_scale: 0.0,
            pressure_scale: 1.0,

            gravity: [0.0, 0.0, -9.8],
            wind: WindField::Sinusoidal { angles: [0.0, -2.0, 0.0] },

            pcisph_max_iterations: 5,
            pcisph_max_density_error_ratio: 0.01,

            hash_grid_resolution: [64, 64, 64],
        }
    }
}

impl SimulationConfig {
    /// Parses a config from toml. Missing keys fall back to their defaults.
    pub fn from_toml_str(text: &str) -> Result<SimulationConfig, SphError> {
        let config: SimulationConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<SimulationConfig, SphError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn kernel_radius(&self) -> Real {
        self.target_spacing * self.kernel_radius_over_target_spacing
    }

    pub fn gravity_vector(&self) -> Vector {
        self.gravity.into()
    }

    pub fn validate(&self) -> Result<(), SphError> {
        fn positive(name: &str, value: Real) -> Result<(), SphError> {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(SphError::invalid_config(format!("{} must be positive and finite, got {}", name, value)))
            }
        }
        fn non_negative(name: &str, value: Real) -> Result<(), SphError> {
            if value >= 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(SphError::invalid_config(format!("{} must be non-negative and finite, got {}", name, value)))
            }
        }

        positive("target_density", self.target_density)?;
        positive("target_spacing", self.target_spacing)?;
        positive("kernel_radius_over_target_spacing", self.kernel_radius_over_target_spacing)?;
        positive("particle_radius", self.particle_radius)?;
        if let Some(mass) = self.particle_mass {
            positive("particle_mass", mass)?;
        }
        positive("eos_exponent", self.eos_exponent)?;
        positive("speed_of_sound", self.speed_of_sound)?;
        positive("pressure_scale", self.pressure_scale)?;
        positive("pcisph_max_density_error_ratio", self.pcisph_max_density_error_ratio)?;
        non_negative("viscosity_coefficient", self.viscosity_coefficient)?;
        non_negative("pseudo_viscosity_coefficient", self.pseudo_viscosity_coefficient)?;
        non_negative("drag_coefficient", self.drag_coefficient)?;
        non_negative("restitution_coefficient", self.restitution_coefficient)?;
        non_negative("negative_pressure_scale", self.negative_pressure_scale)?;
        for (axis, bound) in ["x", "y", "z"].iter().zip(self.simulation_bounds.iter()) {
            non_negative(&format!("simulation_bounds.{}", axis), *bound)?;
        }

        if self.pcisph_max_iterations == 0 {
            return Err(SphError::invalid_config("pcisph_max_iterations must be at least 1"));
        }
        if self.hash_grid_resolution.iter().any(|&r| r == 0) {
            return Err(SphError::invalid_config(format!(
                "hash_grid_resolution must be at least 1 per axis, got {:?}",
                self.hash_grid_resolution
            )));
        }
        if self.gravity.iter().any(|g| !g.is_finite()) {
            return Err(SphError::invalid_config("gravity must be finite"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn kernel_radius_follows_spacing() {
        let config = SimulationConfig {
            target_spacing: 0.5,
            kernel_radius_over_target_spacing: 2.0,
            ..Default::default()
        };
        assert_eq!(config.kernel_radius(), 1.0);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = SimulationConfig::from_toml_str(
            r#"
            particle_count = 128
            solver = "equation_of_state"
            viscous = false
            gravity = [0.0, -9.81, 0.0]

            [wind]
            kind = "constant"
            velocity = [1.0, 0.0, 0.0]
            "#,
        )
        .unwrap();

        assert_eq!(config.particle_count, 128);
        assert_eq!(config.solver, SolverKind::EquationOfState);
        assert!(!config.viscous);
        assert_eq!(config.gravity, [0.0, -9.81, 0.0]);
        assert_eq!(config.wind, WindField::Constant { velocity: [1.0, 0.0, 0.0] });
        assert_eq!(config.target_spacing, SimulationConfig::default().target_spacing);
        assert_eq!(config.particle_mass, None);
    }

    #[test]
    fn rejects_invalid_values() {
        let err = SimulationConfig::from_toml_str("target_spacing = -1.0").unwrap_err();
        assert!(matches!(err, SphError::InvalidConfig { .. }));

        let config = SimulationConfig {
            hash_grid_resolution: [64, 0, 64],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SimulationConfig {
            pcisph_max_iterations: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn reports_parse_errors() {
        let err = SimulationConfig::from_toml_str("particle_count = \"many\"").unwrap_err();
        assert!(matches!(err, SphError::ConfigParse(_)));
    }
}
