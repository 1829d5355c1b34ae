// src/utils/constants_config.rs
use serde::{Deserialize, Serialize};
use crate::utils::{
    DEFAULT_SIMULATION_PARAMS,
    errors::GalaxyError
};

/// Immutable-during-a-run configuration bundle for a galaxy simulation.
///
/// Lengths are in kpc, masses in M☉ and velocities in units consistent with `g`
/// (the default `4.3e-6` gives km/s). Changing any field requires re-initializing
/// the body set.
///
/// Keys are deserialised in camelCase (`nBodies`, `galaxyRadius`, ...), with `G` for the
/// gravitational constant. Unknown keys are ignored and missing keys take the defaults of
/// [`DEFAULT_SIMULATION_PARAMS`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationParams {
    pub n_bodies: usize,
    pub galaxy_radius: f64,
    pub bulge_radius: f64,
    pub disk_height: f64,
    pub rotation_speed: f64,
    pub spiral_tightness: f64,
    pub n_spiral_arms: usize,
    #[serde(rename = "G")]
    pub g: f64,
    pub softening: f64,
    pub dt: f64,
    pub central_mass: f64,
    pub bulge_mass: f64,
    pub disk_mass: f64,
    pub gas_mass: f64,
    pub halo_mass: f64,
    /// Barnes-Hut opening angle.
    pub theta: f64,
    pub use_tree_algorithm: bool,
    pub max_tree_depth: usize,
    pub bulge_fraction: f64,
    pub disk_fraction: f64,
    pub halo_fraction: f64,
    pub gas_fraction: f64,
    /// Strength of the outward `Λ·m·r` expansion term. Zero keeps the system closed.
    pub dark_energy: f64,
    pub adaptive_timestep: bool,
    pub timestep_accuracy: f64,
    pub min_dt: f64,
    /// Above this body count the direct solver samples every `stride`-th partner.
    pub direct_sampling_threshold: usize,
    pub potential_sample_limit: usize,
    pub star_formation_density: f64,
    pub star_formation_temperature: f64,
    pub gas_cooling_time: f64,
    /// Maximum number of bodies in a snapshot; 0 keeps every body.
    pub max_snapshot_bodies: usize,
}

impl Default for SimulationParams {
    fn default() -> Self {
        DEFAULT_SIMULATION_PARAMS
    }
}

impl SimulationParams {
    /// Parses parameters from YAML (or JSON) text. Blank text yields the defaults.
    ///
    /// # Example
    /// ```
    /// use rs_galaxy::utils::SimulationParams;
    ///
    /// let params = SimulationParams::from_yaml_str("nBodies: 500\nG: 1.0\nunknownKey: 3").unwrap();
    /// assert_eq!(params.n_bodies, 500);
    /// assert_eq!(params.g, 1.0);
    /// assert_eq!(params.theta, SimulationParams::default().theta);
    /// ```
    pub fn from_yaml_str(text: &str) -> Result<Self, GalaxyError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let params: SimulationParams = serde_yaml::from_str(text)
            .map_err(|e| GalaxyError::InvalidConfig(format!("could not parse parameters: {}", e)))?;
        params.validate()?;
        Ok(params)
    }

    /// Checks every field against its valid domain.
    pub fn validate(&self) -> Result<(), GalaxyError> {
        if self.n_bodies == 0 {
            return Err(GalaxyError::InvalidConfig("nBodies must be at least 1".to_string()));
        }
        let positive = [
            ("galaxyRadius", self.galaxy_radius),
            ("bulgeRadius", self.bulge_radius),
            ("G", self.g),
            ("dt", self.dt),
            ("theta", self.theta),
            ("timestepAccuracy", self.timestep_accuracy),
            ("minDt", self.min_dt),
            ("gasCoolingTime", self.gas_cooling_time),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(GalaxyError::InvalidConfig(format!("{} must be positive, got {}", name, value)));
            }
        }
        let non_negative = [
            ("diskHeight", self.disk_height),
            ("rotationSpeed", self.rotation_speed),
            ("spiralTightness", self.spiral_tightness),
            ("softening", self.softening),
            ("centralMass", self.central_mass),
            ("bulgeMass", self.bulge_mass),
            ("diskMass", self.disk_mass),
            ("gasMass", self.gas_mass),
            ("haloMass", self.halo_mass),
            ("darkEnergy", self.dark_energy),
            ("starFormationDensity", self.star_formation_density),
            ("starFormationTemperature", self.star_formation_temperature),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(GalaxyError::InvalidConfig(format!("{} must be non-negative, got {}", name, value)));
            }
        }
        if self.bulge_radius > self.galaxy_radius {
            return Err(GalaxyError::InvalidConfig("bulgeRadius cannot exceed galaxyRadius".to_string()));
        }
        if self.n_spiral_arms == 0 {
            return Err(GalaxyError::InvalidConfig("nSpiralArms must be at least 1".to_string()));
        }
        if self.max_tree_depth == 0 {
            return Err(GalaxyError::InvalidConfig("maxTreeDepth must be at least 1".to_string()));
        }
        if self.min_dt > self.dt {
            return Err(GalaxyError::InvalidConfig("minDt cannot exceed dt".to_string()));
        }
        if self.direct_sampling_threshold == 0 || self.potential_sample_limit < 2 {
            return Err(GalaxyError::InvalidConfig(
                "directSamplingThreshold must be positive and potentialSampleLimit at least 2".to_string(),
            ));
        }
        self.validate_fractions()
    }

    /// Kind fractions must each lie in [0, 1] and sum to 1.
    pub fn validate_fractions(&self) -> Result<(), GalaxyError> {
        let fractions = [self.bulge_fraction, self.disk_fraction, self.halo_fraction, self.gas_fraction];
        if fractions.iter().any(|f| !(f.is_finite() && (0.0..=1.0).contains(f))) {
            return Err(GalaxyError::InvalidConfig(format!("kind fractions must lie in [0, 1], got {:?}", fractions)));
        }
        let sum: f64 = fractions.iter().sum();
        if (sum - 1.0).abs() > 1e-9 {
            return Err(GalaxyError::InvalidConfig(format!("kind fractions must sum to 1, got {}", sum)));
        }
        Ok(())
    }

    /// Total mass of all components.
    pub fn total_mass(&self) -> f64 {
        self.central_mass + self.bulge_mass + self.disk_mass + self.gas_mass + self.halo_mass
    }
}
