use crate::utils;

/// Gravitational constant in kpc (km/s)^2 / M☉.
pub const GRAVITATIONAL_CONSTANT_KPC: f64 = 4.3e-6;

/// Smallest half-size an octree root cube may have (kpc).
pub const MIN_HALF_SIZE: f64 = 1e-3;

/// Concentration parameter of the NFW dark-matter halo.
pub const HALO_CONCENTRATION: f64 = 10.0;

/// Seed used when the caller does not supply one.
pub const DEFAULT_SEED: u64 = 42;

pub const DEFAULT_SIMULATION_PARAMS: utils::SimulationParams = utils::SimulationParams {
    n_bodies: 10_000,
    galaxy_radius: 50.0,
    bulge_radius: 10.0,
    disk_height: 2.0,
    rotation_speed: 1.0,
    spiral_tightness: 0.3,
    n_spiral_arms: 2,
    g: GRAVITATIONAL_CONSTANT_KPC,
    softening: 1.0,
    dt: 0.5,
    central_mass: 1.0e6,
    bulge_mass: 1.5e6,
    disk_mass: 5.0e6,
    gas_mass: 2.5e5,
    halo_mass: 5.0e6,
    theta: 0.5,
    use_tree_algorithm: true,
    max_tree_depth: 20,
    bulge_fraction: 0.15,
    disk_fraction: 0.70,
    halo_fraction: 0.10,
    gas_fraction: 0.05,
    dark_energy: 0.0,
    adaptive_timestep: false,
    timestep_accuracy: 0.2,
    min_dt: 0.5 / 64.0,
    direct_sampling_threshold: 20_000,
    potential_sample_limit: 2_000,
    star_formation_density: 5.0e4,
    star_formation_temperature: 8_000.0,
    gas_cooling_time: 50.0,
    max_snapshot_bodies: 0,
};
