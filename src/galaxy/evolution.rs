use crate::models::{Body, BodyKind, Color};
use crate::utils::{lerp_rgb, SimulationParams};

/// Colour of a freshly formed stellar population.
pub const YOUNG_STAR_COLOR: [f32; 3] = [0.6, 0.8, 1.0];
/// Colour a population reaches once fully aged.
pub const OLD_STAR_COLOR: [f32; 3] = [1.0, 0.7, 0.5];
/// Age (simulation time units) over which a solar-mass population goes from young to old.
pub const STELLAR_COLOR_AGING_TIME: f64 = 1_000.0;
/// Temperature (K) that cooling gas relaxes towards.
pub const GAS_TEMPERATURE_FLOOR: f64 = 100.0;
/// Metallicity added to gas when it turns into stars.
pub const STAR_FORMATION_ENRICHMENT: f64 = 0.002;

/// Thresholds and step size for the per-kind secondary updates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EvolutionContext {
    pub dt: f64,
    pub star_formation_density: f64,
    pub star_formation_temperature: f64,
    pub gas_cooling_time: f64,
}

impl EvolutionContext {
    pub fn from_params(params: &SimulationParams, dt: f64) -> Self {
        Self {
            dt,
            star_formation_density: params.star_formation_density,
            star_formation_temperature: params.star_formation_temperature,
            gas_cooling_time: params.gas_cooling_time,
        }
    }
}

/// Colour of a stellar population of the given age and mass.
///
/// Blends from [`YOUNG_STAR_COLOR`] to [`OLD_STAR_COLOR`]; heavier bodies redden sooner.
///
/// # Example
/// ```
/// use rs_galaxy::galaxy::{stellar_color, OLD_STAR_COLOR, STELLAR_COLOR_AGING_TIME, YOUNG_STAR_COLOR};
///
/// assert_eq!(stellar_color(0.0, 1.0).to_array(), YOUNG_STAR_COLOR);
/// assert_eq!(stellar_color(STELLAR_COLOR_AGING_TIME, 1.0).to_array(), OLD_STAR_COLOR);
/// ```
pub fn stellar_color(age: f64, mass: f64) -> Color {
    let lifetime = STELLAR_COLOR_AGING_TIME / (1.0 + mass.max(1.0).log10() / 10.0);
    let t = (age / lifetime).clamp(0.0, 1.0);
    Color::from(lerp_rgb(YOUNG_STAR_COLOR, OLD_STAR_COLOR, t as f32))
}

/// Exponential relaxation of `temperature` toward [`GAS_TEMPERATURE_FLOOR`].
pub fn cool_gas(temperature: f64, dt: f64, cooling_time: f64) -> f64 {
    GAS_TEMPERATURE_FLOOR + (temperature - GAS_TEMPERATURE_FLOOR) * (-dt / cooling_time).exp()
}

pub fn age_star(body: &mut Body, dt: f64) {
    body.age += dt;
    body.color = stellar_color(body.age, body.mass);
}

/// Cools a gas body and converts it into a disk star when it is dense and cold enough.
///
/// Returns true when the body turned into a star.
pub fn evolve_gas(body: &mut Body, local_density: f64, ctx: &EvolutionContext) -> bool {
    body.age += ctx.dt;
    body.temperature = cool_gas(body.temperature, ctx.dt, ctx.gas_cooling_time);

    if local_density > ctx.star_formation_density && body.temperature < ctx.star_formation_temperature {
        body.kind = BodyKind::Disk;
        body.age = 0.0;
        body.color = Color::from(YOUNG_STAR_COLOR);
        body.metallicity += STAR_FORMATION_ENRICHMENT;
        return true;
    }
    false
}

/// Applies the update for one body's kind. Returns true when a star formed.
pub fn evolve_body(body: &mut Body, local_density: f64, ctx: &EvolutionContext) -> bool {
    if body.kind.is_stellar() {
        age_star(body, ctx.dt);
        return false;
    }
    match body.kind {
        BodyKind::Gas => evolve_gas(body, local_density, ctx),
        _ => false,
    }
}

/// Runs [`evolve_body`] over the whole population and returns the number of stars formed.
///
/// `densities` is indexed like `bodies`; missing entries count as zero density.
pub fn evolve_population(bodies: &mut [Body], densities: &[f64], ctx: &EvolutionContext) -> usize {
    let mut formed = 0;
    for (i, body) in bodies.iter_mut().enumerate() {
        if evolve_body(body, densities.get(i).copied().unwrap_or(0.0), ctx) {
            formed += 1;
        }
    }
    formed
}
