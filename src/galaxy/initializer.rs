use std::f64::consts::{PI, SQRT_2};
use log::info;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use crate::galaxy::evolution::{stellar_color, STELLAR_COLOR_AGING_TIME};
use crate::models::{Body, BodyKind, Color, Vector3};
use crate::utils::{
    bracketed_newton, random_unit_vector, sample_vector, zero_mean_normal, GalaxyError, SimulationParams,
    HALO_CONCENTRATION,
};

/// Bulge velocity dispersion as a fraction of the local circular velocity.
pub const BULGE_DISPERSION: f64 = 0.5;
/// Disk and gas velocity dispersion as a fraction of the local circular velocity.
pub const DISK_DISPERSION: f64 = 0.05;
/// Halo dispersion; the per-axis σ is `HALO_DISPERSION · v_c / √3`.
pub const HALO_DISPERSION: f64 = 1.0;

const SPIRAL_PARAMETER_RANGE: f64 = 4.0;
const SPIRAL_ANGLE_SCATTER: f64 = 0.2;
const SPIRAL_RADIAL_SCATTER: f64 = 2.0;
const ARM_HALF_WIDTH: f64 = 0.3;

const CENTRAL_COLOR: [f32; 3] = [1.0, 1.0, 0.9];
const HALO_COLOR: [f32; 3] = [0.1, 0.1, 0.1];
const GAS_COLOR: [f32; 3] = [0.8, 0.4, 0.5];

const GAS_INITIAL_TEMPERATURE: f64 = 1.0e4;
const BULGE_TEMPERATURE: f64 = 4_500.0;
const DISK_TEMPERATURE: f64 = 5_800.0;

const BULGE_METALLICITY: f64 = 0.02;
const DISK_METALLICITY: f64 = 0.015;
const GAS_METALLICITY: f64 = 0.01;
const HALO_METALLICITY: f64 = 0.001;

/// Mass at which a body is drawn with unit radius.
const RADIUS_REFERENCE_MASS: f64 = 1.0e4;

/// Number of bodies of each kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComponentCounts {
    pub central: usize,
    pub bulge: usize,
    pub disk: usize,
    pub halo: usize,
    pub gas: usize,
}

impl ComponentCounts {
    pub fn total(&self) -> usize {
        self.central + self.bulge + self.disk + self.halo + self.gas
    }
}

/// Render radius of a body of the given mass.
pub fn render_radius(mass: f64) -> f64 {
    (mass.max(0.0) / RADIUS_REFERENCE_MASS).cbrt()
}

/// Dimensionless NFW mass profile `m(x) = ln(1 + x) - x / (1 + x)`.
pub fn nfw_mass_profile(x: f64) -> f64 {
    x.ln_1p() - x / (1.0 + x)
}

/// Mean of `x` for the NFW profile truncated at concentration `c`, in units of `r_s`.
pub fn nfw_mean_scaled_radius(c: f64) -> f64 {
    (c - 2.0 * c.ln_1p() + c / (1.0 + c)) / nfw_mass_profile(c)
}

/// Samples the initial body set of a galaxy.
///
/// Bodies are laid out as: the central mass (if any), bulge, disk, halo, then gas.
///
/// # Example
/// ```
/// use rs_galaxy::galaxy::GalaxyInitializer;
/// use rs_galaxy::models::BodyKind;
/// use rs_galaxy::utils::SimulationParams;
///
/// let params = SimulationParams { n_bodies: 200, ..SimulationParams::default() };
/// let initializer = GalaxyInitializer::new(params).unwrap();
/// let bodies = initializer.generate(7).unwrap();
///
/// assert_eq!(bodies.len(), 200);
/// assert_eq!(bodies[0].kind, BodyKind::CentralMass);
/// assert_eq!(bodies, initializer.generate(7).unwrap());
/// ```
#[derive(Clone, Debug)]
pub struct GalaxyInitializer {
    params: SimulationParams,
    counts: ComponentCounts,
    angle_scatter: Normal<f64>,
    radial_scatter: Normal<f64>,
}

impl GalaxyInitializer {
    pub fn new(params: SimulationParams) -> Result<Self, GalaxyError> {
        params.validate()?;
        let counts = Self::apportion(&params);
        Ok(Self {
            params,
            counts,
            angle_scatter: zero_mean_normal(SPIRAL_ANGLE_SCATTER)?,
            radial_scatter: zero_mean_normal(SPIRAL_RADIAL_SCATTER)?,
        })
    }

    fn apportion(params: &SimulationParams) -> ComponentCounts {
        let central = usize::from(params.central_mass > 0.0).min(params.n_bodies);
        let remaining = params.n_bodies - central;
        let share = |fraction: f64| ((remaining as f64) * fraction).floor() as usize;
        let bulge = share(params.bulge_fraction);
        let halo = share(params.halo_fraction);
        let gas = share(params.gas_fraction);
        let disk = remaining.saturating_sub(bulge + halo + gas);
        ComponentCounts { central, bulge, disk, halo, gas }
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn counts(&self) -> ComponentCounts {
        self.counts
    }

    /// Draws a new body set. The same seed always yields the same bodies.
    pub fn generate(&self, seed: u64) -> Result<Vec<Body>, GalaxyError> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let counts = self.counts;
        let mut bodies = Vec::with_capacity(counts.total());

        if counts.central > 0 {
            let mut core = Body::new(Vector3::ZERO, Vector3::ZERO, self.params.central_mass, BodyKind::CentralMass);
            core.color = Color::from(CENTRAL_COLOR);
            core.radius = render_radius(core.mass);
            bodies.push(core);
        }
        for _ in 0..counts.bulge {
            bodies.push(self.sample_bulge(&mut rng)?);
        }
        for i in 0..counts.disk {
            bodies.push(self.sample_disk(&mut rng, i, BodyKind::Disk)?);
        }
        for _ in 0..counts.halo {
            bodies.push(self.sample_halo(&mut rng)?);
        }
        for i in 0..counts.gas {
            bodies.push(self.sample_disk(&mut rng, i, BodyKind::Gas)?);
        }

        if let Some(index) = bodies.iter().position(|b| !b.is_finite()) {
            return Err(GalaxyError::InvalidState(format!("initial body {} is not finite", index)));
        }
        info!(
            "Generated {} bodies (central {}, bulge {}, disk {}, halo {}, gas {}) with seed {}",
            bodies.len(), counts.central, counts.bulge, counts.disk, counts.halo, counts.gas, seed
        );
        Ok(bodies)
    }

    fn sample_bulge<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Body, GalaxyError> {
        let r = self.params.bulge_radius * rng.random::<f64>().sqrt();
        let position = random_unit_vector(rng) * r;
        let dispersion = zero_mean_normal(BULGE_DISPERSION * self.circular_velocity(r))?;
        let velocity = sample_vector(&dispersion, rng);

        let mass = self.params.bulge_mass / self.counts.bulge as f64;
        let mut body = Body::new(position, velocity, mass, BodyKind::Bulge);
        body.age = STELLAR_COLOR_AGING_TIME;
        body.color = stellar_color(body.age, mass);
        body.radius = render_radius(mass);
        body.temperature = BULGE_TEMPERATURE;
        body.metallicity = BULGE_METALLICITY;
        Ok(body)
    }

    /// Spiral-arm sample shared by disk stars and gas.
    fn sample_disk<R: Rng + ?Sized>(&self, rng: &mut R, index: usize, kind: BodyKind) -> Result<Body, GalaxyError> {
        let p = &self.params;
        let arms = p.n_spiral_arms.max(1);
        let sector = 2.0 * PI / arms as f64;
        let arm = index % arms;

        let t = rng.random_range(0.0..SPIRAL_PARAMETER_RANGE);
        let angle = t + sector * arm as f64 + self.angle_scatter.sample(rng);
        let mut r = (p.bulge_radius * (p.spiral_tightness * t).exp() + self.radial_scatter.sample(rng)).abs();
        if r > p.galaxy_radius {
            r = p.galaxy_radius * rng.random_range(0.8..1.0);
        }
        let z = zero_mean_normal(p.disk_height * (1.0 - r / p.galaxy_radius).max(0.0))?.sample(rng);
        let (sin, cos) = angle.sin_cos();
        let position = Vector3::new(r * cos, r * sin, z);

        let v_c = self.circular_velocity(r);
        let tangential = Vector3::new(-sin, cos, 0.0) * (p.rotation_speed * v_c);
        let velocity = tangential + sample_vector(&zero_mean_normal(DISK_DISPERSION * v_c)?, rng);

        let (component_mass, count) = match kind {
            BodyKind::Gas => (p.gas_mass, self.counts.gas),
            _ => (p.disk_mass, self.counts.disk),
        };
        let mass = component_mass / count as f64;
        let mut body = Body::new(position, velocity, mass, kind);
        body.radius = render_radius(mass);

        if kind == BodyKind::Gas {
            body.color = Color::from(GAS_COLOR);
            body.temperature = GAS_INITIAL_TEMPERATURE;
            body.metallicity = GAS_METALLICITY;
        } else {
            // Stars inside an arm start young, the rest start fully aged.
            let arm_distance = (angle.rem_euclid(sector) - sector / 2.0).abs();
            body.age = if arm_distance < ARM_HALF_WIDTH { 0.0 } else { STELLAR_COLOR_AGING_TIME };
            body.color = stellar_color(body.age, mass);
            body.temperature = DISK_TEMPERATURE;
            body.metallicity = DISK_METALLICITY;
        }
        Ok(body)
    }

    fn sample_halo<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Body, GalaxyError> {
        let c = HALO_CONCENTRATION;
        let target = rng.random::<f64>() * nfw_mass_profile(c);
        let x = bracketed_newton(
            |x| (nfw_mass_profile(x) - target, x / ((1.0 + x) * (1.0 + x))),
            0.0,
            c,
            1e-10,
            64,
        );
        let r = x * self.halo_scale_radius();
        let position = random_unit_vector(rng) * r;
        let dispersion = zero_mean_normal(HALO_DISPERSION * self.circular_velocity(r) / 3.0_f64.sqrt())?;
        let velocity = sample_vector(&dispersion, rng);

        let mass = self.params.halo_mass / self.counts.halo as f64;
        let mut body = Body::new(position, velocity, mass, BodyKind::Halo);
        body.color = Color::from(HALO_COLOR);
        body.radius = render_radius(mass);
        body.metallicity = HALO_METALLICITY;
        Ok(body)
    }

    /// Hernquist scale length whose half-mass radius matches the sampled bulge (`R_b / √2`).
    pub fn bulge_scale_length(&self) -> f64 {
        self.params.bulge_radius / (SQRT_2 * (1.0 + SQRT_2))
    }

    /// Exponential scale length of the disk.
    pub fn disk_scale_length(&self) -> f64 {
        self.params.galaxy_radius / 3.0
    }

    /// NFW scale radius `r_s`.
    pub fn halo_scale_radius(&self) -> f64 {
        self.params.galaxy_radius / 5.0
    }

    /// Mass enclosed within spherical radius `r` according to the analytic model
    /// (central point mass, Hernquist bulge, exponential disk and gas, truncated NFW halo).
    ///
    /// Components with no bodies contribute nothing.
    pub fn enclosed_mass(&self, r: f64) -> f64 {
        let p = &self.params;
        let counts = &self.counts;
        let r = r.max(0.0);
        let mut mass = 0.0;

        if counts.central > 0 {
            mass += p.central_mass;
        }
        if counts.bulge > 0 {
            let a = self.bulge_scale_length();
            mass += p.bulge_mass * r * r / ((r + a) * (r + a));
        }
        let mut flat_mass = 0.0;
        if counts.disk > 0 {
            flat_mass += p.disk_mass;
        }
        if counts.gas > 0 {
            flat_mass += p.gas_mass;
        }
        if flat_mass > 0.0 {
            let s = r / self.disk_scale_length();
            mass += flat_mass * (1.0 - (1.0 + s) * (-s).exp());
        }
        if counts.halo > 0 {
            let x = (r / self.halo_scale_radius()).min(HALO_CONCENTRATION);
            mass += p.halo_mass * nfw_mass_profile(x) / nfw_mass_profile(HALO_CONCENTRATION);
        }
        mass
    }

    /// Circular speed at radius `r` under the softened point-mass law:
    /// `v² = G M(r) r² / (r² + ε²)^{3/2}`.
    pub fn circular_velocity(&self, r: f64) -> f64 {
        let r = r.abs();
        let eps2 = self.params.softening * self.params.softening;
        let denominator = (r * r + eps2).powf(1.5);
        if denominator == 0.0 {
            return 0.0;
        }
        (self.params.g * self.enclosed_mass(r) * r * r / denominator).sqrt()
    }

    /// Analytic mean radius of the sampled (truncated) NFW halo.
    pub fn nfw_mean_radius(&self) -> f64 {
        self.halo_scale_radius() * nfw_mean_scaled_radius(HALO_CONCENTRATION)
    }
}
