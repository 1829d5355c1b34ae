use rayon::prelude::*;
use serde::Serialize;
use crate::models::{Body, Vector3};

/// Conserved and derived quantities of a body set.
///
/// Energies use the same softened potential `-G m_i m_j / sqrt(r² + ε²)` as the force law.
/// When `potential_sampled` is set, `potential_energy`, `total_energy` and `virial_ratio`
/// are statistical estimates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Invariants {
    pub kinetic_energy: f64,
    pub potential_energy: f64,
    pub total_energy: f64,
    pub angular_momentum: Vector3,
    pub linear_momentum: Vector3,
    pub center_of_mass: Vector3,
    pub center_of_mass_velocity: Vector3,
    pub virial_ratio: f64,
    pub potential_sampled: bool,
}

impl Invariants {
    /// Number of values produced by [`Invariants::to_array`].
    pub const FLAT_LEN: usize = 17;

    /// Flat layout: K, U, E, L(xyz), p(xyz), com(xyz), com velocity(xyz), virial ratio,
    /// and 1.0 when the potential was sampled.
    pub fn to_array(&self) -> [f64; Self::FLAT_LEN] {
        let l = self.angular_momentum;
        let p = self.linear_momentum;
        let c = self.center_of_mass;
        let v = self.center_of_mass_velocity;
        [
            self.kinetic_energy,
            self.potential_energy,
            self.total_energy,
            l.x, l.y, l.z,
            p.x, p.y, p.z,
            c.x, c.y, c.z,
            v.x, v.y, v.z,
            self.virial_ratio,
            if self.potential_sampled { 1.0 } else { 0.0 },
        ]
    }

    /// `|E - E_ref| / |E_ref|`, or the absolute difference when the reference energy is zero.
    pub fn relative_energy_drift(&self, reference: &Invariants) -> f64 {
        let delta = (self.total_energy - reference.total_energy).abs();
        if reference.total_energy != 0.0 {
            delta / reference.total_energy.abs()
        } else {
            delta
        }
    }
}

/// Computes the invariants of `bodies` without mutating them.
///
/// The potential is exact for up to `potential_sample_limit` bodies and estimated from a
/// systematic sample of that many bodies otherwise.
///
/// # Example
/// ```
/// use rs_galaxy::galaxy::compute_invariants;
/// use rs_galaxy::models::{Body, BodyKind, Vector3};
///
/// let bodies = vec![
///     Body::new(Vector3::new(-1.0, 0.0, 0.0), Vector3::new(0.0, -1.0, 0.0), 1.0, BodyKind::Disk),
///     Body::new(Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 1.0, 0.0), 1.0, BodyKind::Disk),
/// ];
/// let inv = compute_invariants(&bodies, 1.0, 0.0, 2_000);
///
/// assert_eq!(inv.kinetic_energy, 1.0);
/// assert_eq!(inv.potential_energy, -0.5);
/// assert_eq!(inv.linear_momentum, Vector3::ZERO);
/// assert_eq!(inv.angular_momentum, Vector3::new(0.0, 0.0, 2.0));
/// assert!(!inv.potential_sampled);
/// ```
pub fn compute_invariants(bodies: &[Body], g: f64, softening: f64, potential_sample_limit: usize) -> Invariants {
    let kinetic_energy = kinetic_energy(bodies);
    let sampled = bodies.len() > potential_sample_limit.max(2);
    let potential_energy = if sampled {
        sampled_potential_energy(bodies, g, softening, potential_sample_limit)
    } else {
        potential_energy(bodies, g, softening)
    };

    let mut total_mass = 0.0;
    let mut angular_momentum = Vector3::ZERO;
    let mut linear_momentum = Vector3::ZERO;
    let mut weighted_position = Vector3::ZERO;
    for body in bodies {
        total_mass += body.mass;
        angular_momentum += body.angular_momentum();
        linear_momentum += body.momentum();
        weighted_position += body.position * body.mass;
    }
    let (center_of_mass, center_of_mass_velocity) = if total_mass > 0.0 {
        (weighted_position / total_mass, linear_momentum / total_mass)
    } else {
        (Vector3::ZERO, Vector3::ZERO)
    };

    Invariants {
        kinetic_energy,
        potential_energy,
        total_energy: kinetic_energy + potential_energy,
        angular_momentum,
        linear_momentum,
        center_of_mass,
        center_of_mass_velocity,
        virial_ratio: virial_ratio(kinetic_energy, potential_energy),
        potential_sampled: sampled,
    }
}

pub fn kinetic_energy(bodies: &[Body]) -> f64 {
    bodies.iter().map(Body::kinetic_energy).sum()
}

/// `2K / |U|`, zero for an unbound empty potential.
pub fn virial_ratio(kinetic: f64, potential: f64) -> f64 {
    if potential != 0.0 {
        2.0 * kinetic / potential.abs()
    } else {
        0.0
    }
}

/// Exact softened pairwise potential energy.
pub fn potential_energy(bodies: &[Body], g: f64, softening: f64) -> f64 {
    pairwise_potential(bodies, &(0..bodies.len()).collect::<Vec<_>>(), g, softening)
}

/// Bodies heavier than this multiple of the mean mass are summed exactly by
/// [`sampled_potential_energy`].
pub const HEAVY_BODY_FACTOR: f64 = 10.0;

/// Estimated potential for large body sets.
///
/// Pairs involving a heavy body (see [`HEAVY_BODY_FACTOR`]) are summed exactly. The
/// remaining light-light pairs are estimated from an evenly strided sample of at most
/// `limit` light bodies, scaled by the pair-count ratio `n(n-1) / (k(k-1))`. If there are
/// more heavy bodies than `limit`, every body is treated as light.
pub fn sampled_potential_energy(bodies: &[Body], g: f64, softening: f64, limit: usize) -> f64 {
    let n = bodies.len();
    if n < 2 {
        return 0.0;
    }
    let limit = limit.max(2);
    let threshold = HEAVY_BODY_FACTOR * bodies.iter().map(|b| b.mass).sum::<f64>() / n as f64;
    let (mut heavy, mut light): (Vec<usize>, Vec<usize>) = (0..n).partition(|&i| bodies[i].mass > threshold);
    if heavy.len() > limit {
        heavy.clear();
        light = (0..n).collect();
    }

    let exact = pairwise_potential(bodies, &heavy, g, softening) + cross_potential(bodies, &heavy, &light, g, softening);

    let m = light.len();
    let stride = m.div_ceil(limit).max(1);
    let sample: Vec<usize> = light.iter().copied().step_by(stride).collect();
    let k = sample.len();
    if k < 2 {
        return exact;
    }
    let pair_ratio = (m as f64 * (m as f64 - 1.0)) / (k as f64 * (k as f64 - 1.0));
    exact + pairwise_potential(bodies, &sample, g, softening) * pair_ratio
}

#[inline]
fn pair_potential(a: &Body, b: &Body, g: f64, eps2: f64) -> f64 {
    let r = ((b.position - a.position).norm_squared() + eps2).sqrt();
    if r > 0.0 {
        -g * a.mass * b.mass / r
    } else {
        0.0
    }
}

/// Sums row by row in parallel, then adds the rows in order so the result is reproducible.
fn pairwise_potential(bodies: &[Body], indices: &[usize], g: f64, softening: f64) -> f64 {
    let eps2 = softening * softening;
    let rows: Vec<f64> = indices
        .par_iter()
        .enumerate()
        .map(|(a, &i)| {
            indices[a + 1..]
                .iter()
                .map(|&j| pair_potential(&bodies[i], &bodies[j], g, eps2))
                .sum::<f64>()
        })
        .collect();
    rows.iter().sum()
}

/// Every pair with one body from `left` and one from `right`; the sets must be disjoint.
fn cross_potential(bodies: &[Body], left: &[usize], right: &[usize], g: f64, softening: f64) -> f64 {
    let eps2 = softening * softening;
    let rows: Vec<f64> = left
        .par_iter()
        .map(|&i| right.iter().map(|&j| pair_potential(&bodies[i], &bodies[j], g, eps2)).sum::<f64>())
        .collect();
    rows.iter().sum()
}
