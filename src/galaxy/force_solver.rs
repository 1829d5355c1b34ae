use log::debug;
use rayon::prelude::*;
use crate::galaxy::octree::{softened_pull, Octree, TreeStats};
use crate::models::{Body, Vector3};
use crate::utils::{GalaxyError, SimulationParams};

/// Strategy used for one force pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForceMethod {
    /// Barnes-Hut octree, O(N log N).
    Tree,
    /// Exact pairwise sum, O(N²).
    Direct,
    /// Pairwise sum against every `stride`-th body, scaled by `stride`.
    SampledDirect { stride: usize },
}

/// Output of [`ForceSolver::solve`].
///
/// The tree is kept only for the rest of the step (local densities, statistics) and is
/// dropped with the pass.
#[derive(Debug)]
pub struct ForcePass {
    pub forces: Vec<Vector3>,
    pub tree: Option<Octree>,
    pub method: ForceMethod,
}

impl ForcePass {
    /// Per-body accelerations `F / m`. Massless bodies get zero acceleration.
    pub fn accelerations(&self, bodies: &[Body]) -> Vec<Vector3> {
        self.forces
            .iter()
            .zip(bodies)
            .map(|(force, body)| if body.mass > 0.0 { *force / body.mass } else { Vector3::ZERO })
            .collect()
    }

    pub fn tree_stats(&self) -> TreeStats {
        self.tree.as_ref().map(Octree::stats).unwrap_or_default()
    }
}

/// Computes gravitational forces for a whole body set.
///
/// # Example
/// ```
/// use rs_galaxy::galaxy::{ForceMethod, ForceSolver};
/// use rs_galaxy::models::{Body, BodyKind, Vector3};
/// use rs_galaxy::utils::SimulationParams;
///
/// let params = SimulationParams { g: 1.0, softening: 0.0, ..SimulationParams::default() };
/// let solver = ForceSolver::from_params(&params);
/// let bodies = vec![
///     Body::new(Vector3::new(0.0, 0.0, 0.0), Vector3::ZERO, 1.0, BodyKind::Disk),
///     Body::new(Vector3::new(2.0, 0.0, 0.0), Vector3::ZERO, 1.0, BodyKind::Disk),
/// ];
///
/// let pass = solver.solve(&bodies).unwrap();
/// assert_eq!(pass.method, ForceMethod::Tree);
/// assert!((pass.forces[0].x - 0.25).abs() < 1e-12);
/// assert!((pass.forces[1].x + 0.25).abs() < 1e-12);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForceSolver {
    pub g: f64,
    pub softening: f64,
    pub theta: f64,
    pub use_tree: bool,
    pub max_depth: usize,
    pub direct_sampling_threshold: usize,
    pub dark_energy: f64,
}

impl ForceSolver {
    pub fn from_params(params: &SimulationParams) -> Self {
        Self {
            g: params.g,
            softening: params.softening,
            theta: params.theta,
            use_tree: params.use_tree_algorithm,
            max_depth: params.max_tree_depth,
            direct_sampling_threshold: params.direct_sampling_threshold.max(1),
            dark_energy: params.dark_energy,
        }
    }

    /// The strategy used for `n` bodies.
    pub fn method_for(&self, n: usize) -> ForceMethod {
        if self.use_tree {
            ForceMethod::Tree
        } else if n <= self.direct_sampling_threshold {
            ForceMethod::Direct
        } else {
            ForceMethod::SampledDirect { stride: n.div_ceil(self.direct_sampling_threshold) }
        }
    }

    /// Computes the force on every body from a single consistent snapshot of `bodies`.
    ///
    /// Fails with [`GalaxyError::InvalidState`] before any tree is built when a body has a
    /// non-finite position, velocity or mass.
    pub fn solve(&self, bodies: &[Body]) -> Result<ForcePass, GalaxyError> {
        validate_bodies(bodies)?;

        let method = self.method_for(bodies.len());
        let (mut forces, tree) = match method {
            ForceMethod::Tree => {
                let tree = Octree::build(bodies, self.max_depth);
                let forces = compute_tree_forces(&tree, bodies, self.g, self.softening, self.theta);
                (forces, Some(tree))
            }
            ForceMethod::Direct => (compute_direct_forces(bodies, self.g, self.softening), None),
            ForceMethod::SampledDirect { stride } => {
                debug!("Sampling direct forces with stride {} for {} bodies", stride, bodies.len());
                (compute_sampled_forces(bodies, self.g, self.softening, stride), None)
            }
        };

        if self.dark_energy != 0.0 {
            apply_dark_energy(&mut forces, bodies, self.dark_energy);
        }

        Ok(ForcePass { forces, tree, method })
    }
}

/// Returns the first body with a non-finite position, velocity or mass as an error.
pub fn validate_bodies(bodies: &[Body]) -> Result<(), GalaxyError> {
    match bodies.iter().position(|body| !body.is_finite()) {
        Some(index) => Err(GalaxyError::InvalidState(format!(
            "body {} has a non-finite position, velocity or mass",
            index
        ))),
        None => Ok(()),
    }
}

/// Per-body Barnes-Hut queries against a shared tree, in parallel.
///
/// The collect keeps slice order, so the result does not depend on the thread count.
pub fn compute_tree_forces(tree: &Octree, bodies: &[Body], g: f64, softening: f64, theta: f64) -> Vec<Vector3> {
    bodies
        .par_iter()
        .enumerate()
        .map(|(i, body)| tree.compute_force(bodies, Some(i), body.position, body.mass, g, softening, theta))
        .collect()
}

/// Exact softened pairwise forces, applying each pair once with Newton's third law.
///
/// # Example
/// ```
/// use rs_galaxy::galaxy::compute_direct_forces;
/// use rs_galaxy::models::{Body, BodyKind, Vector3};
///
/// let bodies = vec![
///     Body::new(Vector3::new(0.0, 0.0, 0.0), Vector3::ZERO, 2.0, BodyKind::Bulge),
///     Body::new(Vector3::new(0.0, 3.0, 4.0), Vector3::ZERO, 5.0, BodyKind::Bulge),
/// ];
/// let forces = compute_direct_forces(&bodies, 1.0, 0.0);
///
/// // |F| = G m1 m2 / r² = 10 / 25
/// assert!((forces[0].norm() - 0.4).abs() < 1e-12);
/// assert_eq!(forces[0], -forces[1]);
/// ```
pub fn compute_direct_forces(bodies: &[Body], g: f64, softening: f64) -> Vec<Vector3> {
    let eps2 = softening * softening;
    let mut forces = vec![Vector3::ZERO; bodies.len()];
    for i in 0..bodies.len() {
        for j in (i + 1)..bodies.len() {
            let f = softened_pull(bodies[i].position, bodies[j].position, g * bodies[i].mass * bodies[j].mass, eps2);
            forces[i] += f;
            forces[j] -= f;
        }
    }
    forces
}

/// Direct summation against a systematic sample of the bodies.
///
/// Body `i` interacts with bodies `i mod stride`, `i mod stride + stride`, ... (skipping
/// itself), and the sum is multiplied by `stride`. The estimate is only unbiased when the
/// body ordering is well mixed, and total momentum is not conserved exactly.
///
/// Per-body errors are large when a few bodies dominate the mass: a heavy body at index `h`
/// is felt only by bodies with `i ≡ h (mod stride)`, at `stride` times its real pull, while
/// the rest never feel it. Aggregate quantities such as the mean radial force stay close to
/// the exact sum, but individual bodies can be off by more than 50%.
pub fn compute_sampled_forces(bodies: &[Body], g: f64, softening: f64, stride: usize) -> Vec<Vector3> {
    let stride = stride.max(1);
    let eps2 = softening * softening;
    let scale = stride as f64;
    bodies
        .par_iter()
        .enumerate()
        .map(|(i, body)| {
            let gm = g * body.mass;
            let mut force = Vector3::ZERO;
            for j in ((i % stride)..bodies.len()).step_by(stride) {
                if j != i {
                    force += softened_pull(body.position, bodies[j].position, gm * bodies[j].mass, eps2);
                }
            }
            force * scale
        })
        .collect()
}

/// Adds the outward cosmological term `Λ m r` to each force.
pub fn apply_dark_energy(forces: &mut [Vector3], bodies: &[Body], lambda: f64) {
    for (force, body) in forces.iter_mut().zip(bodies) {
        *force += body.position * (lambda * body.mass);
    }
}
