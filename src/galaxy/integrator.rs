use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use log::{debug, warn};
use crate::galaxy::evolution::{evolve_population, EvolutionContext};
use crate::galaxy::force_solver::{validate_bodies, ForceSolver};
use crate::galaxy::octree::{Octree, TreeStats};
use crate::models::{Body, BodyKind, Vector3};
use crate::utils::{GalaxyError, SimulationParams};

/// Cooperative cancellation flag, checked between steps.
///
/// Clones share the same flag, so one clone can be handed to another thread.
///
/// # Example
/// ```
/// use rs_galaxy::galaxy::CancellationToken;
///
/// let token = CancellationToken::new();
/// let remote = token.clone();
/// remote.cancel();
/// assert!(token.is_cancelled());
/// token.reset();
/// assert!(!remote.is_cancelled());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Outcome of one committed step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepReport {
    /// Step size actually used.
    pub dt: f64,
    /// Wall-clock time spent on the step.
    pub elapsed_time: Duration,
    /// Counters of the trees built during the step.
    pub tree_stats: TreeStats,
    pub stars_formed: usize,
}

/// Outcome of [`LeapfrogIntegrator::step_n`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BatchReport {
    pub steps_completed: usize,
    pub cancelled: bool,
    pub simulated_time: f64,
    pub stars_formed: usize,
    pub tree_stats: TreeStats,
}

impl BatchReport {
    fn record(&mut self, step: &StepReport) {
        self.steps_completed += 1;
        self.simulated_time += step.dt;
        self.stars_formed += step.stars_formed;
        self.tree_stats.accumulate(&step.tree_stats);
    }
}

/// A failed batch: the error of the failing step plus what was committed before it.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchError {
    pub error: GalaxyError,
    pub completed: BatchReport,
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (after {} completed steps)", self.error, self.completed.steps_completed)
    }
}

impl Error for BatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

/// Kick-drift-kick leapfrog integrator.
///
/// The accelerations computed at the end of a step are cached and reused as the opening
/// half kick of the next one, so each step costs a single force pass. This is equivalent
/// to running independent KDK steps. Call [`LeapfrogIntegrator::invalidate`] whenever the
/// bodies are modified outside of [`LeapfrogIntegrator::step`].
#[derive(Clone, Debug, Default)]
pub struct LeapfrogIntegrator {
    accelerations: Option<Vec<Vector3>>,
}

impl LeapfrogIntegrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the cached accelerations.
    pub fn invalidate(&mut self) {
        self.accelerations = None;
    }

    pub fn has_cached_accelerations(&self) -> bool {
        self.accelerations.is_some()
    }

    /// Advances `bodies` by one step.
    ///
    /// The step runs on a working copy. On error, `bodies` is left exactly as it was and the
    /// cache is discarded.
    pub fn step(&mut self, bodies: &mut [Body], params: &SimulationParams) -> Result<StepReport, GalaxyError> {
        let started = Instant::now();
        match self.try_step(bodies, params) {
            Ok((dt, tree_stats, stars_formed)) => {
                let report = StepReport { dt, elapsed_time: started.elapsed(), tree_stats, stars_formed };
                debug!("Step committed: dt = {}, stars formed = {}, in {:?}", dt, stars_formed, report.elapsed_time);
                Ok(report)
            }
            Err(error) => {
                self.invalidate();
                warn!("Step rejected, state rolled back: {}", error);
                Err(error)
            }
        }
    }

    fn try_step(&mut self, bodies: &mut [Body], params: &SimulationParams) -> Result<(f64, TreeStats, usize), GalaxyError> {
        let solver = ForceSolver::from_params(params);
        let mut tree_stats = TreeStats::default();

        let accelerations = match self.accelerations.take() {
            Some(cached) if cached.len() == bodies.len() => cached,
            _ => {
                let pass = solver.solve(bodies)?;
                tree_stats.accumulate(&pass.tree_stats());
                pass.accelerations(bodies)
            }
        };
        let dt = choose_timestep(&accelerations, params);
        let half_dt = 0.5 * dt;

        let mut working = bodies.to_vec();
        for (body, a) in working.iter_mut().zip(&accelerations) {
            body.velocity += *a * half_dt;
            body.position += body.velocity * dt;
        }

        // Rejects non-finite drift results before building the tree.
        let pass = solver.solve(&working)?;
        tree_stats.accumulate(&pass.tree_stats());
        let next = pass.accelerations(&working);
        for (body, a) in working.iter_mut().zip(&next) {
            body.velocity += *a * half_dt;
        }
        validate_bodies(&working)?;

        let densities = if working.iter().any(|b| b.kind == BodyKind::Gas) {
            match &pass.tree {
                Some(tree) => tree.local_densities(&working),
                None => Octree::build(&working, params.max_tree_depth).local_densities(&working),
            }
        } else {
            Vec::new()
        };
        let stars_formed = evolve_population(&mut working, &densities, &EvolutionContext::from_params(params, dt));

        bodies.copy_from_slice(&working);
        self.accelerations = Some(next);
        Ok((dt, tree_stats, stars_formed))
    }

    /// Runs up to `steps` steps, checking `cancel` before each one.
    ///
    /// Steps committed before a failure stay committed; the failing step is rolled back and
    /// reported together with the partial batch.
    pub fn step_n(
        &mut self,
        bodies: &mut [Body],
        params: &SimulationParams,
        steps: usize,
        cancel: Option<&CancellationToken>,
    ) -> Result<BatchReport, BatchError> {
        let mut report = BatchReport::default();
        for _ in 0..steps {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                debug!("Batch cancelled after {} of {} steps", report.steps_completed, steps);
                report.cancelled = true;
                break;
            }
            match self.step(bodies, params) {
                Ok(step) => report.record(&step),
                Err(error) => return Err(BatchError { error, completed: report }),
            }
        }
        Ok(report)
    }
}

/// Global step size: `dt`, or with adaptive stepping `min(dt, η·sqrt(ε / a_max))` clamped
/// to `min_dt`.
pub fn choose_timestep(accelerations: &[Vector3], params: &SimulationParams) -> f64 {
    if !params.adaptive_timestep {
        return params.dt;
    }
    let a_max = accelerations.iter().map(Vector3::norm).fold(0.0, f64::max);
    if a_max <= 0.0 {
        return params.dt;
    }
    let dt = params.timestep_accuracy * (params.softening / a_max).sqrt();
    dt.min(params.dt).max(params.min_dt)
}
