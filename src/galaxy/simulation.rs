use std::error::Error;
use std::fmt;
use log::{info, warn};
use crate::galaxy::diagnostics::{compute_invariants, Invariants};
use crate::galaxy::force_solver::validate_bodies;
use crate::galaxy::initializer::GalaxyInitializer;
use crate::galaxy::integrator::{BatchError, BatchReport, CancellationToken, LeapfrogIntegrator};
use crate::galaxy::octree::TreeStats;
use crate::galaxy::snapshot::StateSnapshot;
use crate::models::Body;
use crate::utils::{GalaxyError, SimulationParams, DEFAULT_SEED};

/// A failed advance. The simulation keeps the state after `completed_steps` steps, which
/// is what `snapshot` shows.
#[derive(Clone, Debug, PartialEq)]
pub struct AdvanceError {
    pub error: GalaxyError,
    pub completed_steps: usize,
    pub snapshot: StateSnapshot,
}

impl fmt::Display for AdvanceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Advance failed after {} steps: {}", self.completed_steps, self.error)
    }
}

impl Error for AdvanceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

/// Result of a cancellable advance.
#[derive(Clone, Debug, PartialEq)]
pub struct AdvanceProgress {
    pub snapshot: StateSnapshot,
    pub steps_completed: usize,
    pub cancelled: bool,
    pub stars_formed: usize,
}

/// Owns a body set and advances it in whole steps.
///
/// # Example
/// ```
/// use rs_galaxy::galaxy::GalaxySimulation;
/// use rs_galaxy::utils::SimulationParams;
///
/// let params = SimulationParams { n_bodies: 300, ..SimulationParams::default() };
/// let (mut simulation, initial) = GalaxySimulation::initialize(params, Some(1)).unwrap();
/// assert_eq!(initial.len(), 300);
///
/// let snapshot = simulation.advance(5).unwrap();
/// assert_eq!(snapshot.step, 5);
/// assert_eq!(simulation.time(), 5.0 * params.dt);
/// ```
#[derive(Clone, Debug)]
pub struct GalaxySimulation {
    params: SimulationParams,
    bodies: Vec<Body>,
    integrator: LeapfrogIntegrator,
    time: f64,
    step_count: u64,
    tree_stats: TreeStats,
    stars_formed: usize,
}

impl GalaxySimulation {
    /// Validates `params`, samples the initial bodies and returns the first snapshot.
    ///
    /// Without a seed, [`DEFAULT_SEED`] is used, so runs are always reproducible.
    pub fn initialize(params: SimulationParams, seed: Option<u64>) -> Result<(Self, StateSnapshot), GalaxyError> {
        let seed = seed.unwrap_or(DEFAULT_SEED);
        let bodies = GalaxyInitializer::new(params)?.generate(seed)?;
        let simulation = Self::from_bodies(params, bodies)?;
        info!(
            "Initialized galaxy: {} bodies, total mass {:.3e}, seed {}",
            simulation.bodies.len(),
            params.total_mass(),
            seed
        );
        let snapshot = simulation.snapshot();
        Ok((simulation, snapshot))
    }

    /// Wraps an existing body set.
    pub fn from_bodies(params: SimulationParams, bodies: Vec<Body>) -> Result<Self, GalaxyError> {
        params.validate()?;
        validate_bodies(&bodies)?;
        Ok(Self {
            params,
            bodies,
            integrator: LeapfrogIntegrator::new(),
            time: 0.0,
            step_count: 0,
            tree_stats: TreeStats::default(),
            stars_formed: 0,
        })
    }

    /// Advances by `steps` steps and returns the resulting snapshot.
    ///
    /// `advance(0)` returns the current snapshot without touching the state.
    pub fn advance(&mut self, steps: usize) -> Result<StateSnapshot, AdvanceError> {
        self.run(steps, None).map(|progress| progress.snapshot)
    }

    /// Like [`GalaxySimulation::advance`], but stops early once `token` is cancelled.
    pub fn advance_cancellable(&mut self, steps: usize, token: &CancellationToken) -> Result<AdvanceProgress, AdvanceError> {
        self.run(steps, Some(token))
    }

    fn run(&mut self, steps: usize, cancel: Option<&CancellationToken>) -> Result<AdvanceProgress, AdvanceError> {
        if steps == 0 {
            return Ok(AdvanceProgress { snapshot: self.snapshot(), steps_completed: 0, cancelled: false, stars_formed: 0 });
        }

        match self.integrator.step_n(&mut self.bodies, &self.params, steps, cancel) {
            Ok(report) => {
                self.absorb(&report);
                Ok(AdvanceProgress {
                    snapshot: self.snapshot(),
                    steps_completed: report.steps_completed,
                    cancelled: report.cancelled,
                    stars_formed: report.stars_formed,
                })
            }
            Err(BatchError { error, completed }) => {
                self.absorb(&completed);
                warn!("Advance stopped at step {}: {}", self.step_count, error);
                Err(AdvanceError { error, completed_steps: completed.steps_completed, snapshot: self.snapshot() })
            }
        }
    }

    fn absorb(&mut self, report: &BatchReport) {
        self.time += report.simulated_time;
        self.step_count += report.steps_completed as u64;
        self.stars_formed += report.stars_formed;
        self.tree_stats.accumulate(&report.tree_stats);
        if report.tree_stats.capacity_exceeded > 0 {
            warn!(
                "{} bodies merged into depth-capped leaves over the last {} steps",
                report.tree_stats.capacity_exceeded, report.steps_completed
            );
        }
    }

    /// Replaces the body set, e.g. with a state received from a transport.
    pub fn replace_bodies(&mut self, bodies: Vec<Body>) -> Result<(), GalaxyError> {
        validate_bodies(&bodies)?;
        self.bodies = bodies;
        self.integrator.invalidate();
        Ok(())
    }

    pub fn invariants(&self) -> Invariants {
        compute_invariants(&self.bodies, self.params.g, self.params.softening, self.params.potential_sample_limit)
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot::capture(&self.bodies, self.step_count, self.time, self.params.max_snapshot_bodies)
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Cumulative tree counters since initialization.
    pub fn tree_stats(&self) -> TreeStats {
        self.tree_stats
    }

    pub fn stars_formed(&self) -> usize {
        self.stars_formed
    }
}
