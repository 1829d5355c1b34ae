use approx::assert_relative_eq;
use crate::galaxy::{CancellationToken, GalaxyInitializer, GalaxySimulation, StateSnapshot};
use crate::models::{Body, BodyKind, Vector3};
use crate::utils::{GalaxyError, SimulationParams};

fn mean_halo_radius(bodies: &[Body]) -> f64 {
    let radii: Vec<f64> = bodies.iter().filter(|b| b.kind == BodyKind::Halo).map(|b| b.position.norm()).collect();
    radii.iter().sum::<f64>() / radii.len() as f64
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn scenario_params() -> SimulationParams {
    SimulationParams {
        n_bodies: 1000,
        galaxy_radius: 50.0,
        bulge_radius: 10.0,
        g: 4.3e-6,
        theta: 0.5,
        dt: 0.5,
        ..SimulationParams::default()
    }
}

#[test]
fn test_reference_scenario_hundred_steps() {
    init_logger();
    let params = scenario_params();
    let (mut simulation, initial) = GalaxySimulation::initialize(params, None).unwrap();
    assert_eq!(initial.len(), 1000);
    assert_eq!(initial.step, 0);

    let start = simulation.invariants();
    assert!(!start.potential_sampled);
    assert!(start.total_energy < 0.0, "galaxy should start bound");
    let start_mass: f64 = simulation.bodies().iter().map(|b| b.mass).sum();

    let snapshot = simulation.advance(100).unwrap();
    assert_eq!(snapshot.step, 100);
    assert_eq!(simulation.step_count(), 100);
    assert_relative_eq!(simulation.time(), 50.0, epsilon = 1e-9);

    assert!(simulation.bodies().iter().all(Body::is_finite));
    assert!(snapshot.positions.iter().all(|p| p.is_finite()));
    let end_mass: f64 = simulation.bodies().iter().map(|b| b.mass).sum();
    assert_eq!(end_mass, start_mass);

    let end = simulation.invariants();
    let drift = end.relative_energy_drift(&start);
    assert!(drift < 0.05, "relative energy drift {}", drift);

    let expected = GalaxyInitializer::new(params).unwrap().nfw_mean_radius();
    let halo_radius = mean_halo_radius(simulation.bodies());
    assert!(
        (halo_radius / expected - 1.0).abs() < 0.25,
        "halo mean radius {} vs NFW mean {}",
        halo_radius,
        expected
    );
}

#[test]
fn test_same_seed_same_trajectory() {
    let params = SimulationParams { n_bodies: 400, ..scenario_params() };
    let (mut a, first_a) = GalaxySimulation::initialize(params, Some(99)).unwrap();
    let (mut b, first_b) = GalaxySimulation::initialize(params, Some(99)).unwrap();
    assert_eq!(first_a, first_b);

    assert_eq!(a.advance(10).unwrap(), b.advance(10).unwrap());
    assert_eq!(a.bodies(), b.bodies());

    let (c, first_c) = GalaxySimulation::initialize(params, Some(100)).unwrap();
    assert_ne!(first_a.positions, first_c.positions);
    assert_eq!(c.step_count(), 0);
}

#[test]
fn test_default_seed_is_fixed() {
    let params = SimulationParams { n_bodies: 50, ..scenario_params() };
    let (_, implicit) = GalaxySimulation::initialize(params, None).unwrap();
    let (_, explicit) = GalaxySimulation::initialize(params, Some(crate::utils::DEFAULT_SEED)).unwrap();
    assert_eq!(implicit, explicit);
}

#[test]
fn test_advance_zero_is_a_no_op() {
    let params = SimulationParams { n_bodies: 100, ..scenario_params() };
    let (mut simulation, initial) = GalaxySimulation::initialize(params, Some(3)).unwrap();
    let bodies = simulation.bodies().to_vec();

    let snapshot = simulation.advance(0).unwrap();
    assert_eq!(snapshot, initial);
    assert_eq!(simulation.bodies(), bodies.as_slice());
    assert_eq!(simulation.step_count(), 0);
    assert_eq!(simulation.time(), 0.0);
}

#[test]
fn test_invalid_config_fails_initialize() {
    let bad = SimulationParams { theta: 0.0, ..scenario_params() };
    assert!(matches!(GalaxySimulation::initialize(bad, None), Err(GalaxyError::InvalidConfig(_))));

    let bad = SimulationParams { n_bodies: 0, ..scenario_params() };
    assert!(matches!(GalaxySimulation::initialize(bad, None), Err(GalaxyError::InvalidConfig(_))));
}

#[test]
fn test_non_finite_bodies_are_refused() {
    let params = scenario_params();
    let mut bodies = vec![Body::new(Vector3::ZERO, Vector3::ZERO, 1.0, BodyKind::Halo); 3];
    bodies[1].velocity.x = f64::NAN;
    assert!(matches!(GalaxySimulation::from_bodies(params, bodies.clone()), Err(GalaxyError::InvalidState(_))));

    bodies[1].velocity.x = 0.0;
    let mut simulation = GalaxySimulation::from_bodies(params, bodies.clone()).unwrap();
    bodies[2].position.y = f64::INFINITY;
    assert!(simulation.replace_bodies(bodies).is_err());
    assert!(simulation.bodies().iter().all(Body::is_finite));
}

#[test]
fn test_failed_advance_rolls_back_to_last_good_state() {
    init_logger();
    // The runaway body overflows to infinity on its second drift.
    let params = SimulationParams { use_tree_algorithm: false, dt: 1.0, min_dt: 0.5, ..scenario_params() };
    let runaway = 0.6 * f64::MAX;
    let bodies = vec![
        Body::new(Vector3::ZERO, Vector3::ZERO, 1.0, BodyKind::Halo),
        Body::new(Vector3::ZERO, Vector3::new(runaway, 0.0, 0.0), 1.0, BodyKind::Halo),
    ];
    let mut simulation = GalaxySimulation::from_bodies(params, bodies).unwrap();

    let err = simulation.advance(10).unwrap_err();
    assert!(matches!(err.error, GalaxyError::InvalidState(_)));
    assert_eq!(err.completed_steps, 1);
    assert_eq!(err.snapshot.step, 1);
    assert_eq!(err.snapshot, simulation.snapshot());

    assert_eq!(simulation.step_count(), 1);
    assert_eq!(simulation.time(), 1.0);
    assert!(simulation.bodies().iter().all(Body::is_finite));
    assert_eq!(simulation.bodies()[1].position.x, runaway);
    assert!(err.to_string().contains("after 1 steps"));
}

#[test]
fn test_cancelled_advance_reports_partial_progress() {
    let params = SimulationParams { n_bodies: 100, ..scenario_params() };
    let (mut simulation, initial) = GalaxySimulation::initialize(params, Some(5)).unwrap();
    let token = CancellationToken::new();
    token.cancel();

    let progress = simulation.advance_cancellable(20, &token).unwrap();
    assert!(progress.cancelled);
    assert_eq!(progress.steps_completed, 0);
    assert_eq!(progress.snapshot, initial);

    token.reset();
    let progress = simulation.advance_cancellable(3, &token).unwrap();
    assert!(!progress.cancelled);
    assert_eq!(progress.steps_completed, 3);
    assert_eq!(progress.snapshot.step, 3);
}

#[test]
fn test_snapshot_respects_body_limit() {
    let params = SimulationParams { n_bodies: 500, max_snapshot_bodies: 100, ..scenario_params() };
    let (simulation, snapshot) = GalaxySimulation::initialize(params, Some(8)).unwrap();
    assert_eq!(snapshot.len(), 100);
    assert_eq!(snapshot.body_count, 500);
    assert_eq!(simulation.snapshot(), snapshot);

    let decoded = StateSnapshot::from_bytes(&snapshot.to_bytes()).unwrap();
    assert_eq!(decoded.positions, snapshot.positions);
}

#[test]
fn test_replaced_bodies_are_integrated() {
    let params = SimulationParams { n_bodies: 20, ..scenario_params() };
    let (mut simulation, _) = GalaxySimulation::initialize(params, Some(2)).unwrap();
    let bodies = vec![
        Body::new(Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 0.1, 0.0), 1.0, BodyKind::Disk),
        Body::new(Vector3::new(-1.0, 0.0, 0.0), Vector3::new(0.0, -0.1, 0.0), 1.0, BodyKind::Disk),
    ];
    simulation.replace_bodies(bodies).unwrap();
    let snapshot = simulation.advance(2).unwrap();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(simulation.tree_stats().capacity_exceeded, 0);
}
