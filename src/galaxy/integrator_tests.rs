use approx::assert_relative_eq;
use crate::galaxy::{choose_timestep, compute_invariants, CancellationToken, LeapfrogIntegrator};
use crate::models::{Body, BodyKind, Vector3};
use crate::utils::{GalaxyError, SimulationParams};

fn binary_params() -> SimulationParams {
    SimulationParams { g: 1.0, softening: 0.01, dt: 0.01, min_dt: 0.001, ..SimulationParams::default() }
}

/// Two unit masses on a circular orbit of radius 1 about their common centre.
fn binary() -> Vec<Body> {
    vec![
        Body::new(Vector3::new(-1.0, 0.0, 0.0), Vector3::new(0.0, -0.5, 0.0), 1.0, BodyKind::Disk),
        Body::new(Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 0.5, 0.0), 1.0, BodyKind::Disk),
    ]
}

#[test]
fn test_circular_binary_conserves_energy_and_momentum() {
    let params = binary_params();
    let mut bodies = binary();
    let start = compute_invariants(&bodies, params.g, params.softening, 100);

    let mut integrator = LeapfrogIntegrator::new();
    let report = integrator.step_n(&mut bodies, &params, 500, None).unwrap();
    assert_eq!(report.steps_completed, 500);
    assert!(!report.cancelled);
    assert_relative_eq!(report.simulated_time, 5.0, epsilon = 1e-9);

    let end = compute_invariants(&bodies, params.g, params.softening, 100);
    assert!(end.relative_energy_drift(&start) < 1e-4, "drift {}", end.relative_energy_drift(&start));
    assert!(end.linear_momentum.norm() < 1e-12);
    assert_relative_eq!(end.angular_momentum.z, start.angular_momentum.z, max_relative = 1e-9);
    // Still on a radius-1 orbit.
    assert_relative_eq!(bodies[1].position.norm(), 1.0, epsilon = 1e-2);
}

#[test]
fn test_cached_accelerations_match_independent_steps() {
    let params = SimulationParams { use_tree_algorithm: false, ..binary_params() };
    let mut fused = binary();
    let mut independent = binary();

    let mut cached = LeapfrogIntegrator::new();
    let mut fresh = LeapfrogIntegrator::new();
    for _ in 0..20 {
        cached.step(&mut fused, &params).unwrap();
        fresh.invalidate();
        fresh.step(&mut independent, &params).unwrap();
    }
    assert!(cached.has_cached_accelerations());
    assert_eq!(fused, independent);
}

#[test]
fn test_invalid_mass_is_rejected_without_mutation() {
    let params = binary_params();
    let mut bodies = binary();
    bodies.push(Body::new(Vector3::new(0.0, 3.0, 0.0), Vector3::ZERO, f64::INFINITY, BodyKind::Halo));
    let before = bodies.clone();

    let mut integrator = LeapfrogIntegrator::new();
    let err = integrator.step(&mut bodies, &params).unwrap_err();
    assert!(matches!(err, GalaxyError::InvalidState(_)));
    assert_eq!(bodies, before);
    assert!(!integrator.has_cached_accelerations());
}

#[test]
fn test_overflowing_drift_rolls_back() {
    let params = SimulationParams { use_tree_algorithm: false, dt: 1.0, ..binary_params() };
    let mut bodies = vec![
        Body::new(Vector3::ZERO, Vector3::ZERO, 1.0, BodyKind::Halo),
        Body::new(Vector3::new(f64::MAX / 2.0, 0.0, 0.0), Vector3::new(f64::MAX, 0.0, 0.0), 1.0, BodyKind::Halo),
    ];
    let before = bodies.clone();

    let mut integrator = LeapfrogIntegrator::new();
    let err = integrator.step(&mut bodies, &params).unwrap_err();
    assert!(matches!(err, GalaxyError::InvalidState(_)));
    assert_eq!(bodies, before);
}

#[test]
fn test_failed_batch_keeps_completed_steps() {
    let params = SimulationParams { use_tree_algorithm: false, dt: 1.0, ..binary_params() };
    let runaway = 0.6 * f64::MAX;
    let mut bodies = vec![
        Body::new(Vector3::ZERO, Vector3::ZERO, 1.0, BodyKind::Halo),
        Body::new(Vector3::ZERO, Vector3::new(runaway, 0.0, 0.0), 1.0, BodyKind::Halo),
    ];

    let mut integrator = LeapfrogIntegrator::new();
    let err = integrator.step_n(&mut bodies, &params, 5, None).unwrap_err();
    assert_eq!(err.completed.steps_completed, 1);
    assert!(matches!(err.error, GalaxyError::InvalidState(_)));
    // The first step was committed, the second rolled back.
    assert_eq!(bodies[1].position.x, runaway);
    assert!(bodies.iter().all(Body::is_finite));
}

#[test]
fn test_cancelled_batch_stops_before_stepping() {
    let params = binary_params();
    let mut bodies = binary();
    let before = bodies.clone();
    let token = CancellationToken::new();
    token.cancel();

    let mut integrator = LeapfrogIntegrator::new();
    let report = integrator.step_n(&mut bodies, &params, 10, Some(&token)).unwrap();
    assert!(report.cancelled);
    assert_eq!(report.steps_completed, 0);
    assert_eq!(report.simulated_time, 0.0);
    assert_eq!(bodies, before);

    token.reset();
    let report = integrator.step_n(&mut bodies, &params, 10, Some(&token)).unwrap();
    assert!(!report.cancelled);
    assert_eq!(report.steps_completed, 10);
}

#[test]
fn test_fixed_and_adaptive_timestep() {
    let fixed = binary_params();
    let accelerations = vec![Vector3::new(4.0, 0.0, 0.0), Vector3::new(0.0, 1.0, 0.0)];
    assert_eq!(choose_timestep(&accelerations, &fixed), fixed.dt);

    let adaptive = SimulationParams {
        adaptive_timestep: true,
        softening: 1.0,
        dt: 0.5,
        timestep_accuracy: 0.2,
        min_dt: 0.01,
        ..SimulationParams::default()
    };
    // 0.2 * sqrt(1 / 4)
    assert_relative_eq!(choose_timestep(&accelerations, &adaptive), 0.1, epsilon = 1e-15);
    // Weak fields keep the configured dt.
    assert_eq!(choose_timestep(&[Vector3::new(1e-6, 0.0, 0.0)], &adaptive), 0.5);
    // Strong fields are clamped to min_dt.
    assert_eq!(choose_timestep(&[Vector3::new(1e6, 0.0, 0.0)], &adaptive), 0.01);
    // No acceleration at all.
    assert_eq!(choose_timestep(&[Vector3::ZERO], &adaptive), 0.5);
}

#[test]
fn test_adaptive_step_is_reported() {
    let params = SimulationParams { adaptive_timestep: true, timestep_accuracy: 0.001, ..binary_params() };
    let mut bodies = binary();
    let report = LeapfrogIntegrator::new().step(&mut bodies, &params).unwrap();
    assert!(report.dt < params.dt);
    assert!(report.dt >= params.min_dt);
}

#[test]
fn test_dense_cold_gas_forms_stars_during_step() {
    for use_tree_algorithm in [true, false] {
        let params = SimulationParams { use_tree_algorithm, ..SimulationParams::default() };
        let mut bodies: Vec<Body> = [-0.005, 0.005]
            .iter()
            .map(|x| {
                let mut gas = Body::new(Vector3::new(*x, 0.0, 0.0), Vector3::ZERO, 1.0, BodyKind::Gas);
                gas.temperature = 1_000.0;
                gas
            })
            .collect();

        let report = LeapfrogIntegrator::new().step(&mut bodies, &params).unwrap();
        assert_eq!(report.stars_formed, 2);
        assert!(bodies.iter().all(|b| b.kind == BodyKind::Disk && b.age == 0.0));
    }
}

#[test]
fn test_stars_age_each_step() {
    let params = binary_params();
    let mut bodies = binary();
    let mut integrator = LeapfrogIntegrator::new();
    integrator.step_n(&mut bodies, &params, 4, None).unwrap();
    for body in &bodies {
        assert_relative_eq!(body.age, 4.0 * params.dt, epsilon = 1e-12);
    }
}
