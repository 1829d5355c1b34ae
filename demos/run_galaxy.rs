// demos/run_galaxy.rs
// Usage: cargo run --example run_galaxy -- [steps] [bodies] [--direct] [--compare] [--config FILE]

use std::time::Instant;
use rs_galaxy::galaxy::{compute_direct_forces, compute_tree_forces, GalaxySimulation, Octree};
use rs_galaxy::utils::SimulationParams;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut steps = 500usize;
    let mut n_bodies = None;
    let mut direct = false;
    let mut compare = false;
    let mut config = None;

    let mut args = std::env::args().skip(1);
    let mut positional = 0;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--direct" => direct = true,
            "--compare" => compare = true,
            "--config" => config = args.next(),
            value => {
                match positional {
                    0 => steps = value.parse()?,
                    _ => n_bodies = Some(value.parse()?),
                }
                positional += 1;
            }
        }
    }

    let mut params = match config {
        Some(path) => SimulationParams::from_yaml_str(&std::fs::read_to_string(path)?)?,
        None => SimulationParams::default(),
    };
    if let Some(n) = n_bodies {
        params.n_bodies = n;
    }
    if direct {
        params.use_tree_algorithm = false;
    }

    let (mut simulation, _) = GalaxySimulation::initialize(params, None)?;
    println!("Galaxy with {} bodies, total mass {:.3e}", simulation.bodies().len(), params.total_mass());

    if compare {
        let bodies = simulation.bodies();
        let start = Instant::now();
        let tree = Octree::build(bodies, params.max_tree_depth);
        let tree_forces = compute_tree_forces(&tree, bodies, params.g, params.softening, params.theta);
        let tree_time = start.elapsed();

        let start = Instant::now();
        let direct_forces = compute_direct_forces(bodies, params.g, params.softening);
        let direct_time = start.elapsed();

        let mean_error = tree_forces
            .iter()
            .zip(&direct_forces)
            .filter(|(_, exact)| exact.norm() > 0.0)
            .map(|(approx, exact)| (*approx - *exact).norm() / exact.norm())
            .sum::<f64>()
            / direct_forces.len().max(1) as f64;
        println!(
            "Barnes-Hut: {:?}, direct: {:?}, speedup {:.1}x, mean relative error {:.2e}",
            tree_time,
            direct_time,
            direct_time.as_secs_f64() / tree_time.as_secs_f64().max(1e-12),
            mean_error
        );
    }

    let reference = simulation.invariants();
    println!("Initial energy {:.6e}, virial ratio {:.3}", reference.total_energy, reference.virial_ratio);

    let mut done = 0;
    while done < steps {
        let batch = (steps - done).min(100);
        let snapshot = simulation.advance(batch)?;
        done += batch;

        let current = simulation.invariants();
        println!(
            "step {:>6}  t = {:>9.2}  drift {:.3e}  virial {:.3}  stars formed {}",
            snapshot.step,
            snapshot.time,
            current.relative_energy_drift(&reference),
            current.virial_ratio,
            simulation.stars_formed()
        );
    }

    let stats = simulation.tree_stats();
    if stats.capacity_exceeded > 0 {
        println!("{} leaf merges at the depth cap", stats.capacity_exceeded);
    }
    Ok(())
}
