pub mod octree;
pub mod force_solver;
pub mod evolution;
pub mod diagnostics;
pub mod initializer;
pub mod integrator;
pub mod snapshot;
pub mod simulation;

pub use octree::*;
pub use force_solver::*;
pub use evolution::*;
pub use diagnostics::*;
pub use initializer::*;
pub use integrator::*;
pub use snapshot::*;
pub use simulation::*;

#[cfg(test)]
mod integrator_tests;
#[cfg(test)]
mod snapshot_tests;
#[cfg(test)]
mod simulation_tests;
