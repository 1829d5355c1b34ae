use std::fmt;
use std::error::Error;

/// Represents errors that can occur while configuring or advancing a galaxy simulation.
#[derive(Debug, Clone, PartialEq)]
pub enum GalaxyError {
    /// A parameter is outside its valid domain (negative mass or radius, fractions not summing to 1,
    /// non-positive opening angle, zero bodies, ...).
    InvalidConfig(String),
    /// A body carries a non-finite position, velocity or mass.
    InvalidState(String),
    /// All bodies coincide or the bounding cube collapsed; handled by padding the bounds.
    DegenerateGeometry,
    /// The octree reached its maximum depth; handled by merging colocated bodies into one leaf.
    CapacityExceeded { depth: usize },
}

impl fmt::Display for GalaxyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GalaxyError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            GalaxyError::InvalidState(msg) => write!(f, "Invalid simulation state: {}", msg),
            GalaxyError::DegenerateGeometry => write!(f, "Degenerate geometry: bounding cube padded to minimum extent"),
            GalaxyError::CapacityExceeded { depth } => write!(f, "Octree capacity exceeded at depth {}: colocated bodies merged", depth),
        }
    }
}

impl Error for GalaxyError {}
