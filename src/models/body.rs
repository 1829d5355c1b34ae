use serde::{Deserialize, Serialize};
use crate::models::Vector3;

/// Classification tag of a body. Determines its initial distribution and its
/// per-step secondary update. The only transition is `Gas` → `Disk`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyKind {
    CentralMass,
    Bulge,
    Disk,
    Halo,
    Gas,
}

impl BodyKind {
    pub const ALL: [BodyKind; 5] = [
        BodyKind::CentralMass,
        BodyKind::Bulge,
        BodyKind::Disk,
        BodyKind::Halo,
        BodyKind::Gas,
    ];

    /// Compact tag used in snapshots.
    pub fn tag(self) -> u8 {
        match self {
            BodyKind::CentralMass => 0,
            BodyKind::Bulge => 1,
            BodyKind::Disk => 2,
            BodyKind::Halo => 3,
            BodyKind::Gas => 4,
        }
    }

    pub fn from_tag(tag: u8) -> Option<BodyKind> {
        match tag {
            0 => Some(BodyKind::CentralMass),
            1 => Some(BodyKind::Bulge),
            2 => Some(BodyKind::Disk),
            3 => Some(BodyKind::Halo),
            4 => Some(BodyKind::Gas),
            _ => None,
        }
    }

    /// Stars age and change colour; gas, halo and the central mass do not.
    pub fn is_stellar(self) -> bool {
        matches!(self, BodyKind::Bulge | BodyKind::Disk)
    }
}

/// An RGB colour in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<[f32; 3]> for Color {
    fn from(c: [f32; 3]) -> Self {
        Color::new(c[0], c[1], c[2])
    }
}

/// A point mass of the simulation.
///
/// `color`, `radius`, `temperature`, `age` and `metallicity` are auxiliary payload for
/// renderers; the force solver only reads `position` and `mass`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub position: Vector3,
    pub velocity: Vector3,
    pub mass: f64,
    pub kind: BodyKind,
    pub color: Color,
    pub radius: f64,
    pub temperature: f64,
    pub age: f64,
    pub metallicity: f64,
}

impl Body {
    /// Creates a body with neutral auxiliary attributes.
    ///
    /// # Example
    /// ```
    /// use rs_galaxy::models::{Body, BodyKind, Vector3};
    ///
    /// let body = Body::new(Vector3::new(1.0, 0.0, 0.0), Vector3::ZERO, 2.0, BodyKind::Disk);
    /// assert_eq!(body.mass, 2.0);
    /// assert_eq!(body.age, 0.0);
    /// assert!(body.is_finite());
    /// ```
    pub fn new(position: Vector3, velocity: Vector3, mass: f64, kind: BodyKind) -> Self {
        Self {
            position,
            velocity,
            mass,
            kind,
            color: Color::new(1.0, 1.0, 1.0),
            radius: 1.0,
            temperature: 0.0,
            age: 0.0,
            metallicity: 0.0,
        }
    }

    /// True when position, velocity and mass are all finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite() && self.mass.is_finite()
    }

    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.velocity.norm_squared()
    }

    pub fn momentum(&self) -> Vector3 {
        self.velocity * self.mass
    }

    /// Orbital angular momentum about the origin, `m (r × v)`.
    pub fn angular_momentum(&self) -> Vector3 {
        self.position.cross(&self.velocity) * self.mass
    }
}
