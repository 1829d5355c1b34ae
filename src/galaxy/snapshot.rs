use serde::Serialize;
use crate::models::Body;
use crate::utils::GalaxyError;

/// Flat, renderer-friendly view of the body set at one point in time.
///
/// Positions and colours are interleaved `xyz` / `rgb` triples in `f32`; `kinds` holds the
/// [`BodyKind::tag`](crate::models::BodyKind::tag) of each body.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StateSnapshot {
    pub step: u64,
    pub time: f64,
    /// Number of bodies in the simulation, which may exceed the number captured.
    pub body_count: usize,
    pub positions: Vec<f32>,
    pub colors: Vec<f32>,
    pub kinds: Vec<u8>,
}

impl StateSnapshot {
    /// Size of the byte header: `u32` count, `u64` step, `f64` time.
    pub const HEADER_LEN: usize = 4 + 8 + 8;

    /// Captures `bodies`, keeping every `ceil(N / max_bodies)`-th body when `max_bodies` is
    /// non-zero and smaller than the body count.
    ///
    /// # Example
    /// ```
    /// use rs_galaxy::galaxy::StateSnapshot;
    /// use rs_galaxy::models::{Body, BodyKind, Vector3};
    ///
    /// let bodies: Vec<Body> = (0..10)
    ///     .map(|i| Body::new(Vector3::new(i as f64, 0.0, 0.0), Vector3::ZERO, 1.0, BodyKind::Disk))
    ///     .collect();
    ///
    /// let full = StateSnapshot::capture(&bodies, 3, 1.5, 0);
    /// assert_eq!(full.len(), 10);
    ///
    /// let reduced = StateSnapshot::capture(&bodies, 3, 1.5, 4);
    /// assert_eq!(reduced.len(), 4);
    /// assert_eq!(reduced.body_count, 10);
    /// assert_eq!(&reduced.positions[..6], &[0.0, 0.0, 0.0, 3.0, 0.0, 0.0]);
    /// ```
    pub fn capture(bodies: &[Body], step: u64, time: f64, max_bodies: usize) -> Self {
        let stride = if max_bodies == 0 || bodies.len() <= max_bodies {
            1
        } else {
            bodies.len().div_ceil(max_bodies)
        };
        let captured = bodies.len().div_ceil(stride);

        let mut positions = Vec::with_capacity(3 * captured);
        let mut colors = Vec::with_capacity(3 * captured);
        let mut kinds = Vec::with_capacity(captured);
        for body in bodies.iter().step_by(stride) {
            positions.extend_from_slice(&body.position.to_f32_array());
            colors.extend_from_slice(&body.color.to_array());
            kinds.push(body.kind.tag());
        }

        Self { step, time, body_count: bodies.len(), positions, colors, kinds }
    }

    /// Number of captured bodies.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn is_downsampled(&self) -> bool {
        self.len() < self.body_count
    }

    /// Packs the snapshot as: header, positions, colours, kinds. Native endianness.
    pub fn to_bytes(&self) -> Vec<u8> {
        let positions: &[u8] = bytemuck::cast_slice(&self.positions);
        let colors: &[u8] = bytemuck::cast_slice(&self.colors);

        let mut bytes = Vec::with_capacity(Self::HEADER_LEN + positions.len() + colors.len() + self.kinds.len());
        bytes.extend_from_slice(bytemuck::bytes_of(&(self.len() as u32)));
        bytes.extend_from_slice(bytemuck::bytes_of(&self.step));
        bytes.extend_from_slice(bytemuck::bytes_of(&self.time));
        bytes.extend_from_slice(positions);
        bytes.extend_from_slice(colors);
        bytes.extend_from_slice(&self.kinds);
        bytes
    }

    /// Reads back the layout of [`StateSnapshot::to_bytes`]. The body count of the result is
    /// the captured count.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GalaxyError> {
        if bytes.len() < Self::HEADER_LEN {
            return Err(GalaxyError::InvalidState(format!("snapshot of {} bytes has no header", bytes.len())));
        }
        let count = bytemuck::pod_read_unaligned::<u32>(&bytes[0..4]) as usize;
        let step = bytemuck::pod_read_unaligned::<u64>(&bytes[4..12]);
        let time = bytemuck::pod_read_unaligned::<f64>(&bytes[12..20]);

        let float_bytes = 3 * count * std::mem::size_of::<f32>();
        let expected = Self::HEADER_LEN + 2 * float_bytes + count;
        if bytes.len() != expected {
            return Err(GalaxyError::InvalidState(format!(
                "snapshot of {} bodies needs {} bytes, got {}",
                count, expected, bytes.len()
            )));
        }

        let read_floats = |range: &[u8]| -> Vec<f32> {
            range.chunks_exact(4).map(bytemuck::pod_read_unaligned::<f32>).collect()
        };
        let body = &bytes[Self::HEADER_LEN..];
        Ok(Self {
            step,
            time,
            body_count: count,
            positions: read_floats(&body[..float_bytes]),
            colors: read_floats(&body[float_bytes..2 * float_bytes]),
            kinds: body[2 * float_bytes..].to_vec(),
        })
    }
}
