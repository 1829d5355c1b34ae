use crate::galaxy::StateSnapshot;
use crate::models::{Body, BodyKind, Color, Vector3};
use crate::utils::GalaxyError;

fn bodies(n: usize) -> Vec<Body> {
    (0..n)
        .map(|i| {
            let kind = BodyKind::ALL[i % BodyKind::ALL.len()];
            let mut body = Body::new(Vector3::new(i as f64, -(i as f64), 0.5), Vector3::ZERO, 1.0, kind);
            body.color = Color::new(0.1, 0.2, i as f32);
            body
        })
        .collect()
}

#[test]
fn test_capture_all_bodies() {
    let set = bodies(5);
    let snapshot = StateSnapshot::capture(&set, 7, 3.5, 0);

    assert_eq!(snapshot.step, 7);
    assert_eq!(snapshot.time, 3.5);
    assert_eq!(snapshot.len(), 5);
    assert_eq!(snapshot.body_count, 5);
    assert!(!snapshot.is_downsampled());
    assert_eq!(snapshot.positions.len(), 15);
    assert_eq!(&snapshot.positions[6..9], &[2.0, -2.0, 0.5]);
    assert_eq!(&snapshot.colors[12..15], &[0.1, 0.2, 4.0]);
    assert_eq!(snapshot.kinds, vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_limit_above_count_keeps_everything() {
    let set = bodies(5);
    assert_eq!(StateSnapshot::capture(&set, 0, 0.0, 5).len(), 5);
    assert_eq!(StateSnapshot::capture(&set, 0, 0.0, 100).len(), 5);
}

#[test]
fn test_downsampling_uses_a_stride() {
    let set = bodies(1000);
    let snapshot = StateSnapshot::capture(&set, 0, 0.0, 300);

    // ceil(1000 / 300) = 4, so every 4th body
    assert_eq!(snapshot.len(), 250);
    assert!(snapshot.len() <= 300);
    assert!(snapshot.is_downsampled());
    assert_eq!(snapshot.body_count, 1000);
    assert_eq!(snapshot.positions[3], 4.0);
    assert_eq!(snapshot.kinds[1], BodyKind::ALL[4].tag());
}

#[test]
fn test_empty_snapshot() {
    let snapshot = StateSnapshot::capture(&[], 0, 0.0, 10);
    assert!(snapshot.is_empty());
    assert_eq!(snapshot.to_bytes().len(), StateSnapshot::HEADER_LEN);
}

#[test]
fn test_byte_layout() {
    let set = bodies(3);
    let snapshot = StateSnapshot::capture(&set, 42, 21.0, 0);
    let bytes = snapshot.to_bytes();

    assert_eq!(bytes.len(), StateSnapshot::HEADER_LEN + 3 * 3 * 4 * 2 + 3);
    assert_eq!(&bytes[0..4], &3u32.to_ne_bytes());
    assert_eq!(&bytes[4..12], &42u64.to_ne_bytes());
    assert_eq!(&bytes[12..20], &21.0f64.to_ne_bytes());
    // First position component of the second body.
    assert_eq!(&bytes[20 + 12..20 + 16], &1.0f32.to_ne_bytes());
    assert_eq!(&bytes[bytes.len() - 3..], &[0, 1, 2]);
}

#[test]
fn test_bytes_read_back() {
    let snapshot = StateSnapshot::capture(&bodies(17), 9, 4.5, 0);
    let decoded = StateSnapshot::from_bytes(&snapshot.to_bytes()).unwrap();
    assert_eq!(decoded, snapshot);
}

#[test]
fn test_truncated_bytes_are_rejected() {
    let bytes = StateSnapshot::capture(&bodies(4), 1, 1.0, 0).to_bytes();
    assert!(matches!(StateSnapshot::from_bytes(&bytes[..10]), Err(GalaxyError::InvalidState(_))));
    assert!(matches!(StateSnapshot::from_bytes(&bytes[..bytes.len() - 1]), Err(GalaxyError::InvalidState(_))));
}
