use approx::assert_relative_eq;
use crate::models::Vector3;

#[test]
fn test_vector_arithmetic() {
    let a = Vector3::new(1.0, -2.0, 3.0);
    let b = Vector3::new(0.5, 0.5, -1.0);

    assert_eq!(a + b, Vector3::new(1.5, -1.5, 2.0));
    assert_eq!(a - b, Vector3::new(0.5, -2.5, 4.0));
    assert_eq!(a * 2.0, Vector3::new(2.0, -4.0, 6.0));
    assert_eq!(2.0 * a, a * 2.0);
    assert_eq!(a / 2.0, Vector3::new(0.5, -1.0, 1.5));
    assert_eq!(-a, Vector3::new(-1.0, 2.0, -3.0));

    let mut c = a;
    c += b;
    c -= b;
    c *= 3.0;
    assert_eq!(c, Vector3::new(3.0, -6.0, 9.0));
}

#[test]
fn test_dot_and_cross() {
    let x = Vector3::new(1.0, 0.0, 0.0);
    let y = Vector3::new(0.0, 1.0, 0.0);
    let z = Vector3::new(0.0, 0.0, 1.0);

    assert_eq!(x.dot(&y), 0.0);
    assert_eq!(x.cross(&y), z);
    assert_eq!(y.cross(&z), x);
    assert_eq!(z.cross(&x), y);
    // Anti-commutative
    assert_eq!(y.cross(&x), -z);
}

#[test]
fn test_norm_and_normalized() {
    let v = Vector3::new(3.0, 4.0, 12.0);
    assert_relative_eq!(v.norm(), 13.0, epsilon = 1e-12);
    assert_relative_eq!(v.normalized().norm(), 1.0, epsilon = 1e-12);
    assert_eq!(Vector3::ZERO.normalized(), Vector3::ZERO);
}

#[test]
fn test_component_min_max() {
    let a = Vector3::new(1.0, 5.0, -3.0);
    let b = Vector3::new(2.0, -1.0, 0.0);
    assert_eq!(a.min(&b), Vector3::new(1.0, -1.0, -3.0));
    assert_eq!(a.max(&b), Vector3::new(2.0, 5.0, 0.0));
    assert_eq!(a.max_component(), 5.0);
}

#[test]
fn test_is_finite() {
    assert!(Vector3::new(1.0, 2.0, 3.0).is_finite());
    assert!(!Vector3::new(f64::NAN, 0.0, 0.0).is_finite());
    assert!(!Vector3::new(0.0, f64::INFINITY, 0.0).is_finite());
}
