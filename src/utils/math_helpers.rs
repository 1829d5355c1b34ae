use std::f64::consts::PI;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use crate::models::Vector3;
use crate::utils::GalaxyError;

/// Zero-mean normal distribution, rejecting a negative or non-finite `std_dev`.
pub fn zero_mean_normal(std_dev: f64) -> Result<Normal<f64>, GalaxyError> {
    Normal::new(0.0, std_dev)
        .map_err(|e| GalaxyError::InvalidConfig(format!("dispersion {} is not a valid standard deviation: {}", std_dev, e)))
}

/// Uniformly distributed direction on the unit sphere.
///
/// Uses `θ = 2πu` for the azimuth and `φ = acos(1 - 2u)` for the polar angle.
pub fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> Vector3 {
    let theta = 2.0 * PI * rng.random::<f64>();
    let phi = (1.0 - 2.0 * rng.random::<f64>()).acos();
    Vector3::new(phi.sin() * theta.cos(), phi.sin() * theta.sin(), phi.cos())
}

/// Vector of three independent draws from `distribution`.
pub fn sample_vector<D, R>(distribution: &D, rng: &mut R) -> Vector3
where
    D: Distribution<f64>,
    R: Rng + ?Sized,
{
    Vector3::new(distribution.sample(rng), distribution.sample(rng), distribution.sample(rng))
}

/// Solves `f(x) = 0` on `[lo, hi]` with Newton-Raphson steps, falling back to bisection
/// whenever a step leaves the bracket. `f` must change sign over the bracket.
///
/// # Example
/// ```
/// use rs_galaxy::utils::bracketed_newton;
///
/// let root = bracketed_newton(|x| (x * x - 2.0, 2.0 * x), 0.0, 2.0, 1e-12, 64);
/// assert!((root - 2.0_f64.sqrt()).abs() < 1e-10);
/// ```
pub fn bracketed_newton<F>(f: F, lo: f64, hi: f64, tolerance: f64, max_iterations: usize) -> f64
where
    F: Fn(f64) -> (f64, f64),
{
    let (mut lo, mut hi) = (lo, hi);
    let f_lo = f(lo).0;
    if f_lo == 0.0 {
        return lo;
    }
    let rising = f_lo < 0.0;
    let mut x = 0.5 * (lo + hi);

    for _ in 0..max_iterations {
        let (value, slope) = f(x);
        if value.abs() < tolerance {
            return x;
        }
        if (value < 0.0) == rising {
            lo = x;
        } else {
            hi = x;
        }
        let newton = x - value / slope;
        x = if slope != 0.0 && newton.is_finite() && newton > lo && newton < hi {
            newton
        } else {
            0.5 * (lo + hi)
        };
        if hi - lo < tolerance {
            break;
        }
    }
    x
}

/// Linear interpolation between two RGB triples.
#[inline]
pub fn lerp_rgb(from: [f32; 3], to: [f32; 3], t: f32) -> [f32; 3] {
    let t = t.clamp(0.0, 1.0);
    [
        from[0] * (1.0 - t) + to[0] * t,
        from[1] * (1.0 - t) + to[1] * t,
        from[2] * (1.0 - t) + to[2] * t,
    ]
}
