//! # Noise Field
//!
//! Deterministic seeded simplex noise in two and three dimensions, plus the
//! fractal compositions the terrain generator builds on:
//!
//! - **FBM**: sum of octaves at increasing frequency and decreasing amplitude
//! - **Turbulence**: FBM over `|noise|`
//! - **Ridge**: FBM over `offset - |noise|`, producing sharp crests
//!
//! Every composition divides by the accumulated amplitude, so the output stays
//! bounded regardless of the octave count.
//!
//! Sampling is delegated to [`noise::Simplex`], whose permutation table is
//! shuffled from a `u32` seed; the `u64` world seed is folded down to one. The
//! field is a pure function of `(seed, coordinates)` and holds no interior
//! state, so each worker can own its own copy.

use noise::{NoiseFn, Simplex};

use crate::config::FractalParams;

/// Seeded simplex noise source.
#[derive(Clone, Debug)]
pub struct NoiseField {
    seed: u64,
    simplex: Simplex,
}

impl NoiseField {
    /// Creates the field for `seed`.
    pub fn new(seed: u64) -> Self {
        NoiseField {
            seed,
            simplex: Simplex::new(fold_seed(seed)),
        }
    }

    /// The seed this field was built from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// 2-D simplex noise in `[-1, 1]`.
    pub fn noise_2d(&self, x: f64, y: f64) -> f64 {
        self.simplex.get([x, y]).clamp(-1.0, 1.0)
    }

    /// 3-D simplex noise in `[-1, 1]`.
    pub fn noise_3d(&self, x: f64, y: f64, z: f64) -> f64 {
        self.simplex.get([x, y, z]).clamp(-1.0, 1.0)
    }

    /// Fractal Brownian motion over 2-D noise.
    pub fn fbm_2d(&self, x: f64, y: f64, params: &FractalParams) -> f64 {
        accumulate(params, |f| self.noise_2d(x * f, y * f))
    }

    /// Fractal Brownian motion over 3-D noise.
    pub fn fbm_3d(&self, x: f64, y: f64, z: f64, params: &FractalParams) -> f64 {
        accumulate(params, |f| self.noise_3d(x * f, y * f, z * f))
    }

    /// Turbulence over 2-D noise, in `[0, 1]`.
    pub fn turbulence_2d(&self, x: f64, y: f64, params: &FractalParams) -> f64 {
        accumulate(params, |f| self.noise_2d(x * f, y * f).abs())
    }

    /// Turbulence over 3-D noise, in `[0, 1]`.
    pub fn turbulence_3d(&self, x: f64, y: f64, z: f64, params: &FractalParams) -> f64 {
        accumulate(params, |f| self.noise_3d(x * f, y * f, z * f).abs())
    }

    /// Ridged noise over 2-D noise, in `[offset - 1, offset]`.
    pub fn ridge_2d(&self, x: f64, y: f64, params: &FractalParams, offset: f64) -> f64 {
        accumulate(params, |f| offset - self.noise_2d(x * f, y * f).abs())
    }

    /// Ridged noise over 3-D noise, in `[offset - 1, offset]`.
    pub fn ridge_3d(&self, x: f64, y: f64, z: f64, params: &FractalParams, offset: f64) -> f64 {
        accumulate(params, |f| offset - self.noise_3d(x * f, y * f, z * f).abs())
    }
}

impl NoiseFn<f64, 2> for NoiseField {
    fn get(&self, point: [f64; 2]) -> f64 {
        self.noise_2d(point[0], point[1])
    }
}

impl NoiseFn<f64, 3> for NoiseField {
    fn get(&self, point: [f64; 3]) -> f64 {
        self.noise_3d(point[0], point[1], point[2])
    }
}

/// Folds a `u64` seed into the `u32` the `noise` crate takes. Seeds that
/// differ only in their high half still map to different values.
#[inline]
fn fold_seed(seed: u64) -> u32 {
    (seed ^ (seed >> 32)) as u32
}

/// Sums `octave(frequency) * amplitude` over the configured octaves and
/// normalizes by the total amplitude. Zero octaves yield `0.0`.
fn accumulate(params: &FractalParams, mut octave: impl FnMut(f64) -> f64) -> f64 {
    let mut total = 0.0;
    let mut frequency = params.scale;
    let mut amplitude = 1.0;
    let mut max_amplitude = 0.0;

    for _ in 0..params.octaves {
        total += octave(frequency) * amplitude;
        max_amplitude += amplitude;
        amplitude *= params.persistence;
        frequency *= params.lacunarity;
    }

    if max_amplitude == 0.0 {
        0.0
    } else {
        total / max_amplitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample_points() -> impl Iterator<Item = (f64, f64, f64)> {
        (0..2000).map(|i| {
            let f = i as f64;
            (f * 0.173 - 150.0, f * 0.311 - 90.0, f * 0.057 + 3.0)
        })
    }

    #[test]
    fn same_seed_is_bit_identical() {
        let a = NoiseField::new(42);
        let b = NoiseField::new(42);
        for (x, y, z) in sample_points() {
            assert_eq!(a.noise_2d(x, y).to_bits(), b.noise_2d(x, y).to_bits());
            assert_eq!(a.noise_3d(x, y, z).to_bits(), b.noise_3d(x, y, z).to_bits());
        }
    }

    #[test]
    fn different_seeds_differ() {
        let a = NoiseField::new(1);
        let b = NoiseField::new(2);
        let differing = sample_points()
            .filter(|&(x, y, _)| a.noise_2d(x, y) != b.noise_2d(x, y))
            .count();
        assert!(differing > 1000);
    }

    #[test]
    fn output_is_bounded() {
        let field = NoiseField::new(7);
        let params = FractalParams::new(6, 0.5, 2.0, 0.05);
        for (x, y, z) in sample_points() {
            assert!((-1.0..=1.0).contains(&field.noise_2d(x, y)));
            assert!((-1.0..=1.0).contains(&field.noise_3d(x, y, z)));
            assert!((-1.0..=1.0).contains(&field.fbm_2d(x, y, &params)));
            assert!((-1.0..=1.0).contains(&field.fbm_3d(x, y, z, &params)));
            assert!((0.0..=1.0).contains(&field.turbulence_2d(x, y, &params)));
            assert!((0.0..=1.0).contains(&field.turbulence_3d(x, y, z, &params)));
            assert!((0.0..=1.0).contains(&field.ridge_2d(x, y, &params, 1.0)));
            assert!((0.0..=1.0).contains(&field.ridge_3d(x, y, z, &params, 1.0)));
        }
    }

    #[test]
    fn small_steps_change_little() {
        let field = NoiseField::new(3);
        for (x, y, z) in sample_points() {
            let d2 = (field.noise_2d(x, y) - field.noise_2d(x + 1e-4, y)).abs();
            let d3 = (field.noise_3d(x, y, z) - field.noise_3d(x, y, z + 1e-4)).abs();
            assert!(d2 < 1e-2, "2-D jump {d2} at ({x}, {y})");
            assert!(d3 < 1e-2, "3-D jump {d3} at ({x}, {y}, {z})");
        }
    }

    #[test]
    fn matches_the_seeded_simplex_source() {
        let field = NoiseField::new(11);
        let simplex = Simplex::new(11);
        for (x, y, z) in sample_points().take(100) {
            assert_abs_diff_eq!(field.noise_2d(x, y), simplex.get([x, y]).clamp(-1.0, 1.0));
            assert_abs_diff_eq!(field.noise_3d(x, y, z), simplex.get([x, y, z]).clamp(-1.0, 1.0));
        }
    }

    #[test]
    fn high_seed_bits_matter() {
        assert_ne!(fold_seed(1), fold_seed(1 | (7 << 32)));
        assert_eq!(NoiseField::new(1 << 40).seed(), 1 << 40);
    }

    #[test]
    fn zero_octaves_yield_zero() {
        let field = NoiseField::new(5);
        let params = FractalParams::new(0, 0.5, 2.0, 0.02);
        assert_eq!(field.fbm_2d(10.0, 20.0, &params), 0.0);
    }

    #[test]
    fn noise_fn_matches_inherent_methods() {
        let field = NoiseField::new(9);
        assert_eq!(NoiseFn::<f64, 2>::get(&field, [1.5, -2.25]), field.noise_2d(1.5, -2.25));
        assert_eq!(
            NoiseFn::<f64, 3>::get(&field, [1.5, -2.25, 0.75]),
            field.noise_3d(1.5, -2.25, 0.75)
        );
    }
}
