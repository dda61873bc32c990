use getset::CopyGetters;
use itertools::Itertools;
use log::debug;
use nalgebra::{Vector2, Vector3};
use rand_chacha::{
    rand_core::{RngCore, SeedableRng},
    ChaCha8Rng,
};
use std::f32::consts::PI;

/// A seeded gradient noise generator for 2D and 3D space.
///
/// Currently supports:
/// - 2D Perlin noise
/// - 3D Perlin noise (an average of 2D noises over every ordered pair of axes)
///
/// The output is deterministic for a given seed,
/// equals zero at every integer lattice point, and stays within `[-1, 1]`.
#[derive(Debug, Clone, CopyGetters)]
pub struct NoiseGenerator {
    /// The seed, from which the gradient lattice is derived
    #[getset(get_copy = "pub")]
    seed: u64,

    /// A seed-derived offset of lattice coordinates (never zero)
    salt: u32,
}

impl NoiseGenerator {
    pub fn new(seed: u64) -> Self {
        let mut generator = Self { seed, salt: 1 };
        generator.set_seed(seed);
        generator
    }

    /// Replaces the seed, regenerating the whole gradient lattice.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
        self.salt = 1 + (ChaCha8Rng::seed_from_u64(seed).next_u32() >> 1);
        debug!("Noise generator reseeded with {}", seed);
    }

    pub fn perlin_2d(&self, point: Vector2<f32>) -> f32 {
        let origin = point.map(|c| c.floor() as i32);
        let weight = point - origin.cast::<f32>();
        let corner = |dx: i32, dy: i32| self.corner_influence(origin + Vector2::new(dx, dy), point);

        let top = interpolate(corner(0, 0), corner(1, 0), weight.x);
        let bottom = interpolate(corner(0, 1), corner(1, 1), weight.x);
        interpolate(top, bottom, weight.y)
    }

    pub fn perlin_3d(&self, point: Vector3<f32>) -> f32 {
        let total: f32 = (0..3_usize)
            .permutations(2)
            .map(|axes| self.perlin_2d(Vector2::new(point[axes[0]], point[axes[1]])))
            .sum();
        total / 6.0
    }

    /// Dot product of the corner gradient, and the offset from the corner to the point.
    fn corner_influence(&self, corner: Vector2<i32>, point: Vector2<f32>) -> f32 {
        (point - corner.cast::<f32>()).dot(&self.gradient(corner))
    }

    /// A pseudo-random unit vector, assigned to the lattice corner.
    fn gradient(&self, corner: Vector2<i32>) -> Vector2<f32> {
        const HALF_WIDTH: u32 = u32::BITS / 2;

        let mut a = (corner.x as u32).wrapping_add(self.salt);
        let mut b = (corner.y as u32).wrapping_add(self.salt);

        a = a.wrapping_mul(3284157443);
        b ^= a.rotate_left(HALF_WIDTH);
        b = b.wrapping_mul(1911520717);
        a ^= b.rotate_left(HALF_WIDTH);
        a = a.wrapping_mul(2048419325);

        // [0, 2 * PI)
        let angle = a as f32 * (PI / (1u32 << 31) as f32);
        Vector2::new(angle.sin(), angle.cos())
    }
}

impl Default for NoiseGenerator {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Cubic (smoothstep) interpolation between `a` and `b`.
fn interpolate(a: f32, b: f32, weight: f32) -> f32 {
    (b - a) * (3.0 - weight * 2.0) * weight * weight + a
}
