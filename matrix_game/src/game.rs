use std::num::NonZeroUsize;

use ndarray::{Array1, ArrayView1};
use ndarray_rand::RandomExt;
use rand::distr::StandardUniform;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Bilinear min-max problem `L(x, y) = xᵀ A y + aᵀ x + bᵀ y` with
/// `A = diag(d)` and `d_i ∈ {-1, +1}`.
///
/// `x` minimizes, `y` maximizes. Both players' gradients vanish exactly at
/// the saddle point, which with a diagonal coupling is an elementwise
/// division away, so runs can be checked against a closed-form answer.
#[derive(Debug, Clone, PartialEq)]
pub struct BilinearGame {
    diag: Array1<f32>,
    a: Array1<f32>,
    b: Array1<f32>,
}

impl BilinearGame {
    /// Samples a problem instance: coupling signs uniform on {-1, +1},
    /// offsets uniform on [0, 1). Deterministic per seed.
    pub fn generate(seed: u64, dim: NonZeroUsize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let n = dim.get();
        let diag = Array1::from_shape_fn(n, |_| if rng.random::<bool>() { 1.0 } else { -1.0 });
        let a = Array1::random_using(n, StandardUniform, &mut rng);
        let b = Array1::random_using(n, StandardUniform, &mut rng);
        Self { diag, a, b }
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.diag.len()
    }

    /// Gradient of `L` in the minimizing player: `A y + a`.
    ///
    /// # Panics
    /// Panics if `y` does not have the problem dimension.
    pub fn grad_x(&self, y: &[f32]) -> Vec<f32> {
        let y = ArrayView1::from(y);
        (&self.diag * &y + &self.a).to_vec()
    }

    /// Gradient of `L` in the maximizing player: `Aᵀ x + b`. This is the
    /// ascent direction; feed its negation to a minimizing update.
    ///
    /// # Panics
    /// Panics if `x` does not have the problem dimension.
    pub fn grad_y(&self, x: &[f32]) -> Vec<f32> {
        let x = ArrayView1::from(x);
        (&self.diag * &x + &self.b).to_vec()
    }

    /// The unique saddle point `(x*, y*)`, solving `Aᵀ x* = -b` and
    /// `A y* = -a`.
    pub fn solution(&self) -> (Vec<f32>, Vec<f32>) {
        let x = -(&self.b / &self.diag);
        let y = -(&self.a / &self.diag);
        (x.to_vec(), y.to_vec())
    }

    /// Operator norm of the coupled gradient field's linear part. Step
    /// sizes strictly below its reciprocal keep the two-phase iteration
    /// contractive.
    pub fn lipschitz(&self) -> f32 {
        self.diag.iter().fold(0.0f32, |norm, d| norm.max(d.abs()))
    }

    /// A reproducible starting point with components on [0, 1).
    pub fn initial_point(&self, seed: u64) -> (Vec<f32>, Vec<f32>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let x = Array1::random_using(self.dim(), StandardUniform, &mut rng);
        let y = Array1::random_using(self.dim(), StandardUniform, &mut rng);
        (x.to_vec(), y.to_vec())
    }
}

/// Euclidean distance between two flat points.
///
/// # Panics
/// Panics if the slices differ in length.
pub fn distance(p: &[f32], q: &[f32]) -> f32 {
    assert_eq!(p.len(), q.len());
    p.iter()
        .zip(q)
        .map(|(a, b)| (a - b) * (a - b))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dim(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn generation_is_deterministic_per_seed() {
        let first = BilinearGame::generate(42, dim(32));
        let second = BilinearGame::generate(42, dim(32));
        assert_eq!(first, second);

        let other = BilinearGame::generate(43, dim(32));
        assert_ne!(first, other);
    }

    #[test]
    fn coupling_signs_are_unit() {
        let game = BilinearGame::generate(7, dim(64));
        let (x_star, y_star) = game.solution();
        assert_eq!(game.dim(), 64);
        assert_eq!(x_star.len(), 64);
        assert_eq!(y_star.len(), 64);
        assert!((game.lipschitz() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn offsets_lie_in_the_unit_interval() {
        let game = BilinearGame::generate(9, dim(128));
        let at_origin = game.grad_x(&vec![0.0; 128]);
        // With y = 0 the minimizing gradient is the offset itself.
        assert!(at_origin.iter().all(|&v| (0.0..1.0).contains(&v)));
    }

    #[test]
    fn gradients_vanish_at_the_saddle_point() {
        let game = BilinearGame::generate(11, dim(50));
        let (x_star, y_star) = game.solution();
        let gx = game.grad_x(&y_star);
        let gy = game.grad_y(&x_star);
        assert!(gx.iter().all(|v| v.abs() < 1e-6));
        assert!(gy.iter().all(|v| v.abs() < 1e-6));
    }

    #[test]
    fn initial_point_is_reproducible() {
        let game = BilinearGame::generate(3, dim(16));
        let (x1, y1) = game.initial_point(5);
        let (x2, y2) = game.initial_point(5);
        assert_eq!(x1, x2);
        assert_eq!(y1, y2);
        assert_ne!(x1, y1);
    }

    #[test]
    fn distance_is_euclidean() {
        assert_eq!(distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_eq!(distance(&[1.0, -1.0], &[1.0, -1.0]), 0.0);
    }
}
