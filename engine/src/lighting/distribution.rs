//! Discrete probability distribution sampling based on the alias method.
//!
//! Setup is O(n) over the weight table; every sample afterwards is O(1):
//! pick a cell from the first random number, then either keep that index or
//! take the cell's alias depending on the second one.
//! Reference: <http://www.keithschwarz.com/darts-dice-coins>

/// Alias table over a fixed set of weights.
///
/// Used for area-weighted triangle selection when scattering lights over a
/// mesh surface.
#[derive(Clone, Debug)]
pub struct DiscreteDistribution {
    cells: Vec<(f32, usize)>,
}

impl DiscreteDistribution {
    /// Build the alias table. `weight_sum` must be the sum of `weights`;
    /// it is passed in because the caller usually has it already.
    pub fn new(weights: &[f32], weight_sum: f32) -> Self {
        assert!(!weights.is_empty());

        let count = weights.len();

        let mut large: Vec<(f32, usize)> = Vec::new();
        let mut small: Vec<(f32, usize)> = Vec::new();

        for (i, &w) in weights.iter().enumerate() {
            let p = w * count as f32 / weight_sum;
            if p < 1.0 {
                small.push((p, i));
            } else {
                large.push((p, i));
            }
        }

        let mut cells = vec![(0.0f32, 0usize); count];

        loop {
            let (Some(&l), Some(&g)) = (small.last(), large.last()) else {
                break;
            };
            small.pop();
            large.pop();

            cells[l.1] = (l.0, g.1);
            let residue = (l.0 + g.0) - 1.0;
            if residue < 1.0 {
                small.push((residue, g.1));
            } else {
                large.push((residue, g.1));
            }
        }

        // Remaining cells are saturated; numerical drift can leave entries
        // in either list
        for (_, i) in large {
            cells[i].0 = 1.0;
        }
        for (_, i) in small {
            cells[i].0 = 1.0;
        }

        Self { cells }
    }

    /// Sample an index. `u1` selects a cell, `u2` in [0, 1) decides between
    /// the cell and its alias.
    pub fn sample(&self, u1: u32, u2: f32) -> usize {
        let i = u1 as usize % self.cells.len();
        if u2 <= self.cells[i].0 { i } else { self.cells[i].1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_uniform_weights_cover_all_indices() {
        let weights = [1.0f32; 8];
        let dist = DiscreteDistribution::new(&weights, 8.0);
        let mut seen = [false; 8];
        for u1 in 0..64u32 {
            seen[dist.sample(u1, 0.5)] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_zero_weight_never_sampled() {
        let weights = [0.0f32, 1.0, 3.0, 0.0];
        let dist = DiscreteDistribution::new(&weights, 4.0);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let i = dist.sample(rng.r#gen(), rng.r#gen::<f32>());
            assert!(i == 1 || i == 2);
        }
    }

    #[test]
    fn test_sample_frequencies_track_weights() {
        let weights = [1.0f32, 3.0];
        let dist = DiscreteDistribution::new(&weights, 4.0);
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts = [0u32; 2];
        let total = 100_000;
        for _ in 0..total {
            counts[dist.sample(rng.r#gen(), rng.r#gen::<f32>())] += 1;
        }
        let p1 = counts[1] as f64 / total as f64;
        assert!((p1 - 0.75).abs() < 0.02, "p1 = {p1}");
    }
}
