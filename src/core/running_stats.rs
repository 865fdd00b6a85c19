//! Running observation statistics using Welford's online algorithm.
//!
//! Maintains per-dimension mean and variance for state normalization.
//! Welford's recurrence is used instead of the naive sum-of-squares
//! accumulator, which loses precision catastrophically once the running
//! sums grow large relative to the variance.
//!
//! # Example
//! ```ignore
//! use crop_rl::core::RunningNormalizer;
//!
//! let mut stats = RunningNormalizer::new(4);
//! stats.update(&[1.0, 2.0, 3.0, 4.0]);
//! stats.update(&[2.0, 3.0, 4.0, 5.0]);
//!
//! let normalized = stats.normalize(&[1.5, 2.5, 3.5, 4.5]);
//! ```

use serde::{Deserialize, Serialize};

/// Per-dimension running mean and standard deviation.
///
/// Statistics accumulate for the lifetime of the agent and are never
/// reset between updates; normalization is always relative to everything
/// observed so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunningNormalizer {
    /// Running mean per dimension
    mean: Vec<f64>,
    /// Sum of squared deviations per dimension
    /// Note: actual variance = var_sum / count
    var_sum: Vec<f64>,
    /// Number of samples seen
    count: f64,
    /// Epsilon floor for the standard deviation
    epsilon: f64,
}

impl RunningNormalizer {
    /// Create a new normalizer for the given dimensionality.
    pub fn new(dim: usize) -> Self {
        Self {
            mean: vec![0.0; dim],
            var_sum: vec![0.0; dim],
            count: 0.0,
            epsilon: 1e-8,
        }
    }

    /// Create with a custom epsilon floor.
    pub fn with_epsilon(dim: usize, epsilon: f64) -> Self {
        Self {
            mean: vec![0.0; dim],
            var_sum: vec![0.0; dim],
            count: 0.0,
            epsilon,
        }
    }

    /// Fold a single observation into the statistics.
    ///
    /// # Panics
    /// Panics if the observation dimensionality doesn't match.
    pub fn update(&mut self, obs: &[f32]) {
        assert_eq!(obs.len(), self.mean.len(), "Observation dimension mismatch");

        self.count += 1.0;
        for i in 0..obs.len() {
            let x = obs[i] as f64;
            let delta = x - self.mean[i];
            self.mean[i] += delta / self.count;
            let delta2 = x - self.mean[i];
            self.var_sum[i] += delta * delta2;
        }
    }

    /// Fold a flattened batch of observations into the statistics.
    pub fn update_batch(&mut self, batch: &[f32]) {
        let dim = self.mean.len();
        assert_eq!(batch.len() % dim, 0, "Batch size must be multiple of dimension");

        for obs in batch.chunks_exact(dim) {
            self.update(obs);
        }
    }

    /// Normalize an observation to zero mean and unit variance.
    ///
    /// Pure with respect to the statistics: normalizing never updates them.
    pub fn normalize(&self, obs: &[f32]) -> Vec<f32> {
        assert_eq!(obs.len(), self.mean.len(), "Observation dimension mismatch");

        obs.iter()
            .enumerate()
            .map(|(i, &x)| {
                let std = self.std(i);
                ((x as f64 - self.mean[i]) / std) as f32
            })
            .collect()
    }

    /// Normalize a flattened batch of observations with the current statistics.
    pub fn normalize_batch(&self, batch: &[f32]) -> Vec<f32> {
        let dim = self.mean.len();
        assert_eq!(batch.len() % dim, 0, "Batch size must be multiple of dimension");

        let mut out = Vec::with_capacity(batch.len());
        for obs in batch.chunks_exact(dim) {
            out.extend(self.normalize(obs));
        }
        out
    }

    /// Standard deviation for dimension i.
    ///
    /// With fewer than two samples the variance is undefined; 1.0 is
    /// returned so that early normalization degrades to mean-centering.
    #[inline]
    fn std(&self, i: usize) -> f64 {
        if self.count < 2.0 {
            1.0
        } else {
            (self.var_sum[i] / self.count).sqrt().max(self.epsilon)
        }
    }

    /// Get the mean vector.
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Get the population variance vector.
    pub fn variance(&self) -> Vec<f64> {
        if self.count < 2.0 {
            vec![1.0; self.mean.len()]
        } else {
            self.var_sum.iter().map(|&v| v / self.count).collect()
        }
    }

    /// Get the standard deviation vector.
    pub fn std_vec(&self) -> Vec<f64> {
        self.variance()
            .into_iter()
            .map(|v| v.sqrt().max(self.epsilon))
            .collect()
    }

    /// Get the sample count.
    pub fn count(&self) -> f64 {
        self.count
    }

    /// Get the dimensionality.
    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Serialize to bytes for checkpointing.
    ///
    /// Binary format: [dim, count, mean..., var_sum..., epsilon], all
    /// little-endian; f64 fields round-trip bit-exactly.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8 + 8 + self.mean.len() * 16 + 8);
        bytes.extend_from_slice(&(self.mean.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&self.count.to_le_bytes());
        for &m in &self.mean {
            bytes.extend_from_slice(&m.to_le_bytes());
        }
        for &v in &self.var_sum {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.extend_from_slice(&self.epsilon.to_le_bytes());
        bytes
    }

    /// Deserialize from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, &'static str> {
        if bytes.len() < 16 {
            return Err("Buffer too small");
        }

        let dim = u64::from_le_bytes(bytes[0..8].try_into().unwrap()) as usize;
        let count = f64::from_le_bytes(bytes[8..16].try_into().unwrap());

        let expected_len = 16 + dim * 16 + 8;
        if bytes.len() < expected_len {
            return Err("Buffer too small for specified dimension");
        }

        let mut mean = Vec::with_capacity(dim);
        let mut var_sum = Vec::with_capacity(dim);
        let mut offset = 16;

        for _ in 0..dim {
            mean.push(f64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap()));
            offset += 8;
        }
        for _ in 0..dim {
            var_sum.push(f64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap()));
            offset += 8;
        }

        let epsilon = f64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap());

        Ok(Self {
            mean,
            var_sum,
            count,
            epsilon,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_welford_mean() {
        let mut stats = RunningNormalizer::new(2);
        stats.update(&[1.0, 2.0]);
        stats.update(&[3.0, 4.0]);
        stats.update(&[5.0, 6.0]);

        let mean = stats.mean();
        assert!((mean[0] - 3.0).abs() < 1e-10);
        assert!((mean[1] - 4.0).abs() < 1e-10);
    }

    #[test]
    fn test_welford_variance() {
        let mut stats = RunningNormalizer::new(1);
        // Values: 2, 4, 4, 4, 5, 5, 7, 9
        // Mean = 5, Variance = 4
        for &x in &[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            stats.update(&[x]);
        }

        let var = stats.variance();
        assert!((var[0] - 4.0).abs() < 1e-10);
    }

    #[test]
    fn test_single_sample_uses_unit_std() {
        let mut stats = RunningNormalizer::new(1);
        stats.update(&[10.0]);

        // count < 2: std guard kicks in, output is mean-centered only
        let normalized = stats.normalize(&[12.0]);
        assert!((normalized[0] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_constant_stream_converges_to_zero() {
        let mut stats = RunningNormalizer::new(1);
        for _ in 0..100 {
            stats.update(&[7.0]);
        }

        // Variance is exactly zero; the epsilon floor keeps the division
        // finite and the output pinned at zero.
        let normalized = stats.normalize(&[7.0]);
        assert!(normalized[0].is_finite());
        assert!(normalized[0].abs() < 1e-6);
    }

    #[test]
    fn test_normalize_is_pure() {
        let mut stats = RunningNormalizer::new(2);
        stats.update(&[0.0, 10.0]);
        stats.update(&[2.0, 10.0]);

        let count_before = stats.count();
        let _ = stats.normalize(&[1.0, 10.0]);
        let _ = stats.normalize_batch(&[1.0, 10.0, 1.0, 10.0]);
        assert_eq!(stats.count(), count_before);
    }

    #[test]
    fn test_normalize() {
        let mut stats = RunningNormalizer::new(2);
        for _ in 0..1000 {
            stats.update(&[0.0, 10.0]);
            stats.update(&[2.0, 10.0]);
        }

        // Mean is ~1.0 for dim 0, ~10.0 for dim 1
        let normalized = stats.normalize(&[1.0, 10.0]);
        assert!(normalized[0].abs() < 0.1);
        assert!(normalized[1].abs() < 0.1);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut stats = RunningNormalizer::new(3);
        stats.update(&[1.0, 2.0, 3.0]);
        stats.update(&[4.0, 5.0, 6.0]);

        let bytes = stats.to_bytes();
        let restored = RunningNormalizer::from_bytes(&bytes).unwrap();

        assert_eq!(stats.mean(), restored.mean());
        assert_eq!(stats.count(), restored.count());
        assert_eq!(stats.variance(), restored.variance());
    }

    #[test]
    fn test_from_bytes_truncated() {
        let mut stats = RunningNormalizer::new(3);
        stats.update(&[1.0, 2.0, 3.0]);

        let bytes = stats.to_bytes();
        assert!(RunningNormalizer::from_bytes(&bytes[..10]).is_err());
        assert!(RunningNormalizer::from_bytes(&bytes[..bytes.len() - 1]).is_err());
    }
}
