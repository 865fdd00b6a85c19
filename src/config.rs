//! Hyperparameter configuration for PPO training.

use std::fmt;

use crate::scheduling::{ConstantLR, LRScheduler, LinearDecay, StepDecay};

/// Configuration validation error.
///
/// Returned when configuration parameters are invalid or inconsistent.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A count parameter (num_epochs, batch_size, etc.) must be positive.
    InvalidCount {
        field: &'static str,
        value: usize,
    },
    /// A parameter is outside its valid range.
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    /// Buffer capacity cannot hold the minimum required sample count.
    CapacityTooSmall {
        capacity: usize,
        required: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidCount { field, value } => {
                write!(f, "{} must be > 0, got {}", field, value)
            }
            ConfigError::OutOfRange {
                field,
                value,
                min,
                max,
            } => {
                write!(f, "{} must be in [{}, {}], got {}", field, min, max, value)
            }
            ConfigError::CapacityTooSmall { capacity, required } => {
                write!(
                    f,
                    "buffer_capacity ({}) must be >= 2 * batch_size ({})",
                    capacity, required
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Learning rate schedule selection.
///
/// Built into a concrete scheduler at agent construction with the
/// configured base learning rate.
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerConfig {
    /// Fixed learning rate.
    Constant,
    /// Staircase decay: multiply by `decay` every `step_size` updates.
    Step { step_size: usize, decay: f64 },
    /// Linear decay to `end_lr` over `total_steps` updates.
    Linear { end_lr: f64, total_steps: usize },
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig::Step {
            step_size: 100,
            decay: 0.7,
        }
    }
}

impl SchedulerConfig {
    /// Build a scheduler for the given base learning rate.
    pub fn build(&self, base_lr: f64) -> Box<dyn LRScheduler> {
        match *self {
            SchedulerConfig::Constant => Box::new(ConstantLR::new(base_lr)),
            SchedulerConfig::Step { step_size, decay } => {
                Box::new(StepDecay::new(base_lr, step_size, decay))
            }
            SchedulerConfig::Linear { end_lr, total_steps } => {
                Box::new(LinearDecay::new(base_lr, end_lr, total_steps))
            }
        }
    }
}

/// Configuration for PPO training.
#[derive(Debug, Clone)]
pub struct PPOConfig {
    /// Discount factor
    pub gamma: f32,
    /// GAE lambda parameter.
    /// 1.0 reduces the advantage to the discounted return minus the
    /// value baseline; lower values trade variance for bias.
    pub gae_lambda: f32,
    /// Clipping range for both the probability ratio and the value
    /// prediction delta
    pub clip_range: f32,
    /// Value function loss coefficient
    pub vf_coef: f32,
    /// Entropy bonus coefficient
    pub ent_coef: f32,
    /// Maximum gradient norm per network (None = no clipping)
    pub max_grad_norm: Option<f32>,
    /// Passes over the buffer per update
    pub num_epochs: usize,
    /// Minibatch size. Minibatches smaller than 80% of this are skipped.
    pub batch_size: usize,
    /// Maximum transitions held between updates
    pub buffer_capacity: usize,
    /// Base learning rate for both networks
    pub learning_rate: f64,
    /// Learning rate schedule, stepped once per completed update
    pub scheduler: SchedulerConfig,
    /// Whether to normalize advantages to zero mean / unit variance
    /// before minibatching. Default: false.
    pub normalize_advantages: bool,
    /// Seed for the agent-owned RNG (action sampling and minibatch
    /// shuffling)
    pub seed: u64,
}

impl Default for PPOConfig {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            gae_lambda: 1.0,
            clip_range: 0.2,
            vf_coef: 0.5,
            ent_coef: 0.01,
            max_grad_norm: Some(0.5),
            num_epochs: 10,
            batch_size: 64,
            buffer_capacity: 2048,
            learning_rate: 3e-4,
            scheduler: SchedulerConfig::default(),
            normalize_advantages: false,
            seed: 0,
        }
    }
}

impl PPOConfig {
    /// Create a config with default hyperparameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the discount factor.
    pub fn with_gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    /// Set the GAE lambda parameter.
    pub fn with_gae_lambda(mut self, gae_lambda: f32) -> Self {
        self.gae_lambda = gae_lambda;
        self
    }

    /// Set the clipping range.
    pub fn with_clip_range(mut self, clip_range: f32) -> Self {
        self.clip_range = clip_range;
        self
    }

    /// Set the value loss coefficient.
    pub fn with_vf_coef(mut self, vf_coef: f32) -> Self {
        self.vf_coef = vf_coef;
        self
    }

    /// Set the entropy bonus coefficient.
    pub fn with_ent_coef(mut self, ent_coef: f32) -> Self {
        self.ent_coef = ent_coef;
        self
    }

    /// Set the gradient norm ceiling.
    pub fn with_max_grad_norm(mut self, max_grad_norm: Option<f32>) -> Self {
        self.max_grad_norm = max_grad_norm;
        self
    }

    /// Set the number of epochs per update.
    pub fn with_num_epochs(mut self, num_epochs: usize) -> Self {
        self.num_epochs = num_epochs;
        self
    }

    /// Set the minibatch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the rollout buffer capacity.
    pub fn with_buffer_capacity(mut self, buffer_capacity: usize) -> Self {
        self.buffer_capacity = buffer_capacity;
        self
    }

    /// Set the base learning rate.
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the learning rate schedule.
    pub fn with_scheduler(mut self, scheduler: SchedulerConfig) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Enable or disable advantage normalization.
    pub fn with_normalize_advantages(mut self, normalize: bool) -> Self {
        self.normalize_advantages = normalize;
        self
    }

    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Minimum transitions required before an update proceeds.
    ///
    /// Two full minibatches of headroom keeps at least one non-degenerate
    /// shuffle split available.
    pub fn min_required_samples(&self) -> usize {
        2 * self.batch_size
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_epochs == 0 {
            return Err(ConfigError::InvalidCount {
                field: "num_epochs",
                value: self.num_epochs,
            });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidCount {
                field: "batch_size",
                value: self.batch_size,
            });
        }
        if self.buffer_capacity == 0 {
            return Err(ConfigError::InvalidCount {
                field: "buffer_capacity",
                value: self.buffer_capacity,
            });
        }
        if self.buffer_capacity < self.min_required_samples() {
            return Err(ConfigError::CapacityTooSmall {
                capacity: self.buffer_capacity,
                required: self.min_required_samples(),
            });
        }
        if !(self.gamma > 0.0 && self.gamma <= 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "gamma",
                value: self.gamma as f64,
                min: 0.0,
                max: 1.0,
            });
        }
        if !(0.0..=1.0).contains(&self.gae_lambda) {
            return Err(ConfigError::OutOfRange {
                field: "gae_lambda",
                value: self.gae_lambda as f64,
                min: 0.0,
                max: 1.0,
            });
        }
        if !(self.clip_range > 0.0 && self.clip_range < 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "clip_range",
                value: self.clip_range as f64,
                min: 0.0,
                max: 1.0,
            });
        }
        if !(self.vf_coef.is_finite() && self.vf_coef >= 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "vf_coef",
                value: self.vf_coef as f64,
                min: 0.0,
                max: f64::MAX,
            });
        }
        if !(self.ent_coef.is_finite() && self.ent_coef >= 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "ent_coef",
                value: self.ent_coef as f64,
                min: 0.0,
                max: f64::MAX,
            });
        }
        if let Some(norm) = self.max_grad_norm {
            if !(norm.is_finite() && norm > 0.0) {
                return Err(ConfigError::OutOfRange {
                    field: "max_grad_norm",
                    value: norm as f64,
                    min: 0.0,
                    max: f64::MAX,
                });
            }
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "learning_rate",
                value: self.learning_rate,
                min: 0.0,
                max: f64::MAX,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(PPOConfig::default().validate().is_ok());
    }

    #[test]
    fn test_min_required_samples() {
        let config = PPOConfig::default().with_batch_size(16);
        assert_eq!(config.min_required_samples(), 32);
    }

    #[test]
    fn test_invalid_counts_rejected() {
        let config = PPOConfig::default().with_num_epochs(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCount { field: "num_epochs", .. })
        ));

        let config = PPOConfig::default().with_batch_size(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCount { field: "batch_size", .. })
        ));
    }

    #[test]
    fn test_capacity_must_cover_min_required() {
        let config = PPOConfig::default()
            .with_batch_size(64)
            .with_buffer_capacity(100);
        assert_eq!(
            config.validate(),
            Err(ConfigError::CapacityTooSmall {
                capacity: 100,
                required: 128
            })
        );
    }

    #[test]
    fn test_out_of_range_rejected() {
        let config = PPOConfig::default().with_gamma(1.5);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { field: "gamma", .. })
        ));

        let config = PPOConfig::default().with_clip_range(0.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { field: "clip_range", .. })
        ));

        let config = PPOConfig::default().with_gae_lambda(1.2);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { field: "gae_lambda", .. })
        ));
    }

    #[test]
    fn test_scheduler_build() {
        let constant = SchedulerConfig::Constant.build(1e-3);
        assert!((constant.get_lr(500) - 1e-3).abs() < 1e-12);

        let step = SchedulerConfig::default().build(1.0);
        assert!((step.get_lr(0) - 1.0).abs() < 1e-10);
        assert!((step.get_lr(100) - 0.7).abs() < 1e-10);
    }
}
