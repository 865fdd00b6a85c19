//! Learning rate schedulers.
//!
//! Schedules are driven by completed update cycles, not environment
//! steps: one scheduler step per finished PPO update.
//!
//! - `ConstantLR`: fixed learning rate
//! - `StepDecay`: multiply by a decay factor every `step_size` updates
//! - `LinearDecay`: linear interpolation from start to end LR
//!
//! # Data Integrity
//!
//! All schedulers validate inputs in debug builds and sanitize them in
//! release builds so a bad hyperparameter cannot inject NaN/Inf into
//! the optimizer:
//!
//! - **Division by zero**: `total_steps=0` or `step_size=0` triggers a
//!   debug panic and returns the base LR in release
//! - **Non-finite or negative LR**: debug panic, sanitized to 0.0 in release

use std::sync::atomic::{AtomicUsize, Ordering};

/// Learning rate scheduler trait.
pub trait LRScheduler: Send + Sync {
    /// Get the learning rate for a given step.
    fn get_lr(&self, step: usize) -> f64;

    /// Convenience method to get the current LR and advance the
    /// internal step counter.
    fn step(&self) -> f64 {
        self.get_lr(0)
    }
}

/// Constant learning rate (no scheduling).
#[derive(Debug)]
pub struct ConstantLR {
    lr: f64,
}

impl ConstantLR {
    /// Create a new constant LR scheduler.
    ///
    /// # Panics (debug only)
    ///
    /// Panics if `lr` is NaN, Inf, or negative.
    pub fn new(lr: f64) -> Self {
        debug_assert!(lr.is_finite(), "ConstantLR: lr must be finite, got {}", lr);
        debug_assert!(lr >= 0.0, "ConstantLR: lr must be non-negative, got {}", lr);

        let lr = if lr.is_finite() && lr >= 0.0 { lr } else { 0.0 };

        Self { lr }
    }

    /// Get the configured learning rate.
    pub fn lr(&self) -> f64 {
        self.lr
    }
}

impl LRScheduler for ConstantLR {
    fn get_lr(&self, _step: usize) -> f64 {
        self.lr
    }
}

/// Staircase decay: `lr = base_lr * decay^(step / step_size)`.
///
/// The learning rate holds for `step_size` updates, then drops by the
/// decay factor, matching the usual StepLR schedule from other training
/// stacks.
#[derive(Debug)]
pub struct StepDecay {
    base_lr: f64,
    step_size: usize,
    decay: f64,
    current_step: AtomicUsize,
}

impl StepDecay {
    /// Create a new staircase decay scheduler.
    ///
    /// # Arguments
    ///
    /// * `base_lr` - Initial learning rate (finite, non-negative)
    /// * `step_size` - Updates between decays (must be > 0)
    /// * `decay` - Multiplicative factor per stage, in (0, 1]
    ///
    /// # Panics (debug only)
    ///
    /// Panics if any argument is invalid.
    pub fn new(base_lr: f64, step_size: usize, decay: f64) -> Self {
        debug_assert!(step_size > 0, "StepDecay: step_size must be > 0, got {}", step_size);
        debug_assert!(
            base_lr.is_finite() && base_lr >= 0.0,
            "StepDecay: base_lr must be finite and non-negative, got {}",
            base_lr
        );
        debug_assert!(
            decay.is_finite() && decay > 0.0 && decay <= 1.0,
            "StepDecay: decay must be in (0, 1], got {}",
            decay
        );

        // Sanitize in release builds
        let base_lr = if base_lr.is_finite() && base_lr >= 0.0 {
            base_lr
        } else {
            0.0
        };
        let decay = if decay.is_finite() && decay > 0.0 && decay <= 1.0 {
            decay
        } else {
            1.0
        };

        Self {
            base_lr,
            step_size,
            decay,
            current_step: AtomicUsize::new(0),
        }
    }

    /// Reset the scheduler to initial state.
    pub fn reset(&self) {
        self.current_step.store(0, Ordering::SeqCst);
    }

    /// Get the base learning rate.
    pub fn base_lr(&self) -> f64 {
        self.base_lr
    }

    /// Get the number of updates per stage.
    pub fn step_size(&self) -> usize {
        self.step_size
    }

    /// Get the decay factor.
    pub fn decay(&self) -> f64 {
        self.decay
    }
}

impl LRScheduler for StepDecay {
    fn get_lr(&self, step: usize) -> f64 {
        if self.step_size == 0 {
            return self.base_lr;
        }

        let stage = (step / self.step_size) as i32;
        let lr = self.base_lr * self.decay.powi(stage);

        if lr.is_finite() {
            lr
        } else {
            0.0
        }
    }

    fn step(&self) -> f64 {
        let step = self.current_step.fetch_add(1, Ordering::SeqCst);
        self.get_lr(step)
    }
}

/// Linear decay from start LR to end LR over total_steps.
///
/// After total_steps, returns end_lr (doesn't go below).
#[derive(Debug)]
pub struct LinearDecay {
    start_lr: f64,
    end_lr: f64,
    total_steps: usize,
    current_step: AtomicUsize,
}

impl LinearDecay {
    /// Create a new linear decay scheduler.
    ///
    /// # Arguments
    ///
    /// * `start_lr` - Initial learning rate (finite, non-negative)
    /// * `end_lr` - Final learning rate (finite, non-negative)
    /// * `total_steps` - Updates over which to decay (must be > 0)
    ///
    /// # Panics (debug only)
    ///
    /// Panics if any argument is invalid.
    pub fn new(start_lr: f64, end_lr: f64, total_steps: usize) -> Self {
        debug_assert!(
            total_steps > 0,
            "LinearDecay: total_steps must be > 0, got {}",
            total_steps
        );
        debug_assert!(
            start_lr.is_finite() && start_lr >= 0.0,
            "LinearDecay: start_lr must be finite and non-negative, got {}",
            start_lr
        );
        debug_assert!(
            end_lr.is_finite() && end_lr >= 0.0,
            "LinearDecay: end_lr must be finite and non-negative, got {}",
            end_lr
        );

        // Sanitize in release builds
        let start_lr = if start_lr.is_finite() && start_lr >= 0.0 {
            start_lr
        } else {
            0.0
        };
        let end_lr = if end_lr.is_finite() && end_lr >= 0.0 {
            end_lr
        } else {
            0.0
        };

        Self {
            start_lr,
            end_lr,
            total_steps,
            current_step: AtomicUsize::new(0),
        }
    }

    /// Reset the scheduler to initial state.
    pub fn reset(&self) {
        self.current_step.store(0, Ordering::SeqCst);
    }

    /// Get the start learning rate.
    pub fn start_lr(&self) -> f64 {
        self.start_lr
    }

    /// Get the end learning rate.
    pub fn end_lr(&self) -> f64 {
        self.end_lr
    }

    /// Get the total steps for decay.
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }
}

impl LRScheduler for LinearDecay {
    fn get_lr(&self, step: usize) -> f64 {
        if self.total_steps == 0 {
            return self.start_lr;
        }

        let progress = (step as f64) / (self.total_steps as f64);
        let progress = progress.min(1.0);
        let lr = self.start_lr + (self.end_lr - self.start_lr) * progress;

        if lr.is_finite() {
            lr
        } else {
            self.end_lr
        }
    }

    fn step(&self) -> f64 {
        let step = self.current_step.fetch_add(1, Ordering::SeqCst);
        self.get_lr(step)
    }
}
