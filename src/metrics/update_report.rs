//! Fixed-schema training report.
//!
//! Every update returns the same struct with the same fields; consumers
//! never probe a string map for keys that may or may not be present.

/// Outcome of an update request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    /// At least one minibatch was trained on.
    Updated,
    /// Not enough stored transitions; nothing was mutated.
    InsufficientData,
    /// Enough data, but every minibatch fell below the size floor.
    AllMinibatchesSkipped,
}

/// Training statistics from one update cycle.
///
/// Loss and distribution statistics are averaged over the minibatches
/// actually trained on; a report with `updates_performed == 0` carries
/// zeros in those fields.
#[derive(Debug, Clone)]
pub struct UpdateReport {
    /// What the update cycle did.
    pub status: UpdateStatus,
    /// Mean clipped surrogate policy loss.
    pub policy_loss: f32,
    /// Mean dual-clipped value loss.
    pub value_loss: f32,
    /// Mean policy entropy.
    pub entropy: f32,
    /// Mean of the advantage estimates seen in trained minibatches.
    pub advantage_mean: f32,
    /// Standard deviation of those advantage estimates.
    pub advantage_std: f32,
    /// Mean of the value predictions in trained minibatches.
    pub value_mean: f32,
    /// Standard deviation of those value predictions.
    pub value_std: f32,
    /// Number of minibatch gradient steps performed.
    pub updates_performed: usize,
    /// Effective batch size after capping at the available sample count.
    pub batch_size_used: usize,
    /// Transitions available when the update was requested.
    pub available_samples: usize,
    /// Learning rate in effect during this cycle.
    pub learning_rate: f64,
}

impl UpdateReport {
    /// Zero-filled report for a given status.
    pub fn empty(status: UpdateStatus, available_samples: usize, learning_rate: f64) -> Self {
        Self {
            status,
            policy_loss: 0.0,
            value_loss: 0.0,
            entropy: 0.0,
            advantage_mean: 0.0,
            advantage_std: 0.0,
            value_mean: 0.0,
            value_std: 0.0,
            updates_performed: 0,
            batch_size_used: 0,
            available_samples,
            learning_rate,
        }
    }

    /// Report for a request below the sample threshold.
    pub fn insufficient_data(available_samples: usize, learning_rate: f64) -> Self {
        Self::empty(UpdateStatus::InsufficientData, available_samples, learning_rate)
    }

    /// Set loss values.
    pub fn with_losses(mut self, policy_loss: f32, value_loss: f32, entropy: f32) -> Self {
        self.policy_loss = policy_loss;
        self.value_loss = value_loss;
        self.entropy = entropy;
        self
    }

    /// Set advantage statistics.
    pub fn with_advantage_stats(mut self, mean: f32, std: f32) -> Self {
        self.advantage_mean = mean;
        self.advantage_std = std;
        self
    }

    /// Set value prediction statistics.
    pub fn with_value_stats(mut self, mean: f32, std: f32) -> Self {
        self.value_mean = mean;
        self.value_std = std;
        self
    }

    /// Flat named-float view of the report for external logging sinks.
    ///
    /// The schema is fixed: the same entries in the same order for every
    /// report, regardless of status.
    pub fn entries(&self) -> [(&'static str, f64); 11] {
        [
            ("policy_loss", self.policy_loss as f64),
            ("value_loss", self.value_loss as f64),
            ("entropy", self.entropy as f64),
            ("advantage_mean", self.advantage_mean as f64),
            ("advantage_std", self.advantage_std as f64),
            ("value_mean", self.value_mean as f64),
            ("value_std", self.value_std as f64),
            ("updates_performed", self.updates_performed as f64),
            ("batch_size_used", self.batch_size_used as f64),
            ("available_samples", self.available_samples as f64),
            ("learning_rate", self.learning_rate),
        ]
    }
}
