//! Transition record stored during rollout collection.

/// A single environment step with the policy outputs recorded at
/// collection time.
///
/// Actions are stored as a fixed-width float vector regardless of the
/// action space: a discrete action occupies one slot (the index as a
/// float), a continuous action occupies one slot per dimension. The
/// width is fixed when the rollout buffer is constructed, so retrieval
/// never has to branch on the action kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Raw (unnormalized) state observed at this step.
    pub state: Vec<f32>,
    /// Action taken, encoded as floats.
    pub action: Vec<f32>,
    /// Reward received after taking the action.
    pub reward: f32,
    /// Value estimate V(s) recorded at collection time.
    pub value: f32,
    /// Log probability of the action under the collection policy.
    pub log_prob: f32,
    /// Whether the episode terminated at this step.
    pub done: bool,
}

impl Transition {
    /// Create a new transition.
    pub fn new(
        state: Vec<f32>,
        action: Vec<f32>,
        reward: f32,
        value: f32,
        log_prob: f32,
        done: bool,
    ) -> Self {
        Self {
            state,
            action,
            reward,
            value,
            log_prob,
            done,
        }
    }

    /// State dimensionality.
    pub fn state_dim(&self) -> usize {
        self.state.len()
    }

    /// Action width in floats.
    pub fn action_dim(&self) -> usize {
        self.action.len()
    }
}
