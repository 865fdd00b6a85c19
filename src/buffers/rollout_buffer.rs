//! Fixed-capacity rollout buffer for on-policy training.
//!
//! Transitions are stored in the order they are collected and retrieved
//! in that same order; advantage estimation depends on temporal
//! adjacency, so the buffer never reorders or overwrites entries.
//! A full buffer rejects further writes instead of wrapping around:
//! silently dropping the oldest transition could split an episode
//! across the overwrite seam and corrupt the advantage recursion.

use std::fmt;

use crate::core::transition::Transition;

/// Error type for rollout buffer operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// Buffer is at capacity; the transition was not stored.
    Overflow { capacity: usize },
    /// Stored vector width doesn't match the width fixed at construction.
    DimensionMismatch {
        field: &'static str,
        expected: usize,
        got: usize,
    },
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferError::Overflow { capacity } => {
                write!(f, "rollout buffer full (capacity {})", capacity)
            }
            BufferError::DimensionMismatch {
                field,
                expected,
                got,
            } => {
                write!(f, "{} dimension mismatch: expected {}, got {}", field, expected, got)
            }
        }
    }
}

impl std::error::Error for BufferError {}

/// Column view of the buffer contents, in temporal order.
///
/// States and actions are flattened row-major: transition `i` occupies
/// `states[i*state_dim..(i+1)*state_dim]` and
/// `actions[i*action_dim..(i+1)*action_dim]`.
#[derive(Debug, Clone)]
pub struct RolloutColumns {
    pub states: Vec<f32>,
    pub actions: Vec<f32>,
    pub rewards: Vec<f32>,
    pub values: Vec<f32>,
    pub log_probs: Vec<f32>,
    pub dones: Vec<bool>,
    pub state_dim: usize,
    pub action_dim: usize,
}

impl RolloutColumns {
    /// Number of transitions in the view.
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    /// Whether the view is empty.
    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }
}

/// Fixed-capacity buffer of transitions in collection order.
#[derive(Debug)]
pub struct RolloutBuffer {
    transitions: Vec<Transition>,
    capacity: usize,
    state_dim: usize,
    action_dim: usize,
}

impl RolloutBuffer {
    /// Create a buffer for transitions of fixed state and action width.
    pub fn new(capacity: usize, state_dim: usize, action_dim: usize) -> Self {
        debug_assert!(capacity > 0, "RolloutBuffer: capacity must be > 0");
        debug_assert!(state_dim > 0, "RolloutBuffer: state_dim must be > 0");
        debug_assert!(action_dim > 0, "RolloutBuffer: action_dim must be > 0");

        Self {
            transitions: Vec::with_capacity(capacity),
            capacity,
            state_dim,
            action_dim,
        }
    }

    /// Append a transition.
    ///
    /// Fails with [`BufferError::Overflow`] when the buffer is full and
    /// with [`BufferError::DimensionMismatch`] when the state or action
    /// width differs from the width fixed at construction. The buffer
    /// is unchanged on error.
    pub fn store(&mut self, transition: Transition) -> Result<(), BufferError> {
        if self.transitions.len() >= self.capacity {
            log::error!(
                "rollout buffer overflow: {} transitions stored, capacity {}",
                self.transitions.len(),
                self.capacity
            );
            return Err(BufferError::Overflow {
                capacity: self.capacity,
            });
        }
        if transition.state.len() != self.state_dim {
            return Err(BufferError::DimensionMismatch {
                field: "state",
                expected: self.state_dim,
                got: transition.state.len(),
            });
        }
        if transition.action.len() != self.action_dim {
            return Err(BufferError::DimensionMismatch {
                field: "action",
                expected: self.action_dim,
                got: transition.action.len(),
            });
        }

        self.transitions.push(transition);
        Ok(())
    }

    /// Extract all stored data as columns, preserving temporal order.
    ///
    /// Non-consuming: the buffer still holds its transitions afterwards.
    pub fn columns(&self) -> RolloutColumns {
        let n = self.transitions.len();
        let mut states = Vec::with_capacity(n * self.state_dim);
        let mut actions = Vec::with_capacity(n * self.action_dim);
        let mut rewards = Vec::with_capacity(n);
        let mut values = Vec::with_capacity(n);
        let mut log_probs = Vec::with_capacity(n);
        let mut dones = Vec::with_capacity(n);

        for t in &self.transitions {
            states.extend_from_slice(&t.state);
            actions.extend_from_slice(&t.action);
            rewards.push(t.reward);
            values.push(t.value);
            log_probs.push(t.log_prob);
            dones.push(t.done);
        }

        RolloutColumns {
            states,
            actions,
            rewards,
            values,
            log_probs,
            dones,
            state_dim: self.state_dim,
            action_dim: self.action_dim,
        }
    }

    /// Discard all stored transitions, keeping the allocation.
    pub fn clear(&mut self) {
        self.transitions.clear();
    }

    /// Number of stored transitions.
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Whether the buffer is at capacity.
    pub fn is_full(&self) -> bool {
        self.transitions.len() >= self.capacity
    }

    /// Maximum number of transitions.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// State width fixed at construction.
    pub fn state_dim(&self) -> usize {
        self.state_dim
    }

    /// Action width fixed at construction.
    pub fn action_dim(&self) -> usize {
        self.action_dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_transition(step: usize, done: bool) -> Transition {
        Transition::new(
            vec![step as f32, step as f32 + 0.5],
            vec![(step % 3) as f32],
            1.0,
            0.5,
            -0.7,
            done,
        )
    }

    #[test]
    fn test_fresh_buffer_columns_empty() {
        let buffer = RolloutBuffer::new(8, 2, 1);
        let columns = buffer.columns();

        assert!(buffer.is_empty());
        assert_eq!(columns.len(), 0);
        assert!(columns.states.is_empty());
        assert!(columns.dones.is_empty());
    }

    #[test]
    fn test_store_and_columns_preserve_order() {
        let mut buffer = RolloutBuffer::new(8, 2, 1);
        for step in 0..5 {
            buffer.store(make_transition(step, step == 4)).unwrap();
        }

        let columns = buffer.columns();
        assert_eq!(columns.len(), 5);
        assert_eq!(columns.states.len(), 10);
        assert_eq!(columns.actions, vec![0.0, 1.0, 2.0, 0.0, 1.0]);
        // First state slot of each transition carries the step index
        for step in 0..5 {
            assert_eq!(columns.states[step * 2], step as f32);
        }
        assert_eq!(columns.dones, vec![false, false, false, false, true]);
    }

    #[test]
    fn test_columns_are_non_consuming() {
        let mut buffer = RolloutBuffer::new(4, 2, 1);
        buffer.store(make_transition(0, false)).unwrap();

        let _ = buffer.columns();
        let _ = buffer.columns();
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_overflow_rejected() {
        let mut buffer = RolloutBuffer::new(2, 2, 1);
        buffer.store(make_transition(0, false)).unwrap();
        buffer.store(make_transition(1, false)).unwrap();

        let err = buffer.store(make_transition(2, false)).unwrap_err();
        assert_eq!(err, BufferError::Overflow { capacity: 2 });
        // Contents untouched by the failed store
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.columns().states[0], 0.0);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let mut buffer = RolloutBuffer::new(4, 2, 1);

        let bad_state = Transition::new(vec![1.0], vec![0.0], 0.0, 0.0, 0.0, false);
        assert!(matches!(
            buffer.store(bad_state),
            Err(BufferError::DimensionMismatch { field: "state", .. })
        ));

        let bad_action = Transition::new(vec![1.0, 2.0], vec![0.0, 1.0], 0.0, 0.0, 0.0, false);
        assert!(matches!(
            buffer.store(bad_action),
            Err(BufferError::DimensionMismatch { field: "action", .. })
        ));

        assert!(buffer.is_empty());
    }

    #[test]
    fn test_clear_resets_length_only() {
        let mut buffer = RolloutBuffer::new(4, 2, 1);
        for step in 0..4 {
            buffer.store(make_transition(step, false)).unwrap();
        }
        assert!(buffer.is_full());

        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 4);

        // Storing after clear works again
        buffer.store(make_transition(9, false)).unwrap();
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.columns().states[0], 9.0);
    }
}
