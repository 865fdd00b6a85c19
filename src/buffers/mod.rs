//! Experience storage for on-policy training.
//!
//! The rollout buffer is consumed after each training cycle: it fills
//! during collection and is cleared once an update completes.

pub mod rollout_buffer;

pub use rollout_buffer::{BufferError, RolloutBuffer, RolloutColumns};
