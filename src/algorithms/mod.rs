//! PPO training algorithms.
//!
//! - [`gae`]: Generalized Advantage Estimation over ordered rollouts
//! - [`policy_loss`]: clipped surrogate and dual-clipped value losses
//! - [`action_policy`]: action encodings and policy output distributions
//! - [`actor_critic`]: network contracts the update engine trains against
//! - [`update_engine`]: epochs, minibatches, and optimizer steps

pub mod action_policy;
pub mod actor_critic;
pub mod gae;
pub mod policy_loss;
pub mod update_engine;

pub use action_policy::{
    ActionValue, ContinuousAction, DiscreteAction, DiscretePolicyOutput, GaussianPolicyOutput,
    PolicyOutput,
};
pub use actor_critic::{PolicyNetwork, ValueNetwork};
pub use gae::{compute_gae, normalize_advantages};
pub use policy_loss::{ppo_clip_loss, value_loss};
pub use update_engine::{PPOUpdateEngine, UpdateError};
