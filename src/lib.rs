//! # crop-rl: PPO Training Core
//!
//! Single-agent, single-threaded PPO (Proximal Policy Optimization)
//! built on [burn]. The crate owns the full training loop state —
//! rollout buffer, state normalizer, GAE, clipped losses, minibatch
//! epochs, LR scheduling, and checkpoints — while network architectures
//! stay outside, plugged in through two small traits.
//!
//! ## Training Loop
//!
//! ```text
//!  environment step
//!        │
//!        ▼
//!  PPOAgent::act ──── sample from current policy (explicit RNG)
//!        │
//!        ▼
//!  PPOAgent::store ── update normalizer, evaluate V(s) and log π(a|s),
//!        │            append to RolloutBuffer (rejects overflow)
//!        ▼
//!  PPOAgent::episode_complete
//!        │
//!        ▼
//!  PPOUpdateEngine::update
//!        ├─ normalize states once (frozen stats)
//!        ├─ per epoch: ordered value recompute → GAE → shuffle
//!        ├─ per minibatch: clipped losses → two Adam steps
//!        └─ advance LR schedule, report fixed-schema metrics
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crop_rl::{DiscreteAction, PPOAgent, PPOConfig};
//!
//! let config = PPOConfig::new()
//!     .with_batch_size(64)
//!     .with_buffer_capacity(2048)
//!     .with_seed(7);
//!
//! let mut agent = PPOAgent::new(policy, value, state_dim, 1, config, device)?;
//!
//! loop {
//!     let action = agent.act(&state);
//!     let (next_state, reward, done) = env.step(&action);
//!     agent.store(&state, &action, reward, done)?;
//!     if done {
//!         let report = agent.episode_complete(&next_state)?;
//!         println!("policy loss: {}", report.policy_loss);
//!     }
//!     state = next_state;
//! }
//! ```

pub mod agent;
pub mod algorithms;
pub mod buffers;
pub mod checkpoint;
pub mod config;
pub mod core;
pub mod metrics;
pub mod scheduling;

// Re-export commonly used types
pub use crate::core::running_stats::RunningNormalizer;
pub use crate::core::transition::Transition;

pub use buffers::rollout_buffer::{BufferError, RolloutBuffer, RolloutColumns};

pub use algorithms::action_policy::{
    ActionValue, ContinuousAction, DiscreteAction, DiscretePolicyOutput, GaussianPolicyOutput,
    PolicyOutput,
};
pub use algorithms::actor_critic::{PolicyNetwork, ValueNetwork};
pub use algorithms::gae::{compute_gae, normalize_advantages};
pub use algorithms::policy_loss::{ppo_clip_loss, value_loss};
pub use algorithms::update_engine::{PPOUpdateEngine, UpdateError};

pub use agent::PPOAgent;

pub use config::{ConfigError, PPOConfig, SchedulerConfig};

pub use metrics::{UpdateReport, UpdateStatus};

pub use scheduling::{ConstantLR, LRScheduler, LinearDecay, StepDecay};

pub use checkpoint::{CheckpointError, Checkpointer};
