//! Agent orchestration: act, store, episode boundaries, checkpoints.

pub mod ppo_agent;

pub use ppo_agent::PPOAgent;
