//! Network contracts for the policy and value function.
//!
//! Architectures live outside this crate; training only needs the two
//! forward signatures below. Both traits extend [`AutodiffModule`] so
//! the update engine can run backprop, drive the optimizer, and record
//! checkpoints without knowing anything about layer structure.

use burn::module::AutodiffModule;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::Tensor;

use super::action_policy::{ActionValue, PolicyOutput};

/// Policy network contract.
///
/// Maps a batch of (normalized) states to distribution parameters.
/// The output type fixes the action space: categorical outputs pair
/// with discrete actions, Gaussian outputs with continuous ones.
pub trait PolicyNetwork<B, A>: AutodiffModule<B>
where
    B: AutodiffBackend,
    A: ActionValue,
{
    /// Distribution parameters produced by the forward pass.
    type Output: PolicyOutput<B, Action = A>;

    /// Forward pass: states [batch, state_dim] to distribution parameters.
    fn forward(&self, states: Tensor<B, 2>) -> Self::Output;
}

/// Value network contract.
///
/// Maps a batch of (normalized) states to one scalar value estimate per
/// row.
pub trait ValueNetwork<B>: AutodiffModule<B>
where
    B: AutodiffBackend,
{
    /// Forward pass: states [batch, state_dim] to values [batch].
    fn forward(&self, states: Tensor<B, 2>) -> Tensor<B, 1>;
}
