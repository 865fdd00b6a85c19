//! Action abstractions for discrete and continuous action spaces.
//!
//! - [`ActionValue`]: fixed-width float encoding of actions for buffer
//!   storage and environment stepping
//! - [`PolicyOutput`]: distribution parameters produced by a policy
//!   forward pass, with sampling and log-prob/entropy computation
//!
//! Sampling always draws from an explicitly passed RNG. There is no
//! global or thread-local randomness anywhere in the training path, so
//! two agents built with the same seed produce identical rollouts.

use burn::tensor::backend::Backend;
use burn::tensor::{activation::softmax, Int, Tensor};
use rand::rngs::StdRng;
use rand::Rng;
use std::fmt::Debug;

// Bounds on log_std for continuous policies.
const LOG_STD_MIN: f32 = -20.0;
const LOG_STD_MAX: f32 = 2.0;

/// Fixed-width float encoding of an action.
///
/// - Discrete: 1 slot (the index as a float)
/// - Continuous: one slot per action dimension
pub trait ActionValue: Clone + Send + Sync + Debug + 'static {
    /// Number of floats this action occupies.
    fn size(&self) -> usize;

    /// Encode to floats for buffer storage and environment stepping.
    fn as_floats(&self) -> Vec<f32>;

    /// Decode from a float slice of the fixed width.
    fn from_floats(data: &[f32]) -> Self;
}

/// Discrete action value (single index).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscreteAction(pub u32);

impl ActionValue for DiscreteAction {
    fn size(&self) -> usize {
        1
    }

    fn as_floats(&self) -> Vec<f32> {
        vec![self.0 as f32]
    }

    fn from_floats(data: &[f32]) -> Self {
        Self(data[0] as u32)
    }
}

impl From<u32> for DiscreteAction {
    fn from(val: u32) -> Self {
        Self(val)
    }
}

/// Continuous action value (vector of floats).
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuousAction(pub Vec<f32>);

impl ActionValue for ContinuousAction {
    fn size(&self) -> usize {
        self.0.len()
    }

    fn as_floats(&self) -> Vec<f32> {
        self.0.clone()
    }

    fn from_floats(data: &[f32]) -> Self {
        Self(data.to_vec())
    }
}

impl From<Vec<f32>> for ContinuousAction {
    fn from(val: Vec<f32>) -> Self {
        Self(val)
    }
}

/// Distribution parameters from a policy forward pass.
///
/// Provides both sides of the policy contract:
/// - Rollout collection: [`PolicyOutput::sample`] (detached, explicit RNG)
/// - Training: [`PolicyOutput::log_prob`], [`PolicyOutput::entropy`]
///   (with gradient flow)
pub trait PolicyOutput<B: Backend>: Clone + Send + 'static {
    /// The action value type produced by sampling this policy.
    type Action: ActionValue;

    /// Sample one action per batch row, returning the actions and their
    /// log probabilities. Reads only from the tensor data; no gradient
    /// flows through sampling.
    fn sample(&self, rng: &mut StdRng) -> (Vec<Self::Action>, Vec<f32>);

    /// Log probabilities of the given actions, with gradient flow.
    fn log_prob(&self, actions: &[Self::Action], device: &B::Device) -> Tensor<B, 1>;

    /// Per-sample entropy, with gradient flow.
    fn entropy(&self) -> Tensor<B, 1>;
}

// ============================================================================
// Discrete (categorical) policy output
// ============================================================================

/// Categorical distribution over N actions, parameterized by logits.
#[derive(Clone)]
pub struct DiscretePolicyOutput<B: Backend> {
    /// Unnormalized log probabilities: [batch, n_actions]
    pub logits: Tensor<B, 2>,
}

impl<B: Backend> DiscretePolicyOutput<B> {
    /// Create from a logits tensor.
    pub fn new(logits: Tensor<B, 2>) -> Self {
        Self { logits }
    }

    /// Probabilities (softmax over logits).
    pub fn probs(&self) -> Tensor<B, 2> {
        softmax(self.logits.clone(), 1)
    }

    /// Number of actions.
    pub fn n_actions(&self) -> usize {
        self.logits.dims()[1]
    }

    /// Batch size.
    pub fn batch_size(&self) -> usize {
        self.logits.dims()[0]
    }
}

impl<B: Backend> PolicyOutput<B> for DiscretePolicyOutput<B> {
    type Action = DiscreteAction;

    fn sample(&self, rng: &mut StdRng) -> (Vec<Self::Action>, Vec<f32>) {
        let probs = self.probs();
        let probs_data = probs.to_data();
        let probs_slice: &[f32] = probs_data.as_slice().expect("probs tensor readable as f32");

        let batch_size = self.batch_size();
        let n_actions = self.n_actions();

        let mut actions = Vec::with_capacity(batch_size);
        let mut log_probs = Vec::with_capacity(batch_size);

        for i in 0..batch_size {
            // Inverse CDF sampling over the categorical distribution.
            // The last action is selected unconditionally if float error
            // left the cumulative sum slightly below 1.
            let rand_val: f32 = rng.gen();
            let mut cumsum = 0.0;
            let mut selected = (n_actions - 1) as u32;

            for a in 0..n_actions {
                cumsum += probs_slice[i * n_actions + a];
                if rand_val < cumsum || a == n_actions - 1 {
                    selected = a as u32;
                    break;
                }
            }

            let prob = probs_slice[i * n_actions + selected as usize];
            actions.push(DiscreteAction(selected));
            log_probs.push((prob + 1e-8).ln());
        }

        (actions, log_probs)
    }

    fn log_prob(&self, actions: &[Self::Action], device: &B::Device) -> Tensor<B, 1> {
        let batch_size = actions.len();
        let probs = self.probs();

        let action_indices: Vec<i32> = actions.iter().map(|a| a.0 as i32).collect();
        let actions_tensor: Tensor<B, 1, Int> =
            Tensor::from_ints(action_indices.as_slice(), device);
        let actions_2d: Tensor<B, 2, Int> = actions_tensor.reshape([batch_size, 1]);

        let selected_probs = probs.gather(1, actions_2d);
        let selected_probs_1d: Tensor<B, 1> = selected_probs.flatten(0, 1);

        (selected_probs_1d + 1e-8).log()
    }

    fn entropy(&self) -> Tensor<B, 1> {
        let probs = self.probs();
        let log_probs = (probs.clone() + 1e-8).log();
        // H = -sum(p * log(p))
        let neg_entropy: Tensor<B, 2> = (probs * log_probs).sum_dim(1);
        -neg_entropy.flatten(0, 1)
    }
}

// ============================================================================
// Gaussian policy output
// ============================================================================

/// Diagonal Gaussian distribution parameterized by mean and log_std.
#[derive(Clone)]
pub struct GaussianPolicyOutput<B: Backend> {
    /// Mean per dimension: [batch, action_dim]
    pub mean: Tensor<B, 2>,
    /// Log standard deviation per dimension: [batch, action_dim]
    pub log_std: Tensor<B, 2>,
}

impl<B: Backend> GaussianPolicyOutput<B> {
    /// Create from mean and log_std tensors.
    ///
    /// log_std is clamped to a fixed range to keep exp() and the log
    /// probability finite.
    pub fn new(mean: Tensor<B, 2>, log_std: Tensor<B, 2>) -> Self {
        Self {
            mean,
            log_std: log_std.clamp(LOG_STD_MIN, LOG_STD_MAX),
        }
    }

    /// Action dimension.
    pub fn action_dim(&self) -> usize {
        self.mean.dims()[1]
    }

    /// Batch size.
    pub fn batch_size(&self) -> usize {
        self.mean.dims()[0]
    }
}

/// Draw a standard normal variate via the Box-Muller transform.
fn standard_normal(rng: &mut StdRng) -> f32 {
    let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
    let u2: f32 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
}

impl<B: Backend> PolicyOutput<B> for GaussianPolicyOutput<B> {
    type Action = ContinuousAction;

    fn sample(&self, rng: &mut StdRng) -> (Vec<Self::Action>, Vec<f32>) {
        let mean_data = self.mean.to_data();
        let mean_slice: &[f32] = mean_data.as_slice().expect("mean tensor readable as f32");
        let log_std_data = self.log_std.to_data();
        let log_std_slice: &[f32] = log_std_data
            .as_slice()
            .expect("log_std tensor readable as f32");

        let batch_size = self.batch_size();
        let action_dim = self.action_dim();
        let log_2pi = (2.0 * std::f32::consts::PI).ln();

        let mut actions = Vec::with_capacity(batch_size);
        let mut log_probs = Vec::with_capacity(batch_size);

        for i in 0..batch_size {
            let mut action = Vec::with_capacity(action_dim);
            let mut log_prob = 0.0f32;

            for j in 0..action_dim {
                let idx = i * action_dim + j;
                let log_std = log_std_slice[idx];
                let std = log_std.exp();
                let z = standard_normal(rng);

                action.push(mean_slice[idx] + std * z);
                // log N(x; μ, σ) = -0.5 z² - log σ - 0.5 log 2π
                log_prob += -0.5 * z * z - log_std - 0.5 * log_2pi;
            }

            actions.push(ContinuousAction(action));
            log_probs.push(log_prob);
        }

        (actions, log_probs)
    }

    fn log_prob(&self, actions: &[Self::Action], device: &B::Device) -> Tensor<B, 1> {
        let batch_size = actions.len();
        let action_dim = self.action_dim();

        let mut action_floats = Vec::with_capacity(batch_size * action_dim);
        for action in actions {
            action_floats.extend_from_slice(&action.0);
        }
        let action_tensor: Tensor<B, 2> =
            Tensor::<B, 1>::from_floats(action_floats.as_slice(), device)
                .reshape([batch_size, action_dim]);

        let std = self.log_std.clone().exp();
        let normalized = (action_tensor - self.mean.clone()) / std;
        let log_2pi = (2.0 * std::f32::consts::PI).ln();

        let per_dim = normalized.powf_scalar(2.0).mul_scalar(-0.5)
            - self.log_std.clone()
            - 0.5 * log_2pi;

        let summed: Tensor<B, 2> = per_dim.sum_dim(1);
        summed.flatten(0, 1)
    }

    fn entropy(&self) -> Tensor<B, 1> {
        // H = 0.5 * D * (1 + log 2π) + Σ log σ
        let action_dim = self.action_dim() as f32;
        let log_2pi = (2.0 * std::f32::consts::PI).ln();
        let constant = 0.5 * action_dim * (1.0 + log_2pi);

        let sum_log_std: Tensor<B, 2> = self.log_std.clone().sum_dim(1);
        let flat: Tensor<B, 1> = sum_log_std.flatten(0, 1);
        flat + constant
    }
}
