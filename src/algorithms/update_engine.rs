//! PPO update engine: epochs, minibatches, and optimizer steps.
//!
//! The engine owns the policy and value networks plus one Adam optimizer
//! per network, and turns a rollout into gradient steps. Advantage
//! estimation always runs over the buffer in collection order; index
//! shuffling for minibatches happens strictly afterwards, so the GAE
//! recursion never reads a neighbor from a shuffled array.
//!
//! State normalization is the caller's concern: `update` receives states
//! already normalized with statistics frozen for the whole cycle.

use std::fmt;
use std::marker::PhantomData;

use burn::grad_clipping::GradientClippingConfig;
use burn::module::Module;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::Tensor;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::buffers::RolloutColumns;
use crate::checkpoint::{
    Checkpointer, CheckpointError, POLICY_FILE, POLICY_OPTIMIZER_FILE, TRAINER_STATE_FILE,
    VALUE_FILE, VALUE_OPTIMIZER_FILE,
};
use crate::config::PPOConfig;
use crate::metrics::{UpdateReport, UpdateStatus};
use crate::scheduling::LRScheduler;

use super::action_policy::{ActionValue, PolicyOutput};
use super::actor_critic::{PolicyNetwork, ValueNetwork};
use super::gae::{compute_gae, normalize_advantages};
use super::policy_loss::{ppo_clip_loss, value_loss};

/// Minibatches smaller than this fraction of the target batch size are
/// skipped rather than trained on.
const MIN_MINIBATCH_FRACTION: f32 = 0.8;

/// Error from a training update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    /// A non-finite quantity was detected before an optimizer step.
    /// No parameters were touched by the offending minibatch; the
    /// rollout data is left in place for inspection.
    NumericInstability {
        epoch: usize,
        minibatch: usize,
        quantity: &'static str,
    },
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateError::NumericInstability {
                epoch,
                minibatch,
                quantity,
            } => {
                write!(
                    f,
                    "non-finite {} at epoch {}, minibatch {}; update aborted",
                    quantity, epoch, minibatch
                )
            }
        }
    }
}

impl std::error::Error for UpdateError {}

/// PPO update engine.
///
/// Generic over the backend, the two network implementations, and the
/// action value type fixed by the policy's output distribution. The
/// networks live in `Option` slots because `Optimizer::step` consumes
/// and returns the module; they are always `Some` between public calls.
pub struct PPOUpdateEngine<B, P, V, A>
where
    B: AutodiffBackend,
    A: ActionValue,
    P: PolicyNetwork<B, A>,
    V: ValueNetwork<B>,
{
    policy: Option<P>,
    value: Option<V>,
    policy_optim: OptimizerAdaptor<Adam, P, B>,
    value_optim: OptimizerAdaptor<Adam, V, B>,
    scheduler: Box<dyn LRScheduler>,
    updates_completed: usize,
    config: PPOConfig,
    device: B::Device,
    _action: PhantomData<A>,
}

impl<B, P, V, A> PPOUpdateEngine<B, P, V, A>
where
    B: AutodiffBackend,
    A: ActionValue,
    P: PolicyNetwork<B, A>,
    V: ValueNetwork<B>,
{
    /// Create an engine around freshly initialized (or loaded) networks.
    pub fn new(policy: P, value: V, config: PPOConfig, device: B::Device) -> Self {
        let scheduler = config.scheduler.build(config.learning_rate);
        let adam = Self::adam_config(&config);

        Self {
            policy: Some(policy),
            value: Some(value),
            policy_optim: adam.clone().init::<B, P>(),
            value_optim: adam.init::<B, V>(),
            scheduler,
            updates_completed: 0,
            config,
            device,
            _action: PhantomData,
        }
    }

    fn adam_config(config: &PPOConfig) -> AdamConfig {
        let mut adam = AdamConfig::new().with_epsilon(1e-5);
        if let Some(max_norm) = config.max_grad_norm {
            adam = adam.with_grad_clipping(Some(GradientClippingConfig::Norm(max_norm)));
        }
        adam
    }

    /// Learning rate the next update cycle will run at.
    pub fn current_lr(&self) -> f64 {
        self.scheduler.get_lr(self.updates_completed)
    }

    /// Number of completed update cycles.
    pub fn updates_completed(&self) -> usize {
        self.updates_completed
    }

    /// Sample an action for one normalized state.
    ///
    /// Returns the action, its log probability under the current policy,
    /// and the current value estimate. No gradients are recorded.
    pub fn sample_action(&self, state: &[f32], rng: &mut StdRng) -> (A, f32, f32) {
        let policy = self.policy.as_ref().expect("policy network present");
        let value = self.value.as_ref().expect("value network present");

        let states: Tensor<B, 2> =
            Tensor::<B, 1>::from_floats(state, &self.device).reshape([1, state.len()]);

        let output = policy.forward(states.clone());
        let (mut actions, log_probs) = output.sample(rng);

        let value_est = value
            .forward(states)
            .into_data()
            .as_slice::<f32>()
            .expect("value tensor readable as f32")[0];

        (actions.remove(0), log_probs[0], value_est)
    }

    /// Evaluate a fixed action for one normalized state.
    ///
    /// Returns the current value estimate and the log probability of the
    /// action under the current policy. No gradients are recorded.
    pub fn evaluate_action(&self, state: &[f32], action: &A) -> (f32, f32) {
        let policy = self.policy.as_ref().expect("policy network present");
        let value = self.value.as_ref().expect("value network present");

        let states: Tensor<B, 2> =
            Tensor::<B, 1>::from_floats(state, &self.device).reshape([1, state.len()]);

        let output = policy.forward(states.clone());
        let log_prob = output
            .log_prob(std::slice::from_ref(action), &self.device)
            .into_data()
            .as_slice::<f32>()
            .expect("log_prob tensor readable as f32")[0];

        let value_est = value
            .forward(states)
            .into_data()
            .as_slice::<f32>()
            .expect("value tensor readable as f32")[0];

        (value_est, log_prob)
    }

    /// Run one full PPO update cycle over a rollout.
    ///
    /// `data` carries the rollout in collection order; `normalized_states`
    /// holds the same states after normalization (row-major, one row per
    /// transition) and `normalized_final_state` the normalized state that
    /// followed the last stored transition (ignored when that transition
    /// ended its episode).
    ///
    /// Below the minimum sample threshold this is a no-op returning an
    /// `InsufficientData` report. Otherwise it runs `num_epochs` shuffled
    /// minibatch passes, steps both optimizers per trained minibatch, and
    /// advances the schedule by one on completion. A non-finite loss or
    /// advantage aborts the cycle before the offending optimizer step and
    /// does not advance the schedule.
    pub fn update(
        &mut self,
        data: &RolloutColumns,
        normalized_states: &[f32],
        normalized_final_state: &[f32],
        rng: &mut StdRng,
    ) -> Result<UpdateReport, UpdateError> {
        let n = data.len();
        let state_dim = data.state_dim;
        let lr = self.current_lr();

        debug_assert_eq!(normalized_states.len(), n * state_dim);
        debug_assert_eq!(normalized_final_state.len(), state_dim);

        if n < self.config.min_required_samples() {
            log::debug!(
                "update skipped: {} samples available, {} required",
                n,
                self.config.min_required_samples()
            );
            return Ok(UpdateReport::insufficient_data(n, lr));
        }

        let batch_size_used = self.config.batch_size.min(n);
        let min_minibatch = MIN_MINIBATCH_FRACTION * batch_size_used as f32;

        let mut policy = self.policy.take().expect("policy network present");
        let mut value_net = self.value.take().expect("value network present");

        let actions: Vec<A> = (0..n)
            .map(|i| {
                A::from_floats(&data.actions[i * data.action_dim..(i + 1) * data.action_dim])
            })
            .collect();

        let mut indices: Vec<usize> = (0..n).collect();

        let mut policy_loss_sum = 0.0f32;
        let mut value_loss_sum = 0.0f32;
        let mut entropy_sum = 0.0f32;
        let mut adv_mean_sum = 0.0f32;
        let mut adv_std_sum = 0.0f32;
        let mut value_mean_sum = 0.0f32;
        let mut value_std_sum = 0.0f32;
        let mut updates_performed = 0usize;

        for epoch in 0..self.config.num_epochs {
            // Advantages come from the temporally ordered rollout with the
            // current value network; shuffling happens only after this.
            let values_ordered = self.forward_values(&value_net, normalized_states, state_dim);
            let bootstrap = if data.dones[n - 1] {
                0.0
            } else {
                self.forward_values(&value_net, normalized_final_state, state_dim)[0]
            };

            let (mut advantages, returns) = compute_gae(
                &data.rewards,
                &values_ordered,
                &data.dones,
                bootstrap,
                self.config.gamma,
                self.config.gae_lambda,
            );

            if self.config.normalize_advantages {
                normalize_advantages(&mut advantages);
            }

            if advantages.iter().any(|a| !a.is_finite()) {
                log::error!("non-finite advantage at epoch {}; update aborted", epoch);
                self.policy = Some(policy);
                self.value = Some(value_net);
                return Err(UpdateError::NumericInstability {
                    epoch,
                    minibatch: 0,
                    quantity: "advantage",
                });
            }

            indices.shuffle(rng);

            for (minibatch, chunk) in indices.chunks(batch_size_used).enumerate() {
                let m = chunk.len();
                if (m as f32) < min_minibatch {
                    log::debug!(
                        "skipping minibatch of {} samples (floor {:.1})",
                        m,
                        min_minibatch
                    );
                    continue;
                }

                let mut mb_states = Vec::with_capacity(m * state_dim);
                let mut mb_actions = Vec::with_capacity(m);
                let mut mb_old_log_probs = Vec::with_capacity(m);
                let mut mb_old_values = Vec::with_capacity(m);
                let mut mb_advantages = Vec::with_capacity(m);
                let mut mb_returns = Vec::with_capacity(m);
                for &i in chunk {
                    mb_states
                        .extend_from_slice(&normalized_states[i * state_dim..(i + 1) * state_dim]);
                    mb_actions.push(actions[i].clone());
                    mb_old_log_probs.push(data.log_probs[i]);
                    mb_old_values.push(data.values[i]);
                    mb_advantages.push(advantages[i]);
                    mb_returns.push(returns[i]);
                }

                let states_t: Tensor<B, 2> =
                    Tensor::<B, 1>::from_floats(mb_states.as_slice(), &self.device)
                        .reshape([m, state_dim]);
                let old_log_probs_t: Tensor<B, 1> =
                    Tensor::from_floats(mb_old_log_probs.as_slice(), &self.device);
                let old_values_t: Tensor<B, 1> =
                    Tensor::from_floats(mb_old_values.as_slice(), &self.device);
                let advantages_t: Tensor<B, 1> =
                    Tensor::from_floats(mb_advantages.as_slice(), &self.device);
                let returns_t: Tensor<B, 1> =
                    Tensor::from_floats(mb_returns.as_slice(), &self.device);

                let output = policy.forward(states_t.clone());
                let new_log_probs = output.log_prob(&mb_actions, &self.device);
                let entropy_t = output.entropy().mean();

                let p_loss =
                    ppo_clip_loss(new_log_probs, old_log_probs_t, advantages_t, self.config.clip_range);

                let v_pred = value_net.forward(states_t);
                let v_pred_vals = v_pred
                    .clone()
                    .into_data()
                    .to_vec::<f32>()
                    .expect("value tensor readable as f32");
                let v_loss = value_loss(v_pred, old_values_t, returns_t, self.config.clip_range);

                let policy_loss_val = scalar(p_loss.clone());
                let value_loss_val = scalar(v_loss.clone());
                let entropy_val = scalar(entropy_t.clone());

                let quantity = if !policy_loss_val.is_finite() {
                    Some("policy loss")
                } else if !value_loss_val.is_finite() {
                    Some("value loss")
                } else if !entropy_val.is_finite() {
                    Some("entropy")
                } else {
                    None
                };
                if let Some(quantity) = quantity {
                    log::error!(
                        "non-finite {} at epoch {}, minibatch {}; update aborted",
                        quantity,
                        epoch,
                        minibatch
                    );
                    self.policy = Some(policy);
                    self.value = Some(value_net);
                    return Err(UpdateError::NumericInstability {
                        epoch,
                        minibatch,
                        quantity,
                    });
                }

                let policy_total = p_loss - entropy_t.mul_scalar(self.config.ent_coef);
                let value_total = v_loss.mul_scalar(self.config.vf_coef);

                let policy_grads = GradientsParams::from_grads(policy_total.backward(), &policy);
                policy = self.policy_optim.step(lr, policy, policy_grads);

                let value_grads = GradientsParams::from_grads(value_total.backward(), &value_net);
                value_net = self.value_optim.step(lr, value_net, value_grads);

                let (adv_mean, adv_std) = mean_std(&mb_advantages);
                let (value_mean, value_std) = mean_std(&v_pred_vals);
                policy_loss_sum += policy_loss_val;
                value_loss_sum += value_loss_val;
                entropy_sum += entropy_val;
                adv_mean_sum += adv_mean;
                adv_std_sum += adv_std;
                value_mean_sum += value_mean;
                value_std_sum += value_std;
                updates_performed += 1;
            }
        }

        self.policy = Some(policy);
        self.value = Some(value_net);

        let status = if updates_performed > 0 {
            UpdateStatus::Updated
        } else {
            UpdateStatus::AllMinibatchesSkipped
        };

        // A completed cycle advances the schedule even when every
        // minibatch was skipped; the rollout was consumed either way.
        self.updates_completed += 1;

        let mut report = UpdateReport::empty(status, n, lr);
        report.batch_size_used = batch_size_used;
        report.updates_performed = updates_performed;
        if updates_performed > 0 {
            let k = updates_performed as f32;
            report = report
                .with_losses(
                    policy_loss_sum / k,
                    value_loss_sum / k,
                    entropy_sum / k,
                )
                .with_advantage_stats(adv_mean_sum / k, adv_std_sum / k)
                .with_value_stats(value_mean_sum / k, value_std_sum / k);
        }

        Ok(report)
    }

    fn forward_values(&self, value_net: &V, states: &[f32], state_dim: usize) -> Vec<f32> {
        let rows = states.len() / state_dim;
        let tensor: Tensor<B, 2> =
            Tensor::<B, 1>::from_floats(states, &self.device).reshape([rows, state_dim]);
        value_net
            .forward(tensor)
            .into_data()
            .to_vec::<f32>()
            .expect("value tensor readable as f32")
    }

    /// Record the networks, optimizer states, and update counter.
    pub fn save(&self, checkpointer: &Checkpointer) -> Result<(), CheckpointError> {
        let policy = self.policy.as_ref().expect("policy network present");
        let value = self.value.as_ref().expect("value network present");

        checkpointer.save_record::<B, _>(POLICY_FILE, policy.clone().into_record())?;
        checkpointer.save_record::<B, _>(VALUE_FILE, value.clone().into_record())?;
        checkpointer.save_record::<B, _>(POLICY_OPTIMIZER_FILE, self.policy_optim.to_record())?;
        checkpointer.save_record::<B, _>(VALUE_OPTIMIZER_FILE, self.value_optim.to_record())?;
        checkpointer.save_bytes(
            TRAINER_STATE_FILE,
            &(self.updates_completed as u64).to_le_bytes(),
        )?;
        Ok(())
    }

    /// Restore the networks, optimizer states, and update counter.
    ///
    /// All files are read before anything is applied, so a missing or
    /// unreadable file leaves the engine untouched.
    pub fn load(&mut self, checkpointer: &Checkpointer) -> Result<(), CheckpointError> {
        let policy_record = checkpointer.load_record::<B, _>(POLICY_FILE, &self.device)?;
        let value_record = checkpointer.load_record::<B, _>(VALUE_FILE, &self.device)?;
        let policy_optim_record =
            checkpointer.load_record::<B, _>(POLICY_OPTIMIZER_FILE, &self.device)?;
        let value_optim_record =
            checkpointer.load_record::<B, _>(VALUE_OPTIMIZER_FILE, &self.device)?;

        let state_bytes = checkpointer.load_bytes(TRAINER_STATE_FILE)?;
        let state: [u8; 8] = state_bytes
            .as_slice()
            .try_into()
            .map_err(|_| CheckpointError::Corrupt("trainer state must be 8 bytes"))?;

        let policy = self.policy.take().expect("policy network present");
        self.policy = Some(policy.load_record(policy_record));
        let value = self.value.take().expect("value network present");
        self.value = Some(value.load_record(value_record));

        let adam = Self::adam_config(&self.config);
        self.policy_optim = adam.clone().init::<B, P>().load_record(policy_optim_record);
        self.value_optim = adam.init::<B, V>().load_record(value_optim_record);

        self.updates_completed = u64::from_le_bytes(state) as usize;
        Ok(())
    }
}

fn scalar<B: AutodiffBackend>(t: Tensor<B, 1>) -> f32 {
    t.into_data()
        .as_slice::<f32>()
        .expect("scalar tensor readable as f32")[0]
}

fn mean_std(xs: &[f32]) -> (f32, f32) {
    if xs.is_empty() {
        return (0.0, 0.0);
    }
    let n = xs.len() as f32;
    let mean = xs.iter().sum::<f32>() / n;
    let variance = xs.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / n;
    (mean, variance.sqrt())
}
