//! PPO agent: rollout collection glued to the update engine.
//!
//! The agent owns everything with cross-call state: the rollout buffer,
//! the state normalizer, the RNG, and the engine with its networks and
//! optimizers. The environment loop only ever calls four methods:
//!
//! 1. [`PPOAgent::act`] to sample an action for the current state
//! 2. [`PPOAgent::store`] to record the resulting transition
//! 3. [`PPOAgent::episode_complete`] at episode boundaries, which is the
//!    one and only place training can trigger
//! 4. [`PPOAgent::save`] / [`PPOAgent::load`] around process restarts
//!
//! Training never hides inside `store`: a full buffer surfaces as a
//! `BufferError::Overflow` instead of silently training or dropping
//! data, and the caller decides when an episode ends.

use burn::tensor::backend::AutodiffBackend;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::algorithms::action_policy::ActionValue;
use crate::algorithms::actor_critic::{PolicyNetwork, ValueNetwork};
use crate::algorithms::update_engine::{PPOUpdateEngine, UpdateError};
use crate::buffers::{BufferError, RolloutBuffer};
use crate::checkpoint::{CheckpointError, Checkpointer, NORMALIZER_FILE};
use crate::config::{ConfigError, PPOConfig};
use crate::core::{RunningNormalizer, Transition};
use crate::metrics::{UpdateReport, UpdateStatus};

/// On-policy PPO agent.
pub struct PPOAgent<B, P, V, A>
where
    B: AutodiffBackend,
    A: ActionValue,
    P: PolicyNetwork<B, A>,
    V: ValueNetwork<B>,
{
    engine: PPOUpdateEngine<B, P, V, A>,
    buffer: RolloutBuffer,
    normalizer: RunningNormalizer,
    rng: StdRng,
    state_dim: usize,
}

impl<B, P, V, A> PPOAgent<B, P, V, A>
where
    B: AutodiffBackend,
    A: ActionValue,
    P: PolicyNetwork<B, A>,
    V: ValueNetwork<B>,
{
    /// Create an agent from freshly initialized networks.
    ///
    /// `action_dim` is the fixed float width of one encoded action
    /// (1 for discrete action spaces). Fails if the configuration is
    /// inconsistent; nothing is allocated in that case.
    pub fn new(
        policy: P,
        value: V,
        state_dim: usize,
        action_dim: usize,
        config: PPOConfig,
        device: B::Device,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let buffer = RolloutBuffer::new(config.buffer_capacity, state_dim, action_dim);
        let rng = StdRng::seed_from_u64(config.seed);
        let normalizer = RunningNormalizer::new(state_dim);
        let engine = PPOUpdateEngine::new(policy, value, config, device);

        Ok(Self {
            engine,
            buffer,
            normalizer,
            rng,
            state_dim,
        })
    }

    /// Sample an action for a raw (unnormalized) state.
    ///
    /// The state is normalized with the current statistics but the
    /// statistics are not updated here; that happens in [`store`], once
    /// per transition, so a state seen by `act` and never stored leaves
    /// no trace.
    ///
    /// [`store`]: PPOAgent::store
    pub fn act(&mut self, state: &[f32]) -> A {
        debug_assert_eq!(state.len(), self.state_dim);
        let normalized = self.normalizer.normalize(state);
        let (action, _log_prob, _value) = self.engine.sample_action(&normalized, &mut self.rng);
        action
    }

    /// Record one transition.
    ///
    /// Updates the normalizer with the raw state first, then evaluates
    /// the critic value and the current-policy log probability of the
    /// action on the freshly normalized state. The transition is stored
    /// with the raw state; normalization for training happens at update
    /// time with the statistics current then.
    pub fn store(
        &mut self,
        state: &[f32],
        action: &A,
        reward: f32,
        done: bool,
    ) -> Result<(), BufferError> {
        debug_assert_eq!(state.len(), self.state_dim);

        self.normalizer.update(state);
        let normalized = self.normalizer.normalize(state);
        let (value, log_prob) = self.engine.evaluate_action(&normalized, action);

        self.buffer.store(Transition::new(
            state.to_vec(),
            action.as_floats(),
            reward,
            value,
            log_prob,
            done,
        ))
    }

    /// Signal an episode boundary and train if enough data accumulated.
    ///
    /// `final_state` is the raw state the environment ended up in after
    /// the last stored transition; it bootstraps the advantage recursion
    /// when that transition did not terminate its episode.
    ///
    /// Returns the update report. On `InsufficientData` the buffer keeps
    /// its transitions and collection continues; on any completed update
    /// the buffer is cleared. An `Err` leaves the buffer intact so the
    /// offending rollout can be inspected.
    pub fn episode_complete(&mut self, final_state: &[f32]) -> Result<UpdateReport, UpdateError> {
        debug_assert_eq!(final_state.len(), self.state_dim);

        let data = self.buffer.columns();
        // One normalization pass per cycle; stats are frozen until the
        // next store.
        let normalized_states = self.normalizer.normalize_batch(&data.states);
        let normalized_final = self.normalizer.normalize(final_state);

        let report = self
            .engine
            .update(&data, &normalized_states, &normalized_final, &mut self.rng)?;

        if report.status != UpdateStatus::InsufficientData {
            self.buffer.clear();
        }
        Ok(report)
    }

    /// Write a full checkpoint to `dir`.
    pub fn save(&self, dir: impl AsRef<std::path::Path>) -> Result<(), CheckpointError> {
        let checkpointer = Checkpointer::new(dir)?;
        self.engine.save(&checkpointer)?;
        checkpointer.save_bytes(NORMALIZER_FILE, &self.normalizer.to_bytes())?;
        Ok(())
    }

    /// Restore networks, optimizers, normalizer, and the update counter
    /// from a checkpoint directory.
    ///
    /// The rollout buffer is not part of a checkpoint; it starts empty
    /// after a load.
    pub fn load(&mut self, dir: impl AsRef<std::path::Path>) -> Result<(), CheckpointError> {
        let checkpointer = Checkpointer::new(dir)?;

        let bytes = checkpointer.load_bytes(NORMALIZER_FILE)?;
        let normalizer =
            RunningNormalizer::from_bytes(&bytes).map_err(CheckpointError::Corrupt)?;
        if normalizer.dim() != self.state_dim {
            return Err(CheckpointError::Corrupt(
                "normalizer dimension does not match agent state dimension",
            ));
        }

        self.engine.load(&checkpointer)?;
        self.normalizer = normalizer;
        self.buffer.clear();
        Ok(())
    }

    /// Transitions currently buffered.
    pub fn buffered_transitions(&self) -> usize {
        self.buffer.len()
    }

    /// Completed update cycles.
    pub fn updates_completed(&self) -> usize {
        self.engine.updates_completed()
    }

    /// Learning rate the next update will run at.
    pub fn current_lr(&self) -> f64 {
        self.engine.current_lr()
    }

    /// State normalizer statistics.
    pub fn normalizer(&self) -> &RunningNormalizer {
        &self.normalizer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::action_policy::{DiscreteAction, DiscretePolicyOutput};
    use crate::config::SchedulerConfig;
    use burn::backend::{Autodiff, NdArray};
    use burn::module::Module;
    use burn::nn::{Linear, LinearConfig};
    use burn::tensor::backend::Backend;
    use burn::tensor::Tensor;

    type TB = Autodiff<NdArray<f32>>;

    const STATE_DIM: usize = 4;
    const N_ACTIONS: usize = 3;

    #[derive(Module, Debug)]
    struct TinyPolicy<B: Backend> {
        linear: Linear<B>,
    }

    impl<B: Backend> TinyPolicy<B> {
        fn new(device: &B::Device) -> Self {
            Self {
                linear: LinearConfig::new(STATE_DIM, N_ACTIONS).init(device),
            }
        }
    }

    impl<B: AutodiffBackend> PolicyNetwork<B, DiscreteAction> for TinyPolicy<B> {
        type Output = DiscretePolicyOutput<B>;

        fn forward(&self, states: Tensor<B, 2>) -> Self::Output {
            DiscretePolicyOutput::new(self.linear.forward(states))
        }
    }

    #[derive(Module, Debug)]
    struct TinyValue<B: Backend> {
        linear: Linear<B>,
    }

    impl<B: Backend> TinyValue<B> {
        fn new(device: &B::Device) -> Self {
            Self {
                linear: LinearConfig::new(STATE_DIM, 1).init(device),
            }
        }
    }

    impl<B: AutodiffBackend> ValueNetwork<B> for TinyValue<B> {
        fn forward(&self, states: Tensor<B, 2>) -> Tensor<B, 1> {
            self.linear.forward(states).flatten(0, 1)
        }
    }

    fn agent(config: PPOConfig) -> PPOAgent<TB, TinyPolicy<TB>, TinyValue<TB>, DiscreteAction> {
        let device = Default::default();
        PPOAgent::new(
            TinyPolicy::new(&device),
            TinyValue::new(&device),
            STATE_DIM,
            1,
            config,
            device,
        )
        .unwrap()
    }

    fn test_config() -> PPOConfig {
        PPOConfig::default()
            .with_batch_size(16)
            .with_buffer_capacity(64)
            .with_num_epochs(3)
            .with_seed(11)
    }

    fn step_state(i: usize) -> Vec<f32> {
        let x = i as f32;
        vec![x * 0.05, (x * 0.3).sin(), 1.0 - x * 0.01, 0.5]
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let device = <TB as Backend>::Device::default();
        let result = PPOAgent::<TB, TinyPolicy<TB>, TinyValue<TB>, DiscreteAction>::new(
            TinyPolicy::new(&device),
            TinyValue::new(&device),
            STATE_DIM,
            1,
            PPOConfig::default().with_num_epochs(0),
            device,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_store_updates_normalizer_and_buffer() {
        let mut agent = agent(test_config());

        for i in 0..5 {
            let state = step_state(i);
            let action = agent.act(&state);
            agent.store(&state, &action, 1.0, false).unwrap();
        }

        assert_eq!(agent.buffered_transitions(), 5);
        assert_eq!(agent.normalizer().count(), 5.0);
    }

    #[test]
    fn test_episode_complete_below_threshold_keeps_buffer() {
        let mut agent = agent(test_config());

        for i in 0..10 {
            let state = step_state(i);
            let action = agent.act(&state);
            agent.store(&state, &action, 0.5, false).unwrap();
        }

        let report = agent.episode_complete(&step_state(10)).unwrap();
        assert_eq!(report.status, UpdateStatus::InsufficientData);
        assert_eq!(agent.buffered_transitions(), 10);
        assert_eq!(agent.updates_completed(), 0);
    }

    #[test]
    fn test_training_cycle_end_to_end() {
        // 40 transitions, batch 16, 3 epochs: per epoch two full
        // minibatches train and the 8-sample tail is skipped.
        let mut agent = agent(test_config());

        for i in 0..40 {
            let state = step_state(i);
            let action = agent.act(&state);
            let reward = if action.0 == 0 { 1.0 } else { -0.1 };
            let done = i % 20 == 19;
            agent.store(&state, &action, reward, done).unwrap();
        }

        let report = agent.episode_complete(&step_state(40)).unwrap();

        assert_eq!(report.status, UpdateStatus::Updated);
        assert_eq!(report.updates_performed, 3 * 2);
        assert_eq!(report.batch_size_used, 16);
        assert_eq!(report.available_samples, 40);
        assert_eq!(agent.buffered_transitions(), 0);
        assert_eq!(agent.updates_completed(), 1);

        // Collection continues cleanly after a cleared buffer.
        let state = step_state(41);
        let action = agent.act(&state);
        agent.store(&state, &action, 0.0, false).unwrap();
        assert_eq!(agent.buffered_transitions(), 1);
    }

    #[test]
    fn test_buffer_overflow_surfaces() {
        let config = test_config().with_buffer_capacity(32);
        let mut agent = agent(config);

        for i in 0..32 {
            let state = step_state(i);
            let action = agent.act(&state);
            agent.store(&state, &action, 0.0, false).unwrap();
        }

        let state = step_state(32);
        let action = agent.act(&state);
        let result = agent.store(&state, &action, 0.0, false);
        assert!(matches!(result, Err(BufferError::Overflow { capacity: 32 })));
        assert_eq!(agent.buffered_transitions(), 32);
    }

    #[test]
    fn test_scheduler_steps_with_updates() {
        let config = test_config()
            .with_learning_rate(1e-3)
            .with_scheduler(SchedulerConfig::Step {
                step_size: 1,
                decay: 0.5,
            });
        let mut agent = agent(config);

        for i in 0..32 {
            let state = step_state(i);
            let action = agent.act(&state);
            agent.store(&state, &action, 1.0, false).unwrap();
        }
        agent.episode_complete(&step_state(32)).unwrap();

        assert!((agent.current_lr() - 5e-4).abs() < 1e-12);
    }

    #[test]
    fn test_checkpoint_roundtrip_reproduces_evaluations() {
        let dir = tempfile::tempdir().unwrap();
        let mut agent_a = agent(test_config());

        for i in 0..32 {
            let state = step_state(i);
            let action = agent_a.act(&state);
            agent_a.store(&state, &action, 1.0, i == 31).unwrap();
        }
        agent_a.episode_complete(&step_state(32)).unwrap();
        agent_a.save(dir.path()).unwrap();

        let mut agent_b = agent(test_config());
        agent_b.load(dir.path()).unwrap();

        assert_eq!(agent_b.updates_completed(), 1);
        assert_eq!(
            agent_a.normalizer().count(),
            agent_b.normalizer().count()
        );

        // Identical weights and normalizer: storing the same transition
        // records the same value estimate and log probability.
        let probe = step_state(100);
        let action = DiscreteAction(1);
        agent_a.store(&probe, &action, 0.0, false).unwrap();
        agent_b.store(&probe, &action, 0.0, false).unwrap();

        let cols_a = agent_a.buffer.columns();
        let cols_b = agent_b.buffer.columns();
        assert!((cols_a.values[0] - cols_b.values[0]).abs() < 1e-6);
        assert!((cols_a.log_probs[0] - cols_b.log_probs[0]).abs() < 1e-6);
    }
}
