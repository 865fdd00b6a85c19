//! Generalized Advantage Estimation.
//!
//! GAE provides a family of advantage estimators parameterized by λ:
//! - λ = 0: one-step TD (low variance, high bias)
//! - λ = 1: discounted Monte Carlo return minus baseline (high variance, low bias)
//! - λ ∈ (0, 1): interpolation
//!
//! ## Formula
//!
//! A_t^GAE(γ,λ) = Σ_{l=0}^{∞} (γλ)^l δ_{t+l}
//! where δ_t = r_t + γ V(s_{t+1}) - V(s_t)
//!
//! ## References
//!
//! - Schulman et al., "High-Dimensional Continuous Control Using
//!   Generalized Advantage Estimation" (2016)

/// Compute GAE advantages and returns over a temporally ordered trajectory.
///
/// Inputs must be in collection order; the backward recursion reads
/// `V(s_{t+1})` from the next slot, so any reordering (shuffling for
/// minibatches included) must happen after this call, never before.
///
/// A done flag at step t zeroes both the bootstrap term in δ_t and the
/// accumulated advantage carried from t+1, so nothing leaks across an
/// episode boundary.
///
/// # Arguments
///
/// * `rewards` - rewards received [T]
/// * `values` - value estimates V(s) [T]
/// * `dones` - episode termination flags [T]
/// * `last_value` - V(s_T) for bootstrap (ignored when dones[T-1] is true)
/// * `gamma` - discount factor
/// * `gae_lambda` - GAE λ parameter
///
/// # Returns
///
/// (advantages, returns) - both [T], with returns[t] = advantages[t] + values[t]
pub fn compute_gae(
    rewards: &[f32],
    values: &[f32],
    dones: &[bool],
    last_value: f32,
    gamma: f32,
    gae_lambda: f32,
) -> (Vec<f32>, Vec<f32>) {
    let n = rewards.len();
    assert_eq!(values.len(), n);
    assert_eq!(dones.len(), n);

    let mut advantages = vec![0.0f32; n];
    let mut returns = vec![0.0f32; n];

    let mut gae = 0.0f32;
    let mut next_value = last_value;

    for t in (0..n).rev() {
        let not_done = if dones[t] { 0.0 } else { 1.0 };

        // TD residual: δ_t = r_t + γ * V(s_{t+1}) - V(s_t)
        let delta = rewards[t] + gamma * next_value * not_done - values[t];

        // GAE: A_t = δ_t + γλ * A_{t+1}
        gae = delta + gamma * gae_lambda * not_done * gae;

        advantages[t] = gae;
        returns[t] = gae + values[t];

        next_value = values[t];
    }

    (advantages, returns)
}

/// Normalize advantages to zero mean and unit variance in place.
///
/// # Edge Cases
///
/// - Empty slice: no-op
/// - Single element: sets to 0.0 (can't compute meaningful variance)
/// - All same values: sets all to 0.0 (epsilon prevents NaN)
pub fn normalize_advantages(advantages: &mut [f32]) {
    if advantages.is_empty() {
        return;
    }

    if advantages.len() == 1 {
        advantages[0] = 0.0;
        return;
    }

    let n = advantages.len() as f32;
    let mean = advantages.iter().sum::<f32>() / n;
    // Population variance with epsilon for stability
    let variance = advantages.iter().map(|a| (a - mean).powi(2)).sum::<f32>() / n;
    let std = (variance + 1e-8).sqrt();

    for a in advantages.iter_mut() {
        *a = (*a - mean) / std;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gae_returns_equal_advantage_plus_value() {
        let rewards = vec![1.0, 1.0, 1.0];
        let values = vec![0.5, 0.4, 0.3];
        let dones = vec![false, false, false];

        let (advantages, returns) = compute_gae(&rewards, &values, &dones, 0.5, 0.99, 0.95);

        assert_eq!(advantages.len(), 3);
        assert_eq!(returns.len(), 3);
        for i in 0..3 {
            assert!(
                (returns[i] - (advantages[i] + values[i])).abs() < 1e-6,
                "return[{}] != advantage[{}] + value[{}]",
                i,
                i,
                i
            );
        }
    }

    #[test]
    fn test_lambda_one_reduces_to_discounted_return_minus_value() {
        let rewards = vec![1.0, 2.0, 3.0];
        let values = vec![0.5, 0.4, 0.3];
        let dones = vec![false, false, false];
        let gamma = 0.9f32;
        let last_value = 0.7;

        let (advantages, _) = compute_gae(&rewards, &values, &dones, last_value, gamma, 1.0);

        // With λ=1 and no terminations, A_t = G_t - V(s_t) where
        // G_t = Σ γ^k r_{t+k} + γ^{T-t} V(s_T)
        let g2 = rewards[2] + gamma * last_value;
        let g1 = rewards[1] + gamma * g2;
        let g0 = rewards[0] + gamma * g1;

        assert!((advantages[0] - (g0 - values[0])).abs() < 1e-5);
        assert!((advantages[1] - (g1 - values[1])).abs() < 1e-5);
        assert!((advantages[2] - (g2 - values[2])).abs() < 1e-5);
    }

    #[test]
    fn test_done_blocks_advantage_leakage() {
        let gamma = 0.99;
        let lambda = 0.95;

        // Two episodes back to back; the second ends with a big reward.
        let rewards = vec![0.0, 0.0, 100.0];
        let values = vec![0.0, 0.0, 0.0];
        let with_boundary = vec![false, true, false];

        let (adv, _) = compute_gae(&rewards, &values, &with_boundary, 0.0, gamma, lambda);

        // Step 1 terminates its episode with zero reward and zero value,
        // so nothing from step 2 may flow back into steps 0 and 1.
        assert!(adv[0].abs() < 1e-6, "advantage leaked across boundary: {}", adv[0]);
        assert!(adv[1].abs() < 1e-6);
        assert!((adv[2] - 100.0).abs() < 1e-4);

        // Without the boundary the reward propagates backwards.
        let no_boundary = vec![false, false, false];
        let (adv_open, _) = compute_gae(&rewards, &values, &no_boundary, 0.0, gamma, lambda);
        assert!(adv_open[0] > 10.0);
    }

    #[test]
    fn test_terminal_last_step_ignores_bootstrap() {
        let rewards = vec![1.0, 1.0, 0.0];
        let values = vec![0.5, 0.5, 0.0];
        let dones = vec![false, false, true];

        // A huge bootstrap value must not affect anything when the
        // trajectory ends on a terminal step.
        let (adv, _) = compute_gae(&rewards, &values, &dones, 1e6, 0.99, 0.95);
        assert!(adv[2].abs() < 1e-6, "expected adv[2]≈0, got {}", adv[2]);
    }

    #[test]
    fn test_lambda_zero_is_one_step_td() {
        let rewards = vec![1.0, 1.0, 1.0];
        let values = vec![0.2, 0.3, 0.4];
        let dones = vec![false, false, false];
        let gamma = 0.99f32;
        let last_value = 0.5;

        let (adv, _) = compute_gae(&rewards, &values, &dones, last_value, gamma, 0.0);

        // A_t = r_t + γV(s_{t+1}) - V(s_t), no accumulation
        assert!((adv[0] - (1.0 + gamma * values[1] - values[0])).abs() < 1e-6);
        assert!((adv[1] - (1.0 + gamma * values[2] - values[1])).abs() < 1e-6);
        assert!((adv[2] - (1.0 + gamma * last_value - values[2])).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_advantages() {
        let mut advantages = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        normalize_advantages(&mut advantages);

        let mean: f32 = advantages.iter().sum::<f32>() / advantages.len() as f32;
        assert!(mean.abs() < 1e-6, "expected mean≈0, got {}", mean);

        let variance: f32 =
            advantages.iter().map(|a| a.powi(2)).sum::<f32>() / advantages.len() as f32;
        assert!((variance.sqrt() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_advantages_edge_cases() {
        let mut empty: Vec<f32> = vec![];
        normalize_advantages(&mut empty);
        assert!(empty.is_empty());

        let mut single = vec![5.0];
        normalize_advantages(&mut single);
        assert!(single[0].abs() < 1e-3);

        let mut constant = vec![2.0, 2.0, 2.0];
        normalize_advantages(&mut constant);
        for a in &constant {
            assert!(a.is_finite());
            assert!(a.abs() < 1e-3);
        }
    }
}
