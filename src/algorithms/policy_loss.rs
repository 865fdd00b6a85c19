//! PPO loss functions.
//!
//! # Numerical Stability
//!
//! The importance ratio is computed as exp(log_ratio) with the log ratio
//! clamped to [-20, 20]. exp(20) ≈ 485 million, far beyond any meaningful
//! ratio, so the clamp only removes overflow without biasing training.

use burn::tensor::backend::AutodiffBackend;
use burn::tensor::Tensor;

/// Maximum log ratio before exp() to prevent overflow.
const MAX_LOG_RATIO: f32 = 20.0;

/// PPO clipped surrogate loss.
///
/// L^CLIP(θ) = -E[min(r_t(θ) * A_t, clip(r_t(θ), 1-ε, 1+ε) * A_t)]
///
/// where r_t(θ) = π_θ(a_t|s_t) / π_θ_old(a_t|s_t). Negated so that
/// minimizing the result maximizes the surrogate objective.
///
/// # Arguments
///
/// * `log_probs` - Current policy log probs: [batch_size]
/// * `old_log_probs` - Collection-time log probs (detached): [batch_size]
/// * `advantages` - Advantage estimates (detached): [batch_size]
/// * `clip_range` - Clipping range ε (typically 0.2)
///
/// # Returns
///
/// Scalar loss as a single-element 1D tensor, ready for backprop.
pub fn ppo_clip_loss<B: AutodiffBackend>(
    log_probs: Tensor<B, 1>,
    old_log_probs: Tensor<B, 1>,
    advantages: Tensor<B, 1>,
    clip_range: f32,
) -> Tensor<B, 1> {
    let log_ratio = log_probs - old_log_probs;
    let clamped_log_ratio = log_ratio.clamp(-MAX_LOG_RATIO, MAX_LOG_RATIO);
    let ratio = clamped_log_ratio.exp();

    let clipped_ratio = ratio.clone().clamp(1.0 - clip_range, 1.0 + clip_range);

    let surr1 = ratio * advantages.clone();
    let surr2 = clipped_ratio * advantages;

    // Pessimistic bound
    let clipped_surr = surr1.min_pair(surr2);

    -clipped_surr.mean()
}

/// Dual-clipped value function loss.
///
/// L^V = 0.5 * E[max((V - R)², (V_old + clip(V - V_old, -ε, ε) - R)²)]
///
/// Taking the elementwise maximum of the clipped and unclipped squared
/// errors keeps the gradient conservative: a value prediction that moved
/// far from its collection-time estimate cannot shrink the loss below
/// what the clipped prediction would incur.
///
/// # Arguments
///
/// * `values` - Current value predictions: [batch_size]
/// * `old_values` - Collection-time value predictions: [batch_size]
/// * `returns` - Target returns: [batch_size]
/// * `clip_range` - Clipping range ε (shared with the policy clip)
pub fn value_loss<B: AutodiffBackend>(
    values: Tensor<B, 1>,
    old_values: Tensor<B, 1>,
    returns: Tensor<B, 1>,
    clip_range: f32,
) -> Tensor<B, 1> {
    let values_clipped =
        old_values.clone() + (values.clone() - old_values).clamp(-clip_range, clip_range);

    let loss_unclipped = (values - returns.clone()).powf_scalar(2.0);
    let loss_clipped = (values_clipped - returns).powf_scalar(2.0);

    loss_unclipped.max_pair(loss_clipped).mean().mul_scalar(0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type B = Autodiff<NdArray<f32>>;

    fn scalar(t: Tensor<B, 1>) -> f32 {
        t.into_data().as_slice::<f32>().unwrap()[0]
    }

    fn tensor1(data: &[f32]) -> Tensor<B, 1> {
        let device = Default::default();
        Tensor::from_floats(data, &device)
    }

    #[test]
    fn test_clip_loss_unit_ratio() {
        // Identical policies: ratio is 1, loss is -mean(advantages)
        let loss = ppo_clip_loss(
            tensor1(&[-1.0, -1.0]),
            tensor1(&[-1.0, -1.0]),
            tensor1(&[1.0, 3.0]),
            0.2,
        );
        assert!((scalar(loss) - (-2.0)).abs() < 1e-6);
    }

    #[test]
    fn test_clip_loss_clips_large_ratio() {
        // ratio = exp(0 - (-1)) = e ≈ 2.718, clipped to 1.2
        let loss = ppo_clip_loss(tensor1(&[0.0]), tensor1(&[-1.0]), tensor1(&[1.0]), 0.2);
        assert!((scalar(loss) - (-1.2)).abs() < 0.01);
    }

    #[test]
    fn test_clip_loss_negative_advantage_keeps_pessimistic_bound() {
        // ratio ≈ 2.718 with a negative advantage: the unclipped surrogate
        // is the smaller (more negative) term, so the min keeps it.
        let loss = ppo_clip_loss(tensor1(&[0.0]), tensor1(&[-1.0]), tensor1(&[-1.0]), 0.2);
        let e = 1.0f32.exp();
        assert!((scalar(loss) - e).abs() < 0.01);
    }

    #[test]
    fn test_clip_direction_monotonicity() {
        // Raising the log prob of a positive-advantage action must not
        // increase the loss; lowering it must not decrease the loss.
        let base = scalar(ppo_clip_loss(
            tensor1(&[-1.0]),
            tensor1(&[-1.0]),
            tensor1(&[1.0]),
            0.2,
        ));
        let raised = scalar(ppo_clip_loss(
            tensor1(&[-0.9]),
            tensor1(&[-1.0]),
            tensor1(&[1.0]),
            0.2,
        ));
        let lowered = scalar(ppo_clip_loss(
            tensor1(&[-1.1]),
            tensor1(&[-1.0]),
            tensor1(&[1.0]),
            0.2,
        ));

        assert!(raised <= base + 1e-6);
        assert!(lowered >= base - 1e-6);
    }

    #[test]
    fn test_value_loss_perfect_predictions() {
        let loss = value_loss(
            tensor1(&[1.0, 2.0]),
            tensor1(&[1.0, 2.0]),
            tensor1(&[1.0, 2.0]),
            0.2,
        );
        assert!(scalar(loss).abs() < 1e-6);
    }

    #[test]
    fn test_value_loss_dual_clip_takes_maximum() {
        // V moved from 0.0 to 1.0 with target 1.0 and ε=0.2.
        // Unclipped error: (1.0 - 1.0)² = 0
        // Clipped prediction: 0.0 + clip(1.0, -0.2, 0.2) = 0.2, error (0.2 - 1.0)² = 0.64
        // Dual clip keeps the larger: 0.5 * 0.64 = 0.32
        let loss = value_loss(tensor1(&[1.0]), tensor1(&[0.0]), tensor1(&[1.0]), 0.2);
        assert!((scalar(loss) - 0.32).abs() < 1e-5);
    }

    #[test]
    fn test_value_loss_half_factor() {
        // V unchanged from old, error of 2.0: loss = 0.5 * 4.0 = 2.0
        let loss = value_loss(tensor1(&[1.0]), tensor1(&[1.0]), tensor1(&[3.0]), 0.2);
        assert!((scalar(loss) - 2.0).abs() < 1e-5);
    }
}
