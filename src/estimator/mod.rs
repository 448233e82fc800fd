//! # Action-Value Estimators
//!
//! An estimator maps a batch of states to one score per discrete action and
//! knows how to turn transitions into Bellman regression targets
//! `reward + γ · (1 − done) · max_a Q(next_state, a)`.
//!
//! Current values and targets share one parameter set but have asymmetric
//! gradient visibility: [`ActionValueEstimator::compute_targets`] borrows the
//! estimator immutably and returns a plain array, so nothing it computes can
//! reach the gradient store. Gradients only flow through the traced path of
//! [`DeepQNetwork::compute_q_vals_traced`].

mod dqn;

pub use dqn::{DeepQNetwork, EstimatorConfig, QValTrace, TargetTrace};

use ndarray::{Array2, ArrayView2};

use crate::batch::{memory_to_input, Batch, TerminalFlag};
use crate::error::{DeepQError, Result};
use crate::replay_buffer::Transition;

pub trait ActionValueEstimator {
    /// Width of the state vectors the estimator accepts.
    fn in_features(&self) -> usize;

    /// Number of discrete actions, i.e. the output width.
    fn num_actions(&self) -> usize;

    /// Per-action values for every row of `states`, shape `(N, num_actions)`.
    fn forward(&self, states: ArrayView2<f32>) -> Result<Array2<f32>>;

    /// Value of the taken action for every row, shape `(N, 1)`.
    fn compute_q_vals(&self, states: ArrayView2<f32>, actions: ArrayView2<usize>) -> Result<Array2<f32>>;

    /// Bellman targets for a batch, shape `(N, 1)`.
    fn compute_targets<D: TerminalFlag>(
        &self,
        reward: ArrayView2<f32>,
        next_state: ArrayView2<f32>,
        done: ArrayView2<D>,
    ) -> Result<Array2<f32>>;

    /// State values. Not provided by Q-learning estimators.
    fn compute_v_vals(&self, _states: ArrayView2<f32>) -> Result<Array2<f32>> {
        Err(DeepQError::Unsupported("compute_v_vals"))
    }

    fn memory_to_input(&self, transitions: &[&Transition]) -> Result<Batch> {
        memory_to_input(transitions.iter().copied())
    }
}

/// Check that `actions` is an `(N, 1)` column of indices below `num_actions`.
pub(crate) fn check_actions(actions: &ArrayView2<usize>, rows: usize, num_actions: usize) -> Result<()> {
    if actions.dim() != (rows, 1) {
        return Err(DeepQError::dimension_mismatch(
            format!("({}, 1)", rows),
            format!("{:?}", actions.dim()),
        ));
    }
    if let Some(&action) = actions.iter().find(|&&a| a >= num_actions) {
        return Err(DeepQError::InvalidAction {
            action,
            max_actions: num_actions,
        });
    }
    Ok(())
}

/// Index and value of the largest entry of every row.
///
/// A NaN anywhere in a row is returned as that row's maximum.
pub(crate) fn row_argmax(values: &Array2<f32>) -> Vec<(usize, f32)> {
    values
        .rows()
        .into_iter()
        .map(|row| {
            let mut best = (0, row[0]);
            for (i, &v) in row.iter().enumerate() {
                if v.is_nan() {
                    return (i, v);
                }
                if v > best.1 {
                    best = (i, v);
                }
            }
            best
        })
        .collect()
}
