//! Action selection and the exploration schedule.

use ndarray::ArrayView1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Serialize, Deserialize};

use crate::error::{DeepQError, Result};
use crate::estimator::{ActionValueEstimator, DeepQNetwork};

/// Chooses actions for states, given the estimator being trained.
///
/// The estimator is passed on every call rather than stored, so the training
/// loop stays the only owner of the parameters it updates.
pub trait Policy<E> {
    fn sample_action(&mut self, estimator: &E, state: ArrayView1<f32>) -> Result<usize>;

    fn set_epsilon(&mut self, epsilon: f32);

    fn epsilon(&self) -> f32;
}

/// Random action with probability `epsilon`, greedy action otherwise.
#[derive(Clone, Debug)]
pub struct EpsilonGreedyPolicy {
    epsilon: f32,
    rng: StdRng,
}

impl EpsilonGreedyPolicy {
    pub fn new(epsilon: f32) -> Self {
        Self::with_rng(epsilon, StdRng::from_entropy())
    }

    pub fn with_seed(epsilon: f32, seed: u64) -> Self {
        Self::with_rng(epsilon, StdRng::seed_from_u64(seed))
    }

    fn with_rng(epsilon: f32, rng: StdRng) -> Self {
        EpsilonGreedyPolicy {
            epsilon: epsilon.clamp(0.0, 1.0),
            rng,
        }
    }
}

impl Policy<DeepQNetwork> for EpsilonGreedyPolicy {
    fn sample_action(&mut self, estimator: &DeepQNetwork, state: ArrayView1<f32>) -> Result<usize> {
        if state.len() != estimator.in_features() {
            return Err(DeepQError::dimension_mismatch(
                format!("state of width {}", estimator.in_features()),
                format!("state of width {}", state.len()),
            ));
        }
        if self.rng.gen::<f32>() < self.epsilon {
            Ok(self.rng.gen_range(0..estimator.num_actions()))
        } else {
            estimator.greedy_action(state)
        }
    }

    fn set_epsilon(&mut self, epsilon: f32) {
        self.epsilon = epsilon.clamp(0.0, 1.0);
    }

    fn epsilon(&self) -> f32 {
        self.epsilon
    }
}

/// Linear decay of the exploration rate over cumulative environment steps,
/// floored at `end`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpsilonSchedule {
    pub start: f32,
    pub end: f32,
    pub decay_steps: usize,
}

impl Default for EpsilonSchedule {
    fn default() -> Self {
        EpsilonSchedule {
            start: 1.0,
            end: 0.05,
            decay_steps: 1000,
        }
    }
}

impl EpsilonSchedule {
    pub fn new(start: f32, end: f32, decay_steps: usize) -> Result<Self> {
        let schedule = EpsilonSchedule { start, end, decay_steps };
        schedule.validate()?;
        Ok(schedule)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.start) || !(0.0..=1.0).contains(&self.end) {
            return Err(DeepQError::invalid_parameter("epsilon", "start and end must lie in [0, 1]"));
        }
        if self.end > self.start {
            return Err(DeepQError::invalid_parameter("epsilon", "end must not exceed start"));
        }
        Ok(())
    }

    /// Exploration rate after `step` environment steps.
    pub fn value(&self, step: usize) -> f32 {
        if step >= self.decay_steps {
            return self.end;
        }
        let progress = step as f32 / self.decay_steps as f32;
        (self.start - (self.start - self.end) * progress).max(self.end)
    }
}
