//! The environment contract the training loop drives.

use ndarray::Array1;

use crate::error::Result;

/// Outcome of one environment step.
#[derive(Clone, Debug, PartialEq)]
pub struct Step<I> {
    pub next_state: Array1<f32>,
    pub reward: f32,
    /// True iff `next_state` is terminal.
    pub done: bool,
    /// Environment-specific extras, never inspected by the trainer.
    pub info: I,
}

pub trait Environment {
    type Info;

    /// Start a new episode and return its initial state.
    fn reset(&mut self) -> Result<Array1<f32>>;

    fn step(&mut self, action: usize) -> Result<Step<Self::Info>>;
}
