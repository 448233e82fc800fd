//! # deepq - Deep Q-Learning with Experience Replay
//!
//! deepq implements the learning core of a value-based reinforcement-learning
//! agent: a feed-forward action-value estimator, a bounded replay buffer and the
//! single-step Q-learning update that turns sampled transitions into
//! regression targets.
//!
//! ## Key Features
//!
//! - **Estimator**: `Linear -> ReLU` stacks built from a list of hidden widths
//! - **Bellman targets**: terminal masking and semi-gradient isolation
//! - **Replay**: fixed-capacity FIFO buffer with seedable uniform sampling
//! - **Training loop**: epsilon-greedy exploration with a decaying schedule
//!
//! ## Quick Start
//!
//! ```rust
//! use deepq::estimator::{DeepQNetwork, EstimatorConfig};
//! use deepq::optimizer::OptimizerConfig;
//! use deepq::replay_buffer::{ReplayBuffer, Transition};
//! use deepq::trainer::{train_q_net, GradientMode};
//! use deepq::loss::LossKind;
//! use ndarray::array;
//!
//! let config = EstimatorConfig::new(2, 2).architecture(&[32]).discount_factor(0.8).seed(1);
//! let mut q_net = DeepQNetwork::new(&config).unwrap();
//! let mut optimizer = OptimizerConfig::Sgd { learning_rate: 0.01 }.build().unwrap();
//! let mut memory = ReplayBuffer::with_seed(100, 1).unwrap();
//!
//! for i in 0..50 {
//!     let x = i as f32 / 50.0;
//!     memory.push(Transition::new(array![x, -x], i % 2, 1.0, array![x + 0.02, -x], i % 10 == 9));
//! }
//!
//! let loss = train_q_net(&mut q_net, &mut memory, &mut optimizer, 32, GradientMode::SemiGradient, &LossKind::SmoothL1)
//!     .unwrap();
//! assert!(loss.is_some());
//! ```
//!
//! ## Module Organization
//!
//! - [`activations`] - ReLU and identity nonlinearities
//! - [`batch`] - Transition batching and terminal-flag normalisation
//! - [`env`] - Environment contract
//! - [`error`] - Error types and result handling
//! - [`estimator`] - Action-value estimators and Bellman targets
//! - [`layers`] - Dense layers with traced and untraced forward passes
//! - [`loss`] - Huber / smooth-L1 and MSE losses
//! - [`network`] - Feed-forward backbone and gradient store
//! - [`optimizer`] - SGD and Adam
//! - [`policy`] - Epsilon-greedy policy and exploration schedule
//! - [`replay_buffer`] - Experience replay
//! - [`trainer`] - Update step and episode loop

pub mod activations;
pub mod batch;
pub mod env;
pub mod error;
pub mod estimator;
pub mod layers;
pub mod loss;
pub mod network;
pub mod optimizer;
pub mod policy;
pub mod replay_buffer;
pub mod trainer;

#[cfg(test)]
mod tests;
