//! Regression losses between current action values and Bellman targets.

pub mod functions;

pub use functions::{HuberLoss, Loss, LossKind, MSE};
