use serde::{Serialize, Deserialize};
use std::fs;
use std::path::Path;

use crate::error::{DeepQError, Result};
use crate::loss::LossKind;
use crate::optimizer::OptimizerConfig;
use crate::policy::EpsilonSchedule;

/// Whether the Bellman target participates in the gradient.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GradientMode {
    /// Targets are treated as constants (standard Q-learning update).
    #[default]
    SemiGradient,
    /// Gradients also flow through the greedy bootstrap term.
    Full,
}

/// Hyperparameters of the training loop.
///
/// Every field has a default, so a JSON file only needs to name the values it
/// changes.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct TrainerConfig {
    pub batch_size: usize,
    pub replay_capacity: usize,
    /// Run one update every `train_every` environment steps.
    pub train_every: usize,
    /// Log an episode summary every `log_interval` episodes; 0 disables it.
    pub log_interval: usize,
    /// Cut episodes after this many steps even if the environment never
    /// reports a terminal state.
    pub max_episode_steps: Option<usize>,
    pub gradient_mode: GradientMode,
    pub loss: LossKind,
    pub optimizer: OptimizerConfig,
    pub epsilon: EpsilonSchedule,
    /// Seed for replay sampling and exploration.
    pub seed: Option<u64>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            batch_size: 32,
            replay_capacity: 10_000,
            train_every: 1,
            log_interval: 10,
            max_episode_steps: None,
            gradient_mode: GradientMode::default(),
            loss: LossKind::default(),
            optimizer: OptimizerConfig::default(),
            epsilon: EpsilonSchedule::default(),
            seed: None,
        }
    }
}

impl TrainerConfig {
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn replay_capacity(mut self, capacity: usize) -> Self {
        self.replay_capacity = capacity;
        self
    }

    pub fn train_every(mut self, steps: usize) -> Self {
        self.train_every = steps;
        self
    }

    pub fn max_episode_steps(mut self, steps: usize) -> Self {
        self.max_episode_steps = Some(steps);
        self
    }

    pub fn gradient_mode(mut self, mode: GradientMode) -> Self {
        self.gradient_mode = mode;
        self
    }

    pub fn loss(mut self, loss: LossKind) -> Self {
        self.loss = loss;
        self
    }

    pub fn optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn epsilon(mut self, schedule: EpsilonSchedule) -> Self {
        self.epsilon = schedule;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(DeepQError::invalid_parameter("batch_size", "must be greater than 0"));
        }
        if self.replay_capacity < self.batch_size {
            return Err(DeepQError::invalid_parameter(
                "replay_capacity".to_string(),
                format!("must be at least batch_size ({})", self.batch_size),
            ));
        }
        if self.train_every == 0 {
            return Err(DeepQError::invalid_parameter("train_every", "must be greater than 0"));
        }
        if self.max_episode_steps == Some(0) {
            return Err(DeepQError::invalid_parameter("max_episode_steps", "must be greater than 0"));
        }
        if let LossKind::Huber { delta } = self.loss {
            if !(delta.is_finite() && delta > 0.0) {
                return Err(DeepQError::invalid_parameter(
                    "loss.delta".to_string(),
                    format!("must be positive and finite, got {}", delta),
                ));
            }
        }
        self.optimizer.build()?;
        self.epsilon.validate()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
