//! # Training Loop
//!
//! [`train_q_net`] performs one Q-learning update from replayed experience;
//! [`Trainer`] runs whole episodes, pushing every transition into the replay
//! buffer and updating the estimator as it goes.
//!
//! ```rust,no_run
//! use deepq::estimator::{DeepQNetwork, EstimatorConfig};
//! use deepq::trainer::{Trainer, TrainerConfig};
//! # use deepq::env::{Environment, Step};
//! # use ndarray::{array, Array1};
//! # struct Corridor;
//! # impl Environment for Corridor {
//! #     type Info = ();
//! #     fn reset(&mut self) -> deepq::error::Result<Array1<f32>> { Ok(array![0.0, 0.0]) }
//! #     fn step(&mut self, _action: usize) -> deepq::error::Result<Step<()>> {
//! #         Ok(Step { next_state: array![0.0, 0.0], reward: 1.0, done: true, info: () })
//! #     }
//! # }
//!
//! let estimator = DeepQNetwork::new(&EstimatorConfig::new(2, 2).architecture(&[64])).unwrap();
//! let config = TrainerConfig::default().batch_size(32).seed(0);
//! let mut trainer = Trainer::with_epsilon_greedy(config, estimator).unwrap();
//!
//! let history = trainer.run_episodes(&mut Corridor, 100).unwrap();
//! println!("last episode lasted {:?} steps", history.episode_durations.last());
//! ```

mod config;
mod episode;

pub use config::{GradientMode, TrainerConfig};
pub use episode::EpisodeRunner;

use log::{debug, info, warn};

use crate::batch::memory_to_input;
use crate::env::Environment;
use crate::error::Result;
use crate::estimator::{ActionValueEstimator, DeepQNetwork};
use crate::loss::Loss;
use crate::optimizer::{Optimizer, OptimizerWrapper};
use crate::policy::{EpsilonGreedyPolicy, Policy};
use crate::replay_buffer::ReplayBuffer;

/// One Q-learning update from a uniformly sampled replay batch.
///
/// Returns `Ok(None)` without touching anything while the buffer holds fewer
/// than `batch_size` transitions. Otherwise the estimator's gradients are
/// cleared, the loss between current values and Bellman targets is
/// backpropagated, exactly one optimizer step is applied and the loss is
/// returned.
pub fn train_q_net<O, L>(
    estimator: &mut DeepQNetwork,
    memory: &mut ReplayBuffer,
    optimizer: &mut O,
    batch_size: usize,
    gradient_mode: GradientMode,
    loss: &L,
) -> Result<Option<f32>>
where
    O: Optimizer + ?Sized,
    L: Loss + ?Sized,
{
    if memory.len() < batch_size {
        debug!("replay buffer holds {} of {} transitions, skipping update", memory.len(), batch_size);
        return Ok(None);
    }

    let batch = memory_to_input(memory.sample(batch_size)?)?;
    let (q_vals, q_trace) = estimator.compute_q_vals_traced(batch.state.view(), batch.action.view())?;

    estimator.zero_grad();
    let loss_value = match gradient_mode {
        GradientMode::SemiGradient => {
            let targets = estimator.compute_targets(
                batch.reward.view(),
                batch.next_state.view(),
                batch.done.view(),
            )?;
            let grad = loss.gradient_batch(q_vals.view(), targets.view());
            estimator.backward_q_vals(&q_trace, grad.view())?;
            loss.compute_batch(q_vals.view(), targets.view())
        }
        GradientMode::Full => {
            let (targets, target_trace) = estimator.compute_targets_traced(
                batch.reward.view(),
                batch.next_state.view(),
                batch.done.view(),
            )?;
            let grad = loss.gradient_batch(q_vals.view(), targets.view());
            estimator.backward_q_vals(&q_trace, grad.view())?;
            // The losses depend on (q - target), so dL/dtarget = -dL/dq.
            estimator.backward_targets(&target_trace, grad.mapv(|g| -g).view())?;
            loss.compute_batch(q_vals.view(), targets.view())
        }
    };
    estimator.optimizer_step(optimizer)?;

    if !loss_value.is_finite() {
        warn!("non-finite training loss {}", loss_value);
    }
    Ok(Some(loss_value))
}

/// What a call to [`Trainer::run_episodes`] produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrainingHistory {
    /// Steps survived in each episode, in order.
    pub episode_durations: Vec<usize>,
    /// Loss of every update that was not skipped.
    pub losses: Vec<f32>,
}

/// Owns the estimator, its optimizer, the replay buffer and the policy, and
/// couples them to an environment.
pub struct Trainer<P = EpsilonGreedyPolicy> {
    config: TrainerConfig,
    estimator: DeepQNetwork,
    optimizer: OptimizerWrapper,
    memory: ReplayBuffer,
    policy: P,
    runner: EpisodeRunner,
    global_steps: usize,
    episodes_completed: usize,
}

impl Trainer<EpsilonGreedyPolicy> {
    /// Trainer with an epsilon-greedy policy seeded from the config.
    pub fn with_epsilon_greedy(config: TrainerConfig, estimator: DeepQNetwork) -> Result<Self> {
        let start = config.epsilon.value(0);
        let policy = match config.seed {
            Some(seed) => EpsilonGreedyPolicy::with_seed(start, seed.wrapping_add(1)),
            None => EpsilonGreedyPolicy::new(start),
        };
        Self::new(config, estimator, policy)
    }
}

impl<P: Policy<DeepQNetwork>> Trainer<P> {
    pub fn new(config: TrainerConfig, estimator: DeepQNetwork, policy: P) -> Result<Self> {
        config.validate()?;
        let optimizer = config.optimizer.build()?;
        let memory = match config.seed {
            Some(seed) => ReplayBuffer::with_seed(config.replay_capacity, seed)?,
            None => ReplayBuffer::new(config.replay_capacity)?,
        };
        info!(
            "trainer ready: {} inputs, {} actions, {} parameters, batch size {}",
            estimator.in_features(),
            estimator.num_actions(),
            estimator.network.num_parameters(),
            config.batch_size,
        );
        Ok(Trainer {
            config,
            estimator,
            optimizer,
            memory,
            policy,
            runner: EpisodeRunner::new(),
            global_steps: 0,
            episodes_completed: 0,
        })
    }

    /// One update from the replay buffer; `None` during warm-up.
    pub fn train_step(&mut self) -> Result<Option<f32>> {
        train_q_net(
            &mut self.estimator,
            &mut self.memory,
            &mut self.optimizer,
            self.config.batch_size,
            self.config.gradient_mode,
            &self.config.loss,
        )
    }

    /// Run `num_episodes` episodes against `env`.
    ///
    /// The step counter driving the exploration schedule carries over between
    /// episodes and between calls.
    pub fn run_episodes<Env: Environment>(&mut self, env: &mut Env, num_episodes: usize) -> Result<TrainingHistory> {
        let mut history = TrainingHistory::default();

        for _ in 0..num_episodes {
            self.runner.start_episode(env)?;
            loop {
                let epsilon = self.config.epsilon.value(self.global_steps);
                self.policy.set_epsilon(epsilon);

                let (transition, done) = self.runner.step_episode(env, &mut self.policy, &self.estimator)?;
                self.memory.push(transition);
                self.global_steps += 1;

                if self.global_steps % self.config.train_every == 0 {
                    if let Some(loss) = self.train_step()? {
                        history.losses.push(loss);
                    }
                }

                if done {
                    break;
                }
                if self.config.max_episode_steps.map_or(false, |max| self.runner.steps() >= max) {
                    debug!("episode {} truncated after {} steps", self.episodes_completed, self.runner.steps());
                    break;
                }
            }

            let steps = self.runner.steps();
            if self.config.log_interval > 0 && self.episodes_completed % self.config.log_interval == 0 {
                info!(
                    "Episode {} finished after {} steps (epsilon {:.3})",
                    self.episodes_completed,
                    steps,
                    self.policy.epsilon(),
                );
            }
            self.episodes_completed += 1;
            history.episode_durations.push(steps);
        }

        Ok(history)
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn estimator(&self) -> &DeepQNetwork {
        &self.estimator
    }

    pub fn estimator_mut(&mut self) -> &mut DeepQNetwork {
        &mut self.estimator
    }

    pub fn memory(&self) -> &ReplayBuffer {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut ReplayBuffer {
        &mut self.memory
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Environment steps taken over the trainer's lifetime.
    pub fn global_steps(&self) -> usize {
        self.global_steps
    }

    pub fn episodes_completed(&self) -> usize {
        self.episodes_completed
    }

    /// Give back the trained estimator.
    pub fn into_estimator(self) -> DeepQNetwork {
        self.estimator
    }
}
