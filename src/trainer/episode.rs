use ndarray::Array1;

use crate::env::Environment;
use crate::error::{DeepQError, Result};
use crate::policy::Policy;
use crate::replay_buffer::Transition;

/// Drives a single episode: `Start -> Running -> Done`.
#[derive(Clone, Debug, Default)]
pub struct EpisodeRunner {
    state: Option<Array1<f32>>,
    steps: usize,
}

impl EpisodeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the environment and remember its initial state.
    pub fn start_episode<Env: Environment>(&mut self, env: &mut Env) -> Result<()> {
        self.state = Some(env.reset()?);
        self.steps = 0;
        Ok(())
    }

    /// Take one action in the running episode.
    ///
    /// Returns the transition and whether it ended the episode. After a
    /// terminal step the runner has to be started again.
    pub fn step_episode<Env, E, P>(
        &mut self,
        env: &mut Env,
        policy: &mut P,
        estimator: &E,
    ) -> Result<(Transition, bool)>
    where
        Env: Environment,
        P: Policy<E>,
    {
        let state = self.state.clone().ok_or_else(|| {
            DeepQError::invalid_parameter("episode", "start_episode() must be called before step_episode()")
        })?;

        let action = policy.sample_action(estimator, state.view())?;
        let step = env.step(action)?;
        self.steps += 1;

        self.state = if step.done {
            None
        } else {
            Some(step.next_state.clone())
        };
        let transition = Transition::new(state, action, step.reward, step.next_state, step.done);
        Ok((transition, step.done))
    }

    pub fn is_running(&self) -> bool {
        self.state.is_some()
    }

    /// Steps taken since the last `start_episode`.
    pub fn steps(&self) -> usize {
        self.steps
    }
}
