use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Serialize, Deserialize};
use std::fs;
use std::path::Path;

use super::{check_actions, row_argmax, ActionValueEstimator};
use crate::batch::{continuation_mask, TerminalFlag};
use crate::error::{DeepQError, Result};
use crate::network::{ForwardTrace, Gradients, NeuralNetwork};
use crate::optimizer::Optimizer;

/// Construction parameters of a [`DeepQNetwork`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct EstimatorConfig {
    pub in_features: usize,
    pub out_features: usize,
    /// Hidden layer widths, input side first. Empty means a single linear map.
    pub architecture: Vec<usize>,
    pub discount_factor: f32,
    /// Seed for parameter initialisation.
    pub seed: Option<u64>,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        EstimatorConfig {
            in_features: 4,
            out_features: 2,
            architecture: Vec::new(),
            discount_factor: 0.8,
            seed: None,
        }
    }
}

impl EstimatorConfig {
    pub fn new(in_features: usize, out_features: usize) -> Self {
        EstimatorConfig {
            in_features,
            out_features,
            ..Default::default()
        }
    }

    pub fn architecture(mut self, hidden: &[usize]) -> Self {
        self.architecture = hidden.to_vec();
        self
    }

    pub fn discount_factor(mut self, gamma: f32) -> Self {
        self.discount_factor = gamma;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// What the trainable current-value path records for backpropagation.
#[derive(Clone, Debug)]
pub struct QValTrace {
    forward: ForwardTrace,
    actions: Vec<usize>,
}

/// What the target path records when targets are allowed to carry gradient.
#[derive(Clone, Debug)]
pub struct TargetTrace {
    forward: ForwardTrace,
    greedy_actions: Vec<usize>,
    /// `γ · (1 − done)` per row.
    scale: Vec<f32>,
}

/// Deep Q-network: a feed-forward action-value estimator over discrete actions.
///
/// The same parameters serve both sides of the temporal-difference error; no
/// separate target network is kept.
///
/// # Example
///
/// ```rust
/// use deepq::estimator::{ActionValueEstimator, DeepQNetwork, EstimatorConfig};
/// use ndarray::array;
///
/// let config = EstimatorConfig::new(2, 2).architecture(&[16]).seed(7);
/// let q_net = DeepQNetwork::new(&config).unwrap();
///
/// let targets = q_net
///     .compute_targets(array![[1.0]].view(), array![[0.3, -0.2]].view(), array![[true]].view())
///     .unwrap();
/// assert_eq!(targets[[0, 0]], 1.0);
/// ```
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DeepQNetwork {
    pub network: NeuralNetwork,
    discount_factor: f32,
    #[serde(skip)]
    gradients: Option<Gradients>,
}

impl DeepQNetwork {
    pub fn new(config: &EstimatorConfig) -> Result<Self> {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let network = NeuralNetwork::from_architecture(
            config.in_features,
            config.out_features,
            &config.architecture,
            &mut rng,
        )?;
        Self::from_network(network, config.discount_factor)
    }

    /// Wrap an existing backbone, e.g. one with hand-set weights.
    pub fn from_network(network: NeuralNetwork, discount_factor: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&discount_factor) {
            return Err(DeepQError::invalid_parameter(
                "discount_factor".to_string(),
                format!("must lie in [0, 1], got {}", discount_factor),
            ));
        }
        Ok(DeepQNetwork {
            network,
            discount_factor,
            gradients: None,
        })
    }

    pub fn discount_factor(&self) -> f32 {
        self.discount_factor
    }

    /// Highest-valued action for a single state. Ties go to the lowest index.
    pub fn greedy_action(&self, state: ArrayView1<f32>) -> Result<usize> {
        let values = self.forward(state.insert_axis(Axis(0)))?;
        Ok(row_argmax(&values)[0].0)
    }

    /// Trainable counterpart of [`ActionValueEstimator::compute_q_vals`].
    pub fn compute_q_vals_traced(
        &self,
        states: ArrayView2<f32>,
        actions: ArrayView2<usize>,
    ) -> Result<(Array2<f32>, QValTrace)> {
        check_actions(&actions, states.nrows(), self.num_actions())?;
        let (values, forward) = self.network.forward_traced(states)?;
        let q_vals = gather(&values, &actions);
        let trace = QValTrace {
            forward,
            actions: actions.iter().copied().collect(),
        };
        Ok((q_vals, trace))
    }

    /// Targets that keep a trace, for full-gradient updates only.
    ///
    /// The standard update uses [`ActionValueEstimator::compute_targets`],
    /// which records nothing.
    pub fn compute_targets_traced<D: TerminalFlag>(
        &self,
        reward: ArrayView2<f32>,
        next_state: ArrayView2<f32>,
        done: ArrayView2<D>,
    ) -> Result<(Array2<f32>, TargetTrace)> {
        check_target_shapes(&reward, &next_state, &done)?;
        let (next_q_vals, forward) = self.network.forward_traced(next_state)?;
        let greedy = row_argmax(&next_q_vals);
        let mask = continuation_mask(done);

        let scale: Vec<f32> = mask.iter().map(|m| self.discount_factor * m).collect();
        let targets = Array2::from_shape_fn((reward.nrows(), 1), |(i, _)| {
            bootstrap(reward[[i, 0]], scale[i], greedy[i].1)
        });
        let trace = TargetTrace {
            forward,
            greedy_actions: greedy.into_iter().map(|(a, _)| a).collect(),
            scale,
        };
        Ok((targets, trace))
    }

    /// Clear the gradient store before a new backward pass.
    ///
    /// The store is rebuilt if `network` was replaced with one of a different
    /// shape since the last pass.
    pub fn zero_grad(&mut self) {
        match self.gradients.as_mut() {
            Some(gradients) if gradients.matches(&self.network) => gradients.zero(),
            _ => self.gradients = Some(Gradients::zeros_like(&self.network)),
        }
    }

    pub fn gradients(&self) -> Option<&Gradients> {
        self.gradients.as_ref()
    }

    /// Accumulate the gradient of the loss given `grad_q_vals = dL/dq`
    /// (shape `(N, 1)`) through the current-value path.
    pub fn backward_q_vals(&mut self, trace: &QValTrace, grad_q_vals: ArrayView2<f32>) -> Result<()> {
        let output_errors = scatter(grad_q_vals, &trace.actions, None, self.num_actions())?;
        let gradients = self.network.backward(&trace.forward, output_errors.view())?;
        self.accumulate(&gradients)
    }

    /// Accumulate the gradient of the loss given `grad_targets = dL/dtarget`
    /// through the greedy bootstrap term. Terminal rows contribute nothing.
    pub fn backward_targets(&mut self, trace: &TargetTrace, grad_targets: ArrayView2<f32>) -> Result<()> {
        let output_errors = scatter(
            grad_targets,
            &trace.greedy_actions,
            Some(&trace.scale),
            self.num_actions(),
        )?;
        let gradients = self.network.backward(&trace.forward, output_errors.view())?;
        self.accumulate(&gradients)
    }

    fn accumulate(&mut self, gradients: &Gradients) -> Result<()> {
        match self.gradients.as_mut() {
            Some(store) => store.accumulate(gradients),
            None => {
                self.gradients = Some(gradients.clone());
                Ok(())
            }
        }
    }

    /// Apply one optimizer update from the accumulated gradients.
    pub fn optimizer_step<O: Optimizer + ?Sized>(&mut self, optimizer: &mut O) -> Result<()> {
        let gradients = self.gradients.as_ref().ok_or_else(|| {
            DeepQError::invalid_parameter("gradients", "zero_grad/backward never called")
        })?;
        optimizer.step(&mut self.network, gradients)
    }

    /// Save parameters and discount factor to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = bincode::serialize(self)?;
        fs::write(path, serialized)?;
        Ok(())
    }

    /// Load an estimator saved with [`DeepQNetwork::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path)?;
        let estimator: Self = bincode::deserialize(&data)?;
        Self::from_network(estimator.network, estimator.discount_factor)
    }
}

impl ActionValueEstimator for DeepQNetwork {
    fn in_features(&self) -> usize {
        self.network.input_size()
    }

    fn num_actions(&self) -> usize {
        self.network.output_size()
    }

    fn forward(&self, states: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.network.predict(states)
    }

    fn compute_q_vals(&self, states: ArrayView2<f32>, actions: ArrayView2<usize>) -> Result<Array2<f32>> {
        check_actions(&actions, states.nrows(), self.num_actions())?;
        let values = self.forward(states)?;
        Ok(gather(&values, &actions))
    }

    fn compute_targets<D: TerminalFlag>(
        &self,
        reward: ArrayView2<f32>,
        next_state: ArrayView2<f32>,
        done: ArrayView2<D>,
    ) -> Result<Array2<f32>> {
        check_target_shapes(&reward, &next_state, &done)?;
        let next_q_vals = self.forward(next_state)?;
        let next_max = row_argmax(&next_q_vals);
        let mask = continuation_mask(done);

        Ok(Array2::from_shape_fn((reward.nrows(), 1), |(i, _)| {
            bootstrap(reward[[i, 0]], self.discount_factor * mask[[i, 0]], next_max[i].1)
        }))
    }
}

/// `reward + scale * next_max`, where `scale` is `γ · (1 − done)`.
///
/// A zero scale drops the bootstrap term entirely, so a non-finite value
/// estimate of a terminal next state cannot leak into the target.
fn bootstrap(reward: f32, scale: f32, next_max: f32) -> f32 {
    if scale == 0.0 {
        reward
    } else {
        reward + scale * next_max
    }
}

fn gather(values: &Array2<f32>, actions: &ArrayView2<usize>) -> Array2<f32> {
    Array2::from_shape_fn((values.nrows(), 1), |(i, _)| values[[i, actions[[i, 0]]]])
}

/// Inverse of [`gather`]: place `grad[i]` (times `scale[i]`) at column
/// `columns[i]` of an otherwise zero `(N, width)` array.
fn scatter(grad: ArrayView2<f32>, columns: &[usize], scale: Option<&[f32]>, width: usize) -> Result<Array2<f32>> {
    if grad.dim() != (columns.len(), 1) {
        return Err(DeepQError::dimension_mismatch(
            format!("({}, 1)", columns.len()),
            format!("{:?}", grad.dim()),
        ));
    }
    let mut output = Array2::zeros((columns.len(), width));
    for (i, &column) in columns.iter().enumerate() {
        let factor = scale.map_or(1.0, |s| s[i]);
        output[[i, column]] = grad[[i, 0]] * factor;
    }
    Ok(output)
}

fn check_target_shapes<D>(
    reward: &ArrayView2<f32>,
    next_state: &ArrayView2<f32>,
    done: &ArrayView2<D>,
) -> Result<()> {
    let rows = next_state.nrows();
    if reward.dim() != (rows, 1) {
        return Err(DeepQError::dimension_mismatch(
            format!("reward of shape ({}, 1)", rows),
            format!("reward of shape {:?}", reward.dim()),
        ));
    }
    if done.dim() != (rows, 1) {
        return Err(DeepQError::dimension_mismatch(
            format!("done of shape ({}, 1)", rows),
            format!("done of shape {:?}", done.dim()),
        ));
    }
    Ok(())
}
