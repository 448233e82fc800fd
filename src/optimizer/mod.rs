//! Parameter update rules.
//!
//! An optimizer never computes gradients itself: it consumes a [`Gradients`]
//! store filled by backpropagation and applies one update to a
//! [`NeuralNetwork`]. Callers clear the store between updates, so the order per
//! training step is `zero_grad -> backward -> step`.

use ndarray::{Array1, Array2};
use serde::{Serialize, Deserialize};

use crate::error::{DeepQError, Result};
use crate::network::{Gradients, NeuralNetwork};

pub trait Optimizer {
    /// Apply one update to `network` from the accumulated `gradients`.
    fn step(&mut self, network: &mut NeuralNetwork, gradients: &Gradients) -> Result<()>;

    fn learning_rate(&self) -> f32;
}

fn check_shapes(network: &NeuralNetwork, gradients: &Gradients) -> Result<()> {
    if network.layers.len() != gradients.layers.len() {
        return Err(DeepQError::dimension_mismatch(
            format!("{} layers", network.layers.len()),
            format!("{} layers", gradients.layers.len()),
        ));
    }
    for (layer, grad) in network.layers.iter().zip(&gradients.layers) {
        if layer.weights.dim() != grad.weights.dim() || layer.biases.dim() != grad.biases.dim() {
            return Err(DeepQError::dimension_mismatch(
                format!("{:?}", layer.weights.dim()),
                format!("{:?}", grad.weights.dim()),
            ));
        }
    }
    Ok(())
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum OptimizerWrapper {
    SGD(SGD),
    Adam(Adam),
}

impl Optimizer for OptimizerWrapper {
    fn step(&mut self, network: &mut NeuralNetwork, gradients: &Gradients) -> Result<()> {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.step(network, gradients),
            OptimizerWrapper::Adam(optimizer) => optimizer.step(network, gradients),
        }
    }

    fn learning_rate(&self) -> f32 {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.learning_rate(),
            OptimizerWrapper::Adam(optimizer) => optimizer.learning_rate(),
        }
    }
}

/// Optimizer selection for configuration files.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OptimizerConfig {
    Sgd { learning_rate: f32 },
    Adam {
        learning_rate: f32,
        #[serde(default = "default_beta1")]
        beta1: f32,
        #[serde(default = "default_beta2")]
        beta2: f32,
        #[serde(default = "default_adam_epsilon")]
        epsilon: f32,
    },
}

fn default_beta1() -> f32 {
    0.9
}

fn default_beta2() -> f32 {
    0.999
}

fn default_adam_epsilon() -> f32 {
    1e-8
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig::Adam {
            learning_rate: 1e-3,
            beta1: default_beta1(),
            beta2: default_beta2(),
            epsilon: default_adam_epsilon(),
        }
    }
}

impl OptimizerConfig {
    pub fn build(&self) -> Result<OptimizerWrapper> {
        match *self {
            OptimizerConfig::Sgd { learning_rate } => {
                check_learning_rate(learning_rate)?;
                Ok(OptimizerWrapper::SGD(SGD::new(learning_rate)))
            }
            OptimizerConfig::Adam { learning_rate, beta1, beta2, epsilon } => {
                check_learning_rate(learning_rate)?;
                if !(0.0..1.0).contains(&beta1) || !(0.0..1.0).contains(&beta2) {
                    return Err(DeepQError::invalid_parameter("beta", "must lie in [0, 1)"));
                }
                if !(epsilon.is_finite() && epsilon > 0.0) {
                    return Err(DeepQError::invalid_parameter(
                        "epsilon".to_string(),
                        format!("must be positive and finite, got {}", epsilon),
                    ));
                }
                Ok(OptimizerWrapper::Adam(Adam::new(learning_rate, beta1, beta2, epsilon)))
            }
        }
    }
}

fn check_learning_rate(learning_rate: f32) -> Result<()> {
    if !(learning_rate.is_finite() && learning_rate > 0.0) {
        return Err(DeepQError::invalid_parameter(
            "learning_rate".to_string(),
            format!("must be positive and finite, got {}", learning_rate),
        ));
    }
    Ok(())
}

/// Plain stochastic gradient descent: `p -= lr * g`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SGD {
    pub learning_rate: f32,
}

impl SGD {
    pub fn new(learning_rate: f32) -> SGD {
        SGD { learning_rate }
    }
}

impl Optimizer for SGD {
    fn step(&mut self, network: &mut NeuralNetwork, gradients: &Gradients) -> Result<()> {
        check_shapes(network, gradients)?;
        let lr = self.learning_rate;
        for (layer, grad) in network.layers.iter_mut().zip(&gradients.layers) {
            layer.weights.zip_mut_with(&grad.weights, |w, &g| *w -= lr * g);
            layer.biases.zip_mut_with(&grad.biases, |b, &g| *b -= lr * g);
        }
        Ok(())
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
struct AdamMoments {
    m_weights: Array2<f32>,
    v_weights: Array2<f32>,
    m_biases: Array1<f32>,
    v_biases: Array1<f32>,
}

/// Adam with bias-corrected first and second moments.
///
/// Moment buffers are allocated on the first step, one set per layer.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Adam {
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    moments: Vec<AdamMoments>,
    pub t: i32,
}

impl Adam {
    pub fn new(learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Adam {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            moments: Vec::new(),
            t: 0,
        }
    }

    pub fn with_learning_rate(learning_rate: f32) -> Self {
        Self::new(learning_rate, 0.9, 0.999, 1e-8)
    }

    /// Drop the moment estimates and the step counter.
    pub fn reset(&mut self) {
        self.moments.clear();
        self.t = 0;
    }
}

impl Optimizer for Adam {
    fn step(&mut self, network: &mut NeuralNetwork, gradients: &Gradients) -> Result<()> {
        check_shapes(network, gradients)?;
        if self.moments.len() != network.layers.len() {
            self.moments = network
                .layers
                .iter()
                .map(|layer| AdamMoments {
                    m_weights: Array2::zeros(layer.weights.dim()),
                    v_weights: Array2::zeros(layer.weights.dim()),
                    m_biases: Array1::zeros(layer.biases.dim()),
                    v_biases: Array1::zeros(layer.biases.dim()),
                })
                .collect();
            self.t = 0;
        }

        self.t += 1;
        let (beta1, beta2, eps, lr) = (self.beta1, self.beta2, self.epsilon, self.learning_rate);
        let correction1 = 1.0 - beta1.powi(self.t);
        let correction2 = 1.0 - beta2.powi(self.t);

        for ((layer, grad), state) in network
            .layers
            .iter_mut()
            .zip(&gradients.layers)
            .zip(self.moments.iter_mut())
        {
            state.m_weights.zip_mut_with(&grad.weights, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
            state.v_weights.zip_mut_with(&grad.weights, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);
            state.m_biases.zip_mut_with(&grad.biases, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
            state.v_biases.zip_mut_with(&grad.biases, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

            ndarray::Zip::from(&mut layer.weights)
                .and(&state.m_weights)
                .and(&state.v_weights)
                .for_each(|w, &m, &v| {
                    *w -= lr * (m / correction1) / ((v / correction2).sqrt() + eps);
                });
            ndarray::Zip::from(&mut layer.biases)
                .and(&state.m_biases)
                .and(&state.v_biases)
                .for_each(|b, &m, &v| {
                    *b -= lr * (m / correction1) / ((v / correction2).sqrt() + eps);
                });
        }
        Ok(())
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }
}
