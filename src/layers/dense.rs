use ndarray::{Array1, Array2, ArrayView2, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::error::{DeepQError, Result};

/// A fully connected (dense) layer: `activation(inputs · W + b)`.
///
/// Weights are stored as `(input_size, output_size)` so a batch of row vectors
/// can be multiplied directly.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DenseLayer {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
    pub activation: Activation,
}

/// Values recorded during a traced forward pass, needed to backpropagate
/// through the layer afterwards.
#[derive(Clone, Debug)]
pub struct LayerTrace {
    inputs: Array2<f32>,
    pre_activation: Array2<f32>,
}

/// Gradients of a loss with respect to one layer's parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerGradients {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
}

impl LayerTrace {
    /// Number of rows that went through the traced pass.
    pub fn batch_size(&self) -> usize {
        self.inputs.nrows()
    }
}

impl LayerGradients {
    pub fn zeros(input_size: usize, output_size: usize) -> Self {
        LayerGradients {
            weights: Array2::zeros((input_size, output_size)),
            biases: Array1::zeros(output_size),
        }
    }
}

impl DenseLayer {
    /// Create a layer whose weights and biases are drawn uniformly from
    /// `[-1/sqrt(input_size), 1/sqrt(input_size))`.
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Self {
        let bound = 1.0 / (input_size as f32).sqrt();
        let distribution = Uniform::new(-bound, bound);
        DenseLayer {
            weights: Array2::random_using((input_size, output_size), distribution, rng),
            biases: Array1::random_using(output_size, distribution, rng),
            activation,
        }
    }

    pub fn with_weights(mut self, weights: Array2<f32>) -> Result<Self> {
        if weights.dim() != self.weights.dim() {
            return Err(DeepQError::dimension_mismatch(
                format!("{:?}", self.weights.dim()),
                format!("{:?}", weights.dim()),
            ));
        }
        self.weights = weights;
        Ok(self)
    }

    pub fn with_biases(mut self, biases: Array1<f32>) -> Result<Self> {
        if biases.dim() != self.biases.dim() {
            return Err(DeepQError::dimension_mismatch(
                format!("{}", self.biases.len()),
                format!("{}", biases.len()),
            ));
        }
        self.biases = biases;
        Ok(self)
    }

    pub fn input_size(&self) -> usize {
        self.weights.shape()[0]
    }

    pub fn output_size(&self) -> usize {
        self.weights.shape()[1]
    }

    fn check_inputs(&self, inputs: &ArrayView2<f32>) -> Result<()> {
        if inputs.ncols() != self.input_size() {
            return Err(DeepQError::dimension_mismatch(
                format!("(_, {})", self.input_size()),
                format!("{:?}", inputs.dim()),
            ));
        }
        Ok(())
    }

    fn affine(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        inputs.dot(&self.weights) + &self.biases.view().insert_axis(Axis(0))
    }

    /// Evaluate the layer without recording anything for backpropagation.
    pub fn evaluate(&self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_inputs(&inputs)?;
        let mut outputs = self.affine(inputs);
        self.activation.apply_batch(&mut outputs);
        Ok(outputs)
    }

    /// Evaluate the layer and keep the inputs and pre-activations so that
    /// [`DenseLayer::backward`] can be called on the result.
    pub fn forward_traced(&self, inputs: ArrayView2<f32>) -> Result<(Array2<f32>, LayerTrace)> {
        self.check_inputs(&inputs)?;
        let pre_activation = self.affine(inputs);
        let mut outputs = pre_activation.clone();
        self.activation.apply_batch(&mut outputs);
        let trace = LayerTrace {
            inputs: inputs.to_owned(),
            pre_activation,
        };
        Ok((outputs, trace))
    }

    /// Backpropagate `output_errors` (dL/d outputs) through the layer.
    ///
    /// Returns the error with respect to the layer inputs together with the
    /// parameter gradients.
    pub fn backward(&self, trace: &LayerTrace, output_errors: ArrayView2<f32>) -> (Array2<f32>, LayerGradients) {
        let activation_deriv = self.activation.derivative_batch(trace.pre_activation.view());
        let adjusted_error = &output_errors * &activation_deriv;
        let weight_gradients = trace.inputs.t().dot(&adjusted_error);
        let bias_gradients = adjusted_error.sum_axis(Axis(0));
        let input_errors = adjusted_error.dot(&self.weights.t());

        (input_errors, LayerGradients {
            weights: weight_gradients,
            biases: bias_gradients,
        })
    }
}
