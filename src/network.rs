use ndarray::{Array2, ArrayView2};
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::error::{DeepQError, Result};
use crate::layers::{DenseLayer, LayerGradients, LayerTrace};

/// A feed-forward network built from a list of layer widths.
///
/// Every hidden width contributes a `Linear -> ReLU` pair and the stack ends in
/// a single `Linear` map to the output width.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NeuralNetwork {
    pub layers: Vec<DenseLayer>,
}

/// Per-layer traces of one forward pass, consumed by [`NeuralNetwork::backward`].
#[derive(Clone, Debug)]
pub struct ForwardTrace {
    layers: Vec<LayerTrace>,
}

/// Gradient store with one entry per layer of a [`NeuralNetwork`].
#[derive(Clone, Debug, PartialEq)]
pub struct Gradients {
    pub layers: Vec<LayerGradients>,
}

impl Gradients {
    /// Zero gradients shaped like the parameters of `network`.
    pub fn zeros_like(network: &NeuralNetwork) -> Self {
        Gradients {
            layers: network
                .layers
                .iter()
                .map(|layer| LayerGradients::zeros(layer.input_size(), layer.output_size()))
                .collect(),
        }
    }

    /// Whether every entry has the shape of the corresponding layer of `network`.
    pub fn matches(&self, network: &NeuralNetwork) -> bool {
        self.layers.len() == network.layers.len()
            && self.layers.iter().zip(&network.layers).all(|(g, layer)| {
                g.weights.dim() == layer.weights.dim() && g.biases.len() == layer.biases.len()
            })
    }

    pub fn zero(&mut self) {
        for layer in &mut self.layers {
            layer.weights.fill(0.0);
            layer.biases.fill(0.0);
        }
    }

    /// Add `other` into `self` element-wise.
    pub fn accumulate(&mut self, other: &Gradients) -> Result<()> {
        if self.layers.len() != other.layers.len() {
            return Err(DeepQError::dimension_mismatch(
                format!("{} layers", self.layers.len()),
                format!("{} layers", other.layers.len()),
            ));
        }
        for (mine, theirs) in self.layers.iter_mut().zip(&other.layers) {
            if mine.weights.dim() != theirs.weights.dim() || mine.biases.dim() != theirs.biases.dim() {
                return Err(DeepQError::dimension_mismatch(
                    format!("{:?}", mine.weights.dim()),
                    format!("{:?}", theirs.weights.dim()),
                ));
            }
            mine.weights += &theirs.weights;
            mine.biases += &theirs.biases;
        }
        Ok(())
    }

    /// L2 norm over every gradient entry.
    pub fn global_norm(&self) -> f32 {
        self.layers
            .iter()
            .map(|g| g.weights.mapv(|x| x * x).sum() + g.biases.mapv(|x| x * x).sum())
            .sum::<f32>()
            .sqrt()
    }
}

impl NeuralNetwork {
    /// Build `in_features -> hidden[0] -> ... -> out_features`.
    ///
    /// An empty `hidden` list yields a single linear map.
    pub fn from_architecture<R: Rng + ?Sized>(
        in_features: usize,
        out_features: usize,
        hidden: &[usize],
        rng: &mut R,
    ) -> Result<Self> {
        if in_features == 0 {
            return Err(DeepQError::invalid_parameter("in_features", "must be at least 1"));
        }
        if out_features == 0 {
            return Err(DeepQError::invalid_parameter("out_features", "must be at least 1"));
        }
        if hidden.iter().any(|&w| w == 0) {
            return Err(DeepQError::invalid_parameter("architecture", "hidden widths must be at least 1"));
        }

        let mut layers = Vec::with_capacity(hidden.len() + 1);
        let mut prev = in_features;
        for &width in hidden {
            layers.push(DenseLayer::new(prev, width, Activation::Relu, rng));
            prev = width;
        }
        layers.push(DenseLayer::new(prev, out_features, Activation::Linear, rng));

        Ok(NeuralNetwork { layers })
    }

    pub fn with_layers(layers: Vec<DenseLayer>) -> Result<Self> {
        if layers.is_empty() {
            return Err(DeepQError::invalid_parameter("layers", "network needs at least one layer"));
        }
        for pair in layers.windows(2) {
            if pair[0].output_size() != pair[1].input_size() {
                return Err(DeepQError::dimension_mismatch(
                    format!("{}", pair[0].output_size()),
                    format!("{}", pair[1].input_size()),
                ));
            }
        }
        Ok(NeuralNetwork { layers })
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, DenseLayer::input_size)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, DenseLayer::output_size)
    }

    pub fn num_parameters(&self) -> usize {
        self.layers
            .iter()
            .map(|l| l.weights.len() + l.biases.len())
            .sum()
    }

    /// Pure evaluation of the network on a batch of row vectors.
    pub fn predict(&self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
        let mut current = inputs.to_owned();
        for layer in &self.layers {
            current = layer.evaluate(current.view())?;
        }
        Ok(current)
    }

    /// Evaluate the network and record what backpropagation needs.
    pub fn forward_traced(&self, inputs: ArrayView2<f32>) -> Result<(Array2<f32>, ForwardTrace)> {
        let mut traces = Vec::with_capacity(self.layers.len());
        let mut current = inputs.to_owned();
        for layer in &self.layers {
            let (output, trace) = layer.forward_traced(current.view())?;
            traces.push(trace);
            current = output;
        }
        Ok((current, ForwardTrace { layers: traces }))
    }

    /// Backpropagate `output_errors` (dL/d outputs, shape `(N, output_size)`)
    /// through a previously traced forward pass.
    pub fn backward(&self, trace: &ForwardTrace, output_errors: ArrayView2<f32>) -> Result<Gradients> {
        if trace.layers.len() != self.layers.len() {
            return Err(DeepQError::dimension_mismatch(
                format!("trace of {} layers", self.layers.len()),
                format!("trace of {} layers", trace.layers.len()),
            ));
        }
        let batch_size = trace.layers.first().map_or(0, LayerTrace::batch_size);
        if output_errors.dim() != (batch_size, self.output_size()) {
            return Err(DeepQError::dimension_mismatch(
                format!("({}, {})", batch_size, self.output_size()),
                format!("{:?}", output_errors.dim()),
            ));
        }

        let mut gradients = Vec::with_capacity(self.layers.len());
        let mut current_error = output_errors.to_owned();
        for (layer, layer_trace) in self.layers.iter().zip(&trace.layers).rev() {
            let (input_error, layer_gradients) = layer.backward(layer_trace, current_error.view());
            gradients.push(layer_gradients);
            current_error = input_error;
        }
        gradients.reverse();

        Ok(Gradients { layers: gradients })
    }
}
