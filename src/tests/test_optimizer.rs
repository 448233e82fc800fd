use ndarray::array;
use rand::rngs::StdRng;
use rand::SeedableRng;
use crate::activations::Activation;
use crate::layers::DenseLayer;
use crate::network::{Gradients, NeuralNetwork};
use crate::optimizer::{Adam, Optimizer, OptimizerConfig, OptimizerWrapper, SGD};

fn ones_network() -> NeuralNetwork {
    let mut rng = StdRng::seed_from_u64(0);
    let layer = DenseLayer::new(2, 2, Activation::Linear, &mut rng)
        .with_weights(array![[1.0, 1.0], [1.0, 1.0]])
        .unwrap()
        .with_biases(array![1.0, 1.0])
        .unwrap();
    NeuralNetwork::with_layers(vec![layer]).unwrap()
}

fn sample_gradients(network: &NeuralNetwork) -> Gradients {
    let mut gradients = Gradients::zeros_like(network);
    gradients.layers[0].weights = array![[0.1, 0.2], [0.3, 0.4]];
    gradients.layers[0].biases = array![0.1, 0.2];
    gradients
}

#[test]
fn test_sgd_step() {
    let mut network = ones_network();
    let gradients = sample_gradients(&network);
    let mut sgd = SGD::new(0.01);

    sgd.step(&mut network, &gradients).unwrap();

    let expected_weights = array![[0.999, 0.998], [0.997, 0.996]];
    for (w, e) in network.layers[0].weights.iter().zip(expected_weights.iter()) {
        assert!((w - e).abs() < 1e-6);
    }
    assert!((network.layers[0].biases[0] - 0.999).abs() < 1e-6);
    assert!((network.layers[0].biases[1] - 0.998).abs() < 1e-6);
}

#[test]
fn test_zero_gradients_leave_parameters_unchanged() {
    let mut network = ones_network();
    let before = network.clone();
    let gradients = Gradients::zeros_like(&network);

    SGD::new(0.5).step(&mut network, &gradients).unwrap();
    assert_eq!(network.layers[0].weights, before.layers[0].weights);

    Adam::with_learning_rate(0.5).step(&mut network, &gradients).unwrap();
    assert_eq!(network.layers[0].weights, before.layers[0].weights);
    assert_eq!(network.layers[0].biases, before.layers[0].biases);
}

#[test]
fn test_adam_first_step_moves_by_learning_rate() {
    let mut network = ones_network();
    let gradients = sample_gradients(&network);
    let mut adam = Adam::with_learning_rate(0.01);

    adam.step(&mut network, &gradients).unwrap();

    // After bias correction the first update is lr * g / |g| per entry.
    for w in network.layers[0].weights.iter() {
        assert!((w - 0.99).abs() < 1e-4, "got {}", w);
    }
    assert_eq!(adam.t, 1);

    adam.step(&mut network, &gradients).unwrap();
    assert_eq!(adam.t, 2);
    adam.reset();
    assert_eq!(adam.t, 0);
}

#[test]
fn test_step_rejects_mismatched_gradients() {
    let mut network = ones_network();
    let mut rng = StdRng::seed_from_u64(1);
    let other = NeuralNetwork::from_architecture(3, 2, &[], &mut rng).unwrap();
    let gradients = Gradients::zeros_like(&other);

    assert!(SGD::new(0.1).step(&mut network, &gradients).is_err());
    assert!(Adam::with_learning_rate(0.1).step(&mut network, &gradients).is_err());
}

#[test]
fn test_wrapper_dispatch() {
    let mut network = ones_network();
    let gradients = sample_gradients(&network);
    let mut wrapper = OptimizerWrapper::SGD(SGD::new(1.0));
    assert_eq!(wrapper.learning_rate(), 1.0);

    wrapper.step(&mut network, &gradients).unwrap();
    assert!((network.layers[0].weights[[1, 1]] - 0.6).abs() < 1e-6);
}

#[test]
fn test_optimizer_config() {
    let adam = OptimizerConfig::default().build().unwrap();
    assert!(matches!(adam, OptimizerWrapper::Adam(_)));
    assert!((adam.learning_rate() - 1e-3).abs() < 1e-9);

    let config: OptimizerConfig = serde_json::from_str(r#"{"kind": "sgd", "learning_rate": 0.05}"#).unwrap();
    assert_eq!(config, OptimizerConfig::Sgd { learning_rate: 0.05 });

    let config: OptimizerConfig = serde_json::from_str(r#"{"kind": "adam", "learning_rate": 0.002}"#).unwrap();
    match config {
        OptimizerConfig::Adam { learning_rate, beta1, beta2, .. } => {
            assert_eq!(learning_rate, 0.002);
            assert_eq!(beta1, 0.9);
            assert_eq!(beta2, 0.999);
        }
        other => panic!("unexpected config {:?}", other),
    }

    assert!(OptimizerConfig::Sgd { learning_rate: 0.0 }.build().is_err());
    assert!(OptimizerConfig::Sgd { learning_rate: f32::NAN }.build().is_err());
}
