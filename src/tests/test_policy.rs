use ndarray::{array, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use crate::activations::Activation;
use crate::estimator::DeepQNetwork;
use crate::layers::DenseLayer;
use crate::network::NeuralNetwork;
use crate::policy::{EpsilonGreedyPolicy, EpsilonSchedule, Policy};

fn prefers_action_two() -> DeepQNetwork {
    let mut rng = StdRng::seed_from_u64(0);
    let layer = DenseLayer::new(2, 3, Activation::Linear, &mut rng)
        .with_weights(Array2::zeros((2, 3)))
        .unwrap()
        .with_biases(array![0.0, 1.0, 2.0])
        .unwrap();
    DeepQNetwork::from_network(NeuralNetwork::with_layers(vec![layer]).unwrap(), 0.9).unwrap()
}

#[test]
fn test_greedy_when_epsilon_zero() {
    let q_net = prefers_action_two();
    let mut policy = EpsilonGreedyPolicy::with_seed(0.0, 1);
    for _ in 0..100 {
        assert_eq!(policy.sample_action(&q_net, array![0.1, 0.2].view()).unwrap(), 2);
    }
}

#[test]
fn test_uniform_when_epsilon_one() {
    let q_net = prefers_action_two();
    let mut policy = EpsilonGreedyPolicy::with_seed(1.0, 1);
    let mut counts = [0usize; 3];
    for _ in 0..3000 {
        counts[policy.sample_action(&q_net, array![0.1, 0.2].view()).unwrap()] += 1;
    }
    for &count in counts.iter() {
        assert!(count > 800, "counts {:?}", counts);
    }
}

#[test]
fn test_set_epsilon_clamps() {
    let mut policy = EpsilonGreedyPolicy::new(0.5);
    assert_eq!(policy.epsilon(), 0.5);
    policy.set_epsilon(1.7);
    assert_eq!(policy.epsilon(), 1.0);
    policy.set_epsilon(-0.2);
    assert_eq!(policy.epsilon(), 0.0);
}

#[test]
fn test_state_width_checked() {
    let q_net = prefers_action_two();
    let mut policy = EpsilonGreedyPolicy::with_seed(1.0, 1);
    assert!(policy.sample_action(&q_net, array![0.1, 0.2, 0.3].view()).is_err());
}

#[test]
fn test_schedule_matches_linear_decay() {
    let schedule = EpsilonSchedule::default();
    assert_eq!(schedule.value(0), 1.0);
    assert!((schedule.value(500) - 0.525).abs() < 1e-6);
    assert!((schedule.value(999) - (1.0 - 0.95 * 0.999)).abs() < 1e-6);
    assert_eq!(schedule.value(1000), 0.05);
    assert_eq!(schedule.value(1_000_000), 0.05);
}

#[test]
fn test_schedule_monotone_and_floored() {
    let schedule = EpsilonSchedule::new(0.9, 0.1, 250).unwrap();
    let mut previous = schedule.value(0);
    for step in 1..600 {
        let current = schedule.value(step);
        assert!(current <= previous);
        assert!(current >= 0.1);
        previous = current;
    }
}

#[test]
fn test_schedule_validation() {
    assert!(EpsilonSchedule::new(0.1, 0.5, 100).is_err());
    assert!(EpsilonSchedule::new(1.5, 0.5, 100).is_err());
    assert_eq!(EpsilonSchedule::new(0.5, 0.5, 0).unwrap().value(0), 0.5);
}
