use deepq::{
    env::{Environment, Step},
    error::Result,
    estimator::{ActionValueEstimator, DeepQNetwork, EstimatorConfig},
    loss::LossKind,
    optimizer::OptimizerConfig,
    replay_buffer::{ReplayBuffer, Transition},
    trainer::{train_q_net, GradientMode, Trainer, TrainerConfig},
};
use ndarray::{array, Array1};
use tempfile::tempdir;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// One-step episodes where action 1 pays 1.0 and action 0 pays nothing.
struct Bandit {
    t: usize,
}

impl Environment for Bandit {
    type Info = ();

    fn reset(&mut self) -> Result<Array1<f32>> {
        self.t += 1;
        Ok(array![(self.t % 7) as f32 / 7.0, 1.0])
    }

    fn step(&mut self, action: usize) -> Result<Step<()>> {
        Ok(Step {
            next_state: array![0.0, 0.0],
            reward: if action == 1 { 1.0 } else { 0.0 },
            done: true,
            info: (),
        })
    }
}

#[test]
fn test_end_to_end_training() {
    init_logging();

    let estimator = DeepQNetwork::new(&EstimatorConfig::new(2, 2).discount_factor(0.8).seed(3)).unwrap();
    let config = TrainerConfig::default()
        .batch_size(16)
        .replay_capacity(500)
        .optimizer(OptimizerConfig::Adam {
            learning_rate: 0.05,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        })
        .seed(3);
    let mut trainer = Trainer::with_epsilon_greedy(config, estimator).unwrap();

    let history = trainer.run_episodes(&mut Bandit { t: 0 }, 400).unwrap();
    assert!(history.episode_durations.iter().all(|&d| d == 1));
    assert_eq!(history.losses.len(), 400 - 15);

    let q_net = trainer.into_estimator();
    for i in 0..7 {
        let state = array![i as f32 / 7.0, 1.0];
        assert_eq!(q_net.greedy_action(state.view()).unwrap(), 1);
    }
}

#[test]
fn test_fixed_targets_loss_decreases() {
    init_logging();

    let mut q_net = DeepQNetwork::new(&EstimatorConfig::new(2, 2).architecture(&[8]).seed(1)).unwrap();
    let mut memory = ReplayBuffer::with_seed(64, 1).unwrap();
    for i in 0..64 {
        let x = i as f32 / 64.0;
        // Terminal transitions, so the targets are the rewards and stay fixed.
        memory.push(Transition::new(array![x, 1.0 - x], i % 2, 2.0 * x, array![0.0, 0.0], true));
    }
    let mut optimizer = OptimizerConfig::Adam {
        learning_rate: 0.01,
        beta1: 0.9,
        beta2: 0.999,
        epsilon: 1e-8,
    }
    .build()
    .unwrap();

    let mut losses = Vec::new();
    for _ in 0..300 {
        let loss = train_q_net(&mut q_net, &mut memory, &mut optimizer, 64, GradientMode::SemiGradient, &LossKind::Mse)
            .unwrap()
            .unwrap();
        losses.push(loss);
    }
    assert!(losses[299] < losses[0] * 0.5, "loss went from {} to {}", losses[0], losses[299]);
}

#[test]
fn test_checkpoint_roundtrip() {
    init_logging();

    let dir = tempdir().unwrap();
    let path = dir.path().join("q_net.bin");

    let estimator = DeepQNetwork::new(&EstimatorConfig::new(2, 2).architecture(&[16, 16]).seed(8)).unwrap();
    let mut trainer = Trainer::with_epsilon_greedy(TrainerConfig::default().batch_size(4).seed(8), estimator).unwrap();
    trainer.run_episodes(&mut Bandit { t: 0 }, 20).unwrap();
    trainer.estimator().save(&path).unwrap();

    let restored = DeepQNetwork::load(&path).unwrap();
    let states = array![[0.1, 0.9], [0.5, 0.5], [0.7, 0.2]];
    assert_eq!(restored.forward(states.view()).unwrap(), trainer.estimator().forward(states.view()).unwrap());
    assert_eq!(restored.discount_factor(), trainer.estimator().discount_factor());
}

#[test]
fn test_config_file_drives_trainer() {
    init_logging();

    let dir = tempdir().unwrap();
    let path = dir.path().join("trainer.json");
    std::fs::write(
        &path,
        r#"{
            "batch_size": 4,
            "replay_capacity": 50,
            "gradient_mode": "full",
            "loss": { "huber": { "delta": 2.0 } },
            "optimizer": { "kind": "sgd", "learning_rate": 0.01 },
            "epsilon": { "start": 0.5, "end": 0.1, "decay_steps": 10 },
            "seed": 11
        }"#,
    )
    .unwrap();

    let config = TrainerConfig::from_json_file(&path).unwrap();
    assert_eq!(config.gradient_mode, GradientMode::Full);
    assert_eq!(config.loss, LossKind::Huber { delta: 2.0 });

    let estimator = DeepQNetwork::new(&EstimatorConfig::new(2, 2).seed(11)).unwrap();
    let mut trainer = Trainer::with_epsilon_greedy(config, estimator).unwrap();
    let history = trainer.run_episodes(&mut Bandit { t: 0 }, 60).unwrap();
    assert_eq!(trainer.memory().len(), 50);
    assert!(history.losses.iter().all(|l| l.is_finite()));
}
