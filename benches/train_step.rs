//! CartPole throughput of the Q-learning update and of whole episodes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use deepq::env::{Environment, Step};
use deepq::error::Result;
use deepq::estimator::{DeepQNetwork, EstimatorConfig};
use deepq::loss::LossKind;
use deepq::optimizer::OptimizerConfig;
use deepq::replay_buffer::{ReplayBuffer, Transition};
use deepq::trainer::{train_q_net, GradientMode, Trainer, TrainerConfig};
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Cart-pole balancing with the classic dynamics, capped at 200 steps.
struct CartPole {
    x: f32,
    x_dot: f32,
    theta: f32,
    theta_dot: f32,
    steps: usize,
    rng: StdRng,
}

impl CartPole {
    fn new(seed: u64) -> Self {
        CartPole {
            x: 0.0,
            x_dot: 0.0,
            theta: 0.0,
            theta_dot: 0.0,
            steps: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn observe(&self) -> Array1<f32> {
        Array1::from_vec(vec![self.x, self.x_dot, self.theta, self.theta_dot])
    }
}

impl Environment for CartPole {
    type Info = ();

    fn reset(&mut self) -> Result<Array1<f32>> {
        self.x = self.rng.gen_range(-0.05..0.05);
        self.x_dot = self.rng.gen_range(-0.05..0.05);
        self.theta = self.rng.gen_range(-0.05..0.05);
        self.theta_dot = self.rng.gen_range(-0.05..0.05);
        self.steps = 0;
        Ok(self.observe())
    }

    fn step(&mut self, action: usize) -> Result<Step<()>> {
        let force = if action == 1 { 10.0 } else { -10.0 };
        let gravity = 9.8;
        let mass_pole = 0.1;
        let total_mass = 1.0 + mass_pole;
        let length = 0.5;
        let pole_mass_length = mass_pole * length;
        let dt = 0.02;

        let (sin_theta, cos_theta) = self.theta.sin_cos();
        let temp = (force + pole_mass_length * self.theta_dot.powi(2) * sin_theta) / total_mass;
        let theta_acc = (gravity * sin_theta - cos_theta * temp)
            / (length * (4.0 / 3.0 - mass_pole * cos_theta.powi(2) / total_mass));
        let x_acc = temp - pole_mass_length * theta_acc * cos_theta / total_mass;

        self.x += self.x_dot * dt;
        self.x_dot += x_acc * dt;
        self.theta += self.theta_dot * dt;
        self.theta_dot += theta_acc * dt;
        self.steps += 1;

        let done = self.x.abs() > 2.4 || self.theta.abs() > 0.209 || self.steps >= 200;
        Ok(Step {
            next_state: self.observe(),
            reward: 1.0,
            done,
            info: (),
        })
    }
}

fn filled_memory(capacity: usize) -> ReplayBuffer {
    let mut env = CartPole::new(0);
    let mut rng = StdRng::seed_from_u64(1);
    let mut memory = ReplayBuffer::with_seed(capacity, 2).unwrap();
    let mut state = env.reset().unwrap();
    while memory.len() < capacity {
        let action = rng.gen_range(0..2);
        let step = env.step(action).unwrap();
        memory.push(Transition::new(state, action, step.reward, step.next_state.clone(), step.done));
        state = if step.done { env.reset().unwrap() } else { step.next_state };
    }
    memory
}

fn bench_train_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("train_q_net");
    let mut memory = filled_memory(10000);

    for &batch_size in &[32usize, 128] {
        for mode in [GradientMode::SemiGradient, GradientMode::Full] {
            let mut q_net = DeepQNetwork::new(&EstimatorConfig::new(4, 2).architecture(&[64, 64]).seed(0)).unwrap();
            let mut optimizer = OptimizerConfig::default().build().unwrap();
            group.bench_function(BenchmarkId::new(format!("{:?}", mode), batch_size), |b| {
                b.iter(|| {
                    train_q_net(&mut q_net, &mut memory, &mut optimizer, batch_size, mode, &LossKind::SmoothL1)
                        .unwrap();
                })
            });
        }
    }
    group.finish();
}

fn bench_episodes(c: &mut Criterion) {
    c.bench_function("cartpole_10_episodes", |b| {
        b.iter(|| {
            let estimator = DeepQNetwork::new(&EstimatorConfig::new(4, 2).architecture(&[64, 64]).seed(0)).unwrap();
            let mut trainer = Trainer::with_epsilon_greedy(TrainerConfig::default().seed(0), estimator).unwrap();
            black_box(trainer.run_episodes(&mut CartPole::new(3), 10).unwrap())
        })
    });
}

criterion_group!(benches, bench_train_step, bench_episodes);
criterion_main!(benches);
