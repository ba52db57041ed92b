//! Toy task with a hybrid action.
//!
//! Each episode draws a target point inside `[0, 1] x [0, 2]`. Every step the
//! agent must
//! - pick the current phase (`t % 4`) with discrete head 0; one decoy phase is masked out
//! - pick the bucket of the target's first coordinate with discrete head 1 (5 buckets)
//! - point at the target with its two continuous dimensions

use hybrid_rl::{ActionSelection, ActionSpace, Agent, Result, TrajectoryBatch};

pub const OBS_DIM: usize = 3;
pub const EPISODE_LEN: usize = 16;

const PHASES: usize = 4;
const BUCKETS: usize = 5;

pub fn action_space() -> Result<ActionSpace> {
    ActionSpace::new(2, &[0.0, 0.0], &[1.0, 2.0], vec![PHASES, BUCKETS])
}

pub struct TargetEnv {
    target: [f32; 2],
    t: usize,
}

impl TargetEnv {
    pub fn new() -> Self {
        let mut env = Self { target: [0.0; 2], t: 0 };
        env.reset();
        env
    }

    pub fn reset(&mut self) {
        self.target = [fastrand::f32(), 2.0 * fastrand::f32()];
        self.t = 0;
    }

    fn phase(&self) -> usize {
        self.t % PHASES
    }

    pub fn observation(&self) -> Vec<f32> {
        vec![self.target[0], self.target[1] / 2.0, self.phase() as f32 / PHASES as f32]
    }

    /// Flat legality rows of both heads.
    pub fn action_mask(&self) -> Vec<f32> {
        let decoy = (self.phase() + 2) % PHASES;
        (0..PHASES)
            .map(|a| if a == decoy { 0.0 } else { 1.0 })
            .chain(std::iter::repeat(1.0).take(BUCKETS))
            .collect()
    }

    /// Returns `(reward, terminated)`.
    pub fn step(&mut self, action: &ActionSelection) -> (f32, bool) {
        let bucket = ((self.target[0] * BUCKETS as f32) as usize).min(BUCKETS - 1);
        let distance = (action.continuous[0] - self.target[0]).abs() + (action.continuous[1] - self.target[1]).abs();

        let mut reward = -distance;
        if action.discrete[0] == self.phase() {
            reward += 1.0;
        }
        if action.discrete[1] == bucket {
            reward += 0.5;
        }

        self.t += 1;
        (reward, self.t >= EPISODE_LEN)
    }
}

/// Roll out `steps` transitions; returns the batch and the mean episode return.
pub fn collect<B, A>(agent: &mut A, env: &mut TargetEnv, steps: usize) -> Result<(TrajectoryBatch, f32)>
where
    B: burn::tensor::backend::AutodiffBackend,
    A: Agent<B>,
{
    let mut obs = Vec::with_capacity(steps * OBS_DIM);
    let mut next_obs = Vec::with_capacity(steps * OBS_DIM);
    let mut masks = Vec::new();
    let mut rewards = Vec::with_capacity(steps);
    let mut discrete = Vec::new();
    let mut continuous = Vec::new();
    let mut discrete_log_probs = Vec::new();
    let mut continuous_log_probs = Vec::with_capacity(steps);
    let mut terminated = Vec::with_capacity(steps);

    let mut episode_return = 0.0;
    let mut returns = Vec::new();

    for _ in 0..steps {
        let o = env.observation();
        let mask = env.action_mask();
        let action = agent.select_action(&o, Some(&mask), true)?;
        let (reward, done) = env.step(&action);

        obs.extend_from_slice(&o);
        next_obs.extend(env.observation());
        masks.extend_from_slice(&mask);
        rewards.push(reward);
        discrete.extend(action.discrete.iter().map(|&a| a as f32));
        continuous.extend_from_slice(&action.continuous);
        discrete_log_probs.extend_from_slice(&action.discrete_log_probs);
        continuous_log_probs.push(action.continuous_log_prob);
        terminated.push(done);

        episode_return += reward;
        if done {
            returns.push(episode_return);
            episode_return = 0.0;
            env.reset();
        }
    }

    let mean_return = if returns.is_empty() {
        episode_return
    } else {
        returns.iter().sum::<f32>() / returns.len() as f32
    };

    let batch = TrajectoryBatch::new(terminated)
        .with_agent_field("obs", OBS_DIM, vec![obs])?
        .with_agent_field("obs_", OBS_DIM, vec![next_obs])?
        .with_agent_field("legal", PHASES + BUCKETS, vec![masks])?
        .with_global("global_rewards", 1, rewards)?
        .with_agent_field("discrete_actions", 2, vec![discrete])?
        .with_agent_field("continuous_actions", 2, vec![continuous])?
        .with_agent_field("discrete_log_probs", 2, vec![discrete_log_probs])?
        .with_agent_field("continuous_log_probs", 1, vec![continuous_log_probs])?;
    Ok((batch, mean_return))
}
