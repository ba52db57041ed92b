//! PPO on the hybrid target task, with a short imitation warm start.

use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};

use hybrid_rl::{Agent, BatchNameMap, PgAgent, PgConfig, Result};

use crate::target_env::{action_space, collect, TargetEnv, EPISODE_LEN, OBS_DIM};

type B = Autodiff<NdArray<f32>>;

const ITERATIONS: usize = 60;
const ROLLOUT_STEPS: usize = 8 * EPISODE_LEN;
const CHECKPOINT_DIR: &str = "checkpoints/pg_demo";

pub fn run() -> Result<()> {
    let device = NdArrayDevice::default();
    let config = PgConfig::new(OBS_DIM, action_space()?)
        .with_name("PPO-demo")
        .with_hidden_dims(vec![64, 64])
        .with_lr(1e-3)
        .with_n_epochs(4)
        .with_mini_batch_size(32)
        .with_anneal_lr(ITERATIONS * ROLLOUT_STEPS)
        .with_batch_name_map(BatchNameMap::default().with_action_mask("legal"));
    let mut agent = PgAgent::<B>::new(config, &device)?;
    let mut env = TargetEnv::new();

    // A few expert steps on the continuous part only: point at the target.
    for _ in 0..20 {
        let obs = env.observation();
        let expert = [obs[0], 2.0 * obs[1]];
        let (_, continuous_loss) = agent.imitation_update(&obs, None, Some(&expert))?;
        log::debug!("imitation continuous_loss={:.4}", continuous_loss);
        env.reset();
    }

    for iteration in 0..ITERATIONS {
        let (batch, mean_return) = collect::<B, _>(&mut agent, &mut env, ROLLOUT_STEPS)?;
        let (actor_loss, critic_loss) = agent.update_from_batch(&batch, 0)?;
        if iteration % 10 == 0 || iteration == ITERATIONS - 1 {
            log::info!(
                "iter {:>3} | steps {:>6} | return {:>7.2} | actor {:>8.4} | critic {:>8.4} | lr {:.2e}",
                iteration,
                agent.steps(),
                mean_return,
                actor_loss,
                critic_loss,
                agent.current_lr()
            );
        }
    }

    agent.save(CHECKPOINT_DIR)?;
    let restored = PgAgent::<B>::load(CHECKPOINT_DIR, &device)?;
    let obs = env.observation();
    let (discrete, continuous) = restored.evaluate_action_deterministic(&obs, Some(&env.action_mask()))?;
    log::info!(
        "restored agent: obs={:?} -> discrete={:?} continuous={:?} V={:.3}",
        obs,
        discrete,
        continuous,
        restored.expected_value(&obs, None)?
    );
    Ok(())
}
