//! Munchausen DQN on the hybrid target task (continuous part binned).

use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};

use hybrid_rl::{Agent, BatchNameMap, DqnAgent, DqnConfig, Result};

use crate::target_env::{action_space, collect, TargetEnv, EPISODE_LEN, OBS_DIM};

type B = Autodiff<NdArray<f32>>;

const ITERATIONS: usize = 200;
const ROLLOUT_STEPS: usize = 2 * EPISODE_LEN;

pub fn run() -> Result<()> {
    let device = NdArrayDevice::default();
    let config = DqnConfig::new(OBS_DIM, action_space()?)
        .with_name("MDQN-demo")
        .with_hidden_dims(vec![64, 64])
        .with_lr(5e-4)
        .with_dueling(true)
        .with_n_c_action_bins(11)
        .with_entropy(0.03)
        .with_munchausen(0.9)
        .with_init_eps(0.5)
        .with_eps_decay_half_life(ITERATIONS * ROLLOUT_STEPS / 4)
        .with_batch_name_map(BatchNameMap::default().with_action_mask("legal"));
    let mut agent = DqnAgent::<B>::new(config, &device)?;
    log::info!("variant: {:?}", agent.variant());
    let mut env = TargetEnv::new();

    for iteration in 0..ITERATIONS {
        let (batch, mean_return) = collect::<B, _>(&mut agent, &mut env, ROLLOUT_STEPS)?;
        let (discrete_loss, continuous_loss) = agent.update_from_batch(&batch, 0)?;
        if iteration % 25 == 0 || iteration == ITERATIONS - 1 {
            let obs = env.observation();
            log::info!(
                "iter {:>3} | eps {:.3} | return {:>7.2} | discrete {:>8.4} | continuous {:>8.4} | E[V] {:>6.3}",
                iteration,
                agent.eps(),
                mean_return,
                discrete_loss,
                continuous_loss,
                agent.expected_value(&obs, Some(&env.action_mask()))?
            );
        }
    }
    Ok(())
}
