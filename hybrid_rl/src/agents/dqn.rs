//! Multi-head Q-learning over hybrid action spaces.
//!
//! Every discrete head and every (binned) continuous dimension gets its own
//! Q head on a shared encoder. Heads are learned independently against
//! greedy, soft or Munchausen targets; the per-group losses are averaged over
//! heads and the two groups are summed into one optimizer step.

use std::path::Path;

use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::activation::softmax;
use burn::tensor::backend::AutodiffBackend;

use crate::action_space::ActionSpace;
use crate::agents::{
    ensure_finite, head_indices, mask_heads, rows_tensor, scalar, single_row, to_vec, vector, ActionSelection,
    Agent,
};
use crate::algorithms::distribution::{argmax_rows, categorical_entropy, index_column, sample_categorical};
use crate::algorithms::{clip_grad_norm, expected_head_value, td_target, Discretizer};
use crate::batch::TrajectoryBatch;
use crate::checkpoint::Checkpointer;
use crate::config::{ActionSelectionMode, DqnConfig, DqnVariant};
use crate::error::{HybridRlError, Result};
use crate::nn::{QNetwork, QNetworkConfig, QOutput};
use crate::scheduling::EpsilonDecay;

/// Weight of the entropy bonus of discrete heads under soft targets.
const DISCRETE_ENTROPY_SCALE: f32 = 0.1;
/// Weight of the entropy bonus of continuous heads under soft targets.
const CONTINUOUS_ENTROPY_SCALE: f32 = 1.0;

/// DQN / soft DQN / Munchausen DQN agent.
pub struct DqnAgent<B: AutodiffBackend> {
    config: DqnConfig,
    variant: DqnVariant,
    q: QNetwork<B>,
    optimizer: OptimizerAdaptor<Adam, QNetwork<B>, B>,
    discretizer: Discretizer,
    eps_decay: EpsilonDecay,
    eps: f32,
    step: usize,
    device: B::Device,
}

impl<B: AutodiffBackend> DqnAgent<B> {
    pub fn new(config: DqnConfig, device: &B::Device) -> Result<Self> {
        config.validate()?;
        let q = QNetworkConfig {
            obs_dim: config.obs_dim,
            hidden_dims: config.hidden_dims.clone(),
            activation: config.activation,
            orthogonal: config.orthogonal,
            dueling: config.dueling,
            n_c_action_bins: config.n_c_action_bins,
            action_space: config.action_space.clone(),
        }
        .init(device);
        let optimizer = AdamConfig::new().with_epsilon(1e-5).init();
        let discretizer = Discretizer::new(&config.action_space, config.n_c_action_bins);
        let eps_decay = EpsilonDecay::new(config.init_eps, config.eps_decay_half_life);
        let variant = config.variant();

        log::debug!(
            "{}: {:?} DQN agent, dueling={}, {} bins per continuous dim",
            config.name,
            variant,
            config.dueling,
            config.n_c_action_bins
        );

        Ok(Self {
            eps: eps_decay.init_eps(),
            config,
            variant,
            q,
            optimizer,
            discretizer,
            eps_decay,
            step: 0,
            device: device.clone(),
        })
    }

    pub fn config(&self) -> &DqnConfig {
        &self.config
    }

    pub fn variant(&self) -> DqnVariant {
        self.variant
    }

    pub fn q_network(&self) -> &QNetwork<B> {
        &self.q
    }

    /// Current exploration rate.
    pub fn eps(&self) -> f32 {
        self.eps
    }

    /// Environment steps counted by `select_action(.., step = true)`.
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn set_eval_mode(&mut self, eval_mode: bool) {
        self.config.eval_mode = eval_mode;
    }

    fn space(&self) -> &ActionSpace {
        &self.config.action_space
    }

    fn forward_one(&self, obs: &[f32], mask: Option<&[f32]>) -> Result<QRow> {
        let obs_t = single_row::<B::InnerBackend>(obs, self.config.obs_dim, &self.device)?;
        let mask_t = match mask {
            Some(mask) if self.space().has_discrete() => {
                self.space().validate_mask(mask)?;
                Some(rows_tensor::<B::InnerBackend>(mask, mask.len(), &self.device)?)
            }
            _ => None,
        };
        let out = self.q.valid().forward(obs_t);

        let discrete = mask_heads(per_head_q(&out, &out.discrete), mask_t.as_ref(), self.space())
            .into_iter()
            .map(to_vec)
            .collect();
        let continuous = per_head_q(&out, &out.continuous).into_iter().map(to_vec).collect();
        let value = out.value.map(|v| scalar(v.flatten(0, 1)));

        let row = QRow {
            value,
            discrete,
            continuous,
        };
        ensure_finite(&row.flat(), "Q-values", obs)?;
        Ok(row)
    }

    fn uniform_action(&self, mask: Option<&[f32]>) -> (Vec<usize>, Vec<f32>) {
        let space = self.space();
        let discrete = space
            .head_offsets()
            .into_iter()
            .zip(space.discrete_cardinalities())
            .map(|(offset, &n)| match mask {
                Some(mask) => {
                    let legal: Vec<usize> = (0..n).filter(|&a| mask[offset + a] != 0.0).collect();
                    legal[fastrand::usize(..legal.len())]
                }
                None => fastrand::usize(..n),
            })
            .collect();
        let continuous = space
            .continuous_bounds()
            .iter()
            .map(|&(low, high)| low + fastrand::f32() * (high - low))
            .collect();
        (discrete, continuous)
    }

    /// One head's TD loss: `mean((Q(s, a) - y)^2)`, minus the entropy bonus for soft targets.
    fn head_loss(
        &self,
        q: Tensor<B, 2>,
        next_q: Tensor<B::InnerBackend, 2>,
        actions: &[usize],
        rewards: Tensor<B::InnerBackend, 1>,
        discounts: Tensor<B::InnerBackend, 1>,
        entropy_scale: f32,
    ) -> Tensor<B, 1> {
        let tau = self.config.entropy;
        let target = td_target(
            self.variant,
            rewards,
            discounts,
            next_q,
            q.clone().inner(),
            index_column::<B::InnerBackend>(actions, &self.device),
            tau,
            self.config.munchausen,
        );
        let target = Tensor::<B, 1>::from_inner(target);

        let q_taken = q.clone().gather(1, index_column::<B>(actions, &self.device)).flatten(0, 1);
        let td = (q_taken - target).powf_scalar(2.0).mean();
        match self.variant {
            DqnVariant::Soft => td - categorical_entropy(q).mean().mul_scalar(entropy_scale * tau),
            _ => td,
        }
    }
}

/// Inference outputs for one observation, masked and with `V` added.
struct QRow {
    value: Option<f32>,
    discrete: Vec<Vec<f32>>,
    continuous: Vec<Vec<f32>>,
}

impl QRow {
    fn flat(&self) -> Vec<f32> {
        self.value
            .iter()
            .copied()
            .chain(self.discrete.iter().flatten().copied())
            .chain(self.continuous.iter().flatten().copied())
            .collect()
    }
}

fn mean(values: &[f32]) -> Option<f32> {
    (!values.is_empty()).then(|| values.iter().sum::<f32>() / values.len() as f32)
}

fn mean_loss<B: Backend>(losses: Vec<Tensor<B, 1>>) -> Option<Tensor<B, 1>> {
    let count = losses.len() as f32;
    losses
        .into_iter()
        .reduce(|acc, loss| acc + loss)
        .map(|sum| sum.div_scalar(count))
}

fn per_head_q<B: Backend>(out: &QOutput<B>, heads: &[Tensor<B, 2>]) -> Vec<Tensor<B, 2>> {
    heads.iter().map(|head| out.q_values(head.clone())).collect()
}

impl<B: AutodiffBackend> Agent<B> for DqnAgent<B> {
    fn select_action(&mut self, obs: &[f32], mask: Option<&[f32]>, step: bool) -> Result<ActionSelection> {
        let row = self.forward_one(obs, mask)?;
        self.eps = self.eps_decay.get_eps(self.step);
        let n_bins = self.discretizer.n_bins();

        let (discrete, continuous) = match self.config.selection_mode {
            ActionSelectionMode::EpsilonGreedy if self.eps > 0.0 && fastrand::f32() < self.eps => {
                self.uniform_action(mask)
            }
            ActionSelectionMode::EpsilonGreedy => {
                let discrete = row
                    .discrete
                    .iter()
                    .map(|q| argmax_rows(q, q.len())[0])
                    .collect();
                let bins: Vec<usize> = row.continuous.iter().map(|q| argmax_rows(q, n_bins)[0]).collect();
                (discrete, self.discretizer.undiscretize(&bins))
            }
            ActionSelectionMode::Softmax => {
                let sample = |q: &Vec<f32>| {
                    let probs = to_vec(softmax(
                        vector::<B::InnerBackend>(q, &self.device).reshape([1, q.len()]),
                        1,
                    ));
                    sample_categorical(&probs, q.len())[0]
                };
                let discrete = row.discrete.iter().map(&sample).collect();
                let bins: Vec<usize> = row.continuous.iter().map(&sample).collect();
                (discrete, self.discretizer.undiscretize(&bins))
            }
        };

        if step {
            self.step += 1;
        }
        Ok(ActionSelection {
            discrete_log_probs: vec![0.0; discrete.len()],
            discrete,
            continuous,
            continuous_log_prob: 0.0,
        })
    }

    fn evaluate_action_deterministic(&self, obs: &[f32], mask: Option<&[f32]>) -> Result<(Vec<usize>, Vec<f32>)> {
        let row = self.forward_one(obs, mask)?;
        let discrete = row.discrete.iter().map(|q| argmax_rows(q, q.len())[0]).collect();
        let bins: Vec<usize> = row
            .continuous
            .iter()
            .map(|q| argmax_rows(q, self.discretizer.n_bins())[0])
            .collect();
        Ok((discrete, self.discretizer.undiscretize(&bins)))
    }

    fn imitation_update(
        &mut self,
        _obs: &[f32],
        _expert_discrete: Option<&[f32]>,
        _expert_continuous: Option<&[f32]>,
    ) -> Result<(f32, f32)> {
        Ok((0.0, 0.0))
    }

    /// Without actions, [`expected_value`](Agent::expected_value) per row.
    /// With actions, `Q(s, a)`: the taken entry of every discrete head and the
    /// binned entry of every continuous head, averaged like `expected_value`.
    fn value_estimate(&self, obs: &[f32], actions: Option<(&[f32], &[f32])>) -> Result<Vec<f32>> {
        let obs_dim = self.config.obs_dim;
        if obs.is_empty() || obs.len() % obs_dim != 0 {
            return Err(HybridRlError::shape(format!(
                "expected a non-empty multiple of {} values, got {}",
                obs_dim,
                obs.len()
            )));
        }
        let Some((discrete, continuous)) = actions else {
            return obs.chunks(obs_dim).map(|row| self.expected_value(row, None)).collect();
        };

        let space = self.space();
        let rows = obs.len() / obs_dim;
        let (heads, dims) = (space.num_discrete_heads(), space.continuous_dim());
        if discrete.len() != rows * heads || continuous.len() != rows * dims {
            return Err(HybridRlError::shape(format!(
                "{} observation rows need {} discrete and {} continuous action values, got {} and {}",
                rows,
                rows * heads,
                rows * dims,
                discrete.len(),
                continuous.len()
            )));
        }
        let columns = if heads > 0 {
            head_indices(discrete, space.discrete_cardinalities())?
        } else {
            Vec::new()
        };
        let bins = self.discretizer.discretize(continuous);

        obs.chunks(obs_dim)
            .enumerate()
            .map(|(t, row)| {
                let q = self.forward_one(row, None)?;
                let taken_discrete: Vec<f32> =
                    q.discrete.iter().zip(&columns).map(|(q, column)| q[column[t]]).collect();
                let taken_continuous: Vec<f32> = q
                    .continuous
                    .iter()
                    .enumerate()
                    .map(|(d, q)| q[bins[t * dims + d]])
                    .collect();
                let groups: Vec<f32> = [mean(&taken_discrete), mean(&taken_continuous)]
                    .into_iter()
                    .flatten()
                    .collect();
                Ok(mean(&groups).unwrap_or(0.0))
            })
            .collect()
    }

    fn expected_value(&self, obs: &[f32], mask: Option<&[f32]>) -> Result<f32> {
        let row = self.forward_one(obs, mask)?;
        if let Some(value) = row.value {
            return Ok(value);
        }

        // Masked entries already hold MASK_FILL; pass the mask so they are skipped.
        let space = self.space();
        let discrete: Vec<f32> = row
            .discrete
            .iter()
            .zip(space.head_offsets())
            .map(|(q, offset)| {
                let head_mask = mask
                    .filter(|_| space.has_discrete())
                    .map(|m| &m[offset..offset + q.len()]);
                expected_head_value(q, head_mask, self.eps)
            })
            .collect();
        let continuous: Vec<f32> = row
            .continuous
            .iter()
            .map(|q| expected_head_value(q, None, self.eps))
            .collect();

        let groups: Vec<f32> = [mean(&discrete), mean(&continuous)].into_iter().flatten().collect();
        Ok(mean(&groups).unwrap_or(0.0))
    }

    fn update_from_batch(&mut self, batch: &TrajectoryBatch, agent_index: usize) -> Result<(f32, f32)> {
        if self.config.eval_mode {
            return Ok((0.0, 0.0));
        }
        let space = self.config.action_space.clone();
        let obs_dim = self.config.obs_dim;
        let device = self.device.clone();
        let resolved = batch.resolve(&self.config.batch_name_map, &space, obs_dim, agent_index, false)?;

        let obs = rows_tensor::<B>(resolved.obs.data, obs_dim, &device)?;
        let next_obs = rows_tensor::<B::InnerBackend>(resolved.next_obs.data, obs_dim, &device)?;
        let rewards = vector::<B::InnerBackend>(resolved.rewards, &device);
        let discounts: Vec<f32> = resolved
            .terminated
            .iter()
            .map(|&done| if done { 0.0 } else { self.config.gamma })
            .collect();
        let discounts = vector::<B::InnerBackend>(&discounts, &device);

        let next = self.q.valid().forward(next_obs);
        let current = self.q.forward(obs);

        let mut discrete_loss = None;
        if let Some(actions) = &resolved.discrete_actions {
            let columns = head_indices(actions.data, space.discrete_cardinalities())?;
            let losses = per_head_q(&current, &current.discrete)
                .into_iter()
                .zip(per_head_q(&next, &next.discrete))
                .zip(&columns)
                .map(|((q, next_q), column)| {
                    self.head_loss(
                        q,
                        next_q,
                        column,
                        rewards.clone(),
                        discounts.clone(),
                        DISCRETE_ENTROPY_SCALE,
                    )
                })
                .collect();
            discrete_loss = mean_loss(losses);
        }

        let mut continuous_loss = None;
        if let Some(actions) = &resolved.continuous_actions {
            let dims = actions.width;
            let bins = self.discretizer.discretize(actions.data);
            let losses = per_head_q(&current, &current.continuous)
                .into_iter()
                .zip(per_head_q(&next, &next.continuous))
                .enumerate()
                .map(|(d, (q, next_q))| {
                    let column: Vec<usize> = bins.iter().skip(d).step_by(dims).copied().collect();
                    self.head_loss(
                        q,
                        next_q,
                        &column,
                        rewards.clone(),
                        discounts.clone(),
                        CONTINUOUS_ENTROPY_SCALE,
                    )
                })
                .collect();
            continuous_loss = mean_loss(losses);
        }

        let discrete_value = discrete_loss.clone().map(scalar).unwrap_or(0.0);
        let continuous_value = continuous_loss.clone().map(scalar).unwrap_or(0.0);
        let total = match (discrete_loss, continuous_loss) {
            (Some(d), Some(c)) => d + c,
            (Some(d), None) => d,
            (None, Some(c)) => c,
            (None, None) => return Ok((0.0, 0.0)),
        };

        let mut grads = GradientsParams::from_grads(total.backward(), &self.q);
        clip_grad_norm::<B, _>(&self.q, &mut grads, self.config.clip_grad)?;
        self.q = self.optimizer.step(self.config.lr, self.q.clone(), grads);

        log::debug!(
            "{}: step={} eps={:.3} discrete_loss={:.4} continuous_loss={:.4}",
            self.config.name,
            self.step,
            self.eps,
            discrete_value,
            continuous_value
        );
        Ok((discrete_value, continuous_value))
    }

    fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if self.config.eval_mode {
            log::warn!("{}: eval mode agent, not saving to {}", self.config.name, path.display());
            return Ok(());
        }
        let checkpoint = Checkpointer::create(path)?;
        checkpoint.write_attr("config", &self.config)?;
        checkpoint.write_attr("eps", &self.eps)?;
        checkpoint.write_attr("step", &self.step)?;
        checkpoint.save_module::<B, _>("Q1", &self.q)?;
        log::info!("{}: saved to {}", self.config.name, path.display());
        Ok(())
    }

    fn load(path: impl AsRef<Path>, device: &B::Device) -> Result<Self> {
        let checkpoint = Checkpointer::open(path.as_ref())?;
        let config: DqnConfig = checkpoint.read_attr("config")?;
        let mut agent = Self::new(config, device)?;
        agent.eps = checkpoint.read_attr("eps")?;
        agent.step = checkpoint.read_attr("step")?;
        agent.q = checkpoint.load_module::<B, _>("Q1", agent.q.clone(), device)?;
        log::info!("{}: loaded from {}", agent.config.name, path.as_ref().display());
        Ok(agent)
    }
}
