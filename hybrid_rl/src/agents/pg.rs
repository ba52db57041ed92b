//! Policy-gradient learner over hybrid action spaces.
//!
//! One actor (shared encoder, per-head outputs), one critic and, for
//! state-independent log-std, one free parameter vector are trained by a
//! single Adam optimizer. Each learning call:
//!
//! 1. freezes the critic's values and computes `(returns, advantages)`
//! 2. shuffles the trajectory once and walks it in `mini_batch_size` chunks
//!    for `n_epochs` passes
//! 3. per chunk, minimizes `actor + value_loss_coef * critic` with optional
//!    gradient-norm clipping
//!
//! With `ppo_clip > 0` the actor term is the PPO clipped surrogate, otherwise
//! the vanilla `-E[log pi A]`.

use std::path::Path;

use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::activation::log_softmax;
use burn::tensor::backend::AutodiffBackend;
use rand::seq::SliceRandom;

use crate::action_space::ActionSpace;
use crate::agents::{
    ensure_finite, head_indices, mask_heads, rows_tensor, scalar, single_row, to_vec, vector, ActionSelection,
    Agent,
};
use crate::algorithms::distribution::{
    argmax_rows, categorical_entropy, categorical_log_prob, index_column, sample_categorical, ContinuousPolicy,
};
use crate::algorithms::imitation::{continuous_mle_loss, discrete_cross_entropy, naive_imitation_loss};
use crate::algorithms::{
    clip_grad_norm, critic_loss, normalize_advantages, ppo_clip_loss, vanilla_pg_loss, AdvantageEstimator,
};
use crate::batch::{ResolvedBatch, TrajectoryBatch};
use crate::checkpoint::Checkpointer;
use crate::config::{AdvantageType, PgConfig, StdType};
use crate::error::{HybridRlError, Result};
use crate::nn::{HybridActor, HybridActorConfig, StatelessLogStd, ValueNetwork};
use crate::scheduling::{AnnealedLR, LRScheduler};

// ============================================================================
// Model
// ============================================================================

/// Every trainable parameter of the policy-gradient learner.
#[derive(Module, Debug)]
pub struct PgModel<B: Backend> {
    pub actor: HybridActor<B>,
    pub critic: ValueNetwork<B>,
    /// Present only for [`StdType::Stateless`] with continuous actions.
    pub log_std: Option<StatelessLogStd<B>>,
}

/// Actor outputs with the continuous log-std already bounded.
pub(crate) struct PolicyOutput<B: Backend> {
    pub discrete_logits: Vec<Tensor<B, 2>>,
    /// `(mean, log_std)`, both `[batch, continuous_dim]`.
    pub continuous: Option<(Tensor<B, 2>, Tensor<B, 2>)>,
}

impl<B: Backend> PgModel<B> {
    fn init(config: &PgConfig, device: &B::Device) -> Self {
        let space = &config.action_space;
        let actor = HybridActorConfig {
            obs_dim: config.obs_dim,
            hidden_dims: config.hidden_dims.clone(),
            activation: config.activation,
            orthogonal: config.orthogonal,
            std_type: config.std_type,
            action_space: space.clone(),
        }
        .init(device);
        let critic = ValueNetwork::new(
            config.obs_dim,
            config.hidden_dims.clone(),
            config.activation,
            config.orthogonal,
            device,
        );
        let log_std = (config.std_type == StdType::Stateless && space.has_continuous())
            .then(|| StatelessLogStd::new(space.continuous_dim(), device));

        Self { actor, critic, log_std }
    }

    pub(crate) fn policy_forward(&self, obs: Tensor<B, 2>, policy: &ContinuousPolicy) -> PolicyOutput<B> {
        let [batch, _] = obs.dims();
        let out = self.actor.forward(obs);
        let raw_log_std = out
            .continuous_log_std
            .or_else(|| self.log_std.as_ref().map(|l| l.expand(batch)));
        let continuous = match (out.continuous_mean, raw_log_std) {
            (Some(mean), Some(raw)) => Some((mean, policy.bound_log_std(raw))),
            _ => None,
        };
        PolicyOutput {
            discrete_logits: out.discrete_logits,
            continuous,
        }
    }
}

// ============================================================================
// Agent
// ============================================================================

/// Per-step targets fixed for the whole learning call.
struct Targets {
    returns: Vec<f32>,
    advantages: Vec<f32>,
    old_values: Vec<f32>,
}

/// PPO / vanilla policy-gradient agent.
pub struct PgAgent<B: AutodiffBackend> {
    config: PgConfig,
    model: PgModel<B>,
    optimizer: OptimizerAdaptor<Adam, PgModel<B>, B>,
    policy: ContinuousPolicy,
    estimator: AdvantageEstimator,
    scheduler: AnnealedLR,
    steps: usize,
    device: B::Device,
}

impl<B: AutodiffBackend> PgAgent<B> {
    /// Build an agent from a validated configuration.
    pub fn new(config: PgConfig, device: &B::Device) -> Result<Self> {
        config.validate()?;
        let space = &config.action_space;

        let model = PgModel::init(&config, device);
        let optimizer = AdamConfig::new().with_epsilon(1e-5).init();
        let policy = ContinuousPolicy::new(
            space.min_actions(),
            space.max_actions(),
            config.action_clamp_type,
            config.log_std_range,
        );
        let estimator = AdvantageEstimator::new(config.advantage_type, config.gamma, config.gae_lambda);
        let scheduler = AnnealedLR::new(config.lr, config.anneal_lr);

        log::debug!(
            "{}: PG agent with {} discrete heads, {} continuous dims, advantage={}, ppo_clip={}",
            config.name,
            space.num_discrete_heads(),
            space.continuous_dim(),
            config.advantage_type,
            config.ppo_clip
        );

        Ok(Self {
            config,
            model,
            optimizer,
            policy,
            estimator,
            scheduler,
            steps: 0,
            device: device.clone(),
        })
    }

    pub fn config(&self) -> &PgConfig {
        &self.config
    }

    pub fn model(&self) -> &PgModel<B> {
        &self.model
    }

    /// Environment steps counted by `select_action(.., step = true)`.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// EMA baseline of the `constant` advantage mode.
    pub fn g_mean(&self) -> f32 {
        self.estimator.g_mean
    }

    /// Learning rate the next update will use.
    pub fn current_lr(&self) -> f64 {
        self.scheduler.get_lr(self.steps)
    }

    pub fn set_eval_mode(&mut self, eval_mode: bool) {
        self.config.eval_mode = eval_mode;
    }

    fn space(&self) -> &ActionSpace {
        &self.config.action_space
    }

    fn mask_tensor(&self, mask: Option<&[f32]>) -> Result<Option<Tensor<B::InnerBackend, 2>>> {
        match mask {
            Some(mask) if self.space().has_discrete() => {
                self.space().validate_mask(mask)?;
                Ok(Some(rows_tensor(mask, mask.len(), &self.device)?))
            }
            _ => Ok(None),
        }
    }

    /// `(per-head log-probs, continuous log-prob)` of a given action.
    pub fn action_log_probs(
        &self,
        obs: &[f32],
        discrete: &[usize],
        continuous: &[f32],
        mask: Option<&[f32]>,
    ) -> Result<(Vec<f32>, f32)> {
        let space = self.space();
        if discrete.len() != space.num_discrete_heads() || continuous.len() != space.continuous_dim() {
            return Err(HybridRlError::shape(format!(
                "action has {} discrete / {} continuous entries, expected {} / {}",
                discrete.len(),
                continuous.len(),
                space.num_discrete_heads(),
                space.continuous_dim()
            )));
        }
        let obs_t = single_row::<B::InnerBackend>(obs, self.config.obs_dim, &self.device)?;
        let mask_t = self.mask_tensor(mask)?;
        let out = self.model.valid().policy_forward(obs_t, &self.policy);

        let logits = mask_heads(out.discrete_logits, mask_t.as_ref(), space);
        let discrete_log_probs = logits
            .into_iter()
            .zip(discrete)
            .map(|(head, &a)| {
                scalar(categorical_log_prob(head, index_column(&[a], &self.device)))
            })
            .collect();
        let continuous_log_prob = match out.continuous {
            Some((mean, log_std)) => {
                let action = rows_tensor(continuous, continuous.len(), &self.device)?;
                scalar(self.policy.log_prob(action, mean, log_std))
            }
            None => 0.0,
        };
        Ok((discrete_log_probs, continuous_log_prob))
    }

    /// One learning call; `critic_only` skips the actor term entirely.
    pub fn reinforcement_learn(
        &mut self,
        batch: &TrajectoryBatch,
        agent_index: usize,
        critic_only: bool,
    ) -> Result<(f32, f32)> {
        if self.config.eval_mode {
            return Ok((0.0, 0.0));
        }
        let resolved = batch.resolve(
            &self.config.batch_name_map,
            &self.config.action_space,
            self.config.obs_dim,
            agent_index,
            true,
        )?;
        let targets = self.compute_targets(&resolved)?;

        let n = resolved.len;
        let mini_batch_size = self.config.mini_batch_size;
        let lr = self.current_lr();

        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(&mut rand::thread_rng());

        let mut actor_total = 0.0;
        let mut critic_total = 0.0;
        let mut updates = 0usize;

        for _ in 0..self.config.n_epochs {
            for batch_start in (0..n).step_by(mini_batch_size) {
                let batch_end = (batch_start + mini_batch_size).min(n);
                let (actor_loss, critic_loss) = self.learn_minibatch(
                    &resolved,
                    &indices[batch_start..batch_end],
                    &targets,
                    lr,
                    critic_only,
                )?;
                actor_total += actor_loss;
                critic_total += critic_loss;
                updates += 1;
            }
        }

        let updates = updates.max(1) as f32;
        log::debug!(
            "{}: {} updates, lr={:.2e}, actor_loss={:.4}, critic_loss={:.4}",
            self.config.name,
            updates,
            lr,
            actor_total / updates,
            critic_total / updates
        );
        Ok((actor_total / updates, critic_total / updates))
    }

    /// Frozen critic values, bootstrap and `(returns, advantages)`.
    fn compute_targets(&mut self, batch: &ResolvedBatch<'_>) -> Result<Targets> {
        let obs_dim = self.config.obs_dim;
        let critic = self.model.valid().critic;

        let obs = rows_tensor::<B::InnerBackend>(batch.obs.data, obs_dim, &self.device)?;
        let old_values = to_vec(critic.forward(obs));
        let last_next = single_row::<B::InnerBackend>(batch.next_obs.row(batch.len - 1), obs_dim, &self.device)?;
        let bootstrap = scalar(critic.forward(last_next));
        ensure_finite(&old_values, "critic values", batch.obs.data)?;

        let baseline = match (self.config.advantage_type, &batch.values) {
            (AdvantageType::Gae | AdvantageType::A2c, Some(values)) => values.data.to_vec(),
            _ => old_values.clone(),
        };
        let (returns, mut advantages) =
            self.estimator
                .estimate(batch.rewards, batch.terminated, &baseline, bootstrap);
        if self.config.norm_advantages {
            normalize_advantages(&mut advantages);
        }
        if advantages.iter().any(|a| !a.is_finite()) {
            log::warn!("{}: non-finite advantages in batch", self.config.name);
        }

        Ok(Targets {
            returns,
            advantages,
            old_values,
        })
    }

    fn learn_minibatch(
        &mut self,
        batch: &ResolvedBatch<'_>,
        indices: &[usize],
        targets: &Targets,
        lr: f64,
        critic_only: bool,
    ) -> Result<(f32, f32)> {
        let gather = |values: &[f32]| -> Vec<f32> { indices.iter().map(|&i| values[i]).collect() };
        let device = self.device.clone();

        let obs = rows_tensor::<B>(&batch.obs.gather(indices), self.config.obs_dim, &device)?;
        let returns = vector::<B>(&gather(&targets.returns), &device);
        let old_values = vector::<B>(&gather(&targets.old_values), &device);
        let advantages = vector::<B>(&gather(&targets.advantages), &device);

        let values = self.model.critic.forward(obs.clone());
        let critic = critic_loss(values, old_values, returns, self.config.value_clip);
        let critic_value = scalar(critic.clone());
        let mut total = critic.mul_scalar(self.config.value_loss_coef);

        let mut actor_value = 0.0;
        if !critic_only {
            if let Some(actor) = self.actor_loss(batch, indices, obs, advantages)? {
                actor_value = scalar(actor.clone());
                total = total + actor;
            }
        }

        self.apply_gradients(total, lr)?;
        Ok((actor_value, critic_value))
    }

    /// Sum of the per-head surrogate terms, each with its entropy bonus.
    fn actor_loss(
        &self,
        batch: &ResolvedBatch<'_>,
        indices: &[usize],
        obs: Tensor<B, 2>,
        advantages: Tensor<B, 1>,
    ) -> Result<Option<Tensor<B, 1>>> {
        let space = self.space();
        let device = &self.device;
        let coef = self.config.entropy_coef;
        let out = self.model.policy_forward(obs, &self.policy);
        let mut terms: Vec<Tensor<B, 1>> = Vec::new();

        if let (Some(actions), Some(old_log_probs)) = (&batch.discrete_actions, &batch.discrete_log_probs) {
            let heads = space.num_discrete_heads();
            let columns = head_indices(&actions.gather(indices), space.discrete_cardinalities())?;
            let old_flat = old_log_probs.gather(indices);
            let mask = match &batch.action_mask {
                Some(mask) => Some(rows_tensor::<B>(&mask.gather(indices), mask.width, device)?),
                None => None,
            };

            let logits = mask_heads(out.discrete_logits, mask.as_ref(), space);
            for (h, (head, column)) in logits.into_iter().zip(columns).enumerate() {
                let old: Vec<f32> = old_flat.iter().skip(h).step_by(heads).copied().collect();
                let log_probs = categorical_log_prob(head.clone(), index_column(&column, device));
                let entropy = categorical_entropy(head).mean();
                let surrogate = self.surrogate(log_probs, vector(&old, device), advantages.clone());
                terms.push(surrogate - entropy.mul_scalar(coef));
            }
        }

        if let (Some(actions), Some(old_log_probs), Some((mean, log_std))) = (
            &batch.continuous_actions,
            &batch.continuous_log_probs,
            out.continuous,
        ) {
            let actions = rows_tensor::<B>(&actions.gather(indices), actions.width, device)?;
            let log_probs = self.policy.log_prob(actions, mean, log_std.clone());
            let entropy = self.policy.entropy(log_std, log_probs.clone());
            let old = vector(&old_log_probs.gather(indices), device);
            let surrogate = self.surrogate(log_probs, old, advantages);
            terms.push(surrogate - entropy.mul_scalar(coef));
        }

        Ok(terms.into_iter().reduce(|acc, term| acc + term))
    }

    fn surrogate(&self, log_probs: Tensor<B, 1>, old_log_probs: Tensor<B, 1>, advantages: Tensor<B, 1>) -> Tensor<B, 1> {
        if self.config.ppo_clip > 0.0 {
            ppo_clip_loss(log_probs, old_log_probs, advantages, self.config.ppo_clip)
        } else {
            vanilla_pg_loss(log_probs, advantages)
        }
    }

    /// Backprop, norm check / clip, Adam step.
    fn apply_gradients(&mut self, loss: Tensor<B, 1>, lr: f64) -> Result<f64> {
        let mut grads = GradientsParams::from_grads(loss.backward(), &self.model);
        let max_norm = self.config.clip_grad.then_some(self.config.max_grad_norm);
        let norm = clip_grad_norm::<B, _>(&self.model, &mut grads, max_norm)?;
        self.model = self.optimizer.step(lr, self.model.clone(), grads);
        Ok(norm)
    }
}

impl<B: AutodiffBackend> Agent<B> for PgAgent<B> {
    fn select_action(&mut self, obs: &[f32], mask: Option<&[f32]>, step: bool) -> Result<ActionSelection> {
        let obs_t = single_row::<B::InnerBackend>(obs, self.config.obs_dim, &self.device)?;
        let mask_t = self.mask_tensor(mask)?;
        let out = self.model.valid().policy_forward(obs_t, &self.policy);

        let mut discrete = Vec::new();
        let mut discrete_log_probs = Vec::new();
        let logits = mask_heads(out.discrete_logits, mask_t.as_ref(), self.space());
        for (head, &n) in logits.into_iter().zip(self.space().discrete_cardinalities()) {
            let log_p = to_vec(log_softmax(head, 1));
            ensure_finite(&log_p, "discrete logits", obs)?;
            let probs: Vec<f32> = log_p.iter().map(|l| l.exp()).collect();
            let action = sample_categorical(&probs, n)[0];
            discrete.push(action);
            discrete_log_probs.push(log_p[action]);
        }

        let (continuous, continuous_log_prob) = match out.continuous {
            Some((mean, log_std)) => {
                ensure_finite(&to_vec(mean.clone()), "continuous mean", obs)?;
                let action = self.policy.sample(mean.clone(), log_std.clone());
                let log_prob = scalar(self.policy.log_prob(action.clone(), mean, log_std));
                (to_vec(action), log_prob)
            }
            None => (Vec::new(), 0.0),
        };

        if step {
            self.steps += 1;
        }
        Ok(ActionSelection {
            discrete,
            continuous,
            discrete_log_probs,
            continuous_log_prob,
        })
    }

    fn evaluate_action_deterministic(&self, obs: &[f32], mask: Option<&[f32]>) -> Result<(Vec<usize>, Vec<f32>)> {
        let obs_t = single_row::<B::InnerBackend>(obs, self.config.obs_dim, &self.device)?;
        let mask_t = self.mask_tensor(mask)?;
        let out = self.model.valid().policy_forward(obs_t, &self.policy);

        let mut discrete = Vec::new();
        let logits = mask_heads(out.discrete_logits, mask_t.as_ref(), self.space());
        for (head, &n) in logits.into_iter().zip(self.space().discrete_cardinalities()) {
            let values = to_vec(head);
            ensure_finite(&values, "discrete logits", obs)?;
            discrete.push(argmax_rows(&values, n)[0]);
        }

        let continuous = match out.continuous {
            Some((mean, _)) => {
                let action = to_vec(self.policy.mode(mean));
                ensure_finite(&action, "continuous mean", obs)?;
                action
            }
            None => Vec::new(),
        };
        Ok((discrete, continuous))
    }

    fn imitation_update(
        &mut self,
        obs: &[f32],
        expert_discrete: Option<&[f32]>,
        expert_continuous: Option<&[f32]>,
    ) -> Result<(f32, f32)> {
        if self.config.eval_mode {
            return Ok((0.0, 0.0));
        }
        let device = self.device.clone();
        let obs_t = rows_tensor::<B>(obs, self.config.obs_dim, &device)?;
        let [rows, _] = obs_t.dims();
        let out = self.model.policy_forward(obs_t, &self.policy);

        let mut discrete_loss = None;
        if let Some(expert) = expert_discrete {
            let cardinalities = self.space().discrete_cardinalities();
            if cardinalities.is_empty() {
                return Err(HybridRlError::shape("expert discrete actions given for an agent without discrete heads"));
            }
            let columns = head_indices(expert, cardinalities)?;
            if columns[0].len() != rows {
                return Err(HybridRlError::shape(format!(
                    "{} expert discrete rows for {} observations",
                    columns[0].len(),
                    rows
                )));
            }
            discrete_loss = out
                .discrete_logits
                .into_iter()
                .zip(columns)
                .map(|(logits, column)| discrete_cross_entropy(logits, index_column(&column, &device)))
                .reduce(|acc, loss| acc + loss);
        }

        let mut continuous_loss = None;
        if let Some(expert) = expert_continuous {
            let Some((mean, log_std)) = out.continuous else {
                return Err(HybridRlError::shape(
                    "expert continuous actions given for an agent without continuous actions",
                ));
            };
            let expert = rows_tensor::<B>(expert, self.space().continuous_dim(), &device)?;
            if expert.dims()[0] != rows {
                return Err(HybridRlError::shape(format!(
                    "{} expert continuous rows for {} observations",
                    expert.dims()[0],
                    rows
                )));
            }
            continuous_loss = Some(if self.config.naive_imitation {
                naive_imitation_loss(&self.policy, mean, log_std, expert)
            } else {
                continuous_mle_loss(&self.policy, mean, log_std, expert)
            });
        }

        let discrete_value = discrete_loss.clone().map(scalar).unwrap_or(0.0);
        let continuous_value = continuous_loss.clone().map(scalar).unwrap_or(0.0);
        let total = match (discrete_loss, continuous_loss) {
            (Some(d), Some(c)) => d + c,
            (Some(d), None) => d,
            (None, Some(c)) => c,
            (None, None) => return Ok((0.0, 0.0)),
        };

        let lr = self.current_lr();
        self.apply_gradients(total, lr)?;
        log::debug!(
            "{}: imitation discrete_loss={:.4} continuous_loss={:.4}",
            self.config.name,
            discrete_value,
            continuous_value
        );
        Ok((discrete_value, continuous_value))
    }

    /// `V(s)` from the critic; the critic is a state-value function, so
    /// `actions` are ignored.
    fn value_estimate(&self, obs: &[f32], _actions: Option<(&[f32], &[f32])>) -> Result<Vec<f32>> {
        let obs_t = rows_tensor::<B::InnerBackend>(obs, self.config.obs_dim, &self.device)?;
        let values = to_vec(self.model.valid().critic.forward(obs_t));
        ensure_finite(&values, "critic values", obs)?;
        Ok(values)
    }

    fn expected_value(&self, obs: &[f32], _mask: Option<&[f32]>) -> Result<f32> {
        let obs_t = single_row::<B::InnerBackend>(obs, self.config.obs_dim, &self.device)?;
        let value = scalar(self.model.valid().critic.forward(obs_t));
        ensure_finite(&[value], "critic value", obs)?;
        Ok(value)
    }

    fn update_from_batch(&mut self, batch: &TrajectoryBatch, agent_index: usize) -> Result<(f32, f32)> {
        self.reinforcement_learn(batch, agent_index, false)
    }

    fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if self.config.eval_mode {
            log::warn!("{}: eval mode agent, not saving to {}", self.config.name, path.display());
            return Ok(());
        }
        let checkpoint = Checkpointer::create(path)?;
        checkpoint.write_attr("config", &self.config)?;
        checkpoint.write_attr("steps", &self.steps)?;
        checkpoint.write_attr("g_mean", &self.estimator.g_mean)?;
        checkpoint.save_module::<B, _>("PI", &self.model.actor)?;
        checkpoint.save_module::<B, _>("V", &self.model.critic)?;
        if let Some(log_std) = &self.model.log_std {
            checkpoint.save_module::<B, _>("actor_logstd", log_std)?;
        }
        log::info!("{}: saved to {}", self.config.name, path.display());
        Ok(())
    }

    fn load(path: impl AsRef<Path>, device: &B::Device) -> Result<Self> {
        let checkpoint = Checkpointer::open(path.as_ref())?;
        let config: PgConfig = checkpoint.read_attr("config")?;
        let mut agent = Self::new(config, device)?;
        agent.steps = checkpoint.read_attr("steps")?;
        agent.estimator.g_mean = checkpoint.read_attr("g_mean")?;

        let PgModel { actor, critic, log_std } = agent.model.clone();
        agent.model.actor = checkpoint.load_module::<B, _>("PI", actor, device)?;
        agent.model.critic = checkpoint.load_module::<B, _>("V", critic, device)?;
        if let Some(log_std) = log_std {
            agent.model.log_std = Some(checkpoint.load_module::<B, _>("actor_logstd", log_std, device)?);
        }
        log::info!("{}: loaded from {}", agent.config.name, path.as_ref().display());
        Ok(agent)
    }
}
