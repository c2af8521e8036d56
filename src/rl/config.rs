//! Trainer configuration, PPO defaults and the experiment's override set

use serde::{Deserialize, Serialize};

use crate::error::{FlowError, Result};

/// Policy network architecture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Hidden layer widths of the fully connected network
    pub fcnet_hiddens: Vec<usize>,
    pub fcnet_activation: String,
    /// Share layers between the policy and value heads
    pub vf_share_layers: bool,
    pub free_log_std: bool,
    pub use_lstm: bool,
    pub max_seq_len: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            fcnet_hiddens: vec![256, 256],
            fcnet_activation: "tanh".to_string(),
            vf_share_layers: false,
            free_log_std: false,
            use_lstm: false,
            max_seq_len: 20,
        }
    }
}

/// Context handed to every environment factory call
///
/// Workers are separate processes, so the scenario travels as text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Serialized scenario bundle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_params: Option<String>,

    /// Name of the training algorithm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,
}

/// Configuration for a distributed policy-gradient trainer
///
/// Field names follow the trainer's own configuration keys so that the
/// serialized form can be handed to it unchanged.
///
/// # Example
///
/// ```rust
/// use figure_eight_rl::rl::TrainerConfig;
///
/// let config = TrainerConfig {
///     lr: 1e-3,
///     ..TrainerConfig::ppo_default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Rollout worker processes (the driver is not counted)
    pub num_workers: usize,

    pub num_gpus: f64,

    pub num_envs_per_worker: usize,

    /// Steps each worker collects per sample call
    pub rollout_fragment_length: usize,

    /// `truncate_episodes` or `complete_episodes`
    pub batch_mode: String,

    /// Environment steps collected per training iteration
    ///
    /// Default: 4000
    pub train_batch_size: usize,

    /// Samples per SGD minibatch
    ///
    /// Default: 128
    pub sgd_minibatch_size: usize,

    pub shuffle_sequences: bool,

    /// SGD epochs over each train batch
    ///
    /// Default: 30
    pub num_sgd_iter: usize,

    /// Learning rate
    ///
    /// Default: 5e-5
    pub lr: f64,

    /// Discount factor for future rewards
    ///
    /// Default: 0.99
    pub gamma: f64,

    /// Use Generalized Advantage Estimation
    pub use_gae: bool,

    /// GAE lambda parameter
    ///
    /// Default: 1.0
    pub lambda: f64,

    /// Initial coefficient of the KL penalty
    pub kl_coeff: f64,

    /// Target KL divergence between successive policies
    ///
    /// Default: 0.01
    pub kl_target: f64,

    /// PPO surrogate clipping parameter
    pub clip_param: f64,

    pub vf_clip_param: f64,

    pub vf_loss_coeff: f64,

    pub entropy_coeff: f64,

    /// Global gradient norm clip, `None` disables clipping
    pub grad_clip: Option<f64>,

    /// Clip actions to the action space bounds before stepping
    pub clip_actions: bool,

    /// Steps after which an episode is cut, `None` defers to the environment
    pub horizon: Option<u32>,

    pub observation_filter: String,

    pub model: ModelConfig,

    pub env_config: EnvConfig,
}

impl TrainerConfig {
    /// Default configuration of the clipped-surrogate PPO trainer
    pub fn ppo_default() -> Self {
        Self {
            num_workers: 2,
            num_gpus: 0.0,
            num_envs_per_worker: 1,
            rollout_fragment_length: 200,
            batch_mode: "truncate_episodes".to_string(),
            train_batch_size: 4000,
            sgd_minibatch_size: 128,
            shuffle_sequences: true,
            num_sgd_iter: 30,
            lr: 5e-5,
            gamma: 0.99,
            use_gae: true,
            lambda: 1.0,
            kl_coeff: 0.2,
            kl_target: 0.01,
            clip_param: 0.3,
            vf_clip_param: 10.0,
            vf_loss_coeff: 1.0,
            entropy_coeff: 0.0,
            grad_clip: None,
            clip_actions: true,
            horizon: None,
            observation_filter: "NoFilter".to_string(),
            model: ModelConfig::default(),
            env_config: EnvConfig::default(),
        }
    }

    /// Check that hyperparameters are in valid ranges
    pub fn validate(&self) -> Result<()> {
        if self.lr <= 0.0 {
            return Err(invalid(format!("lr must be positive, got {}", self.lr)));
        }

        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(invalid(format!("gamma must be in [0, 1], got {}", self.gamma)));
        }

        if !(0.0..=1.0).contains(&self.lambda) {
            return Err(invalid(format!("lambda must be in [0, 1], got {}", self.lambda)));
        }

        if self.kl_target <= 0.0 {
            return Err(invalid(format!(
                "kl_target must be positive, got {}",
                self.kl_target
            )));
        }

        if self.num_sgd_iter == 0 {
            return Err(invalid("num_sgd_iter must be at least 1".to_string()));
        }

        if self.train_batch_size == 0 {
            return Err(invalid("train_batch_size must be at least 1".to_string()));
        }

        if self.sgd_minibatch_size == 0 {
            return Err(invalid("sgd_minibatch_size must be at least 1".to_string()));
        }

        if self.sgd_minibatch_size > self.train_batch_size {
            return Err(invalid(format!(
                "sgd_minibatch_size ({}) cannot exceed train_batch_size ({})",
                self.sgd_minibatch_size, self.train_batch_size
            )));
        }

        if self.model.fcnet_hiddens.is_empty() || self.model.fcnet_hiddens.contains(&0) {
            return Err(invalid(format!(
                "fcnet_hiddens must be non-empty with positive widths, got {:?}",
                self.model.fcnet_hiddens
            )));
        }

        Ok(())
    }
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self::ppo_default()
    }
}

fn invalid(message: String) -> FlowError {
    FlowError::InvalidConfig(message)
}

/// Hyperparameters the experiment pins over the algorithm defaults
#[derive(Debug, Clone, PartialEq)]
pub struct TrainerOverrides {
    pub num_workers: usize,
    pub train_batch_size: usize,
    pub gamma: f64,
    pub fcnet_hiddens: Vec<usize>,
    pub use_gae: bool,
    pub lambda: f64,
    pub kl_target: f64,
    pub num_sgd_iter: usize,
    pub lr: f64,
    pub sgd_minibatch_size: usize,
    pub clip_actions: bool,
    pub horizon: u32,
}

impl TrainerOverrides {
    /// Overrides for the figure-eight run
    ///
    /// The train batch holds `rollouts` full episodes of `horizon` steps.
    pub fn figure_eight(horizon: u32, rollouts: usize, num_workers: usize) -> Result<Self> {
        let train_batch_size = (horizon as usize).checked_mul(rollouts).ok_or_else(|| {
            invalid(format!(
                "train batch of {rollouts} rollouts x {horizon} steps overflows"
            ))
        })?;

        Ok(Self {
            num_workers,
            train_batch_size,
            gamma: 0.999,
            fcnet_hiddens: vec![20, 15],
            use_gae: true,
            lambda: 0.97,
            kl_target: 0.02,
            num_sgd_iter: 20,
            lr: 1e-4,
            sgd_minibatch_size: 128,
            // Clipping is left to the environment's own action bounds
            clip_actions: false,
            horizon,
        })
    }

    /// Write every override into `config`; model keys not overridden survive
    pub fn apply(&self, config: &mut TrainerConfig) {
        config.num_workers = self.num_workers;
        config.train_batch_size = self.train_batch_size;
        config.gamma = self.gamma;
        config.model.fcnet_hiddens = self.fcnet_hiddens.clone();
        config.use_gae = self.use_gae;
        config.lambda = self.lambda;
        config.kl_target = self.kl_target;
        config.num_sgd_iter = self.num_sgd_iter;
        config.lr = self.lr;
        config.sgd_minibatch_size = self.sgd_minibatch_size;
        config.clip_actions = self.clip_actions;
        config.horizon = Some(self.horizon);
    }
}
