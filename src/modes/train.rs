//! Training mode for the figure-eight experiment
//!
//! Builds the roster and scenario bundle, prepares the trainer
//! configuration and hands one experiment to an execution context.
//!
//! # Example
//!
//! ```rust,no_run
//! use figure_eight_rl::modes::{TrainConfig, TrainMode};
//! use figure_eight_rl::rl::ManifestContext;
//!
//! let config = TrainConfig::default();
//! let mut context = ManifestContext::new(&config.results_dir);
//! let mut train_mode = TrainMode::new(config)?;
//! let trials = train_mode.run(&mut context)?;
//! # Ok::<(), figure_eight_rl::FlowError>(())
//! ```

use std::path::PathBuf;

use crate::error::{FlowError, Result};
use crate::rl::{
    AlgorithmRegistry, EnvConfig, EnvRegistry, ExecutionContext, ExperimentSpec, Experiments,
    PPO, StopCondition, TrainerConfig, TrainerOverrides, TrialSummary, make_create_env,
};
use crate::scenario::{FlowParams, build_roster};

/// Configuration for training mode
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    /// Human/RL vehicle pairs in the roster
    pub pairs: usize,

    /// Simulation steps per rollout
    pub horizon: u32,

    /// Rollouts per training iteration
    pub n_rollouts: usize,

    /// Parallel rollout workers
    pub n_cpus: usize,

    /// Training algorithm to resolve
    pub algorithm: String,

    /// Training iterations before the trial stops
    pub training_iterations: u32,

    /// Checkpoint every N iterations
    pub checkpoint_freq: u32,

    pub checkpoint_at_end: bool,

    /// Trial failures tolerated before the run is abandoned
    pub max_failures: u32,

    /// Directory experiment manifests are written under
    pub results_dir: PathBuf,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            pairs: 7,
            horizon: 1500,
            n_rollouts: 20,
            n_cpus: 2,
            algorithm: PPO.to_string(),
            training_iterations: 1000,
            checkpoint_freq: 1,
            checkpoint_at_end: true,
            max_failures: 999,
            results_dir: PathBuf::from("results"),
        }
    }
}

impl TrainConfig {
    /// Create a training configuration with the default run settings
    ///
    /// # Example
    ///
    /// ```rust
    /// use figure_eight_rl::modes::TrainConfig;
    ///
    /// let config = TrainConfig::new(7, 1500);
    /// assert_eq!(config.n_rollouts, 20);
    /// ```
    pub fn new(pairs: usize, horizon: u32) -> Self {
        Self {
            pairs,
            horizon,
            ..Default::default()
        }
    }

    /// Parallelism requested from the execution context: workers plus the driver
    pub fn num_cpus(&self) -> Result<usize> {
        self.n_cpus.checked_add(1).ok_or_else(|| {
            FlowError::InvalidConfig(format!(
                "{} workers leave no room for the driver",
                self.n_cpus
            ))
        })
    }
}

/// Prepare the trainer side of an experiment
///
/// Resolves the algorithm, applies the overrides to its defaults, embeds the
/// serialized scenario and registers an environment factory under a fresh
/// name.
///
/// # Returns
///
/// The algorithm name, the registered environment name and the trainer
/// configuration.
pub fn setup_exps(
    config: &TrainConfig,
    flow_params: &FlowParams,
    algorithms: &AlgorithmRegistry,
    envs: &mut EnvRegistry,
) -> Result<(String, String, TrainerConfig)> {
    let algorithm = algorithms.get(&config.algorithm)?;
    let alg_run = algorithm.name().to_string();

    let mut trainer_config = algorithm.default_config();
    TrainerOverrides::figure_eight(config.horizon, config.n_rollouts, config.n_cpus)?
        .apply(&mut trainer_config);
    trainer_config.validate()?;

    // Workers rebuild the scenario from this copy
    trainer_config.env_config = EnvConfig {
        flow_params: Some(flow_params.to_json()?),
        run: Some(alg_run.clone()),
    };

    let version = envs.next_version(flow_params.env_name);
    let (create_env, env_name) = make_create_env(flow_params, version);
    envs.register(env_name.clone(), create_env)?;

    Ok((alg_run, env_name, trainer_config))
}

/// Training mode
///
/// Owns the scenario and registries; the execution context is passed in.
#[derive(Debug)]
pub struct TrainMode {
    config: TrainConfig,
    flow_params: FlowParams,
    algorithms: AlgorithmRegistry,
    envs: EnvRegistry,
}

impl TrainMode {
    /// Build the roster and scenario bundle for `config`
    pub fn new(config: TrainConfig) -> Result<Self> {
        let vehicles = build_roster(config.pairs)?;
        let flow_params = FlowParams::figure_eight(config.horizon, vehicles);

        Ok(Self {
            config,
            flow_params,
            algorithms: AlgorithmRegistry::builtin(),
            envs: EnvRegistry::new(),
        })
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn flow_params(&self) -> &FlowParams {
        &self.flow_params
    }

    pub fn envs(&self) -> &EnvRegistry {
        &self.envs
    }

    /// Set up the trainer and wrap it into the single named experiment
    pub fn experiments(&mut self) -> Result<Experiments> {
        let (alg_run, env_name, trainer_config) = setup_exps(
            &self.config,
            &self.flow_params,
            &self.algorithms,
            &mut self.envs,
        )?;

        let mut experiments = Experiments::new();
        experiments.insert(
            self.flow_params.exp_tag.clone(),
            ExperimentSpec {
                run: alg_run,
                env: env_name,
                config: trainer_config,
                checkpoint_freq: self.config.checkpoint_freq,
                checkpoint_at_end: self.config.checkpoint_at_end,
                max_failures: self.config.max_failures,
                stop: StopCondition {
                    training_iteration: self.config.training_iterations,
                },
            },
        );
        Ok(experiments)
    }

    /// Set up the experiment, size the context and submit
    ///
    /// Blocks until the context returns.
    pub fn run(&mut self, context: &mut dyn ExecutionContext) -> Result<Vec<TrialSummary>> {
        self.log_header();

        let num_cpus = self.config.num_cpus()?;
        let experiments = self.experiments()?;
        context.init(num_cpus)?;
        let trials = context.run_experiments(&experiments, &self.envs)?;

        for trial in &trials {
            log::info!(
                "Trial {}: {:?} ({})",
                trial.name,
                trial.status,
                trial.logdir.display()
            );
        }
        Ok(trials)
    }

    fn log_header(&self) {
        let vehicles = &self.flow_params.veh;
        log::info!("{}", "=".repeat(70));
        log::info!("Training - {}", self.flow_params.exp_tag);
        log::info!("{}", "=".repeat(70));
        log::info!(
            "Roster: {} classes, {} vehicles ({} rl)",
            vehicles.len(),
            vehicles.num_vehicles(),
            vehicles.num_rl_vehicles()
        );
        log::info!("Horizon: {} steps", self.config.horizon);
        log::info!("Algorithm: {}", self.config.algorithm);
        log::info!(
            "Workers: {} ({} rollouts per iteration)",
            self.config.n_cpus,
            self.config.n_rollouts
        );
        log::info!(
            "Stop after {} iterations, checkpoint every {}",
            self.config.training_iterations,
            self.config.checkpoint_freq
        );
        log::info!("Failure budget: {}", self.config.max_failures);
        log::info!("Results: {}", self.config.results_dir.display());
        log::info!("{}", "=".repeat(70));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::{ManifestContext, TrialStatus, load_params};
    use serde_json::json;
    use tempfile::TempDir;

    /// Context that records what it was asked to do
    #[derive(Default)]
    struct RecordingContext {
        num_cpus: Option<usize>,
        submitted: Option<Experiments>,
    }

    impl ExecutionContext for RecordingContext {
        fn init(&mut self, num_cpus: usize) -> Result<()> {
            self.num_cpus = Some(num_cpus);
            Ok(())
        }

        fn num_cpus(&self) -> Option<usize> {
            self.num_cpus
        }

        fn run_experiments(
            &mut self,
            experiments: &Experiments,
            envs: &EnvRegistry,
        ) -> Result<Vec<TrialSummary>> {
            for spec in experiments.values() {
                envs.make(&spec.env, &spec.config.env_config)?;
            }
            self.submitted = Some(experiments.clone());
            Ok(experiments
                .keys()
                .map(|name| TrialSummary {
                    name: name.clone(),
                    status: TrialStatus::Terminated,
                    logdir: PathBuf::from(name),
                })
                .collect())
        }
    }

    #[test]
    fn test_train_config_defaults() {
        let config = TrainConfig::default();
        assert_eq!(config.pairs, 7);
        assert_eq!(config.horizon, 1500);
        assert_eq!(config.n_rollouts, 20);
        assert_eq!(config.n_cpus, 2);
        assert_eq!(config.algorithm, "PPO");
        assert_eq!(config.num_cpus().unwrap(), 3);
        assert_eq!(config.results_dir, PathBuf::from("results"));
    }

    #[test]
    fn test_setup_exps() {
        let config = TrainConfig::default();
        let flow_params = FlowParams::figure_eight(1500, build_roster(7).unwrap());
        let mut envs = EnvRegistry::new();

        let (alg_run, env_name, trainer_config) =
            setup_exps(&config, &flow_params, &AlgorithmRegistry::builtin(), &mut envs).unwrap();

        assert_eq!(alg_run, "PPO");
        assert_eq!(env_name, "CustomEnv-v0");
        assert!(envs.contains(&env_name));
        assert_eq!(trainer_config.train_batch_size, 30000);
        assert_eq!(trainer_config.env_config.run.as_deref(), Some("PPO"));

        let embedded = trainer_config.env_config.flow_params.as_deref().unwrap();
        assert_eq!(FlowParams::from_json(embedded).unwrap(), flow_params);
    }

    #[test]
    fn test_setup_exps_generates_unique_env_names() {
        let config = TrainConfig::default();
        let flow_params = FlowParams::figure_eight(1500, build_roster(7).unwrap());
        let algorithms = AlgorithmRegistry::builtin();
        let mut envs = EnvRegistry::new();

        let (_, first, _) = setup_exps(&config, &flow_params, &algorithms, &mut envs).unwrap();
        let (_, second, _) = setup_exps(&config, &flow_params, &algorithms, &mut envs).unwrap();
        assert_eq!(first, "CustomEnv-v0");
        assert_eq!(second, "CustomEnv-v1");
    }

    #[test]
    fn test_unknown_algorithm_is_fatal() {
        let config = TrainConfig {
            algorithm: "SAC".to_string(),
            ..Default::default()
        };
        let mut train_mode = TrainMode::new(config).unwrap();
        let mut context = RecordingContext::default();

        let err = train_mode.run(&mut context).unwrap_err();
        assert!(matches!(err, FlowError::UnknownAlgorithm(_)));
        assert!(context.num_cpus.is_none());
        assert!(train_mode.envs().names().next().is_none());
    }

    #[test]
    fn test_context_sized_workers_plus_driver() {
        for n_cpus in [1, 2, 8] {
            let config = TrainConfig {
                n_cpus,
                ..Default::default()
            };
            let mut context = RecordingContext::default();
            TrainMode::new(config).unwrap().run(&mut context).unwrap();
            assert_eq!(context.num_cpus(), Some(n_cpus + 1));
        }
    }

    #[test]
    fn test_worker_count_overflow_rejected() {
        let config = TrainConfig {
            n_cpus: usize::MAX,
            ..Default::default()
        };
        assert!(matches!(config.num_cpus(), Err(FlowError::InvalidConfig(_))));

        let mut train_mode = TrainMode::new(config).unwrap();
        let mut context = RecordingContext::default();
        let err = train_mode.run(&mut context).unwrap_err();
        assert!(matches!(err, FlowError::InvalidConfig(_)));
        assert!(context.num_cpus.is_none());
        assert!(train_mode.envs().names().next().is_none());
    }

    #[test]
    fn test_train_batch_overflow_rejected() {
        let config = TrainConfig {
            horizon: u32::MAX,
            n_rollouts: usize::MAX,
            ..Default::default()
        };
        let flow_params = FlowParams::figure_eight(config.horizon, build_roster(1).unwrap());
        let mut envs = EnvRegistry::new();

        let err = setup_exps(&config, &flow_params, &AlgorithmRegistry::builtin(), &mut envs)
            .unwrap_err();
        assert!(matches!(err, FlowError::InvalidConfig(_)));
        assert!(envs.names().next().is_none());
    }

    #[test]
    fn test_end_to_end_figure_eight() {
        let mut train_mode = TrainMode::new(TrainConfig::default()).unwrap();
        let mut context = RecordingContext::default();

        let trials = train_mode.run(&mut context).unwrap();
        assert_eq!(trials.len(), 1);

        let roster = &train_mode.flow_params().veh;
        assert_eq!(roster.len(), 14);
        assert_eq!(roster.ids().filter(|id| id.starts_with("human")).count(), 7);
        assert_eq!(roster.ids().filter(|id| id.starts_with("rl")).count(), 7);

        let experiments = context.submitted.unwrap();
        assert_eq!(experiments.len(), 1);
        let spec = &experiments["singleagent_figure_eight"];
        assert_eq!(spec.run, "PPO");
        assert_eq!(spec.env, "CustomEnv-v0");
        assert_eq!(spec.config.train_batch_size, 1500 * 20);
        assert_eq!(spec.config.num_workers, 2);
        assert_eq!(spec.checkpoint_freq, 1);
        assert!(spec.checkpoint_at_end);
        assert_eq!(spec.max_failures, 999);
        assert_eq!(
            serde_json::to_value(spec.stop).unwrap(),
            json!({"training_iteration": 1000})
        );
    }

    #[test]
    fn test_run_with_manifest_context() {
        let temp_dir = TempDir::new().unwrap();
        let config = TrainConfig {
            results_dir: temp_dir.path().join("figure_eight"),
            ..Default::default()
        };
        let mut context = ManifestContext::new(&config.results_dir);
        let mut train_mode = TrainMode::new(config).unwrap();

        let trials = train_mode.run(&mut context).unwrap();
        assert_eq!(trials[0].status, TrialStatus::Submitted);
        assert_eq!(
            trials[0].logdir,
            train_mode.config().results_dir.join("singleagent_figure_eight")
        );

        let params = load_params(&trials[0].logdir).unwrap();
        assert_eq!(params.train_batch_size, 30000);
        assert_eq!(params.horizon, Some(1500));
        assert!(params.env_config.flow_params.is_some());
    }
}
