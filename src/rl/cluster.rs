//! Distributed execution context
//!
//! The context owns the worker pool and runs submitted experiments. This
//! crate only sizes it and hands experiments over; scheduling, rollouts and
//! fault tolerance live behind the trait.

use std::path::{Path, PathBuf};

use super::env_registry::EnvRegistry;
use super::experiment::Experiments;
use super::persistence::{ExperimentManifest, save_manifest};
use crate::error::{FlowError, Result};

/// State of a trial as reported by the context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialStatus {
    /// Handed off; the trial runs outside this process
    Submitted,
    /// Ran to its stop condition
    Terminated,
}

/// Outcome of one experiment
#[derive(Debug, Clone, PartialEq)]
pub struct TrialSummary {
    pub name: String,
    pub status: TrialStatus,
    /// Directory holding the trial's results
    pub logdir: PathBuf,
}

pub trait ExecutionContext {
    /// Size the context; may only be called once
    fn init(&mut self, num_cpus: usize) -> Result<()>;

    /// Parallelism requested at init, `None` before init
    fn num_cpus(&self) -> Option<usize>;

    /// Run experiments, blocking until the context returns
    fn run_experiments(
        &mut self,
        experiments: &Experiments,
        envs: &EnvRegistry,
    ) -> Result<Vec<TrialSummary>>;
}

/// Context that hands experiments to an external cluster as manifests
///
/// Every experiment is checked the way a worker would use it: the
/// environment is rebuilt from the registry using the embedded env context
/// before anything is written.
#[derive(Debug, Clone)]
pub struct ManifestContext {
    results_dir: PathBuf,
    num_cpus: Option<usize>,
}

impl ManifestContext {
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
            num_cpus: None,
        }
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }
}

impl ExecutionContext for ManifestContext {
    fn init(&mut self, num_cpus: usize) -> Result<()> {
        if let Some(existing) = self.num_cpus {
            return Err(FlowError::ContextAlreadyInitialized(existing));
        }
        if num_cpus == 0 {
            return Err(FlowError::InvalidConfig(
                "num_cpus must be at least 1".to_string(),
            ));
        }

        log::info!("Execution context initialized with {num_cpus} cpus");
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
        let num_cpus = self.num_cpus.ok_or(FlowError::ContextNotInitialized)?;

        let mut trials = Vec::with_capacity(experiments.len());
        for (name, spec) in experiments {
            spec.validate()?;

            let env = envs.make(&spec.env, &spec.config.env_config)?;
            log::debug!(
                "{name}: resolved {} with {} vehicles ({} rl)",
                env.name,
                env.network.vehicles.num_vehicles(),
                env.num_rl_vehicles()
            );

            let logdir = self.results_dir.join(name);
            let manifest = ExperimentManifest::new(name.clone(), num_cpus, spec.clone());
            save_manifest(&manifest, &logdir)?;
            log::info!("{name}: submitted to {}", logdir.display());

            trials.push(TrialSummary {
                name: name.clone(),
                status: TrialStatus::Submitted,
                logdir,
            });
        }

        Ok(trials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::config::{EnvConfig, TrainerConfig};
    use crate::rl::env_registry::make_create_env;
    use crate::rl::experiment::{ExperimentSpec, StopCondition};
    use crate::rl::persistence::{EXPERIMENT_FILE, PARAMS_FILE, load_manifest};
    use crate::scenario::{FlowParams, build_roster};
    use tempfile::TempDir;

    fn setup() -> (Experiments, EnvRegistry) {
        let params = FlowParams::figure_eight(1500, build_roster(7).unwrap());
        let (create_env, env_name) = make_create_env(&params, 0);
        let mut envs = EnvRegistry::new();
        envs.register(env_name.clone(), create_env).unwrap();

        let mut config = TrainerConfig::ppo_default();
        config.env_config = EnvConfig {
            flow_params: Some(params.to_json().unwrap()),
            run: Some("PPO".to_string()),
        };

        let mut experiments = Experiments::new();
        experiments.insert(
            params.exp_tag.clone(),
            ExperimentSpec {
                run: "PPO".to_string(),
                env: env_name,
                config,
                checkpoint_freq: 1,
                checkpoint_at_end: true,
                max_failures: 999,
                stop: StopCondition {
                    training_iteration: 1000,
                },
            },
        );
        (experiments, envs)
    }

    #[test]
    fn test_run_before_init_fails() {
        let temp_dir = TempDir::new().unwrap();
        let (experiments, envs) = setup();
        let mut context = ManifestContext::new(temp_dir.path());

        let err = context.run_experiments(&experiments, &envs).unwrap_err();
        assert!(matches!(err, FlowError::ContextNotInitialized));
    }

    #[test]
    fn test_double_init_fails() {
        let mut context = ManifestContext::new("unused");
        context.init(3).unwrap();
        assert!(matches!(
            context.init(3),
            Err(FlowError::ContextAlreadyInitialized(3))
        ));
        assert_eq!(context.num_cpus(), Some(3));
    }

    #[test]
    fn test_zero_cpus_rejected() {
        let mut context = ManifestContext::new("unused");
        assert!(context.init(0).is_err());
        assert_eq!(context.num_cpus(), None);
    }

    #[test]
    fn test_submission_writes_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let (experiments, envs) = setup();
        let mut context = ManifestContext::new(temp_dir.path());
        context.init(3).unwrap();

        let trials = context.run_experiments(&experiments, &envs).unwrap();
        assert_eq!(trials.len(), 1);
        assert_eq!(trials[0].name, "singleagent_figure_eight");
        assert_eq!(trials[0].status, TrialStatus::Submitted);

        let logdir = temp_dir.path().join("singleagent_figure_eight");
        assert_eq!(trials[0].logdir, logdir);
        assert!(logdir.join(EXPERIMENT_FILE).exists());
        assert!(logdir.join(PARAMS_FILE).exists());

        let manifest = load_manifest(&logdir).unwrap();
        assert_eq!(manifest.num_cpus, 3);
        assert_eq!(&manifest.spec, &experiments["singleagent_figure_eight"]);
    }

    #[test]
    fn test_unregistered_env_fails_before_writing() {
        let temp_dir = TempDir::new().unwrap();
        let (experiments, _) = setup();
        let mut context = ManifestContext::new(temp_dir.path());
        context.init(3).unwrap();

        let err = context
            .run_experiments(&experiments, &EnvRegistry::new())
            .unwrap_err();
        assert!(matches!(err, FlowError::UnknownEnv(_)));
        assert!(!temp_dir.path().join("singleagent_figure_eight").exists());
    }
}
