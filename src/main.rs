use anyhow::{Context, Result};
use clap::Parser;
use figure_eight_rl::modes::{TrainConfig, TrainMode};
use figure_eight_rl::rl::ManifestContext;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "figure_eight_rl")]
#[command(version, about = "Set up and submit the figure-eight traffic RL experiment")]
struct Cli {
    /// Human/RL vehicle pairs in the roster
    #[arg(long, default_value = "7")]
    pairs: usize,

    /// Simulation steps per rollout
    #[arg(long, default_value = "1500")]
    horizon: u32,

    /// Rollouts per training iteration
    #[arg(long, default_value = "20")]
    rollouts: usize,

    /// Parallel rollout workers
    #[arg(long, default_value = "2")]
    cpus: usize,

    /// Training iterations before stopping
    #[arg(long, default_value = "1000")]
    iterations: u32,

    /// Checkpoint every N iterations
    #[arg(long, default_value = "1")]
    checkpoint_freq: u32,

    /// Trial failures tolerated before giving up
    #[arg(long, default_value = "999")]
    max_failures: u32,

    /// Directory experiment manifests are written to
    #[arg(long, default_value = "results")]
    results_dir: PathBuf,

    /// Print the serialized scenario bundle and exit
    #[arg(long)]
    print_params: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = TrainConfig {
        pairs: cli.pairs,
        horizon: cli.horizon,
        n_rollouts: cli.rollouts,
        n_cpus: cli.cpus,
        training_iterations: cli.iterations,
        checkpoint_freq: cli.checkpoint_freq,
        max_failures: cli.max_failures,
        results_dir: cli.results_dir,
        ..Default::default()
    };

    let mut context = ManifestContext::new(&config.results_dir);
    let mut train_mode = TrainMode::new(config).context("Failed to build scenario")?;

    if cli.print_params {
        let json = train_mode
            .flow_params()
            .to_json()
            .context("Failed to serialize scenario")?;
        println!("{json}");
        return Ok(());
    }

    let trials = train_mode
        .run(&mut context)
        .with_context(|| format!("Failed to submit experiment to {:?}", context.results_dir()))?;

    println!("Submitted {} trial(s) to {:?}", trials.len(), context.results_dir());

    Ok(())
}
