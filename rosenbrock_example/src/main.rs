use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rosenbrock_example::prelude::*;
use swarm_optimizer::prelude::*;
use tracing::info;

/// Runs the particle swarm optimizer on the Rosenbrock function and saves the
/// best parameters and fitness into the output directory.
#[derive(Parser, Debug)]
#[command(name = "rb_w_pso")]
struct Cli {
    /// Directory of the output
    #[arg(long = "output_dir", short = 'o')]
    output_dir: PathBuf,

    /// Optimizer settings
    #[arg(long = "pso_cfg", default_value = "config/pso_cfg.json")]
    pso_cfg: PathBuf,

    /// Parameter space to search
    #[arg(long = "param_cfg", default_value = "config/rosenbrock_cfg.json")]
    param_cfg: PathBuf,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run(&cli).context("rb_w_pso failed")
}

fn run(cli: &Cli) -> Result<(), PsoRunError> {
    let settings = load_settings(&cli.pso_cfg)?;
    let space = load_parameter_space(&cli.param_cfg)?;
    if let Some(configured) = settings
        .output_dir
        .as_ref()
        .filter(|configured| **configured != cli.output_dir)
    {
        info!(
            configured = %configured.display(),
            using = %cli.output_dir.display(),
            "output directory from the command line overrides the settings file"
        );
    }

    let result = optimize(Rosenbrock::default(), space, settings)?;

    println!("Found optimal parameters: {}", result.best_parameters);
    println!(
        "Found optimal value with optimal parameters: {}",
        result.best_fitness
    );
    println!("--------------------------------------------------------");
    println!("Saving results:");

    let paths = save_result(&result, &cli.output_dir)?;
    println!(
        "Results saved to:\n\t{} \n and\n\t{}",
        paths.parameters.display(),
        paths.fitness.display()
    );
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
