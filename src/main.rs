use anyhow::Context;
use clap::{Parser, Subcommand};
use iznet::circuits::{self, Circuit};
use iznet::network::json;
use iznet::{run_batch, CategoryLearning, LearningParameters, Simulation, TimeSeries};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "iznet", version, about = "Izhikevich spiking network simulator")]
struct Cli {
    /// more log output (debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// write the result as JSON to this file
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// simulate a network described by a JSON file
    Run { config: PathBuf },
    /// simulate one of the built-in circuits
    Circuit {
        #[arg(value_enum)]
        name: Circuit,
        /// seed of the initial membrane jitter
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// write a built-in circuit as a JSON network file
    Export {
        #[arg(value_enum)]
        name: Circuit,
        path: PathBuf,
    },
    /// run the category-learning task
    Learn {
        /// JSON file with learning parameters; missing fields take defaults
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        trials: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// simulate the basal-ganglia circuit at several dopamine levels in parallel
    Dopamine {
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true, default_values_t = vec![-1.0, 0.0, 1.0])]
        levels: Vec<f64>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn write_output<T: Serialize>(path: Option<&Path>, value: &T) -> anyhow::Result<()> {
    if let Some(path) = path {
        let content = serde_json::to_string(value)?;
        fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "result written");
    }
    Ok(())
}

/// log per-cell spike counts of a finished run
fn summarize(simulation: &Simulation, series: &TimeSeries) {
    if !series.is_finite() {
        warn!("series diverged; the configuration is not usable");
    }
    for (cell, label) in simulation.network.labels().iter().enumerate() {
        info!(
            cell = label.as_str(),
            spikes = series.spike_count(cell),
            first_spike_ms = series.first_spike(cell).map(|s| s as f64 * series.dt),
            "cell summary"
        );
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let output = cli.output.as_deref();

    match cli.command {
        Command::Run { config } => {
            let simulation = json::load_from_file(&config)
                .with_context(|| format!("loading {}", config.display()))?;
            let series = simulation.run()?;
            summarize(&simulation, &series);
            write_output(output, &series)?;
        }
        Command::Circuit { name, seed } => {
            let simulation = name.build()?.with_jitter(circuits::CIRCUIT_JITTER_MV, seed);
            info!(circuit = %name, steps = simulation.n_steps(), "simulating");
            let series = simulation.run()?;
            summarize(&simulation, &series);
            write_output(output, &series)?;
        }
        Command::Export { name, path } => {
            json::save_to_file(&name.build()?, &path)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(circuit = %name, path = %path.display(), "network file written");
        }
        Command::Learn {
            config,
            trials,
            seed,
        } => {
            let mut params = match config {
                Some(path) => {
                    let content = fs::read_to_string(&path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    serde_json::from_str::<LearningParameters>(&content)
                        .with_context(|| format!("parsing {}", path.display()))?
                }
                None => LearningParameters::default(),
            };
            if let Some(trials) = trials {
                params.n_trials = trials;
            }
            if let Some(seed) = seed {
                params.seed = seed;
            }
            let n = params.n_trials;
            let result = CategoryLearning::new(params)?.run()?;
            info!(
                first_half = result.accuracy(0..n / 2),
                second_half = result.accuracy(n / 2..n),
                "accuracy"
            );
            write_output(output, &result)?;
        }
        Command::Dopamine { levels } => {
            let simulations = levels
                .iter()
                .map(|da| circuits::dopamine_modulated(*da))
                .collect::<iznet::Result<Vec<_>>>()?;
            let results = run_batch(&simulations);
            let mut series = Vec::with_capacity(results.len());
            for (da, result) in levels.iter().zip(results) {
                let run = result?;
                info!(
                    dopamine = da,
                    d1_spikes = run.spike_count(circuits::bg::D1),
                    d2_spikes = run.spike_count(circuits::bg::D2),
                    pm_spikes = run.spike_count(circuits::bg::PM),
                    "dopamine level"
                );
                series.push(run);
            }
            write_output(output, &series)?;
        }
    }
    Ok(())
}
