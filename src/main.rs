//! leaf-flight: runs falling-leaf scenarios, stores the trajectory database
//! and plots the descent curves.

mod config;
mod plot;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use polars::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use leaf_calc::metrics::batch_compute_metrics;
use leaf_calc::persistence::{save_json, save_segment, write_csv};
use leaf_calc::TrajectoryDatabase;

use crate::config::ScenarioConfig;

#[derive(Parser, Debug)]
#[command(name = "leaf-flight")]
#[command(about = "Falling-leaf trajectory simulator")]
#[command(version)]
struct Args {
    /// Scenario YAML file; the built-in reference scenario when omitted
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Output JSON trajectory database
    #[arg(short, long, default_value = "precomputed_trajectory_database.json")]
    output: PathBuf,

    /// Output PNG plot
    #[arg(short, long, default_value = "precomputed_trajectories.png")]
    plot: PathBuf,

    /// Skip plotting
    #[arg(long)]
    no_plot: bool,

    /// Also write one CSV per run into this directory
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// Also write one `x y theta` segment file per run into this directory
    #[arg(long)]
    segment_dir: Option<PathBuf>,

    /// Override the time step (s)
    #[arg(long)]
    dt: Option<f64>,

    /// Override the number of recorded steps
    #[arg(long)]
    steps: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    info!(
        runs = config.runs.len(),
        dt = config.integrator.dt,
        steps = config.integrator.steps,
        "scenario loaded"
    );

    // 并行计算所有轨迹
    let simulation = config.simulation()?;
    let trajectories = simulation.run_batch(&config.initial_states());
    let db: TrajectoryDatabase = config.labels().into_iter().zip(trajectories).collect();

    for (label, trajectory) in db.iter() {
        if let Some(step) = trajectory.first_non_finite() {
            warn!(run = label, step, "trajectory diverged; non-finite values stored as null");
        }
    }

    let summary = metrics_frame(&db, &config)?;
    println!("{summary}");

    save_json(&db, &args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    if let Some(dir) = &args.csv_dir {
        write_per_run(&db, dir, "csv", |t, path| write_csv(t, config.integrator.dt, path))?;
    }
    if let Some(dir) = &args.segment_dir {
        write_per_run(&db, dir, "txt", |t, path| save_segment(t, path))?;
    }

    if !args.no_plot {
        plot::plot_trajectories(&plot::projections(&db), &args.plot, (1000, 700))?;
        info!(path = %args.plot.display(), "plot written");
    }

    Ok(())
}

/// Scenario from file or defaults, with command line overrides applied.
fn load_config(args: &Args) -> Result<ScenarioConfig> {
    let mut config = match &args.scenario {
        Some(path) => ScenarioConfig::load(path)?,
        None => ScenarioConfig::default(),
    };
    if let Some(dt) = args.dt {
        config.integrator.dt = dt;
    }
    if let Some(steps) = args.steps {
        config.integrator.steps = steps;
    }
    config.validate()?;
    Ok(config)
}

/// One row of summary statistics per run.
fn metrics_frame(db: &TrajectoryDatabase, config: &ScenarioConfig) -> Result<DataFrame> {
    let metrics = batch_compute_metrics(db, config.integrator.dt, &config.body, &config.constants);

    let labels: Vec<&str> = metrics.iter().map(|(label, _)| label.as_str()).collect();
    let mut columns = vec![Series::new("run", labels)];
    for key in [
        "flight_time",
        "horizontal_drift",
        "vertical_drop",
        "mean_speed",
        "max_speed",
        "total_rotation",
        "max_spin_rate",
    ] {
        let values: Vec<f64> = metrics
            .iter()
            .map(|(_, m)| m.get_summary().get(key).copied().unwrap_or(f64::NAN))
            .collect();
        columns.push(Series::new(key, values));
    }
    Ok(DataFrame::new(columns)?)
}

/// `Trajectory 1` -> `trajectory_1`
fn file_stem(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

fn write_per_run<F>(db: &TrajectoryDatabase, dir: &Path, extension: &str, write: F) -> Result<()>
where
    F: Fn(&leaf_calc::Trajectory, PathBuf) -> leaf_calc::Result<()>,
{
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    for (label, trajectory) in db.iter() {
        let path = dir.join(format!("{}.{extension}", file_stem(label)));
        write(trajectory, path.clone())
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    info!(dir = %dir.display(), runs = db.len(), extension, "per-run files written");
    Ok(())
}
