use std::{ fs::File, path::{ Path, PathBuf } };
use anyhow::{ ensure, Context };
use clap::Parser;
use ndarray as nd;
use ndarray_npy::NpzWriter;
use tracing::{ info, warn };
use wavepacket::{ classify, Diagnosis, Scheme, SimConfig };

mod common;

#[derive(Parser, Debug)]
#[command(name = "dt_scan")]
#[command(about = "Scan log-spaced time steps and report where a scheme becomes unstable")]
struct Cli {
    /// TOML configuration file; built-in defaults are used if omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Scheme to scan.
    #[arg(long, default_value_t = Scheme::Explicit)]
    scheme: Scheme,

    /// Smallest time step.
    #[arg(long, default_value_t = 1e-5)]
    dt_min: f64,

    /// Largest time step.
    #[arg(long, default_value_t = 1.0)]
    dt_max: f64,

    /// Number of time steps to try.
    #[arg(long, default_value_t = 11)]
    points: usize,

    /// Steps per trial; defaults to the configured number.
    #[arg(long)]
    steps: Option<usize>,

    /// Optional output archive.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Result of evolving at a single time step.
#[derive(Copy, Clone, Debug)]
struct Trial {
    dt: f64,
    steps: usize,
    first_unstable: Option<usize>,
    failed_at: Option<usize>,
    max_growth: f64,
    diagnosis: Diagnosis,
}

fn trial(config: &SimConfig, dt: f64, steps: usize) -> anyhow::Result<Trial> {
    let mut config = config.clone();
    config.evolution.dt = dt;
    let mut state
        = config.build()
        .with_context(|| format!("setting up the simulation at dt = {dt:e}"))?;
    let mut first_unstable = None;
    let mut failed_at = None;
    let mut max_growth: f64 = 1.0;
    let mut diagnoses: Vec<Diagnosis> = Vec::with_capacity(steps);
    for outcome in state.run(steps) {
        let diagnosis = classify(&outcome);
        diagnoses.push(diagnosis);
        match outcome {
            Ok(report) => {
                max_growth = max_growth.max(report.growth);
                if report.unstable && first_unstable.is_none() {
                    first_unstable = Some(report.step);
                }
            },
            Err(err) => {
                warn!(dt, step = err.step(), %diagnosis, "{err}");
                failed_at = Some(err.step());
            },
        }
    }
    Ok(Trial {
        dt,
        steps: state.steps(),
        first_unstable,
        failed_at,
        max_growth,
        diagnosis: Diagnosis::worst(diagnoses),
    })
}

fn main() -> anyhow::Result<()> {
    common::init_tracing();
    let cli = Cli::parse();
    ensure!(
        cli.dt_min > 0.0 && cli.dt_min.is_finite(),
        "dt-min must be positive and finite; got {}", cli.dt_min
    );
    ensure!(
        cli.dt_max >= cli.dt_min && cli.dt_max.is_finite(),
        "dt-max must be finite and at least dt-min; got {}", cli.dt_max
    );
    ensure!(cli.points > 0, "need at least one point");

    let mut config = common::load_config(cli.config.as_deref())?;
    config.evolution.scheme = cli.scheme;
    let steps = cli.steps.unwrap_or(config.evolution.steps);
    config.validate().context("invalid configuration")?;

    let dts: nd::Array1<f64>
        = nd::Array1::logspace(10.0, cli.dt_min.log10(), cli.dt_max.log10(), cli.points);
    info!(scheme = %cli.scheme, points = dts.len(), steps, "scanning time steps");

    let trials: Vec<Trial>
        = dts.iter()
        .map(|&dt| trial(&config, dt, steps))
        .collect::<anyhow::Result<_>>()?;
    for t in trials.iter() {
        info!(
            dt = t.dt,
            steps = t.steps,
            first_unstable = ?t.first_unstable,
            failed_at = ?t.failed_at,
            max_growth = t.max_growth,
            diagnosis = t.diagnosis.label(),
            "trial"
        );
    }
    match trials.iter().find(|t| !t.diagnosis.is_valid()) {
        Some(t) => info!(dt = t.dt, "{}", t.diagnosis),
        None => info!("all time steps were stable"),
    }

    if let Some(output) = cli.output.as_deref() {
        write_npz(output, &trials)
            .with_context(|| format!("writing {}", output.display()))?;
        info!(output = %output.display(), "wrote scan results");
    }
    Ok(())
}

// steps without an event are stored as NaN
fn write_npz(path: &Path, trials: &[Trial]) -> anyhow::Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let as_f64 = |step: Option<usize>| step.map_or(f64::NAN, |k| k as f64);
    let dt: nd::Array1<f64> = trials.iter().map(|t| t.dt).collect();
    let max_growth: nd::Array1<f64> = trials.iter().map(|t| t.max_growth).collect();
    let first_unstable: nd::Array1<f64>
        = trials.iter().map(|t| as_f64(t.first_unstable)).collect();
    let failed_at: nd::Array1<f64>
        = trials.iter().map(|t| as_f64(t.failed_at)).collect();

    let mut npz = NpzWriter::new(File::create(path)?);
    npz.add_array("dt", &dt)?;
    npz.add_array("max_growth", &max_growth)?;
    npz.add_array("first_unstable", &first_unstable)?;
    npz.add_array("failed_at", &failed_at)?;
    npz.finish()?;
    Ok(())
}
