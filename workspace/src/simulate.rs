use std::{ fs::File, path::{ Path, PathBuf } };
use anyhow::Context;
use clap::Parser;
use ndarray as nd;
use ndarray_npy::NpzWriter;
use tracing::{ debug, error, info, warn };
use wavepacket::{ classify, Diagnosis, Scheme, SimulationState, Snapshot };

mod common;

#[derive(Parser, Debug)]
#[command(name = "simulate")]
#[command(about = "Evolve a Gaussian wave packet and save snapshots to an .npz archive")]
struct Cli {
    /// TOML configuration file; built-in defaults are used if omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the time step.
    #[arg(long)]
    dt: Option<f64>,

    /// Override the number of steps.
    #[arg(long)]
    steps: Option<usize>,

    /// Override the scheme (explicit, crank-nicolson, split-step).
    #[arg(long)]
    scheme: Option<Scheme>,

    /// Record a snapshot every this many steps.
    #[arg(long, default_value_t = 10)]
    every: usize,

    /// Output archive.
    #[arg(short, long, default_value = "output/wavepacket.npz")]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    common::init_tracing();
    let cli = Cli::parse();

    let mut config = common::load_config(cli.config.as_deref())?;
    if let Some(dt) = cli.dt { config.evolution.dt = dt; }
    if let Some(steps) = cli.steps { config.evolution.steps = steps; }
    if let Some(scheme) = cli.scheme { config.evolution.scheme = scheme; }
    let steps = config.evolution.steps;
    let every = cli.every.max(1);

    let mut state
        = config.build()
        .map_err(|err| {
            error!(diagnosis = %Diagnosis::of_error(&err), "{err}");
            err
        })
        .context("setting up the simulation")?;
    info!(
        n = state.grid().len(),
        dx = state.grid().dx(),
        dt = state.dt(),
        scheme = %state.scheme(),
        steps,
        "starting run"
    );

    let mut frames: Vec<Snapshot> = vec![state.snapshot()];
    let mut unstable_steps: usize = 0;
    let mut failure = None;
    let mut run = state.run(steps);
    while let Some(outcome) = run.next() {
        match outcome {
            Ok(report) => {
                debug!(
                    step = report.step,
                    time = report.time,
                    growth = report.growth,
                    "step"
                );
                if report.unstable {
                    unstable_steps += 1;
                    warn!(
                        step = report.step,
                        growth = report.growth,
                        "{}", classify(&outcome)
                    );
                }
                if report.step % every == 0 {
                    frames.push(run.state().snapshot());
                }
            },
            Err(err) => {
                error!(step = err.step(), diagnosis = %classify(&outcome), "{err}");
                failure = Some(err);
            },
        }
    }
    if frames.last().is_some_and(|f| f.step != state.steps()) {
        frames.push(state.snapshot());
    }

    write_npz(&cli.output, &state, &frames)
        .with_context(|| format!("writing {}", cli.output.display()))?;
    info!(
        steps = state.steps(),
        time = state.time(),
        unstable_steps,
        frames = frames.len(),
        output = %cli.output.display(),
        "done"
    );

    match failure {
        Some(err) => Err(err).context("simulation failed"),
        None => Ok(()),
    }
}

fn stack_rows<F>(frames: &[Snapshot], get: F) -> anyhow::Result<nd::Array2<f64>>
where F: Fn(&Snapshot) -> &nd::Array1<f64>
{
    let rows: Vec<nd::ArrayView1<f64>>
        = frames.iter().map(|f| get(f).view()).collect();
    Ok(nd::stack(nd::Axis(0), &rows)?)
}

fn write_npz(path: &Path, state: &SimulationState, frames: &[Snapshot])
    -> anyhow::Result<()>
{
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let t: nd::Array1<f64> = frames.iter().map(|f| f.time).collect();
    let norm: nd::Array1<f64> = frames.iter().map(|f| f.norm_sqr).collect();
    let step: nd::Array1<u64> = frames.iter().map(|f| f.step as u64).collect();

    let mut npz = NpzWriter::new(File::create(path)?);
    npz.add_array("x", &state.grid().x())?;
    npz.add_array("v", &state.potential().values())?;
    npz.add_array("t", &t)?;
    npz.add_array("step", &step)?;
    npz.add_array("norm", &norm)?;
    npz.add_array("re", &stack_rows(frames, |f| &f.re)?)?;
    npz.add_array("im", &stack_rows(frames, |f| &f.im)?)?;
    npz.add_array("abs", &stack_rows(frames, |f| &f.abs)?)?;
    npz.finish()?;
    Ok(())
}
