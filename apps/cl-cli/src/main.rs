mod error;
mod scenario;

use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use cl_controls::ClosedLoopSystem;
use cl_dynamics::DynamicalSystem;
use cl_results::{DEFAULT_ARCHIVE_NAME, Signal, Trajectory, TrajectorySummary};
use cl_sim::{SimOptions, SimResult, Simulator, simulate};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::CliResult;
use crate::scenario::InputConfig;

#[derive(Parser)]
#[command(name = "cl-cli")]
#[command(about = "clsim CLI - closed-loop dynamical system simulation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a scenario file without running it
    Validate {
        /// Path to the scenario YAML file
        scenario_path: PathBuf,
    },
    /// Simulate a scenario and save the trajectory archive
    Run {
        /// Path to the scenario YAML file
        scenario_path: PathBuf,
        /// Output archive path
        #[arg(short, long, default_value = DEFAULT_ARCHIVE_NAME)]
        output: PathBuf,
    },
    /// Summarize a saved trajectory
    Show {
        /// Path to the trajectory archive
        archive_path: PathBuf,
        /// Print the state and input nearest to this time
        #[arg(long)]
        at: Option<f64>,
    },
    /// Export a saved trajectory as CSV
    Export {
        /// Path to the trajectory archive
        archive_path: PathBuf,
        /// Export only one signal (x, u, y, dx or r)
        #[arg(short, long)]
        signal: Option<Signal>,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { scenario_path } => cmd_validate(&scenario_path),
        Commands::Run {
            scenario_path,
            output,
        } => cmd_run(&scenario_path, &output),
        Commands::Show { archive_path, at } => cmd_show(&archive_path, at),
        Commands::Export {
            archive_path,
            signal,
            output,
        } => cmd_export(&archive_path, signal, output.as_deref()),
    }
}

fn cmd_validate(scenario_path: &Path) -> CliResult<()> {
    println!("Validating scenario: {}", scenario_path.display());
    let scenario = scenario::load(scenario_path)?;
    let plant = scenario.plant()?;
    println!("✓ Scenario is valid");
    println!(
        "  Plant: n={}, m={}, p={}",
        plant.n(),
        plant.m(),
        plant.p()
    );
    if scenario.controller.is_some() {
        println!("  Closed loop: linear feedback");
    }
    Ok(())
}

fn cmd_run(scenario_path: &Path, output: &Path) -> CliResult<()> {
    let scenario = scenario::load(scenario_path)?;
    let plant = scenario.plant()?;
    let options = scenario.sim_options()?;
    println!(
        "Running {} simulation of '{}': tf = {:.3} s, {} samples",
        options.method,
        plant.info().name,
        options.tf,
        options.n
    );

    let started = Instant::now();
    let traj = match scenario.controller()? {
        Some(controller) => {
            let closed = ClosedLoopSystem::new(plant, controller)?;
            match scenario.input.clone() {
                Some(reference) => closed.compute_trajectory_with(reference, options)?,
                None => closed.compute_trajectory(options)?,
            }
        }
        None => run_system(&plant, scenario.input.clone(), options)?,
    };
    let elapsed = started.elapsed().as_secs_f64();
    info!(elapsed_s = elapsed, "simulation complete");

    traj.save(output)?;
    println!("✓ Simulation completed in {:.3}s", elapsed);
    println!("  Saved: {}", output.display());
    print_summary(&TrajectorySummary::from_trajectory(&traj));
    Ok(())
}

/// Drive the system with the scenario input, or its own `t2u` when none.
fn run_system<S: DynamicalSystem>(
    system: &S,
    input: Option<InputConfig>,
    options: SimOptions,
) -> SimResult<Trajectory> {
    match input {
        Some(input) => Simulator::new(system, input, options)?.compute(),
        None => simulate(system, options),
    }
}

fn cmd_show(archive_path: &Path, at: Option<f64>) -> CliResult<()> {
    println!("Loading trajectory: {}", archive_path.display());
    let traj = Trajectory::load(archive_path)?;

    println!("\nTrajectory Summary:");
    println!(
        "  Signals: {} states, {} inputs, {} outputs",
        traj.n_states(),
        traj.n_inputs(),
        traj.n_outputs()
    );
    if traj.r().is_some() {
        println!("  Reference: {} channels", traj.r().map_or(0, |r| r.ncols()));
    }
    print_summary(&TrajectorySummary::from_trajectory(&traj));

    if let Some(t) = at {
        let x = traj.t2x(t)?;
        let u = traj.t2u(t)?;
        println!("\nAt t = {}:", t);
        println!("  x = {}", format_values(x.iter()));
        println!("  u = {}", format_values(u.iter()));
    }
    Ok(())
}

fn cmd_export(archive_path: &Path, signal: Option<Signal>, output: Option<&Path>) -> CliResult<()> {
    let traj = Trajectory::load(archive_path)?;

    if let Some(path) = output {
        let mut file = io::BufWriter::new(std::fs::File::create(path)?);
        write_export(&mut file, &traj, signal)?;
        file.flush()?;
        println!(
            "✓ Exported {} samples to {}",
            traj.time_steps(),
            path.display()
        );
    } else {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        write_export(&mut lock, &traj, signal)?;
    }
    Ok(())
}

fn write_export<W: Write>(writer: &mut W, traj: &Trajectory, signal: Option<Signal>) -> io::Result<()> {
    match signal {
        Some(signal) => cl_results::write_signal_csv(writer, traj, signal),
        None => cl_results::write_csv(writer, traj),
    }
}

fn print_summary(summary: &TrajectorySummary) {
    println!("  Time points: {}", summary.samples);
    println!("  Final time:  {:.3} s", summary.time_final);
    println!("  Final state: {}", format_values(summary.final_state.iter()));
    println!("  State min:   {}", format_values(summary.state_min.iter()));
    println!("  State max:   {}", format_values(summary.state_max.iter()));
    if let Some(j) = summary.final_cost {
        println!("  Final cost:  {:.6e}", j);
    }
}

fn format_values<'a>(values: impl Iterator<Item = &'a f64>) -> String {
    let parts: Vec<String> = values.map(|v| format!("{:.6}", v)).collect();
    format!("[{}]", parts.join(", "))
}
