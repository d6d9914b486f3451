use clap::{Parser, Subcommand};
use der_model::StateVar;
use der_project::{Scenario, build_model, initial_state, load_json, load_yaml, time_grid};
use der_sim::{SimulationSession, Simulation, Trajectory};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Project(#[from] der_project::ProjectError),

    #[error("{0}")]
    Sim(#[from] der_sim::SimError),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "der-cli")]
#[command(about = "PV-DER dynamics - single-phase inverter simulation tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a scenario file
    Validate {
        /// Path to the scenario YAML or JSON file
        scenario_path: PathBuf,
    },
    /// Run a scenario
    Run {
        /// Path to the scenario YAML or JSON file
        scenario_path: PathBuf,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Report per-interval solver diagnostics
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Validate { scenario_path } => cmd_validate(&scenario_path),
        Commands::Run {
            scenario_path,
            output,
            verbose,
        } => cmd_run(&scenario_path, output.as_deref(), verbose),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn load_scenario(path: &Path) -> CliResult<Scenario> {
    let scenario = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => load_json(path)?,
        _ => load_yaml(path)?,
    };
    Ok(scenario)
}

fn cmd_validate(scenario_path: &Path) -> CliResult<()> {
    println!("Validating scenario: {}", scenario_path.display());
    let scenario = load_scenario(scenario_path)?;
    build_model(&scenario, "DER_1")?;
    println!("✓ Scenario '{}' is valid", scenario.name);
    Ok(())
}

fn cmd_run(scenario_path: &Path, output: Option<&Path>, verbose: bool) -> CliResult<()> {
    let scenario = load_scenario(scenario_path)?;
    let mut session = SimulationSession::new();

    let mut model = build_model(&scenario, session.next_der_name())?;
    let y0 = initial_state(&scenario, &mut model)?;
    let grid = time_grid(&scenario.simulation);

    let mut options = scenario.simulation.solver.clone();
    options.verbose |= verbose;
    let mut sim = Simulation::new(&mut session, model, options);

    info!(scenario = %scenario.name, points = grid.len(), "starting run");
    let start = Instant::now();
    let traj = sim.run(&mut session, &y0, &grid)?;
    let elapsed = start.elapsed();

    if let Some(diag) = &traj.diagnostics {
        let stiff = diag.method_codes.iter().filter(|&&c| c == 2).count();
        eprintln!(
            "intervals: {} ({} stiff), evaluations: {}, jacobians: {}, rejected steps: {}",
            diag.method_codes.len(),
            stiff,
            diag.nfev,
            diag.njev,
            diag.rejected
        );
    }
    eprintln!(
        "✓ {} completed in {:.2} ms",
        sim.name(),
        elapsed.as_secs_f64() * 1000.0
    );

    let csv = trajectory_csv(&mut sim, &traj);
    if let Some(path) = output {
        std::fs::write(path, csv).map_err(|source| CliError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        eprintln!(
            "✓ Exported {} data points to {}",
            traj.states.len(),
            path.display()
        );
    } else {
        print!("{}", csv);
    }
    Ok(())
}

/// Time, per-unit states, then PCC power (W, var) and RMS voltage (V).
fn trajectory_csv(sim: &mut Simulation, traj: &Trajectory) -> String {
    let mut csv = String::from("time_s");
    for var in StateVar::ALL {
        csv.push(',');
        csv.push_str(var.name());
    }
    csv.push_str(",P_w,Q_var,Vrms_v\n");

    let bases = sim.model().params().bases;
    for (t, state) in traj.iter() {
        let d = sim.model_mut().observe(state, t);
        csv.push_str(&format!("{}", t));
        for v in state.to_vector() {
            csv.push_str(&format!(",{}", v));
        }
        csv.push_str(&format!(
            ",{},{},{}\n",
            d.s_pcc.re * bases.sbase,
            d.s_pcc.im * bases.sbase,
            d.va_rms * bases.vbase
        ));
    }
    csv
}
