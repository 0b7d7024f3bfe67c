use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use cell_aging_sim::config::Config;
use cell_aging_sim::controller::ChargeController;
use cell_aging_sim::load::SimulationPlan;
use cell_aging_sim::runner::{
    acceleration_factors, run_cycle, run_static_test, run_sweep, write_csv_file, CycleSettings,
    StaticTestSettings,
};
use cell_aging_sim::simulation::{initial_state_for_soh, CellModel};
use cell_aging_sim::telemetry::{init_tracing, LogFormat};

#[derive(Parser, Debug)]
#[command(name = "cell-aging-sim")]
#[command(about = "Lithium-ion cell ageing under device load")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to config/default.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit JSON log lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Charge/discharge cycle following the load plan timeline
    Run {
        /// Load plan JSON (overrides simulation.plan_path)
        #[arg(long)]
        plan: Option<PathBuf>,
        /// Time-series CSV (overrides simulation.output_path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Hold one profile and report the ageing rate
    Static {
        /// Profile name from the load plan
        #[arg(short, long)]
        profile: String,
        /// Starting state of health
        #[arg(long)]
        soh: Option<f64>,
        /// Ambient temperature (°C)
        #[arg(long)]
        ambient_c: Option<f64>,
        #[arg(long)]
        plan: Option<PathBuf>,
    },
    /// SOH × ambient × profile ageing matrix
    Sweep {
        /// Sweep CSV (overrides sweep.output_path)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Profile the acceleration factors are relative to
        #[arg(long)]
        baseline: Option<String>,
        #[arg(long)]
        plan: Option<PathBuf>,
    },
    /// Print the effective configuration
    Config,
}

fn load_plan(cfg: &Config, plan: Option<PathBuf>) -> Result<SimulationPlan> {
    let path = plan.unwrap_or_else(|| cfg.simulation.plan_path.clone());
    SimulationPlan::from_file(&path)
        .with_context(|| format!("failed to load plan {}", path.display()))
}

fn run(cfg: &Config, plan: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let plan = load_plan(cfg, plan)?;
    let sim = &cfg.simulation;
    let (y0, ext0) = initial_state_for_soh(&cfg.cell, sim.initial_soh, sim.initial_soc)?;
    let model = CellModel::new(cfg.cell.clone());
    let mut charger = ChargeController::new(cfg.charging.clone());

    let outcome = run_cycle(
        &model,
        &plan,
        &mut charger,
        y0,
        ext0,
        &CycleSettings::from(sim),
    )?;

    let output = output.unwrap_or_else(|| sim.output_path.clone());
    write_csv_file(&output, &outcome.records)?;
    info!(
        rows = outcome.records.len(),
        path = %output.display(),
        stop = %outcome.stop,
        "Time series saved"
    );
    Ok(())
}

fn static_test(
    cfg: &Config,
    profile: &str,
    soh: Option<f64>,
    ambient_c: Option<f64>,
    plan: Option<PathBuf>,
) -> Result<()> {
    let plan = load_plan(cfg, plan)?;
    let params = match ambient_c {
        Some(ambient_c) => cfg.cell.with_ambient_c(ambient_c),
        None => cfg.cell.clone(),
    };
    let (y0, ext0) = initial_state_for_soh(&params, soh.unwrap_or(cfg.simulation.initial_soh), 1.0)?;
    let model = CellModel::new(params);

    let result = run_static_test(
        &model,
        &plan,
        profile,
        y0,
        ext0,
        &StaticTestSettings::from(&cfg.simulation),
    )?;

    info!(
        profile = %result.profile,
        soh_start = result.soh_start,
        soh_end = result.soh_end,
        loss_rate_per_hour = result.loss_rate_per_hour,
        avg_temperature_c = result.avg_temperature_c,
        stop = %result.stop,
        "Static test complete"
    );
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn sweep(
    cfg: &Config,
    output: Option<PathBuf>,
    baseline: Option<String>,
    plan: Option<PathBuf>,
) -> Result<()> {
    let plan = Arc::new(load_plan(cfg, plan)?);
    let settings = StaticTestSettings {
        duration_s: cfg.sweep.duration_s,
        ..StaticTestSettings::from(&cfg.simulation)
    };

    let records = run_sweep(Arc::new(cfg.cell.clone()), plan, &cfg.sweep, settings).await?;

    let output = output.unwrap_or_else(|| cfg.sweep.output_path.clone());
    write_csv_file(&output, &records)?;
    info!(rows = records.len(), path = %output.display(), "Sweep table saved");

    if let Some(baseline) = baseline.or_else(|| cfg.sweep.baseline_profile.clone()) {
        for factor in acceleration_factors(&records, &baseline) {
            info!(
                scenario = %factor.scenario,
                soh_start = factor.soh_start,
                ambient_c = factor.ambient_c,
                factor = factor.factor,
                baseline = %baseline,
                "Acceleration factor"
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    });

    let cfg = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Run { plan, output } => run(&cfg, plan, output),
        Command::Static {
            profile,
            soh,
            ambient_c,
            plan,
        } => static_test(&cfg, &profile, soh, ambient_c, plan),
        Command::Sweep {
            output,
            baseline,
            plan,
        } => sweep(&cfg, output, baseline, plan).await,
        Command::Config => {
            print!("{}", cfg.to_toml()?);
            Ok(())
        }
    }
}
