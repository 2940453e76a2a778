//! Run the growth model from the command line
//!
//! Prints a summary for each analysis; `project` can also write the
//! yearly ledger as CSV.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use tier_projection::assumptions::load_assumptions;
use tier_projection::params::load_parameters;
use tier_projection::projection::{period_label, write_ledger_to_path};
use tier_projection::scenario::DEFAULT_SENSITIVITY_STEPS;
use tier_projection::trajectory::load_trajectories;
use tier_projection::{
    GoalSeekConfig, MonteCarloConfig, ParameterKey, Parameters, ProjectionEngine, Scenario,
    ScenarioRunner, SeededSource, Trajectories,
};

#[derive(Parser, Debug)]
#[command(name = "run_model")]
#[command(about = "Ten-year school network growth projection")]
struct Cli {
    /// Parameter preset (conservative, base, aggressive)
    #[arg(short, long, global = true, default_value = "base")]
    scenario: String,

    /// Parameters JSON; replaces the preset, absent keys take base values
    #[arg(short, long, global = true)]
    params: Option<PathBuf>,

    /// Trajectories CSV (period, virtual, micro, midSized, flagship)
    #[arg(short, long, global = true)]
    trajectories: Option<PathBuf>,

    /// Assumption book JSON
    #[arg(short, long, global = true)]
    assumptions: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one projection
    Project {
        /// Write the yearly ledger to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Sample perturbed parameters and report percentiles
    MonteCarlo {
        #[arg(short, long, default_value_t = 500)]
        iterations: usize,

        /// Seed for reproducible draws
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Sweep one parameter across a multiplier range
    Sensitivity {
        #[arg(long)]
        parameter: String,

        #[arg(long, default_value_t = 0.5)]
        lo: f64,

        #[arg(long, default_value_t = 1.5)]
        hi: f64,

        #[arg(long, default_value_t = DEFAULT_SENSITIVITY_STEPS)]
        steps: usize,
    },

    /// Find the parameter multiplier that hits a target metric
    GoalSeek {
        /// terminalValue, revenue, ebitda, students or peakFunding
        #[arg(long)]
        metric: String,

        #[arg(long)]
        target: f64,

        #[arg(long)]
        parameter: String,

        #[arg(long, default_value_t = 0.01)]
        tolerance: f64,
    },
}

fn load_runner(cli: &Cli) -> Result<ScenarioRunner> {
    let engine = match &cli.assumptions {
        Some(path) => {
            let book = load_assumptions(path)
                .with_context(|| format!("loading assumptions {}", path.display()))?;
            ProjectionEngine::new(book)?
        }
        None => ProjectionEngine::default(),
    };
    let trajectories = match &cli.trajectories {
        Some(path) => load_trajectories(path)
            .with_context(|| format!("loading trajectories {}", path.display()))?,
        None => Trajectories::default(),
    };
    Ok(ScenarioRunner::new(engine, trajectories))
}

fn load_params(cli: &Cli) -> Result<Parameters> {
    match &cli.params {
        Some(path) => {
            load_parameters(path).with_context(|| format!("loading parameters {}", path.display()))
        }
        None => Ok(cli.scenario.parse::<Scenario>()?.parameters()),
    }
}

fn millions(value: f64) -> String {
    format!("${:.1}M", value / 1_000_000.0)
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let runner = load_runner(&cli)?;
    let params = load_params(&cli)?;
    let start = Instant::now();

    match &cli.command {
        Command::Project { output } => {
            let result = runner.project(&params)?;

            println!("Year  | Students  | Revenue    | EBITDA     | Capex      | Cum. Cash");
            for year in &result.years {
                println!(
                    "{:5} | {:9} | {:>10} | {:>10} | {:>10} | {:>10}",
                    year.label,
                    year.total_students,
                    millions(year.total_revenue),
                    millions(year.total_ebitda),
                    millions(year.total_capex),
                    millions(year.cumulative_cash_flow),
                );
            }

            let s = &result.summary;
            println!();
            println!("Terminal value:   {}", millions(s.terminal_value));
            println!("Property value:   {}", millions(s.property_value));
            println!("EBITDA margin:    {:.1}%", s.ebitda_margin * 100.0);
            println!("Cumulative capex: {}", millions(s.cumulative_capex));
            println!("Peak funding:     {}", millions(s.peak_funding));
            match s.breakeven {
                Some(period) => println!("Breakeven:        {}", period_label(period)),
                None => println!("Breakeven:        not reached"),
            }

            if let Some(path) = output {
                write_ledger_to_path(path, &result)
                    .with_context(|| format!("writing ledger {}", path.display()))?;
                println!("Ledger written to {}", path.display());
            }
        }

        Command::MonteCarlo { iterations, seed } => {
            let mut source = match seed {
                Some(seed) => SeededSource::from_seed(*seed),
                None => SeededSource::from_entropy(),
            };
            info!("Monte Carlo seed {}", source.seed());

            let config = MonteCarloConfig::with_iterations(*iterations);
            let summary = runner.monte_carlo(&params, &config, &mut source, None)?;

            println!("Monte Carlo: {} iterations (seed {})", summary.iterations, source.seed());
            for (label, outcome) in [
                ("P10", &summary.p10),
                ("P25", &summary.p25),
                ("P50", &summary.p50),
                ("P75", &summary.p75),
                ("P90", &summary.p90),
            ] {
                println!(
                    "{label}: terminal value {}, revenue {}, students {}",
                    millions(outcome.terminal_value),
                    millions(outcome.revenue),
                    outcome.students
                );
            }
            println!("Mean terminal value: {}", millions(summary.mean.terminal_value));
        }

        Command::Sensitivity { parameter, lo, hi, steps } => {
            let key: ParameterKey = parameter.parse()?;
            let points = runner.sensitivity(&params, key, (*lo, *hi), *steps, None)?;

            println!("Multiplier | {:>18} | Terminal value | EBITDA     | Revenue", key.as_str());
            for p in &points {
                println!(
                    "{:10.3} | {:18.4} | {:>14} | {:>10} | {:>10}",
                    p.multiplier,
                    p.parameter_value,
                    millions(p.terminal_value),
                    millions(p.ebitda),
                    millions(p.revenue),
                );
            }
        }

        Command::GoalSeek { metric, target, parameter, tolerance } => {
            let config = GoalSeekConfig {
                tolerance: *tolerance,
                ..GoalSeekConfig::from_names(metric, *target, parameter)?
            };
            let result = runner.goal_seek(&params, &config)?;

            println!("Status:     {:?}", result.status);
            println!("Multiplier: {:.4}", result.multiplier);
            println!("{}: {:.4}", config.parameter, result.parameter_value);
            println!("{}: {:.2} (target {:.2})", config.metric, result.achieved, config.target);
            println!("Iterations: {}", result.iterations);
        }
    }

    info!("Finished in {:?}", start.elapsed());
    Ok(())
}
