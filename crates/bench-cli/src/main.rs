use anyhow::Result;
use bench_analysis::{aggregate, render_stats, render_table, stats_to_json, DEFAULT_BENCHMARK_ROOT};
use bench_runner::{
    default_registry, estimate_minutes, load_registry, run_benchmarks, run_race, run_tune,
    BenchmarkRegistry, OptionSet, ParamRange, RaceRequest, TuneRequest, DEFAULT_SOLVER_PATH,
};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "bench",
    version = "0.3.0",
    about = "Benchmark sweeps, races and statistics for the itc2007-cct solver"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the named benchmarks (all of them when no name is given)
    Run {
        names: Vec<String>,
        #[arg(long, default_value = DEFAULT_SOLVER_PATH)]
        solver: PathBuf,
        #[arg(long)]
        registry: Option<PathBuf>,
    },
    /// Run the solver once with no time limit to find the best solution
    Race {
        dataset: PathBuf,
        output: PathBuf,
        log: Option<PathBuf>,
        #[arg(long, default_value = DEFAULT_SOLVER_PATH)]
        solver: PathBuf,
    },
    /// Print best/mean/std of every result file under the benchmark folder
    Stats {
        filter: Option<String>,
        #[arg(long, default_value = DEFAULT_BENCHMARK_ROOT)]
        root: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Show the benchmarks that `run` would execute
    List {
        names: Vec<String>,
        #[arg(long)]
        registry: Option<PathBuf>,
    },
    /// Random search over solver parameters
    Tune {
        dataset: PathBuf,
        #[arg(long, default_value_t = 120)]
        seconds: u64,
        #[arg(short = 'o', long = "option")]
        options: Vec<String>,
        #[arg(long = "range")]
        ranges: Vec<ParamRange>,
        #[arg(long, default_value_t = 10)]
        trials: u32,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value = DEFAULT_SOLVER_PATH)]
        solver: PathBuf,
    },
}

fn main() {
    init_tracing();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            std::process::exit(code);
        }
    };
    if let Err(err) = run_command(cli.command) {
        eprintln!("ERROR: {:#}", err);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_command(command: Commands) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match command {
        Commands::Run {
            names,
            solver,
            registry,
        } => {
            let registry = resolve_registry(registry.as_deref())?;
            let report = run_benchmarks(&registry, &names, &solver, &mut out)?;
            writeln!(
                out,
                "executed: {}/{}  skipped: {}  failed_runs: {}/{}",
                report.executed.len(),
                report.selected,
                report.skipped.len(),
                report.failed_runs,
                report.attempted_runs
            )?;
            if !report.unmatched.is_empty() {
                writeln!(out, "unknown: {}", report.unmatched.join(", "))?;
            }
        }
        Commands::Race {
            dataset,
            output,
            log,
            solver,
        } => {
            let request = RaceRequest {
                dataset,
                solution: output,
                log,
            };
            let outcome = run_race(&request, &solver, &mut out)?;
            writeln!(out, "race: {}", outcome.describe())?;
        }
        Commands::Stats { filter, root, json } => {
            let groups = aggregate(&root, filter.as_deref())?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&stats_to_json(&groups))?)?;
            } else {
                write!(out, "{}", render_stats(&groups))?;
            }
        }
        Commands::List { names, registry } => {
            let registry = resolve_registry(registry.as_deref())?;
            let selection = registry.select(&names);
            let rows: Vec<[String; 6]> = selection
                .specs
                .iter()
                .map(|s| {
                    [
                        s.name.clone(),
                        s.dataset.display().to_string(),
                        s.output.display().to_string(),
                        s.seconds.to_string(),
                        s.runs.to_string(),
                        s.options.to_string(),
                    ]
                })
                .collect();
            write!(
                out,
                "{}",
                render_table(["NAME", "DATASET", "OUTPUT", "SECONDS", "RUNS", "OPTIONS"], &rows)
            )?;
            writeln!(
                out,
                "benchmarks: {}  estimated: {} minutes",
                selection.specs.len(),
                estimate_minutes(&selection.specs)
            )?;
        }
        Commands::Tune {
            dataset,
            seconds,
            options,
            ranges,
            trials,
            output,
            seed,
            solver,
        } => {
            let request = TuneRequest {
                dataset,
                seconds,
                base: OptionSet::new(options),
                ranges,
                trials,
                output,
                seed,
            };
            let tried = run_tune(&request, &solver, &mut out)?;
            writeln!(out, "trials: {}", tried.len())?;
        }
    }
    Ok(())
}

fn resolve_registry(path: Option<&Path>) -> Result<BenchmarkRegistry> {
    match path {
        Some(p) => load_registry(p),
        None => Ok(default_registry()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn race_requires_dataset_and_output() {
        assert!(Cli::try_parse_from(["bench", "race", "d.ctt"]).is_err());
        let cli = Cli::try_parse_from(["bench", "race", "d.ctt", "d.sol", "d.log"]).expect("parse");
        match cli.command {
            Commands::Race { log, solver, .. } => {
                assert_eq!(log, Some(PathBuf::from("d.log")));
                assert_eq!(solver, PathBuf::from(DEFAULT_SOLVER_PATH));
            }
            _ => panic!("expected race"),
        }
    }

    #[test]
    fn run_accepts_any_number_of_names() {
        let cli = Cli::try_parse_from(["bench", "run", "comp01-ls", "comp02-sals"]).expect("parse");
        match cli.command {
            Commands::Run { names, .. } => assert_eq!(names, vec!["comp01-ls", "comp02-sals"]),
            _ => panic!("expected run"),
        }
        let cli = Cli::try_parse_from(["bench", "run"]).expect("parse");
        match cli.command {
            Commands::Run { names, .. } => assert!(names.is_empty()),
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn tune_parses_options_and_ranges() {
        let cli = Cli::try_parse_from([
            "bench",
            "tune",
            "datasets/comp03.ctt",
            "-o",
            "solver.methods=sa",
            "--range",
            "sa.cooling_rate=0.95..0.9995",
            "--trials",
            "3",
        ])
        .expect("parse");
        match cli.command {
            Commands::Tune {
                options,
                ranges,
                trials,
                seconds,
                ..
            } => {
                assert_eq!(options, vec!["solver.methods=sa"]);
                assert_eq!(ranges[0].key, "sa.cooling_rate");
                assert_eq!(trials, 3);
                assert_eq!(seconds, 120);
            }
            _ => panic!("expected tune"),
        }
        assert!(Cli::try_parse_from(["bench", "tune", "d.ctt", "--range", "bad"]).is_err());
    }

    #[test]
    fn stats_on_missing_root_fails() {
        let err = run_command(Commands::Stats {
            filter: None,
            root: PathBuf::from("/nonexistent/bench/results"),
            json: false,
        })
        .expect_err("missing root");
        assert!(err.to_string().contains("benchmark folder not found"), "{}", err);
    }
}
