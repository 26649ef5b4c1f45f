use crate::{
    check_solver, sweep_args, write_header, BenchmarkRegistry, BenchmarkSpec,
    HeaderInfo, ProcessSolver, SolverInvoker,
};
use anyhow::Result;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub selected: usize,
    pub executed: Vec<String>,
    pub skipped: Vec<String>,
    pub unmatched: Vec<String>,
    pub attempted_runs: usize,
    pub failed_runs: usize,
}

pub fn estimate_seconds(specs: &[&BenchmarkSpec]) -> u64 {
    specs
        .iter()
        .fold(0u64, |acc, s| acc.saturating_add(s.estimated_seconds()))
}

pub fn estimate_minutes(specs: &[&BenchmarkSpec]) -> u64 {
    estimate_seconds(specs) / 60
}

/// Checks that `solver_path` exists, then sweeps the selected specs with it.
pub fn run_benchmarks<W: Write>(
    registry: &BenchmarkRegistry,
    filter: &[String],
    solver_path: &Path,
    progress: &mut W,
) -> Result<SweepReport> {
    check_solver(solver_path)?;
    let mut solver = ProcessSolver::new(solver_path);
    run_sweep(registry, filter, &mut solver, progress)
}

/// Runs every selected spec `runs` times, one blocking solver call at a time.
/// A spec whose dataset or config is missing, or whose result file cannot be
/// started, is skipped; failed solver runs are logged and the sweep moves on.
pub fn run_sweep<W: Write>(
    registry: &BenchmarkRegistry,
    filter: &[String],
    solver: &mut dyn SolverInvoker,
    progress: &mut W,
) -> Result<SweepReport> {
    let selection = registry.select(filter);
    let specs = selection.specs;
    let mut report = SweepReport {
        selected: specs.len(),
        unmatched: selection.unmatched,
        ..SweepReport::default()
    };

    writeln!(progress, "=============== BENCHMARK ===============")?;
    writeln!(progress, "# Datasets:          {}", specs.len())?;
    writeln!(progress, "Estimated time:      {} minutes", estimate_minutes(&specs))?;
    writeln!(progress, "=========================================")?;

    for (idx, spec) in specs.iter().enumerate() {
        if !spec.dataset.exists() {
            let reason = format!("missing dataset at path '{}'", spec.dataset.display());
            skip_spec(spec, &reason, progress, &mut report)?;
            continue;
        }
        if let Some(config) = spec.config.as_deref().filter(|c| !c.is_file()) {
            let reason = format!("missing solver config at path '{}'", config.display());
            skip_spec(spec, &reason, progress, &mut report)?;
            continue;
        }
        if let Err(err) = start_result_file(spec) {
            skip_spec(spec, &format!("{:#}", err), progress, &mut report)?;
            continue;
        }
        writeln!(
            progress,
            "[{}/{}] {} {}",
            idx + 1,
            specs.len(),
            spec.dataset.display(),
            spec.options
        )?;
        run_spec(spec, solver, progress, &mut report)?;
        writeln!(progress, "--------------------------------------")?;
        report.executed.push(spec.name.clone());
    }
    info!(
        executed = report.executed.len(),
        skipped = report.skipped.len(),
        failed_runs = report.failed_runs,
        "sweep finished"
    );
    Ok(report)
}

fn skip_spec<W: Write>(
    spec: &BenchmarkSpec,
    reason: &str,
    progress: &mut W,
    report: &mut SweepReport,
) -> Result<()> {
    warn!(benchmark = %spec.name, "skipping benchmark, {}", reason);
    writeln!(progress, "WARN: skipping benchmark '{}', {}", spec.name, reason)?;
    report.skipped.push(spec.name.clone());
    Ok(())
}

/// Truncates the spec's result file and writes its header.
fn start_result_file(spec: &BenchmarkSpec) -> Result<()> {
    let mut header = HeaderInfo::new(&spec.dataset, &spec.options, spec.seconds);
    header.config = spec.config.as_deref();
    header.legend = spec.legend;
    write_header(&spec.output, &header)
}

fn run_spec<W: Write>(
    spec: &BenchmarkSpec,
    solver: &mut dyn SolverInvoker,
    progress: &mut W,
    report: &mut SweepReport,
) -> Result<()> {
    let args = sweep_args(
        &spec.dataset,
        &spec.output,
        spec.seconds,
        spec.config.as_deref(),
        &spec.options,
    );
    for run in 1..=spec.runs {
        write!(progress, "  {}/{}... ", run, spec.runs)?;
        progress.flush()?;
        let outcome = solver.invoke(&args);
        report.attempted_runs += 1;
        if outcome.is_success() {
            writeln!(progress, "done")?;
        } else {
            report.failed_runs += 1;
            warn!(
                benchmark = %spec.name,
                run,
                "solver run failed: {}",
                outcome.describe()
            );
            writeln!(progress, "failed")?;
        }
    }
    Ok(())
}
