mod options;
mod race;
mod registry;
mod result_file;
mod solver;
mod sweep;
mod tune;

use std::fs;
use std::path::{Path, PathBuf};

pub use options::OptionSet;
pub use race::{run_race, RaceRequest};
pub use registry::{
    default_registry, load_registry, BenchmarkRegistry, BenchmarkSpec, Selection,
};
pub use result_file::{write_header, HeaderInfo, RowLegend, COMMENT_PREFIX};
pub use solver::{
    race_args, sweep_args, tune_args, ProcessSolver, RunOutcome, SolverInvoker,
    DEFAULT_SOLVER_PATH,
};
pub use sweep::{estimate_minutes, estimate_seconds, run_benchmarks, run_sweep, SweepReport};
pub use tune::{run_tune, ParamRange, TuneRequest};

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("'{}' not found: please build itc2007-cct", .0.display())]
    SolverNotFound(PathBuf),
    #[error("'{}' not found", .0.display())]
    DatasetNotFound(PathBuf),
    #[error("benchmark folder not found at '{}'", .0.display())]
    BenchmarkRootNotFound(PathBuf),
    #[error("duplicate benchmark name '{0}'")]
    DuplicateBenchmark(String),
    #[error("invalid benchmark '{name}': {reason}")]
    InvalidSpec { name: String, reason: String },
    #[error("invalid parameter range '{0}': expected key=LO..HI")]
    InvalidRange(String),
}

pub fn ensure_dir(path: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(path)?;
    Ok(())
}

/// Fails with [`HarnessError::SolverNotFound`] unless `path` is an existing file.
pub fn check_solver(path: &Path) -> anyhow::Result<()> {
    if !path.is_file() {
        let shown = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        return Err(HarnessError::SolverNotFound(shown).into());
    }
    Ok(())
}
