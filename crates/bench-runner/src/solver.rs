use crate::OptionSet;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

pub const DEFAULT_SOLVER_PATH: &str = "build/itc2007-cct";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Exited(i32),
    Signaled,
    SpawnFailed(String),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success)
    }

    pub fn describe(&self) -> String {
        match self {
            RunOutcome::Success => "ok".to_string(),
            RunOutcome::Exited(code) => format!("exit code {}", code),
            RunOutcome::Signaled => "terminated by signal".to_string(),
            RunOutcome::SpawnFailed(err) => format!("failed to start: {}", err),
        }
    }
}

/// Runs the solver once with the given argument tokens and blocks until it
/// exits.
pub trait SolverInvoker {
    fn invoke(&mut self, args: &[String]) -> RunOutcome;
}

#[derive(Debug, Clone)]
pub struct ProcessSolver {
    path: PathBuf,
}

impl ProcessSolver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SolverInvoker for ProcessSolver {
    fn invoke(&mut self, args: &[String]) -> RunOutcome {
        debug!(solver = %self.path.display(), ?args, "spawning solver");
        let mut cmd = Command::new(&self.path);
        cmd.args(args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());
        match cmd.status() {
            Ok(status) if status.success() => RunOutcome::Success,
            Ok(status) => match status.code() {
                Some(code) => RunOutcome::Exited(code),
                None => RunOutcome::Signaled,
            },
            Err(e) => RunOutcome::SpawnFailed(e.to_string()),
        }
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// `<dataset> -q -t <seconds> -b<output> [-c <config>] (-o <opt>)*`
pub fn sweep_args(
    dataset: &Path,
    output: &Path,
    seconds: u64,
    config: Option<&Path>,
    options: &OptionSet,
) -> Vec<String> {
    let mut args = vec![
        path_arg(dataset),
        "-q".to_string(),
        "-t".to_string(),
        seconds.to_string(),
        format!("-b{}", output.to_string_lossy()),
    ];
    if let Some(config) = config {
        args.push("-c".to_string());
        args.push(path_arg(config));
    }
    args.extend(options.to_solver_args());
    args
}

/// `<dataset> <solution> -q -r -b[<log>]`
pub fn race_args(dataset: &Path, solution: &Path, log: Option<&Path>) -> Vec<String> {
    let bench_flag = match log {
        Some(log) => format!("-b{}", log.to_string_lossy()),
        None => "-b".to_string(),
    };
    vec![
        path_arg(dataset),
        path_arg(solution),
        "-q".to_string(),
        "-r".to_string(),
        bench_flag,
    ]
}

/// `<dataset> -t <seconds> -b[<output>] (-o <opt>)*`
pub fn tune_args(
    dataset: &Path,
    seconds: u64,
    output: Option<&Path>,
    options: &OptionSet,
) -> Vec<String> {
    let bench_flag = match output {
        Some(out) => format!("-b{}", out.to_string_lossy()),
        None => "-b".to_string(),
    };
    let mut args = vec![
        path_arg(dataset),
        "-t".to_string(),
        seconds.to_string(),
        bench_flag,
    ];
    args.extend(options.to_solver_args());
    args
}
