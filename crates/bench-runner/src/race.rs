use crate::{check_solver, ensure_dir, race_args, HarnessError, ProcessSolver, RunOutcome, SolverInvoker};
use anyhow::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A single run without a time limit, keeping the best solution found.
#[derive(Debug, Clone)]
pub struct RaceRequest {
    pub dataset: PathBuf,
    pub solution: PathBuf,
    pub log: Option<PathBuf>,
}

pub fn run_race<W: Write>(
    request: &RaceRequest,
    solver_path: &Path,
    progress: &mut W,
) -> Result<RunOutcome> {
    check_solver(solver_path)?;
    let mut solver = ProcessSolver::new(solver_path);
    race_with(request, &mut solver, progress)
}

pub(crate) fn race_with<W: Write>(
    request: &RaceRequest,
    solver: &mut dyn SolverInvoker,
    progress: &mut W,
) -> Result<RunOutcome> {
    if !request.dataset.exists() {
        let shown = std::path::absolute(&request.dataset)
            .unwrap_or_else(|_| request.dataset.clone());
        return Err(HarnessError::DatasetNotFound(shown).into());
    }
    for target in std::iter::once(&request.solution).chain(request.log.as_ref()) {
        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                ensure_dir(parent)?;
            }
        }
    }

    writeln!(progress, "=============== RACE ================")?;
    writeln!(progress, "Input:          {}", request.dataset.display())?;
    writeln!(progress, "Output:         {}", request.solution.display())?;
    writeln!(
        progress,
        "Log:            {}",
        request
            .log
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    )?;
    writeln!(progress, "=====================================")?;
    progress.flush()?;

    let args = race_args(&request.dataset, &request.solution, request.log.as_deref());
    let outcome = solver.invoke(&args);
    if !outcome.is_success() {
        warn!(dataset = %request.dataset.display(), "race run failed: {}", outcome.describe());
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::scratch_dir;
    use std::fs;

    struct Recorder {
        calls: Vec<Vec<String>>,
    }

    impl SolverInvoker for Recorder {
        fn invoke(&mut self, args: &[String]) -> RunOutcome {
            self.calls.push(args.to_vec());
            RunOutcome::Success
        }
    }

    #[test]
    fn race_invokes_solver_once_in_race_mode() {
        let dir = scratch_dir("race");
        let dataset = dir.join("comp02.ctt");
        fs::write(&dataset, "Name: comp02\n").expect("dataset");
        let request = RaceRequest {
            dataset: dataset.clone(),
            solution: dir.join("races").join("comp02.ctt.sol"),
            log: Some(dir.join("races").join("comp02.ctt.sol.log")),
        };
        let mut solver = Recorder { calls: Vec::new() };
        let mut progress = Vec::<u8>::new();

        let outcome = race_with(&request, &mut solver, &mut progress).expect("race");

        assert!(outcome.is_success());
        assert_eq!(solver.calls.len(), 1);
        let args = &solver.calls[0];
        assert!(args.contains(&"-r".to_string()));
        assert_eq!(
            args.last().expect("log flag"),
            &format!("-b{}", dir.join("races").join("comp02.ctt.sol.log").display())
        );
        assert!(dir.join("races").is_dir());
        let text = String::from_utf8(progress).expect("utf8");
        assert!(text.contains("Input:          "));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn race_with_missing_dataset_is_fatal() {
        let dir = scratch_dir("race_missing");
        let request = RaceRequest {
            dataset: dir.join("nope.ctt"),
            solution: dir.join("nope.sol"),
            log: None,
        };
        let mut solver = Recorder { calls: Vec::new() };
        let err = race_with(&request, &mut solver, &mut std::io::sink()).expect_err("missing dataset");
        assert!(matches!(
            err.downcast_ref::<HarnessError>(),
            Some(HarnessError::DatasetNotFound(_))
        ));
        assert!(solver.calls.is_empty());
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn race_with_missing_solver_is_fatal() {
        let dir = scratch_dir("race_nosolver");
        let dataset = dir.join("d.ctt");
        fs::write(&dataset, "x").expect("dataset");
        let request = RaceRequest {
            dataset,
            solution: dir.join("d.sol"),
            log: None,
        };
        let err = run_race(&request, &dir.join("missing-solver"), &mut std::io::sink())
            .expect_err("missing solver");
        assert!(err.to_string().contains("please build itc2007-cct"), "{}", err);
        let _ = fs::remove_dir_all(dir);
    }
}
