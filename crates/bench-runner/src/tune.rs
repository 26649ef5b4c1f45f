use crate::{
    check_solver, tune_args, write_header, HarnessError, HeaderInfo, OptionSet, ProcessSolver,
    SolverInvoker,
};
use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

/// Uniform sampling range for one solver option, written `key=LO..HI`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamRange {
    pub key: String,
    pub lo: f64,
    pub hi: f64,
}

impl FromStr for ParamRange {
    type Err = HarnessError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || HarnessError::InvalidRange(raw.to_string());
        let (key, range) = raw.split_once('=').ok_or_else(invalid)?;
        let (lo, hi) = range.split_once("..").ok_or_else(invalid)?;
        let lo: f64 = lo.trim().parse().map_err(|_| invalid())?;
        let hi: f64 = hi.trim().parse().map_err(|_| invalid())?;
        if key.trim().is_empty() || !lo.is_finite() || !hi.is_finite() || lo > hi {
            return Err(invalid());
        }
        Ok(Self {
            key: key.trim().to_string(),
            lo,
            hi,
        })
    }
}

impl ParamRange {
    fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        if self.lo == self.hi {
            self.lo
        } else {
            rng.gen_range(self.lo..self.hi)
        }
    }
}

#[derive(Debug, Clone)]
pub struct TuneRequest {
    pub dataset: PathBuf,
    pub seconds: u64,
    pub base: OptionSet,
    pub ranges: Vec<ParamRange>,
    pub trials: u32,
    pub output: Option<PathBuf>,
    pub seed: Option<u64>,
}

/// Random search over `ranges`: every trial runs the solver once with the base
/// options plus one freshly sampled value per range.
pub fn run_tune<W: Write>(
    request: &TuneRequest,
    solver_path: &Path,
    progress: &mut W,
) -> Result<Vec<OptionSet>> {
    check_solver(solver_path)?;
    let mut solver = ProcessSolver::new(solver_path);
    let mut rng = match request.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    tune_with(request, &mut solver, &mut rng, progress)
}

pub(crate) fn tune_with<W: Write, R: Rng>(
    request: &TuneRequest,
    solver: &mut dyn SolverInvoker,
    rng: &mut R,
    progress: &mut W,
) -> Result<Vec<OptionSet>> {
    if !request.dataset.exists() {
        return Err(HarnessError::DatasetNotFound(request.dataset.clone()).into());
    }
    if let Some(output) = &request.output {
        let header = HeaderInfo::new(&request.dataset, &request.base, request.seconds);
        write_header(output, &header)?;
    }

    let mut tried = Vec::with_capacity(request.trials as usize);
    for trial in 1..=request.trials {
        let sampled: Vec<(String, f64)> = request
            .ranges
            .iter()
            .map(|r| (r.key.clone(), r.sample(&mut *rng)))
            .collect();
        let summary = sampled
            .iter()
            .map(|(k, v)| format!("{} = {}", k, v))
            .collect::<Vec<_>>()
            .join(" | ");
        writeln!(progress, "[{}/{}] {}", trial, request.trials, summary)?;
        progress.flush()?;

        let options = request
            .base
            .extended(sampled.iter().map(|(k, v)| format!("{}={}", k, v)));
        let args = tune_args(
            &request.dataset,
            request.seconds,
            request.output.as_deref(),
            &options,
        );
        let outcome = solver.invoke(&args);
        if !outcome.is_success() {
            warn!(trial, "tuning run failed: {}", outcome.describe());
        }
        tried.push(options);
    }
    Ok(tried)
}
