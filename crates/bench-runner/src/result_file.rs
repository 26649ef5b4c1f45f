use crate::{ensure_dir, OptionSet};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Deserialize;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const COMMENT_PREFIX: char = '#';

const RULE: &str = "# ----------------------------------------------------------";
const BANNER: &str = "# ----------------------- BENCHMARK ------------------------";
const SECTION_RULE: &str = "# ---------------------------------------------------------";

/// Column legend written above the solver rows. Which fields precede the
/// trailing cost depends on the solver build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowLegend {
    #[default]
    Full,
    Compact,
}

impl RowLegend {
    pub fn columns(self) -> &'static str {
        match self {
            RowLegend::Full => {
                "seed  fingerprint  time  cycles  moves  feasible  cost_rc  cost_mwd  cost_cc  cost_rs  cost"
            }
            RowLegend::Compact => {
                "seed  fingerprint  feasible  cost_rc  cost_mwd  cost_cc  cost_rs  cost"
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct HeaderInfo<'a> {
    pub dataset: &'a Path,
    pub options: &'a OptionSet,
    pub seconds: u64,
    pub config: Option<&'a Path>,
    pub legend: RowLegend,
    pub started_at: DateTime<Local>,
}

impl<'a> HeaderInfo<'a> {
    pub fn new(dataset: &'a Path, options: &'a OptionSet, seconds: u64) -> Self {
        Self {
            dataset,
            options,
            seconds,
            config: None,
            legend: RowLegend::default(),
            started_at: Local::now(),
        }
    }
}

/// Truncates `output` and writes the metadata block. Rows are appended later
/// by the solver itself, so the file is closed before returning.
pub fn write_header(output: &Path, info: &HeaderInfo<'_>) -> Result<()> {
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent)?;
        }
    }
    let config_lines = match info.config {
        Some(path) => Some(read_config_lines(path)?),
        None => None,
    };

    let file = fs::File::create(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    let mut out = BufWriter::new(file);
    writeln!(out, "{}", RULE)?;
    writeln!(out, "{}", BANNER)?;
    writeln!(out, "{}", RULE)?;
    writeln!(out, "# Dataset:          {}", info.dataset.display())?;
    writeln!(
        out,
        "# Datetime:         {}",
        info.started_at.format("%H:%M:%S %d/%m/%Y")
    )?;
    writeln!(out, "# Seconds per run:  {}", info.seconds)?;
    writeln!(out, "# Options:")?;
    for opt in info.options.iter() {
        writeln!(out, "#   {}", opt)?;
    }
    if let (Some(path), Some(lines)) = (info.config, config_lines) {
        writeln!(out, "# Config:           {}", path.display())?;
        for line in lines {
            writeln!(out, "#   {}", line)?;
        }
    }
    writeln!(out, "{}", SECTION_RULE)?;
    writeln!(out, "# {}", info.legend.columns())?;
    writeln!(out, "{}", SECTION_RULE)?;
    out.flush()?;
    Ok(())
}

fn read_config_lines(path: &Path) -> Result<Vec<String>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read solver config {}", path.display()))?;
    Ok(raw
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .map(str::to_string)
        .collect())
}
