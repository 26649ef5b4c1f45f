use anyhow::Result;
use bench_runner::{HarnessError, COMMENT_PREFIX};
use serde::Serialize;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

pub const DEFAULT_BENCHMARK_ROOT: &str = "results/benchmarks";

pub const HEADERS: [&str; 4] = ["NAME", "BEST", "MEAN", "STD"];

const SEP: &str = "  |  ";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostStats {
    pub best: f64,
    pub mean: f64,
    pub stdev: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsRecord {
    pub path: String,
    pub best: f64,
    pub mean: f64,
    pub stdev: f64,
    pub samples: usize,
}

/// Records of the result files found directly inside one directory.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsGroup {
    pub dir: PathBuf,
    pub records: Vec<StatsRecord>,
}

/// Cost column of a result file: the last token of every non-comment,
/// non-blank line. Lines whose last token is not an integer are skipped.
pub fn parse_costs(text: &str) -> Vec<i64> {
    text.lines()
        .filter(|line| !line.starts_with(COMMENT_PREFIX))
        .filter_map(|line| line.split_whitespace().last())
        .filter_map(|token| token.parse::<i64>().ok())
        .collect()
}

pub fn cost_stats(costs: &[i64]) -> Option<CostStats> {
    let best = *costs.iter().min()?;
    let n = costs.len() as f64;
    let mean = costs.iter().map(|&c| c as f64).sum::<f64>() / n;
    let stdev = if costs.len() < 2 {
        0.0
    } else {
        let var = costs
            .iter()
            .map(|&c| (c as f64 - mean).powi(2))
            .sum::<f64>()
            / (n - 1.0);
        var.sqrt()
    };
    Some(CostStats {
        best: best as f64,
        mean,
        stdev,
        samples: costs.len(),
    })
}

/// `None` when the file holds no parsable cost rows.
pub fn file_stats(path: &Path) -> Result<Option<StatsRecord>> {
    let bytes = fs::read(path)?;
    let costs = parse_costs(&String::from_utf8_lossy(&bytes));
    Ok(cost_stats(&costs).map(|s| StatsRecord {
        path: path.display().to_string(),
        best: s.best,
        mean: s.mean,
        stdev: s.stdev,
        samples: s.samples,
    }))
}

/// Walks `root` directory by directory (sorted), parsing every regular file
/// whose path contains `filter`. Directories without records are omitted.
/// Files still being appended to are read as they currently are; unreadable
/// directories are logged and left out.
pub fn aggregate(root: &Path, filter: Option<&str>) -> Result<Vec<StatsGroup>> {
    if !root.is_dir() {
        return Err(HarnessError::BenchmarkRootNotFound(root.to_path_buf()).into());
    }
    let mut groups = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("skipping unreadable directory entry: {}", err);
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        let dir = entry.path();
        let listing = match fs::read_dir(dir) {
            Ok(listing) => listing,
            Err(err) => {
                warn!(path = %dir.display(), "skipping unreadable directory: {}", err);
                continue;
            }
        };
        let mut files: Vec<PathBuf> = listing
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|e| e.path())
            .collect();
        files.sort();

        let mut records = Vec::new();
        for file in files {
            if let Some(f) = filter {
                if !file.to_string_lossy().contains(f) {
                    continue;
                }
            }
            match file_stats(&file) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => debug!(path = %file.display(), "no cost rows, skipping"),
                Err(err) => warn!(path = %file.display(), "unreadable result file: {}", err),
            }
        }
        if !records.is_empty() {
            groups.push(StatsGroup {
                dir: dir.to_path_buf(),
                records,
            });
        }
    }
    Ok(groups)
}

/// Table rows for `groups`: one row per record, a blank row between groups.
pub fn table_rows(groups: &[StatsGroup]) -> Vec<[String; 4]> {
    let mut rows = Vec::new();
    for (i, group) in groups.iter().enumerate() {
        if i > 0 {
            rows.push(Default::default());
        }
        for r in &group.records {
            rows.push([
                r.path.clone(),
                format!("{:.1}", r.best),
                format!("{:.1}", r.mean),
                format!("{:.1}", r.stdev),
            ]);
        }
    }
    rows
}

/// Left-aligned columns, each padded to its widest cell, followed by a rule
/// as wide as the header line.
pub fn render_table<const N: usize>(headers: [&str; N], rows: &[[String; N]]) -> String {
    let mut widths = headers.map(str::len);
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.len());
        }
    }
    let header = join_cells(headers.iter().copied(), &widths);
    let mut out = String::new();
    out.push_str(&header);
    out.push('\n');
    out.push_str(&"-".repeat(header.len()));
    out.push('\n');
    for row in rows {
        out.push_str(&join_cells(row.iter().map(String::as_str), &widths));
        out.push('\n');
    }
    out
}

fn join_cells<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths.iter())
        .map(|(cell, &w)| format!("{:<w$}", cell, w = w))
        .collect::<Vec<_>>()
        .join(SEP)
}

pub fn render_stats(groups: &[StatsGroup]) -> String {
    render_table(HEADERS, &table_rows(groups))
}

pub fn stats_to_json(groups: &[StatsGroup]) -> Value {
    json!({
        "groups": groups.iter().map(|g| json!({
            "dir": g.dir.display().to_string(),
            "records": g.records,
        })).collect::<Vec<_>>()
    })
}
