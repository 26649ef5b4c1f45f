use crate::{HarnessError, OptionSet, RowLegend};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One dataset / option set / time budget / repetition combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkSpec {
    pub name: String,
    pub dataset: PathBuf,
    pub output: PathBuf,
    pub options: OptionSet,
    pub seconds: u64,
    pub runs: u32,
    pub config: Option<PathBuf>,
    pub legend: RowLegend,
}

impl BenchmarkSpec {
    pub fn new(
        name: impl Into<String>,
        dataset: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        options: OptionSet,
        seconds: u64,
        runs: u32,
    ) -> Self {
        Self {
            name: name.into(),
            dataset: dataset.into(),
            output: output.into(),
            options,
            seconds,
            runs,
            config: None,
            legend: RowLegend::default(),
        }
    }

    pub fn with_config(mut self, config: impl Into<PathBuf>) -> Self {
        self.config = Some(config.into());
        self
    }

    pub fn with_legend(mut self, legend: RowLegend) -> Self {
        self.legend = legend;
        self
    }

    pub fn estimated_seconds(&self) -> u64 {
        self.seconds.saturating_mul(u64::from(self.runs))
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| HarnessError::InvalidSpec {
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.name.trim().is_empty() {
            return Err(invalid("name cannot be empty").into());
        }
        if self.seconds == 0 {
            return Err(invalid("seconds must be positive").into());
        }
        if self.runs == 0 {
            return Err(invalid("runs must be positive").into());
        }
        Ok(())
    }
}

/// Ordered collection of specs with unique names.
#[derive(Debug, Clone, Default)]
pub struct BenchmarkRegistry {
    specs: Vec<BenchmarkSpec>,
}

/// Result of filtering a registry by name.
#[derive(Debug)]
pub struct Selection<'a> {
    pub specs: Vec<&'a BenchmarkSpec>,
    /// Requested names with no registry entry, in request order.
    pub unmatched: Vec<String>,
}

impl BenchmarkRegistry {
    pub fn new(specs: Vec<BenchmarkSpec>) -> Result<Self> {
        let mut seen = HashSet::new();
        for spec in &specs {
            spec.validate()?;
            if !seen.insert(spec.name.as_str()) {
                return Err(HarnessError::DuplicateBenchmark(spec.name.clone()).into());
            }
        }
        Ok(Self { specs })
    }

    pub fn specs(&self) -> &[BenchmarkSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&BenchmarkSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    /// Specs whose name appears in `filter`, in registry order. An empty
    /// filter selects every spec.
    pub fn select(&self, filter: &[String]) -> Selection<'_> {
        if filter.is_empty() {
            return Selection {
                specs: self.specs.iter().collect(),
                unmatched: Vec::new(),
            };
        }
        let wanted: HashSet<&str> = filter.iter().map(String::as_str).collect();
        let specs: Vec<&BenchmarkSpec> = self
            .specs
            .iter()
            .filter(|s| wanted.contains(s.name.as_str()))
            .collect();
        let mut unmatched = Vec::new();
        for name in filter {
            if self.get(name).is_none() && !unmatched.contains(name) {
                unmatched.push(name.clone());
            }
        }
        if !unmatched.is_empty() {
            warn!(
                requested = wanted.len(),
                matched = specs.len(),
                "unknown benchmark names: {}",
                unmatched.join(", ")
            );
        }
        Selection { specs, unmatched }
    }
}

const LS_OPTIONS: &[&str] = &["solver.methods=ls", "solver.multistart=true"];

const HC_OPTIONS: &[&str] = &[
    "solver.methods=hc",
    "solver.multistart=true",
    "hc.max_idle=120000",
    "hc.max_idle_near_best_coeff=3",
    "hc.near_best_ratio=1.02",
];

const TS_OPTIONS: &[&str] = &[
    "solver.methods=ts",
    "ts.max_idle=-1",
    "ts.tabu_tenure=120",
    "ts.frequency_penalty_coeff=0",
];

const SALS_OPTIONS: &[&str] = &[
    "solver.methods=sa,ls",
    "sa.initial_temperature=1.4",
    "sa.cooling_rate=0.965",
    "sa.min_temperature=0.12",
    "sa.temperature_length_coeff=0.125",
    "sa.min_temperature_near_best_coeff=0.68",
    "sa.near_best_ratio=1.05",
    "sa.reheat_coeff=1.015",
    "ls.max_distance_from_best_ratio=1.02",
];

const DEFAULT_SECONDS: u64 = 168;
const DEFAULT_RUNS: u32 = 10;

/// The ITC2007 comp01..comp07 table for every method, plus a toy smoke run.
pub fn default_registry() -> BenchmarkRegistry {
    let methods: [(&str, &[&str]); 4] = [
        ("ls", LS_OPTIONS),
        ("hc", HC_OPTIONS),
        ("ts", TS_OPTIONS),
        ("sals", SALS_OPTIONS),
    ];
    let mut specs = vec![BenchmarkSpec::new(
        "toy-ls",
        "datasets/toy.ctt",
        "/tmp/toy.out",
        OptionSet::new(LS_OPTIONS.iter().copied()),
        DEFAULT_SECONDS,
        DEFAULT_RUNS,
    )];
    for (method, options) in methods {
        for comp in 1..=7 {
            specs.push(BenchmarkSpec::new(
                format!("comp{:02}-{}", comp, method),
                format!("datasets/comp{:02}.ctt", comp),
                format!(
                    "results/benchmarks/{}/{}/comp{:02}.out",
                    DEFAULT_SECONDS, method, comp
                ),
                OptionSet::new(options.iter().copied()),
                DEFAULT_SECONDS,
                DEFAULT_RUNS,
            ));
        }
    }
    BenchmarkRegistry { specs }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryFile {
    #[serde(default)]
    option_sets: BTreeMap<String, Vec<String>>,
    benchmarks: Vec<RegistryEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryEntry {
    name: String,
    dataset: PathBuf,
    output: PathBuf,
    #[serde(default)]
    options: OptionsRef,
    seconds: u64,
    runs: u32,
    #[serde(default)]
    config: Option<PathBuf>,
    #[serde(default)]
    legend: RowLegend,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OptionsRef {
    Named(String),
    Inline(Vec<String>),
}

impl Default for OptionsRef {
    fn default() -> Self {
        OptionsRef::Inline(Vec::new())
    }
}

pub fn load_registry(path: &Path) -> Result<BenchmarkRegistry> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read registry {}", path.display()))?;
    let registry = parse_registry(&raw)
        .with_context(|| format!("invalid registry {}", path.display()))?;
    debug!(
        path = %path.display(),
        benchmarks = registry.len(),
        "loaded benchmark registry"
    );
    Ok(registry)
}

fn parse_registry(raw: &str) -> Result<BenchmarkRegistry> {
    let file: RegistryFile = serde_yaml::from_str(raw)?;
    let mut specs = Vec::with_capacity(file.benchmarks.len());
    for entry in file.benchmarks {
        let options = match entry.options {
            OptionsRef::Inline(list) => OptionSet::new(list),
            OptionsRef::Named(set) => match file.option_sets.get(&set) {
                Some(list) => OptionSet::new(list.iter().cloned()),
                None => {
                    return Err(HarnessError::InvalidSpec {
                        name: entry.name,
                        reason: format!("unknown option set '{}'", set),
                    }
                    .into())
                }
            },
        };
        let mut spec = BenchmarkSpec::new(
            entry.name,
            entry.dataset,
            entry.output,
            options,
            entry.seconds,
            entry.runs,
        )
        .with_legend(entry.legend);
        spec.config = entry.config;
        specs.push(spec);
    }
    BenchmarkRegistry::new(specs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(selection: &Selection<'_>) -> Vec<String> {
        selection.specs.iter().map(|s| s.name.clone()).collect()
    }

    fn small_registry() -> BenchmarkRegistry {
        BenchmarkRegistry::new(vec![
            BenchmarkSpec::new("a", "d/a.ctt", "out/a.out", OptionSet::default(), 10, 2),
            BenchmarkSpec::new("b", "d/b.ctt", "out/b.out", OptionSet::default(), 20, 3),
            BenchmarkSpec::new("c", "d/c.ctt", "out/c.out", OptionSet::default(), 30, 1),
        ])
        .expect("registry")
    }

    #[test]
    fn empty_filter_selects_everything_in_order() {
        let reg = small_registry();
        let sel = reg.select(&[]);
        assert_eq!(names(&sel), vec!["a", "b", "c"]);
        assert!(sel.unmatched.is_empty());
    }

    #[test]
    fn filter_preserves_registry_order_not_request_order() {
        let reg = small_registry();
        let sel = reg.select(&["c".to_string(), "a".to_string()]);
        assert_eq!(names(&sel), vec!["a", "c"]);
    }

    #[test]
    fn unknown_names_are_reported_not_fatal() {
        let reg = small_registry();
        let sel = reg.select(&["b".to_string(), "zzz".to_string(), "zzz".to_string()]);
        assert_eq!(names(&sel), vec!["b"]);
        assert_eq!(sel.unmatched, vec!["zzz"]);

        let none = reg.select(&["nope".to_string()]);
        assert!(none.specs.is_empty());
        assert_eq!(none.unmatched, vec!["nope"]);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = BenchmarkRegistry::new(vec![
            BenchmarkSpec::new("a", "x", "y", OptionSet::default(), 1, 1),
            BenchmarkSpec::new("a", "x", "z", OptionSet::default(), 1, 1),
        ])
        .expect_err("duplicate must fail");
        assert!(err.to_string().contains("duplicate benchmark name 'a'"), "{}", err);
    }

    #[test]
    fn zero_runs_or_seconds_are_rejected() {
        let err = BenchmarkRegistry::new(vec![BenchmarkSpec::new(
            "a",
            "x",
            "y",
            OptionSet::default(),
            0,
            1,
        )])
        .expect_err("zero seconds");
        assert!(err.to_string().contains("seconds must be positive"), "{}", err);
        assert!(BenchmarkRegistry::new(vec![BenchmarkSpec::new(
            "a",
            "x",
            "y",
            OptionSet::default(),
            1,
            0
        )])
        .is_err());
    }

    #[test]
    fn default_registry_has_all_methods() {
        let reg = default_registry();
        assert_eq!(reg.len(), 29);
        assert_eq!(reg.specs()[0].name, "toy-ls");
        let spec = reg.get("comp02-sals").expect("comp02-sals");
        assert_eq!(spec.dataset, PathBuf::from("datasets/comp02.ctt"));
        assert_eq!(
            spec.output,
            PathBuf::from("results/benchmarks/168/sals/comp02.out")
        );
        assert_eq!(spec.options.len(), 9);
        assert_eq!(spec.estimated_seconds(), 1680);
        BenchmarkRegistry::new(reg.specs().to_vec()).expect("default registry is valid");
    }

    #[test]
    fn registry_file_resolves_named_and_inline_options() {
        let raw = r#"
option_sets:
  ls: ["solver.methods=ls", "solver.multistart=true"]
benchmarks:
  - name: comp01-ls
    dataset: datasets/comp01.ctt
    output: results/ls/comp01.out
    options: ls
    seconds: 60
    runs: 5
    legend: compact
  - name: comp01-custom
    dataset: datasets/comp01.ctt
    output: results/custom/comp01.out
    options: ["solver.methods=ts"]
    seconds: 30
    runs: 2
    config: conf/ts.conf
"#;
        let reg = parse_registry(raw).expect("parse");
        assert_eq!(reg.len(), 2);
        let ls = reg.get("comp01-ls").expect("ls");
        assert_eq!(
            ls.options.iter().collect::<Vec<_>>(),
            vec!["solver.methods=ls", "solver.multistart=true"]
        );
        assert_eq!(ls.legend, RowLegend::Compact);
        let custom = reg.get("comp01-custom").expect("custom");
        assert_eq!(custom.config, Some(PathBuf::from("conf/ts.conf")));
        assert_eq!(custom.legend, RowLegend::Full);
    }

    #[test]
    fn registry_file_with_unknown_option_set_fails() {
        let raw = r#"
benchmarks:
  - name: x
    dataset: d.ctt
    output: x.out
    options: missing
    seconds: 1
    runs: 1
"#;
        let err = parse_registry(raw).expect_err("unknown set");
        assert!(err.to_string().contains("unknown option set 'missing'"), "{}", err);
    }
}
