use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered `namespace.key=value` overrides handed to the solver untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionSet(Vec<String>);

impl OptionSet {
    pub fn new<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(options.into_iter().map(Into::into).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, option: impl Into<String>) {
        self.0.push(option.into());
    }

    /// A copy with `extra` appended after the existing entries.
    pub fn extended<I, S>(&self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out = self.clone();
        out.0.extend(extra.into_iter().map(Into::into));
        out
    }

    /// One `-o <option>` pair per entry.
    pub fn to_solver_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.0.len() * 2);
        for opt in &self.0 {
            args.push("-o".to_string());
            args.push(opt.clone());
        }
        args
    }
}

impl fmt::Display for OptionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solver_args_keep_order_and_duplicates() {
        let opts = OptionSet::new(["solver.methods=sa,ls", "sa.cooling_rate=0.965", "solver.methods=sa,ls"]);
        assert_eq!(
            opts.to_solver_args(),
            vec![
                "-o",
                "solver.methods=sa,ls",
                "-o",
                "sa.cooling_rate=0.965",
                "-o",
                "solver.methods=sa,ls"
            ]
        );
    }

    #[test]
    fn option_values_with_spaces_stay_single_tokens() {
        let opts = OptionSet::new(["note=two words"]);
        assert_eq!(opts.to_solver_args(), vec!["-o", "note=two words"]);
    }

    #[test]
    fn empty_set_produces_no_args() {
        assert!(OptionSet::default().to_solver_args().is_empty());
    }

    #[test]
    fn extended_appends_after_existing() {
        let base = OptionSet::new(["a.x=1"]);
        let ext = base.extended(["b.y=2"]);
        assert_eq!(ext.iter().collect::<Vec<_>>(), vec!["a.x=1", "b.y=2"]);
        assert_eq!(base.len(), 1);
    }
}
