use std::fmt;

use super::options::Options;
use super::rule::{Origin, RuleKind};

/// Per-record outcome of a rule under three-valued logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Fail,
    Unknown,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Pass => write!(f, "pass"),
            Outcome::Fail => write!(f, "fail"),
            Outcome::Unknown => write!(f, "unknown"),
        }
    }
}

/// The evaluation record of a single rule within a confrontation.
///
/// A rule that errored carries no outcomes; it still appears in the
/// result with its error populated.
#[derive(Debug, Clone)]
pub struct RuleResult {
    pub(crate) name: String,
    pub(crate) kind: RuleKind,
    pub(crate) origin: Origin,
    pub(crate) options: Options,
    pub(crate) outcomes: Vec<Outcome>,
    pub(crate) severities: Option<Vec<f64>>,
    pub(crate) warnings: Vec<String>,
    pub(crate) error: Option<String>,
    pub(crate) block: Option<usize>,
}

impl RuleResult {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }

    #[must_use]
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Stored per-record outcomes. Always three-valued; the `na.value`
    /// substitution applies to summary counts only.
    #[must_use]
    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    /// Per-record severities for linear rules: `|lhs - rhs|` of the
    /// comparison, `NaN` where a record is indeterminate. `None` for
    /// non-linear rules and for rules that errored. Feed these into
    /// [`LinearCoefficients::impact`](super::LinearCoefficients::impact)
    /// to rank failing records across rules.
    #[must_use]
    pub fn severities(&self) -> Option<&[f64]> {
        self.severities.as_deref()
    }

    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Dependency-graph block index; populated when the `sequential`
    /// option is set.
    #[must_use]
    pub fn block(&self) -> Option<usize> {
        self.block
    }

    /// `(passes, fails, unknown)` counts with the rule's effective
    /// `na.value` applied.
    #[must_use]
    pub fn counts(&self) -> (usize, usize, usize) {
        let mut passes = 0;
        let mut fails = 0;
        let mut unknown = 0;
        for outcome in &self.outcomes {
            match (outcome, self.options.na_value) {
                (Outcome::Pass, _) | (Outcome::Unknown, Some(true)) => passes += 1,
                (Outcome::Fail, _) | (Outcome::Unknown, Some(false)) => fails += 1,
                (Outcome::Unknown, None) => unknown += 1,
            }
        }
        (passes, fails, unknown)
    }
}

/// Aggregate view of one rule: one row of [`Confrontation::summary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSummary {
    pub name: String,
    pub kind: &'static str,
    pub items: usize,
    pub passes: usize,
    pub fails: usize,
    pub unknown: usize,
    pub warnings: usize,
    pub errored: bool,
    pub expression: String,
}

/// One row of the per-record tabular export: a single `rule × record`
/// outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRow {
    pub rule: String,
    pub record: usize,
    pub outcome: Outcome,
}

/// The immutable result of confronting a rule set with data.
///
/// Per rule: name, kind, per-record three-valued outcomes, captured
/// warnings and error, and origin metadata. The per-rule `name` is the
/// stable join key for external reporting and comparison collaborators.
#[derive(Debug, Clone)]
#[must_use]
pub struct Confrontation {
    results: Vec<RuleResult>,
}

impl Confrontation {
    pub(crate) fn new(results: Vec<RuleResult>) -> Self {
        Self { results }
    }

    /// Per-rule results in rule-set order.
    #[must_use]
    pub fn results(&self) -> &[RuleResult] {
        &self.results
    }

    /// Look up the result for a rule by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RuleResult> {
        self.results.iter().find(|r| r.name == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Whether every rule evaluated without error and every outcome is a
    /// pass.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| {
            r.error.is_none() && r.outcomes.iter().all(|o| *o == Outcome::Pass)
        })
    }

    /// One aggregate row per rule, in rule-set order.
    #[must_use]
    pub fn summary(&self) -> Vec<RuleSummary> {
        self.results
            .iter()
            .map(|r| {
                let (passes, fails, unknown) = r.counts();
                RuleSummary {
                    name: r.name.clone(),
                    kind: r.kind.label(),
                    items: r.outcomes.len(),
                    passes,
                    fails,
                    unknown,
                    warnings: r.warnings.len(),
                    errored: r.error.is_some(),
                    expression: r.origin.text.clone(),
                }
            })
            .collect()
    }

    /// One row per rule × record, for external reporting collaborators.
    #[must_use]
    pub fn record_rows(&self) -> Vec<RecordRow> {
        self.results
            .iter()
            .flat_map(|r| {
                r.outcomes.iter().enumerate().map(|(i, o)| RecordRow {
                    rule: r.name.clone(),
                    record: i,
                    outcome: *o,
                })
            })
            .collect()
    }
}

impl fmt::Display for Confrontation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Confrontation({} rules)", self.results.len())?;
        for row in self.summary() {
            write!(
                f,
                "  {}: {} passes, {} fails, {} unknown",
                row.name, row.passes, row.fails, row.unknown
            )?;
            if row.errored {
                write!(f, " [error]")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
