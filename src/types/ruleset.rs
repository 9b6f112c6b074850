use std::path::Path;

use super::dataset::DataEnv;
use super::error::CompileError;
use super::expr::Expr;
use super::options::{Options, OptionsLayer};
use super::result::Confrontation;
use super::rule::{Origin, Rule};
use super::Value;
use crate::classify::classify;
use crate::error::ConfrontError;
use crate::expand::{expand, Entry, RuleDecl};

/// A compiled, immutable set of validating rules plus its resolved
/// options.
///
/// Rule sets are built through [`RuleSetBuilder`] or parsed from the rule
/// DSL; by construction every rule is expanded, classified, and uniquely
/// named. Mutating operations return a new rule set and re-run the same
/// validation.
#[derive(Debug, Clone)]
#[must_use]
pub struct RuleSet {
    rules: Vec<Rule>,
    options: Options,
}

impl RuleSet {
    /// Parse and compile a rule set from DSL text.
    ///
    /// # Errors
    ///
    /// Returns a parse error for malformed text or a compile error for a
    /// structurally invalid rule set.
    pub fn from_dsl(input: &str) -> Result<Self, ConfrontError> {
        let entries = crate::parse::parse(input)?;
        Ok(Self::from_entries(entries, Vec::new(), "dsl")?)
    }

    /// Parse and compile a rule set from a DSL file.
    ///
    /// # Errors
    ///
    /// I/O errors are returned as-is; the rest matches
    /// [`from_dsl`](Self::from_dsl).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfrontError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path)?;
        let entries = crate::parse::parse(&input)?;
        Ok(Self::from_entries(
            entries,
            Vec::new(),
            &path.display().to_string(),
        )?)
    }

    pub(crate) fn from_entries(
        entries: Vec<Entry>,
        mut layers: Vec<OptionsLayer>,
        source: &str,
    ) -> Result<Self, CompileError> {
        let expanded = expand(entries)?;

        let mut declared = OptionsLayer::new();
        for (key, value) in &expanded.options {
            declared.set(key, value)?;
        }
        if !declared.is_empty() {
            layers.push(declared);
        }
        let options = Options::resolve(layers.iter());

        let mut rules: Vec<Rule> = Vec::with_capacity(expanded.rules.len());
        let mut auto = 0;
        for decl in expanded.rules {
            let rule = build_rule(decl, &mut auto, &rules, source)?;
            ensure_fresh_name(&rules, rule.name())?;
            rules.push(rule);
        }
        Ok(Self { rules, options })
    }

    /// The compiled rules in declaration order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Look up a rule by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Rule names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(Rule::name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The resolved rule-set-level options.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// A copy of this rule set with an extra option layer applied on top.
    pub fn with_options(&self, layer: &OptionsLayer) -> Self {
        Self {
            rules: self.rules.clone(),
            options: layer.apply(&self.options),
        }
    }

    /// A copy of this rule set with one rule appended.
    ///
    /// The declaration goes through the same classification as at build
    /// time; an unnamed declaration gets a fresh generated name.
    ///
    /// # Errors
    ///
    /// Same classification and naming errors as building from scratch.
    pub fn add(&self, decl: RuleDecl) -> Result<Self, CompileError> {
        let mut auto = 0;
        let rule = build_rule(decl, &mut auto, &self.rules, "api")?;
        ensure_fresh_name(&self.rules, rule.name())?;
        let mut rules = self.rules.clone();
        rules.push(rule);
        Ok(Self {
            rules,
            options: self.options.clone(),
        })
    }

    /// A copy of this rule set without the named rule. Removing an absent
    /// name is a no-op.
    pub fn remove(&self, name: &str) -> Self {
        Self {
            rules: self
                .rules
                .iter()
                .filter(|r| r.name() != name)
                .cloned()
                .collect(),
            options: self.options.clone(),
        }
    }

    /// A copy of this rule set with the rule at `index` replaced.
    ///
    /// # Errors
    ///
    /// [`CompileError::IndexOutOfBounds`] for a bad index, plus the usual
    /// classification and naming errors.
    pub fn replace(&self, index: usize, decl: RuleDecl) -> Result<Self, CompileError> {
        if index >= self.rules.len() {
            return Err(CompileError::IndexOutOfBounds {
                index,
                len: self.rules.len(),
            });
        }
        let mut rules = self.rules.clone();
        rules.remove(index);
        let mut auto = 0;
        let rule = build_rule(decl, &mut auto, &rules, "api")?;
        ensure_fresh_name(&rules, rule.name())?;
        rules.insert(index, rule);
        Ok(Self {
            rules,
            options: self.options.clone(),
        })
    }

    /// The union of two rule sets: this set's rules followed by the
    /// other's. Options come from the left operand.
    ///
    /// # Errors
    ///
    /// [`CompileError::DuplicateRuleName`] when the operands share a rule
    /// name.
    pub fn union(&self, other: &RuleSet) -> Result<Self, CompileError> {
        let mut rules = self.rules.clone();
        for rule in &other.rules {
            ensure_fresh_name(&rules, rule.name())?;
            rules.push(rule.clone());
        }
        Ok(Self {
            rules,
            options: self.options.clone(),
        })
    }

    /// Confront this rule set with data.
    ///
    /// # Errors
    ///
    /// Data-shape problems always abort; evaluation errors and warnings
    /// abort only under the corresponding `raise` policy.
    pub fn confront(&self, data: impl Into<DataEnv>) -> Result<Confrontation, ConfrontError> {
        crate::confront::run(self, &data.into())
    }

    /// Confront with an extra option layer applied for this run only.
    ///
    /// # Errors
    ///
    /// See [`confront`](Self::confront).
    pub fn confront_with(
        &self,
        data: impl Into<DataEnv>,
        layer: &OptionsLayer,
    ) -> Result<Confrontation, ConfrontError> {
        crate::confront::run(&self.with_options(layer), &data.into())
    }
}

fn ensure_fresh_name(rules: &[Rule], name: &str) -> Result<(), CompileError> {
    if rules.iter().any(|r| r.name() == name) {
        return Err(CompileError::DuplicateRuleName {
            name: name.to_owned(),
        });
    }
    Ok(())
}

fn build_rule(
    decl: RuleDecl,
    auto: &mut usize,
    existing: &[Rule],
    source: &str,
) -> Result<Rule, CompileError> {
    let name = match decl.name {
        Some(name) => name,
        None => loop {
            *auto += 1;
            let candidate = format!("V{auto}");
            if !existing.iter().any(|r| r.name() == candidate) {
                break candidate;
            }
        },
    };
    let kind = classify(&name, &decl.expr)?;
    let variables = decl.expr.free_variables();
    let mut options = OptionsLayer::new();
    for (key, value) in &decl.options {
        options.set(key, value)?;
    }
    let origin = Origin {
        text: decl.expr.to_string(),
        label: decl.label,
        source: source.to_owned(),
    };
    Ok(Rule {
        name,
        expression: decl.expr,
        variables,
        kind,
        origin,
        options,
    })
}

/// Builds one rule inside [`RuleSetBuilder::rule`].
#[derive(Debug, Default)]
#[must_use]
pub struct RuleBuilder {
    expr: Option<Expr>,
    label: Option<String>,
    options: Vec<(String, Value)>,
}

impl RuleBuilder {
    /// The validating condition. Required.
    pub fn when(mut self, expr: Expr) -> Self {
        self.expr = Some(expr);
        self
    }

    /// A human-readable label carried into results.
    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_owned());
        self
    }

    /// A rule-local option override, validated at compile time.
    pub fn option(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.options.push((key.to_owned(), value.into()));
        self
    }
}

/// Programmatic rule-set construction.
///
/// ```
/// use confront::{var, RuleSetBuilder};
///
/// let rules = RuleSetBuilder::new()
///     .rule("turnover_pos", |r| r.when(var("turnover").gte(0_i64)))
///     .rule("profit_bound", |r| {
///         r.when(var("profit").lte(var("turnover")))
///             .label("profit cannot exceed turnover")
///     })
///     .compile()
///     .unwrap();
/// assert_eq!(rules.len(), 2);
/// ```
#[derive(Debug, Default)]
#[must_use]
pub struct RuleSetBuilder {
    entries: Vec<Entry>,
    layers: Vec<OptionsLayer>,
    pending: Option<CompileError>,
}

impl RuleSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a named rule. The closure configures its condition, label,
    /// and option overrides.
    pub fn rule(mut self, name: &str, f: impl FnOnce(RuleBuilder) -> RuleBuilder) -> Self {
        let built = f(RuleBuilder::default());
        match built.expr {
            Some(expr) => self.entries.push(Entry::Rule(RuleDecl {
                name: Some(name.to_owned()),
                label: built.label,
                expr,
                options: built.options,
            })),
            None => {
                self.pending.get_or_insert(CompileError::MissingCondition {
                    rule: name.to_owned(),
                });
            }
        }
        self
    }

    /// Append a pre-built declaration (named or not).
    pub fn declare(mut self, decl: RuleDecl) -> Self {
        self.entries.push(Entry::Rule(decl));
        self
    }

    /// A local assignment, substituted into later rules.
    pub fn assign(mut self, name: &str, expr: Expr) -> Self {
        self.entries.push(Entry::Assign {
            name: name.to_owned(),
            expr,
        });
        self
    }

    /// A variable group for later Cartesian expansion.
    pub fn group<S: Into<String>>(
        mut self,
        name: &str,
        members: impl IntoIterator<Item = S>,
    ) -> Self {
        self.entries.push(Entry::Group {
            name: name.to_owned(),
            members: members.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// A rule-set-level option, validated at compile time.
    pub fn option(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.entries.push(Entry::Option {
            key: key.to_owned(),
            value: value.into(),
        });
        self
    }

    /// A typed option layer, applied below any `option` entries.
    pub fn layer(mut self, layer: OptionsLayer) -> Self {
        self.layers.push(layer);
        self
    }

    /// Expand, classify, and validate the declared entries.
    ///
    /// # Errors
    ///
    /// The first structural error encountered, including a missing
    /// condition recorded during building.
    pub fn compile(self) -> Result<RuleSet, CompileError> {
        if let Some(err) = self.pending {
            return Err(err);
        }
        RuleSet::from_entries(self.entries, self.layers, "api")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{funcdep, group, var, RaisePolicy, RuleKind};

    #[test]
    fn builder_compiles_and_classifies() {
        let set = RuleSetBuilder::new()
            .rule("pos", |r| r.when(var("turnover").gte(0_i64)))
            .rule("dep", |r| r.when(funcdep(["postcode"], ["city"])))
            .compile()
            .unwrap();
        assert_eq!(set.len(), 2);
        assert!(matches!(
            set.get("pos").unwrap().kind(),
            RuleKind::LinearInequality(_)
        ));
        assert_eq!(
            set.get("dep").unwrap().kind(),
            &RuleKind::FunctionalDependency
        );
        assert_eq!(set.get("pos").unwrap().variables(), ["turnover"]);
    }

    #[test]
    fn missing_condition_surfaces_at_compile() {
        let err = RuleSetBuilder::new()
            .rule("empty", |r| r.label("never given a body"))
            .compile()
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::MissingCondition { rule } if rule == "empty"
        ));
    }

    #[test]
    fn duplicate_names_rejected() {
        let err = RuleSetBuilder::new()
            .rule("r", |r| r.when(var("x").gt(0_i64)))
            .rule("r", |r| r.when(var("y").gt(0_i64)))
            .compile()
            .unwrap_err();
        assert!(matches!(err, CompileError::DuplicateRuleName { name } if name == "r"));
    }

    #[test]
    fn unnamed_declarations_get_generated_names() {
        let set = RuleSetBuilder::new()
            .declare(RuleDecl::unnamed(var("x").gt(0_i64)))
            .declare(RuleDecl::unnamed(var("y").gt(0_i64)))
            .compile()
            .unwrap();
        let names: Vec<&str> = set.names().collect();
        assert_eq!(names, ["V1", "V2"]);
    }

    #[test]
    fn generated_names_skip_taken_ones() {
        let set = RuleSetBuilder::new()
            .rule("V1", |r| r.when(var("x").gt(0_i64)))
            .declare(RuleDecl::unnamed(var("y").gt(0_i64)))
            .compile()
            .unwrap();
        let names: Vec<&str> = set.names().collect();
        assert_eq!(names, ["V1", "V2"]);
    }

    #[test]
    fn groups_expand_through_builder() {
        let set = RuleSetBuilder::new()
            .group("amounts", ["net", "gross"])
            .rule("pos", |r| r.when(group("amounts").gte(0_i64)))
            .compile()
            .unwrap();
        let names: Vec<&str> = set.names().collect();
        assert_eq!(names, ["pos.1", "pos.2"]);
    }

    #[test]
    fn options_resolve_through_builder() {
        let set = RuleSetBuilder::new()
            .option("raise", "errors")
            .option("sequential", true)
            .compile()
            .unwrap();
        assert_eq!(set.options().raise, RaisePolicy::Errors);
        assert!(set.options().sequential);
    }

    #[test]
    fn rule_option_overrides_are_validated() {
        let err = RuleSetBuilder::new()
            .rule("r", |r| r.when(var("x").gt(0_i64)).option("nope", true))
            .compile()
            .unwrap_err();
        assert!(matches!(err, CompileError::UnrecognizedOption { key } if key == "nope"));
    }

    #[test]
    fn add_remove_replace() {
        let set = RuleSetBuilder::new()
            .rule("a", |r| r.when(var("x").gt(0_i64)))
            .compile()
            .unwrap();

        let grown = set.add(RuleDecl::new("b", var("y").gt(0_i64))).unwrap();
        assert_eq!(grown.len(), 2);
        // original untouched
        assert_eq!(set.len(), 1);

        let err = grown.add(RuleDecl::new("a", var("z").gt(0_i64))).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateRuleName { .. }));

        let shrunk = grown.remove("a");
        assert_eq!(shrunk.len(), 1);
        assert!(shrunk.get("a").is_none());
        // absent name: no-op
        assert_eq!(shrunk.remove("zzz").len(), 1);

        let replaced = grown
            .replace(0, RuleDecl::new("a2", var("x").lt(10_i64)))
            .unwrap();
        let names: Vec<&str> = replaced.names().collect();
        assert_eq!(names, ["a2", "b"]);

        let err = grown
            .replace(9, RuleDecl::new("oob", var("x").gt(0_i64)))
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::IndexOutOfBounds { index: 9, len: 2 }
        ));
    }

    #[test]
    fn union_keeps_left_options_and_rejects_clashes() {
        let left = RuleSetBuilder::new()
            .option("raise", "errors")
            .rule("a", |r| r.when(var("x").gt(0_i64)))
            .compile()
            .unwrap();
        let right = RuleSetBuilder::new()
            .option("raise", "none")
            .rule("b", |r| r.when(var("y").gt(0_i64)))
            .compile()
            .unwrap();

        let merged = left.union(&right).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.options().raise, RaisePolicy::Errors);

        let clash = RuleSetBuilder::new()
            .rule("a", |r| r.when(var("z").gt(0_i64)))
            .compile()
            .unwrap();
        assert!(matches!(
            left.union(&clash),
            Err(CompileError::DuplicateRuleName { .. })
        ));
    }

    #[test]
    fn invalid_expression_rejected() {
        let err = RuleSetBuilder::new()
            .rule("arith", |r| r.when(var("x") + var("y")))
            .compile()
            .unwrap_err();
        assert!(matches!(err, CompileError::NotValidatingExpression { .. }));
    }
}
