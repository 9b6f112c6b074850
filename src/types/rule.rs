use std::fmt;

use super::expr::Expr;
use super::options::OptionsLayer;

/// Classification assigned to a rule by static analysis.
///
/// Linear kinds carry the extracted coefficient vector.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleKind {
    FunctionalDependency,
    TypeCheck,
    Membership,
    LinearEquality(LinearCoefficients),
    LinearInequality(LinearCoefficients),
    Conditional,
    General,
}

impl RuleKind {
    /// Short tag used in summaries and exports.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            RuleKind::FunctionalDependency => "funcdep",
            RuleKind::TypeCheck => "type",
            RuleKind::Membership => "membership",
            RuleKind::LinearEquality(_) => "linear_eq",
            RuleKind::LinearInequality(_) => "linear_ineq",
            RuleKind::Conditional => "conditional",
            RuleKind::General => "general",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Coefficients of an affine rule body, obtained by subtracting the
/// right-hand affine form from the left-hand one. Terms are kept in
/// first-appearance order.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearCoefficients {
    terms: Vec<(String, f64)>,
    constant: f64,
}

impl LinearCoefficients {
    pub(crate) fn new(terms: Vec<(String, f64)>, constant: f64) -> Self {
        Self { terms, constant }
    }

    /// The coefficient of a variable, if it occurs in the rule.
    #[must_use]
    pub fn coefficient(&self, variable: &str) -> Option<f64> {
        self.terms
            .iter()
            .find(|(v, _)| v == variable)
            .map(|(_, c)| *c)
    }

    /// The constant term.
    #[must_use]
    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// `(variable, coefficient)` pairs in first-appearance order.
    #[must_use]
    pub fn terms(&self) -> &[(String, f64)] {
        &self.terms
    }

    /// The dual norm `(Σ |c_v|^q)^(1/q)` with `q = p/(p-1)`.
    ///
    /// `p = 1` uses the limit `q = ∞`, i.e. the maximum coefficient
    /// magnitude.
    #[must_use]
    pub fn norm(&self, p: f64) -> f64 {
        let coefs = self.terms.iter().map(|(_, c)| c.abs());
        if p <= 1.0 {
            return coefs.fold(0.0, f64::max);
        }
        let q = p / (p - 1.0);
        coefs.map(|c| c.powf(q)).sum::<f64>().powf(1.0 / q)
    }

    /// Impact of a violation of magnitude `severity` on a record:
    /// `severity / norm(p)`. Normalizing by the constraint's sensitivity
    /// makes impacts comparable across rules. `NaN` when the rule has no
    /// nonzero coefficients.
    #[must_use]
    pub fn impact(&self, severity: f64, p: f64) -> f64 {
        severity / self.norm(p)
    }
}

/// Provenance of a rule: its rendered source text, the optional declared
/// label, and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub text: String,
    pub label: Option<String>,
    pub source: String,
}

/// One declared, classified validating constraint.
///
/// Rules are created by the expander/classifier pipeline when a
/// [`RuleSet`](super::RuleSet) is built and are never mutated afterwards;
/// rule-set mutations replace whole rules.
#[derive(Debug, Clone)]
pub struct Rule {
    pub(crate) name: String,
    pub(crate) expression: Expr,
    pub(crate) variables: Vec<String>,
    pub(crate) kind: RuleKind,
    pub(crate) origin: Origin,
    pub(crate) options: OptionsLayer,
}

impl Rule {
    /// Unique name within the owning rule set.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The validating expression.
    #[must_use]
    pub fn expression(&self) -> &Expr {
        &self.expression
    }

    /// Free variables in declaration order.
    #[must_use]
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Static classification.
    #[must_use]
    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }

    /// Provenance metadata.
    #[must_use]
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Rule-local option overrides (may be empty).
    #[must_use]
    pub fn options(&self) -> &OptionsLayer {
        &self.options
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.origin.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn norm_euclidean() {
        let coefs = LinearCoefficients::new(
            vec![("a".into(), 1.0), ("b".into(), -1.0)],
            0.0,
        );
        // p = 2 -> q = 2
        assert!((coefs.norm(2.0) - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn norm_p1_is_max_coefficient() {
        let coefs = LinearCoefficients::new(
            vec![("a".into(), 3.0), ("b".into(), -4.0)],
            1.0,
        );
        assert_eq!(coefs.norm(1.0), 4.0);
    }

    #[test]
    fn impact_normalizes_severity() {
        let coefs = LinearCoefficients::new(
            vec![("a".into(), 1.0), ("b".into(), -1.0)],
            0.0,
        );
        let impact = coefs.impact(2.0, 2.0);
        assert!((impact - 2.0 / 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn coefficient_lookup() {
        let coefs = LinearCoefficients::new(vec![("x".into(), 2.5)], -10.0);
        assert_eq!(coefs.coefficient("x"), Some(2.5));
        assert_eq!(coefs.coefficient("y"), None);
        assert_eq!(coefs.constant(), -10.0);
    }

    #[test]
    fn kind_labels() {
        assert_eq!(RuleKind::FunctionalDependency.label(), "funcdep");
        assert_eq!(RuleKind::General.label(), "general");
    }
}
