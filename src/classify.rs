//! Static classification of rule expressions.
//!
//! Classification runs once per rule at rule-set construction time. It
//! rejects expressions that cannot produce a truth value, validates calls
//! against the closed predicate set, and extracts coefficient vectors from
//! affine comparisons so severity scoring never has to re-derive them.

use crate::types::{
    ArithOp, CompareOp, CompileError, Expr, LinearCoefficients, RuleKind, TypePredicate, Value,
};

/// Classify a rule body. Priority order: functional dependency, type
/// check, membership, linear, conditional, general.
///
/// # Errors
///
/// [`CompileError::UnrecognizedFunction`] for a call outside the closed
/// predicate set, [`CompileError::UnknownGroupReference`] for an
/// unexpanded group reference, and
/// [`CompileError::NotValidatingExpression`] when the expression cannot
/// produce a truth value.
pub(crate) fn classify(rule: &str, expr: &Expr) -> Result<RuleKind, CompileError> {
    check_calls(rule, expr)?;
    check_groups(rule, expr)?;
    if !truth_valued(expr) {
        return Err(CompileError::NotValidatingExpression {
            rule: rule.to_owned(),
        });
    }
    Ok(match expr {
        Expr::FuncDep { .. } => RuleKind::FunctionalDependency,
        Expr::Call { .. } => RuleKind::TypeCheck,
        Expr::In { .. } => RuleKind::Membership,
        Expr::Compare { op, lhs, rhs } => match (affine(lhs), affine(rhs)) {
            (Some(left), Some(right)) => {
                let coefs = left.sub(&right).into_coefficients();
                match op {
                    CompareOp::Eq | CompareOp::Neq => RuleKind::LinearEquality(coefs),
                    _ => RuleKind::LinearInequality(coefs),
                }
            }
            _ => RuleKind::General,
        },
        Expr::If(_, _) => RuleKind::Conditional,
        _ => RuleKind::General,
    })
}

/// Reject call expressions whose name is not a recognized type predicate.
fn check_calls(rule: &str, expr: &Expr) -> Result<(), CompileError> {
    match expr {
        Expr::Call { function, arg } => {
            if TypePredicate::from_name(function).is_none() {
                return Err(CompileError::UnrecognizedFunction {
                    rule: rule.to_owned(),
                    function: function.clone(),
                });
            }
            check_calls(rule, arg)
        }
        Expr::Neg(inner) | Expr::Not(inner) => check_calls(rule, inner),
        Expr::Arith(_, a, b) | Expr::And(a, b) | Expr::Or(a, b) | Expr::If(a, b) => {
            check_calls(rule, a)?;
            check_calls(rule, b)
        }
        Expr::Compare { lhs, rhs, .. } => {
            check_calls(rule, lhs)?;
            check_calls(rule, rhs)
        }
        Expr::In { needle, .. } => check_calls(rule, needle),
        Expr::Lit(_) | Expr::Var(_) | Expr::Group(_) | Expr::Dataset | Expr::FuncDep { .. } => {
            Ok(())
        }
    }
}

/// Group references are removed by expansion; one surviving here means the
/// rule bypassed the expander with no matching group in scope.
fn check_groups(rule: &str, expr: &Expr) -> Result<(), CompileError> {
    match expr {
        Expr::Group(name) => Err(CompileError::UnknownGroupReference {
            rule: rule.to_owned(),
            group: name.clone(),
        }),
        Expr::Neg(inner) | Expr::Not(inner) => check_groups(rule, inner),
        Expr::Arith(_, a, b) | Expr::And(a, b) | Expr::Or(a, b) | Expr::If(a, b) => {
            check_groups(rule, a)?;
            check_groups(rule, b)
        }
        Expr::Compare { lhs, rhs, .. } => {
            check_groups(rule, lhs)?;
            check_groups(rule, rhs)
        }
        Expr::In { needle, .. } => check_groups(rule, needle),
        Expr::Call { arg, .. } => check_groups(rule, arg),
        Expr::Lit(_) | Expr::Var(_) | Expr::Dataset | Expr::FuncDep { .. } => Ok(()),
    }
}

/// Whether an expression is truth-valued, i.e. can yield pass/fail/NA per
/// record. Bare variables and literals count only when boolean; arithmetic
/// never does.
fn truth_valued(expr: &Expr) -> bool {
    match expr {
        Expr::Compare { .. }
        | Expr::In { .. }
        | Expr::Call { .. }
        | Expr::FuncDep { .. } => true,
        Expr::And(a, b) | Expr::Or(a, b) | Expr::If(a, b) => truth_valued(a) && truth_valued(b),
        Expr::Not(inner) => truth_valued(inner),
        Expr::Lit(Value::Bool(_)) | Expr::Lit(Value::Na) => true,
        // a bare column reference may hold booleans; resolved at runtime
        Expr::Var(_) => true,
        Expr::Lit(_) | Expr::Group(_) | Expr::Dataset | Expr::Neg(_) | Expr::Arith(..) => false,
    }
}

/// An affine form `Σ c_v · v + constant` accumulated during extraction.
struct Affine {
    terms: Vec<(String, f64)>,
    constant: f64,
}

impl Affine {
    fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    fn variable(name: &str) -> Self {
        Self {
            terms: vec![(name.to_owned(), 1.0)],
            constant: 0.0,
        }
    }

    fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    fn scale(mut self, factor: f64) -> Self {
        for (_, c) in &mut self.terms {
            *c *= factor;
        }
        self.constant *= factor;
        self
    }

    fn add(mut self, other: &Affine) -> Self {
        for (name, c) in &other.terms {
            match self.terms.iter_mut().find(|(n, _)| n == name) {
                Some((_, existing)) => *existing += c,
                None => self.terms.push((name.clone(), *c)),
            }
        }
        self.constant += other.constant;
        self
    }

    fn sub(self, other: &Affine) -> Self {
        let mut out = self;
        for (name, c) in &other.terms {
            match out.terms.iter_mut().find(|(n, _)| n == name) {
                Some((_, existing)) => *existing -= c,
                None => out.terms.push((name.clone(), -c)),
            }
        }
        out.constant -= other.constant;
        out
    }

    fn into_coefficients(self) -> LinearCoefficients {
        LinearCoefficients::new(self.terms, self.constant)
    }
}

/// Extract the affine form of an expression, or `None` if it is not
/// affine in its variables.
#[allow(clippy::cast_precision_loss)]
fn affine(expr: &Expr) -> Option<Affine> {
    match expr {
        Expr::Lit(Value::Int(i)) => Some(Affine::constant(*i as f64)),
        Expr::Lit(Value::Float(f)) => Some(Affine::constant(*f)),
        Expr::Var(name) => Some(Affine::variable(name)),
        Expr::Neg(inner) => Some(affine(inner)?.scale(-1.0)),
        Expr::Arith(ArithOp::Add, a, b) => Some(affine(a)?.add(&affine(b)?)),
        Expr::Arith(ArithOp::Sub, a, b) => Some(affine(a)?.sub(&affine(b)?)),
        Expr::Arith(ArithOp::Mul, a, b) => {
            let (left, right) = (affine(a)?, affine(b)?);
            if left.is_constant() {
                Some(right.scale(left.constant))
            } else if right.is_constant() {
                Some(left.scale(right.constant))
            } else {
                None
            }
        }
        Expr::Arith(ArithOp::Div, a, b) => {
            let divisor = affine(b)?;
            if divisor.is_constant() && divisor.constant != 0.0 {
                Some(affine(a)?.scale(1.0 / divisor.constant))
            } else {
                None
            }
        }
        _ => None,
    }
}
