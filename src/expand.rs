use std::collections::HashMap;

use crate::types::{CompileError, Expr, SetExpr, Value};

/// A raw rule declaration, before classification.
///
/// Produced by the DSL parser or built directly for
/// [`RuleSet::add`](crate::RuleSet::add) and friends. Option overrides are
/// kept as raw key/value pairs; they are validated when the rule set is
/// compiled.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDecl {
    pub name: Option<String>,
    pub label: Option<String>,
    pub expr: Expr,
    pub options: Vec<(String, Value)>,
}

impl RuleDecl {
    /// A named declaration with the given body.
    #[must_use]
    pub fn new(name: &str, expr: Expr) -> Self {
        Self {
            name: Some(name.to_owned()),
            label: None,
            expr,
            options: Vec::new(),
        }
    }

    /// An unnamed declaration; the rule set assigns a generated name.
    #[must_use]
    pub fn unnamed(expr: Expr) -> Self {
        Self {
            name: None,
            label: None,
            expr,
            options: Vec::new(),
        }
    }

    /// Attach a human-readable label.
    #[must_use]
    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_owned());
        self
    }

    /// Attach a rule-local option override.
    #[must_use]
    pub fn option(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.options.push((key.to_owned(), value.into()));
        self
    }
}

/// One entry of a declaration stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// A rule declaration.
    Rule(RuleDecl),
    /// A local assignment `name := expr`, visible to later entries.
    Assign { name: String, expr: Expr },
    /// A variable group `group name = (a, b, ...)`.
    Group { name: String, members: Vec<String> },
    /// A rule-set-level option `option key = value`.
    Option { key: String, value: Value },
}

/// The output of expansion: a group-free, assignment-free list of rule
/// declarations plus the stream's option entries in declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Expanded {
    pub rules: Vec<RuleDecl>,
    pub options: Vec<(String, Value)>,
}

/// Expand a declaration stream into concrete rule declarations.
///
/// Local assignments are substituted inline (a later assignment of the
/// same name shadows the earlier one from that point forward), and group
/// references are replaced by the Cartesian product of one rule per
/// member combination. Expansion is idempotent: re-expanding an already
/// expanded stream is a no-op.
///
/// # Errors
///
/// Returns [`CompileError::UnknownGroupReference`] if a `$name` reference
/// has no matching group declaration earlier in the stream.
pub fn expand(entries: Vec<Entry>) -> Result<Expanded, CompileError> {
    let mut assigns: HashMap<String, Expr> = HashMap::new();
    let mut groups: HashMap<String, Vec<String>> = HashMap::new();
    let mut out = Expanded::default();

    for entry in entries {
        match entry {
            Entry::Assign { name, expr } => {
                // resolve against earlier bindings so stored expressions
                // are always fully substituted
                let expr = substitute_assigns(expr, &assigns);
                assigns.insert(name, expr);
            }
            Entry::Group { name, members } => {
                groups.insert(name, members);
            }
            Entry::Option { key, value } => out.options.push((key, value)),
            Entry::Rule(decl) => {
                let expr = substitute_assigns(decl.expr.clone(), &assigns);
                let refs = collect_group_refs(&expr);
                if refs.is_empty() {
                    out.rules.push(RuleDecl { expr, ..decl });
                    continue;
                }
                let mut member_lists = Vec::with_capacity(refs.len());
                for name in &refs {
                    let members =
                        groups
                            .get(name)
                            .ok_or_else(|| CompileError::UnknownGroupReference {
                                rule: decl
                                    .name
                                    .clone()
                                    .unwrap_or_else(|| "<unnamed>".to_owned()),
                                group: name.clone(),
                            })?;
                    member_lists.push(members.as_slice());
                }
                out.rules
                    .extend(cartesian(&decl, &expr, &refs, &member_lists));
            }
        }
    }
    Ok(out)
}

/// Produce one concrete rule per member combination, row-major: the last
/// group (by first appearance in the expression) varies fastest.
fn cartesian(
    decl: &RuleDecl,
    expr: &Expr,
    refs: &[String],
    member_lists: &[&[String]],
) -> Vec<RuleDecl> {
    let total: usize = member_lists.iter().map(|m| m.len()).product();
    let mut out = Vec::with_capacity(total);
    for combo in 0..total {
        let mut expanded = expr.clone();
        let mut remainder = combo;
        for (name, members) in refs.iter().zip(member_lists).rev() {
            let pick = &members[remainder % members.len()];
            remainder /= members.len();
            expanded = substitute_group(expanded, name, pick);
        }
        out.push(RuleDecl {
            name: decl.name.as_ref().map(|n| format!("{n}.{}", combo + 1)),
            label: decl.label.clone(),
            expr: expanded,
            options: decl.options.clone(),
        });
    }
    out
}

/// Group references in first-appearance (left-to-right) order.
fn collect_group_refs(expr: &Expr) -> Vec<String> {
    fn walk(expr: &Expr, out: &mut Vec<String>) {
        match expr {
            Expr::Group(name) => {
                if !out.iter().any(|n| n == name) {
                    out.push(name.clone());
                }
            }
            Expr::Lit(_) | Expr::Var(_) | Expr::Dataset | Expr::FuncDep { .. } => {}
            Expr::Neg(inner) | Expr::Not(inner) => walk(inner, out),
            Expr::Arith(_, a, b) | Expr::And(a, b) | Expr::Or(a, b) | Expr::If(a, b) => {
                walk(a, out);
                walk(b, out);
            }
            Expr::Compare { lhs, rhs, .. } => {
                walk(lhs, out);
                walk(rhs, out);
            }
            Expr::In { needle, .. } => walk(needle, out),
            Expr::Call { arg, .. } => walk(arg, out),
        }
    }
    let mut out = Vec::new();
    walk(expr, &mut out);
    out
}

fn substitute_group(expr: Expr, group: &str, member: &str) -> Expr {
    let subst = |e: Box<Expr>| Box::new(substitute_group(*e, group, member));
    match expr {
        Expr::Group(name) if name == group => Expr::Var(member.to_owned()),
        Expr::Neg(inner) => Expr::Neg(subst(inner)),
        Expr::Not(inner) => Expr::Not(subst(inner)),
        Expr::Arith(op, a, b) => Expr::Arith(op, subst(a), subst(b)),
        Expr::And(a, b) => Expr::And(subst(a), subst(b)),
        Expr::Or(a, b) => Expr::Or(subst(a), subst(b)),
        Expr::If(a, b) => Expr::If(subst(a), subst(b)),
        Expr::Compare { op, lhs, rhs } => Expr::Compare {
            op,
            lhs: subst(lhs),
            rhs: subst(rhs),
        },
        Expr::In { needle, set } => Expr::In {
            needle: subst(needle),
            set,
        },
        Expr::Call { function, arg } => Expr::Call {
            function,
            arg: subst(arg),
        },
        other => other,
    }
}

/// Replace bound variable references with their assigned expressions.
///
/// Variable positions that can only hold a column name (membership tables,
/// functional-dependency lists) are renamed when the binding is itself a
/// plain variable and left untouched otherwise.
fn substitute_assigns(expr: Expr, assigns: &HashMap<String, Expr>) -> Expr {
    if assigns.is_empty() {
        return expr;
    }
    let subst = |e: Box<Expr>| Box::new(substitute_assigns(*e, assigns));
    let rename = |name: String| match assigns.get(&name) {
        Some(Expr::Var(bound)) => bound.clone(),
        _ => name,
    };
    match expr {
        Expr::Var(name) => match assigns.get(&name) {
            Some(bound) => bound.clone(),
            None => Expr::Var(name),
        },
        Expr::Neg(inner) => Expr::Neg(subst(inner)),
        Expr::Not(inner) => Expr::Not(subst(inner)),
        Expr::Arith(op, a, b) => Expr::Arith(op, subst(a), subst(b)),
        Expr::And(a, b) => Expr::And(subst(a), subst(b)),
        Expr::Or(a, b) => Expr::Or(subst(a), subst(b)),
        Expr::If(a, b) => Expr::If(subst(a), subst(b)),
        Expr::Compare { op, lhs, rhs } => Expr::Compare {
            op,
            lhs: subst(lhs),
            rhs: subst(rhs),
        },
        Expr::In { needle, set } => Expr::In {
            needle: subst(needle),
            set: match set {
                SetExpr::Var(name) => SetExpr::Var(rename(name)),
                values => values,
            },
        },
        Expr::Call { function, arg } => Expr::Call {
            function,
            arg: subst(arg),
        },
        Expr::FuncDep {
            determinants,
            dependents,
        } => Expr::FuncDep {
            determinants: determinants.into_iter().map(rename).collect(),
            dependents: dependents.into_iter().map(rename).collect(),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{group, lit, var};

    fn rule(name: &str, expr: Expr) -> Entry {
        Entry::Rule(RuleDecl::new(name, expr))
    }

    #[test]
    fn plain_rules_pass_through() {
        let out = expand(vec![rule("r", var("x").gt(0_i64))]).unwrap();
        assert_eq!(out.rules.len(), 1);
        assert_eq!(out.rules[0].expr, var("x").gt(0_i64));
    }

    #[test]
    fn assignment_substitution() {
        let out = expand(vec![
            Entry::Assign {
                name: "med".to_owned(),
                expr: (var("low") + var("high")) / 2_i64,
            },
            rule("r", var("med").lt(100_i64)),
        ])
        .unwrap();
        assert_eq!(
            out.rules[0].expr,
            ((var("low") + var("high")) / 2_i64).lt(100_i64)
        );
        // transitive variable references are now visible
        assert_eq!(out.rules[0].expr.free_variables(), vec!["low", "high"]);
    }

    #[test]
    fn assignment_shadowing() {
        let out = expand(vec![
            Entry::Assign {
                name: "t".to_owned(),
                expr: var("a").into(),
            },
            rule("before", var("t").gt(0_i64)),
            Entry::Assign {
                name: "t".to_owned(),
                expr: var("b").into(),
            },
            rule("after", var("t").gt(0_i64)),
        ])
        .unwrap();
        assert_eq!(out.rules[0].expr, var("a").gt(0_i64));
        assert_eq!(out.rules[1].expr, var("b").gt(0_i64));
    }

    #[test]
    fn chained_assignments_resolve_transitively() {
        let out = expand(vec![
            Entry::Assign {
                name: "a".to_owned(),
                expr: var("x") + 1_i64,
            },
            Entry::Assign {
                name: "b".to_owned(),
                expr: var("a") * 2_i64,
            },
            rule("r", var("b").gt(0_i64)),
        ])
        .unwrap();
        assert_eq!(out.rules[0].expr.free_variables(), vec!["x"]);
    }

    #[test]
    fn group_product_row_major() {
        let out = expand(vec![
            Entry::Group {
                name: "f".to_owned(),
                members: vec!["c".to_owned(), "d".to_owned()],
            },
            Entry::Group {
                name: "g".to_owned(),
                members: vec!["a".to_owned(), "b".to_owned()],
            },
            rule("r", group("g").gt(group("f"))),
        ])
        .unwrap();
        let exprs: Vec<String> = out.rules.iter().map(|r| r.expr.to_string()).collect();
        assert_eq!(exprs, ["a > c", "a > d", "b > c", "b > d"]);
        let names: Vec<&str> = out
            .rules
            .iter()
            .map(|r| r.name.as_deref().unwrap())
            .collect();
        assert_eq!(names, ["r.1", "r.2", "r.3", "r.4"]);
    }

    #[test]
    fn single_group_expansion() {
        let out = expand(vec![
            Entry::Group {
                name: "prices".to_owned(),
                members: vec!["unit".to_owned(), "total".to_owned()],
            },
            rule("pos", group("prices").gte(0_i64)),
        ])
        .unwrap();
        assert_eq!(out.rules.len(), 2);
        assert_eq!(out.rules[0].expr, var("unit").gte(0_i64));
        assert_eq!(out.rules[1].expr, var("total").gte(0_i64));
    }

    #[test]
    fn unknown_group_is_error() {
        let err = expand(vec![rule("r", group("nope").gt(lit(0_i64)))]).unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnknownGroupReference { rule, group }
                if rule == "r" && group == "nope"
        ));
    }

    #[test]
    fn expansion_is_idempotent() {
        let stream = vec![
            Entry::Group {
                name: "g".to_owned(),
                members: vec!["a".to_owned(), "b".to_owned()],
            },
            Entry::Assign {
                name: "m".to_owned(),
                expr: var("x") + 1_i64,
            },
            rule("r", group("g").gt(var("m"))),
        ];
        let once = expand(stream).unwrap();
        let again = expand(once.rules.iter().cloned().map(Entry::Rule).collect()).unwrap();
        assert_eq!(once.rules, again.rules);
    }

    #[test]
    fn options_pass_through_in_order() {
        let out = expand(vec![
            Entry::Option {
                key: "raise".to_owned(),
                value: Value::Str("errors".into()),
            },
            Entry::Option {
                key: "sequential".to_owned(),
                value: Value::Bool(true),
            },
        ])
        .unwrap();
        assert_eq!(out.options.len(), 2);
        assert_eq!(out.options[0].0, "raise");
    }
}
