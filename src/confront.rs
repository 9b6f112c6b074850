//! The confrontation engine: evaluates a compiled rule set against data.
//!
//! Expressions are evaluated columnwise. Every intermediate result is a
//! column of [`Value`]s; a length-1 column is a scalar and broadcasts
//! against any other length. Indeterminate cells flow through arithmetic,
//! comparisons, and connectives per the three-valued semantics on
//! [`Value`], so a rule touching missing data yields
//! [`Outcome::Unknown`] rather than a hard failure.

use std::collections::HashMap;

use crate::error::ConfrontError;
use crate::graph::DependencyGraph;
use crate::types::{
    ArithOp, Confrontation, DataEnv, DataSet, EvalError, Expr, Outcome, RaisePolicy, Rule,
    RuleKind, RuleResult, RuleSet, SetExpr, TypePredicate, Value,
};

pub(crate) fn run(set: &RuleSet, env: &DataEnv) -> Result<Confrontation, ConfrontError> {
    env.primary()
        .check_shape()
        .map_err(|source| ConfrontError::Data {
            dataset: "primary".to_owned(),
            source,
        })?;
    for (name, dataset) in env.references() {
        dataset.check_shape().map_err(|source| ConfrontError::Data {
            dataset: name.to_owned(),
            source,
        })?;
    }

    // bind primary columns first; references fill remaining names
    let mut bindings: HashMap<&str, &[Value]> = HashMap::new();
    let mut shadowed: Vec<&str> = Vec::new();
    for (name, column) in env.primary().iter() {
        bindings.insert(name, column);
    }
    for (_, dataset) in env.references() {
        for (name, column) in dataset.iter() {
            if bindings.contains_key(name) {
                if !shadowed.contains(&name) {
                    shadowed.push(name);
                }
            } else {
                bindings.insert(name, column);
            }
        }
    }

    let graph = if needs_blocks(set) {
        Some(DependencyGraph::build(set))
    } else {
        None
    };

    let nrows = env.primary().nrows();
    let mut results = Vec::with_capacity(set.len());
    for rule in set.iter() {
        let options = rule.options().apply(set.options());
        let eps = match rule.kind() {
            RuleKind::LinearInequality(_) => options.lin_ineq_eps,
            _ => 0.0,
        };
        let ctx = EvalCtx {
            bindings: &bindings,
            primary: env.primary(),
            eps,
        };

        let mut warnings = Vec::new();
        for variable in rule.variables() {
            if shadowed.contains(&variable.as_str()) {
                warnings.push(format!(
                    "variable '{variable}' occurs in more than one dataset; \
                     the primary dataset's column is used"
                ));
            }
        }
        if options.raise == RaisePolicy::All {
            if let Some(message) = warnings.first() {
                return Err(ConfrontError::Warning {
                    rule: rule.name().to_owned(),
                    message: message.clone(),
                });
            }
        }

        let (outcomes, error) = match evaluate_rule(rule, &ctx, nrows) {
            Ok(outcomes) => (outcomes, None),
            Err(source) => {
                if options.raise != RaisePolicy::None {
                    return Err(ConfrontError::Evaluation {
                        rule: rule.name().to_owned(),
                        source,
                    });
                }
                (Vec::new(), Some(source.to_string()))
            }
        };

        let severities = if error.is_none() {
            evaluate_severities(rule, &ctx, nrows)
        } else {
            None
        };

        let block = if options.sequential {
            graph.as_ref().and_then(|g| g.block_of(rule.name()))
        } else {
            None
        };
        results.push(RuleResult {
            name: rule.name().to_owned(),
            kind: rule.kind().clone(),
            origin: rule.origin().clone(),
            options,
            outcomes,
            severities,
            warnings,
            error,
            block,
        });
    }
    Ok(Confrontation::new(results))
}

fn needs_blocks(set: &RuleSet) -> bool {
    set.options().sequential
        || set
            .iter()
            .any(|r| r.options().apply(set.options()).sequential)
}

fn evaluate_rule(rule: &Rule, ctx: &EvalCtx<'_>, nrows: usize) -> Result<Vec<Outcome>, EvalError> {
    let column = eval(rule.expression(), ctx)?;
    // a scalar verdict applies to every record, including none
    let column = if column.len() == 1 && column.len() != nrows {
        vec![column[0].clone(); nrows]
    } else {
        column
    };
    column
        .iter()
        .map(|value| match value {
            Value::Bool(true) => Ok(Outcome::Pass),
            Value::Bool(false) => Ok(Outcome::Fail),
            Value::Na => Ok(Outcome::Unknown),
            _ => Err(EvalError::NotBoolean),
        })
        .collect()
}

/// Per-record severity `|lhs - rhs|` of a linear rule's comparison, for
/// impact scoring against the rule's coefficient norm. Indeterminate
/// records yield `NaN`.
fn evaluate_severities(rule: &Rule, ctx: &EvalCtx<'_>, nrows: usize) -> Option<Vec<f64>> {
    if !matches!(
        rule.kind(),
        RuleKind::LinearEquality(_) | RuleKind::LinearInequality(_)
    ) {
        return None;
    }
    let Expr::Compare { lhs, rhs, .. } = rule.expression() else {
        return None;
    };
    let diff = zip_map(&eval(lhs, ctx).ok()?, &eval(rhs, ctx).ok()?, |x, y| {
        x.arith(ArithOp::Sub, y)
    })
    .ok()?;
    let diff = if diff.len() == 1 && diff.len() != nrows {
        vec![diff[0].clone(); nrows]
    } else {
        diff
    };
    Some(
        diff.iter()
            .map(|v| v.as_f64().map_or(f64::NAN, f64::abs))
            .collect(),
    )
}

struct EvalCtx<'a> {
    bindings: &'a HashMap<&'a str, &'a [Value]>,
    primary: &'a DataSet,
    eps: f64,
}

impl EvalCtx<'_> {
    fn column(&self, name: &str) -> Result<Vec<Value>, EvalError> {
        self.bindings
            .get(name)
            .map(|c| c.to_vec())
            .ok_or_else(|| EvalError::UnresolvedVariable {
                name: name.to_owned(),
            })
    }
}

fn eval(expr: &Expr, ctx: &EvalCtx<'_>) -> Result<Vec<Value>, EvalError> {
    match expr {
        Expr::Lit(v) => Ok(vec![v.clone()]),
        Expr::Var(name) => ctx.column(name),
        Expr::Neg(inner) => eval(inner, ctx)?.iter().map(Value::neg).collect(),
        Expr::Not(inner) => eval(inner, ctx)?.iter().map(Value::not3).collect(),
        Expr::Arith(op, a, b) => zip_map(&eval(a, ctx)?, &eval(b, ctx)?, |x, y| x.arith(*op, y)),
        Expr::Compare { op, lhs, rhs } => zip_map(&eval(lhs, ctx)?, &eval(rhs, ctx)?, |x, y| {
            x.compare(*op, y, ctx.eps)
        }),
        Expr::And(a, b) => zip_map(&eval(a, ctx)?, &eval(b, ctx)?, Value::and3),
        Expr::Or(a, b) => zip_map(&eval(a, ctx)?, &eval(b, ctx)?, Value::or3),
        // if (P) Q  ==  !P | Q
        Expr::If(p, q) => zip_map(&eval(p, ctx)?, &eval(q, ctx)?, |x, y| x.not3()?.or3(y)),
        Expr::In { needle, set } => eval_membership(needle, set, ctx),
        Expr::Call { function, arg } => eval_predicate(function, arg, ctx),
        Expr::FuncDep {
            determinants,
            dependents,
        } => eval_funcdep(determinants, dependents, ctx),
        Expr::Group(name) => Err(EvalError::Type {
            detail: format!("unexpanded group reference '${name}'"),
        }),
        Expr::Dataset => Err(EvalError::Type {
            detail: "'.' is only valid as a predicate argument".to_owned(),
        }),
    }
}

/// Columnwise application with scalar broadcast: `(1, n)`, `(n, 1)`, and
/// `(n, n)` shapes are legal, anything else is a length mismatch.
fn zip_map(
    a: &[Value],
    b: &[Value],
    f: impl Fn(&Value, &Value) -> Result<Value, EvalError>,
) -> Result<Vec<Value>, EvalError> {
    match (a.len(), b.len()) {
        (1, _) => b.iter().map(|y| f(&a[0], y)).collect(),
        (_, 1) => a.iter().map(|x| f(x, &b[0])).collect(),
        (n, m) if n == m => a.iter().zip(b).map(|(x, y)| f(x, y)).collect(),
        (n, m) => Err(EvalError::LengthMismatch { left: n, right: m }),
    }
}

/// NA-consistent membership. An indeterminate query stays indeterminate;
/// a query that matches no table entry is indeterminate when the table
/// itself contains indeterminate entries (one of them could be the match)
/// and a definite miss otherwise. An empty table never matches.
fn eval_membership(
    needle: &Expr,
    set: &SetExpr,
    ctx: &EvalCtx<'_>,
) -> Result<Vec<Value>, EvalError> {
    let table: Vec<Value> = match set {
        SetExpr::Values(values) => values.clone(),
        SetExpr::Var(name) => ctx.column(name)?,
    };
    let table_has_na = table.iter().any(Value::is_na);
    let column = eval(needle, ctx)?;
    Ok(column
        .iter()
        .map(|cell| {
            if cell.is_na() {
                Value::Na
            } else if table.iter().any(|entry| same_value(cell, entry)) {
                Value::Bool(true)
            } else if table_has_na {
                Value::Na
            } else {
                Value::Bool(false)
            }
        })
        .collect())
}

/// Equality for membership lookups: numeric values compare by magnitude
/// across `Int`/`Float`, everything else structurally. `Na` never matches.
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Na, _) | (_, Value::Na) => false,
        (Value::Int(x), Value::Int(y)) => x == y,
        #[allow(clippy::cast_precision_loss)]
        (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => *x as f64 == *y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        _ => false,
    }
}

/// Column-level type predicate: a single verdict for the whole column,
/// true when every non-indeterminate cell matches. The `.` argument tests
/// every column of the primary dataset.
fn eval_predicate(function: &str, arg: &Expr, ctx: &EvalCtx<'_>) -> Result<Vec<Value>, EvalError> {
    let predicate =
        TypePredicate::from_name(function).ok_or_else(|| EvalError::Type {
            detail: format!("unrecognized function '{function}'"),
        })?;
    let verdict = match arg {
        Expr::Dataset => {
            let mut all = true;
            for (_, column) in ctx.primary.iter() {
                all &= column_matches(predicate, column);
            }
            all
        }
        other => column_matches(predicate, &eval(other, ctx)?),
    };
    Ok(vec![Value::Bool(verdict)])
}

fn column_matches(predicate: TypePredicate, column: &[Value]) -> bool {
    column
        .iter()
        .filter(|v| !v.is_na())
        .all(|v| predicate.matches(v))
}

/// Functional dependency: group records by their determinant key and flag
/// every member of a group whose dependent values disagree. `Na` is an
/// ordinary key value here; two records both missing a determinant still
/// land in the same group.
fn eval_funcdep(
    determinants: &[String],
    dependents: &[String],
    ctx: &EvalCtx<'_>,
) -> Result<Vec<Value>, EvalError> {
    let det_cols: Vec<Vec<Value>> = determinants
        .iter()
        .map(|name| ctx.column(name))
        .collect::<Result<_, _>>()?;
    let dep_cols: Vec<Vec<Value>> = dependents
        .iter()
        .map(|name| ctx.column(name))
        .collect::<Result<_, _>>()?;
    let nrows = det_cols.first().map_or(0, Vec::len);

    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    for row in 0..nrows {
        groups.entry(row_key(&det_cols, row)).or_default().push(row);
    }

    let mut outcomes = vec![Value::Bool(true); nrows];
    for rows in groups.values() {
        let first = row_key(&dep_cols, rows[0]);
        if rows.iter().any(|&row| row_key(&dep_cols, row) != first) {
            for &row in rows {
                outcomes[row] = Value::Bool(false);
            }
        }
    }
    Ok(outcomes)
}

/// A type-tagged key for one row of a column tuple. Floats are keyed by
/// their bit pattern.
fn row_key(columns: &[Vec<Value>], row: usize) -> String {
    let mut key = String::new();
    for column in columns {
        match &column[row] {
            Value::Int(v) => key.push_str(&format!("i{v}")),
            Value::Float(v) => key.push_str(&format!("f{}", v.to_bits())),
            Value::Bool(v) => key.push_str(&format!("b{v}")),
            Value::Str(v) => key.push_str(&format!("s{v}")),
            Value::Na => key.push('?'),
        }
        key.push('\u{1f}');
    }
    key
}
