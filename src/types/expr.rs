use std::fmt;
use std::ops::{Add, Div, Mul, Not, Sub};

use super::Value;

/// Comparison operators supported in rule expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// Arithmetic operators supported in rule expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// The closed set of recognized type predicates.
///
/// Call expressions are checked against this enumeration at rule-set
/// construction time; an unrecognized call name is a compile error rather
/// than a dynamically dispatched lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypePredicate {
    IsNumeric,
    IsString,
    IsBool,
}

impl TypePredicate {
    /// Resolve a call name against the closed predicate set.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "is_numeric" => Some(TypePredicate::IsNumeric),
            "is_string" => Some(TypePredicate::IsString),
            "is_bool" => Some(TypePredicate::IsBool),
            _ => None,
        }
    }

    /// Whether a single non-`Na` cell satisfies this predicate.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            TypePredicate::IsNumeric => matches!(value, Value::Int(_) | Value::Float(_)),
            TypePredicate::IsString => matches!(value, Value::Str(_)),
            TypePredicate::IsBool => matches!(value, Value::Bool(_)),
        }
    }
}

/// The right-hand side of a membership test: either a literal list of
/// values or a variable naming a reference column (the whole column is the
/// lookup table).
#[derive(Debug, Clone, PartialEq)]
pub enum SetExpr {
    Values(Vec<Value>),
    Var(String),
}

/// Rule expression AST. Variables and group references are strings;
/// expressions are immutable value objects with structural equality.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal constant.
    Lit(Value),
    /// A free variable, resolved against a dataset column at confrontation time.
    Var(String),
    /// A variable-group reference (`$g`); removed by expansion.
    Group(String),
    /// The whole-dataset token (`.`); valid only as a predicate argument.
    Dataset,
    Neg(Box<Expr>),
    Arith(ArithOp, Box<Expr>, Box<Expr>),
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    /// Logical implication `if (P) Q`, interpreted as `!P | Q`.
    If(Box<Expr>, Box<Expr>),
    /// NA-consistent set membership.
    In {
        needle: Box<Expr>,
        set: SetExpr,
    },
    /// A type-predicate call. The name is validated against
    /// [`TypePredicate`] during classification.
    Call {
        function: String,
        arg: Box<Expr>,
    },
    /// Functional dependency: records agreeing on the determinant
    /// variables must agree on the dependent variables.
    FuncDep {
        determinants: Vec<String>,
        dependents: Vec<String>,
    },
}

impl Expr {
    /// The free variables referenced by this expression, in declaration
    /// order, deduplicated. Excludes the whole-dataset token and group
    /// references.
    #[must_use]
    pub fn free_variables(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut Vec<String>) {
        let mut push = |name: &str, out: &mut Vec<String>| {
            if !out.iter().any(|v| v == name) {
                out.push(name.to_owned());
            }
        };
        match self {
            Expr::Var(name) => push(name, out),
            Expr::Lit(_) | Expr::Group(_) | Expr::Dataset => {}
            Expr::Neg(inner) | Expr::Not(inner) => inner.collect_variables(out),
            Expr::Arith(_, a, b)
            | Expr::And(a, b)
            | Expr::Or(a, b)
            | Expr::If(a, b) => {
                a.collect_variables(out);
                b.collect_variables(out);
            }
            Expr::Compare { lhs, rhs, .. } => {
                lhs.collect_variables(out);
                rhs.collect_variables(out);
            }
            Expr::In { needle, set } => {
                needle.collect_variables(out);
                if let SetExpr::Var(name) = set {
                    push(name, out);
                }
            }
            Expr::Call { arg, .. } => arg.collect_variables(out),
            Expr::FuncDep {
                determinants,
                dependents,
            } => {
                for name in determinants.iter().chain(dependents) {
                    push(name, out);
                }
            }
        }
    }

    fn compare_with(self, op: CompareOp, rhs: impl Into<Expr>) -> Expr {
        Expr::Compare {
            op,
            lhs: Box::new(self),
            rhs: Box::new(rhs.into()),
        }
    }

    #[must_use]
    pub fn eq(self, rhs: impl Into<Expr>) -> Expr {
        self.compare_with(CompareOp::Eq, rhs)
    }

    #[must_use]
    pub fn neq(self, rhs: impl Into<Expr>) -> Expr {
        self.compare_with(CompareOp::Neq, rhs)
    }

    #[must_use]
    pub fn gt(self, rhs: impl Into<Expr>) -> Expr {
        self.compare_with(CompareOp::Gt, rhs)
    }

    #[must_use]
    pub fn gte(self, rhs: impl Into<Expr>) -> Expr {
        self.compare_with(CompareOp::Gte, rhs)
    }

    #[must_use]
    pub fn lt(self, rhs: impl Into<Expr>) -> Expr {
        self.compare_with(CompareOp::Lt, rhs)
    }

    #[must_use]
    pub fn lte(self, rhs: impl Into<Expr>) -> Expr {
        self.compare_with(CompareOp::Lte, rhs)
    }

    #[must_use]
    pub fn and(self, other: Expr) -> Expr {
        Expr::And(Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn or(self, other: Expr) -> Expr {
        Expr::Or(Box::new(self), Box::new(other))
    }

    /// Implication: `if (self) then`.
    #[must_use]
    pub fn implies(self, then: Expr) -> Expr {
        Expr::If(Box::new(self), Box::new(then))
    }

    /// Membership against a literal list of values.
    #[must_use]
    pub fn in_values<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Expr {
        Expr::In {
            needle: Box::new(self),
            set: SetExpr::Values(values.into_iter().map(Into::into).collect()),
        }
    }

    /// Membership against a reference column.
    #[must_use]
    pub fn in_column(self, column: &str) -> Expr {
        Expr::In {
            needle: Box::new(self),
            set: SetExpr::Var(column.to_owned()),
        }
    }
}

/// A free-variable reference.
#[must_use]
pub fn var(name: &str) -> Expr {
    Expr::Var(name.to_owned())
}

/// A literal constant expression.
#[must_use]
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Lit(value.into())
}

/// A variable-group reference (`$name` in the DSL).
#[must_use]
pub fn group(name: &str) -> Expr {
    Expr::Group(name.to_owned())
}

/// The whole-dataset token (`.` in the DSL).
#[must_use]
pub fn dataset() -> Expr {
    Expr::Dataset
}

/// A functional-dependency expression `determinants -> dependents`.
#[must_use]
pub fn funcdep<S: Into<String>>(
    determinants: impl IntoIterator<Item = S>,
    dependents: impl IntoIterator<Item = S>,
) -> Expr {
    Expr::FuncDep {
        determinants: determinants.into_iter().map(Into::into).collect(),
        dependents: dependents.into_iter().map(Into::into).collect(),
    }
}

/// `is_numeric(arg)` type-predicate call.
#[must_use]
pub fn is_numeric(arg: Expr) -> Expr {
    Expr::Call {
        function: "is_numeric".to_owned(),
        arg: Box::new(arg),
    }
}

/// `is_string(arg)` type-predicate call.
#[must_use]
pub fn is_string(arg: Expr) -> Expr {
    Expr::Call {
        function: "is_string".to_owned(),
        arg: Box::new(arg),
    }
}

/// `is_bool(arg)` type-predicate call.
#[must_use]
pub fn is_bool(arg: Expr) -> Expr {
    Expr::Call {
        function: "is_bool".to_owned(),
        arg: Box::new(arg),
    }
}

impl<T: Into<Value>> From<T> for Expr {
    fn from(v: T) -> Self {
        Expr::Lit(v.into())
    }
}

impl Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }
}

macro_rules! arith_impl {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<T: Into<Expr>> $trait<T> for Expr {
            type Output = Expr;

            fn $method(self, rhs: T) -> Expr {
                Expr::Arith($op, Box::new(self), Box::new(rhs.into()))
            }
        }
    };
}

arith_impl!(Add, add, ArithOp::Add);
arith_impl!(Sub, sub, ArithOp::Sub);
arith_impl!(Mul, mul, ArithOp::Mul);
arith_impl!(Div, div, ArithOp::Div);

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "=="),
            CompareOp::Neq => write!(f, "!="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Gte => write!(f, ">="),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Lte => write!(f, "<="),
        }
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArithOp::Add => write!(f, "+"),
            ArithOp::Sub => write!(f, "-"),
            ArithOp::Mul => write!(f, "*"),
            ArithOp::Div => write!(f, "/"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Lit(v) => write!(f, "{v}"),
            Expr::Var(name) => write!(f, "{name}"),
            Expr::Group(name) => write!(f, "${name}"),
            Expr::Dataset => write!(f, "."),
            Expr::Neg(inner) => write!(f, "-{inner}"),
            Expr::Arith(op, a, b) => write!(f, "({a} {op} {b})"),
            Expr::Compare { op, lhs, rhs } => write!(f, "{lhs} {op} {rhs}"),
            Expr::And(a, b) => write!(f, "({a} & {b})"),
            Expr::Or(a, b) => write!(f, "({a} | {b})"),
            Expr::Not(inner) => write!(f, "!{inner}"),
            Expr::If(p, q) => write!(f, "if ({p}) {q}"),
            Expr::In { needle, set } => match set {
                SetExpr::Values(vs) => {
                    let items: Vec<String> = vs.iter().map(ToString::to_string).collect();
                    write!(f, "{needle} in ({})", items.join(", "))
                }
                SetExpr::Var(name) => write!(f, "{needle} in {name}"),
            },
            Expr::Call { function, arg } => write!(f, "{function}({arg})"),
            Expr::FuncDep {
                determinants,
                dependents,
            } => write!(
                f,
                "({}) -> ({})",
                determinants.join(", "),
                dependents.join(", ")
            ),
        }
    }
}
