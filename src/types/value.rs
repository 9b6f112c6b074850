use std::cmp::Ordering;
use std::fmt;

use super::error::EvalError;
use super::expr::{ArithOp, CompareOp};

/// A single data cell or literal.
///
/// `Na` is the indeterminate ("not available") state of the three-valued
/// logic: it propagates through arithmetic and comparisons, and through
/// logical connectives per Kleene semantics.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A 64-bit signed integer.
    Int(i64),
    /// A 64-bit floating-point number.
    Float(f64),
    /// A boolean value.
    Bool(bool),
    /// A UTF-8 string.
    Str(String),
    /// The indeterminate value.
    Na,
}

impl Value {
    /// Whether this value is the indeterminate `Na`.
    #[must_use]
    pub fn is_na(&self) -> bool {
        matches!(self, Value::Na)
    }

    /// Compare this value to another using the given operator.
    ///
    /// `eps` is the boundary tolerance for numeric inequalities; pass `0.0`
    /// for exact comparison. Either operand being `Na`, or a `NaN` entering
    /// the comparison, yields `Na`. Incompatible types are an error.
    pub(crate) fn compare(
        &self,
        op: CompareOp,
        other: &Value,
        eps: f64,
    ) -> Result<Value, EvalError> {
        if self.is_na() || other.is_na() {
            return Ok(Value::Na);
        }
        if let (Some(a), Some(b)) = (self.as_f64(), other.as_f64()) {
            if a.is_nan() || b.is_nan() {
                return Ok(Value::Na);
            }
            if eps > 0.0 {
                let d = a - b;
                return Ok(Value::Bool(match op {
                    CompareOp::Eq => d.abs() <= eps,
                    CompareOp::Neq => d.abs() > eps,
                    CompareOp::Lt => d < eps,
                    CompareOp::Lte => d <= eps,
                    CompareOp::Gt => -d < eps,
                    CompareOp::Gte => -d <= eps,
                }));
            }
        }
        let ord = match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => {
                if !matches!(op, CompareOp::Eq | CompareOp::Neq) {
                    return Err(EvalError::Type {
                        detail: format!("ordering comparison '{op}' on booleans"),
                    });
                }
                a.cmp(b)
            }
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b).ok_or(EvalError::NotBoolean)?,
                _ => {
                    return Err(EvalError::Type {
                        detail: format!(
                            "cannot compare {} with {}",
                            self.type_name(),
                            other.type_name()
                        ),
                    })
                }
            },
        };
        Ok(Value::Bool(match op {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Neq => ord != Ordering::Equal,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Gte => ord != Ordering::Less,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Lte => ord != Ordering::Greater,
        }))
    }

    /// Apply an arithmetic operator. `Na` propagates; integer `+ - *` stay
    /// integral (overflow is an error) while `/` always produces a float.
    /// Integer division by zero is an error; float division keeps IEEE
    /// semantics.
    pub(crate) fn arith(&self, op: ArithOp, other: &Value) -> Result<Value, EvalError> {
        if self.is_na() || other.is_na() {
            return Ok(Value::Na);
        }
        if let (Value::Int(a), Value::Int(b)) = (self, other) {
            if op == ArithOp::Div {
                if *b == 0 {
                    return Err(EvalError::Arithmetic {
                        detail: format!("integer division by zero in {a} / {b}"),
                    });
                }
            } else {
                let out = match op {
                    ArithOp::Add => a.checked_add(*b),
                    ArithOp::Sub => a.checked_sub(*b),
                    ArithOp::Mul | ArithOp::Div => a.checked_mul(*b),
                };
                return out.map(Value::Int).ok_or_else(|| EvalError::Arithmetic {
                    detail: format!("integer overflow in {a} {op} {b}"),
                });
            }
        }
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::Float(match op {
                ArithOp::Add => a + b,
                ArithOp::Sub => a - b,
                ArithOp::Mul => a * b,
                ArithOp::Div => a / b,
            })),
            _ => Err(EvalError::Type {
                detail: format!(
                    "cannot apply '{op}' to {} and {}",
                    self.type_name(),
                    other.type_name()
                ),
            }),
        }
    }

    /// Arithmetic negation.
    pub(crate) fn neg(&self) -> Result<Value, EvalError> {
        match self {
            Value::Na => Ok(Value::Na),
            Value::Int(v) => v.checked_neg().map(Value::Int).ok_or(EvalError::Arithmetic {
                detail: "integer overflow in negation".to_owned(),
            }),
            Value::Float(v) => Ok(Value::Float(-v)),
            other => Err(EvalError::Type {
                detail: format!("cannot negate {}", other.type_name()),
            }),
        }
    }

    /// Kleene conjunction: `false & NA = false`, `true & NA = NA`.
    pub(crate) fn and3(&self, other: &Value) -> Result<Value, EvalError> {
        match (self.as_bool3()?, other.as_bool3()?) {
            (Some(false), _) | (_, Some(false)) => Ok(Value::Bool(false)),
            (Some(true), Some(true)) => Ok(Value::Bool(true)),
            _ => Ok(Value::Na),
        }
    }

    /// Kleene disjunction: `true | NA = true`, `false | NA = NA`.
    pub(crate) fn or3(&self, other: &Value) -> Result<Value, EvalError> {
        match (self.as_bool3()?, other.as_bool3()?) {
            (Some(true), _) | (_, Some(true)) => Ok(Value::Bool(true)),
            (Some(false), Some(false)) => Ok(Value::Bool(false)),
            _ => Ok(Value::Na),
        }
    }

    /// Kleene negation: `!NA = NA`.
    pub(crate) fn not3(&self) -> Result<Value, EvalError> {
        Ok(match self.as_bool3()? {
            Some(b) => Value::Bool(!b),
            None => Value::Na,
        })
    }

    fn as_bool3(&self) -> Result<Option<bool>, EvalError> {
        match self {
            Value::Bool(b) => Ok(Some(*b)),
            Value::Na => Ok(None),
            other => Err(EvalError::Type {
                detail: format!("logical operand is {}, not a truth value", other.type_name()),
            }),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Bool(_) => "boolean",
            Value::Str(_) => "string",
            Value::Na => "NA",
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Na, Into::into)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "\"{v}\""),
            Value::Na => write!(f, "NA"),
        }
    }
}
