use thiserror::Error;

/// Structural errors raised while building a [`RuleSet`](super::RuleSet).
///
/// All of these are fatal at construction time: a rule set containing any
/// of them cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("rule '{rule}': expression cannot produce a truth value")]
    NotValidatingExpression { rule: String },

    #[error("unknown group reference '${group}' in rule '{rule}'")]
    UnknownGroupReference { rule: String, group: String },

    #[error("duplicate rule name '{name}'")]
    DuplicateRuleName { name: String },

    #[error("unrecognized option '{key}'")]
    UnrecognizedOption { key: String },

    #[error("invalid value for option '{key}': {reason}")]
    InvalidOptionValue { key: String, reason: String },

    #[error("unrecognized function '{function}' in rule '{rule}'")]
    UnrecognizedFunction { rule: String, function: String },

    #[error("rule '{rule}' has no condition")]
    MissingCondition { rule: String },

    #[error("cannot replace rule at index {index}: rule set has {len} rules")]
    IndexOutOfBounds { index: usize, len: usize },
}

/// Evaluation-time failures inside a single rule.
///
/// Captured per rule by the confrontation engine; whether they abort the
/// whole confrontation is governed by the `raise` option.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("unresolved variable '{name}'")]
    UnresolvedVariable { name: String },

    #[error("type error: {detail}")]
    Type { detail: String },

    #[error("arithmetic error: {detail}")]
    Arithmetic { detail: String },

    #[error("operand row counts differ: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("column '{column}' has {got} rows, expected {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        got: usize,
    },

    #[error("expression did not produce a truth value")]
    NotBoolean,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_messages() {
        let err = CompileError::NotValidatingExpression {
            rule: "bad".into(),
        };
        assert_eq!(
            err.to_string(),
            "rule 'bad': expression cannot produce a truth value"
        );

        let err = CompileError::UnknownGroupReference {
            rule: "r1".into(),
            group: "prices".into(),
        };
        assert_eq!(
            err.to_string(),
            "unknown group reference '$prices' in rule 'r1'"
        );

        let err = CompileError::DuplicateRuleName { name: "r".into() };
        assert_eq!(err.to_string(), "duplicate rule name 'r'");
    }

    #[test]
    fn eval_error_messages() {
        let err = EvalError::UnresolvedVariable {
            name: "turnover".into(),
        };
        assert_eq!(err.to_string(), "unresolved variable 'turnover'");

        let err = EvalError::LengthMismatch { left: 3, right: 5 };
        assert_eq!(err.to_string(), "operand row counts differ: 3 vs 5");
    }
}
