mod dataset;
mod error;
mod expr;
mod options;
mod result;
mod rule;
mod ruleset;
mod value;

pub use dataset::{DataEnv, DataSet};
pub use error::{CompileError, EvalError};
pub use expr::{
    dataset, funcdep, group, is_bool, is_numeric, is_string, lit, var, ArithOp, CompareOp, Expr,
    SetExpr, TypePredicate,
};
pub use options::{Options, OptionsLayer, RaisePolicy};
pub use result::{Confrontation, Outcome, RecordRow, RuleResult, RuleSummary};
pub use rule::{LinearCoefficients, Origin, Rule, RuleKind};
pub use ruleset::{RuleBuilder, RuleSet, RuleSetBuilder};
pub use value::Value;
