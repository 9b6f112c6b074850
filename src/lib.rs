mod classify;
mod confront;
mod error;
mod expand;
mod graph;
pub mod parse;
mod types;

pub use error::ConfrontError;
pub use expand::{expand, Entry, Expanded, RuleDecl};
pub use graph::{Block, DependencyGraph};
pub use parse::ParseError;
pub use types::{
    dataset, funcdep, group, is_bool, is_numeric, is_string, lit, var, ArithOp, CompareOp,
    CompileError, Confrontation, DataEnv, DataSet, EvalError, Expr, LinearCoefficients, Options,
    OptionsLayer, Origin, Outcome, RaisePolicy, RecordRow, Rule, RuleBuilder, RuleKind, RuleResult,
    RuleSet, RuleSetBuilder, RuleSummary, SetExpr, TypePredicate, Value,
};
