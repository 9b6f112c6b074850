use super::error::CompileError;
use super::Value;

/// Failure policy for a confrontation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RaisePolicy {
    /// Abort the confrontation on the first evaluation error.
    Errors,
    /// Abort on the first error or warning.
    All,
    /// Capture everything as result-level diagnostics.
    #[default]
    None,
}

/// The effective option set attached to a rule set (and, after applying
/// per-rule overrides, to each rule during confrontation).
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Failure policy (`raise`).
    pub raise: RaisePolicy,
    /// Substitute for indeterminate outcomes in summary aggregates
    /// (`na.value`). `None` keeps them indeterminate; stored per-record
    /// outcomes are never substituted.
    pub na_value: Option<bool>,
    /// Boundary tolerance for linear inequality comparisons
    /// (`lin.ineq.eps`).
    pub lin_ineq_eps: f64,
    /// Attach dependency-graph block indices to results (`sequential`).
    pub sequential: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            raise: RaisePolicy::None,
            na_value: None,
            lin_ineq_eps: 1e-8,
            sequential: false,
        }
    }
}

impl Options {
    /// Resolve a stack of partial layers over the built-in defaults.
    /// Later layers override earlier ones key-by-key; unset keys fall
    /// through.
    #[must_use]
    pub fn resolve<'a>(layers: impl IntoIterator<Item = &'a OptionsLayer>) -> Options {
        layers
            .into_iter()
            .fold(Options::default(), |base, layer| layer.apply(&base))
    }
}

/// A partial option layer: only the keys that are set override the layer
/// below.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionsLayer {
    raise: Option<RaisePolicy>,
    na_value: Option<Option<bool>>,
    lin_ineq_eps: Option<f64>,
    sequential: Option<bool>,
}

impl OptionsLayer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no key is set in this layer.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    #[must_use]
    pub fn raise(mut self, policy: RaisePolicy) -> Self {
        self.raise = Some(policy);
        self
    }

    #[must_use]
    pub fn na_value(mut self, value: Option<bool>) -> Self {
        self.na_value = Some(value);
        self
    }

    #[must_use]
    pub fn lin_ineq_eps(mut self, eps: f64) -> Self {
        self.lin_ineq_eps = Some(eps);
        self
    }

    #[must_use]
    pub fn sequential(mut self, on: bool) -> Self {
        self.sequential = Some(on);
        self
    }

    /// Set an option by its declaration-stream key.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::UnrecognizedOption`] for an unknown key and
    /// [`CompileError::InvalidOptionValue`] for a value of the wrong shape.
    pub fn set(&mut self, key: &str, value: &Value) -> Result<(), CompileError> {
        match key {
            "raise" => {
                let policy = match value {
                    Value::Str(s) if s == "errors" => RaisePolicy::Errors,
                    Value::Str(s) if s == "all" => RaisePolicy::All,
                    Value::Str(s) if s == "none" => RaisePolicy::None,
                    other => {
                        return Err(CompileError::InvalidOptionValue {
                            key: key.to_owned(),
                            reason: format!("expected \"errors\", \"all\" or \"none\", got {other}"),
                        })
                    }
                };
                self.raise = Some(policy);
            }
            "na.value" => {
                let v = match value {
                    Value::Bool(b) => Some(*b),
                    Value::Na => None,
                    other => {
                        return Err(CompileError::InvalidOptionValue {
                            key: key.to_owned(),
                            reason: format!("expected true, false or NA, got {other}"),
                        })
                    }
                };
                self.na_value = Some(v);
            }
            "lin.ineq.eps" => {
                #[allow(clippy::cast_precision_loss)]
                let eps = match value {
                    Value::Float(f) if *f >= 0.0 => *f,
                    Value::Int(i) if *i >= 0 => *i as f64,
                    other => {
                        return Err(CompileError::InvalidOptionValue {
                            key: key.to_owned(),
                            reason: format!("expected a non-negative number, got {other}"),
                        })
                    }
                };
                self.lin_ineq_eps = Some(eps);
            }
            "sequential" => {
                let Value::Bool(b) = value else {
                    return Err(CompileError::InvalidOptionValue {
                        key: key.to_owned(),
                        reason: format!("expected true or false, got {value}"),
                    });
                };
                self.sequential = Some(*b);
            }
            _ => {
                return Err(CompileError::UnrecognizedOption {
                    key: key.to_owned(),
                })
            }
        }
        Ok(())
    }

    /// Like [`set`](Self::set), but silently skips unrecognized keys.
    /// Used when merging externally authored configuration. Returns whether
    /// the key was recognized. Values of the wrong shape still error.
    pub fn set_lenient(&mut self, key: &str, value: &Value) -> Result<bool, CompileError> {
        match self.set(key, value) {
            Ok(()) => Ok(true),
            Err(CompileError::UnrecognizedOption { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Apply this layer on top of a fully resolved base.
    #[must_use]
    pub fn apply(&self, base: &Options) -> Options {
        Options {
            raise: self.raise.unwrap_or(base.raise),
            na_value: self.na_value.unwrap_or(base.na_value),
            lin_ineq_eps: self.lin_ineq_eps.unwrap_or(base.lin_ineq_eps),
            sequential: self.sequential.unwrap_or(base.sequential),
        }
    }
}
