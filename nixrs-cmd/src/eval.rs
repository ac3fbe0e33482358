//! The expression evaluator seam used by attribute path installables.

use std::collections::BTreeSet;
use std::fmt;
use std::future::{Future, ready};
use std::path::PathBuf;

use nixrs_core::derived_path::OutputName;
use nixrs_core::store_path::StorePath;
use thiserror::Error;

/// Where the expression that attribute paths are evaluated against comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExprSource {
    File(PathBuf),
    Stdin,
    Expr(String),
}

impl fmt::Display for ExprSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprSource::File(path) => write!(f, "file '{}'", path.display()),
            ExprSource::Stdin => f.write_str("standard input"),
            ExprSource::Expr(_) => f.write_str("expression"),
        }
    }
}

/// A derivation found while evaluating an attribute path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageInfo {
    pub drv_path: StorePath,
    /// Outputs installed when no outputs are requested explicitly.
    pub outputs_to_install: BTreeSet<OutputName>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("evaluating installables requires an evaluator")]
    NoEvaluator,
    #[error("attribute '{attr_path}' in {source_desc} does not exist")]
    MissingAttribute {
        attr_path: String,
        source_desc: String,
    },
    #[error("{0}")]
    Custom(String),
}

pub trait Evaluator {
    /// Evaluates `attr_path` in `source` to the derivations it contains.
    ///
    /// When `read_only` is set derivations must not be written to the store.
    fn eval_derivations<'a>(
        &'a self,
        source: &'a ExprSource,
        attr_path: &'a str,
        read_only: bool,
    ) -> impl Future<Output = Result<Vec<PackageInfo>, EvalError>> + 'a;
}

impl<V> Evaluator for &V
where
    V: Evaluator + ?Sized,
{
    fn eval_derivations<'a>(
        &'a self,
        source: &'a ExprSource,
        attr_path: &'a str,
        read_only: bool,
    ) -> impl Future<Output = Result<Vec<PackageInfo>, EvalError>> + 'a {
        (**self).eval_derivations(source, attr_path, read_only)
    }
}

/// Evaluator for contexts that only ever see literal store paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEvaluator;

impl Evaluator for NoEvaluator {
    fn eval_derivations<'a>(
        &'a self,
        _source: &'a ExprSource,
        _attr_path: &'a str,
        _read_only: bool,
    ) -> impl Future<Output = Result<Vec<PackageInfo>, EvalError>> + 'a {
        ready(Err(EvalError::NoEvaluator))
    }
}
