use nixrs_core::build_result::BuildError;
use nixrs_core::derived_path::ParseDerivedPathError;
use nixrs_core::store;
use thiserror::Error;

use crate::eval::EvalError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("{0}")]
    Usage(String),
    #[error("unrecognised installable '{0}'")]
    UnrecognisedInstallable(String),
    #[error(transparent)]
    BadInstallable(#[from] ParseDerivedPathError),
    #[error("'{0}' does not have a known deriver")]
    MissingDeriver(String),
    #[error("argument '{0}' did not evaluate to a derivation")]
    NotADerivation(String),
    #[error("argument '{0}' should evaluate to one store path")]
    NotOneStorePath(String),
    #[error(
        "installable '{installable}' evaluates to {count} derivations, where only one is expected"
    )]
    NotOneDerivedPath { installable: String, count: usize },
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("build of {} failed", quoted(.0))]
    BuildFailures(Vec<String>),
    #[error(transparent)]
    Store(#[from] store::Error),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error("interrupted by the user")]
    Interrupted,
}

fn quoted(paths: &[String]) -> String {
    paths
        .iter()
        .map(|path| format!("'{path}'"))
        .collect::<Vec<_>>()
        .join(", ")
}
