use std::path::PathBuf;
use std::sync::Arc;

use nixrs_core::derived_path::ParseDerivedPathError;
use nixrs_core::store_path::StoreDir;
use tracing::trace;

use crate::error::{Error, Result};
use crate::eval::ExprSource;
use crate::installable::{
    ExtendedOutputsSpec, Installable, InstallableAttrPath, InstallableDerivedPath, Installables,
};

/// Where attribute path installables are evaluated from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceArgs {
    pub file: Option<String>,
    pub expr: Option<String>,
}

impl SourceArgs {
    fn source(&self) -> Result<Option<ExprSource>> {
        match (&self.file, &self.expr) {
            (Some(_), Some(_)) => Err(Error::Usage("'--file' and '--expr' are exclusive".into())),
            (Some(file), None) if file == "-" => Ok(Some(ExprSource::Stdin)),
            (Some(file), None) => Ok(Some(ExprSource::File(PathBuf::from(file)))),
            (None, Some(expr)) => Ok(Some(ExprSource::Expr(expr.clone()))),
            (None, None) => Ok(None),
        }
    }
}

/// `Ok(None)` when the string is not an installable of this kind.
type ParseAttempt = fn(&StoreDir, &str, &ExtendedOutputsSpec) -> Result<Option<Installable>>;

const PARSE_ATTEMPTS: &[ParseAttempt] = &[parse_derived_path];

fn parse_derived_path(
    store_dir: &StoreDir,
    prefix: &str,
    outputs: &ExtendedOutputsSpec,
) -> Result<Option<Installable>> {
    if !prefix.contains('/') {
        return Ok(None);
    }
    match InstallableDerivedPath::parse(store_dir, prefix, outputs.clone()) {
        Ok(installable) => Ok(Some(installable.into())),
        Err(ParseDerivedPathError::StorePath(err)) => {
            trace!(%prefix, %err, "not a derived path");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

fn parse_one(
    store_dir: &StoreDir,
    source: Option<&Arc<ExprSource>>,
    s: &str,
) -> Result<Installable> {
    let (prefix, outputs) = ExtendedOutputsSpec::parse(s)?;
    if let Some(source) = source {
        return Ok(InstallableAttrPath::new(source.clone(), prefix, outputs).into());
    }
    let mut first_error = None;
    for attempt in PARSE_ATTEMPTS {
        match attempt(store_dir, prefix, &outputs) {
            Ok(Some(installable)) => return Ok(installable),
            Ok(None) => {}
            Err(err) => {
                first_error.get_or_insert(err);
            }
        }
    }
    Err(first_error.unwrap_or_else(|| Error::UnrecognisedInstallable(s.to_owned())))
}

/// Parses command line installables.
///
/// With a file or expression source every string is an attribute path into
/// it. Otherwise each string is tried against the known literal kinds in
/// order and the first that accepts it wins.
pub fn parse_installables<S>(
    store_dir: &StoreDir,
    source: &SourceArgs,
    strings: &[S],
) -> Result<Installables>
where
    S: AsRef<str>,
{
    let source = source.source()?.map(Arc::new);
    strings
        .iter()
        .map(|s| Ok(Arc::new(parse_one(store_dir, source.as_ref(), s.as_ref())?)))
        .collect()
}

pub fn parse_installable(
    store_dir: &StoreDir,
    source: &SourceArgs,
    s: &str,
) -> Result<Arc<Installable>> {
    let mut installables = parse_installables(store_dir, source, &[s])?;
    installables
        .pop()
        .ok_or_else(|| Error::UnrecognisedInstallable(s.to_owned()))
}
