use std::sync::Arc;

use nixrs_core::derived_path::DerivedPath;

use crate::error::{Error, Result};
use crate::eval::Evaluator;

mod attr_path;
mod derived_path;
mod outputs_spec;

pub use attr_path::InstallableAttrPath;
pub use derived_path::InstallableDerivedPath;
pub use outputs_spec::ExtendedOutputsSpec;

/// Metadata about how a derived path was requested.
///
/// It is handed back unchanged next to the result built for that path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ExtraPathInfo {
    pub attr_path: Option<String>,
    pub extended_outputs_spec: Option<ExtendedOutputsSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedPathWithInfo {
    pub path: DerivedPath,
    pub info: Arc<ExtraPathInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Installable {
    DerivedPath(InstallableDerivedPath),
    AttrPath(InstallableAttrPath),
}

pub type Installables = Vec<Arc<Installable>>;

impl Installable {
    /// Human readable description used in diagnostics.
    pub fn what(&self) -> String {
        match self {
            Installable::DerivedPath(installable) => installable.what(),
            Installable::AttrPath(installable) => installable.what(),
        }
    }

    pub async fn to_derived_paths<V>(
        &self,
        evaluator: &V,
        read_only: bool,
    ) -> Result<Vec<DerivedPathWithInfo>>
    where
        V: Evaluator + ?Sized,
    {
        match self {
            Installable::DerivedPath(installable) => Ok(installable.to_derived_paths()),
            Installable::AttrPath(installable) => {
                Ok(installable.to_derived_paths(evaluator, read_only).await?)
            }
        }
    }

    /// Like [`Installable::to_derived_paths`] but there must be exactly one.
    pub async fn to_derived_path<V>(
        &self,
        evaluator: &V,
        read_only: bool,
    ) -> Result<DerivedPathWithInfo>
    where
        V: Evaluator + ?Sized,
    {
        let mut paths = self.to_derived_paths(evaluator, read_only).await?;
        if paths.len() != 1 {
            return Err(Error::NotOneDerivedPath {
                installable: self.what(),
                count: paths.len(),
            });
        }
        Ok(paths.remove(0))
    }
}

impl From<InstallableDerivedPath> for Installable {
    fn from(value: InstallableDerivedPath) -> Self {
        Installable::DerivedPath(value)
    }
}

impl From<InstallableAttrPath> for Installable {
    fn from(value: InstallableAttrPath) -> Self {
        Installable::AttrPath(value)
    }
}
