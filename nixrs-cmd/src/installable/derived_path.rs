use std::sync::Arc;

use nixrs_core::derived_path::{DerivedPath, ParseDerivedPathError, SingleDerivedPath};
use nixrs_core::store_path::{StoreDir, StorePath};

use super::{DerivedPathWithInfo, ExtendedOutputsSpec, ExtraPathInfo};

/// An installable given literally as a store path or derived path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallableDerivedPath {
    store_dir: StoreDir,
    pub derived_path: DerivedPath,
}

impl InstallableDerivedPath {
    pub fn new(store_dir: StoreDir, derived_path: DerivedPath) -> InstallableDerivedPath {
        InstallableDerivedPath {
            store_dir,
            derived_path,
        }
    }

    /// Parses the part of an installable before its outputs spec.
    ///
    /// Without outputs the prefix must be a plain store path. With outputs it
    /// names the derivation to take them from, which may itself be an output.
    pub fn parse(
        store_dir: &StoreDir,
        prefix: &str,
        outputs: ExtendedOutputsSpec,
    ) -> Result<InstallableDerivedPath, ParseDerivedPathError> {
        let derived_path = match outputs {
            ExtendedOutputsSpec::Default => {
                DerivedPath::Opaque(store_dir.parse::<StorePath>(prefix)?)
            }
            ExtendedOutputsSpec::Explicit(outputs) => {
                DerivedPath::built(store_dir.parse::<SingleDerivedPath>(prefix)?, outputs)
            }
        };
        Ok(InstallableDerivedPath::new(store_dir.clone(), derived_path))
    }

    pub fn what(&self) -> String {
        self.store_dir.display(&self.derived_path).to_string()
    }

    pub fn to_derived_paths(&self) -> Vec<DerivedPathWithInfo> {
        vec![DerivedPathWithInfo {
            path: self.derived_path.clone(),
            info: Arc::new(ExtraPathInfo::default()),
        }]
    }
}
