use std::fmt;

#[cfg(any(test, feature = "test"))]
use proptest::prelude::*;
use thiserror::Error;

use crate::store_path::{
    FromStoreDirStr, ParseStorePathError, StoreDir, StoreDirDisplay, StorePath, StorePathError,
};

use super::{OutputName, OutputSpec};

/// Separator between a derivation and the outputs requested from it.
pub const OUTPUT_SEPARATOR: char = '^';

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ParseDerivedPathError {
    #[error(transparent)]
    StorePath(#[from] ParseStorePathError),
    #[error("invalid output '{output}' in derived path '{path}': {error}")]
    Output {
        path: String,
        output: String,
        error: StorePathError,
    },
}

/// A store path, or one output of a derivation that may itself be an output.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SingleDerivedPath {
    Opaque(StorePath),
    Built {
        drv_path: Box<SingleDerivedPath>,
        output: OutputName,
    },
}

impl SingleDerivedPath {
    pub fn built(drv_path: SingleDerivedPath, output: OutputName) -> SingleDerivedPath {
        SingleDerivedPath::Built {
            drv_path: Box::new(drv_path),
            output,
        }
    }

    /// The store path at the bottom of the chain.
    pub fn base_store_path(&self) -> &StorePath {
        match self {
            SingleDerivedPath::Opaque(path) => path,
            SingleDerivedPath::Built { drv_path, .. } => drv_path.base_store_path(),
        }
    }

    /// Number of `Built` levels above the base store path.
    pub fn depth(&self) -> usize {
        match self {
            SingleDerivedPath::Opaque(_) => 0,
            SingleDerivedPath::Built { drv_path, .. } => drv_path.depth() + 1,
        }
    }
}

impl StoreDirDisplay for SingleDerivedPath {
    fn fmt(&self, store_dir: &StoreDir, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SingleDerivedPath::Opaque(path) => write!(f, "{}", store_dir.display(path)),
            SingleDerivedPath::Built { drv_path, output } => write!(
                f,
                "{}{}{}",
                store_dir.display(drv_path.as_ref()),
                OUTPUT_SEPARATOR,
                output
            ),
        }
    }
}

impl FromStoreDirStr for SingleDerivedPath {
    type Error = ParseDerivedPathError;

    fn from_store_dir_str(store_dir: &StoreDir, s: &str) -> Result<Self, Self::Error> {
        match s.rsplit_once(OUTPUT_SEPARATOR) {
            Some((prefix, output)) => {
                let drv_path: SingleDerivedPath = store_dir.parse(prefix)?;
                let output = output
                    .parse()
                    .map_err(|error| ParseDerivedPathError::Output {
                        path: s.to_owned(),
                        output: output.to_owned(),
                        error,
                    })?;
                Ok(SingleDerivedPath::built(drv_path, output))
            }
            None => Ok(SingleDerivedPath::Opaque(store_dir.parse::<StorePath>(s)?)),
        }
    }
}

impl From<StorePath> for SingleDerivedPath {
    fn from(value: StorePath) -> Self {
        SingleDerivedPath::Opaque(value)
    }
}

#[cfg(any(test, feature = "test"))]
impl Arbitrary for SingleDerivedPath {
    type Parameters = ();
    type Strategy = BoxedStrategy<SingleDerivedPath>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        use crate::store_path::proptest::arb_drv_store_path;
        let opaque = arb_drv_store_path().prop_map(SingleDerivedPath::Opaque);
        opaque
            .prop_recursive(4, 4, 1, |inner| {
                (inner, any::<OutputName>())
                    .prop_map(|(drv_path, output)| SingleDerivedPath::built(drv_path, output))
            })
            .boxed()
    }
}

/// Like [`SingleDerivedPath`] but a `Built` path requests a set of outputs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DerivedPath {
    Opaque(StorePath),
    Built {
        drv_path: Box<SingleDerivedPath>,
        outputs: OutputSpec,
    },
}

impl DerivedPath {
    pub fn built(drv_path: SingleDerivedPath, outputs: OutputSpec) -> DerivedPath {
        DerivedPath::Built {
            drv_path: Box::new(drv_path),
            outputs,
        }
    }
}

impl StoreDirDisplay for DerivedPath {
    fn fmt(&self, store_dir: &StoreDir, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DerivedPath::Opaque(path) => write!(f, "{}", store_dir.display(path)),
            DerivedPath::Built { drv_path, outputs } => write!(
                f,
                "{}{}{}",
                store_dir.display(drv_path.as_ref()),
                OUTPUT_SEPARATOR,
                outputs
            ),
        }
    }
}

impl FromStoreDirStr for DerivedPath {
    type Error = ParseDerivedPathError;

    fn from_store_dir_str(store_dir: &StoreDir, s: &str) -> Result<Self, Self::Error> {
        match s.rsplit_once(OUTPUT_SEPARATOR) {
            Some((prefix, outputs)) => {
                let drv_path: SingleDerivedPath = store_dir.parse(prefix)?;
                let outputs = outputs
                    .parse()
                    .map_err(|error| ParseDerivedPathError::Output {
                        path: s.to_owned(),
                        output: outputs.to_owned(),
                        error,
                    })?;
                Ok(DerivedPath::built(drv_path, outputs))
            }
            None => Ok(DerivedPath::Opaque(store_dir.parse::<StorePath>(s)?)),
        }
    }
}

impl From<SingleDerivedPath> for DerivedPath {
    fn from(value: SingleDerivedPath) -> Self {
        match value {
            SingleDerivedPath::Opaque(path) => DerivedPath::Opaque(path),
            SingleDerivedPath::Built { drv_path, output } => DerivedPath::Built {
                drv_path,
                outputs: output.into(),
            },
        }
    }
}

#[cfg(any(test, feature = "test"))]
impl Arbitrary for DerivedPath {
    type Parameters = ();
    type Strategy = BoxedStrategy<DerivedPath>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        prop_oneof![
            any::<StorePath>().prop_map(DerivedPath::Opaque),
            (any::<SingleDerivedPath>(), any::<OutputSpec>())
                .prop_map(|(drv_path, outputs)| DerivedPath::built(drv_path, outputs)),
        ]
        .boxed()
    }
}
