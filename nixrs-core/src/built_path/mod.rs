//! Derived paths with every level resolved to concrete store paths.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::derived_path::{DerivedPath, OUTPUT_SEPARATOR, OutputName, SingleDerivedPath};
use crate::store_path::{StoreDir, StoreDirDisplay, StorePath, StorePathSet};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SingleBuiltPath {
    Opaque(StorePath),
    Built {
        drv_path: Arc<SingleBuiltPath>,
        output: (OutputName, StorePath),
    },
}

impl SingleBuiltPath {
    pub fn out_path(&self) -> &StorePath {
        match self {
            SingleBuiltPath::Opaque(path) => path,
            SingleBuiltPath::Built { output, .. } => &output.1,
        }
    }

    /// The unresolved form of this path.
    pub fn discard_outputs(&self) -> SingleDerivedPath {
        match self {
            SingleBuiltPath::Opaque(path) => SingleDerivedPath::Opaque(path.clone()),
            SingleBuiltPath::Built { drv_path, output } => {
                SingleDerivedPath::built(drv_path.discard_outputs(), output.0.clone())
            }
        }
    }
}

impl StoreDirDisplay for SingleBuiltPath {
    fn fmt(&self, store_dir: &StoreDir, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SingleBuiltPath::Opaque(path) => write!(f, "{}", store_dir.display(path)),
            SingleBuiltPath::Built { drv_path, output } => write!(
                f,
                "{}{}{}",
                store_dir.display(drv_path.as_ref()),
                OUTPUT_SEPARATOR,
                output.0
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuiltPath {
    Opaque(StorePath),
    Built {
        drv_path: Arc<SingleBuiltPath>,
        outputs: BTreeMap<OutputName, StorePath>,
    },
}

impl BuiltPath {
    pub fn out_paths(&self) -> StorePathSet {
        match self {
            BuiltPath::Opaque(path) => StorePathSet::from([path.clone()]),
            BuiltPath::Built { outputs, .. } => outputs.values().cloned().collect(),
        }
    }

    /// Output paths in output-name order.
    pub fn out_paths_ordered(&self) -> Vec<StorePath> {
        match self {
            BuiltPath::Opaque(path) => vec![path.clone()],
            BuiltPath::Built { outputs, .. } => outputs.values().cloned().collect(),
        }
    }

    pub fn discard_outputs(&self) -> DerivedPath {
        match self {
            BuiltPath::Opaque(path) => DerivedPath::Opaque(path.clone()),
            BuiltPath::Built { drv_path, outputs } => DerivedPath::built(
                drv_path.discard_outputs(),
                crate::derived_path::OutputSpec::Named(outputs.keys().cloned().collect()),
            ),
        }
    }
}

impl From<SingleBuiltPath> for BuiltPath {
    fn from(value: SingleBuiltPath) -> Self {
        match value {
            SingleBuiltPath::Opaque(path) => BuiltPath::Opaque(path),
            SingleBuiltPath::Built {
                drv_path,
                output: (name, path),
            } => BuiltPath::Built {
                drv_path,
                outputs: BTreeMap::from([(name, path)]),
            },
        }
    }
}

impl StoreDirDisplay for BuiltPath {
    fn fmt(&self, store_dir: &StoreDir, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuiltPath::Opaque(path) => write!(f, "{}", store_dir.display(path)),
            BuiltPath::Built { drv_path, outputs } => {
                write!(f, "{}{}", store_dir.display(drv_path.as_ref()), OUTPUT_SEPARATOR)?;
                let mut it = outputs.keys();
                if let Some(name) = it.next() {
                    write!(f, "{}", name)?;
                    for name in it {
                        write!(f, ",{}", name)?;
                    }
                }
                Ok(())
            }
        }
    }
}

pub type BuiltPaths = Vec<BuiltPath>;

#[cfg(test)]
mod unittests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn path(s: &str) -> StorePath {
        s.parse().unwrap()
    }

    fn drv() -> Arc<SingleBuiltPath> {
        Arc::new(SingleBuiltPath::Opaque(path(
            "00000000000000000000000000000000-test.drv",
        )))
    }

    #[test]
    fn single_out_path() {
        let opaque = SingleBuiltPath::Opaque(path("00000000000000000000000000000000-src"));
        assert_eq!(opaque.out_path(), &path("00000000000000000000000000000000-src"));

        let built = SingleBuiltPath::Built {
            drv_path: drv(),
            output: (
                "out".parse().unwrap(),
                path("11111111111111111111111111111111-test"),
            ),
        };
        assert_eq!(built.out_path(), &path("11111111111111111111111111111111-test"));
    }

    #[test]
    fn out_paths() {
        let built = BuiltPath::Built {
            drv_path: drv(),
            outputs: BTreeMap::from([
                ("out".parse().unwrap(), path("11111111111111111111111111111111-test")),
                ("dev".parse().unwrap(), path("22222222222222222222222222222222-test-dev")),
            ]),
        };
        assert_eq!(
            built.out_paths(),
            StorePathSet::from([
                path("11111111111111111111111111111111-test"),
                path("22222222222222222222222222222222-test-dev"),
            ])
        );
        assert_eq!(
            built.out_paths_ordered(),
            vec![
                path("22222222222222222222222222222222-test-dev"),
                path("11111111111111111111111111111111-test"),
            ]
        );
    }

    #[test]
    fn display_and_discard() {
        let store_dir = StoreDir::default();
        let built = BuiltPath::Built {
            drv_path: drv(),
            outputs: BTreeMap::from([
                ("out".parse().unwrap(), path("11111111111111111111111111111111-test")),
                ("dev".parse().unwrap(), path("22222222222222222222222222222222-test-dev")),
            ]),
        };
        assert_eq!(
            store_dir.display(&built).to_string(),
            "/nix/store/00000000000000000000000000000000-test.drv^dev,out"
        );
        assert_eq!(
            store_dir.display(&built.discard_outputs()).to_string(),
            "/nix/store/00000000000000000000000000000000-test.drv^dev,out"
        );
    }

    #[test]
    fn single_into_multi() {
        let single = SingleBuiltPath::Built {
            drv_path: drv(),
            output: ("out".parse().unwrap(), path("11111111111111111111111111111111-test")),
        };
        let multi: BuiltPath = single.into();
        assert_eq!(
            multi.out_paths(),
            StorePathSet::from([path("11111111111111111111111111111111-test")])
        );
    }
}
