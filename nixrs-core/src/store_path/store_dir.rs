use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const NIX_STORE_DIR: &str = "/nix/store";

/// Types that are rendered relative to a store directory.
pub trait StoreDirDisplay {
    fn fmt(&self, store_dir: &StoreDir, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl<T: StoreDirDisplay + ?Sized> StoreDirDisplay for &T {
    fn fmt(&self, store_dir: &StoreDir, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (**self).fmt(store_dir, f)
    }
}

/// Types that are parsed from strings containing absolute store paths.
pub trait FromStoreDirStr: Sized {
    type Error: std::error::Error;

    fn from_store_dir_str(store_dir: &StoreDir, s: &str) -> Result<Self, Self::Error>;
}

pub struct DisplayStorePath<'a, P: ?Sized> {
    store_dir: &'a StoreDir,
    path: &'a P,
}

impl<P: StoreDirDisplay + ?Sized> fmt::Display for DisplayStorePath<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.path.fmt(self.store_dir, f)
    }
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum StoreDirError {
    #[error("store directory '{0}' is not absolute")]
    NonAbsolute(String),
    #[error("store directory '{0}' is not valid UTF-8")]
    NonUtf8(String),
}

/// The directory all store paths live under, `/nix/store` unless configured.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StoreDir(Arc<str>);

impl StoreDir {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<StoreDir, StoreDirError> {
        let path = path.as_ref();
        let Some(s) = path.to_str() else {
            return Err(StoreDirError::NonUtf8(path.to_string_lossy().into_owned()));
        };
        if !path.is_absolute() {
            return Err(StoreDirError::NonAbsolute(s.to_owned()));
        }
        let s = s.trim_end_matches('/');
        let s = if s.is_empty() { "/" } else { s };
        Ok(StoreDir(Arc::from(s)))
    }

    pub fn to_str(&self) -> &str {
        &self.0
    }

    pub fn to_path(&self) -> &Path {
        Path::new(&*self.0)
    }

    pub fn parse<T: FromStoreDirStr>(&self, s: &str) -> Result<T, T::Error> {
        T::from_store_dir_str(self, s)
    }

    pub fn display<'a, P>(&'a self, path: &'a P) -> DisplayStorePath<'a, P>
    where
        P: StoreDirDisplay + ?Sized,
    {
        DisplayStorePath {
            store_dir: self,
            path,
        }
    }
}

impl Default for StoreDir {
    fn default() -> Self {
        StoreDir(Arc::from(NIX_STORE_DIR))
    }
}

impl fmt::Debug for StoreDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StoreDir").field(&self.0).finish()
    }
}

impl fmt::Display for StoreDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<Path> for StoreDir {
    fn as_ref(&self) -> &Path {
        self.to_path()
    }
}

impl FromStr for StoreDir {
    type Err = StoreDirError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StoreDir::new(s)
    }
}

impl TryFrom<String> for StoreDir {
    type Error = StoreDirError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        StoreDir::new(value)
    }
}

impl From<StoreDir> for String {
    fn from(value: StoreDir) -> Self {
        value.0.to_string()
    }
}

#[cfg(any(test, feature = "test"))]
pub mod proptest {
    use ::proptest::prelude::*;

    use super::StoreDir;

    pub fn arb_store_dir() -> impl Strategy<Value = StoreDir> {
        prop_oneof![
            Just(StoreDir::default()),
            "(/[a-z][a-z0-9]{0,8}){1,3}".prop_map(|s| StoreDir::new(s).unwrap()),
        ]
    }

    impl Arbitrary for StoreDir {
        type Parameters = ();
        type Strategy = BoxedStrategy<StoreDir>;

        fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
            arb_store_dir().boxed()
        }
    }
}
