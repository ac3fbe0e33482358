use std::collections::BTreeMap;
use std::future::Future;

use crate::build_result::{BuildMode, KeyedBuildResults};
use crate::derived_path::{DerivedPath, OutputName};
use crate::store_path::{StoreDir, StorePath, StorePathSet};

mod error;
#[cfg(any(test, feature = "test"))]
pub mod mock;
mod resolve;

pub use error::Error;
pub use resolve::{
    resolve_output, resolve_outputs, resolve_single_derived_path, select_outputs,
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Map from the outputs of a derivation to their paths, when known.
pub type OutputPathMap = BTreeMap<OutputName, Option<StorePath>>;

/// The store and build executor the installables layer talks to.
pub trait Store {
    fn store_dir(&self) -> StoreDir;

    fn is_valid_path<'a>(&'a self, path: &'a StorePath) -> impl Future<Output = Result<bool>> + 'a;

    /// Derivations on record as having produced `path`.
    fn query_valid_derivers<'a>(
        &'a self,
        path: &'a StorePath,
    ) -> impl Future<Output = Result<StorePathSet>> + 'a;

    /// Every output of `drv_path`, with the output path if it is known.
    ///
    /// The derivation itself is read from `eval_store`.
    fn query_partial_derivation_output_map<'a, E>(
        &'a self,
        drv_path: &'a StorePath,
        eval_store: &'a E,
    ) -> impl Future<Output = Result<OutputPathMap>> + 'a
    where
        E: Store + ?Sized;

    /// Builds all of `paths` in one batch and returns one result per path.
    ///
    /// With `keep_going` the executor carries on with the rest of the batch
    /// after a build failed.
    fn build_paths_with_results<'a, E>(
        &'a self,
        paths: &'a [DerivedPath],
        mode: BuildMode,
        keep_going: bool,
        eval_store: &'a E,
    ) -> impl Future<Output = Result<KeyedBuildResults>> + 'a
    where
        E: Store + ?Sized;
}

impl<S> Store for &S
where
    S: Store + ?Sized,
{
    fn store_dir(&self) -> StoreDir {
        (**self).store_dir()
    }

    fn is_valid_path<'a>(&'a self, path: &'a StorePath) -> impl Future<Output = Result<bool>> + 'a {
        (**self).is_valid_path(path)
    }

    fn query_valid_derivers<'a>(
        &'a self,
        path: &'a StorePath,
    ) -> impl Future<Output = Result<StorePathSet>> + 'a {
        (**self).query_valid_derivers(path)
    }

    fn query_partial_derivation_output_map<'a, E>(
        &'a self,
        drv_path: &'a StorePath,
        eval_store: &'a E,
    ) -> impl Future<Output = Result<OutputPathMap>> + 'a
    where
        E: Store + ?Sized,
    {
        (**self).query_partial_derivation_output_map(drv_path, eval_store)
    }

    fn build_paths_with_results<'a, E>(
        &'a self,
        paths: &'a [DerivedPath],
        mode: BuildMode,
        keep_going: bool,
        eval_store: &'a E,
    ) -> impl Future<Output = Result<KeyedBuildResults>> + 'a
    where
        E: Store + ?Sized,
    {
        (**self).build_paths_with_results(paths, mode, keep_going, eval_store)
    }
}
