//! In-memory [`Store`] that records every request made to it.

use std::collections::{BTreeMap, HashMap};
use std::future::{Future, ready};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::build_result::{
    BuildMode, BuildResult, BuildStatus, KeyedBuildResult, KeyedBuildResults,
};
use crate::derived_path::{DerivedPath, OutputName, SingleDerivedPath};
use crate::store_path::{StoreDir, StorePath, StorePathSet};

use super::{Error, OutputPathMap, Result, Store};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MockRequest {
    IsValidPath(StorePath),
    QueryValidDerivers(StorePath),
    QueryPartialDerivationOutputMap(StorePath),
    BuildPathsWithResults {
        paths: Vec<DerivedPath>,
        mode: BuildMode,
        keep_going: bool,
    },
}

#[derive(Debug, Default, Clone)]
pub struct Builder {
    store_dir: StoreDir,
    valid_paths: StorePathSet,
    derivers: BTreeMap<StorePath, StorePathSet>,
    outputs: BTreeMap<StorePath, OutputPathMap>,
    build_results: HashMap<DerivedPath, BuildResult>,
    build_error: Option<Error>,
}

impl Builder {
    pub fn store_dir(mut self, store_dir: StoreDir) -> Self {
        self.store_dir = store_dir;
        self
    }

    pub fn add_valid_path(mut self, path: StorePath) -> Self {
        self.valid_paths.insert(path);
        self
    }

    pub fn add_deriver(mut self, path: StorePath, deriver: StorePath) -> Self {
        self.derivers.entry(path).or_default().insert(deriver);
        self
    }

    /// Registers an output of `drv_path`; a `Some` path is also made valid.
    pub fn add_output(
        mut self,
        drv_path: StorePath,
        output: &str,
        path: Option<StorePath>,
    ) -> Self {
        let output: OutputName = output
            .parse()
            .unwrap_or_else(|err| panic!("invalid output name {output}: {err}"));
        self.valid_paths.insert(drv_path.clone());
        if let Some(path) = path.as_ref() {
            self.valid_paths.insert(path.clone());
        }
        self.outputs
            .entry(drv_path)
            .or_default()
            .insert(output, path);
        self
    }

    pub fn add_build_result(mut self, path: DerivedPath, result: BuildResult) -> Self {
        self.build_results.insert(path, result);
        self
    }

    /// Makes every batched build call fail with `error`.
    pub fn build_error(mut self, error: Error) -> Self {
        self.build_error = Some(error);
        self
    }

    pub fn build(self) -> MockStore {
        MockStore {
            state: Arc::new(self),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockStore {
    state: Arc<Builder>,
    requests: Arc<Mutex<Vec<MockRequest>>>,
}

impl Default for MockStore {
    fn default() -> Self {
        MockStore::builder().build()
    }
}

impl MockStore {
    pub fn builder() -> Builder {
        Builder::default()
    }

    fn record(&self, request: MockRequest) {
        debug!(?request, "mock store request");
        self.requests.lock().push(request);
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests.lock().clone()
    }

    /// The batches passed to `build_paths_with_results`, in order.
    pub fn build_calls(&self) -> Vec<Vec<DerivedPath>> {
        self.requests
            .lock()
            .iter()
            .filter_map(|request| match request {
                MockRequest::BuildPathsWithResults { paths, .. } => Some(paths.clone()),
                _ => None,
            })
            .collect()
    }

    /// How many output map queries were made for `drv_path`.
    pub fn output_map_queries(&self, drv_path: &StorePath) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|request| {
                matches!(request, MockRequest::QueryPartialDerivationOutputMap(p) if p == drv_path)
            })
            .count()
    }

    fn resolve_static(&self, path: &SingleDerivedPath) -> Option<StorePath> {
        match path {
            SingleDerivedPath::Opaque(path) => Some(path.clone()),
            SingleDerivedPath::Built { drv_path, output } => {
                let drv_path = self.resolve_static(drv_path)?;
                self.state.outputs.get(&drv_path)?.get(output).cloned()?
            }
        }
    }

    fn default_result(&self, path: &DerivedPath) -> BuildResult {
        match path {
            DerivedPath::Opaque(path) => {
                if self.state.valid_paths.contains(path) {
                    BuildResult::new(BuildStatus::AlreadyValid, String::new())
                } else {
                    BuildResult::new(
                        BuildStatus::MiscFailure,
                        format!(
                            "path '{}' is not valid",
                            self.state.store_dir.display(path)
                        ),
                    )
                }
            }
            DerivedPath::Built { drv_path, outputs } => {
                let display = self.state.store_dir.display(path).to_string();
                let Some(drv) = self.resolve_static(drv_path) else {
                    return BuildResult::new(
                        BuildStatus::MiscFailure,
                        format!("cannot build '{display}'"),
                    );
                };
                let Some(output_map) = self.state.outputs.get(&drv) else {
                    return BuildResult::new(
                        BuildStatus::MiscFailure,
                        format!("cannot build '{display}'"),
                    );
                };
                let mut result = BuildResult::new(BuildStatus::Built, String::new());
                for (name, out_path) in output_map {
                    if !outputs.contains(name) {
                        continue;
                    }
                    match out_path {
                        Some(out_path) => {
                            result = result.with_output(name.clone(), out_path.clone());
                        }
                        None => {
                            return BuildResult::new(
                                BuildStatus::MiscFailure,
                                format!("cannot build '{display}'"),
                            );
                        }
                    }
                }
                result
            }
        }
    }
}

impl Store for MockStore {
    fn store_dir(&self) -> StoreDir {
        self.state.store_dir.clone()
    }

    fn is_valid_path<'a>(&'a self, path: &'a StorePath) -> impl Future<Output = Result<bool>> + 'a {
        self.record(MockRequest::IsValidPath(path.clone()));
        ready(Ok(self.state.valid_paths.contains(path)))
    }

    fn query_valid_derivers<'a>(
        &'a self,
        path: &'a StorePath,
    ) -> impl Future<Output = Result<StorePathSet>> + 'a {
        self.record(MockRequest::QueryValidDerivers(path.clone()));
        ready(Ok(self
            .state
            .derivers
            .get(path)
            .cloned()
            .unwrap_or_default()))
    }

    fn query_partial_derivation_output_map<'a, E>(
        &'a self,
        drv_path: &'a StorePath,
        _eval_store: &'a E,
    ) -> impl Future<Output = Result<OutputPathMap>> + 'a
    where
        E: Store + ?Sized,
    {
        self.record(MockRequest::QueryPartialDerivationOutputMap(
            drv_path.clone(),
        ));
        let ret = match self.state.outputs.get(drv_path) {
            Some(outputs) => Ok(outputs.clone()),
            None => Err(Error::InvalidPath(
                self.state.store_dir.display(drv_path).to_string(),
            )),
        };
        ready(ret)
    }

    fn build_paths_with_results<'a, E>(
        &'a self,
        paths: &'a [DerivedPath],
        mode: BuildMode,
        keep_going: bool,
        _eval_store: &'a E,
    ) -> impl Future<Output = Result<KeyedBuildResults>> + 'a
    where
        E: Store + ?Sized,
    {
        self.record(MockRequest::BuildPathsWithResults {
            paths: paths.to_vec(),
            mode,
            keep_going,
        });
        let ret = match self.state.build_error.clone() {
            Some(err) => Err(err),
            None => Ok(paths
                .iter()
                .map(|path| KeyedBuildResult {
                    path: path.clone(),
                    result: self
                        .state
                        .build_results
                        .get(path)
                        .cloned()
                        .unwrap_or_else(|| self.default_result(path)),
                })
                .collect()),
        };
        ready(ret)
    }
}

#[cfg(test)]
mod unittests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn path(s: &str) -> StorePath {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn records_requests() {
        let store = MockStore::builder()
            .add_valid_path(path("00000000000000000000000000000000-src"))
            .add_deriver(
                path("00000000000000000000000000000000-src"),
                path("11111111111111111111111111111111-src.drv"),
            )
            .build();
        assert!(
            store
                .is_valid_path(&path("00000000000000000000000000000000-src"))
                .await
                .unwrap()
        );
        let derivers = store
            .query_valid_derivers(&path("00000000000000000000000000000000-src"))
            .await
            .unwrap();
        assert_eq!(
            derivers,
            StorePathSet::from([path("11111111111111111111111111111111-src.drv")])
        );
        assert_eq!(
            store.requests(),
            vec![
                MockRequest::IsValidPath(path("00000000000000000000000000000000-src")),
                MockRequest::QueryValidDerivers(path("00000000000000000000000000000000-src")),
            ]
        );
    }

    #[tokio::test]
    async fn default_build_results() {
        let drv = path("00000000000000000000000000000000-a.drv");
        let store = MockStore::builder()
            .add_output(drv.clone(), "out", Some(path("11111111111111111111111111111111-a")))
            .add_output(drv.clone(), "dev", Some(path("22222222222222222222222222222222-a-dev")))
            .build();
        let paths = vec![
            DerivedPath::built(SingleDerivedPath::Opaque(drv.clone()), "out".parse().unwrap()),
            DerivedPath::Opaque(path("33333333333333333333333333333333-missing")),
        ];
        let results = store
            .build_paths_with_results(&paths, BuildMode::Normal, false, &store)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].result.success());
        assert_eq!(results[0].result.built_outputs.len(), 1);
        assert!(!results[1].result.success());
        assert_eq!(store.build_calls(), vec![paths]);
    }
}
