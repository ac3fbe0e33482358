use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use nixrs_core::build_result::{BuildMode, KeyedBuildResult};
use nixrs_core::built_path::{BuiltPath, SingleBuiltPath};
use nixrs_core::derived_path::{DerivedPath, SingleDerivedPath};
use nixrs_core::log::Verbosity;
use nixrs_core::store::{Store, select_outputs};
use nixrs_core::store_path::StoreDir;
use tracing::{debug, error, instrument, trace};

use super::missing::{Known, report_missing};
use super::{BuiltPathWithResult, Realise, RealiseContext};
use crate::error::{Error, Result};
use crate::eval::Evaluator;
use crate::installable::{ExtraPathInfo, Installable};

/// One installable that asked for a derived path.
struct Requester {
    installable: Arc<Installable>,
    info: Arc<ExtraPathInfo>,
}

/// Producing derivations resolved while handling one batch.
type Resolved = HashMap<SingleDerivedPath, SingleBuiltPath>;

/// The batch to build together with who asked for each of its paths.
struct Plan {
    batch: Vec<DerivedPath>,
    backmap: HashMap<DerivedPath, Vec<Requester>>,
}

impl Plan {
    fn requesters(&self, path: &DerivedPath) -> &[Requester] {
        self.backmap.get(path).map(Vec::as_slice).unwrap_or_default()
    }
}

impl<S, E, V> RealiseContext<S, E, V>
where
    S: Store,
    E: Store,
    V: Evaluator,
{
    async fn plan(&self, installables: &[Arc<Installable>], read_only: bool) -> Result<Plan> {
        let mut plan = Plan {
            batch: Vec::new(),
            backmap: HashMap::new(),
        };
        for installable in installables {
            self.check_interrupt()?;
            for path in installable
                .to_derived_paths(&self.evaluator, read_only)
                .await?
            {
                let requester = Requester {
                    installable: installable.clone(),
                    info: path.info,
                };
                match plan.backmap.entry(path.path) {
                    Entry::Occupied(mut entry) => entry.get_mut().push(requester),
                    Entry::Vacant(entry) => {
                        plan.batch.push(entry.key().clone());
                        entry.insert(vec![requester]);
                    }
                }
            }
        }
        debug!(paths = plan.batch.len(), "planned build");
        Ok(plan)
    }

    /// Resolves the producing derivation of every built path in `batch` so
    /// the missing report can use them. Paths that cannot be resolved yet
    /// are recorded as unknown.
    async fn resolve_batch(
        &self,
        batch: &[DerivedPath],
        resolved: &mut Resolved,
        known: &mut Known,
    ) -> Result<()> {
        for path in batch {
            let DerivedPath::Built { drv_path, .. } = path else {
                continue;
            };
            if known.drv_paths.contains_key(drv_path) {
                continue;
            }
            let out_path = match self.resolve_input(resolved, drv_path).await {
                Ok(built) => Some(built.out_path().clone()),
                Err(Error::Interrupted) => return Err(Error::Interrupted),
                Err(err) => {
                    trace!(%err, "derivation is not known yet");
                    None
                }
            };
            known.drv_paths.insert((**drv_path).clone(), out_path);
        }
        Ok(())
    }

    /// Resolves `drv_path` once per batch.
    ///
    /// Failed resolutions are not kept since building may make them
    /// resolvable.
    async fn resolve_input(
        &self,
        resolved: &mut Resolved,
        drv_path: &SingleDerivedPath,
    ) -> Result<SingleBuiltPath> {
        if let Some(built) = resolved.get(drv_path) {
            return Ok(built.clone());
        }
        let built = self.get_built_path(drv_path).await?;
        resolved.insert(drv_path.clone(), built.clone());
        Ok(built)
    }

    async fn resolve_without_building(
        &self,
        path: &DerivedPath,
        resolved: &mut Resolved,
        known: &mut Known,
    ) -> Result<BuiltPath> {
        match path {
            DerivedPath::Opaque(path) => Ok(BuiltPath::Opaque(path.clone())),
            DerivedPath::Built { drv_path, outputs } => {
                let drv_path = self.resolve_input(resolved, drv_path).await?;
                let output_map = known
                    .output_map(&self.store, &self.eval_store, drv_path.out_path())
                    .await?;
                let outputs = select_outputs(
                    &self.store.store_dir(),
                    drv_path.out_path(),
                    output_map,
                    outputs,
                )?;
                Ok(BuiltPath::Built {
                    drv_path: Arc::new(drv_path),
                    outputs,
                })
            }
        }
    }

    async fn built_path_from_result(
        &self,
        keyed: &KeyedBuildResult,
        resolved: &mut Resolved,
    ) -> Result<BuiltPath> {
        match &keyed.path {
            DerivedPath::Opaque(path) => Ok(BuiltPath::Opaque(path.clone())),
            DerivedPath::Built { drv_path, outputs } => {
                let drv_path = self.resolve_input(resolved, drv_path).await?;
                let outputs = keyed
                    .result
                    .built_outputs
                    .iter()
                    .filter(|(name, _)| outputs.contains(name))
                    .map(|(name, realisation)| (name.clone(), realisation.out_path.clone()))
                    .collect();
                Ok(BuiltPath::Built {
                    drv_path: Arc::new(drv_path),
                    outputs,
                })
            }
        }
    }

    /// Realises `installables` and pairs every result with the installable
    /// that asked for it.
    ///
    /// Paths requested more than once are built once and the result is
    /// handed to every requester with its own [`ExtraPathInfo`].
    #[instrument(skip(self, installables), fields(installables = installables.len()))]
    pub async fn build2(
        &self,
        mode: Realise,
        build_mode: BuildMode,
        installables: &[Arc<Installable>],
    ) -> Result<Vec<(Arc<Installable>, BuiltPathWithResult)>> {
        let read_only = self.read_only || mode == Realise::Nothing;
        let plan = self.plan(installables, read_only).await?;
        let mut resolved = Resolved::new();
        let mut known = Known::default();
        let mut res = Vec::new();

        match mode {
            Realise::Nothing | Realise::Derivation => {
                self.resolve_batch(&plan.batch, &mut resolved, &mut known).await?;
                report_missing(
                    &self.store,
                    &self.eval_store,
                    &plan.batch,
                    &mut known,
                    Verbosity::Error,
                )
                .await?;
                for path in plan.batch.iter() {
                    let built = self
                        .resolve_without_building(path, &mut resolved, &mut known)
                        .await?;
                    for requester in plan.requesters(path) {
                        res.push((
                            requester.installable.clone(),
                            BuiltPathWithResult {
                                path: built.clone(),
                                info: requester.info.clone(),
                                result: None,
                            },
                        ));
                    }
                }
            }
            Realise::Outputs => {
                if self.settings.print_missing {
                    self.resolve_batch(&plan.batch, &mut resolved, &mut known).await?;
                    report_missing(
                        &self.store,
                        &self.eval_store,
                        &plan.batch,
                        &mut known,
                        Verbosity::Info,
                    )
                    .await?;
                }
                self.check_interrupt()?;
                let results = self
                    .store
                    .build_paths_with_results(
                        &plan.batch,
                        build_mode,
                        self.settings.keep_going,
                        &self.eval_store,
                    )
                    .await?;
                throw_build_errors(&self.store.store_dir(), &results)?;
                for keyed in results.iter() {
                    let requesters = plan.requesters(&keyed.path);
                    if requesters.is_empty() {
                        continue;
                    }
                    let built = self.built_path_from_result(keyed, &mut resolved).await?;
                    for requester in requesters {
                        res.push((
                            requester.installable.clone(),
                            BuiltPathWithResult {
                                path: built.clone(),
                                info: requester.info.clone(),
                                result: Some(keyed.clone()),
                            },
                        ));
                    }
                }
            }
        }
        Ok(res)
    }

    pub async fn build(
        &self,
        mode: Realise,
        build_mode: BuildMode,
        installables: &[Arc<Installable>],
    ) -> Result<Vec<BuiltPathWithResult>> {
        Ok(self
            .build2(mode, build_mode, installables)
            .await?
            .into_iter()
            .map(|(_, result)| result)
            .collect())
    }
}

/// Turns failed build results into an error.
///
/// A single failure is returned as is. Several failures are each logged
/// and summarised by the paths that failed.
pub fn throw_build_errors(store_dir: &StoreDir, results: &[KeyedBuildResult]) -> Result<()> {
    let mut failed: Vec<_> = results
        .iter()
        .filter_map(|keyed| keyed.result.to_error().map(|err| (keyed, err)))
        .collect();
    match failed.len() {
        0 => Ok(()),
        1 => {
            let (_, err) = failed.remove(0);
            Err(Error::Build(err))
        }
        _ => {
            let mut paths: Vec<String> = Vec::with_capacity(failed.len());
            for (keyed, err) in failed {
                if !err.msg.is_empty() {
                    error!(status = ?err.status, "{}", err.msg);
                }
                let path = store_dir.display(&keyed.path).to_string();
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
            Err(Error::BuildFailures(paths))
        }
    }
}
