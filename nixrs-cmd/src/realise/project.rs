use std::sync::Arc;

use nixrs_core::build_result::BuildMode;
use nixrs_core::built_path::BuiltPath;
use nixrs_core::derived_path::DerivedPath;
use nixrs_core::store::Store;
use nixrs_core::store_path::{StorePath, StorePathSet};
use tracing::debug;

use super::{OperateOn, Realise, RealiseContext};
use crate::error::{Error, Result};
use crate::eval::Evaluator;
use crate::installable::Installable;

impl<S, E, V> RealiseContext<S, E, V>
where
    S: Store,
    E: Store,
    V: Evaluator,
{
    pub async fn to_built_paths(
        &self,
        mode: Realise,
        operate_on: OperateOn,
        installables: &[Arc<Installable>],
    ) -> Result<Vec<BuiltPath>> {
        match operate_on {
            OperateOn::Output => Ok(self
                .build(mode, BuildMode::Normal, installables)
                .await?
                .into_iter()
                .map(|result| result.path)
                .collect()),
            OperateOn::Derivation => {
                let read_only = self.read_only || mode == Realise::Nothing;
                Ok(self
                    .derivations(installables, true, read_only)
                    .await?
                    .into_iter()
                    .map(BuiltPath::Opaque)
                    .collect())
            }
        }
    }

    pub async fn to_store_path_set(
        &self,
        mode: Realise,
        operate_on: OperateOn,
        installables: &[Arc<Installable>],
    ) -> Result<StorePathSet> {
        let mut out_paths = StorePathSet::new();
        for path in self.to_built_paths(mode, operate_on, installables).await? {
            out_paths.extend(path.out_paths());
        }
        Ok(out_paths)
    }

    /// Like [`RealiseContext::to_store_path_set`] but keeps the order of
    /// the installables and any duplicates.
    pub async fn to_store_paths(
        &self,
        mode: Realise,
        operate_on: OperateOn,
        installables: &[Arc<Installable>],
    ) -> Result<Vec<StorePath>> {
        Ok(self
            .to_built_paths(mode, operate_on, installables)
            .await?
            .iter()
            .flat_map(BuiltPath::out_paths_ordered)
            .collect())
    }

    pub async fn to_store_path(
        &self,
        mode: Realise,
        operate_on: OperateOn,
        installable: Arc<Installable>,
    ) -> Result<StorePath> {
        let paths = self
            .to_store_path_set(mode, operate_on, &[installable.clone()])
            .await?;
        if paths.len() != 1 {
            return Err(Error::NotOneStorePath(installable.what()));
        }
        paths
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotOneStorePath(installable.what()))
    }

    /// The derivations behind `installables`.
    ///
    /// With `use_deriver` a store path that is not a derivation is replaced
    /// by the derivation recorded as having produced it.
    pub async fn to_derivations(
        &self,
        installables: &[Arc<Installable>],
        use_deriver: bool,
    ) -> Result<StorePathSet> {
        self.derivations(installables, use_deriver, self.read_only)
            .await
    }

    async fn derivations(
        &self,
        installables: &[Arc<Installable>],
        use_deriver: bool,
        read_only: bool,
    ) -> Result<StorePathSet> {
        let mut drv_paths = StorePathSet::new();
        for installable in installables {
            self.check_interrupt()?;
            for derived in installable
                .to_derived_paths(&self.evaluator, read_only)
                .await?
            {
                match &derived.path {
                    DerivedPath::Opaque(path) if path.is_derivation() => {
                        drv_paths.insert(path.clone());
                    }
                    DerivedPath::Opaque(path) if use_deriver => {
                        let derivers = self.store.query_valid_derivers(path).await?;
                        let Some(deriver) = derivers.iter().next() else {
                            return Err(Error::MissingDeriver(installable.what()));
                        };
                        if derivers.len() > 1 {
                            let store_dir = self.store.store_dir();
                            debug!(
                                path = %store_dir.display(path),
                                deriver = %store_dir.display(deriver),
                                candidates = derivers.len(),
                                "picked deriver"
                            );
                        }
                        drv_paths.insert(deriver.clone());
                    }
                    DerivedPath::Opaque(_) => {
                        return Err(Error::NotADerivation(installable.what()));
                    }
                    DerivedPath::Built { drv_path, .. } => {
                        let built = self.get_built_path(drv_path).await?;
                        drv_paths.insert(built.out_path().clone());
                    }
                }
            }
        }
        Ok(drv_paths)
    }
}
