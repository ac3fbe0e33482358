use std::collections::HashMap;
use std::collections::hash_map::Entry;

use nixrs_core::derived_path::{DerivedPath, OutputSpec, SingleDerivedPath};
use nixrs_core::event_at;
use nixrs_core::log::Verbosity;
use nixrs_core::store::{self, OutputPathMap, Store, resolve_single_derived_path};
use nixrs_core::store_path::StorePath;
use tracing::trace;

use crate::error::Result;

/// Derivations looked up while handling one batch.
///
/// `drv_paths` holds the concrete derivation behind every producing path
/// that was tried, `None` when it could not be resolved yet.
#[derive(Debug, Default)]
pub(super) struct Known {
    pub(super) drv_paths: HashMap<SingleDerivedPath, Option<StorePath>>,
    output_maps: HashMap<StorePath, OutputPathMap>,
}

impl Known {
    /// The output map of `drv_path`, queried at most once per batch.
    pub(super) async fn output_map<S, E>(
        &mut self,
        store: &S,
        eval_store: &E,
        drv_path: &StorePath,
    ) -> store::Result<&OutputPathMap>
    where
        S: Store + ?Sized,
        E: Store + ?Sized,
    {
        match self.output_maps.entry(drv_path.clone()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let output_map = store
                    .query_partial_derivation_output_map(drv_path, eval_store)
                    .await?;
                Ok(entry.insert(output_map))
            }
        }
    }
}

async fn built_is_missing<S, E>(
    store: &S,
    eval_store: &E,
    known: &mut Known,
    drv_path: &SingleDerivedPath,
    outputs: &OutputSpec,
) -> Result<bool>
where
    S: Store + ?Sized,
    E: Store + ?Sized,
{
    let Some(Some(drv_path)) = known.drv_paths.get(drv_path).cloned() else {
        return Ok(true);
    };
    let output_map = match known.output_map(store, eval_store, &drv_path).await {
        Ok(output_map) => output_map,
        Err(err) => {
            trace!(%err, "outputs are not known yet");
            return Ok(true);
        }
    };
    if let OutputSpec::Named(names) = outputs {
        if names.iter().any(|name| !output_map.contains_key(name)) {
            return Ok(true);
        }
    }
    for (name, out_path) in output_map.iter() {
        if !outputs.contains(name) {
            continue;
        }
        let Some(out_path) = out_path else {
            return Ok(true);
        };
        if !store.is_valid_path(out_path).await? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Reports the paths in `paths` missing from the store using derivations
/// already resolved into `known`.
pub(super) async fn report_missing<S, E>(
    store: &S,
    eval_store: &E,
    paths: &[DerivedPath],
    known: &mut Known,
    level: Verbosity,
) -> Result<Vec<DerivedPath>>
where
    S: Store + ?Sized,
    E: Store + ?Sized,
{
    let mut missing = Vec::new();
    for path in paths {
        let is_missing = match path {
            DerivedPath::Opaque(path) => !store.is_valid_path(path).await?,
            DerivedPath::Built { drv_path, outputs } => {
                built_is_missing(store, eval_store, known, drv_path, outputs).await?
            }
        };
        if is_missing {
            missing.push(path.clone());
        }
    }
    if !missing.is_empty() {
        let store_dir = store.store_dir();
        event_at!(level, count = missing.len(), "paths missing from the store:");
        for path in missing.iter() {
            event_at!(level, "  {}", store_dir.display(path));
        }
    }
    Ok(missing)
}

/// Reports the paths in `paths` that are not in the store yet.
///
/// Returns them in the order they appear in `paths`.
pub async fn print_missing<S, E>(
    store: &S,
    eval_store: &E,
    paths: &[DerivedPath],
    level: Verbosity,
) -> Result<Vec<DerivedPath>>
where
    S: Store + ?Sized,
    E: Store + ?Sized,
{
    let mut known = Known::default();
    for path in paths {
        let DerivedPath::Built { drv_path, .. } = path else {
            continue;
        };
        if known.drv_paths.contains_key(drv_path) {
            continue;
        }
        let resolved = match resolve_single_derived_path(store, eval_store, drv_path).await {
            Ok(resolved) => Some(resolved),
            Err(err) => {
                trace!(%err, "derivation is not known yet");
                None
            }
        };
        known.drv_paths.insert((**drv_path).clone(), resolved);
    }
    report_missing(store, eval_store, paths, &mut known, level).await
}
