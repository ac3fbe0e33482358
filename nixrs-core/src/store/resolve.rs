use std::collections::BTreeMap;

use futures::FutureExt as _;
use futures::future::LocalBoxFuture;
use tracing::trace;

use crate::derived_path::{OutputName, OutputSpec, SingleDerivedPath};
use crate::store_path::{StoreDir, StorePath};

use super::{Error, OutputPathMap, Result, Store};

/// Path of output `output` of the already concrete derivation `drv_path`.
pub async fn resolve_output<S, E>(
    store: &S,
    eval_store: &E,
    drv_path: &StorePath,
    output: &OutputName,
) -> Result<StorePath>
where
    S: Store + ?Sized,
    E: Store + ?Sized,
{
    let store_dir = store.store_dir();
    trace!(drv_path = %drv_path, %output, "resolving output");
    let mut output_map = store
        .query_partial_derivation_output_map(drv_path, eval_store)
        .await?;
    match output_map.remove(output) {
        None => Err(Error::MissingOutput {
            drv_path: store_dir.display(drv_path).to_string(),
            output: output.clone(),
        }),
        Some(None) => Err(Error::OutputNotBuilt {
            drv_path: store_dir.display(drv_path).to_string(),
            output: output.clone(),
        }),
        Some(Some(path)) => Ok(path),
    }
}

/// Paths of the outputs of `drv_path` selected by `outputs`.
pub async fn resolve_outputs<S, E>(
    store: &S,
    eval_store: &E,
    drv_path: &StorePath,
    outputs: &OutputSpec,
) -> Result<BTreeMap<OutputName, StorePath>>
where
    S: Store + ?Sized,
    E: Store + ?Sized,
{
    let output_map = store
        .query_partial_derivation_output_map(drv_path, eval_store)
        .await?;
    select_outputs(&store.store_dir(), drv_path, &output_map, outputs)
}

/// Picks the outputs selected by `outputs` from the output map of
/// `drv_path`, failing when one of them is unknown or not built.
pub fn select_outputs(
    store_dir: &StoreDir,
    drv_path: &StorePath,
    output_map: &OutputPathMap,
    outputs: &OutputSpec,
) -> Result<BTreeMap<OutputName, StorePath>> {
    if let OutputSpec::Named(names) = outputs {
        if let Some(output) = names.iter().find(|name| !output_map.contains_key(*name)) {
            return Err(Error::MissingOutput {
                drv_path: store_dir.display(drv_path).to_string(),
                output: output.clone(),
            });
        }
    }
    let mut ret = BTreeMap::new();
    for (output, path) in output_map {
        if !outputs.contains(output) {
            continue;
        }
        let Some(path) = path else {
            return Err(Error::OutputNotBuilt {
                drv_path: store_dir.display(drv_path).to_string(),
                output: output.clone(),
            });
        };
        ret.insert(output.clone(), path.clone());
    }
    Ok(ret)
}

/// Resolves every level of `path` down to a single store path.
pub fn resolve_single_derived_path<'a, S, E>(
    store: &'a S,
    eval_store: &'a E,
    path: &'a SingleDerivedPath,
) -> LocalBoxFuture<'a, Result<StorePath>>
where
    S: Store + ?Sized,
    E: Store + ?Sized,
{
    async move {
        match path {
            SingleDerivedPath::Opaque(path) => Ok(path.clone()),
            SingleDerivedPath::Built { drv_path, output } => {
                let drv_path = resolve_single_derived_path(store, eval_store, drv_path).await?;
                resolve_output(store, eval_store, &drv_path, output).await
            }
        }
    }
    .boxed_local()
}
