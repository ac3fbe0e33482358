//! Resolving and building installables.

use std::sync::Arc;

use futures::FutureExt as _;
use futures::future::LocalBoxFuture;
use nixrs_core::build_result::KeyedBuildResult;
use nixrs_core::built_path::{BuiltPath, SingleBuiltPath};
use nixrs_core::derived_path::SingleDerivedPath;
use nixrs_core::store::{Store, resolve_output};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::{Error, Result};
use crate::eval::Evaluator;
use crate::installable::ExtraPathInfo;
use crate::settings::Settings;

mod build;
mod missing;
mod project;

pub use build::throw_build_errors;
pub use missing::print_missing;

/// How far installables are realised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Realise {
    /// Resolve without building and without writing to the store.
    Nothing,
    /// Resolve without building.
    Derivation,
    /// Build all requested outputs.
    Outputs,
}

/// Whether a command works on the outputs of installables or on their
/// derivations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperateOn {
    Output,
    Derivation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltPathWithResult {
    pub path: BuiltPath,
    pub info: Arc<ExtraPathInfo>,
    /// The raw result from the build, absent when nothing was built.
    pub result: Option<KeyedBuildResult>,
}

pub fn to_built_paths(results: &[BuiltPathWithResult]) -> Vec<BuiltPath> {
    results.iter().map(|result| result.path.clone()).collect()
}

/// Everything needed to turn installables into built paths.
///
/// `store` builds and resolves paths, `eval_store` is where derivations are
/// read from and `evaluator` expands attribute paths.
#[derive(Debug)]
pub struct RealiseContext<S, E, V> {
    pub store: S,
    pub eval_store: E,
    pub evaluator: V,
    pub settings: Settings,
    pub read_only: bool,
    interrupt: CancellationToken,
}

impl<S, E, V> RealiseContext<S, E, V>
where
    S: Store,
    E: Store,
    V: Evaluator,
{
    pub fn new(store: S, eval_store: E, evaluator: V) -> Self {
        Self::with_settings(store, eval_store, evaluator, Settings::default())
    }

    pub fn with_settings(store: S, eval_store: E, evaluator: V, settings: Settings) -> Self {
        RealiseContext {
            store,
            eval_store,
            evaluator,
            read_only: settings.read_only,
            settings,
            interrupt: CancellationToken::new(),
        }
    }

    pub fn with_interrupt(mut self, interrupt: CancellationToken) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn check_interrupt(&self) -> Result<()> {
        if self.interrupt.is_cancelled() {
            Err(Error::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Resolves every level of `path` to a concrete store path.
    ///
    /// Each level is resolved against the already resolved path of the level
    /// below it, so every derivation in the chain is looked up once.
    pub fn get_built_path<'a>(
        &'a self,
        path: &'a SingleDerivedPath,
    ) -> LocalBoxFuture<'a, Result<SingleBuiltPath>> {
        async move {
            self.check_interrupt()?;
            match path {
                SingleDerivedPath::Opaque(path) => Ok(SingleBuiltPath::Opaque(path.clone())),
                SingleDerivedPath::Built { drv_path, output } => {
                    let drv_path = self.get_built_path(drv_path).await?;
                    trace!(drv_path = %drv_path.out_path(), %output, "resolving built path");
                    let out_path =
                        resolve_output(&self.store, &self.eval_store, drv_path.out_path(), output)
                            .await?;
                    Ok(SingleBuiltPath::Built {
                        drv_path: Arc::new(drv_path),
                        output: (output.clone(), out_path),
                    })
                }
            }
        }
        .boxed_local()
    }
}
