use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use nixrs_core::derived_path::{DerivedPath, OutputName, OutputSpec, SingleDerivedPath};
use nixrs_core::store_path::StorePath;
use tracing::{debug, instrument};

use crate::eval::{EvalError, Evaluator, ExprSource};

use super::{DerivedPathWithInfo, ExtendedOutputsSpec, ExtraPathInfo};

/// An attribute path evaluated against a Nix expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallableAttrPath {
    pub source: Arc<ExprSource>,
    pub attr_path: String,
    pub extended_outputs_spec: ExtendedOutputsSpec,
}

impl InstallableAttrPath {
    pub fn new(
        source: Arc<ExprSource>,
        attr_path: &str,
        extended_outputs_spec: ExtendedOutputsSpec,
    ) -> InstallableAttrPath {
        InstallableAttrPath {
            source,
            attr_path: attr_path.to_owned(),
            extended_outputs_spec,
        }
    }

    pub fn what(&self) -> String {
        if self.attr_path.is_empty() {
            "«root»".to_owned()
        } else {
            self.attr_path.clone()
        }
    }

    #[instrument(skip(self, evaluator), fields(attr_path = %self.what()))]
    pub async fn to_derived_paths<V>(
        &self,
        evaluator: &V,
        read_only: bool,
    ) -> Result<Vec<DerivedPathWithInfo>, EvalError>
    where
        V: Evaluator + ?Sized,
    {
        let packages = evaluator
            .eval_derivations(&self.source, &self.attr_path, read_only)
            .await?;
        debug!(count = packages.len(), "evaluated derivations");

        let mut by_drv_path: BTreeMap<StorePath, OutputSpec> = BTreeMap::new();
        for package in packages {
            let outputs = match &self.extended_outputs_spec {
                ExtendedOutputsSpec::Default => {
                    let mut outputs: BTreeSet<OutputName> = package.outputs_to_install;
                    if outputs.is_empty() {
                        outputs.insert(OutputName::default());
                    }
                    OutputSpec::Named(outputs)
                }
                ExtendedOutputsSpec::Explicit(outputs) => outputs.clone(),
            };
            let merged = match by_drv_path.remove(&package.drv_path) {
                Some(existing) => existing.union(outputs),
                None => outputs,
            };
            by_drv_path.insert(package.drv_path, merged);
        }

        Ok(by_drv_path
            .into_iter()
            .map(|(drv_path, outputs)| DerivedPathWithInfo {
                info: Arc::new(ExtraPathInfo {
                    attr_path: Some(self.attr_path.clone()),
                    extended_outputs_spec: Some(ExtendedOutputsSpec::Explicit(outputs.clone())),
                }),
                path: DerivedPath::built(SingleDerivedPath::Opaque(drv_path), outputs),
            })
            .collect())
    }
}
