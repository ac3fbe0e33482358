// SPDX-FileCopyrightText: 2024 griff
//
// SPDX-License-Identifier: EUPL-1.2 or MIT

//! Installables: user supplied references to things that can be built.
//!
//! Strings are turned into [`Installable`]s by [`parse_installables`], and a
//! [`RealiseContext`] expands them into derived paths, builds those in a
//! single batch and hands the results back to every installable that asked
//! for them.

mod error;
pub mod eval;
pub mod installable;
pub mod logging;
mod parse;
pub mod realise;
pub mod settings;

pub use error::{Error, Result};
pub use eval::{EvalError, Evaluator, ExprSource, NoEvaluator, PackageInfo};
pub use installable::{
    DerivedPathWithInfo, ExtendedOutputsSpec, ExtraPathInfo, Installable, InstallableAttrPath,
    InstallableDerivedPath, Installables,
};
pub use parse::{SourceArgs, parse_installable, parse_installables};
pub use realise::{
    BuiltPathWithResult, OperateOn, Realise, RealiseContext, print_missing, throw_build_errors,
    to_built_paths,
};
pub use settings::Settings;
