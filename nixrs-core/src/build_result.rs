use std::collections::{BTreeMap, BTreeSet};
use std::time::SystemTime;

use num_enum::{IntoPrimitive, TryFromPrimitive};
#[cfg(any(test, feature = "test"))]
use proptest_derive::Arbitrary;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::derived_path::{DerivedPath, OutputName};
use crate::store_path::StorePath;

/// How the build executor should treat paths that are already valid.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    TryFromPrimitive,
    IntoPrimitive,
    Serialize,
    Deserialize,
)]
#[cfg_attr(any(test, feature = "test"), derive(Arbitrary))]
#[repr(u16)]
#[serde(rename_all = "kebab-case")]
pub enum BuildMode {
    #[default]
    Normal = 0,
    Repair = 1,
    Check = 2,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    TryFromPrimitive,
    IntoPrimitive,
)]
#[cfg_attr(any(test, feature = "test"), derive(Arbitrary))]
#[repr(u16)]
pub enum BuildStatus {
    Built = 0,
    Substituted = 1,
    AlreadyValid = 2,
    PermanentFailure = 3,
    InputRejected = 4,
    OutputRejected = 5,
    TransientFailure = 6,
    CachedFailure = 7,
    TimedOut = 8,
    #[default]
    MiscFailure = 9,
    DependencyFailed = 10,
    LogLimitExceeded = 11,
    NotDeterministic = 12,
    ResolvesToAlreadyValid = 13,
    NoSubstituters = 14,
}

impl BuildStatus {
    pub fn success(&self) -> bool {
        matches!(
            self,
            BuildStatus::Built
                | BuildStatus::Substituted
                | BuildStatus::AlreadyValid
                | BuildStatus::ResolvesToAlreadyValid
        )
    }
}

/// A concrete output path produced for one output of a derivation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Realisation {
    pub out_path: StorePath,
    #[serde(default)]
    pub signatures: BTreeSet<String>,
}

impl From<StorePath> for Realisation {
    fn from(out_path: StorePath) -> Self {
        Realisation {
            out_path,
            signatures: BTreeSet::new(),
        }
    }
}

/// The error captured from one failed build.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{msg}")]
pub struct BuildError {
    pub status: BuildStatus,
    pub msg: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildResult {
    pub status: BuildStatus,
    pub error_msg: String,

    /// How many times this build was performed.
    pub times_built: u64,

    /// If `times_built > 1`, whether some builds did not produce the same result.
    pub is_non_deterministic: bool,

    pub built_outputs: BTreeMap<OutputName, Realisation>,

    pub start_time: SystemTime,
    pub stop_time: SystemTime,
}

impl BuildResult {
    pub fn new(status: BuildStatus, error_msg: String) -> BuildResult {
        BuildResult {
            status,
            error_msg,
            times_built: 0,
            is_non_deterministic: false,
            built_outputs: BTreeMap::new(),
            start_time: SystemTime::UNIX_EPOCH,
            stop_time: SystemTime::UNIX_EPOCH,
        }
    }

    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn with_output(mut self, name: OutputName, out_path: StorePath) -> BuildResult {
        self.built_outputs.insert(name, out_path.into());
        self
    }

    /// The error this result represents, `None` for a successful build.
    pub fn to_error(&self) -> Option<BuildError> {
        if self.success() {
            None
        } else {
            Some(BuildError {
                status: self.status,
                msg: self.error_msg.clone(),
            })
        }
    }
}

/// A build result together with the derived path that was requested.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyedBuildResult {
    pub path: DerivedPath,
    pub result: BuildResult,
}

pub type KeyedBuildResults = Vec<KeyedBuildResult>;
