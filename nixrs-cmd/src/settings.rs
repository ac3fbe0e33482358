use std::collections::BTreeMap;
use std::num::ParseIntError;
use std::str::ParseBoolError;

use nixrs_core::log::Verbosity;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseSettingError {
    #[error("{0}")]
    ParseBool(
        #[source]
        #[from]
        ParseBoolError,
    ),
    #[error("{0}")]
    ParseInt(
        #[source]
        #[from]
        ParseIntError,
    ),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Settings {
    /// Report paths that are not yet in the store before building them.
    pub print_missing: bool,

    /// Evaluate without writing anything to the store.
    pub read_only: bool,

    /// Whether to keep building derivations when another build fails.
    /// Passed to the store with every batched build.
    pub keep_going: bool,

    /// Level [`crate::logging::init_logger`] installs the logger at.
    pub verbosity: Verbosity,

    /// Unknown settings
    #[serde(flatten)]
    pub unknown: BTreeMap<String, String>,
}

impl Settings {
    pub const fn const_default() -> Settings {
        Settings {
            print_missing: true,
            read_only: false,
            keep_going: false,
            verbosity: Verbosity::Info,
            unknown: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, map: BTreeMap<String, String>) -> Result<(), ParseSettingError> {
        for (k, v) in map.into_iter() {
            match k.as_ref() {
                "print-missing" => self.print_missing = v.parse()?,
                "read-only" => self.read_only = v.parse()?,
                "keep-going" => self.keep_going = v.parse()?,
                "verbosity" => self.verbosity = v.parse::<u16>()?.into(),
                _ => {
                    self.unknown.insert(k, v);
                }
            }
        }
        Ok(())
    }

    pub fn get_all(&self, map: &mut BTreeMap<String, String>) {
        map.insert("print-missing".into(), self.print_missing.to_string());
        map.insert("read-only".into(), self.read_only.to_string());
        map.insert("keep-going".into(), self.keep_going.to_string());
        map.insert(
            "verbosity".into(),
            u16::from(self.verbosity).to_string(),
        );
        map.extend(self.unknown.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings::const_default()
    }
}
