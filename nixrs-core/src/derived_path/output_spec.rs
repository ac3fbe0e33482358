use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use derive_more::Display;
#[cfg(any(test, feature = "test"))]
use proptest::prelude::*;
use serde::{Deserialize, Serialize};

use crate::store_path::{StorePathError, into_name};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OutputName(String);

impl OutputName {
    pub fn is_default(&self) -> bool {
        self.0 == "out"
    }
}

impl AsRef<str> for OutputName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Default for OutputName {
    fn default() -> Self {
        OutputName("out".into())
    }
}

impl FromStr for OutputName {
    type Err = StorePathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = into_name(s)?.to_string();
        Ok(OutputName(name))
    }
}

impl TryFrom<String> for OutputName {
    type Error = StorePathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OutputName> for String {
    fn from(value: OutputName) -> Self {
        value.0
    }
}

#[cfg(any(test, feature = "test"))]
impl Arbitrary for OutputName {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        use crate::store_path::proptest::arb_output_name;
        arb_output_name().prop_map(OutputName).boxed()
    }
}

/// Which outputs of a derivation are wanted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OutputSpec {
    All,
    Named(BTreeSet<OutputName>),
}

impl OutputSpec {
    pub fn contains(&self, name: &OutputName) -> bool {
        match self {
            OutputSpec::All => true,
            OutputSpec::Named(outputs) => outputs.contains(name),
        }
    }

    pub fn union(self, other: OutputSpec) -> OutputSpec {
        match (self, other) {
            (OutputSpec::Named(mut left), OutputSpec::Named(right)) => {
                left.extend(right);
                OutputSpec::Named(left)
            }
            _ => OutputSpec::All,
        }
    }
}

impl fmt::Display for OutputSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputSpec::All => f.write_str("*"),
            OutputSpec::Named(outputs) => {
                let mut it = outputs.iter();
                if let Some(output) = it.next() {
                    write!(f, "{}", output)?;
                    for output in it {
                        write!(f, ",{}", output)?;
                    }
                }
                Ok(())
            }
        }
    }
}

impl FromStr for OutputSpec {
    type Err = StorePathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "*" {
            return Ok(OutputSpec::All);
        }
        let outputs = s
            .split(',')
            .map(str::parse)
            .collect::<Result<BTreeSet<OutputName>, _>>()?;
        Ok(OutputSpec::Named(outputs))
    }
}

impl From<OutputName> for OutputSpec {
    fn from(value: OutputName) -> Self {
        OutputSpec::Named(BTreeSet::from([value]))
    }
}

#[cfg(any(test, feature = "test"))]
impl Arbitrary for OutputSpec {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        prop_oneof![
            Just(OutputSpec::All),
            proptest::collection::btree_set(any::<OutputName>(), 1..10)
                .prop_map(OutputSpec::Named),
        ]
        .boxed()
    }
}
