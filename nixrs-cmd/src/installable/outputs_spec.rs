use std::fmt;

use nixrs_core::derived_path::{OUTPUT_SEPARATOR, OutputSpec, ParseDerivedPathError};

/// The outputs named on the command line, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExtendedOutputsSpec {
    #[default]
    Default,
    Explicit(OutputSpec),
}

impl ExtendedOutputsSpec {
    /// Splits `s` at its last `^` into a prefix and the outputs after it.
    pub fn parse(s: &str) -> Result<(&str, ExtendedOutputsSpec), ParseDerivedPathError> {
        match s.rsplit_once(OUTPUT_SEPARATOR) {
            None => Ok((s, ExtendedOutputsSpec::Default)),
            Some((prefix, outputs)) => {
                let spec = outputs
                    .parse()
                    .map_err(|error| ParseDerivedPathError::Output {
                        path: s.to_owned(),
                        output: outputs.to_owned(),
                        error,
                    })?;
                Ok((prefix, ExtendedOutputsSpec::Explicit(spec)))
            }
        }
    }
}

impl fmt::Display for ExtendedOutputsSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtendedOutputsSpec::Default => Ok(()),
            ExtendedOutputsSpec::Explicit(spec) => write!(f, "{}{}", OUTPUT_SEPARATOR, spec),
        }
    }
}

impl From<OutputSpec> for ExtendedOutputsSpec {
    fn from(value: OutputSpec) -> Self {
        ExtendedOutputsSpec::Explicit(value)
    }
}
