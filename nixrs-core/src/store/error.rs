use thiserror::Error;

use crate::derived_path::OutputName;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("path '{0}' is not valid")]
    InvalidPath(String),
    #[error("derivation '{drv_path}' does not have an output named '{output}'")]
    MissingOutput { drv_path: String, output: OutputName },
    #[error("output '{output}' of derivation '{drv_path}' has not been built yet")]
    OutputNotBuilt { drv_path: String, output: OutputName },
    #[error("{0}")]
    Custom(String),
}

impl Error {
    pub fn custom<M: std::fmt::Display>(msg: M) -> Error {
        Error::Custom(msg.to_string())
    }
}
