mod output_spec;
mod path;

pub use output_spec::{OutputName, OutputSpec};
pub use path::{DerivedPath, OUTPUT_SEPARATOR, ParseDerivedPathError, SingleDerivedPath};
