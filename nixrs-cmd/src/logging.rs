use tracing::Level;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::{SubscriberInitExt as _, TryInitError};

use crate::settings::Settings;

pub fn filter(settings: &Settings) -> Targets {
    Targets::new()
        .with_default(settings.verbosity.to_tracing())
        .with_target("nixrs_core::store::mock", Level::INFO)
}

/// Installs a stderr logger at the verbosity from `settings`.
///
/// Fails if a global subscriber was already set.
pub fn init_logger(settings: &Settings) -> Result<(), TryInitError> {
    let layer = tracing_subscriber::fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter(settings))
        .with(layer)
        .try_init()
}
