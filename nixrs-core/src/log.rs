use num_enum::IntoPrimitive;
#[cfg(any(test, feature = "test"))]
use proptest_derive::Arbitrary;
use serde::{Deserialize, Serialize};

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
    IntoPrimitive,
    Serialize,
    Deserialize,
)]
#[serde(from = "u16", into = "u16")]
#[cfg_attr(any(test, feature = "test"), derive(Arbitrary))]
#[repr(u16)]
pub enum Verbosity {
    #[default]
    Error = 0,
    Warn = 1,
    Notice = 2,
    Info = 3,
    Talkative = 4,
    Chatty = 5,
    Debug = 6,
    Vomit = 7,
}

impl From<u16> for Verbosity {
    /// Anything above the known levels is as verbose as it gets.
    fn from(value: u16) -> Self {
        match value {
            0 => Verbosity::Error,
            1 => Verbosity::Warn,
            2 => Verbosity::Notice,
            3 => Verbosity::Info,
            4 => Verbosity::Talkative,
            5 => Verbosity::Chatty,
            6 => Verbosity::Debug,
            _ => Verbosity::Vomit,
        }
    }
}

impl Verbosity {
    pub const fn to_tracing(&self) -> tracing::Level {
        use Verbosity::*;
        use tracing::Level;
        match self {
            Error => Level::ERROR,
            Warn => Level::WARN,
            Notice | Info | Talkative => Level::INFO,
            Chatty | Debug => Level::DEBUG,
            Vomit => Level::TRACE,
        }
    }
}

impl<'a> From<&'a tracing::Level> for Verbosity {
    fn from(value: &'a tracing::Level) -> Self {
        match *value {
            tracing::Level::ERROR => Verbosity::Error,
            tracing::Level::WARN => Verbosity::Warn,
            tracing::Level::INFO => Verbosity::Info,
            tracing::Level::DEBUG => Verbosity::Debug,
            tracing::Level::TRACE => Verbosity::Vomit,
        }
    }
}

impl From<Verbosity> for tracing::Level {
    fn from(value: Verbosity) -> Self {
        value.to_tracing()
    }
}

/// Emits a `tracing` event at a level only known at runtime.
#[macro_export]
macro_rules! event_at {
    ($verbosity:expr, $($arg:tt)+) => {
        match $verbosity {
            $crate::log::Verbosity::Error => ::tracing::error!($($arg)+),
            $crate::log::Verbosity::Warn => ::tracing::warn!($($arg)+),
            $crate::log::Verbosity::Notice
            | $crate::log::Verbosity::Info
            | $crate::log::Verbosity::Talkative => ::tracing::info!($($arg)+),
            $crate::log::Verbosity::Chatty | $crate::log::Verbosity::Debug => {
                ::tracing::debug!($($arg)+)
            }
            $crate::log::Verbosity::Vomit => ::tracing::trace!($($arg)+),
        }
    };
}
