//! Report configuration.

use crate::time::{ThroughputUnit, TimeUnit};

/// Environment variable naming the report time unit (`ns`, `us`, `ms`, `s`).
pub const TIME_UNIT_ENV: &str = "TALLY_TIME_UNIT";

/// Environment variable naming the report throughput unit (`B/s` .. `GiB/s`).
pub const THROUGHPUT_UNIT_ENV: &str = "TALLY_THROUGHPUT_UNIT";

/// Units used when printing timer reports.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct ReportConfig {
    pub time_unit: TimeUnit,
    pub throughput_unit: ThroughputUnit,
}

impl ReportConfig {
    /// Defaults overridden by `TALLY_TIME_UNIT` / `TALLY_THROUGHPUT_UNIT`.
    ///
    /// Unparsable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(TIME_UNIT_ENV) {
            match raw.parse() {
                Ok(unit) => config.time_unit = unit,
                Err(err) => log::warn!("{TIME_UNIT_ENV}: {err}; using {}", config.time_unit),
            }
        }

        if let Some(raw) = lookup(THROUGHPUT_UNIT_ENV) {
            match raw.parse() {
                Ok(unit) => config.throughput_unit = unit,
                Err(err) => log::warn!("{THROUGHPUT_UNIT_ENV}: {err}; using {}", config.throughput_unit),
            }
        }

        config
    }
}
