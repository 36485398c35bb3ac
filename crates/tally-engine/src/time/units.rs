use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Unit used when printing a duration.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    #[default]
    Milliseconds,
    Seconds,
}

impl TimeUnit {
    pub const ALL: [TimeUnit; 4] = [
        TimeUnit::Nanoseconds,
        TimeUnit::Microseconds,
        TimeUnit::Milliseconds,
        TimeUnit::Seconds,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            TimeUnit::Nanoseconds => "ns",
            TimeUnit::Microseconds => "us",
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Seconds => "s",
        }
    }

    /// Expresses `d` in this unit.
    pub fn convert(self, d: Duration) -> f64 {
        let ns = d.as_nanos() as f64;
        match self {
            TimeUnit::Nanoseconds => ns,
            TimeUnit::Microseconds => ns / 1e3,
            TimeUnit::Milliseconds => ns / 1e6,
            TimeUnit::Seconds => ns / 1e9,
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for TimeUnit {
    type Err = UnknownUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        TimeUnit::ALL
            .into_iter()
            .find(|u| u.suffix().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownUnit(s.to_string()))
    }
}

/// Data-rate unit used when printing a throughput.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum ThroughputUnit {
    BytesPerSec,
    KiBPerSec,
    #[default]
    MiBPerSec,
    GiBPerSec,
}

impl ThroughputUnit {
    pub const ALL: [ThroughputUnit; 4] = [
        ThroughputUnit::BytesPerSec,
        ThroughputUnit::KiBPerSec,
        ThroughputUnit::MiBPerSec,
        ThroughputUnit::GiBPerSec,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            ThroughputUnit::BytesPerSec => "B/s",
            ThroughputUnit::KiBPerSec => "KiB/s",
            ThroughputUnit::MiBPerSec => "MiB/s",
            ThroughputUnit::GiBPerSec => "GiB/s",
        }
    }

    fn bytes(self) -> f64 {
        match self {
            ThroughputUnit::BytesPerSec => 1.0,
            ThroughputUnit::KiBPerSec => 1024.0,
            ThroughputUnit::MiBPerSec => 1024.0 * 1024.0,
            ThroughputUnit::GiBPerSec => 1024.0 * 1024.0 * 1024.0,
        }
    }

    /// `size` bytes moved in `d`, in this unit. Zero for a zero duration.
    pub fn throughput(self, size: u64, d: Duration) -> f64 {
        let secs = d.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        size as f64 / self.bytes() / secs
    }
}

impl fmt::Display for ThroughputUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for ThroughputUnit {
    type Err = UnknownUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ThroughputUnit::ALL
            .into_iter()
            .find(|u| u.suffix().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownUnit(s.to_string()))
    }
}

/// A unit name that matched none of the known suffixes.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct UnknownUnit(pub String);

impl fmt::Display for UnknownUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown unit `{}`", self.0)
    }
}

impl std::error::Error for UnknownUnit {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_unit_conversion() {
        let d = Duration::from_micros(1_500);
        assert_eq!(TimeUnit::Nanoseconds.convert(d), 1_500_000.0);
        assert_eq!(TimeUnit::Microseconds.convert(d), 1_500.0);
        assert_eq!(TimeUnit::Milliseconds.convert(d), 1.5);
        assert_eq!(TimeUnit::Seconds.convert(d), 0.0015);
    }

    #[test]
    fn throughput_mib_per_sec() {
        let tp = ThroughputUnit::MiBPerSec.throughput(64 * 1024 * 1024, Duration::from_millis(500));
        assert_eq!(tp, 128.0);
    }

    #[test]
    fn throughput_of_zero_duration_is_zero() {
        assert_eq!(ThroughputUnit::GiBPerSec.throughput(1024, Duration::ZERO), 0.0);
    }

    #[test]
    fn parse_suffixes() {
        assert_eq!("us".parse::<TimeUnit>(), Ok(TimeUnit::Microseconds));
        assert_eq!(" MS ".parse::<TimeUnit>(), Ok(TimeUnit::Milliseconds));
        assert_eq!("kib/s".parse::<ThroughputUnit>(), Ok(ThroughputUnit::KiBPerSec));
        assert!("minutes".parse::<TimeUnit>().is_err());
    }

    #[test]
    fn defaults_match_report_defaults() {
        assert_eq!(TimeUnit::default(), TimeUnit::Milliseconds);
        assert_eq!(ThroughputUnit::default(), ThroughputUnit::MiBPerSec);
    }
}
