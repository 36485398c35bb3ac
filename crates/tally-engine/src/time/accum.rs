use std::ops::{Add, AddAssign};
use std::time::Duration;

use super::cpu_timer::CpuTimes;

/// Running last/sum/count statistics over repeated measurements.
///
/// `accumulated_time` is the sum of every folded sample since the last reset and
/// `accumulation_count` the number of folds.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct AccumTimerBase {
    last_time: Duration,
    accumulated_time: Duration,
    accumulation_count: u64,
}

impl AccumTimerBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_time(&self) -> Duration {
        self.last_time
    }

    pub fn accumulated_time(&self) -> Duration {
        self.accumulated_time
    }

    pub fn accumulation_count(&self) -> u64 {
        self.accumulation_count
    }

    /// Mean of the folded samples; zero before the first fold.
    pub fn average_time(&self) -> Duration {
        div_duration(self.accumulated_time, self.accumulation_count)
    }

    pub fn fold(&mut self, sample: Duration) {
        self.last_time = sample;
        self.accumulated_time += sample;
        self.accumulation_count += 1;
    }

    /// Clears the sum and count. `last_time` is left as is.
    pub fn reset(&mut self) {
        self.accumulated_time = Duration::ZERO;
        self.accumulation_count = 0;
    }
}

/// One detailed measurement: device time plus the CPU split of the same span.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct DeviceTimes {
    pub device: Duration,
    pub wall: Duration,
    pub user: Duration,
    pub system: Duration,
}

impl DeviceTimes {
    pub const ZERO: Self = Self {
        device: Duration::ZERO,
        wall: Duration::ZERO,
        user: Duration::ZERO,
        system: Duration::ZERO,
    };

    pub fn new(device: Duration, cpu: CpuTimes) -> Self {
        Self {
            device,
            wall: cpu.wall,
            user: cpu.user,
            system: cpu.system,
        }
    }

    pub fn cpu(&self) -> CpuTimes {
        CpuTimes {
            wall: self.wall,
            user: self.user,
            system: self.system,
        }
    }

    /// Component-wise division; all-zero when `count` is zero.
    pub fn div_count(self, count: u64) -> Self {
        Self {
            device: div_duration(self.device, count),
            wall: div_duration(self.wall, count),
            user: div_duration(self.user, count),
            system: div_duration(self.system, count),
        }
    }
}

impl Add for DeviceTimes {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            device: self.device + rhs.device,
            wall: self.wall + rhs.wall,
            user: self.user + rhs.user,
            system: self.system + rhs.system,
        }
    }
}

impl AddAssign for DeviceTimes {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Accumulator shared by the device timers.
///
/// The headline sample (`base`) tracks the device component; the detailed
/// times carry the CPU split alongside it.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct DetailedAccumulator {
    base: AccumTimerBase,
    last: DeviceTimes,
    accumulated: DeviceTimes,
}

impl DetailedAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base(&self) -> &AccumTimerBase {
        &self.base
    }

    pub fn last(&self) -> DeviceTimes {
        self.last
    }

    pub fn accumulated(&self) -> DeviceTimes {
        self.accumulated
    }

    pub fn count(&self) -> u64 {
        self.base.accumulation_count()
    }

    pub fn average(&self) -> DeviceTimes {
        self.accumulated.div_count(self.count())
    }

    /// Folds one measurement and returns it.
    pub fn fold(&mut self, device: Duration, cpu: CpuTimes) -> DeviceTimes {
        self.base.fold(device);
        self.last = DeviceTimes::new(device, cpu);
        self.accumulated += self.last;
        self.last
    }

    /// Zeroes the accumulated state; the detailed last time survives.
    pub fn reset(&mut self) {
        self.base.reset();
        self.accumulated = DeviceTimes::ZERO;
    }
}

/// `d / count`, zero for an empty count and saturating where nanoseconds overflow `u64`.
pub(super) fn div_duration(d: Duration, count: u64) -> Duration {
    if count == 0 {
        return Duration::ZERO;
    }
    let ns = d.as_nanos() / u128::from(count);
    Duration::from_nanos(u64::try_from(ns).unwrap_or(u64::MAX))
}
