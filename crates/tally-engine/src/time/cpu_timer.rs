use std::ops::{Add, AddAssign};
use std::time::{Duration, Instant};

use super::accum::div_duration;

/// Process CPU time split into wall, user and system components.
///
/// The components come from independent clocks; `wall >= user + system` is not
/// guaranteed and callers must not rely on it.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct CpuTimes {
    pub wall: Duration,
    pub user: Duration,
    pub system: Duration,
}

impl CpuTimes {
    pub const ZERO: Self = Self {
        wall: Duration::ZERO,
        user: Duration::ZERO,
        system: Duration::ZERO,
    };

    /// Component-wise difference, clamped at zero.
    pub fn saturating_sub(self, earlier: Self) -> Self {
        Self {
            wall: self.wall.saturating_sub(earlier.wall),
            user: self.user.saturating_sub(earlier.user),
            system: self.system.saturating_sub(earlier.system),
        }
    }

    /// Component-wise average over `count` samples; zero when `count` is 0.
    pub fn div_count(self, count: u64) -> Self {
        Self {
            wall: div_duration(self.wall, count),
            user: div_duration(self.user, count),
            system: div_duration(self.system, count),
        }
    }
}

impl Add for CpuTimes {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            wall: self.wall + rhs.wall,
            user: self.user + rhs.user,
            system: self.system + rhs.system,
        }
    }
}

impl AddAssign for CpuTimes {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Source of absolute process times.
///
/// Only differences between two samples are meaningful.
pub trait CpuClock {
    fn sample(&self) -> CpuTimes;
}

/// Default clock: monotonic wall time plus `getrusage` user/system time.
#[derive(Debug, Clone)]
pub struct ProcessClock {
    origin: Instant,
}

impl ProcessClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for ProcessClock {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuClock for ProcessClock {
    fn sample(&self) -> CpuTimes {
        let (user, system) = process_user_system();
        CpuTimes {
            wall: self.origin.elapsed(),
            user,
            system,
        }
    }
}

#[cfg(unix)]
fn process_user_system() -> (Duration, Duration) {
    let mut usage = std::mem::MaybeUninit::<libc::rusage>::zeroed();

    // SAFETY: `usage` is a valid, writable rusage buffer for the duration of the call.
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) };
    if rc != 0 {
        log::debug!("getrusage failed; reporting zero user/system time");
        return (Duration::ZERO, Duration::ZERO);
    }

    // SAFETY: getrusage returned success, so the struct is initialized.
    let usage = unsafe { usage.assume_init() };
    (timeval(usage.ru_utime), timeval(usage.ru_stime))
}

#[cfg(unix)]
fn timeval(tv: libc::timeval) -> Duration {
    Duration::new(tv.tv_sec.max(0) as u64, (tv.tv_usec.max(0) as u32) * 1_000)
}

#[cfg(not(unix))]
fn process_user_system() -> (Duration, Duration) {
    (Duration::ZERO, Duration::ZERO)
}

/// Start/stop CPU timer reporting a wall/user/system split.
///
/// While running, elapsed time is measured up to "now"; after `stop` it is frozen
/// until the next `start`.
pub struct CpuTimer {
    clock: Box<dyn CpuClock>,
    begin: CpuTimes,
    end: Option<CpuTimes>,
}

impl CpuTimer {
    /// Creates a stopped timer backed by [`ProcessClock`].
    pub fn new() -> Self {
        Self::with_clock(Box::new(ProcessClock::new()))
    }

    /// Creates a stopped timer backed by a custom clock.
    pub fn with_clock(clock: Box<dyn CpuClock>) -> Self {
        let now = clock.sample();
        Self {
            clock,
            begin: now,
            end: Some(now),
        }
    }

    pub fn start(&mut self) {
        self.begin = self.clock.sample();
        self.end = None;
    }

    /// Freezes the elapsed time. Stopping a stopped timer has no effect.
    pub fn stop(&mut self) {
        if self.end.is_none() {
            self.end = Some(self.clock.sample());
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.end.is_some()
    }

    /// Elapsed wall time.
    pub fn elapsed(&self) -> Duration {
        self.detailed_elapsed().wall
    }

    pub fn detailed_elapsed(&self) -> CpuTimes {
        let end = self.end.unwrap_or_else(|| self.clock.sample());
        end.saturating_sub(self.begin)
    }
}

impl Default for CpuTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CpuTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuTimer")
            .field("begin", &self.begin)
            .field("end", &self.end)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StepClock;

    #[test]
    fn new_timer_reports_zero() {
        let timer = CpuTimer::with_clock(Box::new(StepClock::default()));
        assert!(timer.is_stopped());
        assert_eq!(timer.detailed_elapsed(), CpuTimes::ZERO);
    }

    #[test]
    fn stop_freezes_elapsed() {
        let clock = StepClock::default();
        let mut timer = CpuTimer::with_clock(Box::new(clock.clone()));

        timer.start();
        clock.advance(10, 4, 1);
        timer.stop();
        clock.advance(100, 100, 100);

        let t = timer.detailed_elapsed();
        assert_eq!(t.wall, Duration::from_millis(10));
        assert_eq!(t.user, Duration::from_millis(4));
        assert_eq!(t.system, Duration::from_millis(1));
    }

    #[test]
    fn running_timer_measures_up_to_now() {
        let clock = StepClock::default();
        let mut timer = CpuTimer::with_clock(Box::new(clock.clone()));

        timer.start();
        clock.advance(7, 0, 0);
        assert_eq!(timer.elapsed(), Duration::from_millis(7));
        clock.advance(3, 0, 0);
        assert_eq!(timer.elapsed(), Duration::from_millis(10));
    }

    #[test]
    fn second_stop_is_ignored() {
        let clock = StepClock::default();
        let mut timer = CpuTimer::with_clock(Box::new(clock.clone()));

        timer.start();
        clock.advance(5, 0, 0);
        timer.stop();
        clock.advance(5, 0, 0);
        timer.stop();

        assert_eq!(timer.elapsed(), Duration::from_millis(5));
    }

    #[test]
    fn process_clock_is_monotonic() {
        let clock = ProcessClock::new();
        let a = clock.sample();
        let b = clock.sample();
        assert!(b.wall >= a.wall);
        assert!(b.user >= a.user);
        assert!(b.system >= a.system);
    }
}
