use std::fmt;
use std::time::Duration;

use super::accum::AccumTimerBase;
use super::cpu_timer::{CpuTimer, CpuTimes};
use super::units::{ThroughputUnit, TimeUnit};
use crate::report;

/// CPU-only accumulating timer.
///
/// CPU results are available as soon as the timer stops, so `stop` folds the
/// sample right away. The headline time is wall time.
#[derive(Debug, Default)]
pub struct AccumTimer {
    base: AccumTimerBase,
    cpu_timer: CpuTimer,
    detailed_last: CpuTimes,
    detailed_accumulated: CpuTimes,
}

impl AccumTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cpu_timer(cpu_timer: CpuTimer) -> Self {
        Self {
            cpu_timer,
            ..Self::default()
        }
    }

    pub fn start(&mut self) {
        self.cpu_timer.start();
    }

    /// Stops the running measurement and folds it. No-op when not running.
    pub fn stop(&mut self) {
        if self.cpu_timer.is_stopped() {
            return;
        }
        self.cpu_timer.stop();

        let t = self.cpu_timer.detailed_elapsed();
        self.base.fold(t.wall);
        self.detailed_last = t;
        self.detailed_accumulated += t;
    }

    pub fn reset(&mut self) {
        self.base.reset();
        self.detailed_accumulated = CpuTimes::ZERO;
    }

    pub fn last_time(&self) -> Duration {
        self.base.last_time()
    }

    pub fn accumulated_time(&self) -> Duration {
        self.base.accumulated_time()
    }

    pub fn accumulation_count(&self) -> u64 {
        self.base.accumulation_count()
    }

    pub fn average_time(&self) -> Duration {
        self.base.average_time()
    }

    pub fn detailed_last_time(&self) -> CpuTimes {
        self.detailed_last
    }

    pub fn detailed_accumulated_time(&self) -> CpuTimes {
        self.detailed_accumulated
    }

    pub fn detailed_average_time(&self) -> CpuTimes {
        self.detailed_accumulated.div_count(self.accumulation_count())
    }

    pub fn report(&self, w: &mut dyn fmt::Write, unit: TimeUnit) -> fmt::Result {
        report::report(w, self.average_time(), unit)
    }

    pub fn report_throughput(
        &self,
        w: &mut dyn fmt::Write,
        size: u64,
        unit: TimeUnit,
        tp_unit: ThroughputUnit,
    ) -> fmt::Result {
        report::report_throughput(w, self.average_time(), size, unit, tp_unit)
    }

    pub fn detailed_report(&self, w: &mut dyn fmt::Write, unit: TimeUnit) -> fmt::Result {
        report::cpu_report(w, self.detailed_average_time(), unit)
    }

    pub fn detailed_report_throughput(
        &self,
        w: &mut dyn fmt::Write,
        size: u64,
        unit: TimeUnit,
        tp_unit: ThroughputUnit,
    ) -> fmt::Result {
        self.detailed_report(w, unit)?;
        if size > 0 {
            write!(
                w,
                ", {:>9.3}{}",
                tp_unit.throughput(size, self.average_time()),
                tp_unit
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StepClock;

    fn timer() -> (AccumTimer, StepClock) {
        let clock = StepClock::default();
        let timer = AccumTimer::with_cpu_timer(CpuTimer::with_clock(Box::new(clock.clone())));
        (timer, clock)
    }

    #[test]
    fn stop_folds_immediately() {
        let (mut t, clock) = timer();

        t.start();
        clock.advance(4, 2, 1);
        t.stop();

        assert_eq!(t.accumulation_count(), 1);
        assert_eq!(t.last_time(), Duration::from_millis(4));
        assert_eq!(t.detailed_last_time().user, Duration::from_millis(2));
    }

    #[test]
    fn stop_without_start_does_nothing() {
        let (mut t, _clock) = timer();
        t.stop();
        assert_eq!(t.accumulation_count(), 0);
    }

    #[test]
    fn average_over_cycles() {
        let (mut t, clock) = timer();
        for wall in [2, 4, 6] {
            t.start();
            clock.advance(wall, 0, 0);
            t.stop();
        }

        assert_eq!(t.accumulated_time(), Duration::from_millis(12));
        assert_eq!(t.average_time(), Duration::from_millis(4));
        assert_eq!(t.detailed_average_time().wall, Duration::from_millis(4));
    }

    #[test]
    fn detailed_average_saturates_like_headline_average() {
        let (mut t, clock) = timer();
        t.start();
        clock.advance(u64::MAX, 0, 0);
        t.stop();

        assert_eq!(t.average_time(), Duration::from_nanos(u64::MAX));
        assert_eq!(t.detailed_average_time().wall, t.average_time());
    }

    #[test]
    fn detailed_report_after_reset_is_zero() {
        let (mut t, clock) = timer();
        t.start();
        clock.advance(4, 2, 1);
        t.stop();
        t.reset();

        let mut out = String::new();
        t.detailed_report_throughput(&mut out, 0, TimeUnit::Milliseconds, ThroughputUnit::MiBPerSec)
            .unwrap();
        assert_eq!(out, "wall: 0.000ms, user: 0.000ms, system: 0.000ms");
    }
}
