//! Device timers.
//!
//! Both variants follow the same cycle: `start` -> (device work) -> `stop` ->
//! `collect` (non-blocking, may report `Pending`) or `force_collect` (blocking).
//! A finished result is folded into a shared [`DetailedAccumulator`]; reports
//! read the accumulated averages at any time.
//!
//! - [`AccumTimerQuery`] differences two timestamp queries
//! - [`AccumEventTimer`] reads the elapsed time of a single device event

mod error;
mod event_timer;
mod in_flight;
mod query_timer;

use std::fmt;
use std::time::Duration;

use crate::report;
use crate::time::{DetailedAccumulator, DeviceTimes, ThroughputUnit, TimeUnit};

pub use error::TimerError;
pub use event_timer::AccumEventTimer;
pub use query_timer::{AccumTimerQuery, elapsed_ticks};

/// Outcome of a collect call.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CollectStatus {
    /// Nothing in flight; state unchanged.
    Idle,
    /// A measurement is in flight but its device result is not available yet.
    Pending,
    /// The measurement was folded into the accumulator.
    Folded(DeviceTimes),
}

impl CollectStatus {
    pub fn is_folded(&self) -> bool {
        matches!(self, CollectStatus::Folded(_))
    }
}

/// Interface shared by the device timer variants.
///
/// Starting is variant specific (it needs the variant's execution context); the
/// rest of the cycle, the statistics and the reports are uniform, so timers of
/// different backends can sit side by side as `Box<dyn DeviceTimer>`.
pub trait DeviceTimer {
    /// Label of the device component in detailed reports.
    fn label(&self) -> &'static str;

    /// Ends the in-flight measurement. No-op when nothing was started.
    fn stop(&mut self);

    /// Folds the in-flight measurement if its result is ready. Never blocks.
    fn collect(&mut self) -> Result<CollectStatus, TimerError>;

    /// Folds the in-flight measurement, blocking until the device delivers it.
    fn force_collect(&mut self) -> Result<CollectStatus, TimerError>;

    /// Clears accumulated statistics and detaches from any in-flight measurement.
    fn reset(&mut self);

    /// `true` when no measurement is in flight.
    fn is_finished(&self) -> bool;

    fn accumulator(&self) -> &DetailedAccumulator;

    fn last_time(&self) -> Duration {
        self.accumulator().base().last_time()
    }

    fn accumulated_time(&self) -> Duration {
        self.accumulator().base().accumulated_time()
    }

    fn accumulation_count(&self) -> u64 {
        self.accumulator().count()
    }

    fn average_time(&self) -> Duration {
        self.accumulator().base().average_time()
    }

    fn detailed_last_time(&self) -> DeviceTimes {
        self.accumulator().last()
    }

    fn detailed_accumulated_time(&self) -> DeviceTimes {
        self.accumulator().accumulated()
    }

    fn detailed_average_time(&self) -> DeviceTimes {
        self.accumulator().average()
    }

    fn report(&self, w: &mut dyn fmt::Write, unit: TimeUnit) -> fmt::Result {
        report::report(w, self.detailed_average_time().device, unit)
    }

    fn report_throughput(
        &self,
        w: &mut dyn fmt::Write,
        size: u64,
        unit: TimeUnit,
        tp_unit: ThroughputUnit,
    ) -> fmt::Result {
        report::report_throughput(w, self.detailed_average_time().device, size, unit, tp_unit)
    }

    fn detailed_report(&self, w: &mut dyn fmt::Write, unit: TimeUnit) -> fmt::Result {
        report::detailed_report(w, self.label(), self.detailed_average_time(), unit)
    }

    fn detailed_report_throughput(
        &self,
        w: &mut dyn fmt::Write,
        size: u64,
        unit: TimeUnit,
        tp_unit: ThroughputUnit,
    ) -> fmt::Result {
        report::detailed_report_throughput(
            w,
            self.label(),
            self.detailed_average_time(),
            size,
            unit,
            tp_unit,
        )
    }
}
