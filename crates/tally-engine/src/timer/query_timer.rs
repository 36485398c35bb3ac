use std::rc::Rc;
use std::time::Duration;

use super::in_flight::{InFlight, live_context};
use super::{CollectStatus, DeviceTimer, TimerError};
use crate::device::{QueryDevice, TimestampContext};
use crate::time::{CpuTimer, DetailedAccumulator, DeviceTimes};

const LABEL: &str = "render";

/// Ticks between two samples of a free-running 64-bit device counter.
///
/// Correct across one counter wraparound between the samples.
pub fn elapsed_ticks(start: u64, end: u64) -> u64 {
    if end >= start {
        end - start
    } else {
        (!start).wrapping_add(1).wrapping_add(end)
    }
}

fn ticks_to_duration(ticks: u64, period_ns: f32) -> Duration {
    if period_ns == 1.0 {
        return Duration::from_nanos(ticks);
    }
    Duration::from_nanos((ticks as f64 * f64::from(period_ns)).round() as u64)
}

/// Accumulating timer built on a begin/end pair of timestamp queries.
///
/// Device time is the difference of the two timestamps; the CPU split comes from
/// a [`CpuTimer`] running over the same `start`/`stop` span. The query pair is
/// allocated up front and owned by the timer for its whole lifetime.
pub struct AccumTimerQuery<C: TimestampContext> {
    begin: C::Query,
    end: C::Query,
    in_flight: Option<InFlight<C>>,
    cpu_timer: CpuTimer,
    acc: DetailedAccumulator,
}

impl<C: TimestampContext> AccumTimerQuery<C> {
    /// Allocates the query pair on `device`.
    pub fn new<D>(device: &D) -> Result<Self, TimerError>
    where
        D: QueryDevice<Query = C::Query>,
    {
        Self::with_cpu_timer(device, CpuTimer::new())
    }

    pub fn with_cpu_timer<D>(device: &D, cpu_timer: CpuTimer) -> Result<Self, TimerError>
    where
        D: QueryDevice<Query = C::Query>,
    {
        let begin = device
            .create_timer_query()
            .map_err(TimerError::Construction)?;
        let end = device
            .create_timer_query()
            .map_err(TimerError::Construction)?;

        log::debug!("{LABEL} timer: query pair allocated");

        Ok(Self {
            begin,
            end,
            in_flight: None,
            cpu_timer,
            acc: DetailedAccumulator::new(),
        })
    }

    /// Records the begin timestamp on `context`.
    ///
    /// Ignored while an earlier measurement is still in flight, so overlapping
    /// starts never clobber the begin/end pair.
    pub fn start(&mut self, context: &Rc<C>) {
        if self.in_flight.is_some() {
            log::trace!("{LABEL} timer: start ignored, measurement in flight");
            return;
        }

        self.cpu_timer.start();
        context.query_time_stamp(&self.begin);
        self.in_flight = Some(InFlight::new(context));
    }

    /// Reads both timestamps (blocking) and folds the difference.
    fn fold(&mut self, context: &C) -> Result<DeviceTimes, TimerError> {
        let start = context.collect_query_result(&self.begin);
        let end = context.collect_query_result(&self.end);
        self.in_flight = None;

        let (start, end) = match (start, end) {
            (Ok(start), Ok(end)) => (start, end),
            (Err(err), _) | (_, Err(err)) => {
                log::warn!("{LABEL} timer: dropping measurement: {err}");
                return Err(TimerError::Readback(err));
            }
        };

        let device = ticks_to_duration(elapsed_ticks(start, end), context.timestamp_period());
        Ok(self.acc.fold(device, self.cpu_timer.detailed_elapsed()))
    }
}

impl<C: TimestampContext> DeviceTimer for AccumTimerQuery<C> {
    fn label(&self) -> &'static str {
        LABEL
    }

    fn stop(&mut self) {
        match &self.in_flight {
            Some(f) if !f.is_stopped() => {}
            _ => return,
        }
        let Some(context) = live_context(&mut self.in_flight, LABEL) else {
            return;
        };

        context.query_time_stamp(&self.end);
        self.cpu_timer.stop();
        if let Some(f) = self.in_flight.as_mut() {
            f.mark_stopped();
        }
    }

    fn collect(&mut self) -> Result<CollectStatus, TimerError> {
        match &self.in_flight {
            None => return Ok(CollectStatus::Idle),
            Some(f) if !f.is_stopped() => return Ok(CollectStatus::Pending),
            Some(_) => {}
        }
        let Some(context) = live_context(&mut self.in_flight, LABEL) else {
            return Ok(CollectStatus::Idle);
        };

        if !context.query_result_available(&self.end) {
            return Ok(CollectStatus::Pending);
        }
        self.fold(&context).map(CollectStatus::Folded)
    }

    /// A measurement that was started but not stopped is stopped first.
    fn force_collect(&mut self) -> Result<CollectStatus, TimerError> {
        if self.in_flight.is_none() {
            return Ok(CollectStatus::Idle);
        }
        self.stop();
        let Some(context) = live_context(&mut self.in_flight, LABEL) else {
            return Ok(CollectStatus::Idle);
        };

        self.fold(&context).map(CollectStatus::Folded)
    }

    fn reset(&mut self) {
        self.acc.reset();
        self.in_flight = None;
    }

    fn is_finished(&self) -> bool {
        self.in_flight.is_none()
    }

    fn accumulator(&self) -> &DetailedAccumulator {
        &self.acc
    }
}
