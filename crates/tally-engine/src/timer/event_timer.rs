use std::rc::Rc;
use std::time::Duration;

use super::in_flight::{InFlight, live_context};
use super::{CollectStatus, DeviceTimer, TimerError};
use crate::device::{DeviceError, EventQueue};
use crate::time::{CpuTimer, DetailedAccumulator, DeviceTimes};

const LABEL: &str = "compute";

/// Accumulating timer built on a single device event.
///
/// The caller hands [`event_slot`](Self::event_slot) to the enqueue call of the
/// work being timed; the queue fills it with the event that reports the work's
/// device time. Folded events are parked and handed out again by the next
/// `event_slot` call, so backends can reuse them.
pub struct AccumEventTimer<Q: EventQueue> {
    event: Option<Q::Event>,
    spare: Option<Q::Event>,
    in_flight: Option<InFlight<Q>>,
    cpu_timer: CpuTimer,
    acc: DetailedAccumulator,
}

impl<Q: EventQueue> AccumEventTimer<Q> {
    pub fn new() -> Self {
        Self::with_cpu_timer(CpuTimer::new())
    }

    pub fn with_cpu_timer(cpu_timer: CpuTimer) -> Self {
        Self {
            event: None,
            spare: None,
            in_flight: None,
            cpu_timer,
            acc: DetailedAccumulator::new(),
        }
    }

    /// Opens a measurement on `queue`. Ignored while one is still in flight.
    pub fn start(&mut self, queue: &Rc<Q>) {
        if self.in_flight.is_some() {
            log::trace!("{LABEL} timer: start ignored, measurement in flight");
            return;
        }

        self.cpu_timer.start();
        self.in_flight = Some(InFlight::new(queue));
    }

    /// Out-slot for the event of the timed work.
    pub fn event_slot(&mut self) -> &mut Option<Q::Event> {
        if self.event.is_none() {
            self.event = self.spare.take();
        }
        &mut self.event
    }

    /// Event attached to the current measurement, if any.
    pub fn event(&self) -> Option<&Q::Event> {
        self.event.as_ref()
    }

    fn fold(&mut self, queue: &Q) -> Result<DeviceTimes, TimerError> {
        self.in_flight = None;
        let Some(event) = self.event.take() else {
            return Err(TimerError::Readback(DeviceError::NotIssued));
        };
        let elapsed = queue.event_elapsed(&event);
        self.spare = Some(event);

        let ns = elapsed.map_err(|err| {
            log::warn!("{LABEL} timer: dropping measurement: {err}");
            TimerError::Readback(err)
        })?;
        Ok(self.acc.fold(Duration::from_nanos(ns), self.cpu_timer.detailed_elapsed()))
    }

    /// Stopped measurements without an attached event are discarded.
    fn has_event(&mut self) -> bool {
        if self.event.is_some() {
            return true;
        }
        log::debug!("{LABEL} timer: no event was attached to the measured work; discarding it");
        self.in_flight = None;
        false
    }
}

impl<Q: EventQueue> Default for AccumEventTimer<Q> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Q: EventQueue> DeviceTimer for AccumEventTimer<Q> {
    fn label(&self) -> &'static str {
        LABEL
    }

    /// The event itself closes with the enqueued work; this only stops the CPU side.
    fn stop(&mut self) {
        if let Some(f) = self.in_flight.as_mut() {
            if !f.is_stopped() {
                self.cpu_timer.stop();
                f.mark_stopped();
            }
        }
    }

    fn collect(&mut self) -> Result<CollectStatus, TimerError> {
        match &self.in_flight {
            None => return Ok(CollectStatus::Idle),
            Some(f) if !f.is_stopped() => return Ok(CollectStatus::Pending),
            Some(_) => {}
        }
        let Some(queue) = live_context(&mut self.in_flight, LABEL) else {
            return Ok(CollectStatus::Idle);
        };
        if !self.has_event() {
            return Ok(CollectStatus::Idle);
        }

        let complete = self
            .event
            .as_ref()
            .is_some_and(|event| queue.event_complete(event));
        if !complete {
            return Ok(CollectStatus::Pending);
        }
        self.fold(&queue).map(CollectStatus::Folded)
    }

    /// A measurement that was started but not stopped is stopped first.
    fn force_collect(&mut self) -> Result<CollectStatus, TimerError> {
        if self.in_flight.is_none() {
            return Ok(CollectStatus::Idle);
        }
        self.stop();
        let Some(queue) = live_context(&mut self.in_flight, LABEL) else {
            return Ok(CollectStatus::Idle);
        };
        if !self.has_event() {
            return Ok(CollectStatus::Idle);
        }

        if let Some(event) = self.event.as_ref() {
            if let Err(err) = queue.wait_for_event(event) {
                self.in_flight = None;
                log::warn!("{LABEL} timer: dropping measurement: {err}");
                return Err(TimerError::Readback(err));
            }
        }
        self.fold(&queue).map(CollectStatus::Folded)
    }

    /// An attached event is parked for reuse by the next enqueue.
    fn reset(&mut self) {
        self.acc.reset();
        self.in_flight = None;
        if let Some(event) = self.event.take() {
            self.spare = Some(event);
        }
    }

    fn is_finished(&self) -> bool {
        self.in_flight.is_none()
    }

    fn accumulator(&self) -> &DetailedAccumulator {
        &self.acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ManualEvent, ManualQueue, StepClock};

    fn timed(t: &mut AccumEventTimer<ManualQueue>, queue: &Rc<ManualQueue>, ns: u64) {
        t.start(queue);
        *t.event_slot() = Some(ManualEvent { elapsed_ns: ns });
        t.stop();
    }

    #[test]
    fn complete_event_is_folded() {
        let queue = ManualQueue::new();
        let mut t = AccumEventTimer::new();

        timed(&mut t, &queue, 1_500);

        assert!(t.collect().unwrap().is_folded());
        assert_eq!(t.last_time(), Duration::from_nanos(1_500));
        assert_eq!(t.accumulation_count(), 1);
        assert!(t.is_finished());
    }

    #[test]
    fn each_fold_adds_last_time() {
        let queue = ManualQueue::new();
        let mut t = AccumEventTimer::new();

        for ns in [10, 20, 30] {
            let before = t.accumulated_time();
            timed(&mut t, &queue, ns);
            t.collect().unwrap();
            assert_eq!(t.accumulated_time(), before + t.last_time());
        }
        assert_eq!(t.accumulation_count(), 3);
        assert_eq!(t.average_time(), Duration::from_nanos(20));
    }

    #[test]
    fn incomplete_event_stays_pending() {
        let queue = ManualQueue::new();
        queue.complete.set(false);
        let mut t = AccumEventTimer::new();

        timed(&mut t, &queue, 900);

        assert_eq!(t.collect().unwrap(), CollectStatus::Pending);
        assert_eq!(t.accumulation_count(), 0);
        assert!(!t.is_finished());
        assert_eq!(queue.waits.get(), 0);
    }

    #[test]
    fn force_collect_waits_and_folds() {
        let queue = ManualQueue::new();
        queue.complete.set(false);
        let mut t = AccumEventTimer::new();

        timed(&mut t, &queue, 900);

        assert!(t.force_collect().unwrap().is_folded());
        assert_eq!(queue.waits.get(), 1);
        assert_eq!(t.last_time(), Duration::from_nanos(900));
    }

    #[test]
    fn second_start_keeps_first_measurement() {
        let clock = StepClock::default();
        let queue = ManualQueue::new();
        let mut t: AccumEventTimer<ManualQueue> =
            AccumEventTimer::with_cpu_timer(CpuTimer::with_clock(Box::new(clock.clone())));

        t.start(&queue);
        clock.advance(4, 0, 0);
        t.start(&queue);
        clock.advance(1, 0, 0);
        *t.event_slot() = Some(ManualEvent { elapsed_ns: 50 });
        t.stop();
        t.collect().unwrap();

        assert_eq!(t.detailed_last_time().wall, Duration::from_millis(5));
    }

    #[test]
    fn folded_event_is_not_reused_implicitly() {
        let queue = ManualQueue::new();
        let mut t = AccumEventTimer::new();
        timed(&mut t, &queue, 70);
        t.collect().unwrap();

        t.start(&queue);
        t.stop();

        assert_eq!(t.collect().unwrap(), CollectStatus::Idle);
        assert_eq!(t.accumulation_count(), 1);
    }

    #[test]
    fn stopped_without_event_is_discarded() {
        let queue = ManualQueue::new();
        let mut t = AccumEventTimer::new();

        t.start(&queue);
        t.stop();

        assert_eq!(t.collect().unwrap(), CollectStatus::Idle);
        assert!(t.is_finished());
        assert_eq!(t.accumulation_count(), 0);
    }

    #[test]
    fn reset_clears_and_keeps_event() {
        let queue = ManualQueue::new();
        let mut t = AccumEventTimer::new();
        timed(&mut t, &queue, 70);
        t.collect().unwrap();

        t.start(&queue);
        t.reset();

        assert_eq!(t.accumulated_time(), Duration::ZERO);
        assert_eq!(t.accumulation_count(), 0);
        assert_eq!(t.collect().unwrap(), CollectStatus::Idle);
        assert!(t.event().is_none());
        assert_eq!(t.event_slot().as_ref().map(|e| e.elapsed_ns), Some(70));
        assert_eq!(t.detailed_last_time().device, Duration::from_nanos(70));
    }

    #[test]
    fn readback_failure_drops_measurement() {
        let queue = ManualQueue::new();
        queue.fail_readback.set(true);
        let mut t = AccumEventTimer::new();

        timed(&mut t, &queue, 70);

        assert!(matches!(t.collect(), Err(TimerError::Readback(_))));
        assert!(t.is_finished());
        assert_eq!(t.accumulation_count(), 0);
    }

    #[test]
    fn dropped_queue_detaches() {
        let queue = ManualQueue::new();
        let mut t = AccumEventTimer::new();

        timed(&mut t, &queue, 70);
        drop(queue);

        assert_eq!(t.force_collect().unwrap(), CollectStatus::Idle);
        assert!(t.is_finished());
    }
}
