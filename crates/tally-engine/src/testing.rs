//! Hand-driven clock and device doubles for unit tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use crate::device::{DeviceError, EventQueue, Gpu, GpuInit, QueryDevice, TimestampContext};
use crate::time::{CpuClock, CpuTimes};

/// Headless device with timestamp support, or `None` when the machine has none.
pub(crate) fn headless_gpu() -> Option<Gpu> {
    match Gpu::new_blocking(GpuInit::default()) {
        Ok(gpu) if gpu.supports_timestamps() => Some(gpu),
        Ok(gpu) => {
            eprintln!("skipping: {} lacks timestamp queries", gpu.adapter_info().name);
            None
        }
        Err(err) => {
            eprintln!("skipping: {err:#}");
            None
        }
    }
}

/// Clock advanced by hand; clones share the same time.
#[derive(Clone, Default)]
pub(crate) struct StepClock {
    now: Rc<Cell<CpuTimes>>,
}

impl StepClock {
    pub(crate) fn advance(&self, wall_ms: u64, user_ms: u64, system_ms: u64) {
        let t = self.now.get();
        self.now.set(CpuTimes {
            wall: t.wall + Duration::from_millis(wall_ms),
            user: t.user + Duration::from_millis(user_ms),
            system: t.system + Duration::from_millis(system_ms),
        });
    }
}

impl CpuClock for StepClock {
    fn sample(&self) -> CpuTimes {
        self.now.get()
    }
}

#[derive(Debug, Default)]
pub(crate) struct ManualQuery {
    value: Cell<Option<u64>>,
}

/// Query allocator that can be told to fail.
#[derive(Default)]
pub(crate) struct ManualDevice {
    pub(crate) fail: bool,
    pub(crate) created: Cell<usize>,
}

impl QueryDevice for ManualDevice {
    type Query = ManualQuery;

    fn create_timer_query(&self) -> Result<ManualQuery, DeviceError> {
        if self.fail {
            return Err(DeviceError::Unsupported("timer queries".to_string()));
        }
        self.created.set(self.created.get() + 1);
        Ok(ManualQuery::default())
    }
}

/// Timestamp context whose tick values and readiness are scripted by the test.
pub(crate) struct ManualContext {
    ticks: RefCell<VecDeque<u64>>,
    pub(crate) ready: Cell<bool>,
    pub(crate) fail_readback: Cell<bool>,
    pub(crate) period: Cell<f32>,
    pub(crate) issued: Cell<usize>,
    pub(crate) blocking_reads: Cell<usize>,
}

impl ManualContext {
    /// Context handing out `ticks` in order, one per recorded timestamp.
    pub(crate) fn scripted(ticks: impl IntoIterator<Item = u64>) -> Rc<Self> {
        Rc::new(Self {
            ticks: RefCell::new(ticks.into_iter().collect()),
            ready: Cell::new(true),
            fail_readback: Cell::new(false),
            period: Cell::new(1.0),
            issued: Cell::new(0),
            blocking_reads: Cell::new(0),
        })
    }

    pub(crate) fn push_ticks(&self, ticks: impl IntoIterator<Item = u64>) {
        self.ticks.borrow_mut().extend(ticks);
    }
}

impl TimestampContext for ManualContext {
    type Query = ManualQuery;

    fn query_time_stamp(&self, query: &ManualQuery) {
        let tick = self.ticks.borrow_mut().pop_front().unwrap_or(0);
        query.value.set(Some(tick));
        self.issued.set(self.issued.get() + 1);
    }

    fn query_result_available(&self, query: &ManualQuery) -> bool {
        self.ready.get() && query.value.get().is_some()
    }

    fn collect_query_result(&self, query: &ManualQuery) -> Result<u64, DeviceError> {
        self.blocking_reads.set(self.blocking_reads.get() + 1);
        if self.fail_readback.get() {
            return Err(DeviceError::Map("scripted failure".to_string()));
        }
        query.value.get().ok_or(DeviceError::NotIssued)
    }

    fn timestamp_period(&self) -> f32 {
        self.period.get()
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ManualEvent {
    pub(crate) elapsed_ns: u64,
}

/// Event queue whose completion is scripted by the test.
pub(crate) struct ManualQueue {
    pub(crate) complete: Cell<bool>,
    pub(crate) fail_readback: Cell<bool>,
    pub(crate) waits: Cell<usize>,
}

impl ManualQueue {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self {
            complete: Cell::new(true),
            fail_readback: Cell::new(false),
            waits: Cell::new(0),
        })
    }
}

impl EventQueue for ManualQueue {
    type Event = ManualEvent;

    fn event_complete(&self, _event: &ManualEvent) -> bool {
        self.complete.get()
    }

    fn wait_for_event(&self, _event: &ManualEvent) -> Result<(), DeviceError> {
        self.waits.set(self.waits.get() + 1);
        Ok(())
    }

    fn event_elapsed(&self, event: &ManualEvent) -> Result<u64, DeviceError> {
        if self.fail_readback.get() {
            return Err(DeviceError::Map("scripted failure".to_string()));
        }
        Ok(event.elapsed_ns)
    }
}
