use super::backend::EventQueue;
use super::readback::ReadbackSlot;
use super::DeviceError;
use crate::timer::elapsed_ticks;

/// Completion/timing handle for one enqueued batch of work.
///
/// Brackets the batch with a begin/end timestamp pair that is resolved in the
/// same submission.
pub struct WgpuEvent {
    slot: ReadbackSlot,
}

impl WgpuEvent {
    pub(super) fn new(device: &wgpu::Device) -> Self {
        Self {
            slot: ReadbackSlot::new(device, 2, "tally event"),
        }
    }
}

/// Compute-side execution queue handing out [`WgpuEvent`]s.
#[derive(Clone)]
pub struct ComputeQueue {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl ComputeQueue {
    pub(crate) fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self { device, queue }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Records `record` into a fresh encoder and submits it.
    ///
    /// When `event` is given the batch is timed: an existing event in the slot is
    /// reused, otherwise one is created and stored there.
    pub fn enqueue<F>(
        &self,
        event: Option<&mut Option<WgpuEvent>>,
        label: &str,
        record: F,
    ) -> wgpu::SubmissionIndex
    where
        F: FnOnce(&mut wgpu::CommandEncoder),
    {
        let timed: Option<&mut WgpuEvent> = event
            .map(|slot| slot.get_or_insert_with(|| WgpuEvent::new(&self.device)))
            .filter(|ev| match ev.slot.prepare(&self.device) {
                Ok(()) => true,
                Err(err) => {
                    log::warn!("{label}: submitting untimed, event still busy: {err}");
                    false
                }
            });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) });

        if let Some(ev) = timed.as_deref() {
            ev.slot.write(&mut encoder, 0);
        }

        record(&mut encoder);

        if let Some(ev) = timed.as_deref() {
            ev.slot.write(&mut encoder, 1);
            ev.slot.resolve(&mut encoder);
        }

        let index = self.queue.submit(std::iter::once(encoder.finish()));

        if let Some(ev) = timed {
            ev.slot.begin_map();
        }
        index
    }
}

impl EventQueue for ComputeQueue {
    type Event = WgpuEvent;

    fn event_complete(&self, event: &WgpuEvent) -> bool {
        event.slot.is_ready(&self.device)
    }

    fn wait_for_event(&self, event: &WgpuEvent) -> Result<(), DeviceError> {
        if !event.slot.is_issued() {
            return Err(DeviceError::NotIssued);
        }
        super::readback::poll(&self.device, true)
    }

    fn event_elapsed(&self, event: &WgpuEvent) -> Result<u64, DeviceError> {
        let values = event.slot.read(&self.device)?;
        let (begin, end) = match values.as_slice() {
            [begin, end] => (*begin, *end),
            _ => return Err(DeviceError::NotIssued),
        };

        Ok(elapsed_ns(begin, end, self.queue.get_timestamp_period()))
    }
}

fn elapsed_ns(begin: u64, end: u64, period_ns: f32) -> u64 {
    let ticks = elapsed_ticks(begin, end);
    (ticks as f64 * f64::from(period_ns)).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_ns_survives_counter_wrap() {
        assert_eq!(elapsed_ns(u64::MAX - 9, 10, 1.0), 20);
    }

    #[test]
    fn elapsed_ns_scales_by_period() {
        assert_eq!(elapsed_ns(100, 200, 2.5), 250);
        assert_eq!(elapsed_ns(7, 7, 83.333), 0);
    }
}
