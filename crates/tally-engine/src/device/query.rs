use super::backend::TimestampContext;
use super::readback::ReadbackSlot;
use super::DeviceError;

/// Single-timestamp query object backed by a wgpu query set.
pub struct WgpuTimestampQuery {
    slot: ReadbackSlot,
}

impl WgpuTimestampQuery {
    pub(crate) fn new(device: &wgpu::Device) -> Self {
        Self {
            slot: ReadbackSlot::new(device, 1, "tally timer query"),
        }
    }

    /// Whether a timestamp was recorded and not read back yet.
    pub fn is_issued(&self) -> bool {
        self.slot.is_issued()
    }
}

/// Render-side execution context.
///
/// Each timestamp is recorded in its own small submission, so it lands between
/// the caller's submissions on the same queue.
#[derive(Clone)]
pub struct RenderContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl RenderContext {
    pub(crate) fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self { device, queue }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

impl TimestampContext for RenderContext {
    type Query = WgpuTimestampQuery;

    fn query_time_stamp(&self, query: &WgpuTimestampQuery) {
        if let Err(err) = query.slot.prepare(&self.device) {
            log::warn!("timestamp not recorded, slot still busy: {err}");
            return;
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("tally timestamp encoder"),
            });
        query.slot.write(&mut encoder, 0);
        query.slot.resolve(&mut encoder);
        self.queue.submit(std::iter::once(encoder.finish()));

        query.slot.begin_map();
    }

    fn query_result_available(&self, query: &WgpuTimestampQuery) -> bool {
        query.slot.is_ready(&self.device)
    }

    fn collect_query_result(&self, query: &WgpuTimestampQuery) -> Result<u64, DeviceError> {
        let values = query.slot.read(&self.device)?;
        values.first().copied().ok_or(DeviceError::NotIssued)
    }

    fn timestamp_period(&self) -> f32 {
        self.queue.get_timestamp_period()
    }
}
