use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use super::DeviceError;

const IDLE: u8 = 0;
const MAPPING: u8 = 1;
const READY: u8 = 2;
const FAILED: u8 = 3;

/// Timestamp query set plus the buffers needed to read it back on the CPU.
///
/// State moves `IDLE -> MAPPING` on `begin_map`, then to `READY`/`FAILED` when the
/// map callback fires during a device poll, and back to `IDLE` once read.
pub(crate) struct ReadbackSlot {
    query_set: wgpu::QuerySet,
    resolve: wgpu::Buffer,
    readback: wgpu::Buffer,
    count: u32,
    state: Arc<AtomicU8>,
    map_error: Arc<Mutex<Option<String>>>,
}

impl ReadbackSlot {
    pub(crate) fn new(device: &wgpu::Device, count: u32, label: &str) -> Self {
        let size = u64::from(count) * 8;

        let query_set = device.create_query_set(&wgpu::QuerySetDescriptor {
            label: Some(label),
            ty: wgpu::QueryType::Timestamp,
            count,
        });

        let resolve = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tally timestamp resolve"),
            size,
            usage: wgpu::BufferUsages::QUERY_RESOLVE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tally timestamp readback"),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self {
            query_set,
            resolve,
            readback,
            count,
            state: Arc::new(AtomicU8::new(IDLE)),
            map_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Makes the slot writable again, draining or discarding an earlier result.
    ///
    /// A slot abandoned while its map was still in flight is waited on here; the
    /// stale values are dropped. If the drain fails the slot stays `MAPPING` and
    /// must not be written.
    pub(crate) fn prepare(&self, device: &wgpu::Device) -> Result<(), DeviceError> {
        self.prepare_with(|| poll(device, true))
    }

    fn prepare_with<F>(&self, drain: F) -> Result<(), DeviceError>
    where
        F: FnOnce() -> Result<(), DeviceError>,
    {
        if self.state.load(Ordering::Acquire) == MAPPING {
            log::debug!("re-issuing a timestamp slot with a pending readback; draining it");
            drain()?;
            if self.state.load(Ordering::Acquire) == MAPPING {
                return Err(DeviceError::Poll(
                    "abandoned readback still pending after a blocking poll".to_string(),
                ));
            }
        }

        if self.state.load(Ordering::Acquire) == READY {
            self.readback.unmap();
        }
        self.state.store(IDLE, Ordering::Release);
        Ok(())
    }

    pub(crate) fn write(&self, encoder: &mut wgpu::CommandEncoder, index: u32) {
        debug_assert!(index < self.count);
        encoder.write_timestamp(&self.query_set, index);
    }

    /// Records the resolve + copy into the map-readable buffer.
    pub(crate) fn resolve(&self, encoder: &mut wgpu::CommandEncoder) {
        encoder.resolve_query_set(&self.query_set, 0..self.count, &self.resolve, 0);
        encoder.copy_buffer_to_buffer(
            &self.resolve,
            0,
            &self.readback,
            0,
            u64::from(self.count) * 8,
        );
    }

    /// Requests the readback mapping. Call after the resolving work was submitted.
    pub(crate) fn begin_map(&self) {
        self.state.store(MAPPING, Ordering::Release);

        let state = Arc::clone(&self.state);
        let map_error = Arc::clone(&self.map_error);
        self.readback
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |result| match result {
                Ok(()) => state.store(READY, Ordering::Release),
                Err(err) => {
                    if let Ok(mut slot) = map_error.lock() {
                        *slot = Some(err.to_string());
                    }
                    state.store(FAILED, Ordering::Release);
                }
            });
    }

    pub(crate) fn is_issued(&self) -> bool {
        self.state.load(Ordering::Acquire) != IDLE
    }

    /// Non-blocking: polls the device once and reports whether the map settled.
    pub(crate) fn is_ready(&self, device: &wgpu::Device) -> bool {
        match self.state.load(Ordering::Acquire) {
            IDLE => false,
            MAPPING => {
                if let Err(err) = poll(device, false) {
                    log::warn!("device poll failed: {err}");
                }
                matches!(self.state.load(Ordering::Acquire), READY | FAILED)
            }
            _ => true,
        }
    }

    /// Blocking readback of every value in the slot.
    pub(crate) fn read(&self, device: &wgpu::Device) -> Result<Vec<u64>, DeviceError> {
        match self.state.load(Ordering::Acquire) {
            IDLE => return Err(DeviceError::NotIssued),
            MAPPING => poll(device, true)?,
            _ => {}
        }

        match self.state.load(Ordering::Acquire) {
            READY => {
                let values = {
                    let view = self.readback.slice(..).get_mapped_range();
                    view.chunks_exact(8)
                        .map(bytemuck::pod_read_unaligned::<u64>)
                        .collect()
                };
                self.readback.unmap();
                self.state.store(IDLE, Ordering::Release);
                Ok(values)
            }
            FAILED => {
                self.state.store(IDLE, Ordering::Release);
                let msg = self
                    .map_error
                    .lock()
                    .ok()
                    .and_then(|mut slot| slot.take())
                    .unwrap_or_else(|| "unknown map error".to_string());
                Err(DeviceError::Map(msg))
            }
            _ => Err(DeviceError::Poll("readback did not complete after a blocking poll".to_string())),
        }
    }
}

/// Polls `device`, blocking until all submitted work completed when `wait` is set.
pub(crate) fn poll(device: &wgpu::Device, wait: bool) -> Result<(), DeviceError> {
    let ty = if wait {
        wgpu::PollType::wait_indefinitely()
    } else {
        wgpu::PollType::Poll
    };
    device
        .poll(ty)
        .map(|_| ())
        .map_err(|err| DeviceError::Poll(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::headless_gpu;

    fn submit_pair(device: &wgpu::Device, queue: &wgpu::Queue, slot: &ReadbackSlot) {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("readback test"),
        });
        slot.write(&mut encoder, 0);
        slot.write(&mut encoder, 1);
        slot.resolve(&mut encoder);
        queue.submit(std::iter::once(encoder.finish()));
        slot.begin_map();
    }

    #[test]
    fn read_before_issue_is_not_issued() {
        let Some(gpu) = headless_gpu() else { return };
        let slot = ReadbackSlot::new(gpu.device(), 2, "test slot");

        assert!(!slot.is_issued());
        assert!(!slot.is_ready(gpu.device()));
        assert!(matches!(slot.read(gpu.device()), Err(DeviceError::NotIssued)));
    }

    #[test]
    fn issued_slot_reads_back_and_returns_to_idle() {
        let Some(gpu) = headless_gpu() else { return };
        let slot = ReadbackSlot::new(gpu.device(), 2, "test slot");

        submit_pair(gpu.device(), gpu.queue(), &slot);
        assert!(slot.is_issued());

        let values = slot.read(gpu.device()).unwrap();
        assert_eq!(values.len(), 2);
        assert!(!slot.is_issued());
    }

    #[test]
    fn prepare_drains_a_pending_map() {
        let Some(gpu) = headless_gpu() else { return };
        let slot = ReadbackSlot::new(gpu.device(), 2, "test slot");

        submit_pair(gpu.device(), gpu.queue(), &slot);
        slot.prepare(gpu.device()).unwrap();
        assert!(!slot.is_issued());

        // Reissue on the drained slot must not trip wgpu validation.
        submit_pair(gpu.device(), gpu.queue(), &slot);
        assert_eq!(slot.read(gpu.device()).unwrap().len(), 2);
    }

    #[test]
    fn failed_drain_keeps_slot_mapping() {
        let Some(gpu) = headless_gpu() else { return };
        let slot = ReadbackSlot::new(gpu.device(), 2, "test slot");
        submit_pair(gpu.device(), gpu.queue(), &slot);

        let drained = slot.prepare_with(|| Err(DeviceError::Poll("device lost".to_string())));

        assert!(matches!(drained, Err(DeviceError::Poll(_))));
        assert_eq!(slot.state.load(Ordering::Acquire), MAPPING);

        slot.prepare(gpu.device()).unwrap();
        assert_eq!(slot.state.load(Ordering::Acquire), IDLE);
    }
}
