use anyhow::{Context, Result};

use super::backend::QueryDevice;
use super::event::ComputeQueue;
use super::query::{RenderContext, WgpuTimestampQuery};
use super::{DeviceError, GpuInit};

/// Owns the wgpu adapter, device and queue for headless profiling.
///
/// This type is the low-level device layer:
/// - creates and stores Adapter/Device/Queue (no surface)
/// - allocates timer query objects
/// - hands out render contexts and compute queues sharing the device
pub struct Gpu {
    /// Selected adapter.
    adapter: wgpu::Adapter,

    /// Logical device.
    device: wgpu::Device,

    /// Command queue.
    queue: wgpu::Queue,
}

impl Gpu {
    /// Creates a headless GPU context.
    ///
    /// Timestamp features the adapter lacks are dropped from the request; timer
    /// construction reports them later instead.
    pub async fn new(init: GpuInit) -> Result<Self> {
        let GpuInit {
            power_preference,
            backends,
            required_features,
            required_limits,
            label,
        } = init;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let available = adapter.features();
        let missing = required_features - available;
        if !missing.is_empty() {
            log::warn!("adapter lacks requested features {missing:?}; timers may be unavailable");
        }

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some(label.as_str()),
                required_features: required_features & available,
                required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let info = adapter.get_info();
        log::info!("using adapter {} ({:?})", info.name, info.backend);

        Ok(Self {
            adapter,
            device,
            queue,
        })
    }

    /// Blocking variant of [`Gpu::new`].
    pub fn new_blocking(init: GpuInit) -> Result<Self> {
        pollster::block_on(Self::new(init))
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Returns a reference to the logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Returns a reference to the command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Whether timer queries can be created on this device.
    pub fn supports_timestamps(&self) -> bool {
        self.device.features().contains(GpuInit::timer_features())
    }

    /// Nanoseconds per timestamp tick.
    pub fn timestamp_period(&self) -> f32 {
        self.queue.get_timestamp_period()
    }

    pub fn render_context(&self) -> RenderContext {
        RenderContext::new(self.device.clone(), self.queue.clone())
    }

    /// Fails when the device cannot record timestamps, since every event needs them.
    pub fn compute_queue(&self) -> std::result::Result<ComputeQueue, DeviceError> {
        self.require_timestamps()?;
        Ok(ComputeQueue::new(self.device.clone(), self.queue.clone()))
    }

    fn require_timestamps(&self) -> std::result::Result<(), DeviceError> {
        if self.supports_timestamps() {
            Ok(())
        } else {
            Err(DeviceError::Unsupported(
                "timestamp queries inside command encoders".to_string(),
            ))
        }
    }
}

impl QueryDevice for Gpu {
    type Query = WgpuTimestampQuery;

    fn create_timer_query(&self) -> std::result::Result<WgpuTimestampQuery, DeviceError> {
        self.require_timestamps()?;
        Ok(WgpuTimestampQuery::new(&self.device))
    }
}
