use std::rc::Rc;

use anyhow::{Context, Result};
use tally_engine::device::{ComputeQueue, Gpu, GpuInit, RenderContext};
use tally_engine::logging::{LoggingConfig, init_logging};
use tally_engine::time::AccumTimer;
use tally_engine::{AccumEventTimer, AccumTimerQuery, DeviceTimer, ReportConfig};

/// Workload of one profiling run.
#[derive(Debug, Clone)]
struct StudioConfig {
    frames: u32,
    target_size: u32,
    copy_bytes: u64,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            frames: 240,
            target_size: 2048,
            copy_bytes: 64 * 1024 * 1024,
        }
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let report = ReportConfig::from_env();
    let config = StudioConfig::default();

    let gpu = Gpu::new_blocking(GpuInit::default()).context("failed to create headless GPU")?;
    let info = gpu.adapter_info();

    println!();
    println!("  tally studio");
    println!("  adapter   {} ({:?})", info.name, info.backend);
    println!("  period    {:.3} ns/tick", gpu.timestamp_period());
    println!("  workload  {} frames, {}px clear, {} B copy", config.frames, config.target_size, config.copy_bytes);
    println!();

    let render = Rc::new(gpu.render_context());
    let compute = Rc::new(gpu.compute_queue().context("compute timing unavailable")?);

    let mut clear_timer: AccumTimerQuery<RenderContext> =
        AccumTimerQuery::new(&gpu).context("failed to create render timer")?;
    let mut copy_timer: AccumEventTimer<ComputeQueue> = AccumEventTimer::new();
    let mut frame_timer = AccumTimer::new();

    let target = create_target(&gpu, config.target_size);
    let (src, dst) = create_copy_buffers(&gpu, config.copy_bytes);

    for frame in 0..config.frames {
        frame_timer.start();

        clear_timer.start(&render);
        clear(&render, &target, frame);
        clear_timer.stop();

        // Only attach the event when this frame opened a new measurement.
        let timed = copy_timer.is_finished();
        copy_timer.start(&compute);
        let slot = if timed { Some(copy_timer.event_slot()) } else { None };
        compute.enqueue(slot, "tally copy", |encoder| {
            encoder.copy_buffer_to_buffer(&src, 0, &dst, 0, config.copy_bytes);
        });
        copy_timer.stop();

        frame_timer.stop();

        collect(&mut clear_timer);
        collect(&mut copy_timer);
    }

    for timer in [&mut clear_timer as &mut dyn DeviceTimer, &mut copy_timer] {
        if let Err(err) = timer.force_collect() {
            log::warn!("{} timer: final collect failed: {err}", timer.label());
        }
    }

    let mut line = String::new();
    clear_timer.detailed_report(&mut line, report.time_unit)?;
    println!("  clear  x{:<5} {line}", clear_timer.accumulation_count());

    line.clear();
    copy_timer.detailed_report_throughput(
        &mut line,
        config.copy_bytes,
        report.time_unit,
        report.throughput_unit,
    )?;
    println!("  copy   x{:<5} {line}", copy_timer.accumulation_count());

    line.clear();
    frame_timer.detailed_report(&mut line, report.time_unit)?;
    println!("  frame  x{:<5} {line}", frame_timer.accumulation_count());
    println!();

    Ok(())
}

fn collect(timer: &mut dyn DeviceTimer) {
    if let Err(err) = timer.collect() {
        log::warn!("{} timer: {err}", timer.label());
    }
}

fn create_target(gpu: &Gpu, size: u32) -> wgpu::TextureView {
    let texture = gpu.device().create_texture(&wgpu::TextureDescriptor {
        label: Some("tally clear target"),
        size: wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_copy_buffers(gpu: &Gpu, size: u64) -> (wgpu::Buffer, wgpu::Buffer) {
    let buffer = |label, usage| {
        gpu.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage,
            mapped_at_creation: false,
        })
    };
    (
        buffer("tally copy src", wgpu::BufferUsages::COPY_SRC),
        buffer("tally copy dst", wgpu::BufferUsages::COPY_DST),
    )
}

/// Clears the target in its own submission; the color cycles so frames differ.
fn clear(render: &RenderContext, view: &wgpu::TextureView, frame: u32) {
    let shade = f64::from(frame % 64) / 63.0;

    let mut encoder = render
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("tally clear encoder"),
        });

    {
        let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("tally clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: shade,
                        g: 0.2,
                        b: 1.0 - shade,
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
    }

    render.queue().submit(std::iter::once(encoder.finish()));
}
