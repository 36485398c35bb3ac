//! GPU device layer.
//!
//! This module is responsible for:
//! - the capability traits timers are written against (`QueryDevice`,
//!   `TimestampContext`, `EventQueue`)
//! - a headless wgpu implementation of them (`Gpu`, `RenderContext`, `ComputeQueue`)

mod backend;
mod error;
mod event;
mod gpu;
mod init;
mod query;
mod readback;

pub use backend::{EventQueue, QueryDevice, TimestampContext};
pub use error::DeviceError;
pub use event::{ComputeQueue, WgpuEvent};
pub use gpu::Gpu;
pub use init::GpuInit;
pub use query::{RenderContext, WgpuTimestampQuery};
