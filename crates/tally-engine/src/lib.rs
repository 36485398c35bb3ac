//! Tally engine crate.
//!
//! Accumulating timers for profiling GPU and CPU work: device timers that
//! reconcile asynchronous GPU results with CPU wall/user/system time, the
//! accumulators behind them, report formatting, and a headless wgpu backend.

pub mod config;
pub mod device;
pub mod logging;
pub mod report;
pub mod time;
pub mod timer;

#[cfg(test)]
mod testing;

pub use config::ReportConfig;
pub use timer::{AccumEventTimer, AccumTimerQuery, CollectStatus, DeviceTimer, TimerError};
