//! Time subsystem.
//!
//! CPU-side clock sources and the accumulators shared by every timer:
//! - `CpuTimer` measures one span as a wall/user/system split
//! - `AccumTimerBase` / `DetailedAccumulator` fold repeated spans into last/sum/count
//! - `AccumTimer` is the CPU-only accumulating timer
//! - `TimeUnit` / `ThroughputUnit` drive report formatting

mod accum;
mod accum_timer;
mod cpu_timer;
mod units;

pub use accum::{AccumTimerBase, DetailedAccumulator, DeviceTimes};
pub use accum_timer::AccumTimer;
pub use cpu_timer::{CpuClock, CpuTimer, CpuTimes, ProcessClock};
pub use units::{ThroughputUnit, TimeUnit, UnknownUnit};
