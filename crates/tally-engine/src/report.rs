//! Text reports for accumulated timings.
//!
//! Every function is a pure read of the values it is given and writes a single
//! line fragment (no trailing newline). Precision and width are set per call, so
//! nothing leaks into the caller's writer.

use std::fmt::{self, Write};
use std::time::Duration;

use crate::time::{CpuTimes, DeviceTimes, ThroughputUnit, TimeUnit};

/// `"{avg}{unit}"` with three decimals.
pub fn report(w: &mut dyn Write, average: Duration, unit: TimeUnit) -> fmt::Result {
    write!(w, "{:.3}{}", unit.convert(average), unit)
}

/// Like [`report`], followed by the throughput of `size` bytes when `size > 0`.
pub fn report_throughput(
    w: &mut dyn Write,
    average: Duration,
    size: u64,
    unit: TimeUnit,
    tp_unit: ThroughputUnit,
) -> fmt::Result {
    report(w, average, unit)?;
    write_throughput(w, average, size, tp_unit)
}

/// `"{label}:{device}{unit}, wall:{wall}{unit}"`.
pub fn detailed_report(
    w: &mut dyn Write,
    label: &str,
    average: DeviceTimes,
    unit: TimeUnit,
) -> fmt::Result {
    write!(
        w,
        "{}:{:>6.3}{}, wall:{:>6.3}{}",
        label,
        unit.convert(average.device),
        unit,
        unit.convert(average.wall),
        unit,
    )
}

/// Like [`detailed_report`], with the device-time throughput appended when `size > 0`.
pub fn detailed_report_throughput(
    w: &mut dyn Write,
    label: &str,
    average: DeviceTimes,
    size: u64,
    unit: TimeUnit,
    tp_unit: ThroughputUnit,
) -> fmt::Result {
    detailed_report(w, label, average, unit)?;
    write_throughput(w, average.device, size, tp_unit)
}

/// `"wall:{wall}{unit}, user:{user}{unit}, system:{system}{unit}"`.
pub fn cpu_report(w: &mut dyn Write, average: CpuTimes, unit: TimeUnit) -> fmt::Result {
    write!(
        w,
        "wall:{:>6.3}{u}, user:{:>6.3}{u}, system:{:>6.3}{u}",
        unit.convert(average.wall),
        unit.convert(average.user),
        unit.convert(average.system),
        u = unit,
    )
}

fn write_throughput(
    w: &mut dyn Write,
    time: Duration,
    size: u64,
    tp_unit: ThroughputUnit,
) -> fmt::Result {
    if size == 0 {
        return Ok(());
    }
    write!(w, ", {:>9.3}{}", tp_unit.throughput(size, time), tp_unit)
}
