use std::fmt;

use crate::device::DeviceError;

/// Failure surfaced by a device timer.
///
/// "Result not ready yet" is not an error; see [`CollectStatus::Pending`](super::CollectStatus).
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum TimerError {
    /// Query objects could not be allocated; no timer was built.
    Construction(DeviceError),
    /// Reading back a finished measurement failed. The measurement is dropped.
    Readback(DeviceError),
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerError::Construction(_) => f.write_str("error creating timer query objects"),
            TimerError::Readback(_) => f.write_str("error reading back timer results"),
        }
    }
}

impl std::error::Error for TimerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TimerError::Construction(err) | TimerError::Readback(err) => Some(err),
        }
    }
}
