use std::fmt;

/// Failure reported by a device backend.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DeviceError {
    /// The device lacks a capability the query or event needs.
    Unsupported(String),
    /// A result was requested from a query or event that was never issued.
    NotIssued,
    /// Mapping the readback buffer failed.
    Map(String),
    /// Polling the device failed (commonly device loss).
    Poll(String),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::Unsupported(what) => write!(f, "device does not support {what}"),
            DeviceError::NotIssued => f.write_str("query result requested before the query was issued"),
            DeviceError::Map(msg) => write!(f, "failed to map readback buffer: {msg}"),
            DeviceError::Poll(msg) => write!(f, "failed to poll device: {msg}"),
        }
    }
}

impl std::error::Error for DeviceError {}
