use super::DeviceError;

/// Allocates timestamp query objects.
pub trait QueryDevice {
    type Query;

    fn create_timer_query(&self) -> Result<Self::Query, DeviceError>;
}

/// Execution context that records timestamps in submission order.
///
/// Results become readable once the device has executed all work submitted
/// before the timestamp.
pub trait TimestampContext {
    type Query;

    /// Records the device clock into `query`.
    fn query_time_stamp(&self, query: &Self::Query);

    /// Non-blocking readiness check.
    fn query_result_available(&self, query: &Self::Query) -> bool;

    /// Reads back the tick value, blocking until it is available.
    fn collect_query_result(&self, query: &Self::Query) -> Result<u64, DeviceError>;

    /// Nanoseconds per tick.
    fn timestamp_period(&self) -> f32 {
        1.0
    }
}

/// Execution queue whose enqueued work reports timing through an event.
pub trait EventQueue {
    type Event;

    /// Non-blocking completion check.
    fn event_complete(&self, event: &Self::Event) -> bool;

    /// Blocks until the event completes.
    fn wait_for_event(&self, event: &Self::Event) -> Result<(), DeviceError>;

    /// Device time between the start and end of the event's work, in nanoseconds.
    ///
    /// Only meaningful once the event completed.
    fn event_elapsed(&self, event: &Self::Event) -> Result<u64, DeviceError>;
}
