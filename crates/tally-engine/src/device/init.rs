/// Initialization parameters for the headless GPU layer.
///
/// Keep this structure stable and minimal. Add configuration flags only when a
/// concrete platform or backend requirement exists.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Adapter selection preference.
    pub power_preference: wgpu::PowerPreference,

    /// Backends the instance may pick from.
    pub backends: wgpu::Backends,

    /// Required wgpu features.
    ///
    /// Timer queries need `TIMESTAMP_QUERY`; recording timestamps between
    /// submissions additionally needs `TIMESTAMP_QUERY_INSIDE_ENCODERS`.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    /// Debug label of the logical device.
    pub label: String,
}

impl GpuInit {
    /// Features every timer backend in this crate relies on.
    pub fn timer_features() -> wgpu::Features {
        wgpu::Features::TIMESTAMP_QUERY | wgpu::Features::TIMESTAMP_QUERY_INSIDE_ENCODERS
    }
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            backends: wgpu::Backends::all(),
            required_features: Self::timer_features(),
            required_limits: wgpu::Limits::default(),
            label: "tally-engine device".to_string(),
        }
    }
}
