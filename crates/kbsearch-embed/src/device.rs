use candle_core::Device;

/// Metal when built with the `metal` feature and a GPU is present, else CPU.
pub fn select_device() -> Device {
    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(dev) => {
                tracing::info!(device = "metal", "embedding device selected");
                return dev;
            }
            Err(e) => tracing::warn!("metal unavailable, falling back to CPU: {e}"),
        }
    }
    tracing::info!(device = "cpu", "embedding device selected");
    Device::Cpu
}
