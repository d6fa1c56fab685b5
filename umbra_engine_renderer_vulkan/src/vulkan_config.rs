/// Vulkan backend configuration

/// Minimum severity of validation messages forwarded to the engine log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    /// Only errors
    ErrorsOnly,
    /// Errors and warnings
    ErrorsAndWarnings,
    /// All messages (verbose)
    All,
}

/// Configuration for `VulkanGraphicsDevice::new`
#[derive(Debug, Clone)]
pub struct VulkanConfig {
    /// Enable the Khronos validation layer and the debug messenger.
    ///
    /// Only honored when the crate is built with the `vulkan-validation` feature.
    pub enable_validation: bool,

    /// Application name reported to the driver
    pub app_name: String,

    /// Validation message filter
    pub debug_severity: DebugSeverity,
}

impl Default for VulkanConfig {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            app_name: "Umbra Application".to_string(),
            debug_severity: DebugSeverity::ErrorsAndWarnings,
        }
    }
}
