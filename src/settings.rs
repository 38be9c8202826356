//! Device Settings
//!
//! Configuration consumed once by [`Device::new`](crate::device::Device::new).
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use vellum::DeviceSettings;
//!
//! // Defaults: allocation errors are polled, uniform buffers are native when possible.
//! let settings = DeviceSettings::default();
//!
//! // A driver known to mishandle buffer updates on bound uniform blocks.
//! let settings = DeviceSettings::default()
//!     .with_label("canvas")
//!     .with_force_shadow_uniforms(true);
//! ```

/// Per-device configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSettings {
    /// Name used to tag this device's log lines.
    pub label: String,

    /// Poll `glGetError` after storage allocations so out-of-memory conditions fail the
    /// creation instead of surfacing at draw time.
    ///
    /// Each poll is a synchronous round-trip on some drivers. Default: `true`.
    pub check_allocation_errors: bool,

    /// Keep every uniform buffer in CPU memory and upload it through per-uniform calls,
    /// even when the context supports uniform blocks.
    ///
    /// Required on platforms that forbid writing a buffer while it stays bound to a
    /// uniform block. Default: `false`.
    pub force_shadow_uniforms: bool,

    /// Upper bound on the texture units tracked by the state cache. `None` uses the
    /// context limit.
    pub max_texture_units: Option<u32>,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            label: String::from("device"),
            check_allocation_errors: true,
            force_shadow_uniforms: false,
            max_texture_units: None,
        }
    }
}

impl DeviceSettings {
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    #[must_use]
    pub fn with_check_allocation_errors(mut self, enabled: bool) -> Self {
        self.check_allocation_errors = enabled;
        self
    }

    #[must_use]
    pub fn with_force_shadow_uniforms(mut self, enabled: bool) -> Self {
        self.force_shadow_uniforms = enabled;
        self
    }

    #[must_use]
    pub fn with_max_texture_units(mut self, units: u32) -> Self {
        self.max_texture_units = Some(units);
        self
    }
}
