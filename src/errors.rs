//! Error Types
//!
//! This module defines the error type returned by every fallible operation of the
//! GPU layer.
//!
//! # Overview
//!
//! [`GpuError`] follows the three failure families of the layer:
//! - **Invalid arguments**: zero sizes, disallowed usage combinations, formats that
//!   cannot be rendered to. Detected before any native call is issued.
//! - **Driver rejections**: a generate call returning zero, an incomplete framebuffer,
//!   a shader that fails to compile or link. Detected by querying status right after
//!   the native call.
//! - **Misuse of live objects**: mapping a buffer twice, using a resource released by
//!   device teardown, passing a resource to a device that does not own it.
//!
//! Missing hardware capabilities are *not* errors: they are routed to fallbacks when
//! the resource is created.
//!
//! Every factory is all-or-nothing. When an `Err` is returned, no native handle
//! allocated during the attempt is still alive.

use thiserror::Error;

use crate::gpu::PixelFormat;

/// The error type of the GPU layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    // ========================================================================
    // Invalid Arguments
    // ========================================================================
    /// A size, dimension or count that must be non-zero was zero.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The usage bits requested cannot be combined on this platform.
    #[error("Unsupported usage combination for {resource}: {reason}")]
    UnsupportedUsage {
        /// Kind of resource being created
        resource: &'static str,
        /// Why the combination was refused
        reason: String,
    },

    /// The pixel format cannot be sampled on this device.
    #[error("Pixel format {0:?} is not texturable on this device")]
    NonTexturableFormat(PixelFormat),

    /// RenderAttachment usage was requested for a format the device cannot render to.
    #[error("Pixel format {0:?} is not renderable on this device")]
    NonRenderableFormat(PixelFormat),

    /// A write or copy range falls outside of the destination.
    #[error("Range out of bounds: offset {offset} + size {size} exceeds {capacity}")]
    OutOfBounds {
        /// Start of the requested range
        offset: usize,
        /// Length of the requested range
        size: usize,
        /// Size of the destination
        capacity: usize,
    },

    // ========================================================================
    // Driver Rejections
    // ========================================================================
    /// A native generate/create call returned no object, or the driver reported
    /// an out-of-memory condition.
    #[error("Driver rejected allocation of {0}")]
    AllocationFailed(&'static str),

    /// A framebuffer did not reach the complete status.
    #[error("Framebuffer incomplete (status 0x{0:04X})")]
    FramebufferIncomplete(u32),

    /// Shader compilation failed. Contains the driver's info log.
    #[error("Shader compilation failed: {0}")]
    ShaderCompile(String),

    /// Program linking failed. Contains the driver's info log.
    #[error("Program link failed: {0}")]
    ProgramLink(String),

    /// Mapping a buffer range returned no pointer.
    #[error("Failed to map buffer range")]
    MapFailed,

    // ========================================================================
    // Interface & Capability Errors
    // ========================================================================
    /// A required native entry point could not be resolved.
    #[error("Missing required entry point: {0}")]
    MissingEntryPoint(&'static str),

    /// The context reports a version this layer cannot drive.
    #[error("Unsupported GL version: {0}")]
    UnsupportedVersion(String),

    /// The operation needs a capability the device does not have and no fallback exists.
    #[error("Operation not supported by this device: {0}")]
    Unsupported(&'static str),

    // ========================================================================
    // Object Misuse
    // ========================================================================
    /// The resource belongs to another device.
    #[error("Resource does not belong to this device")]
    DeviceMismatch,

    /// The resource was released by device teardown.
    #[error("Resource has already been released")]
    ResourceReleased,

    /// `map` was called on a buffer that is still mapped.
    #[error("Buffer is already mapped")]
    AlreadyMapped,
}

/// Alias for `Result<T, GpuError>`.
pub type Result<T> = std::result::Result<T, GpuError>;
