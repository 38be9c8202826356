//! Platform import value types.
//!
//! These carry native handles created outside of this layer (by a windowing system, a
//! video decoder, another rendering library). The `Device::import_backend_*` factories
//! wrap them into resources; an `adopted` flag decides whether the wrapper deletes the
//! handle when it is released.

use crate::gl::GlSync;

/// Native description of an externally created texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlTextureInfo {
    /// Texture name.
    pub id: u32,
    /// Binding target, e.g. `GL_TEXTURE_2D` or `GL_TEXTURE_EXTERNAL_OES`.
    pub target: u32,
    /// Sized internal format, e.g. `GL_RGBA8`.
    pub format: u32,
}

/// Native description of an externally created framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlFramebufferInfo {
    /// Framebuffer name. `0` is the window-system framebuffer.
    pub id: u32,
    /// Sized internal format of the color attachment.
    pub format: u32,
}

/// Texture created outside of this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackendTexture {
    pub width: u32,
    pub height: u32,
    pub info: GlTextureInfo,
}

impl BackendTexture {
    #[must_use]
    pub fn new(width: u32, height: u32, info: GlTextureInfo) -> Self {
        Self { width, height, info }
    }

    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && self.info.id != 0
    }
}

/// Render target created outside of this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackendRenderTarget {
    pub width: u32,
    pub height: u32,
    pub sample_count: u32,
    pub info: GlFramebufferInfo,
}

impl BackendRenderTarget {
    #[must_use]
    pub fn new(width: u32, height: u32, info: GlFramebufferInfo) -> Self {
        Self {
            width,
            height,
            sample_count: 1,
            info,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Synchronization object created outside of this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackendSemaphore {
    pub sync: GlSync,
}

impl BackendSemaphore {
    #[must_use]
    pub fn new(sync: GlSync) -> Self {
        Self { sync }
    }
}
