//! Pixel formats understood by the GPU layer.
//!
//! Whether a format can be sampled or rendered to is a per-device property, answered
//! by [`GlCaps`](crate::gl::GlCaps), not by the format itself.

/// Pixel format of a texture or render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Single 8-bit coverage channel (glyph masks, clip masks).
    Alpha8,
    /// Single 8-bit luminance channel.
    Gray8,
    /// Two 8-bit channels.
    Rg88,
    /// 8-bit RGBA.
    Rgba8888,
    /// 8-bit BGRA, native order of many platform surfaces.
    Bgra8888,
    /// 16-bit float RGBA.
    RgbaF16,
    /// Packed 24-bit depth, 8-bit stencil. Only valid as a depth-stencil attachment.
    Depth24Stencil8,
}

impl PixelFormat {
    /// Every format, in table order.
    pub const ALL: [PixelFormat; 7] = [
        Self::Alpha8,
        Self::Gray8,
        Self::Rg88,
        Self::Rgba8888,
        Self::Bgra8888,
        Self::RgbaF16,
        Self::Depth24Stencil8,
    ];

    /// Size of one pixel in client memory.
    #[inline]
    #[must_use]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Alpha8 | Self::Gray8 => 1,
            Self::Rg88 => 2,
            Self::Rgba8888 | Self::Bgra8888 | Self::Depth24Stencil8 => 4,
            Self::RgbaF16 => 8,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_depth_stencil(self) -> bool {
        matches!(self, Self::Depth24Stencil8)
    }

    #[inline]
    #[must_use]
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}
