//! Shared value types: usage flags, rectangles, colors and draw enums.

use bitflags::bitflags;

bitflags! {
    /// How a [`Buffer`](crate::device::Buffer) will be used.
    ///
    /// Usage determines both the native binding target and the allocation strategy.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Vertex attribute data
        const VERTEX = 1 << 0;
        /// Index data for indexed draws
        const INDEX = 1 << 1;
        /// Uniform block data
        const UNIFORM = 1 << 2;
        /// Destination of texture-to-buffer copies, read back on the CPU
        const READBACK = 1 << 3;
    }
}

bitflags! {
    /// How a [`Texture`](crate::device::Texture) will be used.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Sampled from shaders
        const TEXTURE_BINDING = 1 << 0;
        /// Rendered into, copied from, or blitted to
        const RENDER_ATTACHMENT = 1 << 1;
    }
}

/// Integer rectangle in pixels. Origin at the bottom-left, following the native API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    #[must_use]
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    #[must_use]
    pub fn right(&self) -> i64 {
        i64::from(self.x) + i64::from(self.width)
    }

    #[inline]
    #[must_use]
    pub fn top(&self) -> i64 {
        i64::from(self.y) + i64::from(self.height)
    }

    /// Returns `true` if the rectangle lies entirely inside `width × height`.
    #[must_use]
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.right() <= i64::from(width)
            && self.top() <= i64::from(height)
    }
}

/// Linear RGBA color with `f32` components.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    #[inline]
    #[must_use]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    #[must_use]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Primitive topology of a draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveType {
    #[default]
    Triangles,
    TriangleStrip,
    Lines,
    LineStrip,
    Points,
}

/// Element type of an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    #[default]
    Uint16,
    Uint32,
}

impl IndexFormat {
    #[inline]
    #[must_use]
    pub fn byte_size(self) -> usize {
        match self {
            Self::Uint16 => 2,
            Self::Uint32 => 4,
        }
    }
}

/// Stage of a shader module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Comparison used by depth and stencil tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    #[default]
    Always,
}

/// Operation applied to the stencil buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StencilOperation {
    #[default]
    Keep,
    Zero,
    Replace,
    Invert,
    IncrementClamp,
    DecrementClamp,
    IncrementWrap,
    DecrementWrap,
}

bitflags! {
    /// Color channels written by a pipeline.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColorWriteMask: u8 {
        const RED = 1 << 0;
        const GREEN = 1 << 1;
        const BLUE = 1 << 2;
        const ALPHA = 1 << 3;
        const ALL = Self::RED.bits() | Self::GREEN.bits() | Self::BLUE.bits() | Self::ALPHA.bits();
    }
}

impl Default for ColorWriteMask {
    fn default() -> Self {
        Self::ALL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_fits_within_bounds() {
        assert!(Rect::new(0, 0, 4, 4).fits_within(4, 4));
        assert!(Rect::new(2, 1, 2, 3).fits_within(4, 4));
        assert!(!Rect::new(3, 0, 2, 1).fits_within(4, 4));
        assert!(!Rect::new(-1, 0, 1, 1).fits_within(4, 4));
    }

    #[test]
    fn color_write_mask_defaults_to_all_channels() {
        assert_eq!(ColorWriteMask::default(), ColorWriteMask::ALL);
        assert!(ColorWriteMask::ALL.contains(ColorWriteMask::ALPHA));
    }
}
