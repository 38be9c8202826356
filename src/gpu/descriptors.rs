//! Creation descriptors for textures, samplers, shader modules and depth/stencil state.

use super::format::PixelFormat;
use super::types::{CompareFunction, ShaderStage, StencilOperation, TextureUsage};

/// Describes a texture to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub mip_level_count: u32,
    pub sample_count: u32,
    pub usage: TextureUsage,
}

impl TextureDescriptor {
    /// Single-sample, single-mip, sampleable texture.
    #[must_use]
    pub fn new_2d(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
            mip_level_count: 1,
            sample_count: 1,
            usage: TextureUsage::TEXTURE_BINDING,
        }
    }

    #[must_use]
    pub fn with_usage(mut self, usage: TextureUsage) -> Self {
        self.usage = usage;
        self
    }

    #[must_use]
    pub fn with_mip_level_count(mut self, count: u32) -> Self {
        self.mip_level_count = count;
        self
    }

    #[must_use]
    pub fn with_sample_count(mut self, count: u32) -> Self {
        self.sample_count = count;
        self
    }

    /// Number of levels in a full mip chain for this size.
    #[must_use]
    pub fn max_mip_level_count(&self) -> u32 {
        let largest = self.width.max(self.height).max(1);
        32 - largest.leading_zeros()
    }
}

/// Texture coordinate wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    #[default]
    ClampToEdge,
    Repeat,
    MirrorRepeat,
    /// Falls back to `ClampToEdge` on devices without border clamping.
    ClampToBorder,
}

/// Texel filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
}

/// Filtering between mip levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MipmapMode {
    /// Sample the base level only.
    #[default]
    None,
    Nearest,
    Linear,
}

/// Describes a sampler. Samplers are immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SamplerDescriptor {
    pub address_mode_u: AddressMode,
    pub address_mode_v: AddressMode,
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub mipmap_mode: MipmapMode,
}

impl SamplerDescriptor {
    #[must_use]
    pub fn new(address_mode: AddressMode, filter: FilterMode, mipmap_mode: MipmapMode) -> Self {
        Self {
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            min_filter: filter,
            mag_filter: filter,
            mipmap_mode,
        }
    }
}

/// Shader source plus the stage it compiles for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderModuleDescriptor {
    pub code: String,
    pub stage: ShaderStage,
}

impl ShaderModuleDescriptor {
    #[must_use]
    pub fn new(code: impl Into<String>, stage: ShaderStage) -> Self {
        Self {
            code: code.into(),
            stage,
        }
    }
}

/// Stencil test and operations for one face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StencilFaceState {
    pub compare: CompareFunction,
    pub fail_op: StencilOperation,
    pub depth_fail_op: StencilOperation,
    pub pass_op: StencilOperation,
}

impl StencilFaceState {
    /// Always passes and never writes.
    #[inline]
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.compare == CompareFunction::Always
            && self.fail_op == StencilOperation::Keep
            && self.depth_fail_op == StencilOperation::Keep
            && self.pass_op == StencilOperation::Keep
    }
}

/// Depth and stencil state of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthStencilState {
    pub depth_compare: CompareFunction,
    pub depth_write_enabled: bool,
    pub stencil_front: StencilFaceState,
    pub stencil_back: StencilFaceState,
    pub stencil_read_mask: u32,
    pub stencil_write_mask: u32,
}

impl Default for DepthStencilState {
    fn default() -> Self {
        Self {
            depth_compare: CompareFunction::Always,
            depth_write_enabled: false,
            stencil_front: StencilFaceState::default(),
            stencil_back: StencilFaceState::default(),
            stencil_read_mask: 0xFF,
            stencil_write_mask: 0xFF,
        }
    }
}

impl DepthStencilState {
    #[inline]
    #[must_use]
    pub fn depth_test_enabled(&self) -> bool {
        self.depth_compare != CompareFunction::Always || self.depth_write_enabled
    }

    #[inline]
    #[must_use]
    pub fn stencil_test_enabled(&self) -> bool {
        !(self.stencil_front.is_disabled() && self.stencil_back.is_disabled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_mip_chain_length() {
        assert_eq!(TextureDescriptor::new_2d(1, 1, PixelFormat::Rgba8888).max_mip_level_count(), 1);
        assert_eq!(TextureDescriptor::new_2d(256, 64, PixelFormat::Rgba8888).max_mip_level_count(), 9);
        assert_eq!(TextureDescriptor::new_2d(100, 3, PixelFormat::Rgba8888).max_mip_level_count(), 7);
    }

    #[test]
    fn default_depth_stencil_disables_both_tests() {
        let state = DepthStencilState::default();
        assert!(!state.depth_test_enabled());
        assert!(!state.stencil_test_enabled());
    }
}
