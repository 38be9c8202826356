//! Backend-agnostic vocabulary of the GPU layer.
//!
//! Everything here is plain data: usage flags, formats, descriptors, blend formulas,
//! layouts and the value types used to import platform handles. The OpenGL
//! implementation in [`crate::device`] consumes these types; upstream drawing code only
//! ever names them, never native enums.

pub mod backend;
pub mod blend;
pub mod descriptors;
pub mod format;
pub mod types;
pub mod vertex;

pub use backend::{BackendRenderTarget, BackendSemaphore, BackendTexture, GlFramebufferInfo, GlTextureInfo};
pub use blend::{BlendComponent, BlendFactor, BlendFormula, BlendOperation};
pub use descriptors::{
    AddressMode, DepthStencilState, FilterMode, MipmapMode, SamplerDescriptor, ShaderModuleDescriptor,
    StencilFaceState, TextureDescriptor,
};
pub use format::PixelFormat;
pub use types::{
    BufferUsage, Color, ColorWriteMask, CompareFunction, IndexFormat, PrimitiveType, Rect, ShaderStage,
    StencilOperation, TextureUsage,
};
pub use vertex::{
    PlacedAttribute, SamplerBinding, UniformBlockLayout, UniformField, UniformFormat, VertexAttribute, VertexFormat,
    VertexLayout,
};
