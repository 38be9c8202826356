//! Vellum: the GPU resource and command layer of a 2D engine.
//!
//! Drawing code talks to a [`Device`] through backend-agnostic types from [`gpu`];
//! the device translates them onto an OpenGL, OpenGL ES or WebGL context through the
//! [`GlInterface`](gl::GlInterface) seam.
//!
//! - [`device`]: the device, its resources and their deferred reclamation
//! - [`command`]: encoders, render passes and the queue
//! - [`gl`]: capability detection, native state caching, and a headless context
//! - [`gpu`]: descriptors, formats and flags

pub mod command;
pub mod device;
pub mod errors;
pub mod gl;
pub mod gpu;
pub mod settings;

pub use command::{
    CommandBuffer, CommandEncoder, CommandQueue, DepthStencilAttachment, LoadAction, RenderPass,
    RenderPassDescriptor,
};
pub use device::{
    Buffer, BufferMapping, BufferStrategy, ColorTarget, Device, LifecycleState, ReleaseMode, RenderPipeline,
    RenderPipelineDescriptor, Sampler, Semaphore, ShaderModule, Texture, TextureKind,
};
pub use errors::{GpuError, Result};
pub use gl::HeadlessGl;
pub use settings::DeviceSettings;
