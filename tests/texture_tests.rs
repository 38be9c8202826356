//! Texture & Sampler Tests
//!
//! Tests for:
//! - Creation: renderability, multisample dispatch, depth-stencil renderbuffers
//! - Imports: backend textures and render targets, adoption
//! - CommandQueue::write_texture: row pitch handling, bounds
//! - Samplers: native objects vs. texture-parameter emulation

use std::sync::Arc;

use vellum::gl::consts::{
    GL_LINEAR, GL_REPEAT, GL_RGBA8, GL_TEXTURE_2D, GL_TEXTURE_MAG_FILTER, GL_TEXTURE_WRAP_S,
};
use vellum::gl::GlInterface;
use vellum::gpu::{
    AddressMode, BackendRenderTarget, BackendTexture, FilterMode, GlFramebufferInfo, GlTextureInfo, MipmapMode,
    PixelFormat, Rect, SamplerDescriptor, TextureDescriptor, TextureUsage,
};
use vellum::{Device, DeviceSettings, GpuError, HeadlessGl, LifecycleState, TextureKind};

fn setup(gl: HeadlessGl) -> (Arc<HeadlessGl>, Device) {
    let _ = env_logger::builder().is_test(true).try_init();
    let gl = Arc::new(gl);
    let device = Device::from_gl(gl.clone(), DeviceSettings::default()).unwrap();
    (gl, device)
}

fn render_target(width: u32, height: u32, format: PixelFormat) -> TextureDescriptor {
    TextureDescriptor::new_2d(width, height, format)
        .with_usage(TextureUsage::TEXTURE_BINDING | TextureUsage::RENDER_ATTACHMENT)
}

// ============================================================================
// Creation
// ============================================================================

#[test]
fn renderable_texture_gets_a_framebuffer() {
    let (gl, device) = setup(HeadlessGl::gles(2));
    let texture = device.create_texture(&render_target(16, 16, PixelFormat::Rgba8888)).unwrap();

    assert_eq!(texture.kind(), TextureKind::Regular);
    let framebuffer = texture.framebuffer_id().unwrap();
    assert!(gl.is_framebuffer(framebuffer));
    assert!(gl.is_texture(texture.native_id()));
}

#[test]
fn sampled_only_texture_has_no_framebuffer() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let texture = device.create_texture(&TextureDescriptor::new_2d(4, 4, PixelFormat::Rgba8888)).unwrap();
    assert_eq!(texture.framebuffer_id(), None);
    assert_eq!(gl.live_framebuffers(), 0);
}

#[test]
fn non_renderable_format_cannot_be_an_attachment() {
    let (gl, device) = setup(HeadlessGl::gles(2));
    gl.reset_counters();

    let result = device.create_texture(&render_target(16, 16, PixelFormat::Alpha8));
    assert_eq!(result.err(), Some(GpuError::NonRenderableFormat(PixelFormat::Alpha8)));
    assert_eq!(gl.allocation_calls(), 0);

    // Sampling alone is fine.
    assert!(device.create_texture(&TextureDescriptor::new_2d(16, 16, PixelFormat::Alpha8)).is_ok());
}

#[test]
fn multisample_needs_renderbuffer_support() {
    let descriptor = TextureDescriptor::new_2d(32, 32, PixelFormat::Rgba8888)
        .with_usage(TextureUsage::RENDER_ATTACHMENT)
        .with_sample_count(4);

    let (gl, device) = setup(HeadlessGl::gles(2));
    gl.reset_counters();
    let first = device.create_texture(&descriptor).err();
    let second = device.create_texture(&descriptor).err();
    assert!(first.is_some());
    assert_eq!(first, second);
    assert_eq!(gl.allocation_calls(), 0);

    let (gl, device) = setup(HeadlessGl::gles(3));
    let texture = device.create_texture(&descriptor).unwrap();
    assert_eq!(texture.kind(), TextureKind::Multisample);
    assert_eq!(texture.sample_count(), 4);
    assert_eq!(gl.renderbuffer_samples(texture.native_id()), Some(4));
    assert_eq!(gl.live_textures(), 0);
}

#[test]
fn sample_count_above_limit_is_rejected() {
    let (_gl, device) = setup(HeadlessGl::gles(3).with_max_samples(4));
    let descriptor = TextureDescriptor::new_2d(8, 8, PixelFormat::Rgba8888)
        .with_usage(TextureUsage::RENDER_ATTACHMENT)
        .with_sample_count(8);
    assert!(matches!(device.create_texture(&descriptor), Err(GpuError::InvalidArgument(_))));
}

#[test]
fn depth_stencil_is_a_renderbuffer() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let descriptor =
        TextureDescriptor::new_2d(8, 8, PixelFormat::Depth24Stencil8).with_usage(TextureUsage::RENDER_ATTACHMENT);
    let texture = device.create_texture(&descriptor).unwrap();
    assert_eq!(texture.kind(), TextureKind::DepthStencil);
    assert_eq!(gl.live_renderbuffers(), 1);
    assert_eq!(gl.live_textures(), 0);
}

#[test]
fn out_of_memory_leaves_nothing_behind() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    gl.set_out_of_memory(true);
    let result = device.create_texture(&render_target(16, 16, PixelFormat::Rgba8888));
    assert!(matches!(result, Err(GpuError::AllocationFailed(_))));
    assert_eq!(gl.live_textures(), 0);
    assert_eq!(gl.live_framebuffers(), 0);
    assert_eq!(device.live_resource_count(), 0);
}

// ============================================================================
// Imports
// ============================================================================

#[test]
fn imported_texture_is_not_deleted_unless_adopted() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let borrowed = gl.create_texture();
    let owned = gl.create_texture();
    let info = |id| GlTextureInfo {
        id,
        target: GL_TEXTURE_2D,
        format: GL_RGBA8,
    };

    let a = device.import_backend_texture(&BackendTexture::new(4, 4, info(borrowed)), false).unwrap();
    let b = device.import_backend_texture(&BackendTexture::new(4, 4, info(owned)), true).unwrap();
    assert_eq!(a.kind(), TextureKind::External);
    assert_eq!(a.format(), PixelFormat::Rgba8888);
    assert!(!a.is_adopted());
    assert!(b.is_adopted());

    drop((a, b));
    drop(device.create_command_encoder());
    assert!(gl.is_texture(borrowed));
    assert!(!gl.is_texture(owned));
}

#[test]
fn invalid_backend_texture_is_rejected() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let info = GlTextureInfo {
        id: 0,
        target: GL_TEXTURE_2D,
        format: GL_RGBA8,
    };
    gl.reset_counters();
    assert!(matches!(
        device.import_backend_texture(&BackendTexture::new(4, 4, info), false),
        Err(GpuError::InvalidArgument(_))
    ));
    assert_eq!(gl.total_calls(), 0);
}

#[test]
fn window_surface_imports_as_render_target() {
    let (_gl, device) = setup(HeadlessGl::gles(3).with_default_framebuffer(8, 8));
    let surface = device
        .import_backend_render_target(&BackendRenderTarget::new(8, 8, GlFramebufferInfo { id: 0, format: GL_RGBA8 }), false)
        .unwrap();
    assert_eq!(surface.kind(), TextureKind::RenderTarget);
    assert_eq!(surface.framebuffer_id(), Some(0));
    assert_eq!(surface.lifecycle_state(), LifecycleState::Attached);
}

// ============================================================================
// write_texture
// ============================================================================

#[test]
fn write_texture_with_tight_rows() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let texture = device.create_texture(&TextureDescriptor::new_2d(2, 2, PixelFormat::Rgba8888)).unwrap();
    let pixels: Vec<u8> = (0..16).collect();

    device.queue().write_texture(&texture, Rect::from_size(2, 2), &pixels, 0).unwrap();
    let (width, height, data) = gl.texture_level(texture.native_id(), 0).unwrap();
    assert_eq!((width, height), (2, 2));
    assert_eq!(data, pixels);
}

#[test]
fn write_texture_with_padded_rows() {
    // ES2 has no unpack row length, so padded rows are repacked on the CPU.
    for gl in [HeadlessGl::gles(3), HeadlessGl::gles(2)] {
        let (gl, device) = setup(gl);
        let texture = device.create_texture(&TextureDescriptor::new_2d(2, 2, PixelFormat::Alpha8)).unwrap();
        gl.reset_counters();

        // Two 2-pixel rows, 4 bytes apart.
        let pixels = [1, 2, 0xEE, 0xEE, 3, 4, 0xEE, 0xEE];
        device.queue().write_texture(&texture, Rect::from_size(2, 2), &pixels, 4).unwrap();

        assert_eq!(gl.call_count("glTexSubImage2D"), 1);
        let (_, _, data) = gl.texture_level(texture.native_id(), 0).unwrap();
        assert_eq!(data, vec![1, 2, 3, 4]);
    }
}

#[test]
fn write_texture_validates_before_native_calls() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let texture = device.create_texture(&TextureDescriptor::new_2d(4, 4, PixelFormat::Rgba8888)).unwrap();
    gl.reset_counters();

    let queue = device.queue();
    assert!(queue.write_texture(&texture, Rect::new(2, 2, 4, 4), &[0; 64], 0).is_err());
    assert!(queue.write_texture(&texture, Rect::from_size(4, 4), &[0; 63], 0).is_err());
    assert!(queue.write_texture(&texture, Rect::from_size(4, 4), &[0; 64], 8).is_err());
    assert_eq!(gl.total_calls(), 0);

    // An empty rect succeeds without touching the texture.
    queue.write_texture(&texture, Rect::from_size(0, 4), &[], 0).unwrap();
    assert_eq!(gl.total_calls(), 0);
}

// ============================================================================
// Samplers
// ============================================================================

#[test]
fn native_sampler_objects() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let sampler = device
        .create_sampler(&SamplerDescriptor::new(AddressMode::Repeat, FilterMode::Linear, MipmapMode::None))
        .unwrap();
    assert_ne!(sampler.native_id(), 0);
    assert_eq!(gl.sampler_parameter(sampler.native_id(), GL_TEXTURE_WRAP_S), Some(GL_REPEAT as i32));
    assert_eq!(gl.sampler_parameter(sampler.native_id(), GL_TEXTURE_MAG_FILTER), Some(GL_LINEAR as i32));
}

#[test]
fn emulated_samplers_have_no_native_object() {
    let (gl, device) = setup(HeadlessGl::gles(2));
    gl.reset_counters();
    let sampler = device
        .create_sampler(&SamplerDescriptor::new(AddressMode::ClampToEdge, FilterMode::Nearest, MipmapMode::None))
        .unwrap();
    assert_eq!(sampler.native_id(), 0);
    assert_eq!(gl.total_calls(), 0);
}
