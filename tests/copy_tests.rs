//! Copy & Readback Tests
//!
//! Tests for:
//! - copy_texture_to_buffer: pixel-pack buffers (ES3) and emulated readback (ES2, WebGL)
//! - copy_texture_to_texture: framebuffer blits vs. copy-tex-sub-image
//! - resolve_texture
//! - generate_mipmaps_for_texture

use std::sync::Arc;

use vellum::gl::GlInterface;
use vellum::gl::consts::{GL_RGBA, GL_RGBA8, GL_TEXTURE_2D, GL_UNSIGNED_BYTE};
use vellum::gpu::{
    BackendTexture, BufferUsage, Color, GlTextureInfo, PixelFormat, Rect, TextureDescriptor, TextureUsage,
};
use vellum::{BufferStrategy, Device, DeviceSettings, GpuError, HeadlessGl, RenderPassDescriptor, Texture};

fn setup(gl: HeadlessGl) -> (Arc<HeadlessGl>, Device) {
    let _ = env_logger::builder().is_test(true).try_init();
    let gl = Arc::new(gl);
    let device = Device::from_gl(gl.clone(), DeviceSettings::default().with_label("copies")).unwrap();
    (gl, device)
}

/// A renderable 4x4 RGBA texture whose bytes count up from 0.
fn counting_target(device: &Device) -> Arc<Texture> {
    let descriptor = TextureDescriptor::new_2d(4, 4, PixelFormat::Rgba8888)
        .with_usage(TextureUsage::TEXTURE_BINDING | TextureUsage::RENDER_ATTACHMENT);
    let texture = device.create_texture(&descriptor).unwrap();
    let pixels: Vec<u8> = (0..64).collect();
    device.queue().write_texture(&texture, Rect::from_size(4, 4), &pixels, 0).unwrap();
    texture
}

// ============================================================================
// copy_texture_to_buffer
// ============================================================================

#[test]
fn readback_round_trip() {
    for gl in [HeadlessGl::gles(3), HeadlessGl::gles(2), HeadlessGl::webgl(2)] {
        let (_gl, device) = setup(gl);
        let texture = counting_target(&device);
        let buffer = device.create_buffer(64, BufferUsage::READBACK).unwrap();

        let mut encoder = device.create_command_encoder();
        encoder.copy_texture_to_buffer(&texture, Rect::from_size(4, 4), &buffer, 0, 0).unwrap();
        device.queue().submit(encoder.finish());

        let mapping = buffer.map(&device, 0, 64).unwrap();
        assert_eq!(mapping.to_vec(), (0..64).collect::<Vec<u8>>());
    }
}

#[test]
fn readback_strategy_follows_the_device() {
    let (_gl, device) = setup(HeadlessGl::gles(3));
    let buffer = device.create_buffer(16, BufferUsage::READBACK).unwrap();
    assert_eq!(buffer.strategy(), BufferStrategy::Native);

    let (_gl, device) = setup(HeadlessGl::webgl(2));
    let buffer = device.create_buffer(16, BufferUsage::READBACK).unwrap();
    assert_eq!(buffer.strategy(), BufferStrategy::EmulatedReadback);
    assert_eq!(buffer.native_id(), 0);
}

#[test]
fn readback_of_a_sub_rect_with_padded_rows() {
    // Rows 1 and 2, pixels 1 and 2 of each: 8 bytes per row, stored 12 bytes apart.
    let expected: Vec<u8> = (20..28).chain([0; 4]).chain(36..44).collect();

    for gl in [HeadlessGl::gles(3), HeadlessGl::gles(2), HeadlessGl::webgl(2)] {
        let (gl, device) = setup(gl);
        let texture = counting_target(&device);
        let buffer = device.create_buffer(20, BufferUsage::READBACK).unwrap();

        let mut encoder = device.create_command_encoder();
        encoder.copy_texture_to_buffer(&texture, Rect::new(1, 1, 2, 2), &buffer, 0, 12).unwrap();
        let commands = encoder.finish();
        assert_eq!(commands.copy_count(), 1);

        let pixels = buffer.map(&device, 0, 20).unwrap().to_vec();
        assert_eq!(pixels, expected, "{gl:?}");
    }
}

#[test]
fn emulated_readback_releases_its_scratch_target() {
    let (gl, device) = setup(HeadlessGl::webgl(2));
    let texture = counting_target(&device);
    let buffer = device.create_buffer(64, BufferUsage::READBACK).unwrap();
    let (textures, framebuffers) = (gl.live_textures(), gl.live_framebuffers());

    let mut encoder = device.create_command_encoder();
    encoder.copy_texture_to_buffer(&texture, Rect::from_size(4, 4), &buffer, 0, 0).unwrap();
    assert_eq!(gl.live_textures(), textures + 1);
    assert_eq!(gl.live_framebuffers(), framebuffers + 1);

    drop(buffer.map(&device, 0, 64).unwrap());
    assert_eq!(gl.live_textures(), textures);
    assert_eq!(gl.live_framebuffers(), framebuffers);
}

#[test]
fn pending_readback_is_freed_with_its_buffer() {
    let (gl, device) = setup(HeadlessGl::gles(2));
    let texture = counting_target(&device);
    let buffer = device.create_buffer(64, BufferUsage::READBACK).unwrap();
    let textures = gl.live_textures();

    let mut encoder = device.create_command_encoder();
    encoder.copy_texture_to_buffer(&texture, Rect::from_size(4, 4), &buffer, 0, 0).unwrap();
    drop(buffer);
    drop(device.create_command_encoder());
    assert_eq!(gl.live_textures(), textures);
}

#[test]
fn readback_is_validated_before_native_calls() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let texture = counting_target(&device);
    let vertices = device.create_buffer(64, BufferUsage::VERTEX).unwrap();
    let small = device.create_buffer(32, BufferUsage::READBACK).unwrap();
    let sampled = device.create_texture(&TextureDescriptor::new_2d(4, 4, PixelFormat::Rgba8888)).unwrap();
    let mut encoder = device.create_command_encoder();
    gl.reset_counters();

    let full = Rect::from_size(4, 4);
    assert!(matches!(
        encoder.copy_texture_to_buffer(&texture, full, &vertices, 0, 0),
        Err(GpuError::UnsupportedUsage { .. })
    ));
    assert_eq!(
        encoder.copy_texture_to_buffer(&texture, full, &small, 0, 0),
        Err(GpuError::OutOfBounds {
            offset: 0,
            size: 64,
            capacity: 32
        })
    );
    assert!(matches!(
        encoder.copy_texture_to_buffer(&texture, Rect::new(2, 0, 4, 4), &small, 0, 0),
        Err(GpuError::InvalidArgument(_))
    ));
    assert!(matches!(
        encoder.copy_texture_to_buffer(&texture, Rect::from_size(2, 2), &small, 0, 4),
        Err(GpuError::InvalidArgument(_))
    ));
    assert_eq!(gl.total_calls(), 0);

    let _mapping = small.map(&device, 0, 4).unwrap();
    assert_eq!(
        encoder.copy_texture_to_buffer(&texture, Rect::from_size(1, 1), &small, 0, 0),
        Err(GpuError::AlreadyMapped)
    );

    // Only render targets and imported textures can be read.
    let other = device.create_buffer(64, BufferUsage::READBACK).unwrap();
    assert!(matches!(
        encoder.copy_texture_to_buffer(&sampled, full, &other, 0, 0),
        Err(GpuError::UnsupportedUsage { .. })
    ));
}

// ============================================================================
// copy_texture_to_texture
// ============================================================================

fn check_copied_corner(gl: &HeadlessGl, destination: &Texture) {
    let (width, height, data) = gl.texture_level(destination.native_id(), 0).unwrap();
    assert_eq!((width, height), (4, 4));
    for y in 0..2usize {
        for x in 0..2usize {
            let source = (y * 4 + x) * 4;
            let target = ((y + 1) * 4 + x + 1) * 4;
            assert_eq!(&data[target..target + 4], &[source as u8, source as u8 + 1, source as u8 + 2, source as u8 + 3]);
        }
    }
    assert_eq!(&data[..4], &[0; 4]);
}

#[test]
fn copy_blits_between_render_targets() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let source = counting_target(&device);
    let destination = device
        .create_texture(
            &TextureDescriptor::new_2d(4, 4, PixelFormat::Rgba8888)
                .with_usage(TextureUsage::TEXTURE_BINDING | TextureUsage::RENDER_ATTACHMENT),
        )
        .unwrap();
    gl.reset_counters();

    let mut encoder = device.create_command_encoder();
    encoder.copy_texture_to_texture(&source, Rect::from_size(2, 2), &destination, 1, 1).unwrap();
    assert_eq!(gl.call_count("glBlitFramebuffer"), 1);
    assert_eq!(gl.call_count("glCopyTexSubImage2D"), 0);
    check_copied_corner(&gl, &destination);
}

#[test]
fn copy_falls_back_to_copy_tex_sub_image() {
    // ES2 cannot blit; a sampled-only destination has no framebuffer either way.
    for gl in [HeadlessGl::gles(2), HeadlessGl::gles(3)] {
        let (gl, device) = setup(gl);
        let source = counting_target(&device);
        let destination = device.create_texture(&TextureDescriptor::new_2d(4, 4, PixelFormat::Rgba8888)).unwrap();
        gl.reset_counters();

        let mut encoder = device.create_command_encoder();
        encoder.copy_texture_to_texture(&source, Rect::from_size(2, 2), &destination, 1, 1).unwrap();
        assert_eq!(gl.call_count("glBlitFramebuffer"), 0);
        assert_eq!(gl.call_count("glCopyTexSubImage2D"), 1);
        check_copied_corner(&gl, &destination);
    }
}

#[test]
fn copy_is_validated() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let source = counting_target(&device);
    let sampled = device.create_texture(&TextureDescriptor::new_2d(4, 4, PixelFormat::Rgba8888)).unwrap();
    let alpha = device.create_texture(&TextureDescriptor::new_2d(4, 4, PixelFormat::Alpha8)).unwrap();
    let mut encoder = device.create_command_encoder();
    gl.reset_counters();

    let rect = Rect::from_size(2, 2);
    assert!(matches!(
        encoder.copy_texture_to_texture(&sampled, rect, &source, 0, 0),
        Err(GpuError::UnsupportedUsage { .. })
    ));
    assert!(matches!(
        encoder.copy_texture_to_texture(&source, rect, &alpha, 0, 0),
        Err(GpuError::InvalidArgument(_))
    ));
    assert!(matches!(
        encoder.copy_texture_to_texture(&source, rect, &sampled, 3, 3),
        Err(GpuError::InvalidArgument(_))
    ));
    assert!(matches!(
        encoder.copy_texture_to_texture(&source, Rect::default(), &sampled, 0, 0),
        Err(GpuError::InvalidArgument(_))
    ));
    assert_eq!(gl.total_calls(), 0);
}

#[test]
fn copy_source_needs_render_attachment_usage() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let name = gl.create_texture();
    gl.bind_texture(GL_TEXTURE_2D, name);
    gl.tex_image_2d(GL_TEXTURE_2D, 0, GL_RGBA8 as i32, 4, 4, GL_RGBA, GL_UNSIGNED_BYTE, None);
    let info = GlTextureInfo {
        id: name,
        target: GL_TEXTURE_2D,
        format: GL_RGBA8,
    };
    let imported = device.import_backend_texture(&BackendTexture::new(4, 4, info), false).unwrap();
    let destination = counting_target(&device);

    // Drawing into the import gives it a framebuffer, not RENDER_ATTACHMENT usage.
    let mut encoder = device.create_command_encoder();
    encoder
        .begin_render_pass(&RenderPassDescriptor::new(&imported).with_clear(Color::new(1.0, 0.0, 0.0, 1.0)))
        .unwrap()
        .end()
        .unwrap();
    assert!(imported.framebuffer_id().is_some());
    assert!(!imported.usage().contains(TextureUsage::RENDER_ATTACHMENT));

    gl.reset_counters();
    assert!(matches!(
        encoder.copy_texture_to_texture(&imported, Rect::from_size(2, 2), &destination, 0, 0),
        Err(GpuError::UnsupportedUsage { .. })
    ));
    assert_eq!(gl.total_calls(), 0);
}

// ============================================================================
// resolve_texture
// ============================================================================

#[test]
fn resolve_copies_the_multisample_image() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let multisample = device
        .create_texture(
            &TextureDescriptor::new_2d(2, 2, PixelFormat::Rgba8888)
                .with_usage(TextureUsage::RENDER_ATTACHMENT)
                .with_sample_count(4),
        )
        .unwrap();
    let resolved = device
        .create_texture(
            &TextureDescriptor::new_2d(2, 2, PixelFormat::Rgba8888)
                .with_usage(TextureUsage::TEXTURE_BINDING | TextureUsage::RENDER_ATTACHMENT),
        )
        .unwrap();

    let mut encoder = device.create_command_encoder();
    encoder
        .begin_render_pass(&RenderPassDescriptor::new(&multisample).with_clear(Color::WHITE))
        .unwrap()
        .end()
        .unwrap();
    encoder.resolve_texture(&multisample, &resolved).unwrap();
    assert_eq!(encoder.finish().copy_count(), 1);

    let (_, _, data) = gl.texture_level(resolved.native_id(), 0).unwrap();
    assert_eq!(data, vec![255; 16]);
}

#[test]
fn resolve_needs_a_multisample_source() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let a = counting_target(&device);
    let b = counting_target(&device);
    gl.reset_counters();

    let mut encoder = device.create_command_encoder();
    assert!(matches!(encoder.resolve_texture(&a, &b), Err(GpuError::InvalidArgument(_))));
    assert_eq!(gl.total_calls(), 0);
}

// ============================================================================
// Mipmaps
// ============================================================================

#[test]
fn mipmaps_are_generated_from_the_base_level() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let texture = device
        .create_texture(&TextureDescriptor::new_2d(4, 4, PixelFormat::Rgba8888).with_mip_level_count(3))
        .unwrap();
    let pixels: Vec<u8> = (0..64).collect();
    device.queue().write_texture(&texture, Rect::from_size(4, 4), &pixels, 0).unwrap();
    gl.reset_counters();

    let mut encoder = device.create_command_encoder();
    encoder.generate_mipmaps_for_texture(&texture).unwrap();
    assert_eq!(gl.call_count("glGenerateMipmap"), 1);
    assert_eq!(gl.texture_level_count(texture.native_id()), 3);

    let (width, height, smallest) = gl.texture_level(texture.native_id(), 2).unwrap();
    assert_eq!((width, height), (1, 1));
    assert_eq!(smallest, vec![0, 1, 2, 3]);
}

#[test]
fn single_level_textures_skip_generation() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let texture = device.create_texture(&TextureDescriptor::new_2d(4, 4, PixelFormat::Rgba8888)).unwrap();
    gl.reset_counters();

    let mut encoder = device.create_command_encoder();
    encoder.generate_mipmaps_for_texture(&texture).unwrap();
    assert_eq!(gl.total_calls(), 0);
}

#[test]
fn textures_without_a_mip_chain_are_skipped() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let multisample = device
        .create_texture(
            &TextureDescriptor::new_2d(4, 4, PixelFormat::Rgba8888)
                .with_usage(TextureUsage::RENDER_ATTACHMENT)
                .with_sample_count(4),
        )
        .unwrap();
    let depth = device
        .create_texture(
            &TextureDescriptor::new_2d(4, 4, PixelFormat::Depth24Stencil8).with_usage(TextureUsage::RENDER_ATTACHMENT),
        )
        .unwrap();
    let mut encoder = device.create_command_encoder();
    gl.reset_counters();

    encoder.generate_mipmaps_for_texture(&multisample).unwrap();
    encoder.generate_mipmaps_for_texture(&depth).unwrap();
    assert_eq!(gl.total_calls(), 0);
    assert_eq!(encoder.finish().copy_count(), 0);
}
