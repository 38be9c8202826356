//! Resource Lifecycle Tests
//!
//! Tests for:
//! - Deferred reclamation: drop enqueues, the next encoder deletes
//! - Cross-thread drops
//! - Device::release_all in Delete and Abandon modes
//! - Ownership checks across devices
//! - State cache: redundant binds are skipped until the cache is reset

use std::sync::Arc;
use std::thread;

use vellum::gpu::{BufferUsage, PixelFormat, Rect, TextureDescriptor, TextureUsage};
use vellum::{Device, DeviceSettings, GpuError, HeadlessGl, LifecycleState, ReleaseMode};

fn setup(gl: HeadlessGl) -> (Arc<HeadlessGl>, Device) {
    let _ = env_logger::builder().is_test(true).try_init();
    let gl = Arc::new(gl);
    let device = Device::from_gl(gl.clone(), DeviceSettings::default().with_label("lifecycle")).unwrap();
    (gl, device)
}

// ============================================================================
// Deferred Reclamation
// ============================================================================

#[test]
fn drop_defers_deletion_to_the_next_encoder() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let buffer = device.create_buffer(64, BufferUsage::VERTEX).unwrap();
    let name = buffer.native_id();
    gl.reset_counters();

    drop(buffer);
    assert_eq!(gl.total_calls(), 0);
    assert!(gl.is_buffer(name));
    assert_eq!(device.pending_release_count(), 1);

    let _encoder = device.create_command_encoder();
    assert!(!gl.is_buffer(name));
    assert_eq!(gl.call_count("glDeleteBuffers"), 1);
    assert_eq!(device.pending_release_count(), 0);
    assert_eq!(device.live_resource_count(), 0);
}

#[test]
fn render_targets_release_texture_and_framebuffer() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let descriptor = TextureDescriptor::new_2d(8, 8, PixelFormat::Rgba8888)
        .with_usage(TextureUsage::TEXTURE_BINDING | TextureUsage::RENDER_ATTACHMENT);
    let texture = device.create_texture(&descriptor).unwrap();
    assert_eq!((gl.live_textures(), gl.live_framebuffers()), (1, 1));

    drop(texture);
    drop(device.create_command_encoder());
    assert_eq!((gl.live_textures(), gl.live_framebuffers()), (0, 0));
}

#[test]
fn drop_from_another_thread() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let buffers: Vec<_> = (0..4).map(|_| device.create_buffer(16, BufferUsage::VERTEX).unwrap()).collect();
    let kept = Arc::clone(&buffers[0]);

    thread::spawn(move || drop(buffers)).join().unwrap();
    // Three were last references; one is still held here.
    assert_eq!(device.pending_release_count(), 3);
    assert_eq!(gl.live_buffers(), 4);

    drop(device.create_command_encoder());
    assert_eq!(gl.live_buffers(), 1);
    assert_eq!(kept.lifecycle_state(), LifecycleState::Attached);

    drop(kept);
    drop(device.create_command_encoder());
    assert_eq!(gl.live_buffers(), 0);
}

// ============================================================================
// release_all
// ============================================================================

#[test]
fn release_all_deletes_outstanding_resources() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let buffer = device.create_buffer(16, BufferUsage::VERTEX).unwrap();
    let texture = device.create_texture(&TextureDescriptor::new_2d(4, 4, PixelFormat::Rgba8888)).unwrap();

    assert_eq!(device.release_all(ReleaseMode::Delete), 2);
    assert_eq!(gl.live_buffers(), 0);
    assert_eq!(gl.live_textures(), 0);
    assert_eq!(buffer.lifecycle_state(), LifecycleState::Released);

    assert_eq!(device.queue().write_buffer(&buffer, 0, &[1]), Err(GpuError::ResourceReleased));
    assert_eq!(
        device.queue().write_texture(&texture, Rect::from_size(1, 1), &[0; 4], 0),
        Err(GpuError::ResourceReleased)
    );

    // Dropping a released resource does not enqueue it again.
    drop((buffer, texture));
    assert_eq!(device.pending_release_count(), 0);
}

#[test]
fn abandon_issues_no_native_calls() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let buffer = device.create_buffer(16, BufferUsage::VERTEX).unwrap();
    gl.reset_counters();

    assert_eq!(device.release_all(ReleaseMode::Abandon), 1);
    assert_eq!(gl.total_calls(), 0);
    assert_eq!(buffer.lifecycle_state(), LifecycleState::Released);
    // The lost context still "has" the buffer; nobody deleted it.
    assert!(gl.is_buffer(buffer.native_id()));
}

#[test]
fn dropping_the_device_deletes_everything() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let buffer = device.create_buffer(16, BufferUsage::VERTEX).unwrap();
    let _texture = device.create_texture(&TextureDescriptor::new_2d(4, 4, PixelFormat::Rgba8888)).unwrap();

    drop(device);
    assert_eq!(gl.live_buffers(), 0);
    assert_eq!(gl.live_textures(), 0);
    assert_eq!(buffer.lifecycle_state(), LifecycleState::Released);
}

// ============================================================================
// Ownership
// ============================================================================

#[test]
fn resources_are_bound_to_their_device() {
    let (_gl, first) = setup(HeadlessGl::gles(3));
    let (gl, second) = setup(HeadlessGl::gles(3));
    let buffer = first.create_buffer(16, BufferUsage::VERTEX).unwrap();
    gl.reset_counters();

    assert_eq!(second.queue().write_buffer(&buffer, 0, &[1]), Err(GpuError::DeviceMismatch));
    assert_eq!(gl.total_calls(), 0);
}

#[test]
fn identities_are_unique() {
    let (_gl, device) = setup(HeadlessGl::gles(3));
    let a = device.create_buffer(16, BufferUsage::VERTEX).unwrap();
    let b = device.create_buffer(16, BufferUsage::VERTEX).unwrap();
    let a_id = a.id();
    drop(a);
    drop(device.create_command_encoder());
    let c = device.create_buffer(16, BufferUsage::VERTEX).unwrap();
    assert_ne!(a_id, b.id());
    assert_ne!(a_id, c.id());
}

// ============================================================================
// State Cache
// ============================================================================

#[test]
fn redundant_texture_binds_are_skipped() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let a = device.create_texture(&TextureDescriptor::new_2d(2, 2, PixelFormat::Rgba8888)).unwrap();
    let b = device.create_texture(&TextureDescriptor::new_2d(2, 2, PixelFormat::Rgba8888)).unwrap();
    let pixels = [0u8; 16];
    gl.reset_counters();

    let queue = device.queue();
    queue.write_texture(&a, Rect::from_size(2, 2), &pixels, 0).unwrap();
    queue.write_texture(&a, Rect::from_size(2, 2), &pixels, 0).unwrap();
    assert_eq!(gl.call_count("glBindTexture"), 1);

    queue.write_texture(&b, Rect::from_size(2, 2), &pixels, 0).unwrap();
    assert_eq!(gl.call_count("glBindTexture"), 2);

    // After foreign code touched the context every binding is issued again.
    device.reset_state_cache();
    queue.write_texture(&b, Rect::from_size(2, 2), &pixels, 0).unwrap();
    assert_eq!(gl.call_count("glBindTexture"), 3);
}
