//! Buffer Tests
//!
//! Tests for:
//! - Creation: validation before native calls, strategy and target selection
//! - CommandQueue::write_buffer: bounds, exactly one native update
//! - Mapping: shadow storage, staging, double-map rejection
//! - Mapped writes read back through native and emulated readback buffers

use std::sync::Arc;

use vellum::gl::consts::{GL_ARRAY_BUFFER, GL_ELEMENT_ARRAY_BUFFER, GL_UNIFORM_BUFFER};
use vellum::gpu::{BufferUsage, PixelFormat, Rect, TextureDescriptor, TextureUsage};
use vellum::{BufferStrategy, Device, DeviceSettings, GpuError, HeadlessGl};

fn setup(gl: HeadlessGl) -> (Arc<HeadlessGl>, Device) {
    let _ = env_logger::builder().is_test(true).try_init();
    let gl = Arc::new(gl);
    let device = Device::from_gl(gl.clone(), DeviceSettings::default()).unwrap();
    (gl, device)
}

// ============================================================================
// Creation
// ============================================================================

#[test]
fn vertex_buffer_binds_to_array_target() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let buffer = device.create_buffer(1024, BufferUsage::VERTEX).unwrap();

    assert_eq!(buffer.size(), 1024);
    assert_eq!(buffer.target(), GL_ARRAY_BUFFER);
    assert_eq!(buffer.strategy(), BufferStrategy::Native);
    assert!(gl.is_buffer(buffer.native_id()));
    assert_eq!(gl.buffer_contents(buffer.native_id()).map(|data| data.len()), Some(1024));
}

#[test]
fn index_buffer_binds_to_element_target() {
    let (_gl, device) = setup(HeadlessGl::gles(3));
    let buffer = device.create_buffer(64, BufferUsage::INDEX).unwrap();
    assert_eq!(buffer.target(), GL_ELEMENT_ARRAY_BUFFER);
}

#[test]
fn invalid_requests_issue_no_allocations() {
    let (gl, device) = setup(HeadlessGl::webgl(2));
    gl.reset_counters();

    assert!(matches!(device.create_buffer(0, BufferUsage::VERTEX), Err(GpuError::InvalidArgument(_))));
    assert!(matches!(device.create_buffer(64, BufferUsage::empty()), Err(GpuError::InvalidArgument(_))));
    assert!(matches!(
        device.create_buffer(64, BufferUsage::INDEX | BufferUsage::VERTEX),
        Err(GpuError::UnsupportedUsage { .. })
    ));
    assert_eq!(gl.allocation_calls(), 0);
    assert_eq!(device.live_resource_count(), 0);
}

#[test]
fn uniform_buffer_without_blocks_is_cpu_only() {
    let (gl, device) = setup(HeadlessGl::gles(2));
    gl.reset_counters();

    let buffer = device.create_buffer(256, BufferUsage::UNIFORM).unwrap();
    assert_eq!(buffer.strategy(), BufferStrategy::Shadow);
    assert_eq!(buffer.native_id(), 0);

    let mut mapping = buffer.map(&device, 0, 256).unwrap();
    assert_eq!(mapping.len(), 256);
    mapping[..4].copy_from_slice(&[1, 2, 3, 4]);
    drop(mapping);

    let mapping = buffer.map(&device, 0, 4).unwrap();
    assert_eq!(&*mapping, &[1, 2, 3, 4]);
    assert_eq!(gl.total_calls(), 0);
}

#[test]
fn uniform_buffer_with_blocks_is_native() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let buffer = device.create_buffer(256, BufferUsage::UNIFORM).unwrap();
    assert_eq!(buffer.strategy(), BufferStrategy::Native);
    assert_eq!(buffer.target(), GL_UNIFORM_BUFFER);
    assert_eq!(gl.live_buffers(), 1);
}

#[test]
fn forced_shadow_uniforms_skip_native_buffers() {
    let _ = env_logger::builder().is_test(true).try_init();
    let gl = Arc::new(HeadlessGl::gles(3));
    let settings = DeviceSettings::default().with_force_shadow_uniforms(true);
    let device = Device::from_gl(gl.clone(), settings).unwrap();

    let buffer = device.create_buffer(64, BufferUsage::UNIFORM).unwrap();
    assert_eq!(buffer.strategy(), BufferStrategy::Shadow);
    assert_eq!(gl.live_buffers(), 0);
}

#[test]
fn failed_generation_reports_allocation_failure() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    gl.set_fail_allocations(true);
    assert!(matches!(device.create_buffer(64, BufferUsage::VERTEX), Err(GpuError::AllocationFailed(_))));
    assert_eq!(device.live_resource_count(), 0);
}

#[test]
fn out_of_memory_frees_the_buffer() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    gl.set_out_of_memory(true);
    assert!(matches!(device.create_buffer(64, BufferUsage::VERTEX), Err(GpuError::AllocationFailed(_))));
    assert_eq!(gl.live_buffers(), 0);
}

// ============================================================================
// write_buffer
// ============================================================================

#[test]
fn write_buffer_issues_one_update() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let buffer = device.create_buffer(16, BufferUsage::VERTEX).unwrap();
    gl.reset_counters();

    device.queue().write_buffer(&buffer, 4, &[1, 2, 3, 4]).unwrap();
    assert_eq!(gl.call_count("glBufferSubData"), 1);

    let contents = gl.buffer_contents(buffer.native_id()).unwrap();
    assert_eq!(&contents[..8], &[0, 0, 0, 0, 1, 2, 3, 4]);
}

#[test]
fn write_buffer_out_of_bounds_issues_no_calls() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let buffer = device.create_buffer(16, BufferUsage::VERTEX).unwrap();
    gl.reset_counters();

    let result = device.queue().write_buffer(&buffer, 12, &[0; 8]);
    assert_eq!(
        result,
        Err(GpuError::OutOfBounds {
            offset: 12,
            size: 8,
            capacity: 16
        })
    );
    assert_eq!(gl.total_calls(), 0);
}

#[test]
fn empty_write_is_a_no_op() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let buffer = device.create_buffer(16, BufferUsage::VERTEX).unwrap();
    gl.reset_counters();

    device.queue().write_buffer(&buffer, 16, &[]).unwrap();
    assert_eq!(gl.total_calls(), 0);
}

#[test]
fn write_buffer_into_shadow_storage() {
    let (gl, device) = setup(HeadlessGl::gles(2));
    let buffer = device.create_buffer(8, BufferUsage::UNIFORM).unwrap();
    device.queue().write_buffer(&buffer, 0, &[9; 8]).unwrap();
    assert_eq!(gl.total_calls(), 0);

    let mapping = buffer.map(&device, 0, 8).unwrap();
    assert_eq!(&*mapping, &[9; 8]);
}

// ============================================================================
// Mapping
// ============================================================================

#[test]
fn double_map_is_rejected() {
    let (_gl, device) = setup(HeadlessGl::gles(3));
    let buffer = device.create_buffer(32, BufferUsage::VERTEX).unwrap();

    let mapping = buffer.map(&device, 0, 16).unwrap();
    assert!(buffer.is_mapped());
    assert!(matches!(buffer.map(&device, 16, 16), Err(GpuError::AlreadyMapped)));
    drop(mapping);

    assert!(!buffer.is_mapped());
    assert!(buffer.map(&device, 16, 16).is_ok());
}

#[test]
fn writes_while_mapped_are_rejected() {
    let (_gl, device) = setup(HeadlessGl::gles(3));
    let buffer = device.create_buffer(32, BufferUsage::VERTEX).unwrap();
    let _mapping = buffer.map(&device, 0, 32).unwrap();
    assert_eq!(device.queue().write_buffer(&buffer, 0, &[1]), Err(GpuError::AlreadyMapped));
}

#[test]
fn mapped_writes_reach_the_native_buffer() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let buffer = device.create_buffer(8, BufferUsage::VERTEX).unwrap();

    let mut mapping = buffer.map(&device, 4, 4).unwrap();
    mapping.copy_from_slice(&[5, 6, 7, 8]);
    mapping.unmap();

    let contents = gl.buffer_contents(buffer.native_id()).unwrap();
    assert_eq!(contents, vec![0, 0, 0, 0, 5, 6, 7, 8]);
}

#[test]
fn staging_map_uploads_on_unmap() {
    // WebGL has no mapped ranges.
    let (gl, device) = setup(HeadlessGl::webgl(2));
    let buffer = device.create_buffer(8, BufferUsage::VERTEX).unwrap();
    gl.reset_counters();

    let mut mapping = buffer.map(&device, 0, 4).unwrap();
    mapping.copy_from_slice(&[1, 1, 1, 1]);
    drop(mapping);

    assert_eq!(gl.call_count("glMapBufferRange"), 0);
    assert_eq!(gl.call_count("glBufferSubData"), 1);
    assert_eq!(&gl.buffer_contents(buffer.native_id()).unwrap()[..4], &[1, 1, 1, 1]);
}

#[test]
fn map_range_is_validated() {
    let (_gl, device) = setup(HeadlessGl::gles(3));
    let buffer = device.create_buffer(8, BufferUsage::VERTEX).unwrap();
    assert!(matches!(buffer.map(&device, 0, 0), Err(GpuError::InvalidArgument(_))));
    assert!(matches!(buffer.map(&device, 4, 8), Err(GpuError::OutOfBounds { .. })));
}

// ============================================================================
// Readback
// ============================================================================

#[test]
fn mapped_writes_survive_on_every_readback_strategy() {
    for (gl, strategy) in [
        (HeadlessGl::gles(3), BufferStrategy::Native),
        (HeadlessGl::gles(2), BufferStrategy::EmulatedReadback),
        (HeadlessGl::webgl(2), BufferStrategy::EmulatedReadback),
    ] {
        let (_gl, device) = setup(gl);
        let buffer = device.create_buffer(8, BufferUsage::READBACK).unwrap();
        assert_eq!(buffer.strategy(), strategy);

        let mut mapping = buffer.map(&device, 0, 8).unwrap();
        mapping.copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        drop(mapping);

        let mapping = buffer.map(&device, 0, 8).unwrap();
        assert_eq!(&*mapping, &[1, 2, 3, 4, 5, 6, 7, 8], "{strategy:?}");
    }
}

#[test]
fn mapped_bytes_round_trip_through_a_readback() {
    let pattern: Vec<u8> = (0..64).map(|i| 200 - i).collect();
    let pixels: Vec<u8> = (100..116).collect();

    for gl in [HeadlessGl::gles(3), HeadlessGl::gles(2), HeadlessGl::webgl(2)] {
        let (_gl, device) = setup(gl);
        let texture = device
            .create_texture(
                &TextureDescriptor::new_2d(2, 2, PixelFormat::Rgba8888)
                    .with_usage(TextureUsage::TEXTURE_BINDING | TextureUsage::RENDER_ATTACHMENT),
            )
            .unwrap();
        device.queue().write_texture(&texture, Rect::from_size(2, 2), &pixels, 0).unwrap();
        let buffer = device.create_buffer(64, BufferUsage::READBACK).unwrap();

        let mut mapping = buffer.map(&device, 0, 64).unwrap();
        mapping.copy_from_slice(&pattern);
        drop(mapping);

        let mut encoder = device.create_command_encoder();
        encoder.copy_texture_to_buffer(&texture, Rect::from_size(2, 2), &buffer, 16, 0).unwrap();
        device.queue().submit(encoder.finish());

        // Only the copied region changes; the rest still holds the mapped writes.
        let mut expected = pattern.clone();
        expected[16..32].copy_from_slice(&pixels);
        let mapping = buffer.map(&device, 0, 64).unwrap();
        assert_eq!(mapping.to_vec(), expected, "{:?}", buffer.strategy());
    }
}
