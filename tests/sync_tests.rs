//! Fence & Semaphore Tests
//!
//! Tests for:
//! - CommandEncoder::insert_fence / wait_for_fence
//! - Imported semaphores and adoption
//! - Devices without sync objects

use std::sync::Arc;

use vellum::gl::GlInterface;
use vellum::gl::consts::{GL_NO_ERROR, GL_SYNC_GPU_COMMANDS_COMPLETE};
use vellum::gpu::BackendSemaphore;
use vellum::{Device, DeviceSettings, GpuError, HeadlessGl, LifecycleState, ReleaseMode};

fn setup(gl: HeadlessGl) -> (Arc<HeadlessGl>, Device) {
    let _ = env_logger::builder().is_test(true).try_init();
    let gl = Arc::new(gl);
    let device = Device::from_gl(gl.clone(), DeviceSettings::default().with_label("sync")).unwrap();
    (gl, device)
}

#[test]
fn fences_are_flushed_and_reclaimed() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    gl.reset_counters();

    let mut encoder = device.create_command_encoder();
    let fence = encoder.insert_fence().unwrap();
    assert!(fence.is_adopted());
    assert_eq!(gl.live_syncs(), 1);
    assert_eq!(gl.call_count("glFenceSync"), 1);
    assert_eq!(gl.call_count("glFlush"), 1);

    drop(fence);
    assert_eq!(gl.live_syncs(), 1);
    drop(device.create_command_encoder());
    assert_eq!(gl.live_syncs(), 0);
}

#[test]
fn waiting_on_a_fence() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let mut encoder = device.create_command_encoder();
    let fence = encoder.insert_fence().unwrap();

    encoder.wait_for_fence(&fence).unwrap();
    assert_eq!(gl.call_count("glWaitSync"), 1);
    assert_eq!(gl.get_error(), GL_NO_ERROR);
}

#[test]
fn released_fences_cannot_be_waited_on() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let fence = device.create_command_encoder().insert_fence().unwrap();
    device.release_all(ReleaseMode::Delete);
    assert_eq!(fence.lifecycle_state(), LifecycleState::Released);

    let mut encoder = device.create_command_encoder();
    assert_eq!(encoder.wait_for_fence(&fence), Err(GpuError::ResourceReleased));
    assert_eq!(gl.call_count("glWaitSync"), 0);
}

#[test]
fn failed_fence_creation() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    gl.set_fail_allocations(true);
    let mut encoder = device.create_command_encoder();
    assert_eq!(encoder.insert_fence().err(), Some(GpuError::AllocationFailed("fence")));
    assert_eq!(device.live_resource_count(), 0);
}

#[test]
fn sync_objects_need_device_support() {
    let (gl, device) = setup(HeadlessGl::gles(2));
    gl.reset_counters();

    let mut encoder = device.create_command_encoder();
    assert_eq!(encoder.insert_fence().err(), Some(GpuError::Unsupported("sync objects")));
    assert_eq!(gl.total_calls(), 0);
}

#[test]
fn imported_semaphores_follow_adoption() {
    let (gl, device) = setup(HeadlessGl::gles(3));
    let borrowed = gl.fence_sync(GL_SYNC_GPU_COMMANDS_COMPLETE, 0).unwrap();
    let owned = gl.fence_sync(GL_SYNC_GPU_COMMANDS_COMPLETE, 0).unwrap();

    let a = device.import_backend_semaphore(BackendSemaphore::new(borrowed), false).unwrap();
    let b = device.import_backend_semaphore(BackendSemaphore::new(owned), true).unwrap();
    assert_eq!(a.sync(), borrowed);
    assert!(!a.is_adopted());

    let mut encoder = device.create_command_encoder();
    encoder.wait_for_fence(&a).unwrap();
    encoder.wait_for_fence(&b).unwrap();

    drop((a, b));
    drop(device.create_command_encoder());
    assert_eq!(gl.live_syncs(), 1);
}

#[test]
fn semaphores_cannot_be_imported_without_support() {
    let (_gl, device) = setup(HeadlessGl::gles(2));
    let (other, _other_device) = setup(HeadlessGl::gles(3));
    let sync = other.fence_sync(GL_SYNC_GPU_COMMANDS_COMPLETE, 0).unwrap();
    assert_eq!(
        device.import_backend_semaphore(BackendSemaphore::new(sync), true).err(),
        Some(GpuError::Unsupported("sync objects"))
    );
}
