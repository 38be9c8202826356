//! Resource lifecycle and deferred reclamation.
//!
//! ```text
//!  factory ──▶ Attached ──(last Arc dropped, any thread)──▶ PendingRelease
//!                 │                                             │
//!                 │ release_all()                               │ drain (context thread)
//!                 ▼                                             ▼
//!              Released ◀──────────────────────────────────── Released
//! ```
//!
//! Native handles live in the device's [`ResourceRegistry`], not in the resource
//! objects. A resource only carries the slot key of its registry entry; dropping it
//! sends that key over a `flume` channel. The context thread drains the channel at the
//! start of every `create_command_encoder()` and issues the native deletions, so every
//! deletion runs on the thread that owns the context and precedes any allocation that
//! could reuse the freed name.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::errors::{GpuError, Result};
use crate::gl::consts::GLuint;
use crate::gl::{GlInterface, GlSync, StateCache};

slotmap::new_key_type! {
    /// Slot of a live resource in its device's registry.
    pub struct ResourceKey;
}

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Allocates a resource identity. Identities are never reused, so the state cache can
/// compare them without fear of aliasing a deleted object.
pub(crate) fn next_resource_id() -> u64 {
    NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Lifecycle state of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LifecycleState {
    /// Registered with its device; the native handle is valid.
    Attached = 0,
    /// Last external reference dropped; waiting for the owning thread to drain.
    PendingRelease = 1,
    /// Native handle destroyed (or abandoned with its context).
    Released = 2,
}

/// Lifecycle cell shared between a resource and its registry entry.
#[derive(Debug)]
pub(crate) struct Lifecycle(AtomicU8);

impl Lifecycle {
    fn new() -> Self {
        Self(AtomicU8::new(LifecycleState::Attached as u8))
    }

    pub(crate) fn get(&self) -> LifecycleState {
        match self.0.load(Ordering::Acquire) {
            0 => LifecycleState::Attached,
            1 => LifecycleState::PendingRelease,
            _ => LifecycleState::Released,
        }
    }

    fn mark_released(&self) {
        self.0.store(LifecycleState::Released as u8, Ordering::Release);
    }

    /// Attached → PendingRelease. Fails if teardown already released the resource.
    fn begin_release(&self) -> bool {
        self.0
            .compare_exchange(
                LifecycleState::Attached as u8,
                LifecycleState::PendingRelease as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

// ─── Resource Base ───────────────────────────────────────────────────────────

/// Fields every device resource embeds.
///
/// Dropping the base enqueues the resource for reclamation; it never touches the
/// native API, so it is safe on any thread.
pub(crate) struct ResourceBase {
    id: u64,
    key: ResourceKey,
    device_id: u64,
    lifecycle: Arc<Lifecycle>,
    reclaim: flume::Sender<ResourceKey>,
}

impl std::fmt::Debug for ResourceBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceBase")
            .field("id", &self.id)
            .field("device_id", &self.device_id)
            .field("state", &self.lifecycle.get())
            .finish()
    }
}

impl ResourceBase {
    #[inline]
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub(crate) fn key(&self) -> ResourceKey {
        self.key
    }

    #[inline]
    pub(crate) fn state(&self) -> LifecycleState {
        self.lifecycle.get()
    }

    /// Verifies the resource is alive and owned by `device_id`.
    pub(crate) fn check(&self, device_id: u64) -> Result<()> {
        if self.device_id != device_id {
            return Err(GpuError::DeviceMismatch);
        }
        if self.lifecycle.get() == LifecycleState::Released {
            return Err(GpuError::ResourceReleased);
        }
        Ok(())
    }
}

impl Drop for ResourceBase {
    fn drop(&mut self) {
        if self.lifecycle.begin_release() {
            // A closed channel means the device is gone and already released everything.
            let _ = self.reclaim.send(self.key);
        }
    }
}

// ─── Native Objects ──────────────────────────────────────────────────────────

/// Storage behind a texture. Selects the release behavior of the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TextureStorage {
    /// Texture object owned by this layer.
    Sampled { texture: GLuint },
    /// Multisample renderbuffer.
    Multisample { renderbuffer: GLuint },
    /// Depth-stencil renderbuffer.
    DepthStencil { renderbuffer: GLuint },
    /// Imported texture object; deleted only when adopted.
    External { texture: GLuint, adopted: bool },
    /// Imported framebuffer; deleted only when adopted.
    RenderTarget { adopted: bool },
}

/// Scratch objects of a pending emulated readback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScratchTarget {
    pub(crate) identity: u64,
    pub(crate) texture: GLuint,
    pub(crate) framebuffer: GLuint,
}

impl ScratchTarget {
    pub(crate) fn delete(self, gl: &dyn GlInterface, state: &mut StateCache) {
        gl.delete_framebuffer(self.framebuffer);
        gl.delete_texture(self.texture);
        state.forget(self.identity);
    }
}

/// Native handles owned by one registry entry.
#[derive(Debug)]
pub(crate) enum NativeObject {
    /// `name` is `0` for CPU-backed buffers.
    Buffer {
        name: GLuint,
        scratch: SmallVec<[ScratchTarget; 1]>,
    },
    Texture {
        storage: TextureStorage,
        /// `0` when no framebuffer was created.
        framebuffer: GLuint,
    },
    /// `0` when sampler state is emulated with texture parameters.
    Sampler(GLuint),
    Shader(GLuint),
    Program(GLuint),
    Semaphore { sync: GlSync, adopted: bool },
}

impl NativeObject {
    fn kind(&self) -> &'static str {
        match self {
            Self::Buffer { .. } => "buffer",
            Self::Texture { .. } => "texture",
            Self::Sampler(_) => "sampler",
            Self::Shader(_) => "shader",
            Self::Program(_) => "program",
            Self::Semaphore { .. } => "semaphore",
        }
    }

    /// Issues the native deletions for this object.
    fn delete(self, gl: &dyn GlInterface, state: &mut StateCache) {
        match self {
            Self::Buffer { name, scratch } => {
                if name != 0 {
                    gl.delete_buffer(name);
                }
                for target in scratch {
                    target.delete(gl, state);
                }
            }
            Self::Texture { storage, framebuffer } => match storage {
                TextureStorage::Sampled { texture } => {
                    if framebuffer != 0 {
                        gl.delete_framebuffer(framebuffer);
                    }
                    gl.delete_texture(texture);
                }
                TextureStorage::Multisample { renderbuffer } | TextureStorage::DepthStencil { renderbuffer } => {
                    if framebuffer != 0 {
                        gl.delete_framebuffer(framebuffer);
                    }
                    gl.delete_renderbuffer(renderbuffer);
                }
                TextureStorage::External { texture, adopted } => {
                    // A framebuffer attached lazily to an import is always ours.
                    if framebuffer != 0 {
                        gl.delete_framebuffer(framebuffer);
                    }
                    if adopted {
                        gl.delete_texture(texture);
                    }
                }
                TextureStorage::RenderTarget { adopted } => {
                    if adopted && framebuffer != 0 {
                        gl.delete_framebuffer(framebuffer);
                    }
                }
            },
            Self::Sampler(name) => {
                if name != 0 {
                    gl.delete_sampler(name);
                }
            }
            Self::Shader(name) => gl.delete_shader(name),
            Self::Program(name) => gl.delete_program(name),
            Self::Semaphore { sync, adopted } => {
                if adopted {
                    gl.delete_sync(sync);
                }
            }
        }
    }
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// How [`Device::release_all`](super::Device::release_all) treats native handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseMode {
    /// Issue native deletions. The context must still be current.
    Delete,
    /// The context is lost: mark everything released without native calls.
    Abandon,
}

#[derive(Debug)]
struct LiveResource {
    identity: u64,
    object: NativeObject,
    lifecycle: Arc<Lifecycle>,
}

/// Live resources of one device, plus the receiving end of its reclamation channel.
#[derive(Debug)]
pub(crate) struct ResourceRegistry {
    device_id: u64,
    live: SlotMap<ResourceKey, LiveResource>,
    sender: flume::Sender<ResourceKey>,
    receiver: flume::Receiver<ResourceKey>,
}

impl ResourceRegistry {
    pub(crate) fn new(device_id: u64) -> Self {
        let (sender, receiver) = flume::unbounded();
        Self {
            device_id,
            live: SlotMap::with_key(),
            sender,
            receiver,
        }
    }

    /// Registers a freshly created native object under `identity`.
    pub(crate) fn attach(&mut self, identity: u64, object: NativeObject) -> ResourceBase {
        let lifecycle = Arc::new(Lifecycle::new());
        let key = self.live.insert(LiveResource {
            identity,
            object,
            lifecycle: Arc::clone(&lifecycle),
        });
        ResourceBase {
            id: identity,
            key,
            device_id: self.device_id,
            lifecycle,
            reclaim: self.sender.clone(),
        }
    }

    pub(crate) fn object_mut(&mut self, key: ResourceKey) -> Option<&mut NativeObject> {
        self.live.get_mut(key).map(|entry| &mut entry.object)
    }

    #[inline]
    pub(crate) fn live_count(&self) -> usize {
        self.live.len()
    }

    #[inline]
    pub(crate) fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Releases every resource whose last reference was dropped. Returns the count.
    pub(crate) fn drain(&mut self, gl: &dyn GlInterface, state: &mut StateCache) -> usize {
        let mut released = 0;
        for key in self.receiver.try_iter() {
            let Some(entry) = self.live.remove(key) else {
                continue;
            };
            log::debug!("Reclaiming {} #{}", entry.object.kind(), entry.identity);
            entry.object.delete(gl, state);
            state.forget(entry.identity);
            entry.lifecycle.mark_released();
            released += 1;
        }
        released
    }

    /// Releases every live resource regardless of outstanding references.
    pub(crate) fn release_all(&mut self, mode: ReleaseMode, gl: &dyn GlInterface, state: &mut StateCache) -> usize {
        // Keys already queued refer to entries removed below.
        for _ in self.receiver.try_iter() {}

        let count = self.live.len();
        for (_, entry) in self.live.drain() {
            if mode == ReleaseMode::Delete {
                entry.object.delete(gl, state);
            }
            state.forget(entry.identity);
            entry.lifecycle.mark_released();
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::HeadlessGl;

    fn registry() -> (Arc<HeadlessGl>, StateCache, ResourceRegistry) {
        let gl = Arc::new(HeadlessGl::gles(3));
        let state = StateCache::new(gl.clone(), 8);
        (gl, state, ResourceRegistry::new(1))
    }

    #[test]
    fn drop_only_enqueues() {
        let (gl, mut state, mut registry) = registry();
        let name = gl.create_buffer();
        let base = registry.attach(next_resource_id(), NativeObject::Buffer { name, scratch: SmallVec::new() });
        let lifecycle = Arc::clone(&base.lifecycle);

        drop(base);
        assert_eq!(lifecycle.get(), LifecycleState::PendingRelease);
        assert!(gl.is_buffer(name));
        assert_eq!(registry.pending_count(), 1);

        assert_eq!(registry.drain(gl.as_ref(), &mut state), 1);
        assert_eq!(lifecycle.get(), LifecycleState::Released);
        assert!(!gl.is_buffer(name));
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn abandon_issues_no_native_calls() {
        let (gl, mut state, mut registry) = registry();
        let name = gl.create_texture();
        let base = registry.attach(
            next_resource_id(),
            NativeObject::Texture {
                storage: TextureStorage::Sampled { texture: name },
                framebuffer: 0,
            },
        );
        gl.reset_counters();

        assert_eq!(registry.release_all(ReleaseMode::Abandon, gl.as_ref(), &mut state), 1);
        assert_eq!(gl.total_calls(), 0);
        assert_eq!(base.state(), LifecycleState::Released);

        // Already released: dropping must not enqueue.
        drop(base);
        assert_eq!(registry.pending_count(), 0);
    }

    #[test]
    fn non_adopted_imports_keep_their_handles() {
        let (gl, mut state, mut registry) = registry();
        let texture = gl.create_texture();
        let base = registry.attach(
            next_resource_id(),
            NativeObject::Texture {
                storage: TextureStorage::External { texture, adopted: false },
                framebuffer: 0,
            },
        );
        drop(base);
        registry.drain(gl.as_ref(), &mut state);
        assert!(gl.is_texture(texture));
        assert_eq!(gl.call_count("glDeleteTextures"), 0);
    }

    #[test]
    fn check_rejects_foreign_devices() {
        let (_gl, _state, mut registry) = registry();
        let base = registry.attach(next_resource_id(), NativeObject::Shader(0));
        assert_eq!(base.check(1), Ok(()));
        assert_eq!(base.check(2), Err(GpuError::DeviceMismatch));
    }
}
