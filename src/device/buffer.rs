use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use smallvec::SmallVec;

use super::{Device, DeviceContext, LifecycleState, NativeObject, ResourceBase, ScratchTarget, next_resource_id};
use crate::errors::{GpuError, Result};
use crate::gl::GlCaps;
use crate::gl::consts::{
    GLenum, GLuint, GL_ARRAY_BUFFER, GL_DYNAMIC_DRAW, GL_ELEMENT_ARRAY_BUFFER, GL_FRAMEBUFFER, GL_MAP_READ_BIT,
    GL_MAP_WRITE_BIT, GL_PACK_ALIGNMENT, GL_PACK_ROW_LENGTH, GL_PIXEL_PACK_BUFFER, GL_STREAM_READ, GL_UNIFORM_BUFFER,
};
use crate::gpu::BufferUsage;

/// How a buffer's contents are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferStrategy {
    /// A native buffer object.
    Native,
    /// CPU memory only. Uniform buffers on contexts without uniform blocks (or with
    /// shadowing forced) are uploaded field by field at draw time.
    Shadow,
    /// Readback without pixel-pack buffers: copies land in scratch textures and are
    /// read into CPU memory when the buffer is mapped.
    EmulatedReadback,
}

/// A copy recorded into an emulated readback buffer, read back at map time.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PendingReadback {
    pub(crate) scratch: ScratchTarget,
    pub(crate) offset: usize,
    pub(crate) row_bytes: usize,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) format: GLenum,
    pub(crate) ty: GLenum,
    pub(crate) bytes_per_pixel: usize,
}

#[derive(Debug, Default)]
struct BufferState {
    mapped: bool,
    /// Contents of `Shadow` and `EmulatedReadback` buffers. Moved out while mapped.
    storage: Vec<u8>,
    pending: Vec<PendingReadback>,
}

/// A linear GPU buffer.
#[derive(Debug)]
pub struct Buffer {
    base: ResourceBase,
    size: usize,
    usage: BufferUsage,
    target: GLenum,
    name: GLuint,
    strategy: BufferStrategy,
    state: Mutex<BufferState>,
    /// Bumped on every CPU-side write, so shadow uploads can be skipped when unchanged.
    revision: AtomicU64,
}

/// Picks the storage strategy for a request, or explains why it cannot be served.
fn select_strategy(size: usize, usage: BufferUsage, caps: &GlCaps, force_shadow: bool) -> Result<BufferStrategy> {
    if size == 0 {
        return Err(GpuError::InvalidArgument(String::from("buffer size must be non-zero")));
    }
    if usage.is_empty() {
        return Err(GpuError::InvalidArgument(String::from("buffer usage must not be empty")));
    }
    let combined = |flag: BufferUsage| usage.contains(flag) && usage != flag;

    if combined(BufferUsage::READBACK) && !caps.transfer_buffer_support {
        return Err(GpuError::UnsupportedUsage {
            resource: "buffer",
            reason: String::from("readback cannot share a buffer with other usages without transfer buffers"),
        });
    }
    // WebGL forbids an element buffer from ever being bound to another target.
    if combined(BufferUsage::INDEX) && caps.version.is_webgl() {
        return Err(GpuError::UnsupportedUsage {
            resource: "buffer",
            reason: String::from("index buffers cannot carry other usages on WebGL"),
        });
    }

    let shadowed = usage.contains(BufferUsage::UNIFORM) && (!caps.uniform_buffer_support || force_shadow);
    if shadowed && combined(BufferUsage::UNIFORM) {
        return Err(GpuError::UnsupportedUsage {
            resource: "buffer",
            reason: String::from("shadowed uniform buffers cannot carry other usages"),
        });
    }

    Ok(if usage == BufferUsage::READBACK && !caps.transfer_buffer_support {
        BufferStrategy::EmulatedReadback
    } else if shadowed {
        BufferStrategy::Shadow
    } else {
        BufferStrategy::Native
    })
}

/// Native binding target, in priority order when several usages are requested.
fn native_target(usage: BufferUsage) -> GLenum {
    if usage.contains(BufferUsage::READBACK) {
        GL_PIXEL_PACK_BUFFER
    } else if usage.contains(BufferUsage::VERTEX) {
        GL_ARRAY_BUFFER
    } else if usage.contains(BufferUsage::INDEX) {
        GL_ELEMENT_ARRAY_BUFFER
    } else {
        GL_UNIFORM_BUFFER
    }
}

impl Device {
    /// Creates a buffer of `size` bytes.
    ///
    /// The usage decides both the native target and the storage strategy; see
    /// [`BufferStrategy`]. Invalid requests fail before any native call is issued.
    pub fn create_buffer(&self, size: usize, usage: BufferUsage) -> Result<Arc<Buffer>> {
        let context = &self.context;
        let strategy = select_strategy(size, usage, context.caps(), context.settings.force_shadow_uniforms)
            .inspect_err(|e| log::warn!("[{}] Rejected buffer ({size} bytes, {usage:?}): {e}", context.settings.label))?;
        let target = native_target(usage);
        let identity = next_resource_id();

        let (name, storage) = match strategy {
            BufferStrategy::Shadow | BufferStrategy::EmulatedReadback => (0, vec![0; size]),
            BufferStrategy::Native => {
                let gl = context.gl();
                let name = gl.create_buffer();
                if name == 0 {
                    log::error!("[{}] glGenBuffers returned no buffer", context.settings.label);
                    return Err(GpuError::AllocationFailed("buffer"));
                }
                let hint = if usage.contains(BufferUsage::READBACK) { GL_STREAM_READ } else { GL_DYNAMIC_DRAW };
                context.begin_allocation();
                context.state.borrow_mut().bind_buffer(target, identity, name);
                gl.buffer_data(target, size, None, hint);
                if context.allocation_failed() {
                    log::error!("[{}] Out of memory allocating a {size} byte buffer", context.settings.label);
                    gl.delete_buffer(name);
                    context.state.borrow_mut().forget(identity);
                    return Err(GpuError::AllocationFailed("buffer storage"));
                }
                (name, Vec::new())
            }
        };

        let base = context.attach(
            identity,
            NativeObject::Buffer {
                name,
                scratch: SmallVec::new(),
            },
        );
        log::debug!("[{}] Created buffer #{identity}: {size} bytes, {usage:?}, {strategy:?}", context.settings.label);

        Ok(Arc::new(Buffer {
            base,
            size,
            usage,
            target,
            name,
            strategy,
            state: Mutex::new(BufferState {
                storage,
                ..BufferState::default()
            }),
            revision: AtomicU64::new(0),
        }))
    }
}

impl Buffer {
    /// Stable identity, never reused by another resource.
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.base.id()
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    #[must_use]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// Native target the buffer binds to.
    #[inline]
    #[must_use]
    pub fn target(&self) -> GLenum {
        self.target
    }

    /// Native buffer name; `0` for CPU-backed strategies.
    #[inline]
    #[must_use]
    pub fn native_id(&self) -> GLuint {
        self.name
    }

    #[inline]
    #[must_use]
    pub fn strategy(&self) -> BufferStrategy {
        self.strategy
    }

    #[inline]
    #[must_use]
    pub fn lifecycle_state(&self) -> LifecycleState {
        self.base.state()
    }

    #[must_use]
    pub fn is_mapped(&self) -> bool {
        self.state.lock().mapped
    }

    pub(crate) fn check(&self, context: &DeviceContext) -> Result<()> {
        self.base.check(context.id)
    }

    #[inline]
    pub(crate) fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    /// Maps `size` bytes starting at `offset` for CPU access.
    ///
    /// The returned guard unmaps when dropped, committing writes for every strategy.
    /// A later copy into a readback buffer overwrites them. Mapping a buffer that is already mapped fails without side
    /// effects.
    ///
    /// Contents visible through the guard:
    /// - `Shadow`/`EmulatedReadback`: the CPU storage itself; emulated readbacks are
    ///   resolved first, synchronously.
    /// - `Native` with mapped ranges: the driver's mapping.
    /// - `Native` without mapped ranges: a zeroed staging allocation, uploaded with one
    ///   update call on unmap.
    pub fn map<'a>(&'a self, device: &'a Device, offset: usize, size: usize) -> Result<BufferMapping<'a>> {
        let context = device.context.as_ref();
        self.check(context)?;
        if size == 0 {
            return Err(GpuError::InvalidArgument(String::from("mapped range must be non-zero")));
        }
        if offset.checked_add(size).is_none_or(|end| end > self.size) {
            return Err(GpuError::OutOfBounds {
                offset,
                size,
                capacity: self.size,
            });
        }

        let mut state = self.state.lock();
        if state.mapped {
            log::warn!("[{}] Buffer #{} is already mapped", context.settings.label, self.id());
            return Err(GpuError::AlreadyMapped);
        }

        let kind = match self.strategy {
            BufferStrategy::Shadow => MappingKind::Cpu(std::mem::take(&mut state.storage)),
            BufferStrategy::EmulatedReadback => {
                let pending = std::mem::take(&mut state.pending);
                if !pending.is_empty() {
                    self.resolve_readbacks(context, &pending, &mut state.storage);
                }
                MappingKind::Cpu(std::mem::take(&mut state.storage))
            }
            BufferStrategy::Native if context.caps().map_buffer_range_support => {
                // Read-write for every usage, like the CPU-backed strategies.
                context.state.borrow_mut().bind_buffer(self.target, self.id(), self.name);
                let ptr = context
                    .gl()
                    .map_buffer_range(self.target, offset, size, GL_MAP_READ_BIT | GL_MAP_WRITE_BIT);
                let Some(ptr) = NonNull::new(ptr) else {
                    log::error!("[{}] glMapBufferRange failed for buffer #{}", context.settings.label, self.id());
                    return Err(GpuError::MapFailed);
                };
                MappingKind::Native(ptr)
            }
            BufferStrategy::Native => MappingKind::Staging(vec![0; size]),
        };

        state.mapped = true;
        Ok(BufferMapping {
            buffer: self,
            context,
            offset,
            size,
            kind,
        })
    }

    /// Reads every pending copy into `storage` and frees the scratch targets.
    fn resolve_readbacks(&self, context: &DeviceContext, pending: &[PendingReadback], storage: &mut [u8]) {
        let gl = context.gl();
        let mut state = context.state.borrow_mut();
        if context.caps().transfer_buffer_support {
            state.unbind_buffer(GL_PIXEL_PACK_BUFFER);
        }
        state.pixel_store_i(GL_PACK_ALIGNMENT, 1);
        if context.caps().pack_row_length_support {
            state.pixel_store_i(GL_PACK_ROW_LENGTH, 0);
        }

        for readback in pending {
            let tight_row = readback.width as usize * readback.bytes_per_pixel;
            let mut pixels = vec![0; tight_row * readback.height as usize];
            state.bind_framebuffer(GL_FRAMEBUFFER, readback.scratch.identity, readback.scratch.framebuffer);
            gl.read_pixels(
                0,
                0,
                readback.width as i32,
                readback.height as i32,
                readback.format,
                readback.ty,
                &mut pixels,
            );
            for (row, source) in pixels.chunks_exact(tight_row.max(1)).enumerate() {
                let start = readback.offset + row * readback.row_bytes;
                if let Some(destination) = storage.get_mut(start..start + source.len()) {
                    destination.copy_from_slice(source);
                }
            }
            readback.scratch.delete(gl, &mut state);
        }

        if let Some(NativeObject::Buffer { scratch, .. }) = context.resources.borrow_mut().object_mut(self.base.key()) {
            scratch.retain(|target| !pending.iter().any(|p| p.scratch.identity == target.identity));
        }
        log::debug!("[{}] Resolved {} readbacks into buffer #{}", context.settings.label, pending.len(), self.id());
    }

    /// Records a copy into an emulated readback buffer. The scratch target is owned by
    /// the buffer's registry entry until the readback is resolved.
    pub(crate) fn record_readback(&self, context: &DeviceContext, readback: PendingReadback) -> Result<()> {
        let mut state = self.state.lock();
        if state.mapped {
            return Err(GpuError::AlreadyMapped);
        }
        if let Some(NativeObject::Buffer { scratch, .. }) = context.resources.borrow_mut().object_mut(self.base.key()) {
            scratch.push(readback.scratch);
        }
        state.pending.push(readback);
        Ok(())
    }

    /// `CommandQueue::write_buffer` body. Bounds are checked before any native call.
    pub(crate) fn write(&self, context: &DeviceContext, offset: usize, data: &[u8]) -> Result<()> {
        self.check(context)?;
        if offset.checked_add(data.len()).is_none_or(|end| end > self.size) {
            return Err(GpuError::OutOfBounds {
                offset,
                size: data.len(),
                capacity: self.size,
            });
        }
        let mut state = self.state.lock();
        if state.mapped {
            return Err(GpuError::AlreadyMapped);
        }
        if data.is_empty() {
            return Ok(());
        }
        match self.strategy {
            BufferStrategy::Shadow | BufferStrategy::EmulatedReadback => {
                state.storage[offset..offset + data.len()].copy_from_slice(data);
            }
            BufferStrategy::Native => {
                context.state.borrow_mut().bind_buffer(self.target, self.id(), self.name);
                context.gl().buffer_sub_data(self.target, offset, data);
            }
        }
        self.revision.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Runs `f` over the CPU contents of a shadowed buffer.
    pub(crate) fn with_shadow<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R> {
        let state = self.state.lock();
        if state.mapped {
            return Err(GpuError::AlreadyMapped);
        }
        Ok(f(&state.storage))
    }
}

enum MappingKind {
    /// CPU storage moved out of the buffer for the lifetime of the mapping.
    Cpu(Vec<u8>),
    /// Driver mapping of exactly the mapped range.
    Native(NonNull<u8>),
    Staging(Vec<u8>),
    Unmapped,
}

/// A mapped buffer range. Unmaps on drop.
pub struct BufferMapping<'a> {
    buffer: &'a Buffer,
    context: &'a DeviceContext,
    offset: usize,
    size: usize,
    kind: MappingKind,
}

impl std::fmt::Debug for BufferMapping<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferMapping")
            .field("buffer", &self.buffer.id())
            .field("offset", &self.offset)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl BufferMapping<'_> {
    #[inline]
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Unmaps explicitly. Equivalent to dropping the mapping.
    pub fn unmap(self) {}

    fn finish(&mut self) {
        let buffer = self.buffer;
        let context = self.context;
        let mut state = buffer.state.lock();
        match std::mem::replace(&mut self.kind, MappingKind::Unmapped) {
            MappingKind::Cpu(storage) => {
                state.storage = storage;
                buffer.revision.fetch_add(1, Ordering::AcqRel);
            }
            MappingKind::Native(_) => {
                context.state.borrow_mut().bind_buffer(buffer.target, buffer.id(), buffer.name);
                if !context.gl().unmap_buffer(buffer.target) {
                    log::warn!("[{}] Contents of buffer #{} were lost while mapped", context.settings.label, buffer.id());
                }
            }
            MappingKind::Staging(staging) => {
                context.state.borrow_mut().bind_buffer(buffer.target, buffer.id(), buffer.name);
                context.gl().buffer_sub_data(buffer.target, self.offset, &staging);
            }
            MappingKind::Unmapped => return,
        }
        state.mapped = false;
    }
}

impl Deref for BufferMapping<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match &self.kind {
            MappingKind::Cpu(storage) => &storage[self.offset..self.offset + self.size],
            // SAFETY: the driver keeps `size` bytes at `ptr` valid until unmap, which only
            // happens when this guard is dropped.
            MappingKind::Native(ptr) => unsafe { std::slice::from_raw_parts(ptr.as_ptr(), self.size) },
            MappingKind::Staging(staging) => staging,
            MappingKind::Unmapped => &[],
        }
    }
}

impl DerefMut for BufferMapping<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        match &mut self.kind {
            MappingKind::Cpu(storage) => &mut storage[self.offset..self.offset + self.size],
            // SAFETY: as in `deref`; the guard is borrowed mutably so the slice is unique.
            MappingKind::Native(ptr) => unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), self.size) },
            MappingKind::Staging(staging) => staging,
            MappingKind::Unmapped => &mut [],
        }
    }
}

impl Drop for BufferMapping<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::HeadlessGl;

    fn caps(gl: &HeadlessGl) -> GlCaps {
        GlCaps::detect(gl).unwrap()
    }

    #[test]
    fn readback_alone_is_emulated_without_transfer_buffers() {
        let webgl = caps(&HeadlessGl::webgl(2));
        assert_eq!(
            select_strategy(64, BufferUsage::READBACK, &webgl, false),
            Ok(BufferStrategy::EmulatedReadback)
        );
        assert!(matches!(
            select_strategy(64, BufferUsage::READBACK | BufferUsage::VERTEX, &webgl, false),
            Err(GpuError::UnsupportedUsage { .. })
        ));

        let gles3 = caps(&HeadlessGl::gles(3));
        assert_eq!(select_strategy(64, BufferUsage::READBACK, &gles3, false), Ok(BufferStrategy::Native));
    }

    #[test]
    fn uniform_buffers_shadow_without_uniform_blocks() {
        let gles2 = caps(&HeadlessGl::gles(2));
        assert_eq!(select_strategy(256, BufferUsage::UNIFORM, &gles2, false), Ok(BufferStrategy::Shadow));

        let gles3 = caps(&HeadlessGl::gles(3));
        assert_eq!(select_strategy(256, BufferUsage::UNIFORM, &gles3, false), Ok(BufferStrategy::Native));
        assert_eq!(select_strategy(256, BufferUsage::UNIFORM, &gles3, true), Ok(BufferStrategy::Shadow));
    }

    #[test]
    fn webgl_index_buffers_stay_exclusive() {
        let webgl = caps(&HeadlessGl::webgl(2));
        assert!(select_strategy(64, BufferUsage::INDEX | BufferUsage::VERTEX, &webgl, false).is_err());
        let gles3 = caps(&HeadlessGl::gles(3));
        assert_eq!(
            select_strategy(64, BufferUsage::INDEX | BufferUsage::VERTEX, &gles3, false),
            Ok(BufferStrategy::Native)
        );
    }

    #[test]
    fn target_priority() {
        assert_eq!(native_target(BufferUsage::VERTEX | BufferUsage::INDEX), GL_ARRAY_BUFFER);
        assert_eq!(native_target(BufferUsage::INDEX), GL_ELEMENT_ARRAY_BUFFER);
        assert_eq!(native_target(BufferUsage::UNIFORM), GL_UNIFORM_BUFFER);
        assert_eq!(native_target(BufferUsage::READBACK | BufferUsage::VERTEX), GL_PIXEL_PACK_BUFFER);
    }
}
