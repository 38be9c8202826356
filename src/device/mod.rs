//! Device & Resources
//!
//! The [`Device`] is the per-context facade of the GPU layer: the only factory for
//! resources and command objects, the owner of the state cache and of the registry of
//! live native handles.
//!
//! # Threading
//!
//! A `Device` is neither `Send` nor `Sync`: it lives on the thread that owns the
//! native context, and so does every native call. Resources are handed out as
//! `Arc<T>` and are `Send + Sync`; any thread may hold and drop them. Dropping the last
//! reference only enqueues the resource, and the device issues the native deletion the
//! next time [`Device::create_command_encoder`] is called.
//!
//! ```rust,ignore
//! let gl = Arc::new(HeadlessGl::gles(3));
//! let device = Device::from_gl(gl, DeviceSettings::default())?;
//!
//! let vertices = device.create_buffer(1024, BufferUsage::VERTEX)?;
//! device.queue().write_buffer(&vertices, 0, bytemuck::cast_slice(&quad))?;
//!
//! let mut encoder = device.create_command_encoder();
//! // ... render passes ...
//! device.queue().submit(encoder.finish());
//! ```

mod buffer;
mod lifecycle;
mod pipeline;
mod sampler;
mod semaphore;
mod shader;
mod texture;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub use buffer::{Buffer, BufferMapping, BufferStrategy};
pub use lifecycle::{LifecycleState, ReleaseMode};
pub use pipeline::{ColorTarget, RenderPipeline, RenderPipelineDescriptor};
pub use sampler::Sampler;
pub use semaphore::Semaphore;
pub use shader::ShaderModule;
pub use texture::{Texture, TextureKind};

pub(crate) use buffer::PendingReadback;
pub(crate) use texture::create_scratch_target;
pub(crate) use lifecycle::{NativeObject, ResourceBase, ResourceKey, ScratchTarget, TextureStorage, next_resource_id};

use lifecycle::ResourceRegistry;

use crate::command::{CommandEncoder, CommandQueue};
use crate::errors::Result;
use crate::gl::consts::GLuint;
use crate::gl::{
    GlCaps, GlContextInterface, GlInterface, InterfaceRegistry, Loader, StateCache, allocation_failed, clear_errors,
};
use crate::settings::DeviceSettings;

static NEXT_DEVICE_ID: AtomicU64 = AtomicU64::new(1);

/// State shared by the device and the command objects it creates.
pub(crate) struct DeviceContext {
    pub(crate) id: u64,
    interface: Arc<GlContextInterface>,
    pub(crate) settings: DeviceSettings,
    pub(crate) state: RefCell<StateCache>,
    pub(crate) resources: RefCell<ResourceRegistry>,
    vertex_array: GLuint,
}

impl DeviceContext {
    #[inline]
    pub(crate) fn gl(&self) -> &dyn GlInterface {
        self.interface.gl().as_ref()
    }

    #[inline]
    pub(crate) fn caps(&self) -> &GlCaps {
        self.interface.caps()
    }

    /// Texture unit reserved for uploads, copies and mipmap generation, so that those
    /// never disturb the units a render pass binds.
    #[inline]
    pub(crate) fn scratch_unit(&self) -> u32 {
        self.state.borrow().texture_unit_count().saturating_sub(1) as u32
    }

    /// Clears stale errors ahead of an allocation whose outcome is polled.
    pub(crate) fn begin_allocation(&self) {
        if self.settings.check_allocation_errors {
            clear_errors(self.gl());
        }
    }

    /// Whether the allocations issued since [`begin_allocation`](Self::begin_allocation)
    /// ran out of memory.
    pub(crate) fn allocation_failed(&self) -> bool {
        self.settings.check_allocation_errors && allocation_failed(self.gl())
    }

    pub(crate) fn attach(&self, identity: u64, object: NativeObject) -> ResourceBase {
        self.resources.borrow_mut().attach(identity, object)
    }

    pub(crate) fn drain(&self) -> usize {
        let mut state = self.state.borrow_mut();
        let released = self.resources.borrow_mut().drain(self.gl(), &mut state);
        if released > 0 {
            log::debug!("[{}] Reclaimed {released} resources", self.settings.label);
        }
        released
    }
}

/// The per-context factory and owner of every GPU resource.
pub struct Device {
    context: Rc<DeviceContext>,
    queue: CommandQueue,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.context.id)
            .field("label", &self.context.settings.label)
            .field("version", &self.context.caps().version)
            .finish_non_exhaustive()
    }
}

impl Device {
    /// Creates a device on the context behind a resolved interface.
    ///
    /// The context must be current on the calling thread, and stay current whenever
    /// this device is used.
    pub fn new(interface: Arc<GlContextInterface>, settings: DeviceSettings) -> Result<Self> {
        let id = NEXT_DEVICE_ID.fetch_add(1, Ordering::Relaxed);
        let caps = interface.caps();
        let gl = Arc::clone(interface.gl());

        let mut units = caps.max_texture_units;
        if let Some(limit) = settings.max_texture_units {
            units = units.min(limit.max(1));
        }
        let mut state = StateCache::new(Arc::clone(&gl), units as usize);

        // Attribute state lives in one vertex array for the lifetime of the device.
        let vertex_array = if caps.vertex_array_object_support {
            let vertex_array = gl.create_vertex_array();
            if vertex_array == 0 {
                log::error!("[{}] Failed to create the device vertex array", settings.label);
                return Err(crate::errors::GpuError::AllocationFailed("vertex array"));
            }
            state.bind_vertex_array(vertex_array);
            vertex_array
        } else {
            0
        };

        log::info!(
            "[{}] Device created on {} ({}), {units} texture units",
            settings.label,
            caps.version,
            caps.renderer
        );

        let context = Rc::new(DeviceContext {
            id,
            settings,
            state: RefCell::new(state),
            resources: RefCell::new(ResourceRegistry::new(id)),
            vertex_array,
            interface,
        });
        Ok(Self {
            queue: CommandQueue::new(Rc::clone(&context)),
            context,
        })
    }

    /// Creates a device on an already resolved interface, detecting its capabilities.
    pub fn from_gl(gl: Arc<dyn GlInterface>, settings: DeviceSettings) -> Result<Self> {
        Self::new(Arc::new(GlContextInterface::new(gl)?), settings)
    }

    /// Creates a device on the current context, reusing the interface `registry`
    /// cached for its version or resolving one through `loader`.
    ///
    /// # Safety
    ///
    /// A context must be current on the calling thread and `loader` must return valid
    /// entry points of that context.
    pub unsafe fn from_loader(
        registry: &InterfaceRegistry,
        loader: &mut Loader<'_>,
        settings: DeviceSettings,
    ) -> Result<Self> {
        // SAFETY: forwarded from the caller.
        let interface = unsafe { registry.get_or_load(loader)? };
        Self::new(interface, settings)
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.context.id
    }

    #[inline]
    #[must_use]
    pub fn caps(&self) -> &GlCaps {
        self.context.caps()
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &DeviceSettings {
        &self.context.settings
    }

    /// The device's command queue.
    #[inline]
    #[must_use]
    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// Number of resources whose native handles are still alive, including those
    /// pending release.
    #[must_use]
    pub fn live_resource_count(&self) -> usize {
        self.context.resources.borrow().live_count()
    }

    /// Number of dropped resources waiting for the next drain.
    #[must_use]
    pub fn pending_release_count(&self) -> usize {
        self.context.resources.borrow().pending_count()
    }

    /// Drains the reclamation queue, then returns a new encoder.
    ///
    /// This is the only place dropped resources are reclaimed during normal operation,
    /// which guarantees a freed native name is deleted before anything recorded through
    /// the returned encoder could reuse it.
    #[must_use]
    pub fn create_command_encoder(&self) -> CommandEncoder {
        self.context.drain();
        CommandEncoder::new(Rc::clone(&self.context))
    }

    /// Forgets every cached binding. Call after foreign code touched the context.
    pub fn reset_state_cache(&self) {
        let mut state = self.context.state.borrow_mut();
        state.reset();
        if self.context.vertex_array != 0 {
            state.bind_vertex_array(self.context.vertex_array);
        }
    }

    /// Force-releases every live resource, whether or not references remain.
    ///
    /// Resources still referenced afterwards report [`LifecycleState::Released`] and
    /// are rejected by every operation with `GpuError::ResourceReleased`.
    pub fn release_all(&self, mode: ReleaseMode) -> usize {
        let context = &self.context;
        let mut state = context.state.borrow_mut();
        let released = context.resources.borrow_mut().release_all(mode, context.gl(), &mut state);
        if released > 0 {
            log::debug!("[{}] Force-released {released} resources ({mode:?})", context.settings.label);
        }
        released
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.release_all(ReleaseMode::Delete);
        if self.context.vertex_array != 0 {
            self.context.gl().delete_vertex_array(self.context.vertex_array);
        }
        log::debug!("[{}] Device destroyed", self.context.settings.label);
    }
}
