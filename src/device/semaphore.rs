use std::sync::Arc;

use super::{Device, DeviceContext, LifecycleState, NativeObject, ResourceBase, next_resource_id};
use crate::errors::{GpuError, Result};
use crate::gl::GlSync;
use crate::gpu::BackendSemaphore;

/// A fence in the command stream.
#[derive(Debug)]
pub struct Semaphore {
    base: ResourceBase,
    sync: GlSync,
    adopted: bool,
}

impl Semaphore {
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.base.id()
    }

    #[inline]
    #[must_use]
    pub fn sync(&self) -> GlSync {
        self.sync
    }

    #[inline]
    #[must_use]
    pub fn is_adopted(&self) -> bool {
        self.adopted
    }

    #[inline]
    #[must_use]
    pub fn lifecycle_state(&self) -> LifecycleState {
        self.base.state()
    }

    pub(crate) fn check(&self, context: &DeviceContext) -> Result<()> {
        self.base.check(context.id)
    }
}

impl DeviceContext {
    /// Registers a sync object. Used by fence insertion and imports.
    pub(crate) fn attach_semaphore(&self, sync: GlSync, adopted: bool) -> Arc<Semaphore> {
        let identity = next_resource_id();
        let base = self.attach(identity, NativeObject::Semaphore { sync, adopted });
        log::debug!("[{}] Registered semaphore #{identity} (adopted: {adopted})", self.settings.label);
        Arc::new(Semaphore { base, sync, adopted })
    }
}

impl Device {
    /// Wraps a sync object created outside of this layer. With `adopted`, releasing the
    /// wrapper deletes the sync object.
    pub fn import_backend_semaphore(&self, backend: BackendSemaphore, adopted: bool) -> Result<Arc<Semaphore>> {
        let context = self.context.as_ref();
        if !context.caps().semaphore_support {
            log::warn!("[{}] Cannot import a semaphore: sync objects are unsupported", context.settings.label);
            return Err(GpuError::Unsupported("sync objects"));
        }
        Ok(context.attach_semaphore(backend.sync, adopted))
    }
}
