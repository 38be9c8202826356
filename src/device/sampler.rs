use std::sync::Arc;

use super::{Device, DeviceContext, LifecycleState, NativeObject, ResourceBase, next_resource_id};
use crate::errors::{GpuError, Result};
use crate::gl::consts::{
    GLenum, GLint, GLuint, GL_TEXTURE_MAG_FILTER, GL_TEXTURE_MIN_FILTER, GL_TEXTURE_WRAP_S, GL_TEXTURE_WRAP_T,
};
use crate::gl::{GlInterface, convert};
use crate::gpu::SamplerDescriptor;

/// Immutable filtering and addressing state.
///
/// Backed by a native sampler object when the context has them; otherwise the state
/// is written into the parameters of each texture it is bound with, and re-written
/// only when a texture meets a different sampler.
#[derive(Debug)]
pub struct Sampler {
    base: ResourceBase,
    descriptor: SamplerDescriptor,
    name: GLuint,
    /// `(pname, value)` pairs shared by both paths.
    parameters: [(GLenum, GLint); 4],
}

impl Sampler {
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.base.id()
    }

    #[inline]
    #[must_use]
    pub fn descriptor(&self) -> &SamplerDescriptor {
        &self.descriptor
    }

    /// Native sampler name; `0` when sampler state is emulated.
    #[inline]
    #[must_use]
    pub fn native_id(&self) -> GLuint {
        self.name
    }

    #[inline]
    #[must_use]
    pub fn lifecycle_state(&self) -> LifecycleState {
        self.base.state()
    }

    pub(crate) fn check(&self, context: &DeviceContext) -> Result<()> {
        self.base.check(context.id)
    }

    /// Writes the sampler state into the texture bound to `target` on the active unit.
    pub(crate) fn apply_to_texture(&self, gl: &dyn GlInterface, target: GLenum) {
        for (pname, value) in self.parameters {
            gl.tex_parameter_i(target, pname, value);
        }
    }
}

impl Device {
    pub fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<Arc<Sampler>> {
        let context = self.context.as_ref();
        let caps = context.caps();
        let border = caps.clamp_to_border_support;
        let parameters = [
            (GL_TEXTURE_WRAP_S, convert::address_mode(descriptor.address_mode_u, border)),
            (GL_TEXTURE_WRAP_T, convert::address_mode(descriptor.address_mode_v, border)),
            (GL_TEXTURE_MIN_FILTER, convert::min_filter(descriptor.min_filter, descriptor.mipmap_mode)),
            (GL_TEXTURE_MAG_FILTER, convert::mag_filter(descriptor.mag_filter)),
        ];

        let name = if caps.sampler_object_support {
            let gl = context.gl();
            let name = gl.create_sampler();
            if name == 0 {
                log::error!("[{}] glGenSamplers returned no sampler", context.settings.label);
                return Err(GpuError::AllocationFailed("sampler"));
            }
            for (pname, value) in parameters {
                gl.sampler_parameter_i(name, pname, value);
            }
            name
        } else {
            0
        };

        let identity = next_resource_id();
        let base = context.attach(identity, NativeObject::Sampler(name));
        log::debug!("[{}] Created sampler #{identity}: {descriptor:?}", context.settings.label);
        Ok(Arc::new(Sampler {
            base,
            descriptor: *descriptor,
            name,
            parameters,
        }))
    }
}
