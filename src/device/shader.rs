use std::sync::Arc;

use super::{Device, DeviceContext, LifecycleState, NativeObject, ResourceBase, next_resource_id};
use crate::errors::{GpuError, Result};
use crate::gl::consts::{GLint, GLuint, GL_COMPILE_STATUS, GL_FRAGMENT_SHADER, GL_FALSE, GL_VERTEX_SHADER};
use crate::gpu::{ShaderModuleDescriptor, ShaderStage};

/// A compiled shader stage.
#[derive(Debug)]
pub struct ShaderModule {
    base: ResourceBase,
    stage: ShaderStage,
    name: GLuint,
}

impl ShaderModule {
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.base.id()
    }

    #[inline]
    #[must_use]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

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
}

impl Device {
    /// Compiles a shader stage. On failure the driver's info log is returned in
    /// [`GpuError::ShaderCompile`] and no shader object survives.
    pub fn create_shader_module(&self, descriptor: &ShaderModuleDescriptor) -> Result<Arc<ShaderModule>> {
        let context = self.context.as_ref();
        if descriptor.code.trim().is_empty() {
            log::warn!("[{}] Rejected empty {:?} shader", context.settings.label, descriptor.stage);
            return Err(GpuError::InvalidArgument(String::from("shader source is empty")));
        }

        let gl = context.gl();
        let ty = match descriptor.stage {
            ShaderStage::Vertex => GL_VERTEX_SHADER,
            ShaderStage::Fragment => GL_FRAGMENT_SHADER,
        };
        let name = gl.create_shader(ty);
        if name == 0 {
            log::error!("[{}] glCreateShader returned no shader", context.settings.label);
            return Err(GpuError::AllocationFailed("shader"));
        }

        gl.shader_source(name, &descriptor.code);
        gl.compile_shader(name);
        if gl.get_shader_parameter(name, GL_COMPILE_STATUS) == GLint::from(GL_FALSE) {
            let info_log = gl.get_shader_info_log(name);
            log::error!(
                "[{}] {:?} shader failed to compile: {}",
                context.settings.label,
                descriptor.stage,
                info_log.trim_end()
            );
            gl.delete_shader(name);
            return Err(GpuError::ShaderCompile(info_log));
        }

        let identity = next_resource_id();
        let base = context.attach(identity, NativeObject::Shader(name));
        log::debug!("[{}] Compiled {:?} shader #{identity}", context.settings.label, descriptor.stage);
        Ok(Arc::new(ShaderModule {
            base,
            stage: descriptor.stage,
            name,
        }))
    }
}
