//! Texture family.
//!
//! One [`Texture`] type covers every storage kind; [`TextureKind`] selects the
//! behavior and the registry entry's [`TextureStorage`] selects what release deletes.
//!
//! | Kind           | Storage          | Framebuffer          | Release deletes            |
//! |----------------|------------------|----------------------|----------------------------|
//! | `Regular`      | texture object   | eager if attachment  | texture + framebuffer      |
//! | `Multisample`  | renderbuffer     | always               | renderbuffer + framebuffer |
//! | `DepthStencil` | renderbuffer     | always               | renderbuffer + framebuffer |
//! | `External`     | imported texture | lazy                 | framebuffer; texture if adopted |
//! | `RenderTarget` | imported fbo     | the imported one     | framebuffer if adopted     |

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use super::{
    Device, DeviceContext, LifecycleState, NativeObject, ResourceBase, ScratchTarget, TextureStorage, next_resource_id,
};
use crate::errors::{GpuError, Result};
use crate::gl::consts::{
    GLenum, GLint, GLuint, GL_COLOR_ATTACHMENT0, GL_DEPTH_STENCIL_ATTACHMENT, GL_FRAMEBUFFER, GL_FRAMEBUFFER_COMPLETE,
    GL_NEAREST, GL_RENDERBUFFER, GL_TEXTURE_2D, GL_TEXTURE_MAG_FILTER, GL_TEXTURE_MAX_LEVEL, GL_TEXTURE_MIN_FILTER,
};
use crate::gl::{GlInterface, pixel_format_from_sized};
use crate::gpu::{BackendRenderTarget, BackendTexture, PixelFormat, TextureDescriptor, TextureUsage};

const NO_FRAMEBUFFER: u32 = u32::MAX;

/// Storage kind of a [`Texture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    /// Texture object owned by this layer.
    Regular,
    /// Multisample color renderbuffer. Never sampled; resolved into a regular texture.
    Multisample,
    /// Depth-stencil renderbuffer.
    DepthStencil,
    /// Imported texture object.
    External,
    /// Imported framebuffer, e.g. the window-system surface.
    RenderTarget,
}

#[derive(Debug)]
pub struct Texture {
    base: ResourceBase,
    width: u32,
    height: u32,
    format: PixelFormat,
    mip_level_count: u32,
    sample_count: u32,
    usage: TextureUsage,
    kind: TextureKind,
    target: GLenum,
    native_id: GLuint,
    framebuffer: AtomicU32,
    adopted: bool,
    /// Identity of the sampler whose state was last written as texture parameters.
    applied_sampler: AtomicU64,
}

impl Texture {
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.base.id()
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    #[must_use]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[inline]
    #[must_use]
    pub fn mip_level_count(&self) -> u32 {
        self.mip_level_count
    }

    #[inline]
    #[must_use]
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    #[inline]
    #[must_use]
    pub fn usage(&self) -> TextureUsage {
        self.usage
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> TextureKind {
        self.kind
    }

    /// Binding target: `GL_TEXTURE_2D`, the imported target, `GL_RENDERBUFFER` for
    /// renderbuffer kinds or `GL_FRAMEBUFFER` for imported render targets.
    #[inline]
    #[must_use]
    pub fn target(&self) -> GLenum {
        self.target
    }

    /// Texture or renderbuffer name; the framebuffer name for imported render targets.
    #[inline]
    #[must_use]
    pub fn native_id(&self) -> GLuint {
        self.native_id
    }

    /// Framebuffer rendering into this texture, if one exists yet.
    #[must_use]
    pub fn framebuffer_id(&self) -> Option<GLuint> {
        match self.framebuffer.load(Ordering::Acquire) {
            NO_FRAMEBUFFER => None,
            framebuffer => Some(framebuffer),
        }
    }

    /// Whether releasing this texture deletes an imported native handle.
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

    /// Whether the texture can be bound to a sampler slot.
    pub(crate) fn is_sampleable(&self) -> bool {
        matches!(self.kind, TextureKind::Regular | TextureKind::External)
            && self.usage.contains(TextureUsage::TEXTURE_BINDING)
    }

    pub(crate) fn applied_sampler(&self) -> u64 {
        self.applied_sampler.load(Ordering::Relaxed)
    }

    pub(crate) fn set_applied_sampler(&self, sampler: u64) {
        self.applied_sampler.store(sampler, Ordering::Relaxed);
    }

    /// Returns the framebuffer of this texture, attaching one to an imported texture
    /// the first time it is used as a render or blit target.
    pub(crate) fn ensure_framebuffer(&self, context: &DeviceContext) -> Result<GLuint> {
        if let Some(framebuffer) = self.framebuffer_id() {
            return Ok(framebuffer);
        }
        if self.kind != TextureKind::External
            || self.target != GL_TEXTURE_2D
            || !context.caps().is_renderable(self.format)
        {
            return Err(GpuError::UnsupportedUsage {
                resource: "texture",
                reason: format!("texture #{} cannot be used as a render target", self.id()),
            });
        }

        let texture = self.native_id;
        let framebuffer = attach_framebuffer(context, self.id(), |gl| {
            gl.framebuffer_texture_2d(GL_FRAMEBUFFER, GL_COLOR_ATTACHMENT0, GL_TEXTURE_2D, texture, 0);
        })?;
        if let Some(NativeObject::Texture { framebuffer: slot, .. }) =
            context.resources.borrow_mut().object_mut(self.base.key())
        {
            *slot = framebuffer;
        }
        self.framebuffer.store(framebuffer, Ordering::Release);
        log::debug!("[{}] Attached framebuffer {framebuffer} to imported texture #{}", context.settings.label, self.id());
        Ok(framebuffer)
    }
}

/// Creates a framebuffer, lets `attach` populate it, and checks completeness.
/// Deletes the framebuffer on failure.
fn attach_framebuffer(context: &DeviceContext, identity: u64, attach: impl FnOnce(&dyn GlInterface)) -> Result<GLuint> {
    let gl = context.gl();
    let framebuffer = gl.create_framebuffer();
    if framebuffer == 0 {
        log::error!("[{}] glGenFramebuffers returned no framebuffer", context.settings.label);
        return Err(GpuError::AllocationFailed("framebuffer"));
    }
    let mut state = context.state.borrow_mut();
    state.bind_framebuffer(GL_FRAMEBUFFER, identity, framebuffer);
    attach(gl);
    let status = gl.check_framebuffer_status(GL_FRAMEBUFFER);
    if status != GL_FRAMEBUFFER_COMPLETE {
        log::error!("[{}] Framebuffer incomplete: 0x{status:04X}", context.settings.label);
        gl.delete_framebuffer(framebuffer);
        state.forget(identity);
        return Err(GpuError::FramebufferIncomplete(status));
    }
    Ok(framebuffer)
}

/// Allocates a single-level texture with a framebuffer, used as the intermediate of
/// an emulated readback. The caller owns the returned handles.
pub(crate) fn create_scratch_target(
    context: &DeviceContext,
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<ScratchTarget> {
    let gl = context.gl();
    let info = context.caps().format_info(format);
    let identity = next_resource_id();
    let texture = gl.create_texture();
    if texture == 0 {
        log::error!("[{}] glGenTextures returned no scratch texture", context.settings.label);
        return Err(GpuError::AllocationFailed("scratch texture"));
    }

    {
        let mut state = context.state.borrow_mut();
        state.bind_texture(context.scratch_unit(), GL_TEXTURE_2D, identity, texture);
        gl.tex_parameter_i(GL_TEXTURE_2D, GL_TEXTURE_MIN_FILTER, GL_NEAREST as GLint);
        gl.tex_parameter_i(GL_TEXTURE_2D, GL_TEXTURE_MAG_FILTER, GL_NEAREST as GLint);
        context.begin_allocation();
        gl.tex_image_2d(
            GL_TEXTURE_2D,
            0,
            info.tex_image_internal_format as GLint,
            width as GLint,
            height as GLint,
            info.external_format,
            info.external_type,
            None,
        );
        if context.allocation_failed() {
            log::error!("[{}] Out of memory allocating a {width}x{height} scratch texture", context.settings.label);
            gl.delete_texture(texture);
            state.forget(identity);
            return Err(GpuError::AllocationFailed("scratch texture"));
        }
    }

    let framebuffer = attach_framebuffer(context, identity, |gl| {
        gl.framebuffer_texture_2d(GL_FRAMEBUFFER, GL_COLOR_ATTACHMENT0, GL_TEXTURE_2D, texture, 0);
    })
    .inspect_err(|_| {
        gl.delete_texture(texture);
        context.state.borrow_mut().forget(identity);
    })?;
    Ok(ScratchTarget {
        identity,
        texture,
        framebuffer,
    })
}

/// Checks everything that can be checked without native calls. Returns the kind the
/// request dispatches to.
fn validate(descriptor: &TextureDescriptor, context: &DeviceContext) -> Result<TextureKind> {
    let caps = context.caps();
    let TextureDescriptor {
        width,
        height,
        format,
        mip_level_count,
        sample_count,
        usage,
    } = *descriptor;

    if width == 0 || height == 0 {
        return Err(GpuError::InvalidArgument(format!("texture size {width}x{height} is empty")));
    }
    if width > caps.max_texture_size || height > caps.max_texture_size {
        return Err(GpuError::InvalidArgument(format!(
            "texture size {width}x{height} exceeds the device limit of {}",
            caps.max_texture_size
        )));
    }
    if usage.is_empty() {
        return Err(GpuError::InvalidArgument(String::from("texture usage must not be empty")));
    }
    if mip_level_count == 0 || mip_level_count > descriptor.max_mip_level_count() {
        return Err(GpuError::InvalidArgument(format!(
            "{mip_level_count} mip levels requested for a {width}x{height} texture"
        )));
    }
    if sample_count == 0 {
        return Err(GpuError::InvalidArgument(String::from("sample count must be at least 1")));
    }

    let renderbuffer_rules = |what: &str| -> Result<()> {
        if usage.contains(TextureUsage::TEXTURE_BINDING) {
            return Err(GpuError::UnsupportedUsage {
                resource: "texture",
                reason: format!("{what} textures cannot be sampled"),
            });
        }
        if !usage.contains(TextureUsage::RENDER_ATTACHMENT) {
            return Err(GpuError::UnsupportedUsage {
                resource: "texture",
                reason: format!("{what} textures require RENDER_ATTACHMENT"),
            });
        }
        if mip_level_count != 1 {
            return Err(GpuError::InvalidArgument(format!("{what} textures have exactly one mip level")));
        }
        if !caps.is_renderable(format) {
            return Err(GpuError::NonRenderableFormat(format));
        }
        Ok(())
    };

    if sample_count > 1 {
        renderbuffer_rules("multisample")?;
        if !caps.msaa_support() {
            return Err(GpuError::Unsupported("multisample renderbuffers"));
        }
        if sample_count > caps.max_samples {
            return Err(GpuError::InvalidArgument(format!(
                "{sample_count} samples exceeds the device limit of {}",
                caps.max_samples
            )));
        }
        return Ok(TextureKind::Multisample);
    }
    if format.is_depth_stencil() {
        renderbuffer_rules("depth-stencil")?;
        return Ok(TextureKind::DepthStencil);
    }

    if !caps.is_texturable(format) {
        return Err(GpuError::NonTexturableFormat(format));
    }
    if usage.contains(TextureUsage::RENDER_ATTACHMENT) && !caps.is_renderable(format) {
        return Err(GpuError::NonRenderableFormat(format));
    }
    Ok(TextureKind::Regular)
}

impl Device {
    /// Creates a texture.
    ///
    /// Dispatch order: `sample_count > 1` → multisample renderbuffer, depth-stencil
    /// format → depth-stencil renderbuffer, otherwise a regular texture with every mip
    /// level allocated up front. `RENDER_ATTACHMENT` textures get a complete framebuffer
    /// before this returns.
    pub fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<Arc<Texture>> {
        let context = self.context.as_ref();
        let kind = validate(descriptor, context)
            .inspect_err(|e| log::warn!("[{}] Rejected texture {descriptor:?}: {e}", context.settings.label))?;

        let identity = next_resource_id();
        let (storage, target, native_id, framebuffer) = match kind {
            TextureKind::Multisample | TextureKind::DepthStencil => {
                create_renderbuffer_storage(context, identity, descriptor)?
            }
            _ => create_texture_storage(context, identity, descriptor)?,
        };

        let base = context.attach(identity, NativeObject::Texture { storage, framebuffer });
        log::debug!(
            "[{}] Created {kind:?} texture #{identity}: {}x{} {:?}, {} mips, {}x samples",
            context.settings.label,
            descriptor.width,
            descriptor.height,
            descriptor.format,
            descriptor.mip_level_count,
            descriptor.sample_count
        );

        Ok(Arc::new(Texture {
            base,
            width: descriptor.width,
            height: descriptor.height,
            format: descriptor.format,
            mip_level_count: descriptor.mip_level_count,
            sample_count: descriptor.sample_count,
            usage: descriptor.usage,
            kind,
            target,
            native_id,
            framebuffer: AtomicU32::new(if framebuffer == 0 { NO_FRAMEBUFFER } else { framebuffer }),
            adopted: true,
            applied_sampler: AtomicU64::new(0),
        }))
    }

    /// Wraps a texture created outside of this layer.
    ///
    /// With `adopted`, releasing the wrapper deletes the texture; otherwise the caller
    /// keeps ownership. No native call is issued here. A framebuffer is attached lazily
    /// the first time the texture is rendered or blitted into.
    pub fn import_backend_texture(&self, backend: &BackendTexture, adopted: bool) -> Result<Arc<Texture>> {
        let context = self.context.as_ref();
        if !backend.is_valid() {
            log::warn!("[{}] Rejected invalid backend texture {backend:?}", context.settings.label);
            return Err(GpuError::InvalidArgument(String::from("backend texture has no name or an empty size")));
        }
        let format = pixel_format_from_sized(backend.info.format).ok_or_else(|| {
            log::warn!("[{}] Unknown backend texture format 0x{:04X}", context.settings.label, backend.info.format);
            GpuError::InvalidArgument(format!("unknown sized format 0x{:04X}", backend.info.format))
        })?;

        let identity = next_resource_id();
        let base = context.attach(
            identity,
            NativeObject::Texture {
                storage: TextureStorage::External {
                    texture: backend.info.id,
                    adopted,
                },
                framebuffer: 0,
            },
        );
        log::debug!(
            "[{}] Imported texture {} as #{identity} (adopted: {adopted})",
            context.settings.label,
            backend.info.id
        );

        Ok(Arc::new(Texture {
            base,
            width: backend.width,
            height: backend.height,
            format,
            mip_level_count: 1,
            sample_count: 1,
            usage: TextureUsage::TEXTURE_BINDING,
            kind: TextureKind::External,
            target: backend.info.target,
            native_id: backend.info.id,
            framebuffer: AtomicU32::new(NO_FRAMEBUFFER),
            adopted,
            applied_sampler: AtomicU64::new(0),
        }))
    }

    /// Wraps a framebuffer created outside of this layer. Name `0` is the window-system
    /// framebuffer and is never deleted.
    pub fn import_backend_render_target(&self, backend: &BackendRenderTarget, adopted: bool) -> Result<Arc<Texture>> {
        let context = self.context.as_ref();
        if !backend.is_valid() {
            log::warn!("[{}] Rejected invalid backend render target {backend:?}", context.settings.label);
            return Err(GpuError::InvalidArgument(String::from("backend render target has an empty size")));
        }
        let format = pixel_format_from_sized(backend.info.format).ok_or_else(|| {
            log::warn!("[{}] Unknown render target format 0x{:04X}", context.settings.label, backend.info.format);
            GpuError::InvalidArgument(format!("unknown sized format 0x{:04X}", backend.info.format))
        })?;

        let identity = next_resource_id();
        let framebuffer = backend.info.id;
        let base = context.attach(
            identity,
            NativeObject::Texture {
                storage: TextureStorage::RenderTarget { adopted },
                framebuffer,
            },
        );
        log::debug!(
            "[{}] Imported render target {framebuffer} as #{identity} (adopted: {adopted})",
            context.settings.label
        );

        Ok(Arc::new(Texture {
            base,
            width: backend.width,
            height: backend.height,
            format,
            mip_level_count: 1,
            sample_count: backend.sample_count.max(1),
            usage: TextureUsage::RENDER_ATTACHMENT,
            kind: TextureKind::RenderTarget,
            target: GL_FRAMEBUFFER,
            native_id: framebuffer,
            framebuffer: AtomicU32::new(framebuffer),
            adopted,
            applied_sampler: AtomicU64::new(0),
        }))
    }
}

type Allocated = (TextureStorage, GLenum, GLuint, GLuint);

fn create_texture_storage(context: &DeviceContext, identity: u64, descriptor: &TextureDescriptor) -> Result<Allocated> {
    let gl = context.gl();
    let caps = context.caps();
    let info = caps.format_info(descriptor.format);
    let texture = gl.create_texture();
    if texture == 0 {
        log::error!("[{}] glGenTextures returned no texture", context.settings.label);
        return Err(GpuError::AllocationFailed("texture"));
    }

    let discard = |state: &mut crate::gl::StateCache| {
        gl.delete_texture(texture);
        state.forget(identity);
    };

    {
        let mut state = context.state.borrow_mut();
        state.bind_texture(context.scratch_unit(), GL_TEXTURE_2D, identity, texture);
        gl.tex_parameter_i(GL_TEXTURE_2D, GL_TEXTURE_MIN_FILTER, GL_NEAREST as GLint);
        gl.tex_parameter_i(GL_TEXTURE_2D, GL_TEXTURE_MAG_FILTER, GL_NEAREST as GLint);
        if caps.version.is_gl() || caps.version.is_es3_class() {
            gl.tex_parameter_i(GL_TEXTURE_2D, GL_TEXTURE_MAX_LEVEL, descriptor.mip_level_count as GLint - 1);
        }

        context.begin_allocation();
        for level in 0..descriptor.mip_level_count {
            let width = (descriptor.width >> level).max(1);
            let height = (descriptor.height >> level).max(1);
            gl.tex_image_2d(
                GL_TEXTURE_2D,
                level as GLint,
                info.tex_image_internal_format as GLint,
                width as GLint,
                height as GLint,
                info.external_format,
                info.external_type,
                None,
            );
        }
        if context.allocation_failed() {
            log::error!(
                "[{}] Out of memory allocating a {}x{} texture",
                context.settings.label,
                descriptor.width,
                descriptor.height
            );
            discard(&mut state);
            return Err(GpuError::AllocationFailed("texture storage"));
        }
    }

    let framebuffer = if descriptor.usage.contains(TextureUsage::RENDER_ATTACHMENT) {
        attach_framebuffer(context, identity, |gl| {
            gl.framebuffer_texture_2d(GL_FRAMEBUFFER, GL_COLOR_ATTACHMENT0, GL_TEXTURE_2D, texture, 0);
        })
        .inspect_err(|_| discard(&mut context.state.borrow_mut()))?
    } else {
        0
    };

    Ok((TextureStorage::Sampled { texture }, GL_TEXTURE_2D, texture, framebuffer))
}

fn create_renderbuffer_storage(
    context: &DeviceContext,
    identity: u64,
    descriptor: &TextureDescriptor,
) -> Result<Allocated> {
    let gl = context.gl();
    let info = context.caps().format_info(descriptor.format);
    let renderbuffer = gl.create_renderbuffer();
    if renderbuffer == 0 {
        log::error!("[{}] glGenRenderbuffers returned no renderbuffer", context.settings.label);
        return Err(GpuError::AllocationFailed("renderbuffer"));
    }

    context.begin_allocation();
    gl.bind_renderbuffer(GL_RENDERBUFFER, renderbuffer);
    let (width, height) = (descriptor.width as GLint, descriptor.height as GLint);
    if descriptor.sample_count > 1 {
        gl.renderbuffer_storage_multisample(
            GL_RENDERBUFFER,
            descriptor.sample_count as GLint,
            info.renderbuffer_internal_format,
            width,
            height,
        );
    } else {
        gl.renderbuffer_storage(GL_RENDERBUFFER, info.renderbuffer_internal_format, width, height);
    }
    if context.allocation_failed() {
        log::error!(
            "[{}] Out of memory allocating a {}x{} renderbuffer",
            context.settings.label,
            descriptor.width,
            descriptor.height
        );
        gl.delete_renderbuffer(renderbuffer);
        return Err(GpuError::AllocationFailed("renderbuffer storage"));
    }

    let attachment = if descriptor.format.is_depth_stencil() {
        GL_DEPTH_STENCIL_ATTACHMENT
    } else {
        GL_COLOR_ATTACHMENT0
    };
    let framebuffer = attach_framebuffer(context, identity, |gl| {
        gl.framebuffer_renderbuffer(GL_FRAMEBUFFER, attachment, GL_RENDERBUFFER, renderbuffer);
    })
    .inspect_err(|_| gl.delete_renderbuffer(renderbuffer))?;

    let storage = if descriptor.sample_count > 1 {
        TextureStorage::Multisample { renderbuffer }
    } else {
        TextureStorage::DepthStencil { renderbuffer }
    };
    Ok((storage, GL_RENDERBUFFER, renderbuffer, framebuffer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::HeadlessGl;
    use crate::settings::DeviceSettings;

    fn device(gl: HeadlessGl) -> (Arc<HeadlessGl>, Device) {
        let gl = Arc::new(gl);
        let device = Device::from_gl(gl.clone(), DeviceSettings::default()).unwrap();
        (gl, device)
    }

    #[test]
    fn mip_chain_is_allocated_up_front() {
        let (gl, device) = device(HeadlessGl::gles(3));
        let descriptor = TextureDescriptor::new_2d(64, 16, PixelFormat::Rgba8888).with_mip_level_count(7);
        let texture = device.create_texture(&descriptor).unwrap();
        assert_eq!(gl.texture_level_count(texture.native_id()), 7);
        assert_eq!(gl.texture_level(texture.native_id(), 6).map(|(w, h, _)| (w, h)), Some((1, 1)));
    }

    #[test]
    fn invalid_descriptors_issue_no_native_calls() {
        let (gl, device) = device(HeadlessGl::gles(3));
        gl.reset_counters();
        let requests = [
            TextureDescriptor::new_2d(0, 4, PixelFormat::Rgba8888),
            TextureDescriptor::new_2d(4, 4, PixelFormat::Rgba8888).with_mip_level_count(0),
            TextureDescriptor::new_2d(4, 4, PixelFormat::Rgba8888).with_mip_level_count(4),
            TextureDescriptor::new_2d(4, 4, PixelFormat::Rgba8888).with_sample_count(0),
            TextureDescriptor::new_2d(4, 4, PixelFormat::Rgba8888).with_usage(TextureUsage::empty()),
            TextureDescriptor::new_2d(4, 4, PixelFormat::Depth24Stencil8),
            TextureDescriptor::new_2d(4, 4, PixelFormat::Rgba8888).with_sample_count(4),
        ];
        for descriptor in &requests {
            assert!(device.create_texture(descriptor).is_err(), "{descriptor:?}");
        }
        assert_eq!(gl.allocation_calls(), 0);
    }

    #[test]
    fn incomplete_framebuffer_frees_every_handle() {
        let (gl, device) = device(HeadlessGl::gles(3));
        gl.set_incomplete_framebuffers(true);
        let descriptor =
            TextureDescriptor::new_2d(8, 8, PixelFormat::Rgba8888).with_usage(TextureUsage::RENDER_ATTACHMENT);
        assert!(matches!(device.create_texture(&descriptor), Err(GpuError::FramebufferIncomplete(_))));
        assert_eq!(gl.live_textures(), 0);
        assert_eq!(gl.live_framebuffers(), 0);
        assert_eq!(device.live_resource_count(), 0);
    }
}
