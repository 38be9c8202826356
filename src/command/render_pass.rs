use bitflags::bitflags;
use smallvec::SmallVec;

use super::{resolve_multisample, validate_resolve};
use crate::device::{Buffer, BufferStrategy, DeviceContext, RenderPipeline, Sampler, Texture, TextureKind};
use crate::errors::{GpuError, Result};
use crate::gl::consts::{
    GLint, GLuint, GL_ARRAY_BUFFER, GL_COLOR_BUFFER_BIT, GL_DEPTH_BUFFER_BIT, GL_DEPTH_STENCIL_ATTACHMENT,
    GL_ELEMENT_ARRAY_BUFFER, GL_FRAMEBUFFER, GL_RENDERBUFFER, GL_SCISSOR_TEST, GL_STENCIL_BUFFER_BIT,
    GL_UNIFORM_BUFFER,
};
use crate::gl::convert;
use crate::gpu::{BufferUsage, Color, IndexFormat, PrimitiveType, Rect, TextureUsage};

/// What happens to the color attachment when the pass begins.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LoadAction {
    /// Keep the current contents.
    #[default]
    Load,
    Clear(Color),
    /// Contents are undefined. Treated as `Load`.
    DontCare,
}

/// Depth-stencil renderbuffer attached for the duration of a pass.
#[derive(Debug, Clone, Copy)]
pub struct DepthStencilAttachment<'a> {
    pub texture: &'a Texture,
    pub depth_clear: Option<f32>,
    pub stencil_clear: Option<u32>,
}

impl<'a> DepthStencilAttachment<'a> {
    #[must_use]
    pub fn new(texture: &'a Texture) -> Self {
        Self {
            texture,
            depth_clear: None,
            stencil_clear: None,
        }
    }

    #[must_use]
    pub fn with_depth_clear(mut self, depth: f32) -> Self {
        self.depth_clear = Some(depth);
        self
    }

    #[must_use]
    pub fn with_stencil_clear(mut self, stencil: u32) -> Self {
        self.stencil_clear = Some(stencil);
        self
    }
}

/// Targets of a render pass.
#[derive(Debug, Clone, Copy)]
pub struct RenderPassDescriptor<'a> {
    pub color: &'a Texture,
    pub load: LoadAction,
    /// Single-sample texture the multisample `color` is resolved into when the pass ends.
    pub resolve_target: Option<&'a Texture>,
    pub depth_stencil: Option<DepthStencilAttachment<'a>>,
}

impl<'a> RenderPassDescriptor<'a> {
    #[must_use]
    pub fn new(color: &'a Texture) -> Self {
        Self {
            color,
            load: LoadAction::Load,
            resolve_target: None,
            depth_stencil: None,
        }
    }

    #[must_use]
    pub fn with_clear(mut self, color: Color) -> Self {
        self.load = LoadAction::Clear(color);
        self
    }

    #[must_use]
    pub fn with_resolve_target(mut self, target: &'a Texture) -> Self {
        self.resolve_target = Some(target);
        self
    }

    #[must_use]
    pub fn with_depth_stencil(mut self, attachment: DepthStencilAttachment<'a>) -> Self {
        self.depth_stencil = Some(attachment);
        self
    }
}

bitflags! {
    /// Bindings that changed since the last flush.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Dirty: u8 {
        const UNIFORMS = 1 << 0;
        const TEXTURES = 1 << 1;
        const VERTEX   = 1 << 2;
    }
}

#[derive(Debug)]
struct UniformSlot<'a> {
    binding: u32,
    buffer: &'a Buffer,
    /// Buffer revision last flushed; `None` until the slot is bound or uploaded.
    flushed: Option<u64>,
}

#[derive(Debug)]
struct TextureSlot<'a> {
    unit: u32,
    texture: &'a Texture,
    sampler: &'a Sampler,
}

/// A bounded sequence of bindings and draws into one render target.
///
/// Setters only record; [`draw`](Self::draw) and [`draw_indexed`](Self::draw_indexed)
/// flush what changed. The pass ends when [`end`](Self::end) is called or when it is
/// dropped, resolving and detaching its attachments.
pub struct RenderPass<'a> {
    context: &'a DeviceContext,
    color: &'a Texture,
    framebuffer: GLuint,
    resolve: Option<(&'a Texture, GLuint)>,
    depth_stencil: Option<&'a Texture>,

    viewport: Rect,
    scissor: Option<Rect>,
    stencil_reference: u32,
    pipeline: Option<&'a RenderPipeline>,
    uniform_buffers: SmallVec<[UniformSlot<'a>; 4]>,
    textures: SmallVec<[TextureSlot<'a>; 4]>,
    vertex_buffer: Option<(&'a Buffer, usize)>,
    index_buffer: Option<(&'a Buffer, IndexFormat)>,
    dirty: Dirty,

    draw_count: u32,
    ended: bool,
}

impl<'a> RenderPass<'a> {
    /// Validates the targets, binds them and runs the load actions.
    pub(crate) fn begin(context: &'a DeviceContext, descriptor: &RenderPassDescriptor<'a>) -> Result<Self> {
        let color = descriptor.color;
        color.check(context)?;
        let attachable = color.kind() == TextureKind::External || color.usage().contains(TextureUsage::RENDER_ATTACHMENT);
        if color.format().is_depth_stencil() || !attachable {
            return Err(GpuError::UnsupportedUsage {
                resource: "texture",
                reason: format!("texture #{} is not a color attachment", color.id()),
            });
        }

        let resolve = match descriptor.resolve_target {
            Some(target) => {
                target.check(context)?;
                validate_resolve(color, target)?;
                Some((target, target.ensure_framebuffer(context)?))
            }
            None => None,
        };

        let depth_stencil = match &descriptor.depth_stencil {
            Some(attachment) => {
                let texture = attachment.texture;
                texture.check(context)?;
                if !texture.format().is_depth_stencil() {
                    return Err(GpuError::InvalidArgument(format!(
                        "texture #{} has no depth-stencil format",
                        texture.id()
                    )));
                }
                if (texture.width(), texture.height(), texture.sample_count())
                    != (color.width(), color.height(), color.sample_count())
                {
                    return Err(GpuError::InvalidArgument(format!(
                        "depth-stencil #{} does not match the size and sample count of #{}",
                        texture.id(),
                        color.id()
                    )));
                }
                if color.kind() == TextureKind::RenderTarget {
                    return Err(GpuError::UnsupportedUsage {
                        resource: "texture",
                        reason: String::from("imported render targets carry their own depth-stencil"),
                    });
                }
                Some(texture)
            }
            None => None,
        };

        let framebuffer = color.ensure_framebuffer(context)?;
        let gl = context.gl();
        let mut state = context.state.borrow_mut();
        state.bind_framebuffer(GL_FRAMEBUFFER, color.id(), framebuffer);
        if let Some(texture) = depth_stencil {
            gl.framebuffer_renderbuffer(
                GL_FRAMEBUFFER,
                GL_DEPTH_STENCIL_ATTACHMENT,
                GL_RENDERBUFFER,
                texture.native_id(),
            );
        }

        let mut clear_mask = 0;
        if let LoadAction::Clear(clear) = descriptor.load {
            state.color_mask(true, true, true, true);
            state.clear_color(clear.r, clear.g, clear.b, clear.a);
            clear_mask |= GL_COLOR_BUFFER_BIT;
        }
        if let Some(attachment) = descriptor.depth_stencil {
            if let Some(depth) = attachment.depth_clear {
                state.depth_mask(true);
                state.clear_depth(depth);
                clear_mask |= GL_DEPTH_BUFFER_BIT;
            }
            if let Some(stencil) = attachment.stencil_clear {
                state.stencil_mask(GLuint::MAX);
                state.clear_stencil(stencil as GLint);
                clear_mask |= GL_STENCIL_BUFFER_BIT;
            }
        }
        if clear_mask != 0 {
            state.set_capability(GL_SCISSOR_TEST, false);
            gl.clear(clear_mask);
        }
        drop(state);

        log::debug!(
            "[{}] Began render pass on #{} ({}x{})",
            context.settings.label,
            color.id(),
            color.width(),
            color.height()
        );
        Ok(Self {
            context,
            color,
            framebuffer,
            resolve,
            depth_stencil,
            viewport: Rect::from_size(color.width(), color.height()),
            scissor: None,
            stencil_reference: 0,
            pipeline: None,
            uniform_buffers: SmallVec::new(),
            textures: SmallVec::new(),
            vertex_buffer: None,
            index_buffer: None,
            dirty: Dirty::all(),
            draw_count: 0,
            ended: false,
        })
    }

    /// Draw calls issued so far.
    #[inline]
    #[must_use]
    pub fn draw_count(&self) -> u32 {
        self.draw_count
    }

    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
    }

    /// Restricts rendering to `rect`; `None` disables scissoring.
    pub fn set_scissor_rect(&mut self, rect: Option<Rect>) {
        self.scissor = rect;
    }

    pub fn set_stencil_reference(&mut self, reference: u32) {
        self.stencil_reference = reference;
    }

    pub fn set_pipeline(&mut self, pipeline: &'a RenderPipeline) -> Result<()> {
        pipeline.check(self.context)?;
        if pipeline.color_format() != self.color.format() {
            return Err(GpuError::InvalidArgument(format!(
                "pipeline #{} renders {:?} but the target is {:?}",
                pipeline.id(),
                pipeline.color_format(),
                self.color.format()
            )));
        }
        if self.pipeline.is_some_and(|current| current.id() == pipeline.id()) {
            return Ok(());
        }
        self.pipeline = Some(pipeline);
        for slot in &mut self.uniform_buffers {
            slot.flushed = None;
        }
        self.dirty = Dirty::all();
        Ok(())
    }

    pub fn set_uniform_buffer(&mut self, binding: u32, buffer: &'a Buffer) -> Result<()> {
        buffer.check(self.context)?;
        if !buffer.usage().contains(BufferUsage::UNIFORM) {
            return Err(GpuError::UnsupportedUsage {
                resource: "buffer",
                reason: format!("buffer #{} was not created with UNIFORM usage", buffer.id()),
            });
        }
        let slot = UniformSlot {
            binding,
            buffer,
            flushed: None,
        };
        match self.uniform_buffers.iter_mut().find(|slot| slot.binding == binding) {
            Some(existing) => *existing = slot,
            None => self.uniform_buffers.push(slot),
        }
        self.dirty |= Dirty::UNIFORMS;
        Ok(())
    }

    pub fn set_texture(&mut self, binding: u32, texture: &'a Texture, sampler: &'a Sampler) -> Result<()> {
        texture.check(self.context)?;
        sampler.check(self.context)?;
        if !texture.is_sampleable() {
            return Err(GpuError::UnsupportedUsage {
                resource: "texture",
                reason: format!("texture #{} cannot be sampled", texture.id()),
            });
        }
        if binding >= self.context.scratch_unit() {
            return Err(GpuError::InvalidArgument(format!("texture unit {binding} is out of range")));
        }
        let slot = TextureSlot {
            unit: binding,
            texture,
            sampler,
        };
        match self.textures.iter_mut().find(|slot| slot.unit == binding) {
            Some(existing) => *existing = slot,
            None => self.textures.push(slot),
        }
        self.dirty |= Dirty::TEXTURES;
        Ok(())
    }

    /// Binds the interleaved vertex buffer, starting `offset` bytes in.
    pub fn set_vertex_buffer(&mut self, buffer: &'a Buffer, offset: usize) -> Result<()> {
        buffer.check(self.context)?;
        if !buffer.usage().contains(BufferUsage::VERTEX) || buffer.strategy() != BufferStrategy::Native {
            return Err(GpuError::UnsupportedUsage {
                resource: "buffer",
                reason: format!("buffer #{} was not created with VERTEX usage", buffer.id()),
            });
        }
        if offset >= buffer.size() {
            return Err(GpuError::OutOfBounds {
                offset,
                size: 0,
                capacity: buffer.size(),
            });
        }
        self.vertex_buffer = Some((buffer, offset));
        self.dirty |= Dirty::VERTEX;
        Ok(())
    }

    pub fn set_index_buffer(&mut self, buffer: &'a Buffer, format: IndexFormat) -> Result<()> {
        buffer.check(self.context)?;
        if !buffer.usage().contains(BufferUsage::INDEX) || buffer.strategy() != BufferStrategy::Native {
            return Err(GpuError::UnsupportedUsage {
                resource: "buffer",
                reason: format!("buffer #{} was not created with INDEX usage", buffer.id()),
            });
        }
        if format == IndexFormat::Uint32 && !self.context.caps().uint_index_support {
            return Err(GpuError::Unsupported("32-bit indices"));
        }
        self.index_buffer = Some((buffer, format));
        Ok(())
    }

    /// Issues a non-indexed draw.
    pub fn draw(&mut self, primitive: PrimitiveType, first_vertex: u32, vertex_count: u32) -> Result<()> {
        if vertex_count == 0 {
            return Ok(());
        }
        self.flush()
            .inspect_err(|e| log::warn!("[{}] Draw rejected: {e}", self.context.settings.label))?;
        self.context
            .gl()
            .draw_arrays(convert::primitive_mode(primitive), first_vertex as GLint, vertex_count as GLint);
        self.draw_count += 1;
        Ok(())
    }

    /// Issues an indexed draw reading `index_count` indices from `first_index` on.
    pub fn draw_indexed(&mut self, primitive: PrimitiveType, first_index: u32, index_count: u32) -> Result<()> {
        let Some((buffer, format)) = self.index_buffer else {
            return Err(GpuError::InvalidArgument(String::from("no index buffer is set")));
        };
        if index_count == 0 {
            return Ok(());
        }
        let offset = first_index as usize * format.byte_size();
        let size = index_count as usize * format.byte_size();
        if offset + size > buffer.size() {
            return Err(GpuError::OutOfBounds {
                offset,
                size,
                capacity: buffer.size(),
            });
        }
        self.flush()
            .inspect_err(|e| log::warn!("[{}] Draw rejected: {e}", self.context.settings.label))?;

        // The element binding is vertex-array state and may have been replaced by an
        // upload since the last draw.
        self.context
            .state
            .borrow_mut()
            .bind_buffer(GL_ELEMENT_ARRAY_BUFFER, buffer.id(), buffer.native_id());
        self.context.gl().draw_elements(
            convert::primitive_mode(primitive),
            index_count as GLint,
            convert::index_type(format),
            offset,
        );
        self.draw_count += 1;
        Ok(())
    }

    /// Makes earlier draws' framebuffer writes visible to later texture reads, when the
    /// device supports it. Returns whether a barrier was issued.
    pub fn texture_barrier(&mut self) -> bool {
        if !self.context.caps().texture_barrier_support {
            return false;
        }
        self.context.gl().texture_barrier();
        true
    }

    /// Resolves and detaches the attachments. Equivalent to dropping the pass, except
    /// that a failed resolve is reported.
    pub fn end(mut self) -> Result<()> {
        self.finish()
    }

    /// Replays every pending binding in order. Returns the active pipeline.
    fn flush(&mut self) -> Result<&'a RenderPipeline> {
        let context = self.context;
        let pipeline = self
            .pipeline
            .ok_or_else(|| GpuError::InvalidArgument(String::from("no pipeline is set")))?;
        let gl = context.gl();
        let mut state = context.state.borrow_mut();

        // Target
        state.bind_framebuffer(GL_FRAMEBUFFER, self.color.id(), self.framebuffer);

        // Viewport & scissor
        let viewport = self.viewport;
        state.viewport(viewport.x, viewport.y, viewport.width as GLint, viewport.height as GLint);
        match self.scissor {
            Some(rect) => {
                state.set_capability(GL_SCISSOR_TEST, true);
                state.scissor(rect.x, rect.y, rect.width as GLint, rect.height as GLint);
            }
            None => state.set_capability(GL_SCISSOR_TEST, false),
        }

        // Pipeline
        pipeline.activate(&mut state, context.caps().fetch_per_sample_flag, self.stencil_reference);

        // Uniform buffers
        for &binding in pipeline.uniform_bindings() {
            if !self.uniform_buffers.iter().any(|slot| slot.binding == binding) {
                return Err(GpuError::InvalidArgument(format!("uniform binding {binding} is not set")));
            }
        }
        for slot in &mut self.uniform_buffers {
            if !pipeline.uniform_bindings().contains(&slot.binding) {
                continue;
            }
            let buffer = slot.buffer;
            match (pipeline.uses_uniform_blocks(), buffer.strategy()) {
                (true, BufferStrategy::Native) if slot.flushed.is_none() => {
                    state.bind_buffer_range(
                        GL_UNIFORM_BUFFER,
                        slot.binding,
                        buffer.id(),
                        buffer.native_id(),
                        0,
                        buffer.size(),
                    );
                    slot.flushed = Some(buffer.revision());
                }
                (true, BufferStrategy::Native) => {}
                (false, BufferStrategy::Shadow) => {
                    let revision = buffer.revision();
                    if slot.flushed != Some(revision) {
                        let binding = slot.binding;
                        buffer.with_shadow(|bytes| pipeline.upload_shadow_uniforms(gl, binding, bytes))?;
                        slot.flushed = Some(revision);
                    }
                }
                (blocks, strategy) => {
                    return Err(GpuError::UnsupportedUsage {
                        resource: "buffer",
                        reason: format!(
                            "{strategy:?} buffer #{} cannot feed a pipeline {} uniform blocks",
                            buffer.id(),
                            if blocks { "with" } else { "without" }
                        ),
                    });
                }
            }
        }
        self.dirty.remove(Dirty::UNIFORMS);

        // Textures
        if self.dirty.contains(Dirty::TEXTURES) {
            for &unit in pipeline.sampler_units() {
                if !self.textures.iter().any(|slot| slot.unit == unit) {
                    return Err(GpuError::InvalidArgument(format!("texture unit {unit} is not set")));
                }
            }
            for slot in &self.textures {
                let (texture, sampler) = (slot.texture, slot.sampler);
                state.bind_texture(slot.unit, texture.target(), texture.id(), texture.native_id());
                if sampler.native_id() != 0 {
                    state.bind_sampler(slot.unit, sampler.id(), sampler.native_id());
                } else if texture.applied_sampler() != sampler.id() {
                    state.active_texture(slot.unit);
                    sampler.apply_to_texture(gl, texture.target());
                    texture.set_applied_sampler(sampler.id());
                }
            }
            self.dirty.remove(Dirty::TEXTURES);
        }

        // Vertex buffer
        if self.dirty.contains(Dirty::VERTEX) {
            let layout = pipeline.vertex_layout();
            if !layout.is_empty() {
                let Some((buffer, offset)) = self.vertex_buffer else {
                    return Err(GpuError::InvalidArgument(String::from("no vertex buffer is set")));
                };
                state.bind_buffer(GL_ARRAY_BUFFER, buffer.id(), buffer.native_id());
                let stride = layout.stride() as GLint;
                for attribute in layout.attributes() {
                    let (ty, normalized) = convert::vertex_format(attribute.format);
                    gl.vertex_attrib_pointer(
                        attribute.location,
                        attribute.format.components(),
                        ty,
                        normalized,
                        stride,
                        offset + attribute.offset,
                    );
                }
            }
            state.set_enabled_attributes(layout.location_mask());
            self.dirty.remove(Dirty::VERTEX);
        }

        Ok(pipeline)
    }

    fn finish(&mut self) -> Result<()> {
        if self.ended {
            return Ok(());
        }
        self.ended = true;
        let context = self.context;

        let resolved = match self.resolve {
            Some((target, framebuffer)) => resolve_multisample(context, self.color, self.framebuffer, target, framebuffer),
            None => Ok(()),
        };

        if self.depth_stencil.is_some() {
            let mut state = context.state.borrow_mut();
            state.bind_framebuffer(GL_FRAMEBUFFER, self.color.id(), self.framebuffer);
            context
                .gl()
                .framebuffer_renderbuffer(GL_FRAMEBUFFER, GL_DEPTH_STENCIL_ATTACHMENT, GL_RENDERBUFFER, 0);
        }

        log::debug!(
            "[{}] Ended render pass on #{} after {} draws",
            context.settings.label,
            self.color.id(),
            self.draw_count
        );
        resolved
    }
}

impl std::fmt::Debug for RenderPass<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPass")
            .field("color", &self.color.id())
            .field("framebuffer", &self.framebuffer)
            .field("pipeline", &self.pipeline.map(RenderPipeline::id))
            .field("draw_count", &self.draw_count)
            .field("ended", &self.ended)
            .finish_non_exhaustive()
    }
}

impl Drop for RenderPass<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            log::error!("[{}] Render pass ended with an error: {e}", self.context.settings.label);
        }
    }
}
