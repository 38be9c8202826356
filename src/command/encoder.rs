use std::rc::Rc;
use std::sync::Arc;

use super::render_pass::{RenderPass, RenderPassDescriptor};
use super::{resolve_multisample, validate_resolve};
use crate::device::{
    Buffer, BufferStrategy, DeviceContext, PendingReadback, Semaphore, Texture, TextureKind, create_scratch_target,
};
use crate::errors::{GpuError, Result};
use crate::gl::consts::{
    GLint, GL_COLOR_BUFFER_BIT, GL_DRAW_FRAMEBUFFER, GL_FRAMEBUFFER, GL_NEAREST, GL_PACK_ALIGNMENT, GL_PACK_ROW_LENGTH,
    GL_PIXEL_PACK_BUFFER, GL_READ_FRAMEBUFFER, GL_SCISSOR_TEST, GL_SYNC_GPU_COMMANDS_COMPLETE, GL_TEXTURE_2D,
    GL_TIMEOUT_IGNORED,
};
use crate::gpu::{BufferUsage, Rect, TextureUsage};

/// Records render passes and copies for one submission.
///
/// Created by [`Device::create_command_encoder`](crate::device::Device::create_command_encoder),
/// which first reclaims every resource dropped since the previous encoder.
pub struct CommandEncoder {
    context: Rc<DeviceContext>,
    pass_count: u32,
    copy_count: u32,
}

impl std::fmt::Debug for CommandEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandEncoder")
            .field("device", &self.context.id)
            .field("pass_count", &self.pass_count)
            .field("copy_count", &self.copy_count)
            .finish()
    }
}

/// A finished encoder, ready for [`CommandQueue::submit`](super::CommandQueue::submit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandBuffer {
    pass_count: u32,
    copy_count: u32,
}

impl CommandBuffer {
    #[inline]
    #[must_use]
    pub fn pass_count(&self) -> u32 {
        self.pass_count
    }

    #[inline]
    #[must_use]
    pub fn copy_count(&self) -> u32 {
        self.copy_count
    }
}

impl CommandEncoder {
    pub(crate) fn new(context: Rc<DeviceContext>) -> Self {
        Self {
            context,
            pass_count: 0,
            copy_count: 0,
        }
    }

    /// Begins a render pass. The encoder is borrowed until the pass ends.
    pub fn begin_render_pass<'a>(&'a mut self, descriptor: &RenderPassDescriptor<'a>) -> Result<RenderPass<'a>> {
        let pass = RenderPass::begin(&self.context, descriptor)
            .inspect_err(|e| log::warn!("[{}] Render pass rejected: {e}", self.context.settings.label))?;
        self.pass_count += 1;
        Ok(pass)
    }

    /// Copies `source_rect` of `source` to (`x`, `y`) in `destination`.
    ///
    /// Blits when the device can and the destination has a framebuffer; otherwise the
    /// source is read into the destination texture with `glCopyTexSubImage2D`.
    pub fn copy_texture_to_texture(
        &mut self,
        source: &Texture,
        source_rect: Rect,
        destination: &Texture,
        x: i32,
        y: i32,
    ) -> Result<()> {
        let context = self.context.as_ref();
        source.check(context)?;
        destination.check(context)?;
        if source_rect.is_empty() || !source_rect.fits_within(source.width(), source.height()) {
            return Err(GpuError::InvalidArgument(format!(
                "source rect {source_rect:?} is outside the {}x{} texture",
                source.width(),
                source.height()
            )));
        }
        let destination_rect = Rect::new(x, y, source_rect.width, source_rect.height);
        if !destination_rect.fits_within(destination.width(), destination.height()) {
            return Err(GpuError::InvalidArgument(format!(
                "destination rect {destination_rect:?} is outside the {}x{} texture",
                destination.width(),
                destination.height()
            )));
        }
        if source.format() != destination.format() {
            return Err(GpuError::InvalidArgument(format!(
                "cannot copy {:?} into {:?}",
                source.format(),
                destination.format()
            )));
        }
        if !source.usage().contains(TextureUsage::RENDER_ATTACHMENT) {
            return Err(GpuError::UnsupportedUsage {
                resource: "texture",
                reason: format!("copy source #{} has no RENDER_ATTACHMENT usage", source.id()),
            });
        }
        let source_framebuffer = source.ensure_framebuffer(context)?;

        let caps = context.caps();
        let blit_target = destination.framebuffer_id().is_some() || destination.kind() == TextureKind::External;
        if caps.blit_framebuffer_support && blit_target && destination.sample_count() == 1 {
            let destination_framebuffer = destination.ensure_framebuffer(context)?;
            let mut state = context.state.borrow_mut();
            state.set_capability(GL_SCISSOR_TEST, false);
            state.bind_framebuffer(GL_READ_FRAMEBUFFER, source.id(), source_framebuffer);
            state.bind_framebuffer(GL_DRAW_FRAMEBUFFER, destination.id(), destination_framebuffer);
            context.gl().blit_framebuffer(
                corners(source_rect),
                corners(destination_rect),
                GL_COLOR_BUFFER_BIT,
                GL_NEAREST,
            );
        } else if matches!(destination.kind(), TextureKind::Regular | TextureKind::External)
            && destination.target() == GL_TEXTURE_2D
            && source.sample_count() == 1
        {
            let mut state = context.state.borrow_mut();
            // Without separate read and draw targets the read framebuffer is the one
            // bound to GL_FRAMEBUFFER.
            state.bind_framebuffer(GL_FRAMEBUFFER, source.id(), source_framebuffer);
            state.bind_texture(context.scratch_unit(), GL_TEXTURE_2D, destination.id(), destination.native_id());
            context.gl().copy_tex_sub_image_2d(
                GL_TEXTURE_2D,
                0,
                x,
                y,
                source_rect.x,
                source_rect.y,
                source_rect.width as GLint,
                source_rect.height as GLint,
            );
        } else {
            return Err(GpuError::UnsupportedUsage {
                resource: "texture",
                reason: format!("no copy path from #{} to #{}", source.id(), destination.id()),
            });
        }

        self.copy_count += 1;
        log::trace!(
            "[{}] Copied {source_rect:?} of #{} to #{} at ({x}, {y})",
            context.settings.label,
            source.id(),
            destination.id()
        );
        Ok(())
    }

    /// Copies `rect` of `source` into `destination` at `offset`, one row every
    /// `row_bytes` bytes. A `row_bytes` of `0` means tightly packed rows.
    ///
    /// The destination must have [`BufferUsage::READBACK`]; its contents are visible
    /// after it is mapped.
    pub fn copy_texture_to_buffer(
        &mut self,
        source: &Texture,
        rect: Rect,
        destination: &Buffer,
        offset: usize,
        row_bytes: usize,
    ) -> Result<()> {
        let context = self.context.as_ref();
        source.check(context)?;
        destination.check(context)?;
        if !destination.usage().contains(BufferUsage::READBACK) {
            return Err(GpuError::UnsupportedUsage {
                resource: "buffer",
                reason: format!("buffer #{} was not created with READBACK usage", destination.id()),
            });
        }
        if source.sample_count() != 1 {
            return Err(GpuError::InvalidArgument(format!(
                "texture #{} is multisampled; resolve it before reading it back",
                source.id()
            )));
        }
        if rect.is_empty() || !rect.fits_within(source.width(), source.height()) {
            return Err(GpuError::InvalidArgument(format!(
                "rect {rect:?} is outside the {}x{} texture",
                source.width(),
                source.height()
            )));
        }

        let bytes_per_pixel = source.format().bytes_per_pixel();
        let tight_row = rect.width as usize * bytes_per_pixel;
        let row_bytes = if row_bytes == 0 { tight_row } else { row_bytes };
        if row_bytes < tight_row {
            return Err(GpuError::InvalidArgument(format!(
                "{row_bytes} bytes per row cannot hold {} pixels",
                rect.width
            )));
        }
        let size = (rect.height as usize - 1) * row_bytes + tight_row;
        if offset.checked_add(size).is_none_or(|end| end > destination.size()) {
            return Err(GpuError::OutOfBounds {
                offset,
                size,
                capacity: destination.size(),
            });
        }
        if destination.is_mapped() {
            return Err(GpuError::AlreadyMapped);
        }
        let source_framebuffer = source.ensure_framebuffer(context)?;
        let info = *context.caps().format_info(source.format());

        match destination.strategy() {
            BufferStrategy::Native => {
                let caps = context.caps();
                let gl = context.gl();
                let mut state = context.state.borrow_mut();
                state.bind_framebuffer(GL_FRAMEBUFFER, source.id(), source_framebuffer);
                state.bind_buffer(GL_PIXEL_PACK_BUFFER, destination.id(), destination.native_id());
                state.pixel_store_i(GL_PACK_ALIGNMENT, 1);

                let read = |y: i32, height: u32, offset: usize| {
                    gl.read_pixels_to_pack_buffer(
                        rect.x,
                        y,
                        rect.width as GLint,
                        height as GLint,
                        info.external_format,
                        info.external_type,
                        offset,
                    );
                };
                if row_bytes == tight_row {
                    if caps.pack_row_length_support {
                        state.pixel_store_i(GL_PACK_ROW_LENGTH, 0);
                    }
                    read(rect.y, rect.height, offset);
                } else if caps.pack_row_length_support && row_bytes % bytes_per_pixel == 0 {
                    state.pixel_store_i(GL_PACK_ROW_LENGTH, (row_bytes / bytes_per_pixel) as GLint);
                    read(rect.y, rect.height, offset);
                } else {
                    if caps.pack_row_length_support {
                        state.pixel_store_i(GL_PACK_ROW_LENGTH, 0);
                    }
                    for row in 0..rect.height {
                        read(rect.y + row as i32, 1, offset + row as usize * row_bytes);
                    }
                }
            }
            BufferStrategy::EmulatedReadback => {
                let scratch = create_scratch_target(context, rect.width, rect.height, source.format())?;
                {
                    let mut state = context.state.borrow_mut();
                    state.bind_framebuffer(GL_FRAMEBUFFER, source.id(), source_framebuffer);
                    state.bind_texture(context.scratch_unit(), GL_TEXTURE_2D, scratch.identity, scratch.texture);
                    context.gl().copy_tex_sub_image_2d(
                        GL_TEXTURE_2D,
                        0,
                        0,
                        0,
                        rect.x,
                        rect.y,
                        rect.width as GLint,
                        rect.height as GLint,
                    );
                }
                let readback = PendingReadback {
                    scratch,
                    offset,
                    row_bytes,
                    width: rect.width,
                    height: rect.height,
                    format: info.external_format,
                    ty: info.external_type,
                    bytes_per_pixel,
                };
                destination.record_readback(context, readback).inspect_err(|_| {
                    scratch.delete(context.gl(), &mut context.state.borrow_mut());
                })?;
            }
            BufferStrategy::Shadow => {
                return Err(GpuError::UnsupportedUsage {
                    resource: "buffer",
                    reason: format!("buffer #{} cannot receive readbacks", destination.id()),
                });
            }
        }

        self.copy_count += 1;
        log::trace!(
            "[{}] Read {rect:?} of #{} into buffer #{} at {offset}",
            context.settings.label,
            source.id(),
            destination.id()
        );
        Ok(())
    }

    /// Resolves the multisample `source` into the single-sample `destination`.
    pub fn resolve_texture(&mut self, source: &Texture, destination: &Texture) -> Result<()> {
        let context = self.context.as_ref();
        source.check(context)?;
        destination.check(context)?;
        validate_resolve(source, destination)?;
        let source_framebuffer = source.ensure_framebuffer(context)?;
        let destination_framebuffer = destination.ensure_framebuffer(context)?;
        resolve_multisample(context, source, source_framebuffer, destination, destination_framebuffer)?;
        self.copy_count += 1;
        Ok(())
    }

    /// Regenerates every mip level below the base level. A no-op unless the texture is
    /// a plain 2D single-sample texture with more than one level, and on devices without
    /// mipmap support.
    pub fn generate_mipmaps_for_texture(&mut self, texture: &Texture) -> Result<()> {
        let context = self.context.as_ref();
        texture.check(context)?;
        if texture.kind() != TextureKind::Regular || texture.target() != GL_TEXTURE_2D || texture.sample_count() > 1 {
            log::debug!(
                "[{}] Skipped mipmap generation for #{}: {:?} texture has no mip chain",
                context.settings.label,
                texture.id(),
                texture.kind()
            );
            return Ok(());
        }
        if texture.mip_level_count() <= 1 {
            return Ok(());
        }
        if !context.caps().mipmap_support {
            log::debug!(
                "[{}] Skipped mipmap generation for #{}: unsupported",
                context.settings.label,
                texture.id()
            );
            return Ok(());
        }
        context
            .state
            .borrow_mut()
            .bind_texture(context.scratch_unit(), GL_TEXTURE_2D, texture.id(), texture.native_id());
        context.gl().generate_mipmap(GL_TEXTURE_2D);
        self.copy_count += 1;
        Ok(())
    }

    /// Inserts a fence after everything encoded so far and flushes so that it is
    /// eventually signaled.
    pub fn insert_fence(&mut self) -> Result<Arc<Semaphore>> {
        let context = self.context.as_ref();
        if !context.caps().semaphore_support {
            return Err(GpuError::Unsupported("sync objects"));
        }
        let Some(sync) = context.gl().fence_sync(GL_SYNC_GPU_COMMANDS_COMPLETE, 0) else {
            log::error!("[{}] glFenceSync returned no sync object", context.settings.label);
            return Err(GpuError::AllocationFailed("fence"));
        };
        context.gl().flush();
        Ok(context.attach_semaphore(sync, true))
    }

    /// Makes the GPU wait for `semaphore` before executing later commands.
    pub fn wait_for_fence(&mut self, semaphore: &Semaphore) -> Result<()> {
        let context = self.context.as_ref();
        semaphore.check(context)?;
        if !context.caps().semaphore_support {
            return Err(GpuError::Unsupported("sync objects"));
        }
        context.gl().wait_sync(semaphore.sync(), 0, GL_TIMEOUT_IGNORED);
        Ok(())
    }

    #[must_use]
    pub fn finish(self) -> CommandBuffer {
        CommandBuffer {
            pass_count: self.pass_count,
            copy_count: self.copy_count,
        }
    }
}

/// `[x0, y0, x1, y1]` of a rect.
fn corners(rect: Rect) -> [GLint; 4] {
    [
        rect.x,
        rect.y,
        rect.x + rect.width as GLint,
        rect.y + rect.height as GLint,
    ]
}
