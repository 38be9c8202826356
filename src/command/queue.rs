use std::borrow::Cow;
use std::rc::Rc;

use super::encoder::CommandBuffer;
use crate::device::{Buffer, DeviceContext, Texture, TextureKind};
use crate::errors::{GpuError, Result};
use crate::gl::consts::{GLint, GL_PIXEL_UNPACK_BUFFER, GL_TEXTURE_2D, GL_UNPACK_ALIGNMENT, GL_UNPACK_ROW_LENGTH};
use crate::gpu::Rect;

/// Uploads data and submits encoded work.
pub struct CommandQueue {
    context: Rc<DeviceContext>,
}

impl std::fmt::Debug for CommandQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandQueue").field("device", &self.context.id).finish()
    }
}

impl CommandQueue {
    pub(crate) fn new(context: Rc<DeviceContext>) -> Self {
        Self { context }
    }

    /// Writes `data` at `offset`. The range is checked before any native call, and an
    /// empty `data` succeeds without one.
    pub fn write_buffer(&self, buffer: &Buffer, offset: usize, data: &[u8]) -> Result<()> {
        buffer
            .write(&self.context, offset, data)
            .inspect_err(|e| log::warn!("[{}] write_buffer on #{} failed: {e}", self.context.settings.label, buffer.id()))
    }

    /// Uploads `pixels` into `rect` of the base level. Rows are `row_bytes` apart in
    /// `pixels`; `0` means tightly packed.
    pub fn write_texture(&self, texture: &Texture, rect: Rect, pixels: &[u8], row_bytes: usize) -> Result<()> {
        let context = self.context.as_ref();
        texture.check(context)?;
        if !matches!(texture.kind(), TextureKind::Regular | TextureKind::External) || texture.target() != GL_TEXTURE_2D {
            return Err(GpuError::UnsupportedUsage {
                resource: "texture",
                reason: format!("texture #{} has no uploadable storage", texture.id()),
            });
        }
        if rect.is_empty() {
            return Ok(());
        }
        if !rect.fits_within(texture.width(), texture.height()) {
            return Err(GpuError::InvalidArgument(format!(
                "rect {rect:?} is outside the {}x{} texture",
                texture.width(),
                texture.height()
            )));
        }

        let bytes_per_pixel = texture.format().bytes_per_pixel();
        let tight_row = rect.width as usize * bytes_per_pixel;
        let row_bytes = if row_bytes == 0 { tight_row } else { row_bytes };
        if row_bytes < tight_row {
            return Err(GpuError::InvalidArgument(format!(
                "{row_bytes} bytes per row cannot hold {} pixels",
                rect.width
            )));
        }
        let needed = (rect.height as usize - 1) * row_bytes + tight_row;
        if pixels.len() < needed {
            return Err(GpuError::InvalidArgument(format!(
                "{} bytes of pixels where {needed} are needed",
                pixels.len()
            )));
        }

        let caps = context.caps();
        let info = caps.format_info(texture.format());
        let mut state = context.state.borrow_mut();
        if caps.transfer_buffer_support {
            state.unbind_buffer(GL_PIXEL_UNPACK_BUFFER);
        }
        state.bind_texture(context.scratch_unit(), GL_TEXTURE_2D, texture.id(), texture.native_id());
        state.pixel_store_i(GL_UNPACK_ALIGNMENT, 1);

        let data: Cow<'_, [u8]> = if row_bytes == tight_row {
            if caps.unpack_row_length_support {
                state.pixel_store_i(GL_UNPACK_ROW_LENGTH, 0);
            }
            Cow::Borrowed(&pixels[..needed])
        } else if caps.unpack_row_length_support && row_bytes % bytes_per_pixel == 0 {
            state.pixel_store_i(GL_UNPACK_ROW_LENGTH, (row_bytes / bytes_per_pixel) as GLint);
            Cow::Borrowed(&pixels[..needed])
        } else {
            if caps.unpack_row_length_support {
                state.pixel_store_i(GL_UNPACK_ROW_LENGTH, 0);
            }
            let mut packed = Vec::with_capacity(tight_row * rect.height as usize);
            for row in pixels.chunks(row_bytes).take(rect.height as usize) {
                packed.extend_from_slice(&row[..tight_row]);
            }
            Cow::Owned(packed)
        };

        context.gl().tex_sub_image_2d(
            GL_TEXTURE_2D,
            0,
            rect.x,
            rect.y,
            rect.width as GLint,
            rect.height as GLint,
            info.external_format,
            info.external_type,
            &data,
        );
        log::trace!("[{}] Uploaded {rect:?} into #{}", context.settings.label, texture.id());
        Ok(())
    }

    /// Hands `buffer` to the driver. Work is already issued as it is encoded; this
    /// flushes so it starts executing.
    pub fn submit(&self, buffer: CommandBuffer) {
        self.context.gl().flush();
        log::debug!(
            "[{}] Submitted {} passes and {} copies",
            self.context.settings.label,
            buffer.pass_count(),
            buffer.copy_count()
        );
    }

    /// Blocks until every submitted command has completed.
    pub fn wait_until_completed(&self) {
        self.context.gl().finish();
    }
}
