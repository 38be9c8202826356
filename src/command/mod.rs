//! Command Recording
//!
//! The native API executes immediately, so recording is a thin layer: a
//! [`CommandEncoder`] issues copies and render passes as they are encoded, and the
//! [`CommandQueue`] only flushes or finishes the context on submission. What the layer
//! does add is ordering and deduplication:
//!
//! - Creating an encoder is the reclamation point for dropped resources (see
//!   [`Device::create_command_encoder`](crate::device::Device::create_command_encoder)).
//! - A [`RenderPass`] defers its setters and flushes them in a fixed order right before
//!   the draw that needs them: target, viewport and scissor, pipeline, uniform buffers
//!   and textures, vertex and index buffers.
//! - Every state change goes through the device's state cache.
//!
//! Rectangles are in native framebuffer coordinates (origin at the bottom-left).

mod encoder;
mod queue;
mod render_pass;

pub use encoder::{CommandBuffer, CommandEncoder};
pub use queue::CommandQueue;
pub use render_pass::{DepthStencilAttachment, LoadAction, RenderPass, RenderPassDescriptor};

use crate::device::{DeviceContext, Texture};
use crate::errors::{GpuError, Result};
use crate::gl::MsaaResolve;
use crate::gl::consts::{
    GLint, GLuint, GL_COLOR_BUFFER_BIT, GL_DRAW_FRAMEBUFFER, GL_NEAREST, GL_READ_FRAMEBUFFER, GL_SCISSOR_TEST,
};

/// Resolves the multisample `source` into the single-sample `target`, both given with
/// their framebuffers.
pub(crate) fn resolve_multisample(
    context: &DeviceContext,
    source: &Texture,
    source_framebuffer: GLuint,
    target: &Texture,
    target_framebuffer: GLuint,
) -> Result<()> {
    let gl = context.gl();
    let mut state = context.state.borrow_mut();
    // Blits and resolves are clipped by the scissor.
    state.set_capability(GL_SCISSOR_TEST, false);
    state.bind_framebuffer(GL_READ_FRAMEBUFFER, source.id(), source_framebuffer);
    state.bind_framebuffer(GL_DRAW_FRAMEBUFFER, target.id(), target_framebuffer);

    match context.caps().msaa_resolve {
        MsaaResolve::BlitFramebuffer => {
            let bounds = [0, 0, source.width() as GLint, source.height() as GLint];
            gl.blit_framebuffer(bounds, bounds, GL_COLOR_BUFFER_BIT, GL_NEAREST);
        }
        MsaaResolve::AppleResolve => gl.resolve_multisample_framebuffer(),
        MsaaResolve::None => {
            log::warn!("[{}] No multisample resolve on this device", context.settings.label);
            return Err(GpuError::Unsupported("multisample resolve"));
        }
    }
    log::debug!(
        "[{}] Resolved texture #{} into #{}",
        context.settings.label,
        source.id(),
        target.id()
    );
    Ok(())
}

/// Checks a resolve pair before any native call.
pub(crate) fn validate_resolve(source: &Texture, target: &Texture) -> Result<()> {
    if source.sample_count() <= 1 {
        return Err(GpuError::InvalidArgument(format!(
            "texture #{} is not multisampled",
            source.id()
        )));
    }
    if target.sample_count() != 1 {
        return Err(GpuError::InvalidArgument(format!(
            "resolve target #{} must be single-sampled",
            target.id()
        )));
    }
    if (source.width(), source.height()) != (target.width(), target.height()) || source.format() != target.format() {
        return Err(GpuError::InvalidArgument(format!(
            "cannot resolve {}x{} {:?} into {}x{} {:?}",
            source.width(),
            source.height(),
            source.format(),
            target.width(),
            target.height(),
            target.format()
        )));
    }
    Ok(())
}
