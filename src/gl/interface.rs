//! The flat native function surface.
//!
//! [`GlInterface`] lists every native entry point the GPU layer issues. It is
//! implemented by [`GlFunctions`](super::GlFunctions) (function pointers resolved from
//! the platform loader) and by [`HeadlessGl`](super::HeadlessGl) (in-memory emulation
//! used by tests and headless tooling).
//!
//! # Threading
//!
//! Implementations are `Send + Sync` so a resolved table can be cached process-wide,
//! but every call must be issued on the thread that owns the current context. The
//! [`Device`](crate::device::Device) enforces this: it is neither `Send` nor `Sync`,
//! and it is the only object in the crate that calls into an interface.
//!
//! # Optional entry points
//!
//! Calling an entry point that was not resolved is a silent no-op that returns a
//! neutral value. Call sites never rely on that: they branch on the matching
//! [`GlCaps`](super::GlCaps) flag, which is computed independently of resolution.

use std::ffi::c_void;
use std::num::NonZeroUsize;

use super::consts::{
    GLbitfield, GLenum, GLint, GLuint, GLuint64, GL_CONTEXT_LOST, GL_NO_ERROR, GL_OUT_OF_MEMORY,
};

/// Opaque native sync object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlSync(NonZeroUsize);

impl GlSync {
    /// Wraps a native sync pointer. Returns `None` for null.
    #[inline]
    #[must_use]
    pub fn from_raw(ptr: *const c_void) -> Option<Self> {
        NonZeroUsize::new(ptr as usize).map(Self)
    }

    #[inline]
    #[must_use]
    pub fn as_raw(self) -> *const c_void {
        self.0.get() as *const c_void
    }
}

/// Native graphics API surface.
///
/// Method names mirror the native entry points with the `gl` prefix removed; object
/// generation calls create exactly one object and return its name (`0` on failure).
pub trait GlInterface: Send + Sync {
    // ── Queries ──────────────────────────────────────────────────────────────

    fn get_error(&self) -> GLenum;
    fn get_string(&self, name: GLenum) -> Option<String>;
    fn get_string_i(&self, name: GLenum, index: u32) -> Option<String>;
    fn get_integer(&self, pname: GLenum) -> GLint;
    /// Whether the named entry point (canonical, unsuffixed name such as
    /// `"glGenVertexArrays"`) was resolved under any of its aliases.
    fn is_entry_point_resolved(&self, name: &str) -> bool;
    fn flush(&self);
    fn finish(&self);

    // ── Buffers ──────────────────────────────────────────────────────────────

    fn create_buffer(&self) -> GLuint;
    fn delete_buffer(&self, buffer: GLuint);
    fn bind_buffer(&self, target: GLenum, buffer: GLuint);
    fn bind_buffer_range(&self, target: GLenum, index: u32, buffer: GLuint, offset: usize, size: usize);
    fn buffer_data(&self, target: GLenum, size: usize, data: Option<&[u8]>, usage: GLenum);
    fn buffer_sub_data(&self, target: GLenum, offset: usize, data: &[u8]);
    /// Returns null when the range cannot be mapped.
    fn map_buffer_range(&self, target: GLenum, offset: usize, length: usize, access: GLbitfield) -> *mut u8;
    fn unmap_buffer(&self, target: GLenum) -> bool;

    // ── Textures ─────────────────────────────────────────────────────────────

    fn create_texture(&self) -> GLuint;
    fn delete_texture(&self, texture: GLuint);
    fn active_texture(&self, unit: GLenum);
    fn bind_texture(&self, target: GLenum, texture: GLuint);
    fn tex_parameter_i(&self, target: GLenum, pname: GLenum, param: GLint);
    fn tex_image_2d(
        &self,
        target: GLenum,
        level: GLint,
        internal_format: GLint,
        width: GLint,
        height: GLint,
        format: GLenum,
        ty: GLenum,
        pixels: Option<&[u8]>,
    );
    fn tex_sub_image_2d(
        &self,
        target: GLenum,
        level: GLint,
        x: GLint,
        y: GLint,
        width: GLint,
        height: GLint,
        format: GLenum,
        ty: GLenum,
        pixels: &[u8],
    );
    fn copy_tex_sub_image_2d(
        &self,
        target: GLenum,
        level: GLint,
        x_offset: GLint,
        y_offset: GLint,
        x: GLint,
        y: GLint,
        width: GLint,
        height: GLint,
    );
    fn generate_mipmap(&self, target: GLenum);
    fn pixel_store_i(&self, pname: GLenum, param: GLint);
    fn texture_barrier(&self);

    // ── Samplers ─────────────────────────────────────────────────────────────

    fn create_sampler(&self) -> GLuint;
    fn delete_sampler(&self, sampler: GLuint);
    fn bind_sampler(&self, unit: u32, sampler: GLuint);
    fn sampler_parameter_i(&self, sampler: GLuint, pname: GLenum, param: GLint);

    // ── Framebuffers & Renderbuffers ─────────────────────────────────────────

    fn create_framebuffer(&self) -> GLuint;
    fn delete_framebuffer(&self, framebuffer: GLuint);
    fn bind_framebuffer(&self, target: GLenum, framebuffer: GLuint);
    fn framebuffer_texture_2d(&self, target: GLenum, attachment: GLenum, tex_target: GLenum, texture: GLuint, level: GLint);
    fn framebuffer_renderbuffer(&self, target: GLenum, attachment: GLenum, rb_target: GLenum, renderbuffer: GLuint);
    fn check_framebuffer_status(&self, target: GLenum) -> GLenum;
    /// `src` and `dst` are `[x0, y0, x1, y1]`.
    fn blit_framebuffer(&self, src: [GLint; 4], dst: [GLint; 4], mask: GLbitfield, filter: GLenum);
    /// Apple resolve extension: resolves the bound read framebuffer into the bound draw framebuffer.
    fn resolve_multisample_framebuffer(&self);
    fn read_pixels(&self, x: GLint, y: GLint, width: GLint, height: GLint, format: GLenum, ty: GLenum, pixels: &mut [u8]);
    /// Reads into the bound pixel-pack buffer at `offset`.
    fn read_pixels_to_pack_buffer(
        &self,
        x: GLint,
        y: GLint,
        width: GLint,
        height: GLint,
        format: GLenum,
        ty: GLenum,
        offset: usize,
    );
    fn create_renderbuffer(&self) -> GLuint;
    fn delete_renderbuffer(&self, renderbuffer: GLuint);
    fn bind_renderbuffer(&self, target: GLenum, renderbuffer: GLuint);
    fn renderbuffer_storage(&self, target: GLenum, internal_format: GLenum, width: GLint, height: GLint);
    fn renderbuffer_storage_multisample(
        &self,
        target: GLenum,
        samples: GLint,
        internal_format: GLenum,
        width: GLint,
        height: GLint,
    );

    // ── Shaders & Programs ───────────────────────────────────────────────────

    fn create_shader(&self, ty: GLenum) -> GLuint;
    fn shader_source(&self, shader: GLuint, source: &str);
    fn compile_shader(&self, shader: GLuint);
    fn get_shader_parameter(&self, shader: GLuint, pname: GLenum) -> GLint;
    fn get_shader_info_log(&self, shader: GLuint) -> String;
    fn delete_shader(&self, shader: GLuint);
    fn create_program(&self) -> GLuint;
    fn attach_shader(&self, program: GLuint, shader: GLuint);
    fn detach_shader(&self, program: GLuint, shader: GLuint);
    fn bind_attrib_location(&self, program: GLuint, index: u32, name: &str);
    fn link_program(&self, program: GLuint);
    fn get_program_parameter(&self, program: GLuint, pname: GLenum) -> GLint;
    fn get_program_info_log(&self, program: GLuint) -> String;
    fn delete_program(&self, program: GLuint);
    fn use_program(&self, program: GLuint);
    /// Returns `-1` when the uniform is not active.
    fn get_uniform_location(&self, program: GLuint, name: &str) -> GLint;
    /// Returns `GL_INVALID_INDEX` when the block is not active.
    fn get_uniform_block_index(&self, program: GLuint, name: &str) -> GLuint;
    fn uniform_block_binding(&self, program: GLuint, index: GLuint, binding: GLuint);
    fn uniform_1i(&self, location: GLint, value: GLint);
    fn uniform_1fv(&self, location: GLint, values: &[f32]);
    fn uniform_2fv(&self, location: GLint, values: &[f32]);
    fn uniform_3fv(&self, location: GLint, values: &[f32]);
    fn uniform_4fv(&self, location: GLint, values: &[f32]);
    fn uniform_1iv(&self, location: GLint, values: &[i32]);
    fn uniform_2iv(&self, location: GLint, values: &[i32]);
    fn uniform_3iv(&self, location: GLint, values: &[i32]);
    fn uniform_4iv(&self, location: GLint, values: &[i32]);
    fn uniform_matrix_2fv(&self, location: GLint, values: &[f32]);
    fn uniform_matrix_3fv(&self, location: GLint, values: &[f32]);
    fn uniform_matrix_4fv(&self, location: GLint, values: &[f32]);

    // ── Vertex Input ─────────────────────────────────────────────────────────

    fn create_vertex_array(&self) -> GLuint;
    fn delete_vertex_array(&self, vertex_array: GLuint);
    fn bind_vertex_array(&self, vertex_array: GLuint);
    fn enable_vertex_attrib_array(&self, index: u32);
    fn disable_vertex_attrib_array(&self, index: u32);
    fn vertex_attrib_pointer(&self, index: u32, size: GLint, ty: GLenum, normalized: bool, stride: GLint, offset: usize);

    // ── Fixed-Function State ─────────────────────────────────────────────────

    fn enable(&self, cap: GLenum);
    fn disable(&self, cap: GLenum);
    fn blend_func_separate(&self, src_rgb: GLenum, dst_rgb: GLenum, src_alpha: GLenum, dst_alpha: GLenum);
    fn blend_equation_separate(&self, mode_rgb: GLenum, mode_alpha: GLenum);
    fn color_mask(&self, red: bool, green: bool, blue: bool, alpha: bool);
    fn depth_mask(&self, flag: bool);
    fn depth_func(&self, func: GLenum);
    fn stencil_func_separate(&self, face: GLenum, func: GLenum, reference: GLint, mask: GLuint);
    fn stencil_op_separate(&self, face: GLenum, stencil_fail: GLenum, depth_fail: GLenum, depth_pass: GLenum);
    fn stencil_mask_separate(&self, face: GLenum, mask: GLuint);
    fn viewport(&self, x: GLint, y: GLint, width: GLint, height: GLint);
    fn scissor(&self, x: GLint, y: GLint, width: GLint, height: GLint);
    fn clear_color(&self, red: f32, green: f32, blue: f32, alpha: f32);
    fn clear_depth(&self, depth: f32);
    fn clear_stencil(&self, stencil: GLint);
    fn clear(&self, mask: GLbitfield);

    // ── Draws ────────────────────────────────────────────────────────────────

    fn draw_arrays(&self, mode: GLenum, first: GLint, count: GLint);
    /// `offset` is a byte offset into the bound element buffer.
    fn draw_elements(&self, mode: GLenum, count: GLint, ty: GLenum, offset: usize);

    // ── Sync ─────────────────────────────────────────────────────────────────

    fn fence_sync(&self, condition: GLenum, flags: GLbitfield) -> Option<GlSync>;
    fn client_wait_sync(&self, sync: GlSync, flags: GLbitfield, timeout: GLuint64) -> GLenum;
    fn wait_sync(&self, sync: GlSync, flags: GLbitfield, timeout: GLuint64);
    fn delete_sync(&self, sync: GlSync);
}

/// Upper bound on queued errors drained by [`clear_errors`]; a lost context may
/// report errors forever.
const MAX_QUEUED_ERRORS: usize = 32;

/// Drains the native error queue so the next [`get_error`](GlInterface::get_error)
/// only reports errors raised after this point.
pub fn clear_errors(gl: &dyn GlInterface) {
    for _ in 0..MAX_QUEUED_ERRORS {
        let error = gl.get_error();
        if error == GL_NO_ERROR || error == GL_CONTEXT_LOST {
            return;
        }
    }
}

/// Polls the error queue after an allocation. Returns `true` on out-of-memory.
///
/// Callers must have called [`clear_errors`] before the allocation.
#[must_use]
pub fn allocation_failed(gl: &dyn GlInterface) -> bool {
    let mut failed = false;
    for _ in 0..MAX_QUEUED_ERRORS {
        match gl.get_error() {
            GL_NO_ERROR | GL_CONTEXT_LOST => break,
            GL_OUT_OF_MEMORY => failed = true,
            other => log::debug!("GL error 0x{other:04X} after allocation"),
        }
    }
    failed
}
