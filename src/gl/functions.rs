//! Function table resolved from a platform loader.
//!
//! Required entry points are plain function pointers: a missing one fails the load
//! with [`GpuError::MissingEntryPoint`]. Optional entry points are `Option`al and tried
//! under each alias in order (core name first, then vendor suffixes), so an extension
//! resolved under `glGenVertexArraysOES` answers to the canonical `glGenVertexArrays`.

use std::ffi::{CStr, CString, c_void};

use super::consts::{
    GLbitfield, GLboolean, GLchar, GLenum, GLfloat, GLint, GLintptr, GLsizei, GLsizeiptr, GLuint, GLuint64,
    GL_FALSE, GL_INFO_LOG_LENGTH, GL_INVALID_INDEX, GL_TRUE, GL_VERSION,
};
use super::interface::{GlInterface, GlSync};
use crate::errors::{GpuError, Result};

/// Platform proc-address lookup, e.g. `eglGetProcAddress` or `wglGetProcAddress`.
pub type Loader<'a> = dyn FnMut(&str) -> *const c_void + 'a;

macro_rules! gl_function_table {
    (
        required {
            $( $req:ident = $req_sym:literal : fn($($req_arg:ty),*) $(-> $req_ret:ty)?; )*
        }
        optional {
            $( $opt:ident = [$($opt_sym:literal),+] : fn($($opt_arg:ty),*) $(-> $opt_ret:ty)?; )*
        }
    ) => {
        #[allow(non_snake_case)]
        struct Pointers {
            $( $req: unsafe extern "system" fn($($req_arg),*) $(-> $req_ret)?, )*
            $( $opt: Option<unsafe extern "system" fn($($opt_arg),*) $(-> $opt_ret)?>, )*
        }

        impl Pointers {
            /// # Safety
            ///
            /// `loader` must return either null or a pointer to the entry point with
            /// the requested name and the native signature listed in the table.
            unsafe fn load(loader: &mut Loader<'_>) -> Result<Self> {
                Ok(Self {
                    $( $req: {
                        let ptr = loader($req_sym);
                        if ptr.is_null() {
                            log::error!("Required entry point {} was not resolved", $req_sym);
                            return Err(GpuError::MissingEntryPoint($req_sym));
                        }
                        // SAFETY: non-null and typed per the loader contract.
                        unsafe {
                            std::mem::transmute::<*const c_void, unsafe extern "system" fn($($req_arg),*) $(-> $req_ret)?>(ptr)
                        }
                    }, )*
                    $( $opt: {
                        let mut resolved = None;
                        for symbol in [$($opt_sym),+] {
                            let ptr = loader(symbol);
                            if !ptr.is_null() {
                                // SAFETY: non-null and typed per the loader contract.
                                resolved = Some(unsafe {
                                    std::mem::transmute::<*const c_void, unsafe extern "system" fn($($opt_arg),*) $(-> $opt_ret)?>(ptr)
                                });
                                break;
                            }
                        }
                        resolved
                    }, )*
                })
            }

            fn is_resolved(&self, name: &str) -> bool {
                $( if name == $req_sym { return true; } )*
                $( if [$($opt_sym),+].contains(&name) { return self.$opt.is_some(); } )*
                false
            }
        }
    };
}

gl_function_table! {
    required {
        glGetError = "glGetError": fn() -> GLenum;
        glGetString = "glGetString": fn(GLenum) -> *const u8;
        glGetIntegerv = "glGetIntegerv": fn(GLenum, *mut GLint);
        glFlush = "glFlush": fn();
        glFinish = "glFinish": fn();

        glGenBuffers = "glGenBuffers": fn(GLsizei, *mut GLuint);
        glDeleteBuffers = "glDeleteBuffers": fn(GLsizei, *const GLuint);
        glBindBuffer = "glBindBuffer": fn(GLenum, GLuint);
        glBufferData = "glBufferData": fn(GLenum, GLsizeiptr, *const c_void, GLenum);
        glBufferSubData = "glBufferSubData": fn(GLenum, GLintptr, GLsizeiptr, *const c_void);

        glGenTextures = "glGenTextures": fn(GLsizei, *mut GLuint);
        glDeleteTextures = "glDeleteTextures": fn(GLsizei, *const GLuint);
        glActiveTexture = "glActiveTexture": fn(GLenum);
        glBindTexture = "glBindTexture": fn(GLenum, GLuint);
        glTexParameteri = "glTexParameteri": fn(GLenum, GLenum, GLint);
        glTexImage2D = "glTexImage2D": fn(GLenum, GLint, GLint, GLsizei, GLsizei, GLint, GLenum, GLenum, *const c_void);
        glTexSubImage2D = "glTexSubImage2D": fn(GLenum, GLint, GLint, GLint, GLsizei, GLsizei, GLenum, GLenum, *const c_void);
        glCopyTexSubImage2D = "glCopyTexSubImage2D": fn(GLenum, GLint, GLint, GLint, GLint, GLint, GLsizei, GLsizei);
        glPixelStorei = "glPixelStorei": fn(GLenum, GLint);

        glGenFramebuffers = "glGenFramebuffers": fn(GLsizei, *mut GLuint);
        glDeleteFramebuffers = "glDeleteFramebuffers": fn(GLsizei, *const GLuint);
        glBindFramebuffer = "glBindFramebuffer": fn(GLenum, GLuint);
        glFramebufferTexture2D = "glFramebufferTexture2D": fn(GLenum, GLenum, GLenum, GLuint, GLint);
        glFramebufferRenderbuffer = "glFramebufferRenderbuffer": fn(GLenum, GLenum, GLenum, GLuint);
        glCheckFramebufferStatus = "glCheckFramebufferStatus": fn(GLenum) -> GLenum;
        glReadPixels = "glReadPixels": fn(GLint, GLint, GLsizei, GLsizei, GLenum, GLenum, *mut c_void);
        glGenRenderbuffers = "glGenRenderbuffers": fn(GLsizei, *mut GLuint);
        glDeleteRenderbuffers = "glDeleteRenderbuffers": fn(GLsizei, *const GLuint);
        glBindRenderbuffer = "glBindRenderbuffer": fn(GLenum, GLuint);
        glRenderbufferStorage = "glRenderbufferStorage": fn(GLenum, GLenum, GLsizei, GLsizei);

        glCreateShader = "glCreateShader": fn(GLenum) -> GLuint;
        glShaderSource = "glShaderSource": fn(GLuint, GLsizei, *const *const GLchar, *const GLint);
        glCompileShader = "glCompileShader": fn(GLuint);
        glGetShaderiv = "glGetShaderiv": fn(GLuint, GLenum, *mut GLint);
        glGetShaderInfoLog = "glGetShaderInfoLog": fn(GLuint, GLsizei, *mut GLsizei, *mut GLchar);
        glDeleteShader = "glDeleteShader": fn(GLuint);
        glCreateProgram = "glCreateProgram": fn() -> GLuint;
        glAttachShader = "glAttachShader": fn(GLuint, GLuint);
        glDetachShader = "glDetachShader": fn(GLuint, GLuint);
        glBindAttribLocation = "glBindAttribLocation": fn(GLuint, GLuint, *const GLchar);
        glLinkProgram = "glLinkProgram": fn(GLuint);
        glGetProgramiv = "glGetProgramiv": fn(GLuint, GLenum, *mut GLint);
        glGetProgramInfoLog = "glGetProgramInfoLog": fn(GLuint, GLsizei, *mut GLsizei, *mut GLchar);
        glDeleteProgram = "glDeleteProgram": fn(GLuint);
        glUseProgram = "glUseProgram": fn(GLuint);
        glGetUniformLocation = "glGetUniformLocation": fn(GLuint, *const GLchar) -> GLint;
        glUniform1i = "glUniform1i": fn(GLint, GLint);
        glUniform1fv = "glUniform1fv": fn(GLint, GLsizei, *const GLfloat);
        glUniform2fv = "glUniform2fv": fn(GLint, GLsizei, *const GLfloat);
        glUniform3fv = "glUniform3fv": fn(GLint, GLsizei, *const GLfloat);
        glUniform4fv = "glUniform4fv": fn(GLint, GLsizei, *const GLfloat);
        glUniform1iv = "glUniform1iv": fn(GLint, GLsizei, *const GLint);
        glUniform2iv = "glUniform2iv": fn(GLint, GLsizei, *const GLint);
        glUniform3iv = "glUniform3iv": fn(GLint, GLsizei, *const GLint);
        glUniform4iv = "glUniform4iv": fn(GLint, GLsizei, *const GLint);
        glUniformMatrix2fv = "glUniformMatrix2fv": fn(GLint, GLsizei, GLboolean, *const GLfloat);
        glUniformMatrix3fv = "glUniformMatrix3fv": fn(GLint, GLsizei, GLboolean, *const GLfloat);
        glUniformMatrix4fv = "glUniformMatrix4fv": fn(GLint, GLsizei, GLboolean, *const GLfloat);

        glEnableVertexAttribArray = "glEnableVertexAttribArray": fn(GLuint);
        glDisableVertexAttribArray = "glDisableVertexAttribArray": fn(GLuint);
        glVertexAttribPointer = "glVertexAttribPointer": fn(GLuint, GLint, GLenum, GLboolean, GLsizei, *const c_void);

        glEnable = "glEnable": fn(GLenum);
        glDisable = "glDisable": fn(GLenum);
        glBlendFuncSeparate = "glBlendFuncSeparate": fn(GLenum, GLenum, GLenum, GLenum);
        glBlendEquationSeparate = "glBlendEquationSeparate": fn(GLenum, GLenum);
        glColorMask = "glColorMask": fn(GLboolean, GLboolean, GLboolean, GLboolean);
        glDepthMask = "glDepthMask": fn(GLboolean);
        glDepthFunc = "glDepthFunc": fn(GLenum);
        glStencilFuncSeparate = "glStencilFuncSeparate": fn(GLenum, GLenum, GLint, GLuint);
        glStencilOpSeparate = "glStencilOpSeparate": fn(GLenum, GLenum, GLenum, GLenum);
        glStencilMaskSeparate = "glStencilMaskSeparate": fn(GLenum, GLuint);
        glViewport = "glViewport": fn(GLint, GLint, GLsizei, GLsizei);
        glScissor = "glScissor": fn(GLint, GLint, GLsizei, GLsizei);
        glClearColor = "glClearColor": fn(GLfloat, GLfloat, GLfloat, GLfloat);
        glClearStencil = "glClearStencil": fn(GLint);
        glClear = "glClear": fn(GLbitfield);

        glDrawArrays = "glDrawArrays": fn(GLenum, GLint, GLsizei);
        glDrawElements = "glDrawElements": fn(GLenum, GLsizei, GLenum, *const c_void);
    }
    optional {
        glGetStringi = ["glGetStringi"]: fn(GLenum, GLuint) -> *const u8;

        glBindBufferRange = ["glBindBufferRange"]: fn(GLenum, GLuint, GLuint, GLintptr, GLsizeiptr);
        glMapBufferRange = ["glMapBufferRange", "glMapBufferRangeEXT"]: fn(GLenum, GLintptr, GLsizeiptr, GLbitfield) -> *mut c_void;
        glUnmapBuffer = ["glUnmapBuffer", "glUnmapBufferOES"]: fn(GLenum) -> GLboolean;

        glGenerateMipmap = ["glGenerateMipmap", "glGenerateMipmapEXT"]: fn(GLenum);
        glTextureBarrier = ["glTextureBarrier", "glTextureBarrierNV"]: fn();

        glGenSamplers = ["glGenSamplers"]: fn(GLsizei, *mut GLuint);
        glDeleteSamplers = ["glDeleteSamplers"]: fn(GLsizei, *const GLuint);
        glBindSampler = ["glBindSampler"]: fn(GLuint, GLuint);
        glSamplerParameteri = ["glSamplerParameteri"]: fn(GLuint, GLenum, GLint);

        glBlitFramebuffer = ["glBlitFramebuffer", "glBlitFramebufferANGLE", "glBlitFramebufferNV"]:
            fn(GLint, GLint, GLint, GLint, GLint, GLint, GLint, GLint, GLbitfield, GLenum);
        glRenderbufferStorageMultisample = [
            "glRenderbufferStorageMultisample",
            "glRenderbufferStorageMultisampleEXT",
            "glRenderbufferStorageMultisampleAPPLE",
            "glRenderbufferStorageMultisampleANGLE"
        ]: fn(GLenum, GLsizei, GLenum, GLsizei, GLsizei);
        glResolveMultisampleFramebufferAPPLE = ["glResolveMultisampleFramebufferAPPLE"]: fn();

        glGetUniformBlockIndex = ["glGetUniformBlockIndex"]: fn(GLuint, *const GLchar) -> GLuint;
        glUniformBlockBinding = ["glUniformBlockBinding"]: fn(GLuint, GLuint, GLuint);

        glGenVertexArrays = ["glGenVertexArrays", "glGenVertexArraysOES", "glGenVertexArraysAPPLE"]: fn(GLsizei, *mut GLuint);
        glDeleteVertexArrays = ["glDeleteVertexArrays", "glDeleteVertexArraysOES", "glDeleteVertexArraysAPPLE"]:
            fn(GLsizei, *const GLuint);
        glBindVertexArray = ["glBindVertexArray", "glBindVertexArrayOES", "glBindVertexArrayAPPLE"]: fn(GLuint);

        glClearDepthf = ["glClearDepthf", "glClearDepthfOES"]: fn(GLfloat);

        glFenceSync = ["glFenceSync", "glFenceSyncAPPLE"]: fn(GLenum, GLbitfield) -> *const c_void;
        glClientWaitSync = ["glClientWaitSync", "glClientWaitSyncAPPLE"]: fn(*const c_void, GLbitfield, GLuint64) -> GLenum;
        glWaitSync = ["glWaitSync", "glWaitSyncAPPLE"]: fn(*const c_void, GLbitfield, GLuint64);
        glDeleteSync = ["glDeleteSync", "glDeleteSyncAPPLE"]: fn(*const c_void);
    }
}

/// Native entry points resolved for one API version.
pub struct GlFunctions {
    ptrs: Pointers,
}

impl std::fmt::Debug for GlFunctions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlFunctions").finish_non_exhaustive()
    }
}

impl GlFunctions {
    /// Resolves every entry point through `loader`.
    ///
    /// # Safety
    ///
    /// A context must be current on the calling thread, `loader` must return null or
    /// a valid pointer for the requested symbol, and every later call through the
    /// table must be made on a thread where a compatible context is current.
    pub unsafe fn load(loader: &mut Loader<'_>) -> Result<Self> {
        // SAFETY: forwarded from the caller.
        let ptrs = unsafe { Pointers::load(loader)? };
        Ok(Self { ptrs })
    }
}

/// Resolves only `glGetString` and returns the `GL_VERSION` string.
///
/// Used to key the interface cache before a full table is loaded.
///
/// # Safety
///
/// Same contract as [`GlFunctions::load`].
pub unsafe fn query_version_string(loader: &mut Loader<'_>) -> Option<String> {
    let ptr = loader("glGetString");
    if ptr.is_null() {
        return None;
    }
    // SAFETY: non-null and typed per the loader contract.
    let get_string = unsafe { std::mem::transmute::<*const c_void, unsafe extern "system" fn(GLenum) -> *const u8>(ptr) };
    // SAFETY: a context is current per the caller contract.
    unsafe { c_string(get_string(GL_VERSION)) }
}

/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string.
unsafe fn c_string(ptr: *const u8) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: forwarded from the caller.
    let text = unsafe { CStr::from_ptr(ptr.cast()) };
    Some(text.to_string_lossy().into_owned())
}

fn gl_bool(value: bool) -> GLboolean {
    if value { GL_TRUE } else { GL_FALSE }
}

fn c_name(name: &str) -> Option<CString> {
    let name = CString::new(name);
    if name.is_err() {
        log::warn!("Identifier contains an interior NUL byte");
    }
    name.ok()
}

// Every `unsafe` block below relies on the contract of `GlFunctions::load`: a
// compatible context is current on the calling thread. Slices passed as pointers
// outlive the call.
impl GlInterface for GlFunctions {
    fn get_error(&self) -> GLenum {
        unsafe { (self.ptrs.glGetError)() }
    }

    fn get_string(&self, name: GLenum) -> Option<String> {
        unsafe { c_string((self.ptrs.glGetString)(name)) }
    }

    fn get_string_i(&self, name: GLenum, index: u32) -> Option<String> {
        let f = self.ptrs.glGetStringi?;
        unsafe { c_string(f(name, index)) }
    }

    fn get_integer(&self, pname: GLenum) -> GLint {
        let mut value = 0;
        unsafe { (self.ptrs.glGetIntegerv)(pname, &mut value) };
        value
    }

    fn is_entry_point_resolved(&self, name: &str) -> bool {
        self.ptrs.is_resolved(name)
    }

    fn flush(&self) {
        unsafe { (self.ptrs.glFlush)() }
    }

    fn finish(&self) {
        unsafe { (self.ptrs.glFinish)() }
    }

    // ── Buffers ──────────────────────────────────────────────────────────────

    fn create_buffer(&self) -> GLuint {
        let mut id = 0;
        unsafe { (self.ptrs.glGenBuffers)(1, &mut id) };
        id
    }

    fn delete_buffer(&self, buffer: GLuint) {
        unsafe { (self.ptrs.glDeleteBuffers)(1, &buffer) }
    }

    fn bind_buffer(&self, target: GLenum, buffer: GLuint) {
        unsafe { (self.ptrs.glBindBuffer)(target, buffer) }
    }

    fn bind_buffer_range(&self, target: GLenum, index: u32, buffer: GLuint, offset: usize, size: usize) {
        if let Some(f) = self.ptrs.glBindBufferRange {
            unsafe { f(target, index, buffer, offset as GLintptr, size as GLsizeiptr) }
        }
    }

    fn buffer_data(&self, target: GLenum, size: usize, data: Option<&[u8]>, usage: GLenum) {
        let ptr = data.map_or(std::ptr::null(), |data| data.as_ptr().cast());
        unsafe { (self.ptrs.glBufferData)(target, size as GLsizeiptr, ptr, usage) }
    }

    fn buffer_sub_data(&self, target: GLenum, offset: usize, data: &[u8]) {
        unsafe {
            (self.ptrs.glBufferSubData)(target, offset as GLintptr, data.len() as GLsizeiptr, data.as_ptr().cast());
        }
    }

    fn map_buffer_range(&self, target: GLenum, offset: usize, length: usize, access: GLbitfield) -> *mut u8 {
        match self.ptrs.glMapBufferRange {
            Some(f) => unsafe { f(target, offset as GLintptr, length as GLsizeiptr, access).cast() },
            None => std::ptr::null_mut(),
        }
    }

    fn unmap_buffer(&self, target: GLenum) -> bool {
        match self.ptrs.glUnmapBuffer {
            Some(f) => unsafe { f(target) == GL_TRUE },
            None => false,
        }
    }

    // ── Textures ─────────────────────────────────────────────────────────────

    fn create_texture(&self) -> GLuint {
        let mut id = 0;
        unsafe { (self.ptrs.glGenTextures)(1, &mut id) };
        id
    }

    fn delete_texture(&self, texture: GLuint) {
        unsafe { (self.ptrs.glDeleteTextures)(1, &texture) }
    }

    fn active_texture(&self, unit: GLenum) {
        unsafe { (self.ptrs.glActiveTexture)(unit) }
    }

    fn bind_texture(&self, target: GLenum, texture: GLuint) {
        unsafe { (self.ptrs.glBindTexture)(target, texture) }
    }

    fn tex_parameter_i(&self, target: GLenum, pname: GLenum, param: GLint) {
        unsafe { (self.ptrs.glTexParameteri)(target, pname, param) }
    }

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
    ) {
        let ptr = pixels.map_or(std::ptr::null(), |pixels| pixels.as_ptr().cast());
        unsafe { (self.ptrs.glTexImage2D)(target, level, internal_format, width, height, 0, format, ty, ptr) }
    }

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
    ) {
        unsafe { (self.ptrs.glTexSubImage2D)(target, level, x, y, width, height, format, ty, pixels.as_ptr().cast()) }
    }

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
    ) {
        unsafe { (self.ptrs.glCopyTexSubImage2D)(target, level, x_offset, y_offset, x, y, width, height) }
    }

    fn generate_mipmap(&self, target: GLenum) {
        if let Some(f) = self.ptrs.glGenerateMipmap {
            unsafe { f(target) }
        }
    }

    fn pixel_store_i(&self, pname: GLenum, param: GLint) {
        unsafe { (self.ptrs.glPixelStorei)(pname, param) }
    }

    fn texture_barrier(&self) {
        if let Some(f) = self.ptrs.glTextureBarrier {
            unsafe { f() }
        }
    }

    // ── Samplers ─────────────────────────────────────────────────────────────

    fn create_sampler(&self) -> GLuint {
        let mut id = 0;
        if let Some(f) = self.ptrs.glGenSamplers {
            unsafe { f(1, &mut id) };
        }
        id
    }

    fn delete_sampler(&self, sampler: GLuint) {
        if let Some(f) = self.ptrs.glDeleteSamplers {
            unsafe { f(1, &sampler) }
        }
    }

    fn bind_sampler(&self, unit: u32, sampler: GLuint) {
        if let Some(f) = self.ptrs.glBindSampler {
            unsafe { f(unit, sampler) }
        }
    }

    fn sampler_parameter_i(&self, sampler: GLuint, pname: GLenum, param: GLint) {
        if let Some(f) = self.ptrs.glSamplerParameteri {
            unsafe { f(sampler, pname, param) }
        }
    }

    // ── Framebuffers & Renderbuffers ─────────────────────────────────────────

    fn create_framebuffer(&self) -> GLuint {
        let mut id = 0;
        unsafe { (self.ptrs.glGenFramebuffers)(1, &mut id) };
        id
    }

    fn delete_framebuffer(&self, framebuffer: GLuint) {
        unsafe { (self.ptrs.glDeleteFramebuffers)(1, &framebuffer) }
    }

    fn bind_framebuffer(&self, target: GLenum, framebuffer: GLuint) {
        unsafe { (self.ptrs.glBindFramebuffer)(target, framebuffer) }
    }

    fn framebuffer_texture_2d(&self, target: GLenum, attachment: GLenum, tex_target: GLenum, texture: GLuint, level: GLint) {
        unsafe { (self.ptrs.glFramebufferTexture2D)(target, attachment, tex_target, texture, level) }
    }

    fn framebuffer_renderbuffer(&self, target: GLenum, attachment: GLenum, rb_target: GLenum, renderbuffer: GLuint) {
        unsafe { (self.ptrs.glFramebufferRenderbuffer)(target, attachment, rb_target, renderbuffer) }
    }

    fn check_framebuffer_status(&self, target: GLenum) -> GLenum {
        unsafe { (self.ptrs.glCheckFramebufferStatus)(target) }
    }

    fn blit_framebuffer(&self, src: [GLint; 4], dst: [GLint; 4], mask: GLbitfield, filter: GLenum) {
        if let Some(f) = self.ptrs.glBlitFramebuffer {
            unsafe { f(src[0], src[1], src[2], src[3], dst[0], dst[1], dst[2], dst[3], mask, filter) }
        }
    }

    fn resolve_multisample_framebuffer(&self) {
        if let Some(f) = self.ptrs.glResolveMultisampleFramebufferAPPLE {
            unsafe { f() }
        }
    }

    fn read_pixels(&self, x: GLint, y: GLint, width: GLint, height: GLint, format: GLenum, ty: GLenum, pixels: &mut [u8]) {
        unsafe { (self.ptrs.glReadPixels)(x, y, width, height, format, ty, pixels.as_mut_ptr().cast()) }
    }

    fn read_pixels_to_pack_buffer(
        &self,
        x: GLint,
        y: GLint,
        width: GLint,
        height: GLint,
        format: GLenum,
        ty: GLenum,
        offset: usize,
    ) {
        // With a pack buffer bound, the pointer argument is a byte offset.
        unsafe { (self.ptrs.glReadPixels)(x, y, width, height, format, ty, offset as *mut c_void) }
    }

    fn create_renderbuffer(&self) -> GLuint {
        let mut id = 0;
        unsafe { (self.ptrs.glGenRenderbuffers)(1, &mut id) };
        id
    }

    fn delete_renderbuffer(&self, renderbuffer: GLuint) {
        unsafe { (self.ptrs.glDeleteRenderbuffers)(1, &renderbuffer) }
    }

    fn bind_renderbuffer(&self, target: GLenum, renderbuffer: GLuint) {
        unsafe { (self.ptrs.glBindRenderbuffer)(target, renderbuffer) }
    }

    fn renderbuffer_storage(&self, target: GLenum, internal_format: GLenum, width: GLint, height: GLint) {
        unsafe { (self.ptrs.glRenderbufferStorage)(target, internal_format, width, height) }
    }

    fn renderbuffer_storage_multisample(
        &self,
        target: GLenum,
        samples: GLint,
        internal_format: GLenum,
        width: GLint,
        height: GLint,
    ) {
        if let Some(f) = self.ptrs.glRenderbufferStorageMultisample {
            unsafe { f(target, samples, internal_format, width, height) }
        }
    }

    // ── Shaders & Programs ───────────────────────────────────────────────────

    fn create_shader(&self, ty: GLenum) -> GLuint {
        unsafe { (self.ptrs.glCreateShader)(ty) }
    }

    fn shader_source(&self, shader: GLuint, source: &str) {
        let ptr: *const GLchar = source.as_ptr().cast();
        let len = source.len() as GLint;
        unsafe { (self.ptrs.glShaderSource)(shader, 1, &ptr, &len) }
    }

    fn compile_shader(&self, shader: GLuint) {
        unsafe { (self.ptrs.glCompileShader)(shader) }
    }

    fn get_shader_parameter(&self, shader: GLuint, pname: GLenum) -> GLint {
        let mut value = 0;
        unsafe { (self.ptrs.glGetShaderiv)(shader, pname, &mut value) };
        value
    }

    fn get_shader_info_log(&self, shader: GLuint) -> String {
        let capacity = self.get_shader_parameter(shader, GL_INFO_LOG_LENGTH).max(0);
        let mut buf = vec![0u8; capacity as usize];
        let mut written = 0;
        unsafe { (self.ptrs.glGetShaderInfoLog)(shader, capacity, &mut written, buf.as_mut_ptr().cast()) };
        buf.truncate(written.max(0) as usize);
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn delete_shader(&self, shader: GLuint) {
        unsafe { (self.ptrs.glDeleteShader)(shader) }
    }

    fn create_program(&self) -> GLuint {
        unsafe { (self.ptrs.glCreateProgram)() }
    }

    fn attach_shader(&self, program: GLuint, shader: GLuint) {
        unsafe { (self.ptrs.glAttachShader)(program, shader) }
    }

    fn detach_shader(&self, program: GLuint, shader: GLuint) {
        unsafe { (self.ptrs.glDetachShader)(program, shader) }
    }

    fn bind_attrib_location(&self, program: GLuint, index: u32, name: &str) {
        if let Some(name) = c_name(name) {
            unsafe { (self.ptrs.glBindAttribLocation)(program, index, name.as_ptr()) }
        }
    }

    fn link_program(&self, program: GLuint) {
        unsafe { (self.ptrs.glLinkProgram)(program) }
    }

    fn get_program_parameter(&self, program: GLuint, pname: GLenum) -> GLint {
        let mut value = 0;
        unsafe { (self.ptrs.glGetProgramiv)(program, pname, &mut value) };
        value
    }

    fn get_program_info_log(&self, program: GLuint) -> String {
        let capacity = self.get_program_parameter(program, GL_INFO_LOG_LENGTH).max(0);
        let mut buf = vec![0u8; capacity as usize];
        let mut written = 0;
        unsafe { (self.ptrs.glGetProgramInfoLog)(program, capacity, &mut written, buf.as_mut_ptr().cast()) };
        buf.truncate(written.max(0) as usize);
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn delete_program(&self, program: GLuint) {
        unsafe { (self.ptrs.glDeleteProgram)(program) }
    }

    fn use_program(&self, program: GLuint) {
        unsafe { (self.ptrs.glUseProgram)(program) }
    }

    fn get_uniform_location(&self, program: GLuint, name: &str) -> GLint {
        match c_name(name) {
            Some(name) => unsafe { (self.ptrs.glGetUniformLocation)(program, name.as_ptr()) },
            None => -1,
        }
    }

    fn get_uniform_block_index(&self, program: GLuint, name: &str) -> GLuint {
        match (self.ptrs.glGetUniformBlockIndex, c_name(name)) {
            (Some(f), Some(name)) => unsafe { f(program, name.as_ptr()) },
            _ => GL_INVALID_INDEX,
        }
    }

    fn uniform_block_binding(&self, program: GLuint, index: GLuint, binding: GLuint) {
        if let Some(f) = self.ptrs.glUniformBlockBinding {
            unsafe { f(program, index, binding) }
        }
    }

    fn uniform_1i(&self, location: GLint, value: GLint) {
        unsafe { (self.ptrs.glUniform1i)(location, value) }
    }

    fn uniform_1fv(&self, location: GLint, values: &[f32]) {
        unsafe { (self.ptrs.glUniform1fv)(location, values.len() as GLsizei, values.as_ptr()) }
    }

    fn uniform_2fv(&self, location: GLint, values: &[f32]) {
        unsafe { (self.ptrs.glUniform2fv)(location, (values.len() / 2) as GLsizei, values.as_ptr()) }
    }

    fn uniform_3fv(&self, location: GLint, values: &[f32]) {
        unsafe { (self.ptrs.glUniform3fv)(location, (values.len() / 3) as GLsizei, values.as_ptr()) }
    }

    fn uniform_4fv(&self, location: GLint, values: &[f32]) {
        unsafe { (self.ptrs.glUniform4fv)(location, (values.len() / 4) as GLsizei, values.as_ptr()) }
    }

    fn uniform_1iv(&self, location: GLint, values: &[i32]) {
        unsafe { (self.ptrs.glUniform1iv)(location, values.len() as GLsizei, values.as_ptr()) }
    }

    fn uniform_2iv(&self, location: GLint, values: &[i32]) {
        unsafe { (self.ptrs.glUniform2iv)(location, (values.len() / 2) as GLsizei, values.as_ptr()) }
    }

    fn uniform_3iv(&self, location: GLint, values: &[i32]) {
        unsafe { (self.ptrs.glUniform3iv)(location, (values.len() / 3) as GLsizei, values.as_ptr()) }
    }

    fn uniform_4iv(&self, location: GLint, values: &[i32]) {
        unsafe { (self.ptrs.glUniform4iv)(location, (values.len() / 4) as GLsizei, values.as_ptr()) }
    }

    fn uniform_matrix_2fv(&self, location: GLint, values: &[f32]) {
        unsafe { (self.ptrs.glUniformMatrix2fv)(location, (values.len() / 4) as GLsizei, GL_FALSE, values.as_ptr()) }
    }

    fn uniform_matrix_3fv(&self, location: GLint, values: &[f32]) {
        unsafe { (self.ptrs.glUniformMatrix3fv)(location, (values.len() / 9) as GLsizei, GL_FALSE, values.as_ptr()) }
    }

    fn uniform_matrix_4fv(&self, location: GLint, values: &[f32]) {
        unsafe { (self.ptrs.glUniformMatrix4fv)(location, (values.len() / 16) as GLsizei, GL_FALSE, values.as_ptr()) }
    }

    // ── Vertex Input ─────────────────────────────────────────────────────────

    fn create_vertex_array(&self) -> GLuint {
        let mut id = 0;
        if let Some(f) = self.ptrs.glGenVertexArrays {
            unsafe { f(1, &mut id) };
        }
        id
    }

    fn delete_vertex_array(&self, vertex_array: GLuint) {
        if let Some(f) = self.ptrs.glDeleteVertexArrays {
            unsafe { f(1, &vertex_array) }
        }
    }

    fn bind_vertex_array(&self, vertex_array: GLuint) {
        if let Some(f) = self.ptrs.glBindVertexArray {
            unsafe { f(vertex_array) }
        }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { (self.ptrs.glEnableVertexAttribArray)(index) }
    }

    fn disable_vertex_attrib_array(&self, index: u32) {
        unsafe { (self.ptrs.glDisableVertexAttribArray)(index) }
    }

    fn vertex_attrib_pointer(&self, index: u32, size: GLint, ty: GLenum, normalized: bool, stride: GLint, offset: usize) {
        unsafe { (self.ptrs.glVertexAttribPointer)(index, size, ty, gl_bool(normalized), stride, offset as *const c_void) }
    }

    // ── Fixed-Function State ─────────────────────────────────────────────────

    fn enable(&self, cap: GLenum) {
        unsafe { (self.ptrs.glEnable)(cap) }
    }

    fn disable(&self, cap: GLenum) {
        unsafe { (self.ptrs.glDisable)(cap) }
    }

    fn blend_func_separate(&self, src_rgb: GLenum, dst_rgb: GLenum, src_alpha: GLenum, dst_alpha: GLenum) {
        unsafe { (self.ptrs.glBlendFuncSeparate)(src_rgb, dst_rgb, src_alpha, dst_alpha) }
    }

    fn blend_equation_separate(&self, mode_rgb: GLenum, mode_alpha: GLenum) {
        unsafe { (self.ptrs.glBlendEquationSeparate)(mode_rgb, mode_alpha) }
    }

    fn color_mask(&self, red: bool, green: bool, blue: bool, alpha: bool) {
        unsafe { (self.ptrs.glColorMask)(gl_bool(red), gl_bool(green), gl_bool(blue), gl_bool(alpha)) }
    }

    fn depth_mask(&self, flag: bool) {
        unsafe { (self.ptrs.glDepthMask)(gl_bool(flag)) }
    }

    fn depth_func(&self, func: GLenum) {
        unsafe { (self.ptrs.glDepthFunc)(func) }
    }

    fn stencil_func_separate(&self, face: GLenum, func: GLenum, reference: GLint, mask: GLuint) {
        unsafe { (self.ptrs.glStencilFuncSeparate)(face, func, reference, mask) }
    }

    fn stencil_op_separate(&self, face: GLenum, stencil_fail: GLenum, depth_fail: GLenum, depth_pass: GLenum) {
        unsafe { (self.ptrs.glStencilOpSeparate)(face, stencil_fail, depth_fail, depth_pass) }
    }

    fn stencil_mask_separate(&self, face: GLenum, mask: GLuint) {
        unsafe { (self.ptrs.glStencilMaskSeparate)(face, mask) }
    }

    fn viewport(&self, x: GLint, y: GLint, width: GLint, height: GLint) {
        unsafe { (self.ptrs.glViewport)(x, y, width, height) }
    }

    fn scissor(&self, x: GLint, y: GLint, width: GLint, height: GLint) {
        unsafe { (self.ptrs.glScissor)(x, y, width, height) }
    }

    fn clear_color(&self, red: f32, green: f32, blue: f32, alpha: f32) {
        unsafe { (self.ptrs.glClearColor)(red, green, blue, alpha) }
    }

    fn clear_depth(&self, depth: f32) {
        if let Some(f) = self.ptrs.glClearDepthf {
            unsafe { f(depth) }
        }
    }

    fn clear_stencil(&self, stencil: GLint) {
        unsafe { (self.ptrs.glClearStencil)(stencil) }
    }

    fn clear(&self, mask: GLbitfield) {
        unsafe { (self.ptrs.glClear)(mask) }
    }

    // ── Draws ────────────────────────────────────────────────────────────────

    fn draw_arrays(&self, mode: GLenum, first: GLint, count: GLint) {
        unsafe { (self.ptrs.glDrawArrays)(mode, first, count) }
    }

    fn draw_elements(&self, mode: GLenum, count: GLint, ty: GLenum, offset: usize) {
        unsafe { (self.ptrs.glDrawElements)(mode, count, ty, offset as *const c_void) }
    }

    // ── Sync ─────────────────────────────────────────────────────────────────

    fn fence_sync(&self, condition: GLenum, flags: GLbitfield) -> Option<GlSync> {
        let f = self.ptrs.glFenceSync?;
        GlSync::from_raw(unsafe { f(condition, flags) })
    }

    fn client_wait_sync(&self, sync: GlSync, flags: GLbitfield, timeout: GLuint64) -> GLenum {
        match self.ptrs.glClientWaitSync {
            Some(f) => unsafe { f(sync.as_raw(), flags, timeout) },
            None => super::consts::GL_WAIT_FAILED,
        }
    }

    fn wait_sync(&self, sync: GlSync, flags: GLbitfield, timeout: GLuint64) {
        if let Some(f) = self.ptrs.glWaitSync {
            unsafe { f(sync.as_raw(), flags, timeout) }
        }
    }

    fn delete_sync(&self, sync: GlSync) {
        if let Some(f) = self.ptrs.glDeleteSync {
            unsafe { f(sync.as_raw()) }
        }
    }
}
