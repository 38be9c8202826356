//! Capability record of a context.
//!
//! Computed once per interface from the version, the advertised extensions, a few
//! integer limits and the set of resolved entry points. A capability backed by an
//! extension is only reported when the extension is advertised *and* its entry points
//! resolved; call sites branch on these flags, never on pointer presence.

use rustc_hash::FxHashSet;

use super::consts::{
    GLenum, GL_EXTENSIONS, GL_FETCH_PER_SAMPLE_ARM, GL_MAX_SAMPLES, GL_MAX_TEXTURE_IMAGE_UNITS,
    GL_MAX_TEXTURE_SIZE, GL_MAX_VERTEX_ATTRIBS, GL_NUM_EXTENSIONS, GL_RENDERER, GL_VENDOR, GL_VERSION,
};
use super::format_table::{FormatInfo, FormatTable};
use super::interface::GlInterface;
use super::version::{GlStandard, GlVersion};
use crate::errors::{GpuError, Result};
use crate::gpu::PixelFormat;

/// Set of advertised extension names, normalized to carry the `GL_` prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extensions {
    names: FxHashSet<String>,
}

impl Extensions {
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let names = names
            .into_iter()
            .filter(|name| !name.is_empty())
            .map(|name| {
                if name.starts_with("GL_") {
                    name.to_owned()
                } else {
                    format!("GL_{name}")
                }
            })
            .collect();
        Self { names }
    }

    /// Enumerates the extensions of the current context.
    fn query(gl: &dyn GlInterface, version: &GlVersion) -> Self {
        let indexed = version.is_es3_class() || (version.is_gl() && version.at_least(3, 0));
        if indexed && gl.is_entry_point_resolved("glGetStringi") {
            let count = gl.get_integer(GL_NUM_EXTENSIONS).max(0) as u32;
            let names: Vec<String> = (0..count).filter_map(|i| gl.get_string_i(GL_EXTENSIONS, i)).collect();
            return Self::from_names(names.iter().map(String::as_str));
        }
        let joined = gl.get_string(GL_EXTENSIONS).unwrap_or_default();
        Self::from_names(joined.split_whitespace())
    }

    #[inline]
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Multisample resolve strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsaaResolve {
    /// No multisample renderbuffers.
    None,
    /// `glBlitFramebuffer` from the multisample framebuffer.
    BlitFramebuffer,
    /// `glResolveMultisampleFramebufferAPPLE`.
    AppleResolve,
}

/// Everything the GPU layer needs to know about a context to pick a code path.
#[derive(Debug, Clone)]
pub struct GlCaps {
    pub version: GlVersion,
    pub vendor: String,
    pub renderer: String,
    pub extensions: Extensions,
    pub formats: FormatTable,

    /// Fence sync objects.
    pub semaphore_support: bool,
    pub vertex_array_object_support: bool,
    /// `glGenerateMipmap`.
    pub mipmap_support: bool,
    pub msaa_resolve: MsaaResolve,
    /// 1 when multisampling is unsupported.
    pub max_samples: u32,
    /// Pixel-pack buffers that can be mapped for reading.
    pub transfer_buffer_support: bool,
    pub map_buffer_range_support: bool,
    pub unpack_row_length_support: bool,
    pub pack_row_length_support: bool,
    pub uniform_buffer_support: bool,
    pub sampler_object_support: bool,
    pub texture_barrier_support: bool,
    /// Capability that must be enabled for per-sample framebuffer fetch.
    pub fetch_per_sample_flag: Option<GLenum>,
    pub blit_framebuffer_support: bool,
    pub clamp_to_border_support: bool,
    pub uint_index_support: bool,

    pub max_texture_size: u32,
    pub max_texture_units: u32,
    pub max_vertex_attributes: u32,
}

impl GlCaps {
    /// Detects the capabilities of the context behind `gl`.
    pub fn detect(gl: &dyn GlInterface) -> Result<Self> {
        let version_string = gl
            .get_string(GL_VERSION)
            .ok_or(GpuError::UnsupportedVersion(String::from("<no version string>")))?;
        let version = GlVersion::parse(&version_string)?;
        let minimum = match version.standard {
            GlStandard::Gl | GlStandard::Gles => version.at_least(2, 0),
            GlStandard::WebGl => version.at_least(1, 0),
        };
        if !minimum {
            log::error!("{version} is below the minimum supported version");
            return Err(GpuError::UnsupportedVersion(version_string));
        }

        let ext = Extensions::query(gl, &version);
        let resolved = |names: &[&str]| names.iter().all(|name| gl.is_entry_point_resolved(name));

        let is_gl = version.is_gl();
        let is_gles = version.is_gles();
        let is_webgl = version.is_webgl();
        let gl_at = |major, minor| is_gl && version.at_least(major, minor);
        let es3 = (is_gles || is_webgl) && version.is_es3_class();

        let semaphore_support = (gl_at(3, 2) || ext.has("GL_ARB_sync") || es3 || ext.has("GL_APPLE_sync"))
            && resolved(&["glFenceSync", "glClientWaitSync", "glWaitSync", "glDeleteSync"]);

        let vertex_array_object_support = (gl_at(3, 0)
            || ext.has("GL_ARB_vertex_array_object")
            || ext.has("GL_APPLE_vertex_array_object")
            || es3
            || ext.has("GL_OES_vertex_array_object"))
            && resolved(&["glGenVertexArrays", "glBindVertexArray", "glDeleteVertexArrays"]);

        let mipmap_support = (gl_at(3, 0) || ext.has("GL_ARB_framebuffer_object") || is_gles || is_webgl)
            && resolved(&["glGenerateMipmap"]);

        let core_fbo_blit = gl_at(3, 0) || ext.has("GL_ARB_framebuffer_object") || es3;
        let blit_framebuffer_support = (core_fbo_blit
            || ext.has("GL_EXT_framebuffer_blit")
            || ext.has("GL_ANGLE_framebuffer_blit")
            || ext.has("GL_NV_framebuffer_blit"))
            && resolved(&["glBlitFramebuffer"]);

        let multisample_storage = resolved(&["glRenderbufferStorageMultisample"]);
        let msaa_resolve = if blit_framebuffer_support
            && multisample_storage
            && (core_fbo_blit
                || ext.has("GL_EXT_framebuffer_multisample")
                || ext.has("GL_ANGLE_framebuffer_multisample")
                || ext.has("GL_NV_framebuffer_multisample"))
        {
            MsaaResolve::BlitFramebuffer
        } else if multisample_storage
            && ext.has("GL_APPLE_framebuffer_multisample")
            && resolved(&["glResolveMultisampleFramebufferAPPLE"])
        {
            MsaaResolve::AppleResolve
        } else {
            MsaaResolve::None
        };
        let max_samples = match msaa_resolve {
            MsaaResolve::None => 1,
            _ => gl.get_integer(GL_MAX_SAMPLES).max(1) as u32,
        };

        let map_buffer_range_support = !is_webgl
            && (gl_at(3, 0) || ext.has("GL_ARB_map_buffer_range") || es3 || ext.has("GL_EXT_map_buffer_range"))
            && resolved(&["glMapBufferRange", "glUnmapBuffer"]);

        let pixel_buffer_objects =
            gl_at(2, 1) || ext.has("GL_ARB_pixel_buffer_object") || es3 || ext.has("GL_NV_pixel_buffer_object");
        let transfer_buffer_support = !is_webgl && pixel_buffer_objects && map_buffer_range_support;

        let unpack_row_length_support = is_gl || es3 || ext.has("GL_EXT_unpack_subimage");
        let pack_row_length_support = is_gl || es3 || ext.has("GL_NV_pack_subimage");

        let uniform_buffer_support = (gl_at(3, 1) || ext.has("GL_ARB_uniform_buffer_object") || es3)
            && resolved(&["glGetUniformBlockIndex", "glUniformBlockBinding", "glBindBufferRange"]);

        let sampler_object_support = (gl_at(3, 3) || ext.has("GL_ARB_sampler_objects") || es3)
            && resolved(&["glGenSamplers", "glDeleteSamplers", "glBindSampler", "glSamplerParameteri"]);

        let texture_barrier_support = (gl_at(4, 5) || ext.has("GL_ARB_texture_barrier") || ext.has("GL_NV_texture_barrier"))
            && resolved(&["glTextureBarrier"]);

        let fetch_per_sample_flag = ext
            .has("GL_ARM_shader_framebuffer_fetch")
            .then_some(GL_FETCH_PER_SAMPLE_ARM);

        let clamp_to_border_support = is_gl
            || (is_gles && version.at_least(3, 2))
            || ext.has("GL_EXT_texture_border_clamp")
            || ext.has("GL_OES_texture_border_clamp");

        let uint_index_support = is_gl || es3 || ext.has("GL_OES_element_index_uint");

        let formats = FormatTable::new(&version, &ext);

        let caps = Self {
            version,
            vendor: gl.get_string(GL_VENDOR).unwrap_or_default(),
            renderer: gl.get_string(GL_RENDERER).unwrap_or_default(),
            extensions: ext,
            formats,
            semaphore_support,
            vertex_array_object_support,
            mipmap_support,
            msaa_resolve,
            max_samples,
            transfer_buffer_support,
            map_buffer_range_support,
            unpack_row_length_support,
            pack_row_length_support,
            uniform_buffer_support,
            sampler_object_support,
            texture_barrier_support,
            fetch_per_sample_flag,
            blit_framebuffer_support,
            clamp_to_border_support,
            uint_index_support,
            max_texture_size: gl.get_integer(GL_MAX_TEXTURE_SIZE).max(0) as u32,
            max_texture_units: gl.get_integer(GL_MAX_TEXTURE_IMAGE_UNITS).max(1) as u32,
            max_vertex_attributes: gl.get_integer(GL_MAX_VERTEX_ATTRIBS).max(1) as u32,
        };

        log::debug!(
            "Detected {} ({} / {}): {} extensions, msaa={:?}x{}, transfer_buffers={}, vao={}, ubo={}",
            caps.version,
            caps.vendor,
            caps.renderer,
            caps.extensions.len(),
            caps.msaa_resolve,
            caps.max_samples,
            caps.transfer_buffer_support,
            caps.vertex_array_object_support,
            caps.uniform_buffer_support,
        );

        Ok(caps)
    }

    #[inline]
    #[must_use]
    pub fn format_info(&self, format: PixelFormat) -> &FormatInfo {
        self.formats.info(format)
    }

    #[inline]
    #[must_use]
    pub fn is_texturable(&self, format: PixelFormat) -> bool {
        self.formats.is_texturable(format)
    }

    #[inline]
    #[must_use]
    pub fn is_renderable(&self, format: PixelFormat) -> bool {
        self.formats.is_renderable(format)
    }

    #[inline]
    #[must_use]
    pub fn msaa_support(&self) -> bool {
        self.msaa_resolve != MsaaResolve::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_names_are_normalized() {
        let ext = Extensions::from_names(["OES_vertex_array_object", "GL_EXT_texture_rg", ""]);
        assert_eq!(ext.len(), 2);
        assert!(ext.has("GL_OES_vertex_array_object"));
        assert!(ext.has("GL_EXT_texture_rg"));
    }
}
