//! Native enums and support flags for every [`PixelFormat`].

use super::caps::Extensions;
use super::consts::{
    GLenum, GL_ALPHA, GL_ALPHA8, GL_BGRA, GL_BGRA8, GL_DEPTH_STENCIL, GL_DEPTH24_STENCIL8, GL_HALF_FLOAT,
    GL_HALF_FLOAT_OES, GL_LUMINANCE, GL_LUMINANCE8, GL_NONE, GL_R8, GL_RED, GL_RG, GL_RG8, GL_RGBA, GL_RGBA8,
    GL_RGBA16F, GL_UNSIGNED_BYTE, GL_UNSIGNED_INT_24_8,
};
use super::version::GlVersion;
use crate::gpu::PixelFormat;

/// How one pixel format maps onto the native API of a given context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInfo {
    /// `internalformat` argument of `glTexImage2D`.
    pub tex_image_internal_format: GLenum,
    /// `internalformat` argument of `glRenderbufferStorage*`.
    pub renderbuffer_internal_format: GLenum,
    /// `format` argument of pixel transfers.
    pub external_format: GLenum,
    /// `type` argument of pixel transfers.
    pub external_type: GLenum,
    /// Can be allocated as a sampled texture.
    pub texturable: bool,
    /// Can be a color (or depth-stencil) attachment of a complete framebuffer.
    pub renderable: bool,
}

impl FormatInfo {
    const UNSUPPORTED: Self = Self {
        tex_image_internal_format: GL_NONE,
        renderbuffer_internal_format: GL_NONE,
        external_format: GL_NONE,
        external_type: GL_NONE,
        texturable: false,
        renderable: false,
    };
}

/// Per-format table, indexed by [`PixelFormat`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatTable {
    entries: [FormatInfo; PixelFormat::ALL.len()],
}

impl FormatTable {
    #[must_use]
    pub fn new(version: &GlVersion, extensions: &Extensions) -> Self {
        let mut entries = [FormatInfo::UNSUPPORTED; PixelFormat::ALL.len()];
        for format in PixelFormat::ALL {
            entries[format.index()] = describe(format, version, extensions);
        }
        Self { entries }
    }

    #[inline]
    #[must_use]
    pub fn info(&self, format: PixelFormat) -> &FormatInfo {
        &self.entries[format.index()]
    }

    #[inline]
    #[must_use]
    pub fn is_texturable(&self, format: PixelFormat) -> bool {
        self.info(format).texturable
    }

    #[inline]
    #[must_use]
    pub fn is_renderable(&self, format: PixelFormat) -> bool {
        self.info(format).renderable
    }
}

/// Pixel format of an imported handle, from its sized internal format.
#[must_use]
pub fn pixel_format_from_sized(internal_format: GLenum) -> Option<PixelFormat> {
    match internal_format {
        GL_R8 | GL_ALPHA8 => Some(PixelFormat::Alpha8),
        GL_LUMINANCE8 => Some(PixelFormat::Gray8),
        GL_RG8 => Some(PixelFormat::Rg88),
        GL_RGBA8 => Some(PixelFormat::Rgba8888),
        GL_BGRA8 => Some(PixelFormat::Bgra8888),
        GL_RGBA16F => Some(PixelFormat::RgbaF16),
        GL_DEPTH24_STENCIL8 => Some(PixelFormat::Depth24Stencil8),
        _ => None,
    }
}

fn describe(format: PixelFormat, version: &GlVersion, ext: &Extensions) -> FormatInfo {
    // ES 2.0 and WebGL 1.0 only accept unsized internal formats in glTexImage2D.
    let sized = version.is_gl() || version.is_es3_class();
    let pick = |sized_format: GLenum, unsized_format: GLenum| if sized { sized_format } else { unsized_format };

    match format {
        PixelFormat::Alpha8 => {
            if sized {
                FormatInfo {
                    tex_image_internal_format: GL_R8,
                    renderbuffer_internal_format: GL_R8,
                    external_format: GL_RED,
                    external_type: GL_UNSIGNED_BYTE,
                    texturable: true,
                    renderable: true,
                }
            } else {
                FormatInfo {
                    tex_image_internal_format: GL_ALPHA,
                    renderbuffer_internal_format: GL_ALPHA8,
                    external_format: GL_ALPHA,
                    external_type: GL_UNSIGNED_BYTE,
                    texturable: true,
                    renderable: false,
                }
            }
        }
        PixelFormat::Gray8 => FormatInfo {
            tex_image_internal_format: pick(GL_R8, GL_LUMINANCE),
            renderbuffer_internal_format: GL_LUMINANCE8,
            external_format: pick(GL_RED, GL_LUMINANCE),
            external_type: GL_UNSIGNED_BYTE,
            texturable: true,
            renderable: false,
        },
        PixelFormat::Rg88 => {
            let supported = sized || ext.has("GL_EXT_texture_rg");
            FormatInfo {
                tex_image_internal_format: pick(GL_RG8, GL_RG),
                renderbuffer_internal_format: GL_RG8,
                external_format: GL_RG,
                external_type: GL_UNSIGNED_BYTE,
                texturable: supported,
                renderable: supported,
            }
        }
        PixelFormat::Rgba8888 => FormatInfo {
            tex_image_internal_format: pick(GL_RGBA8, GL_RGBA),
            renderbuffer_internal_format: GL_RGBA8,
            external_format: GL_RGBA,
            external_type: GL_UNSIGNED_BYTE,
            texturable: true,
            renderable: true,
        },
        PixelFormat::Bgra8888 => {
            if version.is_gl() {
                // Desktop stores BGRA data in an RGBA8 texture and swizzles on transfer.
                FormatInfo {
                    tex_image_internal_format: GL_RGBA8,
                    renderbuffer_internal_format: GL_RGBA8,
                    external_format: GL_BGRA,
                    external_type: GL_UNSIGNED_BYTE,
                    texturable: true,
                    renderable: true,
                }
            } else if version.is_gles() && ext.has("GL_EXT_texture_format_BGRA8888") {
                FormatInfo {
                    tex_image_internal_format: GL_BGRA,
                    renderbuffer_internal_format: GL_BGRA8,
                    external_format: GL_BGRA,
                    external_type: GL_UNSIGNED_BYTE,
                    texturable: true,
                    renderable: true,
                }
            } else {
                FormatInfo::UNSUPPORTED
            }
        }
        PixelFormat::RgbaF16 => {
            let core = (version.is_gl() && version.at_least(3, 0)) || version.is_es3_class();
            let texturable = core || ext.has("GL_OES_texture_half_float");
            let renderable = (version.is_gl() && version.at_least(3, 0))
                || ext.has("GL_EXT_color_buffer_half_float")
                || ext.has("GL_EXT_color_buffer_float");
            FormatInfo {
                tex_image_internal_format: pick(GL_RGBA16F, GL_RGBA),
                renderbuffer_internal_format: GL_RGBA16F,
                external_format: GL_RGBA,
                external_type: if core { GL_HALF_FLOAT } else { GL_HALF_FLOAT_OES },
                texturable,
                renderable: texturable && renderable,
            }
        }
        PixelFormat::Depth24Stencil8 => {
            let packed = version.is_gl() || version.is_es3_class() || ext.has("GL_OES_packed_depth_stencil");
            if version.is_webgl() && !version.is_es3_class() {
                // WebGL 1 exposes the combined attachment under an unsized format.
                FormatInfo {
                    tex_image_internal_format: GL_NONE,
                    renderbuffer_internal_format: GL_DEPTH_STENCIL,
                    external_format: GL_DEPTH_STENCIL,
                    external_type: GL_UNSIGNED_INT_24_8,
                    texturable: false,
                    renderable: true,
                }
            } else {
                FormatInfo {
                    tex_image_internal_format: GL_NONE,
                    renderbuffer_internal_format: GL_DEPTH24_STENCIL8,
                    external_format: GL_DEPTH_STENCIL,
                    external_type: GL_UNSIGNED_INT_24_8,
                    texturable: false,
                    renderable: packed,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::version::GlStandard;

    fn table(standard: GlStandard, major: u32, minor: u32, extensions: &[&str]) -> FormatTable {
        let extensions = Extensions::from_names(extensions.iter().copied());
        FormatTable::new(&GlVersion::new(standard, major, minor), &extensions)
    }

    #[test]
    fn es2_uses_unsized_internal_formats() {
        let table = table(GlStandard::Gles, 2, 0, &[]);
        assert_eq!(table.info(PixelFormat::Rgba8888).tex_image_internal_format, GL_RGBA);
        assert_eq!(table.info(PixelFormat::Alpha8).tex_image_internal_format, GL_ALPHA);
        assert!(!table.is_renderable(PixelFormat::Alpha8));
        assert!(!table.is_texturable(PixelFormat::Rg88));
    }

    #[test]
    fn es3_alpha_is_a_renderable_red_texture() {
        let table = table(GlStandard::Gles, 3, 0, &[]);
        let info = table.info(PixelFormat::Alpha8);
        assert_eq!(info.tex_image_internal_format, GL_R8);
        assert!(info.renderable);
    }

    #[test]
    fn gray_is_never_renderable() {
        for (standard, major) in [(GlStandard::Gl, 4), (GlStandard::Gles, 3), (GlStandard::WebGl, 2)] {
            let table = table(standard, major, 0, &[]);
            assert!(table.is_texturable(PixelFormat::Gray8));
            assert!(!table.is_renderable(PixelFormat::Gray8));
        }
    }

    #[test]
    fn bgra_on_es_requires_extension() {
        assert!(!table(GlStandard::Gles, 3, 0, &[]).is_texturable(PixelFormat::Bgra8888));
        assert!(table(GlStandard::Gles, 3, 0, &["GL_EXT_texture_format_BGRA8888"]).is_texturable(PixelFormat::Bgra8888));
        assert!(!table(GlStandard::WebGl, 2, 0, &[]).is_texturable(PixelFormat::Bgra8888));
    }

    #[test]
    fn half_float_rendering_needs_color_buffer_extension_on_es() {
        let plain = table(GlStandard::Gles, 3, 0, &[]);
        assert!(plain.is_texturable(PixelFormat::RgbaF16));
        assert!(!plain.is_renderable(PixelFormat::RgbaF16));

        let extended = table(GlStandard::Gles, 3, 0, &["GL_EXT_color_buffer_float"]);
        assert!(extended.is_renderable(PixelFormat::RgbaF16));
    }

    #[test]
    fn imported_formats_map_back() {
        assert_eq!(pixel_format_from_sized(GL_RGBA8), Some(PixelFormat::Rgba8888));
        assert_eq!(pixel_format_from_sized(GL_R8), Some(PixelFormat::Alpha8));
        assert_eq!(pixel_format_from_sized(GL_RGBA), None);
    }

    #[test]
    fn depth_stencil_is_renderable_but_never_texturable() {
        let table = table(GlStandard::WebGl, 1, 0, &[]);
        let info = table.info(PixelFormat::Depth24Stencil8);
        assert!(info.renderable);
        assert!(!info.texturable);
        assert_eq!(info.renderbuffer_internal_format, GL_DEPTH_STENCIL);
    }
}
