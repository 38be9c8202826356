//! API flavor and version detection.

use std::fmt;

use crate::errors::{GpuError, Result};

/// API flavor of a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlStandard {
    /// Desktop OpenGL.
    Gl,
    /// OpenGL ES.
    Gles,
    /// WebGL.
    WebGl,
}

/// Flavor plus major/minor version. Used as the interface cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlVersion {
    pub standard: GlStandard,
    pub major: u32,
    pub minor: u32,
}

impl GlVersion {
    #[must_use]
    pub const fn new(standard: GlStandard, major: u32, minor: u32) -> Self {
        Self { standard, major, minor }
    }

    /// Parses a `GL_VERSION` string.
    ///
    /// Accepted shapes:
    /// - `"4.1.0 NVIDIA 535.54"` (desktop)
    /// - `"OpenGL ES 3.2 v1.r32p1"` and `"OpenGL ES-CM 1.1"` (ES)
    /// - `"WebGL 2.0 (OpenGL ES 3.0 Chromium)"` (WebGL)
    pub fn parse(version: &str) -> Result<Self> {
        let version = version.trim();
        let (standard, rest) = if let Some(rest) = version.strip_prefix("WebGL") {
            (GlStandard::WebGl, rest)
        } else if let Some(rest) = version.strip_prefix("OpenGL ES") {
            // Skip profile suffixes such as "-CM"
            let rest = rest.trim_start_matches(|c: char| c != ' ' && !c.is_ascii_digit());
            (GlStandard::Gles, rest)
        } else {
            (GlStandard::Gl, version)
        };

        let number = rest.split_whitespace().next().unwrap_or_default();
        let mut parts = number.split('.');
        let major = parts.next().and_then(parse_leading_digits);
        let minor = parts.next().and_then(parse_leading_digits);

        match (major, minor) {
            (Some(major), Some(minor)) => Ok(Self::new(standard, major, minor)),
            _ => {
                log::warn!("Unrecognized version string: {version:?}");
                Err(GpuError::UnsupportedVersion(version.to_owned()))
            }
        }
    }

    /// Returns `true` if this version is at least `major.minor`.
    #[inline]
    #[must_use]
    pub fn at_least(&self, major: u32, minor: u32) -> bool {
        (self.major, self.minor) >= (major, minor)
    }

    #[inline]
    #[must_use]
    pub fn is_gl(&self) -> bool {
        self.standard == GlStandard::Gl
    }

    #[inline]
    #[must_use]
    pub fn is_gles(&self) -> bool {
        self.standard == GlStandard::Gles
    }

    #[inline]
    #[must_use]
    pub fn is_webgl(&self) -> bool {
        self.standard == GlStandard::WebGl
    }

    /// ES 3.0, WebGL 2.0 and desktop 3.3 share the feature level this layer
    /// relies on for core sync objects, samplers and uniform blocks.
    #[must_use]
    pub fn is_es3_class(&self) -> bool {
        match self.standard {
            GlStandard::Gl => self.at_least(3, 3),
            GlStandard::Gles => self.at_least(3, 0),
            GlStandard::WebGl => self.at_least(2, 0),
        }
    }
}

impl fmt::Display for GlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.standard {
            GlStandard::Gl => "OpenGL",
            GlStandard::Gles => "OpenGL ES",
            GlStandard::WebGl => "WebGL",
        };
        write!(f, "{prefix} {}.{}", self.major, self.minor)
    }
}

fn parse_leading_digits(text: &str) -> Option<u32> {
    let end = text.find(|c: char| !c.is_ascii_digit()).unwrap_or(text.len());
    text[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_desktop_version() {
        let version = GlVersion::parse("4.1.0 NVIDIA 535.54").unwrap();
        assert_eq!(version, GlVersion::new(GlStandard::Gl, 4, 1));
        assert!(version.is_es3_class());
    }

    #[test]
    fn parses_es_versions() {
        assert_eq!(
            GlVersion::parse("OpenGL ES 3.2 v1.r32p1").unwrap(),
            GlVersion::new(GlStandard::Gles, 3, 2)
        );
        assert_eq!(
            GlVersion::parse("OpenGL ES-CM 1.1").unwrap(),
            GlVersion::new(GlStandard::Gles, 1, 1)
        );
        assert!(!GlVersion::parse("OpenGL ES 2.0").unwrap().is_es3_class());
    }

    #[test]
    fn parses_webgl_before_embedded_es_version() {
        let version = GlVersion::parse("WebGL 2.0 (OpenGL ES 3.0 Chromium)").unwrap();
        assert_eq!(version, GlVersion::new(GlStandard::WebGl, 2, 0));
        assert!(version.is_es3_class());
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(GlVersion::parse("banana"), Err(GpuError::UnsupportedVersion(_))));
        assert!(GlVersion::parse("").is_err());
    }

    #[test]
    fn display_round_trips_the_flavor() {
        assert_eq!(GlVersion::new(GlStandard::Gles, 3, 0).to_string(), "OpenGL ES 3.0");
    }
}
