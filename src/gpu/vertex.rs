//! Vertex and uniform layouts.
//!
//! Attribute offsets and the vertex stride are derived from the attribute list once,
//! when a pipeline is created.

use smallvec::SmallVec;

/// Format of a single vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Float,
    Float2,
    Float3,
    Float4,
    Half2,
    Half4,
    Int,
    Int2,
    Int3,
    Int4,
    /// Four normalized unsigned bytes, typically a packed color.
    UByte4Normalized,
}

impl VertexFormat {
    /// Size in bytes.
    #[inline]
    #[must_use]
    pub fn size(self) -> usize {
        match self {
            Self::Float | Self::Int | Self::Half2 | Self::UByte4Normalized => 4,
            Self::Float2 | Self::Int2 | Self::Half4 => 8,
            Self::Float3 | Self::Int3 => 12,
            Self::Float4 | Self::Int4 => 16,
        }
    }

    /// Number of components.
    #[inline]
    #[must_use]
    pub fn components(self) -> i32 {
        match self {
            Self::Float | Self::Int => 1,
            Self::Float2 | Self::Int2 | Self::Half2 => 2,
            Self::Float3 | Self::Int3 => 3,
            Self::Float4 | Self::Int4 | Self::Half4 | Self::UByte4Normalized => 4,
        }
    }
}

/// A named attribute, in shader-input order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub name: String,
    pub format: VertexFormat,
}

impl VertexAttribute {
    #[must_use]
    pub fn new(name: impl Into<String>, format: VertexFormat) -> Self {
        Self {
            name: name.into(),
            format,
        }
    }
}

/// Attribute with its resolved byte offset and location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlacedAttribute {
    pub name: String,
    pub format: VertexFormat,
    pub offset: usize,
    pub location: u32,
}

/// Tightly packed, interleaved vertex layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct VertexLayout {
    attributes: SmallVec<[PlacedAttribute; 8]>,
    stride: usize,
}

impl VertexLayout {
    /// Places attributes back to back; location `i` is the `i`-th attribute.
    #[must_use]
    pub fn new(attributes: &[VertexAttribute]) -> Self {
        let mut placed = SmallVec::with_capacity(attributes.len());
        let mut offset = 0;
        for (location, attribute) in attributes.iter().enumerate() {
            placed.push(PlacedAttribute {
                name: attribute.name.clone(),
                format: attribute.format,
                offset,
                location: location as u32,
            });
            offset += attribute.format.size();
        }
        Self {
            attributes: placed,
            stride: offset,
        }
    }

    #[inline]
    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &[PlacedAttribute] {
        &self.attributes
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Bitmask of attribute locations this layout enables.
    #[must_use]
    pub fn location_mask(&self) -> u32 {
        self.attributes
            .iter()
            .fold(0, |mask, attribute| mask | (1 << attribute.location))
    }
}

// ─── Uniform Layouts ─────────────────────────────────────────────────────────

/// Type of a member of a uniform block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformFormat {
    Float,
    Float2,
    Float3,
    Float4,
    Float2x2,
    Float3x3,
    Float4x4,
    Int,
    Int2,
    Int3,
    Int4,
}

impl UniformFormat {
    /// Size of the member in the block's memory.
    #[inline]
    #[must_use]
    pub fn size(self) -> usize {
        match self {
            Self::Float | Self::Int => 4,
            Self::Float2 | Self::Int2 => 8,
            Self::Float3 | Self::Int3 => 12,
            Self::Float4 | Self::Int4 | Self::Float2x2 => 16,
            // std140 pads each column to 16 bytes
            Self::Float3x3 => 48,
            Self::Float4x4 => 64,
        }
    }
}

/// One member of a uniform block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniformField {
    pub name: String,
    pub format: UniformFormat,
    pub offset: usize,
}

impl UniformField {
    #[must_use]
    pub fn new(name: impl Into<String>, format: UniformFormat, offset: usize) -> Self {
        Self {
            name: name.into(),
            format,
            offset,
        }
    }
}

/// A uniform block and the binding slot it is fed from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniformBlockLayout {
    pub name: String,
    pub binding: u32,
    pub fields: Vec<UniformField>,
}

impl UniformBlockLayout {
    #[must_use]
    pub fn new(name: impl Into<String>, binding: u32, fields: Vec<UniformField>) -> Self {
        Self {
            name: name.into(),
            binding,
            fields,
        }
    }

    /// Bytes spanned by the fields.
    #[must_use]
    pub fn size(&self) -> usize {
        self.fields
            .iter()
            .map(|field| field.offset + field.format.size())
            .max()
            .unwrap_or(0)
    }
}

/// A sampler uniform and the texture unit it reads from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SamplerBinding {
    pub name: String,
    pub binding: u32,
}

impl SamplerBinding {
    #[must_use]
    pub fn new(name: impl Into<String>, binding: u32) -> Self {
        Self {
            name: name.into(),
            binding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_is_sum_of_attribute_sizes() {
        let layout = VertexLayout::new(&[
            VertexAttribute::new("aPosition", VertexFormat::Float2),
            VertexAttribute::new("aColor", VertexFormat::UByte4Normalized),
            VertexAttribute::new("aCoverage", VertexFormat::Float),
        ]);
        assert_eq!(layout.stride(), 16);
        let offsets: Vec<_> = layout.attributes().iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 8, 12]);
        assert_eq!(layout.location_mask(), 0b111);
    }

    #[test]
    fn empty_layout_has_zero_stride() {
        let layout = VertexLayout::new(&[]);
        assert!(layout.is_empty());
        assert_eq!(layout.stride(), 0);
    }

    #[test]
    fn uniform_block_size_covers_last_member() {
        let block = UniformBlockLayout::new(
            "Transform",
            0,
            vec![
                UniformField::new("uMatrix", UniformFormat::Float3x3, 0),
                UniformField::new("uColor", UniformFormat::Float4, 48),
            ],
        );
        assert_eq!(block.size(), 64);
    }
}
