//! Translation of backend-agnostic enums into native values.

use super::consts::{
    GLenum, GLint, GL_ALWAYS, GL_CLAMP_TO_BORDER, GL_CLAMP_TO_EDGE, GL_CONSTANT_COLOR, GL_DECR, GL_DECR_WRAP,
    GL_DST_ALPHA, GL_DST_COLOR, GL_EQUAL, GL_FLOAT, GL_FUNC_ADD, GL_FUNC_REVERSE_SUBTRACT, GL_FUNC_SUBTRACT,
    GL_GEQUAL, GL_GREATER, GL_HALF_FLOAT, GL_INCR, GL_INCR_WRAP, GL_INT, GL_INVERT, GL_KEEP, GL_LEQUAL, GL_LESS,
    GL_LINE_STRIP, GL_LINEAR, GL_LINEAR_MIPMAP_LINEAR, GL_LINEAR_MIPMAP_NEAREST, GL_LINES, GL_MAX, GL_MIN,
    GL_MIRRORED_REPEAT, GL_NEAREST, GL_NEAREST_MIPMAP_LINEAR, GL_NEAREST_MIPMAP_NEAREST, GL_NEVER, GL_NOTEQUAL,
    GL_ONE, GL_ONE_MINUS_CONSTANT_COLOR, GL_ONE_MINUS_DST_ALPHA, GL_ONE_MINUS_DST_COLOR, GL_ONE_MINUS_SRC_ALPHA,
    GL_ONE_MINUS_SRC_COLOR, GL_POINTS, GL_REPEAT, GL_REPLACE, GL_SRC_ALPHA, GL_SRC_ALPHA_SATURATE, GL_SRC_COLOR,
    GL_TRIANGLE_STRIP, GL_TRIANGLES, GL_UNSIGNED_BYTE, GL_UNSIGNED_INT, GL_UNSIGNED_SHORT, GL_ZERO,
};
use crate::gpu::{
    AddressMode, BlendFactor, BlendOperation, CompareFunction, FilterMode, IndexFormat, MipmapMode, PrimitiveType,
    StencilOperation, VertexFormat,
};

#[must_use]
pub fn blend_factor(factor: BlendFactor) -> GLenum {
    match factor {
        BlendFactor::Zero => GL_ZERO,
        BlendFactor::One => GL_ONE,
        BlendFactor::Src => GL_SRC_COLOR,
        BlendFactor::OneMinusSrc => GL_ONE_MINUS_SRC_COLOR,
        BlendFactor::Dst => GL_DST_COLOR,
        BlendFactor::OneMinusDst => GL_ONE_MINUS_DST_COLOR,
        BlendFactor::SrcAlpha => GL_SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => GL_ONE_MINUS_SRC_ALPHA,
        BlendFactor::DstAlpha => GL_DST_ALPHA,
        BlendFactor::OneMinusDstAlpha => GL_ONE_MINUS_DST_ALPHA,
        BlendFactor::ConstantColor => GL_CONSTANT_COLOR,
        BlendFactor::OneMinusConstantColor => GL_ONE_MINUS_CONSTANT_COLOR,
        BlendFactor::SrcAlphaSaturated => GL_SRC_ALPHA_SATURATE,
    }
}

#[must_use]
pub fn blend_equation(operation: BlendOperation) -> GLenum {
    match operation {
        BlendOperation::Add => GL_FUNC_ADD,
        BlendOperation::Subtract => GL_FUNC_SUBTRACT,
        BlendOperation::ReverseSubtract => GL_FUNC_REVERSE_SUBTRACT,
        BlendOperation::Min => GL_MIN,
        BlendOperation::Max => GL_MAX,
    }
}

#[must_use]
pub fn compare_function(function: CompareFunction) -> GLenum {
    match function {
        CompareFunction::Never => GL_NEVER,
        CompareFunction::Less => GL_LESS,
        CompareFunction::Equal => GL_EQUAL,
        CompareFunction::LessEqual => GL_LEQUAL,
        CompareFunction::Greater => GL_GREATER,
        CompareFunction::NotEqual => GL_NOTEQUAL,
        CompareFunction::GreaterEqual => GL_GEQUAL,
        CompareFunction::Always => GL_ALWAYS,
    }
}

#[must_use]
pub fn stencil_operation(operation: StencilOperation) -> GLenum {
    match operation {
        StencilOperation::Keep => GL_KEEP,
        StencilOperation::Zero => GL_ZERO,
        StencilOperation::Replace => GL_REPLACE,
        StencilOperation::Invert => GL_INVERT,
        StencilOperation::IncrementClamp => GL_INCR,
        StencilOperation::DecrementClamp => GL_DECR,
        StencilOperation::IncrementWrap => GL_INCR_WRAP,
        StencilOperation::DecrementWrap => GL_DECR_WRAP,
    }
}

#[must_use]
pub fn primitive_mode(primitive: PrimitiveType) -> GLenum {
    match primitive {
        PrimitiveType::Triangles => GL_TRIANGLES,
        PrimitiveType::TriangleStrip => GL_TRIANGLE_STRIP,
        PrimitiveType::Lines => GL_LINES,
        PrimitiveType::LineStrip => GL_LINE_STRIP,
        PrimitiveType::Points => GL_POINTS,
    }
}

#[must_use]
pub fn index_type(format: IndexFormat) -> GLenum {
    match format {
        IndexFormat::Uint16 => GL_UNSIGNED_SHORT,
        IndexFormat::Uint32 => GL_UNSIGNED_INT,
    }
}

/// `(type, normalized)` arguments of `glVertexAttribPointer`.
#[must_use]
pub fn vertex_format(format: VertexFormat) -> (GLenum, bool) {
    match format {
        VertexFormat::Float | VertexFormat::Float2 | VertexFormat::Float3 | VertexFormat::Float4 => (GL_FLOAT, false),
        VertexFormat::Half2 | VertexFormat::Half4 => (GL_HALF_FLOAT, false),
        VertexFormat::Int | VertexFormat::Int2 | VertexFormat::Int3 | VertexFormat::Int4 => (GL_INT, false),
        VertexFormat::UByte4Normalized => (GL_UNSIGNED_BYTE, true),
    }
}

/// Wrap mode, with border clamping degraded to edge clamping when unsupported.
#[must_use]
pub fn address_mode(mode: AddressMode, border_supported: bool) -> GLint {
    let wrap = match mode {
        AddressMode::ClampToEdge => GL_CLAMP_TO_EDGE,
        AddressMode::Repeat => GL_REPEAT,
        AddressMode::MirrorRepeat => GL_MIRRORED_REPEAT,
        AddressMode::ClampToBorder if border_supported => GL_CLAMP_TO_BORDER,
        AddressMode::ClampToBorder => GL_CLAMP_TO_EDGE,
    };
    wrap as GLint
}

#[must_use]
pub fn mag_filter(filter: FilterMode) -> GLint {
    match filter {
        FilterMode::Nearest => GL_NEAREST as GLint,
        FilterMode::Linear => GL_LINEAR as GLint,
    }
}

#[must_use]
pub fn min_filter(filter: FilterMode, mipmap: MipmapMode) -> GLint {
    let value = match (filter, mipmap) {
        (FilterMode::Nearest, MipmapMode::None) => GL_NEAREST,
        (FilterMode::Linear, MipmapMode::None) => GL_LINEAR,
        (FilterMode::Nearest, MipmapMode::Nearest) => GL_NEAREST_MIPMAP_NEAREST,
        (FilterMode::Linear, MipmapMode::Nearest) => GL_LINEAR_MIPMAP_NEAREST,
        (FilterMode::Nearest, MipmapMode::Linear) => GL_NEAREST_MIPMAP_LINEAR,
        (FilterMode::Linear, MipmapMode::Linear) => GL_LINEAR_MIPMAP_LINEAR,
    };
    value as GLint
}
