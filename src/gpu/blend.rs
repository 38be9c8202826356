//! Blend formulas.
//!
//! A [`BlendFormula`] is fixed when a pipeline is created. The GL backend translates it
//! to native factor/equation enums once, so draw-time activation is a table lookup.

/// Multiplier applied to a source or destination color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    Src,
    OneMinusSrc,
    Dst,
    OneMinusDst,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    ConstantColor,
    OneMinusConstantColor,
    SrcAlphaSaturated,
}

/// How the weighted source and destination are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOperation {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

/// One factor pair plus equation, applied to a color or alpha channel group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendComponent {
    pub src_factor: BlendFactor,
    pub dst_factor: BlendFactor,
    pub operation: BlendOperation,
}

impl BlendComponent {
    /// Source replaces destination.
    pub const REPLACE: Self = Self {
        src_factor: BlendFactor::One,
        dst_factor: BlendFactor::Zero,
        operation: BlendOperation::Add,
    };

    /// Premultiplied source-over.
    pub const SRC_OVER: Self = Self {
        src_factor: BlendFactor::One,
        dst_factor: BlendFactor::OneMinusSrcAlpha,
        operation: BlendOperation::Add,
    };

    /// `src * 1 + dst * 0` with an additive or subtractive equation.
    #[inline]
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.src_factor == BlendFactor::One
            && self.dst_factor == BlendFactor::Zero
            && matches!(self.operation, BlendOperation::Add | BlendOperation::Subtract)
    }
}

/// Full blend state of a color target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendFormula {
    pub color: BlendComponent,
    pub alpha: BlendComponent,
}

impl BlendFormula {
    pub const REPLACE: Self = Self {
        color: BlendComponent::REPLACE,
        alpha: BlendComponent::REPLACE,
    };

    pub const SRC_OVER: Self = Self {
        color: BlendComponent::SRC_OVER,
        alpha: BlendComponent::SRC_OVER,
    };

    /// Same factors and equation for color and alpha.
    #[must_use]
    pub const fn uniform(src_factor: BlendFactor, dst_factor: BlendFactor, operation: BlendOperation) -> Self {
        let component = BlendComponent {
            src_factor,
            dst_factor,
            operation,
        };
        Self {
            color: component,
            alpha: component,
        }
    }

    /// The fully opaque path: blending can stay disabled.
    #[inline]
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.color.is_identity() && self.alpha.is_identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_is_identity() {
        assert!(BlendFormula::REPLACE.is_identity());
    }

    #[test]
    fn subtractive_one_zero_is_identity() {
        let formula = BlendFormula::uniform(BlendFactor::One, BlendFactor::Zero, BlendOperation::Subtract);
        assert!(formula.is_identity());
    }

    #[test]
    fn src_over_is_not_identity() {
        assert!(!BlendFormula::SRC_OVER.is_identity());
    }

    #[test]
    fn reverse_subtract_is_not_identity() {
        let formula =
            BlendFormula::uniform(BlendFactor::One, BlendFactor::Zero, BlendOperation::ReverseSubtract);
        assert!(!formula.is_identity());
    }

    #[test]
    fn identity_requires_both_components() {
        let formula = BlendFormula {
            color: BlendComponent::REPLACE,
            alpha: BlendComponent::SRC_OVER,
        };
        assert!(!formula.is_identity());
    }
}
