/// Blend equation applied per channel group. See `glBlendEquationSeparate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendEquation {
    Add,
    Subtract,
    ReverseSubtract,
}

/// Blend factor. See `glBlendFuncSeparate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

/// How a drawn fragment is combined with the destination pixel:
/// `dst = equation(src * src_factor, dst * dst_factor)`, computed separately
/// for the RGB and alpha channels.
///
/// The default is [`BlendMode::ALPHA`], straight-alpha compositing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendMode {
    pub equation_rgb: BlendEquation,
    pub equation_alpha: BlendEquation,
    pub src_rgb: BlendFactor,
    pub dst_rgb: BlendFactor,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
}

impl BlendMode {
    /// `dst = src`
    pub const REPLACE: BlendMode = BlendMode::uniform(
        BlendEquation::Add,
        BlendFactor::One,
        BlendFactor::Zero,
        BlendFactor::One,
        BlendFactor::Zero,
    );

    /// `dst += src`
    pub const ADD: BlendMode = BlendMode::uniform(
        BlendEquation::Add,
        BlendFactor::SrcAlpha,
        BlendFactor::One,
        BlendFactor::One,
        BlendFactor::One,
    );

    /// `dst -= src`
    pub const SUBTRACT: BlendMode = BlendMode::uniform(
        BlendEquation::ReverseSubtract,
        BlendFactor::One,
        BlendFactor::One,
        BlendFactor::One,
        BlendFactor::One,
    );

    /// `dst = src * a + dst * (1 - a)`
    pub const ALPHA: BlendMode = BlendMode::uniform(
        BlendEquation::Add,
        BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha,
        BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha,
    );

    /// `dst *= src`
    pub const MULTIPLY: BlendMode = BlendMode::uniform(
        BlendEquation::Add,
        BlendFactor::DstColor,
        BlendFactor::Zero,
        BlendFactor::DstAlpha,
        BlendFactor::Zero,
    );

    /// `dst = 1 - dst`
    pub const INVERT: BlendMode = BlendMode {
        equation_rgb: BlendEquation::Add,
        equation_alpha: BlendEquation::Add,
        src_rgb: BlendFactor::OneMinusDstColor,
        dst_rgb: BlendFactor::Zero,
        src_alpha: BlendFactor::OneMinusSrcAlpha,
        dst_alpha: BlendFactor::Zero,
    };

    const fn uniform(
        equation: BlendEquation,
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    ) -> BlendMode {
        BlendMode {
            equation_rgb: equation,
            equation_alpha: equation,
            src_rgb,
            dst_rgb,
            src_alpha,
            dst_alpha,
        }
    }
}

impl Default for BlendMode {
    fn default() -> Self {
        BlendMode::ALPHA
    }
}
