use ultraviolet::Mat4;

use crate::blend_mode::BlendMode;
use crate::color::Color;
use crate::shader::ShaderProgram;
use crate::texture::Texture;
use crate::vertex_array::VertexArray;

/// Everything one draw call needs.
///
/// Built fresh for every draw by composing a drawable's own state onto the
/// target's ambient state, consumed immediately by
/// [`RenderTarget::draw_state`](crate::RenderTarget::draw_state), and never
/// retained across frames.
#[derive(Clone, Debug)]
pub struct RenderState {
    pub shader_program: ShaderProgram,
    /// Texture bound to unit 0. The empty texture is drawn through the
    /// target's 1x1 white fallback so untextured geometry renders with the
    /// plain tint color.
    pub texture: Texture,
    pub vertex_array: VertexArray,
    /// The accumulated model/view transformation.
    pub view: Mat4,
    /// The masking color, multiplied into every texel.
    pub color: Color,
    pub blend_mode: BlendMode,
}

impl Default for RenderState {
    fn default() -> Self {
        RenderState {
            shader_program: ShaderProgram::default(),
            texture: Texture::default(),
            vertex_array: VertexArray::default(),
            view: Mat4::identity(),
            color: Color::WHITE,
            blend_mode: BlendMode::ALPHA,
        }
    }
}
