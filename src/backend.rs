//! The OpenGL-class context behind every GPU handle and render target.
//!
//! The toolkit never issues GL calls directly; everything goes through
//! [`Backend`], held as an `Rc<dyn Backend>` that is threaded explicitly
//! through constructors and targets. The production implementation is
//! [`gl::GlBackend`]; tests substitute a recording mock.

use std::rc::Rc;

use ultraviolet::{Mat3, Mat4, Vec3, Vec4};

use crate::blend_mode::BlendMode;
use crate::color::Color;
use crate::error::Error;
use crate::texture::TextureOptions;
use crate::vertex::VertexLayout;

pub mod gl;
#[cfg(test)]
pub(crate) mod recording;

/// A raw backend object name. `0` is the null sentinel: it never refers to a
/// live resource and binding or deleting it is a no-op by GL convention.
pub type RawId = u32;

/// Shared handle to the active backend context.
pub type GpuContext = Rc<dyn Backend>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// A value assignable to a shader uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<Mat3> for UniformValue {
    fn from(v: Mat3) -> Self {
        UniformValue::Mat3(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        UniformValue::Mat4(v)
    }
}

impl From<Color> for UniformValue {
    fn from(c: Color) -> Self {
        UniformValue::Vec4(c.into())
    }
}

/// The pieces of an off-screen target allocated in one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffscreenTarget {
    pub framebuffer: RawId,
    pub color_texture: RawId,
    pub render_buffer: RawId,
}

/// The GPU calls the render core consumes.
///
/// All methods take `&self`; the context is single-threaded and interior
/// mutability is an implementation concern. None of the per-draw methods
/// report errors — backend-level failures in the hot path are deliberately
/// unchecked.
pub trait Backend {
    // Textures.
    fn create_texture(
        &self,
        width: i32,
        height: i32,
        pixels: Option<&[u8]>,
        options: &TextureOptions,
    ) -> RawId;
    fn delete_texture(&self, id: RawId);
    /// Bind `id` to the given texture unit.
    fn bind_texture(&self, id: RawId, unit: u32);

    // Vertex arrays. Created as a VAO/VBO pair over interleaved vertex data.
    fn create_vertex_array(&self, data: &[u8], layout: &VertexLayout) -> (RawId, RawId);
    fn delete_vertex_array(&self, vao: RawId, vbo: RawId);
    fn bind_vertex_array(&self, vao: RawId);

    // Shaders and programs. Compilation is synchronous; the returned error
    // carries the compiler log.
    fn create_shader(&self, stage: ShaderStage, source: &str) -> Result<RawId, Error>;
    fn delete_shader(&self, id: RawId);
    fn create_program(&self) -> RawId;
    fn attach_shader(&self, program: RawId, shader: RawId);
    fn link_program(&self, program: RawId);
    fn link_status(&self, program: RawId) -> Result<(), String>;
    fn delete_program(&self, id: RawId);
    fn use_program(&self, id: RawId);
    /// Resolve a uniform name in a linked program.
    fn uniform_location(&self, program: RawId, name: &str) -> Option<i32>;
    /// Set a uniform of the currently active program. Negative locations are
    /// ignored.
    fn set_uniform(&self, location: i32, value: &UniformValue);

    // Framebuffers.
    fn create_framebuffer(&self, width: i32, height: i32) -> Result<OffscreenTarget, Error>;
    fn delete_framebuffer(&self, framebuffer: RawId, render_buffer: RawId);
    /// Make `framebuffer` the draw target and size the viewport to it.
    /// `framebuffer == 0` selects the on-screen surface.
    fn bind_framebuffer(&self, framebuffer: RawId, width: i32, height: i32);

    // Frame operations.
    /// Clear color, depth and stencil, and reset to the 2D-first defaults
    /// (depth test and face culling off).
    fn clear(&self, color: Color);
    fn set_depth_test(&self, enabled: bool);
    fn apply_blend_mode(&self, mode: &BlendMode);
    /// Issue a triangle-list draw of `vertex_count` vertices from the bound
    /// vertex array.
    fn draw_triangles(&self, vertex_count: i32);
}
