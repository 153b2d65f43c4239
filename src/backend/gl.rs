//! [`Backend`] implemented over [`glow`].
//!
//! All GL calls happen here; the rest of the crate is GL-free. Raw ids are
//! the GL object names themselves, so conversion to glow's `NonZeroU32`
//! newtypes is a cast at the boundary.

use std::cell::Cell;
use std::num::NonZeroU32;

use glow::HasContext;

use crate::backend::{Backend, OffscreenTarget, RawId, ShaderStage, UniformValue};
use crate::blend_mode::{BlendEquation, BlendFactor, BlendMode};
use crate::color::Color;
use crate::error::Error;
use crate::texture::{TextureFilter, TextureOptions, TextureWrap};
use crate::vertex::VertexLayout;

pub struct GlBackend {
    gl: glow::Context,
    // Creating a resource binds it as a side effect; the last bindings the
    // core asked for are remembered so creation can restore them and keep
    // the render-state cache truthful.
    bound_texture: Cell<RawId>,
    bound_vertex_array: Cell<RawId>,
}

fn texture_id(id: RawId) -> Option<glow::NativeTexture> {
    NonZeroU32::new(id).map(glow::NativeTexture)
}

fn buffer_id(id: RawId) -> Option<glow::NativeBuffer> {
    NonZeroU32::new(id).map(glow::NativeBuffer)
}

fn vertex_array_id(id: RawId) -> Option<glow::NativeVertexArray> {
    NonZeroU32::new(id).map(glow::NativeVertexArray)
}

fn shader_id(id: RawId) -> Option<glow::NativeShader> {
    NonZeroU32::new(id).map(glow::NativeShader)
}

fn program_id(id: RawId) -> Option<glow::NativeProgram> {
    NonZeroU32::new(id).map(glow::NativeProgram)
}

fn framebuffer_id(id: RawId) -> Option<glow::NativeFramebuffer> {
    NonZeroU32::new(id).map(glow::NativeFramebuffer)
}

fn filter_to_gl(filter: TextureFilter) -> i32 {
    (match filter {
        TextureFilter::Nearest => glow::NEAREST,
        TextureFilter::Linear => glow::LINEAR,
        TextureFilter::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR,
    }) as i32
}

fn wrap_to_gl(wrap: TextureWrap) -> i32 {
    (match wrap {
        TextureWrap::ClampToEdge => glow::CLAMP_TO_EDGE,
        TextureWrap::Repeat => glow::REPEAT,
        TextureWrap::MirroredRepeat => glow::MIRRORED_REPEAT,
    }) as i32
}

fn equation_to_gl(equation: BlendEquation) -> u32 {
    match equation {
        BlendEquation::Add => glow::FUNC_ADD,
        BlendEquation::Subtract => glow::FUNC_SUBTRACT,
        BlendEquation::ReverseSubtract => glow::FUNC_REVERSE_SUBTRACT,
    }
}

fn factor_to_gl(factor: BlendFactor) -> u32 {
    match factor {
        BlendFactor::Zero => glow::ZERO,
        BlendFactor::One => glow::ONE,
        BlendFactor::SrcColor => glow::SRC_COLOR,
        BlendFactor::OneMinusSrcColor => glow::ONE_MINUS_SRC_COLOR,
        BlendFactor::DstColor => glow::DST_COLOR,
        BlendFactor::OneMinusDstColor => glow::ONE_MINUS_DST_COLOR,
        BlendFactor::SrcAlpha => glow::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => glow::ONE_MINUS_SRC_ALPHA,
        BlendFactor::DstAlpha => glow::DST_ALPHA,
        BlendFactor::OneMinusDstAlpha => glow::ONE_MINUS_DST_ALPHA,
    }
}

impl GlBackend {
    /// Wrap an already-current GL context.
    pub fn new(gl: glow::Context) -> Self {
        GlBackend {
            gl,
            bound_texture: Cell::new(0),
            bound_vertex_array: Cell::new(0),
        }
    }
}

impl Backend for GlBackend {
    fn create_texture(
        &self,
        width: i32,
        height: i32,
        pixels: Option<&[u8]>,
        options: &TextureOptions,
    ) -> RawId {
        let gl = &self.gl;
        unsafe {
            let Ok(texture) = gl.create_texture() else {
                return 0;
            };
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA8 as i32,
                width,
                height,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(pixels),
            );
            if options.generate_mipmap && pixels.is_some() {
                gl.generate_mipmap(glow::TEXTURE_2D);
            }
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                filter_to_gl(options.min_filter),
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                filter_to_gl(options.mag_filter),
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                wrap_to_gl(options.wrap_s),
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                wrap_to_gl(options.wrap_t),
            );
            gl.bind_texture(glow::TEXTURE_2D, texture_id(self.bound_texture.get()));
            texture.0.get()
        }
    }

    fn delete_texture(&self, id: RawId) {
        if let Some(texture) = texture_id(id) {
            unsafe { self.gl.delete_texture(texture) };
        }
    }

    fn bind_texture(&self, id: RawId, unit: u32) {
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(glow::TEXTURE_2D, texture_id(id));
        }
        if unit == 0 {
            self.bound_texture.set(id);
        }
    }

    fn create_vertex_array(&self, data: &[u8], layout: &VertexLayout) -> (RawId, RawId) {
        let gl = &self.gl;
        unsafe {
            let (Ok(vao), Ok(vbo)) = (gl.create_vertex_array(), gl.create_buffer()) else {
                return (0, 0);
            };
            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, data, glow::STATIC_DRAW);
            for attribute in layout.attributes {
                gl.enable_vertex_attrib_array(attribute.location);
                gl.vertex_attrib_pointer_f32(
                    attribute.location,
                    attribute.components,
                    glow::FLOAT,
                    false,
                    layout.stride,
                    attribute.offset,
                );
            }
            gl.bind_vertex_array(vertex_array_id(self.bound_vertex_array.get()));
            (vao.0.get(), vbo.0.get())
        }
    }

    fn delete_vertex_array(&self, vao: RawId, vbo: RawId) {
        unsafe {
            if let Some(vbo) = buffer_id(vbo) {
                self.gl.delete_buffer(vbo);
            }
            if let Some(vao) = vertex_array_id(vao) {
                self.gl.delete_vertex_array(vao);
            }
        }
    }

    fn bind_vertex_array(&self, vao: RawId) {
        unsafe { self.gl.bind_vertex_array(vertex_array_id(vao)) };
        self.bound_vertex_array.set(vao);
    }

    fn create_shader(&self, stage: ShaderStage, source: &str) -> Result<RawId, Error> {
        let gl = &self.gl;
        let gl_stage = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        unsafe {
            let shader = gl
                .create_shader(gl_stage)
                .map_err(|e| Error::resource("shader", e))?;
            gl.shader_source(shader, source);
            gl.compile_shader(shader);
            if gl.get_shader_compile_status(shader) {
                Ok(shader.0.get())
            } else {
                let log = gl.get_shader_info_log(shader);
                gl.delete_shader(shader);
                Err(Error::resource("shader", log))
            }
        }
    }

    fn delete_shader(&self, id: RawId) {
        if let Some(shader) = shader_id(id) {
            unsafe { self.gl.delete_shader(shader) };
        }
    }

    fn create_program(&self) -> RawId {
        unsafe {
            self.gl
                .create_program()
                .map(|program| program.0.get())
                .unwrap_or(0)
        }
    }

    fn attach_shader(&self, program: RawId, shader: RawId) {
        if let (Some(program), Some(shader)) = (program_id(program), shader_id(shader)) {
            unsafe { self.gl.attach_shader(program, shader) };
        }
    }

    fn link_program(&self, program: RawId) {
        if let Some(program) = program_id(program) {
            unsafe { self.gl.link_program(program) };
        }
    }

    fn link_status(&self, program: RawId) -> Result<(), String> {
        let Some(program) = program_id(program) else {
            return Err("null program".to_string());
        };
        unsafe {
            if self.gl.get_program_link_status(program) {
                Ok(())
            } else {
                Err(self.gl.get_program_info_log(program))
            }
        }
    }

    fn delete_program(&self, id: RawId) {
        if let Some(program) = program_id(id) {
            unsafe { self.gl.delete_program(program) };
        }
    }

    fn use_program(&self, id: RawId) {
        unsafe { self.gl.use_program(program_id(id)) };
    }

    fn uniform_location(&self, program: RawId, name: &str) -> Option<i32> {
        let program = program_id(program)?;
        unsafe {
            self.gl
                .get_uniform_location(program, name)
                .map(|location| location.0 as i32)
        }
    }

    fn set_uniform(&self, location: i32, value: &UniformValue) {
        if location < 0 {
            return;
        }
        let location = glow::NativeUniformLocation(location as u32);
        let location = Some(&location);
        let gl = &self.gl;
        unsafe {
            match value {
                UniformValue::Float(v) => gl.uniform_1_f32(location, *v),
                UniformValue::Int(v) => gl.uniform_1_i32(location, *v),
                UniformValue::Vec3(v) => {
                    gl.uniform_3_f32_slice(location, bytemuck::cast_ref::<_, [f32; 3]>(v))
                }
                UniformValue::Vec4(v) => {
                    gl.uniform_4_f32_slice(location, bytemuck::cast_ref::<_, [f32; 4]>(v))
                }
                UniformValue::Mat3(m) => gl.uniform_matrix_3_f32_slice(
                    location,
                    false,
                    bytemuck::cast_ref::<_, [f32; 9]>(m),
                ),
                UniformValue::Mat4(m) => gl.uniform_matrix_4_f32_slice(
                    location,
                    false,
                    bytemuck::cast_ref::<_, [f32; 16]>(m),
                ),
            }
        }
    }

    fn create_framebuffer(&self, width: i32, height: i32) -> Result<OffscreenTarget, Error> {
        let gl = &self.gl;
        let color_options = TextureOptions {
            min_filter: TextureFilter::Linear,
            mag_filter: TextureFilter::Linear,
            generate_mipmap: false,
            ..TextureOptions::default()
        };
        unsafe {
            let framebuffer = gl
                .create_framebuffer()
                .map_err(|e| Error::resource("framebuffer", e))?;
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));

            let color_texture = self.create_texture(width, height, None, &color_options);
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                texture_id(color_texture),
                0,
            );

            let render_buffer = gl
                .create_renderbuffer()
                .map_err(|e| Error::resource("framebuffer", e))?;
            gl.bind_renderbuffer(glow::RENDERBUFFER, Some(render_buffer));
            gl.renderbuffer_storage(glow::RENDERBUFFER, glow::DEPTH24_STENCIL8, width, height);
            gl.bind_renderbuffer(glow::RENDERBUFFER, None);
            gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                glow::DEPTH_STENCIL_ATTACHMENT,
                glow::RENDERBUFFER,
                Some(render_buffer),
            );

            let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            if status != glow::FRAMEBUFFER_COMPLETE {
                self.delete_texture(color_texture);
                gl.delete_renderbuffer(render_buffer);
                gl.delete_framebuffer(framebuffer);
                return Err(Error::resource(
                    "framebuffer",
                    format!("incomplete framebuffer (status {status:#x})"),
                ));
            }

            Ok(OffscreenTarget {
                framebuffer: framebuffer.0.get(),
                color_texture,
                render_buffer: render_buffer.0.get(),
            })
        }
    }

    fn delete_framebuffer(&self, framebuffer: RawId, render_buffer: RawId) {
        unsafe {
            if let Some(render_buffer) = NonZeroU32::new(render_buffer) {
                self.gl
                    .delete_renderbuffer(glow::NativeRenderbuffer(render_buffer));
            }
            if let Some(framebuffer) = framebuffer_id(framebuffer) {
                self.gl.delete_framebuffer(framebuffer);
            }
        }
    }

    fn bind_framebuffer(&self, framebuffer: RawId, width: i32, height: i32) {
        unsafe {
            self.gl
                .bind_framebuffer(glow::FRAMEBUFFER, framebuffer_id(framebuffer));
            self.gl.viewport(0, 0, width.max(1), height.max(1));
        }
    }

    fn clear(&self, color: Color) {
        let gl = &self.gl;
        unsafe {
            gl.clear_color(color.r, color.g, color.b, color.a);
            gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT | glow::STENCIL_BUFFER_BIT);
            gl.disable(glow::DEPTH_TEST);
            gl.disable(glow::CULL_FACE);
        }
    }

    fn set_depth_test(&self, enabled: bool) {
        unsafe {
            if enabled {
                self.gl.enable(glow::DEPTH_TEST);
            } else {
                self.gl.disable(glow::DEPTH_TEST);
            }
        }
    }

    fn apply_blend_mode(&self, mode: &BlendMode) {
        let gl = &self.gl;
        unsafe {
            gl.enable(glow::BLEND);
            gl.blend_equation_separate(
                equation_to_gl(mode.equation_rgb),
                equation_to_gl(mode.equation_alpha),
            );
            gl.blend_func_separate(
                factor_to_gl(mode.src_rgb),
                factor_to_gl(mode.dst_rgb),
                factor_to_gl(mode.src_alpha),
                factor_to_gl(mode.dst_alpha),
            );
        }
    }

    fn draw_triangles(&self, vertex_count: i32) {
        unsafe { self.gl.draw_arrays(glow::TRIANGLES, 0, vertex_count) };
    }
}
