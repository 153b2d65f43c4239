//! A backend that records every call instead of talking to a GPU.
//!
//! Tests use it to assert the contracts that matter: each created resource
//! is released exactly once, null handles never reach the backend, and the
//! render-state cache elides exactly the redundant calls.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::backend::{Backend, GpuContext, OffscreenTarget, RawId, ShaderStage, UniformValue};
use crate::blend_mode::BlendMode;
use crate::color::Color;
use crate::error::Error;
use crate::texture::TextureOptions;
use crate::vertex::VertexLayout;

#[derive(Default)]
pub(crate) struct RecordingBackend {
    next_id: Cell<RawId>,

    pub created_textures: Cell<u32>,
    pub deleted_textures: Cell<u32>,
    pub texture_binds: RefCell<Vec<RawId>>,

    pub created_vertex_arrays: Cell<u32>,
    pub deleted_vertex_arrays: Cell<u32>,
    pub vertex_array_binds: RefCell<Vec<RawId>>,
    /// Vertex data captured at upload, keyed by vbo id.
    pub buffer_data: RefCell<HashMap<RawId, Vec<u8>>>,

    pub created_shaders: Cell<u32>,
    pub deleted_shaders: Cell<u32>,
    /// When set, the next shader compilation fails with this log.
    pub fail_next_shader: RefCell<Option<String>>,

    pub created_programs: Cell<u32>,
    pub deleted_programs: Cell<u32>,
    pub program_binds: RefCell<Vec<RawId>>,
    /// Locations handed out per (program, uniform name).
    locations: RefCell<HashMap<(RawId, String), i32>>,
    next_location: Cell<i32>,
    pub location_lookups: RefCell<Vec<String>>,
    /// Every `set_uniform` call in order.
    pub uniform_sets: RefCell<Vec<(i32, UniformValue)>>,

    pub created_framebuffers: Cell<u32>,
    pub deleted_framebuffers: Cell<u32>,
    pub framebuffer_binds: RefCell<Vec<RawId>>,

    pub clears: RefCell<Vec<Color>>,
    pub blend_changes: RefCell<Vec<BlendMode>>,
    pub draw_calls: RefCell<Vec<i32>>,
}

impl RecordingBackend {
    pub fn new() -> Rc<Self> {
        Rc::new(RecordingBackend {
            next_id: Cell::new(1),
            next_location: Cell::new(1),
            ..RecordingBackend::default()
        })
    }

    pub fn gpu(self: &Rc<Self>) -> GpuContext {
        self.clone() as GpuContext
    }

    fn fresh_id(&self) -> RawId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    /// The location this backend assigned to a uniform, if it was looked up.
    pub fn location_of(&self, program: RawId, name: &str) -> Option<i32> {
        self.locations
            .borrow()
            .get(&(program, name.to_string()))
            .copied()
    }

    pub fn uniform_sets_at(&self, location: i32) -> usize {
        self.uniform_sets
            .borrow()
            .iter()
            .filter(|(l, _)| *l == location)
            .count()
    }

    pub fn last_uniform_at(&self, location: i32) -> Option<UniformValue> {
        self.uniform_sets
            .borrow()
            .iter()
            .rev()
            .find(|(l, _)| *l == location)
            .map(|(_, v)| *v)
    }

    /// `create - delete` for every resource kind; zero means no leaks.
    pub fn live_resources(&self) -> i64 {
        let created = self.created_textures.get()
            + self.created_vertex_arrays.get()
            + self.created_shaders.get()
            + self.created_programs.get()
            + self.created_framebuffers.get();
        let deleted = self.deleted_textures.get()
            + self.deleted_vertex_arrays.get()
            + self.deleted_shaders.get()
            + self.deleted_programs.get()
            + self.deleted_framebuffers.get();
        i64::from(created) - i64::from(deleted)
    }
}

impl Backend for RecordingBackend {
    fn create_texture(
        &self,
        _width: i32,
        _height: i32,
        _pixels: Option<&[u8]>,
        _options: &TextureOptions,
    ) -> RawId {
        self.created_textures.set(self.created_textures.get() + 1);
        self.fresh_id()
    }

    fn delete_texture(&self, _id: RawId) {
        self.deleted_textures.set(self.deleted_textures.get() + 1);
    }

    fn bind_texture(&self, id: RawId, _unit: u32) {
        self.texture_binds.borrow_mut().push(id);
    }

    fn create_vertex_array(&self, data: &[u8], _layout: &VertexLayout) -> (RawId, RawId) {
        self.created_vertex_arrays
            .set(self.created_vertex_arrays.get() + 1);
        let vao = self.fresh_id();
        let vbo = self.fresh_id();
        self.buffer_data.borrow_mut().insert(vbo, data.to_vec());
        (vao, vbo)
    }

    fn delete_vertex_array(&self, _vao: RawId, vbo: RawId) {
        self.deleted_vertex_arrays
            .set(self.deleted_vertex_arrays.get() + 1);
        self.buffer_data.borrow_mut().remove(&vbo);
    }

    fn bind_vertex_array(&self, vao: RawId) {
        self.vertex_array_binds.borrow_mut().push(vao);
    }

    fn create_shader(&self, _stage: ShaderStage, _source: &str) -> Result<RawId, Error> {
        if let Some(log) = self.fail_next_shader.borrow_mut().take() {
            return Err(Error::resource("shader", log));
        }
        self.created_shaders.set(self.created_shaders.get() + 1);
        Ok(self.fresh_id())
    }

    fn delete_shader(&self, _id: RawId) {
        self.deleted_shaders.set(self.deleted_shaders.get() + 1);
    }

    fn create_program(&self) -> RawId {
        self.created_programs.set(self.created_programs.get() + 1);
        self.fresh_id()
    }

    fn attach_shader(&self, _program: RawId, _shader: RawId) {}

    fn link_program(&self, _program: RawId) {}

    fn link_status(&self, _program: RawId) -> Result<(), String> {
        Ok(())
    }

    fn delete_program(&self, _id: RawId) {
        self.deleted_programs.set(self.deleted_programs.get() + 1);
    }

    fn use_program(&self, id: RawId) {
        self.program_binds.borrow_mut().push(id);
    }

    fn uniform_location(&self, program: RawId, name: &str) -> Option<i32> {
        if name.starts_with("unknown_") {
            return None;
        }
        self.location_lookups.borrow_mut().push(name.to_string());
        let mut locations = self.locations.borrow_mut();
        let location = *locations
            .entry((program, name.to_string()))
            .or_insert_with(|| {
                let location = self.next_location.get();
                self.next_location.set(location + 1);
                location
            });
        Some(location)
    }

    fn set_uniform(&self, location: i32, value: &UniformValue) {
        if location < 0 {
            return;
        }
        self.uniform_sets.borrow_mut().push((location, *value));
    }

    fn create_framebuffer(&self, width: i32, height: i32) -> Result<OffscreenTarget, Error> {
        self.created_framebuffers
            .set(self.created_framebuffers.get() + 1);
        let color_texture =
            self.create_texture(width, height, None, &TextureOptions::default());
        Ok(OffscreenTarget {
            framebuffer: self.fresh_id(),
            color_texture,
            render_buffer: self.fresh_id(),
        })
    }

    fn delete_framebuffer(&self, _framebuffer: RawId, _render_buffer: RawId) {
        self.deleted_framebuffers
            .set(self.deleted_framebuffers.get() + 1);
    }

    fn bind_framebuffer(&self, framebuffer: RawId, _width: i32, _height: i32) {
        self.framebuffer_binds.borrow_mut().push(framebuffer);
    }

    fn clear(&self, color: Color) {
        self.clears.borrow_mut().push(color);
    }

    fn set_depth_test(&self, _enabled: bool) {}

    fn apply_blend_mode(&self, mode: &BlendMode) {
        self.blend_changes.borrow_mut().push(*mode);
    }

    fn draw_triangles(&self, vertex_count: i32) {
        self.draw_calls.borrow_mut().push(vertex_count);
    }
}
