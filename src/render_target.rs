use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ultraviolet::{Mat4, Vec4};

use crate::backend::{GpuContext, RawId};
use crate::blend_mode::BlendMode;
use crate::color::Color;
use crate::drawable::Drawable;
use crate::error::Error;
use crate::render_state::RenderState;
use crate::shader::ShaderProgram;
use crate::texture::Texture;
use crate::vertex_array::VertexArray;
use crate::view::View;

const VERTEX_SHADER_2D: &str = r"
    layout(location = 0) in vec2 space_position;
    layout(location = 1) in vec2 texture_position;

    uniform mat4 projection;
    uniform mat4 view;

    out vec2 f_texture_position;

    void main() {
      f_texture_position = texture_position;
      gl_Position = projection * view * vec4(space_position, 0.0, 1.0);
    }
";

const FRAGMENT_SHADER_2D: &str = r"
    in vec2 f_texture_position;
    uniform sampler2D texture_0;
    uniform vec4 color;
    out vec4 out_color;

    void main() {
      out_color = texture(texture_0, f_texture_position) * color;
    }
";

const VERTEX_SHADER_3D: &str = r"
    layout(location = 0) in vec3 space_position;
    layout(location = 1) in vec3 normal;
    layout(location = 2) in vec2 texture_position;

    uniform mat4 projection;
    uniform mat4 view;

    out vec4 f_position;
    out vec2 f_texture;
    out vec3 f_normal;

    void main() {
      f_texture = texture_position;
      f_position = view * vec4(space_position, 1.0);
      f_normal = vec3(view * vec4(normal, 0.0));

      gl_Position = projection * f_position;
    }
";

const FRAGMENT_SHADER_3D: &str = r"
    uniform sampler2D texture_0;
    uniform vec4 color;

    uniform vec4 light_position;
    uniform float ambient;
    uniform float diffuse;
    uniform float specular;
    uniform float specular_power;

    in vec4 f_position;
    in vec2 f_texture;
    in vec3 f_normal;

    out vec4 out_color;

    void main() {
      vec3 object_dir = -normalize(f_position.xyz);
      vec3 normal_dir = normalize(f_normal);
      vec3 light_dir = normalize(light_position.xyz - f_position.xyz);
      vec3 reflect_dir = -reflect(object_dir, normal_dir);

      float diffuse_strength = max(0.0, dot(normal_dir, light_dir));
      float specular_strength = pow(max(0.0, dot(reflect_dir, light_dir)),
                                    specular_power);

      out_color = texture(texture_0, f_texture);
      out_color.rgb *= ambient +
                       diffuse * diffuse_strength +
                       specular * specular_strength;
      out_color *= color;
    }
";

/// Which render target currently owns the GL context, plus the context-wide
/// white fallback texture. One instance is shared by every target created
/// for the same context.
pub(crate) struct ContextBinding {
    current_target: Cell<u64>,
    next_target_id: Cell<u64>,
    white_texture: RefCell<Texture>,
}

impl ContextBinding {
    pub(crate) fn new() -> Rc<ContextBinding> {
        Rc::new(ContextBinding {
            current_target: Cell::new(0),
            next_target_id: Cell::new(1),
            white_texture: RefCell::new(Texture::default()),
        })
    }

    fn allocate_target_id(&self) -> u64 {
        let id = self.next_target_id.get();
        self.next_target_id.set(id + 1);
        id
    }

    /// Forget which target is bound. Called whenever something else touched
    /// the GL framebuffer binding (framebuffer creation, surface resize).
    pub(crate) fn forget_bound_target(&self) {
        self.current_target.set(0);
    }

    /// The 1x1 opaque-white fallback texture, created on first use and kept
    /// for the lifetime of the context.
    fn white_texture(&self, gpu: &GpuContext) -> Texture {
        let mut white = self.white_texture.borrow_mut();
        if white.is_empty() {
            *white = Texture::from_pixels(gpu, &[255, 255, 255, 255], 1, 1)
                .unwrap_or_default();
        }
        white.clone()
    }
}

/// The target's memo of the last state actually submitted to the backend.
/// `None`/empty fields are the "nothing submitted yet" sentinels.
#[derive(Default)]
struct CachedRenderState {
    shader_program: ShaderProgram,
    texture: Texture,
    vertex_array: VertexArray,
    color: Option<Color>,
    blend_mode: Option<BlendMode>,
}

impl CachedRenderState {
    fn invalidate(&mut self) {
        *self = CachedRenderState::default();
    }
}

/// A surface that drawables are drawn onto: the window's surface or an
/// off-screen [`Framebuffer`](crate::Framebuffer).
///
/// The target owns the projection derived from its [`View`], the two
/// built-in shader programs, and a cached render state used to skip
/// redundant backend calls. Only one target is bound to the context at a
/// time; targets bind themselves lazily before clearing or drawing and
/// invalidate their cache whenever the binding changed in between.
pub struct RenderTarget {
    gpu: GpuContext,
    binding: Rc<ContextBinding>,
    target_id: u64,
    framebuffer: RawId,
    width: i32,
    height: i32,
    view: View,
    projection: Mat4,
    shader_program_2d: ShaderProgram,
    shader_program_3d: ShaderProgram,
    shader_program: ShaderProgram,
    cache: CachedRenderState,
}

impl RenderTarget {
    /// Build a target over `framebuffer` (`0` = the on-screen surface) and
    /// compile the built-in shader programs. Failure to build either
    /// program is fatal: no rendering is possible without them.
    pub(crate) fn new(
        gpu: GpuContext,
        binding: Rc<ContextBinding>,
        framebuffer: RawId,
        width: i32,
        height: i32,
    ) -> Result<RenderTarget, Error> {
        let shader_program_2d =
            ShaderProgram::from_sources(&gpu, VERTEX_SHADER_2D, FRAGMENT_SHADER_2D)?;
        let shader_program_3d =
            ShaderProgram::from_sources(&gpu, VERTEX_SHADER_3D, FRAGMENT_SHADER_3D)?;

        shader_program_3d.activate();
        shader_program_3d.set_uniform("light_position", Vec4::new(0.0, 5.0, 0.0, 1.0));
        shader_program_3d.set_uniform("ambient", 0.3f32);
        shader_program_3d.set_uniform("diffuse", 0.5f32);
        shader_program_3d.set_uniform("specular", 0.5f32);
        shader_program_3d.set_uniform("specular_power", 4.0f32);

        let mut view = View::default();
        view.set_center(width as f32 / 2.0, height as f32 / 2.0);
        view.set_size(width as f32, height as f32);

        let mut target = RenderTarget {
            target_id: binding.allocate_target_id(),
            gpu,
            binding,
            framebuffer,
            width,
            height,
            view: View::default(),
            projection: Mat4::identity(),
            shader_program: ShaderProgram::default(),
            shader_program_2d,
            shader_program_3d,
            cache: CachedRenderState::default(),
        };
        target.set_view(view);
        target.set_shader_program(target.shader_program_2d.clone());
        Ok(target)
    }

    /// The backend context this target draws through, for creating
    /// textures, vertex arrays and shaders.
    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    pub(crate) fn binding(&self) -> &Rc<ContextBinding> {
        &self.binding
    }

    pub(crate) fn framebuffer_id(&self) -> RawId {
        self.framebuffer
    }

    /// Make this target current. Re-binding after another target was
    /// current invalidates the cached render state: the backend's state no
    /// longer matches this target's memo.
    fn bind(&mut self) {
        if self.binding.current_target.get() == self.target_id {
            return;
        }
        self.binding.current_target.set(self.target_id);
        self.gpu
            .bind_framebuffer(self.framebuffer, self.width, self.height);
        self.cache.invalidate();
    }

    /// Clear the whole surface with an opaque color, and reset to the
    /// 2D-first defaults (depth test and face culling disabled).
    pub fn clear(&mut self, color: Color) {
        self.bind();
        self.gpu.clear(color);
    }

    /// Enable or disable the depth test, for 3D scenes. [`clear`](Self::clear)
    /// disables it again.
    pub fn set_depth_test(&mut self, enabled: bool) {
        self.bind();
        self.gpu.set_depth_test(enabled);
    }

    /// Set the view: the rectangle of scene coordinates mapped onto the
    /// target. Pixel origin is the top-left corner, so the Y axis is
    /// flipped relative to clip space. The default view is centered at the
    /// target's half-dimensions with the target's size — the identity
    /// pixel-to-clip mapping.
    pub fn set_view(&mut self, view: View) {
        self.view = view;
        let scale_x = 2.0 / view.size().x; // [0, width]  -> [-1, 1]
        let scale_y = -2.0 / view.size().y; // [0, height] -> [+1, -1]
        let translate_x = -view.center().x * scale_x;
        let translate_y = -view.center().y * scale_y;
        self.set_view_matrix(Mat4::new(
            Vec4::new(scale_x, 0.0, 0.0, 0.0),
            Vec4::new(0.0, scale_y, 0.0, 0.0),
            Vec4::new(0.0, 0.0, 1.0, 0.0),
            Vec4::new(translate_x, translate_y, 0.0, 1.0),
        ));
    }

    /// Set the projection matrix directly.
    pub fn set_view_matrix(&mut self, projection: Mat4) {
        self.projection = projection;
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub(crate) fn projection(&self) -> Mat4 {
        self.projection
    }

    /// Select the shader program used for subsequent draws and initialize
    /// its conventional uniforms.
    pub fn set_shader_program(&mut self, shader_program: ShaderProgram) {
        self.shader_program = shader_program;
        self.shader_program.activate();
        self.shader_program.set_uniform("texture_0", 0);
        self.shader_program.set_uniform("color", Color::WHITE);
        self.shader_program.set_uniform("projection", Mat4::identity());
        self.shader_program.set_uniform("view", Mat4::identity());
    }

    /// The built-in textured-quad 2D program, selected by default.
    pub fn shader_program_2d(&self) -> &ShaderProgram {
        &self.shader_program_2d
    }

    /// The built-in Phong-lit 3D program.
    pub fn shader_program_3d(&self) -> &ShaderProgram {
        &self.shader_program_3d
    }

    /// Draw a drawable with this target's ambient state: the selected
    /// program, identity view, opaque white color, no texture, alpha
    /// blending.
    pub fn draw(&mut self, drawable: &dyn Drawable) {
        self.bind();
        let state = RenderState {
            shader_program: self.shader_program.clone(),
            ..RenderState::default()
        };
        drawable.draw(self, state);
    }

    /// Submit one draw call, eliding backend calls that would not change
    /// its state.
    ///
    /// Vertex array, shader program, color and blend mode are compared
    /// against the cached state by id/identity and skipped when unchanged.
    /// The `projection` and `view` uniforms are deliberately never cached:
    /// they vary per draw in practice, and caching them has historically
    /// introduced staleness bugs for no measurable win. Backend errors are
    /// not checked on this path.
    pub fn draw_state(&mut self, state: RenderState) {
        self.bind();

        // Vertex array.
        if state.vertex_array != self.cache.vertex_array {
            self.cache.vertex_array = state.vertex_array.clone();
            state.vertex_array.bind();
        }

        // Shader program.
        if state.shader_program != self.cache.shader_program {
            self.cache.shader_program = state.shader_program.clone();
            state.shader_program.activate();
        }

        // Color.
        if self.cache.color != Some(state.color) {
            self.cache.color = Some(state.color);
            state.shader_program.set_uniform("color", state.color);
        }

        // Projection and view, every draw.
        state.shader_program.set_uniform("projection", self.projection);
        state.shader_program.set_uniform("view", state.view);

        // Texture, falling back to the white texture so the one program
        // renders untextured geometry too (modulation against white is the
        // identity).
        let texture = if state.texture.is_empty() {
            self.binding.white_texture(&self.gpu)
        } else {
            state.texture.clone()
        };
        if texture != self.cache.texture {
            texture.bind(0);
            self.cache.texture = texture;
        }

        // Blend mode.
        if self.cache.blend_mode != Some(state.blend_mode) {
            self.cache.blend_mode = Some(state.blend_mode);
            self.gpu.apply_blend_mode(&state.blend_mode);
        }

        self.gpu.draw_triangles(state.vertex_array.size() as i32);
    }

    /// Resize the drawing area, in pixels. The view is left untouched.
    pub(crate) fn resize(&mut self, width: i32, height: i32) {
        self.width = width;
        self.height = height;
        self.binding.forget_bound_target();
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// The dimensions (width, height) of the drawing area in pixels.
    pub fn dimensions(&self) -> (i32, i32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::RecordingBackend;
    use crate::drawable::Transformable;
    use crate::vertex::Vertex2d;

    fn target(backend: &Rc<RecordingBackend>) -> RenderTarget {
        RenderTarget::new(backend.gpu(), ContextBinding::new(), 0, 800, 600).unwrap()
    }

    fn quad(gpu: &GpuContext) -> VertexArray {
        VertexArray::from_vertices(
            gpu,
            &[
                Vertex2d::new([0.0, 0.0], [0.0, 0.0]),
                Vertex2d::new([1.0, 0.0], [1.0, 0.0]),
                Vertex2d::new([1.0, 1.0], [1.0, 1.0]),
                Vertex2d::new([0.0, 0.0], [0.0, 0.0]),
                Vertex2d::new([1.0, 1.0], [1.0, 1.0]),
                Vertex2d::new([0.0, 1.0], [0.0, 1.0]),
            ],
        )
    }

    fn state_for(target: &RenderTarget, vertex_array: &VertexArray) -> RenderState {
        RenderState {
            shader_program: target.shader_program_2d().clone(),
            vertex_array: vertex_array.clone(),
            ..RenderState::default()
        }
    }

    #[test]
    fn identical_states_bind_once_but_set_view_every_draw() {
        let backend = RecordingBackend::new();
        let mut target = target(&backend);
        let vertex_array = quad(target.gpu());
        let texture =
            Texture::from_pixels(target.gpu(), &[0, 0, 0, 255], 1, 1).unwrap();

        let baseline_vao_binds = backend.vertex_array_binds.borrow().len();
        let baseline_program_binds = backend.program_binds.borrow().len();
        let baseline_texture_binds = backend.texture_binds.borrow().len();
        let baseline_blend_changes = backend.blend_changes.borrow().len();

        let mut first = state_for(&target, &vertex_array);
        first.texture = texture.clone();
        let mut second = first.clone();
        second.view = Mat4::from_translation(ultraviolet::Vec3::new(5.0, 0.0, 0.0));

        target.draw_state(first);
        target.draw_state(second);

        assert_eq!(
            backend.vertex_array_binds.borrow().len() - baseline_vao_binds,
            1
        );
        assert_eq!(
            backend.program_binds.borrow().len() - baseline_program_binds,
            1
        );
        assert_eq!(
            backend.texture_binds.borrow().len() - baseline_texture_binds,
            1
        );
        assert_eq!(
            backend.blend_changes.borrow().len() - baseline_blend_changes,
            1
        );
        assert_eq!(backend.draw_calls.borrow().len(), 2);

        // projection and view are set on both draws, uncached.
        let program = target.shader_program_2d().id();
        let view_location = backend.location_of(program, "view").unwrap();
        let projection_location = backend.location_of(program, "projection").unwrap();
        assert_eq!(backend.uniform_sets_at(view_location), 1 + 2);
        assert_eq!(backend.uniform_sets_at(projection_location), 1 + 2);
    }

    #[test]
    fn changed_color_is_reapplied_and_cached() {
        let backend = RecordingBackend::new();
        let mut target = target(&backend);
        let vertex_array = quad(target.gpu());
        let program = target.shader_program_2d().id();
        let color_location = backend.location_of(program, "color").unwrap();

        let baseline = backend.uniform_sets_at(color_location);

        let mut state = state_for(&target, &vertex_array);
        state.color = Color::RED;
        target.draw_state(state.clone());
        target.draw_state(state.clone());
        state.color = Color::GREEN;
        target.draw_state(state);

        assert_eq!(backend.uniform_sets_at(color_location) - baseline, 2);
    }

    #[test]
    fn empty_texture_draws_through_the_white_fallback() {
        let backend = RecordingBackend::new();
        let mut target = target(&backend);
        let vertex_array = quad(target.gpu());

        target.draw_state(state_for(&target, &vertex_array));
        let white_id = *backend.texture_binds.borrow().last().unwrap();
        assert_ne!(white_id, 0, "a real texture must be bound");

        // Re-drawing with no texture binds nothing new: the fallback is
        // cached like any other texture.
        target.draw_state(state_for(&target, &vertex_array));
        assert_eq!(
            backend
                .texture_binds
                .borrow()
                .iter()
                .filter(|id| **id == white_id)
                .count(),
            1
        );

        // The fallback is created once, process-lifetime of the context.
        let textures_created = backend.created_textures.get();
        target.draw_state(state_for(&target, &vertex_array));
        assert_eq!(backend.created_textures.get(), textures_created);
    }

    #[test]
    fn default_view_maps_pixels_to_clip_space_with_y_flip() {
        let backend = RecordingBackend::new();
        let target = target(&backend);

        let project = |x: f32, y: f32| {
            let v = target.projection() * Vec4::new(x, y, 0.0, 1.0);
            (v.x, v.y)
        };

        let (x, y) = project(0.0, 0.0);
        assert!((x + 1.0).abs() < 1e-6);
        assert!((y - 1.0).abs() < 1e-6);

        let (x, y) = project(800.0, 600.0);
        assert!((x - 1.0).abs() < 1e-6);
        assert!((y + 1.0).abs() < 1e-6);

        let (x, y) = project(400.0, 300.0);
        assert!(x.abs() < 1e-6);
        assert!(y.abs() < 1e-6);
    }

    #[test]
    fn interleaved_targets_rebind_and_invalidate() {
        let backend = RecordingBackend::new();
        let binding = ContextBinding::new();
        let mut window =
            RenderTarget::new(backend.gpu(), binding.clone(), 0, 800, 600).unwrap();
        let mut offscreen =
            RenderTarget::new(backend.gpu(), binding, 7, 256, 256).unwrap();
        let vertex_array = quad(window.gpu());

        window.draw_state(state_for(&window, &vertex_array));
        offscreen.draw_state(state_for(&offscreen, &vertex_array));
        window.draw_state(state_for(&window, &vertex_array));

        // Every swap re-binds the framebuffer and re-submits the vertex
        // array: the cache cannot survive a context swap.
        assert_eq!(
            backend.framebuffer_binds.borrow().as_slice(),
            &[0, 7, 0],
            "framebuffer re-bound on each swap"
        );
        assert_eq!(
            backend
                .vertex_array_binds
                .borrow()
                .iter()
                .filter(|id| **id == vertex_array_vao(&backend, &vertex_array))
                .count(),
            3
        );

        // Without a swap the second draw hits the cache.
        window.draw_state(state_for(&window, &vertex_array));
        assert_eq!(backend.framebuffer_binds.borrow().len(), 3);
    }

    fn vertex_array_vao(backend: &RecordingBackend, array: &VertexArray) -> RawId {
        // The recording backend allocates vao then vbo consecutively.
        let _ = backend;
        array.id() - 1
    }

    #[test]
    fn drawables_compose_onto_the_ambient_state() {
        let backend = RecordingBackend::new();
        let mut target = target(&backend);
        let vertex_array = quad(target.gpu());

        let mut object = Transformable::new();
        object.set_position(10.0, 20.0);
        object.set_color(Color::rgba(0.5, 1.0, 1.0, 1.0));
        object.set_vertex_array(vertex_array);
        target.draw(&object);

        let program = target.shader_program_2d().id();
        let view_location = backend.location_of(program, "view").unwrap();
        let color_location = backend.location_of(program, "color").unwrap();

        // The view uniform carries the object transformation (ambient view
        // is the identity).
        match backend.last_uniform_at(view_location) {
            Some(crate::backend::UniformValue::Mat4(m)) => {
                let p = m * Vec4::new(0.0, 0.0, 0.0, 1.0);
                assert!((p.x - 10.0).abs() < 1e-5);
                assert!((p.y - 20.0).abs() < 1e-5);
            }
            other => panic!("expected a mat4 view uniform, got {other:?}"),
        }

        // Ambient white times the object tint is the object tint.
        match backend.last_uniform_at(color_location) {
            Some(crate::backend::UniformValue::Vec4(c)) => {
                assert!((c.x - 0.5).abs() < 1e-6);
                assert_eq!(c.w, 1.0);
            }
            other => panic!("expected a vec4 color uniform, got {other:?}"),
        }

        assert_eq!(backend.draw_calls.borrow().last(), Some(&6));
    }

    #[test]
    fn teardown_releases_every_resource() {
        let backend = RecordingBackend::new();
        {
            let binding = ContextBinding::new();
            let mut window =
                RenderTarget::new(backend.gpu(), binding, 0, 320, 240).unwrap();
            let framebuffer = crate::Framebuffer::new(&window, 64, 64).unwrap();
            let sprite = crate::Sprite::from_framebuffer(&framebuffer);
            window.draw(&sprite);
        }
        // Shaders, programs, vertex arrays, textures, framebuffers: every
        // create has exactly one matching delete once the last owner is
        // gone — including the ones parked in the render-state cache.
        assert_eq!(backend.live_resources(), 0);
    }

    #[test]
    fn bootstrap_failure_is_fatal() {
        let backend = RecordingBackend::new();
        *backend.fail_next_shader.borrow_mut() = Some("bad bootstrap".to_string());
        let result = RenderTarget::new(backend.gpu(), ContextBinding::new(), 0, 64, 64);
        assert!(matches!(
            result,
            Err(Error::ResourceCreation { kind: "shader", .. })
        ));
    }
}
