use crate::blend_mode::BlendMode;
use crate::color::Color;
use crate::drawable::{Drawable, Transformable};
use crate::framebuffer::Framebuffer;
use crate::rect::Rectangle;
use crate::render_state::RenderState;
use crate::render_target::RenderTarget;
use crate::texture::Texture;
use crate::vertex::Vertex2d;
use crate::vertex_array::VertexArray;

/// A drawable that displays a texture, or a sub-rectangle of one.
///
/// The geometry is always one two-triangle quad sized to the displayed
/// rectangle; position/rotation/scale come from the embedded transform.
#[derive(Debug, Clone, Default)]
pub struct Sprite {
    object: Transformable,
}

impl Sprite {
    /// A sprite displaying the whole texture.
    pub fn new(texture: Texture) -> Sprite {
        let mut sprite = Sprite {
            object: Transformable::new(),
        };
        sprite.set_texture(texture);
        sprite
    }

    /// A sprite displaying a sub-rectangle of the texture, in pixels.
    pub fn with_rectangle(texture: Texture, rectangle: Rectangle) -> Sprite {
        let mut sprite = Sprite {
            object: Transformable::new(),
        };
        sprite.object.set_texture(texture);
        sprite.set_texture_rectangle(rectangle);
        sprite
    }

    /// A sprite displaying the content of a framebuffer.
    ///
    /// GL stores framebuffer attachments bottom-up, so the texture
    /// coordinates are V-flipped here; the sprite shows the scene the way
    /// it was drawn.
    pub fn from_framebuffer(framebuffer: &Framebuffer) -> Sprite {
        let texture = framebuffer.color_texture();
        let mut sprite = Sprite {
            object: Transformable::new(),
        };
        let width = texture.width() as f32;
        let height = texture.height() as f32;
        if let Some(gpu) = texture.gpu() {
            let (l, r) = (0.0, 1.0);
            let (t, b) = (0.0, 1.0);
            sprite.object.set_vertex_array(VertexArray::from_vertices(
                gpu,
                &[
                    Vertex2d::new([0.0, 0.0], [l, b]),
                    Vertex2d::new([0.0, height], [l, t]),
                    Vertex2d::new([width, height], [r, t]),
                    Vertex2d::new([0.0, 0.0], [l, b]),
                    Vertex2d::new([width, height], [r, t]),
                    Vertex2d::new([width, 0.0], [r, b]),
                ],
            ));
        }
        sprite.object.set_texture(texture);
        sprite
    }

    /// Replace the texture and display all of it.
    pub fn set_texture(&mut self, texture: Texture) {
        let rectangle =
            Rectangle::from_size(0.0, 0.0, texture.width() as f32, texture.height() as f32);
        self.object.set_texture(texture);
        self.set_texture_rectangle(rectangle);
    }

    /// Display only `rectangle`, given in texture pixels.
    ///
    /// The generated texture coordinates are inset by half a pixel on every
    /// edge. Without the inset, bilinear filtering at the quad border
    /// samples the neighboring atlas pixel and the sprite bleeds.
    pub fn set_texture_rectangle(&mut self, rectangle: Rectangle) {
        let texture = self.object.texture();
        let Some(gpu) = texture.gpu() else {
            return;
        };
        let texture_width = texture.width() as f32;
        let texture_height = texture.height() as f32;
        let l = (rectangle.left + 0.5) / texture_width;
        let r = (rectangle.right - 0.5) / texture_width;
        let t = (rectangle.top + 0.5) / texture_height;
        let b = (rectangle.bottom - 0.5) / texture_height;
        let width = rectangle.width();
        let height = rectangle.height();
        let vertex_array = VertexArray::from_vertices(
            gpu,
            &[
                Vertex2d::new([0.0, 0.0], [l, t]),
                Vertex2d::new([0.0, height], [l, b]),
                Vertex2d::new([width, height], [r, b]),
                Vertex2d::new([0.0, 0.0], [l, t]),
                Vertex2d::new([width, height], [r, b]),
                Vertex2d::new([width, 0.0], [r, t]),
            ],
        );
        self.object.set_vertex_array(vertex_array);
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        self.object.set_position(x, y);
    }

    pub fn move_by(&mut self, dx: f32, dy: f32) {
        self.object.move_by(dx, dy);
    }

    pub fn set_center(&mut self, x: f32, y: f32) {
        self.object.set_center(x, y);
    }

    pub fn set_rotation(&mut self, degrees: f32) {
        self.object.set_rotation(degrees);
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.object.set_scale(scale);
    }

    pub fn set_scale_xy(&mut self, x: f32, y: f32) {
        self.object.set_scale_xy(x, y);
    }

    pub fn set_color(&mut self, color: Color) {
        self.object.set_color(color);
    }

    pub fn set_blend_mode(&mut self, blend_mode: BlendMode) {
        self.object.set_blend_mode(blend_mode);
    }

    pub fn texture(&self) -> &Texture {
        self.object.texture()
    }

    /// The underlying transformable, for the less common setters.
    pub fn object_mut(&mut self) -> &mut Transformable {
        &mut self.object
    }
}

impl Drawable for Sprite {
    fn draw(&self, target: &mut RenderTarget, state: RenderState) {
        self.object.draw(target, state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::RecordingBackend;
    use crate::render_target::ContextBinding;

    fn uploaded_vertices(backend: &RecordingBackend, sprite: &Sprite) -> Vec<Vertex2d> {
        let data = backend.buffer_data.borrow();
        bytemuck::cast_slice(&data[&sprite.object.vertex_array().id()]).to_vec()
    }

    #[test]
    fn texture_rectangle_uvs_carry_the_half_pixel_inset() {
        let backend = RecordingBackend::new();
        let gpu = backend.gpu();
        let (width, height) = (64, 32);
        let pixels = vec![255u8; (width * height * 4) as usize];
        let texture = Texture::from_pixels(&gpu, &pixels, width, height).unwrap();

        let sprite = Sprite::new(texture);
        let vertices = uploaded_vertices(&backend, &sprite);
        assert_eq!(vertices.len(), 6);

        let mut u_min = f32::MAX;
        let mut u_max = f32::MIN;
        let mut v_min = f32::MAX;
        let mut v_max = f32::MIN;
        for vertex in &vertices {
            u_min = u_min.min(vertex.texture_coords[0]);
            u_max = u_max.max(vertex.texture_coords[0]);
            v_min = v_min.min(vertex.texture_coords[1]);
            v_max = v_max.max(vertex.texture_coords[1]);
        }
        assert!((u_min - 0.5 / 64.0).abs() < 1e-6);
        assert!((u_max - 63.5 / 64.0).abs() < 1e-6);
        assert!((v_min - 0.5 / 32.0).abs() < 1e-6);
        assert!((v_max - 31.5 / 32.0).abs() < 1e-6);

        // The quad itself spans the full pixel rectangle.
        let xs: Vec<f32> = vertices.iter().map(|v| v.position[0]).collect();
        let ys: Vec<f32> = vertices.iter().map(|v| v.position[1]).collect();
        assert_eq!(xs.iter().cloned().fold(f32::MIN, f32::max), 64.0);
        assert_eq!(ys.iter().cloned().fold(f32::MIN, f32::max), 32.0);
    }

    #[test]
    fn sub_rectangle_maps_to_the_right_uv_window() {
        let backend = RecordingBackend::new();
        let gpu = backend.gpu();
        let pixels = vec![0u8; 100 * 100 * 4];
        let texture = Texture::from_pixels(&gpu, &pixels, 100, 100).unwrap();

        let sprite =
            Sprite::with_rectangle(texture, Rectangle::from_size(10.0, 20.0, 30.0, 40.0));
        let vertices = uploaded_vertices(&backend, &sprite);

        let u_min = vertices
            .iter()
            .map(|v| v.texture_coords[0])
            .fold(f32::MAX, f32::min);
        let v_max = vertices
            .iter()
            .map(|v| v.texture_coords[1])
            .fold(f32::MIN, f32::max);
        assert!((u_min - 10.5 / 100.0).abs() < 1e-6);
        assert!((v_max - 59.5 / 100.0).abs() < 1e-6);

        // Geometry is sized to the sub-rectangle, not the texture.
        let x_max = vertices
            .iter()
            .map(|v| v.position[0])
            .fold(f32::MIN, f32::max);
        assert_eq!(x_max, 30.0);
    }

    #[test]
    fn framebuffer_sprite_flips_v() {
        let backend = RecordingBackend::new();
        let window =
            crate::render_target::RenderTarget::new(backend.gpu(), ContextBinding::new(), 0, 800, 600)
                .unwrap();
        let framebuffer = Framebuffer::new(&window, 320, 200).unwrap();
        let sprite = Sprite::from_framebuffer(&framebuffer);
        let vertices = uploaded_vertices(&backend, &sprite);

        // Top-left corner of the quad samples the *bottom* of the texture.
        let top_left = vertices
            .iter()
            .find(|v| v.position == [0.0, 0.0])
            .unwrap();
        assert_eq!(top_left.texture_coords, [0.0, 1.0]);
        let bottom_right = vertices
            .iter()
            .find(|v| v.position == [320.0, 200.0])
            .unwrap();
        assert_eq!(bottom_right.texture_coords, [1.0, 0.0]);
    }

    #[test]
    fn sprite_with_empty_texture_stays_empty() {
        let backend = RecordingBackend::new();
        let _gpu = backend.gpu();
        let sprite = Sprite::new(Texture::default());
        assert!(sprite.object.vertex_array().is_empty());
        assert_eq!(backend.created_vertex_arrays.get(), 0);
    }
}
