use ultraviolet::{Mat4, Vec2, Vec3, Vec4};

use crate::blend_mode::BlendMode;
use crate::color::Color;
use crate::render_state::RenderState;
use crate::render_target::RenderTarget;
use crate::texture::Texture;
use crate::vertex_array::VertexArray;

/// Anything that can be drawn on a [`RenderTarget`].
///
/// Implemented by [`Transformable`] (and therefore every shape),
/// [`Sprite`](crate::Sprite) and [`Text`](crate::Text). `state` is the
/// ambient state of the target; implementations compose their own
/// transform/color/geometry onto it and hand the result back to
/// [`RenderTarget::draw_state`].
pub trait Drawable {
    fn draw(&self, target: &mut RenderTarget, state: RenderState);
}

/// The placement of a drawable: decomposed 2D components, or an explicit
/// matrix for free-form 3D placement.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Placement {
    Decomposed {
        position: Vec2,
        /// The pivot: rotation and scale are applied around it, and it lands
        /// on the drawable's position on screen.
        center: Vec2,
        /// Degrees, clockwise.
        rotation: f32,
        scale: Vec2,
    },
    Matrix(Mat4),
}

impl Default for Placement {
    fn default() -> Self {
        Placement::Decomposed {
            position: Vec2::zero(),
            center: Vec2::zero(),
            rotation: 0.0,
            scale: Vec2::one(),
        }
    }
}

/// A drawable object: geometry plus position/rotation/scale/pivot, color
/// tint, blend mode and texture.
///
/// Setters are plain mutations with no validation — degenerate values
/// (negative scale, NaN rotation) propagate into the matrix unchanged.
#[derive(Debug, Clone)]
pub struct Transformable {
    placement: Placement,
    color: Color,
    blend_mode: BlendMode,
    texture: Texture,
    vertex_array: VertexArray,
}

impl Default for Transformable {
    /// Untransformed, opaque white tint, alpha blending, no texture, no
    /// geometry.
    fn default() -> Self {
        Transformable {
            placement: Placement::default(),
            color: Color::WHITE,
            blend_mode: BlendMode::ALPHA,
            texture: Texture::default(),
            vertex_array: VertexArray::default(),
        }
    }
}

impl Transformable {
    pub fn new() -> Transformable {
        Transformable::default()
    }

    /// A drawable placed by an explicit 4x4 matrix, for 3D objects.
    pub fn with_matrix(transformation: Mat4) -> Transformable {
        Transformable {
            placement: Placement::Matrix(transformation),
            ..Transformable::default()
        }
    }

    fn decomposed(&mut self) -> (&mut Vec2, &mut Vec2, &mut f32, &mut Vec2) {
        // Positional setters address the decomposed form; a matrix-placed
        // object falls back to the identity decomposition first.
        if let Placement::Matrix(_) = self.placement {
            self.placement = Placement::default();
        }
        match &mut self.placement {
            Placement::Decomposed {
                position,
                center,
                rotation,
                scale,
            } => (position, center, rotation, scale),
            Placement::Matrix(_) => unreachable!(),
        }
    }

    /// Set the position, in view coordinates.
    pub fn set_position(&mut self, x: f32, y: f32) {
        *self.decomposed().0 = Vec2::new(x, y);
    }

    /// Translate relative to the current position.
    pub fn move_by(&mut self, dx: f32, dy: f32) {
        *self.decomposed().0 += Vec2::new(dx, dy);
    }

    /// Set the pivot. The pivot point of the object is what lands on the
    /// position, and rotation/scale are applied around it.
    pub fn set_center(&mut self, x: f32, y: f32) {
        *self.decomposed().1 = Vec2::new(x, y);
    }

    /// Set the rotation in degrees.
    pub fn set_rotation(&mut self, degrees: f32) {
        *self.decomposed().2 = degrees;
    }

    /// Rotate relative to the current rotation, in degrees.
    pub fn rotate(&mut self, degrees: f32) {
        *self.decomposed().2 += degrees;
    }

    /// Uniform scale.
    pub fn set_scale(&mut self, scale: f32) {
        *self.decomposed().3 = Vec2::new(scale, scale);
    }

    pub fn set_scale_xy(&mut self, x: f32, y: f32) {
        *self.decomposed().3 = Vec2::new(x, y);
    }

    pub fn set_scale_x(&mut self, x: f32) {
        self.decomposed().3.x = x;
    }

    pub fn set_scale_y(&mut self, y: f32) {
        self.decomposed().3.y = y;
    }

    /// Replace the whole transformation with an explicit matrix.
    pub fn set_transformation(&mut self, transformation: Mat4) {
        self.placement = Placement::Matrix(transformation);
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn set_blend_mode(&mut self, blend_mode: BlendMode) {
        self.blend_mode = blend_mode;
    }

    pub fn set_texture(&mut self, texture: Texture) {
        self.texture = texture;
    }

    pub fn set_vertex_array(&mut self, vertex_array: VertexArray) {
        self.vertex_array = vertex_array;
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn vertex_array(&self) -> &VertexArray {
        &self.vertex_array
    }

    /// The composed transformation matrix, recomputed on every call.
    ///
    /// For the decomposed form this is
    /// `Translate(position) * RotateZ(-rotation) * Translate(-center * scale) * Scale(scale)`:
    /// rotation and scale pivot around the center, and the position applies
    /// in the enclosing (view) space. For matrix placement the stored matrix
    /// is returned verbatim.
    pub fn transformation(&self) -> Mat4 {
        match self.placement {
            Placement::Matrix(matrix) => matrix,
            Placement::Decomposed {
                position,
                center,
                rotation,
                scale,
            } => {
                let mut matrix =
                    Mat4::from_translation(Vec3::new(position.x, position.y, 0.0));
                if rotation != 0.0 {
                    matrix = matrix * Mat4::from_rotation_z(-rotation.to_radians());
                }
                matrix = matrix
                    * Mat4::from_translation(Vec3::new(
                        -center.x * scale.x,
                        -center.y * scale.y,
                        0.0,
                    ));
                matrix
                    * Mat4::new(
                        Vec4::new(scale.x, 0.0, 0.0, 0.0),
                        Vec4::new(0.0, scale.y, 0.0, 0.0),
                        Vec4::new(0.0, 0.0, 1.0, 0.0),
                        Vec4::new(0.0, 0.0, 0.0, 1.0),
                    )
            }
        }
    }
}

impl Drawable for Transformable {
    fn draw(&self, target: &mut RenderTarget, mut state: RenderState) {
        state.color *= self.color;
        state.texture = self.texture.clone();
        // The incoming view multiplies on the left: the outer transform is
        // applied last, which is what makes nested draws compose.
        state.view = state.view * self.transformation();
        state.vertex_array = self.vertex_array.clone();
        state.blend_mode = self.blend_mode;
        target.draw_state(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ultraviolet::Vec4;

    fn apply(m: &Mat4, x: f32, y: f32) -> (f32, f32) {
        let out = *m * Vec4::new(x, y, 0.0, 1.0);
        (out.x, out.y)
    }

    #[test]
    fn center_cancels_exactly_under_zero_rotation() {
        let mut object = Transformable::new();
        object.set_position(10.0, 20.0);
        object.set_center(5.0, 5.0);
        object.set_scale(2.0);

        // The pivot maps onto the position.
        let m = object.transformation();
        let (x, y) = apply(&m, 5.0, 5.0);
        assert!((x - 10.0).abs() < 1e-5);
        assert!((y - 20.0).abs() < 1e-5);
    }

    #[test]
    fn scale_applies_before_translation() {
        let mut object = Transformable::new();
        object.set_position(100.0, 0.0);
        object.set_scale_xy(2.0, 3.0);

        let (x, y) = apply(&object.transformation(), 1.0, 1.0);
        assert!((x - 102.0).abs() < 1e-5);
        assert!((y - 3.0).abs() < 1e-5);
    }

    #[test]
    fn rotation_is_clockwise_degrees_around_the_center() {
        let mut object = Transformable::new();
        object.set_rotation(90.0);

        // Y grows downward, so a clockwise quarter turn takes +x to -y.
        let (x, y) = apply(&object.transformation(), 1.0, 0.0);
        assert!(x.abs() < 1e-5);
        assert!((y + 1.0).abs() < 1e-4);
    }

    #[test]
    fn matrix_placement_is_returned_verbatim() {
        let matrix = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let object = Transformable::with_matrix(matrix);
        assert_eq!(object.transformation(), matrix);
    }

    #[test]
    fn relative_setters_accumulate() {
        let mut object = Transformable::new();
        object.set_position(1.0, 1.0);
        object.move_by(2.0, 3.0);
        object.set_rotation(10.0);
        object.rotate(20.0);

        let mut expected = Transformable::new();
        expected.set_position(3.0, 4.0);
        expected.set_rotation(30.0);
        let a = object.transformation();
        let b = expected.transformation();
        for (col_a, col_b) in a.cols.iter().zip(b.cols.iter()) {
            assert!((*col_a - *col_b).mag() < 1e-5);
        }
    }
}
