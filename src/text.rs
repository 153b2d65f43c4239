use std::rc::Rc;

use ultraviolet::{Mat4, Vec2, Vec4};

use crate::blend_mode::BlendMode;
use crate::color::Color;
use crate::drawable::{Drawable, Transformable};
use crate::font::FontFace;
use crate::render_state::RenderState;
use crate::render_target::RenderTarget;
use crate::vertex::Vertex2d;
use crate::vertex_array::VertexArray;

/// A string drawn glyph by glyph with a [`FontFace`].
///
/// Not itself GPU-resident: each draw walks the string, emitting one
/// textured-quad draw per visible glyph, advancing a pen horizontally per
/// glyph and vertically on `'\n'`.
#[derive(Clone)]
pub struct Text {
    face: Rc<dyn FontFace>,
    string: String,
    object: Transformable,
}

impl Text {
    pub fn new(face: impl FontFace + 'static, string: impl Into<String>) -> Text {
        Text::with_face(Rc::new(face), string)
    }

    pub fn with_face(face: Rc<dyn FontFace>, string: impl Into<String>) -> Text {
        Text {
            face,
            string: string.into(),
            object: Transformable::new(),
        }
    }

    pub fn set_string(&mut self, string: impl Into<String>) {
        self.string = string.into();
    }

    pub fn set_face(&mut self, face: Rc<dyn FontFace>) {
        self.face = face;
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

    pub fn set_color(&mut self, color: Color) {
        self.object.set_color(color);
    }

    pub fn set_blend_mode(&mut self, blend_mode: BlendMode) {
        self.object.set_blend_mode(blend_mode);
    }

    /// The size the text will occupy when drawn, without drawing it: the
    /// same pen walk as [`draw`](Drawable::draw). Useful for caller-side
    /// centering.
    pub fn compute_dimensions(&self) -> Vec2 {
        let mut dimensions = Vec2::new(0.0, self.face.line_height());
        let mut advance_x = 0.0f32;
        for codepoint in self.string.chars() {
            if codepoint == '\n' {
                advance_x = 0.0;
                dimensions.y += self.face.line_height();
                continue;
            }
            let Some(glyph) = self.face.fetch_glyph(codepoint) else {
                continue;
            };
            advance_x += glyph.advance;
            dimensions.x = dimensions.x.max(advance_x);
        }
        dimensions
    }
}

impl Drawable for Text {
    fn draw(&self, target: &mut RenderTarget, mut state: RenderState) {
        state.color *= self.object.color();
        state.blend_mode = self.object.blend_mode();
        let transformation = state.view * self.object.transformation();

        // One shared unit quad; each glyph scales and offsets it through
        // the view matrix.
        state.vertex_array = VertexArray::from_vertices(
            target.gpu(),
            &[
                Vertex2d::new([0.0, 0.0], [0.0, 0.0]),
                Vertex2d::new([0.0, 1.0], [0.0, 1.0]),
                Vertex2d::new([1.0, 1.0], [1.0, 1.0]),
                Vertex2d::new([0.0, 0.0], [0.0, 0.0]),
                Vertex2d::new([1.0, 1.0], [1.0, 1.0]),
                Vertex2d::new([1.0, 0.0], [1.0, 0.0]),
            ],
        );

        let mut advance_x = 0.0f32;
        let mut advance_y = self.face.baseline_position();

        for codepoint in self.string.chars() {
            if codepoint == '\n' {
                advance_x = 0.0;
                advance_y += self.face.line_height();
                continue;
            }

            let Some(glyph) = self.face.fetch_glyph(codepoint) else {
                continue;
            };

            if !glyph.texture.is_empty() {
                let x = advance_x + glyph.bearing.x;
                let y = advance_y + glyph.bearing.y;
                let width = glyph.texture.width() as f32;
                let height = glyph.texture.height() as f32;
                state.texture = glyph.texture.clone();
                state.view = transformation
                    * Mat4::new(
                        Vec4::new(width, 0.0, 0.0, 0.0),
                        Vec4::new(0.0, height, 0.0, 0.0),
                        Vec4::new(0.0, 0.0, 1.0, 0.0),
                        Vec4::new(x, y, 0.0, 1.0),
                    );
                target.draw_state(state.clone());
            }
            advance_x += glyph.advance;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::RecordingBackend;
    use crate::font::Glyph;
    use crate::render_target::ContextBinding;
    use crate::texture::Texture;

    /// Fixed-metric face: every letter is an 8x10 glyph with advance 10 and
    /// bearing (1, -8); '?' is unmapped; spaces advance without a texture.
    struct StubFace {
        gpu: crate::backend::GpuContext,
    }

    impl FontFace for StubFace {
        fn fetch_glyph(&self, codepoint: char) -> Option<Glyph> {
            match codepoint {
                '?' => None,
                ' ' => Some(Glyph {
                    texture: Texture::default(),
                    bearing: Vec2::zero(),
                    advance: 10.0,
                }),
                _ => Some(Glyph {
                    texture: Texture::from_pixels(&self.gpu, &[255u8; 8 * 10 * 4], 8, 10)
                        .unwrap(),
                    bearing: Vec2::new(1.0, -8.0),
                    advance: 10.0,
                }),
            }
        }

        fn line_height(&self) -> f32 {
            20.0
        }

        fn baseline_position(&self) -> f32 {
            15.0
        }
    }

    fn target(backend: &std::rc::Rc<RecordingBackend>) -> RenderTarget {
        RenderTarget::new(backend.gpu(), ContextBinding::new(), 0, 800, 600).unwrap()
    }

    #[test]
    fn dimensions_track_the_widest_line() {
        let backend = RecordingBackend::new();
        let text = Text::new(StubFace { gpu: backend.gpu() }, "ab\nabc d");
        let dimensions = text.compute_dimensions();
        assert_eq!(dimensions.x, 50.0);
        assert_eq!(dimensions.y, 40.0);
    }

    #[test]
    fn one_draw_call_per_visible_glyph() {
        let backend = RecordingBackend::new();
        let mut target = target(&backend);
        // Five codepoints: three visible, one space (no texture), one
        // unmapped.
        let text = Text::new(StubFace { gpu: backend.gpu() }, "ab ?c");
        target.draw(&text);
        assert_eq!(backend.draw_calls.borrow().len(), 3);
    }

    #[test]
    fn pen_advances_and_newline_moves_to_the_next_baseline() {
        let backend = RecordingBackend::new();
        let mut target = target(&backend);
        let mut text = Text::new(StubFace { gpu: backend.gpu() }, "ab\nc");
        text.set_position(100.0, 50.0);
        target.draw(&text);

        let program = target.shader_program_2d().id();
        let view_location = backend.location_of(program, "view").unwrap();
        let views: Vec<Mat4> = backend
            .uniform_sets
            .borrow()
            .iter()
            .filter(|(l, _)| *l == view_location)
            .filter_map(|(_, v)| match v {
                crate::backend::UniformValue::Mat4(m) => Some(*m),
                _ => None,
            })
            .collect();
        // Constructor init + one per drawn glyph.
        assert_eq!(views.len(), 1 + 3);

        let origin = |m: &Mat4| {
            let p = *m * Vec4::new(0.0, 0.0, 0.0, 1.0);
            (p.x, p.y)
        };
        // First glyph: position + bearing, pen on the first baseline.
        assert_eq!(origin(&views[1]), (101.0, 57.0));
        // Second glyph: advanced by 10.
        assert_eq!(origin(&views[2]), (111.0, 57.0));
        // Third glyph: new line, pen reset, baseline one line lower.
        assert_eq!(origin(&views[3]), (101.0, 77.0));

        // The quad is scaled to the glyph texture size.
        let corner = *views.last().unwrap() * Vec4::new(1.0, 1.0, 0.0, 1.0);
        assert_eq!((corner.x, corner.y), (101.0 + 8.0, 77.0 + 10.0));
    }

    #[test]
    fn text_color_multiplies_the_ambient_tint() {
        let backend = RecordingBackend::new();
        let mut target = target(&backend);
        let mut text = Text::new(StubFace { gpu: backend.gpu() }, "a");
        text.set_color(Color::rgba(1.0, 0.5, 0.0, 1.0));
        target.draw(&text);

        let program = target.shader_program_2d().id();
        let color_location = backend.location_of(program, "color").unwrap();
        match backend.last_uniform_at(color_location) {
            Some(crate::backend::UniformValue::Vec4(c)) => {
                assert_eq!((c.x, c.y, c.z, c.w), (1.0, 0.5, 0.0, 1.0));
            }
            other => panic!("expected color vec4, got {other:?}"),
        }
    }
}
