use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use ab_glyph::{Font as _, FontArc, PxScale, ScaleFont as _};
use ultraviolet::Vec2;

use crate::backend::GpuContext;
use crate::error::Error;
use crate::texture::Texture;

/// One rasterized glyph: its texture (possibly empty for blank glyphs), the
/// offset from the pen position on the baseline to the glyph's top-left
/// corner, and the horizontal advance to the next pen position.
#[derive(Debug, Clone)]
pub struct Glyph {
    pub texture: Texture,
    pub bearing: Vec2,
    pub advance: f32,
}

/// A source of glyphs for [`Text`](crate::Text).
///
/// [`Font`] implements it over a real font file; anything able to hand out
/// glyph textures and vertical metrics can stand in.
pub trait FontFace {
    /// The glyph for a code point, or `None` if the face has no mapping
    /// for it (the text walk skips it).
    fn fetch_glyph(&self, codepoint: char) -> Option<Glyph>;
    /// Vertical distance between two lines of text, in pixels.
    fn line_height(&self) -> f32;
    /// Distance from the top of a line to its baseline, in pixels.
    fn baseline_position(&self) -> f32;
}

/// A font face rasterized with `ab_glyph` at a fixed pixel line height,
/// caching one texture per glyph, created lazily on first use.
///
/// Cloning shares the face and the glyph cache.
#[derive(Clone)]
pub struct Font {
    inner: Rc<FontInner>,
}

struct FontInner {
    gpu: GpuContext,
    font: FontArc,
    scale: PxScale,
    line_height: f32,
    baseline_position: f32,
    glyphs: RefCell<HashMap<char, Option<Glyph>>>,
}

impl Font {
    /// Load a font file (TTF/OTF) and set it up for glyphs of the given
    /// pixel line height.
    pub fn from_file(
        gpu: &GpuContext,
        path: impl AsRef<Path>,
        line_height: f32,
    ) -> Result<Font, Error> {
        let bytes = std::fs::read(path)?;
        Font::from_bytes(gpu, bytes, line_height)
    }

    pub fn from_bytes(gpu: &GpuContext, bytes: Vec<u8>, line_height: f32) -> Result<Font, Error> {
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| Error::resource("font", e.to_string()))?;
        let scale = PxScale::from(line_height);
        let scaled = font.as_scaled(scale);
        // descent() is negative; ascent - descent spans the full line.
        let baseline_position =
            line_height * scaled.ascent() / (scaled.ascent() - scaled.descent());
        Ok(Font {
            inner: Rc::new(FontInner {
                gpu: gpu.clone(),
                font,
                scale,
                line_height,
                baseline_position,
                glyphs: RefCell::new(HashMap::new()),
            }),
        })
    }

    fn rasterize(&self, codepoint: char) -> Option<Glyph> {
        let inner = &self.inner;
        let scaled = inner.font.as_scaled(inner.scale);
        let id = scaled.glyph_id(codepoint);
        if id.0 == 0 {
            tracing::warn!(codepoint = %codepoint.escape_unicode(), "glyph missing from font");
            return None;
        }
        let advance = scaled.h_advance(id);

        let Some(outlined) = scaled.outline_glyph(ab_glyph::Glyph {
            id,
            scale: inner.scale,
            position: ab_glyph::point(0.0, 0.0),
        }) else {
            // Blank glyph (space): advances the pen, draws nothing.
            return Some(Glyph {
                texture: Texture::default(),
                bearing: Vec2::zero(),
                advance,
            });
        };

        let bounds = outlined.px_bounds();
        let width = bounds.width().ceil() as i32;
        let height = bounds.height().ceil() as i32;
        if width <= 0 || height <= 0 {
            return Some(Glyph {
                texture: Texture::default(),
                bearing: Vec2::zero(),
                advance,
            });
        }

        // White RGB with coverage in alpha, so the color tint modulates the
        // glyph directly.
        let mut pixels = vec![0u8; (width * height * 4) as usize];
        outlined.draw(|x, y, coverage| {
            let index = 4 * (x as usize + width as usize * y as usize);
            if index + 3 < pixels.len() {
                pixels[index] = 255;
                pixels[index + 1] = 255;
                pixels[index + 2] = 255;
                pixels[index + 3] = (coverage * 255.0) as u8;
            }
        });

        let texture = Texture::from_pixels(&inner.gpu, &pixels, width, height).ok()?;
        Some(Glyph {
            texture,
            bearing: Vec2::new(bounds.min.x, bounds.min.y),
            advance,
        })
    }
}

impl FontFace for Font {
    fn fetch_glyph(&self, codepoint: char) -> Option<Glyph> {
        if let Some(cached) = self.inner.glyphs.borrow().get(&codepoint) {
            return cached.clone();
        }
        let glyph = self.rasterize(codepoint);
        self.inner
            .glyphs
            .borrow_mut()
            .insert(codepoint, glyph.clone());
        glyph
    }

    fn line_height(&self) -> f32 {
        self.inner.line_height
    }

    fn baseline_position(&self) -> f32 {
        self.inner.baseline_position
    }
}
