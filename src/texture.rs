use std::path::Path;
use std::rc::Rc;

use crate::backend::{GpuContext, RawId};
use crate::error::Error;

/// Texture minification/magnification filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFilter {
    Nearest,
    Linear,
    LinearMipmapLinear,
}

/// Texture coordinate wrapping outside `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureWrap {
    ClampToEdge,
    Repeat,
    MirroredRepeat,
}

/// Sampling options applied at texture creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureOptions {
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
    pub wrap_s: TextureWrap,
    pub wrap_t: TextureWrap,
    pub generate_mipmap: bool,
}

impl Default for TextureOptions {
    /// Trilinear minification, linear magnification, clamp to edge, mipmaps
    /// generated.
    fn default() -> Self {
        TextureOptions {
            min_filter: TextureFilter::LinearMipmapLinear,
            mag_filter: TextureFilter::Linear,
            wrap_s: TextureWrap::ClampToEdge,
            wrap_t: TextureWrap::ClampToEdge,
            generate_mipmap: true,
        }
    }
}

/// An RGBA texture uploaded to the GPU.
///
/// `Texture` is a cheap value type: clones share one GPU texture, which is
/// released when the last clone is dropped. The default value is the empty
/// texture — valid everywhere a texture is accepted, drawn as the white
/// fallback, and never touching the backend.
#[derive(Clone, Default)]
pub struct Texture {
    inner: Option<Rc<TextureInner>>,
}

struct TextureInner {
    gpu: GpuContext,
    id: RawId,
    width: i32,
    height: i32,
}

impl Drop for TextureInner {
    fn drop(&mut self) {
        self.gpu.delete_texture(self.id);
    }
}

impl Texture {
    /// Decode an image file and upload it. Any format supported by the
    /// `image` crate (PNG, JPEG, GIF, BMP, TGA, ...).
    pub fn from_file(gpu: &GpuContext, path: impl AsRef<Path>) -> Result<Texture, Error> {
        Texture::from_file_with_options(gpu, path, TextureOptions::default())
    }

    pub fn from_file_with_options(
        gpu: &GpuContext,
        path: impl AsRef<Path>,
        options: TextureOptions,
    ) -> Result<Texture, Error> {
        let decoded = image::open(path.as_ref())?.to_rgba8();
        let (width, height) = decoded.dimensions();
        Texture::from_pixels_with_options(
            gpu,
            decoded.as_raw(),
            width as i32,
            height as i32,
            options,
        )
    }

    /// Upload raw RGBA8 pixels, 4 bytes per pixel, row-major from the top.
    pub fn from_pixels(
        gpu: &GpuContext,
        pixels: &[u8],
        width: i32,
        height: i32,
    ) -> Result<Texture, Error> {
        Texture::from_pixels_with_options(gpu, pixels, width, height, TextureOptions::default())
    }

    pub fn from_pixels_with_options(
        gpu: &GpuContext,
        pixels: &[u8],
        width: i32,
        height: i32,
        options: TextureOptions,
    ) -> Result<Texture, Error> {
        let expected = (width.max(0) as usize) * (height.max(0) as usize) * 4;
        if pixels.len() != expected {
            return Err(Error::InvalidPixels(format!(
                "got {} bytes, expected {} for {}x{} rgba",
                pixels.len(),
                expected,
                width,
                height
            )));
        }
        let id = gpu.create_texture(width, height, Some(pixels), &options);
        if id == 0 {
            return Err(Error::resource("texture", "allocation failed"));
        }
        Ok(Texture::from_raw_parts(gpu, id, width, height))
    }

    /// Adopt an id already created on the backend (framebuffer color
    /// attachments). The texture takes ownership and will release it.
    pub(crate) fn from_raw_parts(gpu: &GpuContext, id: RawId, width: i32, height: i32) -> Texture {
        Texture {
            inner: Some(Rc::new(TextureInner {
                gpu: gpu.clone(),
                id,
                width,
                height,
            })),
        }
    }

    /// The backend id, `0` for the empty texture.
    pub fn id(&self) -> RawId {
        self.inner.as_ref().map_or(0, |inner| inner.id)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    pub fn width(&self) -> i32 {
        self.inner.as_ref().map_or(0, |inner| inner.width)
    }

    pub fn height(&self) -> i32 {
        self.inner.as_ref().map_or(0, |inner| inner.height)
    }

    /// Bind to a texture unit. A no-op for the empty texture.
    pub fn bind(&self, unit: u32) {
        if let Some(inner) = &self.inner {
            inner.gpu.bind_texture(inner.id, unit);
        }
    }

    pub(crate) fn gpu(&self) -> Option<&GpuContext> {
        self.inner.as_ref().map(|inner| &inner.gpu)
    }
}

impl PartialEq for Texture {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Texture {}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id())
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}
