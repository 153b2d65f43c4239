use crate::backend::RawId;
use crate::error::Error;
use crate::render_target::RenderTarget;
use crate::texture::Texture;

/// An off-screen render target: a color texture plus a depth/stencil
/// buffer.
///
/// Draw into it like into a window, then feed
/// [`color_texture`](Framebuffer::color_texture) to a
/// [`Sprite`](crate::Sprite) — usually via
/// [`Sprite::from_framebuffer`](crate::Sprite::from_framebuffer), which
/// compensates for the bottom-left row order GL renders attachments with.
pub struct Framebuffer {
    target: RenderTarget,
    color_texture: Texture,
    render_buffer: RawId,
}

impl Framebuffer {
    /// Allocate an off-screen surface of the given pixel size, sharing the
    /// context of `target`.
    pub fn new(target: &RenderTarget, width: i32, height: i32) -> Result<Framebuffer, Error> {
        let gpu = target.gpu().clone();
        let parts = gpu.create_framebuffer(width, height)?;
        // Allocation rebinds the GL framebuffer behind the targets' backs.
        target.binding().forget_bound_target();

        let color_texture = Texture::from_raw_parts(&gpu, parts.color_texture, width, height);
        let inner_target = RenderTarget::new(
            gpu,
            target.binding().clone(),
            parts.framebuffer,
            width,
            height,
        )?;
        Ok(Framebuffer {
            target: inner_target,
            color_texture,
            render_buffer: parts.render_buffer,
        })
    }

    /// The color attachment. A refcounted clone: it stays valid after the
    /// framebuffer is dropped, for as long as someone holds it.
    pub fn color_texture(&self) -> Texture {
        self.color_texture.clone()
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        self.target
            .gpu()
            .delete_framebuffer(self.target.framebuffer_id(), self.render_buffer);
        // This target can no longer be the bound one.
        self.target.binding().forget_bound_target();
    }
}

impl std::ops::Deref for Framebuffer {
    type Target = RenderTarget;
    fn deref(&self) -> &RenderTarget {
        &self.target
    }
}

impl std::ops::DerefMut for Framebuffer {
    fn deref_mut(&mut self) -> &mut RenderTarget {
        &mut self.target
    }
}
