use ultraviolet::Vec2;

/// The area of the scene mapped onto a render target, in scene pixels.
///
/// The view is consumed immediately by
/// [`RenderTarget::set_view`](crate::RenderTarget::set_view) to build the
/// projection matrix; to preserve aspect ratio the view ratio must match the
/// target ratio.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct View {
    center: Vec2,
    size: Vec2,
}

impl View {
    pub fn new(center: Vec2, size: Vec2) -> Self {
        View { center, size }
    }

    pub fn set_center(&mut self, x: f32, y: f32) {
        self.center = Vec2::new(x, y);
    }

    pub fn set_size(&mut self, width: f32, height: f32) {
        self.size = Vec2::new(width, height);
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn left(&self) -> f32 {
        self.center.x - self.size.x / 2.0
    }

    pub fn right(&self) -> f32 {
        self.center.x + self.size.x / 2.0
    }

    pub fn top(&self) -> f32 {
        self.center.y - self.size.y / 2.0
    }

    pub fn bottom(&self) -> f32 {
        self.center.y + self.size.y / 2.0
    }
}
