//! glint - a small OpenGL media toolkit.
//!
//! Open a window, submit shapes, sprites and text each frame, poll the
//! keyboard and mouse, play sounds. The library owns GPU resource
//! lifetimes (textures, vertex arrays, shader programs are cheap
//! refcounted value types) and coalesces redundant GPU state changes
//! between draws.
//!
//! # Example
//! ```no_run
//! use glint::{Color, WindowConfig, shape};
//!
//! fn main() {
//!     glint::run(WindowConfig::default(), |window| {
//!         window.clear(Color::BLACK);
//!
//!         let gpu = window.gpu().clone();
//!         let mut circle = shape::circle(&gpu, 120.0);
//!         circle.set_position(400.0, 300.0);
//!         circle.set_color(Color::CYAN);
//!         window.draw(&circle);
//!
//!         if window.input().key_pressed(glint::Key::Escape) {
//!             window.close();
//!         }
//!         window.display();
//!     })
//!     .unwrap();
//! }
//! ```
//!
//! Drawables are flat, independently transformed objects rebuilt or
//! re-configured per frame; there is no retained scene graph. All GPU work
//! happens on the thread running [`run`].

pub mod audio;
pub mod backend;
mod blend_mode;
mod color;
mod drawable;
mod error;
mod font;
mod framebuffer;
mod input;
mod rect;
mod render_state;
mod render_target;
pub mod shape;
mod shader;
mod sprite;
mod text;
mod texture;
mod vertex;
mod vertex_array;
mod view;
mod window;

pub use audio::{Audio, Sound, SoundBuffer};
pub use backend::{GpuContext, ShaderStage, UniformValue};
pub use blend_mode::{BlendEquation, BlendFactor, BlendMode};
pub use color::Color;
pub use drawable::{Drawable, Transformable};
pub use error::Error;
pub use font::{Font, FontFace, Glyph};
pub use framebuffer::Framebuffer;
pub use input::{Input, Key, MouseButton, Touch, TouchPhase};
pub use rect::Rectangle;
pub use render_state::RenderState;
pub use render_target::RenderTarget;
pub use shader::{Shader, ShaderProgram};
pub use sprite::Sprite;
pub use text::Text;
pub use texture::{Texture, TextureFilter, TextureOptions, TextureWrap};
pub use vertex::{Vertex2d, Vertex3d};
pub use vertex_array::VertexArray;
pub use view::View;
pub use window::{Window, WindowConfig, run};

/// Math types used throughout the public API, re-exported from
/// [`ultraviolet`].
pub use ultraviolet::{Mat4, Vec2, Vec3, Vec4};
