use std::num::NonZeroU32;
use std::rc::Rc;
use std::time::Instant;

use glutin::config::ConfigTemplateBuilder;
use glutin::context::{ContextAttributesBuilder, PossiblyCurrentContext};
use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use glutin::surface::{Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use glutin_winit::{DisplayBuilder, GlWindow};
use raw_window_handle::HasWindowHandle;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use crate::backend::GpuContext;
use crate::backend::gl::GlBackend;
use crate::error::Error;
use crate::input::Input;
use crate::render_target::{ContextBinding, RenderTarget};

#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            title: "glint".to_string(),
            width: 800,
            height: 600,
            resizable: true,
        }
    }
}

/// The on-screen render target plus input and time.
///
/// A `Window` dereferences to [`RenderTarget`], so clearing, view setup and
/// drawing happen directly on it. It only exists inside the frame callback
/// passed to [`run`]: winit owns the event loop and hands the window to the
/// callback once per frame.
pub struct Window {
    // Dropped in order: GL surface and context before the winit window.
    gl_surface: Surface<WindowSurface>,
    gl_context: PossiblyCurrentContext,
    winit_window: winit::window::Window,
    target: RenderTarget,
    input: Input,
    started: Instant,
    close_requested: bool,
}

impl Window {
    pub fn input(&self) -> &Input {
        &self.input
    }

    /// Seconds since the window was created.
    pub fn time(&self) -> f32 {
        self.started.elapsed().as_secs_f32()
    }

    /// Present the frame drawn since the last clear.
    pub fn display(&mut self) {
        if let Err(e) = self.gl_surface.swap_buffers(&self.gl_context) {
            tracing::error!(error = %e, "swap_buffers failed");
        }
    }

    /// Request the main loop to stop after this frame.
    pub fn close(&mut self) {
        self.close_requested = true;
    }

    fn handle_resize(&mut self, width: u32, height: u32) {
        let (Some(width_nz), Some(height_nz)) = (NonZeroU32::new(width), NonZeroU32::new(height))
        else {
            return;
        };
        self.gl_surface
            .resize(&self.gl_context, width_nz, height_nz);
        self.target.resize(width as i32, height as i32);
    }
}

impl std::ops::Deref for Window {
    type Target = RenderTarget;
    fn deref(&self) -> &RenderTarget {
        &self.target
    }
}

impl std::ops::DerefMut for Window {
    fn deref_mut(&mut self) -> &mut RenderTarget {
        &mut self.target
    }
}

/// Open a window and run the main loop, invoking `frame` once per display
/// refresh until the window closes.
///
/// The callback clears, draws and presents:
///
/// ```no_run
/// use glint::{Color, WindowConfig, shape};
///
/// glint::run(WindowConfig::default(), |window| {
///     window.clear(Color::BLACK);
///     let mut circle = shape::circle(&window.gpu().clone(), 50.0);
///     circle.set_position(400.0, 300.0);
///     window.draw(&circle);
///     window.display();
/// }).unwrap();
/// ```
pub fn run(
    config: WindowConfig,
    frame: impl FnMut(&mut Window) + 'static,
) -> Result<(), Error> {
    let event_loop = EventLoop::new().map_err(|e| Error::FatalInit(e.to_string()))?;
    let mut app = App {
        config,
        frame,
        window: None,
        failure: None,
    };
    event_loop
        .run_app(&mut app)
        .map_err(|e| Error::FatalInit(e.to_string()))?;
    match app.failure {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

struct App<F> {
    config: WindowConfig,
    frame: F,
    window: Option<Window>,
    failure: Option<Error>,
}

impl<F: FnMut(&mut Window)> ApplicationHandler for App<F> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Poll);
        if self.window.is_some() {
            return;
        }
        match build_window(&self.config, event_loop) {
            Ok(window) => self.window = Some(window),
            Err(error) => {
                self.failure = Some(error);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.as_mut() else {
            return;
        };
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => window.handle_resize(size.width, size.height),
            WindowEvent::Focused(focused) => window.input.handle_focus(focused),
            WindowEvent::KeyboardInput { event, .. } => {
                window.input.handle_keyboard(event.state, event.physical_key);
                if let Some(text) = &event.text {
                    window.input.handle_text(text);
                }
            }
            WindowEvent::Ime(ime) => window.input.handle_ime(ime),
            WindowEvent::CursorMoved { position, .. } => window
                .input
                .handle_cursor_moved(position.x as f32, position.y as f32),
            WindowEvent::CursorLeft { .. } => window.input.handle_cursor_left(),
            WindowEvent::MouseInput { state, button, .. } => {
                window.input.handle_mouse_button(state, button);
            }
            WindowEvent::MouseWheel { delta, .. } => window.input.handle_mouse_wheel(delta),
            WindowEvent::Touch(touch) => window.input.handle_touch(touch),
            WindowEvent::RedrawRequested => {
                (self.frame)(window);
                window.input.end_frame();
                if window.close_requested {
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.winit_window.request_redraw();
        }
    }
}

fn build_window(config: &WindowConfig, event_loop: &ActiveEventLoop) -> Result<Window, Error> {
    let attributes = winit::window::Window::default_attributes()
        .with_title(&config.title)
        .with_resizable(config.resizable)
        .with_inner_size(LogicalSize::new(config.width as f64, config.height as f64));

    // Pick a multisampled sRGB-capable config when one exists.
    let template = ConfigTemplateBuilder::new().with_alpha_size(8);
    let (window, gl_config) = DisplayBuilder::new()
        .with_window_attributes(Some(attributes))
        .build(event_loop, template, |configs| {
            configs
                .reduce(|best, candidate| {
                    if candidate.num_samples() > best.num_samples() {
                        candidate
                    } else {
                        best
                    }
                })
                .expect("no GL framebuffer configs available")
        })
        .map_err(|e| Error::FatalInit(e.to_string()))?;
    let winit_window =
        window.ok_or_else(|| Error::FatalInit("no window produced for this display".into()))?;

    let raw_window_handle = winit_window
        .window_handle()
        .ok()
        .map(|handle| handle.as_raw());
    let gl_display = gl_config.display();

    let context_attributes = ContextAttributesBuilder::new().build(raw_window_handle);
    let not_current_context =
        unsafe { gl_display.create_context(&gl_config, &context_attributes) }
            .map_err(|e| Error::FatalInit(e.to_string()))?;

    let surface_attributes = winit_window
        .build_surface_attributes(SurfaceAttributesBuilder::<WindowSurface>::new())
        .map_err(|e| Error::FatalInit(e.to_string()))?;
    let gl_surface = unsafe { gl_display.create_window_surface(&gl_config, &surface_attributes) }
        .map_err(|e| Error::FatalInit(e.to_string()))?;

    let gl_context = not_current_context
        .make_current(&gl_surface)
        .map_err(|e| Error::FatalInit(e.to_string()))?;

    // Vsync when available; not fatal when not.
    let _ = gl_surface.set_swap_interval(&gl_context, SwapInterval::Wait(NonZeroU32::MIN));

    let gl = unsafe {
        glow::Context::from_loader_function_cstr(|symbol| gl_display.get_proc_address(symbol))
    };
    let gpu: GpuContext = Rc::new(GlBackend::new(gl));

    let size = winit_window.inner_size();
    let target = RenderTarget::new(
        gpu,
        ContextBinding::new(),
        0,
        size.width as i32,
        size.height as i32,
    )?;

    Ok(Window {
        gl_surface,
        gl_context,
        winit_window,
        target,
        input: Input::new(),
        started: Instant::now(),
        close_requested: false,
    })
}
