//! Frame-coherent keyboard, mouse and touch state.
//!
//! The window feeds winit events in; application code polls with
//! `key_down`/`key_pressed`/`key_released` and friends. "Pressed" and
//! "released" are edges that last exactly one frame; `end_frame` clears
//! them after each frame callback.

use winit::event::{ElementState, Ime, MouseScrollDelta};
use winit::keyboard::{KeyCode, PhysicalKey};

/// A keyboard key, identified by physical position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,
    Num0, Num1, Num2, Num3, Num4, Num5, Num6, Num7, Num8, Num9,
    F1, F2, F3, F4, F5, F6, F7, F8, F9, F10, F11, F12,
    Left, Right, Up, Down,
    Space, Enter, Escape, Backspace, Tab, Delete,
    Home, End, PageUp, PageDown,
    ShiftLeft, ShiftRight, ControlLeft, ControlRight, AltLeft, AltRight,
    Minus, Equal, Comma, Period, Slash, Semicolon, Quote,
    BracketLeft, BracketRight, Backslash, Backquote,
}

impl Key {
    const COUNT: usize = 79;
    pub(crate) const WORDS: usize = (Key::COUNT + 63) / 64;

    fn as_index(self) -> usize {
        self as usize
    }

    fn from_winit(code: KeyCode) -> Option<Key> {
        use KeyCode as W;
        Some(match code {
            W::KeyA => Key::A,
            W::KeyB => Key::B,
            W::KeyC => Key::C,
            W::KeyD => Key::D,
            W::KeyE => Key::E,
            W::KeyF => Key::F,
            W::KeyG => Key::G,
            W::KeyH => Key::H,
            W::KeyI => Key::I,
            W::KeyJ => Key::J,
            W::KeyK => Key::K,
            W::KeyL => Key::L,
            W::KeyM => Key::M,
            W::KeyN => Key::N,
            W::KeyO => Key::O,
            W::KeyP => Key::P,
            W::KeyQ => Key::Q,
            W::KeyR => Key::R,
            W::KeyS => Key::S,
            W::KeyT => Key::T,
            W::KeyU => Key::U,
            W::KeyV => Key::V,
            W::KeyW => Key::W,
            W::KeyX => Key::X,
            W::KeyY => Key::Y,
            W::KeyZ => Key::Z,
            W::Digit0 => Key::Num0,
            W::Digit1 => Key::Num1,
            W::Digit2 => Key::Num2,
            W::Digit3 => Key::Num3,
            W::Digit4 => Key::Num4,
            W::Digit5 => Key::Num5,
            W::Digit6 => Key::Num6,
            W::Digit7 => Key::Num7,
            W::Digit8 => Key::Num8,
            W::Digit9 => Key::Num9,
            W::F1 => Key::F1,
            W::F2 => Key::F2,
            W::F3 => Key::F3,
            W::F4 => Key::F4,
            W::F5 => Key::F5,
            W::F6 => Key::F6,
            W::F7 => Key::F7,
            W::F8 => Key::F8,
            W::F9 => Key::F9,
            W::F10 => Key::F10,
            W::F11 => Key::F11,
            W::F12 => Key::F12,
            W::ArrowLeft => Key::Left,
            W::ArrowRight => Key::Right,
            W::ArrowUp => Key::Up,
            W::ArrowDown => Key::Down,
            W::Space => Key::Space,
            W::Enter => Key::Enter,
            W::Escape => Key::Escape,
            W::Backspace => Key::Backspace,
            W::Tab => Key::Tab,
            W::Delete => Key::Delete,
            W::Home => Key::Home,
            W::End => Key::End,
            W::PageUp => Key::PageUp,
            W::PageDown => Key::PageDown,
            W::ShiftLeft => Key::ShiftLeft,
            W::ShiftRight => Key::ShiftRight,
            W::ControlLeft => Key::ControlLeft,
            W::ControlRight => Key::ControlRight,
            W::AltLeft => Key::AltLeft,
            W::AltRight => Key::AltRight,
            W::Minus => Key::Minus,
            W::Equal => Key::Equal,
            W::Comma => Key::Comma,
            W::Period => Key::Period,
            W::Slash => Key::Slash,
            W::Semicolon => Key::Semicolon,
            W::Quote => Key::Quote,
            W::BracketLeft => Key::BracketLeft,
            W::BracketRight => Key::BracketRight,
            W::Backslash => Key::Backslash,
            W::Backquote => Key::Backquote,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
}

impl MouseButton {
    fn bit(self) -> u8 {
        1u8 << (self as u8)
    }

    fn from_winit(button: winit::event::MouseButton) -> Option<MouseButton> {
        use winit::event::MouseButton as W;
        Some(match button {
            W::Left => MouseButton::Left,
            W::Right => MouseButton::Right,
            W::Middle => MouseButton::Middle,
            W::Back => MouseButton::Back,
            W::Forward => MouseButton::Forward,
            W::Other(_) => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TouchPhase {
    Started,
    Moved,
    Ended,
    Cancelled,
}

/// One active touch point.
#[derive(Debug, Clone, Copy)]
pub struct Touch {
    pub id: u64,
    pub position: (f32, f32),
    pub phase: TouchPhase,
}

fn key_word_bit(key: Key) -> (usize, u64) {
    let index = key.as_index();
    (index / 64, 1u64 << (index % 64))
}

/// Input state polled by the frame callback.
#[derive(Debug, Clone, Default)]
pub struct Input {
    keys_down: [u64; Key::WORDS],
    keys_pressed: [u64; Key::WORDS],
    keys_released: [u64; Key::WORDS],

    mouse_down: u8,
    mouse_pressed: u8,
    mouse_released: u8,

    cursor_position: Option<(f32, f32)>,
    scroll_delta: (f32, f32),
    focused: bool,

    text_input: String,
    ime_preedit: Option<String>,

    touches: Vec<Touch>,
}

impl Input {
    pub(crate) fn new() -> Input {
        Input::default()
    }

    /// True while the key is held.
    pub fn key_down(&self, key: Key) -> bool {
        let (word, mask) = key_word_bit(key);
        (self.keys_down[word] & mask) != 0
    }

    /// True only on the frame the key went down.
    pub fn key_pressed(&self, key: Key) -> bool {
        let (word, mask) = key_word_bit(key);
        (self.keys_pressed[word] & mask) != 0
    }

    /// True only on the frame the key went up.
    pub fn key_released(&self, key: Key) -> bool {
        let (word, mask) = key_word_bit(key);
        (self.keys_released[word] & mask) != 0
    }

    pub fn mouse_down(&self, button: MouseButton) -> bool {
        (self.mouse_down & button.bit()) != 0
    }

    pub fn mouse_pressed(&self, button: MouseButton) -> bool {
        (self.mouse_pressed & button.bit()) != 0
    }

    pub fn mouse_released(&self, button: MouseButton) -> bool {
        (self.mouse_released & button.bit()) != 0
    }

    /// Cursor position in window pixels, if the cursor is over the window.
    pub fn cursor_position(&self) -> Option<(f32, f32)> {
        self.cursor_position
    }

    /// Scroll accumulated over the current frame.
    pub fn scroll_delta(&self) -> (f32, f32) {
        self.scroll_delta
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Characters typed during the current frame.
    pub fn text_input(&self) -> &str {
        &self.text_input
    }

    pub fn ime_preedit(&self) -> Option<&str> {
        self.ime_preedit.as_deref()
    }

    pub fn touches(&self) -> &[Touch] {
        &self.touches
    }

    /// Clear the per-frame edges. Called by the window after each frame.
    pub(crate) fn end_frame(&mut self) {
        self.keys_pressed = [0; Key::WORDS];
        self.keys_released = [0; Key::WORDS];
        self.mouse_pressed = 0;
        self.mouse_released = 0;
        self.scroll_delta = (0.0, 0.0);
        self.text_input.clear();
    }

    pub(crate) fn handle_focus(&mut self, focused: bool) {
        self.focused = focused;
        if !focused {
            // Keys released while unfocused would otherwise stick.
            self.keys_down = [0; Key::WORDS];
            self.keys_pressed = [0; Key::WORDS];
            self.keys_released = [0; Key::WORDS];
            self.mouse_down = 0;
            self.mouse_pressed = 0;
            self.mouse_released = 0;
            self.text_input.clear();
            self.ime_preedit = None;
        }
    }

    pub(crate) fn handle_keyboard(&mut self, state: ElementState, physical_key: PhysicalKey) {
        let PhysicalKey::Code(code) = physical_key else {
            return;
        };
        let Some(key) = Key::from_winit(code) else {
            return;
        };
        let (word, mask) = key_word_bit(key);
        match state {
            ElementState::Pressed => {
                if (self.keys_down[word] & mask) == 0 {
                    self.keys_down[word] |= mask;
                    self.keys_pressed[word] |= mask;
                }
            }
            ElementState::Released => {
                self.keys_down[word] &= !mask;
                self.keys_released[word] |= mask;
            }
        }
    }

    pub(crate) fn handle_text(&mut self, text: &str) {
        for character in text.chars().filter(|c| !c.is_control()) {
            self.text_input.push(character);
        }
    }

    pub(crate) fn handle_ime(&mut self, ime: Ime) {
        match ime {
            Ime::Preedit(value, _) => {
                self.ime_preedit = (!value.is_empty()).then_some(value);
            }
            Ime::Commit(value) => {
                self.text_input.push_str(&value);
                self.ime_preedit = None;
            }
            Ime::Enabled | Ime::Disabled => {
                self.ime_preedit = None;
            }
        }
    }

    pub(crate) fn handle_cursor_moved(&mut self, x: f32, y: f32) {
        self.cursor_position = Some((x, y));
    }

    pub(crate) fn handle_cursor_left(&mut self) {
        self.cursor_position = None;
    }

    pub(crate) fn handle_mouse_button(
        &mut self,
        state: ElementState,
        button: winit::event::MouseButton,
    ) {
        let Some(button) = MouseButton::from_winit(button) else {
            return;
        };
        let mask = button.bit();
        match state {
            ElementState::Pressed => {
                if (self.mouse_down & mask) == 0 {
                    self.mouse_down |= mask;
                    self.mouse_pressed |= mask;
                }
            }
            ElementState::Released => {
                self.mouse_down &= !mask;
                self.mouse_released |= mask;
            }
        }
    }

    pub(crate) fn handle_mouse_wheel(&mut self, delta: MouseScrollDelta) {
        match delta {
            MouseScrollDelta::LineDelta(x, y) => {
                self.scroll_delta.0 += x;
                self.scroll_delta.1 += y;
            }
            MouseScrollDelta::PixelDelta(position) => {
                self.scroll_delta.0 += position.x as f32;
                self.scroll_delta.1 += position.y as f32;
            }
        }
    }

    pub(crate) fn handle_touch(&mut self, touch: winit::event::Touch) {
        let position = (touch.location.x as f32, touch.location.y as f32);
        let phase = match touch.phase {
            winit::event::TouchPhase::Started => TouchPhase::Started,
            winit::event::TouchPhase::Moved => TouchPhase::Moved,
            winit::event::TouchPhase::Ended => TouchPhase::Ended,
            winit::event::TouchPhase::Cancelled => TouchPhase::Cancelled,
        };
        match phase {
            TouchPhase::Started => {
                self.touches.retain(|t| t.id != touch.id);
                self.touches.push(Touch {
                    id: touch.id,
                    position,
                    phase,
                });
            }
            TouchPhase::Moved => {
                if let Some(existing) = self.touches.iter_mut().find(|t| t.id == touch.id) {
                    existing.position = position;
                    existing.phase = phase;
                } else {
                    self.touches.push(Touch {
                        id: touch.id,
                        position,
                        phase,
                    });
                }
            }
            TouchPhase::Ended | TouchPhase::Cancelled => {
                self.touches.retain(|t| t.id != touch.id);
            }
        }
    }
}
