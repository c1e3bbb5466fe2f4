//! Per-window input tracking
//!
//! Keeps the state window hooks read each frame: held keys, mouse offsets
//! between consecutive cursor events, a press latch per overlay button and
//! the scroll accumulated since the last rendered frame.

use crate::overlay::OverlayModifiers;
use crate::platform::{overlay_button_index, Action, Key, MouseButton};

/// Number of key slots tracked; keys outside `0..KEY_SLOTS` are ignored
pub const KEY_SLOTS: usize = 1024;

/// Input state of one window
#[derive(Debug, Clone)]
pub struct InputState {
    keys: [bool; KEY_SLOTS],
    mouse_pressed: [bool; 3],
    first_mouse: bool,
    last_pos: (f64, f64),
    offset: (f64, f64),
    scroll: (f64, f64),
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            keys: [false; KEY_SLOTS],
            mouse_pressed: [false; 3],
            first_mouse: true,
            last_pos: (0.0, 0.0),
            offset: (0.0, 0.0),
            scroll: (0.0, 0.0),
        }
    }
}

fn key_slot(key: Key) -> Option<usize> {
    usize::try_from(key as i32).ok().filter(|slot| *slot < KEY_SLOTS)
}

impl InputState {
    /// Fresh state: nothing held, next cursor event is a first move
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key action; returns `false` for keys outside the tracked range
    ///
    /// Repeats leave the state unchanged.
    pub fn key_event(&mut self, key: Key, action: Action) -> bool {
        let Some(slot) = key_slot(key) else {
            return false;
        };
        match action {
            Action::Press => self.keys[slot] = true,
            Action::Release => self.keys[slot] = false,
            Action::Repeat => {}
        }
        true
    }

    /// Whether a key is held
    pub fn is_key_down(&self, key: Key) -> bool {
        key_slot(key).is_some_and(|slot| self.keys[slot])
    }

    /// Modifier state derived from the left and right modifier keys
    pub fn modifiers(&self) -> OverlayModifiers {
        let either = |left, right| self.is_key_down(left) || self.is_key_down(right);
        OverlayModifiers {
            ctrl: either(Key::LeftControl, Key::RightControl),
            shift: either(Key::LeftShift, Key::RightShift),
            alt: either(Key::LeftAlt, Key::RightAlt),
            super_key: either(Key::LeftSuper, Key::RightSuper),
        }
    }

    /// Latch a button press so it is seen by the next frame even if released first
    pub fn mouse_button_event(&mut self, button: MouseButton, action: Action) {
        if action != Action::Press {
            return;
        }
        if let Some(index) = overlay_button_index(button) {
            self.mouse_pressed[index] = true;
        }
    }

    /// Latched presses since the last [`take_mouse_latch`](Self::take_mouse_latch)
    pub fn mouse_latch(&self) -> [bool; 3] {
        self.mouse_pressed
    }

    /// Read and clear the press latch
    pub fn take_mouse_latch(&mut self) -> [bool; 3] {
        std::mem::take(&mut self.mouse_pressed)
    }

    /// Record a cursor move from a focused window
    ///
    /// Returns the offset from the previous position, with y growing upwards.
    /// The first move after creation or focus loss yields `(0.0, 0.0)`.
    pub fn mouse_move(&mut self, x: f64, y: f64) -> (f64, f64) {
        if self.first_mouse {
            self.last_pos = (x, y);
            self.first_mouse = false;
        }

        self.offset = (x - self.last_pos.0, self.last_pos.1 - y);
        self.last_pos = (x, y);
        self.offset
    }

    /// Treat the next cursor move as a first move
    pub fn reset_first_mouse(&mut self) {
        self.first_mouse = true;
    }

    /// Last cursor position seen while focused
    pub fn last_mouse_pos(&self) -> (f64, f64) {
        self.last_pos
    }

    /// Offset computed by the most recent cursor move
    pub fn mouse_offset(&self) -> (f64, f64) {
        self.offset
    }

    /// Accumulate scroll offsets
    pub fn scroll_event(&mut self, x: f64, y: f64) {
        self.scroll.0 += x;
        self.scroll.1 += y;
    }

    /// Scroll accumulated since the last rendered frame
    pub fn scroll(&self) -> (f64, f64) {
        self.scroll
    }

    /// Reset the per-frame accumulators after a frame has consumed them
    pub fn end_frame(&mut self) {
        self.scroll = (0.0, 0.0);
    }
}
