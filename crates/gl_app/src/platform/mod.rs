//! # Platform Abstraction
//!
//! The native windowing library sits behind [`Platform`]. The application and
//! window lifecycle only ever see opaque [`NativeWindowId`] handles plus the
//! event stream, which keeps them testable without a display.
//!
//! ## Responsibilities
//!
//! - Library startup with OpenGL context hints, and shutdown
//! - Native window creation with optional context sharing
//! - Loading GL entry points for a window's context into a [`GraphicsDevice`]
//! - Context switching, buffer swaps and event polling
//! - Per-window queries: close flag, focus, held mouse buttons, sizes
//! - Clipboard and cursor visibility
//!
//! Input events use `glfw::WindowEvent` directly; every backend speaks GLFW's
//! event vocabulary.

mod glfw_platform;

pub use glfw_platform::GlfwPlatform;

use std::rc::Rc;

use thiserror::Error;

use crate::core::ContextConfig;
use crate::gpu::{GpuError, GraphicsDevice};

pub use glfw::{Action, Key, Modifiers, MouseButton, WindowEvent};

/// Opaque handle to a native window owned by a [`Platform`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeWindowId(pub u64);

/// Which monitor a new window occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonitorSelection {
    /// A regular decorated window
    #[default]
    Windowed,
    /// Fullscreen on the primary monitor
    PrimaryFullscreen,
}

/// Parameters for a native window
#[derive(Debug, Clone, Copy)]
pub struct NativeWindowDesc<'a> {
    /// Requested width in screen coordinates
    pub width: u32,
    /// Requested height in screen coordinates
    pub height: u32,
    /// Title bar text
    pub title: &'a str,
    /// Windowed or fullscreen
    pub monitor: MonitorSelection,
    /// Window whose GL context objects are shared with the new one
    pub share: Option<NativeWindowId>,
}

/// Platform errors
#[derive(Error, Debug)]
pub enum PlatformError {
    /// The windowing library could not start
    #[error("Failed to initialize windowing library: {0}")]
    InitFailed(String),

    /// Operation needs an initialized library
    #[error("Windowing library is not initialized")]
    NotInitialized,

    /// Native window creation failed
    #[error("Failed to create window '{0}'")]
    WindowCreation(String),

    /// GL entry points could not be loaded for a window
    #[error("Failed to load OpenGL for window: {0}")]
    GraphicsInit(#[from] GpuError),

    /// The handle does not name a live window
    #[error("Unknown native window {0:?}")]
    UnknownWindow(NativeWindowId),
}

/// Native windowing library
///
/// Queries on an unknown handle return neutral values (`false`, `(0, 0)`,
/// `None`) and mutations on one are ignored.
pub trait Platform {
    /// Start the library with the given context hints
    fn init(&mut self, context: &ContextConfig) -> Result<(), PlatformError>;

    /// Whether [`init`](Self::init) has succeeded and [`terminate`](Self::terminate) not yet run
    fn is_initialized(&self) -> bool;

    /// Create a native window and its GL context
    fn create_window(&mut self, desc: &NativeWindowDesc<'_>) -> Result<NativeWindowId, PlatformError>;

    /// Make the window's context current and load GL for it
    fn load_graphics(&mut self, window: NativeWindowId) -> Result<Rc<dyn GraphicsDevice>, PlatformError>;

    /// Destroy a native window
    fn destroy_window(&mut self, window: NativeWindowId);

    /// Hide a window without destroying it
    fn hide_window(&mut self, window: NativeWindowId);

    /// Bind a window's context to this thread, or unbind with `None`
    fn make_context_current(&mut self, window: Option<NativeWindowId>);

    /// Present the window's back buffer
    fn swap_buffers(&mut self, window: NativeWindowId);

    /// Process pending OS events and return them tagged with their window
    fn poll_events(&mut self) -> Vec<(NativeWindowId, WindowEvent)>;

    /// The window's close flag
    fn should_close(&self, window: NativeWindowId) -> bool;

    /// Set the window's close flag
    fn set_should_close(&mut self, window: NativeWindowId, value: bool);

    /// Whether the window has input focus
    fn is_focused(&self, window: NativeWindowId) -> bool;

    /// Whether a mouse button is currently held over the window
    fn is_mouse_button_held(&self, window: NativeWindowId, button: MouseButton) -> bool;

    /// Logical size in screen coordinates
    fn window_size(&self, window: NativeWindowId) -> (i32, i32);

    /// Framebuffer size in pixels
    fn framebuffer_size(&self, window: NativeWindowId) -> (i32, i32);

    /// Hide or show the OS cursor over the window
    fn set_cursor_hidden(&mut self, window: NativeWindowId, hidden: bool);

    /// Read the clipboard
    fn clipboard_text(&self, window: NativeWindowId) -> Option<String>;

    /// Write the clipboard
    fn set_clipboard_text(&mut self, window: NativeWindowId, text: &str);

    /// Shut the library down; every window must already be destroyed
    fn terminate(&mut self);
}

/// Mouse buttons tracked by the overlay, in overlay order
pub const OVERLAY_MOUSE_BUTTONS: [MouseButton; 3] = [MouseButton::Button1, MouseButton::Button2, MouseButton::Button3];

/// Index of a mouse button in [`OVERLAY_MOUSE_BUTTONS`]
pub fn overlay_button_index(button: MouseButton) -> Option<usize> {
    OVERLAY_MOUSE_BUTTONS.iter().position(|candidate| *candidate == button)
}
