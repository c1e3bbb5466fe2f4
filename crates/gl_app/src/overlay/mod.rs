//! # UI Overlay
//!
//! Every window draws an immediate-mode UI on top of its own content. The
//! overlay is split in two kinds of state:
//!
//! - **Shared assets** ([`SharedOverlayAssets`]): the font atlas and its GPU
//!   texture. One set exists per process and it is owned by the first window
//!   that created an overlay context.
//! - **Per-window contexts** ([`OverlayContext`]): widget ids, input focus,
//!   display metrics. Never shared between windows. A context references the
//!   shared assets but only the owning window's teardown may release them.
//!
//! Backends produce a fixed draw-list shape ([`OverlayDrawData`]) which
//! [`OverlayRenderer`] submits to the GPU with full state save/restore.

mod imgui_backend;
mod renderer;

pub use imgui_backend::{ImguiBackend, ImguiOverlay};
pub use renderer::{ortho_projection, scissor_box, OverlayInitError, OverlayRenderer};

use thiserror::Error;

use crate::gpu::ObjectId;
use crate::platform::Key;

/// Overlay errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OverlayError {
    /// Another overlay context is active on this thread
    #[error("Overlay context for window {0} could not be activated")]
    ContextBusy(i32),

    /// The context was released
    #[error("Overlay context for window {0} has been released")]
    Released(i32),

    /// The font atlas has not been built yet
    #[error("Overlay font atlas has not been built")]
    FontAtlasNotBuilt,

    /// The overlay shader lacks a vertex attribute
    #[error("Overlay shader has no '{0}' attribute")]
    MissingAttribute(&'static str),
}

/// Overlay vertex as uploaded to the GPU
///
/// Layout: `Position` (2 x f32), `UV` (2 x f32), `Color` (4 x u8, normalized).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OverlayVertex {
    /// Position in display coordinates
    pub pos: [f32; 2],
    /// Texture coordinates
    pub uv: [f32; 2],
    /// RGBA color
    pub col: [u8; 4],
}

unsafe impl bytemuck::Pod for OverlayVertex {}
unsafe impl bytemuck::Zeroable for OverlayVertex {}

/// Overlay index type
pub type OverlayIndex = u16;

/// One indexed draw within a draw list
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayDrawCommand {
    /// Texture bound for this draw
    pub texture: ObjectId,
    /// Clip rectangle `[x1, y1, x2, y2]` in display coordinates
    pub clip_rect: [f32; 4],
    /// Number of indices
    pub element_count: usize,
    /// First index within the list's index buffer
    pub index_offset: usize,
}

/// Vertex and index data plus the commands that consume them
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OverlayDrawList {
    /// Vertex buffer
    pub vertices: Vec<OverlayVertex>,
    /// Index buffer
    pub indices: Vec<OverlayIndex>,
    /// Draw commands in submission order
    pub commands: Vec<OverlayDrawCommand>,
}

/// A finished overlay frame
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OverlayDrawData {
    /// Display size in screen coordinates
    pub display_size: [f32; 2],
    /// Framebuffer pixels per screen coordinate
    pub framebuffer_scale: [f32; 2],
    /// Draw lists in submission order
    pub lists: Vec<OverlayDrawList>,
}

impl OverlayDrawData {
    /// Framebuffer size in whole pixels
    pub fn framebuffer_size(&self) -> (i32, i32) {
        (
            (self.display_size[0] * self.framebuffer_scale[0]) as i32,
            (self.display_size[1] * self.framebuffer_scale[1]) as i32,
        )
    }

    /// Total number of draw commands
    pub fn command_count(&self) -> usize {
        self.lists.iter().map(|list| list.commands.len()).sum()
    }
}

/// Keyboard modifier state, derived from left/right key state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverlayModifiers {
    /// Either Control key held
    pub ctrl: bool,
    /// Either Shift key held
    pub shift: bool,
    /// Either Alt key held
    pub alt: bool,
    /// Either Super key held
    pub super_key: bool,
}

/// RGBA32 pixels of the font atlas
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontAtlasImage {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// `width * height * 4` bytes
    pub pixels: Vec<u8>,
}

/// Process-wide overlay assets and their owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharedOverlayAssets {
    /// Window whose teardown releases the assets
    pub owner: i32,
    /// Font atlas texture, 0 until uploaded
    pub font_texture: ObjectId,
}

/// Process-wide overlay library state
pub trait OverlayBackend {
    /// Create the overlay context for a window
    ///
    /// The first window to get a context becomes the owner of the shared
    /// assets.
    fn create_context(&mut self, window_id: i32) -> Result<Box<dyn OverlayContext>, OverlayError>;

    /// Current shared assets, if they have not been released
    fn shared_assets(&self) -> Option<SharedOverlayAssets>;

    /// Rasterize the font atlas
    fn build_font_atlas(&mut self) -> Result<FontAtlasImage, OverlayError>;

    /// Record the GPU texture holding the font atlas
    fn set_font_texture(&mut self, texture: ObjectId);

    /// Release the shared assets; only the owning window calls this
    fn release_shared_assets(&mut self, window_id: i32);
}

/// Per-window overlay state
///
/// Input setters may be called at any time; backends apply them at the
/// start of the next [`frame`](Self::frame).
pub trait OverlayContext {
    /// Window this context belongs to
    fn window_id(&self) -> i32;

    /// Whether this context's window owns the shared assets
    fn owns_shared_assets(&self) -> bool;

    /// Display size and framebuffer scale
    fn set_display(&mut self, size: [f32; 2], framebuffer_scale: [f32; 2]);

    /// Seconds since the previous frame
    fn set_delta_time(&mut self, delta_time: f32);

    /// Typed character
    fn add_input_character(&mut self, character: char);

    /// Key state change
    fn set_key(&mut self, key: Key, down: bool);

    /// Modifier state
    fn set_modifiers(&mut self, modifiers: OverlayModifiers);

    /// Cursor position; `[-1.0, -1.0]` means "not over the window"
    fn set_mouse_pos(&mut self, pos: [f32; 2]);

    /// Left, right and middle button state for this frame
    fn set_mouse_down(&mut self, down: [bool; 3]);

    /// Scroll offsets for this frame
    fn set_mouse_wheel(&mut self, horizontal: f32, vertical: f32);

    /// Whether the overlay draws its own cursor
    fn mouse_draw_cursor(&self) -> bool;

    /// Whether a font texture has been attached
    fn has_font_texture(&self) -> bool;

    /// Attach the font atlas texture
    fn set_font_texture(&mut self, texture: ObjectId);

    /// Run one UI frame
    ///
    /// `build` is called exactly once between frame begin and end; it gets
    /// the UI builder when the backend has one.
    fn frame(&mut self, build: &mut dyn FnMut(Option<&imgui::Ui>)) -> Result<OverlayDrawData, OverlayError>;

    /// Destroy the context; further frames fail with [`OverlayError::Released`]
    fn release(&mut self);
}

/// Framebuffer scale for a logical and a framebuffer size
///
/// An axis with zero logical size gets scale 0.
pub fn framebuffer_scale(size: (u32, u32), buffer_size: (u32, u32)) -> [f32; 2] {
    let axis = |logical: u32, buffer: u32| if logical > 0 { buffer as f32 / logical as f32 } else { 0.0 };
    [axis(size.0, buffer_size.0), axis(size.1, buffer_size.1)]
}
