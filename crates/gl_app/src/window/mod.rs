//! # Window Lifecycle
//!
//! A [`Window`] is one native OS window bound to one GL context and one
//! overlay UI context. Domain behavior is supplied through [`WindowHooks`];
//! the window itself runs the fixed parts of every stage around them.
//!
//! ## State Machine
//!
//! ```text
//! Unconstructed --create()--> Created --init()--> Initialized --render()--> Rendering
//!                                                                 |            |
//!                                                                 +--destroy()-+--> Destroyed
//! ```
//!
//! `render()` is only valid in `Initialized` or `Rendering`; a second
//! `init()` fails with [`WindowError::AlreadyInitialized`].
//!
//! ## Frame Composition
//!
//! `render()` runs `pre_draw` (font texture binding, input marshalling into
//! the overlay), then the overlay frame with [`WindowHooks::draw`] inside it,
//! then `post_draw` (draw-list submission, accumulator reset). Hooks never
//! replace the base behavior, they run inside it.
//!
//! ## GL Context Discipline
//!
//! Every method that issues GL calls expects the window's own context to be
//! current. [`App`](crate::App) guarantees this for the calls it makes.

pub mod input;

pub use input::{InputState, KEY_SLOTS};

use std::rc::{Rc, Weak};

use thiserror::Error;

use crate::foundation::time::{FrameMetrics, Timer};
use crate::gpu::{check_errors, GpuError, GraphicsDevice};
use crate::overlay::{framebuffer_scale, OverlayBackend, OverlayContext, OverlayError, OverlayInitError, OverlayRenderer};
use crate::platform::{
    Action, Key, MonitorSelection, NativeWindowDesc, NativeWindowId, Platform, PlatformError, WindowEvent,
    OVERLAY_MOUSE_BUTTONS,
};
use crate::resources::{ResourceError, ResourceUser, SharedResources, WeakResources};
use crate::core::{OVERLAY_FONT_KEY, OVERLAY_SHADER_KEY};

/// Integer window identity; negative ids are rejected at creation
pub type WindowId = i32;

/// Cursor position reported to the overlay while the window is unfocused
pub const OFFSCREEN_CURSOR: [f32; 2] = [-1.0, -1.0];

/// Window errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// Window ids must be non-negative
    #[error("Window id {0} is negative")]
    InvalidId(WindowId),

    /// Another registered window has this id
    #[error("Window id {0} is already registered")]
    DuplicateId(WindowId),

    /// `create()` was called on a window that already has a native window
    #[error("Window {0} has already been created")]
    AlreadyCreated(WindowId),

    /// The operation needs a created window
    #[error("Window {0} has not been created")]
    NotCreated(WindowId),

    /// Native window or GL loading failed
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// No resource manager is attached
    #[error("Window {0} has no resource manager attached")]
    ResourceNotReady(WindowId),

    /// `init()` was called twice
    #[error("Window {0} is already initialized")]
    AlreadyInitialized(WindowId),

    /// Frame work requested before `init()`
    #[error("Window {0} is not initialized")]
    NotInitialized(WindowId),

    /// Resource lookup or loading failed
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// GPU object creation failed
    #[error(transparent)]
    Gpu(#[from] GpuError),

    /// Overlay failure
    #[error(transparent)]
    Overlay(#[from] OverlayError),
}

impl From<OverlayInitError> for WindowError {
    fn from(err: OverlayInitError) -> Self {
        match err {
            OverlayInitError::Overlay(err) => Self::Overlay(err),
            OverlayInitError::Gpu(err) => Self::Gpu(err),
        }
    }
}

/// Lifecycle state of a [`Window`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    /// Constructed, no native window yet
    Unconstructed,
    /// Native window, GL context and overlay context exist
    Created,
    /// Overlay GPU objects allocated; ready to render
    Initialized,
    /// At least one frame rendered
    Rendering,
    /// Torn down
    Destroyed,
}

/// Everything a hook may use during a lifecycle stage
pub struct FrameContext<'a> {
    /// Window being processed
    pub window_id: WindowId,
    /// The application's main window, if designated
    pub main_window: Option<WindowId>,
    /// The window's GL device; its context is current
    pub gpu: &'a dyn GraphicsDevice,
    /// Shared shaders and textures
    pub resources: &'a SharedResources,
    /// Current input state
    pub input: &'a InputState,
    /// Frame timing
    pub metrics: FrameMetrics,
    /// Logical size in screen coordinates
    pub size: (u32, u32),
    /// Framebuffer size in pixels
    pub buffer_size: (u32, u32),
}

impl FrameContext<'_> {
    /// Whether the window being processed is the main window
    pub fn is_main_window(&self) -> bool {
        self.main_window == Some(self.window_id)
    }

    /// Width over height of the framebuffer, 1.0 when it has no height
    pub fn aspect_ratio(&self) -> f32 {
        if self.buffer_size.1 == 0 {
            1.0
        } else {
            self.buffer_size.0 as f32 / self.buffer_size.1 as f32
        }
    }
}

/// Domain behavior plugged into a window
///
/// Every method has a no-op default. The base behavior of each stage always
/// runs; hooks add to it.
pub trait WindowHooks {
    /// Allocate domain GPU objects; runs once, after the overlay objects exist
    fn init(&mut self, _ctx: &FrameContext<'_>) -> Result<(), WindowError> {
        Ok(())
    }

    /// Advance per-frame state
    fn update(&mut self, _ctx: &FrameContext<'_>) -> Result<(), WindowError> {
        Ok(())
    }

    /// Issue domain draw calls and overlay widgets
    fn draw(&mut self, _ctx: &FrameContext<'_>, _ui: Option<&imgui::Ui>) -> Result<(), WindowError> {
        Ok(())
    }

    /// Observe an input event after the window has processed it
    fn on_event(&mut self, _event: &WindowEvent, _input: &InputState) {}

    /// Release domain GPU objects; the window's context is current
    fn teardown(&mut self, _gpu: &dyn GraphicsDevice) {}
}

/// Hooks that add nothing to the base behavior
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl WindowHooks for NoHooks {}

/// Destroys a native window unless disarmed
struct NativeWindowGuard<'a> {
    platform: &'a mut dyn Platform,
    window: Option<NativeWindowId>,
}

impl NativeWindowGuard<'_> {
    fn disarm(mut self) {
        self.window = None;
    }
}

impl Drop for NativeWindowGuard<'_> {
    fn drop(&mut self) {
        if let Some(window) = self.window.take() {
            log::warn!("Destroying partially created native window {:?}", window);
            self.platform.destroy_window(window);
        }
    }
}

fn dimension(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

/// One native window, its GL context and its overlay
pub struct Window {
    id: WindowId,
    title: String,
    state: WindowState,
    width: u32,
    height: u32,
    buffer_width: u32,
    buffer_height: u32,
    native: Option<NativeWindowId>,
    gpu: Option<Rc<dyn GraphicsDevice>>,
    overlay: Option<Box<dyn OverlayContext>>,
    overlay_renderer: OverlayRenderer,
    overlay_shader_key: String,
    overlay_font_key: String,
    viewport_dirty: bool,
    cursor_hidden: bool,
    timer: Timer,
    metrics: FrameMetrics,
    input: InputState,
    resources: WeakResources,
    hooks: Box<dyn WindowHooks>,
}

impl Window {
    /// Create an unconstructed window
    ///
    /// # Arguments
    /// * `id` - Unique identity; must be non-negative by the time `create()` runs
    /// * `width`, `height` - Requested logical size
    /// * `hooks` - Domain behavior
    pub fn new(id: WindowId, width: u32, height: u32, hooks: impl WindowHooks + 'static) -> Self {
        Self {
            id,
            title: String::new(),
            state: WindowState::Unconstructed,
            width,
            height,
            buffer_width: width,
            buffer_height: height,
            native: None,
            gpu: None,
            overlay: None,
            overlay_renderer: OverlayRenderer::new(),
            overlay_shader_key: OVERLAY_SHADER_KEY.to_string(),
            overlay_font_key: OVERLAY_FONT_KEY.to_string(),
            viewport_dirty: false,
            cursor_hidden: false,
            timer: Timer::new(),
            metrics: FrameMetrics::default(),
            input: InputState::new(),
            resources: Weak::new(),
            hooks: Box::new(hooks),
        }
    }

    /// Window id
    pub fn id(&self) -> WindowId {
        self.id
    }

    /// Title given at creation
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Lifecycle state
    pub fn state(&self) -> WindowState {
        self.state
    }

    /// Whether `init()` has completed
    pub fn is_initialized(&self) -> bool {
        matches!(self.state, WindowState::Initialized | WindowState::Rendering)
    }

    /// Logical size in screen coordinates
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Framebuffer size in pixels
    pub fn buffer_size(&self) -> (u32, u32) {
        (self.buffer_width, self.buffer_height)
    }

    /// Native handle, once created
    pub fn native(&self) -> Option<NativeWindowId> {
        self.native
    }

    /// GL device of this window's context, once created
    pub fn gpu(&self) -> Option<&Rc<dyn GraphicsDevice>> {
        self.gpu.as_ref()
    }

    /// Input state
    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// Timing of the last measured frame
    pub fn metrics(&self) -> FrameMetrics {
        self.metrics
    }

    /// Whether this window's overlay context owns the shared overlay assets
    pub fn owns_shared_overlay_assets(&self) -> bool {
        self.overlay.as_ref().is_some_and(|overlay| overlay.owns_shared_assets())
    }

    pub(crate) fn set_overlay_keys(&mut self, shader_key: &str, font_key: &str) {
        self.overlay_shader_key = shader_key.to_string();
        self.overlay_font_key = font_key.to_string();
    }

    /// Read the clipboard through this window
    pub fn clipboard_text(&self, platform: &dyn Platform) -> Option<String> {
        self.native.and_then(|native| platform.clipboard_text(native))
    }

    /// Write the clipboard through this window
    pub fn set_clipboard_text(&self, platform: &mut dyn Platform, text: &str) {
        if let Some(native) = self.native {
            platform.set_clipboard_text(native, text);
        }
    }

    /// Allocate the native window, its GL context and the overlay context
    ///
    /// On failure nothing is left behind: a native window created before the
    /// failing step is destroyed before the error is returned.
    ///
    /// # Arguments
    /// * `title` - Title bar text
    /// * `monitor` - Windowed or fullscreen
    /// * `share` - Native window whose GL objects the new context can see
    ///
    /// # Errors
    /// [`WindowError::InvalidId`] for a negative id, [`WindowError::Platform`]
    /// when the native window or GL loading fails, [`WindowError::Overlay`]
    /// when the overlay context cannot be created.
    pub fn create(
        &mut self,
        platform: &mut dyn Platform,
        overlay_backend: &mut dyn OverlayBackend,
        title: &str,
        monitor: MonitorSelection,
        share: Option<NativeWindowId>,
    ) -> Result<(), WindowError> {
        if self.id < 0 {
            return Err(WindowError::InvalidId(self.id));
        }
        if self.state != WindowState::Unconstructed {
            return Err(WindowError::AlreadyCreated(self.id));
        }

        let native = platform.create_window(&NativeWindowDesc {
            width: self.width,
            height: self.height,
            title,
            monitor,
            share,
        })?;

        let mut guard = NativeWindowGuard {
            platform,
            window: Some(native),
        };
        let gpu = guard.platform.load_graphics(native)?;
        let (width, height) = guard.platform.window_size(native);
        let (buffer_width, buffer_height) = guard.platform.framebuffer_size(native);
        let overlay = overlay_backend.create_context(self.id)?;
        guard.disarm();

        gpu.viewport(0, 0, buffer_width, buffer_height);

        self.title = title.to_string();
        self.native = Some(native);
        self.width = dimension(width);
        self.height = dimension(height);
        self.buffer_width = dimension(buffer_width);
        self.buffer_height = dimension(buffer_height);
        self.gpu = Some(gpu);
        self.overlay = Some(overlay);
        self.sync_overlay_display();
        self.state = WindowState::Created;

        log::info!(
            "Window {} '{}' created: {}x{} (framebuffer {}x{})",
            self.id,
            self.title,
            self.width,
            self.height,
            self.buffer_width,
            self.buffer_height
        );
        Ok(())
    }

    /// Allocate the overlay GPU objects and run the init hook
    ///
    /// # Errors
    /// [`WindowError::ResourceNotReady`] without a live resource manager,
    /// [`WindowError::AlreadyInitialized`] on a second call.
    pub fn init(&mut self, main_window: Option<WindowId>) -> Result<(), WindowError> {
        match self.state {
            WindowState::Created => {}
            WindowState::Initialized | WindowState::Rendering => return Err(WindowError::AlreadyInitialized(self.id)),
            WindowState::Unconstructed | WindowState::Destroyed => return Err(WindowError::NotCreated(self.id)),
        }

        let resources = self.resources.upgrade().ok_or(WindowError::ResourceNotReady(self.id))?;
        let gpu = self.gpu.clone().ok_or(WindowError::NotCreated(self.id))?;

        let shader = resources.borrow().get_shader(&self.overlay_shader_key)?;
        self.overlay_renderer.init(gpu.as_ref(), shader)?;

        let ctx = FrameContext {
            window_id: self.id,
            main_window,
            gpu: gpu.as_ref(),
            resources: &resources,
            input: &self.input,
            metrics: self.metrics,
            size: (self.width, self.height),
            buffer_size: (self.buffer_width, self.buffer_height),
        };
        if let Err(err) = self.hooks.init(&ctx) {
            // Stay in Created with nothing allocated so init() can be retried
            self.overlay_renderer.release(gpu.as_ref());
            return Err(err);
        }

        check_errors(gpu.as_ref(), &format!("Window {} init", self.id));
        self.state = WindowState::Initialized;
        log::debug!("Window {} initialized", self.id);
        Ok(())
    }

    /// Measure the time since the previous frame
    pub fn compute_metrics(&mut self) {
        self.timer.update();
        self.metrics = self.timer.metrics();
    }

    /// Run the update hook
    pub fn update(&mut self, main_window: Option<WindowId>) -> Result<(), WindowError> {
        if !self.is_initialized() {
            return Err(WindowError::NotInitialized(self.id));
        }
        let resources = self.resources.upgrade().ok_or(WindowError::ResourceNotReady(self.id))?;
        let gpu = self.gpu.clone().ok_or(WindowError::NotCreated(self.id))?;

        let ctx = FrameContext {
            window_id: self.id,
            main_window,
            gpu: gpu.as_ref(),
            resources: &resources,
            input: &self.input,
            metrics: self.metrics,
            size: (self.width, self.height),
            buffer_size: (self.buffer_width, self.buffer_height),
        };
        self.hooks.update(&ctx)
    }

    /// Render one frame: `pre_draw`, the overlay frame around the draw hook, `post_draw`
    ///
    /// The one-shot input accumulators are zero when this returns, whether
    /// or not the frame succeeded.
    ///
    /// # Errors
    /// [`WindowError::NotInitialized`] before `init()`; hook and overlay
    /// failures are passed through.
    pub fn render(&mut self, platform: &mut dyn Platform, main_window: Option<WindowId>) -> Result<(), WindowError> {
        if !self.is_initialized() {
            return Err(WindowError::NotInitialized(self.id));
        }

        let result = self.render_frame(platform, main_window);
        if result.is_err() {
            self.input.take_mouse_latch();
            self.input.end_frame();
        } else {
            self.state = WindowState::Rendering;
        }
        result
    }

    fn render_frame(&mut self, platform: &mut dyn Platform, main_window: Option<WindowId>) -> Result<(), WindowError> {
        let native = self.native.ok_or(WindowError::NotCreated(self.id))?;
        let gpu = self.gpu.clone().ok_or(WindowError::NotCreated(self.id))?;
        let resources = self.resources.upgrade().ok_or(WindowError::ResourceNotReady(self.id))?;

        self.pre_draw(platform, native, gpu.as_ref(), &resources);

        let overlay = self.overlay.as_mut().ok_or(OverlayError::Released(self.id))?;
        let ctx = FrameContext {
            window_id: self.id,
            main_window,
            gpu: gpu.as_ref(),
            resources: &resources,
            input: &self.input,
            metrics: self.metrics,
            size: (self.width, self.height),
            buffer_size: (self.buffer_width, self.buffer_height),
        };
        let hooks = &mut self.hooks;
        let mut drawn = Ok(());
        let draw_data = overlay.frame(&mut |ui| drawn = hooks.draw(&ctx, ui))?;
        drawn?;

        self.post_draw(gpu.as_ref(), &draw_data);
        Ok(())
    }

    fn pre_draw(
        &mut self,
        platform: &mut dyn Platform,
        native: NativeWindowId,
        gpu: &dyn GraphicsDevice,
        resources: &SharedResources,
    ) {
        if self.viewport_dirty {
            gpu.viewport(0, 0, self.buffer_width as i32, self.buffer_height as i32);
            self.viewport_dirty = false;
        }

        let Some(overlay) = self.overlay.as_mut() else {
            return;
        };

        if !overlay.has_font_texture() {
            match resources.borrow().get_texture(&self.overlay_font_key) {
                Ok(texture) => overlay.set_font_texture(texture.id()),
                Err(err) => log::debug!("Window {}: overlay font not available yet: {}", self.id, err),
            }
        }

        overlay.set_display(
            [self.width as f32, self.height as f32],
            framebuffer_scale((self.width, self.height), (self.buffer_width, self.buffer_height)),
        );
        overlay.set_delta_time(self.metrics.delta_time);

        // A press seen this frame counts as held so clicks shorter than a frame are not lost
        let latch = self.input.take_mouse_latch();
        let mut down = [false; 3];
        for (index, button) in OVERLAY_MOUSE_BUTTONS.iter().enumerate() {
            down[index] = latch[index] || platform.is_mouse_button_held(native, *button);
        }
        overlay.set_mouse_down(down);

        let (scroll_x, scroll_y) = self.input.scroll();
        overlay.set_mouse_wheel(scroll_x as f32, scroll_y as f32);

        let hide_cursor = overlay.mouse_draw_cursor();
        if hide_cursor != self.cursor_hidden {
            platform.set_cursor_hidden(native, hide_cursor);
            self.cursor_hidden = hide_cursor;
        }
    }

    fn post_draw(&mut self, gpu: &dyn GraphicsDevice, draw_data: &crate::overlay::OverlayDrawData) {
        self.overlay_renderer.submit(gpu, draw_data);
        self.input.end_frame();
    }

    /// Feed one native input event into the window and the overlay
    ///
    /// Escape sets the window's close flag. Cursor moves while unfocused
    /// only report [`OFFSCREEN_CURSOR`] to the overlay. Viewport changes are
    /// applied at the start of the next frame, when the context is current.
    pub fn handle_event(&mut self, event: &WindowEvent, platform: &mut dyn Platform) {
        let Some(native) = self.native else {
            return;
        };

        match *event {
            WindowEvent::Char(character) => {
                let code = u32::from(character);
                if code > 0 && code < 0x10000 {
                    if let Some(overlay) = self.overlay.as_mut() {
                        overlay.add_input_character(character);
                    }
                }
            }
            WindowEvent::Key(key, _, action, _) => {
                if key == Key::Escape && action == Action::Press {
                    log::info!("Window {}: escape pressed, requesting close", self.id);
                    platform.set_should_close(native, true);
                }

                let tracked = self.input.key_event(key, action);
                if let Some(overlay) = self.overlay.as_mut() {
                    if tracked && action != Action::Repeat {
                        overlay.set_key(key, action == Action::Press);
                    }
                    overlay.set_modifiers(self.input.modifiers());
                }
            }
            WindowEvent::MouseButton(button, action, _) => self.input.mouse_button_event(button, action),
            WindowEvent::CursorPos(x, y) => {
                if platform.is_focused(native) {
                    if let Some(overlay) = self.overlay.as_mut() {
                        overlay.set_mouse_pos([x as f32, y as f32]);
                    }
                    self.input.mouse_move(x, y);
                } else if let Some(overlay) = self.overlay.as_mut() {
                    overlay.set_mouse_pos(OFFSCREEN_CURSOR);
                }
            }
            WindowEvent::Scroll(x, y) => self.input.scroll_event(x, y),
            WindowEvent::Focus(false) => self.input.reset_first_mouse(),
            WindowEvent::Size(width, height) => {
                self.width = dimension(width);
                self.height = dimension(height);
                self.sync_overlay_display();
            }
            WindowEvent::FramebufferSize(width, height) => {
                self.buffer_width = dimension(width);
                self.buffer_height = dimension(height);
                self.viewport_dirty = true;
                self.sync_overlay_display();
            }
            _ => {}
        }

        log::trace!("Window {}: {:?}", self.id, event);
        self.hooks.on_event(event, &self.input);
    }

    fn sync_overlay_display(&mut self) {
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.set_display(
                [self.width as f32, self.height as f32],
                framebuffer_scale((self.width, self.height), (self.buffer_width, self.buffer_height)),
            );
        }
    }

    /// Release GPU objects and the overlay context, then destroy the native window
    pub fn destroy(&mut self, platform: &mut dyn Platform, overlay_backend: &mut dyn OverlayBackend) {
        if let Some(native) = self.release(platform, overlay_backend) {
            platform.destroy_window(native);
        }
    }

    /// Release like [`destroy`](Self::destroy) but keep the native window
    /// alive, hidden, and hand its handle to the caller
    pub(crate) fn retire(
        &mut self,
        platform: &mut dyn Platform,
        overlay_backend: &mut dyn OverlayBackend,
    ) -> Option<NativeWindowId> {
        let native = self.release(platform, overlay_backend)?;
        platform.hide_window(native);
        Some(native)
    }

    fn release(&mut self, platform: &mut dyn Platform, overlay_backend: &mut dyn OverlayBackend) -> Option<NativeWindowId> {
        if self.state == WindowState::Destroyed {
            return None;
        }

        if let Some(gpu) = self.gpu.take() {
            // GL objects can only be deleted in their own context
            platform.make_context_current(self.native);
            self.hooks.teardown(gpu.as_ref());
            self.overlay_renderer.release(gpu.as_ref());
        }

        if let Some(mut overlay) = self.overlay.take() {
            if overlay.owns_shared_assets() {
                overlay_backend.release_shared_assets(self.id);
            }
            overlay.release();
        }

        self.state = WindowState::Destroyed;
        log::info!("Window {} '{}' destroyed", self.id, self.title);
        self.native.take()
    }
}

impl ResourceUser for Window {
    fn set_resource_manager(&mut self, resources: &SharedResources) {
        self.resources = Rc::downgrade(resources);
    }

    fn resource_manager(&self) -> Option<SharedResources> {
        self.resources.upgrade()
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        if matches!(
            self.state,
            WindowState::Created | WindowState::Initialized | WindowState::Rendering
        ) {
            log::warn!("Window {} dropped without teardown; its GPU objects are leaked", self.id);
        }
    }
}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("state", &self.state)
            .field("size", &(self.width, self.height))
            .field("buffer_size", &(self.buffer_width, self.buffer_height))
            .field("native", &self.native)
            .finish_non_exhaustive()
    }
}
