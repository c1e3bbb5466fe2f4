//! GLFW implementation of [`Platform`]

use std::collections::BTreeMap;
use std::rc::Rc;

use glfw::{Context, Glfw, GlfwReceiver, OpenGlProfileHint, PWindow, WindowHint, WindowMode};

use super::{MonitorSelection, MouseButton, NativeWindowDesc, NativeWindowId, Platform, PlatformError, WindowEvent};
use crate::core::ContextConfig;
use crate::foundation::logging::glfw_error_callback;
use crate::gpu::{GlowDevice, GraphicsDevice};

struct NativeWindow {
    window: PWindow,
    events: GlfwReceiver<(f64, WindowEvent)>,
}

/// GLFW-backed platform
///
/// Every native window owns a GL context. Windows are kept in creation order
/// so that polled events come back in a stable order.
#[derive(Default)]
pub struct GlfwPlatform {
    glfw: Option<Glfw>,
    context: ContextConfig,
    windows: BTreeMap<NativeWindowId, NativeWindow>,
    next_id: u64,
}

impl GlfwPlatform {
    /// Create an uninitialized platform
    pub fn new() -> Self {
        Self::default()
    }

    fn window(&self, id: NativeWindowId) -> Option<&PWindow> {
        self.windows.get(&id).map(|native| &native.window)
    }

    fn window_mut(&mut self, id: NativeWindowId) -> Option<&mut PWindow> {
        self.windows.get_mut(&id).map(|native| &mut native.window)
    }
}

impl Platform for GlfwPlatform {
    fn init(&mut self, context: &ContextConfig) -> Result<(), PlatformError> {
        if self.glfw.is_some() {
            return Ok(());
        }

        let mut glfw = glfw::init(glfw_error_callback).map_err(|e| PlatformError::InitFailed(format!("{e:?}")))?;

        glfw.window_hint(WindowHint::ContextVersion(context.major, context.minor));
        if context.core_profile {
            glfw.window_hint(WindowHint::OpenGlProfile(OpenGlProfileHint::Core));
        }
        glfw.window_hint(WindowHint::OpenGlForwardCompat(context.forward_compat));
        glfw.window_hint(WindowHint::Resizable(context.resizable));

        log::info!(
            "GLFW initialized, requesting OpenGL {}.{} ({})",
            context.major,
            context.minor,
            if context.core_profile { "core" } else { "compat" }
        );

        self.context = *context;
        self.glfw = Some(glfw);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.glfw.is_some()
    }

    fn create_window(&mut self, desc: &NativeWindowDesc<'_>) -> Result<NativeWindowId, PlatformError> {
        let Self { glfw, windows, next_id, .. } = self;
        let glfw = glfw.as_mut().ok_or(PlatformError::NotInitialized)?;

        let share = match desc.share {
            Some(id) => Some(&windows.get(&id).ok_or(PlatformError::UnknownWindow(id))?.window),
            None => None,
        };

        let created = glfw.with_primary_monitor(|glfw, monitor| {
            let mode = match (desc.monitor, monitor) {
                (MonitorSelection::PrimaryFullscreen, Some(monitor)) => WindowMode::FullScreen(&*monitor),
                (MonitorSelection::PrimaryFullscreen, None) => {
                    log::warn!("No primary monitor available, opening '{}' windowed", desc.title);
                    WindowMode::Windowed
                }
                (MonitorSelection::Windowed, _) => WindowMode::Windowed,
            };

            match share {
                Some(share) => share.create_shared(desc.width, desc.height, desc.title, mode),
                None => glfw.create_window(desc.width, desc.height, desc.title, mode),
            }
        });

        let (mut window, events) = created.ok_or_else(|| PlatformError::WindowCreation(desc.title.to_string()))?;

        window.set_key_polling(true);
        window.set_char_polling(true);
        window.set_mouse_button_polling(true);
        window.set_cursor_pos_polling(true);
        window.set_scroll_polling(true);
        window.set_size_polling(true);
        window.set_framebuffer_size_polling(true);
        window.set_focus_polling(true);
        window.set_close_polling(true);

        *next_id += 1;
        let id = NativeWindowId(*next_id);
        windows.insert(id, NativeWindow { window, events });

        log::debug!("Created native window {:?} '{}'", id, desc.title);
        Ok(id)
    }

    fn load_graphics(&mut self, window: NativeWindowId) -> Result<Rc<dyn GraphicsDevice>, PlatformError> {
        let (major, minor) = (self.context.major, self.context.minor);
        let native = self.window_mut(window).ok_or(PlatformError::UnknownWindow(window))?;
        native.make_current();

        // SAFETY: the window's context was made current just above
        let gl = unsafe { glow::Context::from_loader_function(|symbol| native.get_proc_address(symbol) as *const _) };
        let device = GlowDevice::new(gl, major, minor)?;
        Ok(Rc::new(device))
    }

    fn destroy_window(&mut self, window: NativeWindowId) {
        // Dropping the PWindow destroys the native window
        if self.windows.remove(&window).is_some() {
            log::debug!("Destroyed native window {:?}", window);
        }
    }

    fn hide_window(&mut self, window: NativeWindowId) {
        if let Some(native) = self.window_mut(window) {
            native.hide();
        }
    }

    fn make_context_current(&mut self, window: Option<NativeWindowId>) {
        match window.and_then(|id| self.window_mut(id)) {
            Some(native) => native.make_current(),
            None => glfw::make_context_current(None),
        }
    }

    fn swap_buffers(&mut self, window: NativeWindowId) {
        if let Some(native) = self.window_mut(window) {
            native.swap_buffers();
        }
    }

    fn poll_events(&mut self) -> Vec<(NativeWindowId, WindowEvent)> {
        let Some(glfw) = self.glfw.as_mut() else {
            return Vec::new();
        };
        glfw.poll_events();

        let mut events = Vec::new();
        for (id, native) in &self.windows {
            events.extend(glfw::flush_messages(&native.events).map(|(_, event)| (*id, event)));
        }
        events
    }

    fn should_close(&self, window: NativeWindowId) -> bool {
        self.window(window).is_some_and(|native| native.should_close())
    }

    fn set_should_close(&mut self, window: NativeWindowId, value: bool) {
        if let Some(native) = self.window_mut(window) {
            native.set_should_close(value);
        }
    }

    fn is_focused(&self, window: NativeWindowId) -> bool {
        self.window(window).is_some_and(|native| native.is_focused())
    }

    fn is_mouse_button_held(&self, window: NativeWindowId, button: MouseButton) -> bool {
        self.window(window)
            .is_some_and(|native| native.get_mouse_button(button) == glfw::Action::Press)
    }

    fn window_size(&self, window: NativeWindowId) -> (i32, i32) {
        self.window(window).map_or((0, 0), |native| native.get_size())
    }

    fn framebuffer_size(&self, window: NativeWindowId) -> (i32, i32) {
        self.window(window).map_or((0, 0), |native| native.get_framebuffer_size())
    }

    fn set_cursor_hidden(&mut self, window: NativeWindowId, hidden: bool) {
        if let Some(native) = self.window_mut(window) {
            let mode = if hidden { glfw::CursorMode::Hidden } else { glfw::CursorMode::Normal };
            native.set_cursor_mode(mode);
        }
    }

    fn clipboard_text(&self, window: NativeWindowId) -> Option<String> {
        self.window(window).and_then(|native| native.get_clipboard_string())
    }

    fn set_clipboard_text(&mut self, window: NativeWindowId, text: &str) {
        if let Some(native) = self.window_mut(window) {
            native.set_clipboard_string(text);
        }
    }

    fn terminate(&mut self) {
        if !self.windows.is_empty() {
            log::warn!("Terminating GLFW with {} live windows", self.windows.len());
            self.windows.clear();
        }
        // The library shuts down once the last Glfw handle is dropped
        if self.glfw.take().is_some() {
            log::info!("GLFW terminated");
        }
    }
}
