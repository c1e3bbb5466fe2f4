//! # Application
//!
//! [`App`] owns the windowing library, the window registry, the shared
//! resource manager and the single render loop that multiplexes every window
//! on one thread.
//!
//! ## Registry
//!
//! Windows enter only through [`App::add_window`], which creates the native
//! window and records a route from its native handle to its id. Input events
//! are delivered by looking the handle up in that table.
//!
//! ## Close Protocol
//!
//! Once per loop iteration [`App::should_close`] collects every window whose
//! native close flag is set and removes it. A closing main window takes the
//! whole registry down with it. The loop ends when the registry is empty.
//!
//! ## Shutdown Order
//!
//! ```text
//! windows (each in its own context) -> shared resources -> windowing library
//! ```
//!
//! Shared resources live in the context of the first registered window (the
//! resource context). When that window leaves the registry its native
//! window is hidden rather than destroyed, so the resource manager can still
//! be cleared inside a live context at shutdown.

use std::collections::HashMap;
use std::rc::Rc;

use thiserror::Error;

use crate::config::ConfigError;
use crate::core::{AppConfig, WindowDefaults};
use crate::gpu::{check_errors, Capabilities, GraphicsDevice, TextureParams};
use crate::overlay::{ImguiBackend, OverlayBackend, OverlayError};
use crate::platform::{GlfwPlatform, MonitorSelection, NativeWindowId, Platform, PlatformError};
use crate::resources::{self, ResourceError, ResourceUser, SharedResources, Texture2D};
use crate::window::{Window, WindowError, WindowHooks, WindowId};

/// Application errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Windowing library failure
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// Window lifecycle failure
    #[error(transparent)]
    Window(#[from] WindowError),

    /// Shared resource loading failure
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Overlay font atlas failure
    #[error(transparent)]
    Overlay(#[from] OverlayError),

    /// `init()` has not run
    #[error("Application is not initialized")]
    NotInitialized,

    /// No registered window has this id
    #[error("No window with id {0} is registered")]
    UnknownWindow(WindowId),
}

/// Multi-window application
pub struct App {
    config: AppConfig,
    platform: Box<dyn Platform>,
    overlay: Box<dyn OverlayBackend>,
    windows: Vec<Window>,
    routes: HashMap<NativeWindowId, WindowId>,
    main_window: Option<WindowId>,
    current: Option<WindowId>,
    resources: Option<SharedResources>,
    resource_context: Option<NativeWindowId>,
    resource_device: Option<Rc<dyn GraphicsDevice>>,
    retired: Option<NativeWindowId>,
}

impl App {
    /// Application on GLFW with ImGui overlays
    pub fn new(config: AppConfig) -> Self {
        Self::with_backends(config, Box::new(GlfwPlatform::default()), Box::new(ImguiBackend::new()))
    }

    /// Application on explicit platform and overlay backends
    pub fn with_backends(config: AppConfig, platform: Box<dyn Platform>, overlay: Box<dyn OverlayBackend>) -> Self {
        Self {
            config,
            platform,
            overlay,
            windows: Vec::new(),
            routes: HashMap::new(),
            main_window: None,
            current: None,
            resources: None,
            resource_context: None,
            resource_device: None,
            retired: None,
        }
    }

    /// Start the windowing library and create the shared resource manager
    ///
    /// # Errors
    /// [`AppError::Config`] for an invalid configuration,
    /// [`AppError::Platform`] when the windowing library cannot start.
    pub fn init(&mut self) -> Result<(), AppError> {
        self.config.validate()?;
        self.platform.init(&self.config.context)?;
        self.resources = Some(resources::shared());

        log::info!(
            "Application initialized (OpenGL {}.{}{})",
            self.config.context.major,
            self.config.context.minor,
            if self.config.context.core_profile { " core" } else { "" }
        );
        Ok(())
    }

    /// Whether `init()` has succeeded
    pub fn is_initialized(&self) -> bool {
        self.resources.is_some() && self.platform.is_initialized()
    }

    /// Create `window` and register it
    ///
    /// Returns `false` when creation fails; the window is dropped and
    /// nothing of it remains. On success the window's context has depth
    /// testing enabled and the previously current context is bound again.
    ///
    /// # Arguments
    /// * `share` - Registered window whose GL objects the new context shares
    pub fn add_window(
        &mut self,
        mut window: Window,
        title: &str,
        monitor: MonitorSelection,
        share: Option<WindowId>,
    ) -> bool {
        let previous = self.current.and_then(|id| self.window(id)).and_then(Window::native);
        let added = self.try_add_window(&mut window, title, monitor, share);
        // Creation binds the new context, even when it fails afterwards
        self.platform.make_context_current(previous);

        match added {
            Ok(()) => {
                log::info!("Window {} '{}' added ({} registered)", window.id(), title, self.windows.len() + 1);
                self.windows.push(window);
                true
            }
            Err(err) => {
                log::warn!("Failed to add window {} '{}': {}", window.id(), title, err);
                false
            }
        }
    }

    fn try_add_window(
        &mut self,
        window: &mut Window,
        title: &str,
        monitor: MonitorSelection,
        share: Option<WindowId>,
    ) -> Result<(), AppError> {
        let resources = self.resources.clone().ok_or(AppError::NotInitialized)?;
        if window.id() < 0 {
            return Err(WindowError::InvalidId(window.id()).into());
        }
        if self.window(window.id()).is_some() {
            return Err(WindowError::DuplicateId(window.id()).into());
        }
        let share = match share {
            Some(id) => Some(
                self.window(id)
                    .and_then(Window::native)
                    .ok_or(AppError::UnknownWindow(id))?,
            ),
            None => None,
        };

        window.set_resource_manager(&resources);
        window.set_overlay_keys(&self.config.overlay_shader_key, &self.config.overlay_font_key);
        window.create(self.platform.as_mut(), self.overlay.as_mut(), title, monitor, share)?;

        let native = window.native().ok_or(WindowError::NotCreated(window.id()))?;
        let gpu = window.gpu().cloned().ok_or(WindowError::NotCreated(window.id()))?;

        self.platform.make_context_current(Some(native));
        gpu.set_capability(Capabilities::DEPTH_TEST, true);
        check_errors(gpu.as_ref(), &format!("Window {} options", window.id()));

        self.routes.insert(native, window.id());
        if self.resource_context.is_none() {
            log::debug!("Window {} holds the shared resource context", window.id());
            self.resource_context = Some(native);
            self.resource_device = Some(gpu);
        }
        Ok(())
    }

    /// Construct a window and add it in one step
    pub fn create_window(
        &mut self,
        id: WindowId,
        width: u32,
        height: u32,
        title: &str,
        hooks: impl WindowHooks + 'static,
        share: Option<WindowId>,
    ) -> bool {
        self.add_window(Window::new(id, width, height, hooks), title, MonitorSelection::Windowed, share)
    }

    /// [`create_window`](Self::create_window) with the configured default size
    pub fn create_default_window(
        &mut self,
        id: WindowId,
        title: &str,
        hooks: impl WindowHooks + 'static,
        share: Option<WindowId>,
    ) -> bool {
        let WindowDefaults { width, height } = self.config.window;
        self.create_window(id, width, height, title, hooks, share)
    }

    /// Load shared resources, initialize every window and run until closed
    ///
    /// Returns when the registry is empty. Programmer errors inside the
    /// loop (rendering before `init()`, unknown resource keys) abort it.
    ///
    /// # Errors
    /// [`AppError::Resource`] when a baseline shader cannot be loaded,
    /// [`AppError::Window`] when a window fails to initialize or render.
    pub fn run(&mut self) -> Result<(), AppError> {
        if !self.is_initialized() {
            return Err(AppError::NotInitialized);
        }
        if self.windows.is_empty() {
            log::warn!("No windows registered; nothing to run");
            return Ok(());
        }

        self.load_shared_resources()?;

        let clear_color = self.config.clear_color;
        for index in 0..self.windows.len() {
            let id = self.windows[index].id();
            if self.main_window.is_none() {
                log::info!("Window {} is the main window", id);
                self.main_window = Some(id);
            }
            self.make_context_current(Some(id));

            let window = &mut self.windows[index];
            window.init(self.main_window)?;
            if let Some(gpu) = window.gpu() {
                gpu.clear(clear_color);
            }
        }

        log::info!("Entering main loop with {} windows", self.windows.len());
        while !self.should_close() {
            self.dispatch_events();
            for index in 0..self.windows.len() {
                self.render_window(index)?;
            }
        }
        log::info!("Main loop finished");

        self.remove_all_windows();
        Ok(())
    }

    fn load_shared_resources(&mut self) -> Result<(), AppError> {
        let resources = self.resources.clone().ok_or(AppError::NotInitialized)?;
        let device = self.bind_resource_context().ok_or(AppError::NotInitialized)?;
        let shaders = &self.config.shaders;
        let mut manager = resources.borrow_mut();

        for entry in &shaders.entries {
            let geometry = entry.geometry.as_deref().map(|file| shaders.resolve(file));
            manager.load_shader(
                device.as_ref(),
                shaders.resolve(&entry.vertex),
                shaders.resolve(&entry.fragment),
                geometry.as_deref(),
                &entry.key,
            )?;
        }

        let atlas = self.overlay.build_font_atlas()?;
        let font_key = &self.config.overlay_font_key;
        let mut texture =
            Texture2D::with_params(device.as_ref(), TextureParams::rgba()).map_err(|source| ResourceError::Gpu {
                key: font_key.clone(),
                source,
            })?;
        if let Err(source) = texture.generate(device.as_ref(), atlas.width, atlas.height, Some(&atlas.pixels)) {
            device.delete_texture(texture.id());
            return Err(ResourceError::Gpu {
                key: font_key.clone(),
                source,
            }
            .into());
        }
        let texture = manager.add_texture(device.as_ref(), font_key.as_str(), texture);
        self.overlay.set_font_texture(texture.id());

        check_errors(device.as_ref(), "Shared resources");
        log::info!(
            "Shared resources loaded: {} shaders, font atlas {}x{}",
            manager.shader_count(),
            atlas.width,
            atlas.height
        );
        Ok(())
    }

    fn render_window(&mut self, index: usize) -> Result<(), AppError> {
        let id = self.windows[index].id();
        self.make_context_current(Some(id));

        let main_window = self.main_window;
        let clear_color = self.config.clear_color;
        let window = &mut self.windows[index];
        window.compute_metrics();
        window.update(main_window)?;
        if let Some(gpu) = window.gpu() {
            gpu.clear(clear_color);
        }
        window.render(self.platform.as_mut(), main_window)?;
        if let Some(native) = window.native() {
            self.platform.swap_buffers(native);
        }
        Ok(())
    }

    /// Poll native events and hand each one to the window it belongs to
    fn dispatch_events(&mut self) {
        for (native, event) in self.platform.poll_events() {
            let Some(&id) = self.routes.get(&native) else {
                log::trace!("Dropping event for unregistered window {:?}", native);
                continue;
            };
            if let Some(window) = self.windows.iter_mut().find(|window| window.id() == id) {
                window.handle_event(&event, self.platform.as_mut());
            }
        }
    }

    /// Remove every window whose close flag is set
    ///
    /// A closing main window closes all windows. Returns `true` when the
    /// registry is empty afterwards, immediately so when it already was.
    pub fn should_close(&mut self) -> bool {
        if self.windows.is_empty() {
            return true;
        }

        let closing: Vec<WindowId> = self
            .windows
            .iter()
            .filter(|window| window.native().is_some_and(|native| self.platform.should_close(native)))
            .map(Window::id)
            .collect();
        if closing.is_empty() {
            return false;
        }

        let doomed = if self.main_window.is_some_and(|main| closing.contains(&main)) {
            log::info!("Main window closed; closing all windows");
            self.window_ids()
        } else {
            closing
        };
        for id in doomed {
            self.remove_window(id);
        }

        self.windows.is_empty()
    }

    fn remove_window(&mut self, id: WindowId) {
        let Some(position) = self.windows.iter().position(|window| window.id() == id) else {
            return;
        };
        let mut window = self.windows.remove(position);

        if let Some(native) = window.native() {
            self.routes.remove(&native);
            if self.resource_context == Some(native) {
                self.retired = window.retire(self.platform.as_mut(), self.overlay.as_mut());
            } else {
                window.destroy(self.platform.as_mut(), self.overlay.as_mut());
            }
        } else {
            window.destroy(self.platform.as_mut(), self.overlay.as_mut());
        }

        // Teardown binds the removed window's context
        self.current = None;
        log::info!("Window {} removed ({} remaining)", id, self.windows.len());
    }

    fn remove_all_windows(&mut self) {
        for id in self.window_ids() {
            self.remove_window(id);
        }
    }

    fn bind_resource_context(&mut self) -> Option<Rc<dyn GraphicsDevice>> {
        let native = self.resource_context?;
        self.platform.make_context_current(Some(native));
        self.current = self.routes.get(&native).copied();
        self.resource_device.clone()
    }

    /// Bind a window's context for subsequent GL calls
    ///
    /// Binding the window that is already current does nothing. `None` or
    /// an unknown id is logged and ignored.
    pub fn make_context_current(&mut self, id: Option<WindowId>) {
        let Some(id) = id else {
            log::error!("make_context_current called without a window");
            return;
        };
        if self.current == Some(id) {
            return;
        }
        let Some(native) = self.window(id).and_then(Window::native) else {
            log::error!("make_context_current: window {} is not registered", id);
            return;
        };

        self.platform.make_context_current(Some(native));
        self.current = Some(id);
    }

    /// Window whose context is current, as far as the application knows
    pub fn current_context(&self) -> Option<WindowId> {
        self.current
    }

    /// Designated main window
    pub fn main_window(&self) -> Option<WindowId> {
        self.main_window
    }

    /// Designate the main window; returns `false` for an unregistered id
    pub fn set_main_window(&mut self, id: WindowId) -> bool {
        if self.window(id).is_none() {
            log::warn!("Cannot make unregistered window {} the main window", id);
            return false;
        }
        self.main_window = Some(id);
        true
    }

    /// Registered window by id
    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.windows.iter().find(|window| window.id() == id)
    }

    /// Registered window by id, mutably
    pub fn window_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.windows.iter_mut().find(|window| window.id() == id)
    }

    /// Registered window ids in registry order
    pub fn window_ids(&self) -> Vec<WindowId> {
        self.windows.iter().map(Window::id).collect()
    }

    /// Number of registered windows
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Whether no window is registered
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Shared resource manager, once initialized
    pub fn resources(&self) -> Option<&SharedResources> {
        self.resources.as_ref()
    }

    /// Configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Windowing library
    pub fn platform(&self) -> &dyn Platform {
        self.platform.as_ref()
    }

    /// Windowing library, mutably
    pub fn platform_mut(&mut self) -> &mut dyn Platform {
        self.platform.as_mut()
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.remove_all_windows();

        if let Some(resources) = self.resources.take() {
            match self.bind_resource_context() {
                Some(device) => resources.borrow_mut().clear(device.as_ref()),
                None => {
                    let manager = resources.borrow();
                    if manager.shader_count() + manager.texture_count() > 0 {
                        log::warn!("No resource context left; shared GPU resources are leaked");
                    }
                }
            }
        }
        self.resource_device = None;
        self.resource_context = None;
        self.current = None;

        if let Some(native) = self.retired.take() {
            self.platform.destroy_window(native);
        }
        if self.platform.is_initialized() {
            self.platform.terminate();
            log::info!("Windowing library terminated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ContextConfig, OVERLAY_FONT_KEY};
    use crate::platform::{Action, Key, Modifiers, WindowEvent};
    use crate::testing::{GpuCall, MockOverlayBackend, MockPlatform};
    use crate::window::{FrameContext, NoHooks, WindowState};
    use std::cell::RefCell;
    use std::fs;

    fn write_shader_set(config: &AppConfig) {
        let shaders = &config.shaders;
        for entry in &shaders.entries {
            let files = [Some(&entry.vertex), Some(&entry.fragment), entry.geometry.as_ref()];
            for file in files.into_iter().flatten() {
                fs::write(shaders.resolve(file), "#version 330 core\nvoid main() {}\n").unwrap();
            }
        }
    }

    fn test_app(config: AppConfig) -> (App, MockPlatform, MockOverlayBackend) {
        let platform = MockPlatform::new();
        let overlay = MockOverlayBackend::new();
        let mut app = App::with_backends(config, Box::new(platform.clone()), Box::new(overlay.clone()));
        app.init().unwrap();
        (app, platform, overlay)
    }

    fn window(id: WindowId) -> Window {
        Window::new(id, 320, 240, NoHooks)
    }

    #[derive(Clone, Default)]
    struct FrameCounter {
        frames: Rc<RefCell<Vec<(WindowId, bool)>>>,
    }

    impl WindowHooks for FrameCounter {
        fn draw(&mut self, ctx: &FrameContext<'_>, _ui: Option<&imgui::Ui>) -> Result<(), WindowError> {
            self.frames.borrow_mut().push((ctx.window_id, ctx.is_main_window()));
            Ok(())
        }
    }

    #[test]
    fn test_init_passes_context_hints() {
        let (app, platform, _) = test_app(AppConfig::default());
        assert!(app.is_initialized());
        assert_eq!(platform.init_context(), Some(ContextConfig::default()));
    }

    #[test]
    fn test_init_failure() {
        let platform = MockPlatform::new();
        platform.fail_init();
        let mut app = App::with_backends(
            AppConfig::default(),
            Box::new(platform.clone()),
            Box::new(MockOverlayBackend::new()),
        );
        assert!(matches!(app.init(), Err(AppError::Platform(PlatformError::InitFailed(_)))));
        assert!(!app.add_window(window(0), "A", MonitorSelection::Windowed, None));
    }

    #[test]
    fn test_registry_holds_exactly_the_created_windows() {
        let (mut app, platform, _) = test_app(AppConfig::default());
        platform.fail_window("B");
        platform.fail_graphics("D");

        assert!(app.add_window(window(0), "A", MonitorSelection::Windowed, None));
        assert!(!app.add_window(window(1), "B", MonitorSelection::Windowed, None));
        assert!(app.add_window(window(2), "C", MonitorSelection::Windowed, Some(0)));
        assert!(!app.add_window(window(3), "D", MonitorSelection::Windowed, Some(0)));

        assert_eq!(app.window_ids(), vec![0, 2]);
        // The window that failed GL loading left no native window behind
        assert_eq!(platform.live_windows(), 2);
        assert_eq!(platform.destroyed().len(), 1);
    }

    #[test]
    fn test_duplicate_and_negative_ids_rejected() {
        let (mut app, platform, _) = test_app(AppConfig::default());
        assert!(app.add_window(window(4), "A", MonitorSelection::Windowed, None));
        assert!(!app.add_window(window(4), "B", MonitorSelection::Windowed, None));
        assert!(!app.add_window(window(-1), "C", MonitorSelection::Windowed, None));
        assert!(!app.add_window(window(5), "D", MonitorSelection::Windowed, Some(99)));

        assert_eq!(app.len(), 1);
        assert_eq!(platform.live_windows(), 1);
    }

    #[test]
    fn test_add_window_enables_depth_and_restores_context() {
        let (mut app, platform, _) = test_app(AppConfig::default());
        assert!(app.add_window(window(0), "A", MonitorSelection::Windowed, None));
        let native_a = platform.native_for("A").unwrap();
        assert!(platform
            .gpu_calls_in(native_a)
            .contains(&GpuCall::SetCapability(Capabilities::DEPTH_TEST, true)));

        app.make_context_current(Some(0));
        assert!(app.add_window(window(1), "B", MonitorSelection::Windowed, Some(0)));
        let native_b = platform.native_for("B").unwrap();

        assert_eq!(platform.share_of(native_b), Some(native_a));
        assert_eq!(platform.current_context(), Some(native_a));
        assert_eq!(app.current_context(), Some(0));
    }

    #[test]
    fn test_failed_add_window_keeps_current_context() {
        let (mut app, platform, overlay) = test_app(AppConfig::default());
        assert!(app.add_window(window(0), "A", MonitorSelection::Windowed, None));
        let native_a = platform.native_for("A").unwrap();
        app.make_context_current(Some(0));

        overlay.fail_context(1);
        assert!(!app.add_window(window(1), "B", MonitorSelection::Windowed, Some(0)));

        assert_eq!(platform.current_context(), Some(native_a));
        assert_eq!(app.current_context(), Some(0));
        assert_eq!(app.window_ids(), vec![0]);
    }

    #[test]
    fn test_default_window_uses_configured_size() {
        let mut config = AppConfig::default();
        config.window = WindowDefaults { width: 800, height: 600 };
        let (mut app, platform, _) = test_app(config);

        assert!(app.create_default_window(0, "A", NoHooks, None));
        assert!(app.create_window(1, 320, 240, "B", NoHooks, Some(0)));

        assert_eq!(app.window(0).map(Window::size), Some((800, 600)));
        assert_eq!(app.window(1).map(Window::size), Some((320, 240)));
        assert_eq!(platform.live_windows(), 2);
    }

    #[test]
    fn test_make_context_current_is_idempotent() {
        let (mut app, platform, _) = test_app(AppConfig::default());
        app.add_window(window(0), "A", MonitorSelection::Windowed, None);

        app.make_context_current(Some(0));
        let switches = platform.context_switches().len();
        app.make_context_current(Some(0));
        assert_eq!(platform.context_switches().len(), switches);
        assert_eq!(app.current_context(), Some(0));

        app.make_context_current(None);
        app.make_context_current(Some(42));
        assert_eq!(platform.context_switches().len(), switches);
        assert_eq!(app.current_context(), Some(0));
    }

    #[test]
    fn test_should_close_on_empty_registry() {
        let (mut app, _, _) = test_app(AppConfig::default());
        assert!(app.should_close());
    }

    #[test]
    fn test_closing_main_window_closes_everything() {
        let (mut app, platform, _) = test_app(AppConfig::default());
        assert!(app.add_window(window(0), "A", MonitorSelection::Windowed, None));
        assert!(app.set_main_window(0));
        assert!(app.add_window(window(1), "B", MonitorSelection::Windowed, Some(0)));
        assert!(app.add_window(window(2), "C", MonitorSelection::Windowed, Some(0)));
        assert_eq!(app.len(), 3);
        assert!(!app.should_close());

        platform.request_close(platform.native_for("A").unwrap());
        assert!(app.should_close());
        assert_eq!(app.len(), 0);
    }

    #[test]
    fn test_closing_other_window_keeps_the_rest() {
        let (mut app, platform, overlay) = test_app(AppConfig::default());
        app.add_window(window(0), "A", MonitorSelection::Windowed, None);
        app.set_main_window(0);
        app.add_window(window(1), "B", MonitorSelection::Windowed, Some(0));
        app.add_window(window(2), "C", MonitorSelection::Windowed, Some(0));

        let native_c = platform.native_for("C").unwrap();
        platform.push_event(native_c, WindowEvent::Key(Key::W, 0, Action::Press, Modifiers::empty()));
        platform.push_event(native_c, WindowEvent::Size(500, 400));
        app.dispatch_events();

        platform.request_close(platform.native_for("B").unwrap());
        assert!(!app.should_close());
        assert_eq!(app.window_ids(), vec![0, 2]);

        let survivor = app.window(2).unwrap();
        assert!(survivor.input().is_key_down(Key::W));
        assert_eq!(survivor.size(), (500, 400));

        // Window 1 does not own the shared overlay assets
        assert_eq!(overlay.released(), vec![1]);
        assert!(overlay.shared_released_by().is_empty());
    }

    #[test]
    fn test_escape_on_main_window_ends_the_loop() {
        let (mut app, platform, _) = test_app(AppConfig::default());
        app.add_window(window(0), "A", MonitorSelection::Windowed, None);
        app.add_window(window(1), "B", MonitorSelection::Windowed, Some(0));
        app.set_main_window(0);

        let native_a = platform.native_for("A").unwrap();
        platform.push_event(native_a, WindowEvent::Key(Key::Escape, 0, Action::Press, Modifiers::empty()));
        app.dispatch_events();

        assert!(app.should_close());
        assert!(app.is_empty());
    }

    #[test]
    fn test_run_without_windows_returns_immediately() {
        let (mut app, platform, _) = test_app(AppConfig::default());
        app.run().unwrap();
        assert!(platform.swaps().is_empty());
    }

    #[test]
    fn test_run_fails_fast_without_shader_files() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _, _) = test_app(AppConfig::default().with_shader_dir(dir.path()));
        app.add_window(window(0), "A", MonitorSelection::Windowed, None);

        assert!(matches!(app.run(), Err(AppError::Resource(ResourceError::Io { .. }))));
    }

    #[test]
    fn test_run_until_main_window_closes() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::default().with_shader_dir(dir.path());
        write_shader_set(&config);
        let (mut app, platform, overlay) = test_app(config);

        let hooks = FrameCounter::default();
        assert!(app.create_window(0, 640, 480, "A", hooks.clone(), None));
        assert!(app.create_window(1, 320, 240, "B", hooks.clone(), Some(0)));
        let native_a = platform.native_for("A").unwrap();
        let native_b = platform.native_for("B").unwrap();
        platform.close_after_frames(native_a, 3);

        app.run().unwrap();

        assert!(app.is_empty());
        assert_eq!(app.main_window(), Some(0));
        assert_eq!(
            *hooks.frames.borrow(),
            vec![(0, true), (1, false), (0, true), (1, false), (0, true), (1, false)]
        );
        assert_eq!(platform.swaps(), vec![native_a, native_b, native_a, native_b, native_a, native_b]);

        {
            let resources = app.resources().unwrap().borrow();
            assert_eq!(resources.shader_count(), 5);
            assert!(resources.has_texture(OVERLAY_FONT_KEY));
        }
        let font = app.resources().unwrap().borrow().get_texture(OVERLAY_FONT_KEY).unwrap();
        assert_eq!(overlay.context_fonts(), vec![(0, font.id()), (1, font.id())]);

        // The resource window is only hidden until the resources are gone
        assert!(!platform.is_visible(native_a));
        assert_eq!(platform.destroyed(), vec![native_b]);
        assert_eq!(overlay.shared_released_by(), vec![0]);

        drop(app);
        let deletes_in_resource_context = platform.gpu_calls_in(native_a);
        assert!(deletes_in_resource_context.contains(&GpuCall::DeleteTexture(font.id())));
        assert!(deletes_in_resource_context
            .iter()
            .any(|call| matches!(call, GpuCall::DeleteProgram(_))));
        assert_eq!(platform.destroyed(), vec![native_b, native_a]);
        assert!(platform.terminated());
        assert_eq!(platform.windows_at_terminate(), 0);
    }

    #[test]
    fn test_drop_tears_down_in_order() {
        let (mut app, platform, _) = test_app(AppConfig::default());
        app.add_window(window(0), "A", MonitorSelection::Windowed, None);
        app.add_window(window(1), "B", MonitorSelection::Windowed, Some(0));
        let native_a = platform.native_for("A").unwrap();
        let native_b = platform.native_for("B").unwrap();

        drop(app);

        assert_eq!(platform.destroyed(), vec![native_b, native_a]);
        assert!(platform.terminated());
        assert_eq!(platform.windows_at_terminate(), 0);
    }

    #[test]
    fn test_window_state_after_removal() {
        let (mut app, platform, _) = test_app(AppConfig::default());
        app.add_window(window(0), "A", MonitorSelection::Windowed, None);
        assert_eq!(app.window(0).map(Window::state), Some(WindowState::Created));

        platform.request_close(platform.native_for("A").unwrap());
        assert!(app.should_close());
        assert!(app.window(0).is_none());
    }
}
