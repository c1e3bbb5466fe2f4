//! # GL App
//!
//! A multi-window OpenGL application framework: GLFW windows, one ImGui
//! overlay per window, a shared registry of shaders and textures, and a
//! single-threaded render loop that multiplexes every window.
//!
//! ## Features
//!
//! - **Multiple Windows**: GL contexts shared with a main window, round-robin rendering
//! - **Overlay UI**: Per-window ImGui contexts over one shared font atlas
//! - **Shared Resources**: Shaders and textures by string key
//! - **Close Protocol**: Closing the main window closes the application
//! - **Headless Seams**: Platform, GL device and overlay behind traits
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gl_app::prelude::*;
//!
//! struct Scene;
//!
//! impl WindowHooks for Scene {
//!     fn draw(&mut self, _ctx: &FrameContext<'_>, ui: Option<&imgui::Ui>) -> Result<(), WindowError> {
//!         if let Some(ui) = ui {
//!             ui.text("Hello");
//!         }
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), AppError> {
//!     gl_app::foundation::logging::init();
//!
//!     let mut app = App::new(AppConfig::default());
//!     app.init()?;
//!     app.create_default_window(0, "Main", Scene, None);
//!     app.create_window(1, 640, 480, "Inspector", NoHooks, Some(0));
//!     app.run()
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod core;
pub mod config;
pub mod foundation;
pub mod gpu;
pub mod overlay;
pub mod platform;
pub mod resources;
pub mod window;

mod app;

#[cfg(test)]
mod testing;

pub use app::{App, AppError};

/// Common imports for application code
pub mod prelude {
    pub use crate::{
        App, AppError,
        core::config::{AppConfig, ContextConfig, ShaderEntry},
        foundation::time::FrameMetrics,
        gpu::GraphicsDevice,
        platform::{Action, Key, MonitorSelection, MouseButton, WindowEvent},
        resources::{ResourceManager, ResourceUser, Shader, SharedResources, Texture2D},
        window::{FrameContext, InputState, NoHooks, Window, WindowError, WindowHooks, WindowId},
    };
}
