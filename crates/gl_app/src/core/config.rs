//! # Application Configuration
//!
//! Configuration consumed by [`App`](crate::App): the OpenGL context hints given
//! to the windowing library, the default window geometry, the clear color and
//! the baseline shader set that is loaded into the shared resource manager
//! before any window is initialized.
//!
//! ## Loading
//!
//! [`AppConfig`] implements [`Config`], so it can be read from TOML or RON:
//!
//! ```toml
//! clear_color = [0.15, 0.15, 0.15, 1.0]
//! overlay_shader_key = "overlay"
//! overlay_font_key = "overlay_font"
//!
//! [context]
//! major = 3
//! minor = 3
//! core_profile = true
//! forward_compat = false
//! resizable = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{Config, ConfigError};

/// Key of the shader used to draw overlay draw-lists
pub const OVERLAY_SHADER_KEY: &str = "overlay";

/// Key under which the overlay font atlas texture is registered
pub const OVERLAY_FONT_KEY: &str = "overlay_font";

/// # OpenGL Context Hints
///
/// Passed to the windowing library before any window is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Requested OpenGL major version
    pub major: u32,
    /// Requested OpenGL minor version
    pub minor: u32,
    /// Request a core profile context
    pub core_profile: bool,
    /// Request a forward-compatible context (required on macOS)
    pub forward_compat: bool,
    /// Whether windows may be resized by the user
    pub resizable: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            major: 3,
            minor: 3,
            core_profile: true,
            forward_compat: cfg!(target_os = "macos"),
            resizable: true,
        }
    }
}

/// Default geometry for windows that do not specify their own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowDefaults {
    /// Logical width in screen coordinates
    pub width: u32,
    /// Logical height in screen coordinates
    pub height: u32,
}

impl Default for WindowDefaults {
    fn default() -> Self {
        Self { width: 1280, height: 720 }
    }
}

/// One entry of the baseline shader set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderEntry {
    /// Key the program is registered under
    pub key: String,
    /// Vertex shader file name, relative to the shader directory
    pub vertex: String,
    /// Fragment shader file name, relative to the shader directory
    pub fragment: String,
    /// Optional geometry shader file name, relative to the shader directory
    #[serde(default)]
    pub geometry: Option<String>,
}

impl ShaderEntry {
    /// Create an entry without a geometry stage
    pub fn new(key: impl Into<String>, vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            vertex: vertex.into(),
            fragment: fragment.into(),
            geometry: None,
        }
    }

    /// Add a geometry stage
    #[must_use]
    pub fn with_geometry(mut self, geometry: impl Into<String>) -> Self {
        self.geometry = Some(geometry.into());
        self
    }
}

/// # Baseline Shader Set
///
/// Shaders shared by every window. They are compiled once, in the context of
/// the main window, and every other window sees them through context sharing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderSetConfig {
    /// Directory the shader file names are resolved against
    pub shader_dir: PathBuf,
    /// Shaders to preload
    pub entries: Vec<ShaderEntry>,
}

impl ShaderSetConfig {
    /// Resolve a file name against the shader directory
    pub fn resolve(&self, file: &str) -> PathBuf {
        self.shader_dir.join(file)
    }

    /// Look up an entry by key
    pub fn entry(&self, key: &str) -> Option<&ShaderEntry> {
        self.entries.iter().find(|entry| entry.key == key)
    }
}

impl Default for ShaderSetConfig {
    fn default() -> Self {
        Self {
            shader_dir: PathBuf::from("shaders"),
            entries: vec![
                ShaderEntry::new(OVERLAY_SHADER_KEY, "overlay.vert", "overlay.frag"),
                ShaderEntry::new("line_thick", "line_thick.vert", "line_thick.frag")
                    .with_geometry("line_thick.geom"),
                ShaderEntry::new("textured", "textured.vert", "textured.frag"),
                ShaderEntry::new("colored", "colored.vert", "colored.frag"),
                ShaderEntry::new("basic", "basic.vert", "basic.frag"),
            ],
        }
    }
}

/// # Application Configuration
///
/// Everything [`App`](crate::App) needs before the first window exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Color used to clear every framebuffer
    pub clear_color: [f32; 4],
    /// Key of the overlay shader inside the shader set
    pub overlay_shader_key: String,
    /// Key the overlay font atlas texture is registered under
    pub overlay_font_key: String,
    /// Context hints for every window
    pub context: ContextConfig,
    /// Default window geometry
    pub window: WindowDefaults,
    /// Baseline shader set
    pub shaders: ShaderSetConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            clear_color: [0.15, 0.15, 0.15, 1.0],
            overlay_shader_key: OVERLAY_SHADER_KEY.to_string(),
            overlay_font_key: OVERLAY_FONT_KEY.to_string(),
            context: ContextConfig::default(),
            window: WindowDefaults::default(),
            shaders: ShaderSetConfig::default(),
        }
    }
}

impl Config for AppConfig {}

impl AppConfig {
    /// Set the directory the baseline shaders are loaded from
    #[must_use]
    pub fn with_shader_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.shaders.shader_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the clear color
    #[must_use]
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if (self.context.major, self.context.minor) < (3, 3) {
            return Err(ConfigError::Invalid(format!(
                "OpenGL {}.{} is too old; at least 3.3 is required",
                self.context.major, self.context.minor
            )));
        }

        if let Some(entry) = self.shaders.entries.iter().find(|entry| entry.key.is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "Shader entry with vertex '{}' has an empty key",
                entry.vertex
            )));
        }

        if self.shaders.entry(&self.overlay_shader_key).is_none() {
            return Err(ConfigError::Invalid(format!(
                "Overlay shader '{}' is not part of the shader set",
                self.overlay_shader_key
            )));
        }

        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "Default window size {}x{} has no area",
                self.window.width, self.window.height
            )));
        }

        if self.overlay_font_key.is_empty() {
            return Err(ConfigError::Invalid("Overlay font key cannot be empty".to_string()));
        }

        Ok(())
    }
}
