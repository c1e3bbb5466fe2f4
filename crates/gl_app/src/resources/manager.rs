//! Resource Manager - shaders and textures by string key
//!
//! One `ResourceManager` exists per application. Everything it holds is
//! created in the main window's context and reaches the other windows through
//! context sharing, so the manager is only ever touched with a context from
//! that share group current.
//!
//! **Re-registration**: storing a shader or texture under a key that is
//! already taken deletes the previous GPU object first and logs a warning.
//! The replaced handle must not be used afterwards.

use std::collections::HashMap;
use std::path::Path;

use super::{ResourceError, Shader, Texture2D};
use crate::gpu::{GraphicsDevice, ShaderSources, TextureParams};

/// Registry mapping string keys to shaders and textures
///
/// Shader and texture keys live in separate namespaces.
#[derive(Debug, Default)]
pub struct ResourceManager {
    shaders: HashMap<String, Shader>,
    textures: HashMap<String, Texture2D>,
}

fn read_source(path: &Path) -> Result<String, ResourceError> {
    std::fs::read_to_string(path).map_err(|source| ResourceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl ResourceManager {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shader under `key`, releasing any program it replaces
    pub fn add_shader(&mut self, device: &dyn GraphicsDevice, key: impl Into<String>, shader: Shader) -> Shader {
        let key = key.into();
        if let Some(previous) = self.shaders.insert(key.clone(), shader) {
            if previous.id() != shader.id() {
                log::warn!("Shader '{}' re-registered, releasing program {}", key, previous.id());
                device.delete_program(previous.id());
            }
        }
        shader
    }

    /// Register a texture under `key`, releasing any texture it replaces
    pub fn add_texture(&mut self, device: &dyn GraphicsDevice, key: impl Into<String>, texture: Texture2D) -> Texture2D {
        let key = key.into();
        if let Some(previous) = self.textures.insert(key.clone(), texture) {
            if previous.id() != texture.id() {
                log::warn!("Texture '{}' re-registered, releasing texture {}", key, previous.id());
                device.delete_texture(previous.id());
            }
        }
        texture
    }

    /// Compile a shader from source files and register it under `key`
    pub fn load_shader(
        &mut self,
        device: &dyn GraphicsDevice,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
        geometry_path: Option<&Path>,
        key: &str,
    ) -> Result<Shader, ResourceError> {
        let vertex = read_source(vertex_path.as_ref())?;
        let fragment = read_source(fragment_path.as_ref())?;
        let geometry = geometry_path.map(read_source).transpose()?;

        let shader = Shader::compile(
            device,
            &ShaderSources {
                vertex: &vertex,
                fragment: &fragment,
                geometry: geometry.as_deref(),
            },
        )
        .map_err(|source| ResourceError::Gpu {
            key: key.to_string(),
            source,
        })?;

        log::debug!("Loaded shader '{}' from {}", key, vertex_path.as_ref().display());
        Ok(self.add_shader(device, key, shader))
    }

    /// Decode an image file into a texture and register it under `key`
    ///
    /// With `alpha` the texture is stored as RGBA, otherwise as RGB.
    pub fn load_texture(
        &mut self,
        device: &dyn GraphicsDevice,
        path: impl AsRef<Path>,
        alpha: bool,
        key: &str,
    ) -> Result<Texture2D, ResourceError> {
        let path = path.as_ref();
        let image = image::open(path).map_err(|source| ResourceError::Image {
            path: path.to_path_buf(),
            source,
        })?;

        let (params, width, height, pixels) = if alpha {
            let rgba = image.to_rgba8();
            let (width, height) = rgba.dimensions();
            (TextureParams::rgba(), width, height, rgba.into_raw())
        } else {
            let rgb = image.to_rgb8();
            let (width, height) = rgb.dimensions();
            (TextureParams::default(), width, height, rgb.into_raw())
        };

        let mut texture = Texture2D::with_params(device, params).map_err(|source| ResourceError::Gpu {
            key: key.to_string(),
            source,
        })?;
        if let Err(source) = texture.generate(device, width, height, Some(&pixels)) {
            device.delete_texture(texture.id());
            return Err(ResourceError::Gpu {
                key: key.to_string(),
                source,
            });
        }

        log::info!("Loaded texture '{}' {}x{} from {}", key, width, height, path.display());
        Ok(self.add_texture(device, key, texture))
    }

    /// Look up a shader
    pub fn get_shader(&self, key: &str) -> Result<Shader, ResourceError> {
        self.shaders
            .get(key)
            .copied()
            .ok_or_else(|| ResourceError::UnknownShader(key.to_string()))
    }

    /// Look up a texture
    pub fn get_texture(&self, key: &str) -> Result<Texture2D, ResourceError> {
        self.textures
            .get(key)
            .copied()
            .ok_or_else(|| ResourceError::UnknownTexture(key.to_string()))
    }

    /// Whether a shader is registered under `key`
    pub fn has_shader(&self, key: &str) -> bool {
        self.shaders.contains_key(key)
    }

    /// Whether a texture is registered under `key`
    pub fn has_texture(&self, key: &str) -> bool {
        self.textures.contains_key(key)
    }

    /// Number of registered shaders
    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    /// Number of registered textures
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Delete every program and texture and empty both maps
    ///
    /// Must run with a context of the owning share group current.
    pub fn clear(&mut self, device: &dyn GraphicsDevice) {
        log::info!(
            "Clearing resources: {} shaders, {} textures",
            self.shaders.len(),
            self.textures.len()
        );

        for (_, shader) in self.shaders.drain() {
            device.delete_program(shader.id());
        }
        for (_, texture) in self.textures.drain() {
            device.delete_texture(texture.id());
        }
    }
}
