//! # GPU Resources
//!
//! Shaders and textures shared by every window of an [`App`](crate::App).
//!
//! The application owns the single [`ResourceManager`] through a
//! [`SharedResources`] handle. Windows and other consumers implement
//! [`ResourceUser`] and hold only a weak reference, so dropping the
//! application is what ends the manager's life, never a window.

mod manager;
mod shader;
mod texture;

pub use manager::ResourceManager;
pub use shader::Shader;
pub use texture::Texture2D;

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::{Rc, Weak};

use thiserror::Error;

use crate::gpu::GpuError;

/// Strong handle to the application's resource manager
pub type SharedResources = Rc<RefCell<ResourceManager>>;

/// Weak handle held by resource consumers
pub type WeakResources = Weak<RefCell<ResourceManager>>;

/// Resource errors
#[derive(Error, Debug)]
pub enum ResourceError {
    /// No shader registered under the key
    #[error("Unknown shader key '{0}'")]
    UnknownShader(String),

    /// No texture registered under the key
    #[error("Unknown texture key '{0}'")]
    UnknownTexture(String),

    /// A source file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// An image could not be decoded
    #[error("Failed to decode image {path}: {source}")]
    Image {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        source: image::ImageError,
    },

    /// GPU object creation failed while loading
    #[error("GPU error loading '{key}': {source}")]
    Gpu {
        /// Key being loaded
        key: String,
        /// Underlying error
        source: GpuError,
    },
}

/// Capability for objects that read shared resources
pub trait ResourceUser {
    /// Attach the application's resource manager
    fn set_resource_manager(&mut self, resources: &SharedResources);

    /// The attached manager, if it is still alive
    fn resource_manager(&self) -> Option<SharedResources>;

    /// Whether a live manager is attached
    fn has_resource_manager(&self) -> bool {
        self.resource_manager().is_some()
    }
}

/// Create a fresh shared resource manager
pub fn shared() -> SharedResources {
    Rc::new(RefCell::new(ResourceManager::new()))
}
