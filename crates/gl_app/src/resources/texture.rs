//! 2D texture handle

use crate::gpu::{GpuError, GraphicsDevice, ObjectId, TextureParams, RGBA};

/// Handle to a 2D texture plus the parameters it was generated with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Texture2D {
    id: ObjectId,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Formats, wrap modes and filters
    pub params: TextureParams,
}

impl Texture2D {
    /// Allocate a texture name with default (RGB, repeat, linear) parameters
    pub fn new(device: &dyn GraphicsDevice) -> Result<Self, GpuError> {
        Self::with_params(device, TextureParams::default())
    }

    /// Allocate a texture name with explicit parameters
    pub fn with_params(device: &dyn GraphicsDevice, params: TextureParams) -> Result<Self, GpuError> {
        Ok(Self {
            id: device.create_texture()?,
            width: 0,
            height: 0,
            params,
        })
    }

    /// Wrap an existing texture name
    pub fn from_id(id: ObjectId, width: u32, height: u32, params: TextureParams) -> Self {
        Self { id, width, height, params }
    }

    /// GL texture name
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Whether the texture stores an alpha channel
    pub fn has_alpha(&self) -> bool {
        self.params.internal_format == RGBA
    }

    /// Upload pixel data and apply wrap/filter parameters
    ///
    /// `data` holds `width * height` pixels in `params.image_format`, or is
    /// `None` to only allocate storage.
    ///
    /// # Errors
    /// [`GpuError::PixelDataTooShort`] when `data` cannot fill the texture;
    /// the texture keeps its previous size.
    pub fn generate(
        &mut self,
        device: &dyn GraphicsDevice,
        width: u32,
        height: u32,
        data: Option<&[u8]>,
    ) -> Result<(), GpuError> {
        self.params.check_pixels(width, height, data)?;
        device.upload_texture(self.id, width, height, &self.params, data)?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Bind on the active texture unit
    pub fn bind(&self, device: &dyn GraphicsDevice) {
        device.bind_texture(self.id);
    }
}
