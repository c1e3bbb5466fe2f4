//! GPU device abstraction
//!
//! The lifecycle core never talks to OpenGL directly. Every GL call it issues
//! goes through [`GraphicsDevice`], which is implemented by [`GlowDevice`] for
//! real contexts. One device exists per native context; calls on a device are
//! only meaningful while that device's context is current.
//!
//! # Object ids
//!
//! GL object names are plain `u32` values ([`ObjectId`]) with `0` meaning
//! "no object", exactly like the underlying API. This keeps snapshot/restore
//! of bindings trivial and lets callers check "was this ever created" with a
//! non-zero test.

mod glow_device;

pub use glow_device::GlowDevice;

use bitflags::bitflags;
use thiserror::Error;

/// Name of a GL object (program, buffer, texture, vertex array); `0` means none
pub type ObjectId = u32;

/// `GL_ARRAY_BUFFER`
pub const ARRAY_BUFFER: u32 = glow::ARRAY_BUFFER;
/// `GL_ELEMENT_ARRAY_BUFFER`
pub const ELEMENT_ARRAY_BUFFER: u32 = glow::ELEMENT_ARRAY_BUFFER;
/// `GL_STREAM_DRAW`
pub const STREAM_DRAW: u32 = glow::STREAM_DRAW;
/// `GL_STATIC_DRAW`
pub const STATIC_DRAW: u32 = glow::STATIC_DRAW;
/// `GL_FLOAT`
pub const FLOAT: u32 = glow::FLOAT;
/// `GL_UNSIGNED_BYTE`
pub const UNSIGNED_BYTE: u32 = glow::UNSIGNED_BYTE;
/// `GL_UNSIGNED_SHORT`
pub const UNSIGNED_SHORT: u32 = glow::UNSIGNED_SHORT;
/// `GL_UNSIGNED_INT`
pub const UNSIGNED_INT: u32 = glow::UNSIGNED_INT;
/// `GL_TEXTURE0`
pub const TEXTURE0: u32 = glow::TEXTURE0;
/// `GL_FUNC_ADD`
pub const FUNC_ADD: u32 = glow::FUNC_ADD;
/// `GL_SRC_ALPHA`
pub const SRC_ALPHA: u32 = glow::SRC_ALPHA;
/// `GL_ONE`
pub const ONE: u32 = glow::ONE;
/// `GL_ONE_MINUS_SRC_ALPHA`
pub const ONE_MINUS_SRC_ALPHA: u32 = glow::ONE_MINUS_SRC_ALPHA;
/// `GL_RGB`
pub const RGB: u32 = glow::RGB;
/// `GL_RGBA`
pub const RGBA: u32 = glow::RGBA;
/// `GL_REPEAT`
pub const REPEAT: u32 = glow::REPEAT;
/// `GL_LINEAR`
pub const LINEAR: u32 = glow::LINEAR;

/// GPU errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    /// The driver refused to create an object
    #[error("Failed to create {kind}: {reason}")]
    ObjectCreation {
        /// Kind of object ("buffer", "texture", ...)
        kind: &'static str,
        /// Driver message
        reason: String,
    },

    /// A shader stage failed to compile
    #[error("{stage:?} shader compilation failed: {log}")]
    ShaderCompile {
        /// Failing stage
        stage: ShaderStage,
        /// Compiler info log
        log: String,
    },

    /// Program linking failed
    #[error("Program link failed: {0}")]
    ProgramLink(String),

    /// Pixel data is shorter than the texture it should fill
    #[error("Texture {width}x{height} needs {expected} bytes of pixel data, got {actual}")]
    PixelDataTooShort {
        /// Texture width
        width: u32,
        /// Texture height
        height: u32,
        /// Bytes required by the size and format
        expected: usize,
        /// Bytes supplied
        actual: usize,
    },

    /// The context does not provide the required version
    #[error("OpenGL {major}.{minor} is not supported; {required_major}.{required_minor} required")]
    UnsupportedVersion {
        /// Version reported by the context
        major: u32,
        /// Version reported by the context
        minor: u32,
        /// Version requested by the application
        required_major: u32,
        /// Version requested by the application
        required_minor: u32,
    },
}

/// Shader pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex stage
    Vertex,
    /// Fragment stage
    Fragment,
    /// Geometry stage
    Geometry,
}

/// GLSL sources for one program
#[derive(Debug, Clone, Copy)]
pub struct ShaderSources<'a> {
    /// Vertex shader source
    pub vertex: &'a str,
    /// Fragment shader source
    pub fragment: &'a str,
    /// Optional geometry shader source
    pub geometry: Option<&'a str>,
}

bitflags! {
    /// Server-side capabilities the overlay pass toggles and restores
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u8 {
        /// `GL_BLEND`
        const BLEND = 1 << 0;
        /// `GL_CULL_FACE`
        const CULL_FACE = 1 << 1;
        /// `GL_DEPTH_TEST`
        const DEPTH_TEST = 1 << 2;
        /// `GL_SCISSOR_TEST`
        const SCISSOR_TEST = 1 << 3;
    }
}

impl Capabilities {
    /// The GL enum for a single capability flag
    pub fn gl_enum(self) -> Option<u32> {
        match self {
            Self::BLEND => Some(glow::BLEND),
            Self::CULL_FACE => Some(glow::CULL_FACE),
            Self::DEPTH_TEST => Some(glow::DEPTH_TEST),
            Self::SCISSOR_TEST => Some(glow::SCISSOR_TEST),
            _ => None,
        }
    }
}

/// Texture upload parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureParams {
    /// Internal storage format
    pub internal_format: u32,
    /// Format of the supplied pixels
    pub image_format: u32,
    /// Wrap mode along S
    pub wrap_s: u32,
    /// Wrap mode along T
    pub wrap_t: u32,
    /// Minification filter
    pub filter_min: u32,
    /// Magnification filter
    pub filter_mag: u32,
}

impl Default for TextureParams {
    fn default() -> Self {
        Self {
            internal_format: RGB,
            image_format: RGB,
            wrap_s: REPEAT,
            wrap_t: REPEAT,
            filter_min: LINEAR,
            filter_mag: LINEAR,
        }
    }
}

impl TextureParams {
    /// RGBA storage and upload with linear filtering
    pub fn rgba() -> Self {
        Self {
            internal_format: RGBA,
            image_format: RGBA,
            ..Self::default()
        }
    }

    /// Bytes per pixel of unsigned-byte data in `image_format`
    pub fn bytes_per_pixel(&self) -> usize {
        match self.image_format {
            glow::RED => 1,
            glow::RG => 2,
            glow::RGB | glow::BGR => 3,
            _ => 4,
        }
    }

    /// Check that `pixels` covers a `width` x `height` upload
    pub fn check_pixels(&self, width: u32, height: u32, pixels: Option<&[u8]>) -> Result<(), GpuError> {
        let Some(pixels) = pixels else {
            return Ok(());
        };
        let expected = (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(self.bytes_per_pixel());
        if pixels.len() < expected {
            return Err(GpuError::PixelDataTooShort {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(())
    }
}

/// Snapshot of the GL state touched by the overlay pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlStateSnapshot {
    /// `GL_CURRENT_PROGRAM`
    pub program: ObjectId,
    /// `GL_TEXTURE_BINDING_2D` on texture unit 0
    pub texture: ObjectId,
    /// `GL_ACTIVE_TEXTURE`
    pub active_texture: u32,
    /// `GL_ARRAY_BUFFER_BINDING`
    pub array_buffer: ObjectId,
    /// `GL_ELEMENT_ARRAY_BUFFER_BINDING`
    pub element_array_buffer: ObjectId,
    /// `GL_VERTEX_ARRAY_BINDING`
    pub vertex_array: ObjectId,
    /// `GL_BLEND_SRC_RGB`
    pub blend_src_rgb: u32,
    /// `GL_BLEND_DST_RGB`
    pub blend_dst_rgb: u32,
    /// `GL_BLEND_SRC_ALPHA`
    pub blend_src_alpha: u32,
    /// `GL_BLEND_DST_ALPHA`
    pub blend_dst_alpha: u32,
    /// `GL_BLEND_EQUATION_RGB`
    pub blend_equation_rgb: u32,
    /// `GL_BLEND_EQUATION_ALPHA`
    pub blend_equation_alpha: u32,
    /// `GL_VIEWPORT`
    pub viewport: [i32; 4],
    /// Enabled capabilities
    pub enabled: Capabilities,
}

/// The GL calls issued by the application core
///
/// Implementations must only be used while their context is current. All
/// methods take `&self`; GL state is owned by the driver, not by the device
/// object.
pub trait GraphicsDevice {
    /// Create a vertex array object
    fn create_vertex_array(&self) -> Result<ObjectId, GpuError>;
    /// Create a buffer object
    fn create_buffer(&self) -> Result<ObjectId, GpuError>;
    /// Create a texture object
    fn create_texture(&self) -> Result<ObjectId, GpuError>;
    /// Compile and link a program from GLSL sources
    fn create_program(&self, sources: &ShaderSources<'_>) -> Result<ObjectId, GpuError>;

    /// Delete a vertex array object
    fn delete_vertex_array(&self, id: ObjectId);
    /// Delete a buffer object
    fn delete_buffer(&self, id: ObjectId);
    /// Delete a texture object
    fn delete_texture(&self, id: ObjectId);
    /// Delete a program
    fn delete_program(&self, id: ObjectId);

    /// Look up a vertex attribute location by name
    fn attrib_location(&self, program: ObjectId, name: &str) -> Option<u32>;
    /// Bind a vertex array (0 unbinds)
    fn bind_vertex_array(&self, id: ObjectId);
    /// Bind a buffer to a target (0 unbinds)
    fn bind_buffer(&self, target: u32, id: ObjectId);
    /// Bind a 2D texture on the active unit (0 unbinds)
    fn bind_texture(&self, id: ObjectId);
    /// Select the active texture unit
    fn active_texture(&self, unit: u32);
    /// Make a program current (0 clears)
    fn use_program(&self, id: ObjectId);
    /// Enable an attribute and describe its layout in the bound array buffer
    fn vertex_attrib(&self, index: u32, components: i32, data_type: u32, normalized: bool, stride: i32, offset: i32);
    /// Upload data to the buffer bound to `target`
    fn buffer_data(&self, target: u32, data: &[u8], usage: u32);
    /// Allocate and fill a 2D texture
    ///
    /// Fails without touching the texture when `pixels` is too short.
    fn upload_texture(
        &self,
        id: ObjectId,
        width: u32,
        height: u32,
        params: &TextureParams,
        pixels: Option<&[u8]>,
    ) -> Result<(), GpuError>;

    /// Set an `int`/`sampler` uniform on the current program
    fn set_uniform_i32(&self, program: ObjectId, name: &str, value: i32);
    /// Set a `float` uniform on the current program
    fn set_uniform_f32(&self, program: ObjectId, name: &str, value: f32);
    /// Set a `vec2` uniform on the current program
    fn set_uniform_vec2(&self, program: ObjectId, name: &str, value: [f32; 2]);
    /// Set a `vec3` uniform on the current program
    fn set_uniform_vec3(&self, program: ObjectId, name: &str, value: [f32; 3]);
    /// Set a `vec4` uniform on the current program
    fn set_uniform_vec4(&self, program: ObjectId, name: &str, value: [f32; 4]);
    /// Set a column-major `mat4` uniform on the current program
    fn set_uniform_mat4(&self, program: ObjectId, name: &str, value: &[f32; 16]);

    /// Enable or disable capabilities
    fn set_capability(&self, capability: Capabilities, enabled: bool);
    /// Set the blend equation for RGB and alpha separately
    fn blend_equation(&self, rgb: u32, alpha: u32);
    /// Set the blend factors for RGB and alpha separately
    fn blend_func_separate(&self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32);
    /// Set the viewport
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    /// Set the scissor box
    fn scissor(&self, x: i32, y: i32, width: i32, height: i32);
    /// Draw indexed triangles from the bound element buffer
    fn draw_elements(&self, count: i32, index_type: u32, offset: i32);
    /// Clear color and depth buffers
    fn clear(&self, color: [f32; 4]);

    /// Read back the state the overlay pass modifies
    fn capture_state(&self) -> GlStateSnapshot;
    /// Pop one queued error code, if any
    fn poll_error(&self) -> Option<u32>;

    /// Put back everything recorded by [`capture_state`](Self::capture_state)
    fn restore_state(&self, state: &GlStateSnapshot) {
        self.use_program(state.program);
        self.active_texture(TEXTURE0);
        self.bind_texture(state.texture);
        self.active_texture(state.active_texture);
        self.bind_vertex_array(state.vertex_array);
        self.bind_buffer(ARRAY_BUFFER, state.array_buffer);
        self.bind_buffer(ELEMENT_ARRAY_BUFFER, state.element_array_buffer);
        self.blend_equation(state.blend_equation_rgb, state.blend_equation_alpha);
        self.blend_func_separate(
            state.blend_src_rgb,
            state.blend_dst_rgb,
            state.blend_src_alpha,
            state.blend_dst_alpha,
        );
        for capability in Capabilities::all().iter() {
            self.set_capability(capability, state.enabled.contains(capability));
        }
        let [x, y, width, height] = state.viewport;
        self.viewport(x, y, width, height);
    }
}

/// Human readable description of a GL error code
pub fn error_description(code: u32) -> &'static str {
    match code {
        glow::NO_ERROR => "GL_NO_ERROR: No error has been recorded",
        glow::INVALID_ENUM => "GL_INVALID_ENUM: An unacceptable value is specified for an enumerated argument",
        glow::INVALID_VALUE => "GL_INVALID_VALUE: A numeric argument is out of range",
        glow::INVALID_OPERATION => "GL_INVALID_OPERATION: The specified operation is not allowed in the current state",
        glow::INVALID_FRAMEBUFFER_OPERATION => "GL_INVALID_FRAMEBUFFER_OPERATION: The framebuffer object is not complete",
        glow::STACK_OVERFLOW => "GL_STACK_OVERFLOW: This command would cause a stack overflow",
        glow::STACK_UNDERFLOW => "GL_STACK_UNDERFLOW: This command would cause a stack underflow",
        glow::OUT_OF_MEMORY => "GL_OUT_OF_MEMORY: There is not enough memory left to execute the command",
        _ => "Unrecognized GL error enum",
    }
}

/// Drain and log every queued GL error
///
/// Returns the number of errors found.
pub fn check_errors(device: &dyn GraphicsDevice, label: &str) -> usize {
    let mut count = 0;
    while let Some(code) = device.poll_error() {
        log::error!("{}: GL error 0x{:04X}: {}", label, code, error_description(code));
        count += 1;
    }
    count
}
