//! Compiled shader program handle

use crate::gpu::{GpuError, GraphicsDevice, ObjectId, ShaderSources};

/// Handle to a linked GL program
///
/// A `Shader` is a plain copyable name. The program itself belongs to the
/// context it was compiled in (and every context sharing with it); the
/// [`ResourceManager`](super::ResourceManager) decides when it is deleted.
///
/// Uniform setters take an `activate` flag: when set, the program is made
/// current before the uniform is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Shader {
    id: ObjectId,
}

impl Shader {
    /// Wrap an existing program name
    pub fn from_id(id: ObjectId) -> Self {
        Self { id }
    }

    /// Compile and link a program
    pub fn compile(device: &dyn GraphicsDevice, sources: &ShaderSources<'_>) -> Result<Self, GpuError> {
        let id = device.create_program(sources)?;
        log::debug!("Linked shader program {}", id);
        Ok(Self { id })
    }

    /// GL program name
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Make this program current
    pub fn use_shader(&self, device: &dyn GraphicsDevice) {
        device.use_program(self.id);
    }

    fn prepare(&self, device: &dyn GraphicsDevice, activate: bool) {
        if activate {
            device.use_program(self.id);
        }
    }

    /// Set an `int` or sampler uniform
    pub fn set_integer(&self, device: &dyn GraphicsDevice, name: &str, value: i32, activate: bool) {
        self.prepare(device, activate);
        device.set_uniform_i32(self.id, name, value);
    }

    /// Set a `float` uniform
    pub fn set_float(&self, device: &dyn GraphicsDevice, name: &str, value: f32, activate: bool) {
        self.prepare(device, activate);
        device.set_uniform_f32(self.id, name, value);
    }

    /// Set a `vec2` uniform
    pub fn set_vector2f(&self, device: &dyn GraphicsDevice, name: &str, value: nalgebra::Vector2<f32>, activate: bool) {
        self.prepare(device, activate);
        device.set_uniform_vec2(self.id, name, value.into());
    }

    /// Set a `vec3` uniform
    pub fn set_vector3f(&self, device: &dyn GraphicsDevice, name: &str, value: nalgebra::Vector3<f32>, activate: bool) {
        self.prepare(device, activate);
        device.set_uniform_vec3(self.id, name, value.into());
    }

    /// Set a `vec4` uniform
    pub fn set_vector4f(&self, device: &dyn GraphicsDevice, name: &str, value: nalgebra::Vector4<f32>, activate: bool) {
        self.prepare(device, activate);
        device.set_uniform_vec4(self.id, name, value.into());
    }

    /// Set a `mat4` uniform (column-major, as nalgebra stores it)
    pub fn set_matrix4(&self, device: &dyn GraphicsDevice, name: &str, value: &nalgebra::Matrix4<f32>, activate: bool) {
        self.prepare(device, activate);
        let mut columns = [0.0; 16];
        columns.copy_from_slice(value.as_slice());
        device.set_uniform_mat4(self.id, name, &columns);
    }
}
