//! Overlay draw-list submission
//!
//! Each window owns one renderer: a vertex array plus the vertex and index
//! buffers the overlay geometry is streamed through. Submission runs in the
//! middle of arbitrary caller drawing, so every piece of GL state it touches
//! is captured first and put back afterwards.

use nalgebra::Matrix4;

use super::{OverlayDrawData, OverlayError, OverlayIndex, OverlayVertex};
use crate::gpu::{
    Capabilities, GpuError, GraphicsDevice, ObjectId, ARRAY_BUFFER, ELEMENT_ARRAY_BUFFER, FLOAT, FUNC_ADD,
    ONE, ONE_MINUS_SRC_ALPHA, SRC_ALPHA, STREAM_DRAW, TEXTURE0, UNSIGNED_BYTE, UNSIGNED_SHORT,
};
use crate::resources::Shader;

const POSITION_ATTRIBUTE: &str = "Position";
const UV_ATTRIBUTE: &str = "UV";
const COLOR_ATTRIBUTE: &str = "Color";

/// Sampler uniform of the overlay shader
pub const TEXTURE_UNIFORM: &str = "Texture";
/// Projection uniform of the overlay shader
pub const PROJECTION_UNIFORM: &str = "ProjMtx";

/// GPU objects and state for drawing one window's overlay
#[derive(Debug, Default)]
pub struct OverlayRenderer {
    shader: Shader,
    vertex_array: ObjectId,
    vertex_buffer: ObjectId,
    index_buffer: ObjectId,
}

/// Orthographic projection from display coordinates to clip space, y down
pub fn ortho_projection(display_size: [f32; 2]) -> Matrix4<f32> {
    let [width, height] = display_size;
    #[rustfmt::skip]
    let columns = [
        2.0 / width, 0.0,             0.0,  0.0,
        0.0,         2.0 / -height,   0.0,  0.0,
        0.0,         0.0,            -1.0,  0.0,
        -1.0,        1.0,             0.0,  1.0,
    ];
    Matrix4::from_column_slice(&columns)
}

/// Scissor box in framebuffer pixels for a clip rectangle in display coordinates
pub fn scissor_box(clip_rect: [f32; 4], framebuffer_scale: [f32; 2], framebuffer_height: i32) -> [i32; 4] {
    let x1 = clip_rect[0] * framebuffer_scale[0];
    let y1 = clip_rect[1] * framebuffer_scale[1];
    let x2 = clip_rect[2] * framebuffer_scale[0];
    let y2 = clip_rect[3] * framebuffer_scale[1];
    [
        x1 as i32,
        framebuffer_height - y2 as i32,
        (x2 - x1) as i32,
        (y2 - y1) as i32,
    ]
}

impl OverlayRenderer {
    /// Renderer with no GPU objects
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether [`init`](Self::init) has allocated the GPU objects
    pub fn is_initialized(&self) -> bool {
        self.vertex_array != 0
    }

    /// Allocate buffers and bind the vertex layout to the shader's attributes
    pub fn init(&mut self, device: &dyn GraphicsDevice, shader: Shader) -> Result<(), OverlayInitError> {
        let position = device
            .attrib_location(shader.id(), POSITION_ATTRIBUTE)
            .ok_or(OverlayError::MissingAttribute(POSITION_ATTRIBUTE))?;
        let uv = device
            .attrib_location(shader.id(), UV_ATTRIBUTE)
            .ok_or(OverlayError::MissingAttribute(UV_ATTRIBUTE))?;
        let color = device
            .attrib_location(shader.id(), COLOR_ATTRIBUTE)
            .ok_or(OverlayError::MissingAttribute(COLOR_ATTRIBUTE))?;

        self.shader = shader;
        self.vertex_array = device.create_vertex_array()?;
        self.vertex_buffer = device.create_buffer()?;
        self.index_buffer = device.create_buffer()?;

        let stride = std::mem::size_of::<OverlayVertex>() as i32;
        device.bind_vertex_array(self.vertex_array);
        device.bind_buffer(ARRAY_BUFFER, self.vertex_buffer);
        device.vertex_attrib(position, 2, FLOAT, false, stride, 0);
        device.vertex_attrib(uv, 2, FLOAT, false, stride, 8);
        device.vertex_attrib(color, 4, UNSIGNED_BYTE, true, stride, 16);
        device.bind_vertex_array(0);
        device.bind_buffer(ARRAY_BUFFER, 0);

        log::debug!(
            "Overlay renderer ready: vao {}, vbo {}, ebo {}",
            self.vertex_array,
            self.vertex_buffer,
            self.index_buffer
        );
        Ok(())
    }

    /// Draw a finished overlay frame
    ///
    /// Nothing is drawn when the framebuffer has no area.
    pub fn submit(&self, device: &dyn GraphicsDevice, data: &OverlayDrawData) {
        let (fb_width, fb_height) = data.framebuffer_size();
        if fb_width <= 0 || fb_height <= 0 || !self.is_initialized() {
            return;
        }

        let saved = device.capture_state();

        device.active_texture(TEXTURE0);
        device.set_capability(Capabilities::BLEND, true);
        device.blend_equation(FUNC_ADD, FUNC_ADD);
        device.blend_func_separate(SRC_ALPHA, ONE_MINUS_SRC_ALPHA, ONE, ONE_MINUS_SRC_ALPHA);
        device.set_capability(Capabilities::CULL_FACE | Capabilities::DEPTH_TEST, false);
        device.set_capability(Capabilities::SCISSOR_TEST, true);
        device.viewport(0, 0, fb_width, fb_height);

        self.shader.use_shader(device);
        self.shader.set_integer(device, TEXTURE_UNIFORM, 0, false);
        self.shader
            .set_matrix4(device, PROJECTION_UNIFORM, &ortho_projection(data.display_size), false);
        device.bind_vertex_array(self.vertex_array);

        for list in &data.lists {
            device.bind_buffer(ARRAY_BUFFER, self.vertex_buffer);
            device.buffer_data(ARRAY_BUFFER, bytemuck::cast_slice(&list.vertices), STREAM_DRAW);
            device.bind_buffer(ELEMENT_ARRAY_BUFFER, self.index_buffer);
            device.buffer_data(ELEMENT_ARRAY_BUFFER, bytemuck::cast_slice(&list.indices), STREAM_DRAW);

            for command in &list.commands {
                device.bind_texture(command.texture);
                let [x, y, width, height] = scissor_box(command.clip_rect, data.framebuffer_scale, fb_height);
                device.scissor(x, y, width, height);
                device.draw_elements(
                    command.element_count as i32,
                    UNSIGNED_SHORT,
                    (command.index_offset * std::mem::size_of::<OverlayIndex>()) as i32,
                );
            }
        }

        device.restore_state(&saved);
    }

    /// Delete the GPU objects; safe to call when nothing was allocated
    pub fn release(&mut self, device: &dyn GraphicsDevice) {
        if self.vertex_array != 0 {
            device.delete_vertex_array(self.vertex_array);
        }
        if self.vertex_buffer != 0 {
            device.delete_buffer(self.vertex_buffer);
        }
        if self.index_buffer != 0 {
            device.delete_buffer(self.index_buffer);
        }
        self.vertex_array = 0;
        self.vertex_buffer = 0;
        self.index_buffer = 0;
    }
}

/// Failure while setting up the overlay renderer
#[derive(thiserror::Error, Debug)]
pub enum OverlayInitError {
    /// The overlay shader does not match the vertex layout
    #[error(transparent)]
    Overlay(#[from] OverlayError),

    /// Buffer or vertex array creation failed
    #[error(transparent)]
    Gpu(#[from] GpuError),
}
