//! [`GraphicsDevice`] over a `glow` context

use std::num::NonZeroU32;

use glow::HasContext;

use super::{Capabilities, GlStateSnapshot, GpuError, GraphicsDevice, ObjectId, ShaderSources, ShaderStage, TextureParams};

/// OpenGL device backed by a loaded `glow` context
pub struct GlowDevice {
    gl: glow::Context,
}

fn non_zero(id: ObjectId) -> Option<NonZeroU32> {
    NonZeroU32::new(id)
}

impl GlowDevice {
    /// Wrap a loaded context, checking that it provides at least `major.minor`
    pub fn new(gl: glow::Context, major: u32, minor: u32) -> Result<Self, GpuError> {
        let version = gl.version();
        log::info!(
            "Loaded OpenGL {}.{} ({})",
            version.major,
            version.minor,
            version.vendor_info
        );

        if (version.major, version.minor) < (major, minor) {
            return Err(GpuError::UnsupportedVersion {
                major: version.major,
                minor: version.minor,
                required_major: major,
                required_minor: minor,
            });
        }

        Ok(Self { gl })
    }

    fn uniform_location(&self, program: ObjectId, name: &str) -> Option<glow::NativeUniformLocation> {
        let program = non_zero(program).map(glow::NativeProgram)?;
        // SAFETY: the program name came from this context
        unsafe { self.gl.get_uniform_location(program, name) }
    }

    fn compile_stage(&self, stage: ShaderStage, source: &str) -> Result<glow::NativeShader, GpuError> {
        let kind = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
            ShaderStage::Geometry => glow::GEOMETRY_SHADER,
        };

        // SAFETY: plain object creation on the current context
        unsafe {
            let shader = self
                .gl
                .create_shader(kind)
                .map_err(|reason| GpuError::ObjectCreation { kind: "shader", reason })?;
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);

            if self.gl.get_shader_compile_status(shader) {
                Ok(shader)
            } else {
                let log = self.gl.get_shader_info_log(shader);
                self.gl.delete_shader(shader);
                Err(GpuError::ShaderCompile { stage, log })
            }
        }
    }
}

impl GraphicsDevice for GlowDevice {
    fn create_vertex_array(&self) -> Result<ObjectId, GpuError> {
        // SAFETY: object creation on the current context
        unsafe { self.gl.create_vertex_array() }
            .map(|vao| vao.0.get())
            .map_err(|reason| GpuError::ObjectCreation { kind: "vertex array", reason })
    }

    fn create_buffer(&self) -> Result<ObjectId, GpuError> {
        // SAFETY: object creation on the current context
        unsafe { self.gl.create_buffer() }
            .map(|buffer| buffer.0.get())
            .map_err(|reason| GpuError::ObjectCreation { kind: "buffer", reason })
    }

    fn create_texture(&self) -> Result<ObjectId, GpuError> {
        // SAFETY: object creation on the current context
        unsafe { self.gl.create_texture() }
            .map(|texture| texture.0.get())
            .map_err(|reason| GpuError::ObjectCreation { kind: "texture", reason })
    }

    fn create_program(&self, sources: &ShaderSources<'_>) -> Result<ObjectId, GpuError> {
        let mut stages = vec![(ShaderStage::Vertex, sources.vertex), (ShaderStage::Fragment, sources.fragment)];
        if let Some(geometry) = sources.geometry {
            stages.push((ShaderStage::Geometry, geometry));
        }

        let mut shaders = Vec::with_capacity(stages.len());
        for (stage, source) in stages {
            match self.compile_stage(stage, source) {
                Ok(shader) => shaders.push(shader),
                Err(err) => {
                    // SAFETY: shaders were created above on this context
                    unsafe {
                        for shader in shaders {
                            self.gl.delete_shader(shader);
                        }
                    }
                    return Err(err);
                }
            }
        }

        // SAFETY: linking objects created on the current context
        unsafe {
            let program = match self.gl.create_program() {
                Ok(program) => program,
                Err(reason) => {
                    for shader in shaders {
                        self.gl.delete_shader(shader);
                    }
                    return Err(GpuError::ObjectCreation { kind: "program", reason });
                }
            };

            for shader in &shaders {
                self.gl.attach_shader(program, *shader);
            }
            self.gl.link_program(program);

            for shader in shaders {
                self.gl.detach_shader(program, shader);
                self.gl.delete_shader(shader);
            }

            if self.gl.get_program_link_status(program) {
                Ok(program.0.get())
            } else {
                let log = self.gl.get_program_info_log(program);
                self.gl.delete_program(program);
                Err(GpuError::ProgramLink(log))
            }
        }
    }

    fn delete_vertex_array(&self, id: ObjectId) {
        if let Some(id) = non_zero(id) {
            // SAFETY: deleting a name owned by this context
            unsafe { self.gl.delete_vertex_array(glow::NativeVertexArray(id)) }
        }
    }

    fn delete_buffer(&self, id: ObjectId) {
        if let Some(id) = non_zero(id) {
            // SAFETY: deleting a name owned by this context
            unsafe { self.gl.delete_buffer(glow::NativeBuffer(id)) }
        }
    }

    fn delete_texture(&self, id: ObjectId) {
        if let Some(id) = non_zero(id) {
            // SAFETY: deleting a name owned by this context
            unsafe { self.gl.delete_texture(glow::NativeTexture(id)) }
        }
    }

    fn delete_program(&self, id: ObjectId) {
        if let Some(id) = non_zero(id) {
            // SAFETY: deleting a name owned by this context
            unsafe { self.gl.delete_program(glow::NativeProgram(id)) }
        }
    }

    fn attrib_location(&self, program: ObjectId, name: &str) -> Option<u32> {
        let program = non_zero(program).map(glow::NativeProgram)?;
        // SAFETY: query on a program owned by this context
        unsafe { self.gl.get_attrib_location(program, name) }
    }

    fn bind_vertex_array(&self, id: ObjectId) {
        // SAFETY: binding a name owned by this context (or unbinding)
        unsafe { self.gl.bind_vertex_array(non_zero(id).map(glow::NativeVertexArray)) }
    }

    fn bind_buffer(&self, target: u32, id: ObjectId) {
        // SAFETY: binding a name owned by this context (or unbinding)
        unsafe { self.gl.bind_buffer(target, non_zero(id).map(glow::NativeBuffer)) }
    }

    fn bind_texture(&self, id: ObjectId) {
        // SAFETY: binding a name owned by this context (or unbinding)
        unsafe { self.gl.bind_texture(glow::TEXTURE_2D, non_zero(id).map(glow::NativeTexture)) }
    }

    fn active_texture(&self, unit: u32) {
        // SAFETY: state change on the current context
        unsafe { self.gl.active_texture(unit) }
    }

    fn use_program(&self, id: ObjectId) {
        // SAFETY: binding a name owned by this context (or clearing)
        unsafe { self.gl.use_program(non_zero(id).map(glow::NativeProgram)) }
    }

    fn vertex_attrib(&self, index: u32, components: i32, data_type: u32, normalized: bool, stride: i32, offset: i32) {
        // SAFETY: describes the currently bound array buffer
        unsafe {
            self.gl.enable_vertex_attrib_array(index);
            self.gl
                .vertex_attrib_pointer_f32(index, components, data_type, normalized, stride, offset);
        }
    }

    fn buffer_data(&self, target: u32, data: &[u8], usage: u32) {
        // SAFETY: uploads into the buffer bound to `target`
        unsafe { self.gl.buffer_data_u8_slice(target, data, usage) }
    }

    fn upload_texture(
        &self,
        id: ObjectId,
        width: u32,
        height: u32,
        params: &TextureParams,
        pixels: Option<&[u8]>,
    ) -> Result<(), GpuError> {
        params.check_pixels(width, height, pixels)?;

        // SAFETY: `pixels` covers width * height texels of `image_format`;
        // the previous binding and unpack alignment are put back
        unsafe {
            let previous_texture = self.gl.get_parameter_i32(glow::TEXTURE_BINDING_2D) as u32;
            let previous_alignment = self.gl.get_parameter_i32(glow::UNPACK_ALIGNMENT);

            self.gl.bind_texture(glow::TEXTURE_2D, non_zero(id).map(glow::NativeTexture));
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                params.internal_format as i32,
                width as i32,
                height as i32,
                0,
                params.image_format,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(pixels),
            );
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, params.wrap_s as i32);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, params.wrap_t as i32);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, params.filter_min as i32);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, params.filter_mag as i32);

            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, previous_alignment);
            self.gl
                .bind_texture(glow::TEXTURE_2D, non_zero(previous_texture).map(glow::NativeTexture));
        }
        Ok(())
    }

    fn set_uniform_i32(&self, program: ObjectId, name: &str, value: i32) {
        let location = self.uniform_location(program, name);
        // SAFETY: uniform on the current program
        unsafe { self.gl.uniform_1_i32(location.as_ref(), value) }
    }

    fn set_uniform_f32(&self, program: ObjectId, name: &str, value: f32) {
        let location = self.uniform_location(program, name);
        // SAFETY: uniform on the current program
        unsafe { self.gl.uniform_1_f32(location.as_ref(), value) }
    }

    fn set_uniform_vec2(&self, program: ObjectId, name: &str, value: [f32; 2]) {
        let location = self.uniform_location(program, name);
        // SAFETY: uniform on the current program
        unsafe { self.gl.uniform_2_f32(location.as_ref(), value[0], value[1]) }
    }

    fn set_uniform_vec3(&self, program: ObjectId, name: &str, value: [f32; 3]) {
        let location = self.uniform_location(program, name);
        // SAFETY: uniform on the current program
        unsafe { self.gl.uniform_3_f32(location.as_ref(), value[0], value[1], value[2]) }
    }

    fn set_uniform_vec4(&self, program: ObjectId, name: &str, value: [f32; 4]) {
        let location = self.uniform_location(program, name);
        // SAFETY: uniform on the current program
        unsafe {
            self.gl
                .uniform_4_f32(location.as_ref(), value[0], value[1], value[2], value[3]);
        }
    }

    fn set_uniform_mat4(&self, program: ObjectId, name: &str, value: &[f32; 16]) {
        let location = self.uniform_location(program, name);
        // SAFETY: uniform on the current program
        unsafe { self.gl.uniform_matrix_4_f32_slice(location.as_ref(), false, value) }
    }

    fn set_capability(&self, capability: Capabilities, enabled: bool) {
        for flag in capability.iter() {
            let Some(cap) = flag.gl_enum() else { continue };
            // SAFETY: state change on the current context
            unsafe {
                if enabled {
                    self.gl.enable(cap);
                } else {
                    self.gl.disable(cap);
                }
            }
        }
    }

    fn blend_equation(&self, rgb: u32, alpha: u32) {
        // SAFETY: state change on the current context
        unsafe { self.gl.blend_equation_separate(rgb, alpha) }
    }

    fn blend_func_separate(&self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32) {
        // SAFETY: state change on the current context
        unsafe { self.gl.blend_func_separate(src_rgb, dst_rgb, src_alpha, dst_alpha) }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        // SAFETY: state change on the current context
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    fn scissor(&self, x: i32, y: i32, width: i32, height: i32) {
        // SAFETY: state change on the current context
        unsafe { self.gl.scissor(x, y, width, height) }
    }

    fn draw_elements(&self, count: i32, index_type: u32, offset: i32) {
        // SAFETY: draws from the bound vertex array and element buffer
        unsafe { self.gl.draw_elements(glow::TRIANGLES, count, index_type, offset) }
    }

    fn clear(&self, color: [f32; 4]) {
        // SAFETY: clears the current framebuffer
        unsafe {
            self.gl.clear_color(color[0], color[1], color[2], color[3]);
            self.gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }
    }

    fn capture_state(&self) -> GlStateSnapshot {
        // SAFETY: queries on the current context; the active unit is put back
        unsafe {
            let mut viewport = [0; 4];
            self.gl.get_parameter_i32_slice(glow::VIEWPORT, &mut viewport);

            let mut enabled = Capabilities::empty();
            for flag in Capabilities::all().iter() {
                if let Some(cap) = flag.gl_enum() {
                    if self.gl.is_enabled(cap) {
                        enabled |= flag;
                    }
                }
            }

            let get = |pname| self.gl.get_parameter_i32(pname) as u32;

            // The overlay pass binds on unit 0, so that is the binding to keep
            let active_texture = get(glow::ACTIVE_TEXTURE);
            self.gl.active_texture(glow::TEXTURE0);
            let texture = get(glow::TEXTURE_BINDING_2D);
            self.gl.active_texture(active_texture);

            GlStateSnapshot {
                program: get(glow::CURRENT_PROGRAM),
                texture,
                active_texture,
                array_buffer: get(glow::ARRAY_BUFFER_BINDING),
                element_array_buffer: get(glow::ELEMENT_ARRAY_BUFFER_BINDING),
                vertex_array: get(glow::VERTEX_ARRAY_BINDING),
                blend_src_rgb: get(glow::BLEND_SRC_RGB),
                blend_dst_rgb: get(glow::BLEND_DST_RGB),
                blend_src_alpha: get(glow::BLEND_SRC_ALPHA),
                blend_dst_alpha: get(glow::BLEND_DST_ALPHA),
                blend_equation_rgb: get(glow::BLEND_EQUATION_RGB),
                blend_equation_alpha: get(glow::BLEND_EQUATION_ALPHA),
                viewport,
                enabled,
            }
        }
    }

    fn poll_error(&self) -> Option<u32> {
        // SAFETY: read-only query on the current context
        let code = unsafe { self.gl.get_error() };
        (code != glow::NO_ERROR).then_some(code)
    }
}
