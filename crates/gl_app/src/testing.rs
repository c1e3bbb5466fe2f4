//! Headless doubles for the platform, GL device and overlay seams
//!
//! Every double shares its state through an `Rc<RefCell<_>>`, so a test can
//! keep a clone after handing the boxed double to an [`App`](crate::App) and
//! inspect what happened afterwards.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::rc::Rc;

use crate::core::ContextConfig;
use crate::gpu::{
    Capabilities, GlStateSnapshot, GpuError, GraphicsDevice, ObjectId, ShaderSources, TextureParams, ARRAY_BUFFER,
    ELEMENT_ARRAY_BUFFER, TEXTURE0,
};
use crate::overlay::{
    FontAtlasImage, OverlayBackend, OverlayContext, OverlayDrawCommand, OverlayDrawData, OverlayDrawList,
    OverlayError, OverlayModifiers, OverlayVertex, SharedOverlayAssets,
};
use crate::platform::{
    Key, MouseButton, NativeWindowDesc, NativeWindowId, Platform, PlatformError, WindowEvent,
};

/// One recorded GL call
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCall {
    CreateVertexArray(ObjectId),
    CreateBuffer(ObjectId),
    CreateTexture(ObjectId),
    CreateProgram(ObjectId),
    DeleteVertexArray(ObjectId),
    DeleteBuffer(ObjectId),
    DeleteTexture(ObjectId),
    DeleteProgram(ObjectId),
    BindVertexArray(ObjectId),
    BindBuffer(u32, ObjectId),
    BindTexture(ObjectId),
    ActiveTexture(u32),
    UseProgram(ObjectId),
    VertexAttrib {
        index: u32,
        components: i32,
        data_type: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    },
    BufferData(u32, usize),
    UploadTexture(ObjectId, u32, u32),
    Uniform(ObjectId, String),
    SetCapability(Capabilities, bool),
    BlendEquation(u32, u32),
    BlendFuncSeparate(u32, u32, u32, u32),
    Viewport(i32, i32, i32, i32),
    Scissor(i32, i32, i32, i32),
    DrawElements(i32, u32, i32),
    Clear([f32; 4]),
}

#[derive(Debug)]
struct MockWindow {
    title: String,
    size: (i32, i32),
    buffer_size: (i32, i32),
    should_close: bool,
    focused: bool,
    visible: bool,
    cursor_hidden: bool,
    held_buttons: Vec<MouseButton>,
    share: Option<NativeWindowId>,
    close_after_swaps: Option<usize>,
}

#[derive(Debug, Default)]
struct MockState {
    // GL side
    calls: Vec<(Option<NativeWindowId>, GpuCall)>,
    errors: VecDeque<u32>,
    next_object: ObjectId,
    fail_program: Option<String>,
    hidden_attributes: HashSet<String>,
    attribute_locations: HashMap<String, u32>,
    last_matrix: Option<Vec<f32>>,
    last_program_stages: Option<usize>,
    gl: GlStateSnapshot,
    unit_textures: HashMap<u32, ObjectId>,

    // Platform side
    initialized: bool,
    fail_init: bool,
    init_context: Option<ContextConfig>,
    terminated: bool,
    windows_at_terminate: usize,
    windows: BTreeMap<NativeWindowId, MockWindow>,
    next_window: u64,
    current: Option<NativeWindowId>,
    context_switches: Vec<Option<NativeWindowId>>,
    fail_windows: HashSet<String>,
    fail_graphics: HashSet<String>,
    events: Vec<(NativeWindowId, WindowEvent)>,
    swaps: Vec<NativeWindowId>,
    destroyed: Vec<NativeWindowId>,
    clipboard: Option<String>,
}

impl MockState {
    fn record(&mut self, call: GpuCall) {
        let current = self.current;
        self.calls.push((current, call));
    }

    fn active_unit(&self) -> u32 {
        self.gl.active_texture.max(TEXTURE0)
    }

    fn allocate(&mut self) -> ObjectId {
        self.next_object += 1;
        self.next_object
    }
}

/// Scriptable [`Platform`] that records everything
#[derive(Clone, Default)]
pub struct MockPlatform {
    state: Rc<RefCell<MockState>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Device sharing this platform's call log, without any window
    pub fn device_for_tests(&self) -> RecordingDevice {
        RecordingDevice {
            state: self.state.clone(),
        }
    }

    pub fn push_gl_error(&self, code: u32) {
        self.state.borrow_mut().errors.push_back(code);
    }

    pub fn gpu_calls(&self) -> Vec<GpuCall> {
        self.state.borrow().calls.iter().map(|(_, call)| call.clone()).collect()
    }

    /// Calls issued while `window`'s context was current
    pub fn gpu_calls_in(&self, window: NativeWindowId) -> Vec<GpuCall> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|(context, _)| *context == Some(window))
            .map(|(_, call)| call.clone())
            .collect()
    }

    pub fn clear_gpu_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn fail_next_program(&self, log: &str) {
        self.state.borrow_mut().fail_program = Some(log.to_string());
    }

    pub fn hide_attribute(&self, name: &str) {
        self.state.borrow_mut().hidden_attributes.insert(name.to_string());
    }

    pub fn texture_on_unit(&self, unit: u32) -> ObjectId {
        self.state.borrow().unit_textures.get(&unit).copied().unwrap_or(0)
    }

    pub fn last_matrix(&self) -> Option<Vec<f32>> {
        self.state.borrow().last_matrix.clone()
    }

    pub fn last_program_stages(&self) -> Option<usize> {
        self.state.borrow().last_program_stages
    }

    pub fn fail_init(&self) {
        self.state.borrow_mut().fail_init = true;
    }

    /// Native window creation fails for this title
    pub fn fail_window(&self, title: &str) {
        self.state.borrow_mut().fail_windows.insert(title.to_string());
    }

    /// GL loading fails for windows with this title
    pub fn fail_graphics(&self, title: &str) {
        self.state.borrow_mut().fail_graphics.insert(title.to_string());
    }

    pub fn init_context(&self) -> Option<ContextConfig> {
        self.state.borrow().init_context
    }

    pub fn native_for(&self, title: &str) -> Option<NativeWindowId> {
        self.state
            .borrow()
            .windows
            .iter()
            .find(|(_, window)| window.title == title)
            .map(|(id, _)| *id)
    }

    pub fn live_windows(&self) -> usize {
        self.state.borrow().windows.len()
    }

    pub fn share_of(&self, window: NativeWindowId) -> Option<NativeWindowId> {
        self.state.borrow().windows.get(&window).and_then(|w| w.share)
    }

    pub fn is_visible(&self, window: NativeWindowId) -> bool {
        self.state.borrow().windows.get(&window).is_some_and(|w| w.visible)
    }

    pub fn is_cursor_hidden(&self, window: NativeWindowId) -> bool {
        self.state.borrow().windows.get(&window).is_some_and(|w| w.cursor_hidden)
    }

    pub fn destroyed(&self) -> Vec<NativeWindowId> {
        self.state.borrow().destroyed.clone()
    }

    pub fn swaps(&self) -> Vec<NativeWindowId> {
        self.state.borrow().swaps.clone()
    }

    pub fn current_context(&self) -> Option<NativeWindowId> {
        self.state.borrow().current
    }

    pub fn context_switches(&self) -> Vec<Option<NativeWindowId>> {
        self.state.borrow().context_switches.clone()
    }

    pub fn terminated(&self) -> bool {
        self.state.borrow().terminated
    }

    /// Live native windows at the moment `terminate` ran
    pub fn windows_at_terminate(&self) -> usize {
        self.state.borrow().windows_at_terminate
    }

    /// Queue an event for the next `poll_events`
    pub fn push_event(&self, window: NativeWindowId, event: WindowEvent) {
        self.state.borrow_mut().events.push((window, event));
    }

    pub fn set_focused(&self, window: NativeWindowId, focused: bool) {
        if let Some(w) = self.state.borrow_mut().windows.get_mut(&window) {
            w.focused = focused;
        }
    }

    pub fn hold_button(&self, window: NativeWindowId, button: MouseButton) {
        if let Some(w) = self.state.borrow_mut().windows.get_mut(&window) {
            w.held_buttons.push(button);
        }
    }

    pub fn resize_framebuffer(&self, window: NativeWindowId, width: i32, height: i32) {
        if let Some(w) = self.state.borrow_mut().windows.get_mut(&window) {
            w.buffer_size = (width, height);
        }
    }

    /// Raise the close flag once the window has presented `frames` frames
    pub fn close_after_frames(&self, window: NativeWindowId, frames: usize) {
        if let Some(w) = self.state.borrow_mut().windows.get_mut(&window) {
            w.close_after_swaps = Some(frames);
        }
    }

    /// Set a close flag from outside the platform trait
    pub fn request_close(&self, window: NativeWindowId) {
        if let Some(w) = self.state.borrow_mut().windows.get_mut(&window) {
            w.should_close = true;
        }
    }
}

impl Platform for MockPlatform {
    fn init(&mut self, context: &ContextConfig) -> Result<(), PlatformError> {
        let mut state = self.state.borrow_mut();
        if state.fail_init {
            return Err(PlatformError::InitFailed("mock init failure".to_string()));
        }
        state.initialized = true;
        state.init_context = Some(*context);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.state.borrow().initialized
    }

    fn create_window(&mut self, desc: &NativeWindowDesc<'_>) -> Result<NativeWindowId, PlatformError> {
        let mut state = self.state.borrow_mut();
        if !state.initialized {
            return Err(PlatformError::NotInitialized);
        }
        if state.fail_windows.contains(desc.title) {
            return Err(PlatformError::WindowCreation(desc.title.to_string()));
        }

        state.next_window += 1;
        let id = NativeWindowId(state.next_window);
        let size = (desc.width as i32, desc.height as i32);
        state.windows.insert(
            id,
            MockWindow {
                title: desc.title.to_string(),
                size,
                buffer_size: size,
                should_close: false,
                focused: true,
                visible: true,
                cursor_hidden: false,
                held_buttons: Vec::new(),
                share: desc.share,
                close_after_swaps: None,
            },
        );
        Ok(id)
    }

    fn load_graphics(&mut self, window: NativeWindowId) -> Result<Rc<dyn GraphicsDevice>, PlatformError> {
        let mut state = self.state.borrow_mut();
        let title = state
            .windows
            .get(&window)
            .map(|w| w.title.clone())
            .ok_or(PlatformError::UnknownWindow(window))?;
        if state.fail_graphics.contains(&title) {
            return Err(PlatformError::GraphicsInit(GpuError::UnsupportedVersion {
                major: 2,
                minor: 1,
                required_major: 3,
                required_minor: 3,
            }));
        }
        state.current = Some(window);
        state.context_switches.push(Some(window));
        Ok(Rc::new(RecordingDevice {
            state: self.state.clone(),
        }))
    }

    fn destroy_window(&mut self, window: NativeWindowId) {
        let mut state = self.state.borrow_mut();
        if state.windows.remove(&window).is_some() {
            state.destroyed.push(window);
            if state.current == Some(window) {
                state.current = None;
            }
        }
    }

    fn hide_window(&mut self, window: NativeWindowId) {
        if let Some(w) = self.state.borrow_mut().windows.get_mut(&window) {
            w.visible = false;
        }
    }

    fn make_context_current(&mut self, window: Option<NativeWindowId>) {
        let mut state = self.state.borrow_mut();
        state.current = window;
        state.context_switches.push(window);
    }

    fn swap_buffers(&mut self, window: NativeWindowId) {
        let mut state = self.state.borrow_mut();
        state.swaps.push(window);
        if let Some(w) = state.windows.get_mut(&window) {
            if let Some(remaining) = w.close_after_swaps.as_mut() {
                *remaining = remaining.saturating_sub(1);
                if *remaining == 0 {
                    w.should_close = true;
                }
            }
        }
    }

    fn poll_events(&mut self) -> Vec<(NativeWindowId, WindowEvent)> {
        std::mem::take(&mut self.state.borrow_mut().events)
    }

    fn should_close(&self, window: NativeWindowId) -> bool {
        self.state.borrow().windows.get(&window).is_some_and(|w| w.should_close)
    }

    fn set_should_close(&mut self, window: NativeWindowId, value: bool) {
        if let Some(w) = self.state.borrow_mut().windows.get_mut(&window) {
            w.should_close = value;
        }
    }

    fn is_focused(&self, window: NativeWindowId) -> bool {
        self.state.borrow().windows.get(&window).is_some_and(|w| w.focused)
    }

    fn is_mouse_button_held(&self, window: NativeWindowId, button: MouseButton) -> bool {
        self.state
            .borrow()
            .windows
            .get(&window)
            .is_some_and(|w| w.held_buttons.contains(&button))
    }

    fn window_size(&self, window: NativeWindowId) -> (i32, i32) {
        self.state.borrow().windows.get(&window).map_or((0, 0), |w| w.size)
    }

    fn framebuffer_size(&self, window: NativeWindowId) -> (i32, i32) {
        self.state.borrow().windows.get(&window).map_or((0, 0), |w| w.buffer_size)
    }

    fn set_cursor_hidden(&mut self, window: NativeWindowId, hidden: bool) {
        if let Some(w) = self.state.borrow_mut().windows.get_mut(&window) {
            w.cursor_hidden = hidden;
        }
    }

    fn clipboard_text(&self, _window: NativeWindowId) -> Option<String> {
        self.state.borrow().clipboard.clone()
    }

    fn set_clipboard_text(&mut self, _window: NativeWindowId, text: &str) {
        self.state.borrow_mut().clipboard = Some(text.to_string());
    }

    fn terminate(&mut self) {
        let mut state = self.state.borrow_mut();
        state.windows_at_terminate = state.windows.len();
        state.initialized = false;
        state.terminated = true;
        state.current = None;
    }
}

/// [`GraphicsDevice`] that records calls and tracks bindings
pub struct RecordingDevice {
    state: Rc<RefCell<MockState>>,
}

impl RecordingDevice {
    fn create(&self, call: fn(ObjectId) -> GpuCall) -> Result<ObjectId, GpuError> {
        let mut state = self.state.borrow_mut();
        let id = state.allocate();
        state.record(call(id));
        Ok(id)
    }

    fn record(&self, call: GpuCall) {
        self.state.borrow_mut().record(call);
    }
}

impl GraphicsDevice for RecordingDevice {
    fn create_vertex_array(&self) -> Result<ObjectId, GpuError> {
        self.create(GpuCall::CreateVertexArray)
    }

    fn create_buffer(&self) -> Result<ObjectId, GpuError> {
        self.create(GpuCall::CreateBuffer)
    }

    fn create_texture(&self) -> Result<ObjectId, GpuError> {
        self.create(GpuCall::CreateTexture)
    }

    fn create_program(&self, sources: &ShaderSources<'_>) -> Result<ObjectId, GpuError> {
        let mut state = self.state.borrow_mut();
        if let Some(log) = state.fail_program.take() {
            return Err(GpuError::ProgramLink(log));
        }
        state.last_program_stages = Some(if sources.geometry.is_some() { 3 } else { 2 });
        let id = state.allocate();
        state.record(GpuCall::CreateProgram(id));
        Ok(id)
    }

    fn delete_vertex_array(&self, id: ObjectId) {
        self.record(GpuCall::DeleteVertexArray(id));
    }

    fn delete_buffer(&self, id: ObjectId) {
        self.record(GpuCall::DeleteBuffer(id));
    }

    fn delete_texture(&self, id: ObjectId) {
        self.record(GpuCall::DeleteTexture(id));
    }

    fn delete_program(&self, id: ObjectId) {
        self.record(GpuCall::DeleteProgram(id));
    }

    fn attrib_location(&self, _program: ObjectId, name: &str) -> Option<u32> {
        let mut state = self.state.borrow_mut();
        if state.hidden_attributes.contains(name) {
            return None;
        }
        let next = state.attribute_locations.len() as u32;
        Some(*state.attribute_locations.entry(name.to_string()).or_insert(next))
    }

    fn bind_vertex_array(&self, id: ObjectId) {
        let mut state = self.state.borrow_mut();
        state.gl.vertex_array = id;
        state.record(GpuCall::BindVertexArray(id));
    }

    fn bind_buffer(&self, target: u32, id: ObjectId) {
        let mut state = self.state.borrow_mut();
        match target {
            ARRAY_BUFFER => state.gl.array_buffer = id,
            ELEMENT_ARRAY_BUFFER => state.gl.element_array_buffer = id,
            _ => {}
        }
        state.record(GpuCall::BindBuffer(target, id));
    }

    fn bind_texture(&self, id: ObjectId) {
        let mut state = self.state.borrow_mut();
        let unit = state.active_unit();
        state.unit_textures.insert(unit, id);
        state.record(GpuCall::BindTexture(id));
    }

    fn active_texture(&self, unit: u32) {
        let mut state = self.state.borrow_mut();
        state.gl.active_texture = unit;
        state.record(GpuCall::ActiveTexture(unit));
    }

    fn use_program(&self, id: ObjectId) {
        let mut state = self.state.borrow_mut();
        state.gl.program = id;
        state.record(GpuCall::UseProgram(id));
    }

    fn vertex_attrib(&self, index: u32, components: i32, data_type: u32, normalized: bool, stride: i32, offset: i32) {
        self.record(GpuCall::VertexAttrib {
            index,
            components,
            data_type,
            normalized,
            stride,
            offset,
        });
    }

    fn buffer_data(&self, target: u32, data: &[u8], _usage: u32) {
        self.record(GpuCall::BufferData(target, data.len()));
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
        self.record(GpuCall::UploadTexture(id, width, height));
        Ok(())
    }

    fn set_uniform_i32(&self, program: ObjectId, name: &str, _value: i32) {
        self.record(GpuCall::Uniform(program, name.to_string()));
    }

    fn set_uniform_f32(&self, program: ObjectId, name: &str, _value: f32) {
        self.record(GpuCall::Uniform(program, name.to_string()));
    }

    fn set_uniform_vec2(&self, program: ObjectId, name: &str, _value: [f32; 2]) {
        self.record(GpuCall::Uniform(program, name.to_string()));
    }

    fn set_uniform_vec3(&self, program: ObjectId, name: &str, _value: [f32; 3]) {
        self.record(GpuCall::Uniform(program, name.to_string()));
    }

    fn set_uniform_vec4(&self, program: ObjectId, name: &str, _value: [f32; 4]) {
        self.record(GpuCall::Uniform(program, name.to_string()));
    }

    fn set_uniform_mat4(&self, program: ObjectId, name: &str, value: &[f32; 16]) {
        let mut state = self.state.borrow_mut();
        state.last_matrix = Some(value.to_vec());
        state.record(GpuCall::Uniform(program, name.to_string()));
    }

    fn set_capability(&self, capability: Capabilities, enabled: bool) {
        let mut state = self.state.borrow_mut();
        state.gl.enabled.set(capability, enabled);
        state.record(GpuCall::SetCapability(capability, enabled));
    }

    fn blend_equation(&self, rgb: u32, alpha: u32) {
        let mut state = self.state.borrow_mut();
        state.gl.blend_equation_rgb = rgb;
        state.gl.blend_equation_alpha = alpha;
        state.record(GpuCall::BlendEquation(rgb, alpha));
    }

    fn blend_func_separate(&self, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32) {
        let mut state = self.state.borrow_mut();
        state.gl.blend_src_rgb = src_rgb;
        state.gl.blend_dst_rgb = dst_rgb;
        state.gl.blend_src_alpha = src_alpha;
        state.gl.blend_dst_alpha = dst_alpha;
        state.record(GpuCall::BlendFuncSeparate(src_rgb, dst_rgb, src_alpha, dst_alpha));
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        let mut state = self.state.borrow_mut();
        state.gl.viewport = [x, y, width, height];
        state.record(GpuCall::Viewport(x, y, width, height));
    }

    fn scissor(&self, x: i32, y: i32, width: i32, height: i32) {
        self.record(GpuCall::Scissor(x, y, width, height));
    }

    fn draw_elements(&self, count: i32, index_type: u32, offset: i32) {
        self.record(GpuCall::DrawElements(count, index_type, offset));
    }

    fn clear(&self, color: [f32; 4]) {
        self.record(GpuCall::Clear(color));
    }

    fn capture_state(&self) -> GlStateSnapshot {
        let state = self.state.borrow();
        GlStateSnapshot {
            texture: state.unit_textures.get(&TEXTURE0).copied().unwrap_or(0),
            ..state.gl
        }
    }

    fn poll_error(&self) -> Option<u32> {
        self.state.borrow_mut().errors.pop_front()
    }
}

#[derive(Debug, Default)]
struct OverlayState {
    owner: Option<i32>,
    font_texture: ObjectId,
    shared_released_by: Vec<i32>,
    fail_contexts: HashSet<i32>,
    draw_cursor: bool,
    created: Vec<i32>,
    released: Vec<i32>,
    frames: Vec<i32>,
    characters: Vec<char>,
    keys: Vec<(Key, bool)>,
    modifiers: Option<OverlayModifiers>,
    mouse_positions: Vec<(i32, [f32; 2])>,
    mouse_down: Vec<(i32, [bool; 3])>,
    wheel: Vec<(i32, [f32; 2])>,
    displays: Vec<(i32, [f32; 2], [f32; 2])>,
    context_fonts: Vec<(i32, ObjectId)>,
}

/// Recording [`OverlayBackend`]
#[derive(Clone, Default)]
pub struct MockOverlayBackend {
    state: Rc<RefCell<OverlayState>>,
}

impl MockOverlayBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_context(&self, window_id: i32) {
        self.state.borrow_mut().fail_contexts.insert(window_id);
    }

    pub fn set_draw_cursor(&self, draw: bool) {
        self.state.borrow_mut().draw_cursor = draw;
    }

    pub fn owner(&self) -> Option<i32> {
        self.state.borrow().owner
    }

    pub fn created(&self) -> Vec<i32> {
        self.state.borrow().created.clone()
    }

    pub fn released(&self) -> Vec<i32> {
        self.state.borrow().released.clone()
    }

    pub fn shared_released_by(&self) -> Vec<i32> {
        self.state.borrow().shared_released_by.clone()
    }

    pub fn frames(&self) -> Vec<i32> {
        self.state.borrow().frames.clone()
    }

    pub fn characters(&self) -> Vec<char> {
        self.state.borrow().characters.clone()
    }

    pub fn keys(&self) -> Vec<(Key, bool)> {
        self.state.borrow().keys.clone()
    }

    pub fn modifiers(&self) -> Option<OverlayModifiers> {
        self.state.borrow().modifiers
    }

    pub fn mouse_positions(&self, window_id: i32) -> Vec<[f32; 2]> {
        let state = self.state.borrow();
        state
            .mouse_positions
            .iter()
            .filter(|(id, _)| *id == window_id)
            .map(|(_, pos)| *pos)
            .collect()
    }

    pub fn mouse_down(&self, window_id: i32) -> Vec<[bool; 3]> {
        let state = self.state.borrow();
        state
            .mouse_down
            .iter()
            .filter(|(id, _)| *id == window_id)
            .map(|(_, down)| *down)
            .collect()
    }

    pub fn wheel(&self, window_id: i32) -> Vec<[f32; 2]> {
        let state = self.state.borrow();
        state
            .wheel
            .iter()
            .filter(|(id, _)| *id == window_id)
            .map(|(_, wheel)| *wheel)
            .collect()
    }

    pub fn last_display(&self, window_id: i32) -> Option<([f32; 2], [f32; 2])> {
        let state = self.state.borrow();
        state
            .displays
            .iter()
            .rev()
            .find(|(id, _, _)| *id == window_id)
            .map(|(_, size, scale)| (*size, *scale))
    }

    pub fn context_fonts(&self) -> Vec<(i32, ObjectId)> {
        self.state.borrow().context_fonts.clone()
    }
}

impl OverlayBackend for MockOverlayBackend {
    fn create_context(&mut self, window_id: i32) -> Result<Box<dyn OverlayContext>, OverlayError> {
        let mut state = self.state.borrow_mut();
        if state.fail_contexts.contains(&window_id) {
            return Err(OverlayError::ContextBusy(window_id));
        }
        let owner = *state.owner.get_or_insert(window_id);
        state.created.push(window_id);
        Ok(Box::new(MockOverlay {
            window_id,
            owner: owner == window_id,
            state: self.state.clone(),
            display_size: [0.0, 0.0],
            framebuffer_scale: [1.0, 1.0],
            font_texture: 0,
            released: false,
        }))
    }

    fn shared_assets(&self) -> Option<SharedOverlayAssets> {
        let state = self.state.borrow();
        state.owner.map(|owner| SharedOverlayAssets {
            owner,
            font_texture: state.font_texture,
        })
    }

    fn build_font_atlas(&mut self) -> Result<FontAtlasImage, OverlayError> {
        Ok(FontAtlasImage {
            width: 2,
            height: 2,
            pixels: vec![255; 16],
        })
    }

    fn set_font_texture(&mut self, texture: ObjectId) {
        self.state.borrow_mut().font_texture = texture;
    }

    fn release_shared_assets(&mut self, window_id: i32) {
        let mut state = self.state.borrow_mut();
        state.shared_released_by.push(window_id);
        state.owner = None;
        state.font_texture = 0;
    }
}

/// Recording [`OverlayContext`]; every frame yields one single-command draw list
pub struct MockOverlay {
    window_id: i32,
    owner: bool,
    state: Rc<RefCell<OverlayState>>,
    display_size: [f32; 2],
    framebuffer_scale: [f32; 2],
    font_texture: ObjectId,
    released: bool,
}

impl OverlayContext for MockOverlay {
    fn window_id(&self) -> i32 {
        self.window_id
    }

    fn owns_shared_assets(&self) -> bool {
        self.owner
    }

    fn set_display(&mut self, size: [f32; 2], framebuffer_scale: [f32; 2]) {
        self.display_size = size;
        self.framebuffer_scale = framebuffer_scale;
        self.state
            .borrow_mut()
            .displays
            .push((self.window_id, size, framebuffer_scale));
    }

    fn set_delta_time(&mut self, _delta_time: f32) {}

    fn add_input_character(&mut self, character: char) {
        self.state.borrow_mut().characters.push(character);
    }

    fn set_key(&mut self, key: Key, down: bool) {
        self.state.borrow_mut().keys.push((key, down));
    }

    fn set_modifiers(&mut self, modifiers: OverlayModifiers) {
        self.state.borrow_mut().modifiers = Some(modifiers);
    }

    fn set_mouse_pos(&mut self, pos: [f32; 2]) {
        self.state.borrow_mut().mouse_positions.push((self.window_id, pos));
    }

    fn set_mouse_down(&mut self, down: [bool; 3]) {
        self.state.borrow_mut().mouse_down.push((self.window_id, down));
    }

    fn set_mouse_wheel(&mut self, horizontal: f32, vertical: f32) {
        self.state
            .borrow_mut()
            .wheel
            .push((self.window_id, [horizontal, vertical]));
    }

    fn mouse_draw_cursor(&self) -> bool {
        self.state.borrow().draw_cursor
    }

    fn has_font_texture(&self) -> bool {
        self.font_texture != 0
    }

    fn set_font_texture(&mut self, texture: ObjectId) {
        self.font_texture = texture;
        self.state.borrow_mut().context_fonts.push((self.window_id, texture));
    }

    fn frame(&mut self, build: &mut dyn FnMut(Option<&imgui::Ui>)) -> Result<OverlayDrawData, OverlayError> {
        if self.released {
            return Err(OverlayError::Released(self.window_id));
        }
        build(None);
        self.state.borrow_mut().frames.push(self.window_id);

        let [width, height] = self.display_size;
        Ok(OverlayDrawData {
            display_size: self.display_size,
            framebuffer_scale: self.framebuffer_scale,
            lists: vec![OverlayDrawList {
                vertices: vec![OverlayVertex::default(); 3],
                indices: vec![0, 1, 2],
                commands: vec![OverlayDrawCommand {
                    texture: self.font_texture,
                    clip_rect: [0.0, 0.0, width, height],
                    element_count: 3,
                    index_offset: 0,
                }],
            }],
        })
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.state.borrow_mut().released.push(self.window_id);
        }
    }
}
