//! Dear ImGui overlay backend (`imgui` crate)
//!
//! imgui-rs allows a single active context per thread. Every window's context
//! is therefore kept suspended and only activated for the duration of its own
//! frame. Input arriving between frames is queued and replayed into the IO
//! model right before `new_frame`.

use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;

use imgui::{DrawCmd, FontSource, SharedFontAtlas, SuspendedContext, TextureId};

use super::{
    FontAtlasImage, OverlayBackend, OverlayContext, OverlayDrawCommand, OverlayDrawData, OverlayDrawList, OverlayError,
    OverlayModifiers, OverlayVertex, SharedOverlayAssets,
};
use crate::gpu::ObjectId;
use crate::platform::Key;

/// Delta time used when the window clock has not advanced yet
const FALLBACK_DELTA_TIME: f32 = 1.0 / 60.0;

#[derive(Clone)]
struct SharedAtlas {
    fonts: Rc<RefCell<SharedFontAtlas>>,
    built: Rc<Cell<bool>>,
}

impl SharedAtlas {
    fn new() -> Self {
        let mut fonts = SharedFontAtlas::create();
        fonts.add_font(&[FontSource::DefaultFontData { config: None }]);
        Self {
            fonts: Rc::new(RefCell::new(fonts)),
            built: Rc::new(Cell::new(false)),
        }
    }
}

/// Process-wide ImGui state: the shared font atlas and its owner
#[derive(Default)]
pub struct ImguiBackend {
    atlas: Option<SharedAtlas>,
    assets: Option<SharedOverlayAssets>,
}

impl ImguiBackend {
    /// Create a backend with no contexts
    pub fn new() -> Self {
        Self::default()
    }
}

impl OverlayBackend for ImguiBackend {
    fn create_context(&mut self, window_id: i32) -> Result<Box<dyn OverlayContext>, OverlayError> {
        if self.atlas.is_none() {
            log::info!("Window {} owns the shared overlay font atlas", window_id);
            self.atlas = Some(SharedAtlas::new());
            self.assets = Some(SharedOverlayAssets {
                owner: window_id,
                font_texture: 0,
            });
        }
        let atlas = self.atlas.clone().ok_or(OverlayError::FontAtlasNotBuilt)?;
        let owner = self.assets.is_some_and(|assets| assets.owner == window_id);

        let suspended = SuspendedContext::create_with_shared_font_atlas(Rc::clone(&atlas.fonts));
        let suspended = match suspended.activate() {
            Ok(mut context) => {
                context.set_ini_filename(None::<PathBuf>);
                context.suspend()
            }
            Err(suspended) => suspended,
        };

        let font_texture = self.assets.map_or(0, |assets| assets.font_texture);
        log::debug!("Created overlay context for window {}", window_id);

        Ok(Box::new(ImguiOverlay {
            window_id,
            owner,
            context: Some(suspended),
            atlas,
            pending: Vec::new(),
            display_size: [0.0, 0.0],
            framebuffer_scale: [1.0, 1.0],
            delta_time: 0.0,
            mouse_down: [false; 3],
            modifiers: OverlayModifiers::default(),
            mouse_draw_cursor: false,
            font_texture,
        }))
    }

    fn shared_assets(&self) -> Option<SharedOverlayAssets> {
        self.assets
    }

    fn build_font_atlas(&mut self) -> Result<FontAtlasImage, OverlayError> {
        let atlas = self.atlas.get_or_insert_with(SharedAtlas::new);
        let mut fonts = atlas.fonts.try_borrow_mut().map_err(|_| OverlayError::FontAtlasNotBuilt)?;
        let texture = fonts.build_rgba32_texture();
        let image = FontAtlasImage {
            width: texture.width,
            height: texture.height,
            pixels: texture.data.to_vec(),
        };
        atlas.built.set(true);

        log::info!("Built overlay font atlas {}x{}", image.width, image.height);
        Ok(image)
    }

    fn set_font_texture(&mut self, texture: ObjectId) {
        if let Some(atlas) = &self.atlas {
            atlas.fonts.borrow_mut().tex_id = TextureId::new(texture as usize);
        }
        if let Some(assets) = self.assets.as_mut() {
            assets.font_texture = texture;
        }
    }

    fn release_shared_assets(&mut self, window_id: i32) {
        match self.assets {
            Some(assets) if assets.owner == window_id => {
                // Live contexts keep their own reference to the atlas
                self.atlas = None;
                self.assets = None;
                log::info!("Released shared overlay assets owned by window {}", window_id);
            }
            _ => log::warn!("Window {} tried to release overlay assets it does not own", window_id),
        }
    }
}

enum PendingInput {
    Character(char),
    Key(imgui::Key, bool),
    MousePos([f32; 2]),
    MouseButton(imgui::MouseButton, bool),
    Wheel([f32; 2]),
}

/// One window's ImGui context
pub struct ImguiOverlay {
    window_id: i32,
    owner: bool,
    context: Option<SuspendedContext>,
    atlas: SharedAtlas,
    pending: Vec<PendingInput>,
    display_size: [f32; 2],
    framebuffer_scale: [f32; 2],
    delta_time: f32,
    mouse_down: [bool; 3],
    modifiers: OverlayModifiers,
    mouse_draw_cursor: bool,
    font_texture: ObjectId,
}

const MOUSE_BUTTONS: [imgui::MouseButton; 3] = [
    imgui::MouseButton::Left,
    imgui::MouseButton::Right,
    imgui::MouseButton::Middle,
];

impl OverlayContext for ImguiOverlay {
    fn window_id(&self) -> i32 {
        self.window_id
    }

    fn owns_shared_assets(&self) -> bool {
        self.owner
    }

    fn set_display(&mut self, size: [f32; 2], framebuffer_scale: [f32; 2]) {
        self.display_size = size;
        self.framebuffer_scale = framebuffer_scale;
    }

    fn set_delta_time(&mut self, delta_time: f32) {
        self.delta_time = delta_time;
    }

    fn add_input_character(&mut self, character: char) {
        self.pending.push(PendingInput::Character(character));
    }

    fn set_key(&mut self, key: Key, down: bool) {
        if let Some(key) = map_key(key) {
            self.pending.push(PendingInput::Key(key, down));
        }
    }

    fn set_modifiers(&mut self, modifiers: OverlayModifiers) {
        let changes = [
            (imgui::Key::ModCtrl, self.modifiers.ctrl, modifiers.ctrl),
            (imgui::Key::ModShift, self.modifiers.shift, modifiers.shift),
            (imgui::Key::ModAlt, self.modifiers.alt, modifiers.alt),
            (imgui::Key::ModSuper, self.modifiers.super_key, modifiers.super_key),
        ];
        for (key, before, after) in changes {
            if before != after {
                self.pending.push(PendingInput::Key(key, after));
            }
        }
        self.modifiers = modifiers;
    }

    fn set_mouse_pos(&mut self, pos: [f32; 2]) {
        self.pending.push(PendingInput::MousePos(pos));
    }

    fn set_mouse_down(&mut self, down: [bool; 3]) {
        for (index, button) in MOUSE_BUTTONS.iter().enumerate() {
            if self.mouse_down[index] != down[index] {
                self.pending.push(PendingInput::MouseButton(*button, down[index]));
            }
        }
        self.mouse_down = down;
    }

    fn set_mouse_wheel(&mut self, horizontal: f32, vertical: f32) {
        if horizontal != 0.0 || vertical != 0.0 {
            self.pending.push(PendingInput::Wheel([horizontal, vertical]));
        }
    }

    fn mouse_draw_cursor(&self) -> bool {
        self.mouse_draw_cursor
    }

    fn has_font_texture(&self) -> bool {
        self.font_texture != 0
    }

    fn set_font_texture(&mut self, texture: ObjectId) {
        self.font_texture = texture;
        if let Ok(mut fonts) = self.atlas.fonts.try_borrow_mut() {
            fonts.tex_id = TextureId::new(texture as usize);
        }
    }

    fn frame(&mut self, build: &mut dyn FnMut(Option<&imgui::Ui>)) -> Result<OverlayDrawData, OverlayError> {
        if !self.atlas.built.get() {
            return Err(OverlayError::FontAtlasNotBuilt);
        }

        let suspended = self.context.take().ok_or(OverlayError::Released(self.window_id))?;
        let mut context = match suspended.activate() {
            Ok(context) => context,
            Err(suspended) => {
                self.context = Some(suspended);
                return Err(OverlayError::ContextBusy(self.window_id));
            }
        };

        let io = context.io_mut();
        io.display_size = self.display_size;
        io.display_framebuffer_scale = self.framebuffer_scale;
        io.delta_time = if self.delta_time > 0.0 {
            self.delta_time
        } else {
            FALLBACK_DELTA_TIME
        };
        for input in self.pending.drain(..) {
            match input {
                PendingInput::Character(character) => io.add_input_character(character),
                PendingInput::Key(key, down) => io.add_key_event(key, down),
                PendingInput::MousePos(pos) => io.add_mouse_pos_event(pos),
                PendingInput::MouseButton(button, down) => io.add_mouse_button_event(button, down),
                PendingInput::Wheel(wheel) => io.add_mouse_wheel_event(wheel),
            }
        }

        let ui = context.new_frame();
        build(Some(&*ui));
        let draw_data = convert_draw_data(context.render());
        self.mouse_draw_cursor = context.io().mouse_draw_cursor;

        self.context = Some(context.suspend());
        Ok(draw_data)
    }

    fn release(&mut self) {
        if self.context.take().is_some() {
            log::debug!("Released overlay context for window {}", self.window_id);
        }
        self.pending.clear();
    }
}

fn convert_draw_data(draw_data: &imgui::DrawData) -> OverlayDrawData {
    let origin = draw_data.display_pos;
    let lists = draw_data
        .draw_lists()
        .map(|list| OverlayDrawList {
            vertices: list
                .vtx_buffer()
                .iter()
                .map(|vertex| OverlayVertex {
                    pos: vertex.pos,
                    uv: vertex.uv,
                    col: vertex.col,
                })
                .collect(),
            indices: list.idx_buffer().to_vec(),
            commands: list
                .commands()
                .filter_map(|command| match command {
                    DrawCmd::Elements { count, cmd_params } => Some(OverlayDrawCommand {
                        texture: cmd_params.texture_id.id() as ObjectId,
                        clip_rect: [
                            cmd_params.clip_rect[0] - origin[0],
                            cmd_params.clip_rect[1] - origin[1],
                            cmd_params.clip_rect[2] - origin[0],
                            cmd_params.clip_rect[3] - origin[1],
                        ],
                        element_count: count,
                        index_offset: cmd_params.idx_offset,
                    }),
                    DrawCmd::ResetRenderState | DrawCmd::RawCallback { .. } => None,
                })
                .collect(),
        })
        .collect();

    OverlayDrawData {
        display_size: draw_data.display_size,
        framebuffer_scale: draw_data.framebuffer_scale,
        lists,
    }
}

fn map_key(key: Key) -> Option<imgui::Key> {
    use imgui::Key as K;

    let mapped = match key {
        Key::Tab => K::Tab,
        Key::Left => K::LeftArrow,
        Key::Right => K::RightArrow,
        Key::Up => K::UpArrow,
        Key::Down => K::DownArrow,
        Key::PageUp => K::PageUp,
        Key::PageDown => K::PageDown,
        Key::Home => K::Home,
        Key::End => K::End,
        Key::Insert => K::Insert,
        Key::Delete => K::Delete,
        Key::Backspace => K::Backspace,
        Key::Space => K::Space,
        Key::Enter => K::Enter,
        Key::KpEnter => K::KeypadEnter,
        Key::Escape => K::Escape,
        Key::LeftControl => K::LeftCtrl,
        Key::RightControl => K::RightCtrl,
        Key::LeftShift => K::LeftShift,
        Key::RightShift => K::RightShift,
        Key::LeftAlt => K::LeftAlt,
        Key::RightAlt => K::RightAlt,
        Key::LeftSuper => K::LeftSuper,
        Key::RightSuper => K::RightSuper,
        Key::A => K::A,
        Key::C => K::C,
        Key::V => K::V,
        Key::X => K::X,
        Key::Y => K::Y,
        Key::Z => K::Z,
        _ => return None,
    };
    Some(mapped)
}
