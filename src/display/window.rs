//! SDL2 window that shows a surface scaled up and turns SDL events into
//! surface-local input events.

use sdl2::event::Event;
use sdl2::keyboard::{KeyboardUtil, Keycode, Mod};
use sdl2::mouse::{MouseButton as SdlButton, MouseState};
use sdl2::pixels::{Color as SdlColor, PixelFormatEnum};
use sdl2::rect::Rect;
use sdl2::render::{Canvas, Texture, TextureCreator};
use sdl2::video::{Window, WindowContext};
use sdl2::EventPump;

use super::Surface;
use crate::input::{ButtonState, InputEvent, Key, Modifiers, MouseButton, WheelDirection};

pub struct Display {
    canvas: Canvas<Window>,
    event_pump: EventPump,
    keyboard: KeyboardUtil,
    scale: u32,
}

/// Streaming texture sized for one surface
pub struct RenderTarget<'a> {
    texture: Texture<'a>,
    width: u32,
    height: u32,
}

/// What the window reports each frame
#[derive(Debug, Clone)]
pub enum WindowEvent {
    Quit,
    /// An editor event; `keycode` is set for key presses so the viewer can
    /// handle its own shortcuts
    Input {
        event: InputEvent,
        keycode: Option<Keycode>,
    },
}

impl Display {
    /// Open a window of `width * scale` by `height * scale` with VSync
    pub fn new(
        title: &str,
        width: u32,
        height: u32,
        scale: u32,
    ) -> Result<(Self, TextureCreator<WindowContext>), String> {
        let scale = scale.max(1);
        let sdl_context = sdl2::init()?;
        let video_subsystem = sdl_context.video()?;

        let window = video_subsystem
            .window(title, width * scale, height * scale)
            .position_centered()
            .resizable()
            .build()
            .map_err(|e| e.to_string())?;

        let canvas = window
            .into_canvas()
            .accelerated()
            .present_vsync()
            .build()
            .map_err(|e| e.to_string())?;

        let texture_creator = canvas.texture_creator();
        let event_pump = sdl_context.event_pump()?;
        let keyboard = sdl_context.keyboard();

        Ok((
            Self {
                canvas,
                event_pump,
                keyboard,
                scale,
            },
            texture_creator,
        ))
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Upload `surface` and draw it at the top-left corner, scaled
    pub fn present(&mut self, target: &mut RenderTarget, surface: &Surface) -> Result<(), String> {
        let rgba = surface.to_rgba8888();
        target
            .texture
            .update(None, rgba.as_bytes(), rgba.pitch())
            .map_err(|e| e.to_string())?;

        self.canvas.set_draw_color(SdlColor::RGB(32, 32, 32));
        self.canvas.clear();
        let dst = Rect::new(0, 0, target.width * self.scale, target.height * self.scale);
        self.canvas.copy(&target.texture, None, Some(dst))?;
        self.canvas.present();
        Ok(())
    }

    pub fn poll_events(&mut self) -> Vec<WindowEvent> {
        let scale = self.scale as i32;
        let mouse_mods = modifiers(self.keyboard.mod_state());
        let mut events = Vec::new();

        for event in self.event_pump.poll_iter() {
            let input = match event {
                Event::Quit { .. } => {
                    events.push(WindowEvent::Quit);
                    continue;
                },
                Event::KeyDown {
                    keycode: Some(k),
                    keymod,
                    ..
                } => {
                    events.push(WindowEvent::Input {
                        event: InputEvent::KeyDown {
                            key: map_key(k),
                            mods: modifiers(keymod),
                        },
                        keycode: Some(k),
                    });
                    continue;
                },
                Event::KeyUp {
                    keycode: Some(k),
                    keymod,
                    ..
                } => InputEvent::KeyUp {
                    key: map_key(k),
                    mods: modifiers(keymod),
                },
                Event::MouseMotion {
                    mousestate,
                    x,
                    y,
                    xrel,
                    yrel,
                    ..
                } => InputEvent::MouseMotion {
                    x: x / scale,
                    y: y / scale,
                    xrel: xrel / scale,
                    yrel: yrel / scale,
                    buttons: button_state(mousestate),
                },
                Event::MouseButtonDown {
                    x, y, mouse_btn, ..
                } => match map_mouse_button(mouse_btn) {
                    Some(button) => InputEvent::MouseDown {
                        x: x / scale,
                        y: y / scale,
                        button,
                        mods: mouse_mods,
                    },
                    None => continue,
                },
                Event::MouseButtonUp {
                    x, y, mouse_btn, ..
                } => match map_mouse_button(mouse_btn) {
                    Some(button) => InputEvent::MouseUp {
                        x: x / scale,
                        y: y / scale,
                        button,
                    },
                    None => continue,
                },
                Event::MouseWheel { y, .. } if y != 0 => InputEvent::MouseWheel {
                    direction: if y > 0 {
                        WheelDirection::Up
                    } else {
                        WheelDirection::Down
                    },
                    mods: mouse_mods,
                },
                _ => continue,
            };
            events.push(WindowEvent::Input {
                event: input,
                keycode: None,
            });
        }

        events
    }
}

impl<'a> RenderTarget<'a> {
    pub fn with_size(
        texture_creator: &'a TextureCreator<WindowContext>,
        width: u32,
        height: u32,
    ) -> Result<Self, String> {
        let texture = texture_creator
            .create_texture_streaming(PixelFormatEnum::RGBA8888, width.max(1), height.max(1))
            .map_err(|e| e.to_string())?;
        Ok(Self {
            texture,
            width,
            height,
        })
    }

    /// Whether this target can take `surface` without being recreated
    pub fn fits(&self, surface: &Surface) -> bool {
        self.width == surface.width() && self.height == surface.height()
    }
}

fn modifiers(m: Mod) -> Modifiers {
    Modifiers {
        ctrl: m.intersects(Mod::LCTRLMOD | Mod::RCTRLMOD),
        shift: m.intersects(Mod::LSHIFTMOD | Mod::RSHIFTMOD),
        alt: m.intersects(Mod::LALTMOD | Mod::RALTMOD),
    }
}

fn button_state(state: MouseState) -> ButtonState {
    ButtonState {
        left: state.left(),
        right: state.right(),
        middle: state.middle(),
    }
}

fn map_key(k: Keycode) -> Key {
    match k {
        Keycode::Escape => Key::Escape,
        Keycode::Delete | Keycode::Backspace => Key::Delete,
        Keycode::Z => Key::Z,
        Keycode::R => Key::R,
        _ => Key::Other,
    }
}

fn map_mouse_button(btn: SdlButton) -> Option<MouseButton> {
    match btn {
        SdlButton::Left => Some(MouseButton::Left),
        SdlButton::Right => Some(MouseButton::Right),
        SdlButton::Middle => Some(MouseButton::Middle),
        _ => None,
    }
}
