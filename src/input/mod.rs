//! Toolkit-independent input events.
//!
//! Coordinates are tile-local pixels; whoever owns the window translates
//! and unscales them before handing events to an editor.

use crate::color::Hsva;
use crate::config::ColorSteps;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelDirection {
    Up,
    Down,
}

impl WheelDirection {
    #[inline]
    pub fn sign(self) -> f32 {
        match self {
            WheelDirection::Up => 1.0,
            WheelDirection::Down => -1.0,
        }
    }
}

/// Modifier keys held while an event happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        shift: false,
        alt: false,
    };
    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        shift: false,
        alt: false,
    };
    pub const SHIFT: Modifiers = Modifiers {
        ctrl: false,
        shift: true,
        alt: false,
    };
    pub const ALT: Modifiers = Modifiers {
        ctrl: false,
        shift: false,
        alt: true,
    };
}

/// Buttons held during a motion event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonState {
    pub left: bool,
    pub right: bool,
    pub middle: bool,
}

impl ButtonState {
    pub const LEFT: ButtonState = ButtonState {
        left: true,
        right: false,
        middle: false,
    };
}

/// Keys the editors react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Delete,
    Z,
    R,
    /// Anything the editors don't interpret
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    MouseDown {
        x: i32,
        y: i32,
        button: MouseButton,
        mods: Modifiers,
    },
    MouseUp {
        x: i32,
        y: i32,
        button: MouseButton,
    },
    MouseMotion {
        x: i32,
        y: i32,
        xrel: i32,
        yrel: i32,
        buttons: ButtonState,
    },
    MouseWheel {
        direction: WheelDirection,
        mods: Modifiers,
    },
    KeyDown {
        key: Key,
        mods: Modifiers,
    },
    KeyUp {
        key: Key,
        mods: Modifiers,
    },
}

/// Adjust a brush color from a modified wheel notch.
///
/// Ctrl+Shift steps alpha, Ctrl steps hue (wrapping), Shift steps
/// saturation and Alt steps value. Returns false for an unmodified wheel,
/// which the caller should leave to whoever scrolls the view.
pub fn apply_wheel(hsva: &mut Hsva, direction: WheelDirection, mods: Modifiers, steps: &ColorSteps) -> bool {
    let sign = direction.sign();
    match (mods.ctrl, mods.shift, mods.alt) {
        (true, true, _) => hsva.shift_alpha(sign * steps.alpha),
        (true, false, _) => hsva.shift_hue(sign * steps.hue),
        (false, true, _) => hsva.shift_saturation(sign * steps.saturation),
        (false, false, true) => hsva.shift_value(sign * steps.value),
        (false, false, false) => return false,
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wheel_modifiers() {
        let steps = ColorSteps::default();
        let mut c = Hsva::new(359.0, 0.5, 0.5, 1.0);

        assert!(apply_wheel(&mut c, WheelDirection::Up, Modifiers::CTRL, &steps));
        assert!((c.h - 2.0).abs() < 1e-4);

        assert!(apply_wheel(&mut c, WheelDirection::Down, Modifiers::SHIFT, &steps));
        assert!((c.s - 0.45).abs() < 1e-4);

        assert!(apply_wheel(&mut c, WheelDirection::Up, Modifiers::ALT, &steps));
        assert!((c.v - 0.55).abs() < 1e-4);

        let both = Modifiers {
            ctrl: true,
            shift: true,
            alt: false,
        };
        assert!(apply_wheel(&mut c, WheelDirection::Up, both, &steps));
        assert_eq!(c.a, 1.0);
        assert!(apply_wheel(&mut c, WheelDirection::Down, both, &steps));
        assert!((c.a - 0.9).abs() < 1e-4);

        let before = c;
        assert!(!apply_wheel(&mut c, WheelDirection::Up, Modifiers::NONE, &steps));
        assert_eq!(c, before);
    }
}
