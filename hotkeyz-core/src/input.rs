//! Keyboard and mouse input synthesis.
//!
//! Every public operation here is one backend call per sequence step
//! (keyboard) or per action (mouse).  Nothing is shared between calls, so synthesizers may
//! be used from any number of threads; concurrent callers interleave at the
//! OS level.
//!
//! `wait_keys_up` needs the listener thread and lives on
//! [`HotkeyRegistry`](crate::hotkey::HotkeyRegistry).

use std::sync::Arc;

use log::debug;
use serde::Serialize;

use crate::backend::{InputBackend, KeyEvent, MouseEvent};
use crate::errors::InputError;
use crate::keys::{KeySequence, KeyStep, KeyToken};

/// Mouse button, with the integer codes used at the C boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MouseButton {
    Left = 0,
    Right = 1,
    Middle = 2,
    X1 = 3,
    X2 = 4,
}

impl MouseButton {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Left),
            1 => Some(Self::Right),
            2 => Some(Self::Middle),
            3 => Some(Self::X1),
            4 => Some(Self::X2),
            _ => None,
        }
    }
}

/// What to do with a button, with the integer codes used at the C boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ButtonAction {
    Down = 1,
    Up = 2,
    Click = 3,
}

impl ButtonAction {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::Down),
            2 => Some(Self::Up),
            3 => Some(Self::Click),
            _ => None,
        }
    }
}

/// Press all modifiers, tap the base key, release modifiers in reverse.
fn token_events(token: &KeyToken) -> Vec<KeyEvent> {
    let mut events = Vec::with_capacity(2 + 2 * 4);
    events.extend(token.modifiers.iter().map(|m| KeyEvent::down(m.key())));
    events.push(KeyEvent::down(token.key));
    events.push(KeyEvent::up(token.key));
    events.extend(token.modifiers.iter().rev().map(|m| KeyEvent::up(m.key())));
    events
}

fn step_events(step: &KeyStep) -> Vec<KeyEvent> {
    match step {
        KeyStep::Tap(token) => token_events(token),
        KeyStep::Press(key) => vec![KeyEvent::down(*key)],
        KeyStep::Release(key) => vec![KeyEvent::up(*key)],
    }
}

pub struct Synthesizer<B: InputBackend + ?Sized> {
    backend: Arc<B>,
}

impl<B: InputBackend + ?Sized> Synthesizer<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Type `seq` step by step.
    ///
    /// Stops at the first refused step and reports its index; the steps
    /// before it have already reached the OS and are not undone.  Keys held
    /// by a `Press` step are not released on failure either.
    pub fn type_sequence(&self, seq: &KeySequence) -> Result<(), InputError> {
        for (index, step) in seq.iter().enumerate() {
            self.backend
                .send_keys(&step_events(step))
                .map_err(|source| InputError::InjectionFailed { index, source })?;
        }
        debug!("typed {} key steps", seq.len());
        Ok(())
    }

    /// Move the cursor to absolute screen coordinates.  Coordinates are not
    /// clamped here; the OS pins points off the desktop to its edge.
    pub fn move_to(&self, x: i32, y: i32) -> Result<(), InputError> {
        self.send_mouse(&[MouseEvent::MoveTo { x, y }])
    }

    /// Move the cursor relative to wherever it is when the event lands.
    pub fn move_delta(&self, dx: i32, dy: i32) -> Result<(), InputError> {
        self.send_mouse(&[MouseEvent::MoveBy { dx, dy }])
    }

    pub fn click(&self, button: MouseButton) -> Result<(), InputError> {
        self.button_press(button, ButtonAction::Click)
    }

    pub fn button_down(&self, button: MouseButton) -> Result<(), InputError> {
        self.button_press(button, ButtonAction::Down)
    }

    pub fn button_up(&self, button: MouseButton) -> Result<(), InputError> {
        self.button_press(button, ButtonAction::Up)
    }

    /// Vertical wheel; positive scrolls away from the user.
    pub fn wheel(&self, delta: i32) -> Result<(), InputError> {
        self.send_mouse(&[MouseEvent::Wheel(delta)])
    }

    /// Horizontal wheel; positive scrolls right.
    pub fn hwheel(&self, delta: i32) -> Result<(), InputError> {
        self.send_mouse(&[MouseEvent::HWheel(delta)])
    }

    /// General button primitive; the click/down/up helpers wrap it.
    pub fn button_press(&self, button: MouseButton, action: ButtonAction) -> Result<(), InputError> {
        match action {
            ButtonAction::Down => self.send_mouse(&[MouseEvent::Down(button)]),
            ButtonAction::Up => self.send_mouse(&[MouseEvent::Up(button)]),
            ButtonAction::Click => {
                self.send_mouse(&[MouseEvent::Down(button), MouseEvent::Up(button)])
            }
        }
    }

    fn send_mouse(&self, events: &[MouseEvent]) -> Result<(), InputError> {
        self.backend
            .send_mouse(events)
            .map_err(|source| InputError::InjectionFailed { index: 0, source })
    }
}
