//! Seams between the engine and the OS.
//!
//! Each component talks to exactly one of these traits.  The
//! [`platform`](crate::platform) module implements all of them for the
//! current target; tests substitute a scripted mock.

use crate::errors::OsError;
use crate::hotkey::{HotkeyId, TriggerSink};
use crate::input::MouseButton;
use crate::keys::{HotkeyChord, VirtualKey};
use crate::layout::KeyboardLayout;
use crate::window::{Rect, WindowHandle};

/// One key transition handed to the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: VirtualKey,
    pub up: bool,
}

impl KeyEvent {
    pub const fn down(key: VirtualKey) -> Self {
        Self { key, up: false }
    }

    pub const fn up(key: VirtualKey) -> Self {
        Self { key, up: true }
    }
}

/// One mouse event handed to the OS.  Coordinates are screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEvent {
    MoveTo { x: i32, y: i32 },
    MoveBy { dx: i32, dy: i32 },
    Down(MouseButton),
    Up(MouseButton),
    /// Vertical wheel, in `WHEEL_DELTA` units (120 = one notch).
    Wheel(i32),
    HWheel(i32),
}

pub trait InputBackend: Send + Sync {
    /// Inject `events` in order, as one atomic batch.
    fn send_keys(&self, events: &[KeyEvent]) -> Result<(), OsError>;

    /// Inject `events` in order, as one atomic batch.
    fn send_mouse(&self, events: &[MouseEvent]) -> Result<(), OsError>;
}

/// Process-wide global-hotkey listener.
///
/// The registry serializes every call on this trait; implementations do not
/// need their own ordering guarantees between them.
pub trait HotkeyBackend: Send + Sync {
    /// Start the listener thread.  All notifications go to `sink`.
    fn start_listener(&self, sink: TriggerSink) -> Result<(), OsError>;

    /// Stop the listener thread and release every OS binding it holds.
    fn stop_listener(&self);

    /// Ask the OS to report `chord` system-wide.
    fn bind(&self, id: HotkeyId, chord: &HotkeyChord) -> Result<(), OsError>;

    fn unbind(&self, id: HotkeyId);

    /// Enable or disable per-key press/release reporting to the sink.
    fn track_keys(&self, enabled: bool) -> Result<(), OsError>;

    /// Instantaneous physical state of exactly `key`.  Only side-specific
    /// modifier keys are asked about, never `SHIFT` or `CONTROL`.
    fn is_key_down(&self, key: VirtualKey) -> bool;
}

pub trait WindowBackend: Send + Sync {
    /// First top-level window, in OS enumeration order, whose class name and
    /// title equal the given filters (absent filters match anything).
    fn find_window(&self, class: Option<&str>, title: Option<&str>) -> Option<WindowHandle>;

    /// `None` when `handle` does not refer to a live window.
    fn window_rect(&self, handle: WindowHandle) -> Option<Rect>;
}

/// Everything the [`Engine`](crate::engine::Engine) needs from one OS.
pub trait Platform: InputBackend + HotkeyBackend + WindowBackend + 'static {
    /// Layout used to turn typed characters into keys.
    fn layout(&self) -> &dyn KeyboardLayout;
}
