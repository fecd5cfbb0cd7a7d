use log::warn;

use crate::backend::{HotkeyBackend, InputBackend, KeyEvent, MouseEvent, Platform, WindowBackend};
use crate::errors::OsError;
use crate::hotkey::{HotkeyId, TriggerSink};
use crate::keys::{HotkeyChord, VirtualKey};
use crate::layout::{KeyboardLayout, UsLayout};
use crate::window::{Rect, WindowHandle};

/// Backend for targets without input injection or global hotkeys.
///
/// Parsing works (with the US layout); every OS operation fails, no key is
/// ever down, and no window is ever found.
#[derive(Debug, Default)]
pub struct UnsupportedPlatform {
    layout: UsLayout,
}

impl UnsupportedPlatform {
    pub fn new() -> Self {
        warn!("hotkeyz has no OS backend for this target; input and hotkeys will fail");
        Self::default()
    }
}

impl InputBackend for UnsupportedPlatform {
    fn send_keys(&self, _events: &[KeyEvent]) -> Result<(), OsError> {
        Err(OsError::unsupported("SendInput"))
    }

    fn send_mouse(&self, _events: &[MouseEvent]) -> Result<(), OsError> {
        Err(OsError::unsupported("SendInput"))
    }
}

impl HotkeyBackend for UnsupportedPlatform {
    fn start_listener(&self, _sink: TriggerSink) -> Result<(), OsError> {
        Err(OsError::unsupported("hotkey listener"))
    }

    fn stop_listener(&self) {}

    fn bind(&self, _id: HotkeyId, _chord: &HotkeyChord) -> Result<(), OsError> {
        Err(OsError::unsupported("RegisterHotKey"))
    }

    fn unbind(&self, _id: HotkeyId) {}

    fn track_keys(&self, _enabled: bool) -> Result<(), OsError> {
        Err(OsError::unsupported("keyboard hook"))
    }

    fn is_key_down(&self, _key: VirtualKey) -> bool {
        false
    }
}

impl WindowBackend for UnsupportedPlatform {
    fn find_window(&self, _class: Option<&str>, _title: Option<&str>) -> Option<WindowHandle> {
        None
    }

    fn window_rect(&self, _handle: WindowHandle) -> Option<Rect> {
        None
    }
}

impl Platform for UnsupportedPlatform {
    fn layout(&self) -> &dyn KeyboardLayout {
        &self.layout
    }
}
