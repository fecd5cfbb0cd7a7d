//! Scripted in-memory platform for unit tests.
//!
//! Records every injected event, keeps a fake window list and a fake
//! keyboard state, and lets tests play the listener thread by pushing
//! notifications into the registry's [`TriggerSink`].

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

use crate::backend::{HotkeyBackend, InputBackend, KeyEvent, MouseEvent, Platform, WindowBackend};
use crate::errors::OsError;
use crate::hotkey::{HotkeyId, TriggerSink};
use crate::keys::{HotkeyChord, VirtualKey};
use crate::layout::{KeyboardLayout, UsLayout};
use crate::window::{Rect, WindowHandle};

struct FakeWindow {
    handle: WindowHandle,
    class: String,
    title: String,
    rect: Rect,
}

#[derive(Default)]
struct State {
    key_batches: Vec<Vec<KeyEvent>>,
    key_calls: usize,
    fail_key_call: Option<usize>,
    mouse_batches: Vec<Vec<MouseEvent>>,
    fail_mouse: bool,

    sink: Option<TriggerSink>,
    listening: bool,
    fail_listener_start: bool,
    listener_starts: usize,
    listener_stops: usize,
    bindings: HashMap<HotkeyId, HotkeyChord>,
    rejected: HashSet<HotkeyChord>,
    tracking: bool,
    held: HashSet<VirtualKey>,

    windows: Vec<FakeWindow>,
    next_handle: isize,
}

#[derive(Default)]
pub struct MockPlatform {
    state: Mutex<State>,
}

impl MockPlatform {
    // -- scripting -----------------------------------------------------------

    /// The `n`th keyboard call (0-based) fails and is not recorded.
    pub fn fail_key_batch(&self, n: usize) {
        self.state.lock().fail_key_call = Some(n);
    }

    pub fn fail_mouse(&self) {
        self.state.lock().fail_mouse = true;
    }

    pub fn fail_listener_start(&self) {
        self.state.lock().fail_listener_start = true;
    }

    /// The OS will refuse to bind `chord`.
    pub fn reject_chord(&self, chord: HotkeyChord) {
        self.state.lock().rejected.insert(chord);
    }

    /// Deliver `chord` as the OS would.  Only bound chords reach the sink.
    pub fn simulate_hotkey(&self, chord: &HotkeyChord) -> bool {
        let sink = {
            let state = self.state.lock();
            if !state.listening || !state.bindings.values().any(|c| c == chord) {
                return false;
            }
            state.sink.clone()
        };
        sink.is_some_and(|sink| sink.hotkey_pressed(chord.modifiers(), chord.key()))
    }

    pub fn hold_key(&self, key: VirtualKey) {
        let sink = {
            let mut state = self.state.lock();
            state.held.insert(key);
            state.sink.clone().filter(|_| state.tracking)
        };
        if let Some(sink) = sink {
            sink.key_pressed(key);
        }
    }

    pub fn release_key(&self, key: VirtualKey) {
        let sink = {
            let mut state = self.state.lock();
            state.held.remove(&key);
            state.sink.clone().filter(|_| state.tracking)
        };
        if let Some(sink) = sink {
            sink.key_released(key);
        }
    }

    pub fn add_window(&self, class: &str, title: &str, rect: Rect) -> WindowHandle {
        let mut state = self.state.lock();
        state.next_handle += 0x10;
        let handle = WindowHandle::from_raw(0x1000 + state.next_handle);
        state.windows.push(FakeWindow {
            handle,
            class: class.to_owned(),
            title: title.to_owned(),
            rect,
        });
        handle
    }

    pub fn close_window(&self, handle: WindowHandle) {
        self.state.lock().windows.retain(|w| w.handle != handle);
    }

    // -- inspection ----------------------------------------------------------

    pub fn key_batches(&self) -> Vec<Vec<KeyEvent>> {
        self.state.lock().key_batches.clone()
    }

    pub fn mouse_batches(&self) -> Vec<Vec<MouseEvent>> {
        self.state.lock().mouse_batches.clone()
    }

    pub fn listener_starts(&self) -> usize {
        self.state.lock().listener_starts
    }

    pub fn listener_stops(&self) -> usize {
        self.state.lock().listener_stops
    }

    pub fn is_tracking(&self) -> bool {
        self.state.lock().tracking
    }

    pub fn bound_chords(&self) -> Vec<HotkeyChord> {
        self.state.lock().bindings.values().copied().collect()
    }
}

impl InputBackend for MockPlatform {
    fn send_keys(&self, events: &[KeyEvent]) -> Result<(), OsError> {
        let mut state = self.state.lock();
        let call = state.key_calls;
        state.key_calls += 1;
        if state.fail_key_call == Some(call) {
            return Err(OsError::new("SendInput", "blocked by mock"));
        }
        state.key_batches.push(events.to_vec());
        Ok(())
    }

    fn send_mouse(&self, events: &[MouseEvent]) -> Result<(), OsError> {
        let mut state = self.state.lock();
        if state.fail_mouse {
            return Err(OsError::new("SendInput", "blocked by mock"));
        }
        state.mouse_batches.push(events.to_vec());
        Ok(())
    }
}

impl HotkeyBackend for MockPlatform {
    fn start_listener(&self, sink: TriggerSink) -> Result<(), OsError> {
        let mut state = self.state.lock();
        if state.fail_listener_start {
            return Err(OsError::new("listener", "refused by mock"));
        }
        state.sink = Some(sink);
        state.listening = true;
        state.listener_starts += 1;
        Ok(())
    }

    fn stop_listener(&self) {
        let mut state = self.state.lock();
        state.listening = false;
        state.tracking = false;
        state.bindings.clear();
        state.listener_stops += 1;
    }

    fn bind(&self, id: HotkeyId, chord: &HotkeyChord) -> Result<(), OsError> {
        let mut state = self.state.lock();
        if state.rejected.contains(chord) {
            return Err(OsError::new("RegisterHotKey", "hotkey already in use"));
        }
        state.bindings.insert(id, *chord);
        Ok(())
    }

    fn unbind(&self, id: HotkeyId) {
        self.state.lock().bindings.remove(&id);
    }

    fn track_keys(&self, enabled: bool) -> Result<(), OsError> {
        self.state.lock().tracking = enabled;
        Ok(())
    }

    fn is_key_down(&self, key: VirtualKey) -> bool {
        self.state.lock().held.contains(&key)
    }
}

impl WindowBackend for MockPlatform {
    fn find_window(&self, class: Option<&str>, title: Option<&str>) -> Option<WindowHandle> {
        self.state
            .lock()
            .windows
            .iter()
            .find(|w| {
                class.map_or(true, |c| w.class == c) && title.map_or(true, |t| w.title == t)
            })
            .map(|w| w.handle)
    }

    fn window_rect(&self, handle: WindowHandle) -> Option<Rect> {
        self.state
            .lock()
            .windows
            .iter()
            .find(|w| w.handle == handle)
            .map(|w| w.rect)
    }
}

impl Platform for MockPlatform {
    fn layout(&self) -> &dyn KeyboardLayout {
        &UsLayout
    }
}
