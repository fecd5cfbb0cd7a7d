//! Win32 backend: `SendInput`, `RegisterHotKey`, a low-level keyboard hook
//! and top-level window enumeration.
//!
//! # Listener thread
//!
//! Hotkeys registered with a null `HWND` post `WM_HOTKEY` to the thread that
//! registered them, and a `WH_KEYBOARD_LL` hook runs on the thread that
//! installed it.  Both therefore live on one dedicated thread
//! (`hotkeyz-listener`) that pumps messages.  Other threads talk to it over a
//! `crossbeam-channel` command queue, waking it with a posted `WM_APP`
//! message after each send.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::OsString;
use std::os::windows::ffi::OsStringExt;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use log::{debug, warn};
use parking_lot::Mutex;
use windows::core::PCWSTR;
use windows::Win32::Foundation::{BOOL, FALSE, HINSTANCE, HWND, LPARAM, LRESULT, RECT, TRUE, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    GetAsyncKeyState, RegisterHotKey, SendInput, UnregisterHotKey, VkKeyScanW, HOT_KEY_MODIFIERS,
    INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT, KEYBD_EVENT_FLAGS,
    KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, MOD_NOREPEAT, MOUSEEVENTF_ABSOLUTE, MOUSEEVENTF_HWHEEL,
    MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MIDDLEDOWN, MOUSEEVENTF_MIDDLEUP,
    MOUSEEVENTF_MOVE, MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP, MOUSEEVENTF_VIRTUALDESK,
    MOUSEEVENTF_WHEEL, MOUSEEVENTF_XDOWN, MOUSEEVENTF_XUP, MOUSEINPUT, MOUSE_EVENT_FLAGS,
    VIRTUAL_KEY,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, EnumWindows, GetClassNameW, GetMessageW, GetSystemMetrics,
    GetWindowRect, GetWindowTextLengthW, GetWindowTextW, IsWindow, PeekMessageW,
    PostThreadMessageW, SetWindowsHookExW, TranslateMessage, UnhookWindowsHookEx, HHOOK,
    KBDLLHOOKSTRUCT, MSG, PM_NOREMOVE, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN,
    SM_XVIRTUALSCREEN, SM_YVIRTUALSCREEN, WH_KEYBOARD_LL, WM_APP, WM_HOTKEY, WM_KEYDOWN,
    WM_KEYUP, WM_SYSKEYDOWN, WM_SYSKEYUP, WM_USER,
};

use crate::backend::{HotkeyBackend, InputBackend, KeyEvent, MouseEvent, Platform, WindowBackend};
use crate::errors::OsError;
use crate::hotkey::{HotkeyId, TriggerSink};
use crate::input::MouseButton;
use crate::keys::{HotkeyChord, KeyToken, Modifier, Modifiers, VirtualKey};
use crate::layout::{KeyboardLayout, UsLayout};
use crate::window::{Rect, WindowHandle};

/// Pre-computed size of `INPUT` struct for `SendInput` calls.
const INPUT_SIZE: i32 = std::mem::size_of::<INPUT>() as i32;

/// Posted to the listener after every command send.
const WM_WAKE: u32 = WM_APP + 1;

/// Highest id an application may pass to `RegisterHotKey`.
const MAX_OS_HOTKEY_ID: i32 = 0xBFFF;

const XBUTTON1: i32 = 0x0001;
const XBUTTON2: i32 = 0x0002;

/// Keys that need `KEYEVENTF_EXTENDEDKEY` to avoid landing on the numpad.
const EXTENDED_KEYS: &[u8] = &[
    0x21, 0x22, 0x23, 0x24, // page up/down, end, home
    0x25, 0x26, 0x27, 0x28, // arrows
    0x2C, 0x2D, 0x2E, // print screen, insert, delete
    0x5B, 0x5C, 0x5D, // windows keys, apps
    0x6F, 0x90, // numpad divide, num lock
    0xA3, 0xA5, // right ctrl, right alt
];

// ---------------------------------------------------------------------------
// Helpers: build INPUT structs
// ---------------------------------------------------------------------------

fn virtual_key_input(vk: u8, key_up: bool) -> INPUT {
    let mut flags = if key_up {
        KEYEVENTF_KEYUP
    } else {
        KEYBD_EVENT_FLAGS(0)
    };
    if EXTENDED_KEYS.contains(&vk) {
        flags = flags | KEYEVENTF_EXTENDEDKEY;
    }

    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(vk as u16),
                wScan: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

fn mouse_input(dx: i32, dy: i32, flags: MOUSE_EVENT_FLAGS) -> INPUT {
    mouse_input_with_data(dx, dy, 0, flags)
}

fn mouse_input_with_data(dx: i32, dy: i32, data: i32, flags: MOUSE_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx,
                dy,
                // Win32 treats mouseData as signed for WHEEL/HWHEEL events.
                mouseData: data as u32,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

/// Flags for absolute mouse positioning on the virtual desktop.
const ABSOLUTE_MOVE: MOUSE_EVENT_FLAGS =
    MOUSE_EVENT_FLAGS(MOUSEEVENTF_ABSOLUTE.0 | MOUSEEVENTF_MOVE.0 | MOUSEEVENTF_VIRTUALDESK.0);

/// Virtual screen origin and size, covering all monitors.
fn screen_geometry() -> (i32, i32, i32, i32) {
    unsafe {
        let x = GetSystemMetrics(SM_XVIRTUALSCREEN);
        let y = GetSystemMetrics(SM_YVIRTUALSCREEN);
        let w = GetSystemMetrics(SM_CXVIRTUALSCREEN);
        let h = GetSystemMetrics(SM_CYVIRTUALSCREEN);
        (x, y, w, h)
    }
}

/// Convert pixel coordinates to the 0..65535 normalised space of the
/// virtual desktop.  Points off the desktop map outside that range and are
/// left for the OS to pin to the nearest edge.
fn normalise_coords(x: i32, y: i32) -> (i32, i32) {
    let (origin_x, origin_y, screen_w, screen_h) = screen_geometry();

    if screen_w <= 1 || screen_h <= 1 {
        return (0, 0);
    }

    let scale = |pixel: i32, origin: i32, size: i32| {
        let norm = ((pixel as i64 - origin as i64) * 65535) / (size as i64 - 1);
        norm.clamp(i32::MIN as i64, i32::MAX as i64) as i32
    };
    (scale(x, origin_x, screen_w), scale(y, origin_y, screen_h))
}

fn button_input(button: MouseButton, up: bool) -> INPUT {
    let (flags, data) = match (button, up) {
        (MouseButton::Left, false) => (MOUSEEVENTF_LEFTDOWN, 0),
        (MouseButton::Left, true) => (MOUSEEVENTF_LEFTUP, 0),
        (MouseButton::Right, false) => (MOUSEEVENTF_RIGHTDOWN, 0),
        (MouseButton::Right, true) => (MOUSEEVENTF_RIGHTUP, 0),
        (MouseButton::Middle, false) => (MOUSEEVENTF_MIDDLEDOWN, 0),
        (MouseButton::Middle, true) => (MOUSEEVENTF_MIDDLEUP, 0),
        (MouseButton::X1, false) => (MOUSEEVENTF_XDOWN, XBUTTON1),
        (MouseButton::X1, true) => (MOUSEEVENTF_XUP, XBUTTON1),
        (MouseButton::X2, false) => (MOUSEEVENTF_XDOWN, XBUTTON2),
        (MouseButton::X2, true) => (MOUSEEVENTF_XUP, XBUTTON2),
    };
    mouse_input_with_data(0, 0, data, flags)
}

fn mouse_event_input(event: &MouseEvent) -> INPUT {
    match *event {
        MouseEvent::MoveTo { x, y } => {
            let (abs_x, abs_y) = normalise_coords(x, y);
            mouse_input(abs_x, abs_y, ABSOLUTE_MOVE)
        }
        MouseEvent::MoveBy { dx, dy } => mouse_input(dx, dy, MOUSEEVENTF_MOVE),
        MouseEvent::Down(button) => button_input(button, false),
        MouseEvent::Up(button) => button_input(button, true),
        MouseEvent::Wheel(delta) => mouse_input_with_data(0, 0, delta, MOUSEEVENTF_WHEEL),
        MouseEvent::HWheel(delta) => mouse_input_with_data(0, 0, delta, MOUSEEVENTF_HWHEEL),
    }
}

/// Inject `inputs` atomically; anything short of all of them is a failure.
fn send_inputs(inputs: &[INPUT]) -> Result<(), OsError> {
    let sent = unsafe { SendInput(inputs, INPUT_SIZE) };
    if sent as usize == inputs.len() {
        Ok(())
    } else {
        Err(OsError::last("SendInput"))
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Layout of the calling thread's active input locale, via `VkKeyScanW`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Win32Layout;

impl KeyboardLayout for Win32Layout {
    fn token_for_char(&self, ch: char) -> Option<KeyToken> {
        // VkKeyScanW maps '\n' to ctrl+enter.
        if matches!(ch, '\n' | '\r' | '\t') {
            return UsLayout.token_for_char(ch);
        }
        let unit = u16::try_from(u32::from(ch)).ok()?;
        let scan = unsafe { VkKeyScanW(unit) };
        if scan == -1 {
            return None;
        }

        let vk = (scan & 0xFF) as u8;
        let state = ((scan >> 8) & 0xFF) as u8;
        let mut modifiers = Modifiers::NONE;
        // Shift state bits: 1 shift, 2 ctrl, 4 alt (ctrl+alt is AltGr).
        for (bit, modifier) in [(1, Modifier::Shift), (2, Modifier::Ctrl), (4, Modifier::Alt)] {
            if state & bit != 0 {
                modifiers.insert(modifier);
            }
        }
        Some(KeyToken::with_modifiers(VirtualKey(vk), modifiers))
    }
}

// ---------------------------------------------------------------------------
// Listener thread
// ---------------------------------------------------------------------------

enum Command {
    Bind {
        id: HotkeyId,
        chord: HotkeyChord,
        reply: Sender<Result<(), OsError>>,
    },
    Unbind(HotkeyId),
    Track {
        enabled: bool,
        reply: Sender<Result<(), OsError>>,
    },
    Stop,
}

struct Listener {
    thread_id: u32,
    commands: Sender<Command>,
    handle: JoinHandle<()>,
}

impl Listener {
    fn send(&self, command: Command) -> Result<(), OsError> {
        self.commands
            .send(command)
            .map_err(|_| OsError::new("hotkey listener", "listener thread has exited"))?;
        unsafe { PostThreadMessageW(self.thread_id, WM_WAKE, WPARAM(0), LPARAM(0)) }?;
        Ok(())
    }

    /// Send a command carrying a reply channel and wait for the answer.
    fn request(
        &self,
        command: impl FnOnce(Sender<Result<(), OsError>>) -> Command,
    ) -> Result<(), OsError> {
        let (reply, answer) = bounded(1);
        self.send(command(reply))?;
        answer
            .recv()
            .map_err(|_| OsError::new("hotkey listener", "listener thread has exited"))?
    }
}

/// Listener-thread state visible to the keyboard hook procedure.
struct HookState {
    sink: TriggerSink,
    hook: Option<HHOOK>,
}

thread_local! {
    static HOOK: RefCell<Option<HookState>> = const { RefCell::new(None) };
}

unsafe extern "system" fn keyboard_hook(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code >= 0 {
        let info = unsafe { &*(lparam.0 as *const KBDLLHOOKSTRUCT) };
        let key = VirtualKey(info.vkCode as u8);
        HOOK.with(|state| {
            if let Some(state) = state.borrow().as_ref() {
                match wparam.0 as u32 {
                    WM_KEYDOWN | WM_SYSKEYDOWN => state.sink.key_pressed(key),
                    WM_KEYUP | WM_SYSKEYUP => state.sink.key_released(key),
                    _ => {}
                }
            }
        });
    }
    unsafe { CallNextHookEx(HHOOK::default(), code, wparam, lparam) }
}

fn install_hook() -> Result<HHOOK, OsError> {
    let module = unsafe { GetModuleHandleW(PCWSTR::null()) }?;
    let hook = unsafe {
        SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook), HINSTANCE(module.0), 0)
    }?;
    Ok(hook)
}

fn set_tracking(enabled: bool) -> Result<(), OsError> {
    HOOK.with(|state| {
        let mut state = state.borrow_mut();
        let Some(state) = state.as_mut() else {
            return Err(OsError::new("keyboard hook", "listener not initialised"));
        };
        match (enabled, state.hook) {
            (true, None) => {
                state.hook = Some(install_hook()?);
                debug!("keyboard hook installed");
            }
            (false, Some(hook)) => {
                state.hook = None;
                if let Err(err) = unsafe { UnhookWindowsHookEx(hook) } {
                    warn!("UnhookWindowsHookEx failed: {err}");
                }
                debug!("keyboard hook removed");
            }
            _ => {}
        }
        Ok(())
    })
}

/// `RegisterHotKey` ids in use on the listener thread.
///
/// Registry ids grow without bound, while the OS only accepts
/// `1..=0xBFFF`; slots of unbound hotkeys are handed out again.
#[derive(Default)]
struct HotkeySlots {
    bound: HashMap<HotkeyId, i32>,
    free: Vec<i32>,
    last: i32,
}

impl HotkeySlots {
    /// Reserve an OS id for `id`.  `None` once every slot is taken.
    fn acquire(&mut self, id: HotkeyId) -> Option<i32> {
        let slot = match self.free.pop() {
            Some(slot) => slot,
            None if self.last < MAX_OS_HOTKEY_ID => {
                self.last += 1;
                self.last
            }
            None => return None,
        };
        self.bound.insert(id, slot);
        Some(slot)
    }

    fn release(&mut self, id: HotkeyId) -> Option<i32> {
        let slot = self.bound.remove(&id)?;
        self.free.push(slot);
        Some(slot)
    }

    fn drain(&mut self) -> impl Iterator<Item = (HotkeyId, i32)> + '_ {
        self.free.clear();
        self.last = 0;
        self.bound.drain()
    }
}

fn bind_hotkey(slot: i32, chord: &HotkeyChord) -> Result<(), OsError> {
    let modifiers = HOT_KEY_MODIFIERS(chord.modifiers().bits() | MOD_NOREPEAT.0);
    unsafe {
        RegisterHotKey(
            HWND::default(),
            slot,
            modifiers,
            u32::from(chord.key().code()),
        )
    }?;
    Ok(())
}

fn unbind_hotkey(id: HotkeyId, slot: i32) {
    if let Err(err) = unsafe { UnregisterHotKey(HWND::default(), slot) } {
        warn!("UnregisterHotKey({id} in slot {slot}) failed: {err}");
    }
}

/// Apply every queued command.  Returns `false` on `Stop`.
fn drain_commands(commands: &Receiver<Command>, slots: &mut HotkeySlots) -> bool {
    while let Ok(command) = commands.try_recv() {
        match command {
            Command::Bind { id, chord, reply } => {
                let result = match slots.acquire(id) {
                    Some(slot) => bind_hotkey(slot, &chord),
                    None => Err(OsError::new("RegisterHotKey", "no free hotkey id")),
                };
                if result.is_err() {
                    slots.release(id);
                }
                let _ = reply.send(result);
            }
            Command::Unbind(id) => {
                if let Some(slot) = slots.release(id) {
                    unbind_hotkey(id, slot);
                }
            }
            Command::Track { enabled, reply } => {
                let _ = reply.send(set_tracking(enabled));
            }
            Command::Stop => return false,
        }
    }
    true
}

fn run_listener(sink: TriggerSink, commands: Receiver<Command>, ready: Sender<u32>) {
    let mut msg = MSG::default();
    // Create this thread's message queue before anyone posts to it.
    unsafe {
        let _ = PeekMessageW(&mut msg, HWND::default(), WM_USER, WM_USER, PM_NOREMOVE);
    }
    HOOK.with(|state| {
        *state.borrow_mut() = Some(HookState {
            sink: sink.clone(),
            hook: None,
        })
    });
    if ready.send(unsafe { GetCurrentThreadId() }).is_err() {
        return;
    }

    let mut slots = HotkeySlots::default();
    loop {
        let status = unsafe { GetMessageW(&mut msg, HWND::default(), 0, 0) };
        if status.0 <= 0 {
            if status.0 < 0 {
                warn!("GetMessageW failed: {}", OsError::last("GetMessageW"));
            }
            break;
        }
        match msg.message {
            WM_HOTKEY => {
                let lparam = msg.lParam.0 as u32;
                let modifiers = Modifiers::from_bits(lparam & 0xFFFF);
                let key = VirtualKey(((lparam >> 16) & 0xFF) as u8);
                sink.hotkey_pressed(modifiers, key);
            }
            WM_WAKE => {
                if !drain_commands(&commands, &mut slots) {
                    break;
                }
            }
            _ => unsafe {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            },
        }
    }

    for (id, slot) in slots.drain() {
        unbind_hotkey(id, slot);
    }
    if let Err(err) = set_tracking(false) {
        warn!("failed to remove keyboard hook: {err}");
    }
    HOOK.with(|state| state.borrow_mut().take());
    debug!("hotkey listener thread exiting");
}

// ---------------------------------------------------------------------------
// Windows
// ---------------------------------------------------------------------------

/// Read the window title.
fn read_window_title(hwnd: HWND) -> String {
    let len = unsafe { GetWindowTextLengthW(hwnd) };
    if len <= 0 {
        return String::new();
    }
    let mut buf = vec![0u16; (len + 1) as usize];
    let copied = unsafe { GetWindowTextW(hwnd, &mut buf) };
    if copied <= 0 {
        return String::new();
    }
    OsString::from_wide(&buf[..copied as usize])
        .to_string_lossy()
        .into_owned()
}

/// Read the window class name (class names are at most 256 chars).
fn read_class_name(hwnd: HWND) -> String {
    let mut buf = [0u16; 256];
    let len = unsafe { GetClassNameW(hwnd, &mut buf) };
    if len <= 0 {
        return String::new();
    }
    OsString::from_wide(&buf[..len as usize])
        .to_string_lossy()
        .into_owned()
}

struct WindowQuery<'a> {
    class: Option<&'a str>,
    title: Option<&'a str>,
    found: Option<HWND>,
}

/// Callback for EnumWindows that stops at the first matching window.
unsafe extern "system" fn find_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let query = unsafe { &mut *(lparam.0 as *mut WindowQuery<'_>) };

    let class_ok = query.class.map_or(true, |c| read_class_name(hwnd) == c);
    if class_ok && query.title.map_or(true, |t| read_window_title(hwnd) == t) {
        query.found = Some(hwnd);
        return FALSE;
    }

    TRUE
}

fn to_handle(hwnd: HWND) -> WindowHandle {
    WindowHandle::from_raw(hwnd.0 as isize)
}

fn to_hwnd(handle: WindowHandle) -> HWND {
    HWND(handle.raw() as *mut core::ffi::c_void)
}

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct Win32Platform {
    listener: Mutex<Option<Listener>>,
    layout: Win32Layout,
}

impl Win32Platform {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_listener<T>(&self, f: impl FnOnce(&Listener) -> Result<T, OsError>) -> Result<T, OsError> {
        match self.listener.lock().as_ref() {
            Some(listener) => f(listener),
            None => Err(OsError::new("hotkey listener", "listener is not running")),
        }
    }
}

impl InputBackend for Win32Platform {
    fn send_keys(&self, events: &[KeyEvent]) -> Result<(), OsError> {
        let inputs: Vec<INPUT> = events
            .iter()
            .map(|e| virtual_key_input(e.key.code(), e.up))
            .collect();
        send_inputs(&inputs)
    }

    fn send_mouse(&self, events: &[MouseEvent]) -> Result<(), OsError> {
        let inputs: Vec<INPUT> = events.iter().map(mouse_event_input).collect();
        send_inputs(&inputs)
    }
}

impl HotkeyBackend for Win32Platform {
    fn start_listener(&self, sink: TriggerSink) -> Result<(), OsError> {
        let mut slot = self.listener.lock();
        if slot.is_some() {
            return Ok(());
        }

        let (commands, inbox) = unbounded();
        let (ready, ready_rx) = bounded(1);
        let handle = thread::Builder::new()
            .name("hotkeyz-listener".into())
            .spawn(move || run_listener(sink, inbox, ready))
            .map_err(|e| OsError::new("hotkey listener", e.to_string()))?;
        let thread_id = ready_rx
            .recv()
            .map_err(|_| OsError::new("hotkey listener", "listener thread failed to start"))?;

        *slot = Some(Listener {
            thread_id,
            commands,
            handle,
        });
        Ok(())
    }

    fn stop_listener(&self) {
        let Some(listener) = self.listener.lock().take() else {
            return;
        };
        if let Err(err) = listener.send(Command::Stop) {
            warn!("failed to stop hotkey listener: {err}");
        }
        if listener.handle.join().is_err() {
            warn!("hotkey listener thread panicked");
        }
    }

    fn bind(&self, id: HotkeyId, chord: &HotkeyChord) -> Result<(), OsError> {
        let chord = *chord;
        self.with_listener(|l| l.request(|reply| Command::Bind { id, chord, reply }))
    }

    fn unbind(&self, id: HotkeyId) {
        if let Err(err) = self.with_listener(|l| l.send(Command::Unbind(id))) {
            debug!("unbind of hotkey {id} skipped: {err}");
        }
    }

    fn track_keys(&self, enabled: bool) -> Result<(), OsError> {
        self.with_listener(|l| l.request(|reply| Command::Track { enabled, reply }))
    }

    fn is_key_down(&self, key: VirtualKey) -> bool {
        unsafe { GetAsyncKeyState(i32::from(key.code())) } < 0
    }
}

impl WindowBackend for Win32Platform {
    fn find_window(&self, class: Option<&str>, title: Option<&str>) -> Option<WindowHandle> {
        let mut query = WindowQuery {
            class,
            title,
            found: None,
        };
        // EnumWindows reports an error when the callback stops it early.
        let result = unsafe {
            EnumWindows(
                Some(find_callback),
                LPARAM(&mut query as *mut WindowQuery<'_> as isize),
            )
        };
        if let (Err(err), None) = (&result, query.found) {
            debug!("EnumWindows failed: {err}");
        }
        query.found.map(to_handle)
    }

    fn window_rect(&self, handle: WindowHandle) -> Option<Rect> {
        let hwnd = to_hwnd(handle);
        if !unsafe { IsWindow(hwnd) }.as_bool() {
            return None;
        }
        let mut rect = RECT::default();
        unsafe { GetWindowRect(hwnd, &mut rect) }.ok()?;
        Some(Rect {
            left: rect.left,
            top: rect.top,
            right: rect.right,
            bottom: rect.bottom,
        })
    }
}

impl Platform for Win32Platform {
    fn layout(&self) -> &dyn KeyboardLayout {
        &self.layout
    }
}

impl Drop for Win32Platform {
    fn drop(&mut self) {
        self.stop_listener();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extended_flag_on_navigation_keys() {
        let input = virtual_key_input(0x25, true);
        let flags = unsafe { input.Anonymous.ki.dwFlags };
        assert_eq!(flags, KEYEVENTF_KEYUP | KEYEVENTF_EXTENDEDKEY);

        let input = virtual_key_input(b'A', false);
        assert_eq!(unsafe { input.Anonymous.ki.dwFlags }, KEYBD_EVENT_FLAGS(0));
    }

    #[test]
    fn test_wheel_data_keeps_sign() {
        let input = mouse_event_input(&MouseEvent::Wheel(-120));
        assert_eq!(unsafe { input.Anonymous.mi.mouseData } as i32, -120);
    }

    #[test]
    fn test_xbutton_data() {
        let input = button_input(MouseButton::X2, false);
        let mi = unsafe { input.Anonymous.mi };
        assert_eq!(mi.dwFlags, MOUSEEVENTF_XDOWN);
        assert_eq!(mi.mouseData, 2);
    }

    #[test]
    fn test_hotkey_slots_are_reused() {
        let mut slots = HotkeySlots::default();
        assert_eq!(slots.acquire(HotkeyId::new(1)), Some(1));
        assert_eq!(slots.acquire(HotkeyId::new(2)), Some(2));
        assert_eq!(slots.release(HotkeyId::new(1)), Some(1));
        assert_eq!(slots.release(HotkeyId::new(1)), None);
        assert_eq!(slots.acquire(HotkeyId::new(3)), Some(1));
    }

    #[test]
    fn test_hotkey_slots_stay_in_os_range() {
        let mut slots = HotkeySlots::default();
        for raw in 1..=100_000u32 {
            let id = HotkeyId::new(raw);
            let slot = slots.acquire(id).unwrap();
            assert!((1..=MAX_OS_HOTKEY_ID).contains(&slot));
            slots.release(id);
        }

        let mut slots = HotkeySlots::default();
        for raw in 1..=MAX_OS_HOTKEY_ID as u32 {
            assert!(slots.acquire(HotkeyId::new(raw)).is_some());
        }
        assert_eq!(slots.acquire(HotkeyId::new(u32::MAX)), None);
    }

    #[test]
    fn test_null_handle_has_no_rect() {
        assert_eq!(Win32Platform::new().window_rect(WindowHandle::NULL), None);
    }
}
