//! C ABI DLL for hotkeyz -- loadable by Deno FFI, ctypes, C#, or any FFI
//! consumer.
//!
//! All exported functions follow the convention:
//! - Return `i32`: `HKZ_OK=0` or a negative `HKZ_ERR_*` status code
//!   (see `hotkeyz_core::status`); id-returning calls return the id (> 0)
//! - Text arguments are NUL-terminated UTF-8
//! - Last error message retrievable via `hkz_last_error()`
//!
//! One process-wide engine is created on first use, configured from the
//! environment (`HOTKEYZ_TRIGGER_QUEUE_CAPACITY`).

use std::cell::RefCell;
use std::ffi::{c_char, c_int, CStr, CString};
use std::fmt::Display;
use std::ptr;
use std::sync::OnceLock;
use std::time::Duration;

use hotkeyz_core::errors::WindowError;
use hotkeyz_core::hotkey::HotkeyId;
use hotkeyz_core::input::{ButtonAction, MouseButton};
use hotkeyz_core::platform::System;
use hotkeyz_core::status::{
    StatusCode, HKZ_ERR_INVALID_ARGUMENT, HKZ_ERR_TIMEOUT, HKZ_OK,
};
use hotkeyz_core::window::{Rect, WindowHandle};
use hotkeyz_core::{Engine, EngineConfig};
use log::debug;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

static ENGINE: OnceLock<Engine<System>> = OnceLock::new();

fn engine() -> &'static Engine<System> {
    ENGINE.get_or_init(|| Engine::system(&EngineConfig::from_env()))
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn invalid_argument(msg: &str) -> i32 {
    set_last_error(msg);
    HKZ_ERR_INVALID_ARGUMENT
}

/// Map a result to a status code, recording the error message.
fn status<T, E: StatusCode + Display>(result: Result<T, E>) -> i32 {
    match result {
        Ok(_) => HKZ_OK,
        Err(e) => {
            set_last_error(&e.to_string());
            e.status_code()
        }
    }
}

/// Borrow a C string as `&str`.
///
/// # Safety
///
/// `ptr` must be null or a valid NUL-terminated string that outlives `'a`.
unsafe fn read_str<'a>(ptr: *const c_char, name: &str) -> Result<&'a str, i32> {
    if ptr.is_null() {
        return Err(invalid_argument(&format!("{name} is null")));
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|e| invalid_argument(&format!("{name} is not valid UTF-8: {e}")))
}

/// Like [`read_str`], with null meaning "no filter".
///
/// # Safety
///
/// Same as [`read_str`].
unsafe fn read_optional_str<'a>(ptr: *const c_char, name: &str) -> Result<Option<&'a str>, i32> {
    if ptr.is_null() {
        Ok(None)
    } else {
        unsafe { read_str(ptr, name) }.map(Some)
    }
}

fn id_to_c(id: HotkeyId) -> c_int {
    c_int::try_from(id.get()).unwrap_or(c_int::MAX)
}

/// Retrieve the last error message (thread-local).
///
/// Returns a pointer valid until the next failing call on this thread.
/// Returns null if no error has occurred.
#[no_mangle]
pub extern "C" fn hkz_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|s| s.as_ptr())
            .unwrap_or(ptr::null())
    })
}

// ---------------------------------------------------------------------------
// Keyboard
// ---------------------------------------------------------------------------

/// Type a key sequence such as `"Hello<enter>"` or `"<ctrl+a>"`.
///
/// # Safety
///
/// `keys` must be null or a valid NUL-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn kb_input(keys: *const c_char) -> c_int {
    match unsafe { read_str(keys, "keys") } {
        Ok(text) => status(engine().type_text(text)),
        Err(code) => code,
    }
}

/// Block until every key named in `keys` is released.
///
/// # Safety
///
/// `keys` must be null or a valid NUL-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn kb_wait_keys_up(keys: *const c_char) -> c_int {
    match unsafe { read_str(keys, "keys") } {
        Ok(text) => status(engine().wait_keys_up(text)),
        Err(code) => code,
    }
}

// ---------------------------------------------------------------------------
// Hotkeys
// ---------------------------------------------------------------------------

/// Register a global hotkey such as `"<ctrl+shift+f1>"`.
///
/// Returns the new hotkey id (> 0) or a negative status code.
///
/// # Safety
///
/// `keys` must be null or a valid NUL-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn hotkey_register(keys: *const c_char) -> c_int {
    let text = match unsafe { read_str(keys, "keys") } {
        Ok(text) => text,
        Err(code) => return code,
    };
    match engine().register_hotkey(text) {
        Ok(id) => id_to_c(id),
        Err(e) => status::<(), _>(Err(e)),
    }
}

/// Remove a hotkey.  Unknown ids are ignored.
#[no_mangle]
pub extern "C" fn hotkey_unregister(id: c_int) {
    match u32::try_from(id) {
        Ok(raw) if raw > 0 => engine().unregister_hotkey(HotkeyId::new(raw)),
        _ => debug!("hotkey_unregister({id}) ignored"),
    }
}

/// Block until any registered hotkey fires; returns its id.
#[no_mangle]
pub extern "C" fn hotkey_wait() -> c_int {
    id_to_c(engine().wait_hotkey())
}

/// Like `hotkey_wait`, returning `HKZ_ERR_TIMEOUT` after `timeout_ms`.
#[no_mangle]
pub extern "C" fn hotkey_wait_timeout(timeout_ms: u32) -> c_int {
    match engine().wait_hotkey_timeout(Duration::from_millis(u64::from(timeout_ms))) {
        Some(id) => id_to_c(id),
        None => {
            set_last_error("timed out waiting for a hotkey");
            HKZ_ERR_TIMEOUT
        }
    }
}

// ---------------------------------------------------------------------------
// Mouse
// ---------------------------------------------------------------------------

#[no_mangle]
pub extern "C" fn mouse_move_to(x: c_int, y: c_int) -> c_int {
    status(engine().input().move_to(x, y))
}

#[no_mangle]
pub extern "C" fn mouse_move_delta(dx: c_int, dy: c_int) -> c_int {
    status(engine().input().move_delta(dx, dy))
}

#[no_mangle]
pub extern "C" fn mouse_left_click() -> c_int {
    status(engine().input().click(MouseButton::Left))
}

#[no_mangle]
pub extern "C" fn mouse_left_down() -> c_int {
    status(engine().input().button_down(MouseButton::Left))
}

#[no_mangle]
pub extern "C" fn mouse_left_up() -> c_int {
    status(engine().input().button_up(MouseButton::Left))
}

#[no_mangle]
pub extern "C" fn mouse_right_click() -> c_int {
    status(engine().input().click(MouseButton::Right))
}

#[no_mangle]
pub extern "C" fn mouse_middle_click() -> c_int {
    status(engine().input().click(MouseButton::Middle))
}

/// Scroll vertically by `delta` (120 per notch, positive is away from the user).
#[no_mangle]
pub extern "C" fn mouse_wheel(delta: c_int) -> c_int {
    status(engine().input().wheel(delta))
}

#[no_mangle]
pub extern "C" fn mouse_hwheel(delta: c_int) -> c_int {
    status(engine().input().hwheel(delta))
}

/// `button`: 0 left, 1 right, 2 middle, 3 X1, 4 X2.
/// `action`: 1 down, 2 up, 3 click.
#[no_mangle]
pub extern "C" fn mouse_button_press(button: c_int, action: c_int) -> c_int {
    let Some(button) = MouseButton::from_code(button) else {
        return invalid_argument(&format!("unknown mouse button {button}"));
    };
    let Some(action) = ButtonAction::from_code(action) else {
        return invalid_argument(&format!("unknown button action {action}"));
    };
    status(engine().input().button_press(button, action))
}

// ---------------------------------------------------------------------------
// Windows
// ---------------------------------------------------------------------------

/// Find the first top-level window with exactly this class and/or title.
///
/// Either argument may be null to match any value.  Returns 0 when no
/// window matches or an argument is not valid UTF-8.
///
/// # Safety
///
/// Each argument must be null or a valid NUL-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn window_find(class: *const c_char, title: *const c_char) -> isize {
    let class = match unsafe { read_optional_str(class, "class") } {
        Ok(class) => class,
        Err(_) => return WindowHandle::NULL.raw(),
    };
    let title = match unsafe { read_optional_str(title, "title") } {
        Ok(title) => title,
        Err(_) => return WindowHandle::NULL.raw(),
    };
    match engine().windows().find_required(class, title) {
        Ok(handle) => handle.raw(),
        Err(e) => {
            set_last_error(&e.to_string());
            WindowHandle::NULL.raw()
        }
    }
}

/// Store `rect` in host out-slots, in `left, right, top, bottom` order.
///
/// # Safety
///
/// Each pointer must be valid for a write of `c_int`.
unsafe fn write_rect(
    rect: Rect,
    left: *mut c_int,
    right: *mut c_int,
    top: *mut c_int,
    bottom: *mut c_int,
) {
    unsafe {
        *left = rect.left;
        *right = rect.right;
        *top = rect.top;
        *bottom = rect.bottom;
    }
}

/// Write the screen rectangle of `handle` to the four out-pointers, in
/// `left, right, top, bottom` order.
///
/// Nothing is written on failure.
///
/// # Safety
///
/// Each out-pointer must be null or valid for a write of `c_int`.
#[no_mangle]
pub unsafe extern "C" fn window_get_rect(
    handle: isize,
    left: *mut c_int,
    right: *mut c_int,
    top: *mut c_int,
    bottom: *mut c_int,
) -> c_int {
    if left.is_null() || right.is_null() || top.is_null() || bottom.is_null() {
        return invalid_argument("rect out-pointer is null");
    }
    let rect = match engine().windows().get_rect(WindowHandle::from_raw(handle)) {
        Ok(rect) => rect,
        Err(e) => return status::<(), WindowError>(Err(e)),
    };
    unsafe { write_rect(rect, left, right, top, bottom) };
    HKZ_OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotkeyz_core::status::{
        HKZ_ERR_EMPTY, HKZ_ERR_INVALID_HANDLE, HKZ_ERR_MALFORMED_CHORD, HKZ_ERR_UNKNOWN_TOKEN,
    };

    fn last_error() -> String {
        let ptr = hkz_last_error();
        assert!(!ptr.is_null());
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }

    #[test]
    fn test_null_text_is_invalid_argument() {
        assert_eq!(unsafe { kb_input(ptr::null()) }, HKZ_ERR_INVALID_ARGUMENT);
        assert!(last_error().contains("null"));
        assert_eq!(unsafe { kb_wait_keys_up(ptr::null()) }, HKZ_ERR_INVALID_ARGUMENT);
        assert_eq!(unsafe { hotkey_register(ptr::null()) }, HKZ_ERR_INVALID_ARGUMENT);
    }

    #[test]
    fn test_invalid_utf8_is_invalid_argument() {
        let bytes = [0xFFu8, 0xFE, 0];
        let text = bytes.as_ptr() as *const c_char;
        assert_eq!(unsafe { kb_input(text) }, HKZ_ERR_INVALID_ARGUMENT);
        assert!(last_error().contains("UTF-8"));
    }

    #[test]
    fn test_parse_errors_map_to_codes() {
        assert_eq!(unsafe { kb_input(c"".as_ptr()) }, HKZ_ERR_EMPTY);
        assert_eq!(unsafe { kb_input(c"<bogus>".as_ptr()) }, HKZ_ERR_UNKNOWN_TOKEN);
        assert_eq!(unsafe { kb_input(c"ab<ctrl+".as_ptr()) }, HKZ_ERR_MALFORMED_CHORD);
        assert_eq!(unsafe { kb_wait_keys_up(c"".as_ptr()) }, HKZ_ERR_EMPTY);
        assert_eq!(
            unsafe { hotkey_register(c"<ctrl+>".as_ptr()) },
            HKZ_ERR_MALFORMED_CHORD
        );
        assert!(last_error().contains("malformed"));
    }

    #[test]
    fn test_bad_button_codes() {
        assert_eq!(mouse_button_press(7, 3), HKZ_ERR_INVALID_ARGUMENT);
        assert_eq!(mouse_button_press(0, 0), HKZ_ERR_INVALID_ARGUMENT);
        assert!(last_error().contains("action"));
    }

    #[test]
    fn test_window_rect_arguments() {
        let mut l = 0;
        let mut r = 0;
        let mut t = 0;
        let mut b = 0;
        assert_eq!(
            unsafe { window_get_rect(0, &mut l, &mut r, &mut t, &mut b) },
            HKZ_ERR_INVALID_HANDLE
        );
        assert_eq!(
            unsafe { window_get_rect(0, ptr::null_mut(), &mut r, &mut t, &mut b) },
            HKZ_ERR_INVALID_ARGUMENT
        );
        assert_eq!((l, r, t, b), (0, 0, 0, 0));
    }

    #[test]
    fn test_rect_slot_order() {
        let rect = Rect {
            left: 10,
            top: 20,
            right: 810,
            bottom: 620,
        };
        let (mut l, mut r, mut t, mut b) = (0, 0, 0, 0);
        unsafe { write_rect(rect, &mut l, &mut r, &mut t, &mut b) };
        assert_eq!((l, r, t, b), (10, 810, 20, 620));
    }

    #[test]
    fn test_unregister_unknown_id_is_ignored() {
        hotkey_unregister(0);
        hotkey_unregister(-4);
        hotkey_unregister(987_654);
    }

    #[test]
    fn test_wait_timeout_without_hotkeys() {
        assert_eq!(hotkey_wait_timeout(10), HKZ_ERR_TIMEOUT);
    }

    #[cfg(not(windows))]
    #[test]
    fn test_no_window_found_off_windows() {
        assert_eq!(unsafe { window_find(ptr::null(), ptr::null()) }, 0);
        assert_eq!(unsafe { window_find(c"Notepad".as_ptr(), ptr::null()) }, 0);
    }
}
