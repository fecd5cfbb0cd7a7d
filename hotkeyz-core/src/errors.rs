//! Error types for `hotkeyz_core`.
//!
//! Each subsystem reports through its own `thiserror` enum so callers can
//! match on the exact failure.  [`HotkeyzError`] wraps all of them for the
//! [`Engine`](crate::engine::Engine) facade, and every type maps onto a
//! stable integer via [`StatusCode`](crate::status::StatusCode).

use thiserror::Error;

use crate::hotkey::HotkeyId;
use crate::keys::HotkeyChord;
use crate::window::WindowHandle;

/// Failure reported by an OS primitive (or by a platform without one).
#[derive(Debug, Clone, Error)]
#[error("{context}: {message}")]
pub struct OsError {
    /// The OS call or subsystem that failed, e.g. `"SendInput"`.
    pub context: &'static str,
    pub message: String,
    /// Raw OS error code when one is available.
    pub code: Option<i32>,
}

impl OsError {
    pub fn new(context: &'static str, message: impl Into<String>) -> Self {
        Self {
            context,
            message: message.into(),
            code: None,
        }
    }

    /// Capture `GetLastError` / `errno` for `context`.
    pub fn last(context: &'static str) -> Self {
        let err = std::io::Error::last_os_error();
        Self {
            context,
            message: err.to_string(),
            code: err.raw_os_error(),
        }
    }

    /// Error for operations with no backend on the current target.
    pub fn unsupported(context: &'static str) -> Self {
        Self::new(context, "not supported on this platform")
    }
}

/// Convert a `windows::core::Error` (Win32 / HRESULT failure) into an
/// [`OsError`] tagged with the generic `Win32` context.
#[cfg(windows)]
impl From<windows::core::Error> for OsError {
    fn from(err: windows::core::Error) -> Self {
        Self {
            context: "Win32",
            message: err.message(),
            code: Some(err.code().0),
        }
    }
}

/// Malformed key or hotkey text.  Always raised before any OS side effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("key text is empty")]
    Empty,

    /// A modifier, key name or character with no key mapping.
    #[error("unknown key token `{0}`")]
    UnknownToken(String),

    /// Structural problem: missing `>`, empty part, no or several base keys.
    #[error("malformed chord: {0}")]
    MalformedChord(String),
}

/// Input synthesis failure.
#[derive(Debug, Clone, Error)]
pub enum InputError {
    /// Injection of the token (or mouse action) at `index` was refused.
    /// Tokens before `index` have already been delivered.
    #[error("input injection failed at index {index}: {source}")]
    InjectionFailed {
        index: usize,
        #[source]
        source: OsError,
    },

    /// The key-release watch used by `wait_keys_up` could not be started.
    #[error("key watch unavailable: {0}")]
    WatchUnavailable(#[source] OsError),
}

/// Global hotkey registration failure.
#[derive(Debug, Clone, Error)]
pub enum HotkeyError {
    #[error("hotkey {0} is already registered")]
    AlreadyRegistered(HotkeyChord),

    /// The OS refused the binding (reserved combination, taken by another
    /// process, no listener thread, ...).
    #[error("OS rejected hotkey: {0}")]
    OsRejected(#[source] OsError),

    /// Only produced by explicit lookups; `unregister` never reports it.
    #[error("unknown hotkey id {0}")]
    UnknownId(HotkeyId),
}

/// Window lookup failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    /// The handle is null or no longer refers to a live window.
    #[error("invalid window handle {0}")]
    InvalidHandle(WindowHandle),

    #[error("no window matches the given class/title")]
    NotFound,
}

/// Top-level error type for the engine facade.
///
/// Each variant corresponds to a distinct subsystem.
#[derive(Debug, Clone, Error)]
pub enum HotkeyzError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Hotkey(#[from] HotkeyError),

    #[error(transparent)]
    Window(#[from] WindowError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_injection_failed_message_carries_index_and_source() {
        let err = InputError::InjectionFailed {
            index: 3,
            source: OsError::new("SendInput", "blocked by UIPI"),
        };
        let text = err.to_string();
        assert!(text.contains("index 3"));
        assert!(text.contains("SendInput: blocked by UIPI"));
    }

    #[test]
    fn test_facade_is_transparent() {
        let err: HotkeyzError = ParseError::UnknownToken("hyper".into()).into();
        assert_eq!(err.to_string(), "unknown key token `hyper`");
    }

    #[test]
    fn test_unsupported_has_no_code() {
        let err = OsError::unsupported("RegisterHotKey");
        assert_eq!(err.code, None);
        assert_eq!(err.to_string(), "RegisterHotKey: not supported on this platform");
    }
}
