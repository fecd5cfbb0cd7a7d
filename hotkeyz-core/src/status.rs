//! Stable integer status codes for the C boundary.
//!
//! Zero is success, every failure is negative.  Positive values are left to
//! operations that return an id or handle in the same slot.

use crate::errors::{HotkeyError, HotkeyzError, InputError, ParseError, WindowError};

pub const HKZ_OK: i32 = 0;
/// Null pointer, invalid UTF-8 or an out-of-range enum code.
pub const HKZ_ERR_INVALID_ARGUMENT: i32 = -1;
pub const HKZ_ERR_EMPTY: i32 = -2;
pub const HKZ_ERR_UNKNOWN_TOKEN: i32 = -3;
pub const HKZ_ERR_MALFORMED_CHORD: i32 = -4;
pub const HKZ_ERR_INPUT_FAILED: i32 = -5;
pub const HKZ_ERR_ALREADY_REGISTERED: i32 = -6;
pub const HKZ_ERR_OS_REJECTED: i32 = -7;
pub const HKZ_ERR_UNKNOWN_ID: i32 = -8;
pub const HKZ_ERR_INVALID_HANDLE: i32 = -9;
pub const HKZ_ERR_NOT_FOUND: i32 = -10;
pub const HKZ_ERR_TIMEOUT: i32 = -11;

/// Mapping from an error value to its status code.
pub trait StatusCode {
    fn status_code(&self) -> i32;
}

impl StatusCode for ParseError {
    fn status_code(&self) -> i32 {
        match self {
            ParseError::Empty => HKZ_ERR_EMPTY,
            ParseError::UnknownToken(_) => HKZ_ERR_UNKNOWN_TOKEN,
            ParseError::MalformedChord(_) => HKZ_ERR_MALFORMED_CHORD,
        }
    }
}

impl StatusCode for InputError {
    fn status_code(&self) -> i32 {
        HKZ_ERR_INPUT_FAILED
    }
}

impl StatusCode for HotkeyError {
    fn status_code(&self) -> i32 {
        match self {
            HotkeyError::AlreadyRegistered(_) => HKZ_ERR_ALREADY_REGISTERED,
            HotkeyError::OsRejected(_) => HKZ_ERR_OS_REJECTED,
            HotkeyError::UnknownId(_) => HKZ_ERR_UNKNOWN_ID,
        }
    }
}

impl StatusCode for WindowError {
    fn status_code(&self) -> i32 {
        match self {
            WindowError::InvalidHandle(_) => HKZ_ERR_INVALID_HANDLE,
            WindowError::NotFound => HKZ_ERR_NOT_FOUND,
        }
    }
}

impl StatusCode for HotkeyzError {
    fn status_code(&self) -> i32 {
        match self {
            HotkeyzError::Parse(e) => e.status_code(),
            HotkeyzError::Input(e) => e.status_code(),
            HotkeyzError::Hotkey(e) => e.status_code(),
            HotkeyzError::Window(e) => e.status_code(),
        }
    }
}

impl<T, E: StatusCode> StatusCode for Result<T, E> {
    fn status_code(&self) -> i32 {
        match self {
            Ok(_) => HKZ_OK,
            Err(e) => e.status_code(),
        }
    }
}
