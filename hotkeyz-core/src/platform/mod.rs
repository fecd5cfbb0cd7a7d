//! OS backends.
//!
//! [`System`] is the [`Platform`](crate::backend::Platform) for the current
//! target: the Win32 implementation on Windows, and elsewhere a backend
//! whose every OS operation fails with "not supported" so the rest of the
//! crate still builds and runs its tests.

#[cfg(windows)]
mod win32;
#[cfg(windows)]
pub use win32::{Win32Layout, Win32Platform as System};

#[cfg(not(windows))]
mod unsupported;
#[cfg(not(windows))]
pub use unsupported::UnsupportedPlatform as System;
