//! Top-level window lookup.
//!
//! Handles are plain integers and carry no ownership; a window may close at
//! any moment, so every query re-validates the handle through the backend.

use std::fmt;
use std::sync::Arc;

use log::debug;
use serde::Serialize;

use crate::backend::WindowBackend;
use crate::errors::WindowError;

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// Opaque OS window handle.  Zero is the "no window" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct WindowHandle(isize);

impl WindowHandle {
    pub const NULL: Self = Self(0);

    pub const fn from_raw(raw: isize) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> isize {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Window bounding rectangle in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn width(&self) -> i32 {
        self.right - self.left
    }

    pub const fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

// ---------------------------------------------------------------------------
// Locator
// ---------------------------------------------------------------------------

pub struct WindowLocator<B: WindowBackend + ?Sized> {
    backend: Arc<B>,
}

impl<B: WindowBackend + ?Sized> WindowLocator<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// First top-level window whose class name and title equal the given
    /// filters exactly.  `None` filters match anything.
    pub fn find(&self, class: Option<&str>, title: Option<&str>) -> Option<WindowHandle> {
        let found = self.backend.find_window(class, title);
        debug!("find_window(class={class:?}, title={title:?}) -> {found:?}");
        found.filter(|h| !h.is_null())
    }

    /// [`find`](Self::find), failing with [`WindowError::NotFound`].
    pub fn find_required(
        &self,
        class: Option<&str>,
        title: Option<&str>,
    ) -> Result<WindowHandle, WindowError> {
        self.find(class, title).ok_or(WindowError::NotFound)
    }

    /// Current screen rectangle of `handle`.
    pub fn get_rect(&self, handle: WindowHandle) -> Result<Rect, WindowError> {
        if handle.is_null() {
            return Err(WindowError::InvalidHandle(handle));
        }
        self.backend
            .window_rect(handle)
            .ok_or(WindowError::InvalidHandle(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockPlatform;

    fn locator() -> (Arc<MockPlatform>, WindowLocator<MockPlatform>) {
        let platform = Arc::new(MockPlatform::default());
        (Arc::clone(&platform), WindowLocator::new(Arc::clone(&platform)))
    }

    fn rect(left: i32, top: i32, right: i32, bottom: i32) -> Rect {
        Rect {
            left,
            top,
            right,
            bottom,
        }
    }

    #[test]
    fn test_no_windows_is_not_found() {
        let (_, locator) = locator();
        assert_eq!(locator.find(None, None), None);
        assert_eq!(
            locator.find_required(Some("Notepad"), None),
            Err(WindowError::NotFound)
        );
    }

    #[test]
    fn test_find_by_class_title_or_both() {
        let (platform, locator) = locator();
        let editor = platform.add_window("Notepad", "notes.txt - Notepad", rect(0, 0, 640, 480));
        let shell = platform.add_window("ConsoleWindowClass", "cmd", rect(10, 10, 20, 20));

        assert_eq!(locator.find(Some("Notepad"), None), Some(editor));
        assert_eq!(locator.find(None, Some("cmd")), Some(shell));
        assert_eq!(
            locator.find(Some("ConsoleWindowClass"), Some("cmd")),
            Some(shell)
        );
        assert_eq!(locator.find(Some("Notepad"), Some("cmd")), None);
        // Matching is exact, not substring.
        assert_eq!(locator.find(None, Some("Notepad")), None);
    }

    #[test]
    fn test_no_filter_returns_first_window() {
        let (platform, locator) = locator();
        let first = platform.add_window("A", "a", rect(0, 0, 1, 1));
        platform.add_window("B", "b", rect(0, 0, 1, 1));
        assert_eq!(locator.find(None, None), Some(first));
    }

    #[test]
    fn test_get_rect() {
        let (platform, locator) = locator();
        let handle = platform.add_window("Notepad", "n", rect(100, 50, 740, 530));
        let r = locator.get_rect(handle).unwrap();
        assert_eq!(r, rect(100, 50, 740, 530));
        assert_eq!((r.width(), r.height()), (640, 480));
    }

    #[test]
    fn test_null_handle_is_invalid() {
        let (_, locator) = locator();
        assert_eq!(
            locator.get_rect(WindowHandle::NULL),
            Err(WindowError::InvalidHandle(WindowHandle::NULL))
        );
    }

    #[test]
    fn test_closed_window_is_invalid() {
        let (platform, locator) = locator();
        let handle = platform.add_window("Notepad", "n", rect(0, 0, 10, 10));
        platform.close_window(handle);
        assert_eq!(
            locator.get_rect(handle),
            Err(WindowError::InvalidHandle(handle))
        );
        assert_eq!(locator.find(Some("Notepad"), None), None);
    }

    #[test]
    fn test_rect_serializes_in_screen_order() {
        let json = serde_json::to_string(&rect(1, 2, 3, 4)).unwrap();
        assert_eq!(json, r#"{"left":1,"top":2,"right":3,"bottom":4}"#);
        let handle = serde_json::to_string(&WindowHandle::from_raw(42)).unwrap();
        assert_eq!(handle, "42");
    }
}
