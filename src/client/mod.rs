pub mod kdotool;

pub use kdotool::KdotoolClient;

use crate::error::Result;
use std::fmt;

/// Opaque id of a top-level window, as understood by the window manager.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowHandle(String);

impl WindowHandle {
    pub fn new(id: impl Into<String>) -> Self {
        WindowHandle(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Answers "which application is in front, and where". `None` means no
/// context is available, never an error.
pub trait WindowInspector {
    fn current_application_id(&mut self) -> Option<String>;
    fn current_window_rect(&mut self) -> Option<WindowRect>;
}

/// Captures and re-asserts the foreground window around synthetic input.
pub trait FocusTracker: Send {
    fn foreground(&mut self) -> Option<WindowHandle>;
    fn activate(&mut self, window: &WindowHandle) -> Result<()>;
}

/// Used when no window manager integration is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullClient;

impl WindowInspector for NullClient {
    fn current_application_id(&mut self) -> Option<String> {
        None
    }

    fn current_window_rect(&mut self) -> Option<WindowRect> {
        None
    }
}

impl FocusTracker for NullClient {
    fn foreground(&mut self) -> Option<WindowHandle> {
        None
    }

    fn activate(&mut self, _window: &WindowHandle) -> Result<()> {
        Ok(())
    }
}

/// Lowercase application id without a trailing executable extension, so
/// `Code.exe`, `code` and `CODE` share one catalog.
pub fn normalize_app_id(raw: &str) -> Option<String> {
    let id = raw.trim().to_lowercase();
    let id = match id.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && matches!(ext, "exe" | "desktop" | "appimage") => stem.to_string(),
        _ => id,
    };
    if id.is_empty() || !crate::catalog::store::is_plain_app_id(&id) {
        None
    } else {
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_ids_are_normalized() {
        assert_eq!(normalize_app_id("Code.exe"), Some("code".to_string()));
        assert_eq!(normalize_app_id(" firefox \n"), Some("firefox".to_string()));
        assert_eq!(normalize_app_id("org.kde.dolphin"), Some("org.kde.dolphin".to_string()));
        assert_eq!(normalize_app_id("org.gnome.Nautilus.desktop"), Some("org.gnome.nautilus".to_string()));
        assert_eq!(normalize_app_id("  "), None);
        assert_eq!(normalize_app_id("../../etc/passwd"), None);
        assert_eq!(normalize_app_id("/usr/bin/code"), None);
    }
}
