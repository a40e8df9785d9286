// Configuration module
// Fixed window and asset settings; nothing here is read from disk or the environment

use std::path::Path;

/// Window title shown by the compositor
pub const WINDOW_TITLE: &str = "Key Presses";

/// Application id advertised to the compositor
pub const APP_ID: &str = "keyswap";

/// Fixed window width in pixels
pub const WINDOW_WIDTH: u32 = 1000;

/// Fixed window height in pixels
pub const WINDOW_HEIGHT: u32 = 600;

/// Directory holding the key press bitmaps, relative to the working directory
pub const ASSET_DIR: &str = "resources/graphics";

/// Window parameters handed to the platform bootstrap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    pub title: &'static str,
    pub app_id: &'static str,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: WINDOW_TITLE,
            app_id: APP_ID,
            width: WINDOW_WIDTH,
            height: WINDOW_HEIGHT,
        }
    }
}

/// Directory the asset table loads from
pub fn asset_dir() -> &'static Path {
    Path::new(ASSET_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_is_1000_by_600() {
        let config = WindowConfig::default();
        assert_eq!((config.width, config.height), (1000, 600));
        assert_eq!(config.title, WINDOW_TITLE);
    }

    #[test]
    fn assets_live_under_resources_graphics() {
        assert_eq!(asset_dir(), Path::new("resources/graphics"));
    }
}
