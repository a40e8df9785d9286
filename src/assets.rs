// Asset table module
// Six fixed key press images, each loaded once at startup

use crate::image_loader::load_image;
use crate::surface::{PixelFormat, Surface};
use log::{error, info};
use std::fmt;
use std::path::{Path, PathBuf};

/// One entry of the asset table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Stretch,
    Default,
    Up,
    Down,
    Left,
    Right,
}

impl Slot {
    /// Every slot in declaration order
    pub const ALL: [Slot; 6] = [
        Slot::Stretch,
        Slot::Default,
        Slot::Up,
        Slot::Down,
        Slot::Left,
        Slot::Right,
    ];

    /// Order in which slots are loaded from disk
    pub const LOAD_ORDER: [Slot; 6] = [
        Slot::Default,
        Slot::Up,
        Slot::Down,
        Slot::Left,
        Slot::Right,
        Slot::Stretch,
    ];

    /// Bitmap file backing this slot
    pub fn file_name(self) -> &'static str {
        match self {
            Slot::Stretch => "stretch.bmp",
            Slot::Default => "press.bmp",
            Slot::Up => "up.bmp",
            Slot::Down => "down.bmp",
            Slot::Left => "left.bmp",
            Slot::Right => "right.bmp",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Slot::Stretch => "stretch",
            Slot::Default => "default",
            Slot::Up => "up",
            Slot::Down => "down",
            Slot::Left => "left",
            Slot::Right => "right",
        }
    }

    pub fn path_in(self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Images for every slot; a slot is empty when its file failed to load
#[derive(Debug, Default)]
pub struct AssetTable {
    stretch: Option<Surface>,
    default: Option<Surface>,
    up: Option<Surface>,
    down: Option<Surface>,
    left: Option<Surface>,
    right: Option<Surface>,
}

impl AssetTable {
    /// Load all six slots from `dir`, converting to `format`
    ///
    /// A failed slot is logged and left empty; loading carries on with the rest.
    /// The flag is false when any slot failed.
    pub fn load(dir: &Path, format: PixelFormat) -> (Self, bool) {
        let mut table = Self::default();
        let mut success = true;

        for slot in Slot::LOAD_ORDER {
            let path = slot.path_in(dir);
            match load_image(&path, format) {
                Ok(surface) => *table.entry(slot) = Some(surface),
                Err(e) => {
                    error!("{}", e);
                    error!("Failed to load {} image!", slot);
                    success = false;
                }
            }
        }

        info!(
            "Loaded {}/{} images from {}",
            table.populated(),
            Slot::ALL.len(),
            dir.display()
        );
        (table, success)
    }

    /// Image held by `slot`, if it loaded
    pub fn get(&self, slot: Slot) -> Option<&Surface> {
        match slot {
            Slot::Stretch => self.stretch.as_ref(),
            Slot::Default => self.default.as_ref(),
            Slot::Up => self.up.as_ref(),
            Slot::Down => self.down.as_ref(),
            Slot::Left => self.left.as_ref(),
            Slot::Right => self.right.as_ref(),
        }
    }

    fn entry(&mut self, slot: Slot) -> &mut Option<Surface> {
        match slot {
            Slot::Stretch => &mut self.stretch,
            Slot::Default => &mut self.default,
            Slot::Up => &mut self.up,
            Slot::Down => &mut self.down,
            Slot::Left => &mut self.left,
            Slot::Right => &mut self.right,
        }
    }

    #[cfg(test)]
    pub fn insert(&mut self, slot: Slot, surface: Surface) {
        *self.entry(slot) = Some(surface);
    }

    /// Number of slots holding an image
    pub fn populated(&self) -> usize {
        Slot::ALL.iter().filter(|&&slot| self.get(slot).is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.populated() == 0
    }

    /// Free every loaded image; empty slots are skipped
    ///
    /// Returns how many images were released.
    pub fn release_all(&mut self) -> usize {
        Slot::ALL
            .into_iter()
            .filter(|&slot| self.entry(slot).take().is_some())
            .count()
    }
}
