// Application state module
// Owns the window, the loaded images and the current selection for the whole run

use crate::assets::AssetTable;
use crate::error::PlatformError;
use crate::input::{LoopState, Selection};
use crate::platform::Platform;
use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::path::Path;

/// Everything the event loop touches, in one place
pub struct App<P: Platform> {
    platform: P,
    assets: AssetTable,
    selection: Selection,
    state: LoopState,
    torn_down: bool,
}

impl<P: Platform> App<P> {
    /// Create the application around an already loaded asset table
    pub fn new(platform: P, assets: AssetTable) -> Self {
        Self {
            platform,
            assets,
            selection: Selection::default(),
            state: LoopState::Running,
            torn_down: false,
        }
    }

    /// Load every asset from `dir` in the platform's pixel format
    ///
    /// Partial failures are logged; the application starts regardless.
    pub fn load(platform: P, dir: &Path) -> Self {
        let (width, height) = platform.size();
        info!(
            "Window surface: {}x{} {:?}",
            width,
            height,
            platform.pixel_format()
        );

        let (assets, success) = AssetTable::load(dir, platform.pixel_format());
        if !success {
            error!("Failed to load media!");
        }
        Self::new(platform, assets)
    }

    /// Start from the outcome of the platform bootstrap
    ///
    /// A failed bootstrap skips loading and the loop; there is nothing to tear down.
    pub fn launch(bootstrap: Result<P, PlatformError>, dir: &Path) -> Option<Self> {
        match bootstrap {
            Ok(platform) => Some(Self::load(platform, dir)),
            Err(e) => {
                error!("{}", e);
                error!("Failed to initialize!");
                info!("Shut down: no window or images to release");
                None
            }
        }
    }

    #[cfg(test)]
    pub fn selection(&self) -> crate::assets::Slot {
        self.selection.current()
    }

    #[cfg(test)]
    pub fn state(&self) -> LoopState {
        self.state
    }

    #[cfg(test)]
    pub fn assets(&self) -> &AssetTable {
        &self.assets
    }

    #[cfg(test)]
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Run one poll-drain-render cycle
    ///
    /// The frame is rendered even when the batch contained a quit.
    pub fn iterate(&mut self) -> Result<LoopState> {
        let events = self
            .platform
            .poll_events()
            .context("Failed to poll window events")?;
        self.state = self.selection.drain(events);
        self.present_frame();
        Ok(self.state)
    }

    /// Loop until the window is closed
    pub fn run(&mut self) -> Result<()> {
        info!("Starting event loop");
        info!("Controls: arrow keys or 'o' to swap the image, any other key to reset");

        while self.state == LoopState::Running {
            self.iterate()?;
        }

        info!("Exiting event loop");
        Ok(())
    }

    /// Show the selected image over the whole window
    fn present_frame(&mut self) {
        let slot = self.selection.current();
        let Some(image) = self.assets.get(slot) else {
            warn!("No {} image loaded, skipping frame", slot);
            return;
        };

        if let Err(e) = self.platform.present(image) {
            error!("Failed to present {} image: {:#}", slot, e);
        }
    }

    /// Free every image and close the window; runs once
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        let released = self.assets.release_all();
        debug!("Released {} images", released);
        debug_assert!(self.assets.is_empty());
        self.platform.shutdown();
        info!("Shut down");
    }
}

impl<P: Platform> Drop for App<P> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::Slot;
    use crate::input::{Event, Key};
    use crate::surface::{PixelFormat, Surface};
    use anyhow::bail;
    use image::{Rgba, RgbaImage};
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use tempfile::tempdir;

    /// In-memory window fed from a script of event batches
    struct ScriptedPlatform {
        batches: VecDeque<Vec<Event>>,
        /// First pixel of every presented image
        presented: Vec<[u8; 4]>,
        fail_present: bool,
        shutdowns: Rc<Cell<usize>>,
    }

    impl ScriptedPlatform {
        fn new(batches: Vec<Vec<Event>>) -> Self {
            Self {
                batches: batches.into(),
                presented: Vec::new(),
                fail_present: false,
                shutdowns: Rc::new(Cell::new(0)),
            }
        }
    }

    impl Platform for ScriptedPlatform {
        fn pixel_format(&self) -> PixelFormat {
            PixelFormat::Xrgb8888
        }

        fn size(&self) -> (u32, u32) {
            (1000, 600)
        }

        fn poll_events(&mut self) -> Result<Vec<Event>> {
            match self.batches.pop_front() {
                Some(batch) => Ok(batch),
                None => bail!("script exhausted"),
            }
        }

        fn present(&mut self, image: &Surface) -> Result<()> {
            assert_eq!(image.format(), self.pixel_format());
            if self.fail_present {
                bail!("buffer unavailable");
            }
            self.presented.push(image.pixel(0, 0).unwrap());
            Ok(())
        }

        fn shutdown(&mut self) {
            self.shutdowns.set(self.shutdowns.get() + 1);
        }
    }

    fn shade(slot: Slot) -> u8 {
        Slot::ALL.iter().position(|&s| s == slot).unwrap() as u8 * 40 + 10
    }

    fn solid(slot: Slot) -> Surface {
        let v = shade(slot);
        let image = RgbaImage::from_pixel(2, 2, Rgba([v, v, v, 255]));
        Surface::from_rgba(&image, PixelFormat::Xrgb8888).unwrap()
    }

    fn pixel_of(slot: Slot) -> [u8; 4] {
        let v = shade(slot);
        [v, v, v, 0xFF]
    }

    fn table_without(missing: &[Slot]) -> AssetTable {
        let mut table = AssetTable::default();
        for slot in Slot::ALL {
            if !missing.contains(&slot) {
                table.insert(slot, solid(slot));
            }
        }
        table
    }

    #[test]
    fn full_session_swaps_images_and_frees_everything() {
        let dir = tempdir().unwrap();
        for slot in Slot::ALL {
            let v = shade(slot);
            RgbaImage::from_pixel(8, 8, Rgba([v, v, v, 255]))
                .save(slot.path_in(dir.path()))
                .unwrap();
        }

        let platform = ScriptedPlatform::new(vec![
            vec![],
            vec![Event::KeyDown(Key::Right)],
            vec![Event::KeyDown(Key::Char('q'))],
            vec![Event::Quit],
        ]);
        let shutdowns = platform.shutdowns.clone();

        let mut app = App::load(platform, dir.path());
        assert_eq!(app.assets().populated(), 6);

        app.run().unwrap();
        assert_eq!(app.state(), LoopState::Terminated);
        assert_eq!(
            app.platform().presented,
            vec![
                pixel_of(Slot::Default),
                pixel_of(Slot::Right),
                pixel_of(Slot::Default),
                pixel_of(Slot::Default),
            ]
        );

        app.teardown();
        assert!(app.assets().is_empty());
        assert_eq!(shutdowns.get(), 1);

        drop(app);
        assert_eq!(shutdowns.get(), 1);
    }

    #[test]
    fn missing_up_image_skips_frames_instead_of_faulting() {
        let platform = ScriptedPlatform::new(vec![
            vec![Event::KeyDown(Key::Up)],
            vec![Event::KeyDown(Key::Left)],
            vec![Event::Quit],
        ]);
        let mut app = App::new(platform, table_without(&[Slot::Up]));

        assert_eq!(app.iterate().unwrap(), LoopState::Running);
        assert_eq!(app.selection(), Slot::Up);
        assert!(app.platform().presented.is_empty());

        app.run().unwrap();
        assert_eq!(
            app.platform().presented,
            vec![pixel_of(Slot::Left), pixel_of(Slot::Left)]
        );
    }

    #[test]
    fn quit_ends_the_loop_in_the_same_iteration() {
        let platform = ScriptedPlatform::new(vec![
            vec![
                Event::KeyDown(Key::Down),
                Event::Quit,
                Event::KeyDown(Key::Char('o')),
            ],
            vec![Event::KeyDown(Key::Up)],
        ]);
        let mut app = App::new(platform, table_without(&[]));

        app.run().unwrap();
        // The key press after the quit still picks the last frame's image
        assert_eq!(app.selection(), Slot::Stretch);
        // The remaining scripted batch was never polled
        assert_eq!(app.platform().batches.len(), 1);
        assert_eq!(app.platform().presented, vec![pixel_of(Slot::Stretch)]);
    }

    #[test]
    fn stretch_key_shows_stretch_image() {
        let platform = ScriptedPlatform::new(vec![vec![Event::KeyDown(Key::Char('o'))]]);
        let mut app = App::new(platform, table_without(&[]));

        app.iterate().unwrap();
        assert_eq!(app.selection(), Slot::Stretch);
        assert_eq!(app.platform().presented, vec![pixel_of(Slot::Stretch)]);
    }

    #[test]
    fn present_errors_are_logged_not_fatal() {
        let mut platform = ScriptedPlatform::new(vec![vec![], vec![Event::Quit]]);
        platform.fail_present = true;
        let mut app = App::new(platform, table_without(&[]));

        assert!(app.run().is_ok());
        assert!(app.platform().presented.is_empty());
    }

    #[test]
    fn poll_failure_stops_the_loop_and_still_tears_down() {
        let platform = ScriptedPlatform::new(vec![vec![]]);
        let shutdowns = platform.shutdowns.clone();
        let mut app = App::new(platform, table_without(&[Slot::Right]));

        assert!(app.run().is_err());
        drop(app);
        assert_eq!(shutdowns.get(), 1);
    }

    #[test]
    fn failed_bootstrap_skips_loading_and_the_loop() {
        let dir = tempdir().unwrap();
        let bootstrap: Result<ScriptedPlatform, PlatformError> =
            Err(PlatformError::SubsystemInit("no display".to_string()));

        assert!(App::launch(bootstrap, dir.path()).is_none());
    }

    #[test]
    fn successful_bootstrap_loads_and_tears_down_once() {
        let dir = tempdir().unwrap();
        let platform = ScriptedPlatform::new(vec![vec![Event::Quit]]);
        let shutdowns = platform.shutdowns.clone();

        let mut app = App::launch(Ok(platform), dir.path()).unwrap();
        assert!(app.assets().is_empty());
        app.run().unwrap();
        drop(app);
        assert_eq!(shutdowns.get(), 1);
    }

    #[test]
    fn teardown_after_empty_load_is_safe() {
        let dir = tempdir().unwrap();
        let platform = ScriptedPlatform::new(vec![]);
        let mut app = App::load(platform, dir.path());

        assert!(app.assets().is_empty());
        app.teardown();
        app.teardown();
        assert!(app.assets().is_empty());
        assert_eq!(app.platform().shutdowns.get(), 1);
    }
}
