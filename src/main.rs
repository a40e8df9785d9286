// keyswap - A Wayland key press demo
// Shows a different bitmap depending on which arrow key was pressed last

mod app;
mod assets;
mod cli;
mod config;
mod error;
mod image_loader;
mod input;
mod platform;
mod surface;
mod wayland;

use anyhow::Result;
use app::App;
use config::WindowConfig;
use log::{error, info};
use wayland::WaylandPlatform;

fn main() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Arguments are accepted but have no effect
    let _args = cli::parse_args();

    if let Err(e) = run() {
        error!("{:#}", e);
    }
    // Failures are only reported in the log; the exit status is always 0
}

fn run() -> Result<()> {
    let config = WindowConfig::default();
    info!("Starting keyswap");

    // Start up the display and create the window
    let bootstrap = WaylandPlatform::bootstrap(&config);
    let Some(mut app) = App::launch(bootstrap, config::asset_dir()) else {
        return Ok(());
    };
    let result = app.run();

    // Free resources and close the window
    app.teardown();
    result
}
