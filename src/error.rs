// Error types
// Typed failures for bootstrap, asset loading and pixel work

use std::path::PathBuf;
use thiserror::Error;

use crate::surface::PixelFormat;

/// Failures while bringing up the window and its surface
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("display could not initialize! Error: {0}")]
    SubsystemInit(String),

    #[error("window could not be created! Error: {0}")]
    WindowCreation(String),

    #[error("image decoder could not initialize! Error: {0}")]
    ImageInit(String),

    #[error("window surface could not be acquired! Error: {0}")]
    SurfaceAcquisition(String),
}

/// Failures while loading a single asset
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Unable to read image {}! Error: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to load image {}! Error: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Unable to optimize image {}! Error: {source}", path.display())]
    Conversion {
        path: PathBuf,
        #[source]
        source: ConversionError,
    },
}

/// Failures converting decoded pixels into a display format
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("image has no pixels ({width}x{height})")]
    Empty { width: u32, height: u32 },

    #[error("image of {width}x{height} is too large for {format:?}")]
    TooLarge {
        width: u32,
        height: u32,
        format: PixelFormat,
    },
}

/// Failures copying one surface onto another
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlitError {
    #[error("cannot blit {src:?} onto {dst:?}")]
    FormatMismatch { src: PixelFormat, dst: PixelFormat },

    #[error("destination canvas holds {actual} bytes, {expected} needed")]
    CanvasTooSmall { expected: usize, actual: usize },

    #[error("source surface is empty")]
    EmptySource,
}
