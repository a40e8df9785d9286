// Image loading module
// Decodes bitmap files and converts them to the display pixel format

use crate::error::{LoadError, PlatformError};
use crate::surface::{PixelFormat, Surface};
use image::{DynamicImage, ImageFormat};
use log::debug;
use std::fs;
use std::io::Cursor;
use std::path::Path;

/// Formats the decoder must be able to read
const REQUIRED_FORMATS: [ImageFormat; 2] = [ImageFormat::Png, ImageFormat::Bmp];

/// Check that the decoders this program relies on were compiled in
pub fn init_decoders() -> Result<(), PlatformError> {
    for format in REQUIRED_FORMATS {
        if !format.reading_enabled() {
            return Err(PlatformError::ImageInit(format!(
                "{:?} decoding is not available",
                format
            )));
        }
    }
    debug!("Image decoders ready: {:?}", REQUIRED_FORMATS);
    Ok(())
}

/// Load the image at `path` and convert it to `format`
///
/// The decoded intermediate is dropped before returning on every path.
pub fn load_image(path: &Path, format: PixelFormat) -> Result<Surface, LoadError> {
    let data = fs::read(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let decoded = load_from_bytes(&data).map_err(|source| LoadError::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    let rgba = decoded.into_rgba8();
    let surface = Surface::from_rgba(&rgba, format).map_err(|source| LoadError::Conversion {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(
        "Loaded {}: {}x{} as {:?}",
        path.display(),
        surface.width(),
        surface.height(),
        surface.format()
    );
    Ok(surface)
}

/// Decode raw bytes, auto-detecting the format
fn load_from_bytes(data: &[u8]) -> Result<DynamicImage, image::ImageError> {
    let format = image::guess_format(data)?;
    image::load(Cursor::new(data), format)
}
