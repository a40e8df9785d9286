// Surface module
// In-memory pixel buffers in the display format, and the scaled blit between them

use crate::error::{BlitError, ConversionError};
use image::RgbaImage;

/// 32-bit little-endian pixel layouts a window surface can use
///
/// Both store bytes in memory as B, G, R, then alpha (or padding for XRGB).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Xrgb8888,
    Argb8888,
}

impl PixelFormat {
    /// Every supported format packs a pixel into four bytes
    pub const BYTES_PER_PIXEL: usize = 4;

    /// Encode one straight RGBA pixel in this format
    fn encode(self, [r, g, b, a]: [u8; 4]) -> [u8; 4] {
        match self {
            PixelFormat::Xrgb8888 => [b, g, r, 0xFF],
            PixelFormat::Argb8888 => [b, g, r, a],
        }
    }
}

/// Destination rectangle in canvas pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
}

/// A decoded image converted to a display pixel format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    format: PixelFormat,
    pixels: Vec<u8>,
}

impl Surface {
    /// Convert straight RGBA pixels into `format`
    pub fn from_rgba(image: &RgbaImage, format: PixelFormat) -> Result<Self, ConversionError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(ConversionError::Empty { width, height });
        }

        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(PixelFormat::BYTES_PER_PIXEL))
            .ok_or(ConversionError::TooLarge {
                width,
                height,
                format,
            })?;

        let mut pixels = Vec::with_capacity(len);
        for pixel in image.pixels() {
            pixels.extend_from_slice(&format.encode(pixel.0));
        }

        Ok(Self {
            width,
            height,
            format,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Bytes per row; surfaces are tightly packed
    pub fn stride(&self) -> usize {
        self.width as usize * PixelFormat::BYTES_PER_PIXEL
    }

    /// Raw bytes of the pixel at (x, y)
    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y as usize * self.stride() + x as usize * PixelFormat::BYTES_PER_PIXEL;
        self.pixels
            .get(idx..idx + PixelFormat::BYTES_PER_PIXEL)
            .and_then(|p| p.try_into().ok())
    }
}

/// Copy `src` onto a tightly packed canvas, resampling it to fill `dst`
///
/// Nearest-neighbour sampling. `dst` is clipped to the canvas; pixels outside
/// it are left untouched.
pub fn blit_scaled(
    src: &Surface,
    canvas: &mut [u8],
    canvas_width: u32,
    canvas_height: u32,
    canvas_format: PixelFormat,
    dst: Rect,
) -> Result<(), BlitError> {
    if src.format != canvas_format {
        return Err(BlitError::FormatMismatch {
            src: src.format,
            dst: canvas_format,
        });
    }
    if src.pixels.is_empty() {
        return Err(BlitError::EmptySource);
    }

    let canvas_stride = canvas_width as usize * PixelFormat::BYTES_PER_PIXEL;
    let expected = canvas_stride * canvas_height as usize;
    if canvas.len() < expected {
        return Err(BlitError::CanvasTooSmall {
            expected,
            actual: canvas.len(),
        });
    }

    if dst.w == 0 || dst.h == 0 {
        return Ok(());
    }

    // Clip the destination rectangle to the canvas
    let x_start = dst.x.max(0) as i64;
    let y_start = dst.y.max(0) as i64;
    let x_end = (dst.x as i64 + dst.w as i64).min(canvas_width as i64);
    let y_end = (dst.y as i64 + dst.h as i64).min(canvas_height as i64);
    if x_start >= x_end || y_start >= y_end {
        return Ok(());
    }

    // Source byte offset for every destination column
    let x_lut: Vec<usize> = (x_start..x_end)
        .map(|x| {
            let local = (x - dst.x as i64) as u64;
            let src_x = (local * src.width as u64 / dst.w as u64).min(src.width as u64 - 1);
            src_x as usize * PixelFormat::BYTES_PER_PIXEL
        })
        .collect();

    let src_stride = src.stride();
    for y in y_start..y_end {
        let local = (y - dst.y as i64) as u64;
        let src_y =
            (local * src.height as u64 / dst.h as u64).min(src.height as u64 - 1) as usize;
        let src_row = &src.pixels[src_y * src_stride..(src_y + 1) * src_stride];

        let dst_row_offset =
            y as usize * canvas_stride + x_start as usize * PixelFormat::BYTES_PER_PIXEL;
        let dst_row_len = x_lut.len() * PixelFormat::BYTES_PER_PIXEL;
        let dst_row = &mut canvas[dst_row_offset..dst_row_offset + dst_row_len];

        for (dst_px, &src_offset) in dst_row
            .chunks_exact_mut(PixelFormat::BYTES_PER_PIXEL)
            .zip(x_lut.iter())
        {
            let src_px = &src_row[src_offset..src_offset + PixelFormat::BYTES_PER_PIXEL];
            dst_px.copy_from_slice(src_px);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn checker(format: PixelFormat) -> Surface {
        // 2x2: red, green / blue, half-transparent white
        let mut img = RgbaImage::new(2, 2);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([0, 255, 0, 255]));
        img.put_pixel(0, 1, Rgba([0, 0, 255, 255]));
        img.put_pixel(1, 1, Rgba([255, 255, 255, 128]));
        Surface::from_rgba(&img, format).unwrap()
    }

    #[test]
    fn conversion_reorders_channels_to_bgra() {
        let surface = checker(PixelFormat::Argb8888);
        assert_eq!(surface.format(), PixelFormat::Argb8888);
        assert_eq!(surface.pixel(0, 0), Some([0, 0, 255, 255]));
        assert_eq!(surface.pixel(1, 0), Some([0, 255, 0, 255]));
        assert_eq!(surface.pixel(0, 1), Some([255, 0, 0, 255]));
        assert_eq!(surface.pixel(1, 1), Some([255, 255, 255, 128]));
        assert_eq!(surface.pixel(2, 0), None);
    }

    #[test]
    fn xrgb_conversion_forces_padding_byte() {
        let surface = checker(PixelFormat::Xrgb8888);
        assert_eq!(surface.pixel(1, 1), Some([255, 255, 255, 0xFF]));
        assert_eq!(surface.pixels.len(), 2 * 2 * 4);
        assert_eq!(surface.stride(), 8);
    }

    #[test]
    fn empty_image_fails_conversion() {
        let img = RgbaImage::new(0, 5);
        assert_eq!(
            Surface::from_rgba(&img, PixelFormat::Xrgb8888),
            Err(ConversionError::Empty {
                width: 0,
                height: 5
            })
        );
    }

    #[test]
    fn blit_stretches_to_fill_destination() {
        let src = checker(PixelFormat::Xrgb8888);
        let (w, h) = (10, 6);
        let mut canvas = vec![0u8; (w * h * 4) as usize];

        let dst = Rect::new(0, 0, w, h);
        blit_scaled(&src, &mut canvas, w, h, PixelFormat::Xrgb8888, dst).unwrap();

        let at = |x: u32, y: u32| {
            let i = ((y * w + x) * 4) as usize;
            [canvas[i], canvas[i + 1], canvas[i + 2], canvas[i + 3]]
        };
        assert_eq!(at(0, 0), src.pixel(0, 0).unwrap());
        assert_eq!(at(4, 2), src.pixel(0, 0).unwrap());
        assert_eq!(at(5, 0), src.pixel(1, 0).unwrap());
        assert_eq!(at(9, 5), src.pixel(1, 1).unwrap());
        assert_eq!(at(0, 3), src.pixel(0, 1).unwrap());
    }

    #[test]
    fn blit_clips_and_leaves_outside_untouched() {
        let src = checker(PixelFormat::Argb8888);
        let (w, h) = (4, 4);
        let mut canvas = vec![7u8; (w * h * 4) as usize];

        let dst = Rect::new(2, 2, 4, 4);
        blit_scaled(&src, &mut canvas, w, h, PixelFormat::Argb8888, dst).unwrap();

        // Untouched corner
        assert_eq!(&canvas[0..4], &[7, 7, 7, 7]);
        // Top-left of the rectangle gets the first source pixel
        let i = ((2 * w + 2) * 4) as usize;
        assert_eq!(&canvas[i..i + 4], &src.pixel(0, 0).unwrap());
    }

    #[test]
    fn blit_rejects_mismatched_formats() {
        let src = checker(PixelFormat::Argb8888);
        let mut canvas = vec![0u8; 16];
        let dst = Rect::new(0, 0, 2, 2);
        let err = blit_scaled(&src, &mut canvas, 2, 2, PixelFormat::Xrgb8888, dst);
        assert_eq!(
            err,
            Err(BlitError::FormatMismatch {
                src: PixelFormat::Argb8888,
                dst: PixelFormat::Xrgb8888
            })
        );
    }

    #[test]
    fn blit_rejects_undersized_canvas() {
        let src = checker(PixelFormat::Xrgb8888);
        let mut canvas = vec![0u8; 10];
        let dst = Rect::new(0, 0, 2, 2);
        let err = blit_scaled(&src, &mut canvas, 2, 2, PixelFormat::Xrgb8888, dst);
        assert_eq!(
            err,
            Err(BlitError::CanvasTooSmall {
                expected: 16,
                actual: 10
            })
        );
    }
}
