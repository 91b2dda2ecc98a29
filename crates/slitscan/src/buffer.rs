use std::fmt;
use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};

use crate::capture::VideoFrame;

/// Scanlines kept before the write cursor wraps.
pub const SLIT_HEIGHT: u32 = 512;

/// Vertical gold gradient painted before any camera data arrives.
pub const GRADIENT_STOPS: [(f32, [u8; 3]); 4] = [
    (0.0, [0xff, 0xe8, 0xa5]),
    (0.4, [0xff, 0xd7, 0x00]),
    (0.6, [0xc7, 0xa9, 0x42]),
    (1.0, [0x7a, 0x65, 0x20]),
];

/// Circular buffer of RGBA scanlines.
///
/// Row `row()` is the next one to be overwritten; it advances by one per
/// write and wraps at `height()`.
#[derive(Clone)]
pub struct SlitScanBuffer {
    image: RgbaImage,
    row: u32,
}

impl SlitScanBuffer {
    /// Allocates a `width` x `height` buffer pre-filled with the gradient.
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let mut image = RgbaImage::new(width, height);
        for (y, row) in image.enumerate_rows_mut() {
            let color = gradient_color((y as f32 + 0.5) / height as f32);
            for (_, _, pixel) in row {
                *pixel = color;
            }
        }
        Self { image, row: 0 }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Next row to be written.
    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// RGBA bytes of row `y`.
    pub fn row_pixels(&self, y: u32) -> &[u8] {
        let stride = self.stride();
        let start = y as usize * stride;
        &self.image.as_raw()[start..start + stride]
    }

    /// Copies one RGBA scanline into the cursor row and advances the cursor.
    ///
    /// Longer input is cropped; the part of the row not covered by shorter
    /// input is cleared to transparent black. Returns the row written.
    pub fn write_scanline(&mut self, pixels: &[u8]) -> u32 {
        let stride = self.stride();
        let start = self.row as usize * stride;
        let raw: &mut [u8] = &mut self.image;
        let target = &mut raw[start..start + stride];
        let copied = pixels.len().min(stride) / 4 * 4;
        target[..copied].copy_from_slice(&pixels[..copied]);
        target[copied..].fill(0);

        let written = self.row;
        self.row = (self.row + 1) % self.height();
        written
    }

    /// Writes the frame's middle row; see [`SlitScanBuffer::write_scanline`].
    pub fn write_frame(&mut self, frame: &VideoFrame) -> u32 {
        self.write_scanline(frame.midline())
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, image::ImageError> {
        let mut bytes = Cursor::new(Vec::new());
        self.image.write_to(&mut bytes, ImageFormat::Png)?;
        Ok(bytes.into_inner())
    }

    fn stride(&self) -> usize {
        self.width() as usize * 4
    }
}

impl fmt::Debug for SlitScanBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlitScanBuffer")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("row", &self.row)
            .finish()
    }
}

/// Samples [`GRADIENT_STOPS`] at `position` in `[0, 1]`.
pub fn gradient_color(position: f32) -> Rgba<u8> {
    let position = position.clamp(0.0, 1.0);
    let upper = GRADIENT_STOPS
        .iter()
        .position(|(offset, _)| *offset >= position)
        .unwrap_or(GRADIENT_STOPS.len() - 1)
        .max(1);
    let (start, from) = GRADIENT_STOPS[upper - 1];
    let (end, to) = GRADIENT_STOPS[upper];
    let mix = ((position - start) / (end - start)).clamp(0.0, 1.0);

    let channel = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * mix).round() as u8;
    Rgba([
        channel(from[0], to[0]),
        channel(from[1], to[1]),
        channel(from[2], to[2]),
        255,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanline(width: u32, value: u8) -> Vec<u8> {
        vec![value; width as usize * 4]
    }

    #[test]
    fn cursor_wraps_at_height() {
        let height = 8;
        let mut buffer = SlitScanBuffer::new(4, height);
        for i in 0..=height {
            buffer.write_scanline(&scanline(4, i as u8));
        }
        assert_eq!(buffer.row(), 1);
        // the ninth write landed back on row 0
        assert_eq!(buffer.row_pixels(0), scanline(4, 8).as_slice());
        assert_eq!(buffer.row_pixels(1), scanline(4, 1).as_slice());
    }

    #[test]
    fn full_height_buffer_wraps_after_512_rows() {
        let mut buffer = SlitScanBuffer::new(2, SLIT_HEIGHT);
        for _ in 0..=SLIT_HEIGHT {
            buffer.write_scanline(&scanline(2, 7));
        }
        assert_eq!(buffer.row(), 1);
    }

    #[test]
    fn prefill_is_a_deterministic_gold_gradient() {
        let a = SlitScanBuffer::new(3, 64);
        let b = SlitScanBuffer::new(3, 64);
        assert_eq!(a.image().as_raw(), b.image().as_raw());

        let top = a.image().get_pixel(0, 0);
        let bottom = a.image().get_pixel(2, 63);
        assert!(top[1] > bottom[1]);
        assert_eq!(top[3], 255);
        // every row is a single flat colour
        assert!(a.image().pixels().take(3).all(|p| p == top));
    }

    #[test]
    fn gradient_hits_its_stops() {
        assert_eq!(gradient_color(0.0), Rgba([0xff, 0xe8, 0xa5, 255]));
        assert_eq!(gradient_color(0.4), Rgba([0xff, 0xd7, 0x00, 255]));
        assert_eq!(gradient_color(0.6), Rgba([0xc7, 0xa9, 0x42, 255]));
        assert_eq!(gradient_color(1.0), Rgba([0x7a, 0x65, 0x20, 255]));
        assert_eq!(gradient_color(0.5), Rgba([0xe3, 0xc0, 0x21, 255]));
    }

    #[test]
    fn short_scanlines_leave_transparent_tail() {
        let mut buffer = SlitScanBuffer::new(3, 4);
        buffer.write_scanline(&[9, 9, 9, 9]);
        assert_eq!(buffer.row_pixels(0), &[9, 9, 9, 9, 0, 0, 0, 0, 0, 0, 0, 0]);

        buffer.write_scanline(&scanline(5, 3));
        assert_eq!(buffer.row_pixels(1), scanline(3, 3).as_slice());
    }

    #[test]
    fn encodes_png() {
        let buffer = SlitScanBuffer::new(5, 5);
        let png = buffer.encode_png().unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.as_raw(), buffer.image().as_raw());
    }
}
