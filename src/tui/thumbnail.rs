//! Half-block image thumbnails.
//!
//! Each terminal cell shows two vertically stacked pixels: the upper one as
//! the foreground of `▀`, the lower one as the background.

use anyhow::{Context, Result};
use image::GenericImageView;
use ratatui::{
    style::{Color, Style},
    text::{Line, Span},
};

/// Thumbnail size in feed cards (cells).
pub const FEED_THUMB_COLS: u16 = 32;
pub const FEED_THUMB_ROWS: u16 = 8;

/// Thumbnail size in the upload preview (cells).
pub const PREVIEW_THUMB_COLS: u16 = 40;
pub const PREVIEW_THUMB_ROWS: u16 = 10;

const UPPER_HALF_BLOCK: &str = "\u{2580}";

/// A decoded image scaled down to terminal cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    /// One entry per cell row: `(upper, lower)` colors per column.
    rows: Vec<Vec<(Color, Color)>>,
}

impl Thumbnail {
    /// Decode PNG/JPEG/GIF bytes and fit them into `max_cols` x `max_rows`
    /// cells, keeping the aspect ratio.
    pub fn decode(bytes: &[u8], max_cols: u16, max_rows: u16) -> Result<Self> {
        let image = image::load_from_memory(bytes).context("Unsupported or corrupt image")?;
        let (max_w, max_h) = (max_cols.max(1) as u32, max_rows.max(1) as u32 * 2);
        // Only ever scale down.
        let (src_w, src_h) = image.dimensions();
        let scaled = if src_w > max_w || src_h > max_h {
            image.thumbnail(max_w, max_h).to_rgba8()
        } else {
            image.to_rgba8()
        };

        let (w, h) = scaled.dimensions();
        let pixel = |x: u32, y: u32| -> Color {
            if y >= h {
                return Color::Reset;
            }
            let [r, g, b, a] = scaled.get_pixel(x, y).0;
            if a < 128 {
                Color::Reset
            } else {
                Color::Rgb(r, g, b)
            }
        };

        let rows = (0..h)
            .step_by(2)
            .map(|y| (0..w).map(|x| (pixel(x, y), pixel(x, y + 1))).collect())
            .collect();

        Ok(Self { rows })
    }

    #[cfg(test)]
    pub fn width(&self) -> u16 {
        self.rows.first().map_or(0, |row| row.len() as u16)
    }

    #[cfg(test)]
    pub fn height(&self) -> u16 {
        self.rows.len() as u16
    }

    /// Styled lines, one per cell row.
    pub fn lines(&self) -> Vec<Line<'static>> {
        self.rows
            .iter()
            .map(|row| {
                Line::from(
                    row.iter()
                        .map(|&(upper, lower)| {
                            Span::styled(UPPER_HALF_BLOCK, Style::default().fg(upper).bg(lower))
                        })
                        .collect::<Vec<_>>(),
                )
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) fn png_fixture(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_fits_bounds() {
        let png = png_fixture(64, 64, [255, 0, 0, 255]);
        let thumb = Thumbnail::decode(&png, 8, 4).unwrap();
        assert!(thumb.width() <= 8);
        assert!(thumb.height() <= 4);
        assert!(thumb.height() > 0);
    }

    #[test]
    fn test_decode_colors() {
        let png = png_fixture(2, 2, [10, 20, 30, 255]);
        let thumb = Thumbnail::decode(&png, 2, 1).unwrap();
        assert_eq!(thumb.height(), 1);
        let line = &thumb.lines()[0];
        assert_eq!(line.spans.len(), thumb.width() as usize);
        assert_eq!(line.spans[0].style.fg, Some(Color::Rgb(10, 20, 30)));
        assert_eq!(line.spans[0].style.bg, Some(Color::Rgb(10, 20, 30)));
    }

    #[test]
    fn test_transparent_pixels_use_terminal_background() {
        let png = png_fixture(1, 1, [0, 0, 0, 0]);
        let thumb = Thumbnail::decode(&png, 4, 4).unwrap();
        let span = &thumb.lines()[0].spans[0];
        assert_eq!(span.style.fg, Some(Color::Reset));
        // Odd height: no lower pixel.
        assert_eq!(span.style.bg, Some(Color::Reset));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(Thumbnail::decode(b"not an image", 8, 8).is_err());
    }
}
