//! System clipboard access for Ctrl+V.

use std::io::Cursor;

use anyhow::{Context, Result};
use arboard::Clipboard;

use crate::view::ClipboardItem;

/// Read what the clipboard offers, image first.
///
/// Clipboard images arrive as raw RGBA and are re-encoded as PNG. Errors
/// (no clipboard, empty clipboard, no display) yield fewer items.
pub fn read_items() -> Vec<ClipboardItem> {
    let mut clipboard = match Clipboard::new() {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Clipboard unavailable: {}", e);
            return Vec::new();
        }
    };

    let mut items = Vec::new();

    match clipboard.get_image() {
        Ok(image) => match encode_rgba_png(&image.bytes, image.width, image.height) {
            Ok(data) => items.push(ClipboardItem {
                media_type: "image/png".to_string(),
                data,
            }),
            Err(e) => tracing::warn!("Could not encode clipboard image: {:#}", e),
        },
        Err(e) => tracing::debug!("No image in clipboard: {}", e),
    }

    match clipboard.get_text() {
        Ok(text) => items.push(ClipboardItem {
            media_type: "text/plain".to_string(),
            data: text.into_bytes(),
        }),
        Err(e) => tracing::debug!("No text in clipboard: {}", e),
    }

    items
}

/// The first text item, for the default paste.
pub fn text_of(items: &[ClipboardItem]) -> Option<String> {
    items
        .iter()
        .find(|item| item.media_type.starts_with("text/"))
        .map(|item| String::from_utf8_lossy(&item.data).into_owned())
}

fn encode_rgba_png(rgba: &[u8], width: usize, height: usize) -> Result<Vec<u8>> {
    let image = image::RgbaImage::from_raw(width as u32, height as u32, rgba.to_vec())
        .context("Clipboard image has an invalid RGBA buffer")?;
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut out, image::ImageFormat::Png)
        .context("PNG encoding failed")?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    #[test]
    fn test_encode_rgba_png_roundtrips_dimensions() {
        let rgba = vec![255u8; 3 * 2 * 4];
        let png = encode_rgba_png(&rgba, 3, 2).unwrap();
        assert!(png.starts_with(b"\x89PNG"));
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.dimensions(), (3, 2));
    }

    #[test]
    fn test_encode_rejects_short_buffer() {
        assert!(encode_rgba_png(&[0u8; 4], 2, 2).is_err());
    }

    #[test]
    fn test_text_of_picks_text_item() {
        let items = vec![
            ClipboardItem {
                media_type: "image/png".to_string(),
                data: vec![1, 2, 3],
            },
            ClipboardItem {
                media_type: "text/plain".to_string(),
                data: b"hello".to_vec(),
            },
        ];
        assert_eq!(text_of(&items).as_deref(), Some("hello"));
        assert_eq!(text_of(&items[..1]), None);
    }
}
