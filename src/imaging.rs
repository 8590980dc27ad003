use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::{DynamicImage, GenericImageView};
use std::io::Cursor;
use std::path::Path;

use crate::ocr::Bounds;

/// A single character's rendered appearance, held as 8-bit grayscale.
/// Both the glyphs cropped out of the source image and the reference
/// glyphs decoded from a font catalog end up in this form.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphImage(pub image::GrayImage);

impl GlyphImage {
    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }
}

pub fn load_image(path: &Path) -> Result<DynamicImage> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read source image: {}", path.display()))?;
    image::load_from_memory(&bytes)
        .with_context(|| format!("failed to decode source image: {}", path.display()))
}

/// Mean luma over the whole image, 0.0 (black) to 255.0 (white).
/// Transparent pixels are composited over white first so that glyph
/// images with alpha-only strokes do not read as pure black.
pub fn mean_brightness(image: &DynamicImage) -> f32 {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return 0.0;
    }

    let mut sum = 0f64;
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as f32 / 255.0;
        let r = r as f32 * alpha + 255.0 * (1.0 - alpha);
        let g = g as f32 * alpha + 255.0 * (1.0 - alpha);
        let b = b as f32 * alpha + 255.0 * (1.0 - alpha);
        // Round per pixel so flat images read back their exact value;
        // the binarization band boundary depends on it.
        sum += (0.299 * r + 0.587 * g + 0.114 * b).round() as f64;
    }
    (sum / (width as f64 * height as f64)) as f32
}

pub fn binarize(image: &DynamicImage, threshold: u8) -> DynamicImage {
    let mut luma = image.to_luma8();
    for pixel in luma.pixels_mut() {
        pixel[0] = if pixel[0] > threshold { 255 } else { 0 };
    }
    DynamicImage::ImageLuma8(luma)
}

/// Crops the region covered by `bounds` out of the pivot image. The
/// bounds come from OCR output and may spill past the image edge by a
/// pixel or two; they are clamped rather than rejected.
pub fn crop_glyph(image: &DynamicImage, bounds: &Bounds) -> Result<GlyphImage> {
    let (img_w, img_h) = image.dimensions();
    let x0 = bounds.x0.min(img_w);
    let y0 = bounds.y0.min(img_h);
    let x1 = bounds.x1.min(img_w);
    let y1 = bounds.y1.min(img_h);
    if x1 <= x0 || y1 <= y0 {
        return Err(anyhow!(
            "glyph bounds {}x{}+{}+{} are empty after clamping to {}x{}",
            bounds.x1.saturating_sub(bounds.x0),
            bounds.y1.saturating_sub(bounds.y0),
            bounds.x0,
            bounds.y0,
            img_w,
            img_h
        ));
    }
    let cropped = image.crop_imm(x0, y0, x1 - x0, y1 - y0);
    Ok(GlyphImage(cropped.to_luma8()))
}

pub fn decode_glyph_base64(payload: &str) -> Result<GlyphImage> {
    // Catalog files sometimes carry data URLs; keep only the payload.
    let payload = match payload.rsplit_once(',') {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => payload,
    };
    let bytes = BASE64
        .decode(payload.trim())
        .with_context(|| "failed to decode base64 glyph payload")?;
    let decoded =
        image::load_from_memory(&bytes).with_context(|| "failed to decode glyph image")?;
    Ok(GlyphImage(decoded.to_luma8()))
}

pub fn encode_glyph_base64(glyph: &GlyphImage) -> Result<String> {
    let mut bytes = Vec::new();
    let mut cursor = Cursor::new(&mut bytes);
    glyph
        .0
        .write_to(&mut cursor, image::ImageFormat::Png)
        .with_context(|| "failed to encode glyph image")?;
    Ok(BASE64.encode(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_image(width: u32, height: u32, value: u8) -> DynamicImage {
        let luma = image::GrayImage::from_pixel(width, height, image::Luma([value]));
        DynamicImage::ImageLuma8(luma)
    }

    #[test]
    fn mean_brightness_of_flat_image_is_pixel_value() {
        let brightness = mean_brightness(&flat_image(4, 4, 200));
        assert!((brightness - 200.0).abs() < 1.5);
    }

    #[test]
    fn binarize_splits_on_threshold() {
        let mut luma = image::GrayImage::new(2, 1);
        luma.put_pixel(0, 0, image::Luma([10]));
        luma.put_pixel(1, 0, image::Luma([240]));
        let out = binarize(&DynamicImage::ImageLuma8(luma), 128).to_luma8();
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(1, 0)[0], 255);
    }

    #[test]
    fn crop_glyph_clamps_to_image_edge() {
        let image = flat_image(10, 10, 128);
        let bounds = Bounds {
            x0: 6,
            y0: 6,
            x1: 14,
            y1: 12,
        };
        let glyph = crop_glyph(&image, &bounds).expect("crop");
        assert_eq!((glyph.width(), glyph.height()), (4, 4));
    }

    #[test]
    fn crop_glyph_rejects_empty_bounds() {
        let image = flat_image(10, 10, 128);
        let bounds = Bounds {
            x0: 12,
            y0: 2,
            x1: 14,
            y1: 4,
        };
        assert!(crop_glyph(&image, &bounds).is_err());
    }

    #[test]
    fn glyph_base64_round_trip() {
        let glyph = GlyphImage(image::GrayImage::from_pixel(3, 5, image::Luma([77])));
        let encoded = encode_glyph_base64(&glyph).expect("encode");
        let decoded = decode_glyph_base64(&encoded).expect("decode");
        assert_eq!(decoded, glyph);
    }

    #[test]
    fn decode_glyph_accepts_data_url_prefix() {
        let glyph = GlyphImage(image::GrayImage::from_pixel(2, 2, image::Luma([0])));
        let encoded = encode_glyph_base64(&glyph).expect("encode");
        let with_prefix = format!("data:image/png;base64,{}", encoded);
        let decoded = decode_glyph_base64(&with_prefix).expect("decode");
        assert_eq!(decoded, glyph);
    }
}
