use anyhow::Result;
use image::DynamicImage;
use std::collections::BTreeMap;

use crate::imaging::{self, GlyphImage};
use crate::ocr::Symbol;

/// Crops one glyph image per recognized character, keeping only
/// symbols with confidence strictly above `min_confidence`.
///
/// When the same character was recognized more than once the glyph
/// from the last symbol in OCR order wins. Reading order puts the
/// later occurrence further into the text, which on noisy scans tends
/// to be no worse a sample than the first, so last-wins is kept as the
/// deliberate policy rather than an accident of insertion order.
pub fn extract_symbols(
    image: &DynamicImage,
    symbols: &[Symbol],
    min_confidence: f32,
) -> Result<BTreeMap<char, GlyphImage>> {
    let mut glyphs = BTreeMap::new();
    for symbol in symbols {
        if symbol.confidence <= min_confidence {
            tracing::debug!(
                symbol = %symbol.text,
                confidence = symbol.confidence,
                "dropping low-confidence symbol"
            );
            continue;
        }
        let glyph = imaging::crop_glyph(image, &symbol.bounds)?;
        glyphs.insert(symbol.text, glyph);
    }
    Ok(glyphs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::Bounds;

    fn gradient_image() -> DynamicImage {
        let luma = image::GrayImage::from_fn(20, 10, |x, _| image::Luma([(x * 12) as u8]));
        DynamicImage::ImageLuma8(luma)
    }

    fn symbol(text: char, x0: u32, confidence: f32) -> Symbol {
        Symbol {
            text,
            bounds: Bounds {
                x0,
                y0: 0,
                x1: x0 + 4,
                y1: 8,
            },
            confidence,
        }
    }

    #[test]
    fn filters_on_strict_confidence_threshold() {
        let image = gradient_image();
        let symbols = vec![
            symbol('A', 0, 95.0),
            symbol('B', 4, 30.0),
            symbol('C', 8, 30.1),
        ];
        let glyphs = extract_symbols(&image, &symbols, 30.0).expect("extract");
        assert!(glyphs.contains_key(&'A'));
        assert!(!glyphs.contains_key(&'B'), "confidence == threshold is dropped");
        assert!(glyphs.contains_key(&'C'));
    }

    #[test]
    fn duplicate_characters_keep_the_last_glyph() {
        let image = gradient_image();
        let symbols = vec![symbol('A', 0, 90.0), symbol('A', 12, 80.0)];
        let glyphs = extract_symbols(&image, &symbols, 30.0).expect("extract");
        assert_eq!(glyphs.len(), 1);
        let expected = imaging::crop_glyph(&image, &symbols[1].bounds).expect("crop");
        assert_eq!(glyphs[&'A'], expected);
    }
}
