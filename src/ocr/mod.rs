mod parse;
mod tesseract;

use anyhow::Result;
use image::DynamicImage;
use std::future::Future;
use std::pin::Pin;

pub use tesseract::TesseractEngine;

pub const DEFAULT_OCR_LANGUAGE: &str = "eng";
pub const DEFAULT_OCR_WHITELIST: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Pixel-space bounding box of one recognized character,
/// top-left origin, exclusive right/bottom edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

/// One recognized character instance. Confidence is on the engine's
/// 0-100 scale.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub text: char,
    pub bounds: Bounds,
    pub confidence: f32,
}

#[derive(Debug, Clone)]
pub struct OcrSettings {
    pub language: String,
    pub whitelist: String,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            language: DEFAULT_OCR_LANGUAGE.to_string(),
            whitelist: DEFAULT_OCR_WHITELIST.to_string(),
        }
    }
}

pub type OcrFuture = Pin<Box<dyn Future<Output = Result<Vec<Symbol>>> + Send>>;

/// Boundary to the character recognition engine. The pipeline only
/// needs per-character text, position and confidence back.
pub trait OcrEngine: Send + Sync {
    fn recognize_text(&self, image: DynamicImage, settings: OcrSettings) -> OcrFuture;
}
