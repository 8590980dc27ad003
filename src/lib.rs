use anyhow::Result;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub mod catalog;
pub mod compare;
pub mod config;
pub mod imaging;
pub mod logging;
pub mod ocr;
pub mod reduce;
pub mod score;
pub mod settings;
pub mod symbols;

mod recognizer;

pub use catalog::{Font, FontCatalog, FsCatalog};
pub use compare::{ComparisonResult, GlyphComparator, HashPixelComparator};
pub use config::{ProgressFn, RecognizeOptions};
pub use ocr::{Bounds, OcrEngine, OcrSettings, Symbol, TesseractEngine};
pub use recognizer::{FontScore, RecognitionResult, Recognizer};

/// Recognizes which catalog font the text in `image_source` was
/// rendered with, using the tesseract engine, the on-disk catalog
/// named by `options`, and the built-in similarity metrics.
///
/// Returns one `FontScore` per indexed font, keyed by font name. A
/// font with no characters in common with the recognized text scores
/// NaN. The first failure in any stage fails the whole call.
pub async fn recognize(
    image_source: &str,
    options: RecognizeOptions,
) -> Result<BTreeMap<String, FontScore>> {
    let catalog = FsCatalog::new(
        PathBuf::from(&options.fonts_index),
        PathBuf::from(&options.fonts_directory),
        options.fonts_data.clone(),
    );
    let recognizer = Recognizer::new(TesseractEngine::new(), catalog, HashPixelComparator::new());
    recognizer.recognize(image_source, &options).await
}
