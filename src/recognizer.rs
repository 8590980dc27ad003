use anyhow::{Context, Result};
use futures_util::stream::{self, StreamExt, TryStreamExt};
use image::DynamicImage;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::catalog::FontCatalog;
use crate::compare::{self, GlyphComparator};
use crate::config::RecognizeOptions;
use crate::imaging::{self, GlyphImage};
use crate::ocr::{OcrEngine, OcrSettings, Symbol};
use crate::reduce;
use crate::score;
use crate::symbols;

// Mid-brightness sources (grey paper, screenshots of dark themes) OCR
// poorly as-is; anything strictly inside this band gets binarized.
// Very dark and very bright images are left alone.
const BINARIZE_BRIGHTNESS_LOW: f32 = 25.0;
const BINARIZE_BRIGHTNESS_HIGH: f32 = 125.0;
const BINARIZE_THRESHOLD: u8 = (0.65 * 255.0) as u8;

/// Terminal result for one font: its catalog metadata echoed verbatim
/// plus the aggregate similarity. NaN marks a font that shared no
/// characters with the recognized text.
#[derive(Debug, Clone, Serialize)]
pub struct FontScore {
    #[serde(flatten)]
    pub meta: BTreeMap<String, String>,
    pub similarity: f64,
}

/// Output of the image branch of a recognition run. The glyph map is
/// read-only from here on; font evaluations intersect against it
/// without touching it.
pub struct RecognitionResult {
    pub symbols: Vec<Symbol>,
    pub glyphs: BTreeMap<char, GlyphImage>,
    pub source: DynamicImage,
}

/// Coordinates one recognition run: the image branch and the index
/// fetch run concurrently, then every indexed font is evaluated
/// through a bounded fan-out. The first failure anywhere fails the
/// call and drops all in-flight sibling work.
pub struct Recognizer<E, C, M> {
    engine: E,
    catalog: C,
    comparator: M,
    concurrency: usize,
}

impl<E, C, M> Recognizer<E, C, M>
where
    E: OcrEngine,
    C: FontCatalog,
    M: GlyphComparator,
{
    pub fn new(engine: E, catalog: C, comparator: M) -> Self {
        Self {
            engine,
            catalog,
            comparator,
            concurrency: num_cpus::get().max(1),
        }
    }

    /// Caps how many font evaluations run at once. Zero is treated
    /// as one.
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency = limit.max(1);
        self
    }

    pub async fn recognize(
        &self,
        image_source: &str,
        options: &RecognizeOptions,
    ) -> Result<BTreeMap<String, FontScore>> {
        let (recognition, index) = tokio::try_join!(
            self.recognize_image(image_source, options),
            self.catalog.fetch_index(),
        )?;
        tracing::info!(
            symbols = recognition.glyphs.len(),
            fonts = index.len(),
            "recognition and index fetch complete"
        );

        let glyphs = Arc::new(recognition.glyphs);
        let total = index.len();
        let completed = AtomicUsize::new(0);

        let evaluations = index.iter().map(|name| {
            let glyphs = Arc::clone(&glyphs);
            let completed = &completed;
            async move {
                let score = self
                    .evaluate_font(name, &glyphs, options, total, completed)
                    .await?;
                Ok::<_, anyhow::Error>((name.clone(), score))
            }
        });

        stream::iter(evaluations)
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await
    }

    /// Runs only the image branch: load, conditional binarization,
    /// OCR and symbol extraction.
    pub async fn recognize_image(
        &self,
        image_source: &str,
        options: &RecognizeOptions,
    ) -> Result<RecognitionResult> {
        let image = imaging::load_image(Path::new(image_source))?;
        let brightness = imaging::mean_brightness(&image);
        let pivot = if brightness > BINARIZE_BRIGHTNESS_LOW && brightness < BINARIZE_BRIGHTNESS_HIGH
        {
            tracing::debug!(brightness, "binarizing mid-brightness source image");
            imaging::binarize(&image, BINARIZE_THRESHOLD)
        } else {
            image
        };

        let settings = OcrSettings {
            language: options.ocr_language.clone(),
            whitelist: options.ocr_whitelist.clone(),
        };
        let symbols = self
            .engine
            .recognize_text(pivot.clone(), settings)
            .await
            .with_context(|| format!("ocr failed for {}", image_source))?;
        let glyphs = symbols::extract_symbols(&pivot, &symbols, options.min_symbol_confidence)?;

        Ok(RecognitionResult {
            symbols,
            glyphs,
            source: pivot,
        })
    }

    async fn evaluate_font(
        &self,
        name: &str,
        recognized: &BTreeMap<char, GlyphImage>,
        options: &RecognizeOptions,
        total: usize,
        completed: &AtomicUsize,
    ) -> Result<FontScore> {
        let font = self.catalog.fetch_font(name).await?;
        let shared = reduce::common_keys(recognized, &font.alphabet);
        let comparisons = compare::compare_all(
            &self.comparator,
            recognized,
            &font.alphabet,
            &shared,
            options.analytic_comparison_threshold,
            options.same_size_comparison,
        )
        .await
        .with_context(|| format!("comparison failed for font '{}'", name))?;

        let similarity = score::average_similarity(&comparisons);
        tracing::debug!(
            font = name,
            characters = comparisons.len(),
            similarity,
            "font evaluated"
        );

        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(progress) = &options.progress {
            progress(name, &comparisons, done as f64 / total as f64);
        }

        Ok(FontScore {
            meta: font.meta,
            similarity,
        })
    }
}
