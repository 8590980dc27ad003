use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::pin::Pin;

use crate::imaging::GlyphImage;

const HASH_SIDE: u32 = 8;

/// Outcome of comparing one recognized glyph against its reference
/// counterpart. Both metrics are similarities in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonResult {
    pub perceptual: f64,
    pub analytical: f64,
}

pub type CompareFuture = Pin<Box<dyn Future<Output = Result<ComparisonResult>> + Send>>;

/// Boundary to the low-level similarity metrics. `threshold` is the
/// per-pixel tolerance for the analytical metric; `same_size` asks for
/// dimension normalization before the pixel walk.
pub trait GlyphComparator: Send + Sync {
    fn compare(
        &self,
        recognized: GlyphImage,
        reference: GlyphImage,
        threshold: f64,
        same_size: bool,
    ) -> CompareFuture;
}

/// Launches one comparison per shared character and joins them all.
/// The join is all-or-nothing: the first metric failure aborts the
/// whole batch. An empty key set resolves to an empty map.
pub async fn compare_all<M: GlyphComparator>(
    comparator: &M,
    recognized: &BTreeMap<char, GlyphImage>,
    reference: &BTreeMap<char, GlyphImage>,
    keys: &BTreeSet<char>,
    threshold: f64,
    same_size: bool,
) -> Result<BTreeMap<char, ComparisonResult>> {
    let mut tasks = Vec::with_capacity(keys.len());
    for key in keys {
        let (Some(own), Some(other)) = (recognized.get(key), reference.get(key)) else {
            continue;
        };
        let future = comparator.compare(own.clone(), other.clone(), threshold, same_size);
        let key = *key;
        tasks.push(async move {
            let result = future
                .await
                .with_context(|| format!("comparison failed for '{}'", key))?;
            Ok::<_, anyhow::Error>((key, result))
        });
    }

    let results = futures_util::future::try_join_all(tasks).await?;
    Ok(results.into_iter().collect())
}

/// Built-in metric pair: an 8x8 average-hash distance for the
/// perceptual score and a tolerance-gated pixel walk for the
/// analytical one.
#[derive(Debug, Clone, Default)]
pub struct HashPixelComparator;

impl HashPixelComparator {
    pub fn new() -> Self {
        Self
    }
}

impl GlyphComparator for HashPixelComparator {
    fn compare(
        &self,
        recognized: GlyphImage,
        reference: GlyphImage,
        threshold: f64,
        same_size: bool,
    ) -> CompareFuture {
        Box::pin(async move {
            let perceptual = perceptual_similarity(&recognized, &reference);
            let analytical = analytical_similarity(&recognized, &reference, threshold, same_size);
            Ok(ComparisonResult {
                perceptual,
                analytical,
            })
        })
    }
}

fn perceptual_similarity(a: &GlyphImage, b: &GlyphImage) -> f64 {
    let hash_a = average_hash(a);
    let hash_b = average_hash(b);
    let distance = (hash_a ^ hash_b).count_ones() as f64;
    1.0 - distance / (HASH_SIDE * HASH_SIDE) as f64
}

fn average_hash(glyph: &GlyphImage) -> u64 {
    let small = image::imageops::resize(
        &glyph.0,
        HASH_SIDE,
        HASH_SIDE,
        image::imageops::FilterType::Triangle,
    );
    let mut sum = 0u64;
    for pixel in small.pixels() {
        sum += pixel[0] as u64;
    }
    let mean = sum / (HASH_SIDE * HASH_SIDE) as u64;

    let mut hash = 0u64;
    for (idx, pixel) in small.pixels().enumerate() {
        if pixel[0] as u64 > mean {
            hash |= 1u64 << idx;
        }
    }
    hash
}

/// Fraction of pixels whose normalized difference stays within
/// `threshold`. With `same_size` the reference is rescaled to the
/// recognized glyph's dimensions first; otherwise only the common
/// top-left overlap is walked.
fn analytical_similarity(a: &GlyphImage, b: &GlyphImage, threshold: f64, same_size: bool) -> f64 {
    let resized;
    let b = if same_size && (a.width() != b.width() || a.height() != b.height()) {
        resized = GlyphImage(image::imageops::resize(
            &b.0,
            a.width().max(1),
            a.height().max(1),
            image::imageops::FilterType::Triangle,
        ));
        &resized
    } else {
        b
    };

    let width = a.width().min(b.width());
    let height = a.height().min(b.height());
    if width == 0 || height == 0 {
        return 0.0;
    }

    let mut matched = 0u64;
    for y in 0..height {
        for x in 0..width {
            let own = a.0.get_pixel(x, y)[0] as f64;
            let other = b.0.get_pixel(x, y)[0] as f64;
            if (own - other).abs() / 255.0 <= threshold {
                matched += 1;
            }
        }
    }
    matched as f64 / (width as u64 * height as u64) as f64
}
