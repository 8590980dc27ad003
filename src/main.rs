use std::cmp::Ordering;
use std::path::Path;

use anyhow::Result;
use clap::Parser;

use font_sleuth::{FontScore, RecognizeOptions, logging, recognize, settings};

#[derive(Parser, Debug)]
#[command(
    name = "font-sleuth",
    version,
    about = "Identify which typeface rendered the text in an image"
)]
struct Cli {
    /// Image containing the text to identify
    image: String,

    /// Base directory holding per-font data directories
    #[arg(long = "fonts-dir")]
    fonts_dir: Option<String>,

    /// Path to the font index JSON file
    #[arg(long = "index")]
    index: Option<String>,

    /// Data file name inside each font's directory
    #[arg(long = "data-file")]
    data_file: Option<String>,

    /// Minimum OCR confidence (0-100) for a glyph to be compared
    #[arg(long = "min-confidence")]
    min_confidence: Option<f32>,

    /// Per-pixel tolerance for the analytical comparison
    #[arg(long = "threshold")]
    threshold: Option<f64>,

    /// Skip dimension normalization before pixel comparison
    #[arg(long = "no-same-size")]
    no_same_size: bool,

    /// OCR language passed to tesseract
    #[arg(long = "lang")]
    lang: Option<String>,

    /// Also print each font's catalog metadata
    #[arg(long = "with-meta")]
    with_meta: bool,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let settings_path = cli.read_settings.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;
    let options = build_options(&cli, settings.to_options());

    let scores = recognize(&cli.image, options).await?;
    print!("{}", format_scores(&scores, cli.with_meta));
    Ok(())
}

fn build_options(cli: &Cli, mut options: RecognizeOptions) -> RecognizeOptions {
    if let Some(dir) = &cli.fonts_dir {
        options.fonts_directory = dir.clone();
    }
    if let Some(index) = &cli.index {
        options.fonts_index = index.clone();
    }
    if let Some(data_file) = &cli.data_file {
        options.fonts_data = data_file.clone();
    }
    if let Some(confidence) = cli.min_confidence {
        options.min_symbol_confidence = confidence;
    }
    if let Some(threshold) = cli.threshold {
        options.analytic_comparison_threshold = threshold;
    }
    if cli.no_same_size {
        options.same_size_comparison = false;
    }
    if let Some(lang) = &cli.lang {
        options.ocr_language = lang.clone();
    }
    options
}

/// Ranked descending by similarity; fonts with nothing to compare
/// (NaN) sink to the bottom.
fn format_scores(
    scores: &std::collections::BTreeMap<String, FontScore>,
    with_meta: bool,
) -> String {
    let mut ranked = scores.iter().collect::<Vec<_>>();
    ranked.sort_by(|(_, a), (_, b)| match (a.similarity.is_nan(), b.similarity.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b
            .similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal),
    });

    let mut lines = Vec::new();
    for (name, score) in ranked {
        let mut line = format!("{}\t{:.4}", name, score.similarity);
        if with_meta {
            for (key, value) in &score.meta {
                line.push_str(&format!("\t{}={}", key, value));
            }
        }
        lines.push(line);
    }
    let mut output = lines.join("\n");
    if !output.is_empty() {
        output.push('\n');
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn score(similarity: f64) -> FontScore {
        FontScore {
            meta: BTreeMap::new(),
            similarity,
        }
    }

    #[test]
    fn ranks_descending_with_nan_last() {
        let mut scores = BTreeMap::new();
        scores.insert("low".to_string(), score(0.2));
        scores.insert("high".to_string(), score(0.9));
        scores.insert("empty".to_string(), score(f64::NAN));

        let output = format_scores(&scores, false);
        let names = output
            .lines()
            .map(|line| line.split('\t').next().unwrap_or(""))
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["high", "low", "empty"]);
    }
}
