use anyhow::{Context, Result, anyhow};
use image::DynamicImage;
use std::io::Write;
use std::process::Command;

use super::{OcrEngine, OcrFuture, OcrSettings, Symbol, parse};

/// OCR engine backed by the `tesseract` binary. Each call writes the
/// pivot image to a temp PNG and asks for hOCR with character boxes
/// enabled, which yields one bbox + confidence per glyph.
#[derive(Debug, Clone, Default)]
pub struct TesseractEngine;

impl TesseractEngine {
    pub fn new() -> Self {
        Self
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize_text(&self, image: DynamicImage, settings: OcrSettings) -> OcrFuture {
        Box::pin(async move {
            let result =
                tokio::task::spawn_blocking(move || recognize_blocking(&image, &settings))
                    .await
                    .with_context(|| "ocr task panicked")?;
            result
        })
    }
}

fn recognize_blocking(image: &DynamicImage, settings: &OcrSettings) -> Result<Vec<Symbol>> {
    let mut tmp = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .with_context(|| "failed to create temp file for OCR")?;
    image
        .write_to(&mut tmp, image::ImageFormat::Png)
        .with_context(|| "failed to write temp image for OCR")?;
    tmp.flush().ok();

    let hocr = run_tesseract_hocr(tmp.path(), settings)?;
    parse::parse_char_symbols(&hocr)
}

fn run_tesseract_hocr(path: &std::path::Path, settings: &OcrSettings) -> Result<String> {
    let language = settings.language.trim();
    if language.is_empty() {
        return Err(anyhow!("ocr language is empty"));
    }

    let mut command = Command::new("tesseract");
    command
        .arg(path)
        .arg("stdout")
        .arg("-l")
        .arg(language)
        .arg("--psm")
        .arg("6")
        .arg("--dpi")
        .arg("300")
        .arg("-c")
        .arg("hocr_char_boxes=1");
    if !settings.whitelist.trim().is_empty() {
        command
            .arg("-c")
            .arg(format!("tessedit_char_whitelist={}", settings.whitelist));
    }
    command.arg("hocr");

    let output = command
        .output()
        .with_context(|| "failed to run tesseract (is it installed?)")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("tesseract failed: {}", stderr.trim()));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
