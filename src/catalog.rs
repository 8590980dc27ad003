use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use crate::imaging::{self, GlyphImage};

/// One candidate typeface: free-form metadata plus its reference
/// alphabet, one rendered glyph per character.
#[derive(Debug, Clone)]
pub struct Font {
    pub meta: BTreeMap<String, String>,
    pub alphabet: BTreeMap<char, GlyphImage>,
}

pub type IndexFuture = Pin<Box<dyn Future<Output = Result<Vec<String>>> + Send>>;
pub type FontFuture = Pin<Box<dyn Future<Output = Result<Font>> + Send>>;

/// Boundary to wherever the reference catalog lives. The index lists
/// font names; each name resolves to a font definition.
pub trait FontCatalog: Send + Sync {
    fn fetch_index(&self) -> IndexFuture;
    fn fetch_font(&self, name: &str) -> FontFuture;
}

#[derive(Debug, Deserialize)]
struct IndexFile {
    index: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FontFile {
    #[serde(default)]
    meta: BTreeMap<String, String>,
    #[serde(default)]
    alpha: BTreeMap<String, String>,
}

/// Catalog stored on disk: a JSON index file plus one data file per
/// font under `<fonts_dir>/<name>/<data_file>`.
#[derive(Debug, Clone)]
pub struct FsCatalog {
    index_path: PathBuf,
    fonts_dir: PathBuf,
    data_file: String,
}

impl FsCatalog {
    pub fn new(index_path: PathBuf, fonts_dir: PathBuf, data_file: String) -> Self {
        Self {
            index_path,
            fonts_dir,
            data_file,
        }
    }
}

impl FontCatalog for FsCatalog {
    // File reads and glyph decoding are blocking work; both fetches
    // run on the blocking pool so catalog fan-out keeps yielding.
    fn fetch_index(&self) -> IndexFuture {
        let path = self.index_path.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || read_index(&path))
                .await
                .with_context(|| "catalog index task panicked")?
        })
    }

    fn fetch_font(&self, name: &str) -> FontFuture {
        let path = self.fonts_dir.join(name).join(&self.data_file);
        let name = name.to_string();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || read_font(&name, &path))
                .await
                .with_context(|| "catalog font task panicked")?
        })
    }
}

fn read_index(path: &std::path::Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read font index: {}", path.display()))?;
    let parsed: IndexFile = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse font index: {}", path.display()))?;
    Ok(parsed.index)
}

fn read_font(name: &str, path: &std::path::Path) -> Result<Font> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read font '{}': {}", name, path.display()))?;
    let parsed: FontFile = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse font '{}': {}", name, path.display()))?;

    let mut alphabet = BTreeMap::new();
    for (key, payload) in parsed.alpha {
        let mut chars = key.chars();
        let (Some(ch), None) = (chars.next(), chars.next()) else {
            return Err(anyhow!(
                "font '{}' has a non-single-character alphabet key: {:?}",
                name,
                key
            ));
        };
        let glyph = imaging::decode_glyph_base64(&payload)
            .with_context(|| format!("bad glyph '{}' in font '{}'", ch, name))?;
        alphabet.insert(ch, glyph);
    }

    Ok(Font {
        meta: parsed.meta,
        alphabet,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn glyph_payload() -> String {
        let glyph = GlyphImage(image::GrayImage::from_pixel(4, 4, image::Luma([0])));
        imaging::encode_glyph_base64(&glyph).expect("encode glyph")
    }

    fn write_catalog(dir: &std::path::Path) -> FsCatalog {
        let index_path = dir.join("index.json");
        fs::write(&index_path, r#"{ "index": ["mono"] }"#).expect("write index");

        let font_dir = dir.join("mono");
        fs::create_dir_all(&font_dir).expect("font dir");
        let data = serde_json::json!({
            "meta": { "name": "Mono", "style": "regular" },
            "alpha": { "A": glyph_payload(), "B": glyph_payload() }
        });
        fs::write(font_dir.join("data.json"), data.to_string()).expect("write font");

        FsCatalog::new(index_path, dir.to_path_buf(), "data.json".to_string())
    }

    #[tokio::test]
    async fn reads_index_and_font_data() {
        let dir = tempfile::tempdir().expect("tempdir");
        let catalog = write_catalog(dir.path());

        let index = catalog.fetch_index().await.expect("index");
        assert_eq!(index, vec!["mono".to_string()]);

        let font = catalog.fetch_font("mono").await.expect("font");
        assert_eq!(font.meta["name"], "Mono");
        assert_eq!(font.alphabet.keys().copied().collect::<Vec<_>>(), vec!['A', 'B']);
    }

    #[tokio::test]
    async fn index_and_font_fetches_run_concurrently() {
        let dir = tempfile::tempdir().expect("tempdir");
        let catalog = write_catalog(dir.path());

        let (index, font) =
            tokio::try_join!(catalog.fetch_index(), catalog.fetch_font("mono")).expect("fetches");
        assert_eq!(index, vec!["mono".to_string()]);
        assert_eq!(font.alphabet.len(), 2);
    }

    #[tokio::test]
    async fn missing_font_names_the_font_in_the_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let catalog = write_catalog(dir.path());

        let err = catalog.fetch_font("serif").await.expect_err("missing font");
        assert!(format!("{:#}", err).contains("serif"));
    }

    #[tokio::test]
    async fn rejects_multi_character_alphabet_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("index.json"), r#"{ "index": ["bad"] }"#).expect("index");
        let font_dir = dir.path().join("bad");
        fs::create_dir_all(&font_dir).expect("font dir");
        let data = serde_json::json!({ "meta": {}, "alpha": { "ab": glyph_payload() } });
        fs::write(font_dir.join("data.json"), data.to_string()).expect("font");

        let catalog = FsCatalog::new(
            dir.path().join("index.json"),
            dir.path().to_path_buf(),
            "data.json".to_string(),
        );
        assert!(catalog.fetch_font("bad").await.is_err());
    }
}
