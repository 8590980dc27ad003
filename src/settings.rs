use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::RecognizeOptions;

/// Defaults for the CLI, layered from TOML files: `font-sleuth.toml`
/// and `font-sleuth.local.toml` in the working directory, then
/// `~/.font-sleuth/settings.toml`, then an explicit `--read-settings`
/// path. Later files win per field.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub fonts_directory: Option<String>,
    pub fonts_index: Option<String>,
    pub fonts_data: Option<String>,
    pub ocr_language: Option<String>,
    pub ocr_whitelist: Option<String>,
    pub min_symbol_confidence: Option<f32>,
    pub analytic_threshold: Option<f64>,
    pub same_size_comparison: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    fonts: Option<FontsSettings>,
    ocr: Option<OcrFileSettings>,
    comparison: Option<ComparisonSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct FontsSettings {
    directory: Option<String>,
    index: Option<String>,
    data: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OcrFileSettings {
    language: Option<String>,
    whitelist: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ComparisonSettings {
    min_symbol_confidence: Option<f32>,
    analytic_threshold: Option<f64>,
    same_size: Option<bool>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("font-sleuth.toml"));
    ordered_paths.push(PathBuf::from("font-sleuth.local.toml"));
    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
    }
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(fonts) = incoming.fonts {
            if let Some(directory) = fonts.directory {
                if !directory.trim().is_empty() {
                    self.fonts_directory = Some(directory);
                }
            }
            if let Some(index) = fonts.index {
                if !index.trim().is_empty() {
                    self.fonts_index = Some(index);
                }
            }
            if let Some(data) = fonts.data {
                if !data.trim().is_empty() {
                    self.fonts_data = Some(data);
                }
            }
        }
        if let Some(ocr) = incoming.ocr {
            if let Some(language) = ocr.language {
                if !language.trim().is_empty() {
                    self.ocr_language = Some(language);
                }
            }
            if let Some(whitelist) = ocr.whitelist {
                if !whitelist.trim().is_empty() {
                    self.ocr_whitelist = Some(whitelist);
                }
            }
        }
        if let Some(comparison) = incoming.comparison {
            if let Some(confidence) = comparison.min_symbol_confidence {
                self.min_symbol_confidence = Some(confidence);
            }
            if let Some(threshold) = comparison.analytic_threshold {
                self.analytic_threshold = Some(threshold);
            }
            if let Some(same_size) = comparison.same_size {
                self.same_size_comparison = Some(same_size);
            }
        }
    }

    /// Recognition options seeded from these settings; unset fields
    /// keep the built-in defaults.
    pub fn to_options(&self) -> RecognizeOptions {
        let mut options = RecognizeOptions::default();
        if let Some(directory) = &self.fonts_directory {
            options.fonts_directory = directory.clone();
        }
        if let Some(index) = &self.fonts_index {
            options.fonts_index = index.clone();
        }
        if let Some(data) = &self.fonts_data {
            options.fonts_data = data.clone();
        }
        if let Some(language) = &self.ocr_language {
            options.ocr_language = language.clone();
        }
        if let Some(whitelist) = &self.ocr_whitelist {
            options.ocr_whitelist = whitelist.clone();
        }
        if let Some(confidence) = self.min_symbol_confidence {
            options.min_symbol_confidence = confidence;
        }
        if let Some(threshold) = self.analytic_threshold {
            options.analytic_comparison_threshold = threshold;
        }
        if let Some(same_size) = self.same_size_comparison {
            options.same_size_comparison = same_size;
        }
        options
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".font-sleuth"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_settings_file_overrides_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.toml");
        fs::write(
            &path,
            r#"
[fonts]
directory = "refs"
index = "refs/index.json"

[comparison]
min_symbol_confidence = 42.5
same_size = false
"#,
        )
        .expect("write settings");

        let settings = load_settings(Some(&path)).expect("load");
        let options = settings.to_options();
        assert_eq!(options.fonts_directory, "refs");
        assert_eq!(options.fonts_index, "refs/index.json");
        assert_eq!(options.min_symbol_confidence, 42.5);
        assert!(!options.same_size_comparison);
        // unset fields fall back to built-in defaults
        assert_eq!(options.fonts_data, "data.json");
    }

    #[test]
    fn missing_explicit_settings_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("absent.toml");
        assert!(load_settings(Some(&path)).is_err());
    }
}
