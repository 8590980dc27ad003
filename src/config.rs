use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::compare::ComparisonResult;
use crate::ocr::{DEFAULT_OCR_LANGUAGE, DEFAULT_OCR_WHITELIST};

/// Invoked once per completed font evaluation with the font name, its
/// per-character comparison map and the completed fraction of the
/// catalog. Completion order across fonts is nondeterministic.
pub type ProgressFn = Arc<dyn Fn(&str, &BTreeMap<char, ComparisonResult>, f64) + Send + Sync>;

/// Configuration for one `recognize` call. The value is built per
/// call and threaded through every stage; nothing here is shared or
/// mutated once the call starts, so concurrent invocations cannot
/// observe each other's overrides.
///
/// Field names deserialize from the camelCase dialect used by catalog
/// tooling (`minSymbolConfidence`, `fontsDirectory`, ...). Unknown
/// keys are accepted and kept in `extras` but have no effect.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecognizeOptions {
    pub min_symbol_confidence: f32,
    pub analytic_comparison_threshold: f64,
    pub same_size_comparison: bool,
    pub fonts_directory: String,
    pub fonts_data: String,
    pub fonts_index: String,
    pub ocr_language: String,
    pub ocr_whitelist: String,
    #[serde(skip)]
    pub progress: Option<ProgressFn>,
    #[serde(flatten)]
    pub extras: BTreeMap<String, serde_json::Value>,
}

impl Default for RecognizeOptions {
    fn default() -> Self {
        Self {
            min_symbol_confidence: 30.0,
            analytic_comparison_threshold: 0.5,
            same_size_comparison: true,
            fonts_directory: "fonts".to_string(),
            fonts_data: "data.json".to_string(),
            fonts_index: "fonts/index.json".to_string(),
            ocr_language: DEFAULT_OCR_LANGUAGE.to_string(),
            ocr_whitelist: DEFAULT_OCR_WHITELIST.to_string(),
            progress: None,
            extras: BTreeMap::new(),
        }
    }
}

impl std::fmt::Debug for RecognizeOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognizeOptions")
            .field("min_symbol_confidence", &self.min_symbol_confidence)
            .field(
                "analytic_comparison_threshold",
                &self.analytic_comparison_threshold,
            )
            .field("same_size_comparison", &self.same_size_comparison)
            .field("fonts_directory", &self.fonts_directory)
            .field("fonts_data", &self.fonts_data)
            .field("fonts_index", &self.fonts_index)
            .field("ocr_language", &self.ocr_language)
            .field("ocr_whitelist", &self.ocr_whitelist)
            .field("progress", &self.progress.as_ref().map(|_| "<fn>"))
            .field("extras", &self.extras)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let options = RecognizeOptions::default();
        assert_eq!(options.min_symbol_confidence, 30.0);
        assert_eq!(options.fonts_index, "fonts/index.json");
        assert!(options.same_size_comparison);
        assert!(options.extras.is_empty());
    }

    #[test]
    fn deserializes_camel_case_keys() {
        let options: RecognizeOptions = serde_json::from_str(
            r#"{ "minSymbolConfidence": 55, "fontsDirectory": "refs", "sameSizeComparison": false }"#,
        )
        .expect("parse options");
        assert_eq!(options.min_symbol_confidence, 55.0);
        assert_eq!(options.fonts_directory, "refs");
        assert!(!options.same_size_comparison);
        // untouched fields keep their defaults
        assert_eq!(options.fonts_data, "data.json");
    }

    #[test]
    fn unknown_keys_are_stored_but_inert() {
        let options: RecognizeOptions =
            serde_json::from_str(r#"{ "futureKnob": 3, "minSymbolConfidence": 10 }"#)
                .expect("parse options");
        assert_eq!(options.extras["futureKnob"], serde_json::json!(3));
        assert_eq!(options.min_symbol_confidence, 10.0);
    }
}
