use std::collections::BTreeMap;

use crate::compare::ComparisonResult;

/// Mean of `(perceptual + analytical) / 2` across all compared
/// characters. An empty map has no mean; the NaN is handed back as-is
/// and callers rank such fonts as degenerate instead of failing.
pub fn average_similarity(comparisons: &BTreeMap<char, ComparisonResult>) -> f64 {
    let sum: f64 = comparisons
        .values()
        .map(|result| (result.perceptual + result.analytical) / 2.0)
        .sum();
    sum / comparisons.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_both_metrics() {
        let mut comparisons = BTreeMap::new();
        comparisons.insert(
            'a',
            ComparisonResult {
                perceptual: 0.8,
                analytical: 0.6,
            },
        );
        comparisons.insert(
            'b',
            ComparisonResult {
                perceptual: 0.4,
                analytical: 0.4,
            },
        );
        let similarity = average_similarity(&comparisons);
        assert!((similarity - 0.55).abs() < 1e-9);
    }

    #[test]
    fn empty_map_is_degenerate_not_fatal() {
        let comparisons = BTreeMap::new();
        assert!(average_similarity(&comparisons).is_nan());
    }
}
