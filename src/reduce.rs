use std::collections::{BTreeMap, BTreeSet};

/// Characters present in both glyph mappings. Pure intersection: the
/// inputs are never touched, so concurrent font evaluations sharing
/// one recognized-glyph map cannot corrupt each other's comparison
/// sets.
pub fn common_keys<A, B>(a: &BTreeMap<char, A>, b: &BTreeMap<char, B>) -> BTreeSet<char> {
    a.keys().filter(|key| b.contains_key(key)).copied().collect()
}
