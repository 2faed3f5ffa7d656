//! Tiered title/abstract relevance classification
//!
//! Pure substring matching over lowercased title+abstract text, evaluated in
//! strict tier order: strong-positive, then negative, then weak-positive.
//! The order is the design: a strong-positive hit returns before negatives
//! are ever consulted, so a title like "Spatio-temporal Action Detection via
//! Interaction Modeling" classifies as relevant even though "interaction" is
//! a negative term.

use crate::keywords::CompiledTiers;
use crate::record::PaperRecord;

/// Classify one record from its title and (optional) abstract. Tier
/// keywords are already lowercased by
/// [`crate::keywords::KeywordConfig::compiled_tiers`].
pub fn classify(tiers: &CompiledTiers, record: &PaperRecord) -> bool {
    let text = record.search_text();

    if tiers.strong_positive.iter().any(|kw| text.contains(kw.as_str())) {
        return true;
    }
    if tiers.negative.iter().any(|kw| text.contains(kw.as_str())) {
        return false;
    }
    if tiers.weak_positive.iter().any(|kw| text.contains(kw.as_str())) {
        return true;
    }
    false
}
