use crate::category::vocabulary::{canonical_label, Vocabulary};
use crate::error::SourceError;
use crate::models::CanonicalCategory;

/// What to do with a label the vocabulary does not know.
///
/// Passed into every call rather than read from a global, so a deployment's
/// choice is explicit and both behaviors stay testable. Lenient is the
/// default policy: unknowns fold into `Other` (and are still counted in the
/// run tally, since silent bucketing can mask data-quality problems).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelPolicy {
    Lenient,
    Strict,
}

/// Resolve one raw label to its canonical category under the given policy.
///
/// Matching is case-insensitive and tolerant of whitespace and punctuation
/// variants; the vocabulary is per-state.
pub fn normalize(
    vocab: &Vocabulary,
    policy: LabelPolicy,
    raw_label: &str,
) -> Result<CanonicalCategory, SourceError> {
    let label = canonical_label(raw_label);
    match vocab.lookup(&label) {
        Some(category) => Ok(category),
        None => match policy {
            LabelPolicy::Lenient => Ok(CanonicalCategory::Other),
            LabelPolicy::Strict => Err(SourceError::UnmappedCategory {
                label: raw_label.trim().to_string(),
            }),
        },
    }
}
