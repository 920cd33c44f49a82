use std::collections::BTreeMap;

use serde::Deserialize;

use crate::models::CanonicalCategory;

/// Reduce a raw label to its comparable form: upper-cased, punctuation
/// (hyphens included) collapsed to single spaces. Codes pass through the
/// same reduction, so `6-206(a)1` and `6 206 A 1` compare equal.
pub fn canonical_label(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_space = true;
    for c in raw.trim().chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_uppercase());
            last_was_space = false;
        } else if !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// One state's label vocabulary: explicit code overrides consulted first,
/// then keyword lists in a fixed order (FTA before FTP before road-safety,
/// matching how the source agencies' own glossaries disambiguate).
///
/// The same raw text may mean different things in different states, so
/// each state carries its own instance; there is no global dictionary.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    /// Exact action-code overrides, e.g. `SFTC = "FTP"`, `CDJD = "FTA"`.
    /// Keys are canonicalized on load so config spelling is forgiving.
    #[serde(deserialize_with = "canonical_codes")]
    pub codes: BTreeMap<String, CanonicalCategory>,
    pub fta_keywords: Vec<String>,
    pub ftp_keywords: Vec<String>,
    pub road_safety_keywords: Vec<String>,
}

fn canonical_codes<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, CanonicalCategory>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = BTreeMap::<String, CanonicalCategory>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(k, v)| (canonical_label(&k), v))
        .collect())
}

impl Vocabulary {
    /// A vocabulary pre-seeded with the keyword lists shared by most state
    /// glossaries; states layer their own codes on top.
    pub fn with_common_keywords() -> Self {
        Vocabulary {
            codes: BTreeMap::new(),
            fta_keywords: to_strings(&[
                "failure to appear",
                "fail to appear",
                "failure to answer",
                "fail to answer",
                "fta",
                "default judgment",
                "default judgement",
                "summons",
                "bench warrant",
            ]),
            ftp_keywords: to_strings(&[
                "failure to pay",
                "failed to pay",
                "fail to pay",
                "ftp",
                "failure to comply",
                "failed to comply",
                "fine",
                "unsatisfied judgment",
                "child support",
                "financial responsibility",
                "no liability insurance",
                "insurance",
                "sr22",
                "surcharge",
                "dishonored check",
                "failed to register",
                "fail to register",
            ]),
            road_safety_keywords: to_strings(&[
                "dui",
                "dwi",
                "alcohol",
                "bac",
                "intoxicated",
                "implied consent",
                "chemical test",
                "drug",
                "controlled substance",
                "leave scene",
                "hit and run",
                "accident",
                "crash",
                "vehicular assault",
                "vehicular homicide",
                "excessive points",
                "habitual",
                "reckless",
                "speeding",
                "racing",
                "out of service",
                "rail crossing",
            ]),
        }
    }

    /// Add (or override) an explicit code mapping.
    pub fn code(mut self, code: &str, category: CanonicalCategory) -> Self {
        self.codes.insert(canonical_label(code), category);
        self
    }

    /// Look a canonicalized label up: explicit codes first (whole label,
    /// then any embedded code token, left to right), then the keyword lists.
    pub fn lookup(&self, label: &str) -> Option<CanonicalCategory> {
        if let Some(cat) = self.codes.get(label) {
            return Some(*cat);
        }
        if !self.codes.is_empty() {
            for token in label.split_whitespace().filter(|t| is_code_token(t)) {
                if let Some(cat) = self.codes.get(token) {
                    return Some(*cat);
                }
            }
        }
        for (keywords, cat) in [
            (&self.fta_keywords, CanonicalCategory::Fta),
            (&self.ftp_keywords, CanonicalCategory::Ftp),
            (&self.road_safety_keywords, CanonicalCategory::RoadSafety),
        ] {
            if keywords
                .iter()
                .any(|kw| label.contains(canonical_label(kw).as_str()))
            {
                return Some(cat);
            }
        }
        None
    }
}

/// Code tokens are 2-5 characters of upper-case letters and digits
/// (e.g. `SFTC` in `SFTC - Suspended, failed to comply`, or the `SD45` in
/// a prefixed `FAST SD45`).
fn is_code_token(token: &str) -> bool {
    (2..=5).contains(&token.len())
        && token.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

fn to_strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_label_strips_punctuation() {
        assert_eq!(canonical_label("  Failure to Pay, fine. "), "FAILURE TO PAY FINE");
        assert_eq!(canonical_label("6-206(a)1"), "6 206 A 1");
        assert_eq!(canonical_label("SFTC"), "SFTC");
    }

    #[test]
    fn test_explicit_code_wins_over_keywords() {
        // CDHT would keyword-match nothing; SFTC maps explicitly.
        let vocab = Vocabulary::with_common_keywords()
            .code("SFTC", CanonicalCategory::Ftp)
            .code("RDUI", CanonicalCategory::RoadSafety);
        assert_eq!(
            vocab.lookup(&canonical_label("SFTC - failure to appear notice")),
            Some(CanonicalCategory::Ftp)
        );
        assert_eq!(
            vocab.lookup(&canonical_label("RDUI")),
            Some(CanonicalCategory::RoadSafety)
        );
    }

    #[test]
    fn test_keyword_order_fta_before_ftp() {
        let vocab = Vocabulary::with_common_keywords();
        // Contains both an FTA and an FTP keyword; FTA list is consulted first.
        assert_eq!(
            vocab.lookup(&canonical_label("failure to appear / failure to pay")),
            Some(CanonicalCategory::Fta)
        );
    }

    #[test]
    fn test_embedded_code_token() {
        // Mainframe exports prefix codes, e.g. `Fast.SD45`.
        let vocab = Vocabulary::default().code("SD45", CanonicalCategory::Fta);
        assert_eq!(
            vocab.lookup(&canonical_label("Fast.SD45")),
            Some(CanonicalCategory::Fta)
        );
    }

    #[test]
    fn test_unknown_label_is_none() {
        let vocab = Vocabulary::with_common_keywords();
        assert_eq!(vocab.lookup(&canonical_label("medical review")), None);
    }

    #[test]
    fn test_per_state_vocabularies_disagree() {
        // The same code can mean different things in different states.
        let a = Vocabulary::default().code("D45", CanonicalCategory::Fta);
        let b = Vocabulary::default().code("D45", CanonicalCategory::Other);
        let label = canonical_label("D45");
        assert_eq!(a.lookup(&label), Some(CanonicalCategory::Fta));
        assert_eq!(b.lookup(&label), Some(CanonicalCategory::Other));
    }
}
