use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const UNDETERMINED: &str = "und";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LangError {
    #[error("invalid language tag {tag:?}: {reason}")]
    InvalidLanguageTag { tag: String, reason: String },
}

/// A well-formed BCP 47 language tag, extensions and private use included.
///
/// The canonical form uses `-` as the subtag separator and the conventional
/// subtag casing, so `pt_br` and `pt-BR` validate to the same tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LanguageTag {
    tag: language_tags::LanguageTag,
    canonical: String,
}

/// Lower-case everything, then title-case scripts and upper-case regions
/// up to the first singleton (`u`, `x`, ...).
fn conventional_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_extension = false;
    for (i, subtag) in raw.split(['-', '_']).enumerate() {
        if i > 0 {
            out.push('-');
        }
        let lower = subtag.to_ascii_lowercase();
        if i > 0 && subtag.len() == 1 {
            in_extension = true;
        }
        if i == 0 || in_extension {
            out.push_str(&lower);
        } else if subtag.len() == 4 && subtag.chars().all(|c| c.is_ascii_alphabetic()) {
            let mut chars = lower.chars();
            if let Some(first) = chars.next() {
                out.push(first.to_ascii_uppercase());
                out.extend(chars);
            }
        } else if subtag.len() == 2 {
            out.push_str(&subtag.to_ascii_uppercase());
        } else {
            out.push_str(&lower);
        }
    }
    out
}

impl LanguageTag {
    pub fn parse(raw: &str) -> Result<Self, LangError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(LangError::InvalidLanguageTag {
                tag: raw.to_owned(),
                reason: "tag must not be empty".to_owned(),
            });
        }

        let canonical = conventional_case(trimmed);
        let tag = language_tags::LanguageTag::parse(&canonical).map_err(|e| {
            LangError::InvalidLanguageTag {
                tag: raw.to_owned(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self { tag, canonical })
    }

    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// Primary language subtag, e.g. `pt` for `pt-BR`.
    pub fn language(&self) -> &str {
        self.tag.primary_language()
    }

    pub fn script(&self) -> Option<&str> {
        self.tag.script()
    }

    pub fn region(&self) -> Option<&str> {
        self.tag.region()
    }

    /// `und` asks the provider to detect the language itself.
    pub fn is_undetermined(&self) -> bool {
        self.language() == UNDETERMINED
    }
}

impl FromStr for LanguageTag {
    type Err = LangError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl Serialize for LanguageTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.canonical)
    }
}

/// Source and target of one request. Validated once and then shared,
/// read-only, by every unit of work spawned for that request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LanguagePair {
    pub source: LanguageTag,
    pub target: LanguageTag,
}

impl LanguagePair {
    pub fn parse(source: &str, target: &str) -> Result<Self, LangError> {
        Ok(Self {
            source: LanguageTag::parse(source)?,
            target: LanguageTag::parse(target)?,
        })
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.source, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_and_regional_tags() {
        let en = LanguageTag::parse("en").expect("valid");
        assert_eq!(en.as_str(), "en");
        assert_eq!(en.region(), None);

        let pt = LanguageTag::parse("pt-BR").expect("valid");
        assert_eq!(pt.language(), "pt");
        assert_eq!(pt.region(), Some("BR"));
    }

    #[test]
    fn underscore_separator_is_canonicalised() {
        let tag = LanguageTag::parse("zh_hant_tw").expect("valid");
        assert_eq!(tag.as_str(), "zh-Hant-TW");
        assert_eq!(tag.script(), Some("Hant"));
        assert_eq!(tag.region(), Some("TW"));
    }

    #[test]
    fn extension_and_private_use_tags_are_accepted() {
        let buddhist = LanguageTag::parse("en-US-u-ca-buddhist").expect("valid");
        assert_eq!(buddhist.as_str(), "en-US-u-ca-buddhist");
        assert_eq!(buddhist.language(), "en");
        assert_eq!(buddhist.region(), Some("US"));

        let private = LanguageTag::parse("en-x-private").expect("valid");
        assert_eq!(private.language(), "en");
        assert_eq!(private.region(), None);

        let variant = LanguageTag::parse("de-DE-1996").expect("valid");
        assert_eq!(variant.region(), Some("DE"));
    }

    #[test]
    fn extension_subtags_keep_lower_case() {
        let tag = LanguageTag::parse("EN-us-X-AB").expect("valid");
        assert_eq!(tag.as_str(), "en-US-x-ab");
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let tag = LanguageTag::parse("  ja ").expect("valid");
        assert_eq!(tag.as_str(), "ja");
    }

    #[test]
    fn rejects_empty_and_malformed_tags() {
        for raw in ["", "   ", "e", "toolonglanguage", "12", "en--US", "en-!"] {
            let err = LanguageTag::parse(raw).expect_err(raw);
            let LangError::InvalidLanguageTag { tag, .. } = err;
            assert_eq!(tag, raw);
        }
    }

    #[test]
    fn undetermined_tag_is_recognised() {
        assert!(LanguageTag::parse("und").expect("valid").is_undetermined());
        assert!(!LanguageTag::parse("en").expect("valid").is_undetermined());
    }

    #[test]
    fn pair_fails_on_either_side() {
        assert!(LanguagePair::parse("en", "ja").is_ok());
        assert!(LanguagePair::parse("not a tag", "ja").is_err());
        assert!(LanguagePair::parse("en", "").is_err());
    }

    #[test]
    fn pair_display() {
        let pair = LanguagePair::parse("en", "pt-BR").expect("valid");
        assert_eq!(pair.to_string(), "en->pt-BR");
    }
}
