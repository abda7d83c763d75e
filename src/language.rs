use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::error::{ParleyError, Result};

/// Pivot language used when no direct model exists for a pair
pub const DEFAULT_PIVOT_LANGUAGE: &str = "en";

/// Ordered (source, target) language pair with normalized codes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LanguagePair {
    source: String,
    target: String,
}

impl LanguagePair {
    /// Build a pair from raw codes, trimming and lowercasing both.
    /// Fails when either code is empty after normalization.
    pub fn new(source: &str, target: &str) -> Result<Self> {
        let source = normalize_code(source);
        let target = normalize_code(target);

        if source.is_empty() || target.is_empty() {
            return Err(ParleyError::InvalidInput(format!(
                "Language codes must not be empty (source: '{}', target: '{}')",
                source, target
            )));
        }

        Ok(Self { source, target })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn is_identity(&self) -> bool {
        self.source == self.target
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.source, self.target)
    }
}

impl FromStr for LanguagePair {
    type Err = ParleyError;

    fn from_str(s: &str) -> Result<Self> {
        let (source, target) = s.split_once('-').ok_or_else(|| {
            ParleyError::Config(format!("Invalid language pair '{}', expected 'src-tgt'", s))
        })?;
        Self::new(source, target)
    }
}

/// Lowercase and trim a language code
pub fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}

/// Set of pairs that have a direct translation model.
///
/// Built once at start-up and never mutated afterwards; pivot eligibility is
/// derived from this set, so it has to match the models the loader can serve.
#[derive(Debug, Clone, Default)]
pub struct SupportedPairSet {
    pairs: HashSet<LanguagePair>,
}

impl SupportedPairSet {
    pub fn new<I: IntoIterator<Item = LanguagePair>>(pairs: I) -> Self {
        Self {
            pairs: pairs.into_iter().collect(),
        }
    }

    /// Parse `src-tgt` entries as they appear in configuration
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self> {
        let pairs = entries
            .iter()
            .map(|entry| entry.as_ref().parse::<LanguagePair>())
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(pairs))
    }

    pub fn contains(&self, pair: &LanguagePair) -> bool {
        self.pairs.contains(pair)
    }

    /// Lookup by raw codes; empty codes are never supported
    pub fn contains_codes(&self, source: &str, target: &str) -> bool {
        LanguagePair::new(source, target).is_ok_and(|pair| self.pairs.contains(&pair))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Pairs in a stable (sorted) order
    pub fn sorted(&self) -> Vec<LanguagePair> {
        let mut pairs: Vec<_> = self.pairs.iter().cloned().collect();
        pairs.sort();
        pairs
    }
}

/// Default direct-model catalog: every language paired with English both ways
pub fn default_supported_pairs() -> Vec<String> {
    const PARTNERS: [&str; 20] = [
        "es", "de", "it", "nl", "ru", "zh", "ja", "ko", "ar", "fr", "hi", "ben", "tam", "tl", "mr",
        "guj", "pnb", "ml", "ori", "asm",
    ];

    PARTNERS
        .iter()
        .flat_map(|code| [format!("en-{}", code), format!("{}-en", code)])
        .collect()
}

// Codes offered to clients for selection
const UI_LANGUAGES: [(&str, &str); 21] = [
    ("en", "English"),
    ("es", "Spanish"),
    ("de", "German"),
    ("it", "Italian"),
    ("ru", "Russian"),
    ("zh", "Chinese"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("ar", "Arabic"),
    ("fr", "French"),
    ("hi", "Hindi"),
    ("bn", "Bengali"),
    ("ta", "Tamil"),
    ("te", "Telugu"),
    ("mr", "Marathi"),
    ("gu", "Gujarati"),
    ("pa", "Punjabi"),
    ("kn", "Kannada"),
    ("ml", "Malayalam"),
    ("or", "Odia"),
    ("as", "Assamese"),
];

/// Code to display-name mapping served by `GET /api/languages`
pub fn language_names() -> BTreeMap<&'static str, &'static str> {
    UI_LANGUAGES.iter().copied().collect()
}

/// Convert a language code to its English name for prompts and logs
pub fn display_name(code: &str) -> String {
    let code = normalize_code(code);
    if let Some((_, name)) = UI_LANGUAGES.iter().find(|(c, _)| *c == code) {
        return name.to_string();
    }

    match code.as_str() {
        "nl" => "Dutch",
        "pt" => "Portuguese",
        "pl" => "Polish",
        "tr" => "Turkish",
        "th" => "Thai",
        "vi" => "Vietnamese",
        "sv" => "Swedish",
        "uk" => "Ukrainian",
        "tl" => "Tagalog",
        "ben" => "Bengali",
        "tam" => "Tamil",
        "guj" => "Gujarati",
        "pnb" => "Western Punjabi",
        "ori" => "Odia",
        "asm" => "Assamese",
        _ => return code, // Fallback to the code itself if not found
    }
    .to_string()
}
