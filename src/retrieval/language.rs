//! Language tags, preference resolution and a script-based detector

use tracing::debug;

use crate::retrieval::collaborators::LanguageDetector;
use crate::retrieval::config::RetrieverConfig;
use crate::retrieval::types::DetectedLanguage;

/// Fallback language when nothing better is known
pub const FALLBACK_LANGUAGE: &str = "en";

/// Lowercase primary subtag of a BCP 47 style tag (`"pt_BR"` -> `"pt"`).
/// Blank tags yield `None`.
pub fn normalize_language_tag(tag: &str) -> Option<String> {
    let primary = tag
        .trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    if primary.is_empty() {
        None
    } else {
        Some(primary)
    }
}

/// Chunk-level language if present, else the document's language
pub fn effective_language(
    chunk_language: Option<&str>,
    document_language: Option<&str>,
) -> Option<String> {
    chunk_language
        .and_then(normalize_language_tag)
        .or_else(|| document_language.and_then(normalize_language_tag))
}

/// Ordered, de-duplicated languages to favor when ranking.
///
/// Caller-supplied preferences win. Without them a confident detection
/// yields `[detected, "en"]`, anything else `["en"]`.
pub fn resolve_preferred_languages(
    preferred: Option<&[String]>,
    detected: &DetectedLanguage,
    confidence_threshold: f64,
) -> Vec<String> {
    let candidates: Vec<String> = match preferred {
        Some(languages) => languages
            .iter()
            .filter_map(|tag| normalize_language_tag(tag))
            .collect(),
        None if detected.confidence >= confidence_threshold => {
            match normalize_language_tag(&detected.language) {
                Some(language) => vec![language, FALLBACK_LANGUAGE.to_string()],
                None => vec![FALLBACK_LANGUAGE.to_string()],
            }
        }
        None => vec![FALLBACK_LANGUAGE.to_string()],
    };

    let mut resolved: Vec<String> = Vec::with_capacity(candidates.len());
    for language in candidates {
        if !resolved.contains(&language) {
            resolved.push(language);
        }
    }
    resolved
}

/// Score bonus for a chunk in `language` given the preference list
pub fn language_bonus(language: Option<&str>, preferred: &[String], config: &RetrieverConfig) -> f64 {
    let Some(language) = language else {
        return 0.0;
    };
    match preferred.iter().position(|p| p == language) {
        Some(0) => config.primary_language_bonus,
        Some(1) => config.secondary_language_bonus,
        _ => 0.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Latin,
    Thai,
    Kana,
    Hangul,
    Han,
    Cyrillic,
    Greek,
    Arabic,
    Hebrew,
    Devanagari,
}

impl Script {
    fn of(c: char) -> Option<Self> {
        match c as u32 {
            0x0041..=0x005A | 0x0061..=0x007A | 0x00C0..=0x024F => Some(Script::Latin),
            0x0E00..=0x0E7F => Some(Script::Thai),
            0x3040..=0x30FF | 0x31F0..=0x31FF => Some(Script::Kana),
            0xAC00..=0xD7AF | 0x1100..=0x11FF | 0x3130..=0x318F => Some(Script::Hangul),
            0x4E00..=0x9FFF | 0x3400..=0x4DBF => Some(Script::Han),
            0x0400..=0x04FF => Some(Script::Cyrillic),
            0x0370..=0x03FF => Some(Script::Greek),
            0x0600..=0x06FF | 0x0750..=0x077F => Some(Script::Arabic),
            0x0590..=0x05FF => Some(Script::Hebrew),
            0x0900..=0x097F => Some(Script::Devanagari),
            _ => None,
        }
    }

    fn language(self) -> &'static str {
        match self {
            Script::Latin => "en",
            Script::Thai => "th",
            Script::Kana => "ja",
            Script::Hangul => "ko",
            Script::Han => "zh",
            Script::Cyrillic => "ru",
            Script::Greek => "el",
            Script::Arabic => "ar",
            Script::Hebrew => "he",
            Script::Devanagari => "hi",
        }
    }
}

/// Detects the language from the dominant writing system of the text.
///
/// Non-Latin scripts map to one language with confidence equal to the share
/// of letters in that script. Latin text is shared by too many languages to
/// tell apart this way, so it reports English with confidence capped at
/// `latin_confidence`.
#[derive(Debug, Clone)]
pub struct ScriptLanguageDetector {
    latin_confidence: f64,
}

impl Default for ScriptLanguageDetector {
    fn default() -> Self {
        Self {
            latin_confidence: 0.5,
        }
    }
}

impl ScriptLanguageDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latin_confidence(latin_confidence: f64) -> Self {
        Self { latin_confidence }
    }
}

impl LanguageDetector for ScriptLanguageDetector {
    fn detect(&self, text: &str) -> DetectedLanguage {
        let mut counts: Vec<(Script, usize)> = Vec::new();
        let mut total = 0usize;

        for script in text.chars().filter_map(Script::of) {
            total += 1;
            match counts.iter_mut().find(|(s, _)| *s == script) {
                Some((_, n)) => *n += 1,
                None => counts.push((script, 1)),
            }
        }

        // Kana marks Japanese even when Han characters dominate
        let has_kana = counts.iter().any(|(s, _)| *s == Script::Kana);

        let Some((script, count)) = counts
            .iter()
            .copied()
            .filter(|(s, _)| !(has_kana && *s == Script::Han))
            .max_by_key(|(_, n)| *n)
        else {
            return DetectedLanguage::unknown();
        };

        let count = if script == Script::Kana {
            count
                + counts
                    .iter()
                    .find(|(s, _)| *s == Script::Han)
                    .map(|(_, n)| *n)
                    .unwrap_or(0)
        } else {
            count
        };

        let mut confidence = count as f64 / total as f64;
        if script == Script::Latin {
            confidence = confidence.min(self.latin_confidence);
        }

        debug!(language = script.language(), confidence, "Detected query language");
        DetectedLanguage::new(script.language(), confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn langs(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_normalize_language_tag() {
        assert_eq!(normalize_language_tag("EN-us").as_deref(), Some("en"));
        assert_eq!(normalize_language_tag(" pt_BR ").as_deref(), Some("pt"));
        assert_eq!(normalize_language_tag("th").as_deref(), Some("th"));
        assert_eq!(normalize_language_tag("  "), None);
        assert_eq!(normalize_language_tag("-x"), None);
    }

    #[test]
    fn test_effective_language_falls_back_to_document() {
        assert_eq!(effective_language(Some("th"), Some("en")).as_deref(), Some("th"));
        assert_eq!(effective_language(None, Some("en-GB")).as_deref(), Some("en"));
        assert_eq!(effective_language(Some(""), Some("ja")).as_deref(), Some("ja"));
        assert_eq!(effective_language(None, None), None);
    }

    #[test]
    fn test_resolve_caller_preferences() {
        let preferred = langs(&["TH", "en", "th-TH", ""]);
        let detected = DetectedLanguage::new("ja", 0.99);
        assert_eq!(
            resolve_preferred_languages(Some(&preferred), &detected, 0.6),
            langs(&["th", "en"])
        );
    }

    #[test]
    fn test_resolve_from_detection() {
        let confident = DetectedLanguage::new("th", 0.6);
        assert_eq!(
            resolve_preferred_languages(None, &confident, 0.6),
            langs(&["th", "en"])
        );

        let unsure = DetectedLanguage::new("th", 0.59);
        assert_eq!(resolve_preferred_languages(None, &unsure, 0.6), langs(&["en"]));

        let english = DetectedLanguage::new("en", 0.9);
        assert_eq!(resolve_preferred_languages(None, &english, 0.6), langs(&["en"]));
    }

    #[test]
    fn test_language_bonus() {
        let config = RetrieverConfig::default();
        let preferred = langs(&["th", "en"]);
        assert_eq!(language_bonus(Some("th"), &preferred, &config), 0.02);
        assert_eq!(language_bonus(Some("en"), &preferred, &config), 0.01);
        assert_eq!(language_bonus(Some("ja"), &preferred, &config), 0.0);
        assert_eq!(language_bonus(None, &preferred, &config), 0.0);
    }

    #[test]
    fn test_script_detector() {
        let detector = ScriptLanguageDetector::new();

        let thai = detector.detect("สวัสดีครับ");
        assert_eq!(thai.language, "th");
        assert!(thai.confidence >= 0.99);

        let japanese = detector.detect("東京駅へのアクセス");
        assert_eq!(japanese.language, "ja");

        let korean = detector.detect("안녕하세요");
        assert_eq!(korean.language, "ko");

        let english = detector.detect("how do I reset my password");
        assert_eq!(english.language, "en");
        assert!(english.confidence < 0.6);

        let empty = detector.detect("1234 !?");
        assert_eq!(empty, DetectedLanguage::unknown());
    }
}
