use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// Display languages offered by the selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Language {
    #[default]
    English,
    Portuguese,
    Spanish,
    French,
    German,
    Italian,
    Russian,
    Japanese,
    Korean,
    Chinese,
}

impl Language {
    /// Code used by the interface (and the config file).
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Portuguese => "pt",
            Language::Spanish => "es",
            Language::French => "fr",
            Language::German => "de",
            Language::Italian => "it",
            Language::Russian => "ru",
            Language::Japanese => "ja",
            Language::Korean => "ko",
            Language::Chinese => "zh",
        }
    }

    /// Code understood by the upstream provider's `lang` parameter.
    pub fn api_code(&self) -> &'static str {
        match self {
            Language::Korean => "kr",
            Language::Chinese => "zh_cn",
            other => other.as_str(),
        }
    }

    pub fn native_name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Portuguese => "Português",
            Language::Spanish => "Español",
            Language::French => "Français",
            Language::German => "Deutsch",
            Language::Italian => "Italiano",
            Language::Russian => "Русский",
            Language::Japanese => "日本語",
            Language::Korean => "한국어",
            Language::Chinese => "中文",
        }
    }

    pub const fn all() -> &'static [Language] {
        &[
            Language::English,
            Language::Portuguese,
            Language::Spanish,
            Language::French,
            Language::German,
            Language::Italian,
            Language::Russian,
            Language::Japanese,
            Language::Korean,
            Language::Chinese,
        ]
    }

    /// Lenient lookup: anything unrecognised falls back to English.
    pub fn resolve(code: &str) -> Self {
        Language::try_from(code).unwrap_or_default()
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Language {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.trim().to_lowercase();

        Language::all()
            .iter()
            .copied()
            .find(|lang| lang.as_str() == lower)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown language '{value}'. Supported languages: en, pt, es, fr, de, it, ru, ja, ko, zh."
                )
            })
    }
}

impl TryFrom<String> for Language {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Language::try_from(value.as_str())
    }
}

impl From<Language> for String {
    fn from(lang: Language) -> Self {
        lang.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_as_str_roundtrip() {
        for lang in Language::all() {
            let parsed = Language::try_from(lang.as_str()).expect("roundtrip should succeed");
            assert_eq!(*lang, parsed);
        }
    }

    #[test]
    fn api_codes_differ_for_korean_and_chinese() {
        assert_eq!(Language::Korean.api_code(), "kr");
        assert_eq!(Language::Chinese.api_code(), "zh_cn");
        assert_eq!(Language::Portuguese.api_code(), "pt");
        assert_eq!(Language::English.api_code(), "en");
    }

    #[test]
    fn unknown_language_error() {
        let err = Language::try_from("tlh").unwrap_err();
        assert!(err.to_string().contains("Unknown language"));
    }

    #[test]
    fn resolve_falls_back_to_english() {
        assert_eq!(Language::resolve("xx"), Language::English);
        assert_eq!(Language::resolve("FR"), Language::French);
    }
}
