//! ISO 639-1 codes to the language names and codes the upstream service uses

use crate::relay::error::{RelayError, RelayResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    /// ISO 639-1 code used by callers, e.g. `en`
    pub iso: &'static str,
    /// Canonical upstream name, e.g. `english`
    pub name: &'static str,
    /// Three-letter code of the translation API, e.g. `eng`
    pub api_code: &'static str,
}

const fn lang(iso: &'static str, name: &'static str, api_code: &'static str) -> Language {
    Language {
        iso,
        name,
        api_code,
    }
}

pub const LANGUAGES: &[Language] = &[
    lang("en", "english", "eng"),
    lang("ru", "russian", "rus"),
    lang("fr", "french", "fra"),
    lang("de", "german", "ger"),
    lang("es", "spanish", "spa"),
    lang("it", "italian", "ita"),
    lang("pt", "portuguese", "por"),
    lang("ar", "arabic", "ara"),
    lang("he", "hebrew", "heb"),
    lang("ja", "japanese", "jpn"),
    lang("nl", "dutch", "dut"),
    lang("pl", "polish", "pol"),
    lang("ro", "romanian", "rum"),
    lang("tr", "turkish", "tur"),
    lang("zh", "chinese", "chi"),
    lang("uk", "ukrainian", "ukr"),
];

pub fn by_iso(code: &str) -> Option<&'static Language> {
    let code = code.trim().to_lowercase();
    LANGUAGES.iter().find(|lang| lang.iso == code)
}

pub fn by_name(name: &str) -> Option<&'static Language> {
    let name = name.trim().to_lowercase();
    LANGUAGES.iter().find(|lang| lang.name == name)
}

/// Resolve an ISO code to the canonical upstream name
///
/// In lenient mode an unknown code is passed through unchanged and left for
/// the upstream service to judge.
pub fn resolve(code: &str, strict: bool) -> RelayResult<String> {
    match by_iso(code) {
        Some(lang) => Ok(lang.name.to_string()),
        None if strict => Err(RelayError::UnsupportedLanguage(code.to_string())),
        None => Ok(code.to_string()),
    }
}

/// Two-letter code the context service expects for a canonical name.
pub fn context_code(name: &str) -> String {
    by_name(name)
        .map(|lang| lang.iso.to_string())
        .unwrap_or_else(|| name.to_string())
}

/// Three-letter code the translation API expects for a canonical name.
pub fn api_code(name: &str) -> String {
    by_name(name)
        .map(|lang| lang.api_code.to_string())
        .unwrap_or_else(|| name.to_string())
}
