//! Validated language handle.

use crate::i18n::{LanguageConfig, LanguageRegistry};
use anyhow::{bail, Result};
use std::fmt;

/// A language code that has been checked against the registry.
///
/// Only enabled languages can be constructed, so anything holding a
/// `Language` can send its code to the CMS without further validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Language {
    code: &'static str,
}

impl Language {
    /// Create a Language from an ISO 639-1 code.
    ///
    /// Surrounding whitespace is ignored and the code is matched
    /// case-insensitively, since settings pages tend to store "FR" or " fr".
    pub fn from_code(code: &str) -> Result<Language> {
        let normalized = code.trim().to_ascii_lowercase();

        match LanguageRegistry::get().get_by_code(&normalized) {
            Some(config) if config.enabled => Ok(Language { code: config.code }),
            Some(_) => bail!("Language '{}' is not enabled", normalized),
            None => bail!("Unknown language code: '{}'", code.trim()),
        }
    }

    /// The language content is authored in.
    pub fn canonical() -> Language {
        Language {
            code: LanguageRegistry::get().canonical().code,
        }
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Registry entry for this language.
    ///
    /// # Panics
    /// Never in practice: a `Language` can only be built from a registry entry.
    pub fn config(&self) -> &'static LanguageConfig {
        LanguageRegistry::get()
            .get_by_code(self.code)
            .expect("Language code should always be valid")
    }

    pub fn name(&self) -> &'static str {
        self.config().name
    }

    pub fn native_name(&self) -> &'static str {
        self.config().native_name
    }

    pub fn is_canonical(&self) -> bool {
        self.config().is_canonical
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code)
    }
}

/// Parse a comma-separated list of target language codes.
///
/// Empty segments are skipped and duplicates collapse onto their first
/// occurrence, so `"es, fr,,es"` yields `[es, fr]`. The source language is
/// only known once the CMS settings load, so it is filtered out later by the
/// session rather than here.
pub fn parse_language_list(input: &str) -> Result<Vec<Language>> {
    let mut languages = Vec::new();

    for segment in input.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let language = Language::from_code(segment)?;
        if !languages.contains(&language) {
            languages.push(language);
        }
    }

    Ok(languages)
}
