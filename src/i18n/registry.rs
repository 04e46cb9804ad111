//! Language registry: the languages the publishing pipeline can target.
//!
//! The table is built once on first access and is immutable afterwards, so it
//! can be shared freely between sessions without any locking.

use std::sync::OnceLock;

/// Metadata for one content language.
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// ISO 639-1 code used on the wire (e.g., "en", "fr")
    pub code: &'static str,

    /// English name, used in log lines and CLI output
    pub name: &'static str,

    /// Name in the language itself, shown in language pickers
    pub native_name: &'static str,

    /// Whether content is authored in this language (exactly one entry)
    pub is_canonical: bool,

    /// Whether the language may be selected as a translation target
    pub enabled: bool,
}

/// Immutable table of every known content language.
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
}

static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    /// Get the shared registry, building it on first use.
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| LanguageRegistry {
            languages: content_languages(),
        })
    }

    /// Look up a language by its ISO code.
    pub fn get_by_code(&self, code: &str) -> Option<&LanguageConfig> {
        self.languages.iter().find(|lang| lang.code == code)
    }

    /// Languages that can be chosen as translation targets.
    ///
    /// The canonical language is never a target of its own translations, so it
    /// is excluded even though it is enabled.
    pub fn list_targets(&self) -> Vec<&LanguageConfig> {
        self.languages
            .iter()
            .filter(|lang| lang.enabled && !lang.is_canonical)
            .collect()
    }

    /// Every registered language, including disabled ones.
    pub fn list_all(&self) -> Vec<&LanguageConfig> {
        self.languages.iter().collect()
    }

    /// The source language all content is authored in.
    ///
    /// # Panics
    /// Panics when the table does not contain exactly one canonical entry,
    /// which is a programming error in `content_languages`.
    pub fn canonical(&self) -> &LanguageConfig {
        let mut canonical = self.languages.iter().filter(|lang| lang.is_canonical);

        match (canonical.next(), canonical.next()) {
            (Some(lang), None) => lang,
            (None, _) => panic!("No canonical language found in registry"),
            (Some(_), Some(_)) => panic!("Multiple canonical languages found in registry"),
        }
    }

    /// Check if a code is known and enabled.
    pub fn is_enabled(&self, code: &str) -> bool {
        self.get_by_code(code).is_some_and(|lang| lang.enabled)
    }
}

fn content_languages() -> Vec<LanguageConfig> {
    const fn lang(
        code: &'static str,
        name: &'static str,
        native_name: &'static str,
        is_canonical: bool,
        enabled: bool,
    ) -> LanguageConfig {
        LanguageConfig {
            code,
            name,
            native_name,
            is_canonical,
            enabled,
        }
    }

    vec![
        lang("en", "English", "English", true, true),
        lang("es", "Spanish", "Español", false, true),
        lang("fr", "French", "Français", false, true),
        lang("de", "German", "Deutsch", false, true),
        lang("it", "Italian", "Italiano", false, true),
        lang("pt", "Portuguese", "Português", false, true),
        lang("nl", "Dutch", "Nederlands", false, true),
        lang("ja", "Japanese", "日本語", false, true),
        lang("zh", "Chinese", "中文", false, true),
        // Right-to-left rendering is not supported by the theme yet.
        lang("ar", "Arabic", "العربية", false, false),
    ]
}
