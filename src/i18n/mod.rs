//! Content-language support.
//!
//! The CMS publishes every post, category and interface string in one source
//! language and any number of target languages. This module is the single
//! place where language codes coming from settings, configuration or the
//! command line are validated.
//!
//! - `registry`: the static table of languages the publishing pipeline knows about
//! - `language`: a validated, copyable `Language` handle backed by the registry
//!
//! # Example
//!
//! ```rust,ignore
//! use multilingual_publisher::i18n::{parse_language_list, Language};
//!
//! let source = Language::canonical();
//! let targets = parse_language_list("es,fr,de")?;
//! ```

mod language;
mod registry;

pub use language::{parse_language_list, Language};
pub use registry::{LanguageConfig, LanguageRegistry};
