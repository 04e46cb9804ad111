use crate::api::CmsApi;
use crate::i18n::Language;
use crate::models::{InterfaceString, InterfaceTranslation};
use crate::notify::Notifier;
use crate::progress::{ProgressError, ProgressMonitor};
use crate::resource::ResourceLoader;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

const SAVE: &str = "Save interface translations";
const TRANSLATE: &str = "Translate interface";
const PUBLISH: &str = "Publish interface";

/// Merge edits into existing rows by `(string_id, language)`.
///
/// An edit replaces the row with the same key instead of being appended, so
/// the result never holds two translations of one string in one language.
/// Output is ordered by key.
pub fn merge_translations<I>(existing: &[InterfaceTranslation], edits: I) -> Vec<InterfaceTranslation>
where
    I: IntoIterator<Item = InterfaceTranslation>,
{
    let mut merged: BTreeMap<(u64, String), InterfaceTranslation> = existing
        .iter()
        .map(|row| ((row.string_id, row.language.clone()), row.clone()))
        .collect();

    for edit in edits {
        merged.insert((edit.string_id, edit.language.clone()), edit);
    }

    merged.into_values().collect()
}

/// Unsaved text for one language panel.
///
/// Owned by the panel that created it. Switching to another language always
/// rebuilds the buffer from the saved snapshot, discarding unsaved edits.
#[derive(Debug, Clone)]
pub struct EditBuffer {
    language: Language,
    values: BTreeMap<u64, String>,
    dirty: BTreeSet<u64>,
}

impl EditBuffer {
    pub fn new(language: Language, snapshot: &[InterfaceTranslation]) -> Self {
        let mut buffer = Self {
            language,
            values: BTreeMap::new(),
            dirty: BTreeSet::new(),
        };
        buffer.load(snapshot);
        buffer
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Switch panels. Unsaved edits for the previous language are lost.
    pub fn select_language(&mut self, language: Language, snapshot: &[InterfaceTranslation]) {
        if language == self.language {
            return;
        }
        if !self.dirty.is_empty() {
            debug!(
                "Discarding {} unsaved {} edits on switch to {}",
                self.dirty.len(),
                self.language,
                language
            );
        }
        self.language = language;
        self.load(snapshot);
    }

    fn load(&mut self, snapshot: &[InterfaceTranslation]) {
        self.values = snapshot
            .iter()
            .filter(|row| row.language == self.language.code())
            .map(|row| (row.string_id, row.translation.clone()))
            .collect();
        self.dirty.clear();
    }

    /// Fill in saved values that arrived after the panel opened.
    ///
    /// Strings the operator already edited keep their edited text.
    pub fn reconcile(&mut self, snapshot: &[InterfaceTranslation]) {
        for row in snapshot
            .iter()
            .filter(|row| row.language == self.language.code())
        {
            if !self.dirty.contains(&row.string_id) {
                self.values.insert(row.string_id, row.translation.clone());
            }
        }
    }

    pub fn edit(&mut self, string_id: u64, text: impl Into<String>) {
        self.values.insert(string_id, text.into());
        self.dirty.insert(string_id);
    }

    pub fn value(&self, string_id: u64) -> Option<&str> {
        self.values.get(&string_id).map(String::as_str)
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Unsaved edits as translation rows.
    pub fn pending(&self) -> Vec<InterfaceTranslation> {
        self.dirty
            .iter()
            .filter_map(|id| {
                self.values.get(id).map(|text| InterfaceTranslation {
                    string_id: *id,
                    language: self.language.code().to_string(),
                    translation: text.clone(),
                })
            })
            .collect()
    }

    fn mark_saved(&mut self) {
        self.dirty.clear();
    }
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Precondition(#[from] ProgressError),
    #[error("{operation} failed: {source:#}")]
    Remote {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

pub struct InterfaceWorkflow {
    api: Arc<dyn CmsApi>,
    strings: ResourceLoader<Vec<InterfaceString>>,
    translations: ResourceLoader<Vec<InterfaceTranslation>>,
    notifier: Notifier,
}

impl InterfaceWorkflow {
    pub fn new(
        api: Arc<dyn CmsApi>,
        strings: ResourceLoader<Vec<InterfaceString>>,
        translations: ResourceLoader<Vec<InterfaceTranslation>>,
        notifier: Notifier,
    ) -> Self {
        Self {
            api,
            strings,
            translations,
            notifier,
        }
    }

    /// Save the buffer's edits merged over the saved rows for its language.
    ///
    /// Returns how many edits were saved. On failure the edits stay in the
    /// buffer so the operator can retry.
    pub async fn save(&self, buffer: &mut EditBuffer) -> Result<usize, WorkflowError> {
        let edits = buffer.pending();
        if edits.is_empty() {
            return Ok(0);
        }
        let count = edits.len();

        let language = buffer.language();
        let saved: Vec<InterfaceTranslation> = self
            .translations
            .data()
            .into_iter()
            .filter(|row| row.language == language.code())
            .collect();
        let payload = merge_translations(&saved, edits);

        self.api
            .save_interface_translations(&payload)
            .await
            .map_err(|source| self.failed(SAVE, source))?;

        buffer.mark_saved();
        self.translations.invalidate();
        self.notifier
            .success(SAVE, format!("{} {} translations saved", count, language.name()));
        Ok(count)
    }

    /// Ask the CMS to machine-translate every interface string.
    ///
    /// Completion is only observable through the translations resource, which
    /// `monitor` samples until the batch reaches 100%.
    pub async fn translate_all(
        &self,
        monitor: &ProgressMonitor,
        languages: &[Language],
    ) -> Result<(), WorkflowError> {
        let item_count = self.strings.data().len();
        if let Err(err) = monitor.start(item_count, languages) {
            self.notifier.validation(TRANSLATE, err.to_string());
            return Err(err.into());
        }

        if let Err(source) = self.api.translate_interface(languages).await {
            monitor.abandon();
            return Err(self.failed(TRANSLATE, source));
        }

        let codes: Vec<&str> = languages.iter().map(Language::code).collect();
        self.notifier.success(
            TRANSLATE,
            format!("Translating {} strings into {}", item_count, codes.join(", ")),
        );
        Ok(())
    }

    pub async fn publish(&self, language: Language) -> Result<(), WorkflowError> {
        self.api
            .publish_interface(language)
            .await
            .map_err(|source| self.failed(PUBLISH, source))?;

        self.notifier
            .success(PUBLISH, format!("{} interface published", language.name()));
        Ok(())
    }

    fn failed(&self, operation: &'static str, source: anyhow::Error) -> WorkflowError {
        self.notifier.error(operation, &source);
        WorkflowError::Remote { operation, source }
    }
}
