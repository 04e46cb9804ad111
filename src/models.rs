use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Server-side state of a translation job.
///
/// Jobs advance PENDING → RUNNING → COMPLETED | FAILED. Snapshots may arrive
/// out of order, so callers compare against the latest snapshot only and never
/// infer a regression from two polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationJob {
    pub id: u64,
    pub post_title: String,
    pub target_language: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

/// Count jobs per status in one snapshot, for status lines and summaries.
pub fn count_by_status(jobs: &[TranslationJob]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for job in jobs {
        *counts.entry(job.status.as_str()).or_insert(0) += 1;
    }
    counts
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub translated_languages: Vec<String>,
}

/// A category: the unit of work for batch translate-and-publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
    /// Language code → translated name. May include the source language.
    #[serde(default)]
    pub translations: BTreeMap<String, String>,
}

impl Category {
    /// Whether every target language has a non-empty translation.
    ///
    /// The source-language entry is ignored: it is the original, not a
    /// translation, so it neither satisfies nor blocks "translated".
    pub fn is_translated(&self, source: &str, targets: &[String]) -> bool {
        let wanted: Vec<&String> = targets.iter().filter(|lang| *lang != source).collect();
        !wanted.is_empty()
            && wanted.iter().all(|lang| {
                self.translations
                    .get(*lang)
                    .is_some_and(|text| !text.trim().is_empty())
            })
    }

    /// Target languages that still lack a translation.
    pub fn missing_languages<'a>(&self, source: &str, targets: &'a [String]) -> Vec<&'a str> {
        targets
            .iter()
            .filter(|lang| *lang != source)
            .filter(|lang| {
                self.translations
                    .get(*lang)
                    .map_or(true, |text| text.trim().is_empty())
            })
            .map(String::as_str)
            .collect()
    }
}

/// A localizable interface string. Read-only from the console's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceString {
    pub id: u64,
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub context: Option<String>,
}

/// One translation of one interface string. `(string_id, language)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceTranslation {
    pub string_id: u64,
    pub language: String,
    pub translation: String,
}

impl InterfaceTranslation {
    pub fn key(&self) -> (u64, &str) {
        (self.string_id, self.language.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub source_language: Option<String>,
    #[serde(default)]
    pub target_languages: Vec<String>,
}

/// Archive entries come in several shapes; `type` selects the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArchiveContent {
    Post {
        id: u64,
        title: String,
        language: String,
    },
    Category {
        id: u64,
        name: String,
        language: String,
    },
    InterfaceBundle {
        language: String,
        string_count: u64,
    },
}

impl ArchiveContent {
    pub fn language(&self) -> &str {
        match self {
            ArchiveContent::Post { language, .. }
            | ArchiveContent::Category { language, .. }
            | ArchiveContent::InterfaceBundle { language, .. } => language,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionStats {
    #[serde(default)]
    pub total_corrections: u64,
    /// Language code → corrections applied to machine output in that language
    #[serde(default)]
    pub by_language: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoPost {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub meta_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
}

impl SeoPost {
    pub fn is_complete(&self) -> bool {
        let filled = |field: &Option<String>| field.as_deref().is_some_and(|s| !s.trim().is_empty());
        filled(&self.meta_title) && filled(&self.meta_description)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    #[serde(default)]
    pub total_posts: u64,
    #[serde(default)]
    pub translated_posts: u64,
    #[serde(default)]
    pub total_jobs: u64,
    #[serde(default)]
    pub failed_jobs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_job_status_wire_format() {
        let job: TranslationJob = serde_json::from_value(json!({
            "id": 7,
            "postTitle": "Hello",
            "targetLanguage": "fr",
            "status": "RUNNING",
            "createdAt": "2024-05-01T10:00:00Z"
        }))
        .expect("job should decode");

        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.post_title, "Hello");
        assert!(!job.status.is_terminal());
    }

    #[test]
    fn test_unknown_job_status_is_rejected() {
        let result: Result<TranslationJob, _> = serde_json::from_value(json!({
            "id": 7,
            "postTitle": "Hello",
            "targetLanguage": "fr",
            "status": "PAUSED",
            "createdAt": "2024-05-01T10:00:00Z"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
    }

    #[test]
    fn test_count_by_status() {
        let job = |id, status| TranslationJob {
            id,
            post_title: format!("Post {}", id),
            target_language: "es".to_string(),
            status,
            created_at: Utc::now(),
        };
        let jobs = vec![
            job(1, JobStatus::Completed),
            job(2, JobStatus::Completed),
            job(3, JobStatus::Failed),
        ];

        let counts = count_by_status(&jobs);
        assert_eq!(counts.get("COMPLETED"), Some(&2));
        assert_eq!(counts.get("FAILED"), Some(&1));
        assert_eq!(counts.get("PENDING"), None);
    }

    #[test]
    fn test_category_translated_ignores_source_entry() {
        let category = Category {
            id: 1,
            name: "News".to_string(),
            translations: BTreeMap::from([
                ("en".to_string(), "News".to_string()),
                ("es".to_string(), "Noticias".to_string()),
            ]),
        };
        let targets = vec!["en".to_string(), "es".to_string()];

        assert!(category.is_translated("en", &targets));
    }

    #[test]
    fn test_category_source_only_is_not_translated() {
        let category = Category {
            id: 1,
            name: "News".to_string(),
            translations: BTreeMap::from([("en".to_string(), "News".to_string())]),
        };
        let targets = vec!["es".to_string(), "fr".to_string()];

        assert!(!category.is_translated("en", &targets));
        assert_eq!(category.missing_languages("en", &targets), vec!["es", "fr"]);
    }

    #[test]
    fn test_category_blank_translation_counts_as_missing() {
        let category = Category {
            id: 1,
            name: "News".to_string(),
            translations: BTreeMap::from([("es".to_string(), "  ".to_string())]),
        };
        let targets = vec!["es".to_string()];

        assert!(!category.is_translated("en", &targets));
    }

    #[test]
    fn test_archive_content_tagged_variants() {
        let entries: Vec<ArchiveContent> = serde_json::from_value(json!([
            {"type": "post", "id": 1, "title": "A", "language": "es"},
            {"type": "interface_bundle", "language": "fr", "string_count": 120}
        ]))
        .unwrap();

        assert_eq!(entries[0].language(), "es");
        assert!(matches!(
            entries[1],
            ArchiveContent::InterfaceBundle { string_count: 120, .. }
        ));
    }

    #[test]
    fn test_archive_content_unknown_type_rejected() {
        let result: Result<ArchiveContent, _> =
            serde_json::from_value(json!({"type": "video", "id": 1}));
        assert!(result.is_err());
    }

    #[test]
    fn test_settings_decode_source_and_targets() {
        let settings: Settings = serde_json::from_value(json!({
            "sourceLanguage": "fr",
            "targetLanguages": ["en", "es"],
            "autoPublish": true
        }))
        .unwrap();

        assert_eq!(settings.source_language.as_deref(), Some("fr"));
        assert_eq!(settings.target_languages, vec!["en", "es"]);
    }

    #[test]
    fn test_settings_defaults_for_missing_fields() {
        let settings: Settings = serde_json::from_value(json!({})).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_seo_post_completeness() {
        let mut post = SeoPost {
            id: 1,
            title: "T".to_string(),
            meta_title: Some("Title".to_string()),
            meta_description: None,
        };
        assert!(!post.is_complete());

        post.meta_description = Some("Description".to_string());
        assert!(post.is_complete());
    }
}
