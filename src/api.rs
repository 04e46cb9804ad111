use crate::config::Config;
use crate::i18n::Language;
use crate::models::{
    ArchiveContent, Category, CorrectionStats, InterfaceString, InterfaceTranslation, Post,
    SeoPost, Settings, Stats, TranslationJob,
};
use crate::retry::{is_retryable_error, with_retry_if, RetryConfig};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Language code → translated content, as returned by a category translation.
pub type CategoryTranslations = BTreeMap<String, String>;

#[async_trait]
pub trait CmsApi: Send + Sync {
    async fn list_posts(&self) -> Result<Vec<Post>>;
    async fn list_jobs(&self) -> Result<Vec<TranslationJob>>;
    async fn get_settings(&self) -> Result<Settings>;
    async fn list_categories(&self) -> Result<Vec<Category>>;
    async fn list_archive_content(&self) -> Result<Vec<ArchiveContent>>;
    async fn list_interface_strings(&self) -> Result<Vec<InterfaceString>>;
    async fn list_interface_translations(&self) -> Result<Vec<InterfaceTranslation>>;
    async fn get_correction_stats(&self) -> Result<CorrectionStats>;
    async fn list_seo_posts(&self) -> Result<Vec<SeoPost>>;
    async fn get_stats(&self) -> Result<Stats>;

    async fn translate_category(
        &self,
        category_id: u64,
        target_languages: &[Language],
    ) -> Result<CategoryTranslations>;
    async fn publish_category(
        &self,
        category_id: u64,
        translations: &CategoryTranslations,
    ) -> Result<()>;
    async fn save_interface_translations(&self, translations: &[InterfaceTranslation])
        -> Result<()>;
    /// Start signal only; completion shows up in the interface-translations resource.
    async fn translate_interface(&self, target_languages: &[Language]) -> Result<()>;
    async fn publish_interface(&self, target_language: Language) -> Result<()>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TargetLanguagesRequest<'a> {
    target_languages: Vec<&'a str>,
}

impl<'a> TargetLanguagesRequest<'a> {
    fn new(languages: &'a [Language]) -> Self {
        Self {
            target_languages: languages.iter().map(Language::code).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TranslateCategoryResponse {
    translations: CategoryTranslations,
}

#[derive(Debug, Serialize)]
struct PublishCategoryRequest<'a> {
    translations: &'a CategoryTranslations,
}

#[derive(Debug, Serialize)]
struct SaveTranslationsRequest<'a> {
    translations: &'a [InterfaceTranslation],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PublishInterfaceRequest<'a> {
    target_language: &'a str,
}

/// REST client for the publishing plugin.
#[derive(Clone)]
pub struct HttpCmsClient {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpCmsClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.cms_base_url.clone(),
            api_token: config.cms_api_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// GET with the read retry policy.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        with_retry_if(
            &RetryConfig::resource_read(),
            &format!("GET {}", path),
            || self.fetch_json::<T>(path),
            is_retryable_error,
        )
        .await
    }

    /// Single GET attempt, for callers that already retry on their own schedule.
    async fn fetch_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .authorize(self.client.get(self.url(path)))
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", path))?;

        let response = check_status(response).await?;
        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse response from {}", path))
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self.post(path, body).await?;
        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse response from {}", path))
    }

    /// Mutations are sent exactly once. Translate and publish calls start
    /// provider work on the server, so a failure is reported, never re-sent.
    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<reqwest::Response> {
        let response = self
            .authorize(self.client.post(self.url(path)))
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", path))?;

        check_status(response).await
    }
}

/// Turn a non-2xx response into an error carrying the status and body.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
    anyhow::bail!("CMS API error ({}): {}", status, body);
}

#[async_trait]
impl CmsApi for HttpCmsClient {
    async fn list_posts(&self) -> Result<Vec<Post>> {
        self.get_json("/posts").await
    }

    async fn list_jobs(&self) -> Result<Vec<TranslationJob>> {
        // Polled every tick; a failed poll is simply retried by the next one
        self.fetch_json("/jobs").await
    }

    async fn get_settings(&self) -> Result<Settings> {
        self.get_json("/settings").await
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        self.get_json("/categories").await
    }

    async fn list_archive_content(&self) -> Result<Vec<ArchiveContent>> {
        self.get_json("/archive").await
    }

    async fn list_interface_strings(&self) -> Result<Vec<InterfaceString>> {
        self.get_json("/interface/strings").await
    }

    async fn list_interface_translations(&self) -> Result<Vec<InterfaceTranslation>> {
        self.get_json("/interface/translations").await
    }

    async fn get_correction_stats(&self) -> Result<CorrectionStats> {
        self.get_json("/corrections/stats").await
    }

    async fn list_seo_posts(&self) -> Result<Vec<SeoPost>> {
        self.get_json("/seo/posts").await
    }

    async fn get_stats(&self) -> Result<Stats> {
        self.get_json("/stats").await
    }

    async fn translate_category(
        &self,
        category_id: u64,
        target_languages: &[Language],
    ) -> Result<CategoryTranslations> {
        let response: TranslateCategoryResponse = self
            .post_json(
                &format!("/categories/{}/translate", category_id),
                &TargetLanguagesRequest::new(target_languages),
            )
            .await?;
        Ok(response.translations)
    }

    async fn publish_category(
        &self,
        category_id: u64,
        translations: &CategoryTranslations,
    ) -> Result<()> {
        self.post(
            &format!("/categories/{}/publish", category_id),
            &PublishCategoryRequest { translations },
        )
        .await?;
        Ok(())
    }

    async fn save_interface_translations(
        &self,
        translations: &[InterfaceTranslation],
    ) -> Result<()> {
        self.post(
            "/interface/translations",
            &SaveTranslationsRequest { translations },
        )
        .await?;
        Ok(())
    }

    async fn translate_interface(&self, target_languages: &[Language]) -> Result<()> {
        self.post(
            "/interface/translate",
            &TargetLanguagesRequest::new(target_languages),
        )
        .await?;
        Ok(())
    }

    async fn publish_interface(&self, target_language: Language) -> Result<()> {
        self.post(
            "/interface/publish",
            &PublishInterfaceRequest {
                target_language: target_language.code(),
            },
        )
        .await?;
        Ok(())
    }
}
