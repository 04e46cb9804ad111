use crate::i18n::{parse_language_list, Language};
use anyhow::{Context, Result};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // CMS REST surface
    pub cms_base_url: String,
    pub cms_api_token: Option<String>,
    pub http_timeout: Duration,

    // Publishing
    /// Overrides the target languages from the settings resource when non-empty
    pub target_languages: Vec<Language>,

    // Polling
    pub job_poll_interval: Duration,
    pub progress_sample_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let target_languages = match std::env::var("TARGET_LANGUAGES") {
            Ok(raw) => parse_language_list(&raw).context("TARGET_LANGUAGES is invalid")?,
            Err(_) => Vec::new(),
        };

        Ok(Self {
            // CMS - base URL of the publishing plugin's REST namespace
            cms_base_url: std::env::var("CMS_BASE_URL")
                .context("CMS_BASE_URL not set")?
                .trim_end_matches('/')
                .to_string(),
            // Absent token means an anonymous session: nothing is fetched
            cms_api_token: std::env::var("CMS_API_TOKEN")
                .ok()
                .filter(|token| !token.trim().is_empty()),
            http_timeout: Duration::from_secs(env_or("HTTP_TIMEOUT_SECS", 30)),

            target_languages,

            job_poll_interval: Duration::from_millis(env_or("JOB_POLL_INTERVAL_MS", 2000)),
            progress_sample_interval: Duration::from_millis(env_or(
                "PROGRESS_SAMPLE_INTERVAL_MS",
                500,
            )),
        })
    }
}

fn env_or(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "CMS_BASE_URL",
        "CMS_API_TOKEN",
        "HTTP_TIMEOUT_SECS",
        "TARGET_LANGUAGES",
        "JOB_POLL_INTERVAL_MS",
        "PROGRESS_SAMPLE_INTERVAL_MS",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        std::env::set_var("CMS_BASE_URL", "https://cms.example.com/wp-json/publisher/v1/");

        let config = Config::from_env().expect("config should load");

        assert_eq!(config.cms_base_url, "https://cms.example.com/wp-json/publisher/v1");
        assert!(config.cms_api_token.is_none());
        assert!(config.target_languages.is_empty());
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.job_poll_interval, Duration::from_millis(2000));
        assert_eq!(config.progress_sample_interval, Duration::from_millis(500));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_requires_base_url() {
        clear_env();
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("CMS_BASE_URL"));
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var("CMS_BASE_URL", "http://localhost:8080");
        std::env::set_var("CMS_API_TOKEN", "secret");
        std::env::set_var("TARGET_LANGUAGES", "fr,de");
        std::env::set_var("JOB_POLL_INTERVAL_MS", "250");
        std::env::set_var("PROGRESS_SAMPLE_INTERVAL_MS", "not-a-number");

        let config = Config::from_env().expect("config should load");

        assert_eq!(config.cms_api_token.as_deref(), Some("secret"));
        let codes: Vec<_> = config.target_languages.iter().map(|l| l.code()).collect();
        assert_eq!(codes, vec!["fr", "de"]);
        assert_eq!(config.job_poll_interval, Duration::from_millis(250));
        assert_eq!(config.progress_sample_interval, Duration::from_millis(500));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_blank_token_means_anonymous() {
        clear_env();
        std::env::set_var("CMS_BASE_URL", "http://localhost:8080");
        std::env::set_var("CMS_API_TOKEN", "   ");

        let config = Config::from_env().unwrap();
        assert!(config.cms_api_token.is_none());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_target_languages() {
        clear_env();
        std::env::set_var("CMS_BASE_URL", "http://localhost:8080");
        std::env::set_var("TARGET_LANGUAGES", "fr,xx");

        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("TARGET_LANGUAGES"));
        clear_env();
    }
}
