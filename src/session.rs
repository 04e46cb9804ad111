use crate::api::CmsApi;
use crate::gate::ReadinessGate;
use crate::i18n::Language;
use crate::interface::InterfaceWorkflow;
use crate::models::{
    ArchiveContent, Category, CorrectionStats, InterfaceString, InterfaceTranslation, Post,
    SeoPost, Settings, Stats, TranslationJob,
};
use crate::notify::Notifier;
use crate::orchestrator::BatchOrchestrator;
use crate::poller::{mount_job_poller, JobPoller};
use crate::progress::ProgressMonitor;
use crate::resource::{ResourceKind, ResourceLoader};
use anyhow::Result;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth {
    Anonymous,
    Authenticated,
}

impl Auth {
    pub fn from_token(token: Option<&str>) -> Self {
        match token {
            Some(_) => Auth::Authenticated,
            None => Auth::Anonymous,
        }
    }
}

/// Every cached resource of the session.
#[derive(Clone)]
pub struct Resources {
    pub posts: ResourceLoader<Vec<Post>>,
    pub jobs: ResourceLoader<Vec<TranslationJob>>,
    pub settings: ResourceLoader<Settings>,
    pub categories: ResourceLoader<Vec<Category>>,
    pub archive: ResourceLoader<Vec<ArchiveContent>>,
    pub interface_strings: ResourceLoader<Vec<InterfaceString>>,
    pub interface_translations: ResourceLoader<Vec<InterfaceTranslation>>,
    pub correction_stats: ResourceLoader<CorrectionStats>,
    pub seo_posts: ResourceLoader<Vec<SeoPost>>,
    pub stats: ResourceLoader<Stats>,
}

impl Resources {
    fn connect(api: &Arc<dyn CmsApi>, auth: Auth) -> Self {
        Self {
            posts: connect(ResourceKind::Posts, api, auth, |api| {
                async move { api.list_posts().await }.boxed()
            }),
            jobs: connect(ResourceKind::Jobs, api, auth, |api| {
                async move { api.list_jobs().await }.boxed()
            }),
            settings: connect(ResourceKind::Settings, api, auth, |api| {
                async move { api.get_settings().await }.boxed()
            }),
            categories: connect(ResourceKind::Categories, api, auth, |api| {
                async move { api.list_categories().await }.boxed()
            }),
            archive: connect(ResourceKind::ArchiveContent, api, auth, |api| {
                async move { api.list_archive_content().await }.boxed()
            }),
            interface_strings: connect(ResourceKind::InterfaceStrings, api, auth, |api| {
                async move { api.list_interface_strings().await }.boxed()
            }),
            interface_translations: connect(ResourceKind::InterfaceTranslations, api, auth, |api| {
                async move { api.list_interface_translations().await }.boxed()
            }),
            correction_stats: connect(ResourceKind::CorrectionStats, api, auth, |api| {
                async move { api.get_correction_stats().await }.boxed()
            }),
            seo_posts: connect(ResourceKind::SeoPosts, api, auth, |api| {
                async move { api.list_seo_posts().await }.boxed()
            }),
            stats: connect(ResourceKind::Stats, api, auth, |api| {
                async move { api.get_stats().await }.boxed()
            }),
        }
    }

    fn loading_flags(&self) -> Vec<watch::Receiver<bool>> {
        vec![
            self.posts.loading_flag(),
            self.jobs.loading_flag(),
            self.settings.loading_flag(),
            self.categories.loading_flag(),
            self.archive.loading_flag(),
            self.interface_strings.loading_flag(),
            self.interface_translations.loading_flag(),
            self.correction_stats.loading_flag(),
            self.seo_posts.loading_flag(),
            self.stats.loading_flag(),
        ]
    }

    fn shutdown(&self) {
        self.posts.shutdown();
        self.jobs.shutdown();
        self.settings.shutdown();
        self.categories.shutdown();
        self.archive.shutdown();
        self.interface_strings.shutdown();
        self.interface_translations.shutdown();
        self.correction_stats.shutdown();
        self.seo_posts.shutdown();
        self.stats.shutdown();
    }
}

/// Build a loader and fire its first fetch, or a disabled one when anonymous.
fn connect<T, F>(kind: ResourceKind, api: &Arc<dyn CmsApi>, auth: Auth, fetch: F) -> ResourceLoader<T>
where
    T: Clone + Default + Send + Sync + 'static,
    F: Fn(Arc<dyn CmsApi>) -> BoxFuture<'static, Result<T>> + Send + Sync + 'static,
{
    if auth == Auth::Anonymous {
        return ResourceLoader::disabled(kind);
    }

    let api = Arc::clone(api);
    let loader = ResourceLoader::new(kind, move || fetch(Arc::clone(&api)));
    loader.load();
    loader
}

/// Built once per sign-in. Signing out consumes it; a new sign-in builds a
/// fresh one, which is the only way the readiness gate re-arms.
pub struct Session {
    api: Arc<dyn CmsApi>,
    auth: Auth,
    resources: Resources,
    gate: ReadinessGate,
    notifier: Notifier,
}

impl Session {
    /// Start every resource load concurrently and arm the readiness gate.
    ///
    /// Anonymous sessions issue no requests: every resource is empty and the
    /// gate is open from the start. Must be called inside a tokio runtime.
    pub fn start(api: Arc<dyn CmsApi>, auth: Auth) -> Self {
        let resources = Resources::connect(&api, auth);
        let gate = match auth {
            Auth::Authenticated => ReadinessGate::watch(resources.loading_flags()),
            Auth::Anonymous => ReadinessGate::settled(),
        };
        info!("Session started ({:?})", auth);

        Self {
            api,
            auth,
            resources,
            gate,
            notifier: Notifier::default(),
        }
    }

    pub fn auth(&self) -> Auth {
        self.auth
    }

    pub fn api(&self) -> Arc<dyn CmsApi> {
        Arc::clone(&self.api)
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    pub fn gate(&self) -> &ReadinessGate {
        &self.gate
    }

    pub fn is_initializing(&self) -> bool {
        self.gate.is_initializing()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// The language content is authored in, from the CMS settings.
    ///
    /// Falls back to the registry's canonical language when settings have not
    /// loaded, name no source, or name one the registry does not accept.
    pub fn source_language(&self) -> Language {
        match self.resources.settings.data().source_language {
            Some(code) => Language::from_code(&code).unwrap_or_else(|e| {
                warn!("Ignoring source language from settings: {}", e);
                Language::canonical()
            }),
            None => Language::canonical(),
        }
    }

    /// Target languages: the explicit override if given, else the settings.
    ///
    /// The source language is never a target. Codes in settings that the
    /// registry does not know or has disabled are skipped with a warning
    /// rather than failing the whole list.
    pub fn target_languages(&self, overrides: &[Language]) -> Vec<Language> {
        let source = self.source_language();
        let mut languages = Vec::new();
        let mut push = |language: Language| {
            if language != source && !languages.contains(&language) {
                languages.push(language);
            }
        };

        if !overrides.is_empty() {
            overrides.iter().copied().for_each(&mut push);
            return languages;
        }

        for code in self.resources.settings.data().target_languages {
            match Language::from_code(&code) {
                Ok(language) => push(language),
                Err(e) => warn!("Ignoring target language from settings: {}", e),
            }
        }
        languages
    }

    /// Poll the jobs list while the returned poller is alive.
    ///
    /// `None` for anonymous sessions, which never touch the network.
    pub fn mount_job_poller(&self, interval: Duration) -> Option<JobPoller> {
        match self.auth {
            Auth::Authenticated => Some(mount_job_poller(self.api(), interval)),
            Auth::Anonymous => None,
        }
    }

    pub fn orchestrator(&self, target_languages: Vec<Language>) -> BatchOrchestrator {
        BatchOrchestrator::new(
            self.api(),
            target_languages,
            self.resources.categories.clone(),
            self.notifier.clone(),
        )
    }

    pub fn interface_workflow(&self) -> InterfaceWorkflow {
        InterfaceWorkflow::new(
            self.api(),
            self.resources.interface_strings.clone(),
            self.resources.interface_translations.clone(),
            self.notifier.clone(),
        )
    }

    pub fn progress_monitor(&self, interval: Duration) -> ProgressMonitor {
        ProgressMonitor::spawn(self.resources.interface_translations.clone(), interval)
    }

    /// End the session. Responses still in flight are discarded.
    pub fn logout(self) {
        self.resources.shutdown();
        info!("Session ended");
    }
}
