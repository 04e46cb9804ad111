use anyhow::Result;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Posts,
    Jobs,
    Settings,
    Categories,
    ArchiveContent,
    InterfaceStrings,
    InterfaceTranslations,
    CorrectionStats,
    SeoPosts,
    Stats,
}

impl ResourceKind {
    pub fn name(self) -> &'static str {
        match self {
            ResourceKind::Posts => "posts",
            ResourceKind::Jobs => "jobs",
            ResourceKind::Settings => "settings",
            ResourceKind::Categories => "categories",
            ResourceKind::ArchiveContent => "archive-content",
            ResourceKind::InterfaceStrings => "interface-strings",
            ResourceKind::InterfaceTranslations => "interface-translations",
            ResourceKind::CorrectionStats => "correction-stats",
            ResourceKind::SeoPosts => "seo-posts",
            ResourceKind::Stats => "stats",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What consumers see: the data (or its empty default) and whether the first
/// load is still outstanding.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceState<T> {
    pub data: T,
    pub is_loading: bool,
}

type Fetch<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T>> + Send + Sync>;

struct Inner<T> {
    kind: ResourceKind,
    fetch: Option<Fetch<T>>,
    state: watch::Sender<ResourceState<T>>,
    loading: watch::Sender<bool>,
    open: Mutex<bool>,
}

/// Latest snapshot of one remote resource plus its first-load flag.
///
/// Cheap to clone; clones share the same snapshot. Writes go through a
/// [`crate::api::CmsApi`] mutation followed by [`ResourceLoader::invalidate`].
pub struct ResourceLoader<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for ResourceLoader<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> ResourceLoader<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    /// An enabled loader. Nothing is fetched until [`load`](Self::load) or
    /// [`refresh`](Self::refresh) is called.
    pub fn new<F, Fut>(kind: ResourceKind, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let boxed: Fetch<T> = Arc::new(move || fetch().boxed());
        Self::build(kind, Some(boxed), true)
    }

    /// A loader gated off by authentication: settled, empty, never fetches.
    pub fn disabled(kind: ResourceKind) -> Self {
        Self::build(kind, None, false)
    }

    fn build(kind: ResourceKind, fetch: Option<Fetch<T>>, is_loading: bool) -> Self {
        let (state, _) = watch::channel(ResourceState {
            data: T::default(),
            is_loading,
        });
        let (loading, _) = watch::channel(is_loading);

        Self {
            inner: Arc::new(Inner {
                kind,
                fetch,
                state,
                loading,
                open: Mutex::new(true),
            }),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.inner.kind
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.fetch.is_some()
    }

    pub fn is_loading(&self) -> bool {
        *self.inner.loading.borrow()
    }

    pub fn snapshot(&self) -> ResourceState<T> {
        self.inner.state.borrow().clone()
    }

    pub fn data(&self) -> T {
        self.inner.state.borrow().data.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ResourceState<T>> {
        self.inner.state.subscribe()
    }

    /// Loading flag alone, for the readiness gate.
    pub fn loading_flag(&self) -> watch::Receiver<bool> {
        self.inner.loading.subscribe()
    }

    /// Fetch and apply the result.
    ///
    /// Errors are absorbed: the previous data (or the empty default) stays in
    /// place and the loading flag still settles.
    pub async fn refresh(&self) {
        let Some(fetch) = self.inner.fetch.clone() else {
            return;
        };
        if !self.is_open() {
            debug!("{}: shut down, not fetching", self.inner.kind);
            return;
        }

        let result = fetch().await;

        let open = self.inner.open.lock().unwrap_or_else(PoisonError::into_inner);
        if !*open {
            debug!("{}: discarding response after shutdown", self.inner.kind);
            return;
        }

        match result {
            Ok(data) => {
                self.inner.state.send_replace(ResourceState {
                    data,
                    is_loading: false,
                });
            }
            Err(e) => {
                warn!("{}: load failed, keeping previous data: {:#}", self.inner.kind, e);
                self.inner.state.send_modify(|state| state.is_loading = false);
            }
        }
        self.inner.loading.send_if_modified(|loading| std::mem::replace(loading, false));
    }

    /// Start the initial load in the background.
    pub fn load(&self) {
        self.invalidate();
    }

    /// Schedule a refetch without waiting for it.
    pub fn invalidate(&self) {
        if !self.is_enabled() || !self.is_open() {
            return;
        }
        debug!("{}: invalidated", self.inner.kind);
        let loader = self.clone();
        tokio::spawn(async move { loader.refresh().await });
    }

    fn is_open(&self) -> bool {
        *self.inner.open.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stop fetching. Fetches already in flight finish but are discarded.
    pub fn shutdown(&self) {
        *self.inner.open.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::Notify;

    fn counting_loader(
        calls: Arc<AtomicU32>,
        fail_after: u32,
    ) -> ResourceLoader<Vec<u32>> {
        ResourceLoader::new(ResourceKind::Posts, move || {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n > fail_after {
                    anyhow::bail!("backend unreachable");
                }
                Ok(vec![n])
            }
        })
    }

    #[tokio::test]
    async fn test_new_loader_starts_loading_with_default() {
        let loader = counting_loader(Arc::new(AtomicU32::new(0)), 10);
        let state = loader.snapshot();

        assert!(state.is_loading);
        assert!(state.data.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_applies_data_and_settles() {
        let loader = counting_loader(Arc::new(AtomicU32::new(0)), 10);
        loader.refresh().await;

        assert_eq!(loader.snapshot(), ResourceState { data: vec![1], is_loading: false });
        assert!(!*loader.loading_flag().borrow());
    }

    #[tokio::test]
    async fn test_failed_first_load_settles_with_empty_default() {
        let loader = counting_loader(Arc::new(AtomicU32::new(0)), 0);
        loader.refresh().await;

        let state = loader.snapshot();
        assert!(!state.is_loading);
        assert!(state.data.is_empty());
    }

    #[tokio::test]
    async fn test_failed_refetch_keeps_last_good_data() {
        let loader = counting_loader(Arc::new(AtomicU32::new(0)), 1);
        loader.refresh().await;
        loader.refresh().await;

        assert_eq!(loader.data(), vec![1]);
    }

    #[tokio::test]
    async fn test_disabled_loader_never_fetches() {
        let loader: ResourceLoader<Vec<u32>> = ResourceLoader::disabled(ResourceKind::Stats);
        loader.load();
        loader.refresh().await;

        assert!(!loader.is_enabled());
        assert!(!loader.is_loading());
        assert!(loader.data().is_empty());
    }

    #[tokio::test]
    async fn test_invalidate_schedules_refetch() {
        let calls = Arc::new(AtomicU32::new(0));
        let loader = counting_loader(calls.clone(), 10);
        let mut rx = loader.subscribe();

        loader.invalidate();
        rx.changed().await.expect("loader should publish");

        assert_eq!(rx.borrow().data, vec![1]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_response_after_shutdown_is_discarded() {
        let release = Arc::new(Notify::new());
        let gate = release.clone();
        let loader: ResourceLoader<Vec<u32>> =
            ResourceLoader::new(ResourceKind::Jobs, move || {
                let gate = gate.clone();
                async move {
                    gate.notified().await;
                    Ok::<_, anyhow::Error>(vec![7])
                }
            });

        let pending = {
            let loader = loader.clone();
            tokio::spawn(async move { loader.refresh().await })
        };
        tokio::task::yield_now().await;

        loader.shutdown();
        release.notify_one();
        pending.await.unwrap();

        assert!(loader.data().is_empty());
        assert!(loader.is_loading());
    }

    #[tokio::test]
    async fn test_shut_down_loader_sends_nothing() {
        let calls = Arc::new(AtomicU32::new(0));
        let loader = counting_loader(calls.clone(), 10);
        loader.refresh().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        loader.shutdown();
        loader.refresh().await;
        loader.invalidate();
        tokio::task::yield_now().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(loader.data(), vec![1]);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ResourceKind::InterfaceTranslations.to_string(), "interface-translations");
        assert_eq!(ResourceKind::ArchiveContent.name(), "archive-content");
    }
}
