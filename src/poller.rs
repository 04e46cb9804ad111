use crate::api::CmsApi;
use crate::models::TranslationJob;
use anyhow::Result;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// How often the jobs list is refetched while a jobs view is mounted.
pub const JOB_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Fetches on mount, on every tick and on request. Each success replaces the
/// snapshot; once unmounted no response is applied.
pub struct Poller<T> {
    name: &'static str,
    snapshot: watch::Receiver<T>,
    refresh: Arc<Notify>,
    mounted: Arc<Mutex<bool>>,
    task: JoinHandle<()>,
}

impl<T> Poller<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Start polling. The first fetch is issued immediately.
    pub fn mount<F, Fut>(name: &'static str, interval: Duration, initial: T, mut fetch: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (tx, snapshot) = watch::channel(initial);
        let refresh = Arc::new(Notify::new());
        let mounted = Arc::new(Mutex::new(true));

        let task = {
            let refresh = Arc::clone(&refresh);
            let mounted = Arc::clone(&mounted);
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    tokio::select! {
                        _ = ticker.tick() => {}
                        _ = refresh.notified() => ticker.reset(),
                    }

                    let result = fetch().await;

                    let is_mounted = mounted.lock().unwrap_or_else(PoisonError::into_inner);
                    if !*is_mounted {
                        debug!("{}: unmounted, dropping poll result", name);
                        return;
                    }
                    match result {
                        Ok(value) => {
                            tx.send_replace(value);
                        }
                        Err(e) => warn!("{}: poll failed, keeping last snapshot: {:#}", name, e),
                    }
                }
            })
        };

        debug!("{}: polling every {:?}", name, interval);
        Self {
            name,
            snapshot,
            refresh,
            mounted,
            task,
        }
    }

    pub fn snapshot(&self) -> T {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.snapshot.clone()
    }

    /// Fetch now instead of waiting for the next tick, e.g. after a mutation.
    pub fn refresh_now(&self) {
        self.refresh.notify_one();
    }

    pub fn is_mounted(&self) -> bool {
        *self.mounted.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stop polling. Responses still in flight are discarded.
    pub fn unmount(&self) {
        let mut mounted = self.mounted.lock().unwrap_or_else(PoisonError::into_inner);
        if *mounted {
            *mounted = false;
            self.task.abort();
            debug!("{}: polling stopped", self.name);
        }
    }
}

impl<T> Drop for Poller<T> {
    fn drop(&mut self) {
        *self.mounted.lock().unwrap_or_else(PoisonError::into_inner) = false;
        self.task.abort();
    }
}

/// Latest jobs list, refreshed on [`JOB_POLL_INTERVAL`].
pub type JobPoller = Poller<Vec<TranslationJob>>;

pub fn mount_job_poller(api: Arc<dyn CmsApi>, interval: Duration) -> JobPoller {
    Poller::mount("jobs", interval, Vec::new(), move || {
        let api = Arc::clone(&api);
        async move { api.list_jobs().await }
    })
}
