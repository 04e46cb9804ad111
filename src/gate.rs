use futures::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Whether a set of loading flags has fully settled.
pub fn all_settled(loading: &[bool]) -> bool {
    loading.iter().all(|is_loading| !is_loading)
}

/// Opens once every loader has settled and never closes again. A loader that
/// never settles keeps the gate shut.
pub struct ReadinessGate {
    initializing: watch::Receiver<bool>,
    task: Option<JoinHandle<()>>,
}

impl ReadinessGate {
    /// Watch the given loading flags until all of them are false.
    pub fn watch(flags: Vec<watch::Receiver<bool>>) -> Self {
        let current: Vec<bool> = flags.iter().map(|flag| *flag.borrow()).collect();
        if all_settled(&current) {
            return Self::settled();
        }

        let (tx, initializing) = watch::channel(true);
        let count = flags.len();

        let task = tokio::spawn(async move {
            join_all(flags.into_iter().map(|mut flag| async move {
                let settled = flag.wait_for(|is_loading| !*is_loading).await.is_ok();
                if !settled {
                    // Loader torn down mid-load: it will never settle.
                    std::future::pending::<()>().await;
                }
            }))
            .await;

            debug!("Readiness gate open: {} resources settled", count);
            tx.send_replace(false);
        });

        Self {
            initializing,
            task: Some(task),
        }
    }

    /// An already-open gate, used when there is nothing to load.
    pub fn settled() -> Self {
        let (_, initializing) = watch::channel(false);
        Self {
            initializing,
            task: None,
        }
    }

    pub fn is_initializing(&self) -> bool {
        *self.initializing.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.initializing.clone()
    }

    /// Resolve once the gate is open. Never resolves if a loader stalls.
    pub async fn ready(&self) {
        let mut initializing = self.initializing.clone();
        let open = initializing.wait_for(|init| !*init).await.is_ok();
        if !open {
            // The sender only goes away when the gate is dropped mid-wait.
            std::future::pending::<()>().await;
        }
    }
}

impl Drop for ReadinessGate {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
