use crate::api::CmsApi;
use crate::i18n::Language;
use crate::models::Category;
use crate::notify::Notifier;
use crate::resource::ResourceLoader;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info};

const OPERATION: &str = "Translate categories";

/// Categories picked by the operator, in the order they were picked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<u64>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, id: u64) {
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
    }

    pub fn deselect(&mut self, id: u64) {
        self.ids.retain(|selected| *selected != id);
    }

    pub fn toggle(&mut self, id: u64) {
        if self.ids.contains(&id) {
            self.deselect(id);
        } else {
            self.select(id);
        }
    }

    pub fn ids(&self) -> &[u64] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn clear(&mut self) {
        self.ids.clear();
    }
}

impl FromIterator<u64> for Selection {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        let mut selection = Selection::new();
        for id in iter {
            selection.select(id);
        }
        selection
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStep {
    Translating,
    Publishing,
}

impl fmt::Display for BatchStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchStep::Translating => f.write_str("translate"),
            BatchStep::Publishing => f.write_str("publish"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Running {
        item: u64,
        step: BatchStep,
        /// 0-based position of `item` in the batch
        position: usize,
        total: usize,
    },
    Succeeded {
        items: usize,
    },
    Failed {
        item: u64,
        step: BatchStep,
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("select at least one target language before translating")]
    NoTargetLanguages,
    #[error("a batch is already running")]
    AlreadyRunning,
    #[error("{step} failed for category {item}: {source:#}")]
    Step {
        item: u64,
        step: BatchStep,
        #[source]
        source: anyhow::Error,
    },
}

/// Runs items strictly one after another; publish never starts before its
/// translate resolves. No cancellation and no timeout: a hung call stalls the
/// batch until the HTTP client gives up.
pub struct BatchOrchestrator {
    api: Arc<dyn CmsApi>,
    target_languages: Vec<Language>,
    categories: ResourceLoader<Vec<Category>>,
    notifier: Notifier,
    state: watch::Sender<BatchState>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag however the run ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl BatchOrchestrator {
    pub fn new(
        api: Arc<dyn CmsApi>,
        target_languages: Vec<Language>,
        categories: ResourceLoader<Vec<Category>>,
        notifier: Notifier,
    ) -> Self {
        let (state, _) = watch::channel(BatchState::Idle);
        Self {
            api,
            target_languages,
            categories,
            notifier,
            state,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> BatchState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<BatchState> {
        self.state.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Translate and publish every selected category, in order.
    ///
    /// The selection is cleared only after the last item publishes. On the
    /// first failure the remaining items are not attempted and the error is
    /// returned; the selection is left as it was.
    pub async fn run(&self, selection: &mut Selection) -> Result<(), BatchError> {
        if self.target_languages.is_empty() {
            let err = BatchError::NoTargetLanguages;
            self.notifier.validation(OPERATION, err.to_string());
            return Err(err);
        }
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(BatchError::AlreadyRunning);
        }
        let _in_flight = InFlight(&self.in_flight);

        let queue = selection.ids().to_vec();
        info!(
            "Starting batch: {} categories into {} languages",
            queue.len(),
            self.target_languages.len()
        );

        for (position, &item) in queue.iter().enumerate() {
            if let Err(err) = self.process(item, position, queue.len()).await {
                if let BatchError::Step { item, step, source } = &err {
                    self.state.send_replace(BatchState::Failed {
                        item: *item,
                        step: *step,
                        message: format!("{:#}", source),
                    });
                }
                self.notifier.error(OPERATION, &err);
                return Err(err);
            }
        }

        selection.clear();
        self.state.send_replace(BatchState::Succeeded { items: queue.len() });
        self.notifier
            .success(OPERATION, format!("{} categories translated and published", queue.len()));
        Ok(())
    }

    async fn process(&self, item: u64, position: usize, total: usize) -> Result<(), BatchError> {
        self.state.send_replace(BatchState::Running {
            item,
            step: BatchStep::Translating,
            position,
            total,
        });
        debug!("Category {}: translating", item);
        let translations = self
            .api
            .translate_category(item, &self.target_languages)
            .await
            .map_err(|source| BatchError::Step {
                item,
                step: BatchStep::Translating,
                source,
            })?;

        self.state.send_replace(BatchState::Running {
            item,
            step: BatchStep::Publishing,
            position,
            total,
        });
        debug!("Category {}: publishing {} translations", item, translations.len());
        self.api
            .publish_category(item, &translations)
            .await
            .map_err(|source| BatchError::Step {
                item,
                step: BatchStep::Publishing,
                source,
            })?;

        self.categories.invalidate();
        info!("Category {} published ({}/{})", item, position + 1, total);
        Ok(())
    }
}
