use crate::i18n::Language;
use crate::models::InterfaceTranslation;
use crate::resource::ResourceLoader;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// How often an active batch re-samples the translations resource.
pub const PROGRESS_SAMPLE_INTERVAL: Duration = Duration::from_millis(500);

/// How long a finished batch keeps showing 100% before going idle.
pub const COMPLETION_GRACE: Duration = Duration::from_millis(2000);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgressError {
    #[error("no target languages selected")]
    NoTargetLanguages,
    #[error("there are no interface strings to translate")]
    NoSourceItems,
}

pub fn total_units(item_count: usize, language_count: usize) -> usize {
    item_count * language_count
}

/// Rows whose language is one of the active targets.
pub fn count_completed(rows: &[InterfaceTranslation], languages: &[Language]) -> usize {
    rows.iter()
        .filter(|row| languages.iter().any(|lang| lang.code() == row.language))
        .count()
}

/// Unrounded percentage, clamped to 100. Zero when there is nothing to do.
pub fn progress_percent(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (100.0 * completed as f64 / total as f64).min(100.0)
}

/// Remaining time by linear extrapolation; `None` outside `0 < percent < 100`.
pub fn estimate_remaining(elapsed: Duration, percent: f64) -> Option<Duration> {
    if percent <= 0.0 || percent >= 100.0 {
        return None;
    }
    let elapsed_secs = elapsed.as_secs_f64();
    let estimated_total = elapsed_secs / (percent / 100.0);
    Some(Duration::from_secs_f64((estimated_total - elapsed_secs).max(0.0)))
}

/// Counters behind one report. Derived on every sample, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSample {
    pub total_units: usize,
    pub completed_units: usize,
    pub started_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProgressReport {
    pub active: bool,
    /// Unrounded; compare against 100 with this, not the display value
    pub percent: f64,
    pub eta: Option<Duration>,
}

impl ProgressReport {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn display_percent(&self) -> u8 {
        self.percent.round().clamp(0.0, 100.0) as u8
    }

    pub fn eta_seconds(&self) -> Option<u64> {
        self.eta.map(|eta| eta.as_secs_f64().ceil() as u64)
    }

    pub fn is_complete(&self) -> bool {
        self.percent >= 100.0
    }
}

#[derive(Debug, Default)]
pub struct ProgressTracker {
    languages: Vec<Language>,
    total_units: usize,
    completed_units: usize,
    started_at: Option<Instant>,
    completed_at: Option<Instant>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin tracking a batch of `item_count` strings into `languages`.
    ///
    /// Rejected when there would be zero units of work; the tracker stays idle.
    pub fn start(
        &mut self,
        now: Instant,
        item_count: usize,
        languages: &[Language],
    ) -> Result<(), ProgressError> {
        if languages.is_empty() {
            return Err(ProgressError::NoTargetLanguages);
        }
        if item_count == 0 {
            return Err(ProgressError::NoSourceItems);
        }

        self.languages = languages.to_vec();
        self.total_units = total_units(item_count, languages.len());
        self.completed_units = 0;
        self.started_at = Some(now);
        self.completed_at = None;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn sample(&self) -> Option<ProgressSample> {
        self.started_at.map(|started_at| ProgressSample {
            total_units: self.total_units,
            completed_units: self.completed_units,
            started_at,
        })
    }

    /// Recompute from a translations snapshot.
    ///
    /// Once 100% is reached the report is held for [`COMPLETION_GRACE`], then
    /// the tracker resets to idle.
    pub fn observe(&mut self, now: Instant, rows: &[InterfaceTranslation]) -> ProgressReport {
        let Some(started_at) = self.started_at else {
            return ProgressReport::idle();
        };

        if let Some(completed_at) = self.completed_at {
            if now.saturating_duration_since(completed_at) >= COMPLETION_GRACE {
                self.reset();
                return ProgressReport::idle();
            }
            return ProgressReport {
                active: true,
                percent: 100.0,
                eta: None,
            };
        }

        self.completed_units = count_completed(rows, &self.languages);
        let percent = progress_percent(self.completed_units, self.total_units);

        if percent >= 100.0 {
            self.completed_at = Some(now);
        }

        ProgressReport {
            active: true,
            percent,
            eta: estimate_remaining(now.saturating_duration_since(started_at), percent),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Drives a [`ProgressTracker`] from the interface-translations resource.
///
/// While a batch is active the resource is refetched every sample interval
/// and a fresh [`ProgressReport`] is published; while idle nothing is fetched.
pub struct ProgressMonitor {
    tracker: Arc<Mutex<ProgressTracker>>,
    report: watch::Sender<ProgressReport>,
    task: JoinHandle<()>,
}

impl ProgressMonitor {
    pub fn spawn(translations: ResourceLoader<Vec<InterfaceTranslation>>, interval: Duration) -> Self {
        let tracker = Arc::new(Mutex::new(ProgressTracker::new()));
        let (report, _) = watch::channel(ProgressReport::idle());

        let task = {
            let tracker = Arc::clone(&tracker);
            let report = report.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    ticker.tick().await;

                    let active = tracker
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .is_active();
                    if !active {
                        continue;
                    }

                    translations.refresh().await;
                    let rows = translations.data();

                    let next = tracker
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .observe(Instant::now(), &rows);

                    if next.is_complete() && !report.borrow().is_complete() {
                        info!("Interface translation complete");
                    } else if !next.active && report.borrow().active {
                        debug!("Progress tracker back to idle");
                    }
                    report.send_replace(next);
                }
            })
        };

        Self {
            tracker,
            report,
            task,
        }
    }

    /// Start tracking a batch; publishes a 0% report immediately.
    pub fn start(&self, item_count: usize, languages: &[Language]) -> Result<(), ProgressError> {
        self.tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .start(Instant::now(), item_count, languages)?;

        info!(
            "Tracking interface translation: {} strings x {} languages",
            item_count,
            languages.len()
        );
        self.report.send_replace(ProgressReport {
            active: true,
            percent: 0.0,
            eta: None,
        });
        Ok(())
    }

    /// Drop back to idle, e.g. when the start signal itself failed.
    pub fn abandon(&self) {
        self.tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();
        self.report.send_replace(ProgressReport::idle());
    }

    pub fn is_active(&self) -> bool {
        self.tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_active()
    }

    pub fn report(&self) -> ProgressReport {
        *self.report.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressReport> {
        self.report.subscribe()
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceKind;
    use proptest::prelude::*;

    fn lang(code: &str) -> Language {
        Language::from_code(code).unwrap()
    }

    fn rows(count: usize, language: &str) -> Vec<InterfaceTranslation> {
        (0..count)
            .map(|i| InterfaceTranslation {
                string_id: i as u64,
                language: language.to_string(),
                translation: format!("t{}", i),
            })
            .collect()
    }

    #[test]
    fn test_total_units() {
        assert_eq!(total_units(5, 2), 10);
        assert_eq!(total_units(5, 0), 0);
    }

    #[test]
    fn test_count_completed_only_active_languages() {
        let mut snapshot = rows(3, "es");
        snapshot.extend(rows(2, "fr"));
        snapshot.extend(rows(4, "de"));

        assert_eq!(count_completed(&snapshot, &[lang("es"), lang("fr")]), 5);
    }

    #[test]
    fn test_progress_percent_clamps_and_handles_zero_total() {
        assert_eq!(progress_percent(0, 0), 0.0);
        assert_eq!(progress_percent(5, 10), 50.0);
        assert_eq!(progress_percent(15, 10), 100.0);
    }

    #[test]
    fn test_progress_percent_unrounded_below_complete() {
        let percent = progress_percent(999, 1000);
        assert!(percent < 100.0);
        let report = ProgressReport { active: true, percent, eta: None };
        assert_eq!(report.display_percent(), 100);
        assert!(!report.is_complete());
    }

    #[test]
    fn test_estimate_remaining_linear() {
        let remaining = estimate_remaining(Duration::from_secs(10), 25.0).unwrap();
        assert!((remaining.as_secs_f64() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_remaining_none_at_bounds() {
        assert_eq!(estimate_remaining(Duration::from_secs(10), 0.0), None);
        assert_eq!(estimate_remaining(Duration::from_secs(10), 100.0), None);
    }

    #[test]
    fn test_start_rejects_zero_units() {
        let mut tracker = ProgressTracker::new();
        let now = Instant::now();

        assert_eq!(tracker.start(now, 4, &[]), Err(ProgressError::NoTargetLanguages));
        assert_eq!(tracker.start(now, 0, &[lang("es")]), Err(ProgressError::NoSourceItems));
        assert!(!tracker.is_active());
        assert_eq!(tracker.observe(now, &rows(3, "es")), ProgressReport::idle());
    }

    #[test]
    fn test_incremental_progress_monotonic_and_exact_completion() {
        let mut tracker = ProgressTracker::new();
        let start = Instant::now();
        tracker.start(start, 5, &[lang("es"), lang("fr")]).unwrap();

        let mut last = 0.0;
        for completed in 0..=10usize {
            let mut snapshot = rows(completed.min(5), "es");
            snapshot.extend(rows(completed.saturating_sub(5), "fr"));
            let now = start + Duration::from_secs(completed as u64 + 1);

            let report = tracker.observe(now, &snapshot);
            assert!(report.percent >= last);
            assert_eq!(report.is_complete(), completed == 10);
            if completed == 0 {
                assert_eq!(report.eta_seconds(), None);
            }
            last = report.percent;
        }
        assert_eq!(last, 100.0);
    }

    #[test]
    fn test_observe_is_idempotent_for_same_snapshot() {
        let mut tracker = ProgressTracker::new();
        let start = Instant::now();
        tracker.start(start, 10, &[lang("es")]).unwrap();
        let snapshot = rows(5, "es");
        let now = start + Duration::from_secs(8);

        let first = tracker.observe(now, &snapshot);
        let second = tracker.observe(now, &snapshot);

        assert_eq!(first, second);
        assert_eq!(first.percent, 50.0);
        assert_eq!(first.eta_seconds(), Some(8));
    }

    #[test]
    fn test_completion_held_for_grace_then_idle() {
        let mut tracker = ProgressTracker::new();
        let start = Instant::now();
        tracker.start(start, 2, &[lang("es")]).unwrap();
        let done = start + Duration::from_secs(4);

        assert!(tracker.observe(done, &rows(2, "es")).is_complete());

        let held = tracker.observe(done + Duration::from_millis(1500), &[]);
        assert!(held.active);
        assert!(held.is_complete());

        let after = tracker.observe(done + COMPLETION_GRACE, &rows(2, "es"));
        assert_eq!(after, ProgressReport::idle());
        assert!(!tracker.is_active());
        assert!(tracker.sample().is_none());
    }

    #[test]
    fn test_sample_exposes_counters() {
        let mut tracker = ProgressTracker::new();
        let start = Instant::now();
        tracker.start(start, 3, &[lang("es"), lang("de")]).unwrap();
        tracker.observe(start, &rows(2, "de"));

        let sample = tracker.sample().unwrap();
        assert_eq!(sample.total_units, 6);
        assert_eq!(sample.completed_units, 2);
        assert_eq!(sample.started_at, start);
    }

    proptest! {
        #[test]
        fn prop_percent_bounded_and_monotonic(total in 1usize..500, a in 0usize..600, b in 0usize..600) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let p_lo = progress_percent(lo, total);
            let p_hi = progress_percent(hi, total);
            prop_assert!((0.0..=100.0).contains(&p_lo));
            prop_assert!(p_lo <= p_hi);
            prop_assert_eq!(p_hi >= 100.0, hi >= total);
        }
    }

    fn shared_rows_loader(
        source: Arc<Mutex<Vec<InterfaceTranslation>>>,
    ) -> ResourceLoader<Vec<InterfaceTranslation>> {
        ResourceLoader::new(ResourceKind::InterfaceTranslations, move || {
            let source = source.clone();
            async move { Ok::<_, anyhow::Error>(source.lock().unwrap().clone()) }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_tracks_batch_to_completion_then_idles() {
        let source = Arc::new(Mutex::new(Vec::new()));
        let monitor = ProgressMonitor::spawn(shared_rows_loader(source.clone()), PROGRESS_SAMPLE_INTERVAL);

        monitor.start(2, &[lang("es")]).unwrap();
        assert!(monitor.report().active);
        assert_eq!(monitor.report().percent, 0.0);

        *source.lock().unwrap() = rows(1, "es");
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(monitor.report().percent, 50.0);
        assert!(monitor.report().eta.is_some());

        *source.lock().unwrap() = rows(2, "es");
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(monitor.report().is_complete());

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert!(monitor.report().is_complete());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(monitor.report(), ProgressReport::idle());
        assert!(!monitor.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_does_not_fetch_while_idle() {
        let fetches = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let counter = fetches.clone();
        let loader: ResourceLoader<Vec<InterfaceTranslation>> =
            ResourceLoader::new(ResourceKind::InterfaceTranslations, move || {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                async { Ok::<_, anyhow::Error>(Vec::new()) }
            });
        let _monitor = ProgressMonitor::spawn(loader, PROGRESS_SAMPLE_INTERVAL);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fetches.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_abandon_resets() {
        let source = Arc::new(Mutex::new(Vec::new()));
        let monitor = ProgressMonitor::spawn(shared_rows_loader(source), PROGRESS_SAMPLE_INTERVAL);

        monitor.start(3, &[lang("fr")]).unwrap();
        monitor.abandon();

        assert!(!monitor.is_active());
        assert_eq!(monitor.report(), ProgressReport::idle());
    }
}
