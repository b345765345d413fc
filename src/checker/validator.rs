// src/checker/validator.rs
// =============================================================================
// Checks every image question in a document set and keeps a live tally.
//
// How a run works:
// 1. Collect every question with contentType "image", in exam -> section ->
//    question order
// 2. Reset the tally and publish {total: n, pending: n} right away
// 3. Spawn a task that probes all URLs concurrently (at most
//    `max_concurrent` at once, each bounded by a timeout)
// 4. As each probe finishes, in whatever order, mark its status and move
//    one from `pending` to `working` or `broken`
//
// `validate_all` returns as soon as the task is spawned. Callers that need
// the final numbers await the returned `ValidationRun`; callers that want
// progress subscribe to the watch channel.
//
// Shared state lives behind one Mutex, so a status change and its counter
// change always happen together. Every run gets a generation number; a
// result from an older run (the user re-imported mid-check) is dropped.
//
// Statuses are keyed by position (exam, section, question), not by `_id`,
// so two questions sharing an `_id` never overwrite each other.
// =============================================================================

use super::probe::{ImageProber, ProbeOutcome};
use crate::config::ProbeSettings;
use crate::exam::ImportedExam;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Position of a question inside a document set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ProbeKey {
    pub exam: usize,
    pub section: usize,
    pub question: usize,
}

/// One image URL to check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeTarget {
    #[serde(flatten)]
    pub key: ProbeKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub url: String,
}

/// State of a single image link
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImageLinkStatus {
    Unchecked,
    Valid,
    Error { reason: String },
}

impl From<ProbeOutcome> for ImageLinkStatus {
    fn from(outcome: ProbeOutcome) -> Self {
        match outcome {
            ProbeOutcome::Valid => ImageLinkStatus::Valid,
            ProbeOutcome::Broken { reason } => ImageLinkStatus::Error { reason },
        }
    }
}

/// Aggregate counts. `working + broken + pending == total` at all times.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImageStats {
    pub total: usize,
    pub working: usize,
    pub broken: usize,
    pub pending: usize,
}

impl ImageStats {
    /// n checks outstanding, none finished
    pub fn outstanding(total: usize) -> Self {
        Self {
            total,
            pending: total,
            ..Default::default()
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.working + self.broken + self.pending == self.total
    }

    pub fn is_complete(&self) -> bool {
        self.pending == 0
    }

    fn count(&mut self, status: &ImageLinkStatus) {
        self.total += 1;
        match status {
            ImageLinkStatus::Unchecked => self.pending += 1,
            ImageLinkStatus::Valid => self.working += 1,
            ImageLinkStatus::Error { .. } => self.broken += 1,
        }
    }
}

/// A target together with its current status, for reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageCheck {
    #[serde(flatten)]
    pub target: ProbeTarget,
    #[serde(flatten)]
    pub status: ImageLinkStatus,
}

/// Every image question in discovery order
pub fn collect_image_targets(exams: &[ImportedExam]) -> Vec<ProbeTarget> {
    let mut targets = Vec::new();

    for (exam_idx, exam) in exams.iter().enumerate() {
        for (section_idx, section) in exam.sections().iter().enumerate() {
            for (question_idx, question) in section.questions().iter().enumerate() {
                if !question.is_image() {
                    continue;
                }
                targets.push(ProbeTarget {
                    key: ProbeKey {
                        exam: exam_idx,
                        section: section_idx,
                        question: question_idx,
                    },
                    id: question.id.clone(),
                    url: question.question.clone().unwrap_or_default(),
                });
            }
        }
    }

    targets
}

/// Concurrency and timeout for a validator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorSettings {
    /// 0 = no limit
    pub max_concurrent: usize,
    /// None = wait forever
    pub probe_timeout: Option<Duration>,
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self::from(&ProbeSettings::default())
    }
}

impl From<&ProbeSettings> for ValidatorSettings {
    fn from(settings: &ProbeSettings) -> Self {
        Self {
            max_concurrent: settings.max_concurrent,
            probe_timeout: (settings.timeout_secs > 0)
                .then(|| Duration::from_secs(settings.timeout_secs)),
        }
    }
}

#[derive(Debug, Default)]
struct ValidationState {
    generation: u64,
    targets: Vec<ProbeTarget>,
    statuses: HashMap<ProbeKey, ImageLinkStatus>,
    stats: ImageStats,
}

fn lock(state: &Mutex<ValidationState>) -> MutexGuard<'_, ValidationState> {
    // every update is a few integer writes, a poisoned lock is still consistent
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to a running validation
#[derive(Debug)]
pub struct ValidationRun {
    generation: u64,
    total: usize,
    handle: JoinHandle<ImageStats>,
}

impl ValidationRun {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Waits for every probe of this run and returns this run's tally,
    /// even if a newer run has since replaced the shared state
    pub async fn wait(self) -> ImageStats {
        match self.handle.await {
            Ok(stats) => stats,
            Err(e) => {
                warn!("image check #{} did not finish: {}", self.generation, e);
                ImageStats::outstanding(self.total)
            }
        }
    }
}

/// Owns the image status map and tally for one document set at a time
pub struct LinkValidator<P> {
    prober: Arc<P>,
    settings: ValidatorSettings,
    state: Arc<Mutex<ValidationState>>,
    progress: Arc<watch::Sender<ImageStats>>,
}

impl<P: ImageProber + 'static> LinkValidator<P> {
    pub fn new(prober: P, settings: ValidatorSettings) -> Self {
        let (progress, _) = watch::channel(ImageStats::default());
        Self {
            prober: Arc::new(prober),
            settings,
            state: Arc::new(Mutex::new(ValidationState::default())),
            progress: Arc::new(progress),
        }
    }

    /// Live tally updates
    pub fn subscribe(&self) -> watch::Receiver<ImageStats> {
        self.progress.subscribe()
    }

    #[cfg(test)]
    pub fn stats(&self) -> ImageStats {
        lock(&self.state).stats
    }

    #[cfg(test)]
    pub fn generation(&self) -> u64 {
        lock(&self.state).generation
    }

    #[cfg(test)]
    pub fn status(&self, key: &ProbeKey) -> Option<ImageLinkStatus> {
        lock(&self.state).statuses.get(key).cloned()
    }

    /// Every target of the current run with its status, in discovery order
    pub fn checks(&self) -> Vec<ImageCheck> {
        let state = lock(&self.state);
        state
            .targets
            .iter()
            .map(|target| ImageCheck {
                target: target.clone(),
                status: state
                    .statuses
                    .get(&target.key)
                    .cloned()
                    .unwrap_or(ImageLinkStatus::Unchecked),
            })
            .collect()
    }

    /// Tally recomputed for a subset of exams (a filtered view)
    pub fn stats_for(&self, exams: &[usize]) -> ImageStats {
        let wanted: HashSet<usize> = exams.iter().copied().collect();
        let state = lock(&self.state);

        let mut stats = ImageStats::default();
        for (key, status) in &state.statuses {
            if wanted.contains(&key.exam) {
                stats.count(status);
            }
        }
        stats
    }

    /// Starts checking every image question in `exams`.
    ///
    /// Replaces the previous run's statuses immediately. Results of any run
    /// still in flight are ignored from now on.
    pub fn validate_all(&self, exams: &[ImportedExam]) -> ValidationRun {
        let targets = collect_image_targets(exams);
        let total = targets.len();

        let generation = {
            let mut state = lock(&self.state);
            state.generation += 1;
            state.stats = ImageStats::default();
            self.progress.send_replace(state.stats);

            state.statuses = targets
                .iter()
                .map(|t| (t.key, ImageLinkStatus::Unchecked))
                .collect();
            state.targets = targets.clone();
            state.stats = ImageStats::outstanding(total);
            self.progress.send_replace(state.stats);
            state.generation
        };

        info!("checking {} image link(s)", total);

        let limit = match self.settings.max_concurrent {
            0 => total.max(1),
            n => n,
        };
        let timeout = self.settings.probe_timeout;
        let prober = Arc::clone(&self.prober);
        let state = Arc::clone(&self.state);
        let progress = Arc::clone(&self.progress);

        let handle = tokio::spawn(async move {
            let probes = targets.into_iter().map(|target| {
                let prober = Arc::clone(&prober);
                let state = Arc::clone(&state);
                let progress = Arc::clone(&progress);
                async move {
                    let outcome = run_probe(prober.as_ref(), &target.url, timeout).await;
                    debug!("{} -> {:?}", target.url, outcome);
                    record(&state, &progress, generation, target.key, &outcome);
                    outcome
                }
            });

            let outcomes: Vec<ProbeOutcome> = stream::iter(probes)
                .buffer_unordered(limit)
                .collect()
                .await;

            let working = outcomes.iter().filter(|o| o.is_valid()).count();
            ImageStats {
                total,
                working,
                broken: outcomes.len() - working,
                pending: total - outcomes.len(),
            }
        });

        ValidationRun {
            generation,
            total,
            handle,
        }
    }
}

async fn run_probe<P: ImageProber + ?Sized>(
    prober: &P,
    url: &str,
    timeout: Option<Duration>,
) -> ProbeOutcome {
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, prober.probe(url)).await {
            Ok(outcome) => outcome,
            Err(_) => ProbeOutcome::broken(format!("timed out after {:?}", limit)),
        },
        None => prober.probe(url).await,
    }
}

// Applies one probe result. Returns false if it was stale or a repeat.
fn record(
    state: &Mutex<ValidationState>,
    progress: &watch::Sender<ImageStats>,
    generation: u64,
    key: ProbeKey,
    outcome: &ProbeOutcome,
) -> bool {
    let mut guard = lock(state);
    let state = &mut *guard;

    if state.generation != generation {
        debug!(
            "discarding result from image check #{} (current is #{})",
            generation, state.generation
        );
        return false;
    }

    match state.statuses.get_mut(&key) {
        Some(slot) if *slot == ImageLinkStatus::Unchecked => {
            *slot = ImageLinkStatus::from(outcome.clone());
        }
        _ => return false,
    }

    if outcome.is_valid() {
        state.stats.working += 1;
    } else {
        state.stats.broken += 1;
    }
    state.stats.pending = state.stats.pending.saturating_sub(1);
    debug_assert!(state.stats.is_consistent());

    progress.send_replace(state.stats);
    true
}
